//! Token (word) n-grams.
//!
//! Extraction runs in two phases. Phase 1 canonicalizes the input:
//! every run of delimiter bytes collapses to a single canonical
//! separator (the lowest byte in the delimiter set) and the stream is
//! terminated with one trailing separator. This guarantees that
//! consecutive delimiters never produce empty tokens. Phase 2 slides a
//! window of `n` tokens over the canonical stream using a ring of
//! `n + 1` token-start offsets: each separator closes one n-gram
//! spanning from the oldest recorded start to the byte before the
//! separator.
//!
//! A yielded n-gram is the canonical sub-stream covering `n` tokens,
//! i.e. the tokens *joined by the canonical separator* -- `n` counts
//! tokens, not bytes, so window lengths vary.

use crate::delimiters::DelimiterSet;

/// Collapses delimiter runs in `data` to a single `ch` and appends a
/// trailing `ch` unless the result already ends with one (or is empty).
///
/// `ch` should be the set's canonical separator; it is passed in so the
/// caller can pick it once per extraction.
#[must_use]
pub fn canonicalize(data: &[u8], delim: &DelimiterSet, ch: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 1);
    let mut prev = ch;
    for &b in data {
        if delim.contains(b) {
            if prev != ch {
                out.push(ch);
                prev = ch;
            }
        } else {
            out.push(b);
            prev = b;
        }
    }
    if prev != ch {
        out.push(ch);
    }
    out
}

/// Pushes every `n`-token window of `data` to `f`.
///
/// Windows are sub-slices of the canonical stream (tokens joined by the
/// canonical separator) and arrive in input order. An input with fewer
/// than `n` tokens yields nothing, as does an empty delimiter set
/// (callers treating that as an error must refuse it beforehand).
pub fn extract_token_ngrams<F: FnMut(&[u8])>(
    data: &[u8],
    n: usize,
    delim: &DelimiterSet,
    mut f: F,
) {
    let Some(ch) = delim.canonical_char() else {
        return;
    };
    if n == 0 {
        return;
    }

    let s = canonicalize(data, delim, ch);

    // Ring of n+1 token-start offsets into the canonical stream. Slot 0
    // starts at the beginning; the scan below records the position
    // after each of the first n-1 separators.
    let mut starts = vec![0usize; n + 1];

    let mut pos = 0;
    let mut slot = 1;
    while pos < s.len() && slot < n {
        if s[pos] == ch {
            starts[slot] = pos + 1;
            slot += 1;
        }
        pos += 1;
    }

    // From here every separator closes one n-gram: it spans from the
    // oldest start in the ring to the byte before the separator.
    let ring = n + 1;
    let mut slot = n - 1;
    while pos < s.len() {
        if s[pos] == ch {
            slot = (slot + 1) % ring;
            starts[slot] = pos + 1;

            let oldest = starts[(slot + 1) % ring];
            f(&s[oldest..pos]);
        }
        pos += 1;
    }
}
