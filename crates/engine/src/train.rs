//! Filter population: insert the n-grams of an input into a bloom
//! filter, optionally gated by a caller-supplied weight vector.

use crate::{Mode, NgramSpec};
use bloom::BloomFilter;
use hashes::murmur_hash0;
use ngrams::{extract_bit_ngrams, extract_byte_ngrams, extract_token_ngrams};

/// Runs the consumer over every n-gram of `data` for the given spec.
///
/// This is the single dispatch point between the three alphabets; all
/// training, scoring and inspection loops funnel through it, so they
/// agree exactly on which windows an input yields.
pub(crate) fn extract<F: FnMut(&[u8])>(spec: &NgramSpec, data: &[u8], f: F) {
    match spec.mode {
        Mode::Bytes => extract_byte_ngrams(data, spec.length, f),
        Mode::Bits => extract_bit_ngrams(data, spec.length, f),
        Mode::Tokens => {
            // a token spec without delimiters yields nothing; the
            // detector-level API refuses it before getting here
            if let Some(delim) = spec.delimiters {
                extract_token_ngrams(data, spec.length, delim, f);
            }
        }
    }
}

/// Inserts every n-gram of `data` into the filter.
pub fn bloomize(bloom: &mut BloomFilter, data: &[u8], spec: &NgramSpec) {
    extract(spec, data, |gram| bloom.add(gram));
}

/// Inserts only the n-grams whose weight is strictly positive.
///
/// `weights` is indexed by [`ngram_dim`]; an empty vector inserts
/// nothing. The caller must have built the vector with the same
/// dimension hash.
pub fn bloomize_weighted(
    bloom: &mut BloomFilter,
    data: &[u8],
    spec: &NgramSpec,
    weights: &[f64],
) {
    if weights.is_empty() {
        return;
    }
    extract(spec, data, |gram| {
        if weights[ngram_dim(gram, weights.len())] > 0.0 {
            bloom.add(gram);
        }
    });
}

/// The weight-vector dimension of an n-gram: `murmur0(gram) mod dims`.
///
/// Fixed so that vectors built offline keep indexing the same grams.
#[must_use]
pub fn ngram_dim(gram: &[u8], dims: usize) -> usize {
    debug_assert!(dims > 0);
    (murmur_hash0(gram) % dims as u64) as usize
}
