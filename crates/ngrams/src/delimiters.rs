//! Delimiter specs and percent-escape decoding.
//!
//! A delimiter spec is a user-supplied string such as `"%0a%0d "` that
//! names the bytes splitting an input into tokens. Specs may contain
//! `%HH` percent-escapes (hex digits, case-insensitive); unrecognized
//! or truncated escapes are preserved verbatim so that a literal `%`
//! never disappears silently.

/// Decodes `%HH` escapes in `s`.
///
/// Rules, in order:
/// - a `%` followed by two hex digits becomes that byte (so `%25`
///   produces a literal `%` that is *not* re-examined);
/// - a `%` with fewer than two bytes remaining is copied verbatim;
/// - a `%` followed by two bytes that are not both hex digits is copied
///   verbatim together with those two bytes;
/// - everything else is copied unchanged.
#[must_use]
pub fn decode_escapes(s: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        if s[i] != b'%' {
            out.push(s[i]);
            i += 1;
            continue;
        }

        // truncated escape at the end of the input
        let remaining = s.len() - i;
        if remaining <= 2 {
            out.extend_from_slice(&s[i..]);
            break;
        }

        let (hi, lo) = (s[i + 1], s[i + 2]);
        if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
            out.push(hex_value(hi) * 16 + hex_value(lo));
        } else {
            out.push(b'%');
            out.push(hi);
            out.push(lo);
        }
        i += 3;
    }
    out
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => unreachable!("caller checked is_ascii_hexdigit"),
    }
}

/// A 256-entry membership table marking separator bytes.
#[derive(Clone)]
pub struct DelimiterSet {
    table: [bool; 256],
}

impl DelimiterSet {
    /// Builds the set from a spec string, decoding `%HH` escapes first.
    #[must_use]
    pub fn from_spec(spec: &str) -> Self {
        let mut table = [false; 256];
        for &b in &decode_escapes(spec.as_bytes()) {
            table[b as usize] = true;
        }
        Self { table }
    }

    /// Returns `true` if `b` is a separator byte.
    #[inline]
    #[must_use]
    pub fn contains(&self, b: u8) -> bool {
        self.table[b as usize]
    }

    /// The canonical separator: the lowest-numbered byte in the set.
    /// `None` for an empty set, in which case token extraction is
    /// ill-defined and must be refused by the caller.
    #[must_use]
    pub fn canonical_char(&self) -> Option<u8> {
        (0..=255u8).find(|&b| self.table[b as usize])
    }

    /// Returns `true` if no byte is marked as a separator.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.table.iter().any(|&x| x)
    }
}

impl std::fmt::Debug for DelimiterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes: Vec<u8> = (0..=255u8).filter(|&b| self.table[b as usize]).collect();
        f.debug_struct("DelimiterSet").field("bytes", &bytes).finish()
    }
}
