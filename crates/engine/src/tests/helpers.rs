use crate::{BloomFilter, Detector, HashFamily, DEFAULT_FILTER_SIZE_EXP};

/// A byte-mode detector with the default filter and the given n.
pub fn byte_detector(n: usize) -> Detector {
    let mut d = Detector::new();
    d.set_bloomfilter(DEFAULT_FILTER_SIZE_EXP, HashFamily::Simple)
        .unwrap();
    d.set_ngram_length(n).unwrap();
    d
}

/// A token-mode detector splitting at the given delimiters.
pub fn token_detector(n: usize, delim: &str) -> Detector {
    let mut d = byte_detector(n);
    d.set_delimiter(delim);
    d
}

/// A bit-mode detector.
pub fn bit_detector(n: usize) -> Detector {
    let mut d = byte_detector(n);
    d.use_binary_ngrams(true);
    d
}

/// A standalone filter matching the default detector configuration,
/// for use as the auxiliary filter during inspection.
pub fn aux_filter() -> BloomFilter {
    BloomFilter::init(DEFAULT_FILTER_SIZE_EXP, HashFamily::Simple).unwrap()
}

pub const PANGRAM: &[u8] = b"The quick brown fox jumps over the lazy dog";
