//! Anomaly and 2-class scores.
//!
//! Both scores divide by the input's n-gram count; an input yielding
//! zero n-grams therefore scores NaN. That is deliberate: callers get a
//! distinct "no content" channel instead of a hard error and can filter
//! on `is_nan()`.

use crate::train::extract;
use crate::NgramSpec;
use bloom::BloomFilter;

/// Anomaly score of `data` against a trained filter: `(t - k) / t`
/// where `t` is the n-gram count and `k` how many are present in the
/// filter. 0.0 means fully known, 1.0 fully novel, NaN no n-grams.
///
/// False positives in the filter can only lower the score, never raise
/// it: there are no false negatives, so a trained input always scores
/// exactly 0.0.
#[must_use]
pub fn anomaly_score(bloom: &BloomFilter, data: &[u8], spec: &NgramSpec) -> f64 {
    let mut total: u64 = 0;
    let mut known: u64 = 0;
    extract(spec, data, |gram| {
        total += 1;
        if bloom.check(gram) {
            known += 1;
        }
    });
    (total - known) as f64 / total as f64
}

/// Discriminative score of `data` between a "good" and a "bad" filter:
/// `(k_bad - k_good) / t`. Positive means more n-grams are known to the
/// bad filter than to the good one; range is [-1, 1], NaN for inputs
/// with no n-grams.
#[must_use]
pub fn two_class_score(
    good: &BloomFilter,
    bad: &BloomFilter,
    data: &[u8],
    spec: &NgramSpec,
) -> f64 {
    let mut total: u64 = 0;
    let mut good_known: u64 = 0;
    let mut bad_known: u64 = 0;
    extract(spec, data, |gram| {
        total += 1;
        if good.check(gram) {
            good_known += 1;
        }
        if bad.check(gram) {
            bad_known += 1;
        }
    });
    (bad_known as f64 - good_known as f64) / total as f64
}
