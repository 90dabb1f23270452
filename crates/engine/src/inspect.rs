//! Dual-filter inspection: per-input novelty statistics plus whole-
//! filter saturation and expected-error reporting.
//!
//! Inspection walks one input against two filters at once: the
//! *training* filter accumulated so far and a per-input *auxiliary*
//! filter that is cleared at the start of every input. Three counters
//! come out:
//!
//! - `new`: n-grams not present in the training filter,
//! - `uniq`: distinct n-grams within this input (tracked by the
//!   auxiliary filter),
//! - `total`: all n-grams examined.
//!
//! Whether the training filter is *updated* while counting is a policy
//! choice, not an overload: see [`InspectPolicy`].

use crate::train::extract;
use crate::NgramSpec;
use bloom::BloomFilter;

/// Per-input inspection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectStats {
    /// N-grams not present in the training filter.
    pub new: u64,
    /// Distinct n-grams within this input.
    pub uniq: u64,
    /// Total n-grams examined.
    pub total: u64,
}

/// What happens to the training filter while counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectPolicy {
    /// Count *and insert*: each n-gram unseen by the training filter is
    /// counted as `new` and immediately added, so a gram repeated
    /// within one input is new at most once and later inputs see this
    /// input's grams. Used when building a model while inspecting.
    Extend,
    /// Count only: the training filter stays read-only; a gram
    /// repeated within one input counts as `new` every time it occurs.
    /// Used when inspecting against a finished model.
    Freeze,
}

/// Walks `data` once, updating `aux` (cleared first) and -- under
/// [`InspectPolicy::Extend`] -- the training filter, and returns the
/// counters.
///
/// Extraction is left-to-right; under `Extend` the `new` counter
/// depends on that order, since earlier occurrences of a gram mutate
/// the training filter before later ones are checked.
pub fn bloomize_dual(
    training: &mut BloomFilter,
    aux: &mut BloomFilter,
    data: &[u8],
    spec: &NgramSpec,
    policy: InspectPolicy,
) -> InspectStats {
    let mut stats = InspectStats::default();
    aux.clear();

    extract(spec, data, |gram| {
        match policy {
            InspectPolicy::Extend => {
                if !training.check(gram) {
                    stats.new += 1;
                    training.add(gram);
                }
            }
            InspectPolicy::Freeze => {
                if !training.check(gram) {
                    stats.new += 1;
                }
            }
        }
        if !aux.check(gram) {
            stats.uniq += 1;
            aux.add(gram);
        }
        stats.total += 1;
    });
    stats
}

/// Fraction of set bits in the filter, in [0, 1].
#[must_use]
pub fn saturation(bloom: &BloomFilter) -> f64 {
    bloom.count() as f64 / bloom.bitsize() as f64
}

/// Theoretical false-positive rate `(1 - e^(-k*n/m))^k` for a filter of
/// `m` bits and `k` hash functions after inserting `n` distinct
/// n-grams.
#[must_use]
pub fn expected_error(bloom: &BloomFilter, unique_ngrams: u64) -> f64 {
    let k = bloom.num_funcs() as f64;
    let n = unique_ngrams as f64;
    let m = bloom.bitsize() as f64;
    (1.0 - (-(k * n) / m).exp()).powf(k)
}
