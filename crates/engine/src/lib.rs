//! # Engine - content anomaly detector
//!
//! The central crate tying together the [`hashes`], [`bloom`] and
//! [`ngrams`] crates into a complete content-based anomaly detector:
//! "normal" byte streams are modeled as the set of short n-grams they
//! contain, stored compactly in a bloom filter, and new inputs are
//! scored by the fraction of their n-grams missing from the model.
//!
//! ## Architecture
//!
//! ```text
//!                 input bytes
//!                     |
//!                     v
//! ┌───────────────────────────────────────────────┐
//! │                 DETECTOR                      │
//! │                                               │
//! │ train.rs → extract n-grams → filter insert    │
//! │ score.rs → extract n-grams → filter query     │
//! │              |                                │
//! │              v                                │
//! │      (total - known) / total                  │
//! │                                               │
//! │ inspect.rs → dual-filter statistics           │
//! │              (new / uniq / total per input)   │
//! │                                               │
//! │ model.rs → model file codec, spec comparison  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module        | Purpose                                          |
//! |---------------|--------------------------------------------------|
//! | `lib.rs`      | `Detector` struct, configuration, `Mode`, errors |
//! | [`train`]     | filter population: plain / weighted              |
//! | [`score`]     | anomaly and 2-class scores                       |
//! | [`inspect`]   | dual-filter statistics, saturation, expected FPR |
//! | [`model`]     | binary model file format, `spec_diff`            |
//!
//! ## Scoring
//!
//! The anomaly score of an input is `(t - k) / t` where `t` is the
//! number of n-grams it yields and `k` the number already present in
//! the model: 0.0 means every n-gram is known, 1.0 means none are. An
//! input yielding no n-grams at all scores NaN, which callers can
//! filter as a distinct channel rather than an error.
//!
//! A detector is single-threaded; run independent detectors for
//! parallelism. Extraction order is left-to-right and observable
//! through the inspection counters.

pub mod inspect;
pub mod model;
pub mod score;
pub mod train;

pub use bloom::{memcmp_bytes, BloomError, BloomFilter};
pub use hashes::{HashFamily, HashFunction};
pub use inspect::{InspectPolicy, InspectStats};
pub use model::spec_diff;
pub use ngrams::DelimiterSet;

use std::io;
use thiserror::Error;

/// Default filter size exponent: `2^24` bits (2 MiB of filter).
pub const DEFAULT_FILTER_SIZE_EXP: u32 = 24;

/// Default n-gram length.
pub const DEFAULT_NGRAM_LENGTH: usize = 3;

/// Errors surfaced by detector operations.
///
/// Scoring an input that yields zero n-grams is *not* an error; it
/// produces a NaN score (see the [crate docs](self)).
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Zero or out-of-range sizes, unknown hash-family names,
    /// conflicting mode settings, or operating on an unconfigured
    /// detector.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Any read failure or inconsistency in a model file. No partial
    /// state is observable: the detector is only built once the whole
    /// file parsed.
    #[error("malformed model")]
    MalformedModel,

    /// The filter bit array could not be allocated.
    #[error("allocation failure: {0}")]
    Allocation(#[source] BloomError),

    /// An I/O error outside the model payload (opening, creating or
    /// renaming files).
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Maps filter-construction errors from user-supplied parameters.
fn bloom_arg_err(e: BloomError) -> DetectorError {
    match e {
        BloomError::Allocation(_) => DetectorError::Allocation(e),
        other => DetectorError::InvalidArgument(other.to_string()),
    }
}

/// The n-gram alphabet a detector operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Windows of `n` bytes.
    Bytes,
    /// Windows of `n` bits.
    Bits,
    /// Windows of `n` tokens split at delimiter bytes.
    Tokens,
}

/// Extraction parameters resolved from a detector's configuration.
///
/// The engine functions in [`train`], [`score`] and [`inspect`] take
/// this instead of a whole detector so that standalone filters (e.g.
/// the "bad" filter of a 2-class setup) can be driven with the same
/// parameters.
#[derive(Clone)]
pub struct NgramSpec<'a> {
    /// Window length in alphabet units (bytes, bits or tokens).
    pub length: usize,
    /// The alphabet.
    pub mode: Mode,
    /// Delimiter table; required for [`Mode::Tokens`], ignored
    /// otherwise. A token-mode spec without delimiters yields no
    /// n-grams.
    pub delimiters: Option<&'a DelimiterSet>,
}

/// A trained or trainable anomaly detector: one bloom filter plus the
/// n-gram parameters that fill and query it.
///
/// # Lifecycle
///
/// 1. [`new`](Self::new), then configure: [`set_bloomfilter`](Self::set_bloomfilter),
///    [`set_ngram_length`](Self::set_ngram_length), and optionally
///    [`set_delimiter`](Self::set_delimiter) (token mode) or
///    [`use_binary_ngrams`](Self::use_binary_ngrams) (bit mode).
/// 2. [`train`](Self::train) on known-good inputs.
/// 3. [`predict`](Self::predict) anomaly scores for new inputs, or
///    [`to_file`](Self::to_file) / [`from_file`](Self::from_file) to
///    persist and restore the model.
///
/// The detector owns its filter exclusively; the auxiliary filter used
/// during inspection is supplied (and owned) by the caller.
pub struct Detector {
    bloom: Option<BloomFilter>,
    ngram_length: usize,
    binary: bool,
    /// The delimiter spec verbatim (escapes undecoded); this exact
    /// string is what the model file stores.
    delimiter_spec: Option<String>,
    delimiters: Option<DelimiterSet>,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector {
    /// An unconfigured detector: no filter, no n-gram length, byte
    /// mode.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bloom: None,
            ngram_length: 0,
            binary: false,
            delimiter_spec: None,
            delimiters: None,
        }
    }

    /// Installs a fresh filter of `2^size_exp` bits using the given
    /// hash family, replacing any previous filter.
    pub fn set_bloomfilter(
        &mut self,
        size_exp: u32,
        family: HashFamily,
    ) -> Result<(), DetectorError> {
        self.bloom = Some(BloomFilter::init(size_exp, family).map_err(bloom_arg_err)?);
        Ok(())
    }

    /// Installs an existing filter, replacing any previous one.
    pub fn set_bloom(&mut self, bloom: BloomFilter) {
        self.bloom = Some(bloom);
    }

    /// Switches between byte n-grams (`false`, default) and bit
    /// n-grams (`true`).
    ///
    /// Bit mode and token mode are mutually exclusive: the model file
    /// could not round-trip a detector carrying both (the non-empty
    /// delimiter spec would mark it as token mode on disk). Selecting
    /// bit mode therefore drops any configured delimiter, and
    /// [`set_delimiter`](Self::set_delimiter) with a non-empty spec
    /// drops bit mode; the last setting wins.
    pub fn use_binary_ngrams(&mut self, binary: bool) {
        self.binary = binary;
        if binary {
            self.delimiter_spec = None;
            self.delimiters = None;
        }
    }

    /// Sets the token delimiter spec (may contain `%HH` escapes). A
    /// non-empty spec selects token mode, dropping bit mode if it was
    /// set (see [`use_binary_ngrams`](Self::use_binary_ngrams)); the
    /// empty string reverts to byte n-grams.
    pub fn set_delimiter(&mut self, spec: &str) {
        if spec.is_empty() {
            self.delimiter_spec = None;
            self.delimiters = None;
        } else {
            self.delimiters = Some(DelimiterSet::from_spec(spec));
            self.delimiter_spec = Some(spec.to_string());
            self.binary = false;
        }
    }

    /// Sets the n-gram length (alphabet units per window). Zero is
    /// invalid.
    pub fn set_ngram_length(&mut self, n: usize) -> Result<(), DetectorError> {
        if n == 0 {
            return Err(DetectorError::InvalidArgument(
                "n-gram length must be nonzero".into(),
            ));
        }
        self.ngram_length = n;
        Ok(())
    }

    /// The alphabet this detector extracts. The configuration setters
    /// keep bit mode and a delimiter from coexisting, so the checks
    /// here never overlap.
    #[must_use]
    pub fn mode(&self) -> Mode {
        if self.binary {
            Mode::Bits
        } else if self.delimiters.is_some() {
            Mode::Tokens
        } else {
            Mode::Bytes
        }
    }

    /// The configured n-gram length (0 while unconfigured).
    #[must_use]
    pub fn ngram_length(&self) -> usize {
        self.ngram_length
    }

    /// The delimiter spec exactly as configured, if any.
    #[must_use]
    pub fn delimiter_spec(&self) -> Option<&str> {
        self.delimiter_spec.as_deref()
    }

    /// The detector's filter, if one is configured.
    #[must_use]
    pub fn bloom(&self) -> Option<&BloomFilter> {
        self.bloom.as_ref()
    }

    /// Mutable access to the filter, if one is configured.
    pub fn bloom_mut(&mut self) -> Option<&mut BloomFilter> {
        self.bloom.as_mut()
    }

    /// Resolves the extraction parameters, verifying the detector is
    /// fully configured for its mode.
    pub fn ngram_spec(&self) -> Result<NgramSpec<'_>, DetectorError> {
        if self.ngram_length == 0 {
            return Err(DetectorError::InvalidArgument(
                "n-gram length not configured".into(),
            ));
        }
        let mode = self.mode();
        if mode == Mode::Tokens {
            match &self.delimiters {
                Some(d) if !d.is_empty() => {}
                _ => {
                    return Err(DetectorError::InvalidArgument(
                        "token mode requires a nonempty delimiter set".into(),
                    ))
                }
            }
        }
        Ok(NgramSpec {
            length: self.ngram_length,
            mode,
            delimiters: self.delimiters.as_ref(),
        })
    }

    /// Trains the model: inserts every n-gram of every input into the
    /// filter.
    pub fn train<T: AsRef<[u8]>>(&mut self, inputs: &[T]) -> Result<(), DetectorError> {
        self.ngram_spec()?;
        let spec = NgramSpec {
            length: self.ngram_length,
            mode: self.mode(),
            delimiters: self.delimiters.as_ref(),
        };
        let bloom = self
            .bloom
            .as_mut()
            .ok_or_else(|| DetectorError::InvalidArgument("no filter configured".into()))?;
        for input in inputs {
            train::bloomize(bloom, input.as_ref(), &spec);
        }
        Ok(())
    }

    /// Scores each input against the model: `(t - k) / t`, NaN for
    /// inputs yielding no n-grams.
    pub fn predict<T: AsRef<[u8]>>(&self, inputs: &[T]) -> Result<Vec<f64>, DetectorError> {
        let spec = self.ngram_spec()?;
        let bloom = self
            .bloom
            .as_ref()
            .ok_or_else(|| DetectorError::InvalidArgument("no filter configured".into()))?;
        Ok(inputs
            .iter()
            .map(|input| score::anomaly_score(bloom, input.as_ref(), &spec))
            .collect())
    }

    /// Discriminative scores against a second, "bad" model:
    /// `(k_bad - k_good) / t`, positive meaning "more like bad". The
    /// two model specs must match ([`spec_diff`]).
    pub fn predict_2class<T: AsRef<[u8]>>(
        &self,
        bad: &Detector,
        inputs: &[T],
    ) -> Result<Vec<f64>, DetectorError> {
        if spec_diff(self, bad) {
            return Err(DetectorError::InvalidArgument(
                "model specs differ between the two classes".into(),
            ));
        }
        let spec = self.ngram_spec()?;
        let good_bloom = self
            .bloom
            .as_ref()
            .ok_or_else(|| DetectorError::InvalidArgument("no filter configured".into()))?;
        let bad_bloom = bad
            .bloom
            .as_ref()
            .ok_or_else(|| DetectorError::InvalidArgument("no filter configured".into()))?;
        Ok(inputs
            .iter()
            .map(|input| score::two_class_score(good_bloom, bad_bloom, input.as_ref(), &spec))
            .collect())
    }

    /// Gathers per-input statistics against this model using the
    /// caller's auxiliary filter (cleared per input). See
    /// [`inspect::bloomize_dual`] for the policy semantics.
    pub fn inspect(
        &mut self,
        aux: &mut BloomFilter,
        input: &[u8],
        policy: InspectPolicy,
    ) -> Result<InspectStats, DetectorError> {
        self.ngram_spec()?;
        let spec = NgramSpec {
            length: self.ngram_length,
            mode: self.mode(),
            delimiters: self.delimiters.as_ref(),
        };
        let bloom = self
            .bloom
            .as_mut()
            .ok_or_else(|| DetectorError::InvalidArgument("no filter configured".into()))?;
        Ok(inspect::bloomize_dual(bloom, aux, input, &spec, policy))
    }

    /// Writes the model to `path` (temp file + atomic rename).
    pub fn to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), DetectorError> {
        model::to_file(self, path.as_ref())
    }

    /// Loads a model from `path`.
    ///
    /// The file format does not record whether a delimiter-free model
    /// used byte or bit n-grams, so the caller supplies `binary`
    /// out-of-band; combining `binary` with a token-mode model is
    /// rejected.
    pub fn from_file<P: AsRef<std::path::Path>>(
        path: P,
        binary: bool,
    ) -> Result<Detector, DetectorError> {
        model::from_file(path.as_ref(), binary)
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("mode", &self.mode())
            .field("ngram_length", &self.ngram_length)
            .field("delimiter_spec", &self.delimiter_spec)
            .field("bloom", &self.bloom)
            .finish()
    }
}

#[cfg(test)]
mod tests;
