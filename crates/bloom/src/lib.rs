//! # Bloom Filter
//!
//! A space-efficient probabilistic set used to model the n-gram content
//! of "normal" byte streams.
//!
//! A bloom filter can tell you with certainty that a key is **not** in
//! the set (no false negatives), but may occasionally report that a key
//! **is** in the set when it isn't (false positives). For anomaly
//! detection this trade-off is intended: a false positive only makes an
//! input look slightly *less* anomalous.
//!
//! Unlike the usual items/FPR parameterization, this filter is built
//! from an explicit bit size and an explicit, *ordered* list of hash
//! functions from the [`hashes`] registry. Which functions run, and in
//! which order, decides which bits get set -- it is part of the model's
//! identity and is persisted by id in the model file.
//!
//! ## Wire format (all little-endian)
//!
//! ```text
//! [bitsize: u64][size: u64][bits: `size` bytes]
//! ```
//!
//! `size` must equal `ceil(bitsize / 8)` and bits past `bitsize` in the
//! final byte must be zero; [`BloomFilter::read_from`] rejects anything
//! else. The hash-function list is *not* part of this payload -- the
//! model codec stores it separately as a list of registry ids.
//!
//! ## Example
//!
//! ```rust
//! use bloom::BloomFilter;
//! use hashes::HashFamily;
//!
//! let mut bf = BloomFilter::init(16, HashFamily::Simple).unwrap();
//! bf.add(b"hello");
//! assert!(bf.check(b"hello"));
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use hashes::{HashFamily, HashFunction};
use std::io::{self, Read, Write};
use thiserror::Error;

/// Errors raised by filter construction and (de)serialization.
#[derive(Debug, Error)]
pub enum BloomError {
    /// A filter with zero bits cannot index anything.
    #[error("filter bit size must be nonzero")]
    ZeroBitsize,

    /// `init` size exponents are limited to 1..=63: `2^64` bit indices
    /// do not fit in a `u64`.
    #[error("filter size exponent {0} out of range (1..=63)")]
    SizeExponent(u32),

    /// The hash-function list must hold between 1 and 255 entries (the
    /// model file stores the count as a single byte).
    #[error("hash function count {0} out of range (1..=255)")]
    HashCount(usize),

    /// The bit array could not be allocated.
    #[error("failed to allocate {0} bytes for the bit array")]
    Allocation(usize),

    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A serialized payload that is internally inconsistent.
    #[error("corrupt filter payload")]
    Corrupt,
}

/// Serialized payloads claiming more than this many bytes are rejected
/// as corrupt rather than allocated.
const MAX_FILTER_BYTES: u64 = 1024 * 1024 * 1024;

/// A bloom filter backed by a byte array with an ordered list of
/// registry hash functions.
///
/// Each insert sets bit `h(key) mod bitsize` for every function `h` in
/// the list; a membership check requires all of those bits to be set.
pub struct BloomFilter {
    /// The bit array, `ceil(bitsize / 8)` bytes. Bits past `bitsize`
    /// in the last byte are always zero.
    bits: Vec<u8>,
    /// Logical number of bits.
    bitsize: u64,
    /// Ordered hash functions; order determines which bits get set.
    funcs: Vec<HashFunction>,
}

impl BloomFilter {
    /// Creates a filter with `bitsize` logical bits and no hash
    /// functions yet.
    ///
    /// The filter is unusable until [`set_hash_funcs`](Self::set_hash_funcs)
    /// installs at least one function; [`init`](Self::init) does both
    /// steps at once.
    pub fn new(bitsize: u64) -> Result<Self, BloomError> {
        if bitsize == 0 {
            return Err(BloomError::ZeroBitsize);
        }
        let byte_len = usize::try_from(bitsize.div_ceil(8))
            .map_err(|_| BloomError::Allocation(usize::MAX))?;

        let mut bits = Vec::new();
        bits.try_reserve_exact(byte_len)
            .map_err(|_| BloomError::Allocation(byte_len))?;
        bits.resize(byte_len, 0);

        Ok(Self {
            bits,
            bitsize,
            funcs: Vec::new(),
        })
    }

    /// Shorthand: a filter of `2^size_exp` bits using the functions of
    /// the given family.
    pub fn init(size_exp: u32, family: HashFamily) -> Result<Self, BloomError> {
        if size_exp == 0 || size_exp > 63 {
            return Err(BloomError::SizeExponent(size_exp));
        }
        let mut bf = Self::new(1u64 << size_exp)?;
        bf.set_hash_funcs(family.functions())?;
        Ok(bf)
    }

    /// Replaces the hash-function list. The list must hold 1..=255
    /// entries.
    pub fn set_hash_funcs(&mut self, funcs: &[HashFunction]) -> Result<(), BloomError> {
        if funcs.is_empty() || funcs.len() > 255 {
            return Err(BloomError::HashCount(funcs.len()));
        }
        self.funcs = funcs.to_vec();
        Ok(())
    }

    /// Logical number of bits.
    #[must_use]
    pub fn bitsize(&self) -> u64 {
        self.bitsize
    }

    /// Bytes of storage, `ceil(bitsize / 8)`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bits.len()
    }

    /// The ordered hash functions in use.
    #[must_use]
    pub fn funcs(&self) -> &[HashFunction] {
        &self.funcs
    }

    /// Number of hash functions in use.
    #[must_use]
    pub fn num_funcs(&self) -> usize {
        self.funcs.len()
    }

    /// Inserts a key: sets bit `h(key) mod bitsize` for every function.
    ///
    /// An empty key is a valid input and sets the bits of `h(&[])`.
    pub fn add(&mut self, key: &[u8]) {
        debug_assert!(!self.funcs.is_empty(), "filter has no hash functions");
        for f in &self.funcs {
            let bit = f.hash(key) % self.bitsize;
            self.bits[(bit / 8) as usize] |= 1 << (bit % 8);
        }
    }

    /// Inserts the 8 little-endian bytes of `num`.
    pub fn add_num(&mut self, num: u64) {
        self.add(&num.to_le_bytes());
    }

    /// Returns `true` iff every function's bit for `key` is set, i.e.
    /// the key **might** have been inserted. `false` means it was
    /// **definitely not** inserted.
    #[must_use]
    pub fn check(&self, key: &[u8]) -> bool {
        debug_assert!(!self.funcs.is_empty(), "filter has no hash functions");
        if self.funcs.is_empty() {
            return false;
        }
        for f in &self.funcs {
            let bit = f.hash(key) % self.bitsize;
            if self.bits[(bit / 8) as usize] & (1 << (bit % 8)) == 0 {
                return false;
            }
        }
        true
    }

    /// Membership check for the 8 little-endian bytes of `num`.
    #[must_use]
    pub fn check_num(&self, num: u64) -> bool {
        self.check(&num.to_le_bytes())
    }

    /// Zeroes the bit array; size and hash functions are preserved.
    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    /// Population count over the bit array.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.bits.iter().map(|b| b.count_ones() as u64).sum()
    }

    /// Compares two filters: zero iff `bitsize`, byte size and the bit
    /// arrays are equal. The hash-function lists are *not* compared --
    /// their ids are compared at the model-codec level instead.
    ///
    /// The sign of a nonzero result is consistent but otherwise
    /// meaningless; callers should only test against zero.
    #[must_use]
    pub fn compare(&self, other: &BloomFilter) -> i32 {
        if self.bitsize != other.bitsize {
            return if self.bitsize < other.bitsize { -1 } else { 1 };
        }
        if self.size() != other.size() {
            return if self.size() < other.size() { -1 } else { 1 };
        }
        memcmp_bytes(&self.bits, &other.bits)
    }

    /// Size of the serialized payload in bytes:
    /// `bitsize(u64) + size(u64) + bits`.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        8 + 8 + self.bits.len()
    }

    /// Writes the payload (`bitsize`, `size`, bit array) to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), BloomError> {
        w.write_u64::<LittleEndian>(self.bitsize)?;
        w.write_u64::<LittleEndian>(self.bits.len() as u64)?;
        w.write_all(&self.bits)?;
        Ok(())
    }

    /// Reads a payload written by [`write_to`](Self::write_to) and
    /// installs the given hash functions.
    ///
    /// Rejects zero bit sizes, `size` fields that disagree with
    /// `bitsize`, oversized payloads, and stray bits past `bitsize` in
    /// the final byte.
    pub fn read_from<R: Read>(r: &mut R, funcs: &[HashFunction]) -> Result<Self, BloomError> {
        let bitsize = r.read_u64::<LittleEndian>()?;
        let size = r.read_u64::<LittleEndian>()?;

        if bitsize == 0 || size != bitsize.div_ceil(8) || size > MAX_FILTER_BYTES {
            return Err(BloomError::Corrupt);
        }

        let mut bf = Self::new(bitsize)?;
        bf.set_hash_funcs(funcs)?;
        r.read_exact(&mut bf.bits)?;

        // bits past `bitsize` must be zero in the last byte
        let tail = bitsize % 8;
        if tail != 0 {
            let last = bf.bits[bf.bits.len() - 1];
            if last & !((1u8 << tail) - 1) != 0 {
                return Err(BloomError::Corrupt);
            }
        }
        Ok(bf)
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("bitsize", &self.bitsize)
            .field("bytes", &self.bits.len())
            .field("funcs", &self.funcs)
            .finish()
    }
}

/// Byte-wise comparison returning the difference of the first unequal
/// pair (`a[i] - b[i]` as an `i32`), or 0 if the slices are equal.
///
/// Unlike libc `memcmp`, the magnitude is meaningful: it is the actual
/// byte difference, which makes mismatches easy to report.
///
/// Both slices must have the same length.
#[must_use]
pub fn memcmp_bytes(a: &[u8], b: &[u8]) -> i32 {
    debug_assert_eq!(a.len(), b.len());
    for (&x, &y) in a.iter().zip(b.iter()) {
        if x != y {
            return x as i32 - y as i32;
        }
    }
    0
}

#[cfg(test)]
mod tests;
