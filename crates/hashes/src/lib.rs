//! # Hashes
//!
//! The fixed catalog of non-cryptographic hash functions used by the
//! bloom filter, each with a stable numeric identifier.
//!
//! Model files persist hash functions by id only, so the mapping between
//! ids and algorithms is part of the on-disk contract: id `i` must hash
//! identically in every build that reads or writes a model. The registry
//! is therefore a closed enum rather than user-extensible traits.
//!
//! | id | function    | algorithm                        |
//! |----|-------------|----------------------------------|
//! | 0  | `sax`       | shift-add-xor                    |
//! | 1  | `sdbm`      | sdbm (h * 65599 + c)             |
//! | 2  | `bernstein` | Bernstein times-33               |
//! | 3  | `murmur0`   | MurmurHash64A, seed 0            |
//! | 4  | `murmur1`   | MurmurHash64A, seed 1            |
//! | 5  | `murmur2`   | MurmurHash64A, seed 2            |
//!
//! Two named families group them: `simple` = {sax, sdbm, bernstein} and
//! `murmur` = {murmur0, murmur1, murmur2}.
//!
//! All functions take a byte slice and return a `u64`; input bytes are
//! treated as unsigned. The outputs are locked by test vectors -- any
//! change here invalidates existing model files.

/// Number of functions in the registry.
pub const NUM_HASH_FUNCTIONS: usize = 6;

/// A hash function from the registry, identified by a stable id.
///
/// The discriminant *is* the on-disk id; `from_id` and [`id`](Self::id)
/// biject the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HashFunction {
    Sax = 0,
    Sdbm = 1,
    Bernstein = 2,
    Murmur0 = 3,
    Murmur1 = 4,
    Murmur2 = 5,
}

/// All registry functions in id order.
pub const ALL_HASH_FUNCTIONS: [HashFunction; NUM_HASH_FUNCTIONS] = [
    HashFunction::Sax,
    HashFunction::Sdbm,
    HashFunction::Bernstein,
    HashFunction::Murmur0,
    HashFunction::Murmur1,
    HashFunction::Murmur2,
];

impl HashFunction {
    /// All registry functions in id order.
    #[must_use]
    pub fn all() -> &'static [HashFunction] {
        &ALL_HASH_FUNCTIONS
    }

    /// Returns the stable on-disk id (0..6).
    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Resolves an id read from a model file. Ids >= 6 are unknown and
    /// must be treated as a malformed model by the caller.
    #[must_use]
    pub fn from_id(id: u8) -> Option<HashFunction> {
        Self::all().get(id as usize).copied()
    }

    /// Hashes `data` with this function.
    #[must_use]
    pub fn hash(self, data: &[u8]) -> u64 {
        match self {
            HashFunction::Sax => sax_hash(data),
            HashFunction::Sdbm => sdbm_hash(data),
            HashFunction::Bernstein => bernstein_hash(data),
            HashFunction::Murmur0 => murmur_hash0(data),
            HashFunction::Murmur1 => murmur_hash1(data),
            HashFunction::Murmur2 => murmur_hash2(data),
        }
    }

    /// The function's name as used in family specs and diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            HashFunction::Sax => "sax",
            HashFunction::Sdbm => "sdbm",
            HashFunction::Bernstein => "bernstein",
            HashFunction::Murmur0 => "murmur0",
            HashFunction::Murmur1 => "murmur1",
            HashFunction::Murmur2 => "murmur2",
        }
    }
}

/// The `simple` family: sax, sdbm, bernstein (in that order).
pub const SIMPLE_HASHES: [HashFunction; 3] = [
    HashFunction::Sax,
    HashFunction::Sdbm,
    HashFunction::Bernstein,
];

/// The `murmur` family: murmur0, murmur1, murmur2 (in that order).
pub const MURMUR_HASHES: [HashFunction; 3] = [
    HashFunction::Murmur0,
    HashFunction::Murmur1,
    HashFunction::Murmur2,
];

/// A named, ordered group of hash functions selectable by the user.
///
/// The order within a family matters: it determines which bits a filter
/// sets, and it is recorded id-by-id in the model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFamily {
    Simple,
    Murmur,
}

impl HashFamily {
    /// The family's functions in their fixed order.
    #[must_use]
    pub fn functions(self) -> &'static [HashFunction] {
        match self {
            HashFamily::Simple => &SIMPLE_HASHES,
            HashFamily::Murmur => &MURMUR_HASHES,
        }
    }

    /// Parses a family name (`"simple"` or `"murmur"`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<HashFamily> {
        match name {
            "simple" => Some(HashFamily::Simple),
            "murmur" => Some(HashFamily::Murmur),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            HashFamily::Simple => "simple",
            HashFamily::Murmur => "murmur",
        }
    }
}

/// Shift-add-xor hash: `h ^= (h << 5) + (h >> 2) + c`.
#[must_use]
pub fn sax_hash(data: &[u8]) -> u64 {
    let mut h: u64 = 0;
    for &b in data {
        h ^= (h << 5).wrapping_add(h >> 2).wrapping_add(b as u64);
    }
    h
}

/// sdbm hash: `h = c + (h << 6) + (h << 16) - h`.
#[must_use]
pub fn sdbm_hash(data: &[u8]) -> u64 {
    let mut h: u64 = 0;
    for &b in data {
        h = (b as u64)
            .wrapping_add(h << 6)
            .wrapping_add(h << 16)
            .wrapping_sub(h);
    }
    h
}

/// Bernstein's times-33 hash: `h = h * 33 + c`.
#[must_use]
pub fn bernstein_hash(data: &[u8]) -> u64 {
    let mut h: u64 = 0;
    for &b in data {
        h = h.wrapping_mul(33).wrapping_add(b as u64);
    }
    h
}

/// MurmurHash64A, seed 0.
#[must_use]
pub fn murmur_hash0(data: &[u8]) -> u64 {
    murmur_hash64a(data, 0)
}

/// MurmurHash64A, seed 1.
#[must_use]
pub fn murmur_hash1(data: &[u8]) -> u64 {
    murmur_hash64a(data, 1)
}

/// MurmurHash64A, seed 2.
#[must_use]
pub fn murmur_hash2(data: &[u8]) -> u64 {
    murmur_hash64a(data, 2)
}

/// MurmurHash64A (Austin Appleby's 64-bit variant).
///
/// Mixes 8-byte little-endian chunks, then folds the 1..7 remaining
/// bytes in before the final avalanche.
fn murmur_hash64a(data: &[u8], seed: u64) -> u64 {
    const M: u64 = 0xc6a4a7935bd1e995;
    const R: u32 = 47;

    let mut h: u64 = seed ^ (data.len() as u64).wrapping_mul(M);

    let mut chunks = data.chunks_exact(8);
    for chunk in &mut chunks {
        let mut k = u64::from_le_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        for (i, &b) in tail.iter().enumerate() {
            h ^= (b as u64) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}
