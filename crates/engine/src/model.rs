//! Binary model file codec.
//!
//! ## File layout (all integers little-endian)
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ DELIMITER SPEC                                                │
//! │                                                               │
//! │ NUL-terminated string, escapes undecoded. Empty (just the     │
//! │ NUL) means byte or bit mode; non-empty means token mode.      │
//! ├───────────────────────────────────────────────────────────────┤
//! │ N-GRAM LENGTH                                                 │
//! │                                                               │
//! │ ngram_length (u64), must be nonzero                           │
//! ├───────────────────────────────────────────────────────────────┤
//! │ HASH SPEC                                                     │
//! │                                                               │
//! │ nfuncs (u8, nonzero) | nfuncs x hash id (u8, each < 6)        │
//! ├───────────────────────────────────────────────────────────────┤
//! │ FILTER PAYLOAD                                                │
//! │                                                               │
//! │ bitsize (u64) | size (u64) | bits (`size` bytes)              │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The format cannot distinguish byte mode from bit mode: both store an
//! empty delimiter spec. The reader therefore takes an `as_binary` flag
//! out-of-band and rejects the flag on token-mode files rather than
//! guessing.
//!
//! Reading is all-or-nothing: any short read, unknown hash id, zero
//! n-gram length or inconsistent filter payload yields
//! [`DetectorError::MalformedModel`] and no detector.

use crate::{Detector, DetectorError};
use bloom::{BloomError, BloomFilter};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use hashes::HashFunction;
use std::fs::{rename, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Writes the model (spec + filter) to `w`.
pub fn write_model<W: Write>(w: &mut W, detector: &Detector) -> Result<(), DetectorError> {
    let bloom = detector
        .bloom()
        .ok_or_else(|| DetectorError::InvalidArgument("no filter configured".into()))?;
    if detector.ngram_length() == 0 {
        return Err(DetectorError::InvalidArgument(
            "n-gram length not configured".into(),
        ));
    }

    let spec = detector.delimiter_spec().unwrap_or("");
    if spec.as_bytes().contains(&0) {
        return Err(DetectorError::InvalidArgument(
            "delimiter spec must not contain NUL (use %00)".into(),
        ));
    }
    w.write_all(spec.as_bytes())?;
    w.write_all(&[0])?;

    w.write_u64::<LittleEndian>(detector.ngram_length() as u64)?;

    // nfuncs is 1..=255 by filter construction
    let funcs = bloom.funcs();
    w.write_u8(funcs.len() as u8)?;
    for f in funcs {
        w.write_u8(f.id())?;
    }

    bloom.write_to(w).map_err(|e| match e {
        BloomError::Io(io) => DetectorError::Io(io),
        other => DetectorError::InvalidArgument(other.to_string()),
    })?;
    Ok(())
}

/// Reads a model written by [`write_model`].
///
/// `binary` selects bit mode for delimiter-free models; it conflicts
/// with a token-mode file.
pub fn read_model<R: Read>(r: &mut R, binary: bool) -> Result<Detector, DetectorError> {
    let spec_bytes = read_nul_terminated(r)?;
    let spec = String::from_utf8(spec_bytes).map_err(|_| DetectorError::MalformedModel)?;

    if binary && !spec.is_empty() {
        return Err(DetectorError::InvalidArgument(
            "binary n-grams conflict with a token-mode model".into(),
        ));
    }

    let ngram_length = r
        .read_u64::<LittleEndian>()
        .map_err(|_| DetectorError::MalformedModel)?;
    let ngram_length =
        usize::try_from(ngram_length).map_err(|_| DetectorError::MalformedModel)?;
    if ngram_length == 0 {
        return Err(DetectorError::MalformedModel);
    }

    let funcs = read_hash_spec(r)?;

    let bloom = BloomFilter::read_from(r, &funcs).map_err(|e| match e {
        BloomError::Allocation(_) => DetectorError::Allocation(e),
        _ => DetectorError::MalformedModel,
    })?;

    let mut detector = Detector::new();
    detector.set_ngram_length(ngram_length)?;
    detector.use_binary_ngrams(binary);
    detector.set_delimiter(&spec);
    detector.set_bloom(bloom);
    Ok(detector)
}

/// Reads the hash spec: a count byte followed by that many registry
/// ids. A zero count or an unknown id is a malformed model.
fn read_hash_spec<R: Read>(r: &mut R) -> Result<Vec<HashFunction>, DetectorError> {
    let nfuncs = r.read_u8().map_err(|_| DetectorError::MalformedModel)?;
    if nfuncs == 0 {
        return Err(DetectorError::MalformedModel);
    }
    let mut funcs = Vec::with_capacity(nfuncs as usize);
    for _ in 0..nfuncs {
        let id = r.read_u8().map_err(|_| DetectorError::MalformedModel)?;
        funcs.push(HashFunction::from_id(id).ok_or(DetectorError::MalformedModel)?);
    }
    Ok(funcs)
}

fn read_nul_terminated<R: Read>(r: &mut R) -> Result<Vec<u8>, DetectorError> {
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        r.read_exact(&mut byte)
            .map_err(|_| DetectorError::MalformedModel)?;
        if byte[0] == 0 {
            return Ok(out);
        }
        out.push(byte[0]);
    }
}

/// Writes the model to `path` crash-safely: data goes to a temporary
/// file first, is fsynced, and is then atomically renamed into place.
pub fn to_file(detector: &Detector, path: &Path) -> Result<(), DetectorError> {
    let tmp_path = path.with_extension("model.tmp");
    let raw_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)?;
    let mut w = BufWriter::new(raw_file);

    if let Err(e) = write_model(&mut w, detector) {
        drop(w);
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    w.flush()?;
    w.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    rename(&tmp_path, path)?;
    Ok(())
}

/// Loads a model from `path`; see [`read_model`] for the `binary` flag.
pub fn from_file(path: &Path, binary: bool) -> Result<Detector, DetectorError> {
    let file = File::open(path)?;
    let mut r = BufReader::new(file);
    read_model(&mut r, binary)
}

/// Returns `true` iff the two model *specifications* differ: n-gram
/// length, mode, delimiter spec, filter bit/byte size or the ordered
/// hash-function list.
///
/// Filter contents are deliberately not compared -- the two models of a
/// 2-class setup differ there by construction.
#[must_use]
pub fn spec_diff(a: &Detector, b: &Detector) -> bool {
    if a.ngram_length() != b.ngram_length()
        || a.mode() != b.mode()
        || a.delimiter_spec() != b.delimiter_spec()
    {
        return true;
    }
    match (a.bloom(), b.bloom()) {
        (None, None) => false,
        (Some(x), Some(y)) => {
            x.bitsize() != y.bitsize() || x.size() != y.size() || x.funcs() != y.funcs()
        }
        _ => true,
    }
}
