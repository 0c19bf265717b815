//! Storage layer: on-disk corpus formats.
//!
//! Holds the FAISS flat index reader and the fragment metadata store.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub mod error;
pub mod faiss;
pub mod fragments;
pub mod models;

pub use error::StorageError;
pub use fragments::FragmentStore;

/// blake3 digest of a file, hex encoded.
pub fn fingerprint(path: &Path) -> Result<String, StorageError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}
