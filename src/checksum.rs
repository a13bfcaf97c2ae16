//! Streaming whole-file content hashing.
//!
//! The file action decides "already correct" vs "must copy" by comparing
//! content hashes of source and destination, read in fixed-size blocks so
//! large files never land in memory at once.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{ActionError, Result};

const BLOCK_SIZE: usize = 8 * 1024;

/// Compute the blake3 hash of a file's contents.
pub fn file_digest(path: &Path) -> Result<blake3::Hash> {
    let mut hasher = blake3::Hasher::new();
    let mut file = File::open(path)
        .map_err(|_| ActionError::execution("unable to determine checksum of file"))?;
    let mut block = [0u8; BLOCK_SIZE];

    loop {
        let read = file
            .read(&mut block)
            .map_err(|_| ActionError::execution("unable to determine checksum of file"))?;
        if read == 0 {
            break;
        }
        hasher.update(&block[..read]);
    }

    Ok(hasher.finalize())
}

/// Whether two files have identical contents.
pub fn files_equal(a: &Path, b: &Path) -> Result<bool> {
    Ok(file_digest(a)? == file_digest(b)?)
}
