//! Content fingerprints.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use vidsync_common::Result;

const CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 of the file's bytes as lowercase hex.
///
/// The file is streamed in fixed-size chunks, so memory use does not grow
/// with file size. Any read error is returned; callers treat it as an
/// unprocessable file.
pub fn fingerprint(path: &Path) -> Result<String> {
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
