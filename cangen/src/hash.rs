//! Content hashing for gate checks and reports.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

/// SHA-256 of a byte slice, lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    Ok(sha256_hex(&fs::read(path)?))
}

/// Hashes the named files inside `dir`, keyed by file name.
///
/// A `BTreeMap` keeps the result sorted, so report output stays canonical.
pub fn hash_named_files(dir: &Path, names: &[&str]) -> io::Result<BTreeMap<String, String>> {
    let mut hashes = BTreeMap::new();
    for name in names {
        hashes.insert(name.to_string(), sha256_file(&dir.join(name))?);
    }
    Ok(hashes)
}
