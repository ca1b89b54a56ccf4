//! Deterministic per-file identifiers
//!
//! The counter object of every file is bound to a top-level variable whose
//! name is derived from the file path only, so re-instrumenting a file (or
//! instrumenting it on another machine) produces the same name.

use sha2::{Digest, Sha256};

/// Prefix shared by every generated identifier
pub const IDENTIFIER_PREFIX: &str = "cov_";

/// Number of leading hex digits of the path digest kept in the identifier
const DIGEST_HEX_DIGITS: usize = 12;

/// Generate the coverage identifier for a file path
///
/// The first 12 hex digits of the SHA-256 digest of the path are read as an
/// integer and rendered in base 36.
pub fn generate_identifier(file_path: &str) -> String {
    let digest = Sha256::digest(file_path.as_bytes());
    let value = digest
        .iter()
        .take(DIGEST_HEX_DIGITS / 2)
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
    format!("{IDENTIFIER_PREFIX}{}", to_base36(value))
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(char::from(DIGITS[(value % 36) as usize]));
        value /= 36;
    }
    digits.iter().rev().collect()
}
