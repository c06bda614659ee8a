//! Hashing utilities for content identity and cache-busted filenames.
//!
//! This module provides:
//! - `ContentHash`: A full 64-character hash of file content
//! - `hash_bytes()`: Arbitrary byte hashing

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA256 hash of some content.
///
/// Two files with identical bytes always share a `ContentHash`. Filenames use a
/// truncated prefix (see [`ContentHash::short`]) to keep paths readable.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  /// Return at most `len` leading hex characters of the hash.
  pub fn short(&self, len: usize) -> &str {
    let len = self.0.len().min(len);
    &self.0[..len]
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}
