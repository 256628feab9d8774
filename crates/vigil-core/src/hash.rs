//! Stable path-to-storage-key hashing
//!
//! Shadow snapshots are stored under a key derived from the normalized
//! relative path rather than the path itself, which sidesteps filesystem
//! length and character limits. The mapping is a pure function: BLAKE3 of
//! the UTF-8 path string, rendered as 64 lowercase hex characters. It is
//! deterministic and identical across runs and platforms, so a watched
//! root always resolves to the same shadow layout.

use crate::path::RelPath;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 32-byte BLAKE3 key identifying one tracked path in the shadow store.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PathKey([u8; 32]);

/// Hex parse failures for [`PathKey::from_hex`].
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid key length: expected 64 hex characters, got {0}")]
    Length(usize),
    #[error("invalid hex character: {0}")]
    Digit(char),
}

impl PathKey {
    /// Key for a normalized relative path.
    pub fn of(path: &RelPath) -> Self {
        Self(*blake3::hash(path.as_str().as_bytes()).as_bytes())
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        const HEX_CHARS: &[u8] = b"0123456789abcdef";
        let mut hex = String::with_capacity(64);
        for &byte in &self.0 {
            hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
            hex.push(HEX_CHARS[(byte & 0xf) as usize] as char);
        }
        hex
    }

    /// Parse a key back from its hex rendering.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        if hex.len() != 64 {
            return Err(KeyError::Length(hex.len()));
        }
        let raw = hex.as_bytes();
        let mut bytes = [0u8; 32];
        for i in 0..32 {
            let high = hex_nibble(raw[i * 2])?;
            let low = hex_nibble(raw[i * 2 + 1])?;
            bytes[i] = (high << 4) | low;
        }
        Ok(Self(bytes))
    }

    /// Shard index in `0..shards` for per-path dispatch.
    ///
    /// Uses the key's leading bytes, so routing is as stable as the key.
    pub fn shard(&self, shards: usize) -> usize {
        debug_assert!(shards > 0);
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&self.0[..8]);
        (u64::from_le_bytes(prefix) % shards as u64) as usize
    }
}

fn hex_nibble(c: u8) -> Result<u8, KeyError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(KeyError::Digit(c as char)),
    }
}

impl std::fmt::Debug for PathKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PathKey({})", self.to_hex())
    }
}

impl std::fmt::Display for PathKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(s: &str) -> RelPath {
        RelPath::new(s).unwrap()
    }

    #[test]
    fn test_key_deterministic() {
        let a = PathKey::of(&rel("src/main.rs"));
        let b = PathKey::of(&rel("src/main.rs"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_distinguishes_paths() {
        let a = PathKey::of(&rel("src/main.rs"));
        let b = PathKey::of(&rel("src/lib.rs"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_normalization_feeds_key() {
        // Same logical path through different spellings hashes identically.
        let a = PathKey::of(&rel("src/./main.rs"));
        let b = PathKey::of(&rel("src\\main.rs"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_hex_roundtrip() {
        let key = PathKey::of(&rel("a/b/c"));
        let hex = key.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(PathKey::from_hex(&hex).unwrap(), key);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(matches!(PathKey::from_hex("abcd"), Err(KeyError::Length(4))));
        let bad = "zz".repeat(32);
        assert!(matches!(PathKey::from_hex(&bad), Err(KeyError::Digit('z'))));
    }

    #[test]
    fn test_known_vector() {
        // BLAKE3 of the literal path string, independently computed.
        let key = PathKey::of(&rel("hello.txt"));
        let expected = blake3::hash(b"hello.txt");
        assert_eq!(key.as_bytes(), expected.as_bytes());
    }

    #[test]
    fn test_shard_in_range() {
        for n in 1..16 {
            let s = PathKey::of(&rel("some/deep/path.txt")).shard(n);
            assert!(s < n);
        }
    }

    #[test]
    fn test_shard_stable() {
        let key = PathKey::of(&rel("src/main.rs"));
        assert_eq!(key.shard(8), key.shard(8));
    }
}
