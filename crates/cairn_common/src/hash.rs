//! Content hashing used to bucket records during deduplication.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit content hash computed using XXH3.
///
/// Equal hashes only nominate candidates; callers that need exact equality
/// still compare the underlying bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash over several slices as if they were concatenated
    /// with a length prefix each, so `["ab", "c"]` and `["a", "bc"]` differ.
    pub fn from_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = xxhash_rust::xxh3::Xxh3::new();
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Self(hasher.digest128().to_le_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ContentHash::from_parts([&b"hello world"[..]]);
        let b = ContentHash::from_parts([&b"hello world"[..]]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_differ() {
        let a = ContentHash::from_parts([&b"hello"[..]]);
        let b = ContentHash::from_parts([&b"world"[..]]);
        assert_ne!(a, b);
    }

    #[test]
    fn parts_are_length_delimited() {
        let a = ContentHash::from_parts([&b"ab"[..], &b"c"[..]]);
        let b = ContentHash::from_parts([&b"a"[..], &b"bc"[..]]);
        assert_ne!(a, b);
        let c = ContentHash::from_parts([&b"ab"[..], &b"c"[..]]);
        assert_eq!(a, c);
    }

    #[test]
    fn display_format() {
        let h = ContentHash::from_parts([&b"test"[..]]);
        let s = format!("{h}");
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
