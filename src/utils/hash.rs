//! Hashing utilities.
//!
//! Everything is `blake3`: its output is fixed by a published specification,
//! so content ids stay the same across releases, dependency bumps and
//! platforms. Ids already written to history and markup keep resolving.
//!
//! - `fingerprint_parts` for content ids (8 hex digits of the digest)
//! - `ContentHash` for whole-file version records
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let fp = hash::fingerprint_parts(&["logo", "/img/logo.png"]); // -> "a1b2c3d4"
//! let h = hash::ContentHash::of(b"<p>Hello</p>");
//! ```

use std::fmt;

/// Separator between digest parts, so `("ab", "c")` and `("a", "bc")` differ.
const PART_SEPARATOR: u8 = 0x1f;

/// Fingerprint width in hex characters.
pub const FINGERPRINT_LEN: usize = 8;

/// Fingerprint several parts as one value.
pub fn fingerprint_parts(parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(&[PART_SEPARATOR]);
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(&hasher.finalize().as_bytes()[..FINGERPRINT_LEN / 2])
}

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash a byte slice.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Convert to hex string.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display first 16 chars of hex for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}
