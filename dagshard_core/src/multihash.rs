//! Self-describing content digests (blake3 or sha2-256, 32 bytes).
//!
//! Formatting and ordering follow the iroh `Hash` type (MIT OR Apache-2.0)
//! https://github.com/n0-computer/iroh-blobs/blob/main/src/hash.rs

use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use std::fmt;

/// Length in bytes of every digest produced by a [`HashAlg`].
pub const DIGEST_SIZE: usize = 32;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MultihashError {
    #[error("unknown multihash code {0:#x}")]
    UnknownCode(u8),
    #[error("invalid digest length: expected {DIGEST_SIZE}, got {0}")]
    InvalidLength(usize),
}

/// Hash function used to derive a content identifier.
#[repr(u8)]
#[derive(
    Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlg {
    #[serde(rename = "sha2-256")]
    Sha2_256 = 0x12,
    #[default]
    Blake3 = 0x1e,
}

impl HashAlg {
    /// Multicodec code of this hash function.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self, MultihashError> {
        match code {
            0x12 => Ok(HashAlg::Sha2_256),
            0x1e => Ok(HashAlg::Blake3),
            other => Err(MultihashError::UnknownCode(other)),
        }
    }

    /// Hashes `bytes` with this function.
    pub fn digest(self, bytes: impl AsRef<[u8]>) -> Multihash {
        let digest: [u8; DIGEST_SIZE] = match self {
            HashAlg::Blake3 => *blake3::hash(bytes.as_ref()).as_bytes(),
            HashAlg::Sha2_256 => sha2::Sha256::digest(bytes.as_ref()).into(),
        };
        Multihash { alg: self, digest }
    }
}

/// A digest tagged with the function that produced it.
#[derive(Clone, Copy, Hash, PartialEq, Eq)]
pub struct Multihash {
    alg: HashAlg,
    digest: [u8; DIGEST_SIZE],
}

impl fmt::Debug for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Multihash")
            .field(&self.alg)
            .field(&self.to_hex())
            .finish()
    }
}

impl Multihash {
    /// Length of the binary form (`code`, `length`, digest).
    pub const ENCODED_LEN: usize = DIGEST_SIZE + 2;

    pub const fn from_digest(alg: HashAlg, digest: [u8; DIGEST_SIZE]) -> Self {
        Self { alg, digest }
    }

    pub fn alg(&self) -> HashAlg {
        self.alg
    }

    /// Bytes of the digest.
    pub fn digest(&self) -> &[u8; DIGEST_SIZE] {
        &self.digest
    }

    /// Binary multihash: `[code, 0x20, digest..]`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        out.push(self.alg.code());
        out.push(DIGEST_SIZE as u8);
        out.extend_from_slice(&self.digest);
        out
    }

    /// Parses a binary multihash. The slice must hold exactly one multihash.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MultihashError> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(MultihashError::InvalidLength(bytes.len().saturating_sub(2)));
        }
        let alg = HashAlg::from_code(bytes[0])?;
        if bytes[1] as usize != DIGEST_SIZE {
            return Err(MultihashError::InvalidLength(bytes[1] as usize));
        }
        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&bytes[2..]);
        Ok(Self { alg, digest })
    }

    /// Convert the digest to a hex string.
    pub fn to_hex(&self) -> String {
        data_encoding::HEXLOWER.encode(&self.digest)
    }

    /// Convert to a hex string limited to the first 5 bytes for a friendly
    /// string representation of the digest.
    pub fn fmt_short(&self) -> String {
        data_encoding::HEXLOWER.encode(&self.digest[..5])
    }
}

impl AsRef<[u8]> for Multihash {
    fn as_ref(&self) -> &[u8] {
        &self.digest
    }
}

impl PartialOrd for Multihash {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Multihash {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.alg
            .cmp(&other.alg)
            .then_with(|| self.digest.cmp(&other.digest))
    }
}

impl fmt::Display for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_known_value() {
        // BLAKE3 hash of "hello" is well-known
        let hash = HashAlg::Blake3.digest(b"hello");
        let expected_hex = "ea8f163db38682925e4491c5e58d4bb3506ef8c14eb78a86e908c5624a67200f";
        assert_eq!(hash.to_hex(), expected_hex);
    }

    #[test]
    fn test_sha256_known_value() {
        let hash = HashAlg::Sha2_256.digest(b"hello");
        let expected_hex = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(hash.to_hex(), expected_hex);
    }

    #[test]
    fn test_same_input_different_alg() {
        let a = HashAlg::Blake3.digest(b"data");
        let b = HashAlg::Sha2_256.digest(b"data");
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_bytes_rejects_unknown_code() {
        let mut bytes = HashAlg::Blake3.digest(b"x").to_bytes();
        bytes[0] = 0x99;
        assert_eq!(
            Multihash::from_bytes(&bytes),
            Err(MultihashError::UnknownCode(0x99))
        );
    }

    #[test]
    fn test_from_bytes_rejects_truncated() {
        let bytes = HashAlg::Blake3.digest(b"x").to_bytes();
        assert!(Multihash::from_bytes(&bytes[..20]).is_err());
    }

    #[test]
    fn test_fmt_short() {
        let hash = HashAlg::Blake3.digest(b"hello");
        let short = hash.fmt_short();
        // fmt_short returns first 5 bytes as hex (10 chars)
        assert_eq!(short.len(), 10);
        assert!(hash.to_hex().starts_with(&short));
    }

    #[test]
    fn test_debug() {
        let hash = HashAlg::Blake3.digest(b"test");
        let debug = format!("{:?}", hash);
        assert!(debug.starts_with("Multihash("));
        assert!(debug.contains(&hash.to_hex()));
    }
}
