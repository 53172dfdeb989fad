//! Content identifiers for DAG objects.
//!
//! A [`Cid`] is the sha2-256 multihash of an object's canonical bytes. Its
//! text form is the base-58 (bitcoin alphabet) rendering of the multihash
//! bytes, without any multibase prefix.

use multibase::Base;
use multihash::Multihash;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Multicodec code of sha2-256.
pub const SHA2_256: u64 = 0x12;

/// Length in bytes of a sha2-256 digest.
pub const DIGEST_LEN: usize = 32;

/// Errors produced when parsing a content identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidError {
    #[error("invalid base58 text: {0}")]
    InvalidBase58(String),

    #[error("invalid multihash: {0}")]
    InvalidMultihash(String),

    #[error("unsupported hash function code 0x{0:x}")]
    UnsupportedCode(u64),

    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },
}

/// A content identifier: the sha2-256 digest of an object's canonical form.
///
/// Two objects with identical canonical bytes always share a `Cid`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid([u8; DIGEST_LEN]);

impl Cid {
    /// Compute the identifier of arbitrary bytes.
    pub fn hash(data: &[u8]) -> Self {
        let result = Sha256::digest(data);
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&result);
        Cid(digest)
    }

    /// Create an identifier from a raw sha2-256 digest.
    pub fn from_digest(digest: [u8; DIGEST_LEN]) -> Self {
        Cid(digest)
    }

    /// The raw digest bytes.
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Multihash byte form: `code ‖ length ‖ digest`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(DIGEST_LEN + 2);
        // Both varints fit in a single byte.
        bytes.push(SHA2_256 as u8);
        bytes.push(DIGEST_LEN as u8);
        bytes.extend_from_slice(&self.0);
        bytes
    }

    /// Parse the multihash byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CidError> {
        let mh = Multihash::<64>::from_bytes(bytes)
            .map_err(|e| CidError::InvalidMultihash(e.to_string()))?;

        if mh.code() != SHA2_256 {
            return Err(CidError::UnsupportedCode(mh.code()));
        }

        let digest = mh.digest();
        if digest.len() != DIGEST_LEN {
            return Err(CidError::InvalidDigestLength {
                expected: DIGEST_LEN,
                actual: digest.len(),
            });
        }

        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(digest);
        Ok(Cid(out))
    }

    /// Render as base-58 text.
    pub fn to_base58(&self) -> String {
        Base::Base58Btc.encode(self.to_bytes())
    }

    /// Parse base-58 text.
    pub fn from_base58(text: &str) -> Result<Self, CidError> {
        let bytes = Base::Base58Btc
            .decode(text)
            .map_err(|e| CidError::InvalidBase58(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Truncated text form for log lines.
    pub fn short(&self) -> String {
        let text = self.to_base58();
        text[..text.len().min(10)].to_string()
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({}...)", self.short())
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl FromStr for Cid {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cid::from_base58(s)
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = serde_bytes::ByteBuf::deserialize(deserializer)?;
        Cid::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"hello world";
        assert_eq!(Cid::hash(data), Cid::hash(data));
    }

    #[test]
    fn test_hash_different_data() {
        assert_ne!(Cid::hash(b"hello"), Cid::hash(b"world"));
    }

    #[test]
    fn test_base58_roundtrip() {
        let cid = Cid::hash(b"test data");
        let text = cid.to_base58();
        assert_eq!(Cid::from_base58(&text).unwrap(), cid);
        assert_eq!(text.parse::<Cid>().unwrap(), cid);
    }

    #[test]
    fn test_sha256_text_form_starts_with_qm() {
        // 0x12 0x20 prefixes always render with a leading "Qm".
        let text = Cid::hash(b"anything").to_base58();
        assert!(text.starts_with("Qm"));
        assert_eq!(text.len(), 46);
    }

    #[test]
    fn test_rejects_malformed_text() {
        assert!(matches!(
            Cid::from_base58("not-base58!!"),
            Err(CidError::InvalidBase58(_))
        ));
        assert!(Cid::from_base58("").is_err());
    }

    #[test]
    fn test_rejects_wrong_code() {
        // identity hash (0x00) with a 32 byte digest
        let mut bytes = vec![0x00, 0x20];
        bytes.extend_from_slice(&[7u8; 32]);
        assert_eq!(Cid::from_bytes(&bytes), Err(CidError::UnsupportedCode(0)));
    }

    #[test]
    fn test_rejects_short_digest() {
        let bytes = vec![0x12, 0x04, 1, 2, 3, 4];
        assert_eq!(
            Cid::from_bytes(&bytes),
            Err(CidError::InvalidDigestLength {
                expected: 32,
                actual: 4
            })
        );
    }

    #[test]
    fn test_display_is_base58() {
        let cid = Cid::hash(b"x");
        assert_eq!(cid.to_string(), cid.to_base58());
        assert!(format!("{:?}", cid).starts_with("Cid(Qm"));
    }
}
