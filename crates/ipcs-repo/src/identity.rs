//! Node identity: key pair, peer id and their portable config form.
//!
//! Keys are Ed25519. The peer id is the base-58 sha2-256 multihash of the
//! public key bytes, the same text form used for content identifiers.

use crate::error::{RepoError, Result};
use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{SigningKey, VerifyingKey, KEYPAIR_LENGTH};
use ipcs_dag::Cid;
use rand::rngs::StdRng;
use rand::{CryptoRng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier of a peer on the network.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    /// Derive the peer id of a public key.
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        PeerId(Cid::hash(key.as_bytes()).to_base58())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PeerId {
    type Err = RepoError;

    /// Accepts any well-formed base-58 multihash.
    fn from_str(s: &str) -> Result<Self> {
        Cid::from_base58(s).map_err(|e| RepoError::Config(format!("invalid peer id {}: {}", s, e)))?;
        Ok(PeerId(s.to_string()))
    }
}

/// A random source seeded from the current wall-clock time.
pub fn time_seeded_rng() -> Result<StdRng> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| RepoError::KeyGeneration(format!("clock before unix epoch: {}", e)))?
        .as_nanos();
    Ok(StdRng::seed_from_u64(nanos as u64))
}

/// The identity section of a node configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "PeerID")]
    pub peer_id: String,

    /// Base-64 of the 64-byte `secret ‖ public` key pair.
    #[serde(rename = "PrivKey")]
    pub priv_key: String,
}

impl Identity {
    /// Generate a fresh identity from a time-seeded random source.
    pub fn generate() -> Result<Self> {
        let mut rng = time_seeded_rng()?;
        Self::generate_with(&mut rng)
    }

    /// Generate a fresh identity from the given random source.
    pub fn generate_with<R: CryptoRng + RngCore>(rng: &mut R) -> Result<Self> {
        let signing_key = SigningKey::generate(rng);
        let identity = Self::from_signing_key(&signing_key);

        // The stored form has to decode back to the same key.
        let restored = identity
            .signing_key()
            .map_err(|e| RepoError::KeySerialization(e.to_string()))?;
        if restored.to_bytes() != signing_key.to_bytes() {
            return Err(RepoError::KeySerialization(
                "stored key does not decode to the generated key".to_string(),
            ));
        }

        Ok(identity)
    }

    /// Build the config form of an existing key.
    pub fn from_signing_key(key: &SigningKey) -> Self {
        Identity {
            peer_id: PeerId::from_public_key(&key.verifying_key()).0,
            priv_key: general_purpose::STANDARD.encode(key.to_keypair_bytes()),
        }
    }

    /// Decode the private key, checking it matches the configured peer id.
    pub fn signing_key(&self) -> Result<SigningKey> {
        let bytes = general_purpose::STANDARD
            .decode(&self.priv_key)
            .map_err(|e| RepoError::InvalidPrivateKey(e.to_string()))?;

        let pair: [u8; KEYPAIR_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            RepoError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                KEYPAIR_LENGTH,
                bytes.len()
            ))
        })?;

        let key = SigningKey::from_keypair_bytes(&pair)
            .map_err(|e| RepoError::InvalidPrivateKey(e.to_string()))?;

        let derived = PeerId::from_public_key(&key.verifying_key());
        if derived.as_str() != self.peer_id {
            return Err(RepoError::PeerIdMismatch {
                configured: self.peer_id.clone(),
                derived: derived.0,
            });
        }

        Ok(key)
    }

    /// The configured peer id, validated as a base-58 multihash.
    pub fn peer_id(&self) -> Result<PeerId> {
        self.peer_id.parse()
    }
}
