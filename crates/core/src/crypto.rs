//! Ed25519 signing identity for the ledger.
//!
//! Each ledger process owns exactly one [`KeyManager`]. Entries carry the
//! public key they were signed with, so verification never needs access to
//! the key manager that produced them.

use crate::hash::{decode_canonical_hex, Hash};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("signature verification failed")]
    VerificationFailed,
}

/// An Ed25519 signature over an entry hash.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Create a signature from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a lowercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = decode_canonical_hex(s).map_err(|_| CryptoError::InvalidSignature)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(arr))
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Signature::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A public key for signature verification.
#[derive(Clone)]
pub struct PublicKey(pub VerifyingKey);

impl PublicKey {
    /// Get the raw bytes of the public key.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Parse from a lowercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = decode_canonical_hex(s).map_err(|_| CryptoError::InvalidPublicKey)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&arr)
            .map(PublicKey)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Verify a signature over a hash.
    pub fn verify(&self, hash: &Hash, signature: &Signature) -> Result<(), CryptoError> {
        let sig = DalekSignature::from_bytes(&signature.0);
        self.0
            .verify(hash.as_bytes(), &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0.as_bytes()[..8]))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes() == other.0.as_bytes()
    }
}

impl Eq for PublicKey {}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The process signing identity.
pub struct KeyManager {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl KeyManager {
    /// Generate a fresh keypair from the operating system RNG.
    ///
    /// Fails only if the RNG cannot produce entropy; callers treat that as
    /// fatal since the ledger cannot run without a signing identity.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Ok(Self::from_secret(&seed))
    }

    /// Rebuild a key manager from a 32-byte secret.
    pub fn from_secret(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let public_key = PublicKey(signing_key.verifying_key());
        Self {
            signing_key,
            public_key,
        }
    }

    /// The public half of the keypair.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Sign a hash.
    pub fn sign(&self, hash: &Hash) -> Signature {
        Signature(self.signing_key.sign(hash.as_bytes()).to_bytes())
    }

    /// Check `signature` over `hash` against an arbitrary public key.
    pub fn verify(hash: &Hash, signature: &Signature, public_key: &PublicKey) -> bool {
        public_key.verify(hash, signature).is_ok()
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("public_key", &self.public_key)
            .finish()
    }
}
