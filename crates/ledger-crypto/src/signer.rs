//! Ed25519 key loading, signing, and verification.
//!
//! Signatures and the public key wire form use base64, not hex — this is
//! the one place this crate deliberately departs from the rest of the
//! workspace's hex convention, to match the wire contract this ledger
//! was built against.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};

use crate::error::{CryptoError, CryptoResult};

const SIGNATURE_PREFIX: &str = "ed25519:";

/// An Ed25519 signing key, loaded once at startup and held for the life
/// of the process. Never serialized, logged, or persisted by this crate.
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    pub fn verifying_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").finish_non_exhaustive()
    }
}

/// An Ed25519 verifying (public) key.
#[derive(Debug, Clone, Copy)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> CryptoResult<Self> {
        let verifying_key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| CryptoError::KeyFormat(e.to_string()))?;
        Ok(Self { verifying_key })
    }
}

/// Decodes `b64` to a 32-byte Ed25519 seed and builds a signing key.
/// Any length other than 32 bytes after decoding fails with `KeyFormat`.
pub fn load_private_key(b64: &str) -> CryptoResult<PrivateKey> {
    let bytes = BASE64
        .decode(b64.trim())
        .map_err(|e| CryptoError::KeyFormat(e.to_string()))?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|v: Vec<u8>| CryptoError::KeyFormat(format!("expected 32 bytes, got {}", v.len())))?;
    Ok(PrivateKey {
        signing_key: SigningKey::from_bytes(&seed),
    })
}

/// Signs `bytes`, returning a base64-encoded, `"ed25519:"`-prefixed signature.
pub fn sign(key: &PrivateKey, bytes: &[u8]) -> String {
    let signature = key.signing_key.sign(bytes);
    format!("{SIGNATURE_PREFIX}{}", BASE64.encode(signature.to_bytes()))
}

/// Validates the signature envelope's prefix, base64-decodes it, and
/// verifies it against `bytes` under `public_key`. Any malformed input or
/// cryptographic failure is treated uniformly as verification failure.
pub fn verify(public_key: &PublicKey, bytes: &[u8], signature_string: &str) -> bool {
    try_verify(public_key, bytes, signature_string).unwrap_or(false)
}

fn try_verify(public_key: &PublicKey, bytes: &[u8], signature_string: &str) -> CryptoResult<bool> {
    let encoded = signature_string
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| CryptoError::Signature("missing ed25519: prefix".to_string()))?;
    let decoded = BASE64
        .decode(encoded)
        .map_err(|e| CryptoError::Signature(e.to_string()))?;
    let sig_bytes: [u8; 64] = decoded
        .try_into()
        .map_err(|v: Vec<u8>| CryptoError::Signature(format!("expected 64 bytes, got {}", v.len())))?;
    let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    Ok(public_key.verifying_key.verify(bytes, &signature).is_ok())
}
