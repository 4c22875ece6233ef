//! Canonical encoding, hashing, and Ed25519 signing primitives shared by
//! the envelope builder and the validator.

pub mod canon;
pub mod error;
pub mod hash;
pub mod signer;

pub use canon::canonical_bytes;
pub use error::{CryptoError, CryptoResult};
pub use hash::{sha256_hex, sha256_prefixed};
pub use signer::{load_private_key, sign, verify, PrivateKey, PublicKey};
