//! Cryptographic primitives for pva.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption with associated data (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)
//! - Erase-on-drop key containers and HKDF (`keys`)
//! - X25519 key pairs and sealed-box key wrapping (`keypair`)

pub mod encryption;
pub mod kdf;
pub mod keypair;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, wrap_key, ...};
pub use encryption::{decrypt, encrypt};
pub use kdf::{derive_master_key_with_params, generate_salt, Argon2Params};
pub use keypair::{unwrap_key, wrap_key, KeyPair, PrivateKey, PublicKey};
pub use keys::{MasterKey, SymmetricKey};
