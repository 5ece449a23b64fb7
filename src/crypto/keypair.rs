//! Per-user X25519 key pairs and sealed-box key wrapping.
//!
//! A vault key is wrapped for a recipient by running Diffie-Hellman
//! between a fresh ephemeral key and the recipient's public key, turning
//! the shared secret into an AES key with HKDF-SHA256, and sealing the
//! vault key with AES-256-GCM.  Only the matching private key can redo
//! the Diffie-Hellman step.
//!
//! Layout of a wrapped key:
//!   [ 32-byte ephemeral public key | 12-byte nonce | 32-byte key + 16-byte tag ]

use aes_gcm::aead::OsRng;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

use crate::errors::{PvaError, Result};

use super::encryption::{decrypt, encrypt, NONCE_LEN, TAG_LEN};
use super::keys::{hkdf_derive, SymmetricKey, KEY_LEN};

/// Length of an X25519 public or private key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Total length of a wrapped symmetric key.
pub const WRAPPED_KEY_LEN: usize = PUBLIC_KEY_LEN + NONCE_LEN + KEY_LEN + TAG_LEN;

const WRAP_INFO: &[u8] = b"pva-vault-key-wrap:v1";

/// A user's public key, safe to persist and share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(X25519Public);

impl PublicKey {
    /// Parse a stored 32-byte public key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| {
            PvaError::EncryptionFailed(format!(
                "public key must be {PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(X25519Public::from(bytes)))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        self.0.as_bytes()
    }
}

/// A user's private key.  The inner secret wipes itself on drop.
pub struct PrivateKey(StaticSecret);

impl PrivateKey {
    /// Rebuild a private key from decrypted bytes.  A wrong length is
    /// reported as a failed decryption.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: Zeroizing<[u8; PUBLIC_KEY_LEN]> = Zeroizing::new(
            bytes.try_into().map_err(|_| PvaError::DecryptionFailed)?,
        );
        Ok(Self(StaticSecret::from(*raw)))
    }

    /// Raw bytes for sealing under the owner's master key.
    pub fn to_bytes(&self) -> Zeroizing<[u8; PUBLIC_KEY_LEN]> {
        Zeroizing::new(self.0.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(X25519Public::from(&self.0))
    }
}

/// A freshly generated key pair, created once per user at registration.
pub struct KeyPair {
    pub private: PrivateKey,
    pub public: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let private = PrivateKey(random_secret());
        let public = private.public_key();
        Self { private, public }
    }
}

/// Draws the secret directly into a `StaticSecret`, which wipes it on drop.
fn random_secret() -> StaticSecret {
    StaticSecret::random_from_rng(OsRng)
}

/// Wrap `key` so that only the holder of `recipient`'s private key can
/// recover it.  Randomized: wrapping the same key twice gives different bytes.
pub fn wrap_key(key: &SymmetricKey, recipient: &PublicKey) -> Result<Vec<u8>> {
    let ephemeral = random_secret();
    let ephemeral_public = X25519Public::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(&recipient.0);
    if !shared.was_contributory() {
        return Err(PvaError::EncryptionFailed(
            "recipient public key is a low-order point".into(),
        ));
    }

    let kek = hkdf_derive(
        shared.as_bytes(),
        &wrap_salt(&ephemeral_public, &recipient.0),
        WRAP_INFO,
    )?;
    let sealed = encrypt(kek.as_bytes(), key.as_bytes(), &[])?;

    let mut output = Vec::with_capacity(PUBLIC_KEY_LEN + sealed.len());
    output.extend_from_slice(ephemeral_public.as_bytes());
    output.extend_from_slice(&sealed);
    Ok(output)
}

/// Recover a key produced by `wrap_key`.  Every failure, including a
/// mismatched private key, is the same `DecryptionFailed`.
pub fn unwrap_key(wrapped: &[u8], private: &PrivateKey) -> Result<SymmetricKey> {
    if wrapped.len() != WRAPPED_KEY_LEN {
        return Err(PvaError::DecryptionFailed);
    }

    let (ephemeral_bytes, sealed) = wrapped.split_at(PUBLIC_KEY_LEN);
    let ephemeral_bytes: [u8; PUBLIC_KEY_LEN] = ephemeral_bytes
        .try_into()
        .map_err(|_| PvaError::DecryptionFailed)?;
    let ephemeral_public = X25519Public::from(ephemeral_bytes);

    let shared = private.0.diffie_hellman(&ephemeral_public);
    if !shared.was_contributory() {
        return Err(PvaError::DecryptionFailed);
    }

    let recipient = X25519Public::from(&private.0);
    let kek = hkdf_derive(
        shared.as_bytes(),
        &wrap_salt(&ephemeral_public, &recipient),
        WRAP_INFO,
    )
    .map_err(|_| PvaError::DecryptionFailed)?;

    let raw = decrypt(kek.as_bytes(), sealed, &[])?;
    SymmetricKey::from_slice(&raw)
}

fn wrap_salt(ephemeral: &X25519Public, recipient: &X25519Public) -> [u8; 2 * PUBLIC_KEY_LEN] {
    let mut salt = [0u8; 2 * PUBLIC_KEY_LEN];
    salt[..PUBLIC_KEY_LEN].copy_from_slice(ephemeral.as_bytes());
    salt[PUBLIC_KEY_LEN..].copy_from_slice(recipient.as_bytes());
    salt
}
