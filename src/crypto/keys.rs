//! Erase-on-drop key containers and HKDF-SHA256 sub-key derivation.
//!
//! Every secret that passes through the engine lives in one of these
//! types, so the memory is wiped when the owning call returns.

use std::fmt;

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{PvaError, Result};

/// Length of symmetric keys and derived sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

/// A user's session-scoped key, derived from their login password.
///
/// Never persisted.  Callers hold it for the lifetime of a session and
/// pass it by reference into each engine call.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey").finish_non_exhaustive()
    }
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; KEY_LEN] {
        &mut self.bytes
    }
}

/// A vault's symmetric data key.
///
/// Identical across every grant of the same vault; only its wrapping
/// differs per recipient.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LEN],
}

impl SymmetricKey {
    /// Generate a fresh random key from the CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Rebuild a key from unwrapped bytes.  Anything but 32 bytes is
    /// treated as a failed unwrap.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| PvaError::DecryptionFailed)?;
        Ok(Self { bytes })
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

/// Run HKDF-SHA256 extract-and-expand into a 32-byte key.
///
/// Used to turn a raw Diffie-Hellman output into an AES key, so unlike a
/// KDF over a password the extract step is not skipped.
pub fn hkdf_derive(ikm: &[u8], salt: &[u8], info: &[u8]) -> Result<SymmetricKey> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);

    let mut okm = SymmetricKey {
        bytes: [0u8; KEY_LEN],
    };
    hk.expand(info, &mut okm.bytes)
        .map_err(|e| PvaError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}
