use thiserror::Error;

use crate::access::Permission;

/// All errors that can occur in pva.
#[derive(Debug, Error)]
pub enum PvaError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Carries no cause; which layer of the unwrap chain failed is not
    /// observable.
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Identity and access errors ---
    /// Returned both for an unknown username and for a wrong password.
    #[error("Invalid username or password")]
    AuthenticationFailed,

    #[error("Permission denied: {0} is required")]
    Forbidden(Permission),

    // --- Record errors ---
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    // --- Store errors ---
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for pva results.
pub type Result<T> = std::result::Result<T, PvaError>;
