//! Decrypted views handed back to callers, and the inputs for writes.
//!
//! Nothing here carries ciphertext: the engine only returns plain data.
//! Password values are `Zeroizing` so they are wiped when the caller is
//! done with them.

use std::fmt;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

/// A vault with every password decrypted.
#[derive(Debug)]
pub struct Vault {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub passwords: Vec<Password>,
}

/// A decrypted password entry.
pub struct Password {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub password: Zeroizing<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("password", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Vault listing entry; produced without any decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSummary {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
}

/// Input for `VaultEngine::create_password`.
pub struct NewPassword {
    pub name: String,
    pub description: String,
    pub password: Zeroizing<String>,
}

/// Input for `VaultEngine::update_password`.
///
/// `None` and empty strings both mean "unchanged".  Leaving `password`
/// unchanged skips the vault key unwrap entirely.
#[derive(Default)]
pub struct PasswordUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub password: Option<Zeroizing<String>>,
}
