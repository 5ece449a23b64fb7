//! Rows exchanged with the record store.
//!
//! Nothing here is secret: byte fields are salts, public keys, or
//! ciphertexts, and are persisted byte-exact.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::access::Role;

/// A registered user, as persisted.
#[derive(Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub salt: Vec<u8>,
    pub public_key: Vec<u8>,
    /// Private key sealed under the key derived from the login password.
    pub private_key_ciphertext: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// A user row before it has an id.
pub struct NewUser {
    pub username: String,
    pub role: Role,
    pub salt: Vec<u8>,
    pub public_key: Vec<u8>,
    pub private_key_ciphertext: Vec<u8>,
}

/// A vault row (no passwords, no key material).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultRecord {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
}

/// A vault key wrapped for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub user_id: i64,
    pub vault_id: i64,
    pub wrapped_key: Vec<u8>,
}

/// A stored password entry with its secret still sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordRecord {
    pub id: i64,
    pub vault_id: i64,
    pub name: String,
    pub description: String,
    pub ciphertext: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A password row before it has an id.
pub struct NewPasswordRecord {
    pub vault_id: i64,
    pub name: String,
    pub description: String,
    pub ciphertext: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Field-sparse password update: `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct PasswordChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ciphertext: Option<Vec<u8>>,
}

/// A vault joined with the caller's wrapped key and all its passwords.
#[derive(Debug, Clone)]
pub struct VaultWithPasswords {
    pub vault: VaultRecord,
    pub wrapped_key: Vec<u8>,
    pub passwords: Vec<PasswordRecord>,
}

/// A saved network device.  Inventory only; nothing here is encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: i64,
    pub ip: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewDevice {
    pub ip: String,
    pub name: String,
    pub description: String,
}
