//! Persistent record store.
//!
//! The engine talks to durable storage only through `RecordStore`.  A
//! store signals `NotFound` for missing rows and `Conflict` for
//! uniqueness violations, and must make each multi-row write atomic.
//! Implementations are shared across threads; any read-then-write the
//! engine relies on lives inside a single store call.
//! `SqliteStore` is the bundled implementation.

mod records;
mod sqlite;

pub use records::{
    Device, Grant, NewDevice, NewPasswordRecord, NewUser, PasswordChanges, PasswordRecord, User,
    VaultRecord, VaultWithPasswords,
};
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::access::Role;
use crate::errors::Result;

/// Abstraction over durable storage of users, vaults, grants, and passwords.
pub trait RecordStore: Send + Sync {
    /// Insert a user.  `Conflict` if the username is taken.
    fn insert_user(&self, user: NewUser) -> Result<User>;

    /// Insert a user, storing `first_role` instead of `user.role` when no
    /// user exists yet.  The emptiness check and the insert are atomic, so
    /// at most one user ever receives `first_role` this way.  Returns the
    /// user with the role actually stored.
    fn insert_user_with_first_role(&self, user: NewUser, first_role: Role) -> Result<User>;

    fn get_user(&self, id: i64) -> Result<User>;

    fn get_user_by_username(&self, username: &str) -> Result<User>;

    fn set_user_role(&self, id: i64, role: Role) -> Result<()>;

    /// Insert a vault and its owner's grant in one transaction.
    /// `Conflict` if the owner already has a vault with that name.
    fn insert_vault_and_grant(
        &self,
        name: &str,
        owner_id: i64,
        wrapped_key: &[u8],
    ) -> Result<VaultRecord>;

    /// Insert grants in one transaction.  Existing (user, vault) pairs
    /// are left untouched.
    fn insert_grants(&self, grants: &[Grant]) -> Result<()>;

    /// The vault key wrapped for `user_id`.  `NotFound` without a grant.
    fn get_grant(&self, vault_id: i64, user_id: i64) -> Result<Vec<u8>>;

    fn has_grant(&self, vault_id: i64, user_id: i64) -> Result<bool>;

    fn get_vault(&self, id: i64) -> Result<VaultRecord>;

    /// Vaults `user_id` holds a grant for, ordered by name.
    fn list_vaults_for_user(&self, user_id: i64) -> Result<Vec<VaultRecord>>;

    /// One vault with the caller's grant and passwords.  `NotFound` if the
    /// vault is missing or the caller holds no grant for it.
    fn get_vault_with_passwords(&self, vault_id: i64, user_id: i64)
        -> Result<VaultWithPasswords>;

    /// Every vault `user_id` holds a grant for, with passwords.
    fn list_vaults_with_passwords(&self, user_id: i64) -> Result<Vec<VaultWithPasswords>>;

    fn update_vault(&self, id: i64, name: &str) -> Result<()>;

    /// Delete a vault; its passwords and grants go with it.
    fn delete_vault(&self, id: i64) -> Result<()>;

    fn insert_password(&self, password: NewPasswordRecord) -> Result<PasswordRecord>;

    fn get_password(&self, vault_id: i64, id: i64) -> Result<PasswordRecord>;

    fn update_password_fields(
        &self,
        vault_id: i64,
        id: i64,
        changes: &PasswordChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    fn delete_password(&self, vault_id: i64, id: i64) -> Result<()>;

    /// `Conflict` if a device with the same address is already saved.
    fn insert_device(&self, device: NewDevice) -> Result<Device>;

    fn list_devices(&self) -> Result<Vec<Device>>;

    /// Overwrite every field of the device with `device.id`.
    fn update_device(&self, device: &Device) -> Result<()>;

    fn delete_device(&self, id: i64) -> Result<()>;
}
