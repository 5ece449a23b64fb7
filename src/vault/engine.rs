//! The vault engine: every encrypt and decrypt around the record store.
//!
//! Unwrap order for reads is master key -> private key -> vault key ->
//! password plaintext; writes run the same chain in reverse.  The engine
//! keeps no secrets between calls.  Each operation receives the caller's
//! master key by reference, and every intermediate key lives in an
//! erase-on-drop container that is wiped when the call returns.

use chrono::Utc;
use zeroize::{Zeroize, Zeroizing};

use crate::access::{Permission, Role};
use crate::crypto::kdf::{derive_master_key_with_params, generate_salt, Argon2Params, SALT_LEN};
use crate::crypto::{decrypt, encrypt, unwrap_key, wrap_key, KeyPair, MasterKey, PrivateKey};
use crate::crypto::{PublicKey, SymmetricKey};
use crate::errors::{PvaError, Result};
use crate::store::{
    Grant, NewPasswordRecord, NewUser, PasswordChanges, RecordStore, User, VaultWithPasswords,
};

use super::model::{NewPassword, Password, PasswordUpdate, Vault, VaultSummary};

/// Longest accepted username.
const MAX_USERNAME_LEN: usize = 64;

/// Longest accepted vault or password name.
const MAX_NAME_LEN: usize = 256;

/// Salt used to spend one key derivation when the username is unknown.
const DECOY_SALT: [u8; SALT_LEN] = [0u8; SALT_LEN];

/// Orchestrates key management over a `RecordStore`.
pub struct VaultEngine<S> {
    store: S,
    kdf: Argon2Params,
}

impl<S: RecordStore> VaultEngine<S> {
    /// Build an engine over `store`, deriving master keys with `kdf`.
    pub fn new(store: S, kdf: Argon2Params) -> Result<Self> {
        kdf.validate()?;
        Ok(Self { store, kdf })
    }

    /// The underlying record store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Check a username and password.
    ///
    /// Success proves the password by unsealing the user's private key; no
    /// password hash is stored or compared.  An unknown username, a wrong
    /// password, and a failed lookup all return `AuthenticationFailed`.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<(User, MasterKey)> {
        let user = match self.store.get_user_by_username(username) {
            Ok(user) => user,
            Err(err) => {
                if !matches!(err, PvaError::NotFound(_)) {
                    tracing::warn!(error = %err, "user lookup failed during credential check");
                }
                let _ = derive_master_key_with_params(password.as_bytes(), &DECOY_SALT, &self.kdf);
                return Err(PvaError::AuthenticationFailed);
            }
        };

        let master_key = self.derive_master_key(&user, password)?;
        if self.unlock_private_key(&user, &master_key).is_err() {
            tracing::warn!(user_id = user.id, "credential check failed");
            return Err(PvaError::AuthenticationFailed);
        }

        tracing::debug!(user_id = user.id, "credentials verified");
        Ok((user, master_key))
    }

    /// Derive `user`'s master key from a login password.  Does not check
    /// that the password is right; use `verify_credentials` for that.
    pub fn derive_master_key(&self, user: &User, password: &str) -> Result<MasterKey> {
        derive_master_key_with_params(password.as_bytes(), &user.salt, &self.kdf)
    }

    /// Register a user, choosing the role: the first user ever becomes
    /// Admin, everyone after gets the lowest role.
    ///
    /// The role is decided by the store in the same transaction as the
    /// insert, so concurrent first registrations yield a single Admin.
    pub fn register(&self, username: &str, password: &str) -> Result<User> {
        let new_user = self.seal_new_user(username, password, Role::LOWEST)?;
        let user = self
            .store
            .insert_user_with_first_role(new_user, Role::Admin)?;

        tracing::debug!(user_id = user.id, role = %user.role, "registered user");
        Ok(user)
    }

    /// Register a user with an explicit role.  `Conflict` on a taken name.
    pub fn register_user(&self, username: &str, password: &str, role: Role) -> Result<User> {
        let new_user = self.seal_new_user(username, password, role)?;
        let user = self.store.insert_user(new_user)?;

        tracing::debug!(user_id = user.id, %role, "registered user");
        Ok(user)
    }

    /// Generate a key pair and salt, and seal the private key under the
    /// key derived from `password`.
    fn seal_new_user(&self, username: &str, password: &str, role: Role) -> Result<NewUser> {
        validate_username(username)?;
        if password.is_empty() {
            return Err(PvaError::Validation("password cannot be empty".into()));
        }

        let key_pair = KeyPair::generate();
        let salt = generate_salt();
        let master_key = derive_master_key_with_params(password.as_bytes(), &salt, &self.kdf)?;

        let private_bytes = key_pair.private.to_bytes();
        let private_key_ciphertext = encrypt(
            master_key.as_bytes(),
            &private_bytes[..],
            &private_key_aad(username),
        )?;

        Ok(NewUser {
            username: username.to_string(),
            role,
            salt: salt.to_vec(),
            public_key: key_pair.public.as_bytes().to_vec(),
            private_key_ciphertext,
        })
    }

    pub fn user(&self, id: i64) -> Result<User> {
        self.store.get_user(id)
    }

    pub fn user_by_username(&self, username: &str) -> Result<User> {
        self.store.get_user_by_username(username)
    }

    /// Change another user's role.  Requires `ManageUsers`.
    pub fn set_user_role(&self, actor: &User, target_id: i64, role: Role) -> Result<()> {
        actor.role.require(Permission::ManageUsers)?;
        self.store.set_user_role(target_id, role)?;
        tracing::debug!(actor_id = actor.id, target_id, %role, "changed user role");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Vaults
    // ------------------------------------------------------------------

    /// Create a vault with a fresh key, granted to its owner.
    ///
    /// The vault row and the owner's grant land in one transaction.
    pub fn create_vault(
        &self,
        name: &str,
        owner: &User,
        owner_master_key: &MasterKey,
    ) -> Result<VaultSummary> {
        owner.role.require(Permission::ManagePasswords)?;
        validate_name("vault name", name)?;

        // The stored public key must belong to the private key this
        // session can unseal, or the owner could never open the vault.
        let private = self.unlock_private_key(owner, owner_master_key)?;
        let public = PublicKey::from_slice(&owner.public_key)?;
        if private.public_key() != public {
            return Err(PvaError::DecryptionFailed);
        }

        let vault_key = SymmetricKey::generate();
        let wrapped = wrap_key(&vault_key, &public)?;
        let record = self
            .store
            .insert_vault_and_grant(name, owner.id, &wrapped)?;

        tracing::debug!(vault_id = record.id, owner_id = owner.id, "created vault");
        Ok(VaultSummary {
            id: record.id,
            name: record.name,
            owner_id: record.owner_id,
        })
    }

    /// Grant `target` access to a vault the granter can already open.
    ///
    /// The vault key is recovered from the granter's own grant and
    /// re-wrapped for the target.  Sharing with someone who already has
    /// access is a no-op.
    pub fn share_vault(
        &self,
        vault_id: i64,
        granter: &User,
        granter_master_key: &MasterKey,
        target: &User,
    ) -> Result<()> {
        granter.role.require(Permission::ManagePasswords)?;

        let vault_key = self.vault_key(vault_id, granter, granter_master_key)?;
        let target_public = PublicKey::from_slice(&target.public_key)?;
        let wrapped_key = wrap_key(&vault_key, &target_public)?;

        self.store.insert_grants(&[Grant {
            user_id: target.id,
            vault_id,
            wrapped_key,
        }])?;

        tracing::debug!(vault_id, granter_id = granter.id, target_id = target.id, "shared vault");
        Ok(())
    }

    /// Vaults `user` can open, without decrypting anything.
    pub fn list_vaults(&self, user: &User) -> Result<Vec<VaultSummary>> {
        user.role.require(Permission::ViewPasswords)?;
        Ok(self
            .store
            .list_vaults_for_user(user.id)?
            .into_iter()
            .map(|v| VaultSummary {
                id: v.id,
                name: v.name,
                owner_id: v.owner_id,
            })
            .collect())
    }

    /// One vault with every password decrypted.
    pub fn get_vault(&self, vault_id: i64, user: &User, master_key: &MasterKey) -> Result<Vault> {
        user.role.require(Permission::ViewPasswords)?;
        let row = self.store.get_vault_with_passwords(vault_id, user.id)?;
        let private = self.unlock_private_key(user, master_key)?;
        decrypt_vault(row, &private)
    }

    /// Every vault `user` can open, decrypted.
    ///
    /// A single failed decryption aborts the whole read; partially
    /// decrypted results are never returned.
    pub fn get_vaults(&self, user: &User, master_key: &MasterKey) -> Result<Vec<Vault>> {
        user.role.require(Permission::ViewPasswords)?;
        let rows = self.store.list_vaults_with_passwords(user.id)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let private = self.unlock_private_key(user, master_key)?;
        rows.into_iter()
            .map(|row| decrypt_vault(row, &private))
            .collect()
    }

    pub fn rename_vault(&self, vault_id: i64, user: &User, name: &str) -> Result<()> {
        user.role.require(Permission::ManagePasswords)?;
        validate_name("vault name", name)?;
        self.require_grant(vault_id, user)?;
        self.store.update_vault(vault_id, name)
    }

    /// Delete a vault together with its passwords and grants.
    pub fn delete_vault(&self, vault_id: i64, user: &User) -> Result<()> {
        user.role.require(Permission::ManagePasswords)?;
        self.require_grant(vault_id, user)?;
        self.store.delete_vault(vault_id)?;
        tracing::debug!(vault_id, user_id = user.id, "deleted vault");
        Ok(())
    }

    /// Whether `user` can actually recover the vault key.
    ///
    /// Never raises: any failure along the unwrap chain is `false`.
    pub fn check_access(&self, vault_id: i64, user: &User, master_key: &MasterKey) -> bool {
        match self.vault_key(vault_id, user, master_key) {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(vault_id, user_id = user.id, error = %err, "access check denied");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Passwords
    // ------------------------------------------------------------------

    /// Add a password to a vault, sealed under the vault key.  Returns the
    /// new entry's id.
    pub fn create_password(
        &self,
        vault_id: i64,
        user: &User,
        master_key: &MasterKey,
        password: NewPassword,
    ) -> Result<i64> {
        user.role.require(Permission::ManagePasswords)?;
        validate_name("password name", &password.name)?;
        if password.password.is_empty() {
            return Err(PvaError::Validation("password value cannot be empty".into()));
        }

        let vault_key = self.vault_key(vault_id, user, master_key)?;
        let ciphertext = encrypt(
            vault_key.as_bytes(),
            password.password.as_bytes(),
            &password_aad(vault_id),
        )?;

        let record = self.store.insert_password(NewPasswordRecord {
            vault_id,
            name: password.name,
            description: password.description,
            ciphertext,
            created_at: Utc::now(),
        })?;

        tracing::debug!(vault_id, password_id = record.id, "created password");
        Ok(record.id)
    }

    /// Update the given fields of a password entry.
    ///
    /// Only a new password value is encrypted.  Without one, no key is
    /// unwrapped and the stored ciphertext is left byte-for-byte intact.
    pub fn update_password(
        &self,
        vault_id: i64,
        password_id: i64,
        user: &User,
        master_key: &MasterKey,
        update: PasswordUpdate,
    ) -> Result<()> {
        user.role.require(Permission::ManagePasswords)?;

        let name = update.name.filter(|s| !s.is_empty());
        let description = update.description.filter(|s| !s.is_empty());
        let new_secret = update.password.filter(|s| !s.is_empty());

        if name.is_none() && description.is_none() && new_secret.is_none() {
            return Err(PvaError::Validation("no fields to update".into()));
        }
        if let Some(name) = &name {
            validate_name("password name", name)?;
        }

        let ciphertext = match new_secret {
            Some(secret) => {
                let vault_key = self.vault_key(vault_id, user, master_key)?;
                Some(encrypt(
                    vault_key.as_bytes(),
                    secret.as_bytes(),
                    &password_aad(vault_id),
                )?)
            }
            None => {
                self.require_grant(vault_id, user)?;
                None
            }
        };

        let changes = PasswordChanges {
            name,
            description,
            ciphertext,
        };
        self.store
            .update_password_fields(vault_id, password_id, &changes, Utc::now())?;

        tracing::debug!(vault_id, password_id, "updated password");
        Ok(())
    }

    pub fn delete_password(&self, vault_id: i64, password_id: i64, user: &User) -> Result<()> {
        user.role.require(Permission::ManagePasswords)?;
        self.require_grant(vault_id, user)?;
        self.store.delete_password(vault_id, password_id)?;
        tracing::debug!(vault_id, password_id, "deleted password");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Unwrap chain
    // ------------------------------------------------------------------

    fn unlock_private_key(&self, user: &User, master_key: &MasterKey) -> Result<PrivateKey> {
        let raw = decrypt(
            master_key.as_bytes(),
            &user.private_key_ciphertext,
            &private_key_aad(&user.username),
        )?;
        PrivateKey::from_slice(&raw)
    }

    fn vault_key(&self, vault_id: i64, user: &User, master_key: &MasterKey) -> Result<SymmetricKey> {
        let wrapped = self.store.get_grant(vault_id, user.id)?;
        let private = self.unlock_private_key(user, master_key)?;
        unwrap_key(&wrapped, &private)
    }

    /// Grant check for operations that never touch key material.
    fn require_grant(&self, vault_id: i64, user: &User) -> Result<()> {
        if self.store.has_grant(vault_id, user.id)? {
            Ok(())
        } else {
            Err(PvaError::NotFound(format!("vault {vault_id}")))
        }
    }
}

fn decrypt_vault(row: VaultWithPasswords, private: &PrivateKey) -> Result<Vault> {
    let vault_key = unwrap_key(&row.wrapped_key, private)?;
    let aad = password_aad(row.vault.id);

    let passwords = row
        .passwords
        .into_iter()
        .map(|p| -> Result<Password> {
            let plaintext = decrypt(vault_key.as_bytes(), &p.ciphertext, &aad)?;
            let password = String::from_utf8(plaintext.to_vec()).map_err(|e| {
                let mut bad_bytes = e.into_bytes();
                bad_bytes.zeroize();
                PvaError::DecryptionFailed
            })?;
            Ok(Password {
                id: p.id,
                name: p.name,
                description: p.description,
                password: Zeroizing::new(password),
                created_at: p.created_at,
                updated_at: p.updated_at,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Vault {
        id: row.vault.id,
        name: row.vault.name,
        owner_id: row.vault.owner_id,
        passwords,
    })
}

/// Binds a sealed private key to its owner.
fn private_key_aad(username: &str) -> Vec<u8> {
    format!("pva:private-key:v1:{username}").into_bytes()
}

/// Binds a sealed password to the vault it belongs to.
fn password_aad(vault_id: i64) -> Vec<u8> {
    format!("pva:password:v1:{vault_id}").into_bytes()
}

/// Validate that a username is safe.
///
/// Allowed: ASCII letters, digits, underscores, hyphens, periods.
/// Must be non-empty and at most 64 characters.
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(PvaError::Validation("username cannot be empty".into()));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(PvaError::Validation(format!(
            "username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(PvaError::Validation(format!(
            "username '{username}' contains invalid characters"
        )));
    }
    Ok(())
}

pub(super) fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PvaError::Validation(format!("{kind} cannot be empty")));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(PvaError::Validation(format!(
            "{kind} cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_validated() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("bob.smith-2_x").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("slash/name").is_err());
        assert!(validate_username(&"a".repeat(65)).is_err());
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(validate_name("vault name", "Personal").is_ok());
        assert!(validate_name("vault name", "").is_err());
        assert!(validate_name("vault name", "   ").is_err());
    }

    #[test]
    fn associated_data_differs_per_context() {
        assert_ne!(password_aad(1), password_aad(2));
        assert_ne!(private_key_aad("alice"), private_key_aad("bob"));
    }
}
