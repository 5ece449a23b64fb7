//! Vault module: envelope-encrypted, shareable password vaults.
//!
//! This module provides:
//! - Decrypted `Vault` / `Password` views and write inputs (`model`)
//! - `VaultEngine`, which runs the key-unwrap chain around the store (`engine`)
//! - Device inventory operations on the same engine (`inventory`)

pub mod engine;
pub mod inventory;
pub mod model;

// Re-export the most commonly used items.
pub use engine::{validate_username, VaultEngine};
pub use model::{NewPassword, Password, PasswordUpdate, Vault, VaultSummary};
