//! CLI module: Clap argument parser, session helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::MasterKey;
use crate::errors::{PvaError, Result};
use crate::store::{SqliteStore, User};
use crate::vault::VaultEngine;

/// Minimum login password length for new accounts.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable holding the login password (scripts and CI).
pub const PASSWORD_ENV: &str = "PVA_PASSWORD";

/// pva: multi-user password vault with per-user key wrapping.
#[derive(Parser)]
#[command(name = "pva", about = "Multi-user encrypted password vault", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory holding the database and pva.toml (default: .pva)
    #[arg(long, default_value = ".pva", global = true)]
    pub data_dir: String,

    /// User to act as
    #[arg(short, long, env = "PVA_USER", global = true)]
    pub user: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create an account (the first account becomes admin)
    Register {
        /// Username (letters, digits, '_', '-', '.')
        username: String,
    },

    /// Change another user's role (admin, manager, viewer)
    Role {
        /// User whose role changes
        username: String,
        /// New role
        role: String,
    },

    /// Manage vaults
    Vault {
        #[command(subcommand)]
        action: VaultAction,
    },

    /// Manage passwords inside a vault
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },

    /// Manage the saved device inventory
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },
}

/// Vault subcommands.
#[derive(clap::Subcommand)]
pub enum VaultAction {
    /// List the vaults you can open
    List,

    /// Create a new vault
    Create {
        /// Vault name (unique among your vaults)
        name: String,
    },

    /// Show a vault and its passwords
    Show {
        /// Vault id
        id: i64,
        /// Print password values instead of masking them
        #[arg(long)]
        reveal: bool,
    },

    /// Rename a vault
    Rename {
        /// Vault id
        id: i64,
        /// New name
        name: String,
    },

    /// Give another user access to a vault
    Share {
        /// Vault id
        id: i64,
        /// User to share with
        username: String,
    },

    /// Delete a vault and every password in it
    Delete {
        /// Vault id
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Password subcommands.
#[derive(clap::Subcommand)]
pub enum PasswordAction {
    /// Add a password (value read from stdin or prompted)
    Add {
        /// Vault id
        vault: i64,
        /// Entry name
        name: String,
        /// Free-form description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Update fields of a password entry
    Update {
        /// Vault id
        vault: i64,
        /// Password entry id
        id: i64,
        /// New entry name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
        /// Replace the password value (read from stdin or prompted)
        #[arg(long)]
        secret: bool,
    },

    /// Delete a password entry
    Delete {
        /// Vault id
        vault: i64,
        /// Password entry id
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Device subcommands.
#[derive(clap::Subcommand)]
pub enum DeviceAction {
    /// List saved devices
    List,

    /// Save a device
    Add {
        /// IPv4 or IPv6 address
        ip: String,
        /// Device name
        name: String,
        /// Free-form description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Replace a saved device's address, name, and description
    Update {
        /// Device id
        id: i64,
        /// IPv4 or IPv6 address
        ip: String,
        /// Device name
        name: String,
        /// Free-form description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Delete a saved device
    Delete {
        /// Device id
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// A logged-in user and the master key derived from their password.
pub struct Session {
    pub user: User,
    pub master_key: MasterKey,
}

/// Get the login password from `PVA_PASSWORD`, falling back to a hidden
/// prompt.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter login password")
        .interact()
        .map_err(|e| PvaError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new login password with confirmation (used by `register`).
///
/// Also respects `PVA_PASSWORD`.  Enforces a minimum length.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            let pw = Zeroizing::new(pw);
            check_password_len(&pw)?;
            return Ok(pw);
        }
    }

    loop {
        let password = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose login password")
                .with_confirmation(
                    "Confirm login password",
                    "Passwords do not match, try again",
                )
                .interact()
                .map_err(|e| PvaError::CommandFailed(format!("password prompt: {e}")))?,
        );

        if check_password_len(&password).is_err() {
            output::warning(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(password);
    }
}

fn check_password_len(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PvaError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Read a stored password value: piped stdin when available, otherwise a
/// hidden prompt.
pub fn read_secret_value(name: &str) -> Result<Zeroizing<String>> {
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim_end_matches(['\r', '\n']);
        return Ok(Zeroizing::new(trimmed.to_string()));
    }

    let value = dialoguer::Password::new()
        .with_prompt(format!("Enter value for {name}"))
        .interact()
        .map_err(|e| PvaError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(value))
}

/// Ask for a yes/no confirmation, defaulting to "no".
pub fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| PvaError::CommandFailed(format!("confirm prompt: {e}")))
}

/// The data directory from the CLI arguments.
pub fn data_dir(cli: &Cli) -> PathBuf {
    PathBuf::from(&cli.data_dir)
}

/// Load settings, open the database, and build an engine.
///
/// The data directory is created on first use.
pub fn open_engine(cli: &Cli) -> Result<VaultEngine<SqliteStore>> {
    let dir = data_dir(cli);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        tracing::info!(path = %dir.display(), "created data directory");
    }

    let settings = Settings::load(&dir)?;
    let store = SqliteStore::open(&settings.database_path(&dir))?;
    VaultEngine::new(store, settings.argon2_params())
}

/// The `--user` argument, or an error telling the caller to pass one.
pub fn require_username(cli: &Cli) -> Result<&str> {
    cli.user.as_deref().ok_or_else(|| {
        PvaError::Validation("no user given; pass --user <NAME> or set PVA_USER".into())
    })
}

/// Authenticate the `--user` account with the login password.
pub fn login(cli: &Cli, engine: &VaultEngine<SqliteStore>) -> Result<Session> {
    let username = require_username(cli)?;
    let password = prompt_password()?;
    let (user, master_key) = engine.verify_credentials(username, &password)?;
    Ok(Session { user, master_key })
}
