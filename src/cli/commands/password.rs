//! `pva password ...`: entries inside a vault.

use crate::cli::output;
use crate::cli::{confirm, login, open_engine, read_secret_value, Cli, PasswordAction};
use crate::errors::Result;
use crate::vault::{NewPassword, PasswordUpdate};

/// Dispatch a `password` subcommand.
pub fn execute(cli: &Cli, action: &PasswordAction) -> Result<()> {
    match action {
        PasswordAction::Add {
            vault,
            name,
            description,
        } => execute_add(cli, *vault, name, description),
        PasswordAction::Update {
            vault,
            id,
            name,
            description,
            secret,
        } => execute_update(cli, *vault, *id, name.clone(), description.clone(), *secret),
        PasswordAction::Delete { vault, id, force } => execute_delete(cli, *vault, *id, *force),
    }
}

fn execute_add(cli: &Cli, vault_id: i64, name: &str, description: &str) -> Result<()> {
    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;
    let value = read_secret_value(name)?;

    let id = engine.create_password(
        vault_id,
        &session.user,
        &session.master_key,
        NewPassword {
            name: name.to_string(),
            description: description.to_string(),
            password: value,
        },
    )?;

    output::success(&format!("Added '{name}' to vault {vault_id} (id {id})"));
    Ok(())
}

fn execute_update(
    cli: &Cli,
    vault_id: i64,
    id: i64,
    name: Option<String>,
    description: Option<String>,
    secret: bool,
) -> Result<()> {
    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;

    let password = if secret {
        Some(read_secret_value(&format!("password {id}"))?)
    } else {
        None
    };

    engine.update_password(
        vault_id,
        id,
        &session.user,
        &session.master_key,
        PasswordUpdate {
            name,
            description,
            password,
        },
    )?;

    output::success(&format!("Updated password {id} in vault {vault_id}"));
    Ok(())
}

fn execute_delete(cli: &Cli, vault_id: i64, id: i64, force: bool) -> Result<()> {
    if !force && !confirm(&format!("Delete password {id} from vault {vault_id}?"))? {
        output::info("Cancelled.");
        return Ok(());
    }

    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;

    engine.delete_password(vault_id, id, &session.user)?;
    output::success(&format!("Deleted password {id}"));
    Ok(())
}
