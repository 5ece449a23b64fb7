//! `pva vault ...`: vault management subcommands.

use crate::cli::output;
use crate::cli::{confirm, login, open_engine, Cli, VaultAction};
use crate::errors::Result;

/// Dispatch a `vault` subcommand.
pub fn execute(cli: &Cli, action: &VaultAction) -> Result<()> {
    match action {
        VaultAction::List => execute_list(cli),
        VaultAction::Create { name } => execute_create(cli, name),
        VaultAction::Show { id, reveal } => execute_show(cli, *id, *reveal),
        VaultAction::Rename { id, name } => execute_rename(cli, *id, name),
        VaultAction::Share { id, username } => execute_share(cli, *id, username),
        VaultAction::Delete { id, force } => execute_delete(cli, *id, *force),
    }
}

fn execute_list(cli: &Cli) -> Result<()> {
    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;

    let vaults = engine.list_vaults(&session.user)?;
    output::print_vaults_table(&vaults, session.user.id);
    Ok(())
}

fn execute_create(cli: &Cli, name: &str) -> Result<()> {
    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;

    let vault = engine.create_vault(name, &session.user, &session.master_key)?;

    output::success(&format!("Created vault '{}' (id {})", vault.name, vault.id));
    output::tip(&format!(
        "Run `pva password add {} <NAME>` to store a password.",
        vault.id
    ));
    Ok(())
}

fn execute_show(cli: &Cli, id: i64, reveal: bool) -> Result<()> {
    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;

    let vault = engine.get_vault(id, &session.user, &session.master_key)?;
    output::print_passwords_table(&vault, reveal);
    Ok(())
}

fn execute_rename(cli: &Cli, id: i64, name: &str) -> Result<()> {
    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;

    engine.rename_vault(id, &session.user, name)?;
    output::success(&format!("Renamed vault {id} to '{name}'"));
    Ok(())
}

fn execute_share(cli: &Cli, id: i64, username: &str) -> Result<()> {
    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;
    let target = engine.user_by_username(username)?;

    engine.share_vault(id, &session.user, &session.master_key, &target)?;
    output::success(&format!("Shared vault {id} with '{}'", target.username));
    Ok(())
}

fn execute_delete(cli: &Cli, id: i64, force: bool) -> Result<()> {
    if !force && !confirm(&format!("Delete vault {id} and all of its passwords?"))? {
        output::info("Cancelled.");
        return Ok(());
    }

    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;

    engine.delete_vault(id, &session.user)?;
    output::success(&format!("Deleted vault {id}"));
    Ok(())
}
