//! `pva device ...`: the saved device inventory.

use crate::cli::output;
use crate::cli::{confirm, login, open_engine, Cli, DeviceAction};
use crate::errors::Result;
use crate::store::{Device, NewDevice};

/// Dispatch a `device` subcommand.
pub fn execute(cli: &Cli, action: &DeviceAction) -> Result<()> {
    match action {
        DeviceAction::List => execute_list(cli),
        DeviceAction::Add {
            ip,
            name,
            description,
        } => execute_add(
            cli,
            NewDevice {
                ip: ip.clone(),
                name: name.clone(),
                description: description.clone(),
            },
        ),
        DeviceAction::Update {
            id,
            ip,
            name,
            description,
        } => execute_update(
            cli,
            Device {
                id: *id,
                ip: ip.clone(),
                name: name.clone(),
                description: description.clone(),
            },
        ),
        DeviceAction::Delete { id, force } => execute_delete(cli, *id, *force),
    }
}

fn execute_list(cli: &Cli) -> Result<()> {
    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;

    let devices = engine.list_devices(&session.user)?;
    output::print_devices_table(&devices);
    Ok(())
}

fn execute_add(cli: &Cli, device: NewDevice) -> Result<()> {
    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;

    let saved = engine.create_device(&session.user, device)?;
    output::success(&format!(
        "Saved device '{}' at {} (id {})",
        saved.name, saved.ip, saved.id
    ));
    Ok(())
}

fn execute_update(cli: &Cli, device: Device) -> Result<()> {
    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;

    let id = device.id;
    engine.update_device(&session.user, device)?;
    output::success(&format!("Updated device {id}"));
    Ok(())
}

fn execute_delete(cli: &Cli, id: i64, force: bool) -> Result<()> {
    if !force && !confirm(&format!("Delete device {id}?"))? {
        output::info("Cancelled.");
        return Ok(());
    }

    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;

    engine.delete_device(&session.user, id)?;
    output::success(&format!("Deleted device {id}"));
    Ok(())
}
