//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::store::Device;
use crate::vault::{Vault, VaultSummary};

/// Shown in place of a password value unless `--reveal` is passed.
const MASK: &str = "********";

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print the vaults a user can open (Id, Name, Owner).
pub fn print_vaults_table(vaults: &[VaultSummary], viewer_id: i64) {
    if vaults.is_empty() {
        info("You have no vaults yet.");
        tip("Run `pva vault create <NAME>` to create one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Name", "Owner"]);

    for v in vaults {
        let owner = if v.owner_id == viewer_id {
            "you".to_string()
        } else {
            format!("user {}", v.owner_id)
        };
        table.add_row(vec![v.id.to_string(), v.name.clone(), owner]);
    }

    println!("{table}");
}

/// Print a decrypted vault's passwords, masked unless `reveal` is set.
pub fn print_passwords_table(vault: &Vault, reveal: bool) {
    println!(
        "{} {} {}",
        style("Vault").bold(),
        style(&vault.name).cyan().bold(),
        style(format!("(id {})", vault.id)).dim()
    );

    if vault.passwords.is_empty() {
        info("No passwords in this vault yet.");
        tip(&format!(
            "Run `pva password add {} <NAME>` to add one.",
            vault.id
        ));
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Name", "Description", "Password", "Updated"]);

    for p in &vault.passwords {
        let value = if reveal {
            p.password.to_string()
        } else {
            MASK.to_string()
        };
        table.add_row(vec![
            p.id.to_string(),
            p.name.clone(),
            p.description.clone(),
            value,
            p.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print the saved device inventory (Id, Address, Name, Description).
pub fn print_devices_table(devices: &[Device]) {
    if devices.is_empty() {
        info("No saved devices.");
        tip("Run `pva device add <IP> <NAME>` to save one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Address", "Name", "Description"]);

    for d in devices {
        table.add_row(vec![
            d.id.to_string(),
            d.ip.clone(),
            d.name.clone(),
            d.description.clone(),
        ]);
    }

    println!("{table}");
}
