//! `pva register`: create a user account.

use crate::cli::output;
use crate::cli::{open_engine, prompt_new_password, Cli};
use crate::errors::Result;

/// Execute the `register` command.
pub fn execute(cli: &Cli, username: &str) -> Result<()> {
    let engine = open_engine(cli)?;
    let password = prompt_new_password()?;

    let user = engine.register(username, &password)?;

    output::success(&format!(
        "Registered '{}' with role {}",
        user.username, user.role
    ));
    output::tip(&format!(
        "Run `pva --user {} vault create <NAME>` to create your first vault.",
        user.username
    ));

    Ok(())
}
