//! `pva role`: change a user's role.

use crate::access::Role;
use crate::cli::output;
use crate::cli::{login, open_engine, Cli};
use crate::errors::Result;

/// Execute the `role` command.
pub fn execute(cli: &Cli, username: &str, role: &str) -> Result<()> {
    // Parse before prompting so a typo costs no password entry.
    let role: Role = role.parse()?;

    let engine = open_engine(cli)?;
    let session = login(cli, &engine)?;
    let target = engine.user_by_username(username)?;

    engine.set_user_role(&session.user, target.id, role)?;

    output::success(&format!("'{}' is now {role}", target.username));
    Ok(())
}
