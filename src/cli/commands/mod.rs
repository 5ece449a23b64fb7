//! One module per top-level subcommand.

pub mod device;
pub mod password;
pub mod register;
pub mod role;
pub mod vault;
