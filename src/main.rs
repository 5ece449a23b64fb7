use std::path::Path;

use clap::Parser;
use pva::cli::{Cli, Commands};
use pva::config::Settings;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    init_tracing(&cli);

    let result = match cli.command {
        Commands::Register { ref username } => pva::cli::commands::register::execute(&cli, username),
        Commands::Role {
            ref username,
            ref role,
        } => pva::cli::commands::role::execute(&cli, username, role),
        Commands::Vault { ref action } => pva::cli::commands::vault::execute(&cli, action),
        Commands::Password { ref action } => pva::cli::commands::password::execute(&cli, action),
        Commands::Device { ref action } => pva::cli::commands::device::execute(&cli, action),
    };

    if let Err(e) = result {
        pva::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `log_filter` from pva.toml.
fn init_tracing(cli: &Cli) {
    let fallback = Settings::load(Path::new(&cli.data_dir))
        .map(|s| s.log_filter)
        .unwrap_or_else(|_| Settings::default().log_filter);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
