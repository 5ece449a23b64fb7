//! Configuration loaded from `pva.toml`.

pub mod settings;

pub use settings::Settings;
