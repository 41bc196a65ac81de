//! Layered settings: a TOML file picked by build profile or `--settings`, then
//! `TEAMBOARD__*` environment overrides. See `bin/settings_demo.rs`.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
