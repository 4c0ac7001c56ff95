//! Command line, config file and merged settings

mod cli;
mod file;
mod settings;

pub use cli::Cli;
pub use settings::Settings;
