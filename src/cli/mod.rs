// CLI module for flac-relay
//
// Only compiled into the binary.

pub mod commands;
pub mod config;
pub mod output;

pub use config::{Commands, Config, OutputFormat, ServeArgs, TagArg};
pub use output::OutputFormatter;
