//! Datamart CLI - Command-line interface tying the Datamart crates together.

pub mod config;
pub mod output;

pub use config::{Command, Config, ExportFormat};
