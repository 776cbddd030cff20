//! # Obsidian CLI
//!
//! Thin command-line boundary over the keystore and bundle crates. Commands
//! return typed results; `main` maps each failure category to its own exit
//! code.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Command};
pub use commands::BundleInfo;
pub use config::{DEFAULT_CONFIG_FILENAME, DEFAULT_CRYPTO_DIR, ToolConfig};
pub use error::{CliError, CliResult};
