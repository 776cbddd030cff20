//! Tool configuration
//!
//! Resolution order: `--config <path>`, else `obsidian.toml` in the working
//! directory when present, else built-in defaults. Command-line flags are
//! applied last.

use std::path::{Path, PathBuf};

use obsidian_logging::LogConfig;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILENAME: &str = "obsidian.toml";

/// Crypto directory used when neither the file nor the flags name one
pub const DEFAULT_CRYPTO_DIR: &str = "bootloader/crypto";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Directory holding `secrets.bin`, `nonce.bin` and `signing_public.der`
    pub crypto_dir: PathBuf,

    /// Logging setup, the `[logging]` table
    pub logging: LogConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            crypto_dir: PathBuf::from(DEFAULT_CRYPTO_DIR),
            logging: LogConfig::default(),
        }
    }
}

impl ToolConfig {
    pub fn from_toml(contents: &str) -> CliResult<Self> {
        toml::from_str(contents).map_err(|e| CliError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> CliResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&contents)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from an explicit path, else from `fallback` if it exists.
    ///
    /// An explicit path that cannot be read is an error; a missing fallback
    /// just means defaults.
    pub fn load(explicit: Option<&Path>, fallback: &Path) -> CliResult<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if fallback.exists() => Self::from_file(fallback),
            None => Ok(Self::default()),
        }
    }

    /// Resolve the configuration for a parsed command line
    pub fn resolve(cli: &Cli) -> CliResult<Self> {
        let mut config = Self::load(cli.config.as_deref(), Path::new(DEFAULT_CONFIG_FILENAME))?;
        config.apply_overrides(cli);
        Ok(config)
    }

    /// Apply command-line flags over file values
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.crypto_dir {
            self.crypto_dir = dir.clone();
        }
        if let Some(level) = &cli.log_level {
            self.logging.default_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ToolConfig::default();
        assert_eq!(config.crypto_dir, PathBuf::from("bootloader/crypto"));
        assert_eq!(config.logging.default_level, "info");
    }

    #[test]
    fn test_from_toml() {
        let config = ToolConfig::from_toml(
            r#"
            crypto_dir = "/secure/crypto"

            [logging]
            default_level = "debug"

            [logging.targets]
            obsidian_bundle = "trace"
            "#,
        )
        .unwrap();

        assert_eq!(config.crypto_dir, PathBuf::from("/secure/crypto"));
        assert_eq!(config.logging.default_level, "debug");
        assert_eq!(config.logging.target_directives(), vec!["obsidian_bundle=trace"]);
    }

    #[test]
    fn test_invalid_toml() {
        let result = ToolConfig::from_toml("crypto_dir = [");
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_load_missing_fallback_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ToolConfig::load(None, &dir.path().join("obsidian.toml")).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn test_load_fallback_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("obsidian.toml");
        std::fs::write(&path, "crypto_dir = \"keys\"\n").unwrap();

        let config = ToolConfig::load(None, &path).unwrap();
        assert_eq!(config.crypto_dir, PathBuf::from("keys"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = ToolConfig::load(Some(&missing), &dir.path().join("obsidian.toml"));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_flags_override_file() {
        let mut config = ToolConfig::from_toml(
            r#"
            crypto_dir = "from-file"
            [logging]
            default_level = "warn"
            "#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "obsidian",
            "--crypto-dir",
            "from-flag",
            "--log-level",
            "trace",
            "provision",
        ])
        .unwrap();
        config.apply_overrides(&cli);

        assert_eq!(config.crypto_dir, PathBuf::from("from-flag"));
        assert_eq!(config.logging.default_level, "trace");
    }
}
