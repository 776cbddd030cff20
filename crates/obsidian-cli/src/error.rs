//! Error types for the command-line front end

use std::path::PathBuf;

use obsidian_bundle::BundleError;
use obsidian_crypto::CryptoError;
use obsidian_keystore::KeystoreError;
use obsidian_logging::LoggingError;
use thiserror::Error;

/// Exit code for configuration and logging setup failures.
///
/// Shared with clap, which exits with 2 on usage errors: both mean the
/// invocation itself is wrong and nothing was attempted.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code when provisioning cannot produce or persist secrets
pub const EXIT_SECRET_GENERATION: u8 = 3;
/// Exit code for out-of-bounds release inputs
pub const EXIT_VALIDATION: u8 = 4;
/// Exit code for a missing, corrupt or already-present secret store
pub const EXIT_SECRET_STORE: u8 = 5;
/// Exit code for firmware or bundle file I/O failures
pub const EXIT_IO: u8 = 6;
/// Exit code for bundles that fail structural, signature or decryption checks
pub const EXIT_VERIFICATION: u8 = 7;

/// Errors surfaced by the `obsidian` commands
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Keystore(#[from] KeystoreError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

impl CliError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CliError::Io {
            path: path.into(),
            source,
        }
    }

    /// One-line report for stderr, independent of any log filter
    pub fn diagnostic(&self) -> String {
        format!("obsidian: {}", self)
    }

    /// Process exit code for this failure category
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) | CliError::Logging(_) => EXIT_CONFIG,
            CliError::Keystore(KeystoreError::SecretGeneration(_)) => EXIT_SECRET_GENERATION,
            CliError::Keystore(_) => EXIT_SECRET_STORE,
            CliError::Bundle(BundleError::Validation(_)) => EXIT_VALIDATION,
            CliError::Bundle(BundleError::Io { .. })
            | CliError::Io { .. }
            | CliError::Render(_) => EXIT_IO,
            CliError::Bundle(BundleError::Crypto(CryptoError::RandomSourceFailed(_))) => {
                EXIT_SECRET_GENERATION
            }
            CliError::Bundle(_) => EXIT_VERIFICATION,
        }
    }
}

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;
