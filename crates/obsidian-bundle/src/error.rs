//! Error types for bundle production and verification

use std::path::PathBuf;

use obsidian_crypto::CryptoError;
use thiserror::Error;

/// A release input exceeded one of the format bounds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Firmware is {size} bytes, maximum is {max}")]
    FirmwareTooLarge { size: usize, max: usize },

    #[error("Release message is {size} bytes, maximum is {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Version {version} is out of range (0..={max})")]
    VersionOutOfRange { version: u64, max: u16 },
}

/// Errors that can occur while protecting or opening a bundle
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Unsupported bundle format version {0}")]
    UnsupportedFormat(u8),

    #[error("Bundle truncated: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Bundle is {size} bytes, larger than any valid bundle ({max})")]
    Oversized { size: usize, max: usize },

    #[error("Malformed bundle: {0}")]
    Malformed(String),

    #[error("Bundle signature is invalid")]
    SignatureInvalid,

    #[error("Bundle nonce does not belong to this lineage")]
    LineageMismatch,
}

impl BundleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BundleError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for bundle operations
pub type BundleResult<T> = Result<T, BundleError>;
