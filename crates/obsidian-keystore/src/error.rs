//! Error types for the keystore

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while provisioning or loading a lineage
#[derive(Debug, Error)]
pub enum KeystoreError {
    /// Randomness or artifact write failed while provisioning
    #[error("Secret generation failed: {0}")]
    SecretGeneration(String),

    /// Store artifacts missing, unreadable or malformed
    #[error("Secret store error: {0} (re-run provisioning to create a new lineage)")]
    SecretStore(String),

    /// Refused to overwrite an existing lineage
    #[error("A lineage is already provisioned in {0} (use --force to replace it)")]
    AlreadyProvisioned(PathBuf),
}

/// Result type alias for keystore operations
pub type KeystoreResult<T> = Result<T, KeystoreError>;
