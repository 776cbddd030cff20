//! Keystore for lineage persistence
//!
//! Writes and reads the three lineage artifacts in the crypto directory:
//! - `secrets.bin`: symmetric key and PKCS#8 private key (trusted environment only)
//! - `nonce.bin`: 16-byte lineage nonce
//! - `signing_public.der`: public key for embedding in the verifier
//!
//! The three writes are not committed atomically. A failed provisioning run
//! leaves the directory in an unspecified state and must be re-run.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use obsidian_crypto::{PublicIdentity, SecretStore, generate_lineage};

use crate::error::{KeystoreError, KeystoreResult};

/// Filename for the secret store (symmetric key || private key)
pub const SECRETS_FILENAME: &str = "secrets.bin";

/// Filename for the lineage nonce
pub const NONCE_FILENAME: &str = "nonce.bin";

/// Filename for the public verification key
pub const PUBLIC_KEY_FILENAME: &str = "signing_public.der";

/// Permissions for `secrets.bin` and `nonce.bin`
#[cfg(unix)]
const PRIVATE_FILE_MODE: u32 = 0o600;

/// On-disk lineage keystore
pub struct Keystore {
    /// Path to the crypto directory
    path: PathBuf,
}

impl Keystore {
    /// Create a keystore rooted at the given crypto directory
    pub fn new(crypto_dir: &Path) -> Self {
        Self {
            path: crypto_dir.to_path_buf(),
        }
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.path.join(SECRETS_FILENAME)
    }

    pub fn nonce_path(&self) -> PathBuf {
        self.path.join(NONCE_FILENAME)
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.path.join(PUBLIC_KEY_FILENAME)
    }

    /// Whether every lineage artifact is present
    pub fn exists(&self) -> bool {
        self.secrets_path().exists()
            && self.nonce_path().exists()
            && self.public_key_path().exists()
    }

    /// Whether any lineage artifact is present
    fn any_exists(&self) -> bool {
        self.secrets_path().exists()
            || self.nonce_path().exists()
            || self.public_key_path().exists()
    }

    /// Generate a new lineage and persist it.
    ///
    /// Refuses to replace an existing lineage unless `force` is set. Every
    /// call produces a brand-new, unrelated lineage.
    pub fn provision(&self, force: bool) -> KeystoreResult<PublicIdentity> {
        if self.any_exists() {
            if !force {
                return Err(KeystoreError::AlreadyProvisioned(self.path.clone()));
            }
            warn!(
                path = %self.path.display(),
                "Replacing existing lineage; bundles from the old lineage will no longer verify"
            );
        }

        let (secrets, public) =
            generate_lineage().map_err(|e| KeystoreError::SecretGeneration(e.to_string()))?;

        self.save(&secrets, &public)?;

        info!(
            lineage = %public.short_id(),
            path = %self.path.display(),
            "Provisioned new lineage"
        );

        Ok(public)
    }

    /// Write all three lineage artifacts
    pub fn save(&self, secrets: &SecretStore, public: &PublicIdentity) -> KeystoreResult<()> {
        std::fs::create_dir_all(&self.path).map_err(|e| {
            KeystoreError::SecretGeneration(format!("Failed to create crypto dir: {}", e))
        })?;

        let secret_bytes = secrets
            .to_secret_bytes()
            .map_err(|e| KeystoreError::SecretGeneration(e.to_string()))?;
        let public_der = public
            .to_der()
            .map_err(|e| KeystoreError::SecretGeneration(e.to_string()))?;

        let secrets_path = self.secrets_path();
        Self::write_private(&secrets_path, secret_bytes.as_slice())?;
        debug!(path = %secrets_path.display(), "Wrote secret store");

        let nonce_path = self.nonce_path();
        Self::write_private(&nonce_path, secrets.lineage_nonce().as_bytes())?;
        debug!(path = %nonce_path.display(), "Wrote lineage nonce");

        let public_path = self.public_key_path();
        std::fs::write(&public_path, &public_der).map_err(|e| {
            KeystoreError::SecretGeneration(format!("Failed to write public key file: {}", e))
        })?;
        debug!(path = %public_path.display(), "Wrote public key");

        Ok(())
    }

    /// Load the secret store for bundling
    pub fn load_secrets(&self) -> KeystoreResult<SecretStore> {
        let secret_bytes = Self::read_artifact(&self.secrets_path())?;
        let nonce_bytes = Self::read_artifact(&self.nonce_path())?;

        let secrets = SecretStore::from_artifacts(&secret_bytes, &nonce_bytes)
            .map_err(|e| KeystoreError::SecretStore(format!("Invalid secret store: {}", e)))?;

        debug!(
            lineage = %secrets.public().short_id(),
            "Loaded secret store"
        );

        Ok(secrets)
    }

    /// Load the public verification key
    pub fn load_public(&self) -> KeystoreResult<PublicIdentity> {
        let der = Self::read_artifact(&self.public_key_path())?;
        PublicIdentity::from_der(&der)
            .map_err(|e| KeystoreError::SecretStore(format!("Invalid public key file: {}", e)))
    }

    fn read_artifact(path: &Path) -> KeystoreResult<Vec<u8>> {
        std::fs::read(path).map_err(|e| {
            KeystoreError::SecretStore(format!("Failed to read {}: {}", path.display(), e))
        })
    }

    /// Write a private artifact that is owner-only from the moment it exists
    fn write_private(path: &Path, bytes: &[u8]) -> KeystoreResult<()> {
        let write_failed = |e: std::io::Error| {
            KeystoreError::SecretGeneration(format!("Failed to write {}: {}", path.display(), e))
        };

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(PRIVATE_FILE_MODE);
        }

        let mut file = options.open(path).map_err(write_failed)?;

        // `mode` only applies on creation; tighten a pre-existing file before writing
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(PRIVATE_FILE_MODE))
                .map_err(write_failed)?;
        }

        file.write_all(bytes).map_err(write_failed)?;
        file.sync_all().map_err(write_failed)
    }
}
