//! Command handlers
//!
//! Each handler takes resolved configuration and returns a typed result;
//! printing and exit codes stay in `main`.

use std::fmt;
use std::path::Path;

use obsidian_bundle::{Bundle, Release, VerifierKeys, open, protect_file, write_atomic};
use obsidian_crypto::PublicIdentity;
use obsidian_keystore::Keystore;
use serde::Serialize;
use tracing::info;

use crate::config::ToolConfig;
use crate::error::{CliError, CliResult};

/// Keyless summary of a bundle file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleInfo {
    pub format_version: u8,
    pub version: u16,
    pub firmware_size: u16,
    pub message_size: u16,
    pub total_size: usize,
    /// Hex-encoded 24-byte nonce
    pub nonce: String,
    /// Hex-encoded Ed25519 signature
    pub signature: String,
}

impl BundleInfo {
    pub fn from_bundle(bundle: &Bundle) -> Self {
        let header = bundle.header();
        Self {
            format_version: obsidian_bundle::FORMAT_VERSION,
            version: header.version,
            firmware_size: header.firmware_size,
            message_size: header.message_size,
            total_size: bundle.encoded_len(),
            nonce: hex::encode(bundle.nonce().as_bytes()),
            signature: hex::encode(bundle.signature().as_bytes()),
        }
    }
}

impl fmt::Display for BundleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "format:        v{}", self.format_version)?;
        writeln!(f, "version:       {}", self.version)?;
        writeln!(f, "firmware size: {} bytes", self.firmware_size)?;
        writeln!(f, "message size:  {} bytes", self.message_size)?;
        writeln!(f, "bundle size:   {} bytes", self.total_size)?;
        writeln!(f, "nonce:         {}", self.nonce)?;
        write!(f, "signature:     {}", self.signature)
    }
}

/// Create a new lineage in the configured crypto directory
pub fn provision(config: &ToolConfig, force: bool) -> CliResult<PublicIdentity> {
    let keystore = Keystore::new(&config.crypto_dir);
    Ok(keystore.provision(force)?)
}

/// Protect one firmware file with the provisioned lineage
pub fn protect(
    config: &ToolConfig,
    infile: &Path,
    outfile: &Path,
    version: u64,
    message: &str,
) -> CliResult<BundleInfo> {
    let secrets = Keystore::new(&config.crypto_dir).load_secrets()?;
    let bundle = protect_file(infile, outfile, version, message, &secrets)?;
    Ok(BundleInfo::from_bundle(&bundle))
}

/// Parse a bundle file without any keys
pub fn inspect(bundle_path: &Path) -> CliResult<BundleInfo> {
    let data = read_bundle(bundle_path)?;
    let bundle = Bundle::from_bytes(&data)?;
    Ok(BundleInfo::from_bundle(&bundle))
}

/// Verify and decrypt a bundle, optionally writing the firmware out
pub fn verify(
    config: &ToolConfig,
    bundle_path: &Path,
    extract: Option<&Path>,
) -> CliResult<Release> {
    let keystore = Keystore::new(&config.crypto_dir);
    let keys = VerifierKeys::new(&keystore.load_secrets()?, keystore.load_public()?);

    let data = read_bundle(bundle_path)?;
    let release = open(&data, &keys)?;

    info!(
        lineage = %keys.public.short_id(),
        version = release.version,
        firmware_size = release.firmware.len(),
        "Bundle verified"
    );

    if let Some(path) = extract {
        write_atomic(path, &release.firmware)?;
        info!(path = %path.display(), "Extracted firmware image");
    }

    Ok(release)
}

fn read_bundle(path: &Path) -> CliResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| CliError::io(path, e))
}
