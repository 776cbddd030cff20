//! Bundle Protector: turns a raw firmware image into a signed, encrypted bundle
//!
//! Ordering is encrypt-then-sign: the AEAD ciphertext is produced first, and
//! the signature covers the header, nonce and ciphertext as transmitted.

use std::io::Write;
use std::path::Path;

use obsidian_crypto::SecretStore;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::bundle::Bundle;
use crate::error::{BundleError, BundleResult};
use crate::format::{BundleHeader, MESSAGE_TERMINATOR};

/// Protect one firmware release.
///
/// Bounds are validated before any cryptography runs, and nothing is ever
/// truncated. Each call draws a fresh nonce, so protecting the same inputs
/// twice yields two different, equally valid bundles.
pub fn protect(
    firmware: &[u8],
    version: u64,
    message: &str,
    secrets: &SecretStore,
) -> BundleResult<Bundle> {
    let message_bytes = message.as_bytes();
    let header = BundleHeader::for_release(version, firmware.len(), message_bytes.len())?;

    let mut plaintext = Vec::with_capacity(header.plaintext_len());
    plaintext.extend_from_slice(firmware);
    plaintext.extend_from_slice(message_bytes);
    plaintext.push(MESSAGE_TERMINATOR);

    let nonce = secrets.lineage_nonce().next_bundle_nonce()?;
    let aad = Bundle::associated_data(&header, &nonce);
    let ciphertext = secrets.symmetric_key().seal(&nonce, &aad, &plaintext)?;

    let digest = Bundle::signing_digest(&header, &nonce, &ciphertext);
    let signature = secrets.signing().sign_digest(&digest);

    let bundle = Bundle::new(signature, header, nonce, ciphertext);

    info!(
        lineage = %secrets.public().short_id(),
        version = header.version,
        firmware_size = header.firmware_size,
        message_size = header.message_size,
        bundle_size = bundle.encoded_len(),
        "Protected firmware bundle"
    );

    Ok(bundle)
}

/// Read a firmware image, protect it, and write the bundle.
///
/// The bundle is written to a temporary file next to `outfile` and renamed
/// into place, so `outfile` either holds a complete bundle or is untouched.
pub fn protect_file(
    infile: &Path,
    outfile: &Path,
    version: u64,
    message: &str,
    secrets: &SecretStore,
) -> BundleResult<Bundle> {
    let firmware = std::fs::read(infile).map_err(|e| BundleError::io(infile, e))?;
    debug!(path = %infile.display(), size = firmware.len(), "Read firmware image");

    let bundle = protect(&firmware, version, message, secrets)?;
    write_atomic(outfile, &bundle.to_bytes())?;

    info!(path = %outfile.display(), "Wrote firmware bundle");
    Ok(bundle)
}

/// Write `bytes` to `path` through a temporary file in the same directory.
///
/// `path` either ends up with the complete contents or is left as it was.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> BundleResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(|e| BundleError::io(dir, e))?;
    file.write_all(bytes).map_err(|e| BundleError::io(file.path(), e))?;
    file.as_file()
        .sync_all()
        .map_err(|e| BundleError::io(file.path(), e))?;
    file.persist(path).map_err(|e| BundleError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::format::{CIPHERTEXT_OFFSET, MAX_FIRMWARE_SIZE, MAX_MESSAGE_SIZE};
    use obsidian_crypto::{TAG_SIZE, generate_lineage};

    #[test]
    fn test_bundle_size() {
        let (secrets, _) = generate_lineage().unwrap();
        let bundle = protect(&[0u8; 100], 1, "release", &secrets).unwrap();

        assert_eq!(bundle.encoded_len(), CIPHERTEXT_OFFSET + 100 + 7 + 1 + TAG_SIZE);
    }

    #[test]
    fn test_oversized_firmware_rejected() {
        let (secrets, _) = generate_lineage().unwrap();
        let result = protect(&vec![0u8; MAX_FIRMWARE_SIZE + 1], 1, "", &secrets);

        assert!(matches!(
            result,
            Err(BundleError::Validation(ValidationError::FirmwareTooLarge { .. }))
        ));
    }

    #[test]
    fn test_oversized_message_rejected() {
        let (secrets, _) = generate_lineage().unwrap();
        let message = "x".repeat(MAX_MESSAGE_SIZE + 1);

        assert!(matches!(
            protect(b"fw", 1, &message, &secrets),
            Err(BundleError::Validation(ValidationError::MessageTooLarge { .. }))
        ));
    }

    #[test]
    fn test_message_bound_counts_bytes() {
        let (secrets, _) = generate_lineage().unwrap();
        // 512 two-byte characters fit exactly, one more does not
        let fits = "é".repeat(MAX_MESSAGE_SIZE / 2);
        let too_long = "é".repeat(MAX_MESSAGE_SIZE / 2 + 1);

        assert!(protect(b"fw", 1, &fits, &secrets).is_ok());
        assert!(protect(b"fw", 1, &too_long, &secrets).is_err());
    }

    #[test]
    fn test_version_out_of_range_rejected() {
        let (secrets, _) = generate_lineage().unwrap();

        assert!(protect(b"fw", u16::MAX as u64, "", &secrets).is_ok());
        assert!(matches!(
            protect(b"fw", u16::MAX as u64 + 1, "", &secrets),
            Err(BundleError::Validation(ValidationError::VersionOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_missing_infile() {
        let (secrets, _) = generate_lineage().unwrap();
        let dir = tempfile::TempDir::new().unwrap();

        let result = protect_file(
            &dir.path().join("missing.bin"),
            &dir.path().join("out.bundle"),
            1,
            "",
            &secrets,
        );

        assert!(matches!(result, Err(BundleError::Io { .. })));
        assert!(!dir.path().join("out.bundle").exists());
    }

    #[test]
    fn test_protect_file_writes_bundle() {
        let (secrets, _) = generate_lineage().unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let infile = dir.path().join("firmware.bin");
        let outfile = dir.path().join("firmware.bundle");
        std::fs::write(&infile, [0xAAu8; 64]).unwrap();

        let bundle = protect_file(&infile, &outfile, 2, "notes", &secrets).unwrap();

        assert_eq!(std::fs::read(&outfile).unwrap(), bundle.to_bytes());
        // Only the bundle remains, no stray temporary files
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_write_atomic_replaces_whole_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("image.bin");
        std::fs::write(&path, vec![0xFFu8; 4096]).unwrap();

        write_atomic(&path, b"short").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"short");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_missing_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("image.bin");

        assert!(matches!(write_atomic(&path, b"data"), Err(BundleError::Io { .. })));
        assert!(!path.exists());
    }
}
