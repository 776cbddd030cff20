//! Bundle wire format, version 1
//!
//! ```text
//! offset 0   : format_version  (u8, = 1)
//! offset 1   : signature       (64 bytes, Ed25519 over the signing digest)
//! offset 65  : version         (u16 LE)
//! offset 67  : firmware_size   (u16 LE)
//! offset 69  : message_size    (u16 LE)
//! offset 71  : bundle_nonce    (24 bytes: lineage nonce || salt)
//! offset 95  : ciphertext || tag of (firmware || message || 0x00)
//! ```
//!
//! The signature covers everything after it, including the format byte.
//! The header and nonce are also bound into the AEAD as associated data.

use obsidian_crypto::{BUNDLE_NONCE_SIZE, SIGNATURE_SIZE, TAG_SIZE};

use crate::error::ValidationError;

/// Current bundle format version
pub const FORMAT_VERSION: u8 = 1;

/// Maximum firmware image size in bytes
pub const MAX_FIRMWARE_SIZE: usize = 32768;

/// Maximum release message size in bytes (UTF-8 encoded)
pub const MAX_MESSAGE_SIZE: usize = 1024;

/// Highest representable firmware version
pub const MAX_VERSION: u16 = u16::MAX;

/// Sentinel appended after the release message
pub const MESSAGE_TERMINATOR: u8 = 0x00;

/// Size of the version/size header
pub const HEADER_SIZE: usize = 6;

/// Context string for the signing digest
pub const SIGNING_CONTEXT: &str = "obsidian firmware bundle v1 signature";

pub const SIGNATURE_OFFSET: usize = 1;
pub const HEADER_OFFSET: usize = SIGNATURE_OFFSET + SIGNATURE_SIZE;
pub const NONCE_OFFSET: usize = HEADER_OFFSET + HEADER_SIZE;
pub const CIPHERTEXT_OFFSET: usize = NONCE_OFFSET + BUNDLE_NONCE_SIZE;

/// Smallest possible bundle: empty firmware and message still carry a
/// terminator byte and a tag.
pub const MIN_BUNDLE_SIZE: usize = CIPHERTEXT_OFFSET + 1 + TAG_SIZE;

/// Largest possible bundle
pub const MAX_BUNDLE_SIZE: usize =
    CIPHERTEXT_OFFSET + MAX_FIRMWARE_SIZE + MAX_MESSAGE_SIZE + 1 + TAG_SIZE;

/// Version and plaintext sizes, little-endian on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleHeader {
    pub version: u16,
    pub firmware_size: u16,
    pub message_size: u16,
}

impl BundleHeader {
    /// Build a header, validating every bound
    pub fn for_release(
        version: u64,
        firmware_len: usize,
        message_len: usize,
    ) -> Result<Self, ValidationError> {
        let version = validate_version(version)?;
        validate_firmware_len(firmware_len)?;
        validate_message_len(message_len)?;

        // Both bounds are below u16::MAX, so these casts are lossless
        Ok(Self {
            version,
            firmware_size: firmware_len as u16,
            message_size: message_len as u16,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..2].copy_from_slice(&self.version.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.firmware_size.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.message_size.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            version: u16::from_le_bytes([bytes[0], bytes[1]]),
            firmware_size: u16::from_le_bytes([bytes[2], bytes[3]]),
            message_size: u16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }

    /// Length of `firmware || message || terminator`
    pub fn plaintext_len(&self) -> usize {
        self.firmware_size as usize + self.message_size as usize + 1
    }

    /// Expected ciphertext length including the tag
    pub fn ciphertext_len(&self) -> usize {
        self.plaintext_len() + TAG_SIZE
    }
}

pub fn validate_version(version: u64) -> Result<u16, ValidationError> {
    u16::try_from(version).map_err(|_| ValidationError::VersionOutOfRange {
        version,
        max: MAX_VERSION,
    })
}

pub fn validate_firmware_len(len: usize) -> Result<(), ValidationError> {
    if len > MAX_FIRMWARE_SIZE {
        return Err(ValidationError::FirmwareTooLarge {
            size: len,
            max: MAX_FIRMWARE_SIZE,
        });
    }
    Ok(())
}

pub fn validate_message_len(len: usize) -> Result<(), ValidationError> {
    if len > MAX_MESSAGE_SIZE {
        return Err(ValidationError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(())
}
