//! # Obsidian Bundle
//!
//! Produces authenticated, confidentiality-protected firmware update bundles
//! and provides a reference verifier for them.
//!
//! A bundle is `format_version || signature || header || nonce || ciphertext`,
//! see [`format`] for the exact layout.
//!
//! ## Example
//!
//! ```rust,ignore
//! use obsidian_bundle::{VerifierKeys, open, protect};
//! use obsidian_crypto::generate_lineage;
//!
//! let (secrets, public) = generate_lineage()?;
//!
//! let bundle = protect(&[0u8; 100], 1, "release", &secrets)?;
//! let bytes = bundle.to_bytes();
//!
//! let release = open(&bytes, &VerifierKeys::new(&secrets, public))?;
//! assert_eq!(release.message, "release");
//! ```

pub mod bundle;
pub mod error;
pub mod format;
pub mod protector;
pub mod verifier;

pub use bundle::{Bundle, Release};
pub use error::{BundleError, BundleResult, ValidationError};
pub use format::{
    BundleHeader, FORMAT_VERSION, MAX_FIRMWARE_SIZE, MAX_MESSAGE_SIZE, MAX_VERSION,
};
pub use protector::{protect, protect_file, write_atomic};
pub use verifier::{VerifierKeys, open};
