//! # Obsidian Keystore
//!
//! Provisions lineage key material into the crypto directory and loads it
//! back for bundling. Provisioning happens once per lineage and must finish
//! before any bundle is produced; the store is read-only afterwards.

pub mod error;
pub mod keystore;

pub use error::{KeystoreError, KeystoreResult};
pub use keystore::{Keystore, NONCE_FILENAME, PUBLIC_KEY_FILENAME, SECRETS_FILENAME};
