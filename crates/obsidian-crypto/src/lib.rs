//! # Obsidian Crypto
//!
//! Cryptographic primitives for the Obsidian firmware pipeline.
//!
//! ## Features
//!
//! - Lineage generation: symmetric key, lineage nonce and Ed25519 keypair
//! - XChaCha20-Poly1305 authenticated encryption with per-bundle nonces
//! - Ed25519 signatures over domain-separated BLAKE3 digests
//! - PKCS#8 / SubjectPublicKeyInfo DER encodings for key artifacts
//!
//! ## Example
//!
//! ```rust,ignore
//! use obsidian_crypto::{digest, generate_lineage};
//!
//! let (secrets, public) = generate_lineage()?;
//!
//! let nonce = secrets.lineage_nonce().next_bundle_nonce()?;
//! let sealed = secrets.symmetric_key().seal(&nonce, b"aad", b"firmware")?;
//!
//! let d = digest("example context", &sealed);
//! let signature = secrets.signing().sign_digest(&d);
//! public.verify_digest(&d, &signature)?;
//! ```

pub mod error;
pub mod lineage;
pub mod signing;
pub mod symmetric;

// Re-exports
pub use error::{CryptoError, CryptoResult};
pub use lineage::{SECRET_STORE_SIZE, SecretStore, generate_lineage};
pub use signing::{
    DIGEST_SIZE, DetachedSignature, PRIVATE_KEY_DER_SIZE, PUBLIC_KEY_DER_SIZE, PublicIdentity,
    SIGNATURE_SIZE, SecureBytes, SigningIdentity, digest,
};
pub use symmetric::{
    BUNDLE_NONCE_SIZE, BundleNonce, KEY_SIZE, LINEAGE_NONCE_SIZE, LineageNonce, NONCE_SALT_SIZE,
    SymmetricKey, TAG_SIZE, fill_random,
};
