//! Ed25519 signing identity for a lineage
//!
//! Bundles are signed over a BLAKE3 digest of their signable region rather
//! than the raw bytes, with the digest domain-separated by a context string.
//!
//! ## Encodings
//!
//! - Private key: PKCS#8 v1 DER (48 bytes). The public key is deliberately
//!   left out so the secret store and the public artifact share no key bytes.
//! - Public key: SubjectPublicKeyInfo DER (44 bytes).

use ed25519_dalek::pkcs8::spki::DecodePublicKey;
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, KeypairBytes};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};
use crate::symmetric::fill_random;

/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Size of a BLAKE3 digest in bytes
pub const DIGEST_SIZE: usize = 32;

/// Size of the PKCS#8 v1 DER encoding of an Ed25519 private key
pub const PRIVATE_KEY_DER_SIZE: usize = 48;

/// Size of the SubjectPublicKeyInfo DER encoding of an Ed25519 public key
pub const PUBLIC_KEY_DER_SIZE: usize = 44;

/// Secure byte container that zeroizes on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureBytes(Vec<u8>);

impl SecureBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for SecureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Domain-separated BLAKE3 digest of `data`
pub fn digest(context: &str, data: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Private signing identity (never leaves the build environment)
#[derive(Clone)]
pub struct SigningIdentity {
    signing_key: SigningKey,
}

impl SigningIdentity {
    /// Generate a new identity from a 32-byte OS-random seed
    pub fn generate() -> CryptoResult<Self> {
        let mut seed = [0u8; 32];
        fill_random(&mut seed)?;
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Ok(Self { signing_key })
    }

    /// Export the private key as PKCS#8 v1 DER
    pub fn to_pkcs8_der(&self) -> CryptoResult<SecureBytes> {
        let keypair = KeypairBytes {
            secret_key: self.signing_key.to_bytes(),
            public_key: None,
        };
        let document = keypair
            .to_pkcs8_der()
            .map_err(|e| CryptoError::KeyEncodingFailed(e.to_string()))?;
        Ok(SecureBytes::new(document.as_bytes().to_vec()))
    }

    /// Import a private key from PKCS#8 DER
    pub fn from_pkcs8_der(der: &[u8]) -> CryptoResult<Self> {
        let signing_key = SigningKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid PKCS#8 signing key: {}", e)))?;
        Ok(Self { signing_key })
    }

    /// Get the public half
    pub fn public(&self) -> PublicIdentity {
        PublicIdentity {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Sign a digest produced by [`digest`]
    pub fn sign_digest(&self, digest: &[u8; DIGEST_SIZE]) -> DetachedSignature {
        DetachedSignature(self.signing_key.sign(digest).to_bytes())
    }

    /// Raw 32-byte seed (use with caution)
    pub fn seed_bytes(&self) -> SecureBytes {
        SecureBytes::new(self.signing_key.to_bytes().to_vec())
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("public", &self.public().short_id())
            .finish_non_exhaustive()
    }
}

/// Public verification key, freely distributable to verifiers
#[derive(Clone, PartialEq, Eq)]
pub struct PublicIdentity {
    verifying_key: VerifyingKey,
}

impl PublicIdentity {
    /// Export as SubjectPublicKeyInfo DER
    pub fn to_der(&self) -> CryptoResult<Vec<u8>> {
        let document = self
            .verifying_key
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyEncodingFailed(e.to_string()))?;
        Ok(document.as_bytes().to_vec())
    }

    /// Import from SubjectPublicKeyInfo DER
    pub fn from_der(der: &[u8]) -> CryptoResult<Self> {
        let verifying_key = VerifyingKey::from_public_key_der(der)
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid public key DER: {}", e)))?;
        Ok(Self { verifying_key })
    }

    /// Raw 32-byte public key
    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Verify a signature over a digest produced by [`digest`]
    pub fn verify_digest(
        &self,
        digest: &[u8; DIGEST_SIZE],
        signature: &DetachedSignature,
    ) -> CryptoResult<()> {
        let signature = Signature::from_bytes(&signature.0);
        self.verifying_key
            .verify_strict(digest, &signature)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Short lineage identifier (first 8 bytes of the key's BLAKE3 hash, hex)
    pub fn short_id(&self) -> String {
        let hash = blake3::hash(self.verifying_key.as_bytes());
        hex::encode(&hash.as_bytes()[..8])
    }
}

impl std::fmt::Debug for PublicIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicIdentity")
            .field("id", &self.short_id())
            .finish()
    }
}

/// A 64-byte Ed25519 signature
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DetachedSignature([u8; SIGNATURE_SIZE]);

impl DetachedSignature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for DetachedSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DetachedSignature({}..)", hex::encode(&self.0[..8]))
    }
}
