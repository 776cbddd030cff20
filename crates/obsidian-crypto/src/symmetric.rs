//! Symmetric lineage key and nonces
//!
//! Every bundle of a lineage is encrypted with the same 32-byte key using
//! XChaCha20-Poly1305. The provisioned 16-byte lineage nonce is never used
//! on its own: each bundle gets a 24-byte nonce made of the lineage nonce
//! followed by a fresh 8-byte random salt, so no (key, nonce) pair ever
//! covers two plaintexts.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use rand::{TryRngCore, rngs::OsRng};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Symmetric key size (32 bytes)
pub const KEY_SIZE: usize = 32;

/// Provisioned lineage nonce size (16 bytes)
pub const LINEAGE_NONCE_SIZE: usize = 16;

/// Random per-bundle salt appended to the lineage nonce
pub const NONCE_SALT_SIZE: usize = 8;

/// XChaCha20-Poly1305 nonce size (24 bytes)
pub const BUNDLE_NONCE_SIZE: usize = LINEAGE_NONCE_SIZE + NONCE_SALT_SIZE;

/// Poly1305 authentication tag size
pub const TAG_SIZE: usize = 16;

/// Fill a buffer from the operating system CSPRNG.
///
/// Unlike `rand::rng()`, failure is reported instead of panicking, so key
/// generation can surface a degraded random source to the operator.
pub fn fill_random(buf: &mut [u8]) -> CryptoResult<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| CryptoError::RandomSourceFailed(e.to_string()))
}

/// Symmetric key shared by every bundle in a lineage
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    key: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Generate a new random key
    pub fn generate() -> CryptoResult<Self> {
        let mut key = [0u8; KEY_SIZE];
        fill_random(&mut key)?;
        Ok(Self { key })
    }

    /// Create from raw key bytes
    pub fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Create from a slice, checking the length
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "Symmetric key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self { key })
    }

    /// Get the raw key bytes (use with caution)
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    /// Encrypt `plaintext`, binding `aad` into the authentication tag.
    ///
    /// Returns the ciphertext with the 16-byte tag appended.
    pub fn seal(&self, nonce: &BundleNonce, aad: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let cipher = XChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        cipher
            .encrypt(
                XNonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
    }

    /// Decrypt and authenticate a ciphertext produced by [`SymmetricKey::seal`]
    pub fn open(
        &self,
        nonce: &BundleNonce,
        aad: &[u8],
        ciphertext: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        if ciphertext.len() < TAG_SIZE {
            return Err(CryptoError::DataTooShort {
                expected: TAG_SIZE,
                actual: ciphertext.len(),
            });
        }

        let cipher = XChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

        cipher
            .decrypt(
                XNonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey").finish_non_exhaustive()
    }
}

/// Nonce prefix fixed for the lifetime of a lineage
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LineageNonce([u8; LINEAGE_NONCE_SIZE]);

impl LineageNonce {
    /// Generate a new random lineage nonce
    pub fn generate() -> CryptoResult<Self> {
        let mut bytes = [0u8; LINEAGE_NONCE_SIZE];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; LINEAGE_NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse from a slice, checking the length
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let nonce: [u8; LINEAGE_NONCE_SIZE] =
            bytes.try_into().map_err(|_| CryptoError::InvalidNonce {
                expected: LINEAGE_NONCE_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self(nonce))
    }

    pub fn as_bytes(&self) -> &[u8; LINEAGE_NONCE_SIZE] {
        &self.0
    }

    /// Derive a fresh nonce for one bundle (lineage nonce || random salt)
    pub fn next_bundle_nonce(&self) -> CryptoResult<BundleNonce> {
        let mut salt = [0u8; NONCE_SALT_SIZE];
        fill_random(&mut salt)?;
        Ok(BundleNonce::new(self, salt))
    }
}

impl std::fmt::Debug for LineageNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LineageNonce({})", hex::encode(self.0))
    }
}

/// Per-bundle XChaCha20-Poly1305 nonce, carried in the clear inside the bundle
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BundleNonce([u8; BUNDLE_NONCE_SIZE]);

impl BundleNonce {
    /// Build from a lineage nonce and a salt
    pub fn new(lineage: &LineageNonce, salt: [u8; NONCE_SALT_SIZE]) -> Self {
        let mut bytes = [0u8; BUNDLE_NONCE_SIZE];
        bytes[..LINEAGE_NONCE_SIZE].copy_from_slice(lineage.as_bytes());
        bytes[LINEAGE_NONCE_SIZE..].copy_from_slice(&salt);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; BUNDLE_NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; BUNDLE_NONCE_SIZE] {
        &self.0
    }

    /// The random salt part of the nonce
    pub fn salt(&self) -> &[u8] {
        &self.0[LINEAGE_NONCE_SIZE..]
    }

    /// Whether this nonce was derived from the given lineage nonce
    pub fn belongs_to(&self, lineage: &LineageNonce) -> bool {
        self.0[..LINEAGE_NONCE_SIZE] == lineage.as_bytes()[..]
    }
}

impl std::fmt::Debug for BundleNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BundleNonce({})", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_nonce() -> BundleNonce {
        BundleNonce::new(
            &LineageNonce::from_bytes([7; LINEAGE_NONCE_SIZE]),
            [1; NONCE_SALT_SIZE],
        )
    }

    #[test]
    fn test_key_generation() {
        let key1 = SymmetricKey::generate().unwrap();
        let key2 = SymmetricKey::generate().unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_seal_open() {
        let key = SymmetricKey::generate().unwrap();
        let nonce = test_nonce();

        let sealed = key.seal(&nonce, b"header", b"firmware image").unwrap();
        assert_eq!(sealed.len(), b"firmware image".len() + TAG_SIZE);

        let opened = key.open(&nonce, b"header", &sealed).unwrap();
        assert_eq!(opened, b"firmware image");
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = SymmetricKey::generate().unwrap();
        let nonce = test_nonce();

        let sealed = key.seal(&nonce, b"header-a", b"payload").unwrap();
        assert!(key.open(&nonce, b"header-b", &sealed).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = SymmetricKey::generate().unwrap();
        let key2 = SymmetricKey::generate().unwrap();
        let nonce = test_nonce();

        let sealed = key1.seal(&nonce, b"", b"payload").unwrap();
        assert!(key2.open(&nonce, b"", &sealed).is_err());
    }

    #[test]
    fn test_short_ciphertext_rejected() {
        let key = SymmetricKey::generate().unwrap();
        let result = key.open(&test_nonce(), b"", &[0u8; TAG_SIZE - 1]);
        assert!(matches!(result, Err(CryptoError::DataTooShort { .. })));
    }

    #[test]
    fn test_from_slice_length_checked() {
        assert!(SymmetricKey::from_slice(&[0u8; KEY_SIZE]).is_ok());
        assert!(SymmetricKey::from_slice(&[0u8; KEY_SIZE - 1]).is_err());
        assert!(LineageNonce::from_slice(&[0u8; LINEAGE_NONCE_SIZE + 1]).is_err());
    }

    #[test]
    fn test_bundle_nonces_are_fresh() {
        let lineage = LineageNonce::generate().unwrap();
        let n1 = lineage.next_bundle_nonce().unwrap();
        let n2 = lineage.next_bundle_nonce().unwrap();

        assert_ne!(n1, n2);
        assert!(n1.belongs_to(&lineage));
        assert!(n2.belongs_to(&lineage));
        assert_eq!(n1.salt().len(), NONCE_SALT_SIZE);
    }

    #[test]
    fn test_nonce_from_other_lineage() {
        let lineage_a = LineageNonce::from_bytes([0xAA; LINEAGE_NONCE_SIZE]);
        let lineage_b = LineageNonce::from_bytes([0xBB; LINEAGE_NONCE_SIZE]);

        let nonce = lineage_a.next_bundle_nonce().unwrap();
        assert!(!nonce.belongs_to(&lineage_b));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = SymmetricKey::from_bytes([0xAB; KEY_SIZE]);
        let debug = format!("{:?}", key);
        assert!(!debug.contains("ab"));
        assert!(!debug.contains("171"));
    }
}
