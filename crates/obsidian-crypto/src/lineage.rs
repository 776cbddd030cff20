//! Lineage key material
//!
//! A lineage is one provisioned set of secrets covering many firmware
//! releases. [`generate_lineage`] creates it; [`SecretStore`] is the private
//! half, passed explicitly to every bundling call, and [`PublicIdentity`] is
//! the public half embedded in the verifier.
//!
//! Secret store artifact layout: `symmetric_key (32) || PKCS#8 DER (48)`.
//! The lineage nonce is persisted as its own 16-byte artifact.

use crate::error::{CryptoError, CryptoResult};
use crate::signing::{PRIVATE_KEY_DER_SIZE, PublicIdentity, SecureBytes, SigningIdentity};
use crate::symmetric::{KEY_SIZE, LineageNonce, SymmetricKey};

/// Exact size of the secret store artifact
pub const SECRET_STORE_SIZE: usize = KEY_SIZE + PRIVATE_KEY_DER_SIZE;

/// Private key material of a lineage
#[derive(Clone)]
pub struct SecretStore {
    symmetric_key: SymmetricKey,
    lineage_nonce: LineageNonce,
    signing: SigningIdentity,
}

impl SecretStore {
    pub fn new(
        symmetric_key: SymmetricKey,
        lineage_nonce: LineageNonce,
        signing: SigningIdentity,
    ) -> Self {
        Self {
            symmetric_key,
            lineage_nonce,
            signing,
        }
    }

    pub fn symmetric_key(&self) -> &SymmetricKey {
        &self.symmetric_key
    }

    pub fn lineage_nonce(&self) -> &LineageNonce {
        &self.lineage_nonce
    }

    pub fn signing(&self) -> &SigningIdentity {
        &self.signing
    }

    /// The public half of the signing keypair
    pub fn public(&self) -> PublicIdentity {
        self.signing.public()
    }

    /// Encode the secret store artifact (symmetric key || PKCS#8 DER)
    pub fn to_secret_bytes(&self) -> CryptoResult<SecureBytes> {
        let der = self.signing.to_pkcs8_der()?;
        let mut bytes = Vec::with_capacity(SECRET_STORE_SIZE);
        bytes.extend_from_slice(self.symmetric_key.as_bytes());
        bytes.extend_from_slice(der.as_slice());
        Ok(SecureBytes::new(bytes))
    }

    /// Decode from the secret store artifact and the nonce artifact
    pub fn from_artifacts(secret_bytes: &[u8], nonce_bytes: &[u8]) -> CryptoResult<Self> {
        if secret_bytes.len() != SECRET_STORE_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "Secret store must be {} bytes, got {}",
                SECRET_STORE_SIZE,
                secret_bytes.len()
            )));
        }

        let (key_bytes, der) = secret_bytes.split_at(KEY_SIZE);
        let symmetric_key = SymmetricKey::from_slice(key_bytes)?;
        let signing = SigningIdentity::from_pkcs8_der(der)?;
        let lineage_nonce = LineageNonce::from_slice(nonce_bytes)?;

        Ok(Self {
            symmetric_key,
            lineage_nonce,
            signing,
        })
    }
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore")
            .field("lineage", &self.public().short_id())
            .finish_non_exhaustive()
    }
}

/// Generate a brand-new lineage.
///
/// The symmetric key, lineage nonce and signing seed come from independent
/// draws of the OS random source. Never retried: a failing random source is
/// returned to the caller as [`CryptoError::RandomSourceFailed`].
pub fn generate_lineage() -> CryptoResult<(SecretStore, PublicIdentity)> {
    let symmetric_key = SymmetricKey::generate()?;
    let lineage_nonce = LineageNonce::generate()?;
    let signing = SigningIdentity::generate()?;
    let public = signing.public();

    Ok((
        SecretStore::new(symmetric_key, lineage_nonce, signing),
        public,
    ))
}
