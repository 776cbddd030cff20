//! Reference verifier
//!
//! Mirrors the checks a bootloader performs before installing an update:
//! structure, signature, lineage, then authenticated decryption. Version
//! rollback policy stays with the device.

use obsidian_crypto::{LineageNonce, PublicIdentity, SecretStore, SymmetricKey};

use crate::bundle::{Bundle, Release};
use crate::error::BundleResult;

/// Key material a verifier holds for one lineage
#[derive(Debug, Clone)]
pub struct VerifierKeys {
    pub public: PublicIdentity,
    pub symmetric_key: SymmetricKey,
    pub lineage_nonce: LineageNonce,
}

impl VerifierKeys {
    /// Assemble verifier keys from a secret store and a public key artifact.
    ///
    /// The public key is taken separately so a mismatched public artifact is
    /// caught at verification time rather than silently replaced.
    pub fn new(secrets: &SecretStore, public: PublicIdentity) -> Self {
        Self {
            public,
            symmetric_key: secrets.symmetric_key().clone(),
            lineage_nonce: *secrets.lineage_nonce(),
        }
    }
}

/// Parse, verify and decrypt a bundle
pub fn open(data: &[u8], keys: &VerifierKeys) -> BundleResult<Release> {
    let bundle = Bundle::from_bytes(data)?;
    bundle.verify(&keys.public)?;
    bundle.decrypt(&keys.symmetric_key, &keys.lineage_nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BundleError;
    use crate::protector::protect;
    use obsidian_crypto::generate_lineage;

    #[test]
    fn test_open() {
        let (secrets, public) = generate_lineage().unwrap();
        let keys = VerifierKeys::new(&secrets, public);

        let bundle = protect(b"image", 9, "fixes", &secrets).unwrap();
        let release = open(&bundle.to_bytes(), &keys).unwrap();

        assert_eq!(release.version, 9);
        assert_eq!(release.firmware, b"image");
        assert_eq!(release.message, "fixes");
    }

    #[test]
    fn test_open_with_mismatched_public_key() {
        let (secrets, _) = generate_lineage().unwrap();
        let (_, other_public) = generate_lineage().unwrap();
        let keys = VerifierKeys::new(&secrets, other_public);

        let bundle = protect(b"image", 1, "", &secrets).unwrap();
        assert!(matches!(
            open(&bundle.to_bytes(), &keys),
            Err(BundleError::SignatureInvalid)
        ));
    }
}
