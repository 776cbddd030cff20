//! The firmware bundle value and its reference verification path

use obsidian_crypto::{
    BUNDLE_NONCE_SIZE, BundleNonce, DetachedSignature, LineageNonce, PublicIdentity,
    SIGNATURE_SIZE, SymmetricKey, digest,
};
use tracing::debug;

use crate::error::{BundleError, BundleResult};
use crate::format::{
    BundleHeader, CIPHERTEXT_OFFSET, FORMAT_VERSION, HEADER_OFFSET, HEADER_SIZE, MAX_BUNDLE_SIZE,
    MAX_FIRMWARE_SIZE, MAX_MESSAGE_SIZE, MESSAGE_TERMINATOR, MIN_BUNDLE_SIZE, NONCE_OFFSET,
    SIGNATURE_OFFSET, SIGNING_CONTEXT,
};

/// A signed, encrypted firmware bundle
///
/// Immutable once built. Parsing with [`Bundle::from_bytes`] only checks the
/// structure; the header sizes are not trusted until [`Bundle::verify`] has
/// succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    signature: DetachedSignature,
    header: BundleHeader,
    nonce: BundleNonce,
    ciphertext: Vec<u8>,
}

/// A decrypted and verified release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: u16,
    pub firmware: Vec<u8>,
    pub message: String,
}

impl Bundle {
    pub(crate) fn new(
        signature: DetachedSignature,
        header: BundleHeader,
        nonce: BundleNonce,
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            signature,
            header,
            nonce,
            ciphertext,
        }
    }

    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    pub fn nonce(&self) -> &BundleNonce {
        &self.nonce
    }

    pub fn signature(&self) -> &DetachedSignature {
        &self.signature
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        CIPHERTEXT_OFFSET + self.ciphertext.len()
    }

    /// Associated data bound into the AEAD tag
    pub(crate) fn associated_data(header: &BundleHeader, nonce: &BundleNonce) -> Vec<u8> {
        let mut aad = Vec::with_capacity(1 + HEADER_SIZE + BUNDLE_NONCE_SIZE);
        aad.push(FORMAT_VERSION);
        aad.extend_from_slice(&header.to_bytes());
        aad.extend_from_slice(nonce.as_bytes());
        aad
    }

    /// Everything after the signature
    pub(crate) fn signable(
        header: &BundleHeader,
        nonce: &BundleNonce,
        ciphertext: &[u8],
    ) -> Vec<u8> {
        let mut signable = Self::associated_data(header, nonce);
        signable.extend_from_slice(ciphertext);
        signable
    }

    /// Digest the signature is computed over
    pub(crate) fn signing_digest(
        header: &BundleHeader,
        nonce: &BundleNonce,
        ciphertext: &[u8],
    ) -> [u8; 32] {
        digest(SIGNING_CONTEXT, &Self::signable(header, nonce, ciphertext))
    }

    /// Encode to the wire format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.push(FORMAT_VERSION);
        bytes.extend_from_slice(self.signature.as_bytes());
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(self.nonce.as_bytes());
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Structural parse of the wire format
    pub fn from_bytes(data: &[u8]) -> BundleResult<Self> {
        let Some(&format_version) = data.first() else {
            return Err(BundleError::Truncated {
                expected: MIN_BUNDLE_SIZE,
                actual: 0,
            });
        };
        if format_version != FORMAT_VERSION {
            return Err(BundleError::UnsupportedFormat(format_version));
        }
        if data.len() < MIN_BUNDLE_SIZE {
            return Err(BundleError::Truncated {
                expected: MIN_BUNDLE_SIZE,
                actual: data.len(),
            });
        }
        if data.len() > MAX_BUNDLE_SIZE {
            return Err(BundleError::Oversized {
                size: data.len(),
                max: MAX_BUNDLE_SIZE,
            });
        }

        let mut signature = [0u8; SIGNATURE_SIZE];
        signature.copy_from_slice(&data[SIGNATURE_OFFSET..HEADER_OFFSET]);

        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&data[HEADER_OFFSET..NONCE_OFFSET]);

        let mut nonce = [0u8; BUNDLE_NONCE_SIZE];
        nonce.copy_from_slice(&data[NONCE_OFFSET..CIPHERTEXT_OFFSET]);

        Ok(Self {
            signature: DetachedSignature::from_bytes(signature),
            header: BundleHeader::from_bytes(&header),
            nonce: BundleNonce::from_bytes(nonce),
            ciphertext: data[CIPHERTEXT_OFFSET..].to_vec(),
        })
    }

    /// Check the signature against a lineage's public key
    pub fn verify(&self, public: &PublicIdentity) -> BundleResult<()> {
        let digest = Self::signing_digest(&self.header, &self.nonce, &self.ciphertext);
        public
            .verify_digest(&digest, &self.signature)
            .map_err(|_| BundleError::SignatureInvalid)?;

        debug!(
            lineage = %public.short_id(),
            version = self.header.version,
            "Bundle signature verified"
        );
        Ok(())
    }

    /// Decrypt the payload. Call [`Bundle::verify`] first.
    pub fn decrypt(
        &self,
        key: &SymmetricKey,
        lineage_nonce: &LineageNonce,
    ) -> BundleResult<Release> {
        if !self.nonce.belongs_to(lineage_nonce) {
            return Err(BundleError::LineageMismatch);
        }

        let header = &self.header;
        if header.firmware_size as usize > MAX_FIRMWARE_SIZE
            || header.message_size as usize > MAX_MESSAGE_SIZE
        {
            return Err(BundleError::Malformed(format!(
                "header sizes out of bounds (firmware {}, message {})",
                header.firmware_size, header.message_size
            )));
        }
        if self.ciphertext.len() != header.ciphertext_len() {
            return Err(BundleError::Malformed(format!(
                "ciphertext is {} bytes, header implies {}",
                self.ciphertext.len(),
                header.ciphertext_len()
            )));
        }

        let aad = Self::associated_data(header, &self.nonce);
        let mut plaintext = key.open(&self.nonce, &aad, &self.ciphertext)?;

        if plaintext.pop() != Some(MESSAGE_TERMINATOR) {
            return Err(BundleError::Malformed("missing message terminator".to_string()));
        }

        let message_bytes = plaintext.split_off(header.firmware_size as usize);
        let message = String::from_utf8(message_bytes)
            .map_err(|e| BundleError::Malformed(format!("release message is not UTF-8: {}", e)))?;

        Ok(Release {
            version: header.version,
            firmware: plaintext,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obsidian_crypto::generate_lineage;

    use crate::protector::protect;

    #[test]
    fn test_to_from_bytes() {
        let (secrets, _) = generate_lineage().unwrap();
        let bundle = protect(b"firmware", 3, "notes", &secrets).unwrap();

        let bytes = bundle.to_bytes();
        assert_eq!(bytes.len(), bundle.encoded_len());
        assert_eq!(bytes[0], FORMAT_VERSION);

        let parsed = Bundle::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, bundle);
    }

    #[test]
    fn test_empty_input_truncated() {
        assert!(matches!(
            Bundle::from_bytes(&[]),
            Err(BundleError::Truncated { actual: 0, .. })
        ));
    }

    #[test]
    fn test_short_input_truncated() {
        let mut data = vec![0u8; MIN_BUNDLE_SIZE - 1];
        data[0] = FORMAT_VERSION;
        assert!(matches!(
            Bundle::from_bytes(&data),
            Err(BundleError::Truncated { .. })
        ));
    }

    #[test]
    fn test_oversized_input_rejected() {
        let mut data = vec![0u8; MAX_BUNDLE_SIZE + 1];
        data[0] = FORMAT_VERSION;
        assert!(matches!(
            Bundle::from_bytes(&data),
            Err(BundleError::Oversized { size, max })
                if size == MAX_BUNDLE_SIZE + 1 && max == MAX_BUNDLE_SIZE
        ));
    }

    #[test]
    fn test_largest_bundle_parses() {
        let (secrets, _) = generate_lineage().unwrap();
        let bundle = protect(
            &vec![0u8; MAX_FIRMWARE_SIZE],
            1,
            &"m".repeat(MAX_MESSAGE_SIZE),
            &secrets,
        )
        .unwrap();

        let bytes = bundle.to_bytes();
        assert_eq!(bytes.len(), MAX_BUNDLE_SIZE);
        assert!(Bundle::from_bytes(&bytes).is_ok());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let (secrets, _) = generate_lineage().unwrap();
        let mut bytes = protect(b"fw", 1, "", &secrets).unwrap().to_bytes();
        bytes[0] = 2;

        assert!(matches!(
            Bundle::from_bytes(&bytes),
            Err(BundleError::UnsupportedFormat(2))
        ));
    }

    #[test]
    fn test_decrypt_checks_lineage_nonce() {
        let (secrets, public) = generate_lineage().unwrap();
        let bundle = protect(b"fw", 1, "m", &secrets).unwrap();
        bundle.verify(&public).unwrap();

        let other = LineageNonce::from_bytes([0x55; 16]);
        assert!(matches!(
            bundle.decrypt(secrets.symmetric_key(), &other),
            Err(BundleError::LineageMismatch)
        ));
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let (secrets, _) = generate_lineage().unwrap();
        let (other, _) = generate_lineage().unwrap();
        let bundle = protect(b"fw", 1, "m", &secrets).unwrap();

        let result = bundle.decrypt(other.symmetric_key(), secrets.lineage_nonce());
        assert!(matches!(result, Err(BundleError::Crypto(_))));
    }

    #[test]
    fn test_decrypt_rejects_inconsistent_lengths() {
        let (secrets, _) = generate_lineage().unwrap();
        let mut bytes = protect(b"firmware", 1, "m", &secrets).unwrap().to_bytes();
        bytes.push(0);

        let bundle = Bundle::from_bytes(&bytes).unwrap();
        assert!(matches!(
            bundle.decrypt(secrets.symmetric_key(), secrets.lineage_nonce()),
            Err(BundleError::Malformed(_))
        ));
    }
}
