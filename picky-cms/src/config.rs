//! CMS context and its builder.

use crate::algorithm::{ContentEncryptionAlgorithm, KeyAgreementAlgorithm, KeyWrapAlgorithm};
use crate::attribute::{Attribute, AttributeTable};
use crate::certificate::CertificateInfo;
use crate::date::UtcDate;
use crate::error::CmsError;
use crate::hash::HashAlgorithm;
use crate::key::PrivateKey;
use crate::oids;
use picky_cms_asn1::ObjectIdentifier;
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use zeroize::Zeroizing;

/// Default cap on the size of decompressed content.
pub const DEFAULT_DECOMPRESSION_LIMIT: usize = 64 * 1024 * 1024;

/// How a SignerInfo designates the signer certificate.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignerIdentifierKind {
    /// SignerInfo version 1
    IssuerAndSerialNumber,
    /// SignerInfo version 3, the certificate must carry the extension
    SubjectKeyIdentifier,
}

/// Builds a [`CmsContext`].
///
/// Could be constructed via [`CmsContext::builder()`].
pub struct CmsContextBuilder {
    inner: CmsContext,
}

impl CmsContextBuilder {
    /// Type of the content embedded by SignedData, EnvelopedData, EncryptedData and CompressedData.
    pub fn with_content_type(mut self, content_type: ObjectIdentifier) -> Self {
        self.inner.content_type = content_type;
        self
    }

    pub fn with_hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.inner.hash_algorithm = hash_algorithm;
        self
    }

    pub fn with_content_encryption_algorithm(mut self, algorithm: ContentEncryptionAlgorithm) -> Self {
        self.inner.content_encryption_algorithm = algorithm;
        self
    }

    /// Key agreement recipients only
    pub fn with_key_wrap_algorithm(mut self, algorithm: KeyWrapAlgorithm) -> Self {
        self.inner.key_wrap_algorithm = algorithm;
        self
    }

    /// Key agreement recipients only
    pub fn with_key_agreement_algorithm(mut self, algorithm: KeyAgreementAlgorithm) -> Self {
        self.inner.key_agreement_algorithm = algorithm;
        self
    }

    pub fn with_signer_identifier(mut self, kind: SignerIdentifierKind) -> Self {
        self.inner.signer_identifier = kind;
        self
    }

    /// Whether certificate-only SignedData messages are accepted on verification.
    pub fn with_degenerate_allowed(mut self, allowed: bool) -> Self {
        self.inner.allow_degenerate = allowed;
        self
    }

    /// When disabled, the signature covers the content digest directly.
    pub fn with_signed_attributes(mut self, enabled: bool) -> Self {
        self.inner.signed_attributes = enabled;
        self
    }

    /// Extra signed attribute, encoded along with contentType, messageDigest and signingTime.
    pub fn with_custom_signed_attribute(mut self, attribute: Attribute) -> Self {
        self.inner.custom_signed_attributes.push(attribute);
        self
    }

    /// EncryptedData only
    pub fn with_unprotected_attribute(mut self, attribute: Attribute) -> Self {
        self.inner.unprotected_attributes.push(attribute);
        self
    }

    /// Key agreement recipients only
    pub fn with_user_keying_material(mut self, ukm: Vec<u8>) -> Self {
        self.inner.user_keying_material = Some(ukm);
        self
    }

    /// Fixed signing time, the current time is used otherwise.
    pub fn with_signing_time(mut self, signing_time: UtcDate) -> Self {
        self.inner.signing_time = Some(signing_time);
        self
    }

    pub fn with_decompression_limit(mut self, limit: usize) -> Self {
        self.inner.decompression_limit = limit;
        self
    }

    /// Signer certificate for SignedData, recipient certificate for EnvelopedData.
    pub fn with_certificate(mut self, certificate: CertificateInfo) -> Self {
        self.inner.certificate = Some(certificate);
        self
    }

    /// Signer private key for SignedData, recipient private key for EnvelopedData.
    pub fn with_private_key(mut self, private_key: PrivateKey) -> Self {
        self.inner.private_key = Some(private_key);
        self
    }

    /// Content encryption key for EncryptedData.
    pub fn with_symmetric_key(mut self, key: Vec<u8>) -> Self {
        self.inner.symmetric_key = Some(Zeroizing::new(key));
        self
    }

    /// Additional DER certificate emitted in SignedData after the signer certificate.
    pub fn with_chain_certificate(mut self, der: Vec<u8>) -> Self {
        self.inner.certificate_chain.push(der);
        self
    }

    /// Random generator used for keys, IVs and blinding.
    ///
    /// A generator seeded from the operating system is created on each call otherwise.
    pub fn with_rng<R>(mut self, rng: R) -> Self
    where
        R: CryptoRngCore + Send + 'static,
    {
        self.inner.rng = RefCell::new(Some(Box::new(rng)));
        self
    }

    /// Checks that the configured key and certificate go together.
    pub fn build(self) -> Result<CmsContext, CmsError> {
        let inner = self.inner;

        if let (Some(certificate), Some(private_key)) = (&inner.certificate, &inner.private_key) {
            let public_key = private_key.to_public_key()?;
            if &public_key != certificate.public_key() {
                return Err(CmsError::invalid_argument(
                    "private key doesn't match the certificate public key",
                ));
            }
        }

        if let Some(key) = &inner.symmetric_key {
            if key.len() != inner.content_encryption_algorithm.key_size() {
                return Err(CmsError::invalid_argument(format!(
                    "{:?} requires a {} bytes key, got {}",
                    inner.content_encryption_algorithm,
                    inner.content_encryption_algorithm.key_size(),
                    key.len()
                )));
            }
        }

        if inner.signer_identifier == SignerIdentifierKind::SubjectKeyIdentifier {
            if let Some(certificate) = &inner.certificate {
                if certificate.subject_key_identifier().is_none() {
                    return Err(CmsError::invalid_argument(
                        "certificate has no subject key identifier",
                    ));
                }
            }
        }

        Ok(inner)
    }
}

/// Immutable configuration shared by every CMS operation.
///
/// Operations return their results in per-call output structures; only the certificate chain is
/// consumed by SignedData encoding.
pub struct CmsContext {
    pub(crate) content_type: ObjectIdentifier,
    pub(crate) hash_algorithm: HashAlgorithm,
    pub(crate) content_encryption_algorithm: ContentEncryptionAlgorithm,
    pub(crate) key_wrap_algorithm: KeyWrapAlgorithm,
    pub(crate) key_agreement_algorithm: KeyAgreementAlgorithm,
    pub(crate) signer_identifier: SignerIdentifierKind,
    pub(crate) allow_degenerate: bool,
    pub(crate) signed_attributes: bool,
    pub(crate) custom_signed_attributes: Vec<Attribute>,
    pub(crate) unprotected_attributes: Vec<Attribute>,
    pub(crate) user_keying_material: Option<Vec<u8>>,
    pub(crate) signing_time: Option<UtcDate>,
    pub(crate) decompression_limit: usize,
    pub(crate) certificate: Option<CertificateInfo>,
    pub(crate) private_key: Option<PrivateKey>,
    pub(crate) symmetric_key: Option<Zeroizing<Vec<u8>>>,
    pub(crate) certificate_chain: Vec<Vec<u8>>,
    rng: RefCell<Option<Box<dyn CryptoRngCore + Send>>>,
}

impl Default for CmsContext {
    fn default() -> Self {
        Self {
            content_type: oids::data(),
            hash_algorithm: HashAlgorithm::SHA2_256,
            content_encryption_algorithm: ContentEncryptionAlgorithm::Aes256Cbc,
            key_wrap_algorithm: KeyWrapAlgorithm::Aes256Wrap,
            key_agreement_algorithm: KeyAgreementAlgorithm::StdDhSha256Kdf,
            signer_identifier: SignerIdentifierKind::IssuerAndSerialNumber,
            allow_degenerate: true,
            signed_attributes: true,
            custom_signed_attributes: Vec::new(),
            unprotected_attributes: Vec::new(),
            user_keying_material: None,
            signing_time: None,
            decompression_limit: DEFAULT_DECOMPRESSION_LIMIT,
            certificate: None,
            private_key: None,
            symmetric_key: None,
            certificate_chain: Vec::new(),
            rng: RefCell::new(None),
        }
    }
}

impl fmt::Debug for CmsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmsContext")
            .field("content_type", &self.content_type)
            .field("hash_algorithm", &self.hash_algorithm)
            .field("content_encryption_algorithm", &self.content_encryption_algorithm)
            .field("key_wrap_algorithm", &self.key_wrap_algorithm)
            .field("key_agreement_algorithm", &self.key_agreement_algorithm)
            .field("signer_identifier", &self.signer_identifier)
            .field("allow_degenerate", &self.allow_degenerate)
            .field("signed_attributes", &self.signed_attributes)
            .field("certificate", &self.certificate.is_some())
            .field("private_key", &self.private_key)
            .field("certificate_chain", &self.certificate_chain.len())
            .finish_non_exhaustive()
    }
}

impl CmsContext {
    pub fn builder() -> CmsContextBuilder {
        CmsContextBuilder {
            inner: Self::default(),
        }
    }

    pub fn content_type(&self) -> &ObjectIdentifier {
        &self.content_type
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn content_encryption_algorithm(&self) -> ContentEncryptionAlgorithm {
        self.content_encryption_algorithm
    }

    pub fn certificate(&self) -> Option<&CertificateInfo> {
        self.certificate.as_ref()
    }

    /// Certificates still waiting to be emitted by the next SignedData encoding.
    pub fn certificate_chain(&self) -> &[Vec<u8>] {
        &self.certificate_chain
    }

    pub(crate) fn require_certificate(&self) -> Result<&CertificateInfo, CmsError> {
        self.certificate
            .as_ref()
            .ok_or_else(|| CmsError::invalid_argument("no certificate configured"))
    }

    pub(crate) fn require_private_key(&self) -> Result<&PrivateKey, CmsError> {
        self.private_key
            .as_ref()
            .ok_or_else(|| CmsError::invalid_argument("no private key configured"))
    }

    pub(crate) fn require_symmetric_key(&self) -> Result<&[u8], CmsError> {
        self.symmetric_key
            .as_ref()
            .map(|key| key.as_slice())
            .ok_or_else(|| CmsError::invalid_argument("no symmetric key configured"))
    }

    pub(crate) fn signed_attribute_table(&self, content_digest: &[u8]) -> AttributeTable {
        let signing_time = self.signing_time.unwrap_or_else(UtcDate::now);

        let mut table = AttributeTable::new();
        table.push(Attribute::content_type(&self.content_type));
        table.push(Attribute::signing_time(&signing_time));
        table.push(Attribute::message_digest(content_digest));
        for attribute in &self.custom_signed_attributes {
            table.push(attribute.clone());
        }
        table
    }

    /// Runs `f` with the injected generator, or with a fresh one seeded from the operating system.
    pub(crate) fn with_rng<T>(&self, f: impl FnOnce(&mut dyn CryptoRngCore) -> T) -> T {
        let mut injected = self.rng.borrow_mut();
        match injected.as_mut() {
            Some(rng) => f(rng.as_mut()),
            None => f(&mut ChaCha20Rng::from_entropy()),
        }
    }
}
