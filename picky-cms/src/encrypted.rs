//! EncryptedData (RFC 5652 section 8) and the EncryptedContentInfo shared with EnvelopedData.
//!
//! ```text
//! EncryptedData ::= SEQUENCE {
//!     version CMSVersion,
//!     encryptedContentInfo EncryptedContentInfo,
//!     unprotectedAttrs [1] IMPLICIT UnprotectedAttributes OPTIONAL }
//!
//! EncryptedContentInfo ::= SEQUENCE {
//!     contentType ContentType,
//!     contentEncryptionAlgorithm ContentEncryptionAlgorithmIdentifier,
//!     encryptedContent [0] IMPLICIT EncryptedContent OPTIONAL }
//! ```

use crate::algorithm::{AlgorithmIdentifier, ContentEncryptionAlgorithm};
use crate::attribute::AttributeTable;
use crate::cipher;
use crate::config::CmsContext;
use crate::content_info::{collect_fragments, decode_ber, read_content_info, wrap};
use crate::error::CmsError;
use crate::oids;
use picky_cms_asn1::{Asn1DerError, Node, ObjectIdentifier, Reader, Tag};
use rand_core::RngCore;
use std::borrow::Cow;

/// Decrypted content of an EnvelopedData or EncryptedData.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedContent {
    pub content_type: ObjectIdentifier,
    pub content: Vec<u8>,
    pub unprotected_attributes: AttributeTable,
}

pub(crate) fn random_iv(context: &CmsContext, algorithm: ContentEncryptionAlgorithm) -> Vec<u8> {
    let mut iv = vec![0; algorithm.block_size()];
    context.with_rng(|rng| rng.fill_bytes(&mut iv));
    iv
}

/// Encrypts `content` and builds its EncryptedContentInfo.
pub(crate) fn encrypted_content_info(
    content_type: &ObjectIdentifier,
    algorithm: ContentEncryptionAlgorithm,
    key: &[u8],
    iv: &[u8],
    content: &[u8],
) -> Result<Node<'static>, CmsError> {
    let ciphertext = cipher::encrypt(algorithm, key, iv, content)?;
    Ok(Node::sequence(vec![
        Node::oid(content_type),
        AlgorithmIdentifier::new_with_iv(algorithm.to_oid(), iv).into_node(),
        Node::context_primitive(0, ciphertext),
    ]))
}

pub(crate) struct EncryptedContentInfo<'a> {
    pub(crate) content_type: ObjectIdentifier,
    pub(crate) algorithm: ContentEncryptionAlgorithm,
    pub(crate) iv: Vec<u8>,
    pub(crate) ciphertext: Cow<'a, [u8]>,
}

impl EncryptedContentInfo<'_> {
    pub(crate) fn decrypt(&self, key: &[u8]) -> Result<Vec<u8>, CmsError> {
        cipher::decrypt(self.algorithm, key, &self.iv, &self.ciphertext)
    }
}

pub(crate) fn read_encrypted_content_info<'a>(reader: &mut Reader<'a>) -> Result<EncryptedContentInfo<'a>, CmsError> {
    let mut info = reader.read_sequence()?;
    let content_type = info.read_oid()?;

    let algorithm_identifier = AlgorithmIdentifier::decode(&mut info)?;
    let algorithm = ContentEncryptionAlgorithm::from_oid(algorithm_identifier.oid())?;
    let iv = algorithm_identifier.octet_string_parameter()?;
    if iv.len() != algorithm.block_size() {
        return Err(Asn1DerError::InvalidData {
            context: "IV size doesn't match the cipher block size",
        }
        .into());
    }

    let ciphertext = match info.peek_tag() {
        Some(Tag::CTX_PRIMITIVE_0) => Cow::Borrowed(info.read_context_primitive(0)?),
        Some(Tag::CTX_0) => {
            let fragments = info.read_expected(Tag::CTX_0)?;
            Cow::Owned(collect_fragments(fragments)?)
        }
        Some(Tag::OCTET_STRING) => Cow::Borrowed(info.read_octet_string()?),
        Some(actual) => {
            return Err(Asn1DerError::UnexpectedTag {
                expected: Tag::CTX_PRIMITIVE_0,
                actual,
            }
            .into())
        }
        None => return Err(CmsError::invalid_argument("detached encrypted content isn't supported")),
    };
    info.finish()?;

    log::debug!(
        "{:?} encrypted content of {} bytes",
        algorithm,
        ciphertext.len()
    );

    Ok(EncryptedContentInfo {
        content_type,
        algorithm,
        iv: iv.to_vec(),
        ciphertext,
    })
}

pub(crate) fn read_unprotected_attributes(reader: &mut Reader<'_>) -> Result<Option<AttributeTable>, CmsError> {
    reader
        .read_optional(Tag::CTX_1)?
        .map(AttributeTable::decode)
        .transpose()
}

impl CmsContext {
    /// Encrypts `content` with the configured symmetric key.
    pub fn encode_encrypted_data(&self, content: &[u8]) -> Result<Vec<u8>, CmsError> {
        Ok(self.encrypted_data_node(content)?.to_vec())
    }

    /// Same as [`CmsContext::encode_encrypted_data`], writing into `out`.
    pub fn encode_encrypted_data_into(&self, content: &[u8], out: &mut [u8]) -> Result<usize, CmsError> {
        Ok(self.encrypted_data_node(content)?.write_to_slice(out)?)
    }

    pub fn decode_encrypted_data(&self, input: &[u8]) -> Result<DecryptedContent, CmsError> {
        decode_ber(input, |input| self.decode_encrypted_data_impl(input))
    }

    fn encrypted_data_node(&self, content: &[u8]) -> Result<Node<'_>, CmsError> {
        let key = self.require_symmetric_key()?;
        let algorithm = self.content_encryption_algorithm;
        let iv = random_iv(self, algorithm);

        let attributes = AttributeTable::from(self.unprotected_attributes.clone());
        let version = if attributes.is_empty() { 0 } else { 2 };

        let mut encrypted_data = vec![
            Node::small_integer(version),
            encrypted_content_info(&self.content_type, algorithm, key, &iv, content)?,
        ];
        if !attributes.is_empty() {
            encrypted_data.push(Node::context(1, vec![Node::raw(attributes.to_set_content().to_vec())]));
        }

        Ok(wrap(&oids::encrypted_data(), Node::sequence(encrypted_data)))
    }

    fn decode_encrypted_data_impl(&self, input: &[u8]) -> Result<DecryptedContent, CmsError> {
        let key = self.require_symmetric_key()?;

        let mut content = read_content_info(input, oids::ENCRYPTED_DATA)?;
        let mut encrypted_data = content.read_sequence()?;
        content.finish()?;

        let version = encrypted_data.read_small_integer()?;
        let info = read_encrypted_content_info(&mut encrypted_data)?;
        let attributes = read_unprotected_attributes(&mut encrypted_data)?;
        encrypted_data.finish()?;

        // the version depends on attributes, only known once the whole structure has been read
        let expected_version = if attributes.is_some() { 2 } else { 0 };
        if version != expected_version {
            return Err(CmsError::Version {
                structure: "EncryptedData",
                version,
            });
        }

        if key.len() != info.algorithm.key_size() {
            return Err(CmsError::invalid_argument(format!(
                "{:?} requires a {} bytes key, got {}",
                info.algorithm,
                info.algorithm.key_size(),
                key.len()
            )));
        }

        Ok(DecryptedContent {
            content: info.decrypt(key)?,
            content_type: info.content_type,
            unprotected_attributes: attributes.unwrap_or_default(),
        })
    }
}
