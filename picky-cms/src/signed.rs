//! SignedData (RFC 5652 section 5).
//!
//! ```text
//! SignedData ::= SEQUENCE {
//!     version CMSVersion,
//!     digestAlgorithms DigestAlgorithmIdentifiers,
//!     encapContentInfo EncapsulatedContentInfo,
//!     certificates [0] IMPLICIT CertificateSet OPTIONAL,
//!     crls [1] IMPLICIT RevocationInfoChoices OPTIONAL,
//!     signerInfos SignerInfos }
//!
//! SignerInfo ::= SEQUENCE {
//!     version CMSVersion,
//!     sid SignerIdentifier,
//!     digestAlgorithm DigestAlgorithmIdentifier,
//!     signedAttrs [0] IMPLICIT SignedAttributes OPTIONAL,
//!     signatureAlgorithm SignatureAlgorithmIdentifier,
//!     signature SignatureValue,
//!     unsignedAttrs [1] IMPLICIT UnsignedAttributes OPTIONAL }
//! ```

use crate::algorithm::{AlgorithmIdentifier, SignatureAlgorithm};
use crate::attribute::AttributeTable;
use crate::certificate::{read_issuer_and_serial, CertificateInfo};
use crate::config::{CmsContext, SignerIdentifierKind};
use crate::content_info::{decode_ber, read_content_info, read_octet_string_content, wrap};
use crate::error::CmsError;
use crate::hash::HashAlgorithm;
use crate::key::{PrivateKey, PrivateKeyKind, PublicKey};
use crate::oids;
use crate::signature::{sign_digest, verify_digest};
use picky_cms_asn1::{Node, ObjectIdentifier, Reader, Tag};
use rsa::traits::PublicKeyParts;

/// Certificates retained from a decoded CertificateSet.
pub const MAX_CERTIFICATES: usize = 15;

/// Signer designation decoded from a SignerInfo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerIdentifier {
    IssuerAndSerialNumber { issuer: Vec<u8>, serial_number: Vec<u8> },
    SubjectKeyIdentifier(Vec<u8>),
}

impl SignerIdentifier {
    pub fn matches(&self, certificate: &CertificateInfo) -> bool {
        match self {
            Self::IssuerAndSerialNumber { issuer, serial_number } => {
                certificate.matches_issuer_and_serial(issuer, serial_number)
            }
            Self::SubjectKeyIdentifier(skid) => certificate.matches_subject_key_identifier(skid),
        }
    }
}

/// Result of a successful SignedData verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDataOutput {
    pub content_type: ObjectIdentifier,
    /// `None` for detached signatures and degenerate messages.
    pub content: Option<Vec<u8>>,
    pub signed_attributes: AttributeTable,
    pub unsigned_attributes: AttributeTable,
    /// DER certificates from the CertificateSet, in message order.
    pub certificates: Vec<Vec<u8>>,
    /// Index in `certificates` of the certificate whose key verified the signature, `None` when the
    /// configured certificate was used or when there is no signer.
    pub signer_certificate_index: Option<usize>,
    pub hash_algorithm: Option<HashAlgorithm>,
    pub signer_identifier: Option<SignerIdentifier>,
    pub degenerate: bool,
}

enum EncapContent<'a> {
    Embedded(&'a [u8]),
    Detached(usize),
}

// === encode === //

impl CmsContext {
    /// Signs `content` and embeds it.
    ///
    /// The certificate chain is emitted then cleared.
    pub fn encode_signed_data(&mut self, content: &[u8]) -> Result<Vec<u8>, CmsError> {
        let content_digest = self.hash_algorithm.digest(content);
        let encoded = self
            .signed_data_node(EncapContent::Embedded(content), &content_digest, false)?
            .to_vec();
        self.certificate_chain.clear();
        Ok(encoded)
    }

    /// Same as [`CmsContext::encode_signed_data`], writing into `out`.
    ///
    /// Returns the number of bytes written.
    pub fn encode_signed_data_into(&mut self, content: &[u8], out: &mut [u8]) -> Result<usize, CmsError> {
        let content_digest = self.hash_algorithm.digest(content);
        let written = self
            .signed_data_node(EncapContent::Embedded(content), &content_digest, false)?
            .write_to_slice(out)?;
        self.certificate_chain.clear();
        Ok(written)
    }

    /// Output buffer size required by [`CmsContext::encode_signed_data_into`].
    ///
    /// Exact for RSA signers, whose signature is as long as the modulus.
    ///
    /// For ECDSA signers this is an upper bound: the DER `SEQUENCE { r, s }` length depends on the
    /// signature value, so the largest encoding for the curve is assumed, both integers taking a leading
    /// zero byte. Use the length returned by [`CmsContext::encode_signed_data_into`] to trim the output.
    pub fn encoded_signed_data_len(&self, content: &[u8]) -> Result<usize, CmsError> {
        let content_digest = self.hash_algorithm.digest(content);
        Ok(self
            .signed_data_node(EncapContent::Embedded(content), &content_digest, true)?
            .encoded_len())
    }

    /// Encodes a SignedData without its content octets.
    ///
    /// `header || content || footer` is the complete message, so large contents never need to be held in
    /// memory along with the encoding.
    pub fn encode_signed_detached_parts(
        &mut self,
        content_digest: &[u8],
        content_len: usize,
    ) -> Result<(Vec<u8>, Vec<u8>), CmsError> {
        self.check_external_digest(self.hash_algorithm, content_digest)?;
        let parts = self
            .signed_data_node(EncapContent::Detached(content_len), content_digest, false)?
            .encode_split();
        self.certificate_chain.clear();
        Ok(parts)
    }

    /// Certificates-only SignedData: no content, no digest algorithm and no signer.
    pub fn encode_degenerate_signed_data(&mut self) -> Result<Vec<u8>, CmsError> {
        let certificates = self
            .certificate_set()
            .ok_or_else(|| CmsError::invalid_argument("degenerate SignedData requires at least one certificate"))?;

        let signed_data = Node::sequence(vec![
            Node::small_integer(1),
            Node::set(Vec::new()),
            Node::sequence(vec![Node::oid(&oids::data())]),
            certificates,
            Node::set(Vec::new()),
        ]);

        let encoded = wrap(&oids::signed_data(), signed_data).to_vec();
        self.certificate_chain.clear();
        Ok(encoded)
    }

    fn check_external_digest(&self, hash: HashAlgorithm, digest: &[u8]) -> Result<(), CmsError> {
        if digest.len() != hash.output_size() {
            return Err(CmsError::invalid_argument(format!(
                "{:?} digest must be {} bytes long, got {}",
                hash,
                hash.output_size(),
                digest.len()
            )));
        }
        Ok(())
    }

    /// `[0] IMPLICIT CertificateSet` with the signer certificate first, `None` when there is nothing to emit.
    fn certificate_set(&self) -> Option<Node<'_>> {
        let certificates: Vec<Node<'_>> = self
            .certificate
            .iter()
            .map(|certificate| Node::raw(certificate.der()))
            .chain(self.certificate_chain.iter().map(|der| Node::raw(der.as_slice())))
            .collect();

        if certificates.is_empty() {
            None
        } else {
            Some(Node::context(0, certificates))
        }
    }

    fn signed_data_node<'a>(
        &'a self,
        encap: EncapContent<'a>,
        content_digest: &[u8],
        signature_placeholder: bool,
    ) -> Result<Node<'a>, CmsError> {
        let hash = self.hash_algorithm;
        let private_key = self.require_private_key()?;
        let certificate = self.require_certificate()?;
        let signature_algorithm = SignatureAlgorithm::new(private_key.algorithm(), hash);

        let (signer_version, sid) = match self.signer_identifier {
            SignerIdentifierKind::IssuerAndSerialNumber => (1, certificate.issuer_and_serial_number()),
            SignerIdentifierKind::SubjectKeyIdentifier => {
                let skid = certificate
                    .subject_key_identifier()
                    .ok_or_else(|| CmsError::invalid_argument("certificate has no subject key identifier"))?;
                (3, Node::context_primitive(0, skid))
            }
        };

        let (signed_attributes, signed_digest) = if self.signed_attributes {
            let table = self.signed_attribute_table(content_digest);
            let flat = table.to_set_content().to_vec();
            let digest = hash.digest(&Node::set(vec![Node::raw(flat.as_slice())]).to_vec());
            (Some(flat), digest)
        } else {
            (None, content_digest.to_vec())
        };

        let signature = if signature_placeholder {
            vec![0; max_signature_len(private_key)]
        } else {
            self.with_rng(|rng| sign_digest(private_key, hash, &signed_digest, rng))?
        };

        let mut signer_info = vec![
            Node::small_integer(signer_version),
            sid,
            AlgorithmIdentifier::new_with_null(hash.to_oid()).into_node(),
        ];
        if let Some(flat) = signed_attributes {
            signer_info.push(Node::context(0, vec![Node::raw(flat)]));
        }
        signer_info.push(signature_algorithm.to_algorithm_identifier().into_node());
        signer_info.push(Node::octet_string(signature));

        let mut encap_content_info = vec![Node::oid(&self.content_type)];
        match encap {
            EncapContent::Embedded(content) => encap_content_info.push(Node::explicit(0, Node::octet_string(content))),
            EncapContent::Detached(len) => {
                encap_content_info.push(Node::explicit(0, Node::detached(Tag::OCTET_STRING, len)))
            }
        }

        let mut signed_data = vec![
            Node::small_integer(1),
            Node::set(vec![AlgorithmIdentifier::new_with_null(hash.to_oid()).into_node()]),
            Node::sequence(encap_content_info),
        ];
        if let Some(certificates) = self.certificate_set() {
            signed_data.push(certificates);
        }
        signed_data.push(Node::set(vec![Node::sequence(signer_info)]));

        log::debug!(
            "encoding SignedData with signer info version {} ({:?})",
            signer_version,
            signature_algorithm
        );

        Ok(wrap(&oids::signed_data(), Node::sequence(signed_data)))
    }
}

fn max_signature_len(private_key: &PrivateKey) -> usize {
    match private_key.kind() {
        PrivateKeyKind::Rsa(key) => key.size(),
        PrivateKeyKind::Ec(key) => {
            // SEQUENCE { INTEGER r, INTEGER s }, both possibly prefixed with a zero byte
            let integer_len = 2 + key.curve().field_bytes_size() + 1;
            2 + 2 * integer_len
        }
    }
}

// === decode === //

struct SignerInfoFields<'a> {
    identifier: SignerIdentifier,
    digest_algorithm: HashAlgorithm,
    signed_attributes: Option<(&'a [u8], AttributeTable)>,
    unsigned_attributes: AttributeTable,
    signature_algorithm: SignatureAlgorithm,
    signature: &'a [u8],
}

/// Everything following the encapsulated content.
struct SignedDataTail<'a> {
    certificates: Vec<&'a [u8]>,
    signer: Option<SignerInfoFields<'a>>,
}

struct SignedDataHead {
    degenerate: bool,
    content_type: ObjectIdentifier,
}

impl CmsContext {
    /// Decodes and verifies a SignedData with embedded content.
    pub fn verify_signed_data(&self, input: &[u8]) -> Result<SignedDataOutput, CmsError> {
        decode_ber(input, |input| self.verify_signed_data_impl(input, None))
    }

    /// Decodes and verifies a SignedData against an externally computed content digest.
    ///
    /// Works for detached signatures as well as for embedded content, which must then match the digest.
    pub fn verify_signed_data_with_digest(
        &self,
        input: &[u8],
        content_digest: &[u8],
    ) -> Result<SignedDataOutput, CmsError> {
        decode_ber(input, |input| self.verify_signed_data_impl(input, Some(content_digest)))
    }

    /// Verifies a message produced by [`CmsContext::encode_signed_detached_parts`] without its content.
    pub fn verify_signed_data_detached_parts(
        &self,
        header: &[u8],
        footer: &[u8],
        content_digest: &[u8],
        content_len: usize,
    ) -> Result<SignedDataOutput, CmsError> {
        let mut reader = Reader::new(header);
        reader.read_expected_header(Tag::SEQUENCE)?;
        check_content_type(reader.read_oid()?, oids::SIGNED_DATA)?;
        reader.read_expected_header(Tag::CTX_0)?;
        reader.read_expected_header(Tag::SEQUENCE)?;

        let head = read_signed_data_head(&mut reader, self.allow_degenerate)?;

        reader.read_expected_header(Tag::SEQUENCE)?;
        let content_type = reader.read_oid()?;
        reader.read_expected_header(Tag::CTX_0)?;
        let encoded_len = reader.read_expected_header(Tag::OCTET_STRING)?;
        if encoded_len != content_len {
            return Err(CmsError::invalid_argument(format!(
                "content length is {} but the header announces {}",
                content_len, encoded_len
            )));
        }
        reader.finish()?;

        let mut footer = Reader::new(footer);
        let tail = read_signed_data_tail(&mut footer)?;
        footer.finish()?;

        self.verify_decoded(
            SignedDataHead { content_type, ..head },
            tail,
            None,
            Some(content_digest),
        )
    }

    fn verify_signed_data_impl(
        &self,
        input: &[u8],
        external_digest: Option<&[u8]>,
    ) -> Result<SignedDataOutput, CmsError> {
        let mut content = read_content_info(input, oids::SIGNED_DATA)?;
        let mut signed_data = content.read_sequence()?;
        content.finish()?;

        let head = read_signed_data_head(&mut signed_data, self.allow_degenerate)?;

        let mut encap = signed_data.read_sequence()?;
        let content_type = encap.read_oid()?;
        let embedded = match encap.read_optional_context(0)? {
            Some(mut explicit) => {
                let content = read_octet_string_content(&mut explicit)?;
                explicit.finish()?;
                Some(content)
            }
            None => None,
        };
        encap.finish()?;

        let tail = read_signed_data_tail(&mut signed_data)?;
        signed_data.finish()?;

        self.verify_decoded(
            SignedDataHead { content_type, ..head },
            tail,
            embedded,
            external_digest,
        )
    }

    fn verify_decoded(
        &self,
        head: SignedDataHead,
        tail: SignedDataTail<'_>,
        content: Option<Vec<u8>>,
        external_digest: Option<&[u8]>,
    ) -> Result<SignedDataOutput, CmsError> {
        let certificates: Vec<Vec<u8>> = tail.certificates.iter().map(|der| der.to_vec()).collect();

        let signer = match tail.signer {
            Some(signer) => signer,
            None if head.degenerate && self.allow_degenerate => {
                log::warn!("degenerate SignedData accepted ({} certificates)", certificates.len());
                return Ok(SignedDataOutput {
                    content_type: head.content_type,
                    content,
                    signed_attributes: AttributeTable::new(),
                    unsigned_attributes: AttributeTable::new(),
                    certificates,
                    signer_certificate_index: None,
                    hash_algorithm: None,
                    signer_identifier: None,
                    degenerate: true,
                });
            }
            None => return Err(CmsError::NoSigner),
        };

        let hash = signer.digest_algorithm;
        let content_digest = match (external_digest, &content) {
            (Some(digest), Some(content)) => {
                self.check_external_digest(hash, digest)?;
                if hash.digest(content) != digest {
                    return Err(CmsError::SignatureVerification);
                }
                Some(digest.to_vec())
            }
            (Some(digest), None) => {
                self.check_external_digest(hash, digest)?;
                Some(digest.to_vec())
            }
            (None, Some(content)) => Some(hash.digest(content)),
            (None, None) => None,
        };

        let signed_digest = match &signer.signed_attributes {
            Some((raw, table)) => {
                let message_digest = table.message_digest()?.ok_or(CmsError::SignatureVerification)?;
                if let Some(content_digest) = &content_digest {
                    if message_digest != content_digest.as_slice() {
                        log::debug!("messageDigest attribute doesn't match the content digest");
                        return Err(CmsError::SignatureVerification);
                    }
                }

                if let Some(attribute_content_type) = table.content_type()? {
                    if attribute_content_type != head.content_type {
                        log::debug!("contentType attribute doesn't match the encapsulated content type");
                        return Err(CmsError::SignatureVerification);
                    }
                }

                hash.digest(&Node::set(vec![Node::raw(*raw)]).to_vec())
            }
            None => content_digest.ok_or_else(|| {
                CmsError::invalid_argument("detached signature without signed attributes requires the content digest")
            })?,
        };

        let signer_certificate_index = self.find_signer(&signer, &certificates, &signed_digest)?;

        let (signed_attributes, unsigned_attributes) = (
            signer.signed_attributes.map(|(_, table)| table).unwrap_or_default(),
            signer.unsigned_attributes,
        );

        Ok(SignedDataOutput {
            content_type: head.content_type,
            content,
            signed_attributes,
            unsigned_attributes,
            certificates,
            signer_certificate_index,
            hash_algorithm: Some(hash),
            signer_identifier: Some(signer.identifier),
            degenerate: head.degenerate,
        })
    }

    /// Tries the certificate designated by the signer identifier, then every certificate of the message,
    /// then the configured certificate.
    fn find_signer(
        &self,
        signer: &SignerInfoFields<'_>,
        certificates: &[Vec<u8>],
        signed_digest: &[u8],
    ) -> Result<Option<usize>, CmsError> {
        let parsed: Vec<Option<CertificateInfo>> = certificates
            .iter()
            .map(|der| match CertificateInfo::from_der(der) {
                Ok(certificate) => Some(certificate),
                Err(e) => {
                    log::debug!("skipping undecodable certificate: {}", e);
                    None
                }
            })
            .collect();

        let verifies = |public_key: &PublicKey| {
            verify_digest(public_key, signer.signature_algorithm, signed_digest, signer.signature).is_ok()
        };

        let designated = parsed
            .iter()
            .position(|certificate| matches!(certificate, Some(c) if signer.identifier.matches(c)));
        if let Some(index) = designated {
            if let Some(certificate) = &parsed[index] {
                if verifies(certificate.public_key()) {
                    log::debug!("signature verified with designated certificate #{}", index);
                    return Ok(Some(index));
                }
            }
        }

        for (index, certificate) in parsed.iter().enumerate() {
            if Some(index) == designated {
                continue;
            }
            if let Some(certificate) = certificate {
                if verifies(certificate.public_key()) {
                    log::debug!("signature verified with certificate #{}", index);
                    return Ok(Some(index));
                }
            }
        }

        if let Some(certificate) = &self.certificate {
            if verifies(certificate.public_key()) {
                log::debug!("signature verified with the configured certificate");
                return Ok(None);
            }
        }

        Err(CmsError::SignatureVerification)
    }
}

fn check_content_type(content_type: ObjectIdentifier, expected: &'static str) -> Result<(), CmsError> {
    let content_type: String = content_type.into();
    if content_type != expected {
        return Err(CmsError::WrongContentType {
            expected,
            actual: content_type,
        });
    }
    Ok(())
}

/// Version and digest algorithms.
fn read_signed_data_head(reader: &mut Reader<'_>, allow_degenerate: bool) -> Result<SignedDataHead, CmsError> {
    let version = reader.read_small_integer()?;
    if version != 1 {
        return Err(CmsError::Version {
            structure: "SignedData",
            version,
        });
    }

    let mut digest_algorithms = reader.read_set()?;
    let mut count = 0;
    while !digest_algorithms.is_empty() {
        AlgorithmIdentifier::decode(&mut digest_algorithms)?;
        count += 1;
    }

    let degenerate = count == 0;
    if degenerate && !allow_degenerate {
        return Err(CmsError::NoSigner);
    }

    log::debug!("SignedData version {} with {} digest algorithms", version, count);

    Ok(SignedDataHead {
        degenerate,
        content_type: oids::data(),
    })
}

fn read_signed_data_tail<'a>(reader: &mut Reader<'a>) -> Result<SignedDataTail<'a>, CmsError> {
    let mut certificates = Vec::new();
    if let Some(mut set) = reader.read_optional_context(0)? {
        while !set.is_empty() {
            if set.peek_is(Tag::SEQUENCE) && certificates.len() < MAX_CERTIFICATES {
                certificates.push(set.read_expected_raw(Tag::SEQUENCE)?);
            } else {
                set.skip()?;
            }
        }
    }

    // revocation information isn't used
    if reader.peek_is(Tag::CTX_1) {
        reader.skip()?;
    }

    let mut signer_infos = reader.read_set()?;
    let signer = if signer_infos.is_empty() {
        None
    } else {
        Some(read_signer_info(&mut signer_infos)?)
    };

    Ok(SignedDataTail { certificates, signer })
}

fn read_signer_info<'a>(reader: &mut Reader<'a>) -> Result<SignerInfoFields<'a>, CmsError> {
    let mut signer_info = reader.read_sequence()?;

    let version = signer_info.read_small_integer()?;
    log::debug!("verifying signer info version {}", version);

    let identifier = match version {
        1 => {
            let (issuer, serial_number) = read_issuer_and_serial(&mut signer_info)?;
            SignerIdentifier::IssuerAndSerialNumber {
                issuer: issuer.to_vec(),
                serial_number: serial_number.to_vec(),
            }
        }
        3 => {
            let skid = if signer_info.peek_is(Tag::CTX_0) {
                let mut explicit = signer_info.read_context(0)?;
                let skid = explicit.read_octet_string()?;
                explicit.finish()?;
                skid
            } else {
                signer_info.read_context_primitive(0)?
            };
            SignerIdentifier::SubjectKeyIdentifier(skid.to_vec())
        }
        _ => {
            return Err(CmsError::Version {
                structure: "SignerInfo",
                version,
            })
        }
    };

    let digest_algorithm = HashAlgorithm::from_oid(AlgorithmIdentifier::decode(&mut signer_info)?.oid())?;

    let signed_attributes = match signer_info.read_optional(Tag::CTX_0)? {
        Some(raw) => Some((raw, AttributeTable::decode(raw)?)),
        None => None,
    };

    let signature_algorithm =
        SignatureAlgorithm::from_oid(AlgorithmIdentifier::decode(&mut signer_info)?.oid(), digest_algorithm)?;
    let signature = signer_info.read_octet_string()?;

    let unsigned_attributes = match signer_info.read_optional(Tag::CTX_1)? {
        Some(raw) => AttributeTable::decode(raw)?,
        None => AttributeTable::new(),
    };
    signer_info.finish()?;

    Ok(SignerInfoFields {
        identifier,
        digest_algorithm,
        signed_attributes,
        unsigned_attributes,
        signature_algorithm,
        signature,
    })
}
