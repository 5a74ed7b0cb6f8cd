//! Key agreement recipients (ephemeral-static ECDH, RFC 5753).
//!
//! ```text
//! KeyAgreeRecipientInfo ::= SEQUENCE {
//!     version CMSVersion,  -- always set to 3
//!     originator [0] EXPLICIT OriginatorIdentifierOrKey,
//!     ukm [1] EXPLICIT UserKeyingMaterial OPTIONAL,
//!     keyEncryptionAlgorithm KeyEncryptionAlgorithmIdentifier,
//!     recipientEncryptedKeys RecipientEncryptedKeys }
//!
//! RecipientEncryptedKey ::= SEQUENCE {
//!     rid KeyAgreeRecipientIdentifier,
//!     encryptedKey EncryptedKey }
//!
//! KeyAgreeRecipientIdentifier ::= CHOICE {
//!     issuerAndSerialNumber IssuerAndSerialNumber,
//!     rKeyId [0] IMPLICIT RecipientKeyIdentifier }
//! ```

use crate::algorithm::{AlgorithmIdentifier, KeyAgreementAlgorithm, KeyWrapAlgorithm};
use crate::certificate::{read_issuer_and_serial, CertificateInfo};
use crate::config::CmsContext;
use crate::error::CmsError;
use crate::kdf::{ecc_cms_shared_info, unwrap_key, wrap_key, x963_kdf};
use crate::key::{EcCurve, EcPrivateKey, PrivateKey, PrivateKeyKind, PublicKeyKind};
use crate::oids;
use picky_cms_asn1::{Node, Reader, Tag};
use zeroize::Zeroizing;

/// Derives the key-encryption key from the ECDH shared secret.
fn derive_kek(
    agreement: KeyAgreementAlgorithm,
    wrap: KeyWrapAlgorithm,
    shared_secret: &[u8],
    ukm: Option<&[u8]>,
) -> Zeroizing<Vec<u8>> {
    let shared_info = ecc_cms_shared_info(wrap, ukm);
    x963_kdf(agreement.kdf_hash(), shared_secret, &shared_info, wrap.kek_size())
}

pub(crate) fn recipient_info<'a>(
    context: &'a CmsContext,
    certificate: &'a CertificateInfo,
    content_encryption_key: &[u8],
) -> Result<Node<'a>, CmsError> {
    let (curve, recipient_point) = match certificate.public_key().kind() {
        PublicKeyKind::Ec { curve, point } => (*curve, point.as_slice()),
        PublicKeyKind::Rsa(_) => {
            return Err(CmsError::unsupported_algorithm(
                "key agreement requires an EC recipient",
            ))
        }
    };

    let agreement = context.key_agreement_algorithm;
    let wrap = context.key_wrap_algorithm;
    let ukm = context.user_keying_material.as_deref();

    let ephemeral = context.with_rng(|rng| EcPrivateKey::generate(curve, rng));
    let ephemeral_point = ephemeral.public_point()?;
    let shared_secret = ephemeral.diffie_hellman(recipient_point)?;
    let kek = derive_kek(agreement, wrap, &shared_secret, ukm);
    let encrypted_key = wrap_key(wrap, &kek, content_encryption_key)?;

    let rid = match certificate.subject_key_identifier() {
        Some(skid) => Node::context(0, vec![Node::octet_string(skid)]),
        None => certificate.issuer_and_serial_number(),
    };

    let originator_key = Node::context(
        1,
        vec![
            AlgorithmIdentifier::new_without_parameters(oids::ec_public_key()).into_node(),
            Node::bit_string(&ephemeral_point),
        ],
    );

    let mut fields = vec![Node::small_integer(3), Node::explicit(0, originator_key)];
    if let Some(ukm) = ukm {
        fields.push(Node::explicit(1, Node::octet_string(ukm)));
    }
    fields.push(Node::sequence(vec![
        Node::oid(&agreement.to_oid()),
        AlgorithmIdentifier::new_without_parameters(wrap.to_oid()).into_node(),
    ]));
    fields.push(Node::sequence(vec![Node::sequence(vec![
        rid,
        Node::octet_string(encrypted_key),
    ])]));

    log::debug!("KARI recipient info on {} using {:?} and {:?}", curve, agreement, wrap);

    Ok(Node::context(1, fields))
}

/// Content-encryption key held by this recipient info, `None` when no encrypted key targets the certificate.
pub(crate) fn decrypt_key(
    recipient_info: &mut Reader<'_>,
    certificate: &CertificateInfo,
    private_key: &PrivateKey,
) -> Result<Option<Zeroizing<Vec<u8>>>, CmsError> {
    let version = recipient_info.read_small_integer()?;
    if version != 3 {
        log::warn!("skipping key agreement recipient info version {}", version);
        return Ok(None);
    }

    let mut originator = recipient_info.read_context(0)?;
    let originator_point = match originator.read_optional_context(1)? {
        Some(mut originator_key) => {
            let algorithm = AlgorithmIdentifier::decode(&mut originator_key)?;
            if algorithm.oid() != &oids::ec_public_key() {
                return Err(CmsError::unsupported_algorithm(algorithm.oid()));
            }
            let point = originator_key.read_bit_string()?;
            originator_key.finish()?;
            point
        }
        None => {
            return Err(CmsError::unsupported_algorithm(
                "KARI originator must be an ephemeral public key",
            ))
        }
    };
    originator.finish()?;

    let ukm = match recipient_info.read_optional_context(1)? {
        Some(mut explicit) => {
            let ukm = explicit.read_octet_string()?;
            explicit.finish()?;
            Some(ukm)
        }
        None => None,
    };

    let key_encryption_algorithm = AlgorithmIdentifier::decode(recipient_info)?;
    let agreement = KeyAgreementAlgorithm::from_oid(key_encryption_algorithm.oid())?;
    let wrap_parameters = key_encryption_algorithm
        .parameters()
        .ok_or_else(|| CmsError::invalid_argument("key agreement algorithm without key wrap parameter"))?;
    let wrap = KeyWrapAlgorithm::from_oid(AlgorithmIdentifier::decode(&mut Reader::new(wrap_parameters))?.oid())?;

    let mut encrypted_keys = recipient_info.read_sequence()?;
    recipient_info.finish()?;

    let mut matching_key = None;
    while !encrypted_keys.is_empty() {
        let mut encrypted_key = encrypted_keys.read_sequence()?;

        let matched = if encrypted_key.peek_is(Tag::CTX_0) {
            let mut key_identifier = encrypted_key.read_context(0)?;
            let skid = key_identifier.read_octet_string()?;
            let matched = certificate.matches_subject_key_identifier(skid);
            if matched {
                log::debug!("KARI recipient matched by SKID");
            }
            matched
        } else {
            let (issuer, serial_number) = read_issuer_and_serial(&mut encrypted_key)?;
            let matched = certificate.matches_issuer_and_serial(issuer, serial_number);
            if matched {
                log::debug!("KARI recipient matched by issuer and serial number");
            }
            matched
        };

        let wrapped = encrypted_key.read_octet_string()?;
        encrypted_key.finish()?;

        if matched {
            matching_key = Some(wrapped);
            break;
        }
    }

    let wrapped = match matching_key {
        Some(wrapped) => wrapped,
        None => return Ok(None),
    };

    let ec_key = match private_key.kind() {
        PrivateKeyKind::Ec(key) => key,
        PrivateKeyKind::Rsa(_) => return Ok(None),
    };
    check_curve(ec_key.curve(), certificate)?;

    let shared_secret = ec_key.diffie_hellman(originator_point)?;
    let kek = derive_kek(agreement, wrap, &shared_secret, ukm);
    Ok(Some(unwrap_key(wrap, &kek, wrapped)?))
}

fn check_curve(curve: EcCurve, certificate: &CertificateInfo) -> Result<(), CmsError> {
    match certificate.curve() {
        Some(certificate_curve) if certificate_curve == curve => Ok(()),
        _ => Err(CmsError::invalid_argument(
            "private key curve doesn't match the recipient certificate",
        )),
    }
}
