//! Key transport recipients (RSA).
//!
//! ```text
//! KeyTransRecipientInfo ::= SEQUENCE {
//!     version CMSVersion,  -- always set to 0 or 2
//!     rid RecipientIdentifier,
//!     keyEncryptionAlgorithm KeyEncryptionAlgorithmIdentifier,
//!     encryptedKey EncryptedKey }
//! ```

use crate::algorithm::AlgorithmIdentifier;
use crate::certificate::{read_issuer_and_serial, CertificateInfo};
use crate::config::CmsContext;
use crate::error::CmsError;
use crate::key::{PrivateKey, PrivateKeyKind, PublicKeyKind};
use crate::oids;
use picky_cms_asn1::{Node, Reader};
use rsa::Pkcs1v15Encrypt;
use zeroize::Zeroizing;

pub(crate) fn recipient_info<'a>(
    context: &CmsContext,
    certificate: &'a CertificateInfo,
    content_encryption_key: &[u8],
) -> Result<Node<'a>, CmsError> {
    let public_key = match certificate.public_key().kind() {
        PublicKeyKind::Rsa(key) => key,
        PublicKeyKind::Ec { .. } => {
            return Err(CmsError::unsupported_algorithm(
                "key transport requires an RSA recipient",
            ))
        }
    };

    let encrypted_key =
        context.with_rng(|mut rng| public_key.encrypt(&mut rng, Pkcs1v15Encrypt, content_encryption_key))?;

    Ok(Node::sequence(vec![
        Node::small_integer(0),
        certificate.issuer_and_serial_number(),
        AlgorithmIdentifier::new_with_null(oids::rsa_encryption()).into_node(),
        Node::octet_string(encrypted_key),
    ]))
}

/// Content-encryption key held by this recipient info, `None` when it targets someone else.
///
/// The encrypted key is decrypted even when the recipient doesn't match, so that both paths cost the same.
pub(crate) fn decrypt_key(
    recipient_info: &mut Reader<'_>,
    certificate: &CertificateInfo,
    private_key: &PrivateKey,
) -> Result<Option<Zeroizing<Vec<u8>>>, CmsError> {
    let version = recipient_info.read_small_integer()?;
    if version != 0 {
        log::warn!("skipping key transport recipient info version {}", version);
        return Ok(None);
    }

    let (issuer, serial_number) = read_issuer_and_serial(recipient_info)?;
    let algorithm = AlgorithmIdentifier::decode(recipient_info)?;
    if algorithm.oid() != &oids::rsa_encryption() {
        return Err(CmsError::unsupported_algorithm(algorithm.oid()));
    }
    let encrypted_key = recipient_info.read_octet_string()?;
    recipient_info.finish()?;

    let rsa_key = match private_key.kind() {
        PrivateKeyKind::Rsa(key) => key,
        PrivateKeyKind::Ec(_) => return Ok(None),
    };

    let decrypted = rsa_key.decrypt(Pkcs1v15Encrypt, encrypted_key).map(Zeroizing::new);

    if certificate.matches_issuer_and_serial(issuer, serial_number) {
        log::debug!("KTRI recipient matched by issuer and serial number");
        // a failed RSA decryption reports like any other unmatched recipient
        decrypted.map(Some).map_err(|_| CmsError::RecipientNotFound)
    } else {
        drop(decrypted);
        Ok(None)
    }
}
