//! EnvelopedData (RFC 5652 section 6).
//!
//! ```text
//! EnvelopedData ::= SEQUENCE {
//!     version CMSVersion,
//!     originatorInfo [0] IMPLICIT OriginatorInfo OPTIONAL,
//!     recipientInfos RecipientInfos,
//!     encryptedContentInfo EncryptedContentInfo,
//!     unprotectedAttrs [1] IMPLICIT UnprotectedAttributes OPTIONAL }
//! ```
//!
//! One recipient is emitted: key transport for RSA certificates, key agreement for EC ones.

mod kari;
mod ktri;

use crate::algorithm::PublicKeyAlgorithm;
use crate::config::CmsContext;
use crate::content_info::{decode_ber, read_content_info, wrap};
use crate::encrypted::{
    encrypted_content_info, random_iv, read_encrypted_content_info, read_unprotected_attributes, DecryptedContent,
};
use crate::error::CmsError;
use crate::oids;
use picky_cms_asn1::{Node, Tag};
use rand_core::RngCore;
use zeroize::Zeroizing;

fn expected_version(algorithm: PublicKeyAlgorithm) -> u32 {
    match algorithm {
        PublicKeyAlgorithm::Rsa => 0,
        PublicKeyAlgorithm::Ec(_) => 2,
    }
}

impl CmsContext {
    /// Encrypts `content` for the configured recipient certificate.
    pub fn encode_enveloped_data(&self, content: &[u8]) -> Result<Vec<u8>, CmsError> {
        Ok(self.enveloped_data_node(content)?.to_vec())
    }

    /// Same as [`CmsContext::encode_enveloped_data`], writing into `out`.
    pub fn encode_enveloped_data_into(&self, content: &[u8], out: &mut [u8]) -> Result<usize, CmsError> {
        Ok(self.enveloped_data_node(content)?.write_to_slice(out)?)
    }

    /// Decrypts an EnvelopedData addressed to the configured certificate and private key.
    pub fn decode_enveloped_data(&self, input: &[u8]) -> Result<DecryptedContent, CmsError> {
        decode_ber(input, |input| self.decode_enveloped_data_impl(input))
    }

    fn enveloped_data_node(&self, content: &[u8]) -> Result<Node<'_>, CmsError> {
        let certificate = self.require_certificate()?;
        let algorithm = self.content_encryption_algorithm;

        let mut content_encryption_key = Zeroizing::new(vec![0; algorithm.key_size()]);
        self.with_rng(|rng| rng.fill_bytes(&mut content_encryption_key));
        let iv = random_iv(self, algorithm);

        let key_algorithm = certificate.public_key().algorithm();
        let recipient_info = match key_algorithm {
            PublicKeyAlgorithm::Rsa => ktri::recipient_info(self, certificate, &content_encryption_key)?,
            PublicKeyAlgorithm::Ec(_) => kari::recipient_info(self, certificate, &content_encryption_key)?,
        };

        let enveloped_data = Node::sequence(vec![
            Node::small_integer(expected_version(key_algorithm)),
            Node::set(vec![recipient_info]),
            encrypted_content_info(&self.content_type, algorithm, &content_encryption_key, &iv, content)?,
        ]);

        Ok(wrap(&oids::enveloped_data(), enveloped_data))
    }

    fn decode_enveloped_data_impl(&self, input: &[u8]) -> Result<DecryptedContent, CmsError> {
        let certificate = self.require_certificate()?;
        let private_key = self.require_private_key()?;

        let mut content = read_content_info(input, oids::ENVELOPED_DATA)?;
        let mut enveloped_data = content.read_sequence()?;
        content.finish()?;

        let version = enveloped_data.read_small_integer()?;
        if version != expected_version(private_key.algorithm()) {
            return Err(CmsError::Version {
                structure: "EnvelopedData",
                version,
            });
        }

        // originator certificates and CRLs aren't needed to decrypt
        if enveloped_data.peek_is(Tag::CTX_0) {
            enveloped_data.skip()?;
        }

        let mut recipient_infos = enveloped_data.read_set()?;
        let mut content_encryption_key = None;
        while !recipient_infos.is_empty() && content_encryption_key.is_none() {
            content_encryption_key = match recipient_infos.peek_tag() {
                Some(Tag::SEQUENCE) => {
                    let mut recipient_info = recipient_infos.read_sequence()?;
                    ktri::decrypt_key(&mut recipient_info, certificate, private_key)?
                }
                Some(tag) if tag == Tag::context_constructed(1) => {
                    let mut recipient_info = recipient_infos.read_context(1)?;
                    kari::decrypt_key(&mut recipient_info, certificate, private_key)?
                }
                tag => {
                    log::warn!("skipping unsupported recipient info choice {:?}", tag);
                    recipient_infos.skip()?;
                    None
                }
            };
        }
        let content_encryption_key = content_encryption_key.ok_or(CmsError::RecipientNotFound)?;

        let info = read_encrypted_content_info(&mut enveloped_data)?;
        let attributes = read_unprotected_attributes(&mut enveloped_data)?;
        enveloped_data.finish()?;

        Ok(DecryptedContent {
            content: info.decrypt(&content_encryption_key)?,
            content_type: info.content_type,
            unprotected_attributes: attributes.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{AlgorithmIdentifier, ContentEncryptionAlgorithm, KeyAgreementAlgorithm, KeyWrapAlgorithm};
    use crate::certificate::CertificateInfo;
    use crate::config::CmsContextBuilder;
    use crate::key::PrivateKey;
    use pretty_assertions::{assert_eq, assert_ne};
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;
    use rstest::rstest;

    fn recipient(certificate: &str, private_key: &str) -> CmsContextBuilder {
        CmsContext::builder()
            .with_certificate(CertificateInfo::from_pem_str(certificate).expect("certificate"))
            .with_private_key(PrivateKey::from_pem_str(private_key).expect("private key"))
            .with_rng(ChaCha20Rng::seed_from_u64(5))
    }

    fn rsa_recipient() -> CmsContextBuilder {
        recipient(picky_test_data::RSA_2048_CERT_1, picky_test_data::RSA_2048_PK_1)
    }

    #[rstest]
    #[case(ContentEncryptionAlgorithm::Aes128Cbc)]
    #[case(ContentEncryptionAlgorithm::Aes256Cbc)]
    #[case(ContentEncryptionAlgorithm::DesEde3Cbc)]
    fn ktri_round_trip(#[case] algorithm: ContentEncryptionAlgorithm) {
        let context = rsa_recipient()
            .with_content_encryption_algorithm(algorithm)
            .build()
            .expect("context");
        let encoded = context.encode_enveloped_data(b"secret payload").expect("encode");
        let decoded = context.decode_enveloped_data(&encoded).expect("decode");
        assert_eq!(decoded.content, b"secret payload");
        assert_eq!(decoded.content_type, oids::data());
    }

    #[rstest]
    #[case(picky_test_data::EC_NIST256_CERT_1, picky_test_data::EC_NIST256_PK_1, KeyWrapAlgorithm::Aes128Wrap, KeyAgreementAlgorithm::StdDhSha1Kdf)]
    #[case(picky_test_data::EC_NIST256_CERT_1, picky_test_data::EC_NIST256_PK_1, KeyWrapAlgorithm::Aes256Wrap, KeyAgreementAlgorithm::StdDhSha256Kdf)]
    #[case(picky_test_data::EC_NIST384_CERT_1, picky_test_data::EC_NIST384_PK_1, KeyWrapAlgorithm::Aes192Wrap, KeyAgreementAlgorithm::StdDhSha384Kdf)]
    fn kari_round_trip(
        #[case] certificate: &str,
        #[case] private_key: &str,
        #[case] wrap: KeyWrapAlgorithm,
        #[case] agreement: KeyAgreementAlgorithm,
    ) {
        let context = recipient(certificate, private_key)
            .with_key_wrap_algorithm(wrap)
            .with_key_agreement_algorithm(agreement)
            .build()
            .expect("context");
        let encoded = context.encode_enveloped_data(b"secret payload").expect("encode");
        let decoded = context.decode_enveloped_data(&encoded).expect("decode");
        assert_eq!(decoded.content, b"secret payload");
    }

    #[test]
    fn kari_with_user_keying_material() {
        let context = recipient(picky_test_data::EC_NIST256_CERT_1, picky_test_data::EC_NIST256_PK_1)
            .with_user_keying_material(vec![0xAB; 64])
            .build()
            .expect("context");
        let encoded = context.encode_enveloped_data(b"secret payload").expect("encode");
        assert_eq!(context.decode_enveloped_data(&encoded).expect("decode").content, b"secret payload");
    }

    #[test]
    fn openssl_ktri() {
        let context = rsa_recipient().build().expect("context");
        let decoded = context
            .decode_enveloped_data(picky_test_data::CMS_ENVELOPED_KTRI_AES256)
            .expect("decode");
        assert_eq!(decoded.content, picky_test_data::CMS_CONTENT);
    }

    #[test]
    fn openssl_kari() {
        let context = recipient(picky_test_data::EC_NIST256_CERT_1, picky_test_data::EC_NIST256_PK_1)
            .build()
            .expect("context");
        let decoded = context
            .decode_enveloped_data(picky_test_data::CMS_ENVELOPED_KARI_AES128)
            .expect("decode");
        assert_eq!(decoded.content, picky_test_data::CMS_CONTENT);
    }

    #[test]
    fn other_recipient_is_not_found() {
        let sender = rsa_recipient().build().expect("context");
        let encoded = sender.encode_enveloped_data(b"secret payload").expect("encode");

        let other = recipient(picky_test_data::RSA_2048_CERT_2, picky_test_data::RSA_2048_PK_2)
            .build()
            .expect("context");
        assert!(matches!(
            other.decode_enveloped_data(&encoded),
            Err(CmsError::RecipientNotFound)
        ));
    }

    #[test]
    fn version_must_match_the_key() {
        let sender = rsa_recipient().build().expect("context");
        let encoded = sender.encode_enveloped_data(b"secret payload").expect("encode");

        let ec = recipient(picky_test_data::EC_NIST256_CERT_1, picky_test_data::EC_NIST256_PK_1)
            .build()
            .expect("context");
        assert!(matches!(
            ec.decode_enveloped_data(&encoded),
            Err(CmsError::Version { version: 0, .. })
        ));
    }

    #[test]
    fn missing_certificate() {
        let context = CmsContext::builder().build().expect("context");
        assert!(matches!(
            context.encode_enveloped_data(b"abc"),
            Err(CmsError::InvalidArgument { .. })
        ));
    }

    // Rebuilds an EnvelopedData with `extra` recipient infos in front of the original one.
    fn with_extra_recipients(encoded: &[u8], extra: Vec<Node<'_>>) -> Vec<u8> {
        let mut content = read_content_info(encoded, oids::ENVELOPED_DATA).expect("content info");
        let mut enveloped_data = content.read_sequence().expect("enveloped data");
        let version = enveloped_data.read_small_integer().expect("version");
        let mut recipient_infos = enveloped_data.read_set().expect("recipient infos");
        let original = recipient_infos.read_any().expect("recipient info");
        let encrypted_content_info = enveloped_data.read_any().expect("encrypted content info");

        let mut recipients = extra;
        recipients.push(Node::raw(original));
        wrap(
            &oids::enveloped_data(),
            Node::sequence(vec![
                Node::small_integer(version),
                Node::set(recipients),
                Node::raw(encrypted_content_info),
            ]),
        )
        .to_vec()
    }

    #[test]
    fn matching_recipient_is_found_among_others() {
        let context = rsa_recipient().build().expect("context");
        let encoded = context.encode_enveloped_data(b"secret payload").expect("encode");

        let decoy = recipient(picky_test_data::RSA_2048_CERT_2, picky_test_data::RSA_2048_PK_2)
            .build()
            .expect("context");
        let decoy_certificate = decoy.certificate().expect("certificate");
        let decoy_info = ktri::recipient_info(&decoy, decoy_certificate, &[0x55; 32]).expect("recipient info");
        let unknown_choice = Node::context(4, vec![Node::null()]);

        let rebuilt = with_extra_recipients(&encoded, vec![unknown_choice, decoy_info]);
        let decoded = context.decode_enveloped_data(&rebuilt).expect("decode");
        assert_eq!(decoded.content, b"secret payload");

        // the decoy entry holds an unrelated key
        assert_ne!(
            decoy.decode_enveloped_data(&rebuilt).map(|decoded| decoded.content).ok(),
            Some(b"secret payload".to_vec())
        );
    }

    #[test]
    fn unknown_key_agreement_version_is_skipped() {
        let context = recipient(picky_test_data::EC_NIST256_CERT_1, picky_test_data::EC_NIST256_PK_1)
            .build()
            .expect("context");
        let encoded = context.encode_enveloped_data(b"secret payload").expect("encode");

        let future_kari = Node::context(1, vec![Node::small_integer(2), Node::context(0, vec![Node::null()])]);
        let rebuilt = with_extra_recipients(&encoded, vec![future_kari]);
        let decoded = context.decode_enveloped_data(&rebuilt).expect("decode");
        assert_eq!(decoded.content, b"secret payload");
    }

    #[test]
    fn undecryptable_matching_key_transport_is_not_found() {
        let context = rsa_recipient().build().expect("context");
        let encoded = context.encode_enveloped_data(b"secret payload").expect("encode");

        let certificate = context.certificate().expect("certificate");
        let garbage = Node::sequence(vec![
            Node::small_integer(0),
            certificate.issuer_and_serial_number(),
            AlgorithmIdentifier::new_with_null(oids::rsa_encryption()).into_node(),
            Node::octet_string(vec![0x01; 256]),
        ]);
        let rebuilt = with_extra_recipients(&encoded, vec![garbage]);
        assert!(matches!(
            context.decode_enveloped_data(&rebuilt),
            Err(CmsError::RecipientNotFound)
        ));
    }

    #[test]
    fn kari_skid_recipient_identifier() {
        let context = recipient(picky_test_data::EC_NIST256_CERT_1, picky_test_data::EC_NIST256_PK_1)
            .build()
            .expect("context");
        let encoded = context.encode_enveloped_data(b"abc").expect("encode");

        // rKeyId [0] { OCTET STRING skid }
        let mut rid = vec![0xA0, 0x16, 0x04, 0x14];
        rid.extend_from_slice(&picky_test_data::EC_NIST256_CERT_1_SKID);
        assert!(encoded.windows(rid.len()).any(|w| w == rid.as_slice()));
    }

    #[test]
    fn into_buffer() {
        let context = rsa_recipient().build().expect("context");
        let mut small = vec![0; 64];
        assert!(matches!(
            context.encode_enveloped_data_into(b"abc", &mut small),
            Err(CmsError::BufferTooSmall { available: 64, .. })
        ));

        let mut out = vec![0; 1024];
        let written = context.encode_enveloped_data_into(b"abc", &mut out).expect("encode");
        let decoded = context.decode_enveloped_data(&out[..written]).expect("decode");
        assert_eq!(decoded.content, b"abc");
    }
}
