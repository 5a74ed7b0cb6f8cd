//! X.509 certificate fields needed by CMS.
//!
//! Certificates are decoded with `x509-cert`. Only the parts used to identify signers and recipients and
//! to extract their public key are kept. Certificates are never validated.

use crate::date::UtcDate;
use crate::error::CmsError;
use crate::hash::HashAlgorithm;
use crate::key::{EcCurve, PublicKey};
use crate::pem::{parse_pem, Pem};
use num_bigint_dig::BigInt;
use picky_cms_asn1::{Asn1DerError, Node, ObjectIdentifier, Reader, Tag};
use x509_cert::der::oid::AssociatedOid;
use x509_cert::der::{Decode, Encode};
use x509_cert::ext::pkix::SubjectKeyIdentifier;
use x509_cert::time::Time;
use x509_cert::Certificate;

const CERTIFICATE_PEM_LABEL: &str = "CERTIFICATE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validity {
    pub not_before: UtcDate,
    pub not_after: UtcDate,
}

/// Decoded view over a DER certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    der: Vec<u8>,
    serial_number: Vec<u8>,
    issuer: Vec<u8>,
    issuer_hash: Vec<u8>,
    subject: Vec<u8>,
    validity: Validity,
    subject_public_key_info: Vec<u8>,
    key_algorithm: ObjectIdentifier,
    public_key: PublicKey,
    subject_key_identifier: Option<Vec<u8>>,
}

fn malformed(e: impl std::fmt::Display) -> CmsError {
    CmsError::Certificate {
        context: format!("malformed certificate: {}", e),
    }
}

impl CertificateInfo {
    pub fn from_der(der: &[u8]) -> Result<Self, CmsError> {
        let certificate = Certificate::from_der(der).map_err(malformed)?;
        let tbs = &certificate.tbs_certificate;

        let issuer = tbs.issuer.to_der().map_err(malformed)?;
        let subject = tbs.subject.to_der().map_err(malformed)?;
        let subject_public_key_info = tbs.subject_public_key_info.to_der().map_err(malformed)?;
        let key_algorithm =
            ObjectIdentifier::try_from(tbs.subject_public_key_info.algorithm.oid.as_bytes()).map_err(|_| {
                malformed(Asn1DerError::InvalidObjectIdentifier)
            })?;
        let public_key = PublicKey::from_der(&subject_public_key_info)?;

        let validity = Validity {
            not_before: utc_date(&tbs.validity.not_before)?,
            not_after: utc_date(&tbs.validity.not_after)?,
        };

        let subject_key_identifier = match tbs
            .extensions
            .iter()
            .flatten()
            .find(|extension| extension.extn_id == SubjectKeyIdentifier::OID)
        {
            Some(extension) => {
                let skid = SubjectKeyIdentifier::from_der(extension.extn_value.as_bytes()).map_err(malformed)?;
                Some(skid.0.as_bytes().to_vec())
            }
            None => None,
        };

        log::trace!(
            "decoded certificate with serial {:02X?} and {:?} key",
            tbs.serial_number.as_bytes(),
            public_key.algorithm()
        );

        Ok(Self {
            der: der.to_vec(),
            serial_number: tbs.serial_number.as_bytes().to_vec(),
            issuer_hash: issuer_name_hash(&issuer),
            issuer,
            subject,
            validity,
            subject_public_key_info,
            key_algorithm,
            public_key,
            subject_key_identifier,
        })
    }

    pub fn from_pem(pem: &Pem) -> Result<Self, CmsError> {
        if pem.label() != CERTIFICATE_PEM_LABEL {
            return Err(CmsError::Certificate {
                context: format!("invalid PEM label: {}", pem.label()),
            });
        }
        Self::from_der(pem.data())
    }

    pub fn from_pem_str(pem_str: &str) -> Result<Self, CmsError> {
        let pem = parse_pem(pem_str)?;
        Self::from_pem(&pem)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// INTEGER content octets of the serial number.
    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    /// Issuer `Name`, tag and length included.
    pub fn issuer(&self) -> &[u8] {
        &self.issuer
    }

    /// SHA-1 of the issuer `Name` encoding.
    pub fn issuer_hash(&self) -> &[u8] {
        &self.issuer_hash
    }

    pub fn subject(&self) -> &[u8] {
        &self.subject
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    pub fn subject_public_key_info(&self) -> &[u8] {
        &self.subject_public_key_info
    }

    pub fn key_algorithm(&self) -> &ObjectIdentifier {
        &self.key_algorithm
    }

    pub fn curve(&self) -> Option<EcCurve> {
        self.public_key.curve()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn subject_key_identifier(&self) -> Option<&[u8]> {
        self.subject_key_identifier.as_deref()
    }

    /// `IssuerAndSerialNumber ::= SEQUENCE { issuer Name, serialNumber CertificateSerialNumber }`
    pub fn issuer_and_serial_number(&self) -> Node<'_> {
        Node::sequence(vec![
            Node::raw(self.issuer.as_slice()),
            Node::integer_raw(self.serial_number.as_slice()),
        ])
    }

    /// Compares against a decoded `IssuerAndSerialNumber`.
    ///
    /// Issuers are compared through their hash and serials as integers, so that a redundant leading zero
    /// in either encoding doesn't prevent the match.
    pub fn matches_issuer_and_serial(&self, issuer: &[u8], serial_number: &[u8]) -> bool {
        issuer_name_hash(issuer) == self.issuer_hash && same_integer(serial_number, &self.serial_number)
    }

    pub fn matches_subject_key_identifier(&self, skid: &[u8]) -> bool {
        self.subject_key_identifier.as_deref() == Some(skid)
    }
}

fn utc_date(time: &Time) -> Result<UtcDate, CmsError> {
    let date_time = time.to_date_time();
    UtcDate::new(
        date_time.year(),
        date_time.month(),
        date_time.day(),
        date_time.hour(),
        date_time.minutes(),
        date_time.seconds(),
    )
    .ok_or_else(|| malformed("validity date out of range"))
}

fn issuer_name_hash(issuer: &[u8]) -> Vec<u8> {
    HashAlgorithm::SHA1.digest(issuer)
}

fn same_integer(lhs: &[u8], rhs: &[u8]) -> bool {
    BigInt::from_signed_bytes_be(lhs) == BigInt::from_signed_bytes_be(rhs)
}

/// Decoded `IssuerAndSerialNumber`, borrowed from the input.
pub(crate) fn read_issuer_and_serial<'a>(reader: &mut Reader<'a>) -> Result<(&'a [u8], &'a [u8]), Asn1DerError> {
    let mut seq = reader.read_sequence()?;
    let issuer = seq.read_expected_raw(Tag::SEQUENCE)?;
    let serial = seq.read_integer_bytes()?;
    seq.finish()?;
    Ok((issuer, serial))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::PublicKeyAlgorithm;
    use crate::date::UtcDate;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(picky_test_data::RSA_2048_CERT_1, &[0x1A, 0x2B, 0x3C, 0x4D, 0x5E], PublicKeyAlgorithm::Rsa)]
    #[case(picky_test_data::RSA_2048_CERT_2, &[0x00, 0xFF, 0x01], PublicKeyAlgorithm::Rsa)]
    #[case(picky_test_data::EC_NIST256_CERT_1, &[0x10, 0x92], PublicKeyAlgorithm::Ec(EcCurve::NistP256))]
    #[case(picky_test_data::EC_NIST384_CERT_1, &[0x10, 0xF7], PublicKeyAlgorithm::Ec(EcCurve::NistP384))]
    fn parse_test_certificates(#[case] pem: &str, #[case] serial: &[u8], #[case] algorithm: PublicKeyAlgorithm) {
        let cert = CertificateInfo::from_pem_str(pem).expect("certificate");
        assert_eq!(cert.serial_number(), serial);
        assert_eq!(cert.public_key().algorithm(), algorithm);
        assert_eq!(cert.issuer(), cert.subject());
        assert_eq!(cert.issuer_hash().len(), 20);
        assert!(cert.subject_key_identifier().is_some());
        assert!(cert.validity().not_before < cert.validity().not_after);
    }

    #[test]
    fn subject_key_identifier() {
        let cert = CertificateInfo::from_pem_str(picky_test_data::RSA_2048_CERT_1).expect("certificate");
        assert_eq!(
            cert.subject_key_identifier(),
            Some(&picky_test_data::RSA_2048_CERT_1_SKID[..])
        );
        assert!(cert.matches_subject_key_identifier(&picky_test_data::RSA_2048_CERT_1_SKID));
        assert!(!cert.matches_subject_key_identifier(&picky_test_data::EC_NIST256_CERT_1_SKID));
        assert!(cert.validity().not_after > UtcDate::ymd(2100, 1, 1).expect("valid date"));
    }

    #[test]
    fn issuer_and_serial_roundtrip() {
        let cert = CertificateInfo::from_pem_str(picky_test_data::RSA_2048_CERT_2).expect("certificate");
        let encoded = cert.issuer_and_serial_number().to_vec();
        let (issuer, serial) = read_issuer_and_serial(&mut Reader::new(&encoded)).expect("decode");
        assert!(cert.matches_issuer_and_serial(issuer, serial));

        // redundant leading zeros are ignored, the sign octet is not
        assert!(cert.matches_issuer_and_serial(issuer, &[0x00, 0x00, 0xFF, 0x01]));
        assert!(!cert.matches_issuer_and_serial(issuer, &[0xFF, 0x01]));

        let other = CertificateInfo::from_pem_str(picky_test_data::RSA_2048_CERT_1).expect("certificate");
        assert!(!other.matches_issuer_and_serial(issuer, serial));
    }

    #[test]
    fn key_algorithm_and_curve() {
        let rsa = CertificateInfo::from_pem_str(picky_test_data::RSA_2048_CERT_1).expect("certificate");
        assert_eq!(rsa.key_algorithm(), &crate::oids::rsa_encryption());
        assert_eq!(rsa.curve(), None);
        assert_eq!(
            PublicKey::from_der(rsa.subject_public_key_info()).expect("spki"),
            *rsa.public_key()
        );

        let ec = CertificateInfo::from_pem_str(picky_test_data::EC_NIST384_CERT_1).expect("certificate");
        assert_eq!(ec.key_algorithm(), &crate::oids::ec_public_key());
        assert_eq!(ec.curve(), Some(EcCurve::NistP384));
    }

    #[test]
    fn trailing_data_is_rejected() {
        let mut der = CertificateInfo::from_pem_str(picky_test_data::RSA_2048_CERT_1)
            .expect("certificate")
            .der()
            .to_vec();
        der.push(0x00);
        assert!(matches!(
            CertificateInfo::from_der(&der),
            Err(CmsError::Certificate { .. })
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            CertificateInfo::from_der(&[0x30, 0x03, 0x02, 0x01, 0x01]),
            Err(CmsError::Certificate { .. })
        ));
    }
}
