//! Wrappers around public and private keys raw data providing an easy to use API
//!
//! PKCS#8, SEC1 and `SubjectPublicKeyInfo` envelopes are decoded with the `pkcs8`, `sec1` and `spki`
//! crates. Key material goes to `rsa`, `p256` and `p384`.

pub(crate) mod ec;

use crate::algorithm::PublicKeyAlgorithm;
use crate::oids;
use crate::pem::{parse_pem, Pem, PemError};
use picky_cms_asn1::ObjectIdentifier;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use spki::SubjectPublicKeyInfoRef;
use thiserror::Error;

pub use ec::EcCurve;
pub(crate) use ec::EcPrivateKey;

#[derive(Debug, Error)]
pub enum KeyError {
    /// ASN1 deserialization error
    #[error("(ASN1) couldn't deserialize {element}: {context}")]
    Asn1Deserialization { element: &'static str, context: String },

    /// RSA error
    #[error("RSA error: {context}")]
    Rsa { context: String },

    /// EC error
    #[error("EC error: {context}")]
    EC { context: String },

    /// invalid PEM label error
    #[error("invalid PEM label: {label}")]
    InvalidPemLabel { label: String },

    /// unsupported algorithm
    #[error("unsupported key algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// invalid PEM provided
    #[error("invalid PEM provided: {source}")]
    Pem { source: PemError },
}

impl KeyError {
    pub(crate) fn unsupported_curve(curve_oid: &ObjectIdentifier, context: &'static str) -> Self {
        let curve_oid: String = curve_oid.into();
        Self::EC {
            context: format!(
                "EC curve with oid `{}` is not supported in context of {}",
                curve_oid, context,
            ),
        }
    }

    fn asn1<E: std::fmt::Display>(element: &'static str) -> impl FnOnce(E) -> Self {
        move |e| Self::Asn1Deserialization {
            element,
            context: e.to_string(),
        }
    }
}

impl From<rsa::errors::Error> for KeyError {
    fn from(e: rsa::errors::Error) -> Self {
        Self::Rsa { context: e.to_string() }
    }
}

impl From<rsa::pkcs1::Error> for KeyError {
    fn from(e: rsa::pkcs1::Error) -> Self {
        Self::Rsa { context: e.to_string() }
    }
}

impl From<PemError> for KeyError {
    fn from(e: PemError) -> Self {
        Self::Pem { source: e }
    }
}

// === private key === //

const PRIVATE_KEY_PEM_LABEL: &str = "PRIVATE KEY";
const RSA_PRIVATE_KEY_PEM_LABEL: &str = "RSA PRIVATE KEY";
const EC_PRIVATE_KEY_LABEL: &str = "EC PRIVATE KEY";

#[derive(Clone, PartialEq, Eq)]
pub(crate) enum PrivateKeyKind {
    Rsa(Box<RsaPrivateKey>),
    Ec(EcPrivateKey),
}

/// RSA or EC private key.
///
/// Secret material is zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    kind: PrivateKeyKind,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

impl PrivateKey {
    /// Parses a PKCS#8 `PrivateKeyInfo`.
    pub fn from_pkcs8(der: &[u8]) -> Result<Self, KeyError> {
        let info = pkcs8::PrivateKeyInfo::try_from(der).map_err(KeyError::asn1("private key info"))?;
        let (algorithm, curve) = algorithm_oids(&info.algorithm)?;
        let private_key = info.private_key;

        let algorithm_string: String = algorithm.into();
        match algorithm_string.as_str() {
            oids::RSA_ENCRYPTION => Self::from_rsa_der(private_key),
            oids::EC_PUBLIC_KEY => {
                let curve = match curve {
                    Some(curve) => Some(EcCurve::from_oid(&curve)?),
                    None => None,
                };
                Self::from_sec1_with_curve(private_key, curve)
            }
            _ => Err(KeyError::UnsupportedAlgorithm {
                algorithm: algorithm_string,
            }),
        }
    }

    /// Parses a PKCS#1 `RSAPrivateKey`.
    pub fn from_rsa_der(der: &[u8]) -> Result<Self, KeyError> {
        let key = RsaPrivateKey::from_pkcs1_der(der)?;
        key.validate()?;
        Ok(Self {
            kind: PrivateKeyKind::Rsa(Box::new(key)),
        })
    }

    /// Parses a SEC1 `ECPrivateKey`, the curve must be given by its parameters.
    pub fn from_ec_der(der: &[u8]) -> Result<Self, KeyError> {
        Self::from_sec1_with_curve(der, None)
    }

    fn from_sec1_with_curve(der: &[u8], curve: Option<EcCurve>) -> Result<Self, KeyError> {
        let key = sec1::EcPrivateKey::try_from(der).map_err(KeyError::asn1("EC private key"))?;
        let curve_parameter = key
            .parameters
            .as_ref()
            .and_then(|parameters| parameters.named_curve())
            .map(|oid| to_oid(&oid))
            .transpose()?;
        let secret = key.private_key;

        let curve = match (curve, curve_parameter) {
            (Some(curve), _) => curve,
            (None, Some(oid)) => EcCurve::from_oid(&oid)?,
            (None, None) => {
                return Err(KeyError::EC {
                    context: "EC private key without curve parameters".to_owned(),
                })
            }
        };

        Ok(Self {
            kind: PrivateKeyKind::Ec(EcPrivateKey::from_secret(curve, secret)?),
        })
    }

    pub fn from_pem(pem: &Pem) -> Result<Self, KeyError> {
        match pem.label() {
            PRIVATE_KEY_PEM_LABEL => Self::from_pkcs8(pem.data()),
            RSA_PRIVATE_KEY_PEM_LABEL => Self::from_rsa_der(pem.data()),
            EC_PRIVATE_KEY_LABEL => Self::from_ec_der(pem.data()),
            _ => Err(KeyError::InvalidPemLabel {
                label: pem.label().to_owned(),
            }),
        }
    }

    pub fn from_pem_str(pem_str: &str) -> Result<Self, KeyError> {
        let pem = parse_pem(pem_str)?;
        Self::from_pem(&pem)
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        match &self.kind {
            PrivateKeyKind::Rsa(_) => PublicKeyAlgorithm::Rsa,
            PrivateKeyKind::Ec(key) => PublicKeyAlgorithm::Ec(key.curve()),
        }
    }

    pub fn to_public_key(&self) -> Result<PublicKey, KeyError> {
        let kind = match &self.kind {
            PrivateKeyKind::Rsa(key) => PublicKeyKind::Rsa(key.to_public_key()),
            PrivateKeyKind::Ec(key) => PublicKeyKind::Ec {
                curve: key.curve(),
                point: key.public_point()?,
            },
        };
        Ok(PublicKey { kind })
    }

    pub(crate) fn kind(&self) -> &PrivateKeyKind {
        &self.kind
    }
}

/// Algorithm and optional OID parameter of an `AlgorithmIdentifier`.
fn algorithm_oids(
    algorithm: &spki::AlgorithmIdentifierRef<'_>,
) -> Result<(ObjectIdentifier, Option<ObjectIdentifier>), KeyError> {
    let (oid, parameter) = algorithm.oids().map_err(KeyError::asn1("algorithm identifier"))?;
    Ok((to_oid(&oid)?, parameter.map(|parameter| to_oid(&parameter)).transpose()?))
}

fn to_oid(oid: &spki::ObjectIdentifier) -> Result<ObjectIdentifier, KeyError> {
    ObjectIdentifier::try_from(oid.as_bytes()).map_err(|_| KeyError::Asn1Deserialization {
        element: "object identifier",
        context: oid.to_string(),
    })
}

// === public key === //

const PUBLIC_KEY_PEM_LABEL: &str = "PUBLIC KEY";
const RSA_PUBLIC_KEY_PEM_LABEL: &str = "RSA PUBLIC KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PublicKeyKind {
    Rsa(RsaPublicKey),
    Ec { curve: EcCurve, point: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    kind: PublicKeyKind,
}

impl PublicKey {
    /// Parses a `SubjectPublicKeyInfo`.
    pub fn from_der(der: &[u8]) -> Result<Self, KeyError> {
        let spki = SubjectPublicKeyInfoRef::try_from(der).map_err(KeyError::asn1("subject public key info"))?;
        let (algorithm, curve) = algorithm_oids(&spki.algorithm)?;
        let key = spki.subject_public_key.as_bytes().ok_or_else(|| KeyError::Asn1Deserialization {
            element: "subject public key",
            context: "unused bits in key BIT STRING".to_owned(),
        })?;
        Self::from_parts(&algorithm, curve.as_ref(), key)
    }

    fn from_parts(
        algorithm: &ObjectIdentifier,
        curve: Option<&ObjectIdentifier>,
        key: &[u8],
    ) -> Result<Self, KeyError> {
        let algorithm_string: String = algorithm.into();
        let kind = match algorithm_string.as_str() {
            oids::RSA_ENCRYPTION => PublicKeyKind::Rsa(RsaPublicKey::from_pkcs1_der(key)?),
            oids::EC_PUBLIC_KEY => {
                let curve = curve.ok_or_else(|| KeyError::EC {
                    context: "EC public key without named curve".to_owned(),
                })?;
                let curve = EcCurve::from_oid(curve)?;
                ec::validate_point(curve, key)?;
                PublicKeyKind::Ec {
                    curve,
                    point: key.to_vec(),
                }
            }
            _ => {
                return Err(KeyError::UnsupportedAlgorithm {
                    algorithm: algorithm_string,
                })
            }
        };

        Ok(Self { kind })
    }

    pub fn from_pem(pem: &Pem) -> Result<Self, KeyError> {
        match pem.label() {
            PUBLIC_KEY_PEM_LABEL => Self::from_der(pem.data()),
            RSA_PUBLIC_KEY_PEM_LABEL => Ok(Self {
                kind: PublicKeyKind::Rsa(RsaPublicKey::from_pkcs1_der(pem.data())?),
            }),
            _ => Err(KeyError::InvalidPemLabel {
                label: pem.label().to_owned(),
            }),
        }
    }

    pub fn from_pem_str(pem_str: &str) -> Result<Self, KeyError> {
        let pem = parse_pem(pem_str)?;
        Self::from_pem(&pem)
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        match &self.kind {
            PublicKeyKind::Rsa(_) => PublicKeyAlgorithm::Rsa,
            PublicKeyKind::Ec { curve, .. } => PublicKeyAlgorithm::Ec(*curve),
        }
    }

    pub fn curve(&self) -> Option<EcCurve> {
        match &self.kind {
            PublicKeyKind::Rsa(_) => None,
            PublicKeyKind::Ec { curve, .. } => Some(*curve),
        }
    }

    pub(crate) fn kind(&self) -> &PublicKeyKind {
        &self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(picky_test_data::RSA_2048_PK_1, PublicKeyAlgorithm::Rsa)]
    #[case(picky_test_data::RSA_2048_PKCS1_PK_1, PublicKeyAlgorithm::Rsa)]
    #[case(picky_test_data::EC_NIST256_PK_1, PublicKeyAlgorithm::Ec(EcCurve::NistP256))]
    #[case(picky_test_data::EC_NIST256_SEC1_PK_1, PublicKeyAlgorithm::Ec(EcCurve::NistP256))]
    #[case(picky_test_data::EC_NIST384_PK_1, PublicKeyAlgorithm::Ec(EcCurve::NistP384))]
    fn private_key_from_pem(#[case] pem: &str, #[case] expected: PublicKeyAlgorithm) {
        let key = PrivateKey::from_pem_str(pem).expect("private key");
        assert_eq!(key.algorithm(), expected);
        assert_eq!(key.to_public_key().expect("public key").algorithm(), expected);
    }

    #[test]
    fn pkcs8_and_pkcs1_forms_are_the_same_key() {
        let pkcs8 = PrivateKey::from_pem_str(picky_test_data::RSA_2048_PK_1).expect("pkcs8");
        let pkcs1 = PrivateKey::from_pem_str(picky_test_data::RSA_2048_PKCS1_PK_1).expect("pkcs1");
        assert_eq!(pkcs8, pkcs1);
    }

    #[test]
    fn sec1_and_pkcs8_forms_are_the_same_key() {
        let pkcs8 = PrivateKey::from_pem_str(picky_test_data::EC_NIST256_PK_1).expect("pkcs8");
        let sec1 = PrivateKey::from_pem_str(picky_test_data::EC_NIST256_SEC1_PK_1).expect("sec1");
        assert_eq!(pkcs8, sec1);
    }

    #[test]
    fn spki_of_private_key() {
        let key = PrivateKey::from_pem_str(picky_test_data::EC_NIST384_PK_1).expect("private key");
        let certificate =
            crate::certificate::CertificateInfo::from_pem_str(picky_test_data::EC_NIST384_CERT_1).expect("certificate");
        let public_key = PublicKey::from_der(certificate.subject_public_key_info()).expect("spki");
        assert_eq!(public_key, key.to_public_key().expect("public key"));
        assert_eq!(public_key.curve(), Some(EcCurve::NistP384));
    }

    #[rstest]
    #[case(&[0x30, 0x03, 0x02, 0x01, 0x00])]
    #[case(&[0x04, 0x00])]
    fn malformed_envelopes(#[case] der: &[u8]) {
        assert!(matches!(
            PrivateKey::from_pkcs8(der),
            Err(KeyError::Asn1Deserialization { element: "private key info", .. })
        ));
        assert!(matches!(
            PrivateKey::from_ec_der(der),
            Err(KeyError::Asn1Deserialization { element: "EC private key", .. })
        ));
        assert!(matches!(
            PublicKey::from_der(der),
            Err(KeyError::Asn1Deserialization { element: "subject public key info", .. })
        ));
    }

    #[test]
    fn certificate_is_not_a_key() {
        let err = PrivateKey::from_pem_str(picky_test_data::RSA_2048_CERT_1).unwrap_err();
        assert!(matches!(err, KeyError::InvalidPemLabel { label } if label == "CERTIFICATE"));
    }

    #[test]
    fn debug_does_not_leak_secrets() {
        let key = PrivateKey::from_pem_str(picky_test_data::EC_NIST256_PK_1).expect("key");
        assert_eq!(format!("{:?}", key), "PrivateKey { algorithm: Ec(NistP256), .. }");
    }
}
