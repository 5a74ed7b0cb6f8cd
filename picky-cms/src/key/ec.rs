use crate::key::KeyError;
use crate::oids;
use picky_cms_asn1::ObjectIdentifier;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use zeroize::{Zeroize, Zeroizing};

/// Elliptic curve name to use for curve operations which require curve-specific arithmetic.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EcCurve {
    /// NIST P-256 curve (secp256r1)
    NistP256,
    /// NIST P-384 curve (secp384r1)
    NistP384,
}

impl EcCurve {
    /// Get size of field component in bytes (X and Y point values, secret key)
    pub fn field_bytes_size(self) -> usize {
        match self {
            EcCurve::NistP256 => {
                use p256::elliptic_curve::generic_array::typenum::Unsigned;
                use p256::elliptic_curve::FieldBytesSize;
                <FieldBytesSize<p256::NistP256> as Unsigned>::USIZE
            }
            EcCurve::NistP384 => {
                use p384::elliptic_curve::generic_array::typenum::Unsigned;
                use p384::elliptic_curve::FieldBytesSize;
                <FieldBytesSize<p384::NistP384> as Unsigned>::USIZE
            }
        }
    }

    pub fn to_oid(self) -> ObjectIdentifier {
        match self {
            EcCurve::NistP256 => oids::secp256r1(),
            EcCurve::NistP384 => oids::secp384r1(),
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, KeyError> {
        let oid_string: String = oid.into();
        match oid_string.as_str() {
            oids::SECP256R1 => Ok(EcCurve::NistP256),
            oids::SECP384R1 => Ok(EcCurve::NistP384),
            _ => Err(KeyError::unsupported_curve(oid, "CMS key agreement and signature")),
        }
    }
}

impl Display for EcCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NistP256 => write!(f, "NIST-P256"),
            Self::NistP384 => write!(f, "NIST-P384"),
        }
    }
}

/// EC private scalar with its curve.
///
/// Curve arithmetic objects are rebuilt for each operation.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct EcPrivateKey {
    curve: EcCurve,
    secret: Vec<u8>,
}

impl Drop for EcPrivateKey {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl std::fmt::Debug for EcPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcPrivateKey").field("curve", &self.curve).finish_non_exhaustive()
    }
}

macro_rules! with_secret_key {
    ($key:expr, |$secret:ident| $p256_body:expr, $p384_body:expr) => {
        match $key.curve {
            EcCurve::NistP256 => {
                let $secret = p256::SecretKey::from_slice(&$key.secret).map_err(|_| KeyError::EC {
                    context: "invalid P-256 private scalar".to_owned(),
                })?;
                $p256_body
            }
            EcCurve::NistP384 => {
                let $secret = p384::SecretKey::from_slice(&$key.secret).map_err(|_| KeyError::EC {
                    context: "invalid P-384 private scalar".to_owned(),
                })?;
                $p384_body
            }
        }
    };
}

impl EcPrivateKey {
    pub(crate) fn from_secret(curve: EcCurve, secret: &[u8]) -> Result<Self, KeyError> {
        if secret.len() != curve.field_bytes_size() {
            return Err(KeyError::EC {
                context: format!(
                    "invalid secret size for {}: expected {}, got {}",
                    curve,
                    curve.field_bytes_size(),
                    secret.len()
                ),
            });
        }

        let key = Self {
            curve,
            secret: secret.to_vec(),
        };
        // validate the scalar once
        key.public_point()?;
        Ok(key)
    }

    /// Random key, used for ephemeral key agreement.
    pub(crate) fn generate(curve: EcCurve, mut rng: &mut dyn CryptoRngCore) -> Self {
        let secret = match curve {
            EcCurve::NistP256 => p256::SecretKey::random(&mut rng).to_bytes().to_vec(),
            EcCurve::NistP384 => p384::SecretKey::random(&mut rng).to_bytes().to_vec(),
        };
        Self { curve, secret }
    }

    pub(crate) fn curve(&self) -> EcCurve {
        self.curve
    }

    /// Uncompressed SEC1 encoding of the public point.
    pub(crate) fn public_point(&self) -> Result<Vec<u8>, KeyError> {
        use p256::elliptic_curve::sec1::ToEncodedPoint as _;

        with_secret_key!(
            self,
            |secret| Ok(secret.public_key().to_encoded_point(false).as_bytes().to_vec()),
            Ok(secret.public_key().to_encoded_point(false).as_bytes().to_vec())
        )
    }

    /// ECDSA over an already computed digest, DER encoded signature.
    pub(crate) fn sign_prehash(&self, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
        use p256::ecdsa::signature::hazmat::PrehashSigner;

        let ecdsa_error = |e: p256::ecdsa::Error| KeyError::EC {
            context: format!("ECDSA signature failed: {}", e),
        };

        with_secret_key!(
            self,
            |secret| {
                let signer = p256::ecdsa::SigningKey::from(&secret);
                let signature: p256::ecdsa::Signature = signer.sign_prehash(digest).map_err(ecdsa_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            },
            {
                let signer = p384::ecdsa::SigningKey::from(&secret);
                let signature: p384::ecdsa::Signature = signer.sign_prehash(digest).map_err(ecdsa_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
        )
    }

    /// Raw ECDH shared secret (X coordinate) with the given SEC1 encoded peer point.
    pub(crate) fn diffie_hellman(&self, peer_point: &[u8]) -> Result<Zeroizing<Vec<u8>>, KeyError> {
        let invalid_point = |_| KeyError::EC {
            context: format!("invalid {} peer public point", self.curve),
        };

        with_secret_key!(
            self,
            |secret| {
                let peer = p256::PublicKey::from_sec1_bytes(peer_point).map_err(invalid_point)?;
                let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
                Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
            },
            {
                let peer = p384::PublicKey::from_sec1_bytes(peer_point).map_err(invalid_point)?;
                let shared = p384::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
                Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
            }
        )
    }
}

/// Checks that `point` is a valid SEC1 encoded point of `curve`.
pub(crate) fn validate_point(curve: EcCurve, point: &[u8]) -> Result<(), KeyError> {
    let valid = match curve {
        EcCurve::NistP256 => p256::PublicKey::from_sec1_bytes(point).is_ok(),
        EcCurve::NistP384 => p384::PublicKey::from_sec1_bytes(point).is_ok(),
    };

    if valid {
        Ok(())
    } else {
        Err(KeyError::EC {
            context: format!("invalid {} public point", curve),
        })
    }
}

/// Verifies a DER encoded ECDSA signature over an already computed digest.
pub(crate) fn verify_prehash(curve: EcCurve, point: &[u8], digest: &[u8], signature: &[u8]) -> Result<(), KeyError> {
    use p256::ecdsa::signature::hazmat::PrehashVerifier;

    let bad_signature = |_| KeyError::EC {
        context: "bad ECDSA signature".to_owned(),
    };

    match curve {
        EcCurve::NistP256 => {
            let verifier = p256::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(bad_signature)?;
            let signature = p256::ecdsa::Signature::from_der(signature).map_err(bad_signature)?;
            verifier.verify_prehash(digest, &signature).map_err(bad_signature)
        }
        EcCurve::NistP384 => {
            let verifier = p384::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(bad_signature)?;
            let signature = p384::ecdsa::Signature::from_der(signature).map_err(bad_signature)?;
            verifier.verify_prehash(digest, &signature).map_err(bad_signature)
        }
    }
}
