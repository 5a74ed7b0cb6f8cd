//! Hash algorithms supported by picky-cms

use crate::error::CmsError;
use crate::oids;
use digest::Digest;
use picky_cms_asn1::ObjectIdentifier;
use serde::{Deserialize, Serialize};

/// Supported hash algorithms
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    SHA1,
    SHA2_224,
    SHA2_256,
    SHA2_384,
    SHA2_512,
}

impl HashAlgorithm {
    pub fn digest(self, msg: &[u8]) -> Vec<u8> {
        match self {
            Self::SHA1 => sha1::Sha1::digest(msg).as_slice().to_vec(),
            Self::SHA2_224 => sha2::Sha224::digest(msg).as_slice().to_vec(),
            Self::SHA2_256 => sha2::Sha256::digest(msg).as_slice().to_vec(),
            Self::SHA2_384 => sha2::Sha384::digest(msg).as_slice().to_vec(),
            Self::SHA2_512 => sha2::Sha512::digest(msg).as_slice().to_vec(),
        }
    }

    /// Digest of the concatenation of `parts`.
    pub fn digest_parts(self, parts: &[&[u8]]) -> Vec<u8> {
        fn run<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
            let mut hasher = D::new();
            for part in parts {
                hasher.update(part);
            }
            hasher.finalize().as_slice().to_vec()
        }

        match self {
            Self::SHA1 => run::<sha1::Sha1>(parts),
            Self::SHA2_224 => run::<sha2::Sha224>(parts),
            Self::SHA2_256 => run::<sha2::Sha256>(parts),
            Self::SHA2_384 => run::<sha2::Sha384>(parts),
            Self::SHA2_512 => run::<sha2::Sha512>(parts),
        }
    }

    pub fn output_size(self) -> usize {
        match self {
            Self::SHA1 => 20,
            Self::SHA2_224 => 28,
            Self::SHA2_256 => 32,
            Self::SHA2_384 => 48,
            Self::SHA2_512 => 64,
        }
    }

    pub fn to_oid(self) -> ObjectIdentifier {
        match self {
            Self::SHA1 => oids::sha1(),
            Self::SHA2_224 => oids::sha224(),
            Self::SHA2_256 => oids::sha256(),
            Self::SHA2_384 => oids::sha384(),
            Self::SHA2_512 => oids::sha512(),
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, CmsError> {
        let oid_string: String = oid.into();
        match oid_string.as_str() {
            oids::SHA1 => Ok(Self::SHA1),
            oids::SHA224 => Ok(Self::SHA2_224),
            oids::SHA256 => Ok(Self::SHA2_256),
            oids::SHA384 => Ok(Self::SHA2_384),
            oids::SHA512 => Ok(Self::SHA2_512),
            _ => Err(CmsError::unsupported_algorithm(oid_string)),
        }
    }

    /// PKCS#1 v1.5 signature scheme producing and checking a DigestInfo for this hash.
    pub(crate) fn pkcs1v15_scheme(self) -> rsa::Pkcs1v15Sign {
        match self {
            Self::SHA1 => rsa::Pkcs1v15Sign::new::<sha1::Sha1>(),
            Self::SHA2_224 => rsa::Pkcs1v15Sign::new::<sha2::Sha224>(),
            Self::SHA2_256 => rsa::Pkcs1v15Sign::new::<sha2::Sha256>(),
            Self::SHA2_384 => rsa::Pkcs1v15Sign::new::<sha2::Sha384>(),
            Self::SHA2_512 => rsa::Pkcs1v15Sign::new::<sha2::Sha512>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HashAlgorithm::SHA1, "a9993e364706816aba3e25717850c26c9cd0d89d")]
    #[case(HashAlgorithm::SHA2_224, "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7")]
    #[case(
        HashAlgorithm::SHA2_256,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    )]
    fn digest_abc(#[case] hash: HashAlgorithm, #[case] expected: &str) {
        let digest = hash.digest(b"abc");
        assert_eq!(hex::encode(&digest), expected);
        assert_eq!(digest.len(), hash.output_size());
        assert_eq!(hash.digest_parts(&[&b"a"[..], &b""[..], &b"bc"[..]]), digest);
    }

    #[rstest]
    #[case(HashAlgorithm::SHA1)]
    #[case(HashAlgorithm::SHA2_224)]
    #[case(HashAlgorithm::SHA2_256)]
    #[case(HashAlgorithm::SHA2_384)]
    #[case(HashAlgorithm::SHA2_512)]
    fn oid_mapping(#[case] hash: HashAlgorithm) {
        assert_eq!(HashAlgorithm::from_oid(&hash.to_oid()).expect("known hash"), hash);
        assert_eq!(hash.digest(b"").len(), hash.output_size());
    }

    #[test]
    fn unknown_oid_is_unsupported() {
        let err = HashAlgorithm::from_oid(&oids::rsa_encryption()).unwrap_err();
        assert!(matches!(err, CmsError::UnsupportedAlgorithm { algorithm } if algorithm == oids::RSA_ENCRYPTION));
    }
}
