//! Algorithm identifiers and the registries mapping them to typed algorithms.

use crate::error::CmsError;
use crate::hash::HashAlgorithm;
use crate::key::EcCurve;
use crate::oids;
use picky_cms_asn1::{Node, ObjectIdentifier, Reader, Tag};
use serde::{Deserialize, Serialize};

const NULL_PARAMETERS: &[u8] = &[0x05, 0x00];

/// `AlgorithmIdentifier ::= SEQUENCE { algorithm OBJECT IDENTIFIER, parameters ANY OPTIONAL }`
///
/// Parameters are kept as raw DER, tag included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    algorithm: ObjectIdentifier,
    parameters: Option<Vec<u8>>,
}

impl AlgorithmIdentifier {
    pub fn new(algorithm: ObjectIdentifier, parameters: Option<Vec<u8>>) -> Self {
        Self { algorithm, parameters }
    }

    pub fn new_with_null(algorithm: ObjectIdentifier) -> Self {
        Self::new(algorithm, Some(NULL_PARAMETERS.to_vec()))
    }

    pub fn new_without_parameters(algorithm: ObjectIdentifier) -> Self {
        Self::new(algorithm, None)
    }

    /// Cipher identifier carrying its IV as an OCTET STRING.
    pub fn new_with_iv(algorithm: ObjectIdentifier, iv: &[u8]) -> Self {
        Self::new(algorithm, Some(Node::octet_string(iv).to_vec()))
    }

    pub fn oid(&self) -> &ObjectIdentifier {
        &self.algorithm
    }

    pub fn parameters(&self) -> Option<&[u8]> {
        self.parameters.as_deref()
    }

    /// Parameters parsed as an OCTET STRING, the usual IV representation.
    pub fn octet_string_parameter(&self) -> Result<&[u8], CmsError> {
        let parameters = self
            .parameters
            .as_deref()
            .ok_or_else(|| CmsError::invalid_argument(format!("{} requires parameters", Into::<String>::into(&self.algorithm))))?;
        let mut reader = Reader::new(parameters);
        let value = reader.read_octet_string()?;
        reader.finish()?;
        Ok(value)
    }

    /// Parameters parsed as an OBJECT IDENTIFIER (e.g. named curve, wrap algorithm).
    pub fn oid_parameter(&self) -> Result<Option<ObjectIdentifier>, CmsError> {
        match self.parameters.as_deref() {
            None => Ok(None),
            Some(parameters) if Reader::new(parameters).peek_is(Tag::NULL) => Ok(None),
            Some(parameters) => Ok(Some(Reader::new(parameters).read_oid()?)),
        }
    }

    pub fn to_node(&self) -> Node<'_> {
        let mut children = vec![Node::oid(&self.algorithm)];
        if let Some(parameters) = &self.parameters {
            children.push(Node::raw(parameters.as_slice()));
        }
        Node::sequence(children)
    }

    pub fn into_node(self) -> Node<'static> {
        let mut children = vec![Node::oid(&self.algorithm)];
        if let Some(parameters) = self.parameters {
            children.push(Node::raw(parameters));
        }
        Node::sequence(children)
    }

    pub fn decode(reader: &mut Reader<'_>) -> Result<Self, CmsError> {
        let mut seq = reader.read_sequence()?;
        let algorithm = seq.read_oid()?;
        let parameters = if seq.is_empty() {
            None
        } else {
            Some(seq.read_any()?.to_vec())
        };
        seq.finish()?;
        Ok(Self { algorithm, parameters })
    }
}

/// Content-encryption algorithms (CBC mode block ciphers).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncryptionAlgorithm {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
    DesCbc,
    DesEde3Cbc,
}

impl ContentEncryptionAlgorithm {
    pub fn key_size(self) -> usize {
        match self {
            Self::Aes128Cbc => 16,
            Self::Aes192Cbc => 24,
            Self::Aes256Cbc => 32,
            Self::DesCbc => 8,
            Self::DesEde3Cbc => 24,
        }
    }

    pub fn block_size(self) -> usize {
        match self {
            Self::Aes128Cbc | Self::Aes192Cbc | Self::Aes256Cbc => 16,
            Self::DesCbc | Self::DesEde3Cbc => 8,
        }
    }

    pub fn to_oid(self) -> ObjectIdentifier {
        match self {
            Self::Aes128Cbc => oids::aes128_cbc(),
            Self::Aes192Cbc => oids::aes192_cbc(),
            Self::Aes256Cbc => oids::aes256_cbc(),
            Self::DesCbc => oids::des_cbc(),
            Self::DesEde3Cbc => oids::des_ede3_cbc(),
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, CmsError> {
        let oid_string: String = oid.into();
        match oid_string.as_str() {
            oids::AES128_CBC => Ok(Self::Aes128Cbc),
            oids::AES192_CBC => Ok(Self::Aes192Cbc),
            oids::AES256_CBC => Ok(Self::Aes256Cbc),
            oids::DES_CBC => Ok(Self::DesCbc),
            oids::DES_EDE3_CBC => Ok(Self::DesEde3Cbc),
            _ => Err(CmsError::unsupported_algorithm(oid_string)),
        }
    }
}

/// AES key wrap (RFC 3394) used by key agreement recipients.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyWrapAlgorithm {
    Aes128Wrap,
    Aes192Wrap,
    Aes256Wrap,
}

impl KeyWrapAlgorithm {
    /// Size of the key-encryption key.
    pub fn kek_size(self) -> usize {
        match self {
            Self::Aes128Wrap => 16,
            Self::Aes192Wrap => 24,
            Self::Aes256Wrap => 32,
        }
    }

    pub fn to_oid(self) -> ObjectIdentifier {
        match self {
            Self::Aes128Wrap => oids::aes128_wrap(),
            Self::Aes192Wrap => oids::aes192_wrap(),
            Self::Aes256Wrap => oids::aes256_wrap(),
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, CmsError> {
        let oid_string: String = oid.into();
        match oid_string.as_str() {
            oids::AES128_WRAP => Ok(Self::Aes128Wrap),
            oids::AES192_WRAP => Ok(Self::Aes192Wrap),
            oids::AES256_WRAP => Ok(Self::Aes256Wrap),
            _ => Err(CmsError::unsupported_algorithm(oid_string)),
        }
    }
}

/// Ephemeral-static ECDH schemes, named after the X9.63 KDF hash.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAgreementAlgorithm {
    StdDhSha1Kdf,
    StdDhSha224Kdf,
    StdDhSha256Kdf,
    StdDhSha384Kdf,
    StdDhSha512Kdf,
}

impl KeyAgreementAlgorithm {
    pub fn kdf_hash(self) -> HashAlgorithm {
        match self {
            Self::StdDhSha1Kdf => HashAlgorithm::SHA1,
            Self::StdDhSha224Kdf => HashAlgorithm::SHA2_224,
            Self::StdDhSha256Kdf => HashAlgorithm::SHA2_256,
            Self::StdDhSha384Kdf => HashAlgorithm::SHA2_384,
            Self::StdDhSha512Kdf => HashAlgorithm::SHA2_512,
        }
    }

    pub fn to_oid(self) -> ObjectIdentifier {
        match self {
            Self::StdDhSha1Kdf => oids::dh_single_pass_std_dh_sha1kdf_scheme(),
            Self::StdDhSha224Kdf => oids::dh_single_pass_std_dh_sha224kdf_scheme(),
            Self::StdDhSha256Kdf => oids::dh_single_pass_std_dh_sha256kdf_scheme(),
            Self::StdDhSha384Kdf => oids::dh_single_pass_std_dh_sha384kdf_scheme(),
            Self::StdDhSha512Kdf => oids::dh_single_pass_std_dh_sha512kdf_scheme(),
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, CmsError> {
        let oid_string: String = oid.into();
        match oid_string.as_str() {
            oids::DH_SINGLE_PASS_STD_DH_SHA1KDF_SCHEME => Ok(Self::StdDhSha1Kdf),
            oids::DH_SINGLE_PASS_STD_DH_SHA224KDF_SCHEME => Ok(Self::StdDhSha224Kdf),
            oids::DH_SINGLE_PASS_STD_DH_SHA256KDF_SCHEME => Ok(Self::StdDhSha256Kdf),
            oids::DH_SINGLE_PASS_STD_DH_SHA384KDF_SCHEME => Ok(Self::StdDhSha384Kdf),
            oids::DH_SINGLE_PASS_STD_DH_SHA512KDF_SCHEME => Ok(Self::StdDhSha512Kdf),
            _ => Err(CmsError::unsupported_algorithm(oid_string)),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKeyAlgorithm {
    Rsa,
    Ec(EcCurve),
}

impl PublicKeyAlgorithm {
    pub fn to_oid(self) -> ObjectIdentifier {
        match self {
            Self::Rsa => oids::rsa_encryption(),
            Self::Ec(_) => oids::ec_public_key(),
        }
    }
}

/// Signature algorithm: a public-key algorithm combined with a hash.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    RsaPkcs1v15(HashAlgorithm),
    Ecdsa(HashAlgorithm),
}

impl SignatureAlgorithm {
    pub fn new(public_key: PublicKeyAlgorithm, hash: HashAlgorithm) -> Self {
        match public_key {
            PublicKeyAlgorithm::Rsa => Self::RsaPkcs1v15(hash),
            PublicKeyAlgorithm::Ec(_) => Self::Ecdsa(hash),
        }
    }

    pub fn hash(self) -> HashAlgorithm {
        match self {
            Self::RsaPkcs1v15(hash) | Self::Ecdsa(hash) => hash,
        }
    }

    pub fn to_oid(self) -> ObjectIdentifier {
        match self {
            Self::RsaPkcs1v15(HashAlgorithm::SHA1) => oids::sha1_with_rsa_encryption(),
            Self::RsaPkcs1v15(HashAlgorithm::SHA2_224) => oids::sha224_with_rsa_encryption(),
            Self::RsaPkcs1v15(HashAlgorithm::SHA2_256) => oids::sha256_with_rsa_encryption(),
            Self::RsaPkcs1v15(HashAlgorithm::SHA2_384) => oids::sha384_with_rsa_encryption(),
            Self::RsaPkcs1v15(HashAlgorithm::SHA2_512) => oids::sha512_with_rsa_encryption(),
            Self::Ecdsa(HashAlgorithm::SHA1) => oids::ecdsa_with_sha1(),
            Self::Ecdsa(HashAlgorithm::SHA2_224) => oids::ecdsa_with_sha224(),
            Self::Ecdsa(HashAlgorithm::SHA2_256) => oids::ecdsa_with_sha256(),
            Self::Ecdsa(HashAlgorithm::SHA2_384) => oids::ecdsa_with_sha384(),
            Self::Ecdsa(HashAlgorithm::SHA2_512) => oids::ecdsa_with_sha512(),
        }
    }

    /// RSA identifiers carry NULL parameters, ECDSA ones have none.
    pub fn to_algorithm_identifier(self) -> AlgorithmIdentifier {
        match self {
            Self::RsaPkcs1v15(_) => AlgorithmIdentifier::new_with_null(self.to_oid()),
            Self::Ecdsa(_) => AlgorithmIdentifier::new_without_parameters(self.to_oid()),
        }
    }

    /// Maps a signature algorithm OID.
    ///
    /// Bare key OIDs (`rsaEncryption` is what most toolkits write in a SignerInfo) are accepted, the hash is
    /// then the signer's digest algorithm.
    pub fn from_oid(oid: &ObjectIdentifier, digest_algorithm: HashAlgorithm) -> Result<Self, CmsError> {
        let oid_string: String = oid.into();
        match oid_string.as_str() {
            oids::RSA_ENCRYPTION => Ok(Self::RsaPkcs1v15(digest_algorithm)),
            oids::SHA1_WITH_RSA_ENCRYPTION => Ok(Self::RsaPkcs1v15(HashAlgorithm::SHA1)),
            oids::SHA224_WITH_RSA_ENCRYPTION => Ok(Self::RsaPkcs1v15(HashAlgorithm::SHA2_224)),
            oids::SHA256_WITH_RSA_ENCRYPTION => Ok(Self::RsaPkcs1v15(HashAlgorithm::SHA2_256)),
            oids::SHA384_WITH_RSA_ENCRYPTION => Ok(Self::RsaPkcs1v15(HashAlgorithm::SHA2_384)),
            oids::SHA512_WITH_RSA_ENCRYPTION => Ok(Self::RsaPkcs1v15(HashAlgorithm::SHA2_512)),
            oids::EC_PUBLIC_KEY => Ok(Self::Ecdsa(digest_algorithm)),
            oids::ECDSA_WITH_SHA1 => Ok(Self::Ecdsa(HashAlgorithm::SHA1)),
            oids::ECDSA_WITH_SHA224 => Ok(Self::Ecdsa(HashAlgorithm::SHA2_224)),
            oids::ECDSA_WITH_SHA256 => Ok(Self::Ecdsa(HashAlgorithm::SHA2_256)),
            oids::ECDSA_WITH_SHA384 => Ok(Self::Ecdsa(HashAlgorithm::SHA2_384)),
            oids::ECDSA_WITH_SHA512 => Ok(Self::Ecdsa(HashAlgorithm::SHA2_512)),
            _ => Err(CmsError::unsupported_algorithm(oid_string)),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionAlgorithm {
    Zlib,
}

impl CompressionAlgorithm {
    pub fn to_oid(self) -> ObjectIdentifier {
        match self {
            Self::Zlib => oids::zlib_compress(),
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, CmsError> {
        let oid_string: String = oid.into();
        match oid_string.as_str() {
            oids::ZLIB_COMPRESS => Ok(Self::Zlib),
            _ => Err(CmsError::unsupported_algorithm(oid_string)),
        }
    }
}
