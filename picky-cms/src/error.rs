use crate::key::KeyError;
use crate::pem::PemError;
use picky_cms_asn1::Asn1DerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmsError {
    /// malformed DER input
    #[error("ASN.1 error: {0}")]
    Asn1(Asn1DerError),

    /// block cipher padding doesn't follow PKCS#7 rules
    #[error("invalid content padding")]
    InvalidPadding,

    /// caller supplied output buffer is too small
    #[error("output buffer too small: {required} bytes required, {available} available")]
    BufferTooSmall { required: usize, available: usize },

    /// unsupported algorithm
    #[error("unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// unexpected structure version
    #[error("unsupported {structure} version: {version}")]
    Version { structure: &'static str, version: u32 },

    /// SignedData without signer while degenerate messages are refused
    #[error("no signer found in SignedData")]
    NoSigner,

    /// none of the recipient infos targets the configured certificate
    #[error("recipient not found")]
    RecipientNotFound,

    #[error("signature verification failed")]
    SignatureVerification,

    #[error("wrong content type: expected {expected}, found {actual}")]
    WrongContentType { expected: &'static str, actual: String },

    #[error("invalid argument: {context}")]
    InvalidArgument { context: String },

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("invalid certificate: {context}")]
    Certificate { context: String },

    /// AES key wrap integrity check failed
    #[error("key wrap error")]
    KeyWrap,

    #[error("compression error: {source}")]
    Compression { source: std::io::Error },

    #[error("decompressed content exceeds the limit of {limit} bytes")]
    DecompressionLimit { limit: usize },

    #[error("invalid PEM: {source}")]
    Pem { source: PemError },
}

impl CmsError {
    pub(crate) fn invalid_argument(context: impl Into<String>) -> Self {
        Self::InvalidArgument {
            context: context.into(),
        }
    }

    pub(crate) fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }
}

impl From<Asn1DerError> for CmsError {
    fn from(e: Asn1DerError) -> Self {
        match e {
            Asn1DerError::BufferTooSmall { required, available } => Self::BufferTooSmall { required, available },
            e => Self::Asn1(e),
        }
    }
}

impl From<aes_kw::Error> for CmsError {
    fn from(_: aes_kw::Error) -> Self {
        Self::KeyWrap
    }
}

impl From<std::io::Error> for CmsError {
    fn from(e: std::io::Error) -> Self {
        Self::Compression { source: e }
    }
}

impl From<PemError> for CmsError {
    fn from(e: PemError) -> Self {
        Self::Pem { source: e }
    }
}

impl From<rsa::errors::Error> for CmsError {
    fn from(e: rsa::errors::Error) -> Self {
        Self::Key(KeyError::from(e))
    }
}
