//! # picky-cms
//!
//! Cryptographic Message Syntax (RFC 5652) and its PKCS#7 ancestor.
//!
//! Supported content types: Data, SignedData, EnvelopedData (key transport and key agreement recipients),
//! EncryptedData and CompressedData. Every operation is a method of [`CmsContext`], configured once through
//! [`CmsContextBuilder`] and returning its own output.
//!
//! ```no_run
//! use picky_cms::{CertificateInfo, CmsContext, PrivateKey};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let (certificate_pem, private_key_pem) = ("", "");
//! let mut context = CmsContext::builder()
//!     .with_certificate(CertificateInfo::from_pem_str(certificate_pem)?)
//!     .with_private_key(PrivateKey::from_pem_str(private_key_pem)?)
//!     .build()?;
//!
//! let signed = context.encode_signed_data(b"content")?;
//! let verified = context.verify_signed_data(&signed)?;
//! assert_eq!(verified.content.as_deref(), Some(&b"content"[..]));
//! # Ok(())
//! # }
//! ```

pub mod algorithm;
pub mod attribute;
pub mod certificate;
pub mod cipher;
pub mod compressed;
pub mod config;
pub mod content_info;
pub mod date;
pub mod encrypted;
pub mod enveloped;
pub mod error;
pub mod hash;
pub mod key;
pub mod oids;
pub mod pem;
pub mod signed;

mod kdf;
mod signature;

pub use algorithm::{
    AlgorithmIdentifier, CompressionAlgorithm, ContentEncryptionAlgorithm, KeyAgreementAlgorithm, KeyWrapAlgorithm,
    PublicKeyAlgorithm, SignatureAlgorithm,
};
pub use attribute::{Attribute, AttributeTable};
pub use certificate::CertificateInfo;
pub use cipher::{pad, pad_size, unpad};
pub use compressed::DecompressedContent;
pub use config::{CmsContext, CmsContextBuilder, SignerIdentifierKind};
pub use content_info::{cms_from_pem, cms_to_pem, ContentInfo};
pub use date::UtcDate;
pub use encrypted::DecryptedContent;
pub use error::CmsError;
pub use hash::HashAlgorithm;
pub use key::{EcCurve, KeyError, PrivateKey, PublicKey};
pub use picky_cms_asn1::ObjectIdentifier;
pub use signed::{SignedDataOutput, SignerIdentifier};
