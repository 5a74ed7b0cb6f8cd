//! Outer `ContentInfo` handling, the Data content type and PEM armor.
//!
//! ```text
//! ContentInfo ::= SEQUENCE {
//!     contentType ContentType,
//!     content [0] EXPLICIT ANY DEFINED BY contentType }
//! ```

use crate::config::CmsContext;
use crate::error::CmsError;
use crate::oids;
use crate::pem::{parse_pem, to_pem, CMS_PEM_LABEL, PKCS7_PEM_LABEL};
use picky_cms_asn1::{ber, Asn1DerError, Node, ObjectIdentifier, Reader, Tag};

pub struct ContentInfo;

impl ContentInfo {
    /// Content type of a DER or BER encoded `ContentInfo`, without decoding the content.
    pub fn peek_content_type(input: &[u8]) -> Result<ObjectIdentifier, CmsError> {
        // only the outer header and the OID are needed, indefinite lengths don't matter here
        let mut reader = Reader::new(input);
        match reader.peek_tag() {
            Some(Tag::SEQUENCE) => {}
            Some(actual) => {
                return Err(Asn1DerError::UnexpectedTag {
                    expected: Tag::SEQUENCE,
                    actual,
                }
                .into())
            }
            None => return Err(Asn1DerError::TruncatedData.into()),
        }

        let header_len = match input.get(1) {
            Some(0x80) => 2,
            _ => {
                reader.read_header()?;
                reader.position()
            }
        };

        let mut reader = Reader::new(&input[header_len..]);
        Ok(reader.read_oid()?)
    }
}

/// Runs `decode` on `input`, and again on its DER normalization when indefinite lengths are found.
pub(crate) fn decode_ber<T>(input: &[u8], decode: impl Fn(&[u8]) -> Result<T, CmsError>) -> Result<T, CmsError> {
    match decode(input) {
        Err(CmsError::Asn1(Asn1DerError::IndefiniteLength)) => {
            log::debug!("indefinite length found, normalizing BER input");
            let der = ber::to_der(input)?;
            decode(&der)
        }
        result => result,
    }
}

/// Wraps an encoded content in a `ContentInfo`.
pub(crate) fn wrap<'a>(content_type: &ObjectIdentifier, content: Node<'a>) -> Node<'a> {
    Node::sequence(vec![Node::oid(content_type), Node::explicit(0, content)])
}

/// Reads the outer `ContentInfo` and returns a reader over its content.
///
/// `expected` is the dotted content type the caller handles.
pub(crate) fn read_content_info<'a>(input: &'a [u8], expected: &'static str) -> Result<Reader<'a>, CmsError> {
    let mut reader = Reader::new(input);
    let mut content_info = reader.read_sequence()?;
    let content_type = content_info.read_oid()?;

    let content_type_string: String = (&content_type).into();
    if content_type_string != expected {
        return Err(CmsError::WrongContentType {
            expected,
            actual: content_type_string,
        });
    }

    let content = content_info.read_context(0)?;
    content_info.finish()?;

    Ok(content)
}

/// OCTET STRING content, primitive or constructed from fragments.
pub(crate) fn read_octet_string_content(reader: &mut Reader<'_>) -> Result<Vec<u8>, CmsError> {
    match reader.peek_tag() {
        Some(Tag::OCTET_STRING_CONSTRUCTED) => {
            let fragments = reader.read_expected(Tag::OCTET_STRING_CONSTRUCTED)?;
            collect_fragments(fragments)
        }
        _ => Ok(reader.read_octet_string()?.to_vec()),
    }
}

/// Concatenates the OCTET STRING fragments held by a constructed element.
pub(crate) fn collect_fragments(fragments: &[u8]) -> Result<Vec<u8>, CmsError> {
    let mut reader = Reader::new(fragments);
    let mut content = Vec::with_capacity(fragments.len());
    while !reader.is_empty() {
        content.extend_from_slice(&read_octet_string_content(&mut reader)?);
    }
    Ok(content)
}

impl CmsContext {
    /// `ContentInfo { data, [0] EXPLICIT OCTET STRING }`
    pub fn encode_data(&self, content: &[u8]) -> Vec<u8> {
        wrap(&oids::data(), Node::octet_string(content)).to_vec()
    }

    /// Accepts the `[0]` wrapped form as well as a bare OCTET STRING following the content type.
    pub fn decode_data(&self, input: &[u8]) -> Result<Vec<u8>, CmsError> {
        decode_ber(input, |input| {
            let mut reader = Reader::new(input);
            let mut content_info = reader.read_sequence()?;
            let content_type = content_info.read_oid()?;
            if content_type != oids::data() {
                return Err(CmsError::WrongContentType {
                    expected: oids::DATA,
                    actual: content_type.into(),
                });
            }

            let content = if content_info.peek_is(Tag::CTX_0) {
                let mut explicit = content_info.read_context(0)?;
                let content = read_octet_string_content(&mut explicit)?;
                explicit.finish()?;
                content
            } else {
                log::debug!("Data content without [0] wrapper");
                read_octet_string_content(&mut content_info)?
            };
            content_info.finish()?;

            Ok(content)
        })
    }
}

/// PEM armor with the `CMS` label.
pub fn cms_to_pem(der: &[u8]) -> Result<String, CmsError> {
    Ok(to_pem(CMS_PEM_LABEL, der)?)
}

/// DER from a `CMS` or `PKCS7` PEM block.
pub fn cms_from_pem(pem_str: &str) -> Result<Vec<u8>, CmsError> {
    let pem = parse_pem(pem_str)?;
    if pem.label() != CMS_PEM_LABEL && pem.label() != PKCS7_PEM_LABEL {
        return Err(CmsError::invalid_argument(format!(
            "unexpected PEM label: {}",
            pem.label()
        )));
    }
    Ok(pem.into_data())
}
