//! Signed, unsigned and unprotected attributes.
//!
//! `Attribute ::= SEQUENCE { attrType OBJECT IDENTIFIER, attrValues SET OF AttributeValue }`

use crate::date::UtcDate;
use crate::error::CmsError;
use crate::oids;
use picky_cms_asn1::{Node, ObjectIdentifier, Reader, Tag};

/// A single attribute.
///
/// `value` holds the content of the `attrValues` SET, that is the DER encoding of the value(s), tag included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    oid: ObjectIdentifier,
    value: Vec<u8>,
}

impl Attribute {
    /// Builds an attribute from the DER encoding of its value.
    pub fn new(oid: ObjectIdentifier, value: Vec<u8>) -> Self {
        Self { oid, value }
    }

    pub fn content_type(content_type: &ObjectIdentifier) -> Self {
        Self::new(oids::content_type(), Node::oid(content_type).to_vec())
    }

    pub fn message_digest(digest: &[u8]) -> Self {
        Self::new(oids::message_digest(), Node::octet_string(digest).to_vec())
    }

    pub fn signing_time(date: &UtcDate) -> Self {
        Self::new(oids::signing_time(), date.to_node().to_vec())
    }

    pub fn oid(&self) -> &ObjectIdentifier {
        &self.oid
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn to_node(&self) -> Node<'_> {
        Node::sequence(vec![
            Node::oid(&self.oid),
            Node::set(vec![Node::raw(self.value.as_slice())]),
        ])
    }
}

/// Attributes in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTable {
    attributes: Vec<Attribute>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Value of the first attribute with exactly this type.
    pub fn get(&self, oid: &ObjectIdentifier) -> Option<&[u8]> {
        self.attributes
            .iter()
            .find(|attribute| &attribute.oid == oid)
            .map(Attribute::value)
    }

    /// First attribute whose type starts with `oid_prefix`, comparing at most `compare_len` octets of
    /// OID content.
    ///
    /// Loose matching, only useful to find a member of an OID arc. Prefer [`AttributeTable::get`].
    pub fn get_by_prefix(&self, oid_prefix: &[u8], compare_len: usize) -> Option<&Attribute> {
        log::warn!(
            "attribute lookup by OID prefix ({} octets compared)",
            compare_len.min(oid_prefix.len())
        );

        self.attributes.iter().find(|attribute| {
            let stored = Into::<Vec<u8>>::into(&attribute.oid);
            let len = compare_len.min(stored.len());
            len > 0 && oid_prefix.len() >= len && stored[..len] == oid_prefix[..len]
        })
    }

    pub fn content_type(&self) -> Result<Option<ObjectIdentifier>, CmsError> {
        self.get(&oids::content_type())
            .map(|value| Reader::new(value).read_oid().map_err(CmsError::from))
            .transpose()
    }

    pub fn message_digest(&self) -> Result<Option<&[u8]>, CmsError> {
        self.get(&oids::message_digest())
            .map(|value| Reader::new(value).read_octet_string().map_err(CmsError::from))
            .transpose()
    }

    pub fn signing_time(&self) -> Result<Option<UtcDate>, CmsError> {
        self.get(&oids::signing_time())
            .map(|value| UtcDate::decode(&mut Reader::new(value)))
            .transpose()
    }

    /// Parses the content of an attribute SET.
    ///
    /// Any malformed attribute fails the whole decoding.
    pub fn decode(content: &[u8]) -> Result<Self, CmsError> {
        let mut reader = Reader::new(content);
        let mut attributes = Vec::new();

        while !reader.is_empty() {
            let mut attribute = reader.read_sequence()?;
            let oid = attribute.read_oid()?;
            let values = attribute.read_expected(Tag::SET)?;
            attribute.finish()?;

            // every value must at least be a well formed element
            let mut check = Reader::new(values);
            while !check.is_empty() {
                check.skip()?;
            }

            attributes.push(Attribute::new(oid, values.to_vec()));
        }

        Ok(Self { attributes })
    }

    /// Attributes sorted in DER `SET OF` order, without the SET header.
    ///
    /// The signature over signed attributes is computed on this content re-tagged as a SET.
    pub fn to_set_content(&self) -> Node<'_> {
        let mut encoded: Vec<(Vec<u8>, Node<'_>)> = self
            .attributes
            .iter()
            .map(|attribute| {
                let node = attribute.to_node();
                (node.to_vec(), node)
            })
            .collect();
        encoded.sort_by(|a, b| a.0.cmp(&b.0));
        Node::concat(encoded.into_iter().map(|(_, node)| node).collect())
    }
}

impl From<Vec<Attribute>> for AttributeTable {
    fn from(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }
}

impl<'a> IntoIterator for &'a AttributeTable {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picky_cms_asn1::Asn1DerError;
    use pretty_assertions::assert_eq;

    fn sample_table() -> AttributeTable {
        AttributeTable::from(vec![
            Attribute::signing_time(&UtcDate::new(2026, 10, 16, 15, 51, 48).expect("valid date")),
            Attribute::content_type(&oids::data()),
            Attribute::message_digest(&[0xAB; 32]),
        ])
    }

    #[test]
    fn canned_attributes_read_back() {
        let table = sample_table();
        assert_eq!(table.content_type().expect("decode"), Some(oids::data()));
        assert_eq!(table.message_digest().expect("decode"), Some(&[0xAB; 32][..]));
        assert_eq!(
            table.signing_time().expect("decode"),
            UtcDate::new(2026, 10, 16, 15, 51, 48)
        );
    }

    #[test]
    fn set_content_is_sorted_and_decodes() {
        let table = sample_table();
        let content = table.to_set_content().to_vec();

        let decoded = AttributeTable::decode(&content).expect("decode");
        let order: Vec<String> = decoded.iter().map(|a| Into::<String>::into(a.oid())).collect();
        // SET OF order compares whole encodings, the length octet decides here
        assert_eq!(order, vec![oids::CONTENT_TYPE, oids::SIGNING_TIME, oids::MESSAGE_DIGEST]);
        assert_eq!(decoded.len(), 3);
    }

    #[test]
    fn malformed_attribute_fails_everything() {
        let mut content = sample_table().to_set_content().to_vec();
        // SEQUENCE { OID contentType, SET { OID truncated } }
        content.extend_from_slice(&[0x30, 0x0E]);
        content.extend_from_slice(&Node::oid(&oids::content_type()).to_vec());
        content.extend_from_slice(&[0x31, 0x01, 0x06]);

        let err = AttributeTable::decode(&content).unwrap_err();
        assert!(matches!(err, CmsError::Asn1(_)));
    }

    #[test]
    fn value_must_be_an_element() {
        let mut content = vec![0x30, 0x0F];
        content.extend_from_slice(&Node::oid(&oids::content_type()).to_vec());
        content.extend_from_slice(&[0x31, 0x02, 0x06, 0x05]);
        assert!(matches!(
            AttributeTable::decode(&content),
            Err(CmsError::Asn1(Asn1DerError::LengthOverflow { .. }))
        ));
    }

    #[test]
    fn exact_and_prefix_lookup() {
        let table = sample_table();
        assert!(table.get(&oids::smime_capabilities()).is_none());

        // 1.2.840.113549.1.9 arc
        let pkcs9_arc = [0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09];
        let found = table.get_by_prefix(&pkcs9_arc, pkcs9_arc.len()).expect("prefix match");
        assert_eq!(found.oid(), &oids::signing_time());

        let rsadsi_pkcs1 = [0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01];
        assert!(table.get_by_prefix(&rsadsi_pkcs1, rsadsi_pkcs1.len()).is_none());

        let full = oids::message_digest();
        let content = Into::<Vec<u8>>::into(&full);
        let found = table
            .get_by_prefix(&content, content.len())
            .expect("full length match");
        assert_eq!(found.oid(), &full);
    }
}
