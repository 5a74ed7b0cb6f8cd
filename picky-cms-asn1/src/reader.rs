use crate::error::{Asn1DerError, Result};
use crate::length::Length;
use crate::tag::Tag;
use oid::ObjectIdentifier;

/// A decoded element borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: Tag,
    /// content octets
    pub content: &'a [u8],
    /// tag, length and content octets
    pub raw: &'a [u8],
}

/// Bounded DER reader.
///
/// Every reader covers exactly one slice: constructed elements hand out sub-readers bounded to their
/// content, so a malformed inner length can never make decoding step outside the enclosing element.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek_tag(&self) -> Option<Tag> {
        self.data.get(self.pos).copied().map(Tag::from)
    }

    pub fn peek_is(&self, tag: Tag) -> bool {
        self.peek_tag() == Some(tag)
    }

    fn read_tag(&mut self) -> Result<Tag> {
        let tag = self.peek_tag().ok_or(Asn1DerError::TruncatedData)?;
        if tag.is_high_tag_number() {
            return Err(Asn1DerError::UnsupportedTag(tag));
        }
        self.pos += 1;
        Ok(tag)
    }

    /// Reads the next element whatever its tag.
    pub fn read_tlv(&mut self) -> Result<Tlv<'a>> {
        let start = self.pos;
        let tag = self.read_tag()?;

        let (len, content_start) = match Length::decode(self.data, self.pos, self.data.len()) {
            Ok(v) => v,
            Err(e) => {
                self.pos = start;
                return Err(e);
            }
        };

        let end = content_start + len;
        self.pos = end;
        log::trace!("read {} ({} bytes) at offset {}", tag, len, start);

        Ok(Tlv {
            tag,
            content: &self.data[content_start..end],
            raw: &self.data[start..end],
        })
    }

    /// Reads a tag and a length without requiring the content to follow.
    ///
    /// The reader is left positioned on the first content byte.
    pub fn read_header(&mut self) -> Result<(Tag, usize)> {
        let start = self.pos;
        let tag = self.read_tag()?;
        match Length::decode_unbounded(self.data, self.pos, self.data.len()) {
            Ok((len, content_start)) => {
                self.pos = content_start;
                Ok((tag, len))
            }
            Err(e) => {
                self.pos = start;
                Err(e)
            }
        }
    }

    pub fn read_expected_header(&mut self, expected: Tag) -> Result<usize> {
        self.check_next(expected)?;
        let (_, len) = self.read_header()?;
        Ok(len)
    }

    fn check_next(&self, expected: Tag) -> Result<()> {
        let actual = self.peek_tag().ok_or(Asn1DerError::TruncatedData)?;
        if actual != expected {
            return Err(Asn1DerError::UnexpectedTag { expected, actual });
        }
        Ok(())
    }

    /// Reads an element with the given tag and returns its content octets.
    pub fn read_expected(&mut self, expected: Tag) -> Result<&'a [u8]> {
        self.check_next(expected)?;
        Ok(self.read_tlv()?.content)
    }

    /// Reads an element with the given tag and returns its whole encoding.
    pub fn read_expected_raw(&mut self, expected: Tag) -> Result<&'a [u8]> {
        self.check_next(expected)?;
        Ok(self.read_tlv()?.raw)
    }

    pub fn read_optional(&mut self, tag: Tag) -> Result<Option<&'a [u8]>> {
        if self.peek_is(tag) {
            self.read_expected(tag).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn read_sequence(&mut self) -> Result<Reader<'a>> {
        self.read_expected(Tag::SEQUENCE).map(Reader::new)
    }

    pub fn read_set(&mut self) -> Result<Reader<'a>> {
        self.read_expected(Tag::SET).map(Reader::new)
    }

    /// `[number]` constructed, explicit tagging or implicit tagging of a constructed type.
    pub fn read_context(&mut self, number: u8) -> Result<Reader<'a>> {
        self.read_expected(Tag::context_constructed(number)).map(Reader::new)
    }

    pub fn read_optional_context(&mut self, number: u8) -> Result<Option<Reader<'a>>> {
        Ok(self
            .read_optional(Tag::context_constructed(number))?
            .map(Reader::new))
    }

    /// `[number]` primitive, implicit tagging of a primitive type.
    pub fn read_context_primitive(&mut self, number: u8) -> Result<&'a [u8]> {
        self.read_expected(Tag::context_primitive(number))
    }

    pub fn read_oid(&mut self) -> Result<ObjectIdentifier> {
        let content = self.read_expected(Tag::OID)?;
        if !is_minimal_oid(content) {
            return Err(Asn1DerError::InvalidObjectIdentifier);
        }
        ObjectIdentifier::try_from(content).map_err(|_| Asn1DerError::InvalidObjectIdentifier)
    }

    /// INTEGER content octets, two's complement big endian.
    pub fn read_integer_bytes(&mut self) -> Result<&'a [u8]> {
        let content = self.read_expected(Tag::INTEGER)?;
        if content.is_empty() {
            return Err(Asn1DerError::InvalidInteger);
        }
        Ok(content)
    }

    /// Non-negative INTEGER that fits in an `u32`, used for version fields.
    pub fn read_small_integer(&mut self) -> Result<u32> {
        let content = self.read_integer_bytes()?;
        if content[0] & 0x80 != 0 {
            return Err(Asn1DerError::InvalidInteger);
        }

        let significant = match content.iter().position(|b| *b != 0) {
            Some(idx) => &content[idx..],
            None => return Ok(0),
        };

        if significant.len() > 4 {
            return Err(Asn1DerError::IntegerOverflow);
        }

        Ok(significant.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
    }

    pub fn read_octet_string(&mut self) -> Result<&'a [u8]> {
        self.read_expected(Tag::OCTET_STRING)
    }

    /// BIT STRING payload, only byte-aligned strings are accepted.
    pub fn read_bit_string(&mut self) -> Result<&'a [u8]> {
        let content = self.read_expected(Tag::BIT_STRING)?;
        match content.split_first() {
            Some((&0, payload)) => Ok(payload),
            Some(_) => Err(Asn1DerError::InvalidData {
                context: "bit string with unused bits",
            }),
            None => Err(Asn1DerError::TruncatedData),
        }
    }

    pub fn read_null(&mut self) -> Result<()> {
        let content = self.read_expected(Tag::NULL)?;
        if !content.is_empty() {
            return Err(Asn1DerError::InvalidData { context: "non-empty NULL" });
        }
        Ok(())
    }

    /// Raw encoding (tag, length and content) of the next element.
    pub fn read_any(&mut self) -> Result<&'a [u8]> {
        Ok(self.read_tlv()?.raw)
    }

    pub fn skip(&mut self) -> Result<()> {
        self.read_tlv().map(|_| ())
    }

    /// Fails when unread elements remain.
    pub fn finish(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Asn1DerError::InvalidData {
                context: "trailing data after element",
            })
        }
    }
}

/// Non empty, every subidentifier is terminated and has no leading 0x80 octet.
fn is_minimal_oid(content: &[u8]) -> bool {
    let mut subidentifier_start = true;
    for byte in content {
        if subidentifier_start && *byte == 0x80 {
            return false;
        }
        subidentifier_start = byte & 0x80 == 0;
    }
    !content.is_empty() && subidentifier_start
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn nested_sequence() {
        // SEQUENCE { INTEGER 3, OCTET STRING 01 02, SET { NULL } }
        let der = [0x30, 0x0B, 0x02, 0x01, 0x03, 0x04, 0x02, 0x01, 0x02, 0x31, 0x02, 0x05, 0x00];
        let mut reader = Reader::new(&der);
        let mut seq = reader.read_sequence().expect("sequence");
        assert!(reader.is_empty());

        assert_eq!(seq.read_small_integer().expect("integer"), 3);
        assert_eq!(seq.read_octet_string().expect("octet string"), &[0x01, 0x02]);
        let mut set = seq.read_set().expect("set");
        set.read_null().expect("null");
        set.finish().expect("set consumed");
        seq.finish().expect("sequence consumed");
    }

    #[test]
    fn inner_length_cannot_escape_outer_bound() {
        // outer SEQUENCE claims 3 bytes while the inner OCTET STRING claims 4
        let der = [0x30, 0x03, 0x04, 0x04, 0xAA, 0xBB, 0xCC, 0xDD];
        let mut reader = Reader::new(&der);
        let mut seq = reader.read_sequence().expect("sequence");
        assert_eq!(
            seq.read_octet_string(),
            Err(Asn1DerError::LengthOverflow { length: 4, available: 1 })
        );
    }

    #[test]
    fn unexpected_tag() {
        let der = [0x31, 0x00];
        let mut reader = Reader::new(&der);
        assert_eq!(
            reader.read_sequence().map(|_| ()),
            Err(Asn1DerError::UnexpectedTag {
                expected: Tag::SEQUENCE,
                actual: Tag::SET
            })
        );
        // position is unchanged on mismatch
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn truncated_input() {
        let mut reader = Reader::new(&[0x04]);
        assert_eq!(reader.read_octet_string(), Err(Asn1DerError::TruncatedData));
        let mut reader = Reader::new(&[]);
        assert_eq!(reader.read_oid(), Err(Asn1DerError::TruncatedData));
    }

    #[rstest]
    #[case(&[0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02], "1.2.840.113549.1.7.2")]
    #[case(&[0x06, 0x06, 0x2B, 0x81, 0x04, 0x01, 0x0B, 0x01], "1.3.132.1.11.1")]
    #[case(&[0x06, 0x03, 0x55, 0x1D, 0x0E], "2.5.29.14")]
    fn object_identifier(#[case] der: &[u8], #[case] dotted: &str) {
        let oid = Reader::new(der).read_oid().expect("oid");
        assert_eq!(Into::<String>::into(&oid), dotted);
        assert_eq!(crate::Node::oid(&oid).to_vec(), der.to_vec());
    }

    #[rstest]
    #[case(&[0x06, 0x00])]
    #[case(&[0x06, 0x02, 0x2A, 0x86])]
    #[case(&[0x06, 0x03, 0x2A, 0x80, 0x01])]
    fn malformed_object_identifier(#[case] der: &[u8]) {
        assert_eq!(
            Reader::new(der).read_oid(),
            Err(Asn1DerError::InvalidObjectIdentifier)
        );
    }

    #[test]
    fn indefinite_length_is_reported() {
        let mut reader = Reader::new(&[0x30, 0x80, 0x00, 0x00]);
        assert_eq!(
            reader.read_sequence().map(|_| ()),
            Err(Asn1DerError::IndefiniteLength)
        );
    }

    #[test]
    fn small_integer_bounds() {
        let mut reader = Reader::new(&[0x02, 0x02, 0x00, 0xFF]);
        assert_eq!(reader.read_small_integer(), Ok(255));

        let mut reader = Reader::new(&[0x02, 0x01, 0x80]);
        assert_eq!(reader.read_small_integer(), Err(Asn1DerError::InvalidInteger));

        let mut reader = Reader::new(&[0x02, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(reader.read_small_integer(), Err(Asn1DerError::IntegerOverflow));
    }

    #[test]
    fn header_without_content() {
        // OCTET STRING of 200 bytes with only the header available
        let data = [0x04, 0x81, 0xC8];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_header(), Ok((Tag::OCTET_STRING, 200)));
        assert!(reader.is_empty());
    }

    #[test]
    fn context_tags_and_raw() {
        let der = [0xA0, 0x03, 0x02, 0x01, 0x01, 0x80, 0x01, 0xFF];
        let mut reader = Reader::new(&der);
        assert!(reader.read_optional_context(1).expect("no [1]").is_none());
        let mut explicit = reader.read_context(0).expect("[0]");
        assert_eq!(explicit.read_any().expect("raw"), &[0x02, 0x01, 0x01]);
        assert_eq!(reader.read_context_primitive(0).expect("[0] primitive"), &[0xFF]);
        reader.finish().expect("consumed");
    }
}
