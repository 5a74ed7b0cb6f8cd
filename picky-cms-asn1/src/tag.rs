use std::fmt;

const CONSTRUCTED_BIT: u8 = 0x20;
const CONTEXT_CLASS: u8 = 0x80;
const CLASS_MASK: u8 = 0xC0;
const HIGH_TAG_NUMBER: u8 = 0x1F;

/// Single-byte identifier octet.
///
/// Multi-byte (high tag number) identifiers never appear in CMS and are rejected by the reader.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Tag(u8);

impl Tag {
    pub const BOOLEAN: Self = Tag(0x01);
    pub const INTEGER: Self = Tag(0x02);
    pub const BIT_STRING: Self = Tag(0x03);
    pub const OCTET_STRING: Self = Tag(0x04);
    pub const NULL: Self = Tag(0x05);
    pub const OID: Self = Tag(0x06);
    pub const UTF8_STRING: Self = Tag(0x0C);
    pub const PRINTABLE_STRING: Self = Tag(0x13);
    pub const IA5_STRING: Self = Tag(0x16);
    pub const UTC_TIME: Self = Tag(0x17);
    pub const GENERALIZED_TIME: Self = Tag(0x18);
    pub const SEQUENCE: Self = Tag(0x30);
    pub const SET: Self = Tag(0x31);
    pub const OCTET_STRING_CONSTRUCTED: Self = Tag(0x24);
    pub const END_OF_CONTENTS: Self = Tag(0x00);

    pub const CTX_0: Self = Tag::context_constructed(0);
    pub const CTX_1: Self = Tag::context_constructed(1);
    pub const CTX_2: Self = Tag::context_constructed(2);
    pub const CTX_3: Self = Tag::context_constructed(3);
    pub const CTX_PRIMITIVE_0: Self = Tag::context_primitive(0);
    pub const CTX_PRIMITIVE_1: Self = Tag::context_primitive(1);
    pub const CTX_PRIMITIVE_2: Self = Tag::context_primitive(2);

    #[inline]
    pub const fn context_constructed(number: u8) -> Self {
        Tag(CONTEXT_CLASS | CONSTRUCTED_BIT | number)
    }

    #[inline]
    pub const fn context_primitive(number: u8) -> Self {
        Tag(CONTEXT_CLASS | number)
    }

    #[inline]
    pub const fn number(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_constructed(self) -> bool {
        self.0 & CONSTRUCTED_BIT != 0
    }

    #[inline]
    pub const fn is_context_specific(self) -> bool {
        self.0 & CLASS_MASK == CONTEXT_CLASS
    }

    /// Tag number without class and form bits.
    #[inline]
    pub const fn tag_number(self) -> u8 {
        self.0 & HIGH_TAG_NUMBER
    }

    #[inline]
    pub const fn is_high_tag_number(self) -> bool {
        self.0 & HIGH_TAG_NUMBER == HIGH_TAG_NUMBER
    }

    /// Same class and number with the constructed bit cleared.
    #[inline]
    pub const fn primitive_form(self) -> Self {
        Tag(self.0 & !CONSTRUCTED_BIT)
    }
}

impl From<u8> for Tag {
    fn from(tag: u8) -> Self {
        Self(tag)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Tag::BOOLEAN => write!(f, "BOOLEAN"),
            Tag::INTEGER => write!(f, "INTEGER"),
            Tag::BIT_STRING => write!(f, "BIT STRING"),
            Tag::OCTET_STRING => write!(f, "OCTET STRING"),
            Tag::OCTET_STRING_CONSTRUCTED => write!(f, "OCTET STRING (constructed)"),
            Tag::NULL => write!(f, "NULL"),
            Tag::OID => write!(f, "OBJECT IDENTIFIER"),
            Tag::UTF8_STRING => write!(f, "UTF8String"),
            Tag::PRINTABLE_STRING => write!(f, "PrintableString"),
            Tag::IA5_STRING => write!(f, "IA5String"),
            Tag::UTC_TIME => write!(f, "UTCTime"),
            Tag::GENERALIZED_TIME => write!(f, "GeneralizedTime"),
            Tag::SEQUENCE => write!(f, "SEQUENCE"),
            Tag::SET => write!(f, "SET"),
            Tag::END_OF_CONTENTS => write!(f, "END-OF-CONTENTS"),
            other if other.is_context_specific() && other.is_constructed() => {
                write!(f, "[{}] (constructed)", other.tag_number())
            }
            other if other.is_context_specific() => write!(f, "[{}]", other.tag_number()),
            other => write!(f, "0x{:02X}", other.0),
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tag({}, 0x{:02X})", self, self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Tag::CTX_0, 0xA0)]
    #[case(Tag::CTX_1, 0xA1)]
    #[case(Tag::CTX_PRIMITIVE_0, 0x80)]
    #[case(Tag::CTX_PRIMITIVE_2, 0x82)]
    fn context_tags(#[case] tag: Tag, #[case] expected: u8) {
        assert_eq!(tag.number(), expected);
        assert!(tag.is_context_specific());
    }

    #[test]
    fn forms() {
        assert!(Tag::SEQUENCE.is_constructed());
        assert!(!Tag::OCTET_STRING.is_constructed());
        assert_eq!(Tag::OCTET_STRING_CONSTRUCTED.primitive_form(), Tag::OCTET_STRING);
        assert!(!Tag::SET.is_context_specific());
        assert!(Tag::from(0x1F).is_high_tag_number());
    }

    #[test]
    fn display() {
        assert_eq!(Tag::SET.to_string(), "SET");
        assert_eq!(Tag::CTX_1.to_string(), "[1] (constructed)");
        assert_eq!(Tag::CTX_PRIMITIVE_0.to_string(), "[0]");
        assert_eq!(Tag::from(0x42).to_string(), "0x42");
    }
}
