//! BER to DER normalization.
//!
//! Toolkits streaming their output (OpenSSL `-stream`, most S/MIME agents) emit indefinite lengths and
//! split OCTET STRINGs into fragments. The normalized output only uses definite minimal lengths and
//! merges constructed OCTET STRINGs into a single primitive one. Every constructed element is
//! normalized recursively, context-specific ones included, whatever the framing of the parent.

use crate::error::{Asn1DerError, Result};
use crate::length::Length;
use crate::node::Node;
use crate::tag::Tag;

const MAX_DEPTH: usize = 64;

enum Element<'a> {
    Primitive { tag: Tag, content: &'a [u8] },
    Constructed { tag: Tag, children: Vec<Element<'a>> },
}

/// Converts the first element of `input` to DER.
pub fn to_der(input: &[u8]) -> Result<Vec<u8>> {
    let (element, end) = parse_element(input, 0, input.len(), 0)?;
    log::debug!("normalized BER element of {} bytes", end);
    Ok(into_node(element)?.to_vec())
}

fn parse_element(data: &[u8], pos: usize, max: usize, depth: usize) -> Result<(Element<'_>, usize)> {
    if depth > MAX_DEPTH {
        return Err(Asn1DerError::InvalidData {
            context: "BER nesting too deep",
        });
    }

    let tag = Tag::from(*data.get(pos).filter(|_| pos < max).ok_or(Asn1DerError::TruncatedData)?);
    if tag.is_high_tag_number() {
        return Err(Asn1DerError::UnsupportedTag(tag));
    }

    match Length::decode_lenient(data, pos + 1, max) {
        Ok((len, start)) => {
            let end = start + len;
            if tag.is_constructed() {
                let mut children = Vec::new();
                let mut cursor = start;
                while cursor < end {
                    let (child, next) = parse_element(data, cursor, end, depth + 1)?;
                    children.push(child);
                    cursor = next;
                }
                Ok((Element::Constructed { tag, children }, end))
            } else {
                Ok((
                    Element::Primitive {
                        tag,
                        content: &data[start..end],
                    },
                    end,
                ))
            }
        }
        Err(Asn1DerError::IndefiniteLength) => {
            if !tag.is_constructed() {
                return Err(Asn1DerError::InvalidData {
                    context: "indefinite length on a primitive element",
                });
            }

            let mut children = Vec::new();
            let mut cursor = pos + 2;
            loop {
                if cursor >= max {
                    return Err(Asn1DerError::TruncatedData);
                }

                if data.get(cursor..cursor + 2) == Some(&[0x00, 0x00][..]) && cursor + 2 <= max {
                    cursor += 2;
                    break;
                }

                let (child, next) = parse_element(data, cursor, max, depth + 1)?;
                children.push(child);
                cursor = next;
            }

            Ok((Element::Constructed { tag, children }, cursor))
        }
        Err(e) => Err(e),
    }
}

fn into_node(element: Element<'_>) -> Result<Node<'_>> {
    match element {
        Element::Primitive { tag, content } => Ok(Node::primitive(tag, content)),
        Element::Constructed {
            tag: Tag::OCTET_STRING_CONSTRUCTED,
            children,
        } => {
            let mut content = Vec::new();
            collect_fragments(&children, &mut content)?;
            Ok(Node::octet_string(content))
        }
        Element::Constructed { tag, children } => {
            let children = children.into_iter().map(into_node).collect::<Result<Vec<_>>>()?;
            Ok(Node::constructed(tag, children))
        }
    }
}

fn collect_fragments(children: &[Element<'_>], out: &mut Vec<u8>) -> Result<()> {
    for child in children {
        match child {
            Element::Primitive {
                tag: Tag::OCTET_STRING,
                content,
            } => out.extend_from_slice(content),
            Element::Constructed {
                tag: Tag::OCTET_STRING_CONSTRUCTED,
                children,
            } => collect_fragments(children, out)?,
            _ => {
                return Err(Asn1DerError::InvalidData {
                    context: "constructed OCTET STRING with a non OCTET STRING fragment",
                })
            }
        }
    }
    Ok(())
}
