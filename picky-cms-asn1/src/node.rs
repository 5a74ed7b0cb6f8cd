use crate::error::{Asn1DerError, Result};
use crate::length::Length;
use crate::tag::Tag;
use oid::ObjectIdentifier;
use std::borrow::Cow;

const EMPTY: &[u8] = &[];

#[derive(Debug, Clone)]
enum Body<'a> {
    Bytes(Cow<'a, [u8]>),
    Children(Vec<Node<'a>>),
    /// content of this length is supplied by the caller outside of the encoding
    Detached,
}

/// Encodable DER element.
///
/// The content length is computed once when the node is built, children first, so the whole
/// size of a message is known before any byte is written.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    tag: Option<Tag>,
    body: Body<'a>,
    content_len: usize,
}

impl<'a> Node<'a> {
    /// Pre-encoded bytes emitted as is (certificates, names, attribute values...).
    pub fn raw(bytes: impl Into<Cow<'a, [u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            tag: None,
            content_len: bytes.len(),
            body: Body::Bytes(bytes),
        }
    }

    pub fn primitive(tag: Tag, content: impl Into<Cow<'a, [u8]>>) -> Self {
        let content = content.into();
        Self {
            tag: Some(tag),
            content_len: content.len(),
            body: Body::Bytes(content),
        }
    }

    pub fn constructed(tag: Tag, children: Vec<Node<'a>>) -> Self {
        Self {
            tag: Some(tag),
            content_len: children.iter().map(Node::encoded_len).sum(),
            body: Body::Children(children),
        }
    }

    /// Children emitted back to back without any header.
    pub fn concat(children: Vec<Node<'a>>) -> Self {
        Self {
            tag: None,
            content_len: children.iter().map(Node::encoded_len).sum(),
            body: Body::Children(children),
        }
    }

    /// Element whose content is left out of the encoding, see [`Node::encode_split`].
    pub fn detached(tag: Tag, content_len: usize) -> Self {
        Self {
            tag: Some(tag),
            content_len,
            body: Body::Detached,
        }
    }

    pub fn sequence(children: Vec<Node<'a>>) -> Self {
        Self::constructed(Tag::SEQUENCE, children)
    }

    pub fn set(children: Vec<Node<'a>>) -> Self {
        Self::constructed(Tag::SET, children)
    }

    /// `SET OF` with its elements sorted by encoding.
    pub fn set_of(mut children: Vec<Node<'a>>) -> Self {
        if children.len() > 1 {
            let mut keyed: Vec<(Vec<u8>, Node<'a>)> = children.drain(..).map(|c| (c.to_vec(), c)).collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            children = keyed.into_iter().map(|(_, c)| c).collect();
        }
        Self::set(children)
    }

    /// `[number]` constructed around the given children.
    pub fn context(number: u8, children: Vec<Node<'a>>) -> Self {
        Self::constructed(Tag::context_constructed(number), children)
    }

    pub fn explicit(number: u8, inner: Node<'a>) -> Self {
        Self::context(number, vec![inner])
    }

    pub fn context_primitive(number: u8, content: impl Into<Cow<'a, [u8]>>) -> Self {
        Self::primitive(Tag::context_primitive(number), content)
    }

    /// INTEGER from already encoded content octets (e.g. a certificate serial number).
    pub fn integer_raw(content: impl Into<Cow<'a, [u8]>>) -> Self {
        Self::primitive(Tag::INTEGER, content)
    }

    /// Non-negative INTEGER from big-endian magnitude bytes.
    pub fn unsigned_integer(magnitude: &[u8]) -> Self {
        let trimmed = match magnitude.iter().position(|b| *b != 0) {
            Some(idx) => &magnitude[idx..],
            None => EMPTY,
        };

        let mut content = Vec::with_capacity(trimmed.len() + 1);
        if trimmed.first().map_or(true, |b| b & 0x80 != 0) {
            content.push(0);
        }
        content.extend_from_slice(trimmed);

        Self::primitive(Tag::INTEGER, content)
    }

    pub fn small_integer(value: u32) -> Self {
        Self::unsigned_integer(&value.to_be_bytes())
    }

    pub fn oid(oid: &ObjectIdentifier) -> Self {
        Self::primitive(Tag::OID, Into::<Vec<u8>>::into(oid))
    }

    pub fn octet_string(content: impl Into<Cow<'a, [u8]>>) -> Self {
        Self::primitive(Tag::OCTET_STRING, content)
    }

    /// Byte-aligned BIT STRING.
    pub fn bit_string(payload: &[u8]) -> Self {
        let mut content = Vec::with_capacity(payload.len() + 1);
        content.push(0);
        content.extend_from_slice(payload);
        Self::primitive(Tag::BIT_STRING, content)
    }

    pub fn null() -> Self {
        Self::primitive(Tag::NULL, EMPTY)
    }

    pub fn tag(&self) -> Option<Tag> {
        self.tag
    }

    pub fn content_len(&self) -> usize {
        self.content_len
    }

    /// Total size of the encoding, header included.
    pub fn encoded_len(&self) -> usize {
        match self.tag {
            Some(_) => 1 + Length::encoded_len(self.content_len) + self.content_len,
            None => self.content_len,
        }
    }

    /// Content octets only, header excluded.
    pub fn content_to_vec(&self) -> Vec<u8> {
        let mut sink = VecSink::with_capacity(self.content_len);
        self.emit_content(&mut sink);
        sink.into_single()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut sink = VecSink::with_capacity(self.encoded_len());
        self.emit(&mut sink);
        sink.into_single()
    }

    /// Writes the encoding at the start of `out` and returns the number of bytes written.
    ///
    /// Nothing is written when `out` is too small.
    pub fn write_to_slice(&self, out: &mut [u8]) -> Result<usize> {
        let required = self.encoded_len();
        if out.len() < required {
            return Err(Asn1DerError::BufferTooSmall {
                required,
                available: out.len(),
            });
        }

        let mut sink = SliceSink { out, pos: 0 };
        self.emit(&mut sink);
        Ok(sink.pos)
    }

    /// Splits the encoding around the first detached node.
    ///
    /// Returns the bytes before the detached content and the bytes after it.
    pub fn encode_split(&self) -> (Vec<u8>, Vec<u8>) {
        let mut sink = VecSink::with_capacity(self.encoded_len());
        self.emit(&mut sink);
        let mut parts = sink.parts.into_iter();
        let header = parts.next().unwrap_or_default();
        let footer = parts.flatten().collect();
        (header, footer)
    }

    fn emit(&self, sink: &mut dyn Sink) {
        if let Some(tag) = self.tag {
            let mut header = Vec::with_capacity(1 + Length::encoded_len(self.content_len));
            header.push(tag.number());
            Length::encode_to(self.content_len, &mut header);
            sink.put(&header);
        }
        self.emit_content(sink);
    }

    fn emit_content(&self, sink: &mut dyn Sink) {
        match &self.body {
            Body::Bytes(bytes) => sink.put(bytes),
            Body::Children(children) => children.iter().for_each(|child| child.emit(sink)),
            Body::Detached => sink.detach(),
        }
    }
}

trait Sink {
    fn put(&mut self, bytes: &[u8]);
    fn detach(&mut self);
}

struct VecSink {
    parts: Vec<Vec<u8>>,
}

impl VecSink {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            parts: vec![Vec::with_capacity(capacity)],
        }
    }

    fn into_single(self) -> Vec<u8> {
        self.parts.into_iter().flatten().collect()
    }
}

impl Sink for VecSink {
    fn put(&mut self, bytes: &[u8]) {
        if let Some(current) = self.parts.last_mut() {
            current.extend_from_slice(bytes);
        }
    }

    fn detach(&mut self) {
        self.parts.push(Vec::new());
    }
}

// Capacity is checked once up front against the precomputed size.
struct SliceSink<'b> {
    out: &'b mut [u8],
    pos: usize,
}

impl Sink for SliceSink<'_> {
    fn put(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        if let Some(dst) = self.out.get_mut(self.pos..end) {
            dst.copy_from_slice(bytes);
            self.pos = end;
        }
    }

    fn detach(&mut self) {}
}
