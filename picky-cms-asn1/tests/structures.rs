//! Codec behavior on CMS-shaped structures.

use picky_cms_asn1::{ber, Asn1DerError, Node, ObjectIdentifier, Reader, Tag};
use pretty_assertions::assert_eq;
use std::convert::TryFrom;

fn oid(dotted: &str) -> ObjectIdentifier {
    ObjectIdentifier::try_from(dotted).expect("valid oid")
}

#[test]
fn algorithm_identifier_with_iv() {
    let iv = [0x11u8; 16];
    let node = Node::sequence(vec![Node::oid(&oid("2.16.840.1.101.3.4.1.2")), Node::octet_string(&iv[..])]);
    let der = node.to_vec();

    assert_eq!(
        der[..13].to_vec(),
        vec![0x30, 0x1D, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x01, 0x02]
    );

    let mut reader = Reader::new(&der);
    let mut seq = reader.read_sequence().expect("sequence");
    assert_eq!(seq.read_oid().expect("oid"), oid("2.16.840.1.101.3.4.1.2"));
    assert_eq!(seq.read_octet_string().expect("iv"), &iv[..]);
    seq.finish().expect("consumed");
}

#[test]
fn ber_message_reads_after_normalization() {
    // ContentInfo(inf) { OID data, [0](inf) { OCTET STRING(inf) { "he", "llo" } } }
    let mut ber = vec![0x30, 0x80];
    ber.extend_from_slice(&Node::oid(&oid("1.2.840.113549.1.7.1")).to_vec());
    ber.extend_from_slice(&[0xA0, 0x80, 0x24, 0x80]);
    ber.extend_from_slice(&[0x04, 0x02, b'h', b'e', 0x04, 0x03, b'l', b'l', b'o']);
    ber.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    let mut reader = Reader::new(&ber);
    assert_eq!(reader.read_sequence().map(|_| ()), Err(Asn1DerError::IndefiniteLength));

    let der = ber::to_der(&ber).expect("normalize");
    let mut reader = Reader::new(&der);
    let mut content_info = reader.read_sequence().expect("content info");
    assert_eq!(content_info.read_oid().expect("oid"), oid("1.2.840.113549.1.7.1"));
    let mut explicit = content_info.read_context(0).expect("[0]");
    assert_eq!(explicit.read_octet_string().expect("content"), b"hello");
}

#[test]
fn detached_header_is_readable_without_content() {
    let node = Node::sequence(vec![
        Node::small_integer(1),
        Node::explicit(0, Node::detached(Tag::OCTET_STRING, 1024)),
    ]);
    let (header, footer) = node.encode_split();
    assert!(footer.is_empty());

    let mut reader = Reader::new(&header);
    let outer = reader.read_expected_header(Tag::SEQUENCE).expect("sequence header");
    assert_eq!(outer, node.content_len());
    assert_eq!(reader.read_small_integer().expect("version"), 1);
    reader.read_expected_header(Tag::CTX_0).expect("[0] header");
    assert_eq!(reader.read_expected_header(Tag::OCTET_STRING).expect("content header"), 1024);
    assert!(reader.is_empty());
}
