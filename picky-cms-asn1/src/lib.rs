//! # picky-cms-asn1
//!
//! Minimal ASN.1 DER toolkit backing `picky-cms`.
//!
//! - [`Reader`] walks attacker-controlled DER and never reads past the bound of the element it was created for.
//! - [`Node`] is an encodable tree: sizes are computed bottom-up when the tree is built, bytes are emitted in a
//!   single top-down pass, into a `Vec` or into a caller supplied slice.
//! - [`ber::to_der`] normalizes indefinite-length BER input so that the DER reader can process it.

pub mod ber;
pub mod error;
pub mod length;
pub mod node;
pub mod reader;
pub mod tag;

pub use error::{Asn1DerError, Result};
pub use length::Length;
pub use node::Node;
pub use oid::ObjectIdentifier;
pub use reader::{Reader, Tlv};
pub use tag::Tag;
