//! CompressedData (RFC 3274).
//!
//! ```text
//! CompressedData ::= SEQUENCE {
//!     version CMSVersion,
//!     compressionAlgorithm CompressionAlgorithmIdentifier,
//!     encapContentInfo EncapsulatedContentInfo }
//! ```

use crate::algorithm::{AlgorithmIdentifier, CompressionAlgorithm};
use crate::config::CmsContext;
use crate::content_info::{decode_ber, read_content_info, read_octet_string_content, wrap};
use crate::error::CmsError;
use crate::oids;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use picky_cms_asn1::{Node, ObjectIdentifier};
use std::io::{Read, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressedContent {
    pub content_type: ObjectIdentifier,
    pub content: Vec<u8>,
}

fn compress(content: &[u8]) -> Result<Vec<u8>, CmsError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    Ok(encoder.finish()?)
}

fn decompress(compressed: &[u8], limit: usize) -> Result<Vec<u8>, CmsError> {
    let mut decompressed = Vec::new();
    // one byte past the limit tells an exact fit from an overflow
    let limit_plus_one = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    ZlibDecoder::new(compressed)
        .take(limit_plus_one)
        .read_to_end(&mut decompressed)?;

    if decompressed.len() > limit {
        return Err(CmsError::DecompressionLimit { limit });
    }

    Ok(decompressed)
}

impl CmsContext {
    /// Compresses `content` with zlib.
    pub fn encode_compressed_data(&self, content: &[u8]) -> Result<Vec<u8>, CmsError> {
        let compressed = compress(content)?;
        log::debug!("compressed {} bytes into {}", content.len(), compressed.len());

        let compressed_data = Node::sequence(vec![
            Node::small_integer(0),
            AlgorithmIdentifier::new_without_parameters(CompressionAlgorithm::Zlib.to_oid()).into_node(),
            Node::sequence(vec![
                Node::oid(&self.content_type),
                Node::explicit(0, Node::octet_string(compressed)),
            ]),
        ]);

        Ok(wrap(&oids::compressed_data(), compressed_data).to_vec())
    }

    /// Decompresses the content, up to the configured decompression limit.
    pub fn decode_compressed_data(&self, input: &[u8]) -> Result<DecompressedContent, CmsError> {
        decode_ber(input, |input| {
            let mut content = read_content_info(input, oids::COMPRESSED_DATA)?;
            let mut compressed_data = content.read_sequence()?;
            content.finish()?;

            let version = compressed_data.read_small_integer()?;
            if version != 0 {
                return Err(CmsError::Version {
                    structure: "CompressedData",
                    version,
                });
            }

            let algorithm = AlgorithmIdentifier::decode(&mut compressed_data)?;
            CompressionAlgorithm::from_oid(algorithm.oid())?;

            let mut encap = compressed_data.read_sequence()?;
            let content_type = encap.read_oid()?;
            let mut explicit = encap.read_context(0)?;
            let compressed = read_octet_string_content(&mut explicit)?;
            explicit.finish()?;
            encap.finish()?;
            compressed_data.finish()?;

            Ok(DecompressedContent {
                content_type,
                content: decompress(&compressed, self.decompression_limit)?,
            })
        })
    }
}
