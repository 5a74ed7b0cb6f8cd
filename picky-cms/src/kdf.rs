//! Key derivation and key wrapping used by key agreement recipients.

use crate::algorithm::{AlgorithmIdentifier, KeyWrapAlgorithm};
use crate::error::CmsError;
use crate::hash::HashAlgorithm;
use aes::cipher::generic_array::GenericArray;
use picky_cms_asn1::Node;
use zeroize::Zeroizing;

/// DER encoded `ECC-CMS-SharedInfo` (RFC 5753).
///
/// ```text
/// ECC-CMS-SharedInfo ::= SEQUENCE {
///     keyInfo         AlgorithmIdentifier,
///     entityUInfo [0] EXPLICIT OCTET STRING OPTIONAL,
///     suppPubInfo [2] EXPLICIT OCTET STRING }
/// ```
pub(crate) fn ecc_cms_shared_info(wrap: KeyWrapAlgorithm, ukm: Option<&[u8]>) -> Vec<u8> {
    let key_info = AlgorithmIdentifier::new_without_parameters(wrap.to_oid());
    let kek_bits = (wrap.kek_size() as u32 * 8).to_be_bytes();

    let mut fields = vec![key_info.to_node()];
    if let Some(ukm) = ukm {
        fields.push(Node::explicit(0, Node::octet_string(ukm)));
    }
    fields.push(Node::explicit(2, Node::octet_string(&kek_bits[..])));

    Node::sequence(fields).to_vec()
}

/// ANSI X9.63 key derivation: `H(Z || counter || sharedInfo)` blocks with a big-endian counter starting at 1.
pub(crate) fn x963_kdf(hash: HashAlgorithm, shared_secret: &[u8], shared_info: &[u8], len: usize) -> Zeroizing<Vec<u8>> {
    let mut output = Zeroizing::new(Vec::with_capacity(len + hash.output_size()));
    let mut counter: u32 = 1;

    while output.len() < len {
        let counter_bytes = counter.to_be_bytes();
        let block = Zeroizing::new(hash.digest_parts(&[shared_secret, &counter_bytes, shared_info]));
        output.extend_from_slice(&block);
        counter = counter.wrapping_add(1);
    }

    output.truncate(len);
    output
}

fn check_kek(wrap: KeyWrapAlgorithm, kek: &[u8]) -> Result<(), CmsError> {
    if kek.len() != wrap.kek_size() {
        return Err(CmsError::invalid_argument(format!(
            "{:?} requires a {} bytes KEK, got {}",
            wrap,
            wrap.kek_size(),
            kek.len()
        )));
    }
    Ok(())
}

/// RFC 3394 AES key wrap.
pub(crate) fn wrap_key(wrap: KeyWrapAlgorithm, kek: &[u8], key: &[u8]) -> Result<Vec<u8>, CmsError> {
    check_kek(wrap, kek)?;

    let wrapped = match wrap {
        KeyWrapAlgorithm::Aes128Wrap => aes_kw::KekAes128::new(GenericArray::from_slice(kek)).wrap_vec(key)?,
        KeyWrapAlgorithm::Aes192Wrap => aes_kw::KekAes192::new(GenericArray::from_slice(kek)).wrap_vec(key)?,
        KeyWrapAlgorithm::Aes256Wrap => aes_kw::KekAes256::new(GenericArray::from_slice(kek)).wrap_vec(key)?,
    };

    Ok(wrapped)
}

/// RFC 3394 AES key unwrap, fails with [`CmsError::KeyWrap`] when the integrity check doesn't pass.
pub(crate) fn unwrap_key(wrap: KeyWrapAlgorithm, kek: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>, CmsError> {
    check_kek(wrap, kek)?;

    let key = match wrap {
        KeyWrapAlgorithm::Aes128Wrap => aes_kw::KekAes128::new(GenericArray::from_slice(kek)).unwrap_vec(wrapped)?,
        KeyWrapAlgorithm::Aes192Wrap => aes_kw::KekAes192::new(GenericArray::from_slice(kek)).unwrap_vec(wrapped)?,
        KeyWrapAlgorithm::Aes256Wrap => aes_kw::KekAes256::new(GenericArray::from_slice(kek)).unwrap_vec(wrapped)?,
    };

    Ok(Zeroizing::new(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn shared_info_encoding() {
        let info = ecc_cms_shared_info(KeyWrapAlgorithm::Aes128Wrap, None);
        assert_eq!(hex::encode(&info), "3015300b0609608648016503040105a206040400000080");

        let info = ecc_cms_shared_info(KeyWrapAlgorithm::Aes256Wrap, Some(&[0xAA, 0xBB]));
        assert_eq!(
            hex::encode(&info),
            "301b300b060960864801650304012da0040402aabba206040400000100"
        );
    }

    #[test]
    fn x963_sha256_single_block() {
        let z: Vec<u8> = (0..32).collect();
        let info = ecc_cms_shared_info(KeyWrapAlgorithm::Aes128Wrap, None);
        let kek = x963_kdf(HashAlgorithm::SHA2_256, &z, &info, 16);
        assert_eq!(hex::encode(&*kek), "1983cc4d05d34db303458415c914b607");
    }

    #[test]
    fn x963_sha1_multiple_blocks() {
        let z: Vec<u8> = (0..32).collect();
        let key = x963_kdf(HashAlgorithm::SHA1, &z, &[], 48);
        assert_eq!(
            hex::encode(&*key),
            "a98ffb7caef3bd518fb7bc1b6cc89dbdef59cde6e6b6e6b5e405eb5e6ffb080c390c2cd82363d25a79fcf567c36336e9"
        );
    }

    // RFC 3394 section 4.1
    #[test]
    fn aes128_key_wrap_vector() {
        let kek = hex::decode("000102030405060708090A0B0C0D0E0F").expect("hex");
        let key = hex::decode("00112233445566778899AABBCCDDEEFF").expect("hex");

        let wrapped = wrap_key(KeyWrapAlgorithm::Aes128Wrap, &kek, &key).expect("wrap");
        assert_eq!(hex::encode_upper(&wrapped), "1FA68B0A8112B447AEF34BD8FB5A7B829D3E862371D2CFE5");

        let unwrapped = unwrap_key(KeyWrapAlgorithm::Aes128Wrap, &kek, &wrapped).expect("unwrap");
        assert_eq!(*unwrapped, key);
    }

    #[test]
    fn tampered_wrapped_key() {
        let kek = [0x11; 32];
        let mut wrapped = wrap_key(KeyWrapAlgorithm::Aes256Wrap, &kek, &[0x22; 32]).expect("wrap");
        wrapped[3] ^= 0x01;
        assert!(matches!(
            unwrap_key(KeyWrapAlgorithm::Aes256Wrap, &kek, &wrapped),
            Err(CmsError::KeyWrap)
        ));
    }

    #[test]
    fn kek_size_is_checked() {
        assert!(matches!(
            wrap_key(KeyWrapAlgorithm::Aes192Wrap, &[0; 16], &[0; 16]),
            Err(CmsError::InvalidArgument { .. })
        ));
    }
}
