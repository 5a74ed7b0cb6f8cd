//! OIDs used by CMS structures and the algorithms they reference

use picky_cms_asn1::ObjectIdentifier;

macro_rules! define_oid {
    ($uppercase:ident => $lowercase:ident => $str_value:literal) => {
        pub const $uppercase: &str = $str_value;

        pub fn $lowercase() -> ObjectIdentifier {
            // every literal below is parsed by `dotted_form_round_trips`
            ObjectIdentifier::try_from($uppercase).expect("well-formed OID literal")
        }
    };
    ( $( $uppercase:ident => $lowercase:ident => $str_value:literal, )+ ) => {
        $( define_oid! { $uppercase => $lowercase => $str_value } )+
    };
}

define_oid! {
    // PKCS#7 / CMS content types
    DATA => data => "1.2.840.113549.1.7.1",
    SIGNED_DATA => signed_data => "1.2.840.113549.1.7.2",
    ENVELOPED_DATA => enveloped_data => "1.2.840.113549.1.7.3",
    ENCRYPTED_DATA => encrypted_data => "1.2.840.113549.1.7.6",
    COMPRESSED_DATA => compressed_data => "1.2.840.113549.1.9.16.1.9",
    FIRMWARE_PKG_DATA => firmware_pkg_data => "1.2.840.113549.1.9.16.1.16",

    // PKCS#9 attributes
    CONTENT_TYPE => content_type => "1.2.840.113549.1.9.3",
    MESSAGE_DIGEST => message_digest => "1.2.840.113549.1.9.4",
    SIGNING_TIME => signing_time => "1.2.840.113549.1.9.5",
    SMIME_CAPABILITIES => smime_capabilities => "1.2.840.113549.1.9.15",

    // hash algorithms
    SHA1 => sha1 => "1.3.14.3.2.26",
    SHA224 => sha224 => "2.16.840.1.101.3.4.2.4",
    SHA256 => sha256 => "2.16.840.1.101.3.4.2.1",
    SHA384 => sha384 => "2.16.840.1.101.3.4.2.2",
    SHA512 => sha512 => "2.16.840.1.101.3.4.2.3",

    // RSADSI
    RSA_ENCRYPTION => rsa_encryption => "1.2.840.113549.1.1.1",
    SHA1_WITH_RSA_ENCRYPTION => sha1_with_rsa_encryption => "1.2.840.113549.1.1.5",
    SHA256_WITH_RSA_ENCRYPTION => sha256_with_rsa_encryption => "1.2.840.113549.1.1.11",
    SHA384_WITH_RSA_ENCRYPTION => sha384_with_rsa_encryption => "1.2.840.113549.1.1.12",
    SHA512_WITH_RSA_ENCRYPTION => sha512_with_rsa_encryption => "1.2.840.113549.1.1.13",
    SHA224_WITH_RSA_ENCRYPTION => sha224_with_rsa_encryption => "1.2.840.113549.1.1.14",

    // ANSI-X962
    EC_PUBLIC_KEY => ec_public_key => "1.2.840.10045.2.1",
    ECDSA_WITH_SHA1 => ecdsa_with_sha1 => "1.2.840.10045.4.1",
    ECDSA_WITH_SHA224 => ecdsa_with_sha224 => "1.2.840.10045.4.3.1",
    ECDSA_WITH_SHA256 => ecdsa_with_sha256 => "1.2.840.10045.4.3.2",
    ECDSA_WITH_SHA384 => ecdsa_with_sha384 => "1.2.840.10045.4.3.3",
    ECDSA_WITH_SHA512 => ecdsa_with_sha512 => "1.2.840.10045.4.3.4",
    SECP256R1 => secp256r1 => "1.2.840.10045.3.1.7",

    // Certicom
    SECP384R1 => secp384r1 => "1.3.132.0.34",
    DH_SINGLE_PASS_STD_DH_SHA224KDF_SCHEME => dh_single_pass_std_dh_sha224kdf_scheme => "1.3.132.1.11.0",
    DH_SINGLE_PASS_STD_DH_SHA256KDF_SCHEME => dh_single_pass_std_dh_sha256kdf_scheme => "1.3.132.1.11.1",
    DH_SINGLE_PASS_STD_DH_SHA384KDF_SCHEME => dh_single_pass_std_dh_sha384kdf_scheme => "1.3.132.1.11.2",
    DH_SINGLE_PASS_STD_DH_SHA512KDF_SCHEME => dh_single_pass_std_dh_sha512kdf_scheme => "1.3.132.1.11.3",

    // X9-63
    DH_SINGLE_PASS_STD_DH_SHA1KDF_SCHEME => dh_single_pass_std_dh_sha1kdf_scheme => "1.3.133.16.840.63.0.2",

    // NIST AES
    AES128_CBC => aes128_cbc => "2.16.840.1.101.3.4.1.2",
    AES128_WRAP => aes128_wrap => "2.16.840.1.101.3.4.1.5",
    AES192_CBC => aes192_cbc => "2.16.840.1.101.3.4.1.22",
    AES192_WRAP => aes192_wrap => "2.16.840.1.101.3.4.1.25",
    AES256_CBC => aes256_cbc => "2.16.840.1.101.3.4.1.42",
    AES256_WRAP => aes256_wrap => "2.16.840.1.101.3.4.1.45",

    // DES
    DES_CBC => des_cbc => "1.3.14.3.2.7",
    DES_EDE3_CBC => des_ede3_cbc => "1.2.840.113549.3.7",

    // S/MIME algorithms
    ZLIB_COMPRESS => zlib_compress => "1.2.840.113549.1.9.16.3.8",

    // certificate extensions
    SUBJECT_KEY_IDENTIFIER => subject_key_identifier => "2.5.29.14",
}

#[cfg(test)]
mod tests {
    use super::*;
    use picky_cms_asn1::Node;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(DATA, data())]
    #[case(SIGNED_DATA, signed_data())]
    #[case(ENVELOPED_DATA, enveloped_data())]
    #[case(ENCRYPTED_DATA, encrypted_data())]
    #[case(COMPRESSED_DATA, compressed_data())]
    #[case(FIRMWARE_PKG_DATA, firmware_pkg_data())]
    #[case(CONTENT_TYPE, content_type())]
    #[case(MESSAGE_DIGEST, message_digest())]
    #[case(SIGNING_TIME, signing_time())]
    #[case(SMIME_CAPABILITIES, smime_capabilities())]
    #[case(SHA1, sha1())]
    #[case(SHA224, sha224())]
    #[case(SHA256, sha256())]
    #[case(SHA384, sha384())]
    #[case(SHA512, sha512())]
    #[case(RSA_ENCRYPTION, rsa_encryption())]
    #[case(SHA1_WITH_RSA_ENCRYPTION, sha1_with_rsa_encryption())]
    #[case(SHA256_WITH_RSA_ENCRYPTION, sha256_with_rsa_encryption())]
    #[case(SHA384_WITH_RSA_ENCRYPTION, sha384_with_rsa_encryption())]
    #[case(SHA512_WITH_RSA_ENCRYPTION, sha512_with_rsa_encryption())]
    #[case(SHA224_WITH_RSA_ENCRYPTION, sha224_with_rsa_encryption())]
    #[case(EC_PUBLIC_KEY, ec_public_key())]
    #[case(ECDSA_WITH_SHA1, ecdsa_with_sha1())]
    #[case(ECDSA_WITH_SHA224, ecdsa_with_sha224())]
    #[case(ECDSA_WITH_SHA256, ecdsa_with_sha256())]
    #[case(ECDSA_WITH_SHA384, ecdsa_with_sha384())]
    #[case(ECDSA_WITH_SHA512, ecdsa_with_sha512())]
    #[case(SECP256R1, secp256r1())]
    #[case(SECP384R1, secp384r1())]
    #[case(DH_SINGLE_PASS_STD_DH_SHA224KDF_SCHEME, dh_single_pass_std_dh_sha224kdf_scheme())]
    #[case(DH_SINGLE_PASS_STD_DH_SHA256KDF_SCHEME, dh_single_pass_std_dh_sha256kdf_scheme())]
    #[case(DH_SINGLE_PASS_STD_DH_SHA384KDF_SCHEME, dh_single_pass_std_dh_sha384kdf_scheme())]
    #[case(DH_SINGLE_PASS_STD_DH_SHA512KDF_SCHEME, dh_single_pass_std_dh_sha512kdf_scheme())]
    #[case(DH_SINGLE_PASS_STD_DH_SHA1KDF_SCHEME, dh_single_pass_std_dh_sha1kdf_scheme())]
    #[case(AES128_CBC, aes128_cbc())]
    #[case(AES128_WRAP, aes128_wrap())]
    #[case(AES192_CBC, aes192_cbc())]
    #[case(AES192_WRAP, aes192_wrap())]
    #[case(AES256_CBC, aes256_cbc())]
    #[case(AES256_WRAP, aes256_wrap())]
    #[case(DES_CBC, des_cbc())]
    #[case(DES_EDE3_CBC, des_ede3_cbc())]
    #[case(ZLIB_COMPRESS, zlib_compress())]
    #[case(SUBJECT_KEY_IDENTIFIER, subject_key_identifier())]
    fn dotted_form_round_trips(#[case] dotted: &str, #[case] oid: ObjectIdentifier) {
        assert_eq!(Into::<String>::into(&oid), dotted);
        let encoded = Node::oid(&oid).to_vec();
        assert_eq!(
            picky_cms_asn1::Reader::new(&encoded).read_oid().expect("decode"),
            oid
        );
    }

    #[test]
    fn der_encoding() {
        assert_eq!(
            Node::oid(&signed_data()).to_vec(),
            vec![0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02]
        );
        assert_eq!(
            Node::oid(&dh_single_pass_std_dh_sha1kdf_scheme()).to_vec(),
            vec![0x06, 0x09, 0x2B, 0x81, 0x05, 0x10, 0x86, 0x48, 0x3F, 0x00, 0x02]
        );
    }
}
