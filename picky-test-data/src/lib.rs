//! Test data shared between the picky CMS crates.
//!
//! Keys and certificates were generated with OpenSSL 3.0, CMS messages with `openssl cms`.
//! All certificates are self-signed, carry a subject key identifier and are valid until 2126.

// === private keys === //

pub const RSA_2048_PK_1: &str = include_str!("../test_assets/private_keys/rsa-2048-pk_1.key");
pub const RSA_2048_PK_2: &str = include_str!("../test_assets/private_keys/rsa-2048-pk_2.key");

// openssl rsa -in rsa-2048-pk_1.key -traditional -out rsa-2048-pkcs1-pk_1.key
pub const RSA_2048_PKCS1_PK_1: &str = include_str!("../test_assets/private_keys/rsa-2048-pkcs1-pk_1.key");

pub const EC_NIST256_PK_1: &str = include_str!("../test_assets/private_keys/ec-nist256-pk_1.key");

// openssl ec -in ec-nist256-pk_1.key -out ec-nist256-sec1-pk_1.key
pub const EC_NIST256_SEC1_PK_1: &str = include_str!("../test_assets/private_keys/ec-nist256-sec1-pk_1.key");

pub const EC_NIST384_PK_1: &str = include_str!("../test_assets/private_keys/ec-nist384-pk_1.key");

// === certificates === //

/// CN=rsa-signer-1, serial 0x1A2B3C4D5E, key RSA_2048_PK_1
pub const RSA_2048_CERT_1: &str = include_str!("../test_assets/certificates/rsa-2048-cert_1.crt");
/// CN=rsa-recipient-2, serial 0xFF01, key RSA_2048_PK_2
pub const RSA_2048_CERT_2: &str = include_str!("../test_assets/certificates/rsa-2048-cert_2.crt");
/// CN=ec-p256-1, serial 4242, key EC_NIST256_PK_1
pub const EC_NIST256_CERT_1: &str = include_str!("../test_assets/certificates/ec-nist256-cert_1.crt");
/// CN=ec-p384-1, serial 4343, key EC_NIST384_PK_1
pub const EC_NIST384_CERT_1: &str = include_str!("../test_assets/certificates/ec-nist384-cert_1.crt");

pub const RSA_2048_CERT_1_SKID: [u8; 20] = [
    0x75, 0xDC, 0xE0, 0x25, 0x28, 0xD6, 0xE8, 0xFF, 0x9E, 0xAD, 0x2A, 0xB0, 0xC9, 0xE1, 0xA4, 0xF2, 0xFA, 0x47, 0xD6,
    0xBB,
];

pub const EC_NIST256_CERT_1_SKID: [u8; 20] = [
    0x8C, 0x43, 0xD3, 0xDF, 0x30, 0xF0, 0x8D, 0x24, 0x28, 0x2B, 0x6E, 0xB8, 0xA9, 0x8E, 0x7C, 0x4F, 0x85, 0xBF, 0xF5,
    0x0E,
];

// === CMS messages === //

/// Content of every message below.
pub const CMS_CONTENT: &[u8] = b"Hello from the other side of the envelope.\n";

// openssl cms -sign -stream -outform DER -md sha256 -signer rsa-2048-cert_1.crt -inkey rsa-2048-pk_1.key -nodetach
pub const CMS_SIGNED_BER_RSA: &[u8] = include_bytes!("../test_assets/cms/openssl-signed-ber-rsa.der");

// openssl cms -sign -outform DER -md sha256 -signer ec-nist256-cert_1.crt -inkey ec-nist256-pk_1.key -nodetach
pub const CMS_SIGNED_EC_P256: &[u8] = include_bytes!("../test_assets/cms/openssl-signed-ec-p256.der");

// openssl cms -encrypt -outform DER -aes256 rsa-2048-cert_1.crt
pub const CMS_ENVELOPED_KTRI_AES256: &[u8] = include_bytes!("../test_assets/cms/openssl-enveloped-ktri-aes256.der");

// openssl cms -encrypt -outform DER -aes128 ec-nist256-cert_1.crt
pub const CMS_ENVELOPED_KARI_AES128: &[u8] = include_bytes!("../test_assets/cms/openssl-enveloped-kari-aes128.der");

// openssl cms -EncryptedData_encrypt -outform DER -aes128 -secretkey 000102030405060708090a0b0c0d0e0f
pub const CMS_ENCRYPTED_AES128: &[u8] = include_bytes!("../test_assets/cms/openssl-encrypted-aes128.der");
pub const CMS_ENCRYPTED_AES128_KEY: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
];
