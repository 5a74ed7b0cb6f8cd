//! PEM armor (RFC 7468) around CMS messages, certificates and keys.

use pem_rfc7468::LineEnding;
use thiserror::Error;

/// Label written by OpenSSL `cms -outform PEM`
pub const CMS_PEM_LABEL: &str = "CMS";
/// Label written by OpenSSL `smime`/`pkcs7` tools
pub const PKCS7_PEM_LABEL: &str = "PKCS7";

#[derive(Debug, Clone, Error)]
pub enum PemError {
    /// armor doesn't follow RFC 7468
    #[error("malformed PEM armor: {0}")]
    Armor(pem_rfc7468::Error),
}

/// Decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pem {
    label: String,
    data: Vec<u8>,
}

impl Pem {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Reads the single PEM block of `input`.
pub fn parse_pem<T: ?Sized + AsRef<[u8]>>(input: &T) -> Result<Pem, PemError> {
    let (label, data) = pem_rfc7468::decode_vec(input.as_ref()).map_err(PemError::Armor)?;
    Ok(Pem {
        label: label.to_owned(),
        data,
    })
}

/// Armors `data`, base64 lines are 64 characters long.
pub fn to_pem(label: &str, data: &[u8]) -> Result<String, PemError> {
    pem_rfc7468::encode_string(label, LineEnding::LF, data).map_err(PemError::Armor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn certificate_block() {
        let pem = parse_pem(picky_test_data::RSA_2048_CERT_1).expect("pem");
        assert_eq!(pem.label(), "CERTIFICATE");
        assert_eq!(pem.data()[0], 0x30);
    }

    #[test]
    fn armor_wraps_lines() {
        let data = vec![0xA5u8; 100];
        let encoded = to_pem(CMS_PEM_LABEL, &data).expect("armor");
        assert!(encoded.starts_with("-----BEGIN CMS-----\n"));
        assert!(encoded.trim_end().ends_with("-----END CMS-----"));
        assert!(encoded.lines().all(|line| line.len() <= 64));

        let decoded = parse_pem(&encoded).expect("pem");
        assert_eq!(decoded.label(), CMS_PEM_LABEL);
        assert_eq!(decoded.into_data(), data);
    }

    #[test]
    fn missing_footer() {
        assert!(matches!(
            parse_pem("-----BEGIN CMS-----\nAAAA\n"),
            Err(PemError::Armor(_))
        ));
    }

    #[test]
    fn invalid_label_is_refused_on_encode() {
        assert!(matches!(to_pem("CMS-----", b"abc"), Err(PemError::Armor(_))));
    }
}
