use crate::error::{Asn1DerError, Result};

const INDEFINITE: u8 = 0x80;
const LONG_FORM_BIT: u8 = 0x80;

/// Lengths longer than this many octets are rejected on decode.
pub const MAX_LENGTH_OCTETS: usize = 4;

/// DER length field helpers
pub struct Length;

impl Length {
    /// Size of the encoded length field for a content of `len` bytes.
    pub const fn encoded_len(len: usize) -> usize {
        if len < 0x80 {
            1
        } else {
            1 + significant_bytes(len)
        }
    }

    /// Minimal length encoding.
    pub fn encode(len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::encoded_len(len));
        Self::encode_to(len, &mut out);
        out
    }

    pub fn encode_to(len: usize, out: &mut Vec<u8>) {
        if len < 0x80 {
            out.push(len as u8);
        } else {
            let count = significant_bytes(len);
            out.push(LONG_FORM_BIT | count as u8);
            let bytes = len.to_be_bytes();
            out.extend_from_slice(&bytes[bytes.len() - count..]);
        }
    }

    /// Decodes the length starting at `cursor` and checks that the content fits before `max`.
    ///
    /// Returns the content length and the index of the first content byte. Non-minimal encodings
    /// are rejected.
    pub fn decode(data: &[u8], cursor: usize, max: usize) -> Result<(usize, usize)> {
        let (len, content_start) = Self::decode_lenient(data, cursor, max)?;
        if content_start - cursor != Self::encoded_len(len) {
            return Err(Asn1DerError::InvalidLength);
        }
        Ok((len, content_start))
    }

    /// Same as [`Length::decode`] but accepts the non-minimal forms allowed by BER.
    pub fn decode_lenient(data: &[u8], cursor: usize, max: usize) -> Result<(usize, usize)> {
        let max = max.min(data.len());
        let (len, content_start) = Self::decode_unbounded(data, cursor, max)?;

        let available = max - content_start;
        if len > available {
            log::trace!("length {} overflows the {} remaining bytes", len, available);
            return Err(Asn1DerError::LengthOverflow { length: len, available });
        }

        Ok((len, content_start))
    }

    /// Decodes the length field only, without requiring the content to be present.
    ///
    /// Used when the content of an element is intentionally supplied out of band.
    pub fn decode_unbounded(data: &[u8], cursor: usize, max: usize) -> Result<(usize, usize)> {
        let max = max.min(data.len());
        if cursor >= max {
            return Err(Asn1DerError::TruncatedData);
        }

        let first = data[cursor];
        if first == INDEFINITE {
            return Err(Asn1DerError::IndefiniteLength);
        }

        if first & LONG_FORM_BIT == 0 {
            return Ok((usize::from(first), cursor + 1));
        }

        let count = usize::from(first & !LONG_FORM_BIT);
        if count > MAX_LENGTH_OCTETS || count > std::mem::size_of::<usize>() {
            return Err(Asn1DerError::InvalidLength);
        }

        let start = cursor + 1;
        if max - start < count {
            return Err(Asn1DerError::TruncatedData);
        }

        let len = data[start..start + count]
            .iter()
            .fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte));

        Ok((len, start + count))
    }
}

const fn significant_bytes(value: usize) -> usize {
    let bits = (usize::BITS - value.leading_zeros()) as usize;
    (bits + 7) / 8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, &[0x00])]
    #[case(0x7F, &[0x7F])]
    #[case(0x80, &[0x81, 0x80])]
    #[case(0xFF, &[0x81, 0xFF])]
    #[case(0x100, &[0x82, 0x01, 0x00])]
    #[case(0x01_00_00, &[0x83, 0x01, 0x00, 0x00])]
    fn minimal_encoding(#[case] len: usize, #[case] expected: &[u8]) {
        assert_eq!(Length::encode(len), expected);
        assert_eq!(Length::encoded_len(len), expected.len());
    }

    #[test]
    fn decode_short_and_long_forms() {
        let data = [0x81, 0x02, 0xAA, 0xBB];
        assert_eq!(Length::decode(&data, 0, data.len()), Ok((2, 2)));

        let data = [0x03, 1, 2, 3];
        assert_eq!(Length::decode(&data, 0, data.len()), Ok((3, 1)));
    }

    #[test]
    fn decode_rejects_indefinite() {
        assert_eq!(Length::decode(&[0x80, 0x00], 0, 2), Err(Asn1DerError::IndefiniteLength));
    }

    #[test]
    fn decode_rejects_overflowing_length() {
        let data = [0x05, 1, 2];
        assert_eq!(
            Length::decode(&data, 0, data.len()),
            Err(Asn1DerError::LengthOverflow { length: 5, available: 2 })
        );
    }

    #[test]
    fn decode_respects_max_bound() {
        // content fits in the slice but not in the caller bound
        let data = [0x02, 1, 2, 3];
        assert!(Length::decode(&data, 0, 2).is_err());
        assert_eq!(Length::decode_unbounded(&data, 0, 2), Ok((2, 1)));
    }

    #[test]
    fn decode_rejects_truncated_and_oversized_fields() {
        assert_eq!(Length::decode(&[0x82, 0x01], 0, 2), Err(Asn1DerError::TruncatedData));
        assert_eq!(Length::decode(&[], 0, 0), Err(Asn1DerError::TruncatedData));
        assert_eq!(
            Length::decode(&[0x85, 1, 1, 1, 1, 1], 0, 6),
            Err(Asn1DerError::InvalidLength)
        );
    }

    #[test]
    fn non_minimal_lengths_are_ber_only() {
        let data = [0x81, 0x05, 1, 2, 3, 4, 5];
        assert_eq!(Length::decode(&data, 0, data.len()), Err(Asn1DerError::InvalidLength));
        assert_eq!(Length::decode_lenient(&data, 0, data.len()), Ok((5, 2)));

        let data = [0x82, 0x00, 0x81, 0];
        assert_eq!(Length::decode_unbounded(&data, 0, data.len()), Ok((0x81, 3)));
    }
}
