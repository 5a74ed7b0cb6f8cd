//! CBC content encryption and PKCS#7 padding.

use crate::algorithm::ContentEncryptionAlgorithm;
use crate::error::CmsError;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroizing;

fn check_block_size(block_size: usize) -> Result<(), CmsError> {
    if block_size == 0 || block_size > usize::from(u8::MAX) {
        return Err(CmsError::invalid_argument(format!(
            "PKCS#7 block size must be in 1..=255, got {}",
            block_size
        )));
    }
    Ok(())
}

/// Number of pad bytes appended to `len` bytes of data, in `1..=block_size`.
///
/// A full block is added to aligned input.
pub fn pad_size(len: usize, block_size: usize) -> Result<usize, CmsError> {
    check_block_size(block_size)?;
    Ok(block_size - len % block_size)
}

/// PKCS#7 padding, every pad byte holds the pad length.
pub fn pad(data: &[u8], block_size: usize) -> Result<Vec<u8>, CmsError> {
    let pad_len = pad_size(data.len(), block_size)?;
    let pad_byte = u8::try_from(pad_len).map_err(|_| CmsError::invalid_argument("pad length overflows a byte"))?;

    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_byte);
    Ok(padded)
}

/// Strips PKCS#7 padding.
///
/// The pad length must be in `1..=block_size`, and every pad byte must hold it.
pub fn unpad(data: &[u8], block_size: usize) -> Result<&[u8], CmsError> {
    check_block_size(block_size)?;
    if data.is_empty() || data.len() % block_size != 0 {
        return Err(CmsError::InvalidPadding);
    }

    let pad_len = usize::from(data[data.len() - 1]);
    if pad_len == 0 || pad_len > block_size {
        return Err(CmsError::InvalidPadding);
    }

    let (content, padding) = data.split_at(data.len() - pad_len);
    if padding.iter().any(|byte| usize::from(*byte) != pad_len) {
        return Err(CmsError::InvalidPadding);
    }

    Ok(content)
}

fn check_sizes(cipher: ContentEncryptionAlgorithm, key: &[u8], iv: &[u8]) -> Result<(), CmsError> {
    if key.len() != cipher.key_size() {
        return Err(CmsError::invalid_argument(format!(
            "{:?} requires a {} bytes key, got {}",
            cipher,
            cipher.key_size(),
            key.len()
        )));
    }

    if iv.len() != cipher.block_size() {
        return Err(CmsError::invalid_argument(format!(
            "{:?} requires a {} bytes IV, got {}",
            cipher,
            cipher.block_size(),
            iv.len()
        )));
    }

    Ok(())
}

/// Pads then encrypts `plaintext`.
pub(crate) fn encrypt(
    cipher: ContentEncryptionAlgorithm,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CmsError> {
    check_sizes(cipher, key, iv)?;
    let padded = Zeroizing::new(pad(plaintext, cipher.block_size())?);

    let init_error = |_| CmsError::invalid_argument(format!("{:?} encryptor initialization failed", cipher));

    let encrypted = match cipher {
        ContentEncryptionAlgorithm::Aes128Cbc => {
            type Aes128Cbc = cbc::Encryptor<aes::Aes128>;
            Aes128Cbc::new_from_slices(key, iv)
                .map_err(init_error)?
                .encrypt_padded_vec_mut::<NoPadding>(&padded)
        }
        ContentEncryptionAlgorithm::Aes192Cbc => {
            type Aes192Cbc = cbc::Encryptor<aes::Aes192>;
            Aes192Cbc::new_from_slices(key, iv)
                .map_err(init_error)?
                .encrypt_padded_vec_mut::<NoPadding>(&padded)
        }
        ContentEncryptionAlgorithm::Aes256Cbc => {
            type Aes256Cbc = cbc::Encryptor<aes::Aes256>;
            Aes256Cbc::new_from_slices(key, iv)
                .map_err(init_error)?
                .encrypt_padded_vec_mut::<NoPadding>(&padded)
        }
        ContentEncryptionAlgorithm::DesCbc => {
            type DesCbc = cbc::Encryptor<des::Des>;
            DesCbc::new_from_slices(key, iv)
                .map_err(init_error)?
                .encrypt_padded_vec_mut::<NoPadding>(&padded)
        }
        ContentEncryptionAlgorithm::DesEde3Cbc => {
            type TDesCbc = cbc::Encryptor<des::TdesEde3>;
            TDesCbc::new_from_slices(key, iv)
                .map_err(init_error)?
                .encrypt_padded_vec_mut::<NoPadding>(&padded)
        }
    };

    Ok(encrypted)
}

/// Decrypts then strips the padding of `ciphertext`.
pub(crate) fn decrypt(
    cipher: ContentEncryptionAlgorithm,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CmsError> {
    check_sizes(cipher, key, iv)?;
    if ciphertext.is_empty() || ciphertext.len() % cipher.block_size() != 0 {
        return Err(CmsError::InvalidPadding);
    }

    let init_error = |_| CmsError::invalid_argument(format!("{:?} decryptor initialization failed", cipher));
    let block_error = |_| CmsError::InvalidPadding;

    let decrypted = Zeroizing::new(match cipher {
        ContentEncryptionAlgorithm::Aes128Cbc => {
            type Aes128Cbc = cbc::Decryptor<aes::Aes128>;
            Aes128Cbc::new_from_slices(key, iv)
                .map_err(init_error)?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(block_error)?
        }
        ContentEncryptionAlgorithm::Aes192Cbc => {
            type Aes192Cbc = cbc::Decryptor<aes::Aes192>;
            Aes192Cbc::new_from_slices(key, iv)
                .map_err(init_error)?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(block_error)?
        }
        ContentEncryptionAlgorithm::Aes256Cbc => {
            type Aes256Cbc = cbc::Decryptor<aes::Aes256>;
            Aes256Cbc::new_from_slices(key, iv)
                .map_err(init_error)?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(block_error)?
        }
        ContentEncryptionAlgorithm::DesCbc => {
            type DesCbc = cbc::Decryptor<des::Des>;
            DesCbc::new_from_slices(key, iv)
                .map_err(init_error)?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(block_error)?
        }
        ContentEncryptionAlgorithm::DesEde3Cbc => {
            type TDesCbc = cbc::Decryptor<des::TdesEde3>;
            TDesCbc::new_from_slices(key, iv)
                .map_err(init_error)?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(block_error)?
        }
    });

    Ok(unpad(&decrypted, cipher.block_size())?.to_vec())
}
