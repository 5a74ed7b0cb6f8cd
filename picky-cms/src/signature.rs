//! Signatures over already computed digests.

use crate::algorithm::SignatureAlgorithm;
use crate::error::CmsError;
use crate::hash::HashAlgorithm;
use crate::key::{ec, PrivateKey, PrivateKeyKind, PublicKey, PublicKeyKind};
use rand_core::CryptoRngCore;
use rsa::Pkcs1v15Sign;

/// Signs `digest` with PKCS#1 v1.5 (DigestInfo wrapped) or ECDSA depending on the key.
pub(crate) fn sign_digest(
    private_key: &PrivateKey,
    hash: HashAlgorithm,
    digest: &[u8],
    mut rng: &mut dyn CryptoRngCore,
) -> Result<Vec<u8>, CmsError> {
    if digest.len() != hash.output_size() {
        return Err(CmsError::invalid_argument(format!(
            "{:?} digest must be {} bytes long, got {}",
            hash,
            hash.output_size(),
            digest.len()
        )));
    }

    let signature = match private_key.kind() {
        PrivateKeyKind::Rsa(key) => key.sign_with_rng(&mut rng, hash.pkcs1v15_scheme(), digest)?,
        PrivateKeyKind::Ec(key) => key.sign_prehash(digest)?,
    };

    Ok(signature)
}

/// Verifies `signature` over `digest`.
///
/// RSA signatures are first checked as a DigestInfo for the algorithm's hash, then against the bare
/// digest, which some legacy signers produce.
pub(crate) fn verify_digest(
    public_key: &PublicKey,
    algorithm: SignatureAlgorithm,
    digest: &[u8],
    signature: &[u8],
) -> Result<(), CmsError> {
    match (public_key.kind(), algorithm) {
        (PublicKeyKind::Rsa(key), SignatureAlgorithm::RsaPkcs1v15(hash)) => {
            if key.verify(hash.pkcs1v15_scheme(), digest, signature).is_ok() {
                return Ok(());
            }

            key.verify(Pkcs1v15Sign::new_unprefixed(), digest, signature)
                .map_err(|_| CmsError::SignatureVerification)?;
            log::warn!("RSA signature verified over a bare digest without DigestInfo");
            Ok(())
        }
        (PublicKeyKind::Ec { curve, point }, SignatureAlgorithm::Ecdsa(_)) => {
            ec::verify_prehash(*curve, point, digest, signature).map_err(|_| CmsError::SignatureVerification)
        }
        _ => Err(CmsError::SignatureVerification),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;
    use rstest::rstest;

    #[rstest]
    #[case(picky_test_data::RSA_2048_PK_1, HashAlgorithm::SHA2_256)]
    #[case(picky_test_data::RSA_2048_PK_1, HashAlgorithm::SHA1)]
    #[case(picky_test_data::EC_NIST256_PK_1, HashAlgorithm::SHA2_256)]
    #[case(picky_test_data::EC_NIST384_PK_1, HashAlgorithm::SHA2_384)]
    fn sign_then_verify(#[case] pem: &str, #[case] hash: HashAlgorithm) {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let private_key = PrivateKey::from_pem_str(pem).expect("private key");
        let public_key = private_key.to_public_key().expect("public key");
        let algorithm = SignatureAlgorithm::new(private_key.algorithm(), hash);

        let digest = hash.digest(b"signed content");
        let signature = sign_digest(&private_key, hash, &digest, &mut rng).expect("sign");
        verify_digest(&public_key, algorithm, &digest, &signature).expect("verify");

        let other = hash.digest(b"other content");
        assert!(matches!(
            verify_digest(&public_key, algorithm, &other, &signature),
            Err(CmsError::SignatureVerification)
        ));
    }

    #[test]
    fn bare_digest_rsa_signature_is_accepted() {
        let private_key = PrivateKey::from_pem_str(picky_test_data::RSA_2048_PK_1).expect("private key");
        let public_key = private_key.to_public_key().expect("public key");
        let digest = HashAlgorithm::SHA2_256.digest(b"legacy");

        let signature = match private_key.kind() {
            PrivateKeyKind::Rsa(key) => key.sign(Pkcs1v15Sign::new_unprefixed(), &digest).expect("sign"),
            PrivateKeyKind::Ec(_) => unreachable!(),
        };

        verify_digest(
            &public_key,
            SignatureAlgorithm::RsaPkcs1v15(HashAlgorithm::SHA2_256),
            &digest,
            &signature,
        )
        .expect("verify");
    }

    #[test]
    fn mismatched_key_type() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let private_key = PrivateKey::from_pem_str(picky_test_data::EC_NIST256_PK_1).expect("private key");
        let digest = HashAlgorithm::SHA2_256.digest(b"x");
        let signature = sign_digest(&private_key, HashAlgorithm::SHA2_256, &digest, &mut rng).expect("sign");

        let rsa_public_key = PrivateKey::from_pem_str(picky_test_data::RSA_2048_PK_1)
            .expect("private key")
            .to_public_key()
            .expect("public key");
        assert!(matches!(
            verify_digest(
                &rsa_public_key,
                SignatureAlgorithm::Ecdsa(HashAlgorithm::SHA2_256),
                &digest,
                &signature
            ),
            Err(CmsError::SignatureVerification)
        ));
    }

    #[test]
    fn digest_size_is_checked() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let private_key = PrivateKey::from_pem_str(picky_test_data::RSA_2048_PK_1).expect("private key");
        assert!(matches!(
            sign_digest(&private_key, HashAlgorithm::SHA2_256, &[0; 20], &mut rng),
            Err(CmsError::InvalidArgument { .. })
        ));
    }
}
