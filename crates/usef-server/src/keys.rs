//! Startup check of this node's signing key.

use usef_crypto::{
    encode_public_key, verify, CryptoError, KeyStore, Sealer, PUBLIC_KEY_BYTES, SECRET_KEY_BYTES,
};

const SELF_CHECK: &[u8] = b"usef signing key self-check";

/// Loads the secret key, proves it can seal a message that verifies against
/// its own public half, and returns that public key in published form.
///
/// # Errors
///
/// Returns [`CryptoError::SealingFailed`] if the key cannot be loaded,
/// [`CryptoError::InvalidKeyLength`] if it has the wrong size, or the
/// verification error if the two halves do not belong together.
pub fn published_public_key<K: KeyStore>(keystore: K) -> Result<String, CryptoError> {
    let secret = keystore
        .load_secret_key()
        .map_err(|e| CryptoError::SealingFailed(e.to_string()))?;
    if secret.len() != SECRET_KEY_BYTES {
        return Err(CryptoError::InvalidKeyLength {
            expected: SECRET_KEY_BYTES,
            actual: secret.len(),
        });
    }
    let mut public_key = [0u8; PUBLIC_KEY_BYTES];
    public_key.copy_from_slice(&secret[SECRET_KEY_BYTES - PUBLIC_KEY_BYTES..]);
    let published = encode_public_key(&public_key);

    let sealed = Sealer::new(keystore).seal(SELF_CHECK)?;
    verify(&sealed, usef_crypto::strip_key_prefix(&published))?;
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use usef_crypto::{generate_key_pair, StaticKeyStore};

    #[test]
    fn returns_prefixed_public_key() {
        let keys = generate_key_pair();
        let published =
            published_public_key(StaticKeyStore::new(keys.secret_key.to_vec())).expect("check");
        assert_eq!(published, format!("cs1.{}", keys.public_key_base64()));
    }

    #[test]
    fn mismatched_halves_fail() {
        let a = generate_key_pair();
        let b = generate_key_pair();
        let mut spliced = a.secret_key.to_vec();
        spliced[SECRET_KEY_BYTES - PUBLIC_KEY_BYTES..].copy_from_slice(&b.public_key);

        assert!(published_public_key(StaticKeyStore::new(spliced)).is_err());
    }

    #[test]
    fn short_key_is_rejected() {
        assert_eq!(
            published_public_key(StaticKeyStore::new(vec![0u8; 32])),
            Err(CryptoError::InvalidKeyLength {
                expected: SECRET_KEY_BYTES,
                actual: 32
            })
        );
    }

    #[test]
    fn missing_key_file_is_a_sealing_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = usef_crypto::FileKeyStore::new(dir.path().join("absent.key"));
        assert!(matches!(
            published_public_key(store),
            Err(CryptoError::SealingFailed(_))
        ));
    }
}
