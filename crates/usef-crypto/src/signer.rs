//! Sealing, verification and key helpers.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use usef_types::KEY_TYPE_PREFIX;

use crate::error::CryptoError;
use crate::keystore::KeyStore;

/// Length of a detached signature.
pub const SIGNATURE_BYTES: usize = ed25519_dalek::SIGNATURE_LENGTH;
/// Length of a public key.
pub const PUBLIC_KEY_BYTES: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;
/// Length of a secret key (`seed ++ public key`).
pub const SECRET_KEY_BYTES: usize = ed25519_dalek::KEYPAIR_LENGTH;

/// Signs `plaintext` and returns `Base64(signature ++ plaintext)`.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKeyLength`] if `secret_key` is not
/// [`SECRET_KEY_BYTES`] long, or [`CryptoError::SealingFailed`] if its public
/// half does not belong to its seed.
pub fn seal(plaintext: &[u8], secret_key: &[u8]) -> Result<String, CryptoError> {
    let keypair: &[u8; SECRET_KEY_BYTES] =
        secret_key
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: SECRET_KEY_BYTES,
                actual: secret_key.len(),
            })?;
    let signing_key = SigningKey::from_keypair_bytes(keypair)
        .map_err(|e| CryptoError::SealingFailed(e.to_string()))?;

    let signature = signing_key.sign(plaintext);
    let mut sealed = Vec::with_capacity(SIGNATURE_BYTES + plaintext.len());
    sealed.extend_from_slice(&signature.to_bytes());
    sealed.extend_from_slice(plaintext);
    Ok(STANDARD.encode(sealed))
}

/// Checks a sealed message against a Base64 public key and returns the
/// signed plaintext.
///
/// Nothing from the sealed message is returned unless the signature is valid.
///
/// # Errors
///
/// - [`CryptoError::InvalidEncoding`] if either input is not valid Base64.
/// - [`CryptoError::InvalidKeyLength`] if the public key is not
///   [`PUBLIC_KEY_BYTES`] long.
/// - [`CryptoError::SignatureVerificationFailed`] if the signature does not
///   validate, including when the blob is too short to hold one.
pub fn verify(sealed_b64: &str, public_key_b64: &str) -> Result<Vec<u8>, CryptoError> {
    let sealed = decode_sealed(sealed_b64)?;
    let public_key = decode(public_key_b64, "public key")?;

    let public_key: [u8; PUBLIC_KEY_BYTES] =
        public_key
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_BYTES,
                actual: public_key.len(),
            })?;
    let verifying_key = VerifyingKey::from_bytes(&public_key)
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;

    if sealed.len() < SIGNATURE_BYTES {
        return Err(CryptoError::SignatureVerificationFailed);
    }
    let (signature, message) = sealed.split_at(SIGNATURE_BYTES);
    let signature: [u8; SIGNATURE_BYTES] = signature
        .try_into()
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;

    verifying_key
        .verify_strict(message, &Signature::from_bytes(&signature))
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;

    Ok(message.to_vec())
}

/// Decodes a Base64 sealed message into raw `signature ++ message` bytes.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidEncoding`] if the input is not valid Base64.
pub fn decode_sealed(sealed_b64: &str) -> Result<Vec<u8>, CryptoError> {
    decode(sealed_b64, "sealed message")
}

/// Returns the message part of decoded sealed bytes without checking the
/// signature.
///
/// The result is untrusted. It exists so the metadata a sender claims can be
/// read and checked before the key to verify it with is known.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidEncoding`] if `sealed` is shorter than a
/// signature.
pub fn open_unverified(sealed: &[u8]) -> Result<&[u8], CryptoError> {
    sealed.get(SIGNATURE_BYTES..).ok_or_else(|| {
        CryptoError::InvalidEncoding(format!(
            "sealed message is {} bytes, shorter than a {SIGNATURE_BYTES}-byte signature",
            sealed.len()
        ))
    })
}

/// Removes the key-type tag from a published key, if present.
pub fn strip_key_prefix(key: &str) -> &str {
    key.strip_prefix(KEY_TYPE_PREFIX).unwrap_or(key)
}

/// Formats a public key the way it is published: `cs1.<base64>`.
pub fn encode_public_key(public_key: &[u8; PUBLIC_KEY_BYTES]) -> String {
    format!("{KEY_TYPE_PREFIX}{}", STANDARD.encode(public_key))
}

fn decode(input: &str, what: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(input.trim())
        .map_err(|e| CryptoError::InvalidEncoding(format!("{what}: {e}")))
}

/// A freshly generated signing key pair.
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: [u8; SECRET_KEY_BYTES],
    pub public_key: [u8; PUBLIC_KEY_BYTES],
}

impl KeyPair {
    /// Base64 of the secret key, the format [`FileKeyStore`](crate::FileKeyStore) reads.
    pub fn secret_key_base64(&self) -> String {
        STANDARD.encode(self.secret_key)
    }

    /// Base64 of the public key, without the key-type tag.
    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.public_key)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("secret_key", &"<redacted>")
            .field("public_key", &self.public_key_base64())
            .finish()
    }
}

/// Generates a new key pair from the operating system's RNG.
pub fn generate_key_pair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    KeyPair {
        secret_key: signing_key.to_keypair_bytes(),
        public_key: signing_key.verifying_key().to_bytes(),
    }
}

/// Seals outbound messages with the secret key held by a [`KeyStore`].
#[derive(Debug, Clone)]
pub struct Sealer<K> {
    keystore: K,
}

impl<K: KeyStore> Sealer<K> {
    pub fn new(keystore: K) -> Self {
        Self { keystore }
    }

    /// Loads the secret key and seals `plaintext` with it.
    ///
    /// # Errors
    ///
    /// A key-store failure is reported as [`CryptoError::SealingFailed`];
    /// otherwise the errors of [`seal`].
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let secret_key = self.keystore.load_secret_key().map_err(|e| {
            tracing::error!(error = %e, "failed to load secret key for sealing");
            CryptoError::SealingFailed(e.to_string())
        })?;
        seal(plaintext, &secret_key)
    }
}
