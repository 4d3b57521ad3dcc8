//! Error types for sealing, verification and key loading.

/// Errors produced by [`seal`](crate::seal) and [`verify`](crate::verify).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// An input that should be Base64 is not, or a sealed message is too
    /// short to hold a signature.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// A key does not have the size the signature primitive requires.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// The signature does not validate against the public key.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// The message could not be sealed (for example, the key store failed).
    #[error("sealing failed: {0}")]
    SealingFailed(String),
}

/// Errors produced while loading the local secret key.
#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("failed to read secret key file: {0}")]
    Read(#[from] std::io::Error),

    #[error("secret key file is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}
