//! Message sealing and verification for USEF participants.
//!
//! A sealed message is `Base64(signature ++ message)` where the signature is
//! an Ed25519 signature over the message, laid out exactly as libsodium's
//! combined-mode `crypto_sign` does it. Key and signature sizes are protocol
//! constants shared by every implementation on the network:
//!
//! | item        | bytes |
//! |-------------|-------|
//! | signature   | 64    |
//! | public key  | 32    |
//! | secret key  | 64 (`seed ++ public key`) |
//!
//! The secret key is read from a [`KeyStore`]; everything else is pure.

mod error;
mod keystore;
mod signer;

pub use error::{CryptoError, KeyStoreError};
pub use keystore::{FileKeyStore, KeyStore, StaticKeyStore};
pub use signer::{
    decode_sealed, encode_public_key, generate_key_pair, open_unverified, seal, strip_key_prefix,
    verify, KeyPair, Sealer, PUBLIC_KEY_BYTES, SECRET_KEY_BYTES, SIGNATURE_BYTES,
};
