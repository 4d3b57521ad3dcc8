//! Access to the local participant's secret signing key.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::KeyStoreError;

/// Source of the secret key used to seal outbound messages.
pub trait KeyStore: Send + Sync {
    /// Returns the raw secret key bytes.
    fn load_secret_key(&self) -> Result<Vec<u8>, KeyStoreError>;
}

/// Reads a Base64 secret key from a file on every call, so a rotated key
/// file takes effect without a restart.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyStore for FileKeyStore {
    fn load_secret_key(&self) -> Result<Vec<u8>, KeyStoreError> {
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(STANDARD.decode(contents.trim())?)
    }
}

/// Holds a secret key in memory.
#[derive(Clone)]
pub struct StaticKeyStore {
    secret_key: Vec<u8>,
}

impl StaticKeyStore {
    pub fn new(secret_key: Vec<u8>) -> Self {
        Self { secret_key }
    }
}

impl fmt::Debug for StaticKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeyStore").finish_non_exhaustive()
    }
}

impl KeyStore for StaticKeyStore {
    fn load_secret_key(&self) -> Result<Vec<u8>, KeyStoreError> {
        Ok(self.secret_key.clone())
    }
}

impl<K: KeyStore + ?Sized> KeyStore for std::sync::Arc<K> {
    fn load_secret_key(&self) -> Result<Vec<u8>, KeyStoreError> {
        (**self).load_secret_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_keystore_reads_trimmed_base64() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secret.key");
        std::fs::write(&path, format!("{}\n", STANDARD.encode([9u8; 64]))).expect("write key");

        let store = FileKeyStore::new(&path);
        assert_eq!(store.load_secret_key().expect("load"), vec![9u8; 64]);
    }

    #[test]
    fn file_keystore_missing_file_is_read_error() {
        let store = FileKeyStore::new("/nonexistent/usef/secret.key");
        assert!(matches!(
            store.load_secret_key(),
            Err(KeyStoreError::Read(_))
        ));
    }

    #[test]
    fn file_keystore_rejects_non_base64() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secret.key");
        std::fs::write(&path, "not*base64").expect("write key");

        assert!(matches!(
            FileKeyStore::new(&path).load_secret_key(),
            Err(KeyStoreError::Decode(_))
        ));
    }
}
