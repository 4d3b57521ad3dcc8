//! Extraction of [`MessageMetadata`] from a payload.

use serde::Deserialize;
use usef_types::MessageMetadata;

/// The payload's metadata could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MetadataError(pub String);

/// Reads the metadata a message carries inside its signed payload.
pub trait MetadataReader: Send + Sync {
    fn read_metadata(&self, payload: &[u8]) -> Result<MessageMetadata, MetadataError>;
}

/// Reads payloads that are JSON documents with a `MessageMetadata` object.
///
/// Other top-level fields are the business content and are ignored here.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMetadataReader;

#[derive(Deserialize)]
struct Document {
    #[serde(rename = "MessageMetadata")]
    metadata: MessageMetadata,
}

impl MetadataReader for JsonMetadataReader {
    fn read_metadata(&self, payload: &[u8]) -> Result<MessageMetadata, MetadataError> {
        serde_json::from_slice::<Document>(payload)
            .map(|doc| doc.metadata)
            .map_err(|e| MetadataError(e.to_string()))
    }
}
