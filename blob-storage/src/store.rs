use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("payload is not valid base64")]
    InvalidEncoding,

    #[error("failed to write blob")]
    Io(#[from] std::io::Error),
}

pub trait BlobStore {
    /// Persists `data` under a fresh name and returns a relative reference
    /// suitable for echoing back to clients.
    fn save_blob(&self, data: &[u8]) -> Result<String, BlobStoreError>;
}

/// Decodes a base64 image payload and hands the bytes to the store.
///
/// An empty payload is a no-op and returns an empty reference. Decoding is
/// strict; nothing is written when the payload fails to decode.
pub fn save_base64<S: BlobStore>(store: &S, payload: &str) -> Result<String, BlobStoreError> {
    if payload.is_empty() {
        return Ok(String::new());
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| BlobStoreError::InvalidEncoding)?;
    store.save_blob(&bytes)
}
