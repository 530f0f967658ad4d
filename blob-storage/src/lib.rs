pub mod local_store;
pub mod store;

pub use local_store::LocalUploadStore;
pub use store::{save_base64, BlobStore, BlobStoreError};
