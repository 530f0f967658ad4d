use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::store::{BlobStore, BlobStoreError};

/// Public prefix under which saved blobs are reachable. The returned
/// references are always relative so they stay portable across deployments.
const PUBLIC_PREFIX: &str = "uploads";

pub struct LocalUploadStore {
    upload_dir: String,
}

impl LocalUploadStore {
    pub fn new(upload_dir: String) -> Self {
        Self { upload_dir }
    }

    /// `{unix-seconds}_{random}.png`. The uuid prefix carries four bytes of
    /// entropy, so two saves within the same second still land on distinct
    /// names; the timestamp alone is never relied on.
    fn next_name(&self) -> String {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}_{}.png", stamp, &suffix[..8])
    }
}

impl BlobStore for LocalUploadStore {
    fn save_blob(&self, data: &[u8]) -> Result<String, BlobStoreError> {
        fs::create_dir_all(&self.upload_dir)?;

        let name = self.next_name();
        let file_path = Path::new(&self.upload_dir).join(&name);
        // Names never repeat, so a pre-existing file is a bug; create_new
        // surfaces it as an error instead of overwriting.
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(file_path)?;
        file.write_all(data)?;

        Ok(format!("{}/{}", PUBLIC_PREFIX, name))
    }
}
