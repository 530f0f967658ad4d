use std::path::Path;

use clap::Parser;

#[derive(Parser)]
pub struct Args {
    #[clap(long, env = "PORT", default_value_t = 10000)]
    pub(crate) port: u16,

    /// Shared-secret bearer token. Empty disables authentication entirely.
    #[clap(long, env = "AUTH_TOKEN", default_value = "")]
    pub(crate) auth_token: String,

    /// `*` allows every origin; otherwise a comma-separated list.
    #[clap(long, env = "ALLOW_ORIGINS", default_value = "*")]
    pub(crate) allow_origins: String,

    #[clap(long, env = "DATA_DIR", default_value = "/tmp/data")]
    pub(crate) data_dir: String,

    /// Defaults to `<data-dir>/uploads` when unset.
    #[clap(long, env = "UPLOAD_DIR")]
    pub(crate) upload_dir: Option<String>,

    #[clap(long, env = "MAX_CONTENT_LENGTH_MB", default_value_t = 10)]
    pub(crate) max_content_length_mb: usize,
}

impl Args {
    pub(crate) fn upload_dir(&self) -> String {
        match &self.upload_dir {
            Some(dir) => dir.clone(),
            None => Path::new(&self.data_dir)
                .join("uploads")
                .to_string_lossy()
                .into_owned(),
        }
    }

    pub(crate) fn max_content_length_bytes(&self) -> usize {
        self.max_content_length_mb * 1024 * 1024
    }
}
