use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use crate::collab::{MediaRef, ObjectStorage};
use crate::error::UploadError;

/// Object storage on the local filesystem, laid out as `<root>/<bucket>/<path>`.
pub struct DirStorage {
    root: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    /// Writes `bytes` to `path` inside the bucket. Existing objects are never
    /// overwritten.
    pub fn put(&self, path: &str, bytes: &[u8]) -> Result<MediaRef, UploadError> {
        let relative = Path::new(path);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !plain {
            return Err(UploadError::Storage(format!("invalid object path: {path}")));
        }

        let target = self.bucket_dir().join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| UploadError::Storage(e.to_string()))?;
        }

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(UploadError::AlreadyExists(path.to_string()));
            }
            Err(e) => return Err(UploadError::Storage(e.to_string())),
        };
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| UploadError::Storage(e.to_string()))?;

        Ok(MediaRef(path.to_string()))
    }
}

impl ObjectStorage for DirStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<MediaRef, UploadError> {
        tracing::debug!(bucket = %self.bucket, %path, %content_type, bytes = bytes.len(), "Storing object");
        self.put(path, &bytes)
    }

    fn public_url(&self, media: &MediaRef) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, media.0)
    }
}
