use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::error::AppError;
use crate::stores::BlobStore;

/// Filesystem-backed `BlobStore`.
///
/// Blobs are stored under uuid-derived names, sharded by the first two
/// characters of the reference:
///
/// ```text
/// {base_path}/
/// ├── ab/
/// │   └── ab12cd34567890abcdef123456789012
/// └── cd/
///     └── cd90ab1234567890abcdef1234567890
/// ```
///
/// Retrieval URLs are `file://` URLs; the ttl is accepted for interface
/// parity but local URLs do not expire.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    base_path: PathBuf,
}

impl FsBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blob_path(&self, blob_ref: &str) -> PathBuf {
        let shard = &blob_ref[..blob_ref.len().min(2)];
        self.base_path.join(shard).join(blob_ref)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, bytes: &[u8], _content_type: &str) -> Result<String, AppError> {
        let blob_ref = Uuid::new_v4().simple().to_string();
        let path = self.blob_path(&blob_ref);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(blob_ref)
    }

    async fn get_retrieval_url(&self, blob_ref: &str, _ttl: Duration) -> Result<String, AppError> {
        let path = self.blob_path(blob_ref);
        if !path.exists() {
            return Err(AppError::NotFound(format!("blob {blob_ref}")));
        }
        let url = Url::from_file_path(&path)
            .map_err(|_| AppError::NotFound(format!("blob {blob_ref}")))?;
        Ok(url.to_string())
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), AppError> {
        let path = self.blob_path(blob_ref);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}
