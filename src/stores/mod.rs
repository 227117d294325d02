use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::entry::Entry;

pub mod fs_blob;
pub mod memory;

pub use fs_blob::FsBlobStore;
pub use memory::{MemoryBlobStore, MemoryMetadataStore};

/// The authoritative remote metadata store. The core consumes this
/// interface; concrete backends live outside the core.
///
/// Failure contract: every operation may fail with
/// `AppError::RemoteUnavailable` when the backend is unreachable; `create`,
/// `rename` and `move_entry` fail with `AppError::Conflict` on a sibling
/// name collision, and id-addressed operations fail with
/// `AppError::NotFound` for unknown ids.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Entries whose parent path equals the given normalized path.
    async fn list(&self, path: &str) -> Result<Vec<Entry>, AppError>;

    async fn create(&self, entry: &Entry) -> Result<Entry, AppError>;

    async fn rename(&self, id: &str, new_name: &str) -> Result<Entry, AppError>;

    async fn move_entry(&self, id: &str, new_parent_path: &str) -> Result<Entry, AppError>;

    async fn soft_delete(&self, id: &str) -> Result<(), AppError>;
}

/// Binary content storage addressed by opaque blob references.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bytes: &[u8], content_type: &str) -> Result<String, AppError>;

    /// A time-limited retrieval URL for the blob.
    async fn get_retrieval_url(&self, blob_ref: &str, ttl: Duration) -> Result<String, AppError>;

    async fn delete(&self, blob_ref: &str) -> Result<(), AppError>;
}
