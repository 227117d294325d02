use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::AppError;
use crate::models::entry::Entry;
use crate::stores::{BlobStore, MetadataStore};
use crate::vpath;

/// In-memory `MetadataStore`. Serves tests and offline-only consumers, and
/// can be switched into an unreachable state to exercise fallback paths.
#[derive(Default)]
pub struct MemoryMetadataStore {
    entries: Mutex<HashMap<String, Entry>>,
    offline: AtomicBool,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline, every operation fails with `RemoteUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Seed an entry without going through the `create` contract.
    pub fn insert_direct(&self, entry: Entry) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(entry.id.clone(), entry);
    }

    fn ensure_online(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(AppError::RemoteUnavailable(
                "metadata store offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn list(&self, path: &str) -> Result<Vec<Entry>, AppError> {
        self.ensure_online()?;
        let path = vpath::normalize(path)?;
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries
            .values()
            .filter(|e| e.parent_path == path && !e.is_deleted)
            .cloned()
            .collect())
    }

    async fn create(&self, entry: &Entry) -> Result<Entry, AppError> {
        self.ensure_online()?;
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let collides = entries
            .values()
            .any(|e| e.parent_path == entry.parent_path && e.name == entry.name && !e.is_deleted);
        if collides {
            return Err(AppError::Conflict(format!(
                "{} already exists under {}",
                entry.name, entry.parent_path
            )));
        }

        let created = entry.clone();
        entries.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn rename(&self, id: &str, new_name: &str) -> Result<Entry, AppError> {
        self.ensure_online()?;
        vpath::validate_name(new_name)?;
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let current = entries
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("entry {id}")))?;

        let collides = entries.values().any(|e| {
            e.id != id && e.parent_path == current.parent_path && e.name == new_name && !e.is_deleted
        });
        if collides {
            return Err(AppError::Conflict(format!(
                "{new_name} already exists under {}",
                current.parent_path
            )));
        }

        let old_path = current.path();
        let mut renamed = current;
        renamed.name = new_name.to_string();
        renamed.modified_at = Utc::now();
        let new_path = renamed.path();
        entries.insert(id.to_string(), renamed.clone());

        if renamed.is_folder() {
            reroot_children(&mut entries, &old_path, &new_path);
        }
        Ok(renamed)
    }

    async fn move_entry(&self, id: &str, new_parent_path: &str) -> Result<Entry, AppError> {
        self.ensure_online()?;
        let new_parent = vpath::normalize(new_parent_path)?;
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let current = entries
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("entry {id}")))?;

        let collides = entries
            .values()
            .any(|e| e.id != id && e.parent_path == new_parent && e.name == current.name && !e.is_deleted);
        if collides {
            return Err(AppError::Conflict(format!(
                "{} already exists under {new_parent}",
                current.name
            )));
        }

        let old_path = current.path();
        let mut moved = current;
        moved.parent_path = new_parent;
        moved.modified_at = Utc::now();
        let new_path = moved.path();
        entries.insert(id.to_string(), moved.clone());

        if moved.is_folder() {
            reroot_children(&mut entries, &old_path, &new_path);
        }
        Ok(moved)
    }

    async fn soft_delete(&self, id: &str) -> Result<(), AppError> {
        self.ensure_online()?;
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("entry {id}")))?;
        entry.is_deleted = true;
        entry.modified_at = Utc::now();
        Ok(())
    }
}

fn reroot_children(entries: &mut HashMap<String, Entry>, old_path: &str, new_path: &str) {
    let prefix = format!("{old_path}/");
    for entry in entries.values_mut() {
        if entry.parent_path == old_path {
            entry.parent_path = new_path.to_string();
        } else if let Some(rest) = entry.parent_path.strip_prefix(&prefix) {
            entry.parent_path = format!("{new_path}/{rest}");
        }
    }
}

/// In-memory `BlobStore` with fake expiring retrieval URLs.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, (Vec<u8>, String)>>,
    offline: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    pub fn contains(&self, blob_ref: &str) -> bool {
        let blobs = self
            .blobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        blobs.contains_key(blob_ref)
    }

    fn ensure_online(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(AppError::RemoteUnavailable("blob store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: &[u8], content_type: &str) -> Result<String, AppError> {
        self.ensure_online()?;
        let blob_ref = uuid::Uuid::new_v4().simple().to_string();
        let mut blobs = self
            .blobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        blobs.insert(blob_ref.clone(), (bytes.to_vec(), content_type.to_string()));
        Ok(blob_ref)
    }

    async fn get_retrieval_url(&self, blob_ref: &str, ttl: Duration) -> Result<String, AppError> {
        self.ensure_online()?;
        let blobs = self
            .blobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !blobs.contains_key(blob_ref) {
            return Err(AppError::NotFound(format!("blob {blob_ref}")));
        }
        let expires = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
        Ok(format!(
            "memory://blobs/{blob_ref}?expires={}",
            expires.timestamp()
        ))
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), AppError> {
        self.ensure_online()?;
        let mut blobs = self
            .blobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        blobs.remove(blob_ref);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_rejects_sibling_name_collision() {
        let store = MemoryMetadataStore::new();
        store
            .create(&Entry::new_folder("docs", "/"))
            .await
            .unwrap();

        let err = store
            .create(&Entry::new_folder("docs", "/"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn offline_store_fails_with_remote_unavailable() {
        let store = MemoryMetadataStore::new();
        store.set_offline(true);

        let err = store.list("/").await.unwrap_err();
        assert!(matches!(err, AppError::RemoteUnavailable(_)));

        store.set_offline(false);
        assert!(store.list("/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rename_unknown_id_is_not_found() {
        let store = MemoryMetadataStore::new();
        let err = store.rename("missing", "x").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn folder_rename_reroots_children() {
        let store = MemoryMetadataStore::new();
        let folder = store
            .create(&Entry::new_folder("docs", "/"))
            .await
            .unwrap();
        store
            .create(&Entry::new_file("a.txt", "/docs", 1, "text/plain", None))
            .await
            .unwrap();

        store.rename(&folder.id, "papers").await.unwrap();

        let children = store.list("/papers").await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "a.txt");
        assert!(store.list("/docs").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn soft_deleted_entries_disappear_from_listing() {
        let store = MemoryMetadataStore::new();
        let file = store
            .create(&Entry::new_file("a.txt", "/", 1, "text/plain", None))
            .await
            .unwrap();

        store.soft_delete(&file.id).await.unwrap();
        assert!(store.list("/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blob_round_trip_and_missing_ref() {
        let store = MemoryBlobStore::new();
        let blob_ref = store.put(b"hello", "text/plain").await.unwrap();
        assert!(store.contains(&blob_ref));

        let url = store
            .get_retrieval_url(&blob_ref, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.starts_with("memory://blobs/"));

        store.delete(&blob_ref).await.unwrap();
        let err = store
            .get_retrieval_url(&blob_ref, Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
