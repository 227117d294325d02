use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::Connection;

use crate::data::repository;
use crate::error::AppError;
use crate::models::entry::{Entry, Origin};
use crate::services::storage_service;
use crate::stores::{BlobStore, MetadataStore};
use crate::vpath;

/// Create a folder under `parent_path`. The remote store is authoritative;
/// when it is unreachable the folder is kept in the local cache with LOCAL
/// origin, to be superseded by an equally named remote entry once one
/// becomes visible.
pub async fn create_folder<M: MetadataStore>(
    meta: &M,
    db: &Mutex<Connection>,
    parent_path: &str,
    name: &str,
) -> Result<Entry, AppError> {
    let parent = vpath::normalize(parent_path)?;
    vpath::validate_name(name)?;

    {
        let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ensure_local_parent_is_folder(&conn, &parent)?;
        if repository::sibling_exists(&conn, &parent, name)? {
            return Err(AppError::Conflict(format!(
                "{name} already exists under {parent}"
            )));
        }
    }

    let entry = Entry::new_folder(name, &parent);
    match meta.create(&entry).await {
        Ok(created) => Ok(created),
        Err(err) if err.is_retryable() => {
            tracing::warn!(%parent, %name, error = %err, "remote create failed, keeping folder in the local cache");
            let mut local = entry;
            local.origin = Origin::Local;
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            repository::insert_entry(&conn, &local)?;
            Ok(local)
        }
        Err(err) => Err(err),
    }
}

/// Upload file content: blob put first, then the metadata create referencing
/// the resulting blob. A blob orphaned by a late metadata failure is left in
/// place. When the metadata store is unreachable the entry lands in the
/// local cache, carrying the blob reference if the put succeeded.
pub async fn upload<M: MetadataStore, B: BlobStore>(
    meta: &M,
    blob: &B,
    db: &Mutex<Connection>,
    parent_path: &str,
    name: &str,
    bytes: &[u8],
    content_type: Option<&str>,
) -> Result<Entry, AppError> {
    let parent = vpath::normalize(parent_path)?;
    vpath::validate_name(name)?;

    {
        let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ensure_local_parent_is_folder(&conn, &parent)?;
        if repository::sibling_exists(&conn, &parent, name)? {
            return Err(AppError::Conflict(format!(
                "{name} already exists under {parent}"
            )));
        }
        storage_service::ensure_space(&conn, bytes.len() as i64)?;
    }

    let mime_type = match content_type {
        Some(mime) if !mime.is_empty() => mime.to_string(),
        _ => mime_guess::from_path(name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    };

    let blob_ref = match blob.put(bytes, &mime_type).await {
        Ok(blob_ref) => Some(blob_ref),
        Err(err) if err.is_retryable() => {
            tracing::warn!(%name, error = %err, "blob store unreachable, uploading metadata without content");
            None
        }
        Err(err) => return Err(err),
    };

    let entry = Entry::new_file(name, &parent, bytes.len() as i64, &mime_type, blob_ref);
    match meta.create(&entry).await {
        Ok(created) => Ok(created),
        Err(err) if err.is_retryable() => {
            tracing::warn!(%parent, %name, error = %err, "remote create failed, keeping file in the local cache");
            let mut local = entry;
            local.origin = Origin::Local;
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            repository::insert_entry(&conn, &local)?;
            Ok(local)
        }
        Err(err) => {
            if let Some(blob_ref) = &entry.blob_ref {
                tracing::warn!(%blob_ref, "orphaned blob left behind after failed metadata create");
            }
            Err(err)
        }
    }
}

/// Rename an entry. The conflict check runs before any mutation, so a
/// failed rename leaves the filesystem unchanged.
pub async fn rename<M: MetadataStore>(
    meta: &M,
    db: &Mutex<Connection>,
    entry: &Entry,
    new_name: &str,
) -> Result<Entry, AppError> {
    vpath::validate_name(new_name)?;
    if new_name == entry.name {
        return Ok(entry.clone());
    }

    {
        let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if repository::sibling_exists(&conn, &entry.parent_path, new_name)? {
            return Err(AppError::Conflict(format!(
                "{new_name} already exists under {}",
                entry.parent_path
            )));
        }
    }

    let old_path = entry.path();
    let new_path = vpath::join(&entry.parent_path, new_name)?;

    match entry.origin {
        Origin::Remote => {
            let renamed = meta.rename(&entry.id, new_name).await?;
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            mirror_rename(&conn, entry, new_name, &old_path, &new_path)?;
            Ok(renamed)
        }
        Origin::Local => {
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if !repository::has_entry(&conn, &entry.id)? {
                return Err(AppError::NotFound(format!("entry {}", entry.id)));
            }
            mirror_rename(&conn, entry, new_name, &old_path, &new_path)?;
            repository::get_entry(&conn, &entry.id)?
                .ok_or_else(|| AppError::NotFound(format!("entry {}", entry.id)))
        }
    }
}

fn mirror_rename(
    conn: &Connection,
    entry: &Entry,
    new_name: &str,
    old_path: &str,
    new_path: &str,
) -> Result<(), AppError> {
    if repository::has_entry(conn, &entry.id)? {
        repository::update_name(conn, &entry.id, new_name, Utc::now())?;
        if entry.is_folder() {
            repository::rewrite_descendants(conn, old_path, new_path)?;
        }
    }
    Ok(())
}

/// Move an entry to another folder. Rejects moving a folder into itself or
/// any of its descendants.
pub async fn move_entry<M: MetadataStore>(
    meta: &M,
    db: &Mutex<Connection>,
    entry: &Entry,
    new_parent_path: &str,
) -> Result<Entry, AppError> {
    let dest = vpath::normalize(new_parent_path)?;
    if dest == entry.parent_path {
        return Ok(entry.clone());
    }

    if entry.is_folder() {
        let own_path = entry.path();
        if dest == own_path || vpath::is_descendant(&dest, &own_path)? {
            return Err(AppError::InvalidPath(format!(
                "cannot move {own_path} into itself"
            )));
        }
    }

    {
        let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ensure_local_parent_is_folder(&conn, &dest)?;
        if repository::sibling_exists(&conn, &dest, &entry.name)? {
            return Err(AppError::Conflict(format!(
                "{} already exists under {dest}",
                entry.name
            )));
        }
    }

    let old_path = entry.path();
    let new_path = vpath::join(&dest, &entry.name)?;

    match entry.origin {
        Origin::Remote => {
            let moved = meta.move_entry(&entry.id, &dest).await?;
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            mirror_move(&conn, entry, &dest, &old_path, &new_path)?;
            Ok(moved)
        }
        Origin::Local => {
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if !repository::has_entry(&conn, &entry.id)? {
                return Err(AppError::NotFound(format!("entry {}", entry.id)));
            }
            mirror_move(&conn, entry, &dest, &old_path, &new_path)?;
            repository::get_entry(&conn, &entry.id)?
                .ok_or_else(|| AppError::NotFound(format!("entry {}", entry.id)))
        }
    }
}

fn mirror_move(
    conn: &Connection,
    entry: &Entry,
    dest: &str,
    old_path: &str,
    new_path: &str,
) -> Result<(), AppError> {
    if repository::has_entry(conn, &entry.id)? {
        repository::update_parent(conn, &entry.id, dest, Utc::now())?;
        if entry.is_folder() {
            repository::rewrite_descendants(conn, old_path, new_path)?;
        }
    }
    Ok(())
}

/// Soft-delete an entry. Remote entries keep a tombstone copy in the cache
/// so the deleted section can list them. Existing share links are left
/// alone: a share resolves its frozen snapshot regardless of the live
/// entry's fate.
pub async fn soft_delete<M: MetadataStore>(
    meta: &M,
    db: &Mutex<Connection>,
    entry: &Entry,
) -> Result<(), AppError> {
    match entry.origin {
        Origin::Remote => {
            meta.soft_delete(&entry.id).await?;
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let mut tombstone = entry.clone();
            tombstone.is_deleted = true;
            tombstone.modified_at = Utc::now();
            repository::insert_entry(&conn, &tombstone)?;
        }
        Origin::Local => {
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if repository::set_deleted(&conn, &entry.id, true)? == 0 {
                return Err(AppError::NotFound(format!("entry {}", entry.id)));
            }
        }
    }
    Ok(())
}

/// Restore a soft-deleted entry in the cache. Re-activating a REMOTE copy
/// is the remote store's concern.
pub fn restore(db: &Mutex<Connection>, id: &str) -> Result<(), AppError> {
    let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if repository::set_deleted(&conn, id, false)? == 0 {
        return Err(AppError::NotFound(format!("entry {id}")));
    }
    Ok(())
}

/// Remove an entry permanently, deleting its blob best-effort. Share links
/// for the file stay resolvable through their snapshots.
pub async fn delete_permanently<B: BlobStore>(
    blob: &B,
    db: &Mutex<Connection>,
    entry: &Entry,
) -> Result<(), AppError> {
    if let Some(blob_ref) = &entry.blob_ref {
        if let Err(err) = blob.delete(blob_ref).await {
            tracing::warn!(%blob_ref, error = %err, "blob delete failed, leaving content behind");
        }
    }

    let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    repository::remove_entry(&conn, &entry.id)?;
    Ok(())
}

/// Flip the important flag. Remote entries get a copy upserted into the
/// cache so the important section can serve them offline.
pub fn toggle_important(db: &Mutex<Connection>, entry: &Entry) -> Result<bool, AppError> {
    let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    match repository::get_entry(&conn, &entry.id)? {
        Some(cached) => {
            let flipped = !cached.is_important;
            repository::set_important(&conn, &entry.id, flipped)?;
            Ok(flipped)
        }
        None => {
            let mut copy = entry.clone();
            copy.is_important = !entry.is_important;
            repository::insert_entry(&conn, &copy)?;
            Ok(copy.is_important)
        }
    }
}

/// Record an access for the recent-files projection, copying the entry into
/// the cache when it is not there yet.
pub fn record_access(db: &Mutex<Connection>, entry: &Entry) -> Result<(), AppError> {
    let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let now = Utc::now();
    if repository::has_entry(&conn, &entry.id)? {
        repository::touch_accessed(&conn, &entry.id, now)?;
    } else {
        let mut copy = entry.clone();
        copy.last_accessed_at = Some(now);
        repository::insert_entry(&conn, &copy)?;
    }
    Ok(())
}

pub fn set_description(
    db: &Mutex<Connection>,
    id: &str,
    description: Option<&str>,
) -> Result<(), AppError> {
    let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if repository::set_description(&conn, id, description)? == 0 {
        return Err(AppError::NotFound(format!("entry {id}")));
    }
    Ok(())
}

/// Time-limited retrieval URL for a file's content; the access is recorded
/// for the recent-files projection.
pub async fn download_url<B: BlobStore>(
    blob: &B,
    db: &Mutex<Connection>,
    entry: &Entry,
    ttl: Duration,
) -> Result<String, AppError> {
    let blob_ref = entry
        .blob_ref
        .as_deref()
        .ok_or_else(|| AppError::NotFound(format!("entry {} has no stored content", entry.id)))?;

    let url = blob.get_retrieval_url(blob_ref, ttl).await?;
    record_access(db, entry)?;
    Ok(url)
}

/// Local-side parent validation: the parent must be root or, when the cache
/// knows the path, a folder. Unknown paths pass — the remote store is
/// authoritative for entries the cache has never seen.
fn ensure_local_parent_is_folder(conn: &Connection, parent: &str) -> Result<(), AppError> {
    if parent == vpath::ROOT {
        return Ok(());
    }
    if let Some(existing) = repository::get_by_path(conn, parent)? {
        if !existing.is_folder() {
            return Err(AppError::InvalidPath(format!(
                "{parent} is not a folder"
            )));
        }
    }
    Ok(())
}
