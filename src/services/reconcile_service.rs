use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;

use crate::data::repository;
use crate::error::AppError;
use crate::models::entry::Entry;
use crate::models::navigation::Section;
use crate::services::share_service;
use crate::stores::MetadataStore;
use crate::vpath;

/// Cap on the recent-files projection.
pub const RECENT_LIMIT: usize = 50;

/// Bound on how long the merge waits for the remote listing before serving
/// local entries only.
pub const REMOTE_WAIT: Duration = Duration::from_secs(4);

/// Produce the ordered list of entries visible at (section, path).
///
/// FILES merges the remote listing with the local cache; every other
/// section is its own read path over the cache or the share store. A
/// missing remote never raises — the only merge failure is
/// `MetadataCorruption`, which callers must surface as a load error rather
/// than an empty folder.
pub async fn list_section<M: MetadataStore>(
    db: &Mutex<Connection>,
    meta: &M,
    section: Section,
    path: &str,
) -> Result<Vec<Entry>, AppError> {
    match section {
        Section::Files => list_files(db, meta, path).await,
        Section::Shared => {
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let links = share_service::list_active(&conn)?;
            Ok(links.iter().map(|link| link.snapshot.to_entry()).collect())
        }
        Section::Recent => {
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            repository::list_recent(&conn, RECENT_LIMIT)
        }
        Section::Important => {
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            repository::list_important(&conn)
        }
        Section::Deleted => {
            let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            repository::list_deleted(&conn)
        }
    }
}

async fn list_files<M: MetadataStore>(
    db: &Mutex<Connection>,
    meta: &M,
    path: &str,
) -> Result<Vec<Entry>, AppError> {
    let path = vpath::normalize(path)?;

    let local = {
        let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        repository::list_by_parent(&conn, &path)?
    };

    let remote = match tokio::time::timeout(REMOTE_WAIT, meta.list(&path)).await {
        Ok(Ok(entries)) => entries,
        Ok(Err(err)) => {
            tracing::warn!(%path, error = %err, "remote listing failed, serving local entries only");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(%path, "remote listing timed out, serving local entries only");
            Vec::new()
        }
    };

    merge(remote, local)
}

/// Merge remote and local entries for one folder. Remote entries take
/// precedence: a local entry is included only when no remote entry shares
/// its name under the same parent (case-sensitive).
pub fn merge(remote: Vec<Entry>, local: Vec<Entry>) -> Result<Vec<Entry>, AppError> {
    for entry in remote.iter().chain(local.iter()) {
        if !vpath::is_normalized(&entry.parent_path) {
            return Err(AppError::MetadataCorruption(format!(
                "entry {} has unnormalized parent path {:?}",
                entry.id, entry.parent_path
            )));
        }
        if vpath::validate_name(&entry.name).is_err() {
            return Err(AppError::MetadataCorruption(format!(
                "entry {} has invalid name {:?}",
                entry.id, entry.name
            )));
        }
    }

    let remote_names: HashSet<(&str, &str)> = remote
        .iter()
        .map(|e| (e.parent_path.as_str(), e.name.as_str()))
        .collect();

    let unshadowed: Vec<Entry> = local
        .into_iter()
        .filter(|e| !remote_names.contains(&(e.parent_path.as_str(), e.name.as_str())))
        .collect();

    let mut merged = remote;
    merged.extend(unshadowed);
    sort_entries(&mut merged);
    Ok(merged)
}

/// Folders before files, then ascending case-insensitive name, ties broken
/// by id for a deterministic ordering.
pub fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.id.cmp(&b.id))
    });
}
