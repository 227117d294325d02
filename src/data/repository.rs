use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::AppError;
use crate::models::entry::{Entry, EntryKind, Origin};
use crate::models::share::{FileSnapshot, SharePermission, ShareLink, ShareType};
use crate::vpath;

const ENTRY_COLUMNS: &str = "id, name, parent_path, kind, size, mime_type, created_at, \
     modified_at, last_accessed_at, is_important, is_deleted, origin, blob_ref, description";

const SHARE_COLUMNS: &str = "token, file_id, file_name, file_size, file_mime_type, file_path, \
     file_created_at, file_modified_at, file_blob_ref, share_type, permission, expires_at, \
     created_at, access_count, last_accessed_at, revoked";

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let kind: String = row.get(3)?;
    let origin: String = row.get(11)?;

    Ok(Entry {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_path: row.get(2)?,
        kind: kind.parse::<EntryKind>().unwrap_or(EntryKind::File),
        size: row.get(4)?,
        mime_type: row.get(5)?,
        created_at: row.get(6)?,
        modified_at: row.get(7)?,
        last_accessed_at: row.get(8)?,
        is_important: row.get(9)?,
        is_deleted: row.get(10)?,
        origin: origin.parse::<Origin>().unwrap_or(Origin::Local),
        blob_ref: row.get(12)?,
        description: row.get(13)?,
    })
}

fn share_from_row(row: &Row<'_>) -> rusqlite::Result<ShareLink> {
    let share_type: String = row.get(9)?;
    let permission: String = row.get(10)?;

    Ok(ShareLink {
        token: row.get(0)?,
        file_id: row.get(1)?,
        snapshot: FileSnapshot {
            file_id: row.get(1)?,
            name: row.get(2)?,
            size: row.get(3)?,
            mime_type: row.get(4)?,
            path: row.get(5)?,
            created_at: row.get(6)?,
            modified_at: row.get(7)?,
            blob_ref: row.get(8)?,
        },
        share_type: share_type.parse::<ShareType>().unwrap_or(ShareType::Private),
        permission: permission
            .parse::<SharePermission>()
            .unwrap_or(SharePermission::View),
        expires_at: row.get(11)?,
        created_at: row.get(12)?,
        access_count: row.get(13)?,
        last_accessed_at: row.get(14)?,
        revoked: row.get(15)?,
    })
}

/// Insert or replace an entry keyed by id. The parent path must already be
/// in normalized form; sibling-name uniqueness is the merge layer's job.
pub fn insert_entry(conn: &Connection, entry: &Entry) -> Result<(), AppError> {
    if !vpath::is_normalized(&entry.parent_path) {
        return Err(AppError::InvalidEntry(format!(
            "parent path is not normalized: {}",
            entry.parent_path
        )));
    }

    conn.execute(
        "INSERT OR REPLACE INTO entries (id, name, parent_path, kind, size, mime_type, \
         created_at, modified_at, last_accessed_at, is_important, is_deleted, origin, \
         blob_ref, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            entry.id,
            entry.name,
            entry.parent_path,
            entry.kind.to_string(),
            entry.size,
            entry.mime_type,
            entry.created_at,
            entry.modified_at,
            entry.last_accessed_at,
            entry.is_important,
            entry.is_deleted,
            entry.origin.to_string(),
            entry.blob_ref,
            entry.description,
        ],
    )?;
    Ok(())
}

pub fn get_entry(conn: &Connection, id: &str) -> Result<Option<Entry>, AppError> {
    let entry = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
            params![id],
            entry_from_row,
        )
        .optional()?;
    Ok(entry)
}

pub fn has_entry(conn: &Connection, id: &str) -> Result<bool, AppError> {
    Ok(get_entry(conn, id)?.is_some())
}

pub fn remove_entry(conn: &Connection, id: &str) -> Result<usize, AppError> {
    let count = conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
    Ok(count)
}

/// Non-deleted entries directly under the given parent path, folders first.
pub fn list_by_parent(conn: &Connection, parent_path: &str) -> Result<Vec<Entry>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM entries
         WHERE parent_path = ?1 AND is_deleted = 0
         ORDER BY CASE kind WHEN 'folder' THEN 0 ELSE 1 END, name COLLATE NOCASE ASC, id ASC"
    ))?;

    let entries = stmt
        .query_map(params![parent_path], entry_from_row)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(entries)
}

pub fn get_by_path(conn: &Connection, path: &str) -> Result<Option<Entry>, AppError> {
    let parent = vpath::parent_of(path)?;
    let name = vpath::file_name(path)?;
    let entry = conn
        .query_row(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM entries
                 WHERE parent_path = ?1 AND name = ?2 AND is_deleted = 0"
            ),
            params![parent, name],
            entry_from_row,
        )
        .optional()?;
    Ok(entry)
}

/// Case-sensitive sibling-name check among non-deleted entries.
pub fn sibling_exists(conn: &Connection, parent_path: &str, name: &str) -> Result<bool, AppError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE parent_path = ?1 AND name = ?2 AND is_deleted = 0",
        params![parent_path, name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn update_name(
    conn: &Connection,
    id: &str,
    new_name: &str,
    modified_at: DateTime<Utc>,
) -> Result<usize, AppError> {
    let count = conn.execute(
        "UPDATE entries SET name = ?2, modified_at = ?3 WHERE id = ?1",
        params![id, new_name, modified_at],
    )?;
    Ok(count)
}

pub fn update_parent(
    conn: &Connection,
    id: &str,
    new_parent_path: &str,
    modified_at: DateTime<Utc>,
) -> Result<usize, AppError> {
    if !vpath::is_normalized(new_parent_path) {
        return Err(AppError::InvalidEntry(format!(
            "parent path is not normalized: {new_parent_path}"
        )));
    }
    let count = conn.execute(
        "UPDATE entries SET parent_path = ?2, modified_at = ?3 WHERE id = ?1",
        params![id, new_parent_path, modified_at],
    )?;
    Ok(count)
}

/// Rewrite cached descendants after a folder rename or move: every entry
/// whose parent path is `old_path` or lies below it is re-rooted onto
/// `new_path`.
pub fn rewrite_descendants(
    conn: &Connection,
    old_path: &str,
    new_path: &str,
) -> Result<usize, AppError> {
    let mut stmt = conn.prepare("SELECT id, parent_path FROM entries")?;
    let rows: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .filter_map(|r| r.ok())
        .collect();

    let prefix = format!("{old_path}/");
    let mut rewritten = 0;
    for (id, parent_path) in rows {
        let replacement = if parent_path == old_path {
            new_path.to_string()
        } else if let Some(rest) = parent_path.strip_prefix(&prefix) {
            format!("{new_path}/{rest}")
        } else {
            continue;
        };
        conn.execute(
            "UPDATE entries SET parent_path = ?2 WHERE id = ?1",
            params![id, replacement],
        )?;
        rewritten += 1;
    }
    Ok(rewritten)
}

pub fn set_important(conn: &Connection, id: &str, important: bool) -> Result<usize, AppError> {
    let count = conn.execute(
        "UPDATE entries SET is_important = ?2 WHERE id = ?1",
        params![id, important],
    )?;
    Ok(count)
}

pub fn set_deleted(conn: &Connection, id: &str, deleted: bool) -> Result<usize, AppError> {
    let count = conn.execute(
        "UPDATE entries SET is_deleted = ?2 WHERE id = ?1",
        params![id, deleted],
    )?;
    Ok(count)
}

pub fn touch_accessed(
    conn: &Connection,
    id: &str,
    accessed_at: DateTime<Utc>,
) -> Result<usize, AppError> {
    let count = conn.execute(
        "UPDATE entries SET last_accessed_at = ?2 WHERE id = ?1",
        params![id, accessed_at],
    )?;
    Ok(count)
}

pub fn set_description(
    conn: &Connection,
    id: &str,
    description: Option<&str>,
) -> Result<usize, AppError> {
    let count = conn.execute(
        "UPDATE entries SET description = ?2 WHERE id = ?1",
        params![id, description],
    )?;
    Ok(count)
}

pub fn list_important(conn: &Connection) -> Result<Vec<Entry>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM entries
         WHERE is_important = 1 AND is_deleted = 0
         ORDER BY CASE kind WHEN 'folder' THEN 0 ELSE 1 END, name COLLATE NOCASE ASC, id ASC"
    ))?;
    let entries = stmt
        .query_map([], entry_from_row)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(entries)
}

/// Most recently accessed entries first.
pub fn list_recent(conn: &Connection, limit: usize) -> Result<Vec<Entry>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM entries
         WHERE last_accessed_at IS NOT NULL AND is_deleted = 0
         ORDER BY last_accessed_at DESC, id ASC LIMIT ?1"
    ))?;
    let entries = stmt
        .query_map(params![limit as i64], entry_from_row)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(entries)
}

pub fn list_deleted(conn: &Connection) -> Result<Vec<Entry>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM entries
         WHERE is_deleted = 1
         ORDER BY modified_at DESC, id ASC"
    ))?;
    let entries = stmt
        .query_map([], entry_from_row)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(entries)
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Substring match on entry name or containing path, case-insensitive for
/// ASCII, folders first.
pub fn search_entries(conn: &Connection, term: &str, limit: usize) -> Result<Vec<Entry>, AppError> {
    let pattern = format!("%{}%", escape_like(term));
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM entries
         WHERE is_deleted = 0
           AND (name LIKE ?1 ESCAPE '\\' OR parent_path LIKE ?1 ESCAPE '\\')
         ORDER BY CASE kind WHEN 'folder' THEN 0 ELSE 1 END, name COLLATE NOCASE ASC, id ASC
         LIMIT ?2"
    ))?;
    let entries = stmt
        .query_map(params![pattern, limit as i64], entry_from_row)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(entries)
}

/// Total bytes held by non-deleted files.
pub fn total_file_size(conn: &Connection) -> Result<i64, AppError> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(size), 0) FROM entries WHERE kind = 'file' AND is_deleted = 0",
        [],
        |row| row.get(0),
    )?;
    Ok(total)
}

pub fn count_by_kind(conn: &Connection) -> Result<(i64, i64), AppError> {
    let files: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE kind = 'file' AND is_deleted = 0",
        [],
        |row| row.get(0),
    )?;
    let folders: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE kind = 'folder' AND is_deleted = 0",
        [],
        |row| row.get(0),
    )?;
    Ok((files, folders))
}

/// Per-mime-type byte totals for non-deleted files.
pub fn size_by_mime_type(conn: &Connection) -> Result<Vec<(String, i64)>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT mime_type, COALESCE(SUM(size), 0) FROM entries
         WHERE kind = 'file' AND is_deleted = 0
         GROUP BY mime_type",
    )?;
    let totals = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(totals)
}

// --- share links ---

pub fn insert_share(conn: &Connection, link: &ShareLink) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO share_links (token, file_id, file_name, file_size, file_mime_type, \
         file_path, file_created_at, file_modified_at, file_blob_ref, share_type, permission, \
         expires_at, created_at, access_count, last_accessed_at, revoked)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            link.token,
            link.file_id,
            link.snapshot.name,
            link.snapshot.size,
            link.snapshot.mime_type,
            link.snapshot.path,
            link.snapshot.created_at,
            link.snapshot.modified_at,
            link.snapshot.blob_ref,
            link.share_type.to_string(),
            link.permission.to_string(),
            link.expires_at,
            link.created_at,
            link.access_count,
            link.last_accessed_at,
            link.revoked,
        ],
    )?;
    Ok(())
}

pub fn get_share_by_token(conn: &Connection, token: &str) -> Result<Option<ShareLink>, AppError> {
    let link = conn
        .query_row(
            &format!("SELECT {SHARE_COLUMNS} FROM share_links WHERE token = ?1"),
            params![token],
            share_from_row,
        )
        .optional()?;
    Ok(link)
}

/// Unrevoked links for a file, newest first. Expiry is the caller's check.
pub fn unrevoked_shares_for_file(
    conn: &Connection,
    file_id: &str,
) -> Result<Vec<ShareLink>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SHARE_COLUMNS} FROM share_links
         WHERE file_id = ?1 AND revoked = 0
         ORDER BY created_at DESC"
    ))?;
    let links = stmt
        .query_map(params![file_id], share_from_row)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(links)
}

pub fn list_unrevoked_shares(conn: &Connection) -> Result<Vec<ShareLink>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SHARE_COLUMNS} FROM share_links
         WHERE revoked = 0
         ORDER BY created_at DESC"
    ))?;
    let links = stmt
        .query_map([], share_from_row)?
        .filter_map(|r| r.ok())
        .collect();
    Ok(links)
}

pub fn revoke_shares_for_file(conn: &Connection, file_id: &str) -> Result<usize, AppError> {
    let count = conn.execute(
        "UPDATE share_links SET revoked = 1 WHERE file_id = ?1 AND revoked = 0",
        params![file_id],
    )?;
    Ok(count)
}

pub fn delete_share(conn: &Connection, token: &str) -> Result<usize, AppError> {
    let count = conn.execute("DELETE FROM share_links WHERE token = ?1", params![token])?;
    Ok(count)
}

pub fn record_share_access(
    conn: &Connection,
    token: &str,
    accessed_at: DateTime<Utc>,
) -> Result<usize, AppError> {
    let count = conn.execute(
        "UPDATE share_links SET access_count = access_count + 1, last_accessed_at = ?2
         WHERE token = ?1",
        params![token, accessed_at],
    )?;
    Ok(count)
}

pub fn delete_expired_shares(conn: &Connection, now: DateTime<Utc>) -> Result<usize, AppError> {
    let count = conn.execute(
        "DELETE FROM share_links WHERE expires_at IS NOT NULL AND expires_at <= ?1",
        params![now],
    )?;
    Ok(count)
}

// --- settings ---

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>, AppError> {
    let value = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<(), AppError> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::migrations::run_migrations;
    use crate::models::share::{SharePermission, ShareType};
    use chrono::Duration;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn sample_file(name: &str, parent: &str) -> Entry {
        Entry::new_file(name, parent, 1024, "text/plain", Some("blob-1".to_string()))
    }

    fn sample_share(file_id: &str, token: &str) -> ShareLink {
        let entry = sample_file("a.txt", "/docs");
        ShareLink {
            token: token.to_string(),
            file_id: file_id.to_string(),
            snapshot: FileSnapshot::capture(&entry),
            share_type: ShareType::Private,
            permission: SharePermission::View,
            expires_at: None,
            created_at: Utc::now(),
            access_count: 0,
            last_accessed_at: None,
            revoked: false,
        }
    }

    #[test]
    fn test_entry_crud() {
        let conn = setup_db();
        let file = sample_file("readme.md", "/docs");

        insert_entry(&conn, &file).unwrap();
        assert!(has_entry(&conn, &file.id).unwrap());

        let fetched = get_entry(&conn, &file.id).unwrap().unwrap();
        assert_eq!(fetched.name, "readme.md");
        assert_eq!(fetched.size, 1024);
        assert_eq!(fetched.kind, EntryKind::File);

        let list = list_by_parent(&conn, "/docs").unwrap();
        assert_eq!(list.len(), 1);

        remove_entry(&conn, &file.id).unwrap();
        assert!(!has_entry(&conn, &file.id).unwrap());
    }

    #[test]
    fn test_insert_rejects_unnormalized_parent() {
        let conn = setup_db();
        let mut file = sample_file("a.txt", "/docs");
        file.parent_path = "/docs/".to_string();

        let err = insert_entry(&conn, &file).unwrap_err();
        assert!(matches!(err, AppError::InvalidEntry(_)));
    }

    #[test]
    fn test_insert_is_upsert_by_id() {
        let conn = setup_db();
        let mut file = sample_file("a.txt", "/docs");
        insert_entry(&conn, &file).unwrap();

        file.size = 2048;
        insert_entry(&conn, &file).unwrap();

        let fetched = get_entry(&conn, &file.id).unwrap().unwrap();
        assert_eq!(fetched.size, 2048);
        assert_eq!(list_by_parent(&conn, "/docs").unwrap().len(), 1);
    }

    #[test]
    fn test_list_by_parent_sorts_folders_first() {
        let conn = setup_db();
        insert_entry(&conn, &sample_file("b.txt", "/docs")).unwrap();
        insert_entry(&conn, &Entry::new_folder("archive", "/docs")).unwrap();

        let list = list_by_parent(&conn, "/docs").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].is_folder());
        assert!(!list[1].is_folder());
    }

    #[test]
    fn test_list_by_parent_excludes_deleted() {
        let conn = setup_db();
        let file = sample_file("a.txt", "/docs");
        insert_entry(&conn, &file).unwrap();
        set_deleted(&conn, &file.id, true).unwrap();

        assert!(list_by_parent(&conn, "/docs").unwrap().is_empty());
        assert_eq!(list_deleted(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_sibling_exists_is_case_sensitive() {
        let conn = setup_db();
        insert_entry(&conn, &sample_file("Report.txt", "/docs")).unwrap();

        assert!(sibling_exists(&conn, "/docs", "Report.txt").unwrap());
        assert!(!sibling_exists(&conn, "/docs", "report.txt").unwrap());
    }

    #[test]
    fn test_rewrite_descendants_reroots_subtree() {
        let conn = setup_db();
        insert_entry(&conn, &Entry::new_folder("docs", "/")).unwrap();
        insert_entry(&conn, &sample_file("a.txt", "/docs")).unwrap();
        insert_entry(&conn, &Entry::new_folder("deep", "/docs/sub")).unwrap();

        let rewritten = rewrite_descendants(&conn, "/docs", "/papers").unwrap();
        assert_eq!(rewritten, 2);

        assert_eq!(list_by_parent(&conn, "/papers").unwrap().len(), 1);
        assert_eq!(list_by_parent(&conn, "/papers/sub").unwrap().len(), 1);
        assert!(list_by_parent(&conn, "/docs").unwrap().is_empty());
    }

    #[test]
    fn test_recent_ordering_and_limit() {
        let conn = setup_db();
        let now = Utc::now();
        for i in 0..5 {
            let file = sample_file(&format!("f{i}.txt"), "/");
            insert_entry(&conn, &file).unwrap();
            touch_accessed(&conn, &file.id, now + Duration::seconds(i)).unwrap();
        }

        let recent = list_recent(&conn, 3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].name, "f4.txt");
        assert_eq!(recent[2].name, "f2.txt");
    }

    #[test]
    fn test_search_escapes_like_metacharacters() {
        let conn = setup_db();
        insert_entry(&conn, &sample_file("100%_done.txt", "/")).unwrap();
        insert_entry(&conn, &sample_file("other.txt", "/")).unwrap();

        let hits = search_entries(&conn, "100%_", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "100%_done.txt");

        // an unescaped % would have matched everything
        let misses = search_entries(&conn, "%x%", 10).unwrap();
        assert!(misses.is_empty());
    }

    #[test]
    fn test_storage_aggregates() {
        let conn = setup_db();
        insert_entry(&conn, &Entry::new_folder("docs", "/")).unwrap();
        insert_entry(&conn, &sample_file("a.txt", "/docs")).unwrap();
        let deleted = sample_file("b.txt", "/docs");
        insert_entry(&conn, &deleted).unwrap();
        set_deleted(&conn, &deleted.id, true).unwrap();

        assert_eq!(total_file_size(&conn).unwrap(), 1024);
        assert_eq!(count_by_kind(&conn).unwrap(), (1, 1));

        let by_mime = size_by_mime_type(&conn).unwrap();
        assert_eq!(by_mime, vec![("text/plain".to_string(), 1024)]);
    }

    #[test]
    fn test_share_crud_and_access_recording() {
        let conn = setup_db();
        let link = sample_share("f1", "tok-1");
        insert_share(&conn, &link).unwrap();

        let fetched = get_share_by_token(&conn, "tok-1").unwrap().unwrap();
        assert_eq!(fetched.file_id, "f1");
        assert_eq!(fetched.access_count, 0);
        assert_eq!(fetched.snapshot.path, "/docs/a.txt");

        record_share_access(&conn, "tok-1", Utc::now()).unwrap();
        let fetched = get_share_by_token(&conn, "tok-1").unwrap().unwrap();
        assert_eq!(fetched.access_count, 1);
        assert!(fetched.last_accessed_at.is_some());

        delete_share(&conn, "tok-1").unwrap();
        assert!(get_share_by_token(&conn, "tok-1").unwrap().is_none());
    }

    #[test]
    fn test_revoke_shares_for_file_only_touches_that_file() {
        let conn = setup_db();
        insert_share(&conn, &sample_share("f1", "tok-1")).unwrap();
        insert_share(&conn, &sample_share("f2", "tok-2")).unwrap();

        let revoked = revoke_shares_for_file(&conn, "f1").unwrap();
        assert_eq!(revoked, 1);

        assert!(get_share_by_token(&conn, "tok-1").unwrap().unwrap().revoked);
        assert!(!get_share_by_token(&conn, "tok-2").unwrap().unwrap().revoked);
    }

    #[test]
    fn test_delete_expired_shares() {
        let conn = setup_db();
        let mut expired = sample_share("f1", "tok-old");
        expired.expires_at = Some(Utc::now() - Duration::hours(1));
        insert_share(&conn, &expired).unwrap();
        insert_share(&conn, &sample_share("f2", "tok-live")).unwrap();

        let purged = delete_expired_shares(&conn, Utc::now()).unwrap();
        assert_eq!(purged, 1);
        assert!(get_share_by_token(&conn, "tok-old").unwrap().is_none());
        assert!(get_share_by_token(&conn, "tok-live").unwrap().is_some());
    }

    #[test]
    fn test_settings_round_trip() {
        let conn = setup_db();
        assert!(get_setting(&conn, "view_mode").unwrap().is_none());

        set_setting(&conn, "view_mode", "list").unwrap();
        assert_eq!(
            get_setting(&conn, "view_mode").unwrap().as_deref(),
            Some("list")
        );

        set_setting(&conn, "view_mode", "grid").unwrap();
        assert_eq!(
            get_setting(&conn, "view_mode").unwrap().as_deref(),
            Some("grid")
        );
    }
}
