use chrono::{DateTime, Utc};
use rusqlite::Connection;
use url::Url;

use crate::data::repository;
use crate::error::AppError;
use crate::models::entry::Entry;
use crate::models::share::{FileSnapshot, SharePermission, ShareLink, ShareType};

fn to_base36(mut n: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Token = base36 millisecond timestamp + 122 random bits, so tokens are
/// unguessable and never sequential.
pub fn generate_token() -> String {
    let timestamp = to_base36(Utc::now().timestamp_millis());
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{timestamp}_{random}")
}

/// Create a share link for the entry, replacing any existing ACTIVE link
/// for the same file: last writer wins, the old token becomes permanently
/// invalid. The snapshot is captured from the entry as passed in; later
/// changes to the live entry do not affect the link.
///
/// Callers serialize per file by holding the connection lock for the whole
/// call.
pub fn create_or_replace(
    conn: &Connection,
    entry: &Entry,
    share_type: ShareType,
    permission: SharePermission,
    expires_at: Option<DateTime<Utc>>,
) -> Result<ShareLink, AppError> {
    repository::revoke_shares_for_file(conn, &entry.id)?;

    let link = ShareLink {
        token: generate_token(),
        file_id: entry.id.clone(),
        snapshot: FileSnapshot::capture(entry),
        share_type,
        permission,
        expires_at,
        created_at: Utc::now(),
        access_count: 0,
        last_accessed_at: None,
        revoked: false,
    };
    repository::insert_share(conn, &link)?;
    Ok(link)
}

/// Resolve a token to its file snapshot, recording the access.
///
/// Expiry is re-checked on every call regardless of any previously seen
/// state; an expired link is purged on first hit and never comes back.
pub fn resolve(conn: &Connection, token: &str) -> Result<FileSnapshot, AppError> {
    let link = repository::get_share_by_token(conn, token)?
        .ok_or_else(|| AppError::NotFound(format!("share {token}")))?;

    if link.revoked {
        return Err(AppError::ShareRevoked);
    }
    if link.is_expired_at(Utc::now()) {
        repository::delete_share(conn, token)?;
        return Err(AppError::ShareExpired);
    }

    repository::record_share_access(conn, token, Utc::now())?;
    Ok(link.snapshot)
}

/// Revoke the file's ACTIVE share link, if any. Idempotent.
pub fn revoke(conn: &Connection, file_id: &str) -> Result<(), AppError> {
    repository::revoke_shares_for_file(conn, file_id)?;
    Ok(())
}

/// The ACTIVE link for a file, if one exists.
pub fn active_share_for_file(
    conn: &Connection,
    file_id: &str,
) -> Result<Option<ShareLink>, AppError> {
    let now = Utc::now();
    let links = repository::unrevoked_shares_for_file(conn, file_id)?;
    Ok(links.into_iter().find(|link| link.is_active_at(now)))
}

/// All ACTIVE links, newest first. Backs the shared section.
pub fn list_active(conn: &Connection) -> Result<Vec<ShareLink>, AppError> {
    let now = Utc::now();
    let links = repository::list_unrevoked_shares(conn)?;
    Ok(links
        .into_iter()
        .filter(|link| link.is_active_at(now))
        .collect())
}

/// Purge links whose expiry has passed. Expired links are unreachable via
/// `resolve` either way; this reclaims the rows.
pub fn cleanup_expired(conn: &Connection) -> Result<usize, AppError> {
    repository::delete_expired_shares(conn, Utc::now())
}

/// Canonical share URL: `<origin>/share/<token>`.
pub fn share_url(origin: &str, token: &str) -> String {
    format!("{}/share/{token}", origin.trim_end_matches('/'))
}

/// Extract a token from either URL form: a `/share/<token>` path or a
/// `?share=<token>` query parameter. Returns None when neither is present.
pub fn parse_share_url(input: &str) -> Option<String> {
    if let Some(query) = input.strip_prefix('?') {
        return url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, value)| key == "share" && !value.is_empty())
            .map(|(_, value)| value.into_owned());
    }

    let url = Url::parse(input).ok()?;
    if let Some(token) = url
        .query_pairs()
        .find(|(key, value)| key == "share" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
    {
        return Some(token);
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    let pos = segments.iter().position(|s| *s == "share")?;
    segments
        .get(pos + 1)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::migrations::run_migrations;
    use chrono::Duration;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn sample_file(name: &str) -> Entry {
        Entry::new_file(name, "/docs", 42, "text/plain", Some("blob-1".to_string()))
    }

    #[test]
    fn tokens_are_pairwise_distinct() {
        let mut tokens: Vec<String> = (0..64).map(|_| generate_token()).collect();
        tokens.sort();
        tokens.dedup();
        assert_eq!(tokens.len(), 64);
    }

    #[test]
    fn replace_revokes_the_previous_token() {
        let conn = setup_db();
        let entry = sample_file("a.txt");

        let first = create_or_replace(
            &conn,
            &entry,
            ShareType::Public,
            SharePermission::View,
            None,
        )
        .unwrap();
        let second = create_or_replace(
            &conn,
            &entry,
            ShareType::Private,
            SharePermission::Edit,
            Some(Utc::now() + Duration::hours(1)),
        )
        .unwrap();

        let err = resolve(&conn, &first.token).unwrap_err();
        assert!(matches!(err, AppError::ShareRevoked));

        let snapshot = resolve(&conn, &second.token).unwrap();
        assert_eq!(snapshot.name, "a.txt");
        let link = repository::get_share_by_token(&conn, &second.token)
            .unwrap()
            .unwrap();
        assert_eq!(link.permission, SharePermission::Edit);
    }

    #[test]
    fn at_most_one_active_link_per_file() {
        let conn = setup_db();
        let entry = sample_file("a.txt");

        let mut old_tokens = Vec::new();
        for _ in 0..5 {
            let link = create_or_replace(
                &conn,
                &entry,
                ShareType::Private,
                SharePermission::View,
                None,
            )
            .unwrap();
            old_tokens.push(link.token);
        }
        let current = old_tokens.pop().unwrap();

        let active = repository::unrevoked_shares_for_file(&conn, &entry.id).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].token, current);

        for token in &old_tokens {
            let err = resolve(&conn, token).unwrap_err();
            assert!(matches!(
                err,
                AppError::ShareRevoked | AppError::NotFound(_)
            ));
        }
    }

    #[test]
    fn resolve_counts_accesses() {
        let conn = setup_db();
        let entry = sample_file("a.txt");
        let link = create_or_replace(
            &conn,
            &entry,
            ShareType::Public,
            SharePermission::View,
            None,
        )
        .unwrap();

        resolve(&conn, &link.token).unwrap();
        resolve(&conn, &link.token).unwrap();

        let stored = repository::get_share_by_token(&conn, &link.token)
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_count, 2);
        assert!(stored.last_accessed_at.is_some());
    }

    #[test]
    fn expired_link_resolves_expired_and_stays_gone() {
        // link written directly to storage with a past
        // expiry, as under clock skew
        let conn = setup_db();
        let entry = sample_file("a.txt");
        let link = ShareLink {
            token: "skewed".to_string(),
            file_id: entry.id.clone(),
            snapshot: FileSnapshot::capture(&entry),
            share_type: ShareType::Public,
            permission: SharePermission::View,
            expires_at: Some(Utc::now() - Duration::seconds(1)),
            created_at: Utc::now(),
            access_count: 0,
            last_accessed_at: None,
            revoked: false,
        };
        repository::insert_share(&conn, &link).unwrap();

        let err = resolve(&conn, "skewed").unwrap_err();
        assert!(matches!(err, AppError::ShareExpired));

        // purged: no access was recorded, and the token never resurrects
        assert!(repository::get_share_by_token(&conn, "skewed")
            .unwrap()
            .is_none());
        let err = resolve(&conn, "skewed").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn sharing_survives_entry_deletion() {
        let conn = setup_db();
        let entry = sample_file("a.txt");
        let link = create_or_replace(
            &conn,
            &entry,
            ShareType::Public,
            SharePermission::View,
            None,
        )
        .unwrap();

        // the live entry is never persisted; the frozen snapshot resolves
        let snapshot = resolve(&conn, &link.token).unwrap();
        assert_eq!(snapshot.path, "/docs/a.txt");
        assert_eq!(snapshot.blob_ref.as_deref(), Some("blob-1"));
    }

    #[test]
    fn revoke_is_idempotent() {
        let conn = setup_db();
        let entry = sample_file("a.txt");

        revoke(&conn, &entry.id).unwrap(); // nothing to revoke
        let link = create_or_replace(
            &conn,
            &entry,
            ShareType::Private,
            SharePermission::View,
            None,
        )
        .unwrap();
        revoke(&conn, &entry.id).unwrap();
        revoke(&conn, &entry.id).unwrap();

        let err = resolve(&conn, &link.token).unwrap_err();
        assert!(matches!(err, AppError::ShareRevoked));
        assert!(active_share_for_file(&conn, &entry.id).unwrap().is_none());
    }

    #[test]
    fn cleanup_removes_only_expired_rows() {
        let conn = setup_db();
        let live = create_or_replace(
            &conn,
            &sample_file("live.txt"),
            ShareType::Public,
            SharePermission::View,
            Some(Utc::now() + Duration::hours(1)),
        )
        .unwrap();
        create_or_replace(
            &conn,
            &sample_file("dead.txt"),
            ShareType::Public,
            SharePermission::View,
            Some(Utc::now() - Duration::hours(1)),
        )
        .unwrap();

        let purged = cleanup_expired(&conn).unwrap();
        assert_eq!(purged, 1);
        assert!(resolve(&conn, &live.token).is_ok());
    }

    #[test]
    fn share_url_round_trips_through_both_forms() {
        let token = "m3x9_1f00dcafe";
        let url = share_url("https://box.example.com", token);
        assert_eq!(url, "https://box.example.com/share/m3x9_1f00dcafe");
        assert_eq!(parse_share_url(&url).as_deref(), Some(token));

        let query_form = format!("https://box.example.com/app?share={token}");
        assert_eq!(parse_share_url(&query_form).as_deref(), Some(token));

        let bare_query = format!("?share={token}");
        assert_eq!(parse_share_url(&bare_query).as_deref(), Some(token));
    }

    #[test]
    fn parse_rejects_urls_without_a_token() {
        assert!(parse_share_url("https://box.example.com/files").is_none());
        assert!(parse_share_url("https://box.example.com/share/").is_none());
        assert!(parse_share_url("?share=").is_none());
        assert!(parse_share_url("not a url").is_none());
    }
}
