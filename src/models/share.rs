use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::entry::{Entry, EntryKind, Origin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareType {
    Private,
    Public,
}

impl std::fmt::Display for ShareType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::Public => write!(f, "public"),
        }
    }
}

impl std::str::FromStr for ShareType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            _ => Err(format!("unknown share type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    View,
    Edit,
    Comment,
}

impl std::fmt::Display for SharePermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::Edit => write!(f, "edit"),
            Self::Comment => write!(f, "comment"),
        }
    }
}

impl std::str::FromStr for SharePermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Self::View),
            "edit" => Ok(Self::Edit),
            "comment" => Ok(Self::Comment),
            _ => Err(format!("unknown share permission: {s}")),
        }
    }
}

/// Immutable copy of an entry's descriptive fields, captured at share time.
/// Changes to the live entry never affect an existing share link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub file_id: String,
    pub name: String,
    pub size: i64,
    pub mime_type: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub blob_ref: Option<String>,
}

impl FileSnapshot {
    pub fn capture(entry: &Entry) -> Self {
        Self {
            file_id: entry.id.clone(),
            name: entry.name.clone(),
            size: entry.size,
            mime_type: entry.mime_type.clone(),
            path: entry.path(),
            created_at: entry.created_at,
            modified_at: entry.modified_at,
            blob_ref: entry.blob_ref.clone(),
        }
    }

    /// Project the snapshot back into an entry-shaped record for listing in
    /// the shared section.
    pub fn to_entry(&self) -> Entry {
        Entry {
            id: self.file_id.clone(),
            name: self.name.clone(),
            parent_path: crate::vpath::parent_of(&self.path)
                .unwrap_or_else(|_| crate::vpath::ROOT.to_string()),
            kind: EntryKind::File,
            size: self.size,
            mime_type: self.mime_type.clone(),
            created_at: self.created_at,
            modified_at: self.modified_at,
            last_accessed_at: None,
            is_important: false,
            is_deleted: false,
            origin: Origin::Remote,
            blob_ref: self.blob_ref.clone(),
            description: None,
        }
    }
}

/// A shareable link bound to a file snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLink {
    pub token: String,
    pub file_id: String,
    pub snapshot: FileSnapshot,
    pub share_type: ShareType,
    pub permission: SharePermission,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub access_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub revoked: bool,
}

impl ShareLink {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if expiry <= now)
    }

    /// ACTIVE means neither revoked nor past its expiry.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot() -> FileSnapshot {
        let entry = Entry::new_file("a.txt", "/docs", 42, "text/plain", Some("blob-1".into()));
        FileSnapshot::capture(&entry)
    }

    #[test]
    fn snapshot_freezes_entry_fields() {
        let mut entry = Entry::new_file("a.txt", "/docs", 42, "text/plain", None);
        let snap = FileSnapshot::capture(&entry);

        entry.name = "renamed.txt".to_string();
        entry.size = 99;

        assert_eq!(snap.name, "a.txt");
        assert_eq!(snap.size, 42);
        assert_eq!(snap.path, "/docs/a.txt");
    }

    #[test]
    fn snapshot_projects_back_to_entry() {
        let entry = snapshot().to_entry();
        assert_eq!(entry.name, "a.txt");
        assert_eq!(entry.parent_path, "/docs");
        assert_eq!(entry.blob_ref.as_deref(), Some("blob-1"));
    }

    #[test]
    fn active_state_accounts_for_expiry_and_revocation() {
        let now = Utc::now();
        let mut link = ShareLink {
            token: "t".to_string(),
            file_id: "f".to_string(),
            snapshot: snapshot(),
            share_type: ShareType::Public,
            permission: SharePermission::View,
            expires_at: None,
            created_at: now,
            access_count: 0,
            last_accessed_at: None,
            revoked: false,
        };
        assert!(link.is_active_at(now));

        link.expires_at = Some(now - Duration::seconds(1));
        assert!(link.is_expired_at(now));
        assert!(!link.is_active_at(now));

        link.expires_at = Some(now + Duration::hours(1));
        link.revoked = true;
        assert!(!link.is_active_at(now));
    }
}
