use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vpath;

/// Sentinel mime type for folders.
pub const FOLDER_MIME_TYPE: &str = "application/x-directory";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Folder => write!(f, "folder"),
        }
    }
}

impl std::str::FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "folder" => Ok(Self::Folder),
            _ => Err(format!("unknown entry kind: {s}")),
        }
    }
}

/// Which backing store holds the authoritative copy of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Remote,
    Local,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Local => write!(f, "local"),
        }
    }
}

impl std::str::FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            _ => Err(format!("unknown origin: {s}")),
        }
    }
}

/// A file or folder record in the virtual filesystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub name: String,
    pub parent_path: String,
    pub kind: EntryKind,
    pub size: i64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub is_important: bool,
    pub is_deleted: bool,
    pub origin: Origin,
    pub blob_ref: Option<String>,
    pub description: Option<String>,
}

impl Entry {
    pub fn new_folder(name: &str, parent_path: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            parent_path: parent_path.to_string(),
            kind: EntryKind::Folder,
            size: 0,
            mime_type: FOLDER_MIME_TYPE.to_string(),
            created_at: now,
            modified_at: now,
            last_accessed_at: None,
            is_important: false,
            is_deleted: false,
            origin: Origin::Remote,
            blob_ref: None,
            description: None,
        }
    }

    pub fn new_file(
        name: &str,
        parent_path: &str,
        size: i64,
        mime_type: &str,
        blob_ref: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            parent_path: parent_path.to_string(),
            kind: EntryKind::File,
            size,
            mime_type: mime_type.to_string(),
            created_at: now,
            modified_at: now,
            last_accessed_at: None,
            is_important: false,
            is_deleted: false,
            origin: Origin::Remote,
            blob_ref,
            description: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    /// Full normalized path of this entry: parent joined with name.
    pub fn path(&self) -> String {
        if self.parent_path == vpath::ROOT {
            format!("/{}", self.name)
        } else {
            format!("{}/{}", self.parent_path, self.name)
        }
    }
}
