use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::vpath;

/// Top-level view sections. FILES is the only path-addressed section; the
/// others are flat projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Files,
    Shared,
    Recent,
    Important,
    Deleted,
}

impl Default for Section {
    fn default() -> Self {
        Self::Files
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Files => write!(f, "files"),
            Self::Shared => write!(f, "shared"),
            Self::Recent => write!(f, "recent"),
            Self::Important => write!(f, "important"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

impl std::str::FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "files" => Ok(Self::Files),
            "shared" => Ok(Self::Shared),
            "recent" => Ok(Self::Recent),
            "important" => Ok(Self::Important),
            "deleted" => Ok(Self::Deleted),
            _ => Err(format!("unknown section: {s}")),
        }
    }
}

/// Persisted UI address: `path` is omitted at root, `section` is omitted
/// for the default FILES section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub section: Section,
    pub path: String,
}

impl Default for Address {
    fn default() -> Self {
        Self {
            section: Section::Files,
            path: vpath::ROOT.to_string(),
        }
    }
}

impl Address {
    pub fn new(section: Section, path: &str) -> Result<Self, AppError> {
        Ok(Self {
            section,
            path: vpath::normalize(path)?,
        })
    }

    /// Query-string form, without a leading `?`. Empty for the default
    /// address.
    pub fn to_query(&self) -> String {
        let mut params = Vec::new();
        if self.path != vpath::ROOT {
            params.push(format!("path={}", urlencoding::encode(&self.path)));
        }
        if self.section != Section::Files {
            params.push(format!("section={}", self.section));
        }
        params.join("&")
    }

    /// Parse a query string, with or without the leading `?`. Unknown
    /// parameters are ignored; missing ones fall back to the defaults.
    pub fn parse_query(query: &str) -> Result<Self, AppError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut address = Address::default();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "path" => {
                    let decoded = urlencoding::decode(value)
                        .map_err(|e| AppError::InvalidPath(e.to_string()))?;
                    address.path = vpath::normalize(&decoded)?;
                }
                "section" => {
                    address.section = value
                        .parse()
                        .map_err(|e: String| AppError::InvalidPath(e))?;
                }
                _ => {}
            }
        }

        Ok(address)
    }
}
