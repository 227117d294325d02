use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    #[error("name conflict: {0}")]
    Conflict(String),

    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("share link expired")]
    ShareExpired,

    #[error("share link revoked")]
    ShareRevoked,

    #[error("metadata corruption: {0}")]
    MetadataCorruption(String),

    #[error("insufficient storage: need {needed} bytes, {available} available")]
    InsufficientStorage { needed: i64, available: i64 },
}

impl AppError {
    /// Retryable failures are transient store outages; everything else is a
    /// definitive answer for the attempted operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::RemoteUnavailable(_))
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
