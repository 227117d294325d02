use rusqlite::Connection;
use serde::Serialize;

use crate::data::repository;
use crate::error::AppError;

pub const DEFAULT_QUOTA_BYTES: i64 = 5 * 1024 * 1024 * 1024;

const QUOTA_SETTING_KEY: &str = "storage_quota_bytes";

#[derive(Debug, Clone, Serialize)]
pub struct StorageUsage {
    pub used: i64,
    pub quota: i64,
    pub available: i64,
    pub file_count: i64,
    pub folder_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub images: i64,
    pub videos: i64,
    pub audio: i64,
    pub documents: i64,
    pub other: i64,
}

pub fn quota(conn: &Connection) -> Result<i64, AppError> {
    let quota = repository::get_setting(conn, QUOTA_SETTING_KEY)?
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(DEFAULT_QUOTA_BYTES);
    Ok(quota)
}

pub fn set_quota(conn: &Connection, bytes: i64) -> Result<(), AppError> {
    if bytes <= 0 {
        return Err(AppError::InvalidEntry(format!(
            "quota must be positive, got {bytes}"
        )));
    }
    repository::set_setting(conn, QUOTA_SETTING_KEY, &bytes.to_string())
}

pub fn usage(conn: &Connection) -> Result<StorageUsage, AppError> {
    let used = repository::total_file_size(conn)?;
    let quota = quota(conn)?;
    let (file_count, folder_count) = repository::count_by_kind(conn)?;
    Ok(StorageUsage {
        used,
        quota,
        available: (quota - used).max(0),
        file_count,
        folder_count,
    })
}

/// Upload precondition: the locally known usage plus the incoming bytes
/// must fit the quota.
pub fn ensure_space(conn: &Connection, needed: i64) -> Result<(), AppError> {
    let usage = usage(conn)?;
    if needed > usage.available {
        return Err(AppError::InsufficientStorage {
            needed,
            available: usage.available,
        });
    }
    Ok(())
}

/// Byte totals per content category, for the storage breakdown view.
pub fn stats(conn: &Connection) -> Result<StorageStats, AppError> {
    let mut stats = StorageStats::default();
    for (mime_type, total) in repository::size_by_mime_type(conn)? {
        match category_for_mime(&mime_type) {
            "images" => stats.images += total,
            "videos" => stats.videos += total,
            "audio" => stats.audio += total,
            "documents" => stats.documents += total,
            _ => stats.other += total,
        }
    }
    Ok(stats)
}

fn category_for_mime(mime_type: &str) -> &'static str {
    if mime_type.starts_with("image/") {
        "images"
    } else if mime_type.starts_with("video/") {
        "videos"
    } else if mime_type.starts_with("audio/") {
        "audio"
    } else if mime_type.starts_with("text/")
        || mime_type == "application/pdf"
        || mime_type == "application/msword"
        || mime_type.starts_with("application/vnd.")
    {
        "documents"
    } else {
        "other"
    }
}
