use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::data::repository;
use crate::error::AppError;

const VIEW_MODE_KEY: &str = "view_mode";
const SORT_BY_KEY: &str = "sort_by";
const SORT_ORDER_KEY: &str = "sort_order";

const VIEW_MODES: &[&str] = &["grid", "list"];
const SORT_FIELDS: &[&str] = &["name", "size", "modified"];
const SORT_ORDERS: &[&str] = &["asc", "desc"];

/// Presentation preferences persisted alongside the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPrefs {
    pub view_mode: String,
    pub sort_by: String,
    pub sort_order: String,
}

impl Default for ViewPrefs {
    fn default() -> Self {
        Self {
            view_mode: "grid".to_string(),
            sort_by: "name".to_string(),
            sort_order: "asc".to_string(),
        }
    }
}

pub fn view_prefs(conn: &Connection) -> Result<ViewPrefs, AppError> {
    let defaults = ViewPrefs::default();
    Ok(ViewPrefs {
        view_mode: repository::get_setting(conn, VIEW_MODE_KEY)?.unwrap_or(defaults.view_mode),
        sort_by: repository::get_setting(conn, SORT_BY_KEY)?.unwrap_or(defaults.sort_by),
        sort_order: repository::get_setting(conn, SORT_ORDER_KEY)?.unwrap_or(defaults.sort_order),
    })
}

pub fn save_view_prefs(conn: &Connection, prefs: &ViewPrefs) -> Result<(), AppError> {
    validate_choice("view_mode", &prefs.view_mode, VIEW_MODES)?;
    validate_choice("sort_by", &prefs.sort_by, SORT_FIELDS)?;
    validate_choice("sort_order", &prefs.sort_order, SORT_ORDERS)?;

    repository::set_setting(conn, VIEW_MODE_KEY, &prefs.view_mode)?;
    repository::set_setting(conn, SORT_BY_KEY, &prefs.sort_by)?;
    repository::set_setting(conn, SORT_ORDER_KEY, &prefs.sort_order)?;
    Ok(())
}

fn validate_choice(field: &str, value: &str, allowed: &[&str]) -> Result<(), AppError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(AppError::InvalidEntry(format!(
        "{field} must be one of {allowed:?}, got {value}"
    )))
}
