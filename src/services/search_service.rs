use rusqlite::Connection;

use crate::data::repository;
use crate::error::AppError;
use crate::models::entry::Entry;

pub const DEFAULT_SEARCH_LIMIT: usize = 100;

/// Substring search over the cached namespace, matching entry names and
/// containing paths. Folders sort first; an empty query returns nothing.
pub fn search(conn: &Connection, query: &str, limit: usize) -> Result<Vec<Entry>, AppError> {
    let trimmed = query.trim();
    if trimmed.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    repository::search_entries(conn, trimmed, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::migrations::run_migrations;
    use crate::models::entry::Entry;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn insert_file(conn: &Connection, name: &str, parent: &str) {
        repository::insert_entry(conn, &Entry::new_file(name, parent, 1, "text/plain", None))
            .unwrap();
    }

    #[test]
    fn matches_names_case_insensitively() {
        let conn = setup_db();
        insert_file(&conn, "Invoice-2024.pdf", "/docs");
        insert_file(&conn, "notes.txt", "/docs");

        let hits = search(&conn, "invoice", DEFAULT_SEARCH_LIMIT).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Invoice-2024.pdf");
    }

    #[test]
    fn matches_containing_path() {
        let conn = setup_db();
        insert_file(&conn, "a.txt", "/projects/alpha");
        insert_file(&conn, "b.txt", "/other");

        let hits = search(&conn, "alpha", DEFAULT_SEARCH_LIMIT).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "a.txt");
    }

    #[test]
    fn folders_sort_before_files() {
        let conn = setup_db();
        insert_file(&conn, "report.txt", "/");
        repository::insert_entry(&conn, &Entry::new_folder("reports", "/")).unwrap();

        let hits = search(&conn, "report", DEFAULT_SEARCH_LIMIT).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].is_folder());
    }

    #[test]
    fn empty_query_returns_nothing() {
        let conn = setup_db();
        insert_file(&conn, "a.txt", "/");

        assert!(search(&conn, "", DEFAULT_SEARCH_LIMIT).unwrap().is_empty());
        assert!(search(&conn, "   ", DEFAULT_SEARCH_LIMIT).unwrap().is_empty());
        assert!(search(&conn, "a", 0).unwrap().is_empty());
    }

    #[test]
    fn limit_caps_the_result() {
        let conn = setup_db();
        for i in 0..20 {
            insert_file(&conn, &format!("common_{i}.txt"), "/");
        }

        let hits = search(&conn, "common", 5).unwrap();
        assert_eq!(hits.len(), 5);
    }
}
