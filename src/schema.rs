//! DDL for the tables the jobs read and write.
//!
//! `TARGET` is applied by `init-target`; `LEGACY` and `NOTES` describe the
//! columns the jobs expect in the other two stores and are used to build
//! fixture databases in tests.

use anyhow::{Context, Result};
use rusqlite::Connection;

pub const TARGET: &str = "
CREATE TABLE IF NOT EXISTS project (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    published INTEGER NOT NULL DEFAULT 1,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS publication_collection_introduction (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    published INTEGER,
    original_filename TEXT
);

CREATE TABLE IF NOT EXISTS publication_collection_title (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    published INTEGER,
    original_filename TEXT
);

CREATE TABLE IF NOT EXISTS publication_collection (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES project(id),
    published INTEGER,
    name TEXT,
    legacy_id INTEGER,
    publication_collection_introduction_id INTEGER REFERENCES publication_collection_introduction(id),
    publication_collection_title_id INTEGER REFERENCES publication_collection_title(id)
);

CREATE TABLE IF NOT EXISTS publication_comment (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    published INTEGER,
    legacy_id TEXT,
    original_filename TEXT
);

CREATE TABLE IF NOT EXISTS publication (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    publication_collection_id INTEGER REFERENCES publication_collection(id),
    publication_comment_id INTEGER REFERENCES publication_comment(id),
    name TEXT,
    legacy_id TEXT,
    original_publication_date TEXT,
    genre TEXT,
    published INTEGER,
    original_filename TEXT
);

CREATE TABLE IF NOT EXISTS publication_manuscript (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    publication_id INTEGER NOT NULL REFERENCES publication(id),
    name TEXT,
    sort_order INTEGER,
    legacy_id TEXT,
    type INTEGER,
    section_id INTEGER,
    original_filename TEXT
);

CREATE TABLE IF NOT EXISTS publication_version (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    publication_id INTEGER NOT NULL REFERENCES publication(id),
    name TEXT,
    sort_order INTEGER,
    type INTEGER,
    legacy_id TEXT,
    section_id INTEGER,
    original_filename TEXT
);

CREATE TABLE IF NOT EXISTS publication_facsimile_collection (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT,
    description TEXT,
    number_of_pages INTEGER,
    start_page_number INTEGER,
    page_comment TEXT,
    external_url TEXT
);

CREATE TABLE IF NOT EXISTS publication_facsimile (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    publication_id INTEGER NOT NULL REFERENCES publication(id),
    publication_facsimile_collection_id INTEGER NOT NULL REFERENCES publication_facsimile_collection(id),
    publication_manuscript_id INTEGER REFERENCES publication_manuscript(id),
    section_id INTEGER NOT NULL DEFAULT 0,
    page_nr INTEGER,
    priority INTEGER,
    type INTEGER
);
";

pub const LEGACY: &str = "
CREATE TABLE IF NOT EXISTS publications_zts (
    zts_id INTEGER PRIMARY KEY,
    zts_title TEXT,
    zts_lansering INTEGER
);

CREATE TABLE IF NOT EXISTS publications (
    p_id INTEGER PRIMARY KEY,
    p_title TEXT,
    p_zts_id INTEGER,
    p_coll_id INTEGER,
    p_identifier TEXT,
    p_maskindatum TEXT,
    p_genre TEXT,
    p_FM TEXT
);

CREATE TABLE IF NOT EXISTS manuscripts (
    m_id INTEGER PRIMARY KEY,
    m_publication_id INTEGER,
    m_title TEXT,
    m_sort INTEGER,
    m_filename TEXT,
    m_type INTEGER,
    m_section_id TEXT
);

CREATE TABLE IF NOT EXISTS versions (
    v_id INTEGER PRIMARY KEY,
    v_publication_id INTEGER,
    v_title TEXT,
    v_sort INTEGER,
    v_type INTEGER,
    v_filename TEXT,
    v_section_id TEXT
);

CREATE TABLE IF NOT EXISTS facsimiles (
    publication_id INTEGER PRIMARY KEY,
    title TEXT,
    description TEXT,
    pages INTEGER,
    pre_page_count INTEGER,
    pages_comment TEXT,
    facs_url TEXT
);

CREATE TABLE IF NOT EXISTS facsimile_publications (
    publications_id INTEGER,
    section_id,
    facs_id INTEGER,
    page_nr INTEGER,
    priority INTEGER,
    type INTEGER,
    ms_id INTEGER
);

CREATE TABLE IF NOT EXISTS publications_group (
    group_id INTEGER PRIMARY KEY,
    sortOrder INTEGER
);

CREATE TABLE IF NOT EXISTS tableofcontents (
    title TEXT,
    toc_date TEXT,
    toc_linkID TEXT,
    sortOrder INTEGER,
    toc_zts_id INTEGER,
    toc_coll_id INTEGER,
    toc_group_id INTEGER
);
";

pub const NOTES: &str = "
CREATE TABLE IF NOT EXISTS document (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT,
    title TEXT
);

CREATE TABLE IF NOT EXISTS documentnote (
    id INTEGER PRIMARY KEY,
    document_id INTEGER,
    lemma TEXT
);
";

pub fn create_target_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(TARGET)
        .context("Failed to create target tables")
}

pub fn create_legacy_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(LEGACY)
        .context("Failed to create legacy tables")
}

pub fn create_notes_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(NOTES)
        .context("Failed to create notes tables")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<String>>>()
            .unwrap()
    }

    #[test]
    fn test_create_target_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_target_tables(&conn).unwrap();
        create_target_tables(&conn).unwrap();
        let names = table_names(&conn);
        assert_eq!(names.len(), 10);
        assert!(names.contains(&"publication_facsimile".to_string()));
    }

    #[test]
    fn test_create_legacy_and_notes_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_legacy_tables(&conn).unwrap();
        create_notes_tables(&conn).unwrap();
        let names = table_names(&conn);
        assert!(names.contains(&"tableofcontents".to_string()));
        assert!(names.contains(&"documentnote".to_string()));
    }
}
