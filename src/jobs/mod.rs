//! Migration jobs, one module per CLI subcommand.
//!
//! Every job receives its store handles from the caller, writes to the
//! target inside a single transaction and commits once at the end.

pub mod comments;
pub mod facsimile_urls;
pub mod facsimiles;
pub mod introductions;
pub mod lfb_comment_documents;
pub mod main_tables;
pub mod manuscript_paths;
pub mod manuscripts_versions;
pub mod notes;
pub mod publication_paths;
pub mod split_lfb;
pub mod split_lfb_comments;
pub mod toc;
pub mod version_paths;

use crate::config::Config;
use crate::idmap::{IdMap, COLLECTION_IDS};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::Path;

/// Legacy collection of all letters, split into 30 and 31 in the target.
pub const LETTERS_COLLECTION: i64 = 15;

/// Legacy sub-collection of letter → collection id it was split into.
pub const LETTER_SPLITS: [(i64, i64); 2] = [(1, 30), (2, 31)];

/// Section number from a legacy section id such as "ch12".
pub fn section_number(raw: &str) -> Option<i64> {
    raw.trim().trim_start_matches("ch").parse().ok()
}

/// Folder of a Läsning för barn part: "Lasning_for_barn_3".
pub fn lfb_part_folder(part: u32) -> String {
    format!("Lasning_for_barn_{}", part)
}

pub fn load_collection_ids(config: &Config) -> Result<IdMap> {
    IdMap::load_from(&config.id_dir, COLLECTION_IDS)
}

/// A migrated publication, as the path jobs see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationRow {
    pub id: i64,
    pub name: String,
    pub published: Option<i64>,
    pub legacy_id: Option<String>,
}

/// Publications of one target collection, in id order.
pub fn collection_publications(conn: &Connection, collection_id: i64) -> Result<Vec<PublicationRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, published, legacy_id FROM publication
         WHERE publication_collection_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([collection_id], |row| {
        Ok(PublicationRow {
            id: row.get(0)?,
            name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            published: row.get(2)?,
            legacy_id: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Write a generated file, creating its directory.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// New publication id for a publication legacy id ("1_12").
pub fn publication_id_by_legacy_id(conn: &Connection, legacy_id: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM publication WHERE legacy_id = ?1 ORDER BY id LIMIT 1",
            [legacy_id],
            |row| row.get(0),
        )
        .optional()?)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_number() {
        assert_eq!(section_number("ch12"), Some(12));
        assert_eq!(section_number(" 7 "), Some(7));
        assert_eq!(section_number("chapter"), None);
    }

    #[test]
    fn test_publication_id_by_legacy_id() {
        let target = fixtures::target();
        let ids = fixtures::collections(&target, &[(1, 1)]);
        let id = fixtures::publication(&target, ids[0], "Noveller", "1_12");
        assert_eq!(publication_id_by_legacy_id(&target, "1_12").unwrap(), Some(id));
        assert_eq!(publication_id_by_legacy_id(&target, "1_13").unwrap(), None);
    }

    #[test]
    fn test_collection_publications() {
        let target = fixtures::target();
        let ids = fixtures::collections(&target, &[(1, 1), (2, 0)]);
        fixtures::publication(&target, ids[0], "Dikt", "1_1");
        fixtures::publication(&target, ids[1], "Annan", "2_1");
        fixtures::publication(&target, ids[0], "Sång", "1_2");
        let rows = collection_publications(&target, ids[0]).unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Dikt", "Sång"]);
        assert_eq!(rows[1].legacy_id.as_deref(), Some("1_2"));
    }
}
