//! `introductions`: introduction and title page rows for every collection.

use super::load_collection_ids;
use crate::config::Config;
use crate::lookup;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use rustc_hash::FxHashMap;

const INTRODUCTION_DIR: &str = "documents/Redaktionella_texter/Inledningar";
const TITLE_PAGE_DIR: &str = "documents/Redaktionella_texter/Titelsidor";

pub fn introduction_path(name: &str) -> String {
    format!("{INTRODUCTION_DIR}/{name}_inl.xml")
}

pub fn title_page_path(name: &str) -> String {
    format!("{TITLE_PAGE_DIR}/{name}_tit.xml")
}

/// New collection id → file name base, from the `old id;name` list.
fn names_by_collection(config: &Config) -> Result<FxHashMap<i64, String>> {
    let collections = load_collection_ids(config)?;
    let mut names = FxHashMap::default();
    for (old, name) in lookup::read_pairs(&config.csv_path(lookup::INTRODUCTION_NAMES))? {
        let Ok(old_id) = old.parse::<i64>() else {
            eprintln!("Warning: bad collection id {:?} in {}", old, lookup::INTRODUCTION_NAMES);
            continue;
        };
        match collections.get(old_id) {
            Some(new_id) => {
                names.insert(new_id, name);
            }
            None => eprintln!("Warning: collection {} was not migrated", old_id),
        }
    }
    Ok(names)
}

/// Returns the number of collections updated.
pub fn run(target: &mut Connection, config: &Config) -> Result<usize> {
    let names = names_by_collection(config)?;
    let tx = target.transaction()?;
    let mut updated = 0;
    {
        let collections: Vec<(i64, Option<i64>)> = tx
            .prepare("SELECT id, published FROM publication_collection WHERE project_id = ?1 ORDER BY id")?
            .query_map([config.project_id], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        let mut introduction = tx.prepare(
            "INSERT INTO publication_collection_introduction (published, original_filename) VALUES (?1, ?2)",
        )?;
        let mut title = tx.prepare(
            "INSERT INTO publication_collection_title (published, original_filename) VALUES (?1, ?2)",
        )?;
        let mut link = tx.prepare(
            "UPDATE publication_collection
             SET publication_collection_introduction_id = ?1, publication_collection_title_id = ?2
             WHERE id = ?3",
        )?;

        for (collection_id, published) in collections {
            let Some(name) = names.get(&collection_id) else {
                eprintln!("Warning: no file name for collection {}", collection_id);
                continue;
            };
            introduction.execute(params![published, introduction_path(name)])?;
            let introduction_id = tx.last_insert_rowid();
            title.execute(params![published, title_page_path(name)])?;
            let title_id = tx.last_insert_rowid();
            link.execute(params![introduction_id, title_id, collection_id])?;
            updated += 1;
        }
    }
    tx.commit().context("Failed to commit introductions")?;
    eprintln!("Introductions and title pages added to {} collections", updated);
    Ok(updated)
}
