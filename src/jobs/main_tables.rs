//! `main-tables`: project, collections and publications.

use super::{LETTERS_COLLECTION, LETTER_SPLITS};
use crate::config::Config;
use crate::idmap::{IdMap, COLLECTION_IDS, PUBLICATION_IDS};
use crate::progress::JobProgress;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};

/// Legacy collections not migrated as collections: the letters (split into
/// 30 and 31) and the unsplit Läsning för barn.
const SKIPPED_COLLECTIONS: [i64; 2] = [9, LETTERS_COLLECTION];

#[derive(Debug)]
pub struct MainTablesReport {
    pub project_id: i64,
    pub collections: IdMap,
    pub publications: IdMap,
}

struct LegacyPublication {
    id: i64,
    title: Option<String>,
    collection_id: Option<i64>,
    subcollection_id: Option<i64>,
    identifier: Option<String>,
    date: Option<String>,
    genre: Option<String>,
}

/// `0000-00-00` and empty dates become NULL; unknown day or month parts
/// become `XX` ("1854-00-00" → "1854-XX-XX").
pub fn normalize_date(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw == "0000-00-00" {
        return None;
    }
    let date = raw.replace("-00", "-XX").trim().to_string();
    (!date.is_empty()).then_some(date)
}

/// Target collection for a legacy publication, or None if it is not migrated.
fn target_collection(p: &LegacyPublication, collections: &IdMap) -> Option<i64> {
    let legacy_collection = p.collection_id?;
    if legacy_collection == LETTERS_COLLECTION {
        let split = LETTER_SPLITS
            .iter()
            .find(|(sub, _)| Some(*sub) == p.subcollection_id)?;
        return collections.get(split.1);
    }
    collections.get(legacy_collection)
}

fn create_project(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO project (published, name) VALUES (1, ?1)",
        [name],
    )
    .context("Failed to create project")?;
    Ok(conn.last_insert_rowid())
}

fn migrate_collections(legacy: &Connection, target: &Connection, project_id: i64) -> Result<IdMap> {
    let mut stmt = legacy.prepare("SELECT zts_id, zts_title, zts_lansering FROM publications_zts ORDER BY zts_id")?;
    let mut rows = stmt.query([])?;
    let mut insert = target.prepare(
        "INSERT INTO publication_collection (project_id, published, name, legacy_id) VALUES (?1, ?2, ?3, ?4)",
    )?;

    let mut ids = IdMap::new();
    while let Some(row) = rows.next()? {
        let old_id: i64 = row.get(0)?;
        if SKIPPED_COLLECTIONS.contains(&old_id) {
            continue;
        }
        let title: Option<String> = row.get(1)?;
        let published: Option<i64> = row.get(2)?;
        insert.execute(params![project_id, published, title, old_id])?;
        ids.insert(old_id, target.last_insert_rowid());
    }
    Ok(ids)
}

fn read_publications(legacy: &Connection) -> Result<Vec<LegacyPublication>> {
    let mut stmt = legacy.prepare(
        "SELECT p_id, p_title, p_zts_id, p_coll_id, p_identifier, p_maskindatum, p_genre
         FROM publications ORDER BY p_id",
    )?;
    let mut rows = stmt.query([])?;
    let mut publications = Vec::new();
    while let Some(row) = rows.next()? {
        publications.push(LegacyPublication {
            id: row.get(0)?,
            title: row.get(1)?,
            collection_id: row.get(2)?,
            subcollection_id: row.get(3)?,
            identifier: row.get(4)?,
            date: row.get(5)?,
            genre: row.get(6)?,
        });
    }
    Ok(publications)
}

fn migrate_publications(legacy: &Connection, target: &Connection, collections: &IdMap) -> Result<IdMap> {
    let publications = read_publications(legacy)?;
    let mut progress = JobProgress::new("Publications", publications.len());
    let mut insert = target.prepare(
        "INSERT INTO publication (name, publication_collection_id, legacy_id, original_publication_date, genre)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    let mut ids = IdMap::new();
    for p in &publications {
        progress.inc();
        let Some(collection_id) = target_collection(p, collections) else {
            continue;
        };
        insert.execute(params![
            p.title,
            collection_id,
            p.identifier,
            normalize_date(p.date.as_deref()),
            p.genre,
        ])?;
        ids.insert(p.id, target.last_insert_rowid());
    }
    progress.finish(&format!("migrated {} of {}", ids.len(), publications.len()));
    Ok(ids)
}

/// Publications inherit `published` from their collection.
fn copy_published_flag(target: &Connection, project_id: i64) -> Result<()> {
    target.execute(
        "UPDATE publication SET published = (
             SELECT c.published FROM publication_collection c
             WHERE c.id = publication.publication_collection_id)
         WHERE publication_collection_id IN (
             SELECT id FROM publication_collection WHERE project_id = ?1)",
        [project_id],
    )?;
    Ok(())
}

pub fn run(legacy: &Connection, target: &mut Connection, config: &Config) -> Result<MainTablesReport> {
    let tx = target.transaction()?;
    let project_id = create_project(&tx, &config.project_name)?;
    let collections = migrate_collections(legacy, &tx, project_id)?;
    let publications = migrate_publications(legacy, &tx, &collections)?;
    copy_published_flag(&tx, project_id)?;
    tx.commit().context("Failed to commit main tables")?;

    collections.save_to(&config.id_dir, COLLECTION_IDS)?;
    publications.save_to(&config.id_dir, PUBLICATION_IDS)?;

    eprintln!(
        "Project '{}' created with id {} ({} collections, {} publications)",
        config.project_name,
        project_id,
        collections.len(),
        publications.len()
    );
    if project_id != config.project_id {
        eprintln!(
            "Warning: configured project_id is {}; set it to {} before running toc and introductions",
            config.project_id, project_id
        );
    }

    Ok(MainTablesReport {
        project_id,
        collections,
        publications,
    })
}
