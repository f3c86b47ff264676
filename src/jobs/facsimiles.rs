//! `facsimiles`: facsimile collections and their links to publications.

use super::section_number;
use crate::audit::LogFile;
use crate::config::Config;
use crate::idmap::{IdMap, FACSIMILE_COLLECTION_IDS, MANUSCRIPT_IDS, PUBLICATION_IDS};
use crate::progress::JobProgress;
use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection};

pub const EXCLUDED_LOG: &str = "excluded_facsimile_publications_tuples.txt";

#[derive(Debug)]
pub struct FacsimilesReport {
    pub collections: IdMap,
    pub linked: usize,
    pub excluded: usize,
}

struct FacsimileLink {
    publication_id: i64,
    section: Value,
    facsimile_id: i64,
    page_nr: Option<i64>,
    priority: Option<i64>,
    kind: Option<i64>,
    manuscript_id: Option<i64>,
}

/// Why a legacy link row is not migrated.
#[derive(Debug, PartialEq, Eq)]
enum Exclusion {
    Publication(i64),
    Facsimile(i64),
    Manuscript(i64),
    Section(String),
}

impl Exclusion {
    fn log_line(&self) -> String {
        match self {
            Exclusion::Publication(id) => format!("tuple with old_publication_id: {} skipped", id),
            Exclusion::Facsimile(id) => format!("tuple with old_facsimile_id: {} skipped", id),
            Exclusion::Manuscript(id) => format!("tuple with old_ms_id: {} skipped", id),
            Exclusion::Section(raw) => format!("tuple with section_id: {} skipped", raw),
        }
    }
}

/// Target section id: NULL becomes 0, "chN" becomes N.
fn target_section(value: &Value) -> std::result::Result<i64, Exclusion> {
    match value {
        Value::Null => Ok(0),
        Value::Integer(i) => Ok(*i),
        Value::Text(s) => section_number(s).ok_or_else(|| Exclusion::Section(s.clone())),
        other => Err(Exclusion::Section(format!("{:?}", other))),
    }
}

/// Target manuscript id: NULL and 0 become NULL; other ids must be migrated.
fn target_manuscript(old: Option<i64>, manuscripts: &IdMap) -> std::result::Result<Option<i64>, Exclusion> {
    match old {
        None | Some(0) => Ok(None),
        Some(id) => manuscripts.get(id).map(Some).ok_or(Exclusion::Manuscript(id)),
    }
}

struct TargetIds<'a> {
    publications: &'a IdMap,
    facsimiles: &'a IdMap,
    manuscripts: &'a IdMap,
}

fn resolve_link(link: &FacsimileLink, ids: &TargetIds) -> std::result::Result<(i64, i64, i64, Option<i64>), Exclusion> {
    let publication = ids
        .publications
        .get(link.publication_id)
        .ok_or(Exclusion::Publication(link.publication_id))?;
    let section = target_section(&link.section)?;
    let facsimile = ids
        .facsimiles
        .get(link.facsimile_id)
        .ok_or(Exclusion::Facsimile(link.facsimile_id))?;
    let manuscript = target_manuscript(link.manuscript_id, ids.manuscripts)?;
    Ok((publication, section, facsimile, manuscript))
}

fn migrate_collections(legacy: &Connection, target: &Connection) -> Result<IdMap> {
    let mut stmt = legacy.prepare(
        "SELECT publication_id, title, description, pages, pre_page_count, pages_comment, facs_url
         FROM facsimiles ORDER BY publication_id",
    )?;
    let mut rows = stmt.query([])?;
    let mut insert = target.prepare(
        "INSERT INTO publication_facsimile_collection
             (title, description, number_of_pages, start_page_number, page_comment, external_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    let mut ids = IdMap::new();
    while let Some(row) = rows.next()? {
        let old_id: i64 = row.get(0)?;
        insert.execute(params![
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<i64>>(3)?,
            row.get::<_, Option<i64>>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, Option<String>>(6)?,
        ])?;
        ids.insert(old_id, target.last_insert_rowid());
    }
    Ok(ids)
}

fn read_links(legacy: &Connection) -> Result<Vec<FacsimileLink>> {
    let mut stmt = legacy.prepare(
        "SELECT publications_id, section_id, facs_id, page_nr, priority, type, ms_id
         FROM facsimile_publications ORDER BY rowid",
    )?;
    let mut rows = stmt.query([])?;
    let mut links = Vec::new();
    while let Some(row) = rows.next()? {
        links.push(FacsimileLink {
            publication_id: row.get(0)?,
            section: row.get(1)?,
            facsimile_id: row.get(2)?,
            page_nr: row.get(3)?,
            priority: row.get(4)?,
            kind: row.get(5)?,
            manuscript_id: row.get(6)?,
        });
    }
    Ok(links)
}

pub fn run(legacy: &Connection, target: &mut Connection, config: &Config) -> Result<FacsimilesReport> {
    let publications = IdMap::load_from(&config.id_dir, PUBLICATION_IDS)?;
    let manuscripts = IdMap::load_from(&config.id_dir, MANUSCRIPT_IDS)?;
    let links = read_links(legacy)?;
    let mut excluded_log = LogFile::create(&config.log_dir, EXCLUDED_LOG)?;

    let tx = target.transaction()?;
    let facsimiles = migrate_collections(legacy, &tx)?;
    let ids = TargetIds {
        publications: &publications,
        facsimiles: &facsimiles,
        manuscripts: &manuscripts,
    };

    let mut progress = JobProgress::new("Facsimile links", links.len());
    let mut linked = 0;
    let mut excluded = 0;
    {
        let mut insert = tx.prepare(
            "INSERT INTO publication_facsimile
                 (publication_id, section_id, publication_facsimile_collection_id, page_nr, priority, type, publication_manuscript_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for link in &links {
            progress.inc();
            match resolve_link(link, &ids) {
                Ok((publication, section, facsimile, manuscript)) => {
                    insert.execute(params![
                        publication,
                        section,
                        facsimile,
                        link.page_nr,
                        link.priority,
                        link.kind,
                        manuscript,
                    ])?;
                    linked += 1;
                }
                Err(exclusion) => {
                    excluded_log.line(&exclusion.log_line())?;
                    excluded += 1;
                }
            }
        }
    }
    tx.commit().context("Failed to commit facsimiles")?;
    progress.finish(&format!("{} linked, {} excluded", linked, excluded));

    facsimiles.save_to(&config.id_dir, FACSIMILE_COLLECTION_IDS)?;
    excluded_log.finish()?;

    Ok(FacsimilesReport {
        collections: facsimiles,
        linked,
        excluded,
    })
}
