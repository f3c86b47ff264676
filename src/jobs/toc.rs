//! `toc`: one table-of-contents JSON file per collection.

use super::{load_collection_ids, LETTERS_COLLECTION, LETTER_SPLITS};
use crate::config::Config;
use crate::lookup;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Legacy id of Läsning för barn, whose TOC comes from the split list.
const LFB_COLLECTION: i64 = 32;
const LFB_TITLE: &str = "Läsning för barn";

/// Collection whose description rows belong to the preceding item.
const DESCRIBED_COLLECTION: i64 = 20;

/// Links to letters without a publication.
const UNLINKED_LETTER_MARKER: &str = "Mibr";

/// Fragment reference inside a link: ";ch3" or ";ch3;pos12".
static FRAGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r";(ch\d{1,3}(;pos\d{1,4})?)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocRoot {
    pub text: String,
    #[serde(rename = "collectionId")]
    pub collection_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub children: Vec<TocItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocItem {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(rename = "itemId")]
    pub item_id: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TocRoot {
    fn new(text: &str, collection_id: i64) -> Self {
        Self {
            text: text.to_string(),
            collection_id: collection_id.to_string(),
            kind: "title".to_string(),
            children: Vec::new(),
        }
    }
}

impl TocItem {
    fn new(kind: &str, text: &str, item_id: String, date: Option<&str>) -> Self {
        Self {
            url: String::new(),
            kind: kind.to_string(),
            text: text.to_string(),
            item_id,
            date: date.unwrap_or("").to_string(),
            description: None,
        }
    }
}

/// One `tableofcontents` row.
#[derive(Debug, Clone, Default)]
struct TocRow {
    title: String,
    date: Option<String>,
    link: Option<String>,
    sort_order: Option<i64>,
    group_order: Option<i64>,
}

/// Publication ids of the current project, by legacy id.
pub struct PublicationLookup<'a> {
    pub conn: &'a Connection,
    pub project_id: i64,
}

impl PublicationLookup<'_> {
    pub fn id(&self, legacy_id: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM publication WHERE legacy_id = ?1 AND publication_collection_id IN (
                     SELECT id FROM publication_collection WHERE project_id = ?2)
                 ORDER BY id LIMIT 1",
                rusqlite::params![legacy_id, self.project_id],
                |r| r.get(0),
            )
            .optional()?)
    }

    /// Id as text for an item id; empty (with a warning) when unknown.
    fn id_text(&self, legacy_id: &str) -> Result<String> {
        Ok(match self.id(legacy_id)? {
            Some(id) => id.to_string(),
            None => {
                eprintln!("Warning: {} not found in publication", legacy_id);
                String::new()
            }
        })
    }
}

/// Split "12;ch3;pos4" into the link without fragments and "ch3;pos4".
pub fn split_fragment(link: &str) -> (String, Option<String>) {
    let fragment = FRAGMENT
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    (FRAGMENT.replace_all(link, "").into_owned(), fragment)
}

/// Legacy collection prefix of publication legacy ids.
fn legacy_prefix(old_collection: i64) -> i64 {
    if LETTER_SPLITS.iter().any(|(_, split)| *split == old_collection) {
        LETTERS_COLLECTION
    } else {
        old_collection
    }
}

/// "{collection}_{publication}[_{fragment}]", or empty for rows without a link.
fn item_id(
    link: Option<&str>,
    old_collection: i64,
    new_collection: i64,
    publications: &PublicationLookup,
) -> Result<String> {
    let Some(link) = link.filter(|l| !l.is_empty()) else {
        return Ok(String::new());
    };
    let (link, fragment) = split_fragment(link);
    let legacy_id = format!("{}_{}", legacy_prefix(old_collection), link);
    let publication = publications.id_text(&legacy_id)?;
    Ok(match fragment {
        Some(fragment) => format!("{}_{}_{}", new_collection, publication, fragment),
        None => format!("{}_{}", new_collection, publication),
    })
}

fn query_rows(legacy: &Connection, sql: &str, params: &[i64], grouped: bool) -> Result<Vec<TocRow>> {
    let mut stmt = legacy.prepare(sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params), |r| {
        Ok(TocRow {
            title: r.get::<_, Option<String>>(0)?.unwrap_or_default(),
            date: r.get(1)?,
            link: r.get(2)?,
            sort_order: r.get(3)?,
            group_order: if grouped { r.get(4)? } else { None },
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Rows of one collection in TOC order.
fn read_rows(legacy: &Connection, old_collection: i64) -> Result<Vec<TocRow>> {
    let split = LETTER_SPLITS.iter().find(|(_, split)| *split == old_collection);
    let undated = |row: &TocRow| row.date.clone().unwrap_or_else(|| "0".to_string());

    let rows = match split {
        Some((1, _)) => {
            let mut rows = query_rows(
                legacy,
                "SELECT t.title, t.toc_date, t.toc_linkID, t.sortOrder, g.sortOrder
                 FROM tableofcontents t, publications_group g
                 WHERE t.toc_zts_id = ?1 AND t.toc_coll_id = ?2 AND t.toc_group_id = g.group_id
                 ORDER BY t.rowid",
                &[LETTERS_COLLECTION, 1],
                true,
            )?;
            rows.sort_by_key(|r| (r.group_order, undated(r)));
            rows
        }
        Some((sub, _)) => {
            let mut rows = query_rows(
                legacy,
                "SELECT title, toc_date, toc_linkID, sortOrder FROM tableofcontents
                 WHERE toc_zts_id = ?1 AND toc_coll_id = ?2 ORDER BY rowid",
                &[LETTERS_COLLECTION, *sub],
                false,
            )?;
            rows.sort_by_key(undated);
            rows
        }
        None => {
            let mut rows = query_rows(
                legacy,
                "SELECT title, toc_date, toc_linkID, sortOrder FROM tableofcontents
                 WHERE toc_zts_id = ?1 ORDER BY rowid",
                &[old_collection],
                false,
            )?;
            rows.sort_by_key(|r| r.sort_order);
            rows
        }
    };
    Ok(rows)
}

/// TOC of one collection; None when it has no rows. The first row names the
/// collection.
fn build_toc(
    rows: &[TocRow],
    old_collection: i64,
    new_collection: i64,
    publications: &PublicationLookup,
) -> Result<Option<TocRoot>> {
    let Some((head, items)) = rows.split_first() else {
        return Ok(None);
    };
    let mut root = TocRoot::new(&head.title, new_collection);

    for row in items {
        if row
            .link
            .as_deref()
            .is_some_and(|l| l.contains(UNLINKED_LETTER_MARKER))
        {
            continue;
        }
        let item_id = item_id(row.link.as_deref(), old_collection, new_collection, publications)?;

        if item_id.is_empty() && old_collection == DESCRIBED_COLLECTION {
            match root.children.last_mut() {
                Some(previous) => previous.description = Some(row.title.clone()),
                None => eprintln!("Warning: description without item: {}", row.title),
            }
            continue;
        }
        let kind = if item_id.is_empty() { "section_title" } else { "est" };
        root.children
            .push(TocItem::new(kind, &row.title, item_id, row.date.as_deref()));
    }
    Ok(Some(root))
}

fn lfb_toc(config: &Config, new_collection: i64, publications: &PublicationLookup) -> Result<TocRoot> {
    let entries = lookup::read_lfb_split(&config.csv_path(lookup::LFB_SPLIT))?;
    let mut root = TocRoot::new(LFB_TITLE, new_collection);
    for entry in &entries {
        let publication = publications.id_text(&entry.legacy_id)?;
        root.children.push(TocItem::new(
            "est",
            &entry.name,
            format!("{}_{}", new_collection, publication),
            None,
        ));
    }
    Ok(root)
}

fn write_toc(config: &Config, toc: &TocRoot) -> Result<PathBuf> {
    fs::create_dir_all(&config.toc_dir)
        .with_context(|| format!("Failed to create {}", config.toc_dir.display()))?;
    let path = config.toc_dir.join(format!("{}.json", toc.collection_id));
    let json = serde_json::to_string(toc)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Returns the TOC files written.
pub fn run(legacy: &Connection, target: &Connection, config: &Config) -> Result<Vec<PathBuf>> {
    let collections = load_collection_ids(config)?;
    let publications = PublicationLookup {
        conn: target,
        project_id: config.project_id,
    };
    let mut written = Vec::new();

    for (old, new) in collections.sorted() {
        if old == LFB_COLLECTION {
            continue;
        }
        let rows = read_rows(legacy, old)?;
        match build_toc(&rows, old, new, &publications)? {
            Some(toc) => written.push(write_toc(config, &toc)?),
            None => eprintln!("Warning: no TOC rows for collection {} (new id {})", old, new),
        }
    }

    match collections.get(LFB_COLLECTION) {
        Some(new) => {
            let toc = lfb_toc(config, new, &publications)?;
            written.push(write_toc(config, &toc)?);
        }
        None => eprintln!("Warning: collection {} was not migrated", LFB_COLLECTION),
    }

    eprintln!("Wrote {} TOC files to {}", written.len(), config.toc_dir.display());
    Ok(written)
}
