//! `facsimile-urls`: newspaper facsimiles from the National Library's
//! digital collections.
//!
//! The list holds `legacy_id;url` rows in chronological order. For each URL
//! the binding id is taken from the path, the OAI-PMH record gives title and
//! date, and one facsimile collection plus one link row are inserted.

use super::publication_id_by_legacy_id;
use crate::config::Config;
use crate::lookup;
use crate::progress::{create_spinner, JobProgress};
use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::Duration;

const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const OAI_IDENTIFIER_PREFIX: &str = "oai:digi.kansalliskirjasto.fi:";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static BINDING_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d{4,7})\?").unwrap());

/// Title and date of a digitized binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingMetadata {
    pub title: String,
    pub date: String,
}

/// Source of binding metadata.
pub trait MetadataSource {
    fn fetch(&self, binding_id: &str) -> Result<BindingMetadata>;
}

/// OAI-PMH `GetRecord` client.
pub struct OaiClient {
    client: Client,
    endpoint: String,
}

impl OaiClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl MetadataSource for OaiClient {
    fn fetch(&self, binding_id: &str) -> Result<BindingMetadata> {
        let identifier = format!("{OAI_IDENTIFIER_PREFIX}{binding_id}");
        let body = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("verb", "GetRecord"),
                ("metadataPrefix", "oai_dc"),
                ("identifier", identifier.as_str()),
            ])
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("OAI-PMH request failed for binding {}", binding_id))?
            .text()?;
        parse_record(&body).with_context(|| format!("Unexpected OAI-PMH record for binding {}", binding_id))
    }
}

/// `dc:title` and `dc:date` of an OAI-PMH response.
pub fn parse_record(xml: &str) -> Result<BindingMetadata> {
    let doc = roxmltree::Document::parse(xml)?;
    let dc = |name: &str| -> Result<String> {
        doc.descendants()
            .find(|n| n.is_element() && n.tag_name().name() == name && n.tag_name().namespace() == Some(DC_NS))
            .map(|n| n.text().unwrap_or("").to_string())
            .ok_or_else(|| anyhow!("dc:{} missing", name))
    };
    Ok(BindingMetadata {
        title: dc("title")?,
        date: dc("date")?,
    })
}

pub fn binding_id(url: &str) -> Option<&str> {
    BINDING_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// ISO dates as "d/m yyyy"; anything else (a bare year) unchanged.
pub fn format_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(d) => format!("{}/{} {}", d.day(), d.month(), d.year()),
        Err(_) => raw.to_string(),
    }
}

/// "Helsingfors Tidningar, nr: 12" → `<cite>Helsingfors Tidningar</cite> 3/5 1854, nr 12`.
/// Titles without exactly one comma keep the whole title in the cite.
pub fn display_title(meta: &BindingMetadata) -> String {
    let date = format_date(&meta.date);
    let parts: Vec<&str> = meta.title.split(',').collect();
    match parts.as_slice() {
        [journal, number] => {
            let number = number.trim_start().replace("nr:", "nr");
            format!("<cite>{}</cite> {}, {}", journal, date, number)
        }
        _ => {
            eprintln!("Irregular metadata title: {}", meta.title);
            format!("<cite>{}</cite>, {}", meta.title, date)
        }
    }
}

/// One facsimile to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacsimileRow {
    pub publication_id: i64,
    pub url: String,
    pub title: String,
    pub priority: i64,
}

/// Priority 1 for the first row of a publication, then 2, 3, ... while the
/// following rows belong to the same publication.
fn assign_priorities(rows: &mut [FacsimileRow]) {
    let mut previous = None;
    let mut priority = 0;
    for row in rows.iter_mut() {
        if previous == Some(row.publication_id) {
            priority += 1;
        } else {
            priority = 1;
        }
        row.priority = priority;
        previous = Some(row.publication_id);
    }
}

fn collect_rows(target: &Connection, list: &Path, source: &impl MetadataSource) -> Result<Vec<FacsimileRow>> {
    let entries = lookup::read_rows(list)?;
    let mut progress = JobProgress::new("Facsimile metadata", entries.len());
    let mut rows = Vec::new();
    for entry in &entries {
        progress.inc();
        let [legacy_id, url, ..] = entry.as_slice() else {
            eprintln!("Warning: skipping short row {:?}", entry);
            continue;
        };
        let Some(publication_id) = publication_id_by_legacy_id(target, legacy_id)? else {
            eprintln!("Warning: no publication with legacy id {}", legacy_id);
            continue;
        };
        let Some(binding) = binding_id(url) else {
            eprintln!("Warning: no binding id in {}", url);
            continue;
        };
        let meta = source.fetch(binding)?;
        rows.push(FacsimileRow {
            publication_id,
            url: url.clone(),
            title: display_title(&meta),
            priority: 0,
        });
    }
    progress.finish(&format!("{} facsimiles", rows.len()));
    assign_priorities(&mut rows);
    Ok(rows)
}

fn insert_rows(target: &Connection, rows: &[FacsimileRow]) -> Result<()> {
    let mut collection = target.prepare(
        "INSERT INTO publication_facsimile_collection (title, external_url) VALUES (?1, ?2)",
    )?;
    let mut link = target.prepare(
        "INSERT INTO publication_facsimile
             (publication_facsimile_collection_id, publication_id, page_nr, section_id, priority, type)
         VALUES (?1, ?2, 0, 0, ?3, 0)",
    )?;
    for row in rows {
        collection.execute(params![row.title, row.url])?;
        let facsimile_id = target.last_insert_rowid();
        link.execute(params![facsimile_id, row.publication_id, row.priority])?;
    }
    Ok(())
}

pub fn run_with(
    target: &mut Connection,
    list: &Path,
    source: &impl MetadataSource,
) -> Result<Vec<FacsimileRow>> {
    let rows = collect_rows(target, list, source)?;
    let spinner = create_spinner("Inserting facsimiles");
    let tx = target.transaction()?;
    insert_rows(&tx, &rows)?;
    tx.commit().context("Failed to commit facsimiles")?;
    spinner.finish_with_message(format!("Inserted {} facsimiles", rows.len()));
    Ok(rows)
}

pub fn run(target: &mut Connection, config: &Config, list: Option<&Path>) -> Result<Vec<FacsimileRow>> {
    let default_list = config.csv_path(lookup::FACSIMILE_URLS);
    let list = list.unwrap_or(default_list.as_path());
    let client = OaiClient::new(&config.oai_endpoint)?;
    run_with(target, list, &client)
}
