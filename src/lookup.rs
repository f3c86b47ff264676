//! Semicolon-separated lookup tables (no header row).

use anyhow::{bail, Context, Result};
use csv::{QuoteStyle, ReaderBuilder, Trim, WriterBuilder};
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;

pub const PUBLICISTIK_FILES: &str = "ZTS_Publicistik_verk_signum_filer.csv";
pub const FORELASNINGAR_FILES: &str = "Forelasningar_signum_filer.csv";
pub const LFB_SPLIT: &str = "Lfb_split.csv";
pub const LFB_FILES: &str = "Lfb_signum_filer.csv";
pub const LFB_COMMENT_FILES: &str = "Lfb_kommentarer_filer.csv";
pub const INTRODUCTION_NAMES: &str = "introduction_title_names.csv";
pub const FACSIMILE_URLS: &str = "facsimile_urls.csv";

/// All rows of a `;`-separated file, fields trimmed.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("read csv: {}", path.display()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("read record: {}", path.display()))?;
        let row: Vec<String> = record
            .iter()
            .map(|v| v.trim_matches('\u{feff}').to_string())
            .collect();
        if row.iter().all(String::is_empty) {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// First column → second column. Later rows win on duplicate keys.
pub fn read_pairs(path: &Path) -> Result<FxHashMap<String, String>> {
    let mut pairs = FxHashMap::default();
    for (i, row) in read_rows(path)?.into_iter().enumerate() {
        let mut fields = row.into_iter();
        match (fields.next(), fields.next()) {
            (Some(key), Some(value)) => {
                pairs.insert(key, value);
            }
            _ => bail!("{}: row {} has fewer than two fields", path.display(), i + 1),
        }
    }
    Ok(pairs)
}

/// Write `key;value` rows, creating the parent directory.
pub fn write_pairs(path: &Path, rows: &[(String, String)]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .from_path(path)
        .with_context(|| format!("write csv: {}", path.display()))?;
    for (key, value) in rows {
        writer.write_record([key, value])?;
    }
    writer.flush()?;
    Ok(())
}

/// One row of the Läsning för barn split list:
/// `name;<part><div id>;publication id;legacy id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfbEntry {
    pub name: String,
    /// Part number (1-8) followed by the div id, e.g. "3d15".
    pub whole_id: String,
    pub publication_id: String,
    pub legacy_id: String,
}

impl LfbEntry {
    /// Part number taken from the first character of `whole_id`.
    pub fn part(&self) -> Option<u32> {
        self.whole_id.chars().next().and_then(|c| c.to_digit(10))
    }

    /// Div id in the part file: `whole_id` without its first character.
    pub fn div_id(&self) -> &str {
        let mut chars = self.whole_id.chars();
        chars.next();
        chars.as_str()
    }
}

pub fn read_lfb_split(path: &Path) -> Result<Vec<LfbEntry>> {
    let mut entries = Vec::new();
    for (i, row) in read_rows(path)?.into_iter().enumerate() {
        let [name, whole_id, publication_id, legacy_id, ..] = row.as_slice() else {
            bail!("{}: row {} has fewer than four fields", path.display(), i + 1);
        };
        entries.push(LfbEntry {
            name: name.clone(),
            whole_id: whole_id.clone(),
            publication_id: publication_id.clone(),
            legacy_id: legacy_id.clone(),
        });
    }
    Ok(entries)
}
