//! `lfb-comment-documents`: register the split Läsning för barn stories as
//! notes-store documents, so lemmas can be moved onto them.

use crate::config::Config;
use crate::lookup;
use crate::progress::JobProgress;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;

/// Notes-store path of a stored reading-text path: always rooted.
pub fn document_path(stored: &str) -> String {
    format!("/{}", stored.trim_start_matches('/'))
}

/// Document title: the file name without extension.
fn document_title(stored: &str) -> String {
    Path::new(stored)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Returns the number of documents inserted.
pub fn run(notes: &mut Connection, config: &Config) -> Result<usize> {
    let rows = lookup::read_rows(&config.csv_path(lookup::LFB_FILES))?;

    let tx = notes.transaction()?;
    let mut inserted = 0;
    {
        let mut insert = tx.prepare("INSERT INTO document (path, title) VALUES (?1, ?2)")?;
        let mut progress = JobProgress::new("Note documents", rows.len());
        for row in &rows {
            progress.inc();
            let Some(stored) = row.get(1).filter(|p| !p.is_empty()) else {
                eprintln!("Warning: no path for {}", row.first().map(String::as_str).unwrap_or(""));
                continue;
            };
            insert.execute(params![document_path(stored), document_title(stored)])?;
            inserted += 1;
        }
        progress.finish(&format!("{} documents", inserted));
    }
    tx.commit().context("Failed to commit note documents")?;
    Ok(inserted)
}
