//! `split-lfb`: one reading-text file per Läsning för barn story.
//!
//! The eight part files are read in sorted order (part 1 first). Each story
//! div named in the split list is copied verbatim into the reading-text
//! template.

use super::{lfb_part_folder, write_file};
use crate::config::Config;
use crate::lookup::{self, LfbEntry};
use crate::normalize::split_file_name;
use crate::progress::JobProgress;
use crate::scan::scan_xml;
use crate::xml;
use anyhow::Result;
use roxmltree::Document;

/// Stored-path prefix of the split reading texts.
pub const SPLIT_TRUNK: &str = "documents/trunk/Lasning_for_barn";

/// Path of a split story below the split directory: "Lasning_for_barn_3/sampo_lappelill.xml".
pub fn split_relative_path(part: u32, name: &str) -> String {
    format!("{}/{}", lfb_part_folder(part), split_file_name(name))
}

/// Source of the story div, or None (with a warning) if it cannot be found.
fn story_source<'t>(entry: &LfbEntry, texts: &'t [String], docs: &[Document<'t>]) -> Option<(u32, &'t str)> {
    let Some(part) = entry.part().filter(|p| (1..=docs.len() as u32).contains(p)) else {
        eprintln!("Warning: no part file for {} ({})", entry.name, entry.whole_id);
        return None;
    };
    let index = part as usize - 1;
    match xml::find_by_id(&docs[index], entry.div_id()) {
        Some(div) => Some((part, &texts[index][div.range()])),
        None => {
            eprintln!("Warning: div {} not found in part {} ({})", entry.div_id(), part, entry.name);
            None
        }
    }
}

/// Returns `(legacy id, stored path)` of every file written.
pub fn run(config: &Config) -> Result<Vec<(String, String)>> {
    let entries = lookup::read_lfb_split(&config.csv_path(lookup::LFB_SPLIT))?;
    let parts = scan_xml(&config.lfb_source_dir)?;
    let texts = parts
        .iter()
        .map(|p| xml::read_document(&p.path))
        .collect::<crate::error::Result<Vec<String>>>()?;
    let docs = texts
        .iter()
        .zip(&parts)
        .map(|(text, part)| xml::parse(text, &part.path))
        .collect::<crate::error::Result<Vec<Document>>>()?;

    let mut written = Vec::new();
    let mut progress = JobProgress::new("Split Läsning för barn", entries.len());
    for entry in &entries {
        progress.inc();
        let Some((part, source)) = story_source(entry, &texts, &docs) else {
            continue;
        };
        let relative = split_relative_path(part, &entry.name);
        write_file(
            &config.lfb_split_dir.join(&relative),
            &xml::reading_text_document(&entry.name, source),
        )?;
        written.push((entry.legacy_id.clone(), format!("{}/{}", SPLIT_TRUNK, relative)));
    }
    progress.finish(&format!("{} stories from {} parts", written.len(), parts.len()));

    lookup::write_pairs(&config.csv_path(lookup::LFB_FILES), &written)?;
    Ok(written)
}
