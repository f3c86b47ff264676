//! `notes`: move the lemmas of the eight unsplit Läsning för barn documents
//! onto the split story documents.
//!
//! A lemma with id N is anchored in the text by an element with
//! `xml:id="startN"`; the file holding that anchor decides the new document.

use super::split_lfb::SPLIT_TRUNK;
use crate::config::Config;
use crate::progress::JobProgress;
use crate::scan::{scan_xml, to_posix_relative};
use crate::stats::MatchStatistics;
use crate::xml;
use anyhow::{Context, Result};
use roxmltree::NS_XML_URI;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use rustc_hash::FxHashMap;
use std::path::Path;

const ANCHOR_PREFIX: &str = "start";

/// Anchor id → notes-store path of the split file containing it. The first
/// file in scan order wins when an anchor occurs twice.
pub fn index_anchors(split_dir: &Path) -> Result<FxHashMap<String, String>> {
    let mut anchors = FxHashMap::default();
    for candidate in scan_xml(split_dir)? {
        let text = match xml::read_document(&candidate.path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Warning: {}", e);
                continue;
            }
        };
        let doc = match xml::parse(&text, &candidate.path) {
            Ok(doc) => doc,
            Err(e) => {
                eprintln!("Warning: {}", e);
                continue;
            }
        };
        let path = format!("/{}/{}", SPLIT_TRUNK, to_posix_relative(&candidate.path, split_dir));
        for id in doc.descendants().filter_map(|n| n.attribute((NS_XML_URI, "id"))) {
            if id.starts_with(ANCHOR_PREFIX) {
                anchors.entry(id.to_string()).or_insert_with(|| path.clone());
            }
        }
    }
    Ok(anchors)
}

fn lemma_ids(conn: &Connection, document_ids: &[i64]) -> Result<Vec<i64>> {
    if document_ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; document_ids.len()].join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT id FROM documentnote WHERE document_id IN ({}) ORDER BY id",
        placeholders
    ))?;
    let rows = stmt.query_map(params_from_iter(document_ids), |r| r.get(0))?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

pub fn run(notes: &mut Connection, config: &Config) -> Result<MatchStatistics> {
    let anchors = index_anchors(&config.lfb_split_dir)?;
    eprintln!("Indexed {} lemma anchors", anchors.len());

    let mut stats = MatchStatistics::new();
    let tx = notes.transaction()?;
    {
        let lemmas = lemma_ids(&tx, &config.lfb_note_document_ids)?;
        let mut find = tx.prepare("SELECT id FROM document WHERE path = ?1 ORDER BY id LIMIT 1")?;
        let mut update = tx.prepare("UPDATE documentnote SET document_id = ?1 WHERE id = ?2")?;
        let mut progress = JobProgress::new("Lemmas", lemmas.len());
        for lemma in lemmas {
            progress.inc();
            let Some(path) = anchors.get(&format!("{}{}", ANCHOR_PREFIX, lemma)) else {
                eprintln!("Warning: no anchor for lemma {}", lemma);
                stats.record(false);
                continue;
            };
            let document: Option<i64> = find.query_row([path], |r| r.get(0)).optional()?;
            match document {
                Some(document) => {
                    update.execute(params![document, lemma])?;
                    stats.record(true);
                }
                None => {
                    eprintln!("Warning: {} not found", path);
                    stats.record(false);
                }
            }
        }
        progress.finish(&format!("{} moved", stats.matched));
    }
    tx.commit().context("Failed to commit lemma documents")?;

    stats.log_phase("notes");
    eprintln!("{}", stats.summary("Lemmas"));
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::fixtures;
    use std::fs;
    use tempfile::TempDir;

    fn story(dir: &Path, rel: &str, anchors: &[&str]) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let body: String = anchors
            .iter()
            .map(|a| format!("<anchor xml:id=\"{a}\"/>text<anchor xml:id=\"end{}\"/>", &a[5..]))
            .collect();
        fs::write(path, format!("<TEI><text><body><p>{body}</p></body></text></TEI>")).unwrap();
    }

    #[test]
    fn test_index_anchors_first_file_wins() {
        let dir = TempDir::new().unwrap();
        story(dir.path(), "Lasning_for_barn_1/a.xml", &["start10", "start11"]);
        story(dir.path(), "Lasning_for_barn_2/b.xml", &["start11"]);
        fs::write(dir.path().join("broken.xml"), "<TEI>").unwrap();

        let anchors = index_anchors(dir.path()).unwrap();
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors["start11"], "/documents/trunk/Lasning_for_barn/Lasning_for_barn_1/a.xml");
        assert!(!anchors.contains_key("end10"));
    }

    #[test]
    fn test_index_anchors_ignores_plain_id() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.xml"),
            r#"<TEI><text><body><p><anchor id="start5"/>text<anchor xml:id="start6"/></p></body></text></TEI>"#,
        )
        .unwrap();

        let anchors = index_anchors(dir.path()).unwrap();
        assert!(!anchors.contains_key("start5"));
        assert_eq!(anchors["start6"], "/documents/trunk/Lasning_for_barn/a.xml");
    }

    #[test]
    fn test_run_moves_lemmas() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            lfb_split_dir: dir.path().to_path_buf(),
            lfb_note_document_ids: vec![4395, 4396],
            ..Config::default()
        };
        story(dir.path(), "Lasning_for_barn_1/julqvallen.xml", &["start1"]);
        story(dir.path(), "Lasning_for_barn_2/sampo.xml", &["start2", "start3"]);

        let mut notes = fixtures::notes();
        notes
            .execute_batch(
                "INSERT INTO document (id, path, title) VALUES
                    (4395, '/documents/trunk/Lasning_for_barn_1.xml', 'del 1'),
                    (4396, '/documents/trunk/Lasning_for_barn_2.xml', 'del 2'),
                    (5000, '/documents/trunk/Lasning_for_barn/Lasning_for_barn_1/julqvallen.xml', 'julqvallen');
                 INSERT INTO documentnote (id, document_id, lemma) VALUES
                    (1, 4395, 'jul'), (2, 4396, 'fjäll'), (3, 4396, 'ren'), (4, 4396, 'lapp'), (5, 77, 'annan');",
            )
            .unwrap();

        let stats = run(&mut notes, &config).unwrap();
        assert_eq!(stats, MatchStatistics { attempted: 4, matched: 1 });

        let document = |id: i64| -> i64 {
            notes
                .query_row("SELECT document_id FROM documentnote WHERE id = ?1", [id], |r| r.get(0))
                .unwrap()
        };
        assert_eq!(document(1), 5000);
        assert_eq!(document(2), 4396);
        assert_eq!(document(4), 4396);
        assert_eq!(document(5), 77);
    }
}
