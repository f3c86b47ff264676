//! `manuscript-paths`: manuscript files, found by their header title.

use super::load_collection_ids;
use crate::audit::{AuditLog, LogFile, MatchSink, MANUSCRIPT_LABELS};
use crate::config::Config;
use crate::progress::JobProgress;
use crate::scan::{scan_dir, to_posix_relative};
use crate::stats::MatchStatistics;
use crate::xml;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use rustc_hash::FxHashMap;
use std::path::Path;

pub const MATCHED_LOG: &str = "matched_manuscripts.txt";
pub const UNMATCHED_LOG: &str = "unmatched_manuscripts.txt";
pub const SAME_TITLE_LOG: &str = "manuscript_files_with_same_title.txt";

const UNMATCHED_HEADER: &str = "The following manuscripts have no files connected to them.";

/// Files keyed by title. Titles carried by more than one file are left out
/// and returned as `(title, path)` pairs: every later occurrence first, then
/// the first occurrence of each such title.
pub fn index_by_title(files: Vec<(String, String)>) -> (FxHashMap<String, String>, Vec<(String, String)>) {
    let mut index: FxHashMap<String, String> = FxHashMap::default();
    let mut duplicates = Vec::new();
    for (title, path) in files {
        if index.contains_key(&title) {
            duplicates.push((title, path));
        } else {
            index.insert(title, path);
        }
    }
    let mut firsts = Vec::new();
    for (title, _) in &duplicates {
        if let Some(path) = index.remove(title) {
            firsts.push((title.clone(), path));
        }
    }
    duplicates.extend(firsts);
    (index, duplicates)
}

/// `(header title, stored path)` of every readable file below `dir`.
fn titled_files(dir: &Path, svn_root: &Path) -> Result<Vec<(String, String)>> {
    let mut files = Vec::new();
    for candidate in scan_dir(dir)? {
        let title = xml::read_document(&candidate.path)
            .and_then(|text| xml::tei_header_title(&text, &candidate.path));
        match title {
            Ok(title) => files.push((title, to_posix_relative(&candidate.path, svn_root))),
            Err(e) => eprintln!("Warning: {}", e),
        }
    }
    Ok(files)
}

fn collection_manuscripts(conn: &Connection, collection_id: i64) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn.prepare(
        "SELECT pm.id, pm.name FROM publication_manuscript pm
         JOIN publication p ON p.id = pm.publication_id
         WHERE p.publication_collection_id = ?1 ORDER BY pm.id",
    )?;
    let rows = stmt.query_map([collection_id], |r| {
        Ok((r.get(0)?, r.get::<_, Option<String>>(1)?.unwrap_or_default()))
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

pub fn run(target: &mut Connection, config: &Config) -> Result<MatchStatistics> {
    let collections = load_collection_ids(config)?;
    let mut log = AuditLog::create(&config.log_dir, MATCHED_LOG, UNMATCHED_LOG, MANUSCRIPT_LABELS)?;
    log.unmatched_note(UNMATCHED_HEADER)?;
    let mut same_title = LogFile::create(&config.log_dir, SAME_TITLE_LOG)?;
    let mut stats = MatchStatistics::new();

    let tx = target.transaction()?;
    {
        let mut update = tx.prepare("UPDATE publication_manuscript SET original_filename = ?1 WHERE id = ?2")?;
        for source in &config.manuscripts {
            let Some(collection_id) = collections.get(source.legacy_id) else {
                eprintln!("Warning: collection {} was not migrated, skipping", source.legacy_id);
                continue;
            };
            let files = titled_files(&config.svn_path(&source.dir), &config.svn_root)?;
            let (index, duplicates) = index_by_title(files);
            for (title, path) in &duplicates {
                same_title.line(&format!("TITLE: {} PATH: {}", title, path))?;
            }

            let manuscripts = collection_manuscripts(&tx, collection_id)?;
            let mut progress = JobProgress::new(&format!("Manuscripts {}", source.legacy_id), manuscripts.len());
            for (id, name) in &manuscripts {
                progress.inc();
                let name = name.trim();
                match index.get(name) {
                    Some(path) => {
                        update.execute(params![path, id])?;
                        log.record_match(name, path)?;
                        stats.record(true);
                    }
                    None => {
                        log.record_miss(&format!("{} MANUSCRIPT ID: {}", name, id))?;
                        stats.record(false);
                    }
                }
            }
            progress.finish(&format!("{} duplicate titles", duplicates.len()));
        }
    }
    tx.commit().context("Failed to commit manuscript paths")?;

    same_title.finish()?;
    stats.log_phase("manuscript-paths");
    log.finish(&stats.summary("Manuscripts"))?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectionDir;
    use crate::idmap::{IdMap, COLLECTION_IDS};
    use crate::jobs::fixtures;
    use std::fs;
    use tempfile::TempDir;

    fn pair(title: &str, path: &str) -> (String, String) {
        (title.to_string(), path.to_string())
    }

    #[test]
    fn test_index_by_title_excludes_duplicates() {
        let (index, duplicates) = index_by_title(vec![
            pair("A", "a1"),
            pair("B", "b1"),
            pair("A", "a2"),
            pair("A", "a3"),
            pair("C", "c1"),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index["B"], "b1");
        assert!(!index.contains_key("A"));
        assert_eq!(duplicates, vec![pair("A", "a2"), pair("A", "a3"), pair("A", "a1")]);
    }

    fn manuscript_file(root: &Path, rel: &str, title: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            path,
            format!("<TEI><teiHeader><fileDesc><titleStmt><title> {title} </title></titleStmt></fileDesc></teiHeader><text/></TEI>"),
        )
        .unwrap();
    }

    #[test]
    fn test_run_matches_header_titles() {
        let dir = TempDir::new().unwrap();
        let svn = dir.path().join("svn");
        let ms_dir = "documents/Manuskript/Ljungblommor_manuskript";
        manuscript_file(&svn, &format!("{ms_dir}/a.xml"), "Till Finland, manuskript");
        manuscript_file(&svn, &format!("{ms_dir}/b.xml"), "Vintern, manuskript");
        manuscript_file(&svn, &format!("{ms_dir}/c.xml"), "Vintern, manuskript");
        fs::write(svn.join(ms_dir).join("broken.xml"), "<TEI>").unwrap();

        let config = Config {
            svn_root: svn.clone(),
            id_dir: dir.path().join("ids"),
            log_dir: dir.path().join("logs"),
            manuscripts: vec![CollectionDir {
                legacy_id: 1,
                dir: ms_dir.to_string(),
            }],
            ..Config::default()
        };

        let mut target = fixtures::target();
        let collections = fixtures::collections(&target, &[(1, 1)]);
        let publication = fixtures::publication(&target, collections[0], "Till Finland", "1_1");
        target
            .execute_batch(&format!(
                "INSERT INTO publication_manuscript (id, publication_id, name) VALUES
                    (1, {publication}, 'Till Finland, manuskript '),
                    (2, {publication}, 'Vintern, manuskript');"
            ))
            .unwrap();
        let ids: IdMap = [(1, collections[0])].into_iter().collect();
        ids.save_to(&config.id_dir, COLLECTION_IDS).unwrap();

        let stats = run(&mut target, &config).unwrap();
        assert_eq!(stats, MatchStatistics { attempted: 2, matched: 1 });

        let path: Option<String> = target
            .query_row("SELECT original_filename FROM publication_manuscript WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(path.as_deref(), Some("documents/Manuskript/Ljungblommor_manuskript/a.xml"));

        let unmatched = fs::read_to_string(config.log_dir.join(UNMATCHED_LOG)).unwrap();
        assert_eq!(
            unmatched,
            "The following manuscripts have no files connected to them.\n\
             MANUSCRIPT NAME: Vintern, manuskript MANUSCRIPT ID: 2\n"
        );
        let same_title = fs::read_to_string(config.log_dir.join(SAME_TITLE_LOG)).unwrap();
        assert_eq!(
            same_title,
            "TITLE: Vintern, manuskript PATH: documents/Manuskript/Ljungblommor_manuskript/c.xml\n\
             TITLE: Vintern, manuskript PATH: documents/Manuskript/Ljungblommor_manuskript/b.xml\n"
        );
    }
}
