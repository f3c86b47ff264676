//! `version-paths`: source files of publication versions.
//!
//! Each version is resolved with `disambiguate::resolve_version`, using the
//! migrated web copy (`web_root/<legacy_id>`) as content reference.

use super::load_collection_ids;
use crate::audit::LogFile;
use crate::config::{Config, VersionSource};
use crate::disambiguate::{resolve_version, FsDocuments, VersionOutcome};
use crate::progress::JobProgress;
use crate::scan::{scan_xml, to_posix_relative, CandidatePath};
use crate::stats::MatchStatistics;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};

struct VersionRow {
    id: i64,
    publication_name: String,
    legacy_id: String,
    name: String,
}

fn collection_versions(conn: &Connection, collection_id: i64) -> Result<Vec<VersionRow>> {
    let mut stmt = conn.prepare(
        "SELECT pv.id, p.name, pv.legacy_id, pv.name FROM publication_version pv
         JOIN publication p ON p.id = pv.publication_id
         WHERE p.publication_collection_id = ?1 ORDER BY pv.id",
    )?;
    let rows = stmt.query_map([collection_id], |r| {
        Ok(VersionRow {
            id: r.get(0)?,
            publication_name: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
            legacy_id: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
            name: r.get::<_, Option<String>>(3)?.unwrap_or_default(),
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Paths matched more than once: a path matched n times is reported n-1
/// times, scanning from the last match backwards.
pub fn duplicate_paths(paths: &[String]) -> Vec<&str> {
    (0..paths.len())
        .rev()
        .filter(|&i| paths[..i].contains(&paths[i]))
        .map(|i| paths[i].as_str())
        .collect()
}

/// "matched_versions" → "matched_versions_lfb.txt"
pub fn log_name(base: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{}_{}.txt", base, suffix),
        None => format!("{}.txt", base),
    }
}

/// The five logs of one version collection.
struct VersionLogs {
    directory_not_found: LogFile,
    directory_found: LogFile,
    matched: LogFile,
    unmatched: LogFile,
    duplicates: LogFile,
}

impl VersionLogs {
    fn create(config: &Config, suffix: Option<&str>) -> Result<Self> {
        let log = |base: &str| LogFile::create(&config.log_dir, &log_name(base, suffix));
        Ok(Self {
            directory_not_found: log("version_directory_not_found")?,
            directory_found: log("version_directory_found")?,
            matched: log("matched_versions")?,
            unmatched: log("unmatched_versions")?,
            duplicates: log("duplicate_matched_versions")?,
        })
    }

    fn finish(self) -> Result<()> {
        self.directory_not_found.finish()?;
        self.directory_found.finish()?;
        self.matched.finish()?;
        self.unmatched.finish()?;
        self.duplicates.finish()
    }
}

fn resolve_source(
    tx: &Connection,
    config: &Config,
    source: &VersionSource,
    collection_id: i64,
) -> Result<MatchStatistics> {
    let mut logs = VersionLogs::create(config, source.log_suffix.as_deref())?;
    let candidates: Vec<CandidatePath> = scan_xml(&config.svn_path(&source.dir))?;
    let versions = collection_versions(tx, collection_id)?;
    let mut update = tx.prepare("UPDATE publication_version SET original_filename = ?1 WHERE id = ?2")?;
    let mut stats = MatchStatistics::new();
    let mut matched_paths = Vec::new();
    let mut progress = JobProgress::new(&format!("Versions {}", source.legacy_id), versions.len());

    for version in &versions {
        progress.inc();
        let web_path = config.web_root.join(&version.legacy_id);
        let docs = FsDocuments { reference: &web_path };
        let heading = format!(
            "PUBLICATION NAME: {} VERSION ID: {}",
            version.publication_name, version.id
        );
        let web_line = format!(
            "PUBLICATION NAME: {} WEB XML PATH: {}",
            version.publication_name,
            web_path.display()
        );

        let outcome = resolve_version(
            &version.publication_name,
            version.name.trim(),
            &candidates,
            source.title_comparison,
            &docs,
        );

        if let VersionOutcome::Searched { directory_hits, .. } = &outcome {
            if !directory_hits.is_empty() {
                logs.directory_found.line(&heading)?;
                logs.directory_found.line("PATH LIST: ")?;
                for hit in directory_hits {
                    logs.directory_found
                        .line(&to_posix_relative(&hit.path, &config.svn_root))?;
                }
            }
        } else {
            logs.directory_not_found.line(&heading)?;
        }

        match outcome.result().found() {
            Some(found) => {
                let path = to_posix_relative(&found.path, &config.svn_root);
                update.execute(params![path, version.id])?;
                logs.matched.line("")?;
                logs.matched.line(&web_line)?;
                logs.matched.line(&format!("ORIGINAL PATH: {}", path))?;
                matched_paths.push(path);
                stats.record(true);
            }
            None => {
                logs.unmatched.line("")?;
                logs.unmatched.line(&web_line)?;
                stats.record(false);
            }
        }
    }
    progress.finish(&format!("{} matched", stats.matched));

    logs.matched.line("")?;
    logs.matched.line(&stats.summary("Versions"))?;
    for path in duplicate_paths(&matched_paths) {
        logs.duplicates.line(&format!("Duplicate: ORIGINAL PATH: {}", path))?;
    }
    logs.finish()?;
    Ok(stats)
}

pub fn run(target: &mut Connection, config: &Config) -> Result<MatchStatistics> {
    let collections = load_collection_ids(config)?;
    let mut total = MatchStatistics::new();

    let tx = target.transaction()?;
    for source in &config.versions {
        let Some(collection_id) = collections.get(source.legacy_id) else {
            eprintln!("Warning: collection {} was not migrated, skipping", source.legacy_id);
            continue;
        };
        let stats = resolve_source(&tx, config, source, collection_id)?;
        total.attempted += stats.attempted;
        total.matched += stats.matched;
    }
    tx.commit().context("Failed to commit version paths")?;

    total.log_phase("version-paths");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disambiguate::TitleComparison;
    use crate::idmap::{IdMap, COLLECTION_IDS};
    use crate::jobs::fixtures;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn version_file(title: &str, body: &str) -> String {
        format!("<TEI><teiHeader><title>{title}</title></teiHeader><text><body>{body}</body></text></TEI>")
    }

    #[test]
    fn test_duplicate_paths() {
        let paths: Vec<String> = ["a", "b", "a", "a", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(duplicate_paths(&paths), vec!["a", "a"]);
        assert!(duplicate_paths(&[]).is_empty());
    }

    #[test]
    fn test_log_name() {
        assert_eq!(log_name("matched_versions", Some("lfb")), "matched_versions_lfb.txt");
        assert_eq!(log_name("matched_versions", None), "matched_versions.txt");
    }

    #[test]
    fn test_run_resolves_by_title_and_content() {
        let dir = TempDir::new().unwrap();
        let svn = dir.path().join("svn");
        let web = dir.path().join("var");
        let variants = "documents/Varianter/Lasning_for_barn_varianter";
        let story_body = "<p>Sampo Lappelill var en liten lapp som bodde i fjällen.</p>";

        write(&svn, &format!("{variants}/Sampo_Lappelill/a.xml"), &version_file("Sampo Lappelill (1860)", "<p>Helt annan text om något annat.</p>"));
        write(&svn, &format!("{variants}/Sampo_Lappelill/b.xml"), &version_file("Sampo Lappelill (1860)", story_body));
        write(&svn, &format!("{variants}/Sampo_Lappelill/c.xml"), &version_file("Sampo Lappelill, 1871", "<p>x</p>"));
        write(&web, "32_15_1860.xml", &version_file("Sampo Lappelill", "<p xml:id=\"p1\">Sampo Lappelill var en liten lapp som bodde i fjällen.</p>"));

        let config = Config {
            svn_root: svn.clone(),
            web_root: web.clone(),
            id_dir: dir.path().join("ids"),
            log_dir: dir.path().join("logs"),
            versions: vec![VersionSource {
                legacy_id: 32,
                dir: variants.to_string(),
                title_comparison: TitleComparison::Contains,
                log_suffix: Some("lfb".to_string()),
            }],
            ..Config::default()
        };

        let mut target = fixtures::target();
        let collections = fixtures::collections(&target, &[(32, 1)]);
        let sampo = fixtures::publication(&target, collections[0], "Sampo Lappelill", "32_15");
        let other = fixtures::publication(&target, collections[0], "Julqvällen", "32_16");
        target
            .execute_batch(&format!(
                "INSERT INTO publication_version (id, publication_id, name, legacy_id) VALUES
                    (1, {sampo}, '1860', '32_15_1860.xml'),
                    (2, {sampo}, '1871', '32_15_1871.xml'),
                    (3, {other}, '1860', '32_16_1860.xml');"
            ))
            .unwrap();
        let ids: IdMap = [(32, collections[0])].into_iter().collect();
        ids.save_to(&config.id_dir, COLLECTION_IDS).unwrap();

        let stats = run(&mut target, &config).unwrap();
        assert_eq!(stats, MatchStatistics { attempted: 3, matched: 2 });

        let path = |id: i64| -> Option<String> {
            target
                .query_row("SELECT original_filename FROM publication_version WHERE id = ?1", [id], |r| r.get(0))
                .unwrap()
        };
        assert_eq!(path(1).as_deref(), Some(format!("{variants}/Sampo_Lappelill/b.xml").as_str()));
        assert_eq!(path(2).as_deref(), Some(format!("{variants}/Sampo_Lappelill/c.xml").as_str()));
        assert_eq!(path(3), None);

        let not_found = fs::read_to_string(config.log_dir.join("version_directory_not_found_lfb.txt")).unwrap();
        assert_eq!(not_found, "PUBLICATION NAME: Julqvällen VERSION ID: 3\n");
        let matched = fs::read_to_string(config.log_dir.join("matched_versions_lfb.txt")).unwrap();
        assert!(matched.contains(&format!("ORIGINAL PATH: {variants}/Sampo_Lappelill/b.xml\n")));
        assert!(matched.ends_with("Versions matched: 2/3. Percentage matched: 66.66666666666667\n"));
        let duplicates = fs::read_to_string(config.log_dir.join("duplicate_matched_versions_lfb.txt")).unwrap();
        assert!(duplicates.is_empty());
    }

    #[test]
    fn test_run_tolerates_broken_sibling() {
        let dir = TempDir::new().unwrap();
        let svn = dir.path().join("svn");
        let variants = "documents/Varianter";
        write(&svn, &format!("{variants}/Sampo_Lappelill/a_draft.xml"), "<TEI><text><body><p>x</body></text></TEI>");
        write(&svn, &format!("{variants}/Sampo_Lappelill/b.xml"), &version_file("Sampo Lappelill 1860", "<p>Sampo.</p>"));

        let config = Config {
            svn_root: svn.clone(),
            web_root: dir.path().join("var"),
            id_dir: dir.path().join("ids"),
            log_dir: dir.path().join("logs"),
            versions: vec![VersionSource {
                legacy_id: 32,
                dir: variants.to_string(),
                title_comparison: TitleComparison::Contains,
                log_suffix: None,
            }],
            ..Config::default()
        };

        let mut target = fixtures::target();
        let collections = fixtures::collections(&target, &[(32, 1)]);
        let sampo = fixtures::publication(&target, collections[0], "Sampo Lappelill", "32_15");
        target
            .execute(
                "INSERT INTO publication_version (id, publication_id, name, legacy_id) VALUES (1, ?1, '1860', '32_15_1860.xml')",
                [sampo],
            )
            .unwrap();
        let ids: IdMap = [(32, collections[0])].into_iter().collect();
        ids.save_to(&config.id_dir, COLLECTION_IDS).unwrap();

        let stats = run(&mut target, &config).unwrap();
        assert_eq!(stats, MatchStatistics { attempted: 1, matched: 1 });

        let found = fs::read_to_string(config.log_dir.join("version_directory_found.txt")).unwrap();
        assert_eq!(
            found,
            format!(
                "PUBLICATION NAME: Sampo Lappelill VERSION ID: 1\nPATH LIST: \n\
                 {variants}/Sampo_Lappelill/a_draft.xml\n{variants}/Sampo_Lappelill/b.xml\n"
            )
        );
        let not_found = fs::read_to_string(config.log_dir.join("version_directory_not_found.txt")).unwrap();
        assert!(not_found.is_empty());
    }
}
