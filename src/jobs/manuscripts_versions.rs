//! `manuscripts-versions`: manuscripts and versions of migrated publications.

use super::section_number;
use crate::config::Config;
use crate::idmap::{IdMap, MANUSCRIPT_IDS, PUBLICATION_IDS, VERSION_IDS};
use crate::progress::JobProgress;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};

#[derive(Debug)]
pub struct ManuscriptsVersionsReport {
    pub manuscripts: IdMap,
    pub versions: IdMap,
}

/// Row shared by `manuscripts` and `versions`.
struct Witness {
    id: i64,
    publication_id: i64,
    title: Option<String>,
    sort: Option<i64>,
    filename: Option<String>,
    kind: Option<i64>,
    section: Option<String>,
}

fn read_witnesses(legacy: &Connection, sql: &str) -> Result<Vec<Witness>> {
    let mut stmt = legacy.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut witnesses = Vec::new();
    while let Some(row) = rows.next()? {
        witnesses.push(Witness {
            id: row.get(0)?,
            publication_id: row.get(1)?,
            title: row.get(2)?,
            sort: row.get(3)?,
            filename: row.get(4)?,
            kind: row.get(5)?,
            section: row.get(6)?,
        });
    }
    Ok(witnesses)
}

fn section_id(w: &Witness, what: &str) -> Option<i64> {
    let raw = w.section.as_deref()?;
    let section = section_number(raw);
    if section.is_none() {
        eprintln!("Warning: {} {} has unreadable section id {:?}", what, w.id, raw);
    }
    section
}

fn migrate(
    target: &Connection,
    witnesses: &[Witness],
    publications: &IdMap,
    insert_sql: &str,
    what: &str,
) -> Result<IdMap> {
    let mut progress = JobProgress::new(what, witnesses.len());
    let mut insert = target.prepare(insert_sql)?;
    let mut ids = IdMap::new();
    for w in witnesses {
        progress.inc();
        // Unpublished publications were not migrated.
        let Some(publication_id) = publications.get(w.publication_id) else {
            continue;
        };
        insert.execute(params![
            publication_id,
            w.title,
            w.sort,
            w.filename,
            w.kind,
            section_id(w, what),
        ])?;
        ids.insert(w.id, target.last_insert_rowid());
    }
    progress.finish(&format!("migrated {} of {}", ids.len(), witnesses.len()));
    Ok(ids)
}

pub fn run(legacy: &Connection, target: &mut Connection, config: &Config) -> Result<ManuscriptsVersionsReport> {
    let publications = IdMap::load_from(&config.id_dir, PUBLICATION_IDS)?;

    let manuscripts = read_witnesses(
        legacy,
        "SELECT m_id, m_publication_id, m_title, m_sort, m_filename, m_type, m_section_id
         FROM manuscripts ORDER BY m_id",
    )?;
    let versions = read_witnesses(
        legacy,
        "SELECT v_id, v_publication_id, v_title, v_sort, v_filename, v_type, v_section_id
         FROM versions ORDER BY v_id",
    )?;

    let tx = target.transaction()?;
    let manuscript_ids = migrate(
        &tx,
        &manuscripts,
        &publications,
        "INSERT INTO publication_manuscript (publication_id, name, sort_order, legacy_id, type, section_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        "Manuscripts",
    )?;
    let version_ids = migrate(
        &tx,
        &versions,
        &publications,
        "INSERT INTO publication_version (publication_id, name, sort_order, legacy_id, type, section_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        "Versions",
    )?;
    tx.commit().context("Failed to commit manuscripts and versions")?;

    manuscript_ids.save_to(&config.id_dir, MANUSCRIPT_IDS)?;
    version_ids.save_to(&config.id_dir, VERSION_IDS)?;

    Ok(ManuscriptsVersionsReport {
        manuscripts: manuscript_ids,
        versions: version_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::fixtures;
    use tempfile::TempDir;

    #[test]
    fn test_run_skips_unmigrated_publications() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            id_dir: dir.path().to_path_buf(),
            ..Config::default()
        };

        let legacy = fixtures::legacy();
        legacy
            .execute_batch(
                "INSERT INTO manuscripts VALUES
                    (1, 100, 'Ms A', 1, 'ms_a.xml', 1, 'ch3'),
                    (2, 999, 'Ms B', 2, 'ms_b.xml', 1, NULL);
                 INSERT INTO versions VALUES
                    (5, 100, 'Version 1', 1, 2, 'v1.xml', NULL),
                    (6, 100, 'Version 2', 2, 2, 'v2.xml', 'ch14');",
            )
            .unwrap();

        let mut target = fixtures::target();
        let collections = fixtures::collections(&target, &[(1, 1)]);
        let publication = fixtures::publication(&target, collections[0], "Dikt", "1_1");
        let map: IdMap = [(100, publication)].into_iter().collect();
        map.save_to(dir.path(), PUBLICATION_IDS).unwrap();

        let report = run(&legacy, &mut target, &config).unwrap();
        assert_eq!(report.manuscripts.len(), 1);
        assert!(!report.manuscripts.contains(2));
        assert_eq!(report.versions.len(), 2);

        let section: Option<i64> = target
            .query_row(
                "SELECT section_id FROM publication_manuscript WHERE id = ?1",
                [report.manuscripts.get(1).unwrap()],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(section, Some(3));

        let (legacy_id, section): (String, Option<i64>) = target
            .query_row(
                "SELECT legacy_id, section_id FROM publication_version WHERE id = ?1",
                [report.versions.get(6).unwrap()],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(legacy_id, "v2.xml");
        assert_eq!(section, Some(14));

        assert!(dir.path().join(VERSION_IDS).exists());
    }
}
