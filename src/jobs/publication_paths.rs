//! `publication-paths`: reading-text file of every publication.
//!
//! Title and signum collections are matched against the files of their
//! directory and counted in the summary. List collections take the path from
//! a lookup table and are logged but not counted.

use super::{collection_publications, load_collection_ids, PublicationRow};
use crate::audit::{AuditLog, MatchSink, PUBLICATION_LABELS};
use crate::config::{Config, PathStrategy, PublicationSource};
use crate::idmap::{IdMap, PUBLICATION_IDS};
use crate::lookup;
use crate::matcher::{match_by_signum, match_title, MatchResult};
use crate::progress::JobProgress;
use crate::scan::{scan_dir, to_posix_relative, CandidatePath};
use crate::stats::MatchStatistics;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use rustc_hash::FxHashMap;

pub const MATCHED_LOG: &str = "matched_reading_texts.txt";
pub const UNMATCHED_LOG: &str = "unmatched_reading_texts.txt";

/// Where a collection's candidate paths come from.
enum Resolver {
    Files(Vec<CandidatePath>),
    List(FxHashMap<String, String>),
}

/// Stored path for a list entry.
pub fn list_path(strategy: PathStrategy, dir: &str, value: &str) -> String {
    match strategy {
        PathStrategy::YearFolderList => {
            let year: String = value.chars().take(4).collect();
            format!("{}/{}/{}", dir, year, value)
        }
        PathStrategy::PathList => value.to_string(),
        _ => format!("{}/{}", dir, value),
    }
}

/// Letter signum of a migrated publication, from the legacy `p_FM` column.
fn signum(legacy: &Connection, publications: &IdMap, publication_id: i64) -> Result<Option<String>> {
    let Some(old_id) = publications.old_for(publication_id) else {
        return Ok(None);
    };
    let signum: Option<Option<String>> = legacy
        .query_row("SELECT p_FM FROM publications WHERE p_id = ?1", [old_id], |r| r.get(0))
        .optional()?;
    Ok(signum.flatten())
}

struct PathJob<'a> {
    legacy: &'a Connection,
    config: &'a Config,
    publications: IdMap,
    stats: MatchStatistics,
}

impl PathJob<'_> {
    fn resolver(&self, source: &PublicationSource) -> Result<Resolver> {
        match (&source.list, source.strategy.is_list()) {
            (Some(list), true) => Ok(Resolver::List(lookup::read_pairs(&self.config.csv_path(list))?)),
            (None, true) => anyhow::bail!("collection {} needs a lookup list", source.legacy_id),
            _ => Ok(Resolver::Files(scan_dir(&self.config.svn_path(&source.dir))?)),
        }
    }

    /// Stored path for one publication, or None if unmatched.
    fn resolve(
        &mut self,
        source: &PublicationSource,
        resolver: &Resolver,
        publication: &PublicationRow,
    ) -> Result<Option<String>> {
        let found = match resolver {
            Resolver::Files(candidates) => {
                let result = match source.strategy {
                    PathStrategy::Signum => match signum(self.legacy, &self.publications, publication.id)? {
                        Some(signum) => match_by_signum(&signum, candidates),
                        None => MatchResult::NotFound,
                    },
                    _ => match_title(&publication.name, candidates),
                };
                self.stats.record(result.is_found());
                result
                    .found()
                    .map(|c| to_posix_relative(&c.path, &self.config.svn_root))
            }
            Resolver::List(entries) => publication
                .legacy_id
                .as_ref()
                .and_then(|id| entries.get(id))
                .map(|value| list_path(source.strategy, &source.dir, value)),
        };
        Ok(found)
    }
}

pub fn run(legacy: &Connection, target: &mut Connection, config: &Config) -> Result<MatchStatistics> {
    let collections = load_collection_ids(config)?;
    let mut job = PathJob {
        legacy,
        config,
        publications: IdMap::load_from(&config.id_dir, PUBLICATION_IDS)?,
        stats: MatchStatistics::new(),
    };
    let mut log = AuditLog::create(&config.log_dir, MATCHED_LOG, UNMATCHED_LOG, PUBLICATION_LABELS)?;

    let tx = target.transaction()?;
    {
        let mut update = tx.prepare("UPDATE publication SET original_filename = ?1 WHERE id = ?2")?;
        for source in &config.publications {
            let Some(collection_id) = collections.get(source.legacy_id) else {
                eprintln!("Warning: collection {} was not migrated, skipping", source.legacy_id);
                continue;
            };
            let resolver = job.resolver(source)?;
            let publications = collection_publications(&tx, collection_id)?;
            let mut progress = JobProgress::new(&format!("Reading texts {}", source.legacy_id), publications.len());

            for publication in &publications {
                progress.inc();
                match job.resolve(source, &resolver, publication)? {
                    Some(path) => {
                        update.execute(params![path, publication.id])?;
                        log.record_match(&publication.name, &path)?;
                    }
                    None => log.record_miss(&publication.name)?,
                }
            }
            progress.finish("done");
        }
    }
    tx.commit().context("Failed to commit publication paths")?;

    job.stats.log_phase("publication-paths");
    log.finish(&job.stats.summary("Publications"))?;
    Ok(job.stats)
}
