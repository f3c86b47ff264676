//! `comments`: one general comment per publication.
//!
//! Collections with a comment folder get the file whose name matches the
//! publication; the others get the empty comment template.

use super::{collection_publications, load_collection_ids};
use crate::audit::{AuditLog, MatchSink, PUBLICATION_LABELS};
use crate::config::Config;
use crate::matcher::match_title;
use crate::progress::JobProgress;
use crate::scan::{scan_dir, to_posix_relative};
use crate::stats::MatchStatistics;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};

pub const MATCHED_LOG: &str = "matched_comments.txt";
pub const UNMATCHED_LOG: &str = "unmatched_comments.txt";

#[derive(Debug)]
pub struct CommentsReport {
    pub stats: MatchStatistics,
    pub comments: usize,
}

pub fn run(target: &mut Connection, config: &Config) -> Result<CommentsReport> {
    let collections = load_collection_ids(config)?;
    let mut log = AuditLog::create(&config.log_dir, MATCHED_LOG, UNMATCHED_LOG, PUBLICATION_LABELS)?;
    let mut stats = MatchStatistics::new();
    let mut comments = 0;

    let tx = target.transaction()?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO publication_comment (published, legacy_id, original_filename) VALUES (?1, ?2, ?3)",
        )?;
        let mut link = tx.prepare("UPDATE publication SET publication_comment_id = ?1 WHERE id = ?2")?;

        for source in &config.comments {
            let Some(collection_id) = collections.get(source.legacy_id) else {
                eprintln!("Warning: collection {} was not migrated, skipping", source.legacy_id);
                continue;
            };
            let candidates = match &source.dir {
                Some(dir) => Some(scan_dir(&config.svn_path(dir))?),
                None => None,
            };
            let publications = collection_publications(&tx, collection_id)?;
            let mut progress = JobProgress::new(&format!("Comments {}", source.legacy_id), publications.len());

            for publication in &publications {
                progress.inc();
                let original_filename = match &candidates {
                    Some(candidates) => {
                        let found = match_title(&publication.name, candidates).found();
                        stats.record(found.is_some());
                        match found {
                            Some(c) => {
                                let path = to_posix_relative(&c.path, &config.svn_root);
                                log.record_match(&publication.name, &path)?;
                                Some(path)
                            }
                            None => {
                                log.record_miss(&publication.name)?;
                                None
                            }
                        }
                    }
                    None => Some(config.comment_template.clone()),
                };

                insert.execute(params![publication.published, publication.legacy_id, original_filename])?;
                link.execute(params![tx.last_insert_rowid(), publication.id])?;
                comments += 1;
            }
            progress.finish(&format!("{} comments", publications.len()));
        }
    }
    tx.commit().context("Failed to commit comments")?;

    stats.log_phase("comments");
    log.finish(&stats.summary("Publications"))?;
    Ok(CommentsReport { stats, comments })
}
