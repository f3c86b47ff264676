//! Plain-text audit logs written next to each job.
//!
//! One line per item, flushed when the job finishes. The matched log ends
//! with the batch summary line.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A line-oriented log file.
pub struct LogFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LogFile {
    /// Create (or truncate) `dir/name`, creating `dir` if needed.
    pub fn create(dir: &Path, name: &str) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let path = dir.join(name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))
    }
}

/// Receiver of per-item match outcomes.
pub trait MatchSink {
    fn record_match(&mut self, name: &str, path: &str) -> Result<()>;
    fn record_miss(&mut self, name: &str) -> Result<()>;
}

/// Line prefixes for one kind of item.
#[derive(Clone, Copy, Debug)]
pub struct AuditLabels {
    /// e.g. "PUBLICATION" in "PUBLICATION: x MATCHED y"
    pub matched: &'static str,
    /// e.g. "Publication name" in "Publication name: x"
    pub missed: &'static str,
}

pub const PUBLICATION_LABELS: AuditLabels = AuditLabels {
    matched: "PUBLICATION",
    missed: "Publication name",
};

pub const MANUSCRIPT_LABELS: AuditLabels = AuditLabels {
    matched: "MANUSCRIPT NAME",
    missed: "MANUSCRIPT NAME",
};

/// Matched/unmatched log pair.
pub struct AuditLog {
    labels: AuditLabels,
    matched: LogFile,
    unmatched: LogFile,
}

impl AuditLog {
    pub fn create(dir: &Path, matched: &str, unmatched: &str, labels: AuditLabels) -> Result<Self> {
        Ok(Self {
            labels,
            matched: LogFile::create(dir, matched)?,
            unmatched: LogFile::create(dir, unmatched)?,
        })
    }

    /// Free-form line in the unmatched log (headers).
    pub fn unmatched_note(&mut self, line: &str) -> Result<()> {
        self.unmatched.line(line)
    }

    /// Append the summary line to the matched log and flush both files.
    pub fn finish(mut self, summary: &str) -> Result<()> {
        self.matched.line("")?;
        self.matched.line(summary)?;
        self.matched.finish()?;
        self.unmatched.finish()
    }
}

impl MatchSink for AuditLog {
    fn record_match(&mut self, name: &str, path: &str) -> Result<()> {
        let line = format!("{}: {} MATCHED {}", self.labels.matched, name, path);
        self.matched.line(&line)
    }

    fn record_miss(&mut self, name: &str) -> Result<()> {
        let line = format!("{}: {}", self.labels.missed, name);
        self.unmatched.line(&line)
    }
}
