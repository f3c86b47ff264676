//! Error types for candidate discovery and XML access.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the matching core.
///
/// Directory-level errors are fatal for a run. File-level errors are
/// reported per item by the jobs and do not stop a batch.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Collection root does not exist.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed while listing a directory below the root.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Failed to read a candidate or reference file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content is not well-formed XML.
    #[error("failed to parse XML {path}: {source}")]
    XmlParse {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    /// Expected element is absent from a document.
    #[error("element <{element}> not found in {path}")]
    MissingElement { element: String, path: PathBuf },
}

pub type Result<T> = std::result::Result<T, MatchError>;
