//! Safety checks run before any job writes to a store.
//!
//! The target database is written in place, so it must never be one of the
//! stores the job reads from.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

fn resolved(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Validates that the target database is distinct from every source store.
///
/// # Arguments
/// * `target` - The database the job writes to
/// * `source_paths` - Databases the job only reads, or writes as a separate store
///
/// # Returns
/// * `Ok(())` if the target is safe to write
/// * `Err` with a descriptive message if the check fails
pub fn validate_target_path(target: &Path, source_paths: &[&Path]) -> Result<()> {
    let target_resolved = resolved(target);

    for source in source_paths {
        if target == *source || target_resolved == resolved(source) {
            bail!(
                "Safety check failed: target '{}' cannot be the same as source '{}'",
                target.display(),
                source.display()
            );
        }
    }

    let target_name = target.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if target_name.is_empty() {
        bail!(
            "Safety check failed: target '{}' is not a file path",
            target.display()
        );
    }

    Ok(())
}
