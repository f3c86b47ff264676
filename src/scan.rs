//! Candidate discovery: recursive listing of a collection directory.

use crate::error::{MatchError, Result};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// A file found below a collection root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidatePath {
    pub path: PathBuf,
    /// Filename without extension.
    pub stem: String,
    /// Name of the directory directly containing the file.
    pub parent_dir: String,
}

impl CandidatePath {
    pub fn new(path: PathBuf) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent_dir = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            stem,
            parent_dir,
        }
    }

    pub fn is_xml(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
    }
}

/// List every regular file below `root`, sorted by full path.
///
/// Symbolic links are not followed. The sort makes candidate order, and
/// therefore first-match-wins tie-breaking, independent of the filesystem.
pub fn scan_dir(root: &Path) -> Result<Vec<CandidatePath>> {
    if !root.is_dir() {
        return Err(MatchError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|source| MatchError::DirectoryRead {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source,
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files.into_iter().map(CandidatePath::new).collect())
}

/// Like `scan_dir`, keeping only `.xml` files.
pub fn scan_xml(root: &Path) -> Result<Vec<CandidatePath>> {
    Ok(scan_dir(root)?.into_iter().filter(CandidatePath::is_xml).collect())
}

/// Path of `path` relative to `root`, with `/` separators.
/// Falls back to the full path when `path` is not below `root`.
pub fn to_posix_relative(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::RootDir => Some(String::new()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<TEI/>").unwrap();
    }

    #[test]
    fn test_scan_dir_recurses_and_sorts() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b/deep/nested/z.xml");
        touch(dir.path(), "a.xml");
        touch(dir.path(), "b/c.txt");
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        let found = scan_dir(dir.path()).unwrap();
        let rel: Vec<String> = found
            .iter()
            .map(|c| to_posix_relative(&c.path, dir.path()))
            .collect();
        assert_eq!(rel, vec!["a.xml", "b/c.txt", "b/deep/nested/z.xml"]);
    }

    #[test]
    fn test_scan_xml_filters_extension() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "one.xml");
        touch(dir.path(), "two.XML");
        touch(dir.path(), "notes.txt");
        let found = scan_xml(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_scan_dir_missing_root() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        match scan_dir(&missing) {
            Err(MatchError::DirectoryNotFound { path }) => assert_eq!(path, missing),
            other => panic!("expected DirectoryNotFound, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_dir_unreadable_subdirectory() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "open/a.xml");
        touch(dir.path(), "locked/b.xml");
        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root reads through mode 000
        let readable = fs::read_dir(&locked).is_ok();
        let result = scan_dir(dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if readable {
            assert_eq!(result.unwrap().len(), 2);
        } else {
            match result {
                Err(MatchError::DirectoryRead { path, .. }) => assert_eq!(path, locked),
                other => panic!("expected DirectoryRead, got {other:?}"),
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_dir_skips_dangling_link() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.xml");
        std::os::unix::fs::symlink(dir.path().join("gone.xml"), dir.path().join("link.xml")).unwrap();

        let found = scan_dir(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].stem, "a");
    }

    #[test]
    fn test_candidate_path_parts() {
        let c = CandidatePath::new(PathBuf::from("/svn/Varianter/Sampo_Lappelill/sampo_1.xml"));
        assert_eq!(c.stem, "sampo_1");
        assert_eq!(c.parent_dir, "Sampo_Lappelill");
        assert!(c.is_xml());
    }

    #[test]
    fn test_to_posix_relative() {
        let root = Path::new("/svn");
        let path = Path::new("/svn/documents/trunk/Ljungblommor/a.xml");
        assert_eq!(
            to_posix_relative(path, root),
            "documents/trunk/Ljungblommor/a.xml"
        );
    }
}
