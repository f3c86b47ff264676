//! Store handles. Each job receives the connections it needs from the CLI;
//! nothing here is global.

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Open the legacy database read-only.
pub fn open_legacy(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open legacy database {}", path.display()))
}

/// Open an existing database for writing (target or notes store).
pub fn open_existing(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        bail!("Database not found: {}", path.display());
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Open (creating if needed) a target database.
pub fn create(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to create database {}", path.display()))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Read an optional text column that may hold an integer or text.
pub fn value_to_string(value: rusqlite::types::Value) -> Option<String> {
    use rusqlite::types::Value;
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
        Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value;
    use tempfile::TempDir;

    #[test]
    fn test_open_existing_requires_file() {
        let dir = TempDir::new().unwrap();
        assert!(open_existing(&dir.path().join("missing.sqlite3")).is_err());
    }

    #[test]
    fn test_create_then_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("target.sqlite3");
        {
            let conn = create(&path).unwrap();
            conn.execute_batch("CREATE TABLE t (x INTEGER);").unwrap();
        }
        let conn = open_existing(&path).unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(n, 0);
        let legacy = open_legacy(&path).unwrap();
        assert!(legacy.execute("INSERT INTO t VALUES (1)", []).is_err());
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(Value::Null), None);
        assert_eq!(value_to_string(Value::Integer(4)), Some("4".to_string()));
        assert_eq!(value_to_string(Value::Text("ch4".into())), Some("ch4".to_string()));
    }
}
