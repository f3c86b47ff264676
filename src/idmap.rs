//! Old → new identifier maps persisted between jobs.
//!
//! On disk a map is a JSON object with the old id as a string key:
//! `{"1": 101, "2": 102}`.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const COLLECTION_IDS: &str = "collection_ids.json";
pub const PUBLICATION_IDS: &str = "publication_ids.json";
pub const MANUSCRIPT_IDS: &str = "manuscript_ids.json";
pub const VERSION_IDS: &str = "version_ids.json";
pub const FACSIMILE_COLLECTION_IDS: &str = "facsimile_coll_ids.json";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdMap {
    ids: FxHashMap<i64, i64>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, old: i64, new: i64) {
        self.ids.insert(old, new);
    }

    pub fn get(&self, old: i64) -> Option<i64> {
        self.ids.get(&old).copied()
    }

    pub fn contains(&self, old: i64) -> bool {
        self.ids.contains_key(&old)
    }

    /// Reverse lookup: the old id mapped to `new`, if any.
    pub fn old_for(&self, new: i64) -> Option<i64> {
        self.ids
            .iter()
            .filter(|(_, v)| **v == new)
            .map(|(k, _)| *k)
            .min()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Entries sorted by old id.
    pub fn sorted(&self) -> Vec<(i64, i64)> {
        let mut entries: Vec<(i64, i64)> = self.ids.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_unstable();
        entries
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read id map {}", path.display()))?;
        let raw: BTreeMap<String, i64> = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse id map {}", path.display()))?;

        let mut map = Self::new();
        for (key, new) in raw {
            let old: i64 = key
                .trim()
                .parse()
                .with_context(|| format!("Invalid id {:?} in {}", key, path.display()))?;
            map.insert(old, new);
        }
        Ok(map)
    }

    /// Load `dir/name`.
    pub fn load_from(dir: &Path, name: &str) -> Result<Self> {
        Self::load(&dir.join(name))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let raw: BTreeMap<String, i64> = self
            .sorted()
            .into_iter()
            .map(|(old, new)| (old.to_string(), new))
            .collect();
        let json = serde_json::to_string(&raw)?;
        fs::write(path, json).with_context(|| format!("Failed to write id map {}", path.display()))?;
        Ok(())
    }

    /// Save to `dir/name`.
    pub fn save_to(&self, dir: &Path, name: &str) -> Result<()> {
        self.save(&dir.join(name))
    }
}

impl FromIterator<(i64, i64)> for IdMap {
    fn from_iter<I: IntoIterator<Item = (i64, i64)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
