//! Persisted incremental-build state.
//!
//! The cache maps an asset's relative path to the last-write timestamp it
//! was processed with. A missing cache file is a normal cold start, not an
//! error; malformed lines are skipped individually so that one corrupt row
//! never discards the remaining state.
//!
//! The file format is one `<relativePath>,<ticks>` line per entry. Commas in
//! paths are not escaped; such a row fails to parse on the next load and is
//! skipped, which means the affected asset is simply reprocessed.

use std::{collections::BTreeMap, fs, path::Path};

use contentpipe_shared::log::{info, warn};

use crate::Result;

/// Mapping from cache-normalized relative asset path to the last-write
/// timestamp in ticks. Owned exclusively by the pipeline driver for the
/// duration of one run.
#[derive(Debug, Default)]
pub struct ModCache {
    entries: BTreeMap<String, i64>,
}

impl ModCache {
    /// Creates an empty [`ModCache`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the cache from `path`, replacing the current contents.
    ///
    /// Returns `Ok(false)` when the file doesn't exist, which is the
    /// cold-start case: the cache stays empty and every asset is considered
    /// outdated. Malformed lines are skipped with a diagnostic. The parsed
    /// entries replace the in-memory state only once the whole file has been
    /// scanned, so a load never leaves the cache half-updated.
    pub fn load(&mut self, path: &Path) -> Result<bool> {
        if !path.exists() {
            info!("No cache file at '{}', starting with an empty cache", path.display());
            return Ok(false);
        }
        let content = fs::read_to_string(path)?;
        let mut entries = BTreeMap::new();
        for (line_number, line) in content.lines().enumerate() {
            let Some((key, ticks)) = line.split_once(',') else {
                warn!("Skipping cache line {} without a separator: '{line}'", line_number + 1);
                continue;
            };
            let Ok(ticks) = ticks.parse::<i64>() else {
                warn!("Skipping cache line {} with an unparsable timestamp: '{line}'", line_number + 1);
                continue;
            };
            entries.insert(key.to_owned(), ticks);
        }
        self.entries = entries;
        Ok(true)
    }

    /// Writes every entry as `<key>,<ticks>` to `path`, overwriting the file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut content = String::new();
        for (key, ticks) in &self.entries {
            content.push_str(key);
            content.push(',');
            content.push_str(&ticks.to_string());
            content.push('\n');
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Whether the asset has to be reprocessed: `true` when `key` is unknown
    /// or `ticks` is strictly newer than the stored timestamp. This is the
    /// sole decision point for skipping an asset.
    pub fn entry_is_newer(&self, key: &str, ticks: i64) -> bool {
        match self.entries.get(key) {
            None => true,
            Some(stored) => ticks > *stored,
        }
    }

    /// Records the timestamp an asset was processed with.
    pub fn insert(&mut self, key: impl Into<String>, ticks: i64) {
        self.entries.insert(key.into(), ticks);
    }

    /// Returns the stored timestamp for `key`.
    pub fn get(&self, key: &str) -> Option<i64> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
