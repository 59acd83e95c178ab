//! Sheet Cache - Keep fetched worksheets for a while
//!
//! Raw rows are kept in memory and as one JSON snapshot per worksheet, so a
//! restart within the TTL does not hit the spreadsheet service again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::DEFAULT_CACHE_DIR;
use crate::error::CacheResult;

/// A cached worksheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSheet {
    /// Locator key (see [`crate::sheets::SheetLocator::cache_key`])
    pub key: String,
    /// Human-readable origin
    pub source: String,
    /// Raw rows as fetched
    pub rows: Vec<Vec<String>>,
    /// Fetch timestamp
    pub fetched_at: DateTime<Utc>,
}

impl CachedSheet {
    /// Time since the fetch
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.fetched_at
    }

    /// True while younger than `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => self.age() < ttl,
            // Out of range: effectively never expires
            Err(_) => true,
        }
    }
}

/// Cache of fetched worksheets
pub struct SheetCache {
    /// Directory where snapshots are stored
    cache_dir: PathBuf,
    /// Loaded entries (key -> sheet)
    entries: HashMap<String, CachedSheet>,
}

impl SheetCache {
    /// Create a cache in the default directory, loading existing snapshots
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_CACHE_DIR)
    }

    /// Create a cache with a custom directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut cache = Self {
            cache_dir: PathBuf::from(dir.as_ref()),
            entries: HashMap::new(),
        };
        cache.load_all();
        cache
    }

    /// Directory holding the snapshots
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Load all snapshots; unreadable files are skipped
    fn load_all(&mut self) {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(sheet) = serde_json::from_str::<CachedSheet>(&content) {
                        self.entries.insert(sheet.key.clone(), sheet);
                    }
                }
            }
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", file_stem(key)))
    }

    /// All entries, by key, expired ones included
    pub fn list(&self) -> Vec<&CachedSheet> {
        let mut sheets: Vec<_> = self.entries.values().collect();
        sheets.sort_by(|a, b| a.key.cmp(&b.key));
        sheets
    }

    /// Entry for `key`, whatever its age
    pub fn get(&self, key: &str) -> Option<&CachedSheet> {
        self.entries.get(key)
    }

    /// Entry for `key` if younger than `ttl`
    pub fn get_fresh(&self, key: &str, ttl: Duration) -> Option<&CachedSheet> {
        self.entries.get(key).filter(|sheet| sheet.is_fresh(ttl))
    }

    /// Store freshly fetched rows
    pub fn put(
        &mut self,
        key: &str,
        source: impl Into<String>,
        rows: Vec<Vec<String>>,
    ) -> CacheResult<&CachedSheet> {
        fs::create_dir_all(&self.cache_dir)?;

        let sheet = CachedSheet {
            key: key.to_string(),
            source: source.into(),
            rows,
            fetched_at: Utc::now(),
        };

        let content = serde_json::to_string(&sheet)?;
        fs::write(self.path_for(key), content)?;

        self.entries.insert(key.to_string(), sheet);
        Ok(&self.entries[key])
    }

    /// Drop one entry. Returns whether it existed.
    pub fn invalidate(&mut self, key: &str) -> CacheResult<bool> {
        let existed = self.entries.remove(key).is_some();
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(existed)
    }

    /// Drop every entry. Returns how many there were.
    pub fn clear(&mut self) -> CacheResult<usize> {
        let keys: Vec<String> = self.entries.keys().cloned().collect();
        for key in &keys {
            self.invalidate(key)?;
        }
        Ok(keys.len())
    }
}

impl Default for SheetCache {
    fn default() -> Self {
        Self::new()
    }
}

/// File-safe form of a key
fn file_stem(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rows() -> Vec<Vec<String>> {
        vec![vec!["Assets".to_string()], vec!["A-1".to_string(), "Oven".to_string()]]
    }

    #[test]
    fn test_put_then_get_fresh() {
        let dir = tempdir().unwrap();
        let mut cache = SheetCache::with_dir(dir.path());

        cache.put("abc-0", "abc [sheet 0]", rows()).unwrap();

        let hit = cache.get_fresh("abc-0", Duration::from_secs(300)).unwrap();
        assert_eq!(hit.rows, rows());
        assert!(cache.get_fresh("abc-0", Duration::ZERO).is_none());
        assert!(cache.get_fresh("other", Duration::from_secs(300)).is_none());
    }

    #[test]
    fn test_snapshots_survive_reload() {
        let dir = tempdir().unwrap();
        SheetCache::with_dir(dir.path())
            .put("abc-0", "abc [sheet 0]", rows())
            .unwrap();

        let reloaded = SheetCache::with_dir(dir.path());
        assert_eq!(reloaded.list().len(), 1);
        assert_eq!(reloaded.get("abc-0").unwrap().source, "abc [sheet 0]");
    }

    #[test]
    fn test_expired_snapshot_is_not_fresh() {
        let dir = tempdir().unwrap();
        let stale = CachedSheet {
            key: "abc-0".into(),
            source: "abc".into(),
            rows: rows(),
            fetched_at: Utc::now() - chrono::Duration::minutes(10),
        };
        fs::write(
            dir.path().join("abc-0.json"),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        let cache = SheetCache::with_dir(dir.path());
        assert!(cache.get("abc-0").is_some());
        assert!(cache.get_fresh("abc-0", Duration::from_secs(300)).is_none());
        assert!(cache.get_fresh("abc-0", Duration::from_secs(3600)).is_some());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let dir = tempdir().unwrap();
        let mut cache = SheetCache::with_dir(dir.path());
        cache.put("a", "a", rows()).unwrap();
        cache.put("b", "b", rows()).unwrap();

        assert!(cache.invalidate("a").unwrap());
        assert!(!cache.invalidate("a").unwrap());
        assert!(!dir.path().join("a.json").exists());

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(cache.list().is_empty());
        assert!(SheetCache::with_dir(dir.path()).list().is_empty());
    }

    #[test]
    fn test_missing_dir_is_empty_cache() {
        let cache = SheetCache::with_dir("/nonexistent/assettag-cache");
        assert!(cache.list().is_empty());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("abc-gid12"), "abc-gid12");
        assert_eq!(file_stem("a/b c"), "a-b-c");
    }
}
