use crate::error::Result;
use crate::extract::ReadingGroups;
use crate::utils::save_json;
pub use crate::{log_info, log_warn};
use std::collections::BTreeMap;
use std::path::Path;

/// Scraped compound lists keyed by kanji, persisted across runs as JSON.
///
/// A key mapped to `null` records that the site had no data for that kanji,
/// so it is not refetched. Kanji that were never fetched are simply absent.
/// A cache that cannot be read or parsed is treated as empty and rebuilt.
#[derive(Debug, Default)]
pub struct WordCache {
    entries: BTreeMap<String, Option<ReadingGroups>>,
}

impl WordCache {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log_info!("[cache] no cache file at {}", path.display());
                return Self::default();
            }
            Err(e) => {
                log_warn!("[cache] unreadable cache {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => {
                let cache = Self { entries };
                log_info!(
                    "[cache] loaded {} entries from {}",
                    cache.len(),
                    path.display()
                );
                cache
            }
            Err(e) => {
                log_warn!(
                    "[cache] corrupt cache {}, rebuilding: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(&self.entries, &path)?;
        log_info!(
            "[cache] saved {} entries to {}",
            self.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Whether the kanji has a cache entry, including the "no data" marker.
    pub fn contains(&self, kanji: &str) -> bool {
        self.entries.contains_key(kanji)
    }

    pub fn insert(&mut self, kanji: String, groups: Option<ReadingGroups>) {
        self.entries.insert(kanji, groups);
    }

    /// Word groups for a kanji, flattening the "no data" marker to `None`.
    pub fn words(&self, kanji: &str) -> Option<&ReadingGroups> {
        self.entries.get(kanji).and_then(|groups| groups.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::TangorinWord;

    fn sample_groups() -> ReadingGroups {
        let mut groups = ReadingGroups::new();
        groups.push(
            "カ".to_string(),
            vec![TangorinWord {
                word: "火事".to_string(),
                furigana: "かじ".to_string(),
                meaning: "fire".to_string(),
            }],
        );
        groups
    }

    #[test]
    fn null_marker_counts_as_cached() {
        let mut cache = WordCache::default();
        cache.insert("火".to_string(), Some(sample_groups()));
        cache.insert("丠".to_string(), None);

        assert!(cache.contains("火"));
        assert!(cache.contains("丠"));
        assert!(!cache.contains("水"));

        assert!(cache.words("火").is_some());
        assert!(cache.words("丠").is_none());
        assert!(cache.words("水").is_none());
    }

    #[test]
    fn round_trips_through_disk() {
        let path = std::env::temp_dir().join("anki-kanji-cache-roundtrip.json");
        let mut cache = WordCache::default();
        cache.insert("火".to_string(), Some(sample_groups()));
        cache.insert("丠".to_string(), None);
        cache.save(&path).unwrap();

        let loaded = WordCache::load(&path);
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains("丠"));
        assert_eq!(loaded.words("丠"), None);
        assert_eq!(loaded.words("火"), Some(&sample_groups()));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn corrupt_cache_is_rebuilt_empty() {
        let path = std::env::temp_dir().join("anki-kanji-cache-corrupt.json");
        std::fs::write(&path, "{ not json").unwrap();

        let cache = WordCache::load(&path);
        assert!(cache.is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_cache_is_empty() {
        let cache = WordCache::load("no/such/cache.json");
        assert!(cache.is_empty());
    }
}
