use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Current cache file format version.
const CACHE_VERSION: u32 = 1;

/// A resolved geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
struct CacheFile {
    version: u32,
    entries: HashMap<String, Option<GeoPoint>>,
}

#[derive(Serialize)]
struct CacheFileRef<'a> {
    version: u32,
    entries: &'a HashMap<String, Option<GeoPoint>>,
}

/// Durable IP -> location cache. A `None` entry marks an address that failed
/// resolution and must never be retried, even across runs.
pub struct GeoCache {
    path: PathBuf,
    entries: HashMap<String, Option<GeoPoint>>,
}

impl GeoCache {
    /// Load the cache from `path` if it exists, otherwise start empty.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let entries = if path.exists() {
            let file = File::open(path)?;
            let cache: CacheFile = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("corrupt geo cache: {}", path.display()))?;
            if cache.version != CACHE_VERSION {
                log::warn!(
                    "geo cache version {} unsupported, starting empty",
                    cache.version
                );
                HashMap::new()
            } else {
                cache.entries
            }
        } else {
            HashMap::new()
        };
        log::debug!("geo cache loaded: {} entries", entries.len());
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Cached entry for `ip`. The outer `Option` is cache presence; the inner
    /// one distinguishes a resolved point from the unresolvable sentinel.
    pub fn get(&self, ip: &str) -> Option<Option<GeoPoint>> {
        self.entries.get(ip).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry and flush the store to disk immediately, so a crash
    /// mid-run loses at most the resolution in flight. A failed flush keeps
    /// the in-memory entry and is reported as a warning.
    pub fn put(&mut self, ip: &str, value: Option<GeoPoint>) {
        self.entries.insert(ip.to_string(), value);
        if let Err(err) = self.save() {
            log::warn!("failed to flush geo cache to {}: {err}", self.path.display());
        }
    }

    fn save(&self) -> anyhow::Result<()> {
        // Write to a temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        let file = File::create(&temp_path)?;
        serde_json::to_writer_pretty(
            BufWriter::new(file),
            &CacheFileRef {
                version: CACHE_VERSION,
                entries: &self.entries,
            },
        )?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let cache = GeoCache::load(&dir.path().join("geo_ip_cache.json")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geo_ip_cache.json");

        let mut cache = GeoCache::load(&path).unwrap();
        cache.put(
            "8.8.8.8",
            Some(GeoPoint {
                latitude: 37.0,
                longitude: -122.0,
            }),
        );
        cache.put("10.0.0.1", None);

        let reloaded = GeoCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        let point = reloaded.get("8.8.8.8").unwrap().unwrap();
        assert_eq!(point.latitude, 37.0);
        assert_eq!(point.longitude, -122.0);
        // Sentinel survives the round trip as present-but-unresolvable
        assert_eq!(reloaded.get("10.0.0.1"), Some(None));
        assert_eq!(reloaded.get("1.1.1.1"), None);
    }

    #[test]
    fn test_unknown_version_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geo_ip_cache.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(br#"{ "version": 99, "entries": { "8.8.8.8": null } }"#)
            .unwrap();

        let cache = GeoCache::load(&path).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geo_ip_cache.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"not json").unwrap();
        assert!(GeoCache::load(&path).is_err());
    }
}
