// File cache - Durable TTL cache for merged series, one JSON document per key
//
// Writes go to a unique `.tmp` file and are renamed into place, so readers
// see either the previous document or the new one. Expired entries stay on
// disk until overwritten or purged.

use crate::domain::series::{RangeSpec, SeriesPoint};
use crate::error::{Result, SgsError};
use crate::infrastructure::clock::Clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

const ENTRY_EXTENSION: &str = "json";
const TMP_EXTENSION: &str = "tmp";
// Temp files older than this belong to an abandoned write.
const ORPHAN_TMP_AGE: Duration = Duration::from_secs(600);

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fully resolved code plus normalized query shape. Aliases never reach here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub code: u32,
    pub range: RangeSpec,
}

impl CacheKey {
    pub fn new(code: u32, range: RangeSpec) -> Self {
        Self { code, range }
    }

    fn file_stem(&self) -> String {
        match self.range {
            RangeSpec::Between { start, end } => format!("{}_{}_{}", self.code, start, end),
            RangeSpec::Last(n) => format!("{}_last{}", self.code, n),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    stored_at: DateTime<Utc>,
    ttl_secs: u64,
    points: Vec<SeriesPoint>,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.stored_at);
        age.num_seconds() < 0 || age.num_seconds() as u64 >= self.ttl_secs
    }
}

pub struct FileCache {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    /// Open (creating if needed) a cache directory.
    pub async fn open(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| unavailable(&dir, e))?;

        let metadata = tokio::fs::metadata(&dir)
            .await
            .map_err(|e| unavailable(&dir, e))?;
        if !metadata.is_dir() || metadata.permissions().readonly() {
            return Err(SgsError::CacheUnavailable(format!(
                "{} is not a writable directory",
                dir.display()
            )));
        }

        Ok(Self { dir, clock })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.file_stem(), ENTRY_EXTENSION))
    }

    async fn read_entry(&self, path: &Path) -> Result<Option<StoredEntry>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable(path, e)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!("Ignoring undecodable cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Payload for `key`, or `None` when absent or expired.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Vec<SeriesPoint>>> {
        let path = self.entry_path(key);
        let Some(entry) = self.read_entry(&path).await? else {
            tracing::debug!("Cache miss for {}", key.file_stem());
            return Ok(None);
        };

        if entry.is_expired(self.clock.now()) {
            tracing::debug!("Cache entry expired for {}", key.file_stem());
            return Ok(None);
        }

        tracing::debug!("Cache hit for {} ({} points)", key.file_stem(), entry.points.len());
        Ok(Some(entry.points))
    }

    /// Store `points` under `key`, replacing any previous entry atomically.
    pub async fn put(&self, key: &CacheKey, points: &[SeriesPoint], ttl: Duration) -> Result<()> {
        let entry = StoredEntry {
            key: key.file_stem(),
            stored_at: self.clock.now(),
            ttl_secs: ttl.as_secs(),
            points: points.to_vec(),
        };
        let body = serde_json::to_vec(&entry)
            .map_err(|e| SgsError::CacheUnavailable(format!("serialize cache entry: {e}")))?;

        let path = self.entry_path(key);
        let tmp_path = self.dir.join(format!(
            "{}.{}.{}.{}",
            key.file_stem(),
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed),
            TMP_EXTENSION
        ));

        if let Err(e) = tokio::fs::write(&tmp_path, body).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(unavailable(&tmp_path, e));
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(unavailable(&path, e));
        }

        tracing::debug!(
            "Cache stored {} ({} points, ttl {:?})",
            key.file_stem(),
            points.len(),
            ttl
        );
        Ok(())
    }

    async fn entry_paths(&self) -> Result<Vec<PathBuf>> {
        self.paths_with_extension(ENTRY_EXTENSION).await
    }

    async fn paths_with_extension(&self, extension: &str) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| unavailable(&self.dir, e))?;

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| unavailable(&self.dir, e))?
        {
            let path = item.path();
            if path.extension().is_some_and(|ext| ext == extension) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Remove leftover temp files. With `min_age` set, only files not
    /// modified for that long are removed so in-flight writes survive.
    async fn remove_tmp_files(&self, min_age: Option<Duration>) -> Result<usize> {
        let mut removed = 0;
        for path in self.paths_with_extension(TMP_EXTENSION).await? {
            if let Some(min_age) = min_age {
                let age = tokio::fs::metadata(&path)
                    .await
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|modified| SystemTime::now().duration_since(modified).ok());
                if !age.is_some_and(|age| age >= min_age) {
                    continue;
                }
            }
            if tokio::fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!("Cache: {} orphaned temp files removed", removed);
        }
        Ok(removed)
    }

    /// Remove every entry and temp file. Returns the number of entries removed.
    pub async fn invalidate_all(&self) -> Result<usize> {
        self.remove_tmp_files(None).await?;
        let mut removed = 0;
        for path in self.entry_paths().await? {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(unavailable(&path, e)),
            }
        }
        tracing::info!("Cache cleared ({} entries)", removed);
        Ok(removed)
    }

    /// Remove expired or undecodable entries, and temp files left by
    /// abandoned writes. Returns the number of entries removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        self.remove_tmp_files(Some(ORPHAN_TMP_AGE)).await?;
        let now = self.clock.now();
        let mut removed = 0;
        for path in self.entry_paths().await? {
            let stale = match self.read_entry(&path).await? {
                Some(entry) => entry.is_expired(now),
                None => true,
            };
            if stale && tokio::fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!("Cache: {} expired entries removed", removed);
        }
        Ok(removed)
    }

}

fn unavailable(path: &Path, error: std::io::Error) -> SgsError {
    SgsError::CacheUnavailable(format!("{}: {}", path.display(), error))
}
