//! Artifact cache for rendered calendars.
//!
//! Rendered PDFs are written under a cache directory, one file per
//! (station, year, month), and indexed in memory. The directory survives
//! restarts; the in-memory index is rebuilt lazily from it. File
//! modification time is the creation timestamp.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use moka::future::Cache as MokaCache;
use tracing::{debug, info, warn};

use crate::domain::MonthRef;
use crate::render::sanitize_filename;

/// Default retention for rendered calendars (30 days).
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default number of artifacts held in memory.
const DEFAULT_MAX_CAPACITY: u64 = 256;

/// Errors from the artifact cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Identity of a cached calendar: resolved station identifier and month.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub station: String,
    pub period: MonthRef,
}

impl CacheKey {
    pub fn new(station: impl Into<String>, period: MonthRef) -> Self {
        Self {
            station: station.into(),
            period,
        }
    }

    /// File name of this key's artifact within the cache directory.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{:04}_{:02}.pdf",
            sanitize_filename(&self.station),
            self.period.year(),
            self.period.month()
        )
    }
}

/// A rendered calendar held by the cache.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub key: CacheKey,
    pub bytes: Vec<u8>,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Artifact {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Configuration for the artifact cache.
#[derive(Debug, Clone)]
pub struct ArtifactCacheConfig {
    /// Directory holding rendered PDFs
    pub dir: PathBuf,
    /// How long an artifact stays valid after creation
    pub retention: Duration,
    /// Maximum number of artifacts indexed in memory
    pub max_capacity: u64,
}

impl ArtifactCacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            retention: DEFAULT_RETENTION,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

/// Disk-backed cache of rendered calendars.
pub struct ArtifactCache {
    index: MokaCache<CacheKey, Arc<Artifact>>,
    dir: PathBuf,
    retention: Duration,
}

impl ArtifactCache {
    pub fn new(config: ArtifactCacheConfig) -> Self {
        // moka rejects a zero TTL
        let ttl = config.retention.max(Duration::from_secs(1));
        let index = MokaCache::builder()
            .time_to_live(ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            index,
            dir: config.dir,
            retention: config.retention,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Look up a non-expired artifact: memory first, then disk.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<Arc<Artifact>>, CacheError> {
        let now = Utc::now();

        if let Some(artifact) = self.index.get(key).await {
            if !artifact.is_expired_at(now) {
                return Ok(Some(artifact));
            }
            self.index.invalidate(key).await;
        }

        let path = self.path_for(key);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(&path, e)),
        };
        let modified = metadata.modified().map_err(|e| CacheError::io(&path, e))?;
        let Some(expires) = modified.checked_add(self.retention) else {
            return Ok(None);
        };
        if DateTime::<Utc>::from(expires) <= now || metadata.len() == 0 {
            return Ok(None);
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CacheError::io(&path, e))?;
        let artifact = Arc::new(Artifact {
            key: key.clone(),
            bytes,
            path,
            created_at: modified.into(),
            expires_at: expires.into(),
        });

        debug!(station = %key.station, period = %key.period, "artifact loaded from disk");
        self.index.insert(key.clone(), artifact.clone()).await;
        Ok(Some(artifact))
    }

    /// Store an artifact, replacing any previous one for the key.
    ///
    /// The file is written to a temporary name in the cache directory and
    /// renamed into place.
    pub async fn insert(&self, key: CacheKey, bytes: Vec<u8>) -> Result<Arc<Artifact>, CacheError> {
        let path = self.path_for(&key);
        let target = path.clone();

        let (bytes, created) = tokio::task::spawn_blocking(move || {
            write_atomic(&target, &bytes)?;
            let created = std::fs::metadata(&target)
                .and_then(|m| m.modified())
                .unwrap_or_else(|_| SystemTime::now());
            Ok::<_, CacheError>((bytes, created))
        })
        .await
        .map_err(|e| CacheError::io(&path, std::io::Error::other(e)))??;

        let expires = created.checked_add(self.retention).unwrap_or(created);
        let artifact = Arc::new(Artifact {
            key: key.clone(),
            bytes,
            path,
            created_at: created.into(),
            expires_at: expires.into(),
        });

        self.index.insert(key, artifact.clone()).await;
        Ok(artifact)
    }

    /// Delete artifacts past retention from disk and memory.
    ///
    /// Returns the number of files removed. A missing directory counts as
    /// empty.
    pub async fn sweep(&self) -> Result<usize, CacheError> {
        let now = SystemTime::now();
        let mut removed = HashSet::new();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CacheError::io(&self.dir, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("pdf") {
                continue;
            }
            let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) else {
                continue;
            };
            let expired = modified
                .checked_add(self.retention)
                .is_none_or(|expires| expires <= now);
            if !expired {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    removed.insert(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove expired artifact"),
            }
        }

        let now = Utc::now();
        let stale: Vec<_> = self
            .index
            .iter()
            .filter(|(_, artifact)| artifact.is_expired_at(now) || removed.contains(&artifact.path))
            .map(|(key, _)| key)
            .collect();
        for key in stale {
            self.index.invalidate(key.as_ref()).await;
        }

        if !removed.is_empty() {
            info!(
                removed = removed.len(),
                indexed = self.entry_count(),
                dir = %self.dir.display(),
                "swept expired artifacts"
            );
        }
        Ok(removed.len())
    }

    /// Number of artifacts indexed in memory.
    pub fn entry_count(&self) -> u64 {
        self.index.entry_count()
    }
}

/// Replace `target` with `bytes` via a temporary file in the same
/// directory. Readers see the old contents or the new, never a prefix.
pub(crate) fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| CacheError::io(dir, e))?;
    file.write_all(bytes)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| CacheError::io(file.path(), e))?;
    file.persist(target)
        .map_err(|e| CacheError::io(target, e.error))?;
    Ok(())
}
