//! Analysis result cache.
//!
//! Cache entries are keyed by [`cache_key`], built from the declared request
//! fields plus a caller-supplied scope naming the inputs behind the analyzer
//! (see [`fingerprint`]). Two implementations ship:
//!
//! - [`MemoryCache`]: process-local map
//! - [`FileCache`]: one JSON file per key under a directory
//!
//! File layout:
//! ```text
//! <cache_dir>/
//! └── <slug>-<hash>.cache.json   # { key, expires_at, result }
//! ```
//!
//! [`FileCache::clear`] only touches `*.cache.json` files, so the cache
//! directory may be shared with other files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::model::{AnalysisRequest, AnalysisResult};

/// Suffix of entry files written by [`FileCache`].
pub const CACHE_FILE_SUFFIX: &str = ".cache.json";

/// Build the cache key of a request.
///
/// The region is normalized to `default_region` when absent or empty. The
/// prompt is length-prefixed so field boundaries stay unambiguous. `scope`
/// identifies the inventory, configuration and catalog the result was
/// computed from; an empty scope is left out of the key.
pub fn cache_key(request: &AnalysisRequest, default_region: &str, scope: &str) -> String {
    let region = match request.region.as_deref().map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => default_region,
    };
    let scope = if scope.is_empty() {
        String::new()
    } else {
        format!("scope={}:", scope)
    };
    format!(
        "analyze:{}region={}:prompt={}:{}",
        scope,
        region,
        request.prompt.len(),
        request.prompt
    )
}

/// Stable hex digest of a sequence of inputs, for use as a cache scope.
///
/// Each part is length-prefixed, so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn fingerprint<I, B>(parts: I) -> String
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let hash = parts.into_iter().fold(FNV_OFFSET, |hash, part| {
        let part = part.as_ref();
        let hash = fnv1a(hash, &(part.len() as u64).to_le_bytes());
        fnv1a(hash, part)
    });
    format!("{:016x}", hash)
}

/// Store for analysis results.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Fetch a live entry.
    async fn get(&self, key: &str) -> CoreResult<Option<AnalysisResult>>;

    /// Store an entry that expires after `ttl`.
    async fn set(&self, key: &str, value: &AnalysisResult, ttl: Duration) -> CoreResult<()>;

    /// Remove every entry; returns how many were removed.
    async fn clear(&self) -> CoreResult<usize>;
}

/// A cached result with its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    expires_at: DateTime<Utc>,
    result: AnalysisResult,
}

impl CacheEntry {
    fn new(key: &str, result: &AnalysisResult, ttl: Duration) -> CoreResult<Self> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| CoreError::Cache(e.to_string()))?;
        Ok(Self {
            key: key.to_string(),
            expires_at: Utc::now() + ttl,
            result: result.clone(),
        })
    }

    fn is_live(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// Process-local result cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &str) -> CoreResult<Option<AnalysisResult>> {
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_live() => Ok(Some(entry.result.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &AnalysisResult, ttl: Duration) -> CoreResult<()> {
        let entry = CacheEntry::new(key, value, ttl)?;
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn clear(&self) -> CoreResult<usize> {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}

/// Convert a string to a filename-safe slug
fn slugify(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;

/// 64-bit FNV-1a; stable across builds, unlike `DefaultHasher`.
fn fnv1a(seed: u64, bytes: &[u8]) -> u64 {
    bytes.iter().fold(seed, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// File-backed result cache shared across processes.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry file for a key.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let slug: String = slugify(key).chars().take(64).collect();
        self.dir.join(format!(
            "{}-{:016x}{}",
            slug,
            fnv1a(FNV_OFFSET, key.as_bytes()),
            CACHE_FILE_SUFFIX
        ))
    }

    fn is_entry_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| {
                name.len() > CACHE_FILE_SUFFIX.len() && name.ends_with(CACHE_FILE_SUFFIX)
            })
    }
}

#[async_trait]
impl ResultCache for FileCache {
    async fn get(&self, key: &str) -> CoreResult<Option<AnalysisResult>> {
        let path = self.entry_path(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = serde_json::from_str(&content)?;
        if entry.key != key {
            debug!("Cache file {} holds a different key", path.display());
            return Ok(None);
        }
        if !entry.is_live() {
            debug!("Cache entry expired at {}", entry.expires_at);
            tokio::fs::remove_file(&path).await?;
            return Ok(None);
        }

        Ok(Some(entry.result))
    }

    async fn set(&self, key: &str, value: &AnalysisResult, ttl: Duration) -> CoreResult<()> {
        let entry = CacheEntry::new(key, value, ttl)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let content = serde_json::to_string_pretty(&entry)?;
        tokio::fs::write(self.entry_path(key), content).await?;
        Ok(())
    }

    async fn clear(&self) -> CoreResult<usize> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if Self::is_entry_file(&path) && item.file_type().await?.is_file() {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
