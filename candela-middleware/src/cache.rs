//! Two-tier cache for recent provider results.
//!
//! The memory tier is a moka cache with LRU eviction, a byte budget enforced
//! through a weigher, and per-entry TTLs. The optional disk tier stores one
//! JSON payload file plus a `.meta.json` sidecar per entry and is bounded by
//! its own byte budget (oldest entries go first). A disk hit is promoted back
//! into memory with whatever TTL it has left.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use candela_types::{CacheConfig, CandelaError, FetchSize, Interval};
use chrono::{DateTime, Utc};
use moka::Expiry;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const PAYLOAD_SUFFIX: &str = ".json";
const META_SUFFIX: &str = ".meta.json";

/// Cache key for a provider fetch.
#[must_use]
pub fn cache_key(symbol: &str, interval: Interval, size: FetchSize) -> String {
    format!(
        "{}_{}_{}",
        symbol.trim().to_ascii_uppercase(),
        interval.as_str(),
        size.as_str()
    )
}

/// A cached value with its bookkeeping.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// Cache key.
    pub key: String,
    /// Cached value.
    pub payload: V,
    /// When the value was first stored.
    pub created_at: DateTime<Utc>,
    /// Lifetime from `created_at`.
    pub ttl: Duration,
    /// Memory-tier hits served from this entry.
    pub access_count: AtomicU64,
    /// Serialized size, used for both byte budgets.
    pub size_bytes: u64,
}

impl<V> CacheEntry<V> {
    fn expires_at(&self) -> DateTime<Utc> {
        chrono::TimeDelta::from_std(self.ttl)
            .ok()
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.expires_at() - now).to_std().ok().filter(|d| !d.is_zero())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DiskMeta {
    key: String,
    created_at: DateTime<Utc>,
    ttl: Duration,
    size_bytes: u64,
}

struct EntryExpiry;

impl<V> Expiry<String, Arc<CacheEntry<V>>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<CacheEntry<V>>,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Arc<CacheEntry<V>>,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Counters reported by [`TieredCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries in the memory tier (approximate until pending maintenance runs).
    pub memory_entries: u64,
    /// Weighted bytes in the memory tier.
    pub memory_bytes: u64,
    /// Lookups served by memory.
    pub hits: u64,
    /// Lookups served by neither tier.
    pub misses: u64,
    /// Lookups served by disk.
    pub disk_hits: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    disk_hits: AtomicU64,
}

/// Memory + disk cache. Cheap to share behind an `Arc`.
pub struct TieredCache<V> {
    memory: Cache<String, Arc<CacheEntry<V>>>,
    disk: Option<PathBuf>,
    disk_bytes: u64,
    default_ttl: Duration,
    counters: Counters,
}

impl<V> TieredCache<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Build a cache from its configuration. The disk directory is created lazily.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let memory = Cache::builder()
            .max_capacity(config.memory_bytes)
            .weigher(|_k: &String, v: &Arc<CacheEntry<V>>| -> u32 {
                u32::try_from(v.size_bytes).unwrap_or(u32::MAX)
            })
            .expire_after(EntryExpiry)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self {
            memory,
            disk: config.dir.clone(),
            disk_bytes: config.disk_bytes,
            default_ttl: config.default_ttl,
            counters: Counters::default(),
        }
    }

    /// TTL applied by [`TieredCache::set_default`].
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look `key` up in memory, then on disk.
    pub async fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.memory.get(key).await {
            entry.access_count.fetch_add(1, Ordering::Relaxed);
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Some(entry.payload.clone());
        }
        if let Some(dir) = &self.disk {
            if let Some(entry) = self.read_disk(dir, key).await {
                let payload = entry.payload.clone();
                self.memory.insert(key.to_string(), Arc::new(entry)).await;
                self.counters.disk_hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "cache disk hit promoted to memory");
                return Some(payload);
            }
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store `value` under `key` with the default TTL.
    ///
    /// # Errors
    /// See [`TieredCache::set`].
    pub async fn set_default(&self, key: &str, value: V) -> Result<(), CandelaError> {
        self.set(key, value, self.default_ttl).await
    }

    /// Store `value` under `key` for `ttl`.
    ///
    /// The memory tier is always updated. A zero TTL is a no-op.
    ///
    /// # Errors
    /// Returns `CandelaError::Cache` when the value cannot be serialized or the
    /// disk tier cannot be written.
    pub async fn set(&self, key: &str, value: V, ttl: Duration) -> Result<(), CandelaError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let bytes = serde_json::to_vec(&value).map_err(|e| CandelaError::Cache(e.to_string()))?;
        let entry = CacheEntry {
            key: key.to_string(),
            payload: value,
            created_at: Utc::now(),
            ttl,
            access_count: AtomicU64::new(0),
            size_bytes: bytes.len() as u64,
        };
        let meta = DiskMeta {
            key: entry.key.clone(),
            created_at: entry.created_at,
            ttl,
            size_bytes: entry.size_bytes,
        };
        self.memory.insert(key.to_string(), Arc::new(entry)).await;

        if let Some(dir) = &self.disk {
            write_disk(dir, key, &bytes, &meta)
                .await
                .map_err(|e| CandelaError::Cache(format!("disk write for {key}: {e}")))?;
            self.prune_disk(dir).await;
        }
        Ok(())
    }

    /// Drop `key` from both tiers.
    pub async fn invalidate(&self, key: &str) {
        self.memory.invalidate(key).await;
        if let Some(dir) = &self.disk {
            remove_entry_files(dir, key).await;
        }
    }

    /// Drop every entry from both tiers.
    pub async fn clear(&self) {
        self.memory.invalidate_all();
        self.memory.run_pending_tasks().await;
        if let Some(dir) = &self.disk {
            for (key, _) in list_disk(dir).await {
                remove_entry_files(dir, &key).await;
            }
        }
    }

    /// Run moka's pending maintenance (evictions, expirations, size accounting).
    pub async fn run_pending_tasks(&self) {
        self.memory.run_pending_tasks().await;
    }

    /// Counters and memory-tier occupancy.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_entries: self.memory.entry_count(),
            memory_bytes: self.memory.weighted_size(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            disk_hits: self.counters.disk_hits.load(Ordering::Relaxed),
        }
    }

    async fn read_disk(&self, dir: &Path, key: &str) -> Option<CacheEntry<V>> {
        let (payload_path, meta_path) = entry_paths(dir, key);
        let meta_raw = tokio::fs::read(&meta_path).await.ok()?;
        let Ok(meta) = serde_json::from_slice::<DiskMeta>(&meta_raw) else {
            warn!(key, "corrupt cache metadata; removing entry");
            remove_entry_files(dir, key).await;
            return None;
        };
        if meta.key != key {
            debug!(key, stored = %meta.key, "disk cache entry belongs to another key");
            return None;
        }
        let payload = match tokio::fs::read(&payload_path).await {
            Ok(raw) => serde_json::from_slice::<V>(&raw).ok(),
            Err(_) => None,
        };
        let Some(payload) = payload else {
            warn!(key, "unreadable cache payload; removing entry");
            remove_entry_files(dir, key).await;
            return None;
        };
        let stored = CacheEntry {
            key: meta.key,
            payload,
            created_at: meta.created_at,
            ttl: meta.ttl,
            access_count: AtomicU64::new(0),
            size_bytes: meta.size_bytes,
        };
        let Some(remaining) = stored.remaining(Utc::now()) else {
            debug!(key, "expired disk cache entry removed");
            remove_entry_files(dir, key).await;
            return None;
        };
        // Memory keeps the time left, not the original lifetime.
        Some(CacheEntry {
            created_at: Utc::now(),
            ttl: remaining,
            ..stored
        })
    }

    async fn prune_disk(&self, dir: &Path) {
        let mut entries = list_disk(dir).await;
        let mut total: u64 = entries.iter().map(|(_, m)| m.size_bytes).sum();
        if total <= self.disk_bytes {
            return;
        }
        entries.sort_by_key(|(_, m)| m.created_at);
        for (key, meta) in entries {
            if total <= self.disk_bytes {
                break;
            }
            remove_entry_files(dir, &key).await;
            total = total.saturating_sub(meta.size_bytes);
            debug!(key, "disk cache over budget; evicted oldest entry");
        }
    }
}

/// Filesystem-safe, collision-free stem: other bytes become `%XX`.
fn file_stem(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

fn entry_paths(dir: &Path, key: &str) -> (PathBuf, PathBuf) {
    let stem = file_stem(key);
    (
        dir.join(format!("{stem}{PAYLOAD_SUFFIX}")),
        dir.join(format!("{stem}{META_SUFFIX}")),
    )
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

async fn write_disk(dir: &Path, key: &str, payload: &[u8], meta: &DiskMeta) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let (payload_path, meta_path) = entry_paths(dir, key);
    let meta_bytes = serde_json::to_vec(meta).map_err(std::io::Error::other)?;
    // Metadata last: an entry without a sidecar is never read.
    write_atomic(&payload_path, payload).await?;
    write_atomic(&meta_path, &meta_bytes).await
}

async fn remove_entry_files(dir: &Path, key: &str) {
    let (payload_path, meta_path) = entry_paths(dir, key);
    for p in [meta_path, payload_path] {
        if let Err(e) = tokio::fs::remove_file(&p).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %p.display(), error = %e, "failed to remove cache file");
            }
        }
    }
}

async fn list_disk(dir: &Path) -> Vec<(String, DiskMeta)> {
    let mut out = Vec::new();
    let Ok(mut rd) = tokio::fs::read_dir(dir).await else {
        return out;
    };
    while let Ok(Some(ent)) = rd.next_entry().await {
        let name = ent.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.ends_with(META_SUFFIX) {
            continue;
        }
        let Ok(raw) = tokio::fs::read(ent.path()).await else {
            continue;
        };
        if let Ok(meta) = serde_json::from_slice::<DiskMeta>(&raw) {
            out.push((meta.key.clone(), meta));
        }
    }
    out
}
