//! # Cache Service
//!
//! Cache-aside reads in two layers:
//!
//! - **L1**: in-process map, each entry with its own TTL
//! - **L2**: the `cache_entries` table, shared across restarts
//!
//! Values are stored as JSON text. A read checks L1, then L2 (promoting the hit
//! into L1), and otherwise runs the loader and writes both layers.
//!
//! Failures of the L2 table are logged and treated as misses; the cache never
//! fails a request.
//!
//! ## Key Namespaces
//!
//! - `disasters:*` - disaster lists, details and stats
//! - `analytics:*` - dashboard aggregates
//! - `settings:*` - system settings
//! - `users:*` - user profiles

use chrono::Utc;
use lib_core::model::store::CacheRepository;
use lib_core::{DbPool, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

struct CachedValue {
    value: String,
    /// When this entry was cached
    timestamp: Instant,
    ttl: Duration,
}

impl CachedValue {
    fn is_fresh(&self) -> bool {
        self.timestamp.elapsed() < self.ttl
    }
}

/// Counters reported by `GET /api/settings/cache/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub local_entries: usize,
    pub persisted_entries: i64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

pub struct CacheService {
    db: DbPool,
    default_ttl: Duration,
    local: RwLock<HashMap<String, CachedValue>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheService {
    pub fn new(db: DbPool, default_ttl: Duration) -> Self {
        Self {
            db,
            default_ttl,
            local: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Return the cached value for `key`, or run `loader` and cache its result.
    ///
    /// Loader errors are returned as-is and nothing is cached.
    pub async fn get_or_set<T, F, Fut>(&self, key: &str, ttl: Option<Duration>, loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let value = loader().await?;
        self.set(key, &value, ttl.unwrap_or(self.default_ttl)).await;
        Ok(value)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        // 1. In-process layer
        {
            let local = self.local.read().await;
            if let Some(cached) = local.get(key).filter(|c| c.is_fresh()) {
                if let Ok(value) = serde_json::from_str(&cached.value) {
                    debug!("[CACHE] L1 hit: {}", key);
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(value);
                }
            }
        }

        // 2. Database layer
        let now = Utc::now();
        let entry = match CacheRepository::get(&self.db, key, now).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("[CACHE] L2 read failed for {}: {}", key, e);
                None
            }
        };

        if let Some(entry) = entry {
            match serde_json::from_str(&entry.value) {
                Ok(value) => {
                    debug!("[CACHE] L2 hit: {}", key);
                    let ttl = (entry.expires_at - now).to_std().unwrap_or_default();
                    self.local.write().await.insert(
                        key.to_string(),
                        CachedValue { value: entry.value, timestamp: Instant::now(), ttl },
                    );
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(value);
                }
                Err(e) => warn!("[CACHE] Discarding undecodable entry {}: {}", key, e),
            }
        }

        debug!("[CACHE] Miss: {}", key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("[CACHE] Could not serialize {}: {}", key, e);
                return;
            }
        };

        self.local.write().await.insert(
            key.to_string(),
            CachedValue { value: raw.clone(), timestamp: Instant::now(), ttl },
        );

        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(300));
        if let Err(e) = CacheRepository::set(&self.db, key, &raw, expires_at).await {
            warn!("[CACHE] L2 write failed for {}: {}", key, e);
        }
    }

    pub async fn invalidate(&self, key: &str) {
        self.local.write().await.remove(key);
        if let Err(e) = CacheRepository::delete(&self.db, key).await {
            warn!("[CACHE] L2 delete failed for {}: {}", key, e);
        }
        debug!("[CACHE] Invalidated {}", key);
    }

    /// Drop every key matching `pattern` (`*` matches any run of characters)
    /// from both layers. Returns the larger of the two removal counts.
    pub async fn invalidate_pattern(&self, pattern: &str) -> u64 {
        let local_removed = {
            let mut local = self.local.write().await;
            let before = local.len();
            local.retain(|key, _| !glob_match(pattern, key));
            (before - local.len()) as u64
        };

        let persisted_removed = match CacheRepository::delete_matching(&self.db, pattern).await {
            Ok(n) => n,
            Err(e) => {
                warn!("[CACHE] L2 pattern delete failed for {}: {}", pattern, e);
                0
            }
        };

        debug!(
            "[CACHE] Invalidated {} (L1: {}, L2: {})",
            pattern, local_removed, persisted_removed
        );
        local_removed.max(persisted_removed)
    }

    pub async fn stats(&self) -> CacheStats {
        let local_entries = self.local.read().await.len();
        let persisted_entries = CacheRepository::count(&self.db).await.unwrap_or_else(|e| {
            warn!("[CACHE] L2 count failed: {}", e);
            0
        });
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            local_entries,
            persisted_entries,
            hits,
            misses,
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
        }
    }
}

/// Glob match where `*` stands for any (possibly empty) run of characters.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|c| *c == '*')
}
