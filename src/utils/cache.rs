//! Local caching for provider lookups.
//!
//! Accepted provider results are stored as JSON files so repeated queries skip the
//! network. Only matches are cached; a miss is always retried against the provider.
//!
//! # Cache Structure
//!
//! ```text
//! ~/.cache/citeflex/
//!   lookups/
//!     <md5 of provider|type|query>.json
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::CacheConfig;
use crate::models::{LookupQuery, ProviderResult};

/// Cache metadata stored with each cached item
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMetadata {
    /// When the item was cached (Unix timestamp)
    cached_at: u64,

    /// When the item expires (Unix timestamp)
    expires_at: u64,

    /// Provider that produced the result
    provider: String,

    /// Query text that was resolved
    query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedLookup {
    metadata: CacheMetadata,
    result: ProviderResult,
}

/// Result of a cache lookup
#[derive(Debug)]
pub enum CacheResult<T> {
    /// Item was found and is valid
    Hit(T),

    /// Item was not found
    Miss,

    /// Item was found but has expired
    Expired,
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub cache_dir: PathBuf,
    pub entries: usize,
    pub size_kb: u64,
    pub ttl: Duration,
}

impl CacheStats {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            cache_dir: PathBuf::new(),
            entries: 0,
            size_kb: 0,
            ttl: Duration::ZERO,
        }
    }
}

/// File-backed cache of provider lookups
#[derive(Debug, Clone)]
pub struct CacheService {
    base_dir: PathBuf,
    lookup_dir: PathBuf,
    config: CacheConfig,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl CacheService {
    /// Create a cache service from config; the directory defaults to the platform cache dir
    pub fn from_config(config: CacheConfig) -> Self {
        let base_dir = config
            .directory
            .clone()
            .unwrap_or_else(crate::config::default_cache_dir);
        let lookup_dir = base_dir.join("lookups");

        Self {
            base_dir,
            lookup_dir,
            config,
        }
    }

    /// Create the cache directories
    pub fn initialize(&self) -> std::io::Result<()> {
        if self.config.enabled {
            fs::create_dir_all(&self.lookup_dir)?;
            tracing::debug!("Cache initialized at: {}", self.base_dir.display());
        } else {
            tracing::debug!("Cache is disabled");
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn cache_dir(&self) -> &Path {
        &self.base_dir
    }

    fn lookup_key(provider: &str, query: &LookupQuery) -> String {
        let input = format!("{}|{}|{}", provider, query.reference_type, query.text.trim());
        format!("{:x}", md5::compute(input.as_bytes()))
    }

    fn lookup_path(&self, provider: &str, query: &LookupQuery) -> PathBuf {
        self.lookup_dir
            .join(format!("{}.json", Self::lookup_key(provider, query)))
    }

    /// Read a cached provider result
    pub fn get_lookup(&self, provider: &str, query: &LookupQuery) -> CacheResult<ProviderResult> {
        if !self.is_enabled() {
            return CacheResult::Miss;
        }

        let path = self.lookup_path(provider, query);
        match read_cache_file::<CachedLookup>(&path) {
            Ok(cached) if now_secs() >= cached.metadata.expires_at => {
                tracing::debug!("Cache expired for {} lookup: {}", provider, query.text);
                CacheResult::Expired
            }
            Ok(cached) => {
                tracing::debug!("Cache HIT for {} lookup: {}", provider, query.text);
                CacheResult::Hit(cached.result)
            }
            Err(_) => {
                tracing::debug!("Cache MISS for {} lookup: {}", provider, query.text);
                CacheResult::Miss
            }
        }
    }

    /// Store a matched provider result; unmatched results are ignored
    pub fn set_lookup(&self, provider: &str, query: &LookupQuery, result: &ProviderResult) {
        if !self.is_enabled() || !result.matched {
            return;
        }

        let now = now_secs();
        let cached = CachedLookup {
            metadata: CacheMetadata {
                cached_at: now,
                expires_at: now + self.config.ttl_seconds,
                provider: provider.to_string(),
                query: query.text.clone(),
            },
            result: result.clone(),
        };

        let path = self.lookup_path(provider, query);
        if let Err(e) = write_cache_file(&path, &cached) {
            tracing::warn!("Failed to cache {} lookup: {}", provider, e);
        }
    }

    /// Remove every cached entry
    pub fn clear_all(&self) -> std::io::Result<()> {
        if self.lookup_dir.exists() {
            fs::remove_dir_all(&self.lookup_dir)?;
        }
        self.initialize()?;
        tracing::info!("Cache cleared");
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if !self.is_enabled() {
            return CacheStats::disabled();
        }

        let mut entries = 0;
        let mut size = 0;
        if let Ok(dir) = self.lookup_dir.read_dir() {
            for entry in dir.flatten() {
                entries += 1;
                size += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }

        CacheStats {
            enabled: true,
            cache_dir: self.base_dir.clone(),
            entries,
            size_kb: size / 1024,
            ttl: Duration::from_secs(self.config.ttl_seconds),
        }
    }
}

fn read_cache_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, std::io::Error> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
}

fn write_cache_file<T: Serialize>(path: &Path, data: &T) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(data)?;
    fs::write(path, content)
}
