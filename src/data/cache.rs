//! Local data caching
//!
//! Caches fetched market snapshots locally to reduce API calls and enable
//! offline analysis.

use std::fs;
use std::path::PathBuf;

use chrono::{Duration, Utc};

use super::{MarketDataProvider, MarketSnapshot};
use crate::core::AnalyticsResult;

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache directory
    pub cache_dir: PathBuf,
    /// Maximum snapshot age before refresh (in seconds); 0 disables caching
    pub max_age_secs: i64,
    /// Whether to use cache
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./data/cache"),
            max_age_secs: 300,
            enabled: true,
        }
    }
}

impl CacheConfig {
    fn active(&self) -> bool {
        self.enabled && self.max_age_secs > 0
    }
}

/// Data cache manager
pub struct DataCache {
    config: CacheConfig,
}

impl DataCache {
    pub fn new(config: CacheConfig) -> AnalyticsResult<Self> {
        if config.active() && !config.cache_dir.exists() {
            fs::create_dir_all(&config.cache_dir)?;
        }

        Ok(Self { config })
    }

    fn cache_path(&self, symbol: &str) -> PathBuf {
        self.config.cache_dir.join(format!("{}_snapshot.json", symbol))
    }

    /// Load a snapshot younger than the max age
    pub fn load_snapshot(&self, symbol: &str) -> AnalyticsResult<Option<MarketSnapshot>> {
        if !self.config.active() {
            return Ok(None);
        }
        let path = self.cache_path(symbol);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)?;
        let snapshot: MarketSnapshot = match serde_json::from_str(&json) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache file {:?}: {}", path, e);
                return Ok(None);
            }
        };

        let age = Utc::now() - snapshot.fetched_at;
        if age >= Duration::seconds(self.config.max_age_secs) {
            tracing::debug!("Cached snapshot for {} is stale ({}s old)", symbol, age.num_seconds());
            return Ok(None);
        }

        tracing::info!("Loaded {} snapshot from cache", symbol);
        Ok(Some(snapshot))
    }

    /// Save a snapshot to cache
    pub fn save_snapshot(&self, snapshot: &MarketSnapshot) -> AnalyticsResult<()> {
        if !self.config.active() {
            return Ok(());
        }

        let path = self.cache_path(&snapshot.symbol);
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&path, json)?;

        tracing::info!("Cached snapshot for {} at {:?}", snapshot.symbol, path);
        Ok(())
    }

    /// Clear cache for a symbol
    pub fn clear(&self, symbol: &str) -> AnalyticsResult<()> {
        let path = self.cache_path(symbol);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// List cached symbols
    pub fn list_cached(&self) -> AnalyticsResult<Vec<String>> {
        let mut symbols = Vec::new();

        if !self.config.cache_dir.exists() {
            return Ok(symbols);
        }

        for entry in fs::read_dir(&self.config.cache_dir)? {
            let file_name = entry?.file_name().to_string_lossy().to_string();
            if let Some(symbol) = file_name.strip_suffix("_snapshot.json") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

/// Cached data fetcher - combines cache with live fetching
pub struct CachedFetcher<P> {
    cache: DataCache,
    provider: P,
}

impl<P: MarketDataProvider> CachedFetcher<P> {
    pub fn new(provider: P, config: CacheConfig) -> AnalyticsResult<Self> {
        Ok(Self {
            cache: DataCache::new(config)?,
            provider,
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get a snapshot (from cache or fetch)
    ///
    /// A cached snapshot is reused only when it came from this provider with
    /// the same volatility override and the same strikes around its spot.
    pub fn get_snapshot<F>(
        &self,
        symbol: &str,
        volatility_override: Option<f64>,
        strikes_for: F,
    ) -> AnalyticsResult<MarketSnapshot>
    where
        F: Fn(f64) -> AnalyticsResult<Vec<f64>>,
    {
        if let Some(snapshot) = self.cache.load_snapshot(symbol)? {
            let strikes = strikes_for(snapshot.spot)?;
            if snapshot.matches(self.provider.name(), volatility_override, &strikes) {
                return Ok(snapshot);
            }
            tracing::debug!("Cached {} snapshot was fetched with different inputs", symbol);
        }

        tracing::info!("Fetching fresh data for {} from {}", symbol, self.provider.name());
        let snapshot = MarketSnapshot::fetch(&self.provider, symbol, volatility_override, strikes_for)?;
        self.cache.save_snapshot(&snapshot)?;

        Ok(snapshot)
    }

    /// Force refresh (bypass cache)
    pub fn refresh_snapshot<F>(
        &self,
        symbol: &str,
        volatility_override: Option<f64>,
        strikes_for: F,
    ) -> AnalyticsResult<MarketSnapshot>
    where
        F: Fn(f64) -> AnalyticsResult<Vec<f64>>,
    {
        self.cache.clear(symbol)?;
        self.get_snapshot(symbol, volatility_override, strikes_for)
    }
}
