//! Application settings
//!
//! Loaded from defaults, an optional JSON file and environment variables.
//! `APP_ENV` selects a profile that adjusts the snapshot cache timeout.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsConfig;
use crate::chain::{ChainConfig, SideSelection, StrikePolicy};
use crate::core::{AnalyticsError, AnalyticsResult};
use crate::data::CacheConfig;

/// Deployment profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Development,
    Production,
    Testing,
}

impl Profile {
    /// Snapshot cache timeout for this profile
    pub fn cache_timeout_secs(&self) -> i64 {
        match self {
            Profile::Development => 60,
            Profile::Production => 300,
            Profile::Testing => 0,
        }
    }
}

impl FromStr for Profile {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Profile::Development),
            "production" | "prod" => Ok(Profile::Production),
            "testing" | "test" => Ok(Profile::Testing),
            other => Err(AnalyticsError::config(format!(
                "unknown APP_ENV '{}', expected development, production or testing",
                other
            ))),
        }
    }
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub profile: Profile,
    /// Underlying index
    pub symbol: String,
    pub risk_free_rate: f64,
    pub dividend_yield: f64,
    pub strike_step: f64,
    /// Strikes in a full chain
    pub num_strikes: usize,
    /// ±strikes in an ATM-only chain
    pub atm_window: usize,
    pub max_strikes_in_chart: usize,
    /// ±strikes around ATM in the near-ATM Greek table
    pub greeks_calculation_range: usize,
    /// Decimal fraction; when set, no volatility is fetched
    pub default_volatility: Option<f64>,
    pub cache_timeout_secs: i64,
    pub cache_dir: PathBuf,
    pub request_timeout_secs: u64,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub support_resistance_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            symbol: "NIFTY".to_string(),
            risk_free_rate: 0.065,
            dividend_yield: 0.0,
            strike_step: 50.0,
            num_strikes: 31,
            atm_window: 5,
            max_strikes_in_chart: 21,
            greeks_calculation_range: 2,
            default_volatility: None,
            cache_timeout_secs: 300,
            cache_dir: PathBuf::from("./data/cache"),
            request_timeout_secs: 15,
            log_level: "info".to_string(),
            support_resistance_depth: 3,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> AnalyticsResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AnalyticsError::config(format!("{}={:?} is not a valid value", key, value)))
}

impl Settings {
    /// Defaults for a profile
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            profile,
            cache_timeout_secs: profile.cache_timeout_secs(),
            ..Default::default()
        }
    }

    /// Load settings from environment variables
    pub fn from_env() -> AnalyticsResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from any key/value source
    ///
    /// `APP_ENV` picks the profile defaults; other keys override them.
    pub fn from_lookup<F>(lookup: F) -> AnalyticsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let profile = match lookup("APP_ENV") {
            Some(env) => env.parse()?,
            None => Profile::default(),
        };
        let mut settings = Self::for_profile(profile);
        settings.apply_overrides(lookup)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> AnalyticsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnalyticsError::config(format!("Failed to read {}: {}", path.display(), e)))?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| AnalyticsError::config(format!("Failed to parse {}: {}", path.display(), e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Build settings from all sources
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file
    /// 3. Profile defaults
    pub fn load(config_file: Option<&Path>) -> AnalyticsResult<Self> {
        let mut settings = match config_file {
            Some(path) => Self::from_file(path)?,
            None => {
                let profile = match std::env::var("APP_ENV") {
                    Ok(env) => env.parse()?,
                    Err(_) => Profile::default(),
                };
                Self::for_profile(profile)
            }
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> AnalyticsResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SYMBOL") {
            self.symbol = v.trim().to_uppercase();
        }
        if let Some(v) = lookup("RISK_FREE_RATE") {
            self.risk_free_rate = parse_var("RISK_FREE_RATE", &v)?;
        }
        if let Some(v) = lookup("DIVIDEND_YIELD") {
            self.dividend_yield = parse_var("DIVIDEND_YIELD", &v)?;
        }
        if let Some(v) = lookup("STRIKE_STEP") {
            self.strike_step = parse_var("STRIKE_STEP", &v)?;
        }
        if let Some(v) = lookup("NUM_STRIKES") {
            self.num_strikes = parse_var("NUM_STRIKES", &v)?;
        }
        if let Some(v) = lookup("ATM_WINDOW") {
            self.atm_window = parse_var("ATM_WINDOW", &v)?;
        }
        if let Some(v) = lookup("MAX_STRIKES_IN_CHART") {
            self.max_strikes_in_chart = parse_var("MAX_STRIKES_IN_CHART", &v)?;
        }
        if let Some(v) = lookup("GREEKS_CALCULATION_RANGE") {
            self.greeks_calculation_range = parse_var("GREEKS_CALCULATION_RANGE", &v)?;
        }
        if let Some(v) = lookup("VOLATILITY") {
            self.default_volatility = Some(parse_var("VOLATILITY", &v)?);
        }
        if let Some(v) = lookup("CACHE_TIMEOUT") {
            self.cache_timeout_secs = parse_var("CACHE_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("CACHE_DIR") {
            self.cache_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT") {
            self.request_timeout_secs = parse_var("REQUEST_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.log_level = v.trim().to_lowercase();
        }
        if let Some(v) = lookup("SR_DEPTH") {
            self.support_resistance_depth = parse_var("SR_DEPTH", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        if !(self.strike_step.is_finite() && self.strike_step > 0.0) {
            return Err(AnalyticsError::config(format!(
                "strike_step must be positive, got {}",
                self.strike_step
            )));
        }
        if !(self.dividend_yield.is_finite() && self.dividend_yield >= 0.0) {
            return Err(AnalyticsError::config(format!(
                "dividend_yield must be non-negative, got {}",
                self.dividend_yield
            )));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(AnalyticsError::config("risk_free_rate must be finite"));
        }
        if self.num_strikes == 0 {
            return Err(AnalyticsError::config("num_strikes must be at least 1"));
        }
        if let Some(vol) = self.default_volatility {
            if !(vol.is_finite() && vol >= 0.0) {
                return Err(AnalyticsError::config(format!("volatility must be non-negative, got {}", vol)));
            }
        }
        if self.cache_timeout_secs < 0 {
            return Err(AnalyticsError::config("cache timeout must not be negative"));
        }
        Ok(())
    }

    /// Chain settings; `atm_only` narrows to the ATM window
    pub fn chain_config(&self, atm_only: bool) -> ChainConfig {
        ChainConfig {
            strike_step: self.strike_step,
            policy: if atm_only {
                StrikePolicy::AtmWindow(self.atm_window)
            } else {
                StrikePolicy::FixedCount(self.num_strikes)
            },
            sides: SideSelection::Both,
            atm_threshold: None,
        }
    }

    pub fn analytics_config(&self) -> AnalyticsConfig {
        AnalyticsConfig {
            support_resistance_depth: self.support_resistance_depth,
            max_strikes_in_chart: self.max_strikes_in_chart,
            greeks_calculation_range: self.greeks_calculation_range,
            ..Default::default()
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            cache_dir: self.cache_dir.clone(),
            max_age_secs: self.cache_timeout_secs,
            enabled: self.cache_timeout_secs > 0,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.symbol, "NIFTY");
        assert_eq!(s.risk_free_rate, 0.065);
        assert_eq!(s.dividend_yield, 0.0);
        assert_eq!(s.num_strikes, 31);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_profiles() {
        let dev = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(dev.profile, Profile::Development);
        assert_eq!(dev.cache_timeout_secs, 60);

        let test = Settings::from_lookup(lookup(&[("APP_ENV", "testing")])).unwrap();
        assert_eq!(test.cache_timeout_secs, 0);
        assert!(!test.cache_config().enabled);

        let prod = Settings::from_lookup(lookup(&[("APP_ENV", "prod")])).unwrap();
        assert_eq!(prod.cache_timeout_secs, 300);

        assert!(Settings::from_lookup(lookup(&[("APP_ENV", "staging")])).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let s = Settings::from_lookup(lookup(&[
            ("SYMBOL", "banknifty"),
            ("RISK_FREE_RATE", "0.07"),
            ("STRIKE_STEP", "100"),
            ("VOLATILITY", "0.18"),
            ("CACHE_TIMEOUT", "30"),
            ("SR_DEPTH", "5"),
        ]))
        .unwrap();

        assert_eq!(s.symbol, "BANKNIFTY");
        assert_eq!(s.risk_free_rate, 0.07);
        assert_eq!(s.strike_step, 100.0);
        assert_eq!(s.default_volatility, Some(0.18));
        assert_eq!(s.cache_timeout_secs, 30);
        assert_eq!(s.analytics_config().support_resistance_depth, 5);
    }

    #[test]
    fn test_malformed_env_is_config_error() {
        let err = Settings::from_lookup(lookup(&[("RISK_FREE_RATE", "six percent")])).unwrap_err();
        assert!(matches!(err, AnalyticsError::Config(_)));

        let err = Settings::from_lookup(lookup(&[("STRIKE_STEP", "-50")])).unwrap_err();
        assert!(matches!(err, AnalyticsError::Config(_)));

        let err = Settings::from_lookup(lookup(&[("DIVIDEND_YIELD", "-0.01")])).unwrap_err();
        assert!(matches!(err, AnalyticsError::Config(_)));
    }

    #[test]
    fn test_chain_config() {
        let s = Settings::default();
        assert_eq!(s.chain_config(false).policy, StrikePolicy::FixedCount(31));
        assert_eq!(s.chain_config(true).policy, StrikePolicy::AtmWindow(5));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"symbol": "NIFTY", "strike_step": 100.0, "num_strikes": 11}"#).unwrap();

        let s = Settings::from_file(&path).unwrap();
        assert_eq!(s.strike_step, 100.0);
        assert_eq!(s.num_strikes, 11);
        // Unspecified fields keep their defaults
        assert_eq!(s.risk_free_rate, 0.065);

        std::fs::write(&path, r#"{"strike_step": 0.0}"#).unwrap();
        assert!(Settings::from_file(&path).is_err());
    }
}
