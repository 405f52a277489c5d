//! Provider capability and fetched market snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{AnalyticsError, AnalyticsResult, OiSnapshot, StrikeOi, STRIKE_TOLERANCE};

/// A source of spot, volatility and open interest for an underlying
///
/// Implementations do their own I/O, retries and auth. They must report
/// missing data as `UpstreamDataUnavailable` and never substitute a guess.
pub trait MarketDataProvider {
    /// Short identifier used in logs and report metadata
    fn name(&self) -> &str;

    /// Current spot price of `symbol`
    fn spot_price(&self, symbol: &str) -> AnalyticsResult<f64>;

    /// Volatility as a decimal fraction
    fn volatility(&self, symbol: &str) -> AnalyticsResult<f64>;

    /// Per-strike open interest for the requested strikes
    ///
    /// `spot` and `volatility` are the values already resolved for this
    /// request, so model-based sources shape OI from the same inputs the
    /// chain is priced with.
    fn open_interest(&self, symbol: &str, spot: f64, volatility: f64, strikes: &[f64]) -> AnalyticsResult<OiSnapshot>;
}

impl<P: MarketDataProvider + ?Sized> MarketDataProvider for &P {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn spot_price(&self, symbol: &str) -> AnalyticsResult<f64> {
        (**self).spot_price(symbol)
    }

    fn volatility(&self, symbol: &str) -> AnalyticsResult<f64> {
        (**self).volatility(symbol)
    }

    fn open_interest(&self, symbol: &str, spot: f64, volatility: f64, strikes: &[f64]) -> AnalyticsResult<OiSnapshot> {
        (**self).open_interest(symbol, spot, volatility, strikes)
    }
}

/// Fixed values, for the CLI and tests
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    pub spot: Option<f64>,
    pub volatility: Option<f64>,
    pub open_interest: Option<OiSnapshot>,
}

impl StaticProvider {
    pub fn new(spot: f64) -> Self {
        Self {
            spot: Some(spot),
            ..Default::default()
        }
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    pub fn with_open_interest(mut self, snapshot: OiSnapshot) -> Self {
        self.open_interest = Some(snapshot);
        self
    }
}

impl MarketDataProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn spot_price(&self, symbol: &str) -> AnalyticsResult<f64> {
        self.spot
            .ok_or_else(|| AnalyticsError::unavailable(format!("no spot price configured for {}", symbol)))
    }

    fn volatility(&self, symbol: &str) -> AnalyticsResult<f64> {
        self.volatility
            .ok_or_else(|| AnalyticsError::unavailable(format!("no volatility configured for {}", symbol)))
    }

    fn open_interest(&self, symbol: &str, _spot: f64, _volatility: f64, strikes: &[f64]) -> AnalyticsResult<OiSnapshot> {
        let snapshot = self
            .open_interest
            .as_ref()
            .ok_or_else(|| AnalyticsError::unavailable(format!("no open interest configured for {}", symbol)))?;

        let entries: Vec<StrikeOi> = snapshot
            .entries()
            .iter()
            .filter(|e| strikes.iter().any(|k| (k - e.strike).abs() < STRIKE_TOLERANCE))
            .copied()
            .collect();
        if entries.is_empty() {
            return Err(AnalyticsError::unavailable(format!(
                "no open interest for the requested {} strikes of {}",
                strikes.len(),
                symbol
            )));
        }
        OiSnapshot::new(entries)
    }
}

/// Everything fetched from a provider for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub provider: String,
    pub spot: f64,
    /// Decimal fraction
    pub volatility: f64,
    /// Override the volatility was taken from, if any
    #[serde(default)]
    pub volatility_override: Option<f64>,
    /// Strikes open interest was requested for
    #[serde(default)]
    pub strikes: Vec<f64>,
    /// `None` when the provider had no OI; pricing still works without it
    pub open_interest: Option<OiSnapshot>,
    /// Why OI is missing, when it is
    pub open_interest_error: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Fetch spot, volatility and OI for the strikes generated around spot
    ///
    /// Spot and volatility are required. A `volatility_override` skips the
    /// provider's volatility source. Missing OI is kept as `None`.
    pub fn fetch<P, F>(
        provider: &P,
        symbol: &str,
        volatility_override: Option<f64>,
        strikes_for: F,
    ) -> AnalyticsResult<Self>
    where
        P: MarketDataProvider + ?Sized,
        F: FnOnce(f64) -> AnalyticsResult<Vec<f64>>,
    {
        let spot = provider.spot_price(symbol)?;
        if !(spot.is_finite() && spot > 0.0) {
            return Err(AnalyticsError::data(format!(
                "{} returned a non-positive spot {} for {}",
                provider.name(),
                spot,
                symbol
            )));
        }

        let volatility = match volatility_override {
            Some(v) => v,
            None => provider.volatility(symbol)?,
        };

        let strikes = strikes_for(spot)?;
        let (open_interest, open_interest_error) = match provider.open_interest(symbol, spot, volatility, &strikes) {
            Ok(snapshot) => (Some(snapshot), None),
            Err(e) => {
                tracing::warn!("No open interest from {} for {}: {}", provider.name(), symbol, e);
                (None, Some(e.to_string()))
            }
        };

        tracing::info!(
            "Fetched {} from {}: spot {:.2}, vol {:.4}",
            symbol,
            provider.name(),
            spot,
            volatility
        );

        Ok(Self {
            symbol: symbol.to_string(),
            provider: provider.name().to_string(),
            spot,
            volatility,
            volatility_override,
            strikes,
            open_interest,
            open_interest_error,
            fetched_at: Utc::now(),
        })
    }

    /// Whether this snapshot answers a request with the given inputs
    ///
    /// The provider, the volatility override and the requested strike set
    /// must all match.
    pub fn matches(&self, provider: &str, volatility_override: Option<f64>, strikes: &[f64]) -> bool {
        self.provider == provider
            && self.volatility_override == volatility_override
            && self.strikes.len() == strikes.len()
            && self
                .strikes
                .iter()
                .zip(strikes)
                .all(|(a, b)| (a - b).abs() < STRIKE_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oi() -> OiSnapshot {
        OiSnapshot::new(vec![
            StrikeOi::new(24_300.0, 100.0, 200.0),
            StrikeOi::new(24_350.0, 150.0, 150.0),
            StrikeOi::new(24_400.0, 300.0, 50.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_static_provider_missing_values() {
        let provider = StaticProvider::default();
        let err = provider.spot_price("NIFTY").unwrap_err();
        assert!(matches!(err, AnalyticsError::UpstreamDataUnavailable(_)));
        assert!(provider.volatility("NIFTY").is_err());
        assert!(provider.open_interest("NIFTY", 24_360.0, 0.15, &[24_350.0]).is_err());
    }

    #[test]
    fn test_static_provider_filters_strikes() {
        let provider = StaticProvider::new(24_360.0).with_open_interest(oi());
        let snap = provider.open_interest("NIFTY", 24_360.0, 0.15, &[24_350.0, 24_400.0, 24_450.0]).unwrap();
        assert_eq!(snap.strikes(), vec![24_350.0, 24_400.0]);

        assert!(provider.open_interest("NIFTY", 24_360.0, 0.15, &[30_000.0]).is_err());
    }

    #[test]
    fn test_snapshot_fetch() {
        let provider = StaticProvider::new(24_360.0).with_volatility(0.14).with_open_interest(oi());
        let snap = MarketSnapshot::fetch(&provider, "NIFTY", None, |spot| {
            Ok(vec![(spot / 50.0).round() * 50.0])
        })
        .unwrap();

        assert_eq!(snap.spot, 24_360.0);
        assert_eq!(snap.volatility, 0.14);
        assert_eq!(snap.provider, "static");
        assert_eq!(snap.open_interest.unwrap().strikes(), vec![24_350.0]);
    }

    #[test]
    fn test_snapshot_requires_spot_and_vol() {
        let no_spot = StaticProvider::default().with_volatility(0.14);
        let err = MarketSnapshot::fetch(&no_spot, "NIFTY", None, |_| Ok(vec![])).unwrap_err();
        assert!(matches!(err, AnalyticsError::UpstreamDataUnavailable(_)));

        let no_vol = StaticProvider::new(24_360.0);
        assert!(MarketSnapshot::fetch(&no_vol, "NIFTY", None, |_| Ok(vec![])).is_err());

        // Override stands in for the missing vol source; missing OI is tolerated
        let snap = MarketSnapshot::fetch(&no_vol, "NIFTY", Some(0.2), |_| Ok(vec![24_350.0])).unwrap();
        assert_eq!(snap.volatility, 0.2);
        assert!(snap.open_interest.is_none());
        assert!(snap.open_interest_error.is_some());
    }

    #[test]
    fn test_snapshot_matches_request() {
        let provider = StaticProvider::new(24_360.0).with_open_interest(oi());
        let snap = MarketSnapshot::fetch(&provider, "NIFTY", Some(0.2), |_| Ok(vec![24_300.0, 24_350.0])).unwrap();

        assert!(snap.matches("static", Some(0.2), &[24_300.0, 24_350.0]));
        assert!(!snap.matches("static", Some(0.3), &[24_300.0, 24_350.0]));
        assert!(!snap.matches("static", None, &[24_300.0, 24_350.0]));
        assert!(!snap.matches("static", Some(0.2), &[24_350.0]));
        assert!(!snap.matches("yahoo", Some(0.2), &[24_300.0, 24_350.0]));
    }
}
