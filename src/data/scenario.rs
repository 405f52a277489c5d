//! Synthetic open interest
//!
//! Shapes a plausible OI distribution when no real OI feed is available:
//! heavy OI around the money, call walls at round strikes above spot, put
//! walls at round strikes below, scaled by volatility and time to expiry,
//! then jittered ±20%. The jitter comes from a seeded `ChaCha8Rng`, so the
//! same seed and inputs always give the same snapshot.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::MarketDataProvider;
use crate::core::{nearest_strike, AnalyticsError, AnalyticsResult, OiSnapshot, StrikeOi};

/// Shape parameters for generated OI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// OI at a neutral strike before multipliers
    /// Default: 50.0
    pub base_oi: f64,

    /// Distance from spot treated as the ATM zone
    /// Default: 100.0
    pub atm_range: f64,

    /// Spacing of major OI walls, measured from the ATM strike
    /// Default: 500.0
    pub major_level: f64,

    /// Spacing of minor OI walls
    /// Default: 100.0
    pub minor_level: f64,

    /// Floor applied before jitter
    /// Default: 5.0
    pub min_oi: f64,

    /// Relative jitter amplitude (0.2 = ±20%)
    /// Default: 0.2
    pub jitter: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            base_oi: 50.0,
            atm_range: 100.0,
            major_level: 500.0,
            minor_level: 100.0,
            min_oi: 5.0,
            jitter: 0.2,
        }
    }
}

/// Seeded generator of theoretical OI
#[derive(Debug, Clone)]
pub struct ScenarioGenerator {
    seed: u64,
    config: ScenarioConfig,
}

fn is_multiple(value: f64, step: f64) -> bool {
    step > 0.0 && {
        let r = value.rem_euclid(step);
        r < 1e-6 || step - r < 1e-6
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl ScenarioGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            config: ScenarioConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScenarioConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Call and put multipliers before volatility/time scaling
    fn multipliers(&self, strike: f64, spot: f64, atm_strike: f64) -> (f64, f64) {
        let cfg = &self.config;
        let distance = (strike - atm_strike).abs() / spot;

        if (strike - spot).abs() <= cfg.atm_range {
            let m = 1.5 + 0.5 * (-distance * 10.0).exp();
            return (m, m);
        }

        let offset = (strike - atm_strike).abs();
        if strike > spot {
            let call = if is_multiple(offset, cfg.major_level) {
                2.0
            } else if is_multiple(offset, cfg.minor_level) {
                1.3
            } else {
                0.8 - distance
            };
            (call, 0.5 - distance * 0.4)
        } else {
            let put = if is_multiple(offset, cfg.major_level) {
                2.2
            } else if is_multiple(offset, cfg.minor_level) {
                1.4
            } else {
                0.9 - distance * 0.3
            };
            (0.6 - distance * 0.5, put)
        }
    }

    /// Generate OI (and volume) for `strikes`
    pub fn generate(
        &self,
        spot: f64,
        strikes: &[f64],
        volatility: f64,
        days_to_expiry: f64,
    ) -> AnalyticsResult<OiSnapshot> {
        if !(spot.is_finite() && spot > 0.0) {
            return Err(AnalyticsError::invalid_parameter(format!("spot must be positive, got {}", spot)));
        }
        let atm_strike = nearest_strike(strikes, spot)
            .ok_or_else(|| AnalyticsError::invalid_parameter("no strikes to generate open interest for"))?;

        let cfg = &self.config;
        let vol_factor = 1.0 + (volatility - 0.15) * 2.0;
        let time_factor = 1.0 + (30.0 - days_to_expiry) / 30.0 * 0.5;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut entries = Vec::with_capacity(strikes.len());
        for &strike in strikes {
            let (call_mult, put_mult) = self.multipliers(strike, spot, atm_strike);
            let call_base = (cfg.base_oi * call_mult * vol_factor * time_factor).max(cfg.min_oi);
            let put_base = (cfg.base_oi * put_mult * vol_factor * time_factor).max(cfg.min_oi);

            let call_oi = round2(call_base * (1.0 - cfg.jitter + 2.0 * cfg.jitter * rng.gen::<f64>()));
            let put_oi = round2(put_base * (1.0 - cfg.jitter + 2.0 * cfg.jitter * rng.gen::<f64>()));

            // Turnover of 10-50% of OI
            let call_volume = round2(call_oi * (0.1 + 0.4 * rng.gen::<f64>()));
            let put_volume = round2(put_oi * (0.1 + 0.4 * rng.gen::<f64>()));

            entries.push(StrikeOi {
                strike,
                call_oi,
                put_oi,
                call_volume: Some(call_volume),
                put_volume: Some(put_volume),
            });
        }

        tracing::debug!(
            "Generated synthetic OI for {} strikes around {} (seed {})",
            entries.len(),
            spot,
            self.seed
        );
        OiSnapshot::new(entries)
    }
}

/// Wraps a provider and replaces its OI with generated OI
///
/// Spot and volatility still come from the wrapped provider. OI is shaped
/// from the spot and volatility resolved for the request, so a volatility
/// override reaches the generator too.
pub struct SyntheticOiProvider<P> {
    inner: P,
    generator: ScenarioGenerator,
    days_to_expiry: f64,
    name: String,
}

impl<P: MarketDataProvider> SyntheticOiProvider<P> {
    pub fn new(inner: P, generator: ScenarioGenerator, days_to_expiry: f64) -> Self {
        let name = format!("{}+synthetic-oi", inner.name());
        Self {
            inner,
            generator,
            days_to_expiry,
            name,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: MarketDataProvider> MarketDataProvider for SyntheticOiProvider<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn spot_price(&self, symbol: &str) -> AnalyticsResult<f64> {
        self.inner.spot_price(symbol)
    }

    fn volatility(&self, symbol: &str) -> AnalyticsResult<f64> {
        self.inner.volatility(symbol)
    }

    fn open_interest(&self, _symbol: &str, spot: f64, volatility: f64, strikes: &[f64]) -> AnalyticsResult<OiSnapshot> {
        self.generator.generate(spot, strikes, volatility, self.days_to_expiry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MarketSnapshot, StaticProvider};

    fn strikes() -> Vec<f64> {
        (-10..=10).map(|i| 24_350.0 + i as f64 * 50.0).collect()
    }

    #[test]
    fn test_same_seed_same_snapshot() {
        let a = ScenarioGenerator::new(42).generate(24_360.0, &strikes(), 0.15, 7.0).unwrap();
        let b = ScenarioGenerator::new(42).generate(24_360.0, &strikes(), 0.15, 7.0).unwrap();
        let c = ScenarioGenerator::new(7).generate(24_360.0, &strikes(), 0.15, 7.0).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_generated_values_are_bounded() {
        let snap = ScenarioGenerator::new(1).generate(24_360.0, &strikes(), 0.15, 7.0).unwrap();
        assert_eq!(snap.len(), 21);
        for e in snap.entries() {
            assert!(e.call_oi >= 5.0 * 0.8 - 0.01);
            assert!(e.put_oi >= 5.0 * 0.8 - 0.01);
            let cv = e.call_volume.unwrap();
            assert!(cv >= e.call_oi * 0.1 - 0.01 && cv <= e.call_oi * 0.5 + 0.01);
        }
    }

    #[test]
    fn test_walls_at_round_strikes() {
        let gen = ScenarioGenerator::new(3).with_config(ScenarioConfig {
            jitter: 0.0,
            ..Default::default()
        });
        let snap = gen.generate(24_360.0, &strikes(), 0.15, 30.0).unwrap();

        // ATM zone: 1.5 + 0.5 = 2.0 at the ATM strike
        assert!((snap.get(24_350.0).unwrap().call_oi - 100.0).abs() < 1e-9);
        // Major call wall 500 above ATM beats the plain strike next to it
        let wall = snap.get(24_850.0).unwrap().call_oi;
        let plain = snap.get(24_800.0).unwrap().call_oi;
        assert!((wall - 100.0).abs() < 1e-9);
        assert!(wall > plain);
        // Minor put wall 200 below ATM
        assert!((snap.get(24_150.0).unwrap().put_oi - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_synthetic_provider() {
        let provider = SyntheticOiProvider::new(
            StaticProvider::new(24_360.0).with_volatility(0.15),
            ScenarioGenerator::new(42),
            7.0,
        );
        assert_eq!(provider.name(), "static+synthetic-oi");
        assert_eq!(provider.spot_price("NIFTY").unwrap(), 24_360.0);

        let snap = provider.open_interest("NIFTY", 24_360.0, 0.15, &strikes()).unwrap();
        let direct = ScenarioGenerator::new(42).generate(24_360.0, &strikes(), 0.15, 7.0).unwrap();
        assert_eq!(snap, direct);
    }

    #[test]
    fn test_synthetic_oi_uses_volatility_override() {
        // Spot-only inner provider: volatility comes solely from the override
        let provider = SyntheticOiProvider::new(StaticProvider::new(24_360.0), ScenarioGenerator::new(42), 7.0);
        let snapshot = MarketSnapshot::fetch(&provider, "NIFTY", Some(0.15), |_| Ok(strikes())).unwrap();

        assert_eq!(snapshot.volatility, 0.15);
        assert!(snapshot.open_interest_error.is_none());
        let direct = ScenarioGenerator::new(42).generate(24_360.0, &strikes(), 0.15, 7.0).unwrap();
        assert_eq!(snapshot.open_interest, Some(direct));

        // A different override shapes different OI
        let high_vol = MarketSnapshot::fetch(&provider, "NIFTY", Some(0.30), |_| Ok(strikes())).unwrap();
        assert_ne!(high_vol.open_interest, snapshot.open_interest);
    }

    #[test]
    fn test_no_strikes_is_invalid() {
        assert!(ScenarioGenerator::new(1).generate(24_360.0, &[], 0.15, 7.0).is_err());
    }
}
