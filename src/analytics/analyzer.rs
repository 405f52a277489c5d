//! ChainAnalyzer - facade over the chain analytics
//!
//! Combines max pain, PCR and support/resistance into one summary, and
//! summarizes the Greeks of a priced chain.

use serde::{Deserialize, Serialize};

use super::{
    chart_window, compute_strike_spacing, max_pain, rank_levels, AnalyticsConfig, ChainAnalytics,
    LevelKind, PcrMetrics,
};
use crate::core::{
    nearest_strike, AnalyticsError, AnalyticsResult, ContractRecord, OiSnapshot, OptionChain,
    OptionSide, StrikeOi,
};

/// Runs the chain analytics with one configuration
#[derive(Debug, Clone, Default)]
pub struct ChainAnalyzer {
    config: AnalyticsConfig,
}

impl ChainAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Analyze an OI distribution around `spot`
    ///
    /// An empty snapshot means the OI source gave nothing; that is surfaced
    /// as `UpstreamDataUnavailable` rather than analyzed as zeros.
    pub fn analyze(&self, snapshot: &OiSnapshot, spot: f64) -> AnalyticsResult<ChainAnalytics> {
        if !(spot.is_finite() && spot > 0.0) {
            return Err(AnalyticsError::invalid_parameter(format!("spot must be positive, got {}", spot)));
        }
        if snapshot.is_empty() {
            return Err(AnalyticsError::unavailable("open interest snapshot is empty"));
        }

        let strikes = snapshot.strikes();
        let strike_spacing = compute_strike_spacing(&strikes);
        let atm_strike = nearest_strike(&strikes, spot)
            .ok_or_else(|| AnalyticsError::unavailable("open interest snapshot is empty"))?;

        let max_pain = max_pain(snapshot)?;
        let pcr_metrics = PcrMetrics::from_snapshot(snapshot, &self.config.pcr_thresholds);

        let depth = self.config.support_resistance_depth;
        let max_distance = self.config.max_level_distance;
        let support_levels = rank_levels(snapshot, spot, LevelKind::Support, depth, strike_spacing, max_distance);
        let resistance_levels =
            rank_levels(snapshot, spot, LevelKind::Resistance, depth, strike_spacing, max_distance);

        tracing::debug!(
            "Analyzed {} strikes: ATM {}, max pain {}, PCR {:?}",
            snapshot.len(),
            atm_strike,
            max_pain.strike,
            pcr_metrics.oi_pcr
        );

        Ok(ChainAnalytics {
            spot,
            atm_strike,
            max_pain_strike: max_pain.strike,
            max_pain,
            total_call_oi: pcr_metrics.total_call_oi,
            total_put_oi: pcr_metrics.total_put_oi,
            pcr: pcr_metrics.oi_pcr,
            pcr_metrics,
            support_levels,
            resistance_levels,
            strike_spacing,
        })
    }

    /// Analyze the OI carried by a chain's records
    pub fn analyze_chain(&self, chain: &OptionChain) -> AnalyticsResult<ChainAnalytics> {
        self.analyze(&chain.oi_snapshot()?, chain.spot)
    }

    /// OI rows for charting, centered on ATM
    pub fn chart_data(&self, snapshot: &OiSnapshot, spot: f64) -> Vec<StrikeOi> {
        chart_window(snapshot, spot, self.config.max_strikes_in_chart)
    }

    /// Greek summary of a priced chain
    pub fn greeks_summary(&self, chain: &OptionChain) -> ChainGreeksSummary {
        ChainGreeksSummary::from_chain(chain, self.config.greeks_calculation_range)
    }
}

/// One contract picked out as an extreme
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContractExtreme {
    pub strike: f64,
    pub side: OptionSide,
    pub value: f64,
}

/// Theoretical price range across one side of the chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl PriceRange {
    fn from_prices(prices: impl Iterator<Item = f64>) -> Option<Self> {
        let (mut min, mut max, mut sum, mut n) = (f64::INFINITY, f64::NEG_INFINITY, 0.0, 0usize);
        for p in prices {
            min = min.min(p);
            max = max.max(p);
            sum += p;
            n += 1;
        }
        (n > 0).then(|| Self {
            min,
            max,
            avg: sum / n as f64,
        })
    }
}

/// Greeks at one strike near ATM
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearAtmGreeks {
    pub strike: f64,
    pub call_delta: Option<f64>,
    pub put_delta: Option<f64>,
    pub gamma: f64,
    pub vega: f64,
    pub call_theta: Option<f64>,
    pub put_theta: Option<f64>,
}

/// Summary of a priced chain's Greeks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainGreeksSummary {
    pub atm_strike: Option<f64>,
    pub atm_call_price: Option<f64>,
    pub atm_put_price: Option<f64>,
    pub atm_call_delta: Option<f64>,
    pub atm_put_delta: Option<f64>,
    pub atm_gamma: Option<f64>,
    pub atm_vega: Option<f64>,
    pub max_gamma: Option<ContractExtreme>,
    pub max_call_gamma: Option<ContractExtreme>,
    pub max_put_gamma: Option<ContractExtreme>,
    /// Unweighted gamma summed over every contract
    pub total_gamma: f64,
    /// Unweighted vega summed over every contract
    pub total_vega: f64,
    pub avg_call_vega: Option<f64>,
    pub avg_put_vega: Option<f64>,
    /// Most negative daily theta
    pub min_theta: Option<ContractExtreme>,
    pub max_vega: Option<ContractExtreme>,
    pub call_price_range: Option<PriceRange>,
    pub put_price_range: Option<PriceRange>,
    pub call_count: usize,
    pub put_count: usize,
    /// Strikes within the configured range of ATM
    pub near_atm: Vec<NearAtmGreeks>,
}

impl ChainGreeksSummary {
    pub fn from_chain(chain: &OptionChain, near_atm_range: usize) -> Self {
        let atm_strike = chain.atm_strike();
        let atm_call = atm_strike.and_then(|k| chain.record(k, OptionSide::Call));
        let atm_put = atm_strike.and_then(|k| chain.record(k, OptionSide::Put));
        let atm_any = atm_call.or(atm_put);

        let strikes = chain.strikes();
        let near_atm = atm_strike
            .and_then(|atm| strikes.iter().position(|k| *k == atm))
            .map(|idx| {
                let lo = idx.saturating_sub(near_atm_range);
                let hi = (idx + near_atm_range).min(strikes.len().saturating_sub(1));
                strikes[lo..=hi]
                    .iter()
                    .filter_map(|&strike| {
                        let call = chain.record(strike, OptionSide::Call);
                        let put = chain.record(strike, OptionSide::Put);
                        let any = call.or(put)?;
                        Some(NearAtmGreeks {
                            strike,
                            call_delta: call.map(|c| c.greeks.delta),
                            put_delta: put.map(|p| p.greeks.delta),
                            gamma: any.greeks.gamma,
                            vega: any.greeks.vega,
                            call_theta: call.map(|c| c.greeks.theta),
                            put_theta: put.map(|p| p.greeks.theta),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            atm_strike,
            atm_call_price: atm_call.map(|r| r.theoretical_price),
            atm_put_price: atm_put.map(|r| r.theoretical_price),
            atm_call_delta: atm_call.map(|r| r.greeks.delta),
            atm_put_delta: atm_put.map(|r| r.greeks.delta),
            atm_gamma: atm_any.map(|r| r.greeks.gamma),
            atm_vega: atm_any.map(|r| r.greeks.vega),
            max_gamma: extreme(&chain.contracts, |a, b| a > b, |r| r.greeks.gamma),
            max_call_gamma: extreme(chain.calls(), |a, b| a > b, |r| r.greeks.gamma),
            max_put_gamma: extreme(chain.puts(), |a, b| a > b, |r| r.greeks.gamma),
            total_gamma: chain.contracts.iter().map(|r| r.greeks.gamma).sum(),
            total_vega: chain.contracts.iter().map(|r| r.greeks.vega).sum(),
            avg_call_vega: mean(chain.calls().map(|r| r.greeks.vega)),
            avg_put_vega: mean(chain.puts().map(|r| r.greeks.vega)),
            min_theta: extreme(&chain.contracts, |a, b| a < b, |r| r.greeks.theta),
            max_vega: extreme(&chain.contracts, |a, b| a > b, |r| r.greeks.vega),
            call_price_range: PriceRange::from_prices(chain.calls().map(|r| r.theoretical_price)),
            put_price_range: PriceRange::from_prices(chain.puts().map(|r| r.theoretical_price)),
            call_count: chain.calls().count(),
            put_count: chain.puts().count(),
            near_atm,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// First contract whose metric beats every other under `better`
fn extreme<'a>(
    contracts: impl IntoIterator<Item = &'a ContractRecord>,
    better: impl Fn(f64, f64) -> bool,
    metric: impl Fn(&ContractRecord) -> f64,
) -> Option<ContractExtreme> {
    contracts.into_iter().fold(None, |best: Option<ContractExtreme>, r| {
        let value = metric(r);
        match best {
            Some(b) if !better(value, b.value) => Some(b),
            _ => Some(ContractExtreme {
                strike: r.strike(),
                side: r.side(),
                value,
            }),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::PcrSignal;
    use crate::chain::{ChainBuilder, ChainConfig, StrikePolicy};
    use crate::core::MarketParams;

    fn snapshot() -> OiSnapshot {
        OiSnapshot::new(vec![
            StrikeOi::new(24_250.0, 1_000.0, 6_000.0),
            StrikeOi::new(24_300.0, 2_000.0, 8_000.0),
            StrikeOi::new(24_350.0, 5_000.0, 5_000.0),
            StrikeOi::new(24_400.0, 9_000.0, 2_000.0),
            StrikeOi::new(24_450.0, 7_000.0, 500.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_analyze_snapshot() {
        let analytics = ChainAnalyzer::new().analyze(&snapshot(), 24_360.0).unwrap();

        assert_eq!(analytics.atm_strike, 24_350.0);
        assert_eq!(analytics.total_call_oi, 24_000.0);
        assert_eq!(analytics.total_put_oi, 21_500.0);
        assert!((analytics.pcr.unwrap() - 21_500.0 / 24_000.0).abs() < 1e-12);
        assert_eq!(analytics.pcr_metrics.signal, Some(PcrSignal::Neutral));
        assert_eq!(analytics.strike_spacing, 50.0);
        assert_eq!(analytics.max_pain_strike, analytics.max_pain.strike);
        assert_eq!(analytics.max_pain.pain_curve.len(), 5);

        assert_eq!(analytics.primary_support().unwrap().strike, 24_300.0);
        assert_eq!(analytics.primary_resistance().unwrap().strike, 24_400.0);
        assert_eq!(analytics.support_levels.len(), 3);
        assert_eq!(analytics.resistance_levels.len(), 2);
    }

    #[test]
    fn test_empty_snapshot_refused() {
        let err = ChainAnalyzer::new().analyze(&OiSnapshot::default(), 24_360.0).unwrap_err();
        assert!(matches!(err, AnalyticsError::UpstreamDataUnavailable(_)));
    }

    #[test]
    fn test_configured_depth() {
        let analyzer = ChainAnalyzer::with_config(AnalyticsConfig {
            support_resistance_depth: 1,
            ..Default::default()
        });
        let analytics = analyzer.analyze(&snapshot(), 24_360.0).unwrap();
        assert_eq!(analytics.support_levels.len(), 1);
        assert_eq!(analytics.resistance_levels.len(), 1);
    }

    fn priced_chain() -> OptionChain {
        let params = MarketParams::new(24_360.0, 0.065, 0.0, 0.15).unwrap();
        ChainBuilder::new(ChainConfig {
            policy: StrikePolicy::AtmWindow(4),
            ..Default::default()
        })
        .build("NIFTY", &params, 7.0 / 365.0)
        .unwrap()
    }

    #[test]
    fn test_analyze_chain_with_attached_oi() {
        let chain = priced_chain().with_open_interest(&snapshot());
        let analytics = ChainAnalyzer::new().analyze_chain(&chain).unwrap();
        assert_eq!(analytics.total_call_oi, 24_000.0);
        assert_eq!(analytics.atm_strike, 24_350.0);

        // No OI attached at all
        let err = ChainAnalyzer::new().analyze_chain(&priced_chain()).unwrap_err();
        assert!(matches!(err, AnalyticsError::UpstreamDataUnavailable(_)));
    }

    #[test]
    fn test_greeks_summary() {
        let chain = priced_chain();
        let summary = ChainAnalyzer::new().greeks_summary(&chain);

        assert_eq!(summary.atm_strike, Some(24_350.0));
        assert_eq!(summary.call_count, 9);
        assert_eq!(summary.put_count, 9);
        assert!(summary.atm_call_delta.unwrap() > 0.5);
        assert!(summary.atm_put_delta.unwrap() < 0.0);

        // Gamma and vega peak near the money
        let max_gamma = summary.max_gamma.unwrap();
        assert!((max_gamma.strike - 24_350.0).abs() <= 50.0);
        assert!(summary.min_theta.unwrap().value < 0.0);

        // Per-side extremes stay on their side
        let call_gamma = summary.max_call_gamma.unwrap();
        let put_gamma = summary.max_put_gamma.unwrap();
        assert_eq!(call_gamma.side, OptionSide::Call);
        assert_eq!(put_gamma.side, OptionSide::Put);
        assert!(call_gamma.value.max(put_gamma.value) == max_gamma.value);

        let gamma_sum: f64 = chain.contracts.iter().map(|r| r.greeks.gamma).sum();
        assert!((summary.total_gamma - gamma_sum).abs() < 1e-12);
        let call_vega: f64 = chain.calls().map(|r| r.greeks.vega).sum();
        let put_vega: f64 = chain.puts().map(|r| r.greeks.vega).sum();
        assert!((summary.avg_call_vega.unwrap() - call_vega / 9.0).abs() < 1e-9);
        assert!((summary.avg_put_vega.unwrap() - put_vega / 9.0).abs() < 1e-9);
        assert!((summary.total_vega - (call_vega + put_vega)).abs() < 1e-9);

        let calls = summary.call_price_range.unwrap();
        assert!(calls.min <= calls.avg && calls.avg <= calls.max);

        assert_eq!(summary.near_atm.len(), 5);
        assert_eq!(summary.near_atm[0].strike, 24_250.0);
        assert_eq!(summary.near_atm[4].strike, 24_450.0);
    }
}
