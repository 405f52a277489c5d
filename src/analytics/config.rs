//! Configuration for chain analytics

use serde::{Deserialize, Serialize};

/// Configuration for chain analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Support/resistance levels reported per side
    /// Default: 3
    pub support_resistance_depth: usize,

    /// Ignore levels farther than this from spot (in strikes)
    /// Default: None (no limit)
    pub max_level_distance: Option<f64>,

    /// Strikes kept in the OI chart window around ATM
    /// Default: 21
    pub max_strikes_in_chart: usize,

    /// Strikes either side of ATM covered by the near-ATM Greek table
    /// Default: 2
    pub greeks_calculation_range: usize,

    /// Sentiment bands for the OI put/call ratio
    pub pcr_thresholds: PcrThresholds,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            support_resistance_depth: 3,
            max_level_distance: None,
            max_strikes_in_chart: 21,
            greeks_calculation_range: 2,
            pcr_thresholds: PcrThresholds::default(),
        }
    }
}

/// PCR sentiment thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PcrThresholds {
    /// PCR above this is extreme put bias
    /// Default: 1.2
    pub extreme_bearish: f64,
    /// Default: 0.9
    pub bearish: f64,
    /// Default: 0.7
    pub bullish: f64,
    /// PCR below this is extreme call bias
    /// Default: 0.5
    pub extreme_bullish: f64,
}

impl Default for PcrThresholds {
    fn default() -> Self {
        Self {
            extreme_bearish: 1.2,
            bearish: 0.9,
            bullish: 0.7,
            extreme_bullish: 0.5,
        }
    }
}
