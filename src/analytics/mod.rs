//! Chain-level analytics over an open-interest distribution
//!
//! Provides:
//! - **Max pain**: strike minimizing aggregate option-writer payout at expiry
//! - **PCR**: put/call ratio by OI and volume, with a sentiment band
//! - **Support/Resistance**: heaviest put OI below spot, call OI above spot
//! - **Greek summary**: ATM figures and extremes across a priced chain
//!
//! Everything here reads a completed chain or snapshot and never mutates it.

mod analyzer;
mod config;
mod levels;
mod max_pain;
mod pcr;

pub use analyzer::*;
pub use config::*;
pub use levels::*;
pub use max_pain::*;
pub use pcr::*;

use serde::{Deserialize, Serialize};

/// Result of the max pain search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxPainResult {
    /// Strike with the lowest total pain
    pub strike: f64,
    /// Total writer payout if the underlying settles at `strike`
    pub total_pain: f64,
    /// `(candidate strike, total pain)` for every strike, ascending
    pub pain_curve: Vec<(f64, f64)>,
}

/// Which side of spot a level sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelKind {
    /// Put OI wall below spot
    Support,
    /// Call OI wall above spot
    Resistance,
}

impl LevelKind {
    pub fn label(&self) -> &'static str {
        match self {
            LevelKind::Support => "SUPPORT",
            LevelKind::Resistance => "RESISTANCE",
        }
    }
}

/// A ranked OI level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportResistanceLevel {
    pub strike: f64,
    /// Put OI for support, call OI for resistance
    pub open_interest: f64,
    pub kind: LevelKind,
    /// Distance from spot in strikes (positive = above)
    pub distance_strikes: f64,
}

/// Chain analytics summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainAnalytics {
    pub spot: f64,
    pub atm_strike: f64,
    pub max_pain_strike: f64,
    pub max_pain: MaxPainResult,
    pub total_call_oi: f64,
    pub total_put_oi: f64,
    /// `None` when there is no call OI
    pub pcr: Option<f64>,
    pub pcr_metrics: PcrMetrics,
    /// Heaviest OI first, ties nearest to spot first
    pub support_levels: Vec<SupportResistanceLevel>,
    pub resistance_levels: Vec<SupportResistanceLevel>,
    /// Median strike spacing of the snapshot
    pub strike_spacing: f64,
}

impl ChainAnalytics {
    /// Strongest support, if any put OI sits below spot
    pub fn primary_support(&self) -> Option<&SupportResistanceLevel> {
        self.support_levels.first()
    }

    /// Strongest resistance, if any call OI sits above spot
    pub fn primary_resistance(&self) -> Option<&SupportResistanceLevel> {
        self.resistance_levels.first()
    }

    /// Max pain distance from spot in index points (positive = above spot)
    pub fn max_pain_offset(&self) -> f64 {
        self.max_pain_strike - self.spot
    }
}
