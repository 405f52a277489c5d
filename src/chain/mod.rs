//! Option chain construction
//!
//! Generates the strike ladder around spot, materializes contracts for the
//! requested sides, and prices them in parallel into an [`OptionChain`].
//!
//! [`OptionChain`]: crate::core::OptionChain

mod builder;
mod expiry;

pub use builder::*;
pub use expiry::*;

use serde::{Deserialize, Serialize};

use crate::core::OptionSide;

/// How many strikes to generate around the base strike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrikePolicy {
    /// `N` strikes centered on the base strike: `i ∈ [-N/2, N/2]`
    FixedCount(usize),
    /// `±k` strikes around the base strike: `2k + 1` strikes
    AtmWindow(usize),
}

impl StrikePolicy {
    /// Offsets (in strike steps) from the base strike
    pub fn offsets(&self) -> std::ops::RangeInclusive<i64> {
        let half = match *self {
            StrikePolicy::FixedCount(n) => (n / 2) as i64,
            StrikePolicy::AtmWindow(k) => k as i64,
        };
        -half..=half
    }
}

/// Which sides to materialize at every strike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideSelection {
    Both,
    CallsOnly,
    PutsOnly,
}

impl SideSelection {
    pub fn sides(&self) -> &'static [OptionSide] {
        match self {
            SideSelection::Both => &OptionSide::BOTH,
            SideSelection::CallsOnly => &[OptionSide::Call],
            SideSelection::PutsOnly => &[OptionSide::Put],
        }
    }
}

/// Chain construction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Strike spacing in index points
    /// Default: 50
    pub strike_step: f64,

    /// Default: 31 strikes (ATM ± 15)
    pub policy: StrikePolicy,

    /// Default: both sides
    pub sides: SideSelection,

    /// Distance from spot within which a strike counts as ATM.
    /// `None` means half a strike step.
    pub atm_threshold: Option<f64>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            strike_step: 50.0,
            policy: StrikePolicy::FixedCount(31),
            sides: SideSelection::Both,
            atm_threshold: None,
        }
    }
}

impl ChainConfig {
    /// Narrow chain: ATM ± 5 strikes
    pub fn atm_only() -> Self {
        Self {
            policy: StrikePolicy::AtmWindow(5),
            ..Default::default()
        }
    }

    pub fn atm_threshold(&self) -> f64 {
        self.atm_threshold.unwrap_or(self.strike_step / 2.0)
    }
}
