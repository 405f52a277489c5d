//! Put-Call Ratio (PCR) analysis
//!
//! OI and volume PCR over a snapshot, and the sentiment band derived from
//! the OI ratio. A zero call side yields `None`, never a division error.

use serde::{Deserialize, Serialize};

use super::PcrThresholds;
use crate::core::OiSnapshot;

/// `put / call`, or `None` when there is nothing on the call side
pub fn put_call_ratio(total_put: f64, total_call: f64) -> Option<f64> {
    (total_call > 0.0).then(|| total_put / total_call)
}

/// PCR calculation result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PcrMetrics {
    pub total_call_oi: f64,
    pub total_put_oi: f64,
    /// put OI / call OI
    pub oi_pcr: Option<f64>,
    /// Present only when every strike in the snapshot carries volume
    pub total_call_volume: Option<f64>,
    pub total_put_volume: Option<f64>,
    /// put volume / call volume
    pub volume_pcr: Option<f64>,
    pub signal: Option<PcrSignal>,
}

impl PcrMetrics {
    pub fn from_snapshot(snapshot: &OiSnapshot, thresholds: &PcrThresholds) -> Self {
        let total_call_oi = snapshot.total_call_oi();
        let total_put_oi = snapshot.total_put_oi();
        let oi_pcr = put_call_ratio(total_put_oi, total_call_oi);

        let total_call_volume: Option<f64> = snapshot.entries().iter().map(|e| e.call_volume).sum();
        let total_put_volume: Option<f64> = snapshot.entries().iter().map(|e| e.put_volume).sum();
        let volume_pcr = match (total_put_volume, total_call_volume) {
            (Some(p), Some(c)) => put_call_ratio(p, c),
            _ => None,
        };

        Self {
            total_call_oi,
            total_put_oi,
            oi_pcr,
            total_call_volume,
            total_put_volume,
            volume_pcr,
            signal: oi_pcr.map(|pcr| PcrSignal::from_pcr(pcr, thresholds)),
        }
    }
}

/// PCR sentiment interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PcrSignal {
    /// Heavy put writing/buying
    ExtremeBearish,
    ModeratelyBearish,
    Neutral,
    ModeratelyBullish,
    /// Heavy call bias
    ExtremeBullish,
}

impl PcrSignal {
    pub fn from_pcr(pcr: f64, thresholds: &PcrThresholds) -> Self {
        if pcr > thresholds.extreme_bearish {
            PcrSignal::ExtremeBearish
        } else if pcr > thresholds.bearish {
            PcrSignal::ModeratelyBearish
        } else if pcr < thresholds.extreme_bullish {
            PcrSignal::ExtremeBullish
        } else if pcr < thresholds.bullish {
            PcrSignal::ModeratelyBullish
        } else {
            PcrSignal::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PcrSignal::ExtremeBearish => "Extreme bearish",
            PcrSignal::ModeratelyBearish => "Moderately bearish",
            PcrSignal::Neutral => "Neutral",
            PcrSignal::ModeratelyBullish => "Moderately bullish",
            PcrSignal::ExtremeBullish => "Extreme bullish",
        }
    }
}
