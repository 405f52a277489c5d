//! Support and resistance from the OI distribution
//!
//! Support: strikes strictly below spot ranked by put OI.
//! Resistance: strikes strictly above spot ranked by call OI.
//! Heavier OI ranks first; equal OI ranks the strike nearer spot first.

use std::cmp::Ordering;

use super::{LevelKind, SupportResistanceLevel};
use crate::core::{nearest_strike, OiSnapshot, StrikeOi};

/// Rank the top `depth` levels of one kind
///
/// Strikes with zero OI on the relevant side never qualify. `max_distance`
/// (in strikes) drops levels too far from spot to matter.
pub fn rank_levels(
    snapshot: &OiSnapshot,
    spot: f64,
    kind: LevelKind,
    depth: usize,
    strike_spacing: f64,
    max_distance: Option<f64>,
) -> Vec<SupportResistanceLevel> {
    let mut levels: Vec<SupportResistanceLevel> = snapshot
        .entries()
        .iter()
        .filter_map(|e| {
            let open_interest = match kind {
                LevelKind::Support if e.strike < spot => e.put_oi,
                LevelKind::Resistance if e.strike > spot => e.call_oi,
                _ => return None,
            };
            if open_interest <= 0.0 {
                return None;
            }
            let distance_strikes = if strike_spacing > 0.0 {
                (e.strike - spot) / strike_spacing
            } else {
                e.strike - spot
            };
            if let Some(max_dist) = max_distance {
                if distance_strikes.abs() > max_dist {
                    return None;
                }
            }
            Some(SupportResistanceLevel {
                strike: e.strike,
                open_interest,
                kind,
                distance_strikes,
            })
        })
        .collect();

    levels.sort_by(|a, b| {
        b.open_interest
            .partial_cmp(&a.open_interest)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                a.distance_strikes
                    .abs()
                    .partial_cmp(&b.distance_strikes.abs())
                    .unwrap_or(Ordering::Equal)
            })
    });
    levels.truncate(depth);
    levels
}

/// Compute median strike spacing from a sorted strike array
pub fn compute_strike_spacing(strikes: &[f64]) -> f64 {
    if strikes.len() < 2 {
        return 1.0;
    }

    let mut diffs: Vec<f64> = strikes
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .filter(|&d| d > 1e-10)
        .collect();

    if diffs.is_empty() {
        return 1.0;
    }

    diffs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    if diffs.len() % 2 == 0 {
        let mid = diffs.len() / 2;
        (diffs[mid - 1] + diffs[mid]) / 2.0
    } else {
        diffs[diffs.len() / 2]
    }
}

/// At most `max_strikes` consecutive entries centered on the ATM strike
///
/// The window shifts inward at the edges of the chain so it stays full.
pub fn chart_window(snapshot: &OiSnapshot, spot: f64, max_strikes: usize) -> Vec<StrikeOi> {
    let entries = snapshot.entries();
    if entries.len() <= max_strikes {
        return entries.to_vec();
    }
    let atm_idx = nearest_strike(&snapshot.strikes(), spot)
        .and_then(|atm| entries.iter().position(|e| e.strike == atm))
        .unwrap_or(0);

    let start = atm_idx
        .saturating_sub(max_strikes / 2)
        .min(entries.len() - max_strikes);
    entries[start..start + max_strikes].to_vec()
}
