//! Max pain
//!
//! For each candidate settlement strike `c`, writers pay
//! `Σ_{k<c} (c−k)·callOI(k) + Σ_{k>c} (k−c)·putOI(k)`. The max pain strike
//! minimizes that payout; ties go to the lowest strike.
//!
//! The search is O(n²) in strike count, fine for chains in the tens.

use super::MaxPainResult;
use crate::core::{AnalyticsError, AnalyticsResult, OiSnapshot};

/// Above this many strikes the quadratic search gets logged
pub const MAX_PAIN_STRIKE_WARN: usize = 200;

/// Total writer payout if the underlying settles at `candidate`
pub fn total_pain(snapshot: &OiSnapshot, candidate: f64) -> f64 {
    snapshot
        .entries()
        .iter()
        .map(|e| {
            if e.strike < candidate {
                (candidate - e.strike) * e.call_oi
            } else if e.strike > candidate {
                (e.strike - candidate) * e.put_oi
            } else {
                0.0
            }
        })
        .sum()
}

/// Find the max pain strike over the snapshot's strike set
pub fn max_pain(snapshot: &OiSnapshot) -> AnalyticsResult<MaxPainResult> {
    if snapshot.is_empty() {
        return Err(AnalyticsError::unavailable("no open interest to compute max pain"));
    }
    if snapshot.len() > MAX_PAIN_STRIKE_WARN {
        tracing::warn!(
            "Max pain over {} strikes is quadratic; consider narrowing the chain",
            snapshot.len()
        );
    }

    let pain_curve: Vec<(f64, f64)> = snapshot
        .entries()
        .iter()
        .map(|e| (e.strike, total_pain(snapshot, e.strike)))
        .collect();

    // Strikes are ascending, so keeping the first strict minimum breaks ties low
    let (strike, pain) = pain_curve
        .iter()
        .copied()
        .fold(None, |best: Option<(f64, f64)>, (k, p)| match best {
            Some((_, bp)) if bp <= p => best,
            _ => Some((k, p)),
        })
        .ok_or_else(|| AnalyticsError::unavailable("no open interest to compute max pain"))?;

    Ok(MaxPainResult {
        strike,
        total_pain: pain,
        pain_curve,
    })
}
