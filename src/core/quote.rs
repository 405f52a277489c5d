//! Priced contract records, option chains and open-interest snapshots

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::{AnalyticsError, AnalyticsResult};
use super::greeks::Greeks;
use super::option::{Moneyness, OptionContract, OptionSide};

/// Strikes closer than this are considered the same strike
pub const STRIKE_TOLERANCE: f64 = 0.01;

fn same_strike(a: f64, b: f64) -> bool {
    (a - b).abs() < STRIKE_TOLERANCE
}

/// A contract annotated with theoretical price and Greeks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    #[serde(flatten)]
    pub contract: OptionContract,
    pub theoretical_price: f64,
    pub intrinsic_value: f64,
    /// Price above intrinsic, floored at zero
    pub time_value: f64,
    pub moneyness: Moneyness,
    /// S/K for calls, K/S for puts
    pub moneyness_ratio: f64,
    #[serde(flatten)]
    pub greeks: Greeks,
    /// Volatility the contract was priced with
    pub input_volatility: f64,
    /// Solved from a quoted market price, when one was supplied and converged
    pub implied_volatility: Option<f64>,
    /// Externally supplied, never computed here
    pub open_interest: Option<f64>,
    pub volume: Option<f64>,
}

impl ContractRecord {
    pub fn strike(&self) -> f64 {
        self.contract.strike
    }

    pub fn side(&self) -> OptionSide {
        self.contract.side
    }
}

/// A contract that could not be priced, reported next to the ones that could
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractFailure {
    pub strike: f64,
    pub side: OptionSide,
    pub error: String,
}

/// Priced chain for a single `(underlying, expiry)`
///
/// Records are ordered by strike, calls before puts at the same strike,
/// with at most one record per `(strike, side)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChain {
    pub underlying: String,
    pub expiry: Option<NaiveDate>,
    pub spot: f64,
    /// Time to expiry in years
    pub time_to_expiry: f64,
    pub contracts: Vec<ContractRecord>,
    pub failures: Vec<ContractFailure>,
    pub timestamp: DateTime<Utc>,
}

impl OptionChain {
    pub fn new(
        underlying: impl Into<String>,
        spot: f64,
        time_to_expiry: f64,
        mut contracts: Vec<ContractRecord>,
    ) -> AnalyticsResult<Self> {
        contracts.sort_by(|a, b| {
            a.strike()
                .partial_cmp(&b.strike())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.side().cmp(&b.side()))
        });

        if let Some(dup) = contracts
            .windows(2)
            .find(|w| w[0].side() == w[1].side() && same_strike(w[0].strike(), w[1].strike()))
        {
            return Err(AnalyticsError::invalid_parameter(format!(
                "duplicate {} contract at strike {}",
                dup[0].side(),
                dup[0].strike()
            )));
        }

        Ok(Self {
            underlying: underlying.into(),
            expiry: None,
            spot,
            time_to_expiry,
            contracts,
            failures: Vec::new(),
            timestamp: Utc::now(),
        })
    }

    pub fn with_expiry(mut self, expiry: NaiveDate) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_failures(mut self, failures: Vec<ContractFailure>) -> Self {
        self.failures = failures;
        self
    }

    /// Get all strikes, ascending
    pub fn strikes(&self) -> Vec<f64> {
        let mut strikes: Vec<f64> = self.contracts.iter().map(|c| c.strike()).collect();
        strikes.dedup_by(|a, b| same_strike(*a, *b));
        strikes
    }

    pub fn calls(&self) -> impl Iterator<Item = &ContractRecord> {
        self.contracts.iter().filter(|c| c.side() == OptionSide::Call)
    }

    pub fn puts(&self) -> impl Iterator<Item = &ContractRecord> {
        self.contracts.iter().filter(|c| c.side() == OptionSide::Put)
    }

    pub fn record(&self, strike: f64, side: OptionSide) -> Option<&ContractRecord> {
        self.contracts
            .iter()
            .find(|c| c.side() == side && same_strike(c.strike(), strike))
    }

    /// Strike closest to spot; ties go to the lower strike
    pub fn atm_strike(&self) -> Option<f64> {
        nearest_strike(&self.strikes(), self.spot)
    }

    /// Annotate every record with the snapshot's OI and volume for its strike.
    ///
    /// Returns a new chain; strikes missing from the snapshot keep `None`.
    pub fn with_open_interest(&self, snapshot: &OiSnapshot) -> Self {
        let contracts = self
            .contracts
            .iter()
            .map(|record| {
                let mut record = record.clone();
                if let Some(entry) = snapshot.get(record.strike()) {
                    let (oi, volume) = match record.side() {
                        OptionSide::Call => (entry.call_oi, entry.call_volume),
                        OptionSide::Put => (entry.put_oi, entry.put_volume),
                    };
                    record.open_interest = Some(oi);
                    record.volume = volume;
                }
                record
            })
            .collect();

        Self {
            contracts,
            ..self.clone()
        }
    }

    /// Rebuild an OI snapshot from the records that carry open interest
    pub fn oi_snapshot(&self) -> AnalyticsResult<OiSnapshot> {
        let entries = self
            .strikes()
            .into_iter()
            .filter_map(|strike| {
                let call = self.record(strike, OptionSide::Call);
                let put = self.record(strike, OptionSide::Put);
                let call_oi = call.and_then(|c| c.open_interest);
                let put_oi = put.and_then(|p| p.open_interest);
                if call_oi.is_none() && put_oi.is_none() {
                    return None;
                }
                Some(StrikeOi {
                    strike,
                    call_oi: call_oi.unwrap_or(0.0),
                    put_oi: put_oi.unwrap_or(0.0),
                    call_volume: call.and_then(|c| c.volume),
                    put_volume: put.and_then(|p| p.volume),
                })
            })
            .collect();
        OiSnapshot::new(entries)
    }
}

/// Strike closest to `spot`; ties go to the lower strike
pub fn nearest_strike(strikes: &[f64], spot: f64) -> Option<f64> {
    strikes.iter().copied().fold(None, |best: Option<f64>, k| match best {
        None => Some(k),
        Some(b) => {
            let (db, dk) = ((b - spot).abs(), (k - spot).abs());
            if dk < db || (dk == db && k < b) {
                Some(k)
            } else {
                Some(b)
            }
        }
    })
}

/// Open interest (and optionally volume) at one strike
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikeOi {
    pub strike: f64,
    pub call_oi: f64,
    pub put_oi: f64,
    #[serde(default)]
    pub call_volume: Option<f64>,
    #[serde(default)]
    pub put_volume: Option<f64>,
}

impl StrikeOi {
    pub fn new(strike: f64, call_oi: f64, put_oi: f64) -> Self {
        Self {
            strike,
            call_oi,
            put_oi,
            call_volume: None,
            put_volume: None,
        }
    }

    pub fn total_oi(&self) -> f64 {
        self.call_oi + self.put_oi
    }

    /// Put/call OI ratio at this strike
    pub fn pcr(&self) -> Option<f64> {
        (self.call_oi > 0.0).then(|| self.put_oi / self.call_oi)
    }

    /// Put/call volume ratio at this strike
    pub fn volume_pcr(&self) -> Option<f64> {
        match (self.call_volume, self.put_volume) {
            (Some(c), Some(p)) if c > 0.0 => Some(p / c),
            _ => None,
        }
    }
}

/// Per-strike OI distribution for one expiry
///
/// Strikes are unique and ascending; OI values are finite and non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OiSnapshot {
    entries: Vec<StrikeOi>,
}

impl OiSnapshot {
    pub fn new(mut entries: Vec<StrikeOi>) -> AnalyticsResult<Self> {
        for e in &entries {
            if !(e.strike.is_finite() && e.strike > 0.0) {
                return Err(AnalyticsError::invalid_parameter(format!(
                    "strike must be positive, got {}",
                    e.strike
                )));
            }
            let values = [Some(e.call_oi), Some(e.put_oi), e.call_volume, e.put_volume];
            if values.into_iter().flatten().any(|v| !(v.is_finite() && v >= 0.0)) {
                return Err(AnalyticsError::invalid_parameter(format!(
                    "open interest and volume must be non-negative at strike {}",
                    e.strike
                )));
            }
        }

        entries.sort_by(|a, b| {
            a.strike
                .partial_cmp(&b.strike)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(dup) = entries.windows(2).find(|w| same_strike(w[0].strike, w[1].strike)) {
            return Err(AnalyticsError::invalid_parameter(format!(
                "duplicate strike {} in OI snapshot",
                dup[0].strike
            )));
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[StrikeOi] {
        &self.entries
    }

    pub fn strikes(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.strike).collect()
    }

    pub fn get(&self, strike: f64) -> Option<&StrikeOi> {
        self.entries.iter().find(|e| same_strike(e.strike, strike))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total_call_oi(&self) -> f64 {
        self.entries.iter().map(|e| e.call_oi).sum()
    }

    pub fn total_put_oi(&self) -> f64 {
        self.entries.iter().map(|e| e.put_oi).sum()
    }
}
