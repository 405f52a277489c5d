//! Option contract definitions
//!
//! Side, moneyness and the market inputs shared by every pricing call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{AnalyticsError, AnalyticsResult};

/// Calendar days per year used for `T = days / 365`
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Option side (Call or Put)
///
/// Broker and exchange feeds tag sides as `CE`/`PE`, `call`/`put` or
/// `CALL`/`PUT`; all of them collapse into this type at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionSide {
    #[serde(rename = "CALL", alias = "CE", alias = "C", alias = "call", alias = "Call")]
    Call,
    #[serde(rename = "PUT", alias = "PE", alias = "P", alias = "put", alias = "Put")]
    Put,
}

impl OptionSide {
    pub const BOTH: [OptionSide; 2] = [OptionSide::Call, OptionSide::Put];

    /// Payoff direction: +1 for call, -1 for put
    pub fn phi(&self) -> f64 {
        match self {
            OptionSide::Call => 1.0,
            OptionSide::Put => -1.0,
        }
    }

    /// Intrinsic value at given spot
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionSide::Call => (spot - strike).max(0.0),
            OptionSide::Put => (strike - spot).max(0.0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OptionSide::Call => "CALL",
            OptionSide::Put => "PUT",
        }
    }
}

impl fmt::Display for OptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OptionSide {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CE" | "C" | "CALL" => Ok(OptionSide::Call),
            "PE" | "P" | "PUT" => Ok(OptionSide::Put),
            other => Err(AnalyticsError::invalid_parameter(format!(
                "unknown option side tag '{}'",
                other
            ))),
        }
    }
}

/// Moneyness classification relative to spot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Moneyness {
    Itm,
    Atm,
    Otm,
}

impl Moneyness {
    /// Classify a strike against spot.
    ///
    /// Strikes within `±atm_threshold` of spot are ATM; otherwise a call is
    /// ITM below spot and a put is ITM above it.
    pub fn classify(strike: f64, spot: f64, side: OptionSide, atm_threshold: f64) -> Self {
        if (strike - spot).abs() <= atm_threshold {
            return Moneyness::Atm;
        }
        let below_spot = strike < spot;
        match (side, below_spot) {
            (OptionSide::Call, true) | (OptionSide::Put, false) => Moneyness::Itm,
            _ => Moneyness::Otm,
        }
    }
}

/// Market inputs for a pricing request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    /// Underlying spot price
    pub spot: f64,
    /// Annualized continuously-compounded risk-free rate
    pub rate: f64,
    /// Continuous dividend / carry yield
    pub dividend_yield: f64,
    /// Volatility as a decimal fraction (0.15 = 15%)
    pub volatility: f64,
}

impl MarketParams {
    pub fn new(spot: f64, rate: f64, dividend_yield: f64, volatility: f64) -> AnalyticsResult<Self> {
        let params = Self {
            spot,
            rate,
            dividend_yield,
            volatility,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        if !(self.spot.is_finite() && self.spot > 0.0) {
            return Err(AnalyticsError::invalid_parameter(format!(
                "spot must be positive, got {}",
                self.spot
            )));
        }
        if !(self.volatility.is_finite() && self.volatility >= 0.0) {
            return Err(AnalyticsError::invalid_parameter(format!(
                "volatility must be non-negative, got {}",
                self.volatility
            )));
        }
        if !self.rate.is_finite() {
            return Err(AnalyticsError::invalid_parameter("rate must be finite"));
        }
        if !(self.dividend_yield.is_finite() && self.dividend_yield >= 0.0) {
            return Err(AnalyticsError::invalid_parameter(format!(
                "dividend yield must be non-negative, got {}",
                self.dividend_yield
            )));
        }
        Ok(())
    }

    pub fn with_volatility(&self, volatility: f64) -> Self {
        Self { volatility, ..*self }
    }

    pub fn with_rate(&self, rate: f64) -> Self {
        Self { rate, ..*self }
    }
}

/// A single European contract: strike, side and time to expiry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub strike: f64,
    pub side: OptionSide,
    /// Time to expiry in years
    pub time_to_expiry: f64,
}

impl OptionContract {
    pub fn new(strike: f64, side: OptionSide, time_to_expiry: f64) -> Self {
        Self {
            strike,
            side,
            time_to_expiry,
        }
    }

    /// Contract expiring in `days` calendar days
    pub fn from_days(strike: f64, side: OptionSide, days: f64) -> Self {
        Self::new(strike, side, days / DAYS_PER_YEAR)
    }

    pub fn days_to_expiry(&self) -> f64 {
        self.time_to_expiry * DAYS_PER_YEAR
    }

    pub fn intrinsic(&self, spot: f64) -> f64 {
        self.side.intrinsic(spot, self.strike)
    }

    /// S/K for calls, K/S for puts (above 1 means in the money)
    pub fn moneyness_ratio(&self, spot: f64) -> f64 {
        match self.side {
            OptionSide::Call => spot / self.strike,
            OptionSide::Put => self.strike / spot,
        }
    }

    pub fn moneyness(&self, spot: f64, atm_threshold: f64) -> Moneyness {
        Moneyness::classify(self.strike, spot, self.side, atm_threshold)
    }
}
