//! Portfolio Greek aggregation
//!
//! Provides:
//! - [`Position`]: one signed option leg as supplied by a caller
//! - [`PortfolioAggregator`]: prices every leg and sums quantity-weighted
//!   premium and Greeks
//!
//! A malformed leg never aborts the portfolio: it is reported in
//! [`PortfolioSummary::errors`] and the totals cover the remaining legs.

mod aggregator;

pub use aggregator::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{AnalyticsError, AnalyticsResult, Greeks, OptionSide};

fn default_days_to_expiry() -> f64 {
    30.0
}

fn default_volatility() -> f64 {
    0.20
}

/// One option leg
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub strike: f64,
    #[serde(alias = "type", alias = "option_type")]
    pub side: OptionSide,
    /// Signed contract count; short is negative
    pub quantity: i64,
    /// Default: 30
    #[serde(default = "default_days_to_expiry")]
    pub days_to_expiry: f64,
    /// Decimal fraction
    /// Default: 0.20
    #[serde(default = "default_volatility")]
    pub volatility: f64,
    /// Overrides the portfolio's default rate for this leg
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
}

impl Position {
    pub fn new(strike: f64, side: OptionSide, quantity: i64) -> Self {
        Self {
            strike,
            side,
            quantity,
            days_to_expiry: default_days_to_expiry(),
            volatility: default_volatility(),
            risk_free_rate: None,
        }
    }

    pub fn with_days(mut self, days_to_expiry: f64) -> Self {
        self.days_to_expiry = days_to_expiry;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = Some(rate);
        self
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        if !(self.strike.is_finite() && self.strike > 0.0) {
            return Err(AnalyticsError::invalid_parameter(format!(
                "strike must be positive, got {}",
                self.strike
            )));
        }
        if !(self.days_to_expiry.is_finite() && self.days_to_expiry >= 0.0) {
            return Err(AnalyticsError::invalid_parameter(format!(
                "days to expiry must be non-negative, got {}",
                self.days_to_expiry
            )));
        }
        if !(self.volatility.is_finite() && self.volatility >= 0.0) {
            return Err(AnalyticsError::invalid_parameter(format!(
                "volatility must be non-negative, got {}",
                self.volatility
            )));
        }
        if let Some(rate) = self.risk_free_rate {
            if !rate.is_finite() {
                return Err(AnalyticsError::invalid_parameter("rate override must be finite"));
            }
        }
        Ok(())
    }

    /// Decode one leg from loosely typed JSON
    ///
    /// The side tag goes through `OptionSide::from_str`, so any casing of
    /// CE/PE/call/put is accepted and an unknown tag is `InvalidParameter`.
    pub fn from_json_value(value: &Value) -> AnalyticsResult<Self> {
        let mut leg = value.clone();
        let fields = leg
            .as_object_mut()
            .ok_or_else(|| AnalyticsError::invalid_parameter("position must be a JSON object"))?;

        let tag = ["side", "type", "option_type"]
            .iter()
            .find_map(|key| fields.remove(*key))
            .ok_or_else(|| AnalyticsError::invalid_parameter("position has no side"))?;
        let side: OptionSide = tag
            .as_str()
            .ok_or_else(|| AnalyticsError::invalid_parameter(format!("side must be a string, got {}", tag)))?
            .parse()?;
        fields.insert("side".to_string(), Value::String(side.label().to_string()));

        serde_json::from_value(leg)
            .map_err(|e| AnalyticsError::invalid_parameter(format!("malformed position: {}", e)))
    }
}

/// Decode a JSON array of positions leg by leg
///
/// Only a document that is not an array fails as a whole; each undecodable
/// leg becomes a `PositionError` carrying its index.
pub fn parse_positions(json: &str) -> AnalyticsResult<Vec<Result<Position, PositionError>>> {
    let legs: Vec<Value> = serde_json::from_str(json)?;
    Ok(legs
        .iter()
        .enumerate()
        .map(|(index, value)| {
            Position::from_json_value(value).map_err(|e| PositionError {
                index,
                strike: value.get("strike").and_then(Value::as_f64),
                side: None,
                error: e.to_string(),
            })
        })
        .collect())
}

/// A priced leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionDetail {
    /// Index in the input list
    pub index: usize,
    pub position: Position,
    /// Per-contract theoretical price
    pub unit_price: f64,
    /// `unit_price × quantity`; negative for shorts
    pub position_value: f64,
    /// Per-contract Greeks
    pub unit_greeks: Greeks,
    /// Greeks scaled by signed quantity
    pub greeks: Greeks,
}

/// A leg that could not be priced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionError {
    pub index: usize,
    /// `None` when the leg could not be decoded far enough to tell
    pub strike: Option<f64>,
    pub side: Option<OptionSide>,
    pub error: String,
}

/// Quantity-weighted totals over the valid legs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    #[serde(flatten)]
    pub greeks: Greeks,
    /// Sum of position values; positive means net long premium
    pub net_premium: f64,
    /// Legs included in the totals
    pub position_count: usize,
    pub position_details: Vec<PositionDetail>,
    pub errors: Vec<PositionError>,
}

impl PortfolioSummary {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}
