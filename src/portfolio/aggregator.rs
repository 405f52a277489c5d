//! Position pricing and aggregation

use rayon::prelude::*;

use super::{parse_positions, PortfolioSummary, Position, PositionDetail, PositionError};
use crate::core::{AnalyticsError, AnalyticsResult, Greeks, DAYS_PER_YEAR};
use crate::models::{greeks, price};

/// Aggregates positions under shared market inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioAggregator {
    /// Rate for legs without their own override
    pub default_rate: f64,
    pub dividend_yield: f64,
}

impl Default for PortfolioAggregator {
    fn default() -> Self {
        Self {
            default_rate: 0.065,
            dividend_yield: 0.0,
        }
    }
}

impl PortfolioAggregator {
    pub fn new(default_rate: f64) -> Self {
        Self {
            default_rate,
            ..Default::default()
        }
    }

    pub fn with_dividend_yield(mut self, dividend_yield: f64) -> Self {
        self.dividend_yield = dividend_yield;
        self
    }

    /// Price one leg at `spot`
    pub fn evaluate(&self, index: usize, position: &Position, spot: f64) -> AnalyticsResult<PositionDetail> {
        position.validate()?;
        let time = position.days_to_expiry / DAYS_PER_YEAR;
        let rate = position.risk_free_rate.unwrap_or(self.default_rate);

        let unit_price = price(
            spot,
            position.strike,
            time,
            rate,
            position.volatility,
            self.dividend_yield,
            position.side,
        )?;
        let unit_greeks = greeks(
            spot,
            position.strike,
            time,
            rate,
            position.volatility,
            self.dividend_yield,
            position.side,
        )?;

        let quantity = position.quantity as f64;
        Ok(PositionDetail {
            index,
            position: *position,
            unit_price,
            position_value: unit_price * quantity,
            unit_greeks,
            greeks: unit_greeks.scale(quantity),
        })
    }

    /// Price every leg and sum the valid ones
    ///
    /// Only an invalid spot fails the whole call; per-leg failures land in
    /// `errors` and are left out of the totals.
    pub fn aggregate(&self, positions: &[Position], spot: f64) -> AnalyticsResult<PortfolioSummary> {
        let legs: Vec<Result<Position, PositionError>> = positions.iter().copied().map(Ok).collect();
        self.aggregate_legs(&legs, spot)
    }

    /// Aggregate a JSON array of positions; undecodable legs are reported
    /// in `errors` next to the ones that failed to price
    pub fn aggregate_json(&self, json: &str, spot: f64) -> AnalyticsResult<PortfolioSummary> {
        self.aggregate_legs(&parse_positions(json)?, spot)
    }

    fn aggregate_legs(&self, legs: &[Result<Position, PositionError>], spot: f64) -> AnalyticsResult<PortfolioSummary> {
        if !(spot.is_finite() && spot > 0.0) {
            return Err(AnalyticsError::invalid_parameter(format!("spot must be positive, got {}", spot)));
        }

        let results: Vec<Result<PositionDetail, PositionError>> = legs
            .par_iter()
            .enumerate()
            .map(|(index, leg)| {
                let position = leg.as_ref().map_err(Clone::clone)?;
                self.evaluate(index, position, spot).map_err(|e| PositionError {
                    index,
                    strike: Some(position.strike),
                    side: Some(position.side),
                    error: e.to_string(),
                })
            })
            .collect();

        let mut summary = PortfolioSummary::default();
        for result in results {
            match result {
                Ok(detail) => {
                    summary.greeks = summary.greeks.add(&detail.greeks);
                    summary.net_premium += detail.position_value;
                    summary.position_details.push(detail);
                }
                Err(error) => {
                    tracing::warn!("Skipping position {}: {}", error.index, error.error);
                    summary.errors.push(error);
                }
            }
        }
        summary.position_count = summary.position_details.len();

        tracing::info!(
            "Aggregated {} of {} positions, net premium {:.2}",
            summary.position_count,
            legs.len(),
            summary.net_premium
        );
        Ok(summary)
    }
}

/// Aggregate with a zero dividend yield
pub fn aggregate_portfolio(positions: &[Position], spot: f64, default_rate: f64) -> AnalyticsResult<PortfolioSummary> {
    PortfolioAggregator::new(default_rate).aggregate(positions, spot)
}

/// Sum of per-leg Greeks, for callers holding details from several runs
pub fn total_greeks<'a>(details: impl IntoIterator<Item = &'a PositionDetail>) -> Greeks {
    details
        .into_iter()
        .fold(Greeks::default(), |acc, d| acc.add(&d.greeks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionSide;

    const SPOT: f64 = 24_350.0;

    #[test]
    fn test_partial_failure() {
        let positions = vec![
            Position::new(24_350.0, OptionSide::Call, 2),
            Position::new(-100.0, OptionSide::Put, 1),
            Position::new(24_200.0, OptionSide::Put, -1),
        ];

        let summary = aggregate_portfolio(&positions, SPOT, 0.065).unwrap();
        assert_eq!(summary.position_count, 2);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].index, 1);
        assert_eq!(summary.errors[0].strike, Some(-100.0));
        assert_eq!(summary.errors[0].side, Some(OptionSide::Put));
        assert!(!summary.is_complete());

        let indices: Vec<usize> = summary.position_details.iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![0, 2]);

        let call = &summary.position_details[0];
        let put = &summary.position_details[1];
        assert!((summary.greeks.delta - (call.greeks.delta + put.greeks.delta)).abs() < 1e-12);
        assert!((summary.net_premium - (call.position_value + put.position_value)).abs() < 1e-9);
    }

    #[test]
    fn test_quantity_weighting() {
        let single = aggregate_portfolio(&[Position::new(24_350.0, OptionSide::Call, 1)], SPOT, 0.065).unwrap();
        let short = aggregate_portfolio(&[Position::new(24_350.0, OptionSide::Call, -3)], SPOT, 0.065).unwrap();

        assert!((short.greeks.delta + 3.0 * single.greeks.delta).abs() < 1e-12);
        assert!((short.greeks.gamma + 3.0 * single.greeks.gamma).abs() < 1e-12);
        assert!((short.net_premium + 3.0 * single.net_premium).abs() < 1e-9);
        assert!(short.net_premium < 0.0);
    }

    #[test]
    fn test_straddle_near_delta_neutral() {
        let positions = [
            Position::new(24_350.0, OptionSide::Call, 1),
            Position::new(24_350.0, OptionSide::Put, 1),
        ];
        let summary = aggregate_portfolio(&positions, SPOT, 0.065).unwrap();
        // Call delta ~0.56, put ~-0.44
        assert!(summary.greeks.delta.abs() < 0.2);
        assert!(summary.greeks.gamma > 0.0);
        assert!(summary.greeks.theta < 0.0);
    }

    #[test]
    fn test_rate_override() {
        let base = Position::new(24_350.0, OptionSide::Call, 1);
        let agg = PortfolioAggregator::new(0.065);
        let default_leg = agg.evaluate(0, &base, SPOT).unwrap();
        let zero_rate = agg.evaluate(0, &base.with_rate(0.0), SPOT).unwrap();
        assert!(zero_rate.unit_price < default_leg.unit_price);
    }

    #[test]
    fn test_invalid_spot_fails_whole_call() {
        let err = aggregate_portfolio(&[Position::new(24_350.0, OptionSide::Call, 1)], 0.0, 0.065).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_position_defaults_from_json() {
        let json = r#"[{"strike": 24350, "type": "CE", "quantity": -2},
                       {"strike": 24400, "side": "put", "quantity": 1, "days_to_expiry": 7, "volatility": 0.12}]"#;
        let positions: Vec<Position> = serde_json::from_str(json).unwrap();

        assert_eq!(positions[0].side, OptionSide::Call);
        assert_eq!(positions[0].days_to_expiry, 30.0);
        assert_eq!(positions[0].volatility, 0.20);
        assert_eq!(positions[0].risk_free_rate, None);
        assert_eq!(positions[1].side, OptionSide::Put);
        assert_eq!(positions[1].days_to_expiry, 7.0);
    }

    #[test]
    fn test_bad_side_tag_skips_only_that_leg() {
        let json = r#"[{"strike": 24350, "side": "CE", "quantity": 1},
                       {"strike": 24400, "side": "XX", "quantity": 2},
                       {"strike": 24300, "type": "pe", "quantity": -1}]"#;
        let summary = PortfolioAggregator::new(0.065).aggregate_json(json, SPOT).unwrap();

        assert_eq!(summary.position_count, 2);
        assert_eq!(summary.errors.len(), 1);
        let error = &summary.errors[0];
        assert_eq!(error.index, 1);
        assert_eq!(error.strike, Some(24_400.0));
        assert_eq!(error.side, None);
        assert!(error.error.contains("XX"));

        let indices: Vec<usize> = summary.position_details.iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(summary.position_details[1].position.side, OptionSide::Put);
    }

    #[test]
    fn test_malformed_legs_and_documents() {
        let legs = parse_positions(r#"[{"strike": 24350, "quantity": 1}, "CE", {"strike": 24350, "side": "CE"}]"#).unwrap();
        assert_eq!(legs.len(), 3);
        assert!(legs.iter().all(|leg| leg.is_err()));

        // Not an array at all
        assert!(PortfolioAggregator::new(0.065).aggregate_json(r#"{"strike": 1}"#, SPOT).is_err());
    }

    #[test]
    fn test_total_greeks() {
        let summary = aggregate_portfolio(
            &[
                Position::new(24_300.0, OptionSide::Call, 1),
                Position::new(24_400.0, OptionSide::Call, -1),
            ],
            SPOT,
            0.065,
        )
        .unwrap();
        let total = total_greeks(&summary.position_details);
        assert!((total.delta - summary.greeks.delta).abs() < 1e-12);
    }
}
