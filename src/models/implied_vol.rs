//! Implied volatility solver
//!
//! Newton-Raphson on the Black-Scholes price using the unscaled vega as the
//! derivative. Every iterate is clamped to `[min_vol, max_vol]`. The solver
//! reports success only when the price error falls inside tolerance; running
//! out of iterations or hitting a vanishing vega is a `ConvergenceFailure`,
//! never a silently returned last guess.

use serde::{Deserialize, Serialize};

use super::black_scholes::{price, vega_raw};
use crate::core::{AnalyticsError, AnalyticsResult, OptionSide};

/// Solver settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvConfig {
    /// Starting volatility
    /// Default: 0.2
    pub initial_guess: f64,
    /// Absolute price tolerance
    /// Default: 1e-5
    pub tolerance: f64,
    /// Default: 100
    pub max_iterations: usize,
    /// Lower clamp for each iterate
    pub min_vol: f64,
    /// Upper clamp for each iterate
    pub max_vol: f64,
    /// Abort when the unscaled vega drops below this
    pub min_vega: f64,
}

impl Default for IvConfig {
    fn default() -> Self {
        Self {
            initial_guess: 0.2,
            tolerance: 1e-5,
            max_iterations: 100,
            min_vol: 0.01,
            max_vol: 5.0,
            min_vega: 1e-10,
        }
    }
}

/// A converged implied volatility
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IvSolution {
    /// Decimal fraction (0.15 = 15%)
    pub volatility: f64,
    /// Newton steps taken
    pub iterations: usize,
    /// Model price minus market price at the solution
    pub price_error: f64,
}

impl IvSolution {
    pub fn volatility_percent(&self) -> f64 {
        self.volatility * 100.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImpliedVolSolver {
    config: IvConfig,
}

impl ImpliedVolSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: IvConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IvConfig {
        &self.config
    }

    /// Solve for the volatility that reproduces `market_price`
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &self,
        market_price: f64,
        spot: f64,
        strike: f64,
        time: f64,
        rate: f64,
        side: OptionSide,
        div: f64,
    ) -> AnalyticsResult<IvSolution> {
        let cfg = &self.config;

        if !(spot.is_finite() && spot > 0.0) || !(strike.is_finite() && strike > 0.0) {
            return Err(AnalyticsError::invalid_parameter(format!(
                "spot and strike must be positive, got {} / {}",
                spot, strike
            )));
        }
        if !(market_price.is_finite() && market_price > 0.0) {
            return Err(AnalyticsError::convergence("non-positive market price", 0, None));
        }
        // Any volatility prices within tolerance of such a quote
        if market_price < cfg.tolerance {
            return Err(AnalyticsError::convergence(
                format!("market price {:.2e} below price tolerance {:.0e}", market_price, cfg.tolerance),
                0,
                None,
            ));
        }
        if time <= 0.0 {
            return Err(AnalyticsError::convergence("non-positive time to expiry", 0, None));
        }

        // No-arbitrage bounds: zero-vol value below, discounted underlying/strike above
        let lower = price(spot, strike, time, rate, 0.0, div, side)?;
        let upper = match side {
            OptionSide::Call => spot * (-div * time).exp(),
            OptionSide::Put => strike * (-rate * time).exp(),
        };
        if market_price < lower - cfg.tolerance || market_price >= upper {
            return Err(AnalyticsError::convergence(
                format!(
                    "market price {:.4} outside no-arbitrage bounds [{:.4}, {:.4})",
                    market_price, lower, upper
                ),
                0,
                None,
            ));
        }

        let mut vol = cfg.initial_guess.clamp(cfg.min_vol, cfg.max_vol);

        for iteration in 0..=cfg.max_iterations {
            let diff = price(spot, strike, time, rate, vol, div, side)? - market_price;

            if diff.abs() < cfg.tolerance {
                return Ok(IvSolution {
                    volatility: vol,
                    iterations: iteration,
                    price_error: diff,
                });
            }
            if iteration == cfg.max_iterations {
                break;
            }

            let vega = vega_raw(spot, strike, time, rate, vol, div);
            if vega < cfg.min_vega {
                return Err(AnalyticsError::convergence(
                    format!("vega underflow ({:.3e}) at vol {:.4}", vega, vol),
                    iteration,
                    Some(vol),
                ));
            }

            vol = (vol - diff / vega).clamp(cfg.min_vol, cfg.max_vol);
        }

        Err(AnalyticsError::convergence(
            "iteration cap reached without meeting tolerance",
            cfg.max_iterations,
            Some(vol),
        ))
    }
}

/// Implied volatility with the default solver settings
pub fn implied_volatility(
    market_price: f64,
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    side: OptionSide,
    div: f64,
) -> AnalyticsResult<f64> {
    ImpliedVolSolver::new()
        .solve(market_price, spot, strike, time, rate, side, div)
        .map(|s| s.volatility)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_convergence_failure(err: &AnalyticsError) -> bool {
        matches!(err, AnalyticsError::ConvergenceFailure { .. })
    }

    #[test]
    fn test_implied_vol_round_trip() {
        let cases = [
            (100.0, 100.0, 0.5, 0.05, 0.0),
            (24_350.0, 24_350.0, 30.0 / 365.0, 0.065, 0.0),
            (24_350.0, 24_500.0, 7.0 / 365.0, 0.065, 0.0),
            (100.0, 110.0, 1.0, 0.05, 0.02),
        ];
        for (spot, strike, time, rate, div) in cases {
            for side in OptionSide::BOTH {
                for vol in [0.05, 0.10, 0.20, 0.50, 1.0] {
                    let market = price(spot, strike, time, rate, vol, div, side).unwrap();
                    let iv = implied_volatility(market, spot, strike, time, rate, side, div).unwrap();
                    assert!(
                        (iv - vol).abs() < 1e-4,
                        "{:?} K={} vol={} -> {}",
                        side,
                        strike,
                        vol,
                        iv
                    );
                }
            }
        }
    }

    #[test]
    fn test_iv_otm_put_with_dividend() {
        let (spot, strike, rate, div, vol, time) = (100.0, 90.0, 0.05, 0.01, 0.30, 0.25);
        let market = price(spot, strike, time, rate, vol, div, OptionSide::Put).unwrap();
        let solution = ImpliedVolSolver::new()
            .solve(market, spot, strike, time, rate, OptionSide::Put, div)
            .unwrap();

        assert!((solution.volatility - vol).abs() < 1e-4);
        assert!(solution.price_error.abs() < 1e-5);
        assert!(solution.iterations < 20);
    }

    #[test]
    fn test_degenerate_inputs_fail() {
        let err = implied_volatility(0.0, 100.0, 100.0, 0.5, 0.05, OptionSide::Call, 0.0).unwrap_err();
        assert!(is_convergence_failure(&err));

        let err = implied_volatility(5.0, 100.0, 100.0, 0.0, 0.05, OptionSide::Call, 0.0).unwrap_err();
        assert!(is_convergence_failure(&err));

        let err = implied_volatility(5.0, -100.0, 100.0, 0.5, 0.05, OptionSide::Call, 0.0).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_price_outside_bounds_fails() {
        // A call can never be worth more than the underlying
        let err = implied_volatility(150.0, 100.0, 100.0, 0.5, 0.05, OptionSide::Call, 0.0).unwrap_err();
        assert!(is_convergence_failure(&err));

        // Nor less than its zero-vol value
        let err = implied_volatility(15.0, 120.0, 100.0, 0.5, 0.05, OptionSide::Call, 0.0).unwrap_err();
        assert!(is_convergence_failure(&err));
    }

    #[test]
    fn test_sub_tolerance_quote_is_rejected() {
        // Deep OTM at low vol: the model price is far below the tolerance
        let market = price(100.0, 150.0, 30.0 / 365.0, 0.05, 0.05, 0.0, OptionSide::Call).unwrap();
        assert!(market < 1e-5);

        let err = implied_volatility(market.max(1e-12), 100.0, 150.0, 30.0 / 365.0, 0.05, OptionSide::Call, 0.0)
            .unwrap_err();
        match err {
            AnalyticsError::ConvergenceFailure { iterations, last_estimate, .. } => {
                assert_eq!(iterations, 0);
                assert_eq!(last_estimate, None);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_vega_underflow_fails() {
        let err = implied_volatility(1e-3, 100.0, 1_000.0, 0.01, 0.05, OptionSide::Call, 0.0).unwrap_err();
        match err {
            AnalyticsError::ConvergenceFailure { reason, last_estimate, .. } => {
                assert!(reason.contains("vega"));
                assert!(last_estimate.is_some());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_iteration_cap_is_not_success() {
        let solver = ImpliedVolSolver::with_config(IvConfig {
            max_iterations: 1,
            ..IvConfig::default()
        });
        let market = price(100.0, 100.0, 0.5, 0.05, 1.5, 0.0, OptionSide::Call).unwrap();
        let err = solver
            .solve(market, 100.0, 100.0, 0.5, 0.05, OptionSide::Call, 0.0)
            .unwrap_err();
        match err {
            AnalyticsError::ConvergenceFailure { iterations, .. } => assert_eq!(iterations, 1),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
