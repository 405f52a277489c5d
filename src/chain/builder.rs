//! Strike generation and batch contract pricing

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{days_to_expiry, ChainConfig, StrikePolicy};
use crate::core::{
    AnalyticsError, AnalyticsResult, ContractFailure, ContractRecord, MarketParams, OptionChain,
    OptionContract, OptionSide, DAYS_PER_YEAR, STRIKE_TOLERANCE,
};
use crate::models::{contract_greeks, price_contract, ImpliedVolSolver};

/// Strike ladder around spot
///
/// The base strike is spot rounded to the nearest `step`; non-positive
/// strikes at the low end of a wide ladder are dropped.
pub fn build_strikes(spot: f64, step: f64, policy: StrikePolicy) -> AnalyticsResult<Vec<f64>> {
    if !(spot.is_finite() && spot > 0.0) {
        return Err(AnalyticsError::invalid_parameter(format!("spot must be positive, got {}", spot)));
    }
    if !(step.is_finite() && step > 0.0) {
        return Err(AnalyticsError::invalid_parameter(format!(
            "strike step must be positive, got {}",
            step
        )));
    }
    if policy == StrikePolicy::FixedCount(0) {
        return Err(AnalyticsError::invalid_parameter("strike count must be at least 1"));
    }

    let base = (spot / step).round() * step;
    let strikes: Vec<f64> = policy
        .offsets()
        .map(|i| base + i as f64 * step)
        .filter(|k| *k > 0.0)
        .collect();

    if strikes.is_empty() {
        return Err(AnalyticsError::invalid_parameter(format!(
            "no positive strikes around spot {} with step {}",
            spot, step
        )));
    }
    Ok(strikes)
}

/// A quoted market price used to back out implied volatility
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotedPrice {
    pub strike: f64,
    pub side: OptionSide,
    pub price: f64,
}

/// Price one contract and annotate it with Greeks and moneyness.
///
/// When `market_price` is given, the implied volatility is solved and stored
/// only if the solver converges.
pub fn evaluate_contract(
    params: &MarketParams,
    contract: &OptionContract,
    atm_threshold: f64,
    market_price: Option<f64>,
    solver: &ImpliedVolSolver,
) -> AnalyticsResult<ContractRecord> {
    let theoretical_price = price_contract(params, contract)?;
    let greeks = contract_greeks(params, contract)?;
    let intrinsic_value = contract.intrinsic(params.spot);

    let implied_volatility = market_price.and_then(|mp| {
        match solver.solve(
            mp,
            params.spot,
            contract.strike,
            contract.time_to_expiry,
            params.rate,
            contract.side,
            params.dividend_yield,
        ) {
            Ok(solution) => Some(solution.volatility),
            Err(e) => {
                tracing::debug!("No implied vol for {} {}: {}", contract.side, contract.strike, e);
                None
            }
        }
    });

    Ok(ContractRecord {
        contract: *contract,
        theoretical_price,
        intrinsic_value,
        time_value: (theoretical_price - intrinsic_value).max(0.0),
        moneyness: contract.moneyness(params.spot, atm_threshold),
        moneyness_ratio: contract.moneyness_ratio(params.spot),
        greeks,
        input_volatility: params.volatility,
        implied_volatility,
        open_interest: None,
        volume: None,
    })
}

/// Replace the volatility input with the one implied by a quoted price
pub fn backfill_volatility(
    params: &MarketParams,
    contract: &OptionContract,
    market_price: f64,
    solver: &ImpliedVolSolver,
) -> AnalyticsResult<MarketParams> {
    let solution = solver.solve(
        market_price,
        params.spot,
        contract.strike,
        contract.time_to_expiry,
        params.rate,
        contract.side,
        params.dividend_yield,
    )?;
    Ok(params.with_volatility(solution.volatility))
}

/// Builds and prices option chains
#[derive(Debug, Clone, Default)]
pub struct ChainBuilder {
    config: ChainConfig,
    solver: ImpliedVolSolver,
}

impl ChainBuilder {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config,
            solver: ImpliedVolSolver::new(),
        }
    }

    pub fn with_solver(mut self, solver: ImpliedVolSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Strike ladder for this builder's policy
    pub fn strikes(&self, spot: f64) -> AnalyticsResult<Vec<f64>> {
        build_strikes(spot, self.config.strike_step, self.config.policy)
    }

    /// Contracts for every strike and selected side
    pub fn contracts(&self, spot: f64, time_to_expiry: f64) -> AnalyticsResult<Vec<OptionContract>> {
        let sides = self.config.sides.sides();
        Ok(self
            .strikes(spot)?
            .into_iter()
            .flat_map(|strike| {
                sides
                    .iter()
                    .map(move |&side| OptionContract::new(strike, side, time_to_expiry))
            })
            .collect())
    }

    /// Build and price a chain
    pub fn build(
        &self,
        underlying: &str,
        params: &MarketParams,
        time_to_expiry: f64,
    ) -> AnalyticsResult<OptionChain> {
        self.build_with_quotes(underlying, params, time_to_expiry, &[])
    }

    /// Build and price a chain, solving implied vol wherever a quote is supplied
    pub fn build_with_quotes(
        &self,
        underlying: &str,
        params: &MarketParams,
        time_to_expiry: f64,
        quotes: &[QuotedPrice],
    ) -> AnalyticsResult<OptionChain> {
        params.validate()?;
        let contracts = self.contracts(params.spot, time_to_expiry)?;
        let atm_threshold = self.config.atm_threshold();

        // Contracts are independent: price them in parallel, keep input order
        let results: Vec<(OptionContract, AnalyticsResult<ContractRecord>)> = contracts
            .par_iter()
            .map(|contract| {
                let quote = quotes
                    .iter()
                    .find(|q| q.side == contract.side && (q.strike - contract.strike).abs() < STRIKE_TOLERANCE)
                    .map(|q| q.price);
                (
                    *contract,
                    evaluate_contract(params, contract, atm_threshold, quote, &self.solver),
                )
            })
            .collect();

        let mut records = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (contract, result) in results {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Failed to price {} {}: {}", contract.side, contract.strike, e);
                    failures.push(ContractFailure {
                        strike: contract.strike,
                        side: contract.side,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Priced {} contracts for {} ({} failed, {:.1} days to expiry)",
            records.len(),
            underlying,
            failures.len(),
            time_to_expiry * DAYS_PER_YEAR
        );

        Ok(OptionChain::new(underlying, params.spot, time_to_expiry, records)?.with_failures(failures))
    }

    /// Build a chain for a dated expiry; at least one day is always priced
    pub fn build_for_expiry(
        &self,
        underlying: &str,
        params: &MarketParams,
        expiry: NaiveDate,
        today: NaiveDate,
    ) -> AnalyticsResult<OptionChain> {
        let days = days_to_expiry(expiry, today).max(1);
        let chain = self.build(underlying, params, days as f64 / DAYS_PER_YEAR)?;
        Ok(chain.with_expiry(expiry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SideSelection;
    use crate::core::Moneyness;
    use crate::models::price;

    fn params() -> MarketParams {
        MarketParams::new(24_360.0, 0.065, 0.0, 0.15).unwrap()
    }

    #[test]
    fn test_fixed_count_strikes() {
        let strikes = build_strikes(24_360.0, 50.0, StrikePolicy::FixedCount(31)).unwrap();
        assert_eq!(strikes.len(), 31);
        assert_eq!(strikes[15], 24_350.0);
        assert_eq!(strikes[0], 23_600.0);
        assert_eq!(strikes[30], 25_100.0);
        assert!(strikes.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_atm_window_strikes() {
        let strikes = build_strikes(24_380.0, 50.0, StrikePolicy::AtmWindow(2)).unwrap();
        assert_eq!(strikes, vec![24_300.0, 24_350.0, 24_400.0, 24_450.0, 24_500.0]);
    }

    #[test]
    fn test_strikes_drop_non_positive() {
        let strikes = build_strikes(60.0, 50.0, StrikePolicy::AtmWindow(3)).unwrap();
        assert_eq!(strikes, vec![50.0, 100.0, 150.0, 200.0]);
    }

    #[test]
    fn test_invalid_strike_inputs() {
        assert!(build_strikes(-1.0, 50.0, StrikePolicy::AtmWindow(2)).is_err());
        assert!(build_strikes(100.0, 0.0, StrikePolicy::AtmWindow(2)).is_err());
        assert!(build_strikes(100.0, 50.0, StrikePolicy::FixedCount(0)).is_err());
    }

    #[test]
    fn test_build_chain() {
        let builder = ChainBuilder::new(ChainConfig {
            policy: StrikePolicy::AtmWindow(5),
            ..Default::default()
        });
        let chain = builder.build("NIFTY", &params(), 7.0 / 365.0).unwrap();

        assert_eq!(chain.contracts.len(), 22);
        assert!(chain.failures.is_empty());
        assert_eq!(chain.atm_strike(), Some(24_350.0));

        let atm_call = chain.record(24_350.0, OptionSide::Call).unwrap();
        assert_eq!(atm_call.moneyness, Moneyness::Atm);
        assert!((atm_call.intrinsic_value - 10.0).abs() < 1e-9);
        assert!(atm_call.time_value > 0.0);
        let direct = price(24_360.0, 24_350.0, 7.0 / 365.0, 0.065, 0.15, 0.0, OptionSide::Call).unwrap();
        assert_eq!(atm_call.theoretical_price, direct);

        let itm_call = chain.record(24_200.0, OptionSide::Call).unwrap();
        assert_eq!(itm_call.moneyness, Moneyness::Itm);
        let otm_put = chain.record(24_200.0, OptionSide::Put).unwrap();
        assert_eq!(otm_put.moneyness, Moneyness::Otm);
        assert!(otm_put.greeks.delta < 0.0);
    }

    #[test]
    fn test_single_side_chain() {
        let builder = ChainBuilder::new(ChainConfig {
            policy: StrikePolicy::AtmWindow(1),
            sides: SideSelection::PutsOnly,
            ..Default::default()
        });
        let chain = builder.build("NIFTY", &params(), 7.0 / 365.0).unwrap();
        assert_eq!(chain.contracts.len(), 3);
        assert!(chain.contracts.iter().all(|c| c.side() == OptionSide::Put));
    }

    #[test]
    fn test_invalid_market_params_fail_whole_build() {
        let bad = MarketParams {
            spot: 0.0,
            rate: 0.065,
            dividend_yield: 0.0,
            volatility: 0.15,
        };
        let err = ChainBuilder::default().build("NIFTY", &bad, 0.1).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_quotes_backfill_implied_vol() {
        let p = params();
        let t = 14.0 / 365.0;
        let market = price(p.spot, 24_400.0, t, p.rate, 0.18, 0.0, OptionSide::Call).unwrap();
        let quotes = [
            QuotedPrice { strike: 24_400.0, side: OptionSide::Call, price: market },
            // Above the underlying: cannot converge, must stay None
            QuotedPrice { strike: 24_450.0, side: OptionSide::Call, price: 1e9 },
        ];

        let builder = ChainBuilder::new(ChainConfig {
            policy: StrikePolicy::AtmWindow(2),
            ..Default::default()
        });
        let chain = builder.build_with_quotes("NIFTY", &p, t, &quotes).unwrap();

        let iv = chain.record(24_400.0, OptionSide::Call).unwrap().implied_volatility.unwrap();
        assert!((iv - 0.18).abs() < 1e-4);
        assert_eq!(chain.record(24_450.0, OptionSide::Call).unwrap().implied_volatility, None);
        assert_eq!(chain.record(24_400.0, OptionSide::Put).unwrap().implied_volatility, None);
    }

    #[test]
    fn test_backfill_volatility() {
        let p = params();
        let contract = OptionContract::from_days(24_300.0, OptionSide::Put, 21.0);
        let market = price(p.spot, 24_300.0, contract.time_to_expiry, p.rate, 0.22, 0.0, OptionSide::Put).unwrap();

        let filled = backfill_volatility(&p, &contract, market, &ImpliedVolSolver::new()).unwrap();
        assert!((filled.volatility - 0.22).abs() < 1e-4);
        assert_eq!(filled.spot, p.spot);
    }

    #[test]
    fn test_build_for_expiry_floors_at_one_day() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 16).unwrap();
        let chain = ChainBuilder::new(ChainConfig::atm_only())
            .build_for_expiry("NIFTY", &params(), today, today)
            .unwrap();
        assert_eq!(chain.expiry, Some(today));
        assert!((chain.time_to_expiry - 1.0 / 365.0).abs() < 1e-12);
    }
}
