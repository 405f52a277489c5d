//! Black-Scholes Model
//!
//! Provides:
//! - European option pricing with continuous dividend yield
//! - Analytic Greeks (delta, gamma, theta/day, vega and rho per point, vanna, vomma)
//! - Unscaled vega for the implied volatility solver
//!
//! Expiry (`T <= 0`) and zero volatility are limiting cases with explicit
//! branches; they never reach the `d1`/`d2` division.

use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::erfc;

use crate::core::{AnalyticsError, AnalyticsResult, Greeks, MarketParams, OptionContract, OptionSide};

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Black-Scholes d1 parameter
pub fn d1(spot: f64, strike: f64, time: f64, rate: f64, vol: f64, div: f64) -> f64 {
    ((spot / strike).ln() + (rate - div + 0.5 * vol * vol) * time) / (vol * time.sqrt())
}

/// Black-Scholes d2 parameter
pub fn d2(spot: f64, strike: f64, time: f64, rate: f64, vol: f64, div: f64) -> f64 {
    d1(spot, strike, time, rate, vol, div) - vol * time.sqrt()
}

fn validate(spot: f64, strike: f64, time: f64, rate: f64, vol: f64, div: f64) -> AnalyticsResult<()> {
    if !(spot.is_finite() && spot > 0.0) {
        return Err(AnalyticsError::invalid_parameter(format!("spot must be positive, got {}", spot)));
    }
    if !(strike.is_finite() && strike > 0.0) {
        return Err(AnalyticsError::invalid_parameter(format!("strike must be positive, got {}", strike)));
    }
    if !(vol.is_finite() && vol >= 0.0) {
        return Err(AnalyticsError::invalid_parameter(format!(
            "volatility must be non-negative, got {}",
            vol
        )));
    }
    if !(time.is_finite() && rate.is_finite() && div.is_finite()) {
        return Err(AnalyticsError::invalid_parameter("time, rate and dividend yield must be finite"));
    }
    Ok(())
}

/// Black-Scholes European option price
///
/// At or past expiry the intrinsic value is returned. With zero volatility
/// the payoff is deterministic: the intrinsic value of the discounted
/// forward, `max(S·e^(-qT) − K·e^(-rT), 0)` for a call.
pub fn price(
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    vol: f64,
    div: f64,
    side: OptionSide,
) -> AnalyticsResult<f64> {
    validate(spot, strike, time, rate, vol, div)?;

    if time <= 0.0 {
        return Ok(side.intrinsic(spot, strike));
    }

    let div_factor = (-div * time).exp();
    let df = (-rate * time).exp();

    if vol == 0.0 {
        return Ok(side.intrinsic(spot * div_factor, strike * df));
    }

    let d1 = d1(spot, strike, time, rate, vol, div);
    let d2 = d1 - vol * time.sqrt();

    let value = match side {
        OptionSide::Call => spot * div_factor * norm_cdf(d1) - strike * df * norm_cdf(d2),
        OptionSide::Put => strike * df * norm_cdf(-d2) - spot * div_factor * norm_cdf(-d1),
    };

    Ok(value.max(0.0))
}

/// Black-Scholes Greeks
///
/// Theta is per calendar day, vega per 1 vol point and rho per 1 rate point.
pub fn greeks(
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    vol: f64,
    div: f64,
    side: OptionSide,
) -> AnalyticsResult<Greeks> {
    validate(spot, strike, time, rate, vol, div)?;

    if time <= 0.0 || vol == 0.0 {
        // At expiry or zero vol
        let delta = match side {
            OptionSide::Call => if spot > strike { 1.0 } else { 0.0 },
            OptionSide::Put => if spot < strike { -1.0 } else { 0.0 },
        };
        let mut g = Greeks::new(delta, 0.0, 0.0, 0.0, 0.0);
        g.vanna = Some(0.0);
        g.vomma = Some(0.0);
        return Ok(g);
    }

    let sqrt_t = time.sqrt();
    let d1 = d1(spot, strike, time, rate, vol, div);
    let d2 = d1 - vol * sqrt_t;
    let df = (-rate * time).exp();
    let div_factor = (-div * time).exp();
    let pdf_d1 = norm_pdf(d1);

    let delta = match side {
        OptionSide::Call => div_factor * norm_cdf(d1),
        OptionSide::Put => div_factor * (norm_cdf(d1) - 1.0),
    };

    // Gamma and vega are side independent
    let gamma = div_factor * pdf_d1 / (spot * vol * sqrt_t);
    let vega = spot * div_factor * pdf_d1 * sqrt_t / 100.0;

    let term1 = -spot * div_factor * pdf_d1 * vol / (2.0 * sqrt_t);
    let theta = match side {
        OptionSide::Call => {
            term1 - rate * strike * df * norm_cdf(d2) + div * spot * div_factor * norm_cdf(d1)
        }
        OptionSide::Put => {
            term1 + rate * strike * df * norm_cdf(-d2) - div * spot * div_factor * norm_cdf(-d1)
        }
    };
    let theta_per_day = theta / 365.0;

    let rho = match side {
        OptionSide::Call => strike * time * df * norm_cdf(d2) / 100.0,
        OptionSide::Put => -strike * time * df * norm_cdf(-d2) / 100.0,
    };

    let mut greeks = Greeks::new(delta, gamma, theta_per_day, vega, rho);

    // Vanna: d(delta)/d(vol)
    greeks.vanna = Some(-div_factor * pdf_d1 * d2 / vol);

    // Vomma: d(vega)/d(vol), on the per-point vega scale
    greeks.vomma = Some(vega * d1 * d2 / vol);

    Ok(greeks)
}

/// Unscaled vega `S·e^(-qT)·φ(d1)·√T`, the Newton-Raphson derivative
///
/// Zero at expiry or with zero volatility.
pub fn vega_raw(spot: f64, strike: f64, time: f64, rate: f64, vol: f64, div: f64) -> f64 {
    if time <= 0.0 || vol <= 0.0 {
        return 0.0;
    }
    let d1 = d1(spot, strike, time, rate, vol, div);
    spot * (-div * time).exp() * norm_pdf(d1) * time.sqrt()
}

/// Price a contract under the given market parameters
pub fn price_contract(params: &MarketParams, contract: &OptionContract) -> AnalyticsResult<f64> {
    price(
        params.spot,
        contract.strike,
        contract.time_to_expiry,
        params.rate,
        params.volatility,
        params.dividend_yield,
        contract.side,
    )
}

/// Greeks of a contract under the given market parameters
pub fn contract_greeks(params: &MarketParams, contract: &OptionContract) -> AnalyticsResult<Greeks> {
    greeks(
        params.spot,
        contract.strike,
        contract.time_to_expiry,
        params.rate,
        params.volatility,
        params.dividend_yield,
        contract.side,
    )
}
