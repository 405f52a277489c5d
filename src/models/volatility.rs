//! Volatility inputs
//!
//! Feeds quote volatility either as a fraction or in percent; everything is
//! normalized to a decimal fraction before it reaches a pricing call.

use serde::{Deserialize, Serialize};

use crate::core::{AnalyticsError, AnalyticsResult};

/// Trading days used to annualize daily return volatility
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// A volatility figure tagged with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "lowercase")]
pub enum VolatilityQuote {
    /// 0.15 = 15%
    Fraction(f64),
    /// 15.0 = 15%
    Percent(f64),
}

impl VolatilityQuote {
    pub fn to_fraction(self) -> AnalyticsResult<f64> {
        let v = match self {
            VolatilityQuote::Fraction(v) => v,
            VolatilityQuote::Percent(p) => p / 100.0,
        };
        if !(v.is_finite() && v >= 0.0) {
            return Err(AnalyticsError::invalid_parameter(format!(
                "volatility must be non-negative, got {:?}",
                self
            )));
        }
        Ok(v)
    }
}

/// Annualized close-to-close volatility from a price series
///
/// Uses the sample standard deviation of log returns. Non-positive closes
/// are skipped; at least three usable closes are needed.
pub fn historical_volatility(closes: &[f64], periods_per_year: f64) -> AnalyticsResult<f64> {
    let usable: Vec<f64> = closes
        .iter()
        .copied()
        .filter(|c| c.is_finite() && *c > 0.0)
        .collect();

    if usable.len() < 3 {
        return Err(AnalyticsError::unavailable(format!(
            "need at least 3 closes for historical volatility, got {}",
            usable.len()
        )));
    }

    let returns: Vec<f64> = usable.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);

    Ok(variance.sqrt() * periods_per_year.sqrt())
}

/// Mean implied volatility of quotes near spot
///
/// `quotes` are `(strike, iv_percent)` pairs as exchanges publish them;
/// zero or missing IVs are ignored. The result is a decimal fraction.
pub fn atm_implied_volatility(quotes: &[(f64, f64)], spot: f64, band: f64) -> AnalyticsResult<f64> {
    let near: Vec<f64> = quotes
        .iter()
        .filter(|(strike, iv)| (strike - spot).abs() < band && *iv > 0.0)
        .map(|(_, iv)| *iv)
        .collect();

    if near.is_empty() {
        return Err(AnalyticsError::unavailable(format!(
            "no implied volatility quoted within {} of spot {}",
            band, spot
        )));
    }

    let mean = near.iter().sum::<f64>() / near.len() as f64;
    VolatilityQuote::Percent(mean).to_fraction()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_normalization() {
        assert_eq!(VolatilityQuote::Percent(15.0).to_fraction().unwrap(), 0.15);
        assert_eq!(VolatilityQuote::Fraction(0.15).to_fraction().unwrap(), 0.15);
        assert!(VolatilityQuote::Percent(-1.0).to_fraction().is_err());
    }

    #[test]
    fn test_historical_volatility() {
        // Alternating +1% / -1% moves
        let mut closes = vec![100.0];
        for i in 0..20 {
            let last = closes[closes.len() - 1];
            closes.push(if i % 2 == 0 { last * 1.01 } else { last / 1.01 });
        }
        let vol = historical_volatility(&closes, TRADING_DAYS_PER_YEAR).unwrap();
        let daily = 1.01_f64.ln();
        // sample std of ±daily with zero mean: daily * sqrt(n / (n - 1))
        let expected = daily * (20.0_f64 / 19.0).sqrt() * TRADING_DAYS_PER_YEAR.sqrt();
        assert!((vol - expected).abs() < 1e-9);

        let flat = historical_volatility(&[100.0, 100.0, 100.0], TRADING_DAYS_PER_YEAR).unwrap();
        assert_eq!(flat, 0.0);
    }

    #[test]
    fn test_historical_volatility_needs_data() {
        let err = historical_volatility(&[100.0, -1.0, 101.0], TRADING_DAYS_PER_YEAR).unwrap_err();
        assert!(matches!(err, AnalyticsError::UpstreamDataUnavailable(_)));
    }

    #[test]
    fn test_atm_implied_volatility() {
        let quotes = [(24_300.0, 14.0), (24_350.0, 12.0), (24_400.0, 0.0), (25_000.0, 30.0)];
        let iv = atm_implied_volatility(&quotes, 24_360.0, 100.0).unwrap();
        assert!((iv - 0.13).abs() < 1e-12);

        assert!(atm_implied_volatility(&quotes, 30_000.0, 100.0).is_err());
    }
}
