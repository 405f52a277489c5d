//! Yahoo Finance data fetcher
//!
//! Spot and daily closes for Indian indices from the v8 chart endpoint.
//! Uses Yahoo Finance's unofficial API.
//!
//! Note: Yahoo does not publish NSE option open interest, so this provider
//! reports OI as unavailable. Wrap it in a `SyntheticOiProvider` or pair it
//! with an exchange feed for chain analytics.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use super::MarketDataProvider;
use crate::core::{AnalyticsError, AnalyticsResult, OiSnapshot};
use crate::models::{historical_volatility, TRADING_DAYS_PER_YEAR};

/// Yahoo ticker for an index name
pub fn yahoo_symbol(symbol: &str) -> &str {
    match symbol {
        "NIFTY" | "NIFTY50" => "^NSEI",
        "BANKNIFTY" => "^NSEBANK",
        "SENSEX" => "^BSESN",
        other => other,
    }
}

/// Yahoo Finance API client
pub struct YahooClient {
    client: reqwest::blocking::Client,
    base_url: String,
    /// Calendar days of closes used for historical volatility
    lookback_days: i64,
}

impl YahooClient {
    pub fn new(timeout: Duration) -> AnalyticsResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(timeout)
            .build()
            .map_err(|e| AnalyticsError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            lookback_days: 30,
        })
    }

    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/{}", self.base_url, yahoo_symbol(symbol).replace('^', "%5E"))
    }

    fn get_chart(&self, url: &str) -> AnalyticsResult<String> {
        self.client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| AnalyticsError::Network(e.to_string()))?
            .text()
            .map_err(|e| AnalyticsError::Network(e.to_string()))
    }

    /// Current regular-market price
    pub fn get_spot(&self, symbol: &str) -> AnalyticsResult<f64> {
        tracing::info!("Fetching {} price from Yahoo Finance", symbol);
        let body = self.get_chart(&self.chart_url(symbol))?;
        parse_spot(&body)
    }

    /// Daily closes over the last `days` calendar days, oldest first
    pub fn get_daily_closes(&self, symbol: &str, days: i64) -> AnalyticsResult<Vec<f64>> {
        let end = Utc::now().timestamp();
        let start = end - days * 24 * 60 * 60;
        let url = format!(
            "{}?period1={}&period2={}&interval=1d",
            self.chart_url(symbol),
            start,
            end
        );

        tracing::info!("Fetching {} days of {} history", days, symbol);
        let body = self.get_chart(&url)?;
        parse_closes(&body)
    }
}

impl MarketDataProvider for YahooClient {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn spot_price(&self, symbol: &str) -> AnalyticsResult<f64> {
        self.get_spot(symbol)
    }

    fn volatility(&self, symbol: &str) -> AnalyticsResult<f64> {
        let closes = self.get_daily_closes(symbol, self.lookback_days)?;
        let vol = historical_volatility(&closes, TRADING_DAYS_PER_YEAR)?;
        tracing::info!("Historical volatility for {}: {:.4}", symbol, vol);
        Ok(vol)
    }

    fn open_interest(&self, symbol: &str, _spot: f64, _volatility: f64, _strikes: &[f64]) -> AnalyticsResult<OiSnapshot> {
        Err(AnalyticsError::unavailable(format!(
            "Yahoo Finance does not publish option open interest for {}",
            symbol
        )))
    }
}

// Yahoo Finance chart response structures

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn first_result(body: &str) -> AnalyticsResult<ChartResult> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| AnalyticsError::data(format!("Failed to parse chart: {}", e)))?;

    if let Some(err) = response.chart.error {
        return Err(AnalyticsError::unavailable(format!(
            "Yahoo chart error {}: {}",
            err.code.unwrap_or_default(),
            err.description.unwrap_or_default()
        )));
    }

    response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| AnalyticsError::unavailable("No chart data returned"))
}

/// Spot from a chart response body
pub fn parse_spot(body: &str) -> AnalyticsResult<f64> {
    first_result(body)?
        .meta
        .regular_market_price
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| AnalyticsError::unavailable("chart response has no regular market price"))
}

/// Daily closes from a chart response body; null bars are dropped
pub fn parse_closes(body: &str) -> AnalyticsResult<Vec<f64>> {
    let closes: Vec<f64> = first_result(body)?
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .map(|q| q.close.into_iter().flatten().collect())
        .unwrap_or_default();

    if closes.is_empty() {
        return Err(AnalyticsError::unavailable("chart response has no closes"));
    }
    Ok(closes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "^NSEI", "regularMarketPrice": 24361.5},
                "timestamp": [1736740800, 1736827200, 1736913600, 1737000000],
                "indicators": {"quote": [{
                    "open": [24300.0, 24310.0, null, 24350.0],
                    "close": [24310.2, 24290.8, null, 24361.5]
                }]}
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_symbol_mapping() {
        assert_eq!(yahoo_symbol("NIFTY"), "^NSEI");
        assert_eq!(yahoo_symbol("BANKNIFTY"), "^NSEBANK");
        assert_eq!(yahoo_symbol("^GSPC"), "^GSPC");
    }

    #[test]
    fn test_parse_spot() {
        assert_eq!(parse_spot(CHART).unwrap(), 24361.5);
    }

    #[test]
    fn test_parse_closes_drops_nulls() {
        let closes = parse_closes(CHART).unwrap();
        assert_eq!(closes, vec![24310.2, 24290.8, 24361.5]);
        assert!(historical_volatility(&closes, TRADING_DAYS_PER_YEAR).is_ok());
    }

    #[test]
    fn test_chart_error_is_unavailable() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let err = parse_spot(body).unwrap_err();
        assert!(matches!(err, AnalyticsError::UpstreamDataUnavailable(_)));

        assert!(matches!(parse_spot("not json"), Err(AnalyticsError::Data(_))));
    }

    #[test]
    #[ignore] // Requires network
    fn test_get_nifty_spot() {
        let client = YahooClient::new(Duration::from_secs(15)).unwrap();
        let spot = client.get_spot("NIFTY").unwrap();

        assert!(spot > 0.0);
        println!("NIFTY spot: {}", spot);
    }
}
