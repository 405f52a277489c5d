//! End-to-end chain report
//!
//! Fetch a market snapshot, price the chain, attach open interest and run
//! the chain analytics. This is the payload a dashboard or API renders.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{ChainAnalytics, ChainAnalyzer, ChainGreeksSummary};
use crate::chain::{days_to_expiry, next_weekly_expiry, ChainBuilder, QuotedPrice};
use crate::config::Settings;
use crate::core::{AnalyticsResult, ContractFailure, ContractRecord, MarketParams, StrikeOi, DAYS_PER_YEAR};
use crate::data::{MarketDataProvider, MarketSnapshot};

/// What to report on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Narrow chain around ATM instead of the full strike count
    pub atm_only: bool,
    /// Defaults to the front weekly expiry
    pub expiry: Option<NaiveDate>,
    /// Overrides the calendar-derived days to expiry
    pub days_to_expiry: Option<f64>,
    /// Quoted prices to back out implied volatility from
    pub quotes: Vec<QuotedPrice>,
}

/// Report header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub symbol: String,
    pub provider: String,
    pub spot: f64,
    pub volatility: f64,
    pub risk_free_rate: f64,
    pub dividend_yield: f64,
    pub expiry: Option<NaiveDate>,
    pub days_to_expiry: f64,
    pub atm_strike: Option<f64>,
    /// Why analytics are missing, when they are
    pub open_interest_error: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Priced chain plus chain-level analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainReport {
    pub metadata: ReportMetadata,
    pub contracts: Vec<ContractRecord>,
    pub failures: Vec<ContractFailure>,
    /// `None` when no open interest was available
    pub analytics: Option<ChainAnalytics>,
    /// OI rows around ATM for charting
    pub oi_chart: Vec<StrikeOi>,
    pub greeks_summary: ChainGreeksSummary,
}

/// Fetch from `provider` and build the report
pub fn generate_report<P>(provider: &P, settings: &Settings, request: &ReportRequest) -> AnalyticsResult<ChainReport>
where
    P: MarketDataProvider + ?Sized,
{
    let builder = ChainBuilder::new(settings.chain_config(request.atm_only));
    let snapshot = MarketSnapshot::fetch(provider, &settings.symbol, settings.default_volatility, |spot| {
        builder.strikes(spot)
    })?;
    report_from_snapshot(&snapshot, settings, request, Local::now().naive_local())
}

/// Build the report from an already fetched snapshot
///
/// `now` is the local exchange time used to pick the front expiry.
pub fn report_from_snapshot(
    snapshot: &MarketSnapshot,
    settings: &Settings,
    request: &ReportRequest,
    now: NaiveDateTime,
) -> AnalyticsResult<ChainReport> {
    let params = MarketParams::new(
        snapshot.spot,
        settings.risk_free_rate,
        settings.dividend_yield,
        snapshot.volatility,
    )?;

    let expiry = request.expiry.unwrap_or_else(|| next_weekly_expiry(now));
    let days = request
        .days_to_expiry
        .unwrap_or_else(|| days_to_expiry(expiry, now.date()).max(1) as f64);

    let builder = ChainBuilder::new(settings.chain_config(request.atm_only));
    let mut chain = builder
        .build_with_quotes(&snapshot.symbol, &params, days / DAYS_PER_YEAR, &request.quotes)?
        .with_expiry(expiry);

    let analyzer = ChainAnalyzer::with_config(settings.analytics_config());
    let (analytics, oi_chart) = match &snapshot.open_interest {
        Some(oi) => {
            chain = chain.with_open_interest(oi);
            (Some(analyzer.analyze(oi, snapshot.spot)?), analyzer.chart_data(oi, snapshot.spot))
        }
        None => (None, Vec::new()),
    };
    let greeks_summary = analyzer.greeks_summary(&chain);

    tracing::info!(
        "Report for {} expiry {}: {} contracts, {} failures, analytics {}",
        snapshot.symbol,
        expiry,
        chain.contracts.len(),
        chain.failures.len(),
        if analytics.is_some() { "included" } else { "skipped" }
    );

    Ok(ChainReport {
        metadata: ReportMetadata {
            symbol: snapshot.symbol.clone(),
            provider: snapshot.provider.clone(),
            spot: snapshot.spot,
            volatility: snapshot.volatility,
            risk_free_rate: settings.risk_free_rate,
            dividend_yield: settings.dividend_yield,
            expiry: Some(expiry),
            days_to_expiry: days,
            atm_strike: chain.atm_strike(),
            open_interest_error: snapshot.open_interest_error.clone(),
            generated_at: Utc::now(),
        },
        contracts: chain.contracts,
        failures: chain.failures,
        analytics,
        oi_chart,
        greeks_summary,
    })
}
