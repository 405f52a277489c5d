//! # NIFTY Greeks - Options Analytics Core
//!
//! Pricing, Greeks and chain analytics for European index options
//! (NIFTY, BANKNIFTY, SENSEX).
//!
//! ## Overview
//!
//! - **Black-Scholes**: Closed-form pricing with a continuous dividend yield
//! - **Greeks**: Analytic delta, gamma, theta (per day), vega and rho (per point),
//!   plus vanna and vomma
//! - **Implied Volatility**: Newton-Raphson with clamped iterates
//! - **Chains**: Strike generation around spot and parallel pricing
//! - **Chain Analytics**: Max pain, put/call ratio, support and resistance from OI
//! - **Portfolio**: Quantity-weighted Greek aggregation with per-leg errors
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nifty_greeks::prelude::*;
//!
//! let provider = SyntheticOiProvider::new(
//!     StaticProvider::new(24_360.0).with_volatility(0.15),
//!     ScenarioGenerator::new(42),
//!     7.0,
//! );
//! let report = generate_report(&provider, &Settings::default(), &ReportRequest::default()).unwrap();
//!
//! if let Some(analytics) = &report.analytics {
//!     println!("Max pain: {}", analytics.max_pain_strike);
//! }
//! ```
//!
//! ## What This Crate Does NOT Do
//!
//! - Stream quotes or persist history
//! - Connect to an exchange or broker
//! - Price American exercise

pub mod analytics;
pub mod chain;
pub mod config;
pub mod core;
pub mod data;
pub mod models;
pub mod portfolio;
pub mod report;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        AnalyticsError, AnalyticsResult, ContractRecord, Greeks, MarketParams, Moneyness, OiSnapshot,
        OptionChain, OptionContract, OptionSide, StrikeOi, DAYS_PER_YEAR,
    };

    // Models
    pub use crate::models::{
        greeks as bs_greeks, historical_volatility, implied_volatility, norm_cdf, norm_pdf,
        price as bs_price, ImpliedVolSolver, IvSolution, VolatilityQuote,
    };

    // Chains
    pub use crate::chain::{
        days_to_expiry, next_weekly_expiry, ChainBuilder, ChainConfig, QuotedPrice, StrikePolicy,
    };

    // Chain analytics
    pub use crate::analytics::{
        put_call_ratio, AnalyticsConfig, ChainAnalytics, ChainAnalyzer, ChainGreeksSummary,
        MaxPainResult, PcrSignal, SupportResistanceLevel,
    };

    // Portfolio
    pub use crate::portfolio::{aggregate_portfolio, PortfolioAggregator, PortfolioSummary, Position};

    // Data
    pub use crate::data::{
        CacheConfig, CachedFetcher, MarketDataProvider, MarketSnapshot, ScenarioGenerator, StaticProvider,
        SyntheticOiProvider, YahooClient,
    };

    pub use crate::config::{Profile, Settings};
    pub use crate::report::{generate_report, report_from_snapshot, ChainReport, ReportRequest};
}

// Re-export main types at crate root
pub use crate::core::{AnalyticsError, AnalyticsResult};
