//! Market data collaborators
//!
//! Handles:
//! - The [`MarketDataProvider`] capability every data source implements
//! - Yahoo Finance chart API for index spot and historical volatility (free)
//! - Seeded synthetic open interest for demos and offline runs
//! - Local caching of fetched snapshots

pub mod cache;
pub mod provider;
pub mod scenario;
pub mod yahoo;

pub use cache::*;
pub use provider::*;
pub use scenario::*;
pub use yahoo::*;
