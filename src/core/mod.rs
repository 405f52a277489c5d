//! Core data types for option analytics
//!
//! Defines fundamental types:
//! - OptionSide / Moneyness / MarketParams / OptionContract
//! - Greeks
//! - ContractRecord, OptionChain, OiSnapshot
//! - AnalyticsError

pub mod option;
pub mod quote;
pub mod greeks;
pub mod error;

pub use option::*;
pub use quote::*;
pub use greeks::*;
pub use error::*;
