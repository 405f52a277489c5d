//! Pricing models
//!
//! - Black-Scholes: European pricing and analytic Greeks
//! - Implied volatility: Newton-Raphson inversion of Black-Scholes
//! - Volatility inputs: unit normalization and historical estimates

pub mod black_scholes;
pub mod implied_vol;
pub mod volatility;

pub use black_scholes::*;
pub use implied_vol::*;
pub use volatility::*;
