//! Error types for option analytics

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Implied volatility did not converge after {iterations} iterations: {reason}")]
    ConvergenceFailure {
        reason: String,
        iterations: usize,
        /// Last (clamped) iterate, for diagnostics only
        last_estimate: Option<f64>,
    },

    #[error("Upstream data unavailable: {0}")]
    UpstreamDataUnavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

impl AnalyticsError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn convergence(reason: impl Into<String>, iterations: usize, last_estimate: Option<f64>) -> Self {
        Self::ConvergenceFailure {
            reason: reason.into(),
            iterations,
            last_estimate,
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::UpstreamDataUnavailable(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for failures caused by bad caller input rather than by data or numerics
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter(_))
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
