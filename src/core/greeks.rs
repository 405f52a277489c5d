//! Option Greeks
//!
//! First, second and third order sensitivities for options.

use serde::{Deserialize, Serialize};

/// Option Greeks (sensitivities)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// Delta: dV/dS (sensitivity to spot)
    pub delta: f64,
    /// Gamma: d²V/dS² (sensitivity of delta to spot)
    pub gamma: f64,
    /// Theta: dV/dt, per calendar day
    pub theta: f64,
    /// Vega: dV/dσ per 1 vol point
    pub vega: f64,
    /// Rho: dV/dr per 1 rate point
    pub rho: f64,
    /// Vanna: d²V/dSdσ (sensitivity of delta to vol)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vanna: Option<f64>,
    /// Vomma/Volga: d²V/dσ² (sensitivity of vega to vol)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vomma: Option<f64>,
}

impl Greeks {
    pub fn new(delta: f64, gamma: f64, theta: f64, vega: f64, rho: f64) -> Self {
        Self {
            delta,
            gamma,
            theta,
            vega,
            rho,
            vanna: None,
            vomma: None,
        }
    }

    /// Scale Greeks by a factor (e.g. signed position quantity)
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            theta: self.theta * factor,
            vega: self.vega * factor,
            rho: self.rho * factor,
            vanna: self.vanna.map(|v| v * factor),
            vomma: self.vomma.map(|v| v * factor),
        }
    }

    /// Add two Greeks (for portfolio)
    pub fn add(&self, other: &Greeks) -> Self {
        Self {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            theta: self.theta + other.theta,
            vega: self.vega + other.vega,
            rho: self.rho + other.rho,
            vanna: merge_optional(self.vanna, other.vanna),
            vomma: merge_optional(self.vomma, other.vomma),
        }
    }

    /// First-order Greeks only, higher orders dropped
    pub fn first_order(&self) -> Self {
        Self::new(self.delta, self.gamma, self.theta, self.vega, self.rho)
    }
}

fn merge_optional(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) | (None, Some(a)) => Some(a),
        _ => None,
    }
}
