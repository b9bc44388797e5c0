//! Response bodies returned by the HTTP surface

use serde::{Deserialize, Serialize};

/// Class probabilities for the two-class problem, ordered `[no, yes]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    /// Probability the customer does not subscribe
    pub no: f64,
    /// Probability the customer subscribes
    pub yes: f64,
}

impl ClassProbabilities {
    /// Build from a raw `[no, yes]` pair, renormalizing so the pair sums to 1.
    ///
    /// Returns `None` when either value is negative or not finite, or when
    /// the pair sums to zero.
    pub fn from_pair(no: f64, yes: f64) -> Option<Self> {
        if !no.is_finite() || !yes.is_finite() || no < 0.0 || yes < 0.0 {
            return None;
        }
        let total = no + yes;
        if !total.is_finite() || total <= 0.0 {
            return None;
        }
        let yes = yes / total;
        Some(Self { no: 1.0 - yes, yes })
    }
}

/// Successful `/predict` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction_probability: ClassProbabilities,
    pub threshold_used: f64,
    pub description: String,
}

/// `GET /` status body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub api_version: String,
}
