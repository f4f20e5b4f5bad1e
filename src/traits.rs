//! Boundary traits for the itinerary planner.
//!
//! The crowd model and point-to-point travel estimation are external
//! concerns; these seams let concrete apps plug in their own.

use std::fmt;

/// Output of a crowd model, with its shape declared by the variant.
///
/// The model states what its number means; nothing downstream probes
/// capabilities at call time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelOutput {
    /// Class-membership probability, expected in [0, 1].
    Probability(f64),
    /// Decision margin, mapped through a logistic transform.
    Margin(f64),
    /// Raw score, interpreted by range (see `CrowdLevelPredictor`).
    Score(f64),
}

/// Failure raised by a crowd model invocation.
#[derive(Debug, Clone)]
pub struct ModelError {
    pub message: String,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crowd model failed: {}", self.message)
    }
}

impl std::error::Error for ModelError {}

/// A pretrained crowd model consumed as an opaque scoring function.
///
/// Input is the fixed-length feature vector produced by
/// `FeatureVectorBuilder`; field order is part of the contract.
pub trait CrowdModel: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<ModelOutput, ModelError>;
}

/// Provides point-to-point travel time in whole minutes.
///
/// `None` means the travel time is unknown (for example, a place
/// without coordinates); callers decide how to degrade.
pub trait TravelTimeProvider {
    fn minutes_between(&self, from: &str, to: &str) -> Option<i64>;
}
