//! Stub crowd models with predictable behavior.
//!
//! The feature vector layout these rely on: index 0 is the hour,
//! index 1 the place code.

use tour_planner::traits::{CrowdModel, ModelError, ModelOutput};

/// Center of the built-in Rourkela catalog.
pub const ROURKELA_CENTER: (f64, f64) = (22.2396, 84.8633);

/// Always returns the same output, whatever the features.
pub struct FixedModel(pub ModelOutput);

impl CrowdModel for FixedModel {
    fn predict(&self, _features: &[f64]) -> Result<ModelOutput, ModelError> {
        Ok(self.0)
    }
}

/// Crowd grows linearly with the hour: quiet mornings, busy evenings.
pub struct HourRampModel;

impl CrowdModel for HourRampModel {
    fn predict(&self, features: &[f64]) -> Result<ModelOutput, ModelError> {
        Ok(ModelOutput::Score(features[0] * 5.0))
    }
}

/// Fails every prediction.
pub struct FailingModel;

impl CrowdModel for FailingModel {
    fn predict(&self, _features: &[f64]) -> Result<ModelOutput, ModelError> {
        Err(ModelError::new("model unavailable"))
    }
}

/// Scores specific (place code, hour) pairs low and everything else
/// high; used to force a known selection.
pub struct SlotModel {
    /// (place code, hour, crowd level) triples.
    pub quiet_slots: Vec<(f64, f64, f64)>,
}

impl CrowdModel for SlotModel {
    fn predict(&self, features: &[f64]) -> Result<ModelOutput, ModelError> {
        let hour = features[0];
        let place_code = features[1];
        for &(code, slot_hour, level) in &self.quiet_slots {
            if place_code == code && hour == slot_hour {
                return Ok(ModelOutput::Score(level));
            }
        }
        Ok(ModelOutput::Score(100.0))
    }
}
