//! Crowd-level prediction over the injected model.
//!
//! Normalizes the model's declared output shape into a calibrated
//! 0-100 crowd level and proposes less crowded alternative times.

use std::fmt;

use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::debug;

use crate::features::{FeatureError, FeatureVectorBuilder, PredictionContext};
use crate::traits::{CrowdModel, ModelError, ModelOutput};
use crate::weather::WeatherSample;

/// Confidence tier derived from the normalized probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    fn from_probability(probability: f64) -> Self {
        if probability >= 0.75 {
            Confidence::High
        } else if probability >= 0.50 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// A normalized crowd prediction for one place and moment.
#[derive(Debug, Clone)]
pub struct CrowdForecast {
    pub place: String,
    pub when: NaiveDateTime,
    /// Expected busyness, 0-100.
    pub crowd_level: u8,
    pub probability: f64,
    pub confidence: Confidence,
    /// Human-readable alternative time suggestions.
    pub alternatives: Vec<String>,
    pub context: PredictionContext,
}

/// Prediction failure. Fatal for the requested moment; alternative-time
/// probes swallow their own failures.
#[derive(Debug)]
pub enum PredictionError {
    Feature(FeatureError),
    Model(ModelError),
    /// The model produced NaN or infinity.
    NonFinite(f64),
}

impl From<FeatureError> for PredictionError {
    fn from(err: FeatureError) -> Self {
        PredictionError::Feature(err)
    }
}

impl From<ModelError> for PredictionError {
    fn from(err: ModelError) -> Self {
        PredictionError::Model(err)
    }
}

impl fmt::Display for PredictionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionError::Feature(err) => write!(f, "{err}"),
            PredictionError::Model(err) => write!(f, "{err}"),
            PredictionError::NonFinite(value) => {
                write!(f, "model produced a non-finite value: {value}")
            }
        }
    }
}

impl std::error::Error for PredictionError {}

/// Maximum number of alternative-time suggestions kept.
const MAX_ALTERNATIVES: usize = 4;

/// Hour shifts probed for better times, in presentation order.
const ALTERNATIVE_SHIFTS: [i64; 4] = [-2, -1, 1, 2];

/// Wraps the injected crowd model behind a calibrated interface.
pub struct CrowdLevelPredictor {
    builder: FeatureVectorBuilder,
    model: Box<dyn CrowdModel>,
}

impl CrowdLevelPredictor {
    pub fn new(builder: FeatureVectorBuilder, model: Box<dyn CrowdModel>) -> Self {
        Self { builder, model }
    }

    pub fn builder(&self) -> &FeatureVectorBuilder {
        &self.builder
    }

    /// Predict the crowd level for a visit.
    ///
    /// Alternatives reuse the provided weather sample; a failed probe
    /// skips that hour rather than failing the prediction.
    pub fn predict(
        &self,
        place_key: &str,
        when: NaiveDateTime,
        weather: WeatherSample,
    ) -> Result<CrowdForecast, PredictionError> {
        let (crowd_level, probability) = self.level_at(place_key, when, weather)?;
        let context = self.builder.context(place_key, when, Some(when.hour()), weather)?;

        let mut alternatives = Vec::new();
        for shift in ALTERNATIVE_SHIFTS {
            if alternatives.len() >= MAX_ALTERNATIVES {
                break;
            }
            let alt_time = when + Duration::hours(shift);
            match self.level_at(place_key, alt_time, weather) {
                Ok((alt_level, _)) if alt_level < crowd_level => {
                    alternatives.push(format!(
                        "{} (~{alt_level}% crowd)",
                        alt_time.format("%I:%M %p")
                    ));
                }
                Ok(_) => {}
                Err(err) => {
                    debug!("skipping alternative at {alt_time}: {err}");
                }
            }
        }

        if alternatives.is_empty() {
            alternatives.push(if crowd_level > 40 {
                "Visit earlier in the morning or later in the evening".to_string()
            } else {
                "No better times found".to_string()
            });
        }

        Ok(CrowdForecast {
            place: context.place.clone(),
            when,
            crowd_level,
            probability,
            confidence: Confidence::from_probability(probability),
            alternatives,
            context,
        })
    }

    fn level_at(
        &self,
        place_key: &str,
        when: NaiveDateTime,
        weather: WeatherSample,
    ) -> Result<(u8, f64), PredictionError> {
        let vector = self
            .builder
            .build(place_key, when, Some(when.hour()), weather)?;
        normalize(self.model.predict(&vector)?)
    }
}

/// Normalize a model output into (crowd level 0-100, probability 0-1).
///
/// Probabilities are used directly; margins go through a logistic
/// transform; raw scores are classified by range: [0, 1] is a
/// probability, (1, 100] is already a percentage, anything else is
/// clamped into [0, 100].
fn normalize(output: ModelOutput) -> Result<(u8, f64), PredictionError> {
    let (level, probability) = match output {
        ModelOutput::Probability(p) => {
            if !p.is_finite() {
                return Err(PredictionError::NonFinite(p));
            }
            let p = p.clamp(0.0, 1.0);
            ((p * 100.0).round(), p)
        }
        ModelOutput::Margin(margin) => {
            if !margin.is_finite() {
                return Err(PredictionError::NonFinite(margin));
            }
            let p = 1.0 / (1.0 + (-margin).exp());
            ((p * 100.0).round(), p)
        }
        ModelOutput::Score(score) => {
            if !score.is_finite() {
                return Err(PredictionError::NonFinite(score));
            }
            if (0.0..=1.0).contains(&score) {
                ((score * 100.0).round(), score)
            } else if score > 1.0 && score <= 100.0 {
                let level = score.round();
                (level, level / 100.0)
            } else {
                let level = score.round().clamp(0.0, 100.0);
                (level, level / 100.0)
            }
        }
    };
    Ok((level as u8, probability))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PlaceCatalog;
    use crate::features::FeatureVectorBuilder;
    use std::sync::Arc;

    /// Model returning a fixed output regardless of features.
    struct FixedModel(ModelOutput);

    impl CrowdModel for FixedModel {
        fn predict(&self, _features: &[f64]) -> Result<ModelOutput, ModelError> {
            Ok(self.0)
        }
    }

    /// Model keyed on the hour field so alternatives differ.
    struct HourModel;

    impl CrowdModel for HourModel {
        fn predict(&self, features: &[f64]) -> Result<ModelOutput, ModelError> {
            // Quietest at opening, busiest at close.
            Ok(ModelOutput::Score(features[0] * 5.0))
        }
    }

    struct BrokenModel;

    impl CrowdModel for BrokenModel {
        fn predict(&self, _features: &[f64]) -> Result<ModelOutput, ModelError> {
            Err(ModelError::new("weights not loaded"))
        }
    }

    fn predictor(model: Box<dyn CrowdModel>) -> CrowdLevelPredictor {
        let builder = FeatureVectorBuilder::new(Arc::new(PlaceCatalog::rourkela()));
        CrowdLevelPredictor::new(builder, model)
    }

    fn when(h: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 3, 12)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn mild() -> WeatherSample {
        WeatherSample {
            temperature_c: 24.0,
            rain: false,
        }
    }

    #[test]
    fn test_probability_used_directly() {
        let (level, p) = normalize(ModelOutput::Probability(0.62)).unwrap();
        assert_eq!(level, 62);
        assert!((p - 0.62).abs() < 1e-9);
    }

    #[test]
    fn test_probability_clamped() {
        let (level, p) = normalize(ModelOutput::Probability(1.7)).unwrap();
        assert_eq!(level, 100);
        assert!((p - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_margin_through_logistic() {
        let (level, p) = normalize(ModelOutput::Margin(0.0)).unwrap();
        assert_eq!(level, 50);
        assert!((p - 0.5).abs() < 1e-9);
        let (high, _) = normalize(ModelOutput::Margin(4.0)).unwrap();
        assert!(high > 90);
    }

    #[test]
    fn test_score_ranges() {
        // Unit interval reads as a probability.
        assert_eq!(normalize(ModelOutput::Score(0.3)).unwrap().0, 30);
        // (1, 100] reads as an existing percentage.
        assert_eq!(normalize(ModelOutput::Score(73.0)).unwrap().0, 73);
        // Out of range clamps.
        assert_eq!(normalize(ModelOutput::Score(250.0)).unwrap().0, 100);
        assert_eq!(normalize(ModelOutput::Score(-3.0)).unwrap().0, 0);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(matches!(
            normalize(ModelOutput::Score(f64::NAN)),
            Err(PredictionError::NonFinite(_))
        ));
    }

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(Confidence::from_probability(0.80), Confidence::High);
        assert_eq!(Confidence::from_probability(0.75), Confidence::High);
        assert_eq!(Confidence::from_probability(0.60), Confidence::Medium);
        assert_eq!(Confidence::from_probability(0.20), Confidence::Low);
    }

    #[test]
    fn test_alternatives_strictly_lower_only() {
        // Crowd grows with the hour, so only earlier hours qualify.
        let predictor = predictor(Box::new(HourModel));
        let forecast = predictor.predict("Hanuman Vatika", when(12), mild()).unwrap();
        assert_eq!(forecast.crowd_level, 60);
        assert_eq!(forecast.alternatives.len(), 2);
        assert!(forecast.alternatives[0].starts_with("10:00 AM"));
        assert!(forecast.alternatives[1].starts_with("11:00 AM"));
    }

    #[test]
    fn test_no_better_times_hint_when_quiet() {
        let predictor = predictor(Box::new(FixedModel(ModelOutput::Probability(0.2))));
        let forecast = predictor.predict("Hanuman Vatika", when(12), mild()).unwrap();
        assert_eq!(forecast.alternatives, vec!["No better times found".to_string()]);
    }

    #[test]
    fn test_generic_hint_when_busy() {
        let predictor = predictor(Box::new(FixedModel(ModelOutput::Probability(0.9))));
        let forecast = predictor.predict("Hanuman Vatika", when(12), mild()).unwrap();
        assert_eq!(
            forecast.alternatives,
            vec!["Visit earlier in the morning or later in the evening".to_string()]
        );
        assert_eq!(forecast.confidence, Confidence::High);
    }

    #[test]
    fn test_base_failure_is_fatal() {
        let predictor = predictor(Box::new(BrokenModel));
        let err = predictor.predict("Hanuman Vatika", when(12), mild()).unwrap_err();
        assert!(matches!(err, PredictionError::Model(_)));
    }

    #[test]
    fn test_unknown_place_surfaces() {
        let predictor = predictor(Box::new(FixedModel(ModelOutput::Probability(0.5))));
        let err = predictor.predict("Nowhere", when(12), mild()).unwrap_err();
        assert!(matches!(
            err,
            PredictionError::Feature(FeatureError::UnknownPlace(_))
        ));
    }
}
