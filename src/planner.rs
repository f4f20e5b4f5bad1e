//! Day-plan assembly: the end-to-end itinerary pipeline.
//!
//! Candidate discovery, scoring, greedy selection, and route ordering
//! run synchronously to completion for each request; the only blocking
//! boundaries are the injected model and the weather service, both of
//! which are bounded and degrade rather than abort.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::catalog::{clamp_hour, PlaceCatalog};
use crate::features::FeatureVectorBuilder;
use crate::geo::{GeoCandidateFinder, HaversineTravel, NearbyPlace};
use crate::predictor::{CrowdForecast, CrowdLevelPredictor, PredictionError};
use crate::route::order_stops;
use crate::selector::{select, CandidateVisit};
use crate::traits::{CrowdModel, TravelTimeProvider};
use crate::weather::{DayOutlook, WeatherService};

/// Tunable pipeline parameters.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub radius_km: f64,
    /// Minimum minutes a visitor spends at a stop.
    pub dwell_minutes: i64,
    pub travel_speed_kmh: f64,
    pub max_stops: usize,
    /// Operating-hour window for candidate slots; clamped to [7, 20].
    pub start_hour: u32,
    pub end_hour: u32,
    /// Best slots kept per place before selection.
    pub top_slots_per_place: usize,
    pub nearby_limit: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            radius_km: 6.0,
            dwell_minutes: 60,
            travel_speed_kmh: 20.0,
            max_stops: 4,
            start_hour: 8,
            end_hour: 20,
            top_slots_per_place: 2,
            nearby_limit: 24,
        }
    }
}

/// One itinerary request.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub lat: f64,
    pub lng: f64,
    pub date: NaiveDate,
    /// Overrides of the planner defaults, when present.
    pub radius_km: Option<f64>,
    pub max_stops: Option<usize>,
    pub hours: Option<(u32, u32)>,
}

impl PlanRequest {
    pub fn new(lat: f64, lng: f64, date: NaiveDate) -> Self {
        Self {
            lat,
            lng,
            date,
            radius_km: None,
            max_stops: None,
            hours: None,
        }
    }
}

/// One stop of the final schedule.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleStop {
    pub order: usize,
    /// Clock time, e.g. "09:00 AM".
    pub time: String,
    pub place: String,
    pub crowd_level: u8,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_minutes_from_prev: Option<i64>,
}

/// The planned day.
#[derive(Debug, Clone, Serialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub center: (f64, f64),
    pub weather_summary: String,
    pub schedule: Vec<ScheduleStop>,
    pub nearby_places: Vec<NearbyPlace>,
}

/// Request rejection before the pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    InvalidInput(String),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::InvalidInput(reason) => write!(f, "invalid request: {reason}"),
        }
    }
}

impl std::error::Error for PlanError {}

/// End-to-end day planner.
///
/// Holds the immutable catalog and encoder tables; every request uses
/// its own working state, so a planner is safe to share.
pub struct DayPlanner {
    catalog: Arc<PlaceCatalog>,
    finder: GeoCandidateFinder,
    predictor: CrowdLevelPredictor,
    travel: HaversineTravel,
    weather: WeatherService,
    config: PlannerConfig,
}

impl DayPlanner {
    pub fn new(
        catalog: Arc<PlaceCatalog>,
        model: Box<dyn CrowdModel>,
        weather: WeatherService,
        config: PlannerConfig,
    ) -> Self {
        let builder = FeatureVectorBuilder::new(Arc::clone(&catalog));
        let predictor = CrowdLevelPredictor::new(builder, model);
        let finder = GeoCandidateFinder::new(Arc::clone(&catalog));
        let travel = HaversineTravel::new(Arc::clone(&catalog), config.travel_speed_kmh);

        Self {
            catalog,
            finder,
            predictor,
            travel,
            weather,
            config,
        }
    }

    /// Build a one-day itinerary around the requested center.
    ///
    /// A request that cannot produce any feasible stop returns an empty
    /// schedule with the weather summary, not an error; only malformed
    /// input is rejected.
    pub fn plan_day(&self, request: &PlanRequest) -> Result<DayPlan, PlanError> {
        validate_coords(request.lat, request.lng)?;

        let radius_km = request.radius_km.unwrap_or(self.config.radius_km);
        let max_stops = request.max_stops.unwrap_or(self.config.max_stops);
        let (start_hour, end_hour) = request
            .hours
            .unwrap_or((self.config.start_hour, self.config.end_hour));
        let start_hour = clamp_hour(start_hour);
        let end_hour = clamp_hour(end_hour);

        let outlook = self
            .weather
            .day_outlook(request.lat, request.lng, request.date);

        let nearby = self.finder.find_nearby(
            request.lat,
            request.lng,
            radius_km,
            self.config.nearby_limit,
        );

        let mut candidates: Vec<CandidateVisit> = Vec::new();
        for place in &nearby {
            match self.place_slots(&place.title, &outlook, start_hour, end_hour) {
                Ok(slots) => candidates.extend(slots),
                Err(err) => {
                    debug!("dropping '{}' from candidates: {err}", place.title);
                }
            }
        }

        // Candidate generation order: ascending time, best score first
        // within an hour. Selection re-ranks by score; this fixes the
        // tie-break.
        candidates.sort_by(|a, b| a.when.cmp(&b.when).then(b.score.cmp(&a.score)));

        let chosen = select(
            &candidates,
            self.config.dwell_minutes,
            &self.travel,
            max_stops,
        );

        let schedule = self.assemble_schedule(chosen, (request.lat, request.lng));

        Ok(DayPlan {
            date: request.date,
            center: (request.lat, request.lng),
            weather_summary: outlook.summary.clone(),
            schedule,
            nearby_places: nearby,
        })
    }

    /// Best time slots for one place across the operating window.
    ///
    /// A prediction failure drops the whole place; the caller skips it
    /// without failing the batch.
    fn place_slots(
        &self,
        title: &str,
        outlook: &DayOutlook,
        start_hour: u32,
        end_hour: u32,
    ) -> Result<Vec<CandidateVisit>, PredictionError> {
        let mut slots: Vec<CandidateVisit> = Vec::new();
        for hour in start_hour..=end_hour {
            let Some(when) = outlook.date.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            let weather = outlook.sample_for_hour(hour);
            let forecast = self.predictor.predict(title, when, weather)?;
            slots.push(candidate_from_forecast(forecast));
        }

        // Keep the top slots; stable sort preserves earlier hours on ties.
        slots.sort_by_key(|slot| std::cmp::Reverse(slot.score));
        slots.truncate(self.config.top_slots_per_place);
        Ok(slots)
    }

    /// Order the chosen stops by proximity and annotate per-leg travel.
    ///
    /// Travel minutes are recomputed from the post-ordering adjacency;
    /// values from the selection phase are not reused.
    fn assemble_schedule(
        &self,
        mut chosen: Vec<CandidateVisit>,
        start: (f64, f64),
    ) -> Vec<ScheduleStop> {
        let keys: Vec<String> = chosen.iter().map(|c| c.place.clone()).collect();
        let ordered = order_stops(&self.catalog, &keys, Some(start));
        let rank = |title: &str| {
            ordered
                .iter()
                .position(|key| key == title)
                .unwrap_or(usize::MAX)
        };
        chosen.sort_by(|a, b| {
            rank(&a.place)
                .cmp(&rank(&b.place))
                .then(a.when.cmp(&b.when))
        });

        chosen
            .iter()
            .enumerate()
            .map(|(index, stop)| {
                let travel_minutes_from_prev = if index == 0 {
                    None
                } else {
                    self.travel
                        .minutes_between(&chosen[index - 1].place, &stop.place)
                };
                ScheduleStop {
                    order: index + 1,
                    time: stop.when.format("%I:%M %p").to_string(),
                    place: stop.place.clone(),
                    crowd_level: stop.crowd_level,
                    note: if stop.reasons.is_empty() {
                        "Good trade-off".to_string()
                    } else {
                        stop.reasons.join(", ")
                    },
                    travel_minutes_from_prev,
                }
            })
            .collect()
    }
}

fn candidate_from_forecast(forecast: CrowdForecast) -> CandidateVisit {
    let mut reasons = Vec::new();
    match forecast.context.holiday {
        "Not a holiday" => {}
        "Weekend" => reasons.push("Weekend crowds".to_string()),
        name => reasons.push(format!("{name} holiday")),
    }
    if forecast.context.rain_expected {
        reasons.push("Rain may thin crowds".to_string());
    }
    if forecast.crowd_level <= 35 {
        reasons.push("Quiet hour expected".to_string());
    } else if forecast.crowd_level >= 70 {
        reasons.push("Usually busy at this time".to_string());
    }

    CandidateVisit {
        place: forecast.place,
        when: forecast.when,
        crowd_level: forecast.crowd_level,
        score: 100 - forecast.crowd_level as i32,
        reasons,
    }
}

fn validate_coords(lat: f64, lng: f64) -> Result<(), PlanError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(PlanError::InvalidInput(format!(
            "latitude {lat} out of range"
        )));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(PlanError::InvalidInput(format!(
            "longitude {lng} out of range"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_coords() {
        assert!(validate_coords(22.2396, 84.8633).is_ok());
        assert!(validate_coords(91.0, 84.8).is_err());
        assert!(validate_coords(22.2, -181.0).is_err());
        assert!(validate_coords(f64::NAN, 84.8).is_err());
    }

    #[test]
    fn test_reason_tags() {
        use crate::features::PredictionContext;
        use crate::predictor::Confidence;

        let when = NaiveDate::from_ymd_opt(2025, 1, 26)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        let forecast = CrowdForecast {
            place: "Hanuman Vatika".to_string(),
            when,
            crowd_level: 80,
            probability: 0.8,
            confidence: Confidence::High,
            alternatives: Vec::new(),
            context: PredictionContext {
                place: "Hanuman Vatika".to_string(),
                category: "temple",
                date: when.date(),
                hour: 18,
                weekday: "Sunday",
                season: "winter2",
                holiday: "Republic Day",
                temperature_c: 21.0,
                rain_expected: false,
            },
        };
        let candidate = candidate_from_forecast(forecast);
        assert_eq!(candidate.score, 20);
        assert!(candidate
            .reasons
            .contains(&"Republic Day holiday".to_string()));
        assert!(candidate
            .reasons
            .contains(&"Usually busy at this time".to_string()));
    }
}
