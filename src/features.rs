//! Feature-vector construction for the crowd model.
//!
//! The model consumes a fixed-length numeric vector whose field order
//! never varies; see [`FeatureVectorBuilder::build`] for the layout.
//! Categorical fields are encoded through stable integer codes fixed
//! at builder construction.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::calendar::{holiday_labels, CalendarContext, SEASON_BUCKETS, WEEKDAY_NAMES};
use crate::catalog::{clamp_hour, CatalogError, Category, PlaceCatalog};
use crate::weather::WeatherSample;

/// Number of fields in the feature vector. Part of the model contract.
pub const FEATURE_VECTOR_LEN: usize = 18;

/// The feature vector handed to the crowd model.
pub type FeatureVector = [f64; FEATURE_VECTOR_LEN];

/// Assigns stable integer codes to a fixed universe of string values.
///
/// Codes follow the alphabetical order of the universe, so they are
/// reproducible across runs given the same inputs and never renumber
/// for the lifetime of the encoder.
#[derive(Debug, Clone)]
pub struct StableEncoder {
    codes: HashMap<String, u32>,
}

impl StableEncoder {
    pub fn fit<I, S>(universe: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values: Vec<String> = universe.into_iter().map(Into::into).collect();
        values.sort();
        values.dedup();

        let codes = values
            .into_iter()
            .enumerate()
            .map(|(code, value)| (value, code as u32))
            .collect();
        Self { codes }
    }

    pub fn code(&self, value: &str) -> Option<u32> {
        self.codes.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Feature construction failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureError {
    UnknownPlace(String),
    /// Hour outside the operating window reached a curve lookup.
    /// Callers clamp before lookup; this is a contract violation.
    HourOutsideCurve(u32),
    /// A categorical value missing from its encoder universe.
    Unencodable(&'static str, String),
}

impl From<CatalogError> for FeatureError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownPlace(key) => FeatureError::UnknownPlace(key),
        }
    }
}

impl fmt::Display for FeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureError::UnknownPlace(key) => write!(f, "place '{key}' not found in catalog"),
            FeatureError::HourOutsideCurve(hour) => {
                write!(f, "hour {hour} is outside the operating window")
            }
            FeatureError::Unencodable(field, value) => {
                write!(f, "value '{value}' has no {field} code")
            }
        }
    }
}

impl std::error::Error for FeatureError {}

/// Human-readable companion to a feature vector, used for candidate
/// reason tags and explanations.
#[derive(Debug, Clone)]
pub struct PredictionContext {
    pub place: String,
    pub category: &'static str,
    pub date: NaiveDate,
    pub hour: u32,
    pub weekday: &'static str,
    pub season: &'static str,
    pub holiday: &'static str,
    pub temperature_c: f64,
    pub rain_expected: bool,
}

/// Builds the fixed-order feature vector for (place, time, weather).
///
/// Pure given its inputs: no hidden counters, no weather acquisition.
/// Encoder tables are fixed at construction and safe for concurrent
/// read-only use.
#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    catalog: Arc<PlaceCatalog>,
    places: StableEncoder,
    categories: StableEncoder,
    weekdays: StableEncoder,
    holidays: StableEncoder,
    seasons: StableEncoder,
}

impl FeatureVectorBuilder {
    pub fn new(catalog: Arc<PlaceCatalog>) -> Self {
        let places = StableEncoder::fit(catalog.places().iter().map(|p| p.title.clone()));
        let categories = StableEncoder::fit(Category::ALL.iter().map(|c| c.key()));
        let weekdays = StableEncoder::fit(WEEKDAY_NAMES);
        let holidays = StableEncoder::fit(holiday_labels());
        let seasons = StableEncoder::fit(SEASON_BUCKETS);

        Self {
            catalog,
            places,
            categories,
            weekdays,
            holidays,
            seasons,
        }
    }

    /// Build the feature vector for a place at a moment.
    ///
    /// `target_hour` overrides the hour of `at`; either way the hour is
    /// clamped into the operating window before any curve lookup.
    ///
    /// Field order, fixed forever:
    /// hour, place, category, weekday, month, holiday label,
    /// temperature, rain flag, category base, place factor, base
    /// factor, weekday factor, month factor, hourly multiplier,
    /// holiday multiplier, weather multiplier, long-term trend, season.
    pub fn build(
        &self,
        place_key: &str,
        at: NaiveDateTime,
        target_hour: Option<u32>,
        weather: WeatherSample,
    ) -> Result<FeatureVector, FeatureError> {
        let place = self.catalog.resolve(place_key)?;
        let hour = clamp_hour(target_hour.unwrap_or_else(|| at.hour()));
        let calendar = CalendarContext::for_date(at.date());

        let category = place.category;
        let base_weight = category.base_weight();
        let base_factor = round3(base_weight * place.place_factor);

        let hourly_multiplier = category
            .hour_multiplier(hour)
            .ok_or(FeatureError::HourOutsideCurve(hour))?;
        let holiday_multiplier = calendar.holiday.multiplier(category);
        let weather_multiplier = weather_multiplier(&weather, category, hour);

        let place_code = self.encode(&self.places, "place", &place.title)?;
        let category_code = self.encode(&self.categories, "category", category.key())?;
        let weekday_code = self.encode(&self.weekdays, "weekday", calendar.weekday_name())?;
        let holiday_code = self.encode(&self.holidays, "holiday", calendar.holiday.label())?;
        let season_code = self.encode(&self.seasons, "season", calendar.season)?;

        Ok([
            hour as f64,
            place_code,
            category_code,
            weekday_code,
            calendar.month as f64,
            holiday_code,
            round1(weather.temperature_c),
            if weather.rain { 1.0 } else { 0.0 },
            base_weight,
            place.place_factor,
            base_factor,
            calendar.weekday_factor(),
            calendar.month_factor(),
            hourly_multiplier,
            holiday_multiplier,
            weather_multiplier,
            round3(calendar.long_term_trend()),
            season_code,
        ])
    }

    /// The human-readable context matching a `build` call.
    pub fn context(
        &self,
        place_key: &str,
        at: NaiveDateTime,
        target_hour: Option<u32>,
        weather: WeatherSample,
    ) -> Result<PredictionContext, FeatureError> {
        let place = self.catalog.resolve(place_key)?;
        let hour = clamp_hour(target_hour.unwrap_or_else(|| at.hour()));
        let calendar = CalendarContext::for_date(at.date());

        Ok(PredictionContext {
            place: place.title.clone(),
            category: place.category.key(),
            date: at.date(),
            hour,
            weekday: calendar.weekday_name(),
            season: calendar.season,
            holiday: calendar.holiday.label(),
            temperature_c: round1(weather.temperature_c),
            rain_expected: weather.rain,
        })
    }

    fn encode(
        &self,
        encoder: &StableEncoder,
        field: &'static str,
        value: &str,
    ) -> Result<f64, FeatureError> {
        encoder
            .code(value)
            .map(|code| code as f64)
            .ok_or_else(|| FeatureError::Unencodable(field, value.to_string()))
    }
}

/// Heat and rain discounts for open-air categories. Multiplicative.
fn weather_multiplier(weather: &WeatherSample, category: Category, hour: u32) -> f64 {
    let mut multiplier = 1.0;
    if weather.temperature_c > 38.0 && (12..=16).contains(&hour) && category.is_outdoor() {
        multiplier *= 0.88;
    }
    if weather.rain && category.is_outdoor() {
        multiplier *= 0.70;
    }
    multiplier
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> FeatureVectorBuilder {
        FeatureVectorBuilder::new(Arc::new(PlaceCatalog::rourkela()))
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
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
    fn test_vector_has_fixed_length_for_all_hours() {
        let builder = builder();
        for hour in 7..=20 {
            let vector = builder
                .build("Hanuman Vatika", at(2025, 3, 10, 9), Some(hour), mild())
                .unwrap();
            assert_eq!(vector.len(), FEATURE_VECTOR_LEN);
            assert_eq!(vector[0], hour as f64);
        }
    }

    #[test]
    fn test_build_is_idempotent() {
        let builder = builder();
        let first = builder
            .build("Mandira Dam", at(2025, 5, 30, 7), Some(18), mild())
            .unwrap();
        let second = builder
            .build("Mandira Dam", at(2025, 5, 30, 7), Some(18), mild())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_place_fails() {
        let err = builder()
            .build("Shangri-La", at(2025, 3, 10, 9), None, mild())
            .unwrap_err();
        assert_eq!(err, FeatureError::UnknownPlace("Shangri-La".to_string()));
    }

    #[test]
    fn test_hour_derived_and_clamped() {
        let builder = builder();
        // Hour taken from the datetime when not supplied.
        let derived = builder
            .build("Hanuman Vatika", at(2025, 3, 10, 9), None, mild())
            .unwrap();
        assert_eq!(derived[0], 9.0);
        // Early and late hours clamp into the operating window.
        let early = builder
            .build("Hanuman Vatika", at(2025, 3, 10, 4), None, mild())
            .unwrap();
        assert_eq!(early[0], 7.0);
        let late = builder
            .build("Hanuman Vatika", at(2025, 3, 10, 9), Some(23), mild())
            .unwrap();
        assert_eq!(late[0], 20.0);
    }

    #[test]
    fn test_republic_day_scenario() {
        // Hanuman Vatika (temple, base 0.80, factor 1.20) on 2025-01-26
        // at hour 18: base_factor 0.96, hourly multiplier 1.00, holiday
        // multiplier 1.12 (religious column of the Republic Day entry).
        let vector = builder()
            .build("Hanuman Vatika", at(2025, 1, 26, 7), Some(18), mild())
            .unwrap();
        assert_eq!(vector.len(), 18);
        assert_eq!(vector[0], 18.0);
        assert_eq!(vector[4], 1.0); // month
        assert!((vector[8] - 0.80).abs() < 1e-9); // category base
        assert!((vector[9] - 1.20).abs() < 1e-9); // place factor
        assert!((vector[10] - 0.96).abs() < 1e-9); // base factor
        assert!((vector[11] - 1.32).abs() < 1e-9); // Sunday weekday factor
        assert!((vector[13] - 1.00).abs() < 1e-9); // temple curve at 18
        assert!((vector[14] - 1.12).abs() < 1e-9); // holiday multiplier
    }

    #[test]
    fn test_weather_multiplier_composes() {
        let hot = WeatherSample {
            temperature_c: 40.0,
            rain: false,
        };
        let hot_and_wet = WeatherSample {
            temperature_c: 40.0,
            rain: true,
        };

        assert!((weather_multiplier(&hot, Category::LakeDam, 14) - 0.88).abs() < 1e-9);
        assert!(
            (weather_multiplier(&hot_and_wet, Category::LakeDam, 14) - 0.88 * 0.70).abs() < 1e-9
        );
        // Heat discount only applies in the midday band.
        assert!((weather_multiplier(&hot, Category::LakeDam, 9) - 1.0).abs() < 1e-9);
        // Temples are not outdoor; no discounts.
        assert!((weather_multiplier(&hot_and_wet, Category::Temple, 14) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rain_flag_encoded() {
        let builder = builder();
        let wet = WeatherSample {
            temperature_c: 24.0,
            rain: true,
        };
        let vector = builder
            .build("Sitakund Waterfall", at(2025, 3, 10, 9), Some(10), wet)
            .unwrap();
        assert_eq!(vector[7], 1.0);
        assert!((vector[15] - 0.70).abs() < 1e-9);
    }

    #[test]
    fn test_stable_encoder_alphabetical() {
        let encoder = StableEncoder::fit(["banana", "apple", "cherry", "apple"]);
        assert_eq!(encoder.len(), 3);
        assert_eq!(encoder.code("apple"), Some(0));
        assert_eq!(encoder.code("banana"), Some(1));
        assert_eq!(encoder.code("cherry"), Some(2));
        assert_eq!(encoder.code("durian"), None);
    }

    #[test]
    fn test_codes_stable_across_builders() {
        let first = builder();
        let second = builder();
        let a = first
            .build("Koel Riverbank", at(2025, 6, 2, 11), None, mild())
            .unwrap();
        let b = second
            .build("Koel Riverbank", at(2025, 6, 2, 11), None, mild())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_lookup_by_id_matches_title() {
        let builder = builder();
        let by_id = builder
            .build("religious_1", at(2025, 3, 10, 9), None, mild())
            .unwrap();
        let by_title = builder
            .build("Hanuman Vatika", at(2025, 3, 10, 9), None, mild())
            .unwrap();
        assert_eq!(by_id, by_title);
    }

    #[test]
    fn test_context_fields() {
        let ctx = builder()
            .context("Hanuman Vatika", at(2025, 1, 26, 7), Some(18), mild())
            .unwrap();
        assert_eq!(ctx.place, "Hanuman Vatika");
        assert_eq!(ctx.category, "temple");
        assert_eq!(ctx.hour, 18);
        assert_eq!(ctx.weekday, "Sunday");
        assert_eq!(ctx.season, "winter2");
        assert_eq!(ctx.holiday, "Republic Day");
        assert!(!ctx.rain_expected);
    }
}
