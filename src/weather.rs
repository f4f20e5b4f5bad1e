//! Weather boundary: live forecast client and deterministic synthetic
//! fallback.
//!
//! The planner never sees a weather failure. `WeatherService` tries the
//! live provider when one is configured and silently substitutes the
//! synthetic seasonal model otherwise.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Deserialize;
use tracing::warn;

/// Point-in-time weather relevant to crowd prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherSample {
    pub temperature_c: f64,
    pub rain: bool,
}

/// One hour of a day's forecast.
#[derive(Debug, Clone)]
pub struct HourlyWeather {
    pub hour: u32,
    pub temperature_c: f64,
    pub precipitation_mm: f64,
    pub condition: String,
}

impl HourlyWeather {
    pub fn sample(&self) -> WeatherSample {
        WeatherSample {
            temperature_c: self.temperature_c,
            rain: self.precipitation_mm > 0.0 || is_rainy_condition(&self.condition),
        }
    }
}

/// Weather boundary failure. Internal to the weather service; always
/// resolved via the synthetic fallback.
#[derive(Debug)]
pub enum WeatherError {
    Http(reqwest::Error),
    MissingData(&'static str),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::Http(err)
    }
}

impl fmt::Display for WeatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherError::Http(err) => write!(f, "weather request failed: {err}"),
            WeatherError::MissingData(what) => write!(f, "weather payload missing {what}"),
        }
    }
}

impl std::error::Error for WeatherError {}

/// A live source of current conditions and hourly forecasts.
pub trait WeatherProvider: Send + Sync {
    fn current(&self, lat: f64, lng: f64) -> Result<WeatherSample, WeatherError>;

    fn day_forecast(
        &self,
        lat: f64,
        lng: f64,
        date: NaiveDate,
    ) -> Result<Vec<HourlyWeather>, WeatherError>;
}

const RAIN_TERMS: &[&str] = &[
    "rain",
    "drizzle",
    "shower",
    "thunderstorm",
    "storm",
    "precipitation",
    "wet",
    "pour",
];

fn is_rainy_condition(condition: &str) -> bool {
    let condition = condition.to_lowercase();
    RAIN_TERMS.iter().any(|term| condition.contains(term))
}

#[derive(Debug, Clone)]
pub struct WeatherApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// The weather call must not block a request indefinitely.
    pub timeout_secs: u64,
}

impl WeatherApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.weatherapi.com/v1".to_string(),
            api_key: api_key.into(),
            timeout_secs: 10,
        }
    }
}

/// HTTP client for the weatherapi.com current/forecast endpoints.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    config: WeatherApiConfig,
    client: reqwest::blocking::Client,
}

impl WeatherApiClient {
    pub fn new(config: WeatherApiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl WeatherProvider for WeatherApiClient {
    fn current(&self, lat: f64, lng: f64) -> Result<WeatherSample, WeatherError> {
        let url = format!(
            "{}/current.json?key={}&q={:.4},{:.4}&aqi=no",
            self.config.base_url, self.config.api_key, lat, lng
        );
        let body: CurrentResponse = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .json()?;

        let current = body.current.ok_or(WeatherError::MissingData("current"))?;
        Ok(WeatherSample {
            temperature_c: current.temp_c,
            rain: current.precip_mm.unwrap_or(0.0) > 0.0
                || is_rainy_condition(&current.condition.text),
        })
    }

    fn day_forecast(
        &self,
        lat: f64,
        lng: f64,
        date: NaiveDate,
    ) -> Result<Vec<HourlyWeather>, WeatherError> {
        let url = format!(
            "{}/forecast.json?key={}&q={:.4},{:.4}&days=1&aqi=no&alerts=no",
            self.config.base_url, self.config.api_key, lat, lng
        );
        let body: ForecastResponse = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .json()?;

        let hours: Vec<HourlyWeather> = body
            .forecast
            .forecastday
            .into_iter()
            .flat_map(|day| day.hour)
            .filter_map(|hour| {
                let at = chrono::DateTime::from_timestamp(hour.time_epoch, 0)?.naive_local();
                if at.date() != date {
                    return None;
                }
                Some(HourlyWeather {
                    hour: at.hour(),
                    temperature_c: hour.temp_c,
                    precipitation_mm: hour.precip_mm,
                    condition: hour.condition.text.to_lowercase(),
                })
            })
            .collect();

        if hours.is_empty() {
            return Err(WeatherError::MissingData("hourly forecast"));
        }
        Ok(hours)
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: Option<CurrentBlock>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temp_c: f64,
    precip_mm: Option<f64>,
    #[serde(default)]
    condition: ConditionBlock,
}

#[derive(Debug, Deserialize, Default)]
struct ConditionBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    forecast: ForecastBlock,
}

#[derive(Debug, Deserialize)]
struct ForecastBlock {
    #[serde(default)]
    forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
struct ForecastDay {
    #[serde(default)]
    hour: Vec<HourBlock>,
}

#[derive(Debug, Deserialize)]
struct HourBlock {
    time_epoch: i64,
    temp_c: f64,
    #[serde(default)]
    precip_mm: f64,
    #[serde(default)]
    condition: ConditionBlock,
}

// Seasonal base temperatures per month, January..December.
const MONTH_BASE_TEMP: [f64; 12] = [
    16.0, 19.0, 26.0, 32.0, 36.0, 32.0, 30.0, 29.0, 29.0, 27.0, 21.0, 17.0,
];

// Rain probability per month, January..December.
const MONTH_RAIN_PROB: [f64; 12] = [
    0.02, 0.03, 0.05, 0.08, 0.15, 0.35, 0.42, 0.40, 0.28, 0.12, 0.04, 0.02,
];

/// Deterministic seasonal weather model.
///
/// Used whenever no live provider is configured or the live call
/// fails. Equal (month, hour) inputs always produce equal samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticWeather;

impl SyntheticWeather {
    pub fn sample(month: u32, hour: u32) -> WeatherSample {
        let base = MONTH_BASE_TEMP[month.clamp(1, 12) as usize - 1];
        // Diurnal swing peaking mid-afternoon.
        let swing = -5.0 * ((hour as f64 - 14.0) / 12.0 * std::f64::consts::PI).cos();
        let temperature_c = (base + swing).clamp(5.0, 45.0);

        WeatherSample {
            temperature_c: (temperature_c * 10.0).round() / 10.0,
            rain: Self::rain_probability(month, hour) > 0.5,
        }
    }

    /// Month-conditioned rain probability with an afternoon monsoon boost.
    pub fn rain_probability(month: u32, hour: u32) -> f64 {
        let mut probability = MONTH_RAIN_PROB[month.clamp(1, 12) as usize - 1];
        if (14..=18).contains(&hour) && (6..=9).contains(&month) {
            probability *= 1.5;
        }
        probability
    }

    pub fn day_forecast(date: NaiveDate) -> Vec<HourlyWeather> {
        (0..24)
            .map(|hour| {
                let sample = Self::sample(date.month(), hour);
                HourlyWeather {
                    hour,
                    temperature_c: sample.temperature_c,
                    precipitation_mm: if sample.rain { 5.0 } else { 0.0 },
                    condition: if sample.rain {
                        "rainy".to_string()
                    } else {
                        "clear".to_string()
                    },
                }
            })
            .collect()
    }
}

/// A day's weather outlook used by the planner.
#[derive(Debug, Clone)]
pub struct DayOutlook {
    pub date: NaiveDate,
    pub summary: String,
    pub hourly: Vec<HourlyWeather>,
    pub source: &'static str,
}

impl DayOutlook {
    /// Sample for a specific hour, synthesizing one when the forecast
    /// has a gap.
    pub fn sample_for_hour(&self, hour: u32) -> WeatherSample {
        self.hourly
            .iter()
            .find(|entry| entry.hour == hour)
            .map(HourlyWeather::sample)
            .unwrap_or_else(|| SyntheticWeather::sample(self.date.month(), hour))
    }
}

/// Weather access with mandatory degradation to synthetic data.
pub struct WeatherService {
    provider: Option<Box<dyn WeatherProvider>>,
}

impl WeatherService {
    pub fn live(provider: Box<dyn WeatherProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// No live source configured; all answers come from the seasonal model.
    pub fn synthetic_only() -> Self {
        Self { provider: None }
    }

    /// Weather at a specific moment. Never fails.
    pub fn sample_at(&self, lat: f64, lng: f64, at: NaiveDateTime) -> WeatherSample {
        if let Some(provider) = &self.provider {
            match provider.current(lat, lng) {
                Ok(sample) => return sample,
                Err(err) => {
                    warn!("weather provider failed, using synthetic data: {err}");
                }
            }
        }
        SyntheticWeather::sample(at.month(), at.hour())
    }

    /// Hourly outlook and summary for a date. Never fails.
    pub fn day_outlook(&self, lat: f64, lng: f64, date: NaiveDate) -> DayOutlook {
        if let Some(provider) = &self.provider {
            match provider.day_forecast(lat, lng, date) {
                Ok(hourly) => {
                    let summary = summarize(&hourly);
                    return DayOutlook {
                        date,
                        summary,
                        hourly,
                        source: "live",
                    };
                }
                Err(err) => {
                    warn!("weather forecast failed, using synthetic data: {err}");
                }
            }
        }

        let hourly = SyntheticWeather::day_forecast(date);
        let summary = summarize(&hourly);
        DayOutlook {
            date,
            summary,
            hourly,
            source: "synthetic",
        }
    }
}

fn summarize(hourly: &[HourlyWeather]) -> String {
    if hourly.is_empty() {
        return "No hourly forecast.".to_string();
    }
    let avg_temp =
        hourly.iter().map(|h| h.temperature_c).sum::<f64>() / hourly.len() as f64;
    let total_rain: f64 = hourly.iter().map(|h| h.precipitation_mm).sum();
    let condition = hourly[0].condition.as_str();
    format!("{avg_temp:.1}°C, rain={total_rain:.1}mm, {condition}")
}
