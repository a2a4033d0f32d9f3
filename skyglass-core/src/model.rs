use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{condition::WeatherCondition, error::PipelineError};

pub const UNKNOWN_CITY: &str = "Unknown City";
pub const UNKNOWN_COUNTRY: &str = "Unknown Country";
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// A validated point on Earth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Rejects anything outside `[-90, 90]` / `[-180, 180]`, NaN included.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, PipelineError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(PipelineError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Skips validation; only for constants known to be in range.
    pub(crate) const fn from_trusted(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// WMO weather interpretation code as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherCode(pub u8);

impl WeatherCode {
    pub fn condition(self) -> WeatherCondition {
        WeatherCondition::from_wmo_code(self.0)
    }
}

/// Current conditions at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub wind_speed: f64,
    pub wind_direction: u16,
    pub weather_code: WeatherCode,
    pub observed_at: DateTime<FixedOffset>,
}

impl WeatherSnapshot {
    pub fn new(
        temperature: f64,
        wind_speed: f64,
        wind_direction: f64,
        weather_code: WeatherCode,
        observed_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            temperature,
            wind_speed,
            wind_direction: normalize_degrees(wind_direction),
            weather_code,
            observed_at,
        }
    }
}

fn normalize_degrees(degrees: f64) -> u16 {
    if !degrees.is_finite() {
        return 0;
    }
    // rem_euclid keeps the result in [0, 360) for negative input too
    (degrees.round() as i64).rem_euclid(360) as u16
}

/// Hourly forecast as three parallel sequences of equal length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlySeries {
    time: Vec<DateTime<FixedOffset>>,
    temperature: Vec<f64>,
    weather_code: Vec<WeatherCode>,
}

/// One hour taken across the three sequences of a [`HourlySeries`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourlyEntry {
    pub time: DateTime<FixedOffset>,
    pub temperature: f64,
    pub weather_code: WeatherCode,
}

impl HourlySeries {
    /// Returns `None` when the sequences differ in length.
    pub fn new(
        time: Vec<DateTime<FixedOffset>>,
        temperature: Vec<f64>,
        weather_code: Vec<WeatherCode>,
    ) -> Option<Self> {
        if time.len() != temperature.len() || time.len() != weather_code.len() {
            return None;
        }

        Some(Self {
            time,
            temperature,
            weather_code,
        })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = HourlyEntry>) -> Self {
        let mut series = Self {
            time: Vec::new(),
            temperature: Vec::new(),
            weather_code: Vec::new(),
        };
        for entry in entries {
            series.time.push(entry.time);
            series.temperature.push(entry.temperature);
            series.weather_code.push(entry.weather_code);
        }
        series
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn times(&self) -> &[DateTime<FixedOffset>] {
        &self.time
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperature
    }

    pub fn weather_codes(&self) -> &[WeatherCode] {
        &self.weather_code
    }

    pub fn iter(&self) -> impl Iterator<Item = HourlyEntry> + '_ {
        self.time
            .iter()
            .zip(&self.temperature)
            .zip(&self.weather_code)
            .map(|((time, temperature), weather_code)| HourlyEntry {
                time: *time,
                temperature: *temperature,
                weather_code: *weather_code,
            })
    }

    /// Keep at most the first `hours` entries.
    pub fn truncated(mut self, hours: usize) -> Self {
        self.time.truncate(hours);
        self.temperature.truncate(hours);
        self.weather_code.truncate(hours);
        self
    }

    /// `HH:00` labels in local provider time, one per entry.
    pub fn chart_labels(&self) -> Vec<String> {
        self.time.iter().map(|t| t.format("%H:00").to_string()).collect()
    }
}

/// Human-readable location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub city: String,
    pub country: String,
}

impl Place {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }

    /// Placeholder used when no live place could be obtained.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_CITY, UNKNOWN_COUNTRY)
    }

    /// Split a Nominatim `display_name` into first (city) and last (country)
    /// segments.
    pub fn from_display_name(display_name: &str) -> Self {
        let mut segments = display_name.split(',').map(str::trim);
        let city = segments.next().unwrap_or_default().to_string();
        let country = segments.next_back().unwrap_or(city.as_str()).to_string();
        Self { city, country }
    }
}

/// Aggregate handed to the presentation layer for one resolution cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherBundle {
    pub coordinates: Coordinates,
    pub current: WeatherSnapshot,
    pub hourly: HourlySeries,
    pub place: Place,
    pub is_sample: bool,
    pub error: Option<String>,
}
