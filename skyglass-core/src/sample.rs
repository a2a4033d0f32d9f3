//! Deterministic stand-in data for when live data cannot be obtained.

use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::{
    model::{
        Coordinates, HourlyEntry, HourlySeries, Place, WeatherBundle, WeatherCode,
        WeatherSnapshot,
    },
    provider::HOURLY_WINDOW,
};

/// 2025-05-03T00:00:00Z
const SAMPLE_START_EPOCH: i64 = 1_746_230_400;
const SAMPLE_CODES: [u8; 10] = [0, 1, 2, 3, 51, 61, 71, 73, 95, 96];
const DEFAULT_COORDINATES: Coordinates = Coordinates::from_trusted(40.7128, -74.0060);

fn start() -> DateTime<FixedOffset> {
    DateTime::<Utc>::from_timestamp(SAMPLE_START_EPOCH, 0)
        .unwrap_or_default()
        .fixed_offset()
}

/// Where the sample bundle is placed when no coordinates were resolved (New York).
pub fn default_coordinates() -> Coordinates {
    DEFAULT_COORDINATES
}

pub fn hourly() -> HourlySeries {
    let start = start();
    HourlySeries::from_entries((0..HOURLY_WINDOW).map(|i| HourlyEntry {
        time: start + Duration::hours(i as i64),
        temperature: 15.0 + i as f64 * 0.5,
        weather_code: WeatherCode(SAMPLE_CODES[i % SAMPLE_CODES.len()]),
    }))
}

pub fn current() -> WeatherSnapshot {
    WeatherSnapshot::new(15.0, 10.0, 180.0, WeatherCode(0), start())
}

/// Complete sample bundle. `coordinates` are kept when location did resolve.
pub fn bundle(coordinates: Option<Coordinates>, error: Option<String>) -> WeatherBundle {
    WeatherBundle {
        coordinates: coordinates.unwrap_or_else(default_coordinates),
        current: current(),
        hourly: hourly(),
        place: Place::unknown(),
        is_sample: true,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{UNKNOWN_CITY, UNKNOWN_COUNTRY};

    #[test]
    fn sample_series_is_full_and_rising() {
        let series = hourly();
        assert_eq!(series.len(), 24);
        assert!(series.temperatures().windows(2).all(|w| w[1] > w[0]));
        assert_eq!(series.temperatures()[23], 26.5);
        assert_eq!(series.weather_codes()[10], WeatherCode(0));
        assert_eq!(series.weather_codes()[9], WeatherCode(96));
        assert_eq!(series.times()[0].to_rfc3339(), "2025-05-03T00:00:00+00:00");
        assert_eq!(series.chart_labels()[13], "13:00");
    }

    #[test]
    fn sample_bundle_is_marked_and_placeholdered() {
        let bundle = bundle(None, Some("boom".to_string()));
        assert!(bundle.is_sample);
        assert_eq!(bundle.place.city, UNKNOWN_CITY);
        assert_eq!(bundle.place.country, UNKNOWN_COUNTRY);
        assert_eq!(bundle.coordinates, default_coordinates());
        assert_eq!(bundle.current.temperature, 15.0);
        assert_eq!(bundle.current.wind_direction, 180);
        assert_eq!(bundle.error.as_deref(), Some("boom"));
    }

    #[test]
    fn sample_bundle_keeps_resolved_coordinates() {
        let paris = Coordinates::new(48.85, 2.35).unwrap();
        assert_eq!(bundle(Some(paris), None).coordinates, paris);
    }
}
