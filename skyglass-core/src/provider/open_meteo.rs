use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    error::PipelineError,
    http::read_success_body,
    model::{Coordinates, HourlySeries, WeatherCode, WeatherSnapshot},
};

use super::{Forecast, HOURLY_WINDOW, WeatherProvider};

const CURRENT_FIELDS: &str = "temperature_2m,wind_speed_10m,wind_direction_10m,weather_code";
const HOURLY_FIELDS: &str = "temperature_2m,weather_code";

/// Open-Meteo forecast API. Free, no API key.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    endpoint: String,
}

impl OpenMeteoProvider {
    pub fn new(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    current: Option<OmCurrent>,
    current_weather: Option<OmCurrentWeather>,
    hourly: OmHourly,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    time: String,
    temperature_2m: f64,
    wind_speed_10m: f64,
    wind_direction_10m: f64,
    weather_code: u8,
}

/// Legacy `current_weather=true` block.
#[derive(Debug, Deserialize)]
struct OmCurrentWeather {
    time: String,
    temperature: f64,
    windspeed: f64,
    winddirection: f64,
    weathercode: u8,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    weather_code: Vec<Option<u8>>,
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, coordinates: &Coordinates) -> Result<Forecast, PipelineError> {
        let res = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("latitude", coordinates.latitude().to_string()),
                ("longitude", coordinates.longitude().to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("current_weather", "true".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                PipelineError::WeatherFetchFailed(format!("Open-Meteo request failed: {e}"))
            })?;

        let body = read_success_body(res, "Open-Meteo")
            .await
            .map_err(PipelineError::WeatherFetchFailed)?;

        let forecast = parse_forecast(&body).map_err(PipelineError::WeatherFetchFailed)?;
        debug!(
            "Open-Meteo returned {:.1}°C with {} hourly entries",
            forecast.current.temperature,
            forecast.hourly.len()
        );
        Ok(forecast)
    }
}

fn parse_forecast(body: &str) -> Result<Forecast, String> {
    let parsed: OmResponse =
        serde_json::from_str(body).map_err(|e| format!("Failed to parse Open-Meteo JSON: {e}"))?;

    let offset = FixedOffset::east_opt(parsed.utc_offset_seconds)
        .ok_or_else(|| format!("Invalid UTC offset {}", parsed.utc_offset_seconds))?;

    let current = match (parsed.current, parsed.current_weather) {
        (Some(c), _) => WeatherSnapshot::new(
            c.temperature_2m,
            c.wind_speed_10m,
            c.wind_direction_10m,
            WeatherCode(c.weather_code),
            parse_time(&c.time, offset)?,
        ),
        (None, Some(c)) => WeatherSnapshot::new(
            c.temperature,
            c.windspeed,
            c.winddirection,
            WeatherCode(c.weathercode),
            parse_time(&c.time, offset)?,
        ),
        (None, None) => {
            return Err("Open-Meteo response contained no current conditions".to_string());
        }
    };

    let hourly = parsed.hourly;
    if hourly.temperature_2m.len() != hourly.time.len()
        || hourly.weather_code.len() != hourly.time.len()
    {
        return Err("Open-Meteo hourly arrays differ in length".to_string());
    }

    let time = hourly
        .time
        .iter()
        .take(HOURLY_WINDOW)
        .map(|t| parse_time(t, offset))
        .collect::<Result<Vec<_>, _>>()?;
    let temperature = hourly
        .temperature_2m
        .into_iter()
        .take(HOURLY_WINDOW)
        .collect::<Option<Vec<_>>>()
        .ok_or("Open-Meteo hourly temperatures contained null values")?;
    let weather_code = hourly
        .weather_code
        .into_iter()
        .take(HOURLY_WINDOW)
        .map(|code| code.map(WeatherCode))
        .collect::<Option<Vec<_>>>()
        .ok_or("Open-Meteo hourly weather codes contained null values")?;

    let hourly = HourlySeries::new(time, temperature, weather_code)
        .ok_or("Open-Meteo hourly arrays differ in length")?;

    Ok(Forecast { current, hourly })
}

/// Open-Meteo reports local wall-clock time ("2025-05-03T14:00") next to the
/// zone offset.
fn parse_time(raw: &str, offset: FixedOffset) -> Result<DateTime<FixedOffset>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| format!("Invalid Open-Meteo timestamp '{raw}': {e}"))?;

    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| format!("Ambiguous Open-Meteo timestamp '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn hourly_json(hours: usize) -> serde_json::Value {
        serde_json::json!({
            "time": (0..hours)
                .map(|h| format!("2025-05-{:02}T{:02}:00", 3 + h / 24, h % 24))
                .collect::<Vec<_>>(),
            "temperature_2m": (0..hours).map(|h| 10.0 + h as f64).collect::<Vec<_>>(),
            "weather_code": (0..hours)
                .map(|h| if h % 2 == 0 { 0 } else { 61 })
                .collect::<Vec<_>>(),
        })
    }

    fn body(hours: usize) -> serde_json::Value {
        serde_json::json!({
            "latitude": 40.71,
            "longitude": -74.0,
            "utc_offset_seconds": -14400,
            "timezone": "America/New_York",
            "current": {
                "time": "2025-05-03T14:15",
                "interval": 900,
                "temperature_2m": 15.0,
                "wind_speed_10m": 12.5,
                "wind_direction_10m": 200,
                "weather_code": 3
            },
            "hourly": hourly_json(hours)
        })
    }

    async fn serve(body: ResponseTemplate) -> (MockServer, OpenMeteoProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(body)
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        (mock_server, provider)
    }

    fn provider(server: &MockServer) -> OpenMeteoProvider {
        OpenMeteoProvider::new(Client::new(), format!("{}/v1/forecast", server.uri()))
    }

    fn new_york() -> Coordinates {
        Coordinates::new(40.7128, -74.0060).unwrap()
    }

    #[tokio::test]
    async fn fetches_current_and_hourly() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "40.7128"))
            .and(query_param("longitude", "-74.006"))
            .and(query_param("hourly", HOURLY_FIELDS))
            .and(query_param("timezone", "auto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body(24)))
            .mount(&mock_server)
            .await;

        let forecast = provider(&mock_server).fetch(&new_york()).await.unwrap();

        assert_eq!(forecast.current.temperature, 15.0);
        assert_eq!(forecast.current.wind_speed, 12.5);
        assert_eq!(forecast.current.wind_direction, 200);
        assert_eq!(forecast.current.weather_code, WeatherCode(3));
        assert_eq!(
            forecast.current.observed_at.to_rfc3339(),
            "2025-05-03T14:15:00-04:00"
        );

        assert_eq!(forecast.hourly.len(), 24);
        assert_eq!(
            forecast.hourly.temperatures().len(),
            forecast.hourly.weather_codes().len()
        );
        assert_eq!(forecast.hourly.weather_codes()[1], WeatherCode(61));
        assert_eq!(forecast.hourly.chart_labels()[23], "23:00");
    }

    #[tokio::test]
    async fn long_series_is_cut_to_window() {
        let (_server, provider) = serve(ResponseTemplate::new(200).set_body_json(body(168))).await;
        let forecast = provider.fetch(&new_york()).await.unwrap();
        assert_eq!(forecast.hourly.len(), HOURLY_WINDOW);
        assert_eq!(forecast.hourly.temperatures()[0], 10.0);
    }

    #[tokio::test]
    async fn short_series_is_accepted() {
        let (_server, provider) = serve(ResponseTemplate::new(200).set_body_json(body(6))).await;
        let forecast = provider.fetch(&new_york()).await.unwrap();
        assert_eq!(forecast.hourly.len(), 6);
    }

    #[tokio::test]
    async fn falls_back_to_current_weather_block() {
        let json = serde_json::json!({
            "utc_offset_seconds": 7200,
            "current_weather": {
                "time": "2025-05-03T09:00",
                "temperature": 21.3,
                "windspeed": 4.0,
                "winddirection": 360,
                "weathercode": 95
            },
            "hourly": hourly_json(24)
        });
        let (_server, provider) = serve(ResponseTemplate::new(200).set_body_json(json)).await;

        let forecast = provider.fetch(&new_york()).await.unwrap();
        assert_eq!(forecast.current.temperature, 21.3);
        assert_eq!(forecast.current.wind_direction, 0);
        assert_eq!(forecast.current.weather_code, WeatherCode(95));
        assert_eq!(forecast.current.observed_at.offset().local_minus_utc(), 7200);
    }

    #[tokio::test]
    async fn non_success_status_fails() {
        let (_server, provider) =
            serve(ResponseTemplate::new(500).set_body_string("upstream exploded")).await;
        let err = provider.fetch(&new_york()).await.unwrap_err();

        match err {
            PipelineError::WeatherFetchFailed(msg) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("upstream exploded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_fails() {
        let (_server, provider) =
            serve(ResponseTemplate::new(200).set_body_string("<html>")).await;
        let err = provider.fetch(&new_york()).await.unwrap_err();
        assert!(matches!(err, PipelineError::WeatherFetchFailed(_)));
    }

    #[test]
    fn missing_current_block_is_malformed() {
        let json = serde_json::json!({ "hourly": hourly_json(2) }).to_string();
        let err = parse_forecast(&json).unwrap_err();
        assert!(err.contains("no current conditions"));
    }

    #[test]
    fn mismatched_hourly_arrays_are_malformed() {
        let mut json = body(4);
        json["hourly"]["weather_code"] = serde_json::json!([0, 1]);
        let err = parse_forecast(&json.to_string()).unwrap_err();
        assert!(err.contains("differ in length"));
    }

    #[test]
    fn mismatched_arrays_longer_than_window_are_malformed() {
        let mut json = body(48);
        json["hourly"]["temperature_2m"] = serde_json::json!((0..30).collect::<Vec<_>>());
        let err = parse_forecast(&json.to_string()).unwrap_err();
        assert!(err.contains("differ in length"));
    }

    #[test]
    fn null_temperature_is_malformed() {
        let mut json = body(2);
        json["hourly"]["temperature_2m"] = serde_json::json!([null, 3.0]);
        assert!(parse_forecast(&json.to_string()).is_err());
    }
}
