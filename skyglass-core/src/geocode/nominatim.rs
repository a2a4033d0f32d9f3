//! Nominatim (OpenStreetMap) geocoding. Free, no API key required, but the
//! usage policy demands an identifying User-Agent on every request.

use async_trait::async_trait;
use reqwest::{Client, header::USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::PipelineError,
    http::read_success_body,
    model::{Coordinates, Place, UNKNOWN_LOCATION},
};

use super::{Geocoder, SearchHit};

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    http: Client,
    user_agent: String,
    reverse_endpoint: String,
    search_endpoint: String,
    retry_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

impl NominatimGeocoder {
    pub fn new(
        http: Client,
        user_agent: String,
        reverse_endpoint: String,
        search_endpoint: String,
        retry_delay: Duration,
    ) -> Self {
        Self {
            http,
            user_agent,
            reverse_endpoint,
            search_endpoint,
            retry_delay,
        }
    }

    async fn reverse_once(&self, coordinates: &Coordinates) -> Result<String, String> {
        let res = self
            .http
            .get(&self.reverse_endpoint)
            .header(USER_AGENT, &self.user_agent)
            .query(&[
                ("lat", coordinates.latitude().to_string()),
                ("lon", coordinates.longitude().to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await
            .map_err(|e| format!("Nominatim reverse request failed: {e}"))?;

        read_success_body(res, "Nominatim reverse").await
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self), level = "debug")]
    async fn reverse(&self, coordinates: &Coordinates) -> Result<Place, PipelineError> {
        let body = match self.reverse_once(coordinates).await {
            Ok(body) => body,
            Err(first) => {
                warn!(
                    "Reverse geocode failed, retrying in {:?}: {}",
                    self.retry_delay, first
                );
                tokio::time::sleep(self.retry_delay).await;
                self.reverse_once(coordinates)
                    .await
                    .map_err(|e| PipelineError::PlaceLookupFailed(format!("{e} (on retry)")))?
            }
        };

        let place = parse_reverse(&body).map_err(PipelineError::PlaceLookupFailed)?;
        info!("Reverse geocoded to: {}, {}", place.city, place.country);
        Ok(place)
    }

    #[instrument(skip(self), level = "debug")]
    async fn search(&self, query: &str) -> Result<SearchHit, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::SearchNotFound(String::new()));
        }

        let res = self
            .http
            .get(&self.search_endpoint)
            .header(USER_AGENT, &self.user_agent)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| {
                PipelineError::SearchFailed(format!("Nominatim search request failed: {e}"))
            })?;

        let body = read_success_body(res, "Nominatim search")
            .await
            .map_err(PipelineError::SearchFailed)?;

        let results: Vec<NominatimPlace> = serde_json::from_str(&body).map_err(|e| {
            PipelineError::SearchFailed(format!("Failed to parse Nominatim search JSON: {e}"))
        })?;

        let Some(best) = results.into_iter().next() else {
            debug!("No search results for '{}'", query);
            return Err(PipelineError::SearchNotFound(query.to_string()));
        };

        let latitude = parse_degrees(&best.lat)?;
        let longitude = parse_degrees(&best.lon)?;
        let coordinates = Coordinates::new(latitude, longitude)?;
        let place = Place::from_display_name(&best.display_name);

        info!(
            "Search '{}' resolved to {} ({:.4}, {:.4})",
            query, best.display_name, latitude, longitude
        );
        Ok(SearchHit {
            coordinates,
            place,
            display_name: best.display_name,
        })
    }
}

fn parse_degrees(raw: &str) -> Result<f64, PipelineError> {
    raw.trim().parse::<f64>().map_err(|e| {
        PipelineError::SearchFailed(format!("Invalid coordinate '{raw}' in search result: {e}"))
    })
}

fn parse_reverse(body: &str) -> Result<Place, String> {
    let parsed: NominatimReverse = serde_json::from_str(body)
        .map_err(|e| format!("Failed to parse Nominatim reverse JSON: {e}"))?;

    let Some(addr) = parsed.address else {
        return Ok(Place::new(UNKNOWN_LOCATION, ""));
    };

    let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

    // city > town > village > county
    let city = non_empty(addr.city)
        .or_else(|| non_empty(addr.town))
        .or_else(|| non_empty(addr.village))
        .or_else(|| non_empty(addr.county))
        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
    let country = non_empty(addr.country).unwrap_or_default();

    Ok(Place { city, country })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_AGENT: &str = "Skyglass-Test/1.0";

    fn geocoder(server: &MockServer) -> NominatimGeocoder {
        NominatimGeocoder::new(
            Client::new(),
            TEST_AGENT.to_string(),
            format!("{}/reverse", server.uri()),
            format!("{}/search", server.uri()),
            Duration::from_millis(10),
        )
    }

    fn new_york() -> Coordinates {
        Coordinates::new(40.7128, -74.0060).unwrap()
    }

    fn address(fields: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "display_name": "somewhere",
            "address": fields
        }))
    }

    #[tokio::test]
    async fn reverse_sends_user_agent_and_prefers_city() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(header("user-agent", TEST_AGENT))
            .and(query_param("lat", "40.7128"))
            .and(query_param("format", "json"))
            .respond_with(address(serde_json::json!({
                "city": "New York",
                "town": "Manhattan",
                "county": "New York County",
                "country": "United States"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let place = geocoder(&mock_server).reverse(&new_york()).await.unwrap();
        assert_eq!(place, Place::new("New York", "United States"));
    }

    #[tokio::test]
    async fn reverse_falls_through_town_village_county() {
        let cases = [
            (serde_json::json!({"town": "Hoboken", "county": "Hudson"}), "Hoboken"),
            (serde_json::json!({"village": "Cold Spring", "county": "Putnam"}), "Cold Spring"),
            (serde_json::json!({"city": "", "county": "Hudson"}), "Hudson"),
            (serde_json::json!({"country": "Nowhere"}), UNKNOWN_LOCATION),
        ];

        for (fields, expected) in cases {
            let mock_server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/reverse"))
                .respond_with(address(fields))
                .mount(&mock_server)
                .await;

            let place = geocoder(&mock_server).reverse(&new_york()).await.unwrap();
            assert_eq!(place.city, expected);
        }
    }

    #[tokio::test]
    async fn reverse_without_address_is_unknown_location() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": "Unable to geocode"})),
            )
            .mount(&mock_server)
            .await;

        let place = geocoder(&mock_server).reverse(&new_york()).await.unwrap();
        assert_eq!(place, Place::new(UNKNOWN_LOCATION, ""));
    }

    #[tokio::test]
    async fn reverse_retries_once_and_uses_second_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(address(serde_json::json!({
                "city": "New York",
                "country": "United States"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let place = geocoder(&mock_server).reverse(&new_york()).await.unwrap();
        assert_eq!(place.city, "New York");
    }

    #[tokio::test]
    async fn reverse_gives_up_after_two_attempts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(2)
            .mount(&mock_server)
            .await;

        let err = geocoder(&mock_server).reverse(&new_york()).await.unwrap_err();
        match err {
            PipelineError::PlaceLookupFailed(msg) => assert!(msg.contains("on retry")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reverse_does_not_retry_unparseable_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = geocoder(&mock_server).reverse(&new_york()).await.unwrap_err();
        assert!(matches!(err, PipelineError::PlaceLookupFailed(_)));
    }

    #[tokio::test]
    async fn search_splits_display_name() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Paris"))
            .and(query_param("limit", "1"))
            .and(header("user-agent", TEST_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "lat": "48.8588897",
                "lon": "2.3200410",
                "display_name": "Paris, Île-de-France, France"
            }])))
            .mount(&mock_server)
            .await;

        let hit = geocoder(&mock_server).search("Paris").await.unwrap();
        assert_eq!(hit.place.city, "Paris");
        assert_eq!(hit.place.country, "France");
        assert_eq!(hit.coordinates.latitude(), 48.8588897);
        assert_eq!(hit.display_name, "Paris, Île-de-France, France");
    }

    #[tokio::test]
    async fn search_with_no_results_is_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&mock_server)
            .await;

        let err = geocoder(&mock_server).search("Xyzzyville").await.unwrap_err();
        assert_eq!(err, PipelineError::SearchNotFound("Xyzzyville".to_string()));
    }

    #[tokio::test]
    async fn search_transport_errors_are_search_failed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = geocoder(&mock_server).search("Paris").await.unwrap_err();
        assert!(matches!(err, PipelineError::SearchFailed(_)));
    }

    #[tokio::test]
    async fn blank_query_is_rejected_without_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let err = geocoder(&mock_server).search("   ").await.unwrap_err();
        assert!(matches!(err, PipelineError::SearchNotFound(_)));
    }

    #[test]
    fn search_coordinates_are_parsed_from_strings() {
        assert!(parse_degrees("abc").is_err());
        assert_eq!(parse_degrees(" 12.5 ").unwrap(), 12.5);
    }
}
