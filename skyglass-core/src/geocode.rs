//! Place names for coordinates and coordinates for place names.

use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, sync::Arc};

use crate::{
    config::Config,
    error::PipelineError,
    geocode::nominatim::NominatimGeocoder,
    model::{Coordinates, Place},
};

pub mod nominatim;

/// Best match of a forward-geocoding query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub coordinates: Coordinates,
    pub place: Place,
    pub display_name: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Reverse geocode; fails with `PlaceLookupFailed` once retries are exhausted.
    async fn reverse(&self, coordinates: &Coordinates) -> Result<Place, PipelineError>;

    /// Forward geocode a free-text query to its single best match.
    async fn search(&self, query: &str) -> Result<SearchHit, PipelineError>;
}

/// Construct the geocoder from config.
pub fn geocoder_from_config(config: &Config, http: Client) -> Arc<dyn Geocoder> {
    Arc::new(NominatimGeocoder::new(
        http,
        config.http.user_agent.clone(),
        config.endpoints.reverse_geocode.clone(),
        config.endpoints.search.clone(),
        config.http.retry_delay(),
    ))
}
