//! One resolution cycle: location, then weather and place, then the bundle.

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    config::Config,
    error::PipelineError,
    geocode::{Geocoder, geocoder_from_config},
    http,
    location::{LocationResolver, resolver_from_config},
    model::{Coordinates, Place, WeatherBundle},
    provider::{Forecast, WeatherProvider, provider_from_config},
    sample,
};

#[derive(Debug, Clone)]
pub struct Pipeline {
    location: LocationResolver,
    weather: Arc<dyn WeatherProvider>,
    geocoder: Arc<dyn Geocoder>,
}

impl Pipeline {
    pub fn new(
        location: LocationResolver,
        weather: Arc<dyn WeatherProvider>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            location,
            weather,
            geocoder,
        }
    }

    /// Wire up the production collaborators sharing one HTTP client.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = http::client(&config.http).context("Failed to build HTTP client")?;

        Ok(Self::new(
            resolver_from_config(config, http.clone()),
            provider_from_config(config, http.clone()),
            geocoder_from_config(config, http),
        ))
    }

    /// Automatic path. The first failing step short-circuits the rest.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve(&self) -> Result<WeatherBundle, PipelineError> {
        let coordinates = self.location.resolve().await?;
        self.resolve_at(coordinates).await
    }

    /// Weather and place for known coordinates. Both requests settle before
    /// the bundle is assembled; a weather failure is reported ahead of a place
    /// failure.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve_at(
        &self,
        coordinates: Coordinates,
    ) -> Result<WeatherBundle, PipelineError> {
        let (forecast, place) = tokio::join!(
            self.weather.fetch(&coordinates),
            self.geocoder.reverse(&coordinates)
        );

        Ok(live_bundle(coordinates, forecast?, place?))
    }

    /// Manual path: forward geocode, then weather at the hit. The place comes
    /// from the hit's display name, so no reverse lookup is made.
    #[instrument(skip(self), level = "debug")]
    pub async fn search(&self, query: &str) -> Result<WeatherBundle, PipelineError> {
        let hit = self.geocoder.search(query).await?;
        let forecast = self.weather.fetch(&hit.coordinates).await?;

        info!("Loaded weather for searched place {}", hit.display_name);
        Ok(live_bundle(hit.coordinates, forecast, hit.place))
    }

    /// Automatic path that always yields a renderable bundle.
    pub async fn resolve_or_sample(&self) -> WeatherBundle {
        match self.location.resolve().await {
            Ok(coordinates) => self.resolve_at(coordinates).await.or_sample_at(coordinates),
            Err(e) => Err::<WeatherBundle, _>(e).or_sample(),
        }
    }
}

fn live_bundle(coordinates: Coordinates, forecast: Forecast, place: Place) -> WeatherBundle {
    WeatherBundle {
        coordinates,
        current: forecast.current,
        hourly: forecast.hourly,
        place,
        is_sample: false,
        error: None,
    }
}

/// Substitute the sample bundle for a failed resolution.
pub trait Fallback {
    fn or_sample(self) -> WeatherBundle;

    /// Like [`Fallback::or_sample`], keeping coordinates that did resolve.
    fn or_sample_at(self, coordinates: Coordinates) -> WeatherBundle;
}

impl Fallback for Result<WeatherBundle, PipelineError> {
    fn or_sample(self) -> WeatherBundle {
        self.unwrap_or_else(|e| substitute(None, &e))
    }

    fn or_sample_at(self, coordinates: Coordinates) -> WeatherBundle {
        self.unwrap_or_else(|e| substitute(Some(coordinates), &e))
    }
}

fn substitute(coordinates: Option<Coordinates>, error: &PipelineError) -> WeatherBundle {
    warn!("{} step failed, showing sample data: {}", error.step(), error);
    sample::bundle(coordinates, Some(fallback_message(error)))
}

pub fn fallback_message(error: &PipelineError) -> String {
    if error.is_location() {
        format!("{error}. Showing sample data.")
    } else {
        format!("Failed to fetch data: {error}. Showing sample data.")
    }
}
