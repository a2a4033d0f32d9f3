use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, sync::Arc};

use crate::{
    config::Config,
    error::PipelineError,
    model::{Coordinates, HourlySeries, WeatherSnapshot},
    provider::open_meteo::OpenMeteoProvider,
};

pub mod open_meteo;

/// Hours of the hourly series handed to the presentation layer.
pub const HOURLY_WINDOW: usize = 24;

/// Current conditions plus the hourly series from one provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub current: WeatherSnapshot,
    pub hourly: HourlySeries,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Single attempt; every failure is `WeatherFetchFailed`.
    async fn fetch(&self, coordinates: &Coordinates) -> Result<Forecast, PipelineError>;
}

/// Construct the weather provider from config.
pub fn provider_from_config(config: &Config, http: Client) -> Arc<dyn WeatherProvider> {
    Arc::new(OpenMeteoProvider::new(http, config.endpoints.forecast.clone()))
}
