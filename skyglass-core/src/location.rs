//! Coordinates for the automatic path.
//!
//! A [`PositionSource`] stands in for the device's location capability; the
//! [`LocationResolver`] bounds it with a timeout and refuses to trust the
//! coordinates it reports until they pass range validation.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};

use crate::{
    config::{Config, LocationSourceKind},
    error::PipelineError,
    model::Coordinates,
};

/// Request parameters handed to a [`PositionSource`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub timeout: Duration,
    pub high_accuracy: bool,
    /// Oldest cached fix the source may return; zero forces a fresh one.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            high_accuracy: true,
            maximum_age: Duration::ZERO,
        }
    }
}

/// Unvalidated fix as reported by a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
}

#[async_trait]
pub trait PositionSource: Send + Sync + Debug {
    /// Implementations report `LocationUnavailable` or `LocationDenied`; the
    /// resolver owns timeouts and validation.
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, PipelineError>;
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    source: Arc<dyn PositionSource>,
    options: PositionOptions,
}

impl LocationResolver {
    pub fn new(source: Arc<dyn PositionSource>, options: PositionOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &PositionOptions {
        &self.options
    }

    /// Single attempt; the caller decides what to do on failure.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve(&self) -> Result<Coordinates, PipelineError> {
        let position = tokio::time::timeout(
            self.options.timeout,
            self.source.current_position(&self.options),
        )
        .await
        .map_err(|_| {
            warn!("Location request exceeded {:?}", self.options.timeout);
            PipelineError::LocationTimeout
        })??;

        debug!(
            "Source reported ({}, {}) accuracy {:?}",
            position.latitude, position.longitude, position.accuracy_meters
        );

        Coordinates::new(position.latitude, position.longitude)
    }
}

/// A device that always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition {
    pub latitude: f64,
    pub longitude: f64,
}

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Position, PipelineError> {
        Ok(Position {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy_meters: None,
        })
    }
}

/// A device without location services.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPosition;

#[async_trait]
impl PositionSource for NoPosition {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Position, PipelineError> {
        Err(PipelineError::LocationUnavailable)
    }
}

/// Coarse position from the public IP address (ip-api.com).
#[derive(Debug, Clone)]
pub struct IpPosition {
    http: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpPosition {
    pub fn new(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PositionSource for IpPosition {
    #[instrument(skip(self, _options), level = "debug")]
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Position, PipelineError> {
        let res = self
            .http
            .get(&self.endpoint)
            .query(&[("fields", "status,message,lat,lon")])
            .send()
            .await
            .map_err(|e| {
                debug!("IP location request failed: {}", e);
                PipelineError::LocationUnavailable
            })?;

        if !res.status().is_success() {
            debug!("IP location returned status {}", res.status());
            return Err(PipelineError::LocationUnavailable);
        }

        let body: IpApiResponse = res.json().await.map_err(|e| {
            debug!("IP location parse error: {}", e);
            PipelineError::LocationUnavailable
        })?;

        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(latitude), Some(longitude)) => Ok(Position {
                latitude,
                longitude,
                accuracy_meters: None,
            }),
            _ => {
                debug!("IP location lookup unsuccessful: {:?}", body.message);
                Err(PipelineError::LocationUnavailable)
            }
        }
    }
}

/// Build the resolver selected by `location.source`.
pub fn resolver_from_config(config: &Config, http: Client) -> LocationResolver {
    let source: Arc<dyn PositionSource> = match config.location.source {
        LocationSourceKind::Ip => Arc::new(IpPosition::new(
            http,
            config.endpoints.ip_location.clone(),
        )),
        LocationSourceKind::Fixed => Arc::new(FixedPosition {
            latitude: config.location.latitude,
            longitude: config.location.longitude,
        }),
        LocationSourceKind::None => Arc::new(NoPosition),
    };

    let options = PositionOptions {
        timeout: config.location_timeout(),
        high_accuracy: config.location.high_accuracy,
        ..PositionOptions::default()
    };

    LocationResolver::new(source, options)
}
