//! Core library for the `skyglass` weather dashboard.
//!
//! This crate defines:
//! - The location → weather/place acquisition pipeline with sample-data fallback
//! - Abstractions over the position source, weather provider and geocoder
//! - Shared domain models (coordinates, snapshots, hourly series, bundles)
//! - Configuration handling
//!
//! It is used by `skyglass-cli`, but any presentation layer can consume the
//! [`WeatherBundle`] it produces.

pub mod condition;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod geocode;
pub mod http;
pub mod location;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod sample;

pub use condition::{WeatherCondition, is_night};
pub use config::{Config, Endpoints, HttpConfig, LocationConfig, LocationSourceKind};
pub use dashboard::{Dashboard, DashboardView, ResolutionState};
pub use error::PipelineError;
pub use geocode::{Geocoder, SearchHit};
pub use location::{LocationResolver, PositionOptions, PositionSource};
pub use model::{
    Coordinates, HourlyEntry, HourlySeries, Place, WeatherBundle, WeatherCode, WeatherSnapshot,
};
pub use pipeline::{Fallback, Pipeline};
pub use provider::{Forecast, WeatherProvider};
