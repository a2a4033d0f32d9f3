/// Every way a resolution cycle can fail.
///
/// The orchestration layer catches all of these; none of them reaches the
/// presentation layer without a renderable bundle next to it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("Location services are not available on this device")]
    LocationUnavailable,
    #[error("Location access denied by the user")]
    LocationDenied,
    #[error("Location request timed out")]
    LocationTimeout,
    #[error("Invalid location coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
    #[error("Weather fetch failed: {0}")]
    WeatherFetchFailed(String),
    #[error("Place lookup failed: {0}")]
    PlaceLookupFailed(String),
    #[error("Location not found: {0}. Please try a different name.")]
    SearchNotFound(String),
    #[error("City search failed: {0}")]
    SearchFailed(String),
}

impl PipelineError {
    /// Short name of the pipeline step that produced the error.
    pub fn step(&self) -> &'static str {
        match self {
            Self::LocationUnavailable
            | Self::LocationDenied
            | Self::LocationTimeout
            | Self::InvalidCoordinates { .. } => "location",
            Self::WeatherFetchFailed(_) => "weather",
            Self::PlaceLookupFailed(_) => "place",
            Self::SearchNotFound(_) | Self::SearchFailed(_) => "search",
        }
    }

    pub fn is_location(&self) -> bool {
        self.step() == "location"
    }
}
