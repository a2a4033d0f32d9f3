use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

/// Where the automatic path gets its coordinates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationSourceKind {
    #[default]
    Ip,
    Fixed,
    None,
}

impl LocationSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSourceKind::Ip => "ip",
            LocationSourceKind::Fixed => "fixed",
            LocationSourceKind::None => "none",
        }
    }

    pub const fn all() -> &'static [LocationSourceKind] {
        &[LocationSourceKind::Ip, LocationSourceKind::Fixed, LocationSourceKind::None]
    }
}

impl std::fmt::Display for LocationSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for LocationSourceKind {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "ip" => Ok(LocationSourceKind::Ip),
            "fixed" => Ok(LocationSourceKind::Fixed),
            "none" => Ok(LocationSourceKind::None),
            _ => Err(anyhow!(
                "Unknown location source '{value}'. Supported sources: ip, fixed, none."
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub source: LocationSourceKind,
    /// Used by the "fixed" source.
    pub latitude: f64,
    pub longitude: f64,
    pub timeout_secs: u64,
    pub high_accuracy: bool,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSourceKind::default(),
            latitude: 40.7128,
            longitude: -74.0060,
            timeout_secs: 15,
            high_accuracy: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Sent with every request; Nominatim refuses anonymous clients.
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Pause before the single place-lookup retry.
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("Skyglass/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 10,
            retry_delay_ms: 1000,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub forecast: String,
    pub reverse_geocode: String,
    pub search: String,
    pub ip_location: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            forecast: "https://api.open-meteo.com/v1/forecast".to_string(),
            reverse_geocode: "https://nominatim.openstreetmap.org/reverse".to_string(),
            search: "https://nominatim.openstreetmap.org/search".to_string(),
            ip_location: "http://ip-api.com/json/".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every endpoint at one base URL (a local mock server, a proxy).
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            forecast: format!("{base}/v1/forecast"),
            reverse_geocode: format!("{base}/reverse"),
            search: format!("{base}/search"),
            ip_location: format!("{base}/json/"),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [location]
/// source = "fixed"
/// latitude = 48.8566
/// longitude = 2.3522
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub location: LocationConfig,
    pub http: HttpConfig,
    pub endpoints: Endpoints,
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(&path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "skyglass", "skyglass")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Switch to the fixed source at the given position.
    pub fn set_fixed_location(&mut self, latitude: f64, longitude: f64) -> Result<()> {
        crate::model::Coordinates::new(latitude, longitude)?;
        self.location.source = LocationSourceKind::Fixed;
        self.location.latitude = latitude;
        self.location.longitude = longitude;
        Ok(())
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location.timeout_secs)
    }
}
