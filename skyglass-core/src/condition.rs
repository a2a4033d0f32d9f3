use chrono::{DateTime, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

/// Display category for a WMO weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Sunny,
    PartlyCloudy,
    Cloudy,
    Rainy,
    Snowy,
    Thunderstorm,
    Unknown,
}

impl WeatherCondition {
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: u8) -> Self {
        match code {
            0 => Self::Sunny,
            1 | 2 => Self::PartlyCloudy,
            3 | 45 | 48 => Self::Cloudy,
            51 | 53 | 55 | 61 | 63 | 65 | 80 | 81 | 82 => Self::Rainy,
            71 | 73 | 75 | 85 | 86 => Self::Snowy,
            95 | 96 | 99 => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Sunny => "Sunny",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Rainy => "Rainy",
            Self::Snowy => "Snowy",
            Self::Thunderstorm => "Thunderstorm",
            Self::Unknown => "Unknown",
        }
    }

    /// Icon name for the presentation layer; clear-sky icons switch to a night variant.
    pub fn icon_name(&self, night: bool) -> &'static str {
        match (self, night) {
            (Self::Sunny, false) => "sun",
            (Self::Sunny, true) => "moon",
            (Self::PartlyCloudy, false) => "cloud_sun",
            (Self::PartlyCloudy, true) => "cloud_moon",
            (Self::Cloudy | Self::Unknown, _) => "cloud",
            (Self::Rainy, _) => "cloud_rain",
            (Self::Snowy, _) => "cloud_snow",
            (Self::Thunderstorm, _) => "cloud_lightning",
        }
    }
}

/// Night is 18:00 up to 06:00 local time.
pub fn is_night(time: &DateTime<FixedOffset>) -> bool {
    let hour = time.hour();
    !(6..18).contains(&hour)
}
