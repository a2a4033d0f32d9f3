use anyhow::Context;
use skyglass_core::{DashboardView, HourlyEntry, WeatherBundle, is_night};
use std::fmt::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }
}

/// Presentation-only state, owned by the CLI.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub mode: OutputMode,
    /// Entries shown in the hourly strip.
    pub strip_len: usize,
}

impl ViewState {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            strip_len: 24,
        }
    }
}

pub fn render(view: &DashboardView, state: &ViewState) -> anyhow::Result<String> {
    match state.mode {
        OutputMode::Json => {
            serde_json::to_string_pretty(view).context("Failed to serialize dashboard view")
        }
        OutputMode::Text => {
            let mut out = String::new();
            write_text(&mut out, view, state).context("Failed to format dashboard view")?;
            Ok(out)
        }
    }
}

fn write_text(out: &mut String, view: &DashboardView, state: &ViewState) -> fmt::Result {
    let bundle: &WeatherBundle = &view.bundle;
    let current = &bundle.current;
    let condition = current.weather_code.condition();
    let night = is_night(&current.observed_at);

    writeln!(
        out,
        "{}, {}  ({:.4}, {:.4})",
        bundle.place.city,
        bundle.place.country,
        bundle.coordinates.latitude(),
        bundle.coordinates.longitude()
    )?;
    writeln!(out, "{}", current.observed_at.format("%a %-d %B %Y, %H:%M"))?;
    writeln!(
        out,
        "  {:.1}°C  {} [{}]",
        current.temperature,
        condition.description(),
        condition.icon_name(night)
    )?;
    writeln!(
        out,
        "  Wind {:.1} km/h from {}° ({})",
        current.wind_speed,
        current.wind_direction,
        compass(current.wind_direction)
    )?;

    writeln!(out, "\nHourly")?;
    for entry in bundle.hourly.iter().take(state.strip_len) {
        writeln!(out, "{}", hourly_line(&entry))?;
    }

    if let Some((lo, hi)) = temperature_range(bundle) {
        writeln!(out, "  range {lo:.1}°C .. {hi:.1}°C")?;
    }

    if bundle.is_sample {
        writeln!(out, "\n[sample data]")?;
    }
    if let Some(message) = &view.message {
        writeln!(out, "! {message}")?;
    }

    Ok(())
}

fn hourly_line(entry: &HourlyEntry) -> String {
    let condition = entry.weather_code.condition();
    format!(
        "  {}  {:>5.1}°C  {:<13} [{}]",
        entry.time.format("%H:00"),
        entry.temperature,
        condition.description(),
        condition.icon_name(is_night(&entry.time))
    )
}

fn temperature_range(bundle: &WeatherBundle) -> Option<(f64, f64)> {
    let temps = bundle.hourly.temperatures();
    let first = *temps.first()?;
    Some(temps.iter().fold((first, first), |(lo, hi), &t| (lo.min(t), hi.max(t))))
}

fn compass(degrees: u16) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    POINTS[((degrees as usize * 2 + 45) / 90) % 8]
}
