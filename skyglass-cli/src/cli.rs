use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{CustomType, Select, Text};
use skyglass_core::{Config, Dashboard, LocationSourceKind, Pipeline};

use crate::render::{OutputMode, ViewState, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skyglass", version, about = "Weather dashboard for your terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show weather for the current location, falling back to sample data.
    Show {
        /// Print the bundle as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Search for a place by name and show its weather.
    Search {
        /// Free-text place name, e.g. "Paris".
        query: String,

        /// Print the bundle as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Interactively configure the location source and client identity.
    Configure,

    /// Print the config file path and the effective configuration.
    Config,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Show { json } => {
                let dashboard = dashboard()?;
                let view = dashboard.refresh().await;
                let state = ViewState::new(OutputMode::from_flag(json));
                println!("{}", render(&view, &state)?);
            }
            Command::Search { query, json } => {
                let dashboard = dashboard()?;
                let state = ViewState::new(OutputMode::from_flag(json));
                match dashboard.search(&query).await {
                    Ok(view) => println!("{}", render(&view, &state)?),
                    Err(e) => {
                        // the kept view carries the failure message
                        println!("{}", render(&dashboard.view(), &state)?);
                        return Err(e).with_context(|| format!("Search for '{query}' failed"));
                    }
                }
            }
            Command::Configure => configure()?,
            Command::Config => {
                let path = Config::config_file_path()?;
                let cfg = Config::load()?;
                println!("# {}", path.display());
                print!("{}", cfg.to_toml()?);
            }
        }

        Ok(())
    }
}

fn dashboard() -> anyhow::Result<Dashboard> {
    let cfg = Config::load()?;
    let pipeline = Pipeline::from_config(&cfg)?;
    Ok(Dashboard::new(pipeline))
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let source = Select::new("Location source:", LocationSourceKind::all().to_vec())
        .with_help_message(
            "ip: approximate position from your IP address; \
             fixed: coordinates you enter; none: always show sample data",
        )
        .prompt()
        .context("Location source selection aborted")?;

    if source == LocationSourceKind::Fixed {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_default(cfg.location.latitude)
            .with_error_message("Please enter a number between -90 and 90")
            .prompt()
            .context("Latitude input aborted")?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_default(cfg.location.longitude)
            .with_error_message("Please enter a number between -180 and 180")
            .prompt()
            .context("Longitude input aborted")?;

        cfg.set_fixed_location(latitude, longitude)?;
    } else {
        cfg.location.source = source;
    }

    cfg.http.user_agent = Text::new("User-Agent sent to geocoding services:")
        .with_default(&cfg.http.user_agent)
        .prompt()
        .context("User-Agent input aborted")?;

    cfg.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
