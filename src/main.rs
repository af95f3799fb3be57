mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use droplets_core::Config;
use droplets_weather::{
    current_location, Coordinate, Geocoder, IpLocationSource, Orchestrator, WeatherProvider,
};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    droplets_core::init()?;

    let cli = Cli::parse();
    let (config, _validation) = Config::load_validated()?;

    match cli.command {
        Command::Current => {
            let coordinate = match current_location(&IpLocationSource).await {
                Ok(coordinate) => coordinate,
                Err(error) => {
                    tracing::error!(%error, "location lookup failed");
                    anyhow::bail!(error.user_message());
                }
            };
            show_weather(&config, coordinate).await
        }
        Command::City { query } => {
            let geocoder = Geocoder::with_base_url(&config.geocoder.base_url)?;
            let place = geocoder
                .search(&query, 1)
                .await?
                .into_iter()
                .next()
                .with_context(|| format!("no places found for \"{query}\""))?;
            if let Some(name) = place.name.as_deref() {
                tracing::info!(%name, "selected first search result");
            }
            show_weather(&config, place.coordinate).await
        }
        Command::Search { query, limit } => {
            let geocoder = Geocoder::with_base_url(&config.geocoder.base_url)?;
            let places = geocoder.search(&query, limit).await?;
            if places.is_empty() {
                println!("No places found for \"{query}\"");
                return Ok(());
            }
            for (index, place) in places.iter().enumerate() {
                println!(
                    "{}. {}",
                    index + 1,
                    place.name.as_deref().unwrap_or("(unnamed)")
                );
            }
            Ok(())
        }
    }
}

/// Run the pipeline for one coordinate and print the published state.
async fn show_weather(config: &Config, coordinate: Coordinate) -> Result<()> {
    let resolver = Arc::new(Geocoder::with_base_url(&config.geocoder.base_url)?);
    let fetcher = Arc::new(WeatherProvider::new(&config.weather)?);
    let orchestrator = Orchestrator::new(resolver, fetcher);

    orchestrator.submit(coordinate).await;
    let state = orchestrator.ready_state().await;

    match state.current_place.as_ref().and_then(|p| p.name.as_deref()) {
        Some(name) => println!("Temperature in {name}"),
        None => println!(
            "Temperature at {:.4}, {:.4}",
            coordinate.latitude, coordinate.longitude
        ),
    }

    match state.current_temperature_c {
        Some(celsius) => println!("{celsius} Celsius"),
        None => println!(
            "{}",
            state
                .last_error
                .as_deref()
                .unwrap_or("Weather is currently unavailable.")
        ),
    }

    Ok(())
}
