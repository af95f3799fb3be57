use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "droplets",
    version,
    about = "Current temperature for your location or a searched city"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the temperature at the device's current location.
    Current,

    /// Search for a city and show the temperature at the best match.
    City {
        /// City name to search for.
        query: String,
    },

    /// List place suggestions for a query without fetching weather.
    Search {
        /// City name to search for.
        query: String,

        /// Maximum number of suggestions.
        #[clap(long, default_value = "5")]
        limit: u32,
    },
}
