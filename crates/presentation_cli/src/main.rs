//! Geocoding CLI
//!
//! Command-line interface for looking up addresses and coordinates against
//! Nominatim, and for the offline distance and formatting helpers.

#![allow(clippy::print_stdout)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use domain::AddressParts;
use integration_geocoding::{
    GeocodeOptions, GeocodingClient, GeocodingConfig, GeocodingError, NominatimGeocodingClient,
    ReverseOptions, calculate_distance, format_address, format_short_address, parse_coordinates,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Geocoding CLI
#[derive(Parser)]
#[command(name = "geocode-cli")]
#[command(author, version, about = "Nominatim geocoding for infrastructure reports", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file (default: ./geocoding.toml if present)
    #[arg(short, long, global = true, env = "GEOCODING_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find coordinates for an address
    ///
    /// Example: geocode-cli search "Av. Alemania 1450" --city Temuco --country Chile
    Search {
        /// Address to look up
        address: String,

        /// City added to the query for context
        #[arg(long)]
        city: Option<String>,

        /// Country added to the query for context
        #[arg(long)]
        country: Option<String>,

        /// Restrict results to a country (ISO 3166-1 alpha-2)
        #[arg(long)]
        country_code: Option<String>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<u8>,

        /// Response language (e.g., "es-CL")
        #[arg(long)]
        language: Option<String>,

        /// Skip the cache lookup
        #[arg(long)]
        no_cache: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find the address at a position
    ///
    /// Example: geocode-cli reverse -38.7397 -72.5984
    #[command(allow_negative_numbers = true)]
    Reverse {
        /// Latitude in degrees
        latitude: String,

        /// Longitude in degrees
        longitude: String,

        /// Response language (e.g., "es-CL")
        #[arg(long)]
        language: Option<String>,

        /// Omit the state from the address
        #[arg(long)]
        short: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Great-circle distance between two positions in kilometers
    #[command(allow_negative_numbers = true)]
    Distance {
        /// Latitude of the first position
        lat1: String,
        /// Longitude of the first position
        lng1: String,
        /// Latitude of the second position
        lat2: String,
        /// Longitude of the second position
        lng2: String,
    },

    /// Format address components without querying the service
    Format {
        #[arg(long)]
        road: Option<String>,
        #[arg(long)]
        house_number: Option<String>,
        #[arg(long)]
        neighbourhood: Option<String>,
        #[arg(long)]
        suburb: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,

        /// Shown when no component is given
        #[arg(long)]
        display_name: Option<String>,

        /// Omit the state
        #[arg(long)]
        short: bool,
    },
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Load client configuration
///
/// Defaults, then the config file, then `GEOCODING_*` environment variables
/// (nested keys use `__`, e.g. `GEOCODING_RETRY__MAX_ATTEMPTS`).
fn load_config(path: Option<&Path>) -> Result<GeocodingConfig, config::ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("geocoding").required(false),
    };

    config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("GEOCODING")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

/// Print a lookup failure for a person and pick the exit status
fn report(err: &GeocodingError) -> ExitCode {
    tracing::debug!(error = ?err, "Lookup failed");
    println!("❌ {} ({})", err.code().user_hint(), err.code());
    println!("   {err}");
    if err.is_retryable() {
        println!("   This is usually temporary; try again in a moment.");
    }
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter_from_verbosity(cli.verbose)));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            cli.json_logs
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!cli.json_logs)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    match cli.command {
        Commands::Search {
            address,
            city,
            country,
            country_code,
            limit,
            language,
            no_cache,
            json,
        } => {
            let client = NominatimGeocodingClient::new(&load_config(cli.config.as_deref())?)?;
            let options = GeocodeOptions {
                city,
                country,
                country_code,
                limit,
                language,
                use_cache: !no_cache,
            };

            let results = match client.geocode(&address, &options).await {
                Ok(results) => results,
                Err(e) => return Ok(report(&e)),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("🔎 {} result(s) for \"{address}\":", results.len());
                for (i, result) in results.iter().enumerate() {
                    println!();
                    println!("{}. {}", i + 1, result.formatted());
                    println!("   📍 {}", result.location());
                    println!("   ⭐ Importance: {:.2}", result.importance);
                    if let Some(kind) = &result.kind {
                        println!("   🏷️  Type: {kind}");
                    }
                }
            }
            tracing::info!(stats = ?client.stats(), "Done");
        },

        Commands::Reverse {
            latitude,
            longitude,
            language,
            short,
            json,
        } => {
            let location = match parse_coordinates(&latitude, &longitude) {
                Ok(location) => location,
                Err(e) => return Ok(report(&e)),
            };
            let client = NominatimGeocodingClient::new(&load_config(cli.config.as_deref())?)?;
            let options = ReverseOptions {
                language,
                ..ReverseOptions::default()
            };

            let result = match client
                .reverse_geocode(location.latitude(), location.longitude(), &options)
                .await
            {
                Ok(result) => result,
                Err(e) => return Ok(report(&e)),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if short {
                println!("📍 {}", result.formatted_short());
            } else {
                println!("📍 {}", result.formatted());
            }
        },

        Commands::Distance {
            lat1,
            lng1,
            lat2,
            lng2,
        } => {
            let (from, to) = match (
                parse_coordinates(&lat1, &lng1),
                parse_coordinates(&lat2, &lng2),
            ) {
                (Ok(from), Ok(to)) => (from, to),
                (Err(e), _) | (_, Err(e)) => return Ok(report(&e)),
            };
            let km = calculate_distance(
                from.latitude(),
                from.longitude(),
                to.latitude(),
                to.longitude(),
            );
            println!("📏 {km:.2} km");
        },

        Commands::Format {
            road,
            house_number,
            neighbourhood,
            suburb,
            city,
            state,
            display_name,
            short,
        } => {
            let address = AddressParts {
                road,
                house_number,
                neighbourhood,
                suburb,
                city,
                state,
                ..AddressParts::default()
            };
            let formatted = if short {
                format_short_address(&address, display_name.as_deref())
            } else {
                format_address(&address, display_name.as_deref())
            };
            println!("{formatted}");
        },
    }

    Ok(ExitCode::SUCCESS)
}
