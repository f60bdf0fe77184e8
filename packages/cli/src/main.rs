#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the city pulse incident pipeline.
//!
//! Provides subcommands for serving the HTTP API, watching the live feed
//! from a terminal, printing headline stats or the demo data set, and
//! writing events back to
//! the feed. The feed is configured through `CITY_PULSE_DATABASE_URL`,
//! `CITY_PULSE_FEED_NODE` and `CITY_PULSE_AUTH_TOKEN`.

use city_pulse_incident_models::Severity;
use clap::{Parser, Subcommand};

mod commands;

/// Monitor city incidents from a live event feed.
#[derive(Parser)]
#[command(name = "city_pulse")]
#[command(about = "Monitor city incidents from a live event feed")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Use an in-process feed instead of the configured one.
        #[arg(long)]
        memory: bool,
    },

    /// Print every published snapshot until interrupted.
    Watch {
        /// Number of incidents listed per snapshot.
        #[arg(long, default_value_t = 5)]
        top: usize,
    },

    /// Print severity counts, the last hour's count and the categories of
    /// the in-city incidents from the first published snapshot.
    Stats {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the demo incidents and analytics.
    Demo {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Report a new incident.
    Report {
        /// Latitude.
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude.
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// What happened.
        #[arg(long)]
        description: String,

        /// Severity estimate ("low", "medium", "high").
        #[arg(long, default_value = "medium")]
        severity: Severity,

        /// Category label.
        #[arg(long)]
        category: Option<String>,

        /// Short headline (defaults to the description).
        #[arg(long)]
        headline: Option<String>,

        /// Confidence between 0 and 1.
        #[arg(long)]
        confidence: Option<f64>,

        /// Explicit impact score.
        #[arg(long)]
        impact: Option<i64>,
    },

    /// Update fields of an existing incident.
    Update {
        /// Feed key of the incident.
        id: String,

        /// New description.
        #[arg(long)]
        description: Option<String>,

        /// New headline.
        #[arg(long)]
        headline: Option<String>,

        /// New category.
        #[arg(long)]
        category: Option<String>,

        /// New confidence.
        #[arg(long)]
        confidence: Option<f64>,

        /// New impact score.
        #[arg(long)]
        impact: Option<i64>,

        /// New latitude (requires `--lng`).
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// New longitude (requires `--lat`).
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },

    /// Delete an incident.
    Delete {
        /// Feed key of the incident.
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { memory } => commands::serve(memory).await,
        Commands::Watch { top } => commands::watch(top).await,
        Commands::Stats { json } => commands::stats(json).await,
        Commands::Demo { json } => commands::demo(json),
        Commands::Report {
            lat,
            lng,
            description,
            severity,
            category,
            headline,
            confidence,
            impact,
        } => {
            commands::report(commands::IncidentDraft {
                lat,
                lng,
                description,
                severity,
                category,
                headline,
                confidence,
                impact,
            })
            .await
        }
        Commands::Update {
            id,
            description,
            headline,
            category,
            confidence,
            impact,
            lat,
            lng,
        } => {
            commands::update(
                &id,
                commands::IncidentUpdate {
                    description,
                    headline,
                    category,
                    confidence,
                    impact,
                    lat,
                    lng,
                },
            )
            .await
        }
        Commands::Delete { id } => commands::delete(&id).await,
    }
}
