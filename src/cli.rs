//! CLI commands for hoops-api.
//!
//! Supports API server mode and one-shot roster or player scrapes.

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::AppConfig;
use crate::types::{PlayerResponse, RosterResponse};

#[derive(Parser)]
#[command(name = "hoops-api")]
#[command(version, about = "Hoops: asia-basket.com roster and player stats API and CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to; overrides config
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to; overrides config
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Scrape the full roster and print it as JSON
    Roster {
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Scrape one player's details and print them as JSON
    Player {
        /// Player ID (trailing segment of the profile URL)
        #[arg(value_name = "ID")]
        id: String,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

/// Run a one-shot roster scrape.
pub async fn run_roster(config: &AppConfig, pretty: bool) -> anyhow::Result<()> {
    let orchestrator = crate::build_orchestrator(config);
    eprintln!("Scraping roster from {}", config.scraper.roster_url());

    let result = orchestrator.fetch_roster().await;
    orchestrator.shutdown().await;
    let fetched = result?;

    let response = RosterResponse::from(&fetched);
    eprintln!(
        "Players: {} (expected {}, partial: {})",
        response.players.len(),
        response
            .expected
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        response.partial
    );
    print_json(&response, pretty)
}

/// Run a one-shot player detail scrape.
pub async fn run_player(config: &AppConfig, id: &str, pretty: bool) -> anyhow::Result<()> {
    let id = id.trim();
    if id.is_empty() {
        anyhow::bail!("Player ID is required");
    }

    let orchestrator = crate::build_orchestrator(config);
    eprintln!("Scraping player {}", id);

    let fetched = orchestrator.fetch_detail(id).await;
    orchestrator.shutdown().await;

    if let Some(reason) = fetched.failure() {
        eprintln!("Warning: {}", reason);
    }
    print_json(&PlayerResponse::from(&fetched), pretty)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
