//! Hoops API
//!
//! REST API and CLI serving basketball rosters and player stats scraped from
//! asia-basket.com.

mod cli;
mod config;
mod error;
mod retry;
mod routes;
mod scraper;
mod types;

use axum::{routing::get, Router};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::routes::AppState;
use crate::scraper::{
    BrowserManager, ChromeLauncher, OrchestratorSettings, ResultCache, ScrapeOrchestrator,
    SessionProvider,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hoops_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = AppConfig::load()?;
    tracing::info!("Configuration loaded");

    match cli.command {
        Commands::Serve { host, port } => run_server(config, host, port).await,
        Commands::Roster { pretty } => cli::run_roster(&config, pretty).await,
        Commands::Player { id, pretty } => cli::run_player(&config, &id, pretty).await,
    }
}

/// Wire the shared browser and caches into an orchestrator.
pub(crate) fn build_orchestrator(config: &AppConfig) -> Arc<ScrapeOrchestrator> {
    let provider: Arc<dyn SessionProvider> =
        Arc::new(BrowserManager::new(ChromeLauncher::new(&config.scraper)));
    let cache = Arc::new(ResultCache::new(
        chrono::Duration::seconds(config.cache.roster_ttl_secs as i64),
        chrono::Duration::seconds(config.cache.detail_ttl_secs as i64),
    ));
    Arc::new(ScrapeOrchestrator::new(
        provider,
        cache,
        OrchestratorSettings::from_config(config),
    ))
}

/// Run the API server.
async fn run_server(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    // Override with CLI args
    if let Some(h) = host {
        config.server.host = h;
    }
    if let Some(p) = port {
        config.server.port = p;
    }

    tracing::info!("Scraping {}", config.scraper.roster_url());
    tracing::info!(
        "Cache TTLs: roster {}s, player details {}s",
        config.cache.roster_ttl_secs,
        config.cache.detail_ttl_secs
    );

    // Browser is launched lazily on the first scrape
    let orchestrator = build_orchestrator(&config);

    // Create application state
    let state = Arc::new(AppState {
        orchestrator: Arc::clone(&orchestrator),
    });

    // Build router
    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/roster", get(routes::roster))
        .route("/player/:id", get(routes::player))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, closing browser");
    orchestrator.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
