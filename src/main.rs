// =============================================================================
// Finddy Stock Analyzer — Main Entry Point
// =============================================================================
//
// Serves the single-page stock analysis dashboard plus a small JSON API.
// Market data is fetched per request from a Yahoo-compatible chart endpoint;
// nothing is persisted besides the optional config file.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod chart;
mod error;
mod indicators;
mod market_data;
mod runtime_config;
mod session;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::DashboardConfig;

const DEFAULT_CONFIG_PATH: &str = "finddy_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Finddy Stock Analyzer — Starting Up               ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    // ── 2. Configuration ─────────────────────────────────────────────────
    let config_path = std::env::var("FINDDY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = match DashboardConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Failed to load config, using defaults");
            let defaults = DashboardConfig::default();
            if !config_path.exists() {
                // Leave an editable template behind for the next start.
                if let Err(e) = defaults.save(&config_path) {
                    warn!(error = %format!("{e:#}"), "could not write default config");
                }
            }
            defaults
        }
    };
    config.apply_env_overrides();
    config.validate().context("invalid dashboard configuration")?;

    info!(
        default_ticker = %config.default_ticker,
        provider = %config.provider_base_url,
        window_min = config.window_min,
        window_max = config.window_max,
        "Configuration loaded"
    );

    // ── 3. Shared state & router ─────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config)?);
    let app = api::router(state.clone());

    // ── 4. Serve until Ctrl+C ────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Dashboard listening. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("server error")?;

    info!(
        analyses_served = state.analyses_served(),
        sessions = state.sessions.len(),
        "Finddy shut down complete."
    );
    Ok(())
}
