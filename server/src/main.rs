//! FlightSurety Oracle Relay Server
//!
//! Bootstraps the oracle pool, then relays status responses for every
//! `OracleRequest` the app contract emits, while serving a small status API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flightsurety_oracle_server::app_state::AppState;
use flightsurety_oracle_server::config::RelayConfig;
use flightsurety_oracle_server::ledger::{JsonRpcLedger, LedgerClient};
use flightsurety_oracle_server::routes;
use flightsurety_oracle_server::services::{
    resolver_for, supervise, BootstrapSequencer, EventDispatcher, OracleService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env().context("invalid relay configuration")?;
    info!(
        rpc_url = %config.ledger.rpc_url,
        app_address = %config.ledger.app_address,
        "starting oracle relay"
    );

    let ledger: Arc<dyn LedgerClient> = Arc::new(JsonRpcLedger::new(config.ledger.clone()));

    let report = BootstrapSequencer::new(ledger.clone(), config.pool.clone())
        .run()
        .await
        .context("oracle bootstrap failed")?;
    let state = AppState::from_report(report);

    // Relay status requests in the background for the life of the process.
    let oracle_service = OracleService::new(ledger.clone(), resolver_for(config.status));
    let dispatcher = Arc::new(EventDispatcher::new(state.registry.clone(), oracle_service));
    tokio::spawn(supervise(ledger, dispatcher, config.request_start));

    let app = routes::app_routes()
        .with_state(state)
        .layer(build_cors_layer(&config.http.cors_allowed_origins))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], config.http.port));
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
