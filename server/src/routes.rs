//! Route definitions for the oracle relay API

use axum::{routing::get, Router};

use crate::app_state::AppState;
use crate::handlers::*;

pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api", get(api_info))
        .merge(oracle_routes())
}

// Oracle routes
pub fn oracle_routes() -> Router<AppState> {
    Router::new()
        .route("/api/oracles", get(list_oracles))
        .route("/api/oracles/index/:index", get(oracles_for_index))
}
