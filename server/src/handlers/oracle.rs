use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::app_state::{AppState, FailedOracle};
use crate::models::{ApiResponse, Identity};
use crate::services::{OracleEntry, OracleRegistry};

#[derive(Debug, Serialize)]
pub struct OracleListing {
    pub bootstrapped_at: DateTime<Utc>,
    pub registered: Vec<OracleEntry>,
    pub failed: Vec<FailedOracle>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexMatches {
    pub index: u8,
    pub oracles: Vec<Identity>,
}

pub async fn root() -> &'static str {
    "FlightSurety Oracle Relay"
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn api_info() -> Json<Value> {
    Json(json!({
        "message": "An API for use with your Dapp!"
    }))
}

pub async fn list_oracles(State(state): State<AppState>) -> Json<ApiResponse<OracleListing>> {
    Json(ApiResponse::ok(OracleListing {
        bootstrapped_at: state.bootstrapped_at,
        registered: state.registry.entries().to_vec(),
        failed: state.failures.as_ref().clone(),
    }))
}

/// Oracles that would answer a request for `index`.
pub async fn oracles_for_index(
    State(registry): State<Arc<OracleRegistry>>,
    Path(index): Path<String>,
) -> (StatusCode, Json<ApiResponse<IndexMatches>>) {
    let Ok(index) = index.parse::<u8>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err(format!("index must be 0-255, got `{index}`"))),
        );
    };

    (
        StatusCode::OK,
        Json(ApiResponse::ok(IndexMatches {
            index,
            oracles: registry.matching_identities(index),
        })),
    )
}
