//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Identity;
use crate::services::{BootstrapReport, OracleRegistry};

/// An oracle the bootstrap could not register, and why.
#[derive(Debug, Clone, Serialize)]
pub struct FailedOracle {
    pub identity: Identity,
    pub reason: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<OracleRegistry>,
    pub failures: Arc<Vec<FailedOracle>>,
    pub bootstrapped_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        registry: Arc<OracleRegistry>,
        failures: Vec<FailedOracle>,
        bootstrapped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            registry,
            failures: Arc::new(failures),
            bootstrapped_at,
        }
    }

    /// Takes the registry out of `report`, leaving the report's failures as plain reasons.
    pub fn from_report(report: BootstrapReport) -> Self {
        let failures = report
            .failures
            .into_iter()
            .map(|failure| FailedOracle {
                identity: failure.identity,
                reason: failure.error.to_string(),
            })
            .collect();

        Self::new(Arc::new(report.registry), failures, report.completed_at)
    }
}

impl FromRef<AppState> for Arc<OracleRegistry> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.registry.clone()
    }
}
