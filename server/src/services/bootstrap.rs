//! Startup registration of the oracle pool.
//!
//! Every candidate account runs its own pipeline (pay the fee, then fetch the
//! assigned indexes). Pipelines run concurrently and fail independently; a
//! failed candidate is logged and left out of the registry, never retried.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::OraclePoolConfig;
use crate::error::RelayError;
use crate::ledger::{LedgerClient, Wei};
use crate::models::{Identity, IndexAssignment, RegistrationStatus};
use crate::services::registry::OracleRegistry;

/// A candidate that did not make it into the registry.
#[derive(Debug)]
pub struct BootstrapFailure {
    pub identity: Identity,
    pub error: RelayError,
}

#[derive(Debug)]
pub struct BootstrapReport {
    pub registry: OracleRegistry,
    pub failures: Vec<BootstrapFailure>,
    pub fee: Wei,
    pub completed_at: DateTime<Utc>,
}

pub struct BootstrapSequencer {
    ledger: Arc<dyn LedgerClient>,
    pool: OraclePoolConfig,
}

impl BootstrapSequencer {
    pub fn new(ledger: Arc<dyn LedgerClient>, pool: OraclePoolConfig) -> Self {
        Self { ledger, pool }
    }

    /// The slice of node accounts reserved for oracles.
    pub async fn acquire_candidates(&self) -> Result<Vec<Identity>, RelayError> {
        let accounts = self
            .ledger
            .accounts()
            .await
            .map_err(RelayError::AccountsUnavailable)?;

        let candidates: Vec<Identity> = accounts
            .into_iter()
            .skip(self.pool.offset)
            .take(self.pool.count)
            .collect();

        if candidates.len() < self.pool.count {
            warn!(
                requested = self.pool.count,
                available = candidates.len(),
                offset = self.pool.offset,
                "fewer oracle accounts available than requested"
            );
        }

        Ok(candidates)
    }

    pub async fn run(&self) -> Result<BootstrapReport, RelayError> {
        let candidates = self.acquire_candidates().await?;

        // Read once per run and shared by every pipeline.
        let fee = self
            .ledger
            .registration_fee()
            .await
            .map_err(RelayError::FeeUnavailable)?;

        info!(
            candidates = candidates.len(),
            fee = %fee,
            concurrency = self.pool.concurrency,
            "registering oracles"
        );

        let permits = Arc::new(Semaphore::new(self.pool.concurrency.max(1)));
        let mut pipelines = JoinSet::new();
        let mut owners = HashMap::new();
        for (position, identity) in candidates.into_iter().enumerate() {
            let ledger = self.ledger.clone();
            let permits = permits.clone();
            let task_identity = identity.clone();
            let handle = pipelines.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                debug!(oracle = %task_identity, status = %RegistrationStatus::Unregistered, "starting registration");
                register(ledger.as_ref(), &task_identity, fee).await
            });
            owners.insert(handle.id(), (position, identity));
        }

        let mut settled = Vec::new();
        while let Some(joined) = pipelines.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    if let Some((position, identity)) = owners.remove(&id) {
                        settled.push((position, identity, outcome));
                    }
                }
                Err(join_error) => {
                    let Some((position, identity)) = owners.remove(&join_error.id()) else {
                        error!(error = %join_error, "unknown registration pipeline failed");
                        continue;
                    };
                    error!(oracle = %identity, error = %join_error, "oracle registration pipeline panicked");
                    let reason = join_error.to_string();
                    settled.push((
                        position,
                        identity.clone(),
                        Err(RelayError::PipelineAborted { identity, reason }),
                    ));
                }
            }
        }
        // Record in account order so the registry is deterministic.
        settled.sort_by_key(|(position, _, _)| *position);

        let mut registry = OracleRegistry::new();
        let mut failures = Vec::new();
        for (_, identity, outcome) in settled {
            match outcome {
                Ok(indexes) => {
                    registry.record(identity.clone(), indexes)?;
                    info!(
                        oracle = %identity,
                        indexes = %indexes,
                        status = %RegistrationStatus::Registered,
                        "oracle registered"
                    );
                }
                Err(err) => {
                    warn!(
                        oracle = %identity,
                        error = %err,
                        status = %RegistrationStatus::Failed,
                        "oracle left out of registry"
                    );
                    failures.push(BootstrapFailure {
                        identity,
                        error: err,
                    });
                }
            }
        }

        info!(
            registered = registry.len(),
            failed = failures.len(),
            "oracle bootstrap complete"
        );

        Ok(BootstrapReport {
            registry,
            failures,
            fee,
            completed_at: Utc::now(),
        })
    }
}

async fn register(
    ledger: &dyn LedgerClient,
    identity: &Identity,
    fee: Wei,
) -> Result<IndexAssignment, RelayError> {
    ledger
        .register_oracle(identity, fee)
        .await
        .map_err(|source| RelayError::RegistrationFailed {
            identity: identity.clone(),
            source,
        })?;
    debug!(oracle = %identity, status = %RegistrationStatus::FeePaidPending, "registration fee paid");

    ledger
        .assigned_indexes(identity)
        .await
        .map_err(|source| RelayError::IndexFetchFailed {
            identity: identity.clone(),
            source,
        })
}
