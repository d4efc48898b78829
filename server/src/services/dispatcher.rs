//! Bridges `OracleRequest` events to oracle responses.
//!
//! Events are taken from the stream strictly in delivery order, and each
//! event's matching oracles are computed before the next event is read. The
//! responses for one event form one batch task; batches of different events
//! may overlap in time but never share a flight.
//!
//! Batches are owned by the dispatcher rather than by a single `run`, so a
//! panicking dispatch task leaves them running and the next `run` reaps them.

use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::ledger::{LedgerClient, StartBlock, StatusRequestStream};
use crate::models::{ResponseSubmission, StatusRequest};
use crate::services::oracle_service::{OracleService, SubmissionOutcome};
use crate::services::registry::OracleRegistry;

const DISPATCHER_SUPERVISOR_MAX_BACKOFF_SECONDS: u64 = 30;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    pub events: usize,
    pub unmatched: usize,
    pub stream_errors: usize,
    pub accepted: usize,
    pub invalid: usize,
    pub rejected: usize,
}

impl DispatchSummary {
    fn absorb(&mut self, batch: Result<Vec<SubmissionOutcome>, JoinError>) {
        match batch {
            Ok(outcomes) => {
                for outcome in outcomes {
                    match outcome {
                        SubmissionOutcome::Accepted => self.accepted += 1,
                        SubmissionOutcome::Invalid => self.invalid += 1,
                        SubmissionOutcome::Rejected => self.rejected += 1,
                    }
                }
            }
            Err(join_error) => error!(error = %join_error, "response batch task failed"),
        }
    }
}

pub struct EventDispatcher {
    registry: Arc<OracleRegistry>,
    oracle_service: OracleService,
    last_block: Mutex<Option<u64>>,
    batches: Mutex<JoinSet<Vec<SubmissionOutcome>>>,
}

impl EventDispatcher {
    pub fn new(registry: Arc<OracleRegistry>, oracle_service: OracleService) -> Self {
        Self {
            registry,
            oracle_service,
            last_block: Mutex::new(None),
            batches: Mutex::new(JoinSet::new()),
        }
    }

    /// Block of the most recently delivered event, if any.
    pub async fn last_block(&self) -> Option<u64> {
        *self.last_block.lock().await
    }

    /// One submission per registered oracle holding the requested index.
    pub fn plan(&self, request: &StatusRequest) -> Vec<ResponseSubmission> {
        self.registry
            .matching_identities(request.index)
            .into_iter()
            .map(|identity| self.oracle_service.prepare(identity, request))
            .collect()
    }

    /// Responses still being submitted, including those of earlier runs.
    pub async fn in_flight(&self) -> usize {
        self.batches.lock().await.len()
    }

    /// Consumes `stream` until it ends, then waits for outstanding batches.
    pub async fn run(&self, mut stream: StatusRequestStream) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        while let Some(item) = stream.next().await {
            match item {
                Ok(request) => {
                    summary.events += 1;
                    *self.last_block.lock().await = Some(request.block_number);

                    let batch = self.plan(&request);
                    if batch.is_empty() {
                        summary.unmatched += 1;
                        debug!(
                            index = request.index,
                            flight = %request.flight,
                            block = request.block_number,
                            "no registered oracle holds the requested index"
                        );
                    } else {
                        info!(
                            index = request.index,
                            flight = %request.flight,
                            block = request.block_number,
                            oracles = batch.len(),
                            "status request received; dispatching oracle responses"
                        );
                        let oracle_service = self.oracle_service.clone();
                        self.batches.lock().await.spawn(async move {
                            join_all(
                                batch
                                    .into_iter()
                                    .map(|submission| oracle_service.submit(submission)),
                            )
                            .await
                        });
                    }
                }
                Err(err) => {
                    summary.stream_errors += 1;
                    error!(error = %err, "status request subscription error");
                }
            }

            let mut batches = self.batches.lock().await;
            while let Some(done) = batches.try_join_next() {
                summary.absorb(done);
            }
        }

        let mut batches = self.batches.lock().await;
        while let Some(done) = batches.join_next().await {
            summary.absorb(done);
        }

        summary
    }
}

/// Runs the dispatcher, re-subscribing with backoff if the dispatch task panics.
///
/// A panic resumes from the block of the last delivered event; replaying
/// that block may repeat some responses, which the contract ignores. Batches
/// of earlier events keep running across the restart.
pub async fn supervise(
    ledger: Arc<dyn LedgerClient>,
    dispatcher: Arc<EventDispatcher>,
    start: StartBlock,
) -> DispatchSummary {
    let mut restart_count: u32 = 0;
    let mut from = start;

    loop {
        info!(from = %from, "subscribing to status requests");
        let stream = ledger.status_requests(from);
        let task_dispatcher = dispatcher.clone();
        let handle = tokio::spawn(async move { task_dispatcher.run(stream).await });

        match handle.await {
            Ok(summary) => {
                info!(?summary, "status request subscription ended; stopping supervisor");
                return summary;
            }
            Err(join_error) => {
                if join_error.is_panic() {
                    error!("event dispatcher panicked; restarting");
                } else {
                    error!(error = %join_error, "event dispatcher task failed; restarting");
                }
            }
        }

        if let Some(block) = dispatcher.last_block().await {
            from = StartBlock::Block(block);
        }

        restart_count = restart_count.saturating_add(1);
        let backoff_seconds = (2u64.saturating_pow(restart_count.min(5)))
            .min(DISPATCHER_SUPERVISOR_MAX_BACKOFF_SECONDS);
        warn!(restart_count, backoff_seconds, "event dispatcher restart backoff");
        sleep(Duration::from_secs(backoff_seconds)).await;
    }
}
