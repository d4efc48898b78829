//! Response submission: one oracle answering one status request.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::RelayError;
use crate::ledger::{LedgerClient, TxHash};
use crate::models::{Identity, ResponseSubmission, StatusRequest};
use crate::services::status::StatusResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    Invalid,
    Rejected,
}

#[derive(Clone)]
pub struct OracleService {
    ledger: Arc<dyn LedgerClient>,
    resolver: Arc<dyn StatusResolver>,
}

impl OracleService {
    pub fn new(ledger: Arc<dyn LedgerClient>, resolver: Arc<dyn StatusResolver>) -> Self {
        Self { ledger, resolver }
    }

    /// Builds the response `identity` gives to `request`.
    pub fn prepare(&self, identity: Identity, request: &StatusRequest) -> ResponseSubmission {
        ResponseSubmission {
            identity,
            index: request.index,
            flight: request.flight.clone(),
            status: self.resolver.resolve(request),
        }
    }

    pub fn validate_submission(submission: &ResponseSubmission) -> Result<(), RelayError> {
        if submission.identity.is_empty() {
            return Err(RelayError::InvalidSubmission(
                "oracle identity is empty".to_string(),
            ));
        }
        if !submission.identity.is_well_formed() {
            return Err(RelayError::InvalidSubmission(format!(
                "oracle identity {} is not an address",
                submission.identity
            )));
        }
        if !submission.flight.is_well_formed() {
            return Err(RelayError::InvalidSubmission(format!(
                "malformed flight {}",
                submission.flight
            )));
        }
        Ok(())
    }

    /// Sends one response transaction. No retry is attempted.
    pub async fn try_submit(&self, submission: &ResponseSubmission) -> Result<TxHash, RelayError> {
        Self::validate_submission(submission)?;

        self.ledger
            .submit_status_response(submission)
            .await
            .map_err(|err| RelayError::LedgerRejected {
                identity: submission.identity.clone(),
                reason: err.to_string(),
            })
    }

    /// Like [`try_submit`](Self::try_submit), but logs and swallows the failure.
    pub async fn submit(&self, submission: ResponseSubmission) -> SubmissionOutcome {
        match self.try_submit(&submission).await {
            Ok(tx_hash) => {
                info!(
                    oracle = %submission.identity,
                    index = submission.index,
                    flight = %submission.flight,
                    status = %submission.status,
                    tx_hash = %tx_hash,
                    "oracle response submitted"
                );
                SubmissionOutcome::Accepted
            }
            Err(err @ RelayError::InvalidSubmission(_)) => {
                warn!(error = %err, index = submission.index, "dropping oracle response");
                SubmissionOutcome::Invalid
            }
            Err(err) => {
                error!(
                    error = %err,
                    oracle = %submission.identity,
                    index = submission.index,
                    flight = %submission.flight,
                    "oracle response failed"
                );
                SubmissionOutcome::Rejected
            }
        }
    }
}
