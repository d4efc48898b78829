//! Error taxonomy for the relay.
//!
//! Every variant except `DuplicateIdentity`, `AccountsUnavailable` and
//! `FeeUnavailable` is contained where it happens: the affected identity or
//! submission is dropped and the error is logged.

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::models::Identity;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("identity {0} is already recorded in the oracle registry")]
    DuplicateIdentity(Identity),

    #[error("could not list ledger accounts: {0}")]
    AccountsUnavailable(#[source] LedgerError),

    #[error("could not read the oracle registration fee: {0}")]
    FeeUnavailable(#[source] LedgerError),

    #[error("registration of oracle {identity} failed: {source}")]
    RegistrationFailed {
        identity: Identity,
        #[source]
        source: LedgerError,
    },

    #[error("fetching indexes for oracle {identity} failed: {source}")]
    IndexFetchFailed {
        identity: Identity,
        #[source]
        source: LedgerError,
    },

    #[error("registration pipeline for oracle {identity} did not finish: {reason}")]
    PipelineAborted { identity: Identity, reason: String },

    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("ledger rejected response from oracle {identity}: {reason}")]
    LedgerRejected { identity: Identity, reason: String },
}

impl RelayError {
    /// Errors that mean the relay itself is broken rather than one identity or submission.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RelayError::DuplicateIdentity(_)
                | RelayError::AccountsUnavailable(_)
                | RelayError::FeeUnavailable(_)
        )
    }
}
