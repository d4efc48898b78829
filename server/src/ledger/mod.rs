//! Boundary to the FlightSurety app contract.
//!
//! The relay only ever talks to the ledger through [`LedgerClient`], so the
//! bootstrap and dispatch logic can run against the JSON-RPC client in
//! production and against an in-memory ledger in tests.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::models::{Identity, IndexAssignment, ResponseSubmission, StatusRequest};

pub mod abi;
#[cfg(test)]
pub mod mock;
pub mod rpc;

pub use rpc::JsonRpcLedger;

/// Amount in wei.
pub type Wei = u128;

/// Transaction hash as reported by the node.
pub type TxHash = String;

/// Lazy, never-ending sequence of `OracleRequest` events.
pub type StatusRequestStream = BoxStream<'static, Result<StatusRequest, LedgerError>>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ledger RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },

    #[error("no receipt for transaction {tx_hash} after {attempts} polls")]
    ReceiptTimeout { tx_hash: TxHash, attempts: u32 },

    #[error("malformed ledger response: {0}")]
    Malformed(String),
}

/// First block a status-request subscription reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartBlock {
    Genesis,
    Latest,
    Block(u64),
}

impl StartBlock {
    pub fn resolve(self, latest: u64) -> u64 {
        match self {
            StartBlock::Genesis => 0,
            StartBlock::Latest => latest,
            StartBlock::Block(block) => block,
        }
    }
}

impl fmt::Display for StartBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartBlock::Genesis => f.write_str("genesis"),
            StartBlock::Latest => f.write_str("latest"),
            StartBlock::Block(block) => write!(f, "{block}"),
        }
    }
}

impl FromStr for StartBlock {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "genesis" | "earliest" | "0" => Ok(StartBlock::Genesis),
            "latest" => Ok(StartBlock::Latest),
            other => other
                .parse::<u64>()
                .map(StartBlock::Block)
                .map_err(|_| format!("expected `genesis`, `latest` or a block number, got `{other}`")),
        }
    }
}

/// Contract methods and events the relay consumes.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Accounts the node manages, in node order.
    async fn accounts(&self) -> Result<Vec<Identity>, LedgerError>;

    async fn registration_fee(&self) -> Result<Wei, LedgerError>;

    async fn register_oracle(&self, identity: &Identity, fee: Wei) -> Result<TxHash, LedgerError>;

    /// Indexes the contract assigned to `identity`, queried as that identity.
    async fn assigned_indexes(&self, identity: &Identity) -> Result<IndexAssignment, LedgerError>;

    async fn submit_status_response(
        &self,
        submission: &ResponseSubmission,
    ) -> Result<TxHash, LedgerError>;

    /// Opens a new subscription. A closed stream cannot be resumed; open another one.
    fn status_requests(&self, from: StartBlock) -> StatusRequestStream;
}
