//! In-memory ledger that records every call, for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use super::{LedgerClient, LedgerError, StartBlock, StatusRequestStream, TxHash, Wei};
use crate::models::{Identity, IndexAssignment, ResponseSubmission, StatusRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Accounts,
    RegistrationFee,
    RegisterOracle(Identity, Wei),
    AssignedIndexes(Identity),
    SubmitStatusResponse(ResponseSubmission),
    StatusRequests(StartBlock),
}

#[derive(Debug, Clone)]
pub enum MockItem {
    Event(StatusRequest),
    Error(String),
    /// Panics when polled, on the first subscription only.
    Panic,
}

#[derive(Default)]
pub struct MockLedger {
    accounts: Vec<Identity>,
    fee: Wei,
    indexes: HashMap<Identity, IndexAssignment>,
    failing_registrations: HashSet<Identity>,
    failing_index_fetches: HashSet<Identity>,
    rejected_responses: HashSet<Identity>,
    panicking_registrations: HashSet<Identity>,
    fee_unavailable: bool,
    registration_delay: Option<Duration>,
    response_delay: Option<Duration>,
    registrations_in_flight: AtomicUsize,
    peak_registrations: AtomicUsize,
    items: Vec<MockItem>,
    panic_armed: AtomicBool,
    calls: Mutex<Vec<LedgerCall>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            fee: 1_000_000_000_000_000_000,
            ..Self::default()
        }
    }

    /// Adds a node account that registers successfully with `indexes`.
    pub fn with_oracle(mut self, identity: &Identity, indexes: [u8; 3]) -> Self {
        self.accounts.push(identity.clone());
        self.indexes.insert(identity.clone(), IndexAssignment::from(indexes));
        self
    }

    pub fn with_account(mut self, identity: &Identity) -> Self {
        self.accounts.push(identity.clone());
        self
    }

    pub fn fail_registration(mut self, identity: &Identity) -> Self {
        self.failing_registrations.insert(identity.clone());
        self
    }

    pub fn fail_index_fetch(mut self, identity: &Identity) -> Self {
        self.failing_index_fetches.insert(identity.clone());
        self
    }

    pub fn reject_responses_from(mut self, identity: &Identity) -> Self {
        self.rejected_responses.insert(identity.clone());
        self
    }

    pub fn panic_on_registration(mut self, identity: &Identity) -> Self {
        self.panicking_registrations.insert(identity.clone());
        self
    }

    pub fn with_registration_delay(mut self, delay: Duration) -> Self {
        self.registration_delay = Some(delay);
        self
    }

    /// Responses are recorded only once the delay has elapsed.
    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = Some(delay);
        self
    }

    pub fn without_fee(mut self) -> Self {
        self.fee_unavailable = true;
        self
    }

    pub fn with_event(mut self, request: StatusRequest) -> Self {
        self.items.push(MockItem::Event(request));
        self
    }

    pub fn with_stream_error(mut self, message: &str) -> Self {
        self.items.push(MockItem::Error(message.to_string()));
        self
    }

    pub fn with_stream_panic(mut self) -> Self {
        self.items.push(MockItem::Panic);
        self.panic_armed = AtomicBool::new(true);
        self
    }

    /// Highest number of `register_oracle` calls seen running at once.
    pub fn peak_registrations(&self) -> usize {
        self.peak_registrations.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&LedgerCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| predicate(*call)).count()
    }

    pub fn submissions(&self) -> Vec<ResponseSubmission> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                LedgerCall::SubmitStatusResponse(submission) => Some(submission),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: LedgerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn reverted(reason: &str) -> LedgerError {
    LedgerError::Rpc {
        code: -32000,
        message: format!("VM Exception while processing transaction: revert {reason}"),
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn accounts(&self) -> Result<Vec<Identity>, LedgerError> {
        self.record(LedgerCall::Accounts);
        Ok(self.accounts.clone())
    }

    async fn registration_fee(&self) -> Result<Wei, LedgerError> {
        self.record(LedgerCall::RegistrationFee);
        if self.fee_unavailable {
            return Err(LedgerError::Malformed("fee unavailable".to_string()));
        }
        Ok(self.fee)
    }

    async fn register_oracle(&self, identity: &Identity, fee: Wei) -> Result<TxHash, LedgerError> {
        self.record(LedgerCall::RegisterOracle(identity.clone(), fee));
        if self.panicking_registrations.contains(identity) {
            panic!("registration of {identity} blew up");
        }

        let running = self.registrations_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_registrations.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.registration_delay {
            tokio::time::sleep(delay).await;
        }
        self.registrations_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_registrations.contains(identity) {
            return Err(reverted("Registration fee is required"));
        }
        Ok(format!("0xregister-{identity}"))
    }

    async fn assigned_indexes(&self, identity: &Identity) -> Result<IndexAssignment, LedgerError> {
        self.record(LedgerCall::AssignedIndexes(identity.clone()));
        if self.failing_index_fetches.contains(identity) {
            return Err(reverted("Not registered as an oracle"));
        }
        self.indexes
            .get(identity)
            .copied()
            .ok_or_else(|| reverted("Not registered as an oracle"))
    }

    async fn submit_status_response(
        &self,
        submission: &ResponseSubmission,
    ) -> Result<TxHash, LedgerError> {
        if let Some(delay) = self.response_delay {
            tokio::time::sleep(delay).await;
        }
        self.record(LedgerCall::SubmitStatusResponse(submission.clone()));
        if self.rejected_responses.contains(&submission.identity) {
            return Err(reverted("Flight or timestamp do not match oracle request"));
        }
        Ok(format!("0xresponse-{}", submission.identity))
    }

    fn status_requests(&self, from: StartBlock) -> StatusRequestStream {
        self.record(LedgerCall::StatusRequests(from));
        let may_panic = self.panic_armed.swap(false, Ordering::SeqCst);
        let items: Vec<MockItem> = self
            .items
            .iter()
            .filter(|item| match item {
                MockItem::Event(request) => match from {
                    StartBlock::Block(block) => request.block_number >= block,
                    StartBlock::Genesis | StartBlock::Latest => true,
                },
                MockItem::Error(_) => true,
                MockItem::Panic => may_panic,
            })
            .cloned()
            .collect();

        stream::iter(items)
            .map(|item| match item {
                MockItem::Event(request) => Ok(request),
                MockItem::Error(message) => Err(LedgerError::Malformed(message)),
                MockItem::Panic => panic!("status request subscription blew up"),
            })
            .boxed()
    }
}
