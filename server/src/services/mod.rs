//! Relay services: bootstrap, registry, dispatch and response submission

pub mod bootstrap;
pub mod dispatcher;
pub mod oracle_service;
pub mod registry;
pub mod status;

pub use bootstrap::{BootstrapFailure, BootstrapReport, BootstrapSequencer};
pub use dispatcher::{supervise, DispatchSummary, EventDispatcher};
pub use oracle_service::{OracleService, SubmissionOutcome};
pub use registry::{OracleEntry, OracleRegistry};
pub use status::{resolver_for, FixedStatus, RandomStatus, StatusResolver};
