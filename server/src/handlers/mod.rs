//! API handlers for the oracle relay

pub mod oracle;

pub use oracle::{api_info, health_check, list_oracles, oracles_for_index, root};
