//! FlightSurety Oracle Relay Library
//!
//! Registers a pool of oracle accounts with the FlightSuretyApp contract and
//! answers its `OracleRequest` events with flight status responses.

pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod services;
