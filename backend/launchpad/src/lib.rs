//! Agent Launchpad contract client.
//!
//! A typed facade over the launchpad and AMM contracts ([`client`],
//! [`writes`]), dashboard aggregation, a per-wallet transaction log, and an
//! event indexer with a small REST API in front of it all.

pub mod abi;
pub mod agents;
pub mod api;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod errors;
pub mod events;
pub mod indexer;
pub mod math;
pub mod networks;
pub mod rpc;
pub mod txlog;
pub mod units;
pub mod views;
pub mod writes;

#[cfg(test)]
mod testing;

pub use client::{LaunchpadClient, TxSettings};
pub use errors::{LaunchpadError, Result};
