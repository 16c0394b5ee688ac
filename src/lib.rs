//! cardgate - activation server for license cards
//!
//! Clients send encrypted, signed, timestamped requests to activate a card or
//! check its status; responses are encrypted, signed and carry a covert
//! throttle signal.

pub mod activation;
pub mod cache;
pub mod config;
pub mod crypto;
pub mod db;
pub mod envelope;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod replay;
pub mod signal;
