//! IMTSB queue store.
//!
//! A local queue-management engine for a service counter: customers draw
//! tickets, workers call and serve them, admins read statistics. All state
//! lives in one revisioned JSON document behind a key-value store.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod errors;
pub mod export;
pub mod models;
pub mod notifier;
pub mod response;
pub mod session;
pub mod store;
