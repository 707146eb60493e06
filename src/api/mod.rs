//! Remote API contract.
//!
//! The queue runs locally; this module describes the backend it would talk to
//! once enabled: the endpoint table, bearer-token handling and a client that
//! works over any [`Transport`]. No HTTP transport ships with the crate.

mod client;
mod endpoints;
mod tokens;

pub use client::*;
pub use endpoints::*;
pub use tokens::*;
