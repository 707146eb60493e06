//! Data models for the queue store.
//!
//! Field names serialize in camelCase so stored documents stay readable by the
//! dashboards that consume snapshots.

mod department;
mod document;
mod session;
mod ticket;
mod user;

pub use department::*;
pub use document::*;
pub use session::*;
pub use ticket::*;
pub use user::*;
