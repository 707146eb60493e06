//! Queue and ticket engine.
//!
//! Every mutating operation runs as a single [`DataStore::update_data`] call,
//! so each one either commits completely or leaves the document untouched.
//!
//! Ticket lifecycle: `waiting -> in_service -> done`, with
//! `in_service -> waiting` for redirects. Completed tickets move from the
//! queue to the front of the history.

mod accounts;
mod archive;
pub mod attachments;
pub mod receipt;
pub mod routing;
pub mod stats;
mod tickets;

#[cfg(test)]
mod testing;

pub use attachments::read_attachments;
pub use tickets::select_next;

use std::sync::Arc;

use serde_json::Value;

use crate::errors::AppError;
use crate::models::{AccountView, Document, User};
use crate::store::DataStore;

/// Institution named on receipts when none is configured.
pub const DEFAULT_INSTITUTION: &str = "Instituto Medio Tecnico Sao Benedito";
/// Attendant name used when a caller passes a blank one.
pub const DEFAULT_ATTENDANT: &str = "Atendente";
/// Requester name used when a ticket is issued with a blank one.
pub const DEFAULT_REQUESTER: &str = "Utente";
/// Note recorded on a redirect without one.
pub const DEFAULT_REDIRECT_NOTE: &str = "Reencaminhado";

/// Engine behavior knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub institution_name: String,
    /// Zero both code counters when a day is archived
    pub reset_counters_on_archive: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            institution_name: DEFAULT_INSTITUTION.to_string(),
            reset_counters_on_archive: true,
        }
    }
}

/// Business operations over the shared document store.
#[derive(Clone)]
pub struct QueueEngine {
    store: Arc<DataStore>,
    settings: EngineSettings,
}

impl QueueEngine {
    pub fn new(store: Arc<DataStore>, settings: EngineSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Owned copy of the whole document.
    pub async fn snapshot(&self) -> Result<Document, AppError> {
        self.store.read().await
    }

    /// The document as shown to dashboards: accounts without credentials.
    pub async fn public_snapshot(&self) -> Result<Value, AppError> {
        let document = self.store.read().await?;
        let accounts: Vec<AccountView> = document.users.iter().map(User::view).collect();

        let mut value = serde_json::to_value(&document)?;
        value["users"] = serde_json::to_value(accounts)?;
        Ok(value)
    }
}

fn attendant_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        DEFAULT_ATTENDANT.to_string()
    } else {
        trimmed.to_string()
    }
}

fn required_id(value: &str, what: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("Invalid {}.", what)));
    }
    Ok(trimmed.to_string())
}
