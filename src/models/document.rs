//! The persisted document: the whole queue state in one blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Department, Ticket, TicketStatus, User};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 2;

/// Denormalized summary of the most recent call, for display boards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastCalled {
    pub code: String,
    pub service: String,
    pub counter_name: String,
    pub at: DateTime<Utc>,
}

/// Frozen snapshot of one day of queue activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyArchive {
    pub id: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub queue: Vec<Ticket>,
    #[serde(default)]
    pub history: Vec<Ticket>,
    #[serde(default)]
    pub counter_normal: u32,
    #[serde(default)]
    pub counter_priority: u32,
    pub total_tickets: usize,
}

/// The root document containing all queue data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub schema_version: u32,
    /// Storage revision this copy was read at; tracked by the store, not stored
    #[serde(skip)]
    pub revision: i64,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub counter_normal: u32,
    #[serde(default)]
    pub counter_priority: u32,
    #[serde(default)]
    pub current_ticket_id: Option<String>,
    #[serde(default)]
    pub last_called: Option<LastCalled>,
    /// Most recent first
    #[serde(default)]
    pub daily_archives: Vec<DailyArchive>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub queue: Vec<Ticket>,
    /// Most recently completed first
    #[serde(default)]
    pub history: Vec<Ticket>,
}

impl Document {
    /// An empty document with no accounts.
    pub fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            revision: 0,
            updated_at: Utc::now(),
            counter_normal: 0,
            counter_priority: 0,
            current_ticket_id: None,
            last_called: None,
            daily_archives: Vec::new(),
            users: Vec::new(),
            queue: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn find_ticket(&self, id: &str) -> Option<&Ticket> {
        self.queue
            .iter()
            .chain(self.history.iter())
            .find(|t| t.id == id)
    }

    pub fn find_ticket_mut(&mut self, id: &str) -> Option<&mut Ticket> {
        self.queue
            .iter_mut()
            .chain(self.history.iter_mut())
            .find(|t| t.id == id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn count_by_status(&self, status: TicketStatus) -> usize {
        match status {
            TicketStatus::Done => self.history.len(),
            _ => self.queue.iter().filter(|t| t.status == status).count(),
        }
    }

    pub fn waiting_in(&self, department: Department) -> usize {
        self.queue
            .iter()
            .filter(|t| t.status == TicketStatus::Waiting && t.department == department)
            .count()
    }
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub updated_at: DateTime<Utc>,
}
