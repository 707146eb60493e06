//! Ticket model and its attachments, rating and receipt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Department;

/// Code prefix for normal tickets.
pub const NORMAL_PREFIX: char = 'N';
/// Code prefix for priority tickets.
pub const PRIORITY_PREFIX: char = 'P';

/// Ticket lifecycle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[serde(alias = "aguardando")]
    Waiting,
    #[serde(alias = "em_atendimento")]
    InService,
    #[serde(alias = "concluido")]
    Done,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Waiting => "waiting",
            TicketStatus::InService => "in_service",
            TicketStatus::Done => "done",
        }
    }
}

/// Customer satisfaction rating, 1 to 5.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub score: f64,
    #[serde(default)]
    pub comment: String,
    pub at: DateTime<Utc>,
}

/// A file submitted with a ticket. `content` holds the base64 payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(alias = "dataUrl", default)]
    pub content: String,
    pub uploaded_at: DateTime<Utc>,
}

/// An attachment as read from disk, before it is stored on a ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentUpload {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub content: String,
}

/// Receipt artifact attached to a completed ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub file_name: String,
    pub format: String,
    pub mime_type: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
}

/// Replacement receipt supplied by a renderer. Missing fields fall back to
/// the plain-text defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPayload {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub data_url: Option<String>,
}

/// A single customer service request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub code: String,
    pub service: String,
    pub user_email: String,
    pub user_name: String,
    pub status: TicketStatus,
    pub department: Department,
    pub counter_number: u8,
    pub counter_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub called_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attended_by: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_duration_sec: Option<u64>,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub receipt: Option<Receipt>,
}

impl Ticket {
    pub fn is_priority(&self) -> bool {
        self.code.starts_with(PRIORITY_PREFIX)
    }

    pub fn is_in_service_by(&self, worker: &str) -> bool {
        self.status == TicketStatus::InService && self.attended_by.as_deref() == Some(worker)
    }
}
