//! Fixtures shared by the engine's unit tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{EngineSettings, QueueEngine};
use crate::db::MemoryKv;
use crate::models::{Department, Ticket, TicketStatus};
use crate::notifier::ChangeNotifier;
use crate::store::DataStore;

pub fn memory_engine(settings: EngineSettings) -> QueueEngine {
    let store = DataStore::new(Arc::new(MemoryKv::new()), ChangeNotifier::default());
    QueueEngine::new(Arc::new(store), settings)
}

/// A waiting ticket with the given code, created at `created_at`.
pub fn ticket(code: &str, department: Department, created_at: DateTime<Utc>) -> Ticket {
    Ticket {
        id: code.to_lowercase(),
        code: code.to_string(),
        service: "Matricula".to_string(),
        user_email: "y@sb.com".to_string(),
        user_name: "Y".to_string(),
        status: TicketStatus::Waiting,
        department,
        counter_number: department.counter_number(),
        counter_name: department.counter_name(),
        created_at,
        called_at: None,
        received_at: None,
        completed_at: None,
        attended_by: None,
        notes: String::new(),
        service_duration_sec: None,
        rating: None,
        attachments: Vec::new(),
        receipt: None,
    }
}
