//! History export as CSV.

use std::io::Write;

use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::AppError;
use crate::models::Ticket;

pub const HEADER: [&str; 11] = [
    "code",
    "service",
    "requester",
    "email",
    "attendant",
    "issued",
    "completed",
    "duration",
    "rating",
    "comment",
    "attachments",
];

const EMPTY: &str = "-";

/// `historico_<date>.csv`
pub fn history_file_name(date: NaiveDate) -> String {
    format!("historico_{}.csv", date.format("%Y-%m-%d"))
}

/// Write `history` as CSV, one row per ticket in the given order.
pub fn write_history_csv<W: Write>(history: &[Ticket], writer: W) -> Result<(), AppError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;

    for ticket in history {
        let rating = ticket.rating.as_ref();
        let attachments = ticket
            .attachments
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        csv.write_record([
            ticket.code.clone(),
            ticket.service.clone(),
            or_empty(&ticket.user_name),
            or_empty(&ticket.user_email),
            ticket
                .attended_by
                .clone()
                .unwrap_or_else(|| EMPTY.to_string()),
            timestamp(Some(ticket.created_at)),
            timestamp(ticket.completed_at),
            ticket
                .service_duration_sec
                .map(|d| d.to_string())
                .unwrap_or_else(|| EMPTY.to_string()),
            rating
                .map(|r| format!("{}/5", r.score))
                .unwrap_or_else(|| EMPTY.to_string()),
            rating
                .map(|r| or_empty(&r.comment))
                .unwrap_or_else(|| EMPTY.to_string()),
            or_empty(&attachments),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

fn or_empty(value: &str) -> String {
    if value.trim().is_empty() {
        EMPTY.to_string()
    } else {
        value.to_string()
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| EMPTY.to_string())
}
