//! Receipt rendering for completed tickets.

use chrono::{DateTime, Utc};

use crate::models::{Receipt, ReceiptPayload, Ticket};

pub const TEXT_FORMAT: &str = "txt";
pub const TEXT_MIME: &str = "text/plain;charset=utf-8";
const NO_NOTES: &str = "Sem observacoes";

/// `recibo_<code>.<ext>`
pub fn receipt_file_name(code: &str, extension: &str) -> String {
    format!("recibo_{}.{}", code, extension)
}

/// Render the fixed plain-text receipt.
pub fn render_text(ticket: &Ticket, institution: &str) -> String {
    let requester = if ticket.user_email.is_empty() {
        ticket.user_name.clone()
    } else {
        format!("{} ({})", ticket.user_name, ticket.user_email)
    };
    let notes = match ticket.notes.trim() {
        "" => NO_NOTES,
        notes => notes,
    };

    [
        institution.to_string(),
        "Recibo de Atendimento".to_string(),
        format!("Senha: {}", ticket.code),
        format!("Servico: {}", ticket.service),
        format!("Usuario: {}", requester),
        format!(
            "Atendido por: {}",
            ticket.attended_by.as_deref().unwrap_or("-")
        ),
        format!("Hora de emissao: {}", timestamp(Some(ticket.created_at))),
        format!("Hora de conclusao: {}", timestamp(ticket.completed_at)),
        format!(
            "Duracao de atendimento (segundos): {}",
            ticket.service_duration_sec.unwrap_or(0)
        ),
        format!("Observacoes: {}", notes),
    ]
    .join("\n")
}

/// The default receipt stored when a ticket is concluded.
pub fn plain_text_receipt(ticket: &Ticket, institution: &str, now: DateTime<Utc>) -> Receipt {
    Receipt {
        file_name: receipt_file_name(&ticket.code, TEXT_FORMAT),
        format: TEXT_FORMAT.to_string(),
        mime_type: TEXT_MIME.to_string(),
        generated_at: now,
        content: render_text(ticket, institution),
        data_url: None,
    }
}

/// Build a replacement receipt, filling gaps from the ticket's current
/// receipt and then from the plain-text defaults.
pub fn apply_payload(ticket: &Ticket, payload: ReceiptPayload, now: DateTime<Utc>) -> Receipt {
    let current = ticket.receipt.as_ref();
    let format = payload
        .format
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| TEXT_FORMAT.to_string());
    let file_name = payload
        .file_name
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| receipt_file_name(&ticket.code, &format));
    let mime_type = payload
        .mime_type
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| TEXT_MIME.to_string());
    let content = payload
        .content
        .or_else(|| current.map(|r| r.content.clone()))
        .unwrap_or_default();

    Receipt {
        file_name,
        format,
        mime_type,
        generated_at: now,
        content,
        data_url: payload.data_url,
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
