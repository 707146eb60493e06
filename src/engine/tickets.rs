//! Ticket lifecycle operations.

use chrono::Utc;

use super::receipt::{apply_payload, plain_text_receipt};
use super::routing::{is_priority_service, route_for_service};
use super::{attendant_name, required_id, QueueEngine, DEFAULT_REDIRECT_NOTE, DEFAULT_REQUESTER};
use crate::errors::AppError;
use crate::models::{
    normalize_email, Attachment, AttachmentUpload, Department, Document, LastCalled, Rating,
    Receipt, ReceiptPayload, Ticket, TicketStatus, NORMAL_PREFIX, PRIORITY_PREFIX,
};

/// Lowest accepted rating score.
pub const MIN_SCORE: f64 = 1.0;
/// Highest accepted rating score.
pub const MAX_SCORE: f64 = 5.0;

impl QueueEngine {
    /// Issue a new ticket and append it to the queue.
    pub async fn issue_ticket(
        &self,
        service: &str,
        user_email: &str,
        user_name: &str,
        attachments: Vec<AttachmentUpload>,
    ) -> Result<Ticket, AppError> {
        let service = service.trim().to_string();
        if service.is_empty() {
            return Err(AppError::Validation("Select a service".to_string()));
        }
        let user_email = normalize_email(user_email);
        let user_name = match user_name.trim() {
            "" => DEFAULT_REQUESTER.to_string(),
            name => name.to_string(),
        };

        self.store
            .update_data(move |doc| {
                let now = Utc::now();
                let priority = is_priority_service(&service);
                let code = if priority {
                    next_code(&mut doc.counter_priority, PRIORITY_PREFIX)?
                } else {
                    next_code(&mut doc.counter_normal, NORMAL_PREFIX)?
                };
                let route = route_for_service(&service);

                let ticket = Ticket {
                    id: uuid::Uuid::new_v4().to_string(),
                    code,
                    service,
                    user_email,
                    user_name,
                    status: TicketStatus::Waiting,
                    department: route.department,
                    counter_number: route.counter_number,
                    counter_name: route.counter_name(),
                    created_at: now,
                    called_at: None,
                    received_at: None,
                    completed_at: None,
                    attended_by: None,
                    notes: String::new(),
                    service_duration_sec: None,
                    rating: None,
                    attachments: attachments
                        .into_iter()
                        .map(|upload| Attachment {
                            id: uuid::Uuid::new_v4().to_string(),
                            name: upload.name,
                            mime_type: upload.mime_type,
                            size: upload.size,
                            content: upload.content,
                            uploaded_at: now,
                        })
                        .collect(),
                    receipt: None,
                };

                tracing::info!(
                    code = %ticket.code,
                    department = %ticket.department,
                    attachments = ticket.attachments.len(),
                    "Ticket issued"
                );
                doc.queue.push(ticket.clone());
                Ok(ticket)
            })
            .await
    }

    /// Call the next waiting ticket of `department` for `worker_name`.
    pub async fn call_next(&self, worker_name: &str, department: &str) -> Result<Ticket, AppError> {
        let worker = attendant_name(worker_name);
        let department = Department::normalize(department);

        self.store
            .update_data(move |doc| {
                if doc.queue.is_empty() {
                    return Err(AppError::StateConflict(
                        "There are no tickets in the queue".to_string(),
                    ));
                }
                if doc.queue.iter().any(|t| t.is_in_service_by(&worker)) {
                    return Err(AppError::StateConflict(
                        "Conclude the current service before calling the next ticket".to_string(),
                    ));
                }
                let index = select_next(&doc.queue, department).ok_or_else(|| {
                    AppError::StateConflict(format!("No waiting tickets for {}", department))
                })?;

                let now = Utc::now();
                let ticket = &mut doc.queue[index];
                ticket.status = TicketStatus::InService;
                ticket.called_at = Some(now);
                ticket.attended_by = Some(worker.clone());
                let called = ticket.clone();

                doc.current_ticket_id = Some(called.id.clone());
                doc.last_called = Some(LastCalled {
                    code: called.code.clone(),
                    service: called.service.clone(),
                    counter_name: called.counter_name.clone(),
                    at: now,
                });

                tracing::info!(code = %called.code, worker = %worker, "Ticket called");
                Ok(called)
            })
            .await
    }

    /// Finish the worker's active ticket and move it to history.
    pub async fn conclude_current(
        &self,
        worker_name: &str,
        notes: &str,
        duration_sec: u64,
    ) -> Result<Ticket, AppError> {
        let worker = attendant_name(worker_name);
        let notes = notes.trim().to_string();
        let institution = self.settings.institution_name.clone();

        self.store
            .update_data(move |doc| {
                let index = active_ticket_index(doc, &worker).ok_or_else(no_active_service)?;
                let now = Utc::now();

                let mut ticket = doc.queue.remove(index);
                ticket.status = TicketStatus::Done;
                ticket.completed_at = Some(now);
                ticket.attended_by = Some(worker.clone());
                ticket.service_duration_sec = Some(duration_sec);
                if !notes.is_empty() {
                    ticket.notes = notes;
                }
                ticket.receipt = Some(plain_text_receipt(&ticket, &institution, now));

                if doc.current_ticket_id.as_deref() == Some(ticket.id.as_str()) {
                    doc.current_ticket_id = None;
                }
                doc.history.insert(0, ticket.clone());

                tracing::info!(
                    code = %ticket.code,
                    worker = %worker,
                    duration_sec,
                    "Ticket concluded"
                );
                Ok(ticket)
            })
            .await
    }

    /// Replace the receipt of a completed ticket.
    pub async fn set_receipt(
        &self,
        ticket_id: &str,
        payload: ReceiptPayload,
    ) -> Result<Receipt, AppError> {
        let ticket_id = required_id(ticket_id, "ticket")?;

        self.store
            .update_data(move |doc| {
                let ticket = doc
                    .find_ticket_mut(&ticket_id)
                    .ok_or_else(ticket_not_found)?;
                if ticket.status != TicketStatus::Done {
                    return Err(AppError::StateConflict(
                        "A receipt can only be attached to a completed ticket".to_string(),
                    ));
                }

                let receipt = apply_payload(ticket, payload, Utc::now());
                ticket.receipt = Some(receipt.clone());
                tracing::info!(code = %ticket.code, format = %receipt.format, "Receipt replaced");
                Ok(receipt)
            })
            .await
    }

    /// Send the worker's active ticket back to the waiting queue.
    ///
    /// The ticket keeps its original `created_at`, so it keeps its place in
    /// FIFO order.
    pub async fn redirect_current(
        &self,
        worker_name: &str,
        notes: &str,
    ) -> Result<Ticket, AppError> {
        let worker = attendant_name(worker_name);
        let note = match notes.trim() {
            "" => DEFAULT_REDIRECT_NOTE.to_string(),
            note => note.to_string(),
        };

        self.store
            .update_data(move |doc| {
                let index = active_ticket_index(doc, &worker).ok_or_else(no_active_service)?;
                let now = Utc::now();

                let ticket = &mut doc.queue[index];
                ticket.status = TicketStatus::Waiting;
                ticket.called_at = None;
                let stamped = format!("{} ({})", note, now.to_rfc3339());
                ticket.notes = if ticket.notes.is_empty() {
                    stamped
                } else {
                    format!("{}\n{}", ticket.notes, stamped)
                };
                let redirected = ticket.clone();

                if doc.current_ticket_id.as_deref() == Some(redirected.id.as_str()) {
                    doc.current_ticket_id = None;
                }

                tracing::info!(code = %redirected.code, worker = %worker, "Ticket redirected");
                Ok(redirected)
            })
            .await
    }

    /// Replace the notes of the worker's active ticket.
    pub async fn set_current_note(
        &self,
        note: &str,
        worker_name: &str,
    ) -> Result<Ticket, AppError> {
        let worker = attendant_name(worker_name);
        let note = note.trim().to_string();

        self.store
            .update_data(move |doc| {
                let index = active_ticket_index(doc, &worker).ok_or_else(no_active_service)?;
                let ticket = &mut doc.queue[index];
                ticket.notes = note;
                tracing::debug!(code = %ticket.code, "Service note updated");
                Ok(ticket.clone())
            })
            .await
    }

    /// Record that the customer picked up the result of their ticket.
    pub async fn mark_received(
        &self,
        ticket_id: &str,
        user_email: &str,
    ) -> Result<Ticket, AppError> {
        let ticket_id = required_id(ticket_id, "ticket")?;
        let user_email = normalize_email(user_email);

        self.store
            .update_data(move |doc| {
                let ticket = owned_ticket(doc, &ticket_id, &user_email)?;
                ticket.received_at = Some(Utc::now());
                tracing::info!(code = %ticket.code, "Ticket marked as received");
                Ok(ticket.clone())
            })
            .await
    }

    /// Rate a completed ticket. A later rating replaces an earlier one.
    pub async fn rate_ticket(
        &self,
        ticket_id: &str,
        user_email: &str,
        score: f64,
        comment: &str,
    ) -> Result<Ticket, AppError> {
        if !score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(AppError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
        let ticket_id = required_id(ticket_id, "ticket")?;
        let user_email = normalize_email(user_email);
        let comment = comment.trim().to_string();

        self.store
            .update_data(move |doc| {
                let ticket = owned_ticket(doc, &ticket_id, &user_email)?;
                if ticket.status != TicketStatus::Done {
                    return Err(AppError::StateConflict(
                        "Only completed tickets can be rated".to_string(),
                    ));
                }
                if ticket.rating.is_some() {
                    tracing::debug!(code = %ticket.code, "Replacing existing rating");
                }
                ticket.rating = Some(Rating {
                    score,
                    comment,
                    at: Utc::now(),
                });
                tracing::info!(code = %ticket.code, score, "Ticket rated");
                Ok(ticket.clone())
            })
            .await
    }

    pub async fn find_ticket(&self, ticket_id: &str) -> Result<Ticket, AppError> {
        let document = self.store.read().await?;
        document
            .find_ticket(ticket_id.trim())
            .cloned()
            .ok_or_else(ticket_not_found)
    }

    /// Tickets issued by `user_email`, newest first.
    pub async fn tickets_for_user(&self, user_email: &str) -> Result<Vec<Ticket>, AppError> {
        let email = normalize_email(user_email);
        let document = self.store.read().await?;

        let mut tickets: Vec<Ticket> = document
            .queue
            .into_iter()
            .chain(document.history)
            .filter(|t| t.user_email == email)
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    /// Most recent tickets completed by `worker_name`.
    pub async fn worker_activity(
        &self,
        worker_name: &str,
        limit: usize,
    ) -> Result<Vec<Ticket>, AppError> {
        let worker = attendant_name(worker_name);
        let document = self.store.read().await?;

        Ok(document
            .history
            .into_iter()
            .filter(|t| t.attended_by.as_deref() == Some(worker.as_str()))
            .take(limit)
            .collect())
    }
}

/// Pick the queue index of the next ticket for `department`.
///
/// Waiting tickets of the department are ordered by `created_at` (stable, so
/// equal timestamps keep queue order). The earliest priority ticket wins;
/// otherwise the earliest ticket.
pub fn select_next(queue: &[Ticket], department: Department) -> Option<usize> {
    let mut waiting: Vec<(usize, &Ticket)> = queue
        .iter()
        .enumerate()
        .filter(|(_, t)| t.status == TicketStatus::Waiting && t.department == department)
        .collect();
    waiting.sort_by_key(|(_, t)| t.created_at);

    waiting
        .iter()
        .find(|(_, t)| t.is_priority())
        .or_else(|| waiting.first())
        .map(|(index, _)| *index)
}

fn next_code(counter: &mut u32, prefix: char) -> Result<String, AppError> {
    *counter = counter.checked_add(1).ok_or_else(|| {
        AppError::StateConflict(format!("Ticket counter {} is exhausted", prefix))
    })?;
    Ok(format!("{}{:03}", prefix, counter))
}

fn active_ticket_index(doc: &Document, worker: &str) -> Option<usize> {
    doc.queue
        .iter()
        .position(|t| t.is_in_service_by(worker))
        .or_else(|| {
            let current = doc.current_ticket_id.as_deref()?;
            doc.queue
                .iter()
                .position(|t| t.id == current && t.status == TicketStatus::InService)
        })
}

fn owned_ticket<'a>(
    doc: &'a mut Document,
    ticket_id: &str,
    user_email: &str,
) -> Result<&'a mut Ticket, AppError> {
    let ticket = doc.find_ticket_mut(ticket_id).ok_or_else(ticket_not_found)?;
    if ticket.user_email != user_email {
        return Err(AppError::Ownership(
            "This ticket belongs to another user".to_string(),
        ));
    }
    Ok(ticket)
}

fn ticket_not_found() -> AppError {
    AppError::NotFound("Ticket not found".to_string())
}

fn no_active_service() -> AppError {
    AppError::StateConflict("No service in progress".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{memory_engine, ticket};
    use crate::engine::EngineSettings;
    use chrono::Duration;
    use proptest::prelude::*;

    fn engine() -> QueueEngine {
        memory_engine(EngineSettings::default())
    }

    fn waiting(code: &str, department: Department, minutes: i64) -> Ticket {
        ticket(code, department, Utc::now() + Duration::minutes(minutes))
    }

    #[test]
    fn test_select_next_prefers_priority_then_fifo() {
        let dept = Department::SecretariaAcademica;
        let queue = vec![
            waiting("N002", dept, 2),
            waiting("N001", dept, 1),
            waiting("P002", dept, 4),
            waiting("P001", dept, 3),
            waiting("P003", Department::Contabilidade, 0),
        ];
        assert_eq!(select_next(&queue, dept), Some(3));

        let normals = &queue[..2];
        assert_eq!(select_next(normals, dept), Some(1));
        assert_eq!(select_next(normals, Department::ApoioAoCliente), None);
    }

    #[test]
    fn test_select_next_skips_tickets_in_service() {
        let dept = Department::Contabilidade;
        let mut busy = waiting("P001", dept, 0);
        busy.status = TicketStatus::InService;
        let queue = vec![busy, waiting("N001", dept, 1)];
        assert_eq!(select_next(&queue, dept), Some(1));
    }

    #[tokio::test]
    async fn test_issue_ticket_allocates_codes_and_routes() {
        let engine = engine();

        let first = engine
            .issue_ticket("Tesouraria", " Y@SB.com ", " ", Vec::new())
            .await
            .unwrap();
        let priority = engine
            .issue_ticket("Senhas prioritarias", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();
        let second = engine
            .issue_ticket("Matricula", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();

        assert_eq!(first.code, "N001");
        assert_eq!(first.user_email, "y@sb.com");
        assert_eq!(first.user_name, DEFAULT_REQUESTER);
        assert_eq!(first.department, Department::Contabilidade);
        assert_eq!(first.counter_name, "Balcao 2 - Contabilidade");
        assert_eq!(priority.code, "P001");
        assert_eq!(priority.department, Department::ApoioAoCliente);
        assert_eq!(second.code, "N002");

        let doc = engine.snapshot().await.unwrap();
        assert_eq!(doc.queue.len(), 3);
        assert_eq!(doc.counter_normal, 2);
        assert_eq!(doc.counter_priority, 1);
    }

    #[tokio::test]
    async fn test_issue_ticket_rejects_blank_service() {
        let engine = engine();
        let result = engine
            .issue_ticket("   ", "y@sb.com", "Y", Vec::new())
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(engine.snapshot().await.unwrap().counter_normal, 0);
    }

    #[tokio::test]
    async fn test_exhausted_counter_is_a_conflict() {
        let engine = engine();
        engine
            .store()
            .update_data(|doc| {
                doc.counter_normal = u32::MAX;
                Ok(())
            })
            .await
            .unwrap();

        let result = engine
            .issue_ticket("Matricula", "y@sb.com", "Y", Vec::new())
            .await;
        assert!(matches!(result, Err(AppError::StateConflict(_))));

        let doc = engine.snapshot().await.unwrap();
        assert_eq!(doc.counter_normal, u32::MAX);
        assert!(doc.queue.is_empty());
    }

    #[tokio::test]
    async fn test_issue_ticket_stores_attachments() {
        let engine = engine();
        let upload = AttachmentUpload {
            name: "bi.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 3,
            content: "data:application/pdf;base64,AAAA".to_string(),
        };

        let ticket = engine
            .issue_ticket("Matricula", "y@sb.com", "Y", vec![upload.clone(), upload])
            .await
            .unwrap();

        assert_eq!(ticket.attachments.len(), 2);
        assert_ne!(ticket.attachments[0].id, ticket.attachments[1].id);
        assert_eq!(ticket.attachments[0].uploaded_at, ticket.created_at);
    }

    #[tokio::test]
    async fn test_call_next_on_empty_queue_fails() {
        let engine = engine();
        let result = engine.call_next("Ana", "Contabilidade").await;
        assert!(matches!(result, Err(AppError::StateConflict(_))));
    }

    #[tokio::test]
    async fn test_call_next_sets_current_and_last_called() {
        let engine = engine();
        engine
            .issue_ticket("Tesouraria", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();

        let called = engine.call_next("Ana", "tesouraria").await.unwrap();
        assert_eq!(called.status, TicketStatus::InService);
        assert_eq!(called.attended_by.as_deref(), Some("Ana"));
        assert!(called.called_at.is_some());

        let doc = engine.snapshot().await.unwrap();
        assert_eq!(doc.current_ticket_id.as_deref(), Some(called.id.as_str()));
        let last = doc.last_called.unwrap();
        assert_eq!(last.code, "N001");
        assert_eq!(last.counter_name, "Balcao 2 - Contabilidade");
    }

    #[tokio::test]
    async fn test_conclude_generates_receipt_and_moves_to_history() {
        let engine = engine();
        engine
            .issue_ticket("Matricula", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();
        engine.call_next("", "secretaria").await.unwrap();

        let done = engine
            .conclude_current("  ", "Documentos entregues", 95)
            .await
            .unwrap();

        assert_eq!(done.status, TicketStatus::Done);
        assert_eq!(done.attended_by.as_deref(), Some("Atendente"));
        assert_eq!(done.service_duration_sec, Some(95));
        assert_eq!(done.notes, "Documentos entregues");
        let receipt = done.receipt.unwrap();
        assert_eq!(receipt.file_name, "recibo_N001.txt");
        assert!(receipt.content.contains("Duracao de atendimento (segundos): 95"));

        let doc = engine.snapshot().await.unwrap();
        assert!(doc.queue.is_empty());
        assert_eq!(doc.history.len(), 1);
        assert_eq!(doc.current_ticket_id, None);
    }

    #[tokio::test]
    async fn test_conclude_without_active_ticket_fails() {
        let engine = engine();
        let result = engine.conclude_current("Ana", "", 10).await;
        assert!(matches!(result, Err(AppError::StateConflict(_))));
    }

    #[tokio::test]
    async fn test_redirect_keeps_seniority_and_appends_note() {
        let engine = engine();
        let first = engine
            .issue_ticket("Matricula", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();
        engine
            .issue_ticket("Reconfirmacao", "z@sb.com", "Z", Vec::new())
            .await
            .unwrap();

        engine
            .call_next("Ana", "Secretaria Academica")
            .await
            .unwrap();
        engine.set_current_note("Falta BI", "Ana").await.unwrap();
        let redirected = engine.redirect_current("Ana", "").await.unwrap();

        assert_eq!(redirected.status, TicketStatus::Waiting);
        assert_eq!(redirected.called_at, None);
        assert_eq!(redirected.created_at, first.created_at);
        assert!(redirected.notes.starts_with("Falta BI\nReencaminhado ("));

        let doc = engine.snapshot().await.unwrap();
        assert_eq!(doc.current_ticket_id, None);

        let again = engine
            .call_next("Ana", "Secretaria Academica")
            .await
            .unwrap();
        assert_eq!(again.id, first.id);
    }

    #[tokio::test]
    async fn test_set_current_note_requires_active_ticket() {
        let engine = engine();
        let result = engine.set_current_note("nota", "Ana").await;
        assert!(matches!(result, Err(AppError::StateConflict(_))));
    }

    #[tokio::test]
    async fn test_mark_received_checks_ownership() {
        let engine = engine();
        let ticket = engine
            .issue_ticket("Matricula", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();

        let missing = engine.mark_received("nope", "y@sb.com").await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let foreign = engine.mark_received(&ticket.id, "z@sb.com").await;
        assert!(matches!(foreign, Err(AppError::Ownership(_))));

        let received = engine.mark_received(&ticket.id, "Y@sb.com").await.unwrap();
        assert!(received.received_at.is_some());
        assert_eq!(received.status, TicketStatus::Waiting);
    }

    #[tokio::test]
    async fn test_rate_ticket_validation_and_overwrite() {
        let engine = engine();
        let ticket = engine
            .issue_ticket("Matricula", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();

        for score in [0.0, 5.5, f64::NAN] {
            let result = engine.rate_ticket(&ticket.id, "y@sb.com", score, "").await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }

        engine
            .call_next("Ana", "Secretaria Academica")
            .await
            .unwrap();
        engine.conclude_current("Ana", "", 30).await.unwrap();

        let foreign = engine.rate_ticket(&ticket.id, "z@sb.com", 4.0, "").await;
        assert!(matches!(foreign, Err(AppError::Ownership(_))));

        engine
            .rate_ticket(&ticket.id, "y@sb.com", 3.0, "ok")
            .await
            .unwrap();
        let rated = engine
            .rate_ticket(&ticket.id, "y@sb.com", 5.0, "Otimo")
            .await
            .unwrap();
        let rating = rated.rating.unwrap();
        assert_eq!(rating.score, 5.0);
        assert_eq!(rating.comment, "Otimo");
    }

    #[tokio::test]
    async fn test_set_receipt_requires_done_ticket() {
        let engine = engine();
        let ticket = engine
            .issue_ticket("Matricula", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();

        let early = engine
            .set_receipt(&ticket.id, ReceiptPayload::default())
            .await;
        assert!(matches!(early, Err(AppError::StateConflict(_))));
        let missing = engine
            .set_receipt("ghost", ReceiptPayload::default())
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        engine
            .call_next("Ana", "Secretaria Academica")
            .await
            .unwrap();
        engine.conclude_current("Ana", "", 30).await.unwrap();

        let receipt = engine
            .set_receipt(
                &ticket.id,
                ReceiptPayload {
                    format: Some("pdf".to_string()),
                    mime_type: Some("application/pdf".to_string()),
                    data_url: Some("data:application/pdf;base64,JVBERi0=".to_string()),
                    ..ReceiptPayload::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.file_name, "recibo_N001.pdf");
        assert_eq!(
            engine.find_ticket(&ticket.id).await.unwrap().receipt,
            Some(receipt)
        );
    }

    #[tokio::test]
    async fn test_user_and_worker_views() {
        let engine = engine();
        let older = engine
            .issue_ticket("Matricula", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();
        engine
            .issue_ticket("Matricula", "z@sb.com", "Z", Vec::new())
            .await
            .unwrap();
        let newer = engine
            .issue_ticket("Tesouraria", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();

        engine
            .call_next("Ana", "Secretaria Academica")
            .await
            .unwrap();
        engine.conclude_current("Ana", "", 12).await.unwrap();

        let mine = engine.tickets_for_user("y@sb.com").await.unwrap();
        let ids: Vec<_> = mine.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);

        let activity = engine.worker_activity("Ana", 10).await.unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].id, older.id);
        assert!(engine.worker_activity("Rui", 10).await.unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_codes_strictly_increase_per_prefix(
            priorities in prop::collection::vec(any::<bool>(), 1..40)
        ) {
            let mut doc = Document::empty();
            let mut normal = Vec::new();
            let mut priority = Vec::new();
            for is_priority in priorities {
                if is_priority {
                    priority.push(next_code(&mut doc.counter_priority, PRIORITY_PREFIX).unwrap());
                } else {
                    normal.push(next_code(&mut doc.counter_normal, NORMAL_PREFIX).unwrap());
                }
            }
            for codes in [&normal, &priority] {
                let numbers: Vec<u32> = codes.iter().map(|c| c[1..].parse().unwrap()).collect();
                prop_assert!(numbers.windows(2).all(|w| w[0] < w[1]));
                prop_assert!(codes.iter().all(|c| c.len() == 4));
            }
        }
    }
}
