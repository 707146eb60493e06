//! End-of-day archival.

use chrono::Utc;

use super::QueueEngine;
use crate::errors::AppError;
use crate::models::{DailyArchive, Document};

impl QueueEngine {
    /// Snapshot queue, history and counters into a new archive (most recent
    /// first) and clear the live state.
    ///
    /// A blank label defaults to today's UTC date.
    pub async fn archive_and_reset_day(&self, label: &str) -> Result<DailyArchive, AppError> {
        let label = match label.trim() {
            "" => Utc::now().format("%Y-%m-%d").to_string(),
            label => label.to_string(),
        };
        let reset_counters = self.settings.reset_counters_on_archive;

        self.store
            .update_data(move |doc| Ok(archive_day(doc, label, reset_counters)))
            .await
    }

    pub async fn list_archives(&self) -> Result<Vec<DailyArchive>, AppError> {
        Ok(self.store.read().await?.daily_archives)
    }
}

fn archive_day(doc: &mut Document, label: String, reset_counters: bool) -> DailyArchive {
    let queue = std::mem::take(&mut doc.queue);
    let history = std::mem::take(&mut doc.history);

    let archive = DailyArchive {
        id: uuid::Uuid::new_v4().to_string(),
        label,
        created_at: Utc::now(),
        total_tickets: queue.len() + history.len(),
        queue,
        history,
        counter_normal: doc.counter_normal,
        counter_priority: doc.counter_priority,
    };

    if reset_counters {
        doc.counter_normal = 0;
        doc.counter_priority = 0;
    }
    doc.current_ticket_id = None;
    doc.last_called = None;
    doc.daily_archives.insert(0, archive.clone());

    tracing::info!(
        label = %archive.label,
        total = archive.total_tickets,
        reset_counters,
        "Day archived"
    );
    archive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{memory_engine, ticket};
    use crate::engine::EngineSettings;
    use crate::models::Department;
    use proptest::prelude::*;

    fn engine(reset_counters_on_archive: bool) -> QueueEngine {
        memory_engine(EngineSettings {
            reset_counters_on_archive,
            ..EngineSettings::default()
        })
    }

    #[tokio::test]
    async fn test_archive_moves_everything_and_resets() {
        let engine = engine(true);
        engine
            .issue_ticket("Matricula", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();
        engine
            .issue_ticket("Tesouraria", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();
        engine.call_next("Ana", "Contabilidade").await.unwrap();

        let archive = engine.archive_and_reset_day("Segunda").await.unwrap();
        assert_eq!(archive.label, "Segunda");
        assert_eq!(archive.total_tickets, 2);
        assert_eq!(archive.counter_normal, 2);

        let doc = engine.snapshot().await.unwrap();
        assert!(doc.queue.is_empty());
        assert!(doc.history.is_empty());
        assert_eq!(doc.counter_normal, 0);
        assert_eq!(doc.current_ticket_id, None);
        assert_eq!(doc.last_called, None);

        let next = engine
            .issue_ticket("Matricula", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();
        assert_eq!(next.code, "N001");
    }

    #[tokio::test]
    async fn test_archive_can_keep_counters() {
        let engine = engine(false);
        engine
            .issue_ticket("Matricula", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();

        engine.archive_and_reset_day("").await.unwrap();
        engine.archive_and_reset_day("segundo").await.unwrap();

        let archives = engine.list_archives().await.unwrap();
        assert_eq!(archives.len(), 2);
        assert_eq!(archives[0].label, "segundo");
        assert_eq!(archives[1].label, Utc::now().format("%Y-%m-%d").to_string());

        let next = engine
            .issue_ticket("Matricula", "y@sb.com", "Y", Vec::new())
            .await
            .unwrap();
        assert_eq!(next.code, "N002");
    }

    proptest! {
        #[test]
        fn prop_archive_is_a_pure_move(queued in 0usize..20, done in 0usize..20) {
            let mut doc = Document::empty();
            let sample = ticket("N001", Department::ApoioAoCliente, Utc::now());
            doc.queue = vec![sample.clone(); queued];
            doc.history = vec![sample; done];

            let archive = archive_day(&mut doc, "x".to_string(), true);

            prop_assert_eq!(archive.total_tickets, queued + done);
            prop_assert_eq!(archive.queue.len(), queued);
            prop_assert_eq!(archive.history.len(), done);
            prop_assert!(doc.queue.is_empty());
            prop_assert!(doc.history.is_empty());
            prop_assert_eq!(doc.daily_archives.len(), 1);
        }
    }
}
