//! Persistent document store.
//!
//! The whole queue state lives in one JSON document under [`DATA_KEY`].
//! [`DataStore::update_data`] is the only sanctioned mutation path: it reads
//! the document, runs the mutator to completion, and commits with a revision
//! check, all while holding the store's write lock.

mod migrate;
mod seed;

pub use migrate::{decode_document, Decoded};
pub use seed::seed_document;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::db::{KeyValueStore, DATA_KEY};
use crate::errors::AppError;
use crate::models::{Document, RevisionInfo, SCHEMA_VERSION};
use crate::notifier::{ChangeEvent, ChangeNotifier, ChangeOrigin, Subscription};

/// Single-writer store over a key-value backend.
pub struct DataStore {
    kv: Arc<dyn KeyValueStore>,
    notifier: ChangeNotifier,
    write_lock: Mutex<()>,
    /// Last revision this process read or wrote
    known_revision: AtomicI64,
    /// Last revision announced to listeners, by a commit or by the watcher
    last_published: AtomicI64,
}

impl DataStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, notifier: ChangeNotifier) -> Self {
        Self {
            kv,
            notifier,
            write_lock: Mutex::new(()),
            known_revision: AtomicI64::new(0),
            last_published: AtomicI64::new(0),
        }
    }

    /// The backend, shared with components that own other slots.
    pub fn kv(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.kv)
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }

    /// Last revision this process observed.
    pub fn known_revision(&self) -> i64 {
        self.known_revision.load(Ordering::SeqCst)
    }

    /// Make sure a document exists, seeding one if needed.
    pub async fn ensure_seed(&self) -> Result<(), AppError> {
        self.read().await.map(|_| ())
    }

    /// Read an owned copy of the current document.
    pub async fn read(&self) -> Result<Document, AppError> {
        let _guard = self.write_lock.lock().await;
        self.load().await
    }

    pub async fn revision_info(&self) -> Result<RevisionInfo, AppError> {
        let document = self.read().await?;
        Ok(RevisionInfo {
            revision_id: document.revision,
            updated_at: document.updated_at,
        })
    }

    /// Replace the stored document unconditionally. Returns the new revision.
    pub async fn write(&self, mut document: Document) -> Result<i64, AppError> {
        let _guard = self.write_lock.lock().await;
        self.persist(&mut document, None).await
    }

    /// Run `mutator` against the current document and commit the result.
    ///
    /// When the mutator fails nothing is written and no change is published.
    /// A commit fails with [`AppError::Conflict`] if another process wrote the
    /// document in between.
    pub async fn update_data<T, F>(&self, mutator: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Document) -> Result<T, AppError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        let expected = document.revision;

        let result = mutator(&mut document)?;
        self.persist(&mut document, Some(expected)).await?;
        Ok(result)
    }

    /// Poll storage for writes made by other processes and publish them as
    /// [`ChangeOrigin::External`] events.
    pub fn watch_external(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Holding the lock keeps our own commits from looking external
                let _guard = store.write_lock.lock().await;
                match store.kv.revision(DATA_KEY).await {
                    Ok(Some(revision)) => {
                        // Zero means nothing was announced yet; the first poll is the baseline
                        let published = store.last_published.swap(revision, Ordering::SeqCst);
                        store.known_revision.store(revision, Ordering::SeqCst);
                        if published != 0 && revision != published {
                            tracing::info!(revision, "Document changed by another writer");
                            store.notifier.notify(ChangeEvent {
                                key: DATA_KEY.to_string(),
                                revision,
                                origin: ChangeOrigin::External,
                            });
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!("External change poll failed: {}", e),
                }
            }
        })
    }

    async fn load(&self) -> Result<Document, AppError> {
        let Some(stored) = self.kv.get(DATA_KEY).await? else {
            tracing::info!("No stored document, writing seed data");
            return self.reseed().await;
        };

        match decode_document(&stored.value) {
            Ok(Decoded {
                mut document,
                migrated,
            }) => {
                document.revision = stored.revision;
                self.known_revision.store(stored.revision, Ordering::SeqCst);
                if migrated {
                    self.persist(&mut document, Some(stored.revision)).await?;
                }
                Ok(document)
            }
            Err(reason) => {
                tracing::warn!(
                    revision = stored.revision,
                    "Stored document is unusable ({}), reseeding",
                    reason
                );
                self.reseed().await
            }
        }
    }

    async fn reseed(&self) -> Result<Document, AppError> {
        let mut document = seed_document()?;
        self.persist(&mut document, None).await?;
        Ok(document)
    }

    async fn persist(
        &self,
        document: &mut Document,
        expected_revision: Option<i64>,
    ) -> Result<i64, AppError> {
        document.schema_version = SCHEMA_VERSION;
        document.updated_at = Utc::now();

        let json = serde_json::to_string(document)?;
        let revision = self.kv.put(DATA_KEY, &json, expected_revision).await?;

        document.revision = revision;
        self.known_revision.store(revision, Ordering::SeqCst);
        self.last_published.store(revision, Ordering::SeqCst);
        tracing::debug!(revision, "Document committed");

        self.notifier.notify(ChangeEvent {
            key: DATA_KEY.to_string(),
            revision,
            origin: ChangeOrigin::Local,
        });
        Ok(revision)
    }
}
