//! SQLite-backed persistence gateway and hydration source.
//!
//! # Responsibility
//! - Adapt the synchronous document repository to the async autosave seams.
//! - Run blocking SQLite work off the async executor threads.
//!
//! # Invariants
//! - One connection is shared behind a mutex; calls are serialized.
//! - A save for a missing document is a rejection, never an implicit create.

use crate::autosave::gateway::{HydrationError, HydrationSource, PersistError, PersistenceGateway};
use crate::model::document::{DocumentId, DocumentSnapshot};
use crate::repo::document_repo::{
    DocumentRecord, DocumentRepository, RepoResult, SqliteDocumentRepository,
};
use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use rusqlite::Connection;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Shared SQLite connection exposed through the autosave gateway traits.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Wraps a migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` with a repository over the shared connection.
    pub fn with_repo<T>(
        &self,
        f: impl FnOnce(&SqliteDocumentRepository<'_>) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let conn = self.conn.lock();
        let repo = SqliteDocumentRepository::try_new(&conn)?;
        f(&repo)
    }

    /// Reads one document synchronously.
    pub fn get(&self, document_id: DocumentId) -> RepoResult<Option<DocumentRecord>> {
        self.with_repo(|repo| repo.get_document(document_id))
    }

    async fn run_blocking<T>(
        &self,
        f: impl FnOnce(&SqliteDocumentRepository<'_>) -> RepoResult<T> + Send + 'static,
    ) -> Result<RepoResult<T>, tokio::task::JoinError>
    where
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.with_repo(f)).await
    }
}

#[async_trait]
impl PersistenceGateway for SqliteDocumentStore {
    async fn save(
        &self,
        document_id: DocumentId,
        title: &str,
        content: &Value,
    ) -> Result<(), PersistError> {
        let started_at = Instant::now();
        let title = title.to_string();
        let content = content.clone();
        let result = self
            .run_blocking(move |repo| repo.update_document(document_id, &title, &content))
            .await
            .map_err(|err| PersistError::Interrupted(err.to_string()))?;

        match result {
            Ok(()) => {
                debug!(
                    "event=store_save module=store status=ok document_id={} duration_ms={}",
                    document_id,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=store_save module=store status=error document_id={} duration_ms={} error={}",
                    document_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl HydrationSource for SqliteDocumentStore {
    async fn load(
        &self,
        document_id: DocumentId,
    ) -> Result<Option<DocumentSnapshot>, HydrationError> {
        let record = self
            .run_blocking(move |repo| repo.get_document(document_id))
            .await
            .map_err(|err| HydrationError::LoadFailed {
                document_id,
                message: err.to_string(),
            })??;
        Ok(record.map(|record| record.snapshot))
    }
}
