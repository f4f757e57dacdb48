//! Core logic for the Inkpad workspace: documents, storage and autosave.
//! This crate is the single source of truth for persistence invariants.

pub mod autosave;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use autosave::config::{AutosaveConfig, ConfigError};
pub use autosave::engine::{AutosaveEngine, MutationOutcome, SaveAttempt};
pub use autosave::fingerprint::{Canonicalizer, Fingerprint};
pub use autosave::gateway::{HydrationError, HydrationSource, PersistError, PersistenceGateway};
pub use autosave::scheduler::{Resolution, SchedulerState};
pub use autosave::session::{AutosaveSession, SessionError};
pub use autosave::status::SaveStatus;
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::document::{DocumentId, DocumentKind, DocumentSnapshot, DEFAULT_TITLE};
pub use model::live::{EditorDocument, LiveModel, SharedModel};
pub use repo::document_repo::{
    DocumentListQuery, DocumentRecord, DocumentRepository, RepoError, RepoResult,
    SqliteDocumentRepository,
};
pub use service::document_service::{
    CreationQuota, DocumentService, DocumentServiceError, MaxDocuments, Unlimited,
};
pub use store::SqliteDocumentStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
