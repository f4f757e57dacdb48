//! External collaborator contracts for loading and persisting documents.
//!
//! # Responsibility
//! - Define the async persistence and hydration seams supplied by the host.
//! - Define the error taxonomy crossing those seams.
//!
//! # Invariants
//! - `save` has no partial success: `Err` means nothing was persisted.
//! - Timeouts are the gateway's concern; callers only observe resolve/reject.

use crate::model::document::{DocumentId, DocumentSnapshot};
use crate::repo::document_repo::RepoError;
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Persists one document's `(title, content)` pair.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn save(
        &self,
        document_id: DocumentId,
        title: &str,
        content: &Value,
    ) -> Result<(), PersistError>;
}

/// Loads the previously persisted snapshot for one document.
#[async_trait]
pub trait HydrationSource: Send + Sync {
    /// Returns `None` for a document that was never persisted.
    async fn load(&self, document_id: DocumentId)
        -> Result<Option<DocumentSnapshot>, HydrationError>;
}

/// A rejected save. Recoverable; surfaced only through save status.
#[derive(Debug)]
pub enum PersistError {
    /// Gateway refused the write (network, authorization, validation).
    Rejected(String),
    /// Storage backend failure.
    Repo(RepoError),
    /// The save task ended without reporting a result.
    Interrupted(String),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(message) => write!(f, "save rejected: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Interrupted(message) => write!(f, "save interrupted: {message}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PersistError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Initial load failure. Fatal for the attach; never retried automatically.
#[derive(Debug)]
pub enum HydrationError {
    /// The source could not produce the snapshot.
    LoadFailed {
        document_id: DocumentId,
        message: String,
    },
    /// Storage backend failure.
    Repo(RepoError),
}

impl Display for HydrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoadFailed {
                document_id,
                message,
            } => write!(f, "failed to load document {document_id}: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HydrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::LoadFailed { .. } => None,
        }
    }
}

impl From<RepoError> for HydrationError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
