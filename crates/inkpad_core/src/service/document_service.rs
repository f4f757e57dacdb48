//! Document creation use-case with plan quota gating.
//!
//! # Responsibility
//! - Enforce the creation quota before a document row exists.
//! - Provide read/list helpers for editor lifecycle layers.
//!
//! # Invariants
//! - Quota is checked at creation only; autosave updates never consult it.
//! - Created documents are read back before being returned.

use crate::model::document::{DocumentId, DocumentKind, DocumentSnapshot};
use crate::repo::document_repo::{DocumentListQuery, DocumentRecord, DocumentRepository, RepoError};
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Plan rule deciding whether one more document may be created.
pub trait CreationQuota {
    /// `existing` is the count of active documents of `kind`.
    fn allows(&self, kind: DocumentKind, existing: u64) -> bool;
}

/// No limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl CreationQuota for Unlimited {
    fn allows(&self, _kind: DocumentKind, _existing: u64) -> bool {
        true
    }
}

/// Caps active documents per kind.
#[derive(Debug, Clone, Copy)]
pub struct MaxDocuments {
    pub notes: u64,
    pub canvases: u64,
}

impl CreationQuota for MaxDocuments {
    fn allows(&self, kind: DocumentKind, existing: u64) -> bool {
        let limit = match kind {
            DocumentKind::Note => self.notes,
            DocumentKind::Canvas => self.canvases,
        };
        existing < limit
    }
}

/// Service error for document use-cases.
#[derive(Debug)]
pub enum DocumentServiceError {
    /// Plan does not allow another document of this kind.
    QuotaExceeded { kind: DocumentKind, existing: u64 },
    DocumentNotFound(DocumentId),
    Repo(RepoError),
    /// Write succeeded but read-back did not find the row.
    InconsistentState(&'static str),
}

impl Display for DocumentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded { kind, existing } => write!(
                f,
                "{} quota exceeded: {existing} already exist",
                kind.as_str()
            ),
            Self::DocumentNotFound(id) => write!(f, "document not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent document state: {details}"),
        }
    }
}

impl Error for DocumentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DocumentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::DocumentNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Document service facade over repository and quota implementations.
pub struct DocumentService<R: DocumentRepository, Q: CreationQuota> {
    repo: R,
    quota: Q,
}

impl<R: DocumentRepository, Q: CreationQuota> DocumentService<R, Q> {
    pub fn new(repo: R, quota: Q) -> Self {
        Self { repo, quota }
    }

    /// Creates one document after the quota check.
    ///
    /// `content` defaults to the kind's empty tree.
    pub fn create_document(
        &self,
        kind: DocumentKind,
        title: &str,
        content: Option<Value>,
    ) -> Result<DocumentRecord, DocumentServiceError> {
        let existing = self.repo.count_documents(Some(kind))?;
        if !self.quota.allows(kind, existing) {
            warn!(
                "event=document_create module=service status=rejected kind={} existing={}",
                kind.as_str(),
                existing
            );
            return Err(DocumentServiceError::QuotaExceeded { kind, existing });
        }

        let snapshot =
            DocumentSnapshot::new(title, content.unwrap_or_else(|| kind.empty_content()));
        let document_id = self.repo.create_document(Uuid::new_v4(), kind, &snapshot)?;
        info!(
            "event=document_create module=service status=ok kind={} document_id={}",
            kind.as_str(),
            document_id
        );

        self.repo
            .get_document(document_id)?
            .ok_or(DocumentServiceError::InconsistentState(
                "created document not found in read-back",
            ))
    }

    pub fn get_document(
        &self,
        document_id: DocumentId,
    ) -> Result<DocumentRecord, DocumentServiceError> {
        self.repo
            .get_document(document_id)?
            .ok_or(DocumentServiceError::DocumentNotFound(document_id))
    }

    pub fn list_documents(
        &self,
        kind: Option<DocumentKind>,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<Vec<DocumentRecord>, DocumentServiceError> {
        let query = DocumentListQuery {
            kind,
            limit,
            offset,
        };
        Ok(self.repo.list_documents(&query)?)
    }
}
