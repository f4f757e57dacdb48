//! Document repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/get/update/list APIs over the `documents` table.
//! - Keep SQL and JSON encoding of `content` inside the persistence boundary.
//!
//! # Invariants
//! - Titles are normalized (`trim || "Untitled"`) before every write.
//! - Updates replace title and content together and bump `revision`.
//! - Read paths reject rows with an unknown kind or malformed content.

use crate::db::DbError;
use crate::model::document::{normalize_title, DocumentId, DocumentKind, DocumentSnapshot};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DOCUMENTS_DEFAULT_LIMIT: u32 = 10;
const DOCUMENTS_LIMIT_MAX: u32 = 50;

const DOCUMENT_SELECT_SQL: &str = "SELECT
    uuid,
    kind,
    title,
    content,
    revision,
    updated_at
FROM documents";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for document persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(DocumentId),
    InvalidData(String),
    Encoding(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted document data: {message}"),
            Self::Encoding(err) => write!(f, "document content is not valid JSON: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encoding(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encoding(value)
    }
}

/// Read model for one persisted document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub document_id: DocumentId,
    pub kind: DocumentKind,
    pub snapshot: DocumentSnapshot,
    /// Number of full updates applied since creation.
    pub revision: i64,
    /// Update timestamp in epoch milliseconds.
    pub updated_at: i64,
}

/// Query options for listing documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentListQuery {
    pub kind: Option<DocumentKind>,
    /// Defaults to 10 and clamps to 50.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for document storage.
pub trait DocumentRepository {
    fn create_document(
        &self,
        document_id: DocumentId,
        kind: DocumentKind,
        snapshot: &DocumentSnapshot,
    ) -> RepoResult<DocumentId>;
    /// Replaces title and content of an existing document.
    fn update_document(
        &self,
        document_id: DocumentId,
        title: &str,
        content: &Value,
    ) -> RepoResult<()>;
    fn get_document(&self, document_id: DocumentId) -> RepoResult<Option<DocumentRecord>>;
    /// Lists active documents by `updated_at DESC, uuid ASC`.
    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<DocumentRecord>>;
    /// Counts active documents, optionally of one kind.
    fn count_documents(&self, kind: Option<DocumentKind>) -> RepoResult<u64>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let ready: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'documents'
            );",
            [],
            |row| row.get(0),
        )?;
        if ready != 1 {
            return Err(RepoError::InvalidData(
                "missing required table `documents`".to_string(),
            ));
        }
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn create_document(
        &self,
        document_id: DocumentId,
        kind: DocumentKind,
        snapshot: &DocumentSnapshot,
    ) -> RepoResult<DocumentId> {
        let content = serde_json::to_string(&snapshot.content)?;
        self.conn.execute(
            "INSERT INTO documents (uuid, kind, title, content) VALUES (?1, ?2, ?3, ?4);",
            params![
                document_id.to_string(),
                kind.as_str(),
                snapshot.normalized_title(),
                content,
            ],
        )?;
        Ok(document_id)
    }

    fn update_document(
        &self,
        document_id: DocumentId,
        title: &str,
        content: &Value,
    ) -> RepoResult<()> {
        let content = serde_json::to_string(content)?;
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                title = ?2,
                content = ?3,
                revision = revision + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            params![document_id.to_string(), normalize_title(title), content],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(document_id));
        }
        Ok(())
    }

    fn get_document(&self, document_id: DocumentId) -> RepoResult<Option<DocumentRecord>> {
        let sql = format!("{DOCUMENT_SELECT_SQL} WHERE uuid = ?1 AND is_deleted = 0;");
        let row = self
            .conn
            .query_row(&sql, [document_id.to_string()], read_raw_row)
            .optional()?;
        row.map(RawDocumentRow::into_record).transpose()
    }

    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<DocumentRecord>> {
        let mut sql = format!("{DOCUMENT_SELECT_SQL} WHERE is_deleted = 0");
        let mut bind_values: Vec<SqlValue> = Vec::new();

        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(SqlValue::Text(kind.as_str().to_string()));
        }

        sql.push_str(" ORDER BY updated_at DESC, uuid ASC LIMIT ?");
        bind_values.push(SqlValue::Integer(i64::from(normalize_document_limit(
            query.limit,
        ))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(SqlValue::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values), read_raw_row)?;
        let mut documents = Vec::new();
        for row in rows {
            documents.push(row?.into_record()?);
        }
        Ok(documents)
    }

    fn count_documents(&self, kind: Option<DocumentKind>) -> RepoResult<u64> {
        let count: i64 = match kind {
            Some(kind) => self.conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE is_deleted = 0 AND kind = ?1;",
                [kind.as_str()],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE is_deleted = 0;",
                [],
                |row| row.get(0),
            )?,
        };
        u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count {count}")))
    }
}

/// Normalizes list limit according to the documents contract.
pub fn normalize_document_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => DOCUMENTS_DEFAULT_LIMIT,
        Some(value) => value.min(DOCUMENTS_LIMIT_MAX),
    }
}

struct RawDocumentRow {
    uuid: String,
    kind: String,
    title: String,
    content: String,
    revision: i64,
    updated_at: i64,
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawDocumentRow> {
    Ok(RawDocumentRow {
        uuid: row.get("uuid")?,
        kind: row.get("kind")?,
        title: row.get("title")?,
        content: row.get("content")?,
        revision: row.get("revision")?,
        updated_at: row.get("updated_at")?,
    })
}

impl RawDocumentRow {
    fn into_record(self) -> RepoResult<DocumentRecord> {
        let document_id = Uuid::parse_str(&self.uuid).map_err(|_| {
            RepoError::InvalidData(format!("invalid uuid value `{}` in documents.uuid", self.uuid))
        })?;
        let kind = DocumentKind::parse(&self.kind).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid kind `{}` for {document_id}", self.kind))
        })?;
        let content: Value = serde_json::from_str(&self.content)?;

        Ok(DocumentRecord {
            document_id,
            kind,
            snapshot: DocumentSnapshot::new(self.title, content),
            revision: self.revision,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_document_limit;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(normalize_document_limit(None), 10);
        assert_eq!(normalize_document_limit(Some(0)), 10);
        assert_eq!(normalize_document_limit(Some(7)), 7);
        assert_eq!(normalize_document_limit(Some(500)), 50);
    }
}
