use inkpad_core::db::{open_db, open_db_in_memory};
use inkpad_core::{
    AutosaveConfig, AutosaveSession, DocumentKind, DocumentListQuery, DocumentRepository,
    DocumentService, DocumentServiceError, EditorDocument, HydrationSource, MaxDocuments,
    PersistError, PersistenceGateway, RepoError, SaveStatus, SharedModel, SqliteDocumentRepository,
    SqliteDocumentStore, Unlimited,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[test]
fn reopening_file_keeps_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inkpad.sqlite3");
    let created = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
        DocumentService::new(repo, Unlimited)
            .create_document(DocumentKind::Note, "  kept ", None)
            .unwrap()
    };

    let conn = open_db(&path).unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let loaded = repo.get_document(created.document_id).unwrap().unwrap();
    assert_eq!(loaded.snapshot.title, "kept");
    assert_eq!(loaded.revision, 0);
}

#[test]
fn create_defaults_to_untitled_empty_content() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let service = DocumentService::new(repo, Unlimited);

    let note = service
        .create_document(DocumentKind::Note, "   ", None)
        .unwrap();
    assert_eq!(note.snapshot.title, "Untitled");
    assert_eq!(note.snapshot.content, DocumentKind::Note.empty_content());

    let canvas = service
        .create_document(DocumentKind::Canvas, "Board", Some(json!({ "elements": [1] })))
        .unwrap();
    assert_eq!(canvas.kind, DocumentKind::Canvas);
    assert_eq!(canvas.snapshot.content, json!({ "elements": [1] }));
}

#[test]
fn quota_gates_creation_per_kind() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let service = DocumentService::new(
        repo,
        MaxDocuments {
            notes: 1,
            canvases: 5,
        },
    );

    service
        .create_document(DocumentKind::Note, "first", None)
        .unwrap();
    let err = service
        .create_document(DocumentKind::Note, "second", None)
        .expect_err("second note exceeds quota");
    assert!(matches!(
        err,
        DocumentServiceError::QuotaExceeded {
            kind: DocumentKind::Note,
            existing: 1
        }
    ));
    service
        .create_document(DocumentKind::Canvas, "board", None)
        .unwrap();
}

#[test]
fn update_replaces_title_and_content() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let service = DocumentService::new(repo, Unlimited);
    let created = service
        .create_document(DocumentKind::Note, "draft", None)
        .unwrap();

    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    repo.update_document(created.document_id, "", &json!({ "type": "doc" }))
        .unwrap();
    let loaded = repo.get_document(created.document_id).unwrap().unwrap();
    assert_eq!(loaded.snapshot.title, "Untitled");
    assert_eq!(loaded.snapshot.content, json!({ "type": "doc" }));
    assert_eq!(loaded.revision, 1);

    let missing = Uuid::new_v4();
    let err = repo
        .update_document(missing, "x", &json!(null))
        .expect_err("missing document must fail");
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn list_filters_by_kind_in_stable_order() {
    let conn = open_db_in_memory().unwrap();
    let ids = {
        let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
        let service = DocumentService::new(repo, Unlimited);
        let older = service
            .create_document(DocumentKind::Note, "older", None)
            .unwrap();
        let newer = service
            .create_document(DocumentKind::Note, "newer", None)
            .unwrap();
        service
            .create_document(DocumentKind::Canvas, "board", None)
            .unwrap();
        (older.document_id, newer.document_id)
    };
    conn.execute(
        "UPDATE documents SET updated_at = 1000 WHERE uuid = ?1;",
        [ids.0.to_string()],
    )
    .unwrap();
    conn.execute(
        "UPDATE documents SET updated_at = 2000 WHERE uuid = ?1;",
        [ids.1.to_string()],
    )
    .unwrap();

    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let notes = repo
        .list_documents(&DocumentListQuery {
            kind: Some(DocumentKind::Note),
            ..DocumentListQuery::default()
        })
        .unwrap();
    assert_eq!(
        notes.iter().map(|doc| doc.document_id).collect::<Vec<_>>(),
        vec![ids.1, ids.0]
    );
    assert_eq!(repo.count_documents(None).unwrap(), 3);
    assert_eq!(repo.count_documents(Some(DocumentKind::Canvas)).unwrap(), 1);
}

#[test]
fn corrupt_content_is_reported_not_masked() {
    let conn = open_db_in_memory().unwrap();
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO documents (uuid, kind, title, content) VALUES (?1, 'note', 't', '{not json');",
        [id.to_string()],
    )
    .unwrap();

    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let err = repo.get_document(id).expect_err("malformed JSON must fail");
    assert!(matches!(err, RepoError::Encoding(_)));
}

#[tokio::test]
async fn store_gateway_round_trips_and_rejects_missing_documents() {
    let conn = open_db_in_memory().unwrap();
    let created = {
        let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
        DocumentService::new(repo, Unlimited)
            .create_document(DocumentKind::Note, "Untitled", None)
            .unwrap()
    };
    let store = SqliteDocumentStore::new(conn);

    let loaded = store.load(created.document_id).await.unwrap().unwrap();
    assert_eq!(loaded, created.snapshot);
    assert!(store.load(Uuid::new_v4()).await.unwrap().is_none());

    store
        .save(created.document_id, "Groceries", &loaded.content)
        .await
        .unwrap();
    let record = store.get(created.document_id).unwrap().unwrap();
    assert_eq!(record.snapshot.title, "Groceries");
    assert_eq!(record.revision, 1);

    let err = store
        .save(Uuid::new_v4(), "ghost", &json!(null))
        .await
        .expect_err("saving a missing document must be rejected");
    assert!(matches!(err, PersistError::Repo(RepoError::NotFound(_))));
}

#[tokio::test]
async fn session_over_sqlite_persists_debounced_edits() {
    let conn = open_db_in_memory().unwrap();
    let created = {
        let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
        DocumentService::new(repo, Unlimited)
            .create_document(DocumentKind::Note, "Untitled", None)
            .unwrap()
    };
    let store = Arc::new(SqliteDocumentStore::new(conn));
    let config = AutosaveConfig::for_kind(DocumentKind::Note).with_debounce(Duration::from_millis(100));

    let session = AutosaveSession::attach(
        config,
        created.document_id,
        SharedModel::new(EditorDocument::new(DocumentKind::Note)),
        store.clone(),
        store.clone(),
    )
    .await
    .unwrap();

    session.edit(|doc| doc.set_title("Gro")).unwrap();
    session.edit(|doc| doc.set_title("Groceries")).unwrap();

    let mut status = session.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let record = store.get(created.document_id).unwrap().unwrap();
            if record.revision > 0 && *status.borrow() == SaveStatus::Clean {
                break;
            }
            let _ = status.changed().await;
        }
    })
    .await
    .expect("edit should be persisted");

    let record = store.get(created.document_id).unwrap().unwrap();
    assert_eq!(record.snapshot.title, "Groceries");
    assert_eq!(record.revision, 1);
    session.detach().await.unwrap();
}
