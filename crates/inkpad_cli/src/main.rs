//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise create, attach, edit and autosave against a real SQLite file.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `inkpad_cli <db-path> [title] [log-dir]`

use inkpad_core::db::open_db;
use inkpad_core::{
    default_log_level, init_logging, AutosaveConfig, AutosaveSession, DocumentKind,
    DocumentService, EditorDocument, SharedModel, SqliteDocumentRepository, SqliteDocumentStore,
    Unlimited,
};
use log::info;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

const SETTLE_MARGIN: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("inkpad_core version={}", inkpad_core::core_version());

    let mut args = std::env::args().skip(1);
    let Some(db_path) = args.next() else {
        eprintln!("usage: inkpad_cli <db-path> [title] [log-dir]");
        return Ok(());
    };
    let title = args.next().unwrap_or_else(|| "Groceries".to_string());
    if let Some(log_dir) = args.next() {
        init_logging(default_log_level(), &log_dir)?;
    }

    let conn = open_db(&db_path)?;
    let created = {
        let repo = SqliteDocumentRepository::try_new(&conn)?;
        DocumentService::new(repo, Unlimited).create_document(DocumentKind::Note, "", None)?
    };
    println!(
        "created document_id={} title={}",
        created.document_id, created.snapshot.title
    );

    let store = Arc::new(SqliteDocumentStore::new(conn));
    let config = AutosaveConfig::for_kind(DocumentKind::Note);
    let debounce = config.debounce;
    let session = AutosaveSession::attach(
        config,
        created.document_id,
        SharedModel::new(EditorDocument::new(DocumentKind::Note)),
        store.clone(),
        store.clone(),
    )
    .await?;
    println!("attached status={:?}", session.status());

    session.edit(|doc| doc.set_title(title))?;
    println!("edited status={:?}", session.status());

    tokio::time::sleep(debounce + SETTLE_MARGIN).await;
    let status = session.status();
    let persisted = store.get(created.document_id)?;
    session.detach().await?;

    match persisted {
        Some(record) => println!(
            "settled status={:?} label={} persisted_title={} revision={} content={}",
            status,
            status.label(),
            record.snapshot.title,
            record.revision,
            serde_json::to_string(&record.snapshot.content)?
        ),
        None => println!("settled status={status:?} persisted=missing"),
    }
    info!("event=cli_smoke module=cli status=ok");
    Ok(())
}
