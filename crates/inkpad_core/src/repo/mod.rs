//! Repository layer over SQLite.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQL details from services and the autosave gateway adapter.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod document_repo;
