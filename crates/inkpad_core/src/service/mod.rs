//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own business rules (quota) so the autosave engine stays free of them.

pub mod document_service;
