//! Domain model for persisted documents and live editor state.
//!
//! # Responsibility
//! - Define document identity, kind and snapshot shapes.
//! - Define the live model contract the autosave engine reads from.
//!
//! # Invariants
//! - Every document is identified by a stable `DocumentId`.
//! - Snapshots carry persisted meaning only, never editor bookkeeping.

pub mod document;
pub mod live;
