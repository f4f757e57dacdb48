//! Autosave synchronization engine.
//!
//! # Responsibility
//! - Keep a live editor model eventually consistent with its persisted copy.
//! - Coalesce edit bursts into debounced saves with at most one in flight.
//! - Report a status derived only from engine state transitions.
//!
//! # Invariants
//! - The baseline changes only on a successful save of the current identity.
//! - Hydration never counts as an edit.
//! - Persist failures are contained; only hydration failures reach callers.
//!
//! Layering, leaves first: `fingerprint` -> `baseline` -> `tracker` ->
//! `hydrator` -> `scheduler` -> `status` -> `engine` -> `session`.

pub mod baseline;
pub mod config;
pub mod engine;
pub mod fingerprint;
pub mod gateway;
pub mod hydrator;
pub mod scheduler;
pub mod session;
pub mod status;
pub mod tracker;
