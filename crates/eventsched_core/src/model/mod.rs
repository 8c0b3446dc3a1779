//! Event domain model.
//!
//! # Responsibility
//! - Define the event record and its creation/update inputs.
//! - Keep every invariant check next to the data it protects.
//!
//! # Invariants
//! - Every event is identified by a stable `EventId`.
//! - Deletion is a hard delete owned by the store; there is no tombstone.

pub mod event;
pub mod patch;
