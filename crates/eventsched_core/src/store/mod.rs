//! Event store.
//!
//! # Responsibility
//! - Encapsulate the shared event collection behind its operations.
//! - Keep persistence details behind the snapshot contract.
//!
//! # Invariants
//! - Nothing outside the store iterates or mutates the collection directly.

pub mod event_store;
