//! Reminder scheduling.
//!
//! # Responsibility
//! - Decide which events qualify for a reminder and when to check.
//! - Hand qualifying events to a [`notifier::Notifier`]; delivery itself is
//!   out of core's hands.
//!
//! # State machine
//! `Idle -> Scanning -> Idle` on every tick until stopped.

pub mod notifier;
pub mod scanner;
