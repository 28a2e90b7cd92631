//! Domain model for calendar events and reminders.
//!
//! # Responsibility
//! - Define the typed records consumed and produced by the scheduling engine.
//! - Keep patch/normalization rules next to the records they protect.
//!
//! # Invariants
//! - Every record is identified by a stable string id.
//! - All instants are stored as UTC.

pub mod event;
pub mod reminder;
