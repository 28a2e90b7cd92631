//! Reminder engines: quick-add parsing, recurrence and notification delivery.
//!
//! # Responsibility
//! - Turn free text into schedulable reminder fields.
//! - Compute the next occurrence of repeating reminders.
//! - Fire at-most-once local notifications for due reminders.
//!
//! # Invariants
//! - Parsing and recurrence are pure functions over a `TimeContext`.
//! - The scheduler never caches reminders across ticks.

pub mod quick_add;
pub mod recurrence;
pub mod scheduler;

pub use quick_add::{parse_quick_add, QuickAddResult};
pub use recurrence::next_occurrence;
pub use scheduler::{
    start_scheduler, DeliveryError, Notifier, Permission, ReminderScheduler, ReminderSource,
    SchedulerConfig, SchedulerHandle, TickReport, TickStatus,
};
