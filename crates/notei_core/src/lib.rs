//! Core calendar and reminder scheduling engine for Notei.
//! This crate is the single source of truth for scheduling invariants.

pub mod calendar;
pub mod db;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod reminders;
pub mod repo;
pub mod service;
pub mod time;

pub use calendar::ics::{
    decode_calendar_text, decode_calendar_text_with, encode_calendar_events,
    encode_calendar_events_with, DecodeIssue, DecodeReport, ParsedIcsEvent,
};
pub use calendar::layout::{layout_day, LayoutSlot, TimeRange};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use model::event::{CalendarEvent, CalendarViewPrefs, EventPatch, NewEvent};
pub use model::reminder::{
    Frequency, NewReminder, Priority, RecordId, Reminder, ReminderList, ReminderPatch, RepeatRule,
};
pub use reminders::quick_add::{parse_quick_add, QuickAddResult};
pub use reminders::recurrence::next_occurrence;
pub use reminders::scheduler::{
    start_scheduler, DeliveryError, Notifier, Permission, ReminderScheduler, ReminderSource,
    SchedulerConfig, SchedulerHandle, TickReport, TickStatus,
};
pub use repo::document_store::{DocumentStore, MemoryDocumentStore, SqliteDocumentStore};
pub use repo::event_repo::{DocumentEventRepository, EventRepository};
pub use repo::reminder_repo::{
    DocumentReminderRepository, ReminderFilter, ReminderRepository, SharedReminderRepository,
    SmartFilter, SnoozePreset,
};
pub use repo::{RepoError, RepoResult};
pub use service::calendar_service::{CalendarService, ImportSummary, PlacedEvent};
pub use service::reminder_service::{CompletionOutcome, ReminderService};
pub use service::ServiceError;
pub use time::{Clock, FixedClock, SystemClock, TimeContext};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
