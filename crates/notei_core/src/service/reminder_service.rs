//! Reminder use-case service.
//!
//! # Responsibility
//! - Create reminders from quick-add text.
//! - Complete reminders and roll repeating ones over to their next occurrence.
//!
//! # Invariants
//! - A repeating reminder is never deleted on completion; the next
//!   occurrence is stored as a new record.

use crate::model::reminder::{NewReminder, Reminder};
use crate::reminders::quick_add::parse_quick_add;
use crate::reminders::recurrence::next_occurrence;
use crate::repo::reminder_repo::ReminderRepository;
use crate::service::ServiceError;
use crate::time::Clock;
use log::info;
use std::sync::Arc;

/// Result of completing one reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub completed: Reminder,
    /// Next occurrence, when the series continues.
    pub next: Option<Reminder>,
}

/// Reminder service facade over a reminder repository.
pub struct ReminderService<R: ReminderRepository> {
    repo: R,
    clock: Arc<dyn Clock>,
}

impl<R: ReminderRepository> ReminderService<R> {
    pub fn new(repo: R, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Parses `text` and stores the reminder in `list_id`.
    pub fn quick_add(&self, list_id: &str, text: &str) -> Result<Reminder, ServiceError> {
        let parsed = parse_quick_add(text, &self.clock.context());
        let title = parsed.title.trim();
        if title.is_empty() {
            return Err(ServiceError::EmptyTitle);
        }

        let fields = NewReminder {
            due_at: parsed.due_at,
            remind_at: parsed.remind_at,
            ..NewReminder::default()
        };
        Ok(self.repo.create_reminder(list_id, title, fields)?)
    }

    /// Marks `id` completed and stores its next occurrence, if any.
    pub fn complete(&self, id: &str) -> Result<CompletionOutcome, ServiceError> {
        let current = self
            .repo
            .get_reminder(id)?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        let next = next_occurrence(&current, &self.clock.context());

        let completed = self
            .repo
            .complete_reminder(id)?
            .ok_or(ServiceError::InconsistentState(
                "completed reminder not found in read-back",
            ))?;
        let next = match next {
            Some(occurrence) => Some(self.repo.insert_reminder(occurrence)?),
            None => None,
        };

        info!(
            "event=reminder_complete module=service status=ok reminder_id={} next_id={}",
            completed.id,
            next.as_ref().map_or("none", |reminder| reminder.id.as_str())
        );
        Ok(CompletionOutcome { completed, next })
    }
}
