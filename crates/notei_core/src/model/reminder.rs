//! Reminder domain model.
//!
//! # Responsibility
//! - Define the canonical reminder, repeat rule and reminder list records.
//! - Own the patch semantics used by every reminder write path.
//!
//! # Invariants
//! - `completed_at == None` means the reminder is active.
//! - `notification_fired_at` belongs to the current `remind_at`; changing
//!   `remind_at` through `apply_patch` clears it.
//! - A patch carrying `expected_remind_at` applies only while `remind_at`
//!   still equals it.
//! - `RepeatRule::interval` is always >= 1 after normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for persisted records.
///
/// Legacy stores use free-form ids (`inbox`), so ids stay plain strings.
pub type RecordId = String;

/// Generates a fresh record id.
pub fn new_record_id() -> RecordId {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Repeat frequency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    /// Reserved for rule-based repeats; steps like a one-day repeat.
    Custom,
}

impl Frequency {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Fixed-interval repeat descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatRule {
    pub freq: Frequency,
    /// "Every N units"; never zero.
    pub interval: u32,
    /// Weekday numbers (0 = Sunday). Carried but not used for stepping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_weekday: Option<Vec<u8>>,
    /// No occurrence is generated strictly after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
}

impl RepeatRule {
    pub fn new(freq: Frequency, interval: u32) -> Self {
        Self {
            freq,
            interval: interval.max(1),
            by_weekday: None,
            end_at: None,
        }
    }

    pub fn until(mut self, end_at: DateTime<Utc>) -> Self {
        self.end_at = Some(end_at);
        self
    }
}

/// Canonical reminder record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: RecordId,
    pub list_id: RecordId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_note_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    /// Instant the notification should fire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remind_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repeat: Option<RepeatRule>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notification_fired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stable manual ordering within a list.
    #[serde(default)]
    pub sort_key: i64,
}

impl Reminder {
    /// Creates an active reminder with a generated id.
    pub fn new(
        list_id: impl Into<RecordId>,
        title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_record_id(),
            list_id: list_id.into(),
            title: title.into(),
            notes: None,
            linked_note_id: None,
            due_at: None,
            remind_at: None,
            repeat: None,
            priority: Priority::None,
            completed_at: None,
            notification_fired_at: None,
            created_at: now,
            updated_at: now,
            sort_key: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Date the reminder is filed under: `due_at`, else `remind_at`.
    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.due_at.or(self.remind_at)
    }

    /// Active, has a `remind_at`, and has not fired for it yet.
    pub fn awaits_notification(&self) -> bool {
        !self.is_completed() && self.remind_at.is_some() && self.notification_fired_at.is_none()
    }

    /// Awaiting notification and `remind_at <= now`.
    pub fn is_notification_due(&self, now: DateTime<Utc>) -> bool {
        self.awaits_notification() && self.remind_at.is_some_and(|at| at <= now)
    }

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// Returns `false`, leaving the record untouched, when the patch's
    /// `expected_remind_at` no longer matches.
    ///
    /// # Invariants
    /// - A `remind_at` change to a different value clears
    ///   `notification_fired_at`, even when the same patch sets it.
    pub fn apply_patch(&mut self, patch: &ReminderPatch, now: DateTime<Utc>) -> bool {
        if patch
            .expected_remind_at
            .is_some_and(|expected| expected != self.remind_at)
        {
            return false;
        }
        let previous_remind_at = self.remind_at;

        if let Some(list_id) = &patch.list_id {
            self.list_id = list_id.clone();
        }
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(linked_note_id) = &patch.linked_note_id {
            self.linked_note_id = linked_note_id.clone();
        }
        if let Some(due_at) = patch.due_at {
            self.due_at = due_at;
        }
        if let Some(remind_at) = patch.remind_at {
            self.remind_at = remind_at;
        }
        if let Some(repeat) = &patch.repeat {
            self.repeat = repeat.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = completed_at;
        }
        if let Some(fired_at) = patch.notification_fired_at {
            self.notification_fired_at = fired_at;
        }
        if let Some(sort_key) = patch.sort_key {
            self.sort_key = sort_key;
        }

        if patch.remind_at.is_some() && self.remind_at != previous_remind_at {
            self.notification_fired_at = None;
        }
        self.updated_at = now;
        true
    }
}

/// Partial reminder update.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderPatch {
    pub list_id: Option<RecordId>,
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub linked_note_id: Option<Option<RecordId>>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub remind_at: Option<Option<DateTime<Utc>>>,
    pub repeat: Option<Option<RepeatRule>>,
    pub priority: Option<Priority>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub notification_fired_at: Option<Option<DateTime<Utc>>>,
    pub sort_key: Option<i64>,
    /// Precondition on the stored `remind_at`; not a field write.
    pub expected_remind_at: Option<Option<DateTime<Utc>>>,
}

impl ReminderPatch {
    pub fn mark_fired(at: DateTime<Utc>) -> Self {
        Self {
            notification_fired_at: Some(Some(at)),
            ..Self::default()
        }
    }

    /// Marks the occurrence at `remind_at` fired; a no-op once the reminder
    /// has been moved elsewhere.
    pub fn mark_fired_for(remind_at: Option<DateTime<Utc>>, at: DateTime<Utc>) -> Self {
        Self {
            expected_remind_at: Some(remind_at),
            ..Self::mark_fired(at)
        }
    }

    pub fn reschedule(remind_at: Option<DateTime<Utc>>) -> Self {
        Self {
            remind_at: Some(remind_at),
            ..Self::default()
        }
    }
}

/// Optional fields accepted when creating a reminder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewReminder {
    pub notes: Option<String>,
    pub linked_note_id: Option<RecordId>,
    pub due_at: Option<DateTime<Utc>>,
    pub remind_at: Option<DateTime<Utc>>,
    pub repeat: Option<RepeatRule>,
    pub priority: Priority,
}

/// User-defined reminder list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderList {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub emoji: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub sort_key: i64,
}
