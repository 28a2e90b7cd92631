//! Calendar event domain model.
//!
//! # Responsibility
//! - Define the canonical calendar event record and its write models.
//! - Normalize all-day intervals onto local midnight boundaries.
//!
//! # Invariants
//! - `start_at <= end_at`.
//! - All-day events cover `[start day, end day)`; a one-day event ends exactly
//!   one day after it starts.

use crate::model::reminder::{new_record_id, RecordId};
use crate::time::TimeContext;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Canonical calendar event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: RecordId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    /// Display label only; never used for arithmetic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub reminder_ids: Vec<RecordId>,
    #[serde(default)]
    pub linked_note_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<String>>,
    #[serde(default)]
    pub color: Option<String>,
    /// Opaque recurrence descriptor carried through from storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// Builds an event from write-model fields with a generated id.
    pub fn from_new(new_event: NewEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: new_record_id(),
            title: new_event.title,
            notes: new_event.notes,
            location: new_event.location,
            start_at: new_event.start_at,
            end_at: new_event.end_at,
            all_day: new_event.all_day,
            timezone: new_event.timezone,
            reminder_ids: new_event.reminder_ids,
            linked_note_id: new_event.linked_note_id,
            participants: new_event.participants,
            color: new_event.color,
            recurrence: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validates record invariants before persistence.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.id.trim().is_empty() {
            return Err(EventValidationError::EmptyId);
        }
        if self.end_at < self.start_at {
            return Err(EventValidationError::InvalidWindow {
                start: self.start_at,
                end: self.end_at,
            });
        }
        Ok(())
    }

    /// Snaps an all-day interval onto local midnights with an exclusive end.
    ///
    /// Timed events are left untouched.
    pub fn normalize_all_day(&mut self, ctx: &TimeContext) {
        if !self.all_day {
            return;
        }
        let start = ctx.start_of_day(self.start_at);
        let mut end = if ctx.is_local_midnight(self.end_at) {
            self.end_at
        } else {
            ctx.start_of_day(self.end_at) + Duration::days(1)
        };
        if end <= start {
            end = start + Duration::days(1);
        }
        self.start_at = start;
        self.end_at = end;
    }

    /// Applies a partial update and bumps `updated_at`.
    pub fn apply_patch(&mut self, patch: &EventPatch, now: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(location) = &patch.location {
            self.location = location.clone();
        }
        if let Some(start_at) = patch.start_at {
            self.start_at = start_at;
        }
        if let Some(end_at) = patch.end_at {
            self.end_at = end_at;
        }
        if let Some(all_day) = patch.all_day {
            self.all_day = all_day;
        }
        if let Some(reminder_ids) = &patch.reminder_ids {
            self.reminder_ids = reminder_ids.clone();
        }
        if let Some(linked_note_id) = &patch.linked_note_id {
            self.linked_note_id = linked_note_id.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        self.updated_at = now;
    }
}

/// Write model for creating an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    pub timezone: Option<String>,
    pub reminder_ids: Vec<RecordId>,
    pub linked_note_id: Option<RecordId>,
    pub participants: Option<Vec<String>>,
    pub color: Option<String>,
}

impl NewEvent {
    pub fn timed(title: impl Into<String>, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            notes: None,
            location: None,
            start_at,
            end_at,
            all_day: false,
            timezone: None,
            reminder_ids: Vec::new(),
            linked_note_id: None,
            participants: None,
            color: None,
        }
    }

    pub fn all_day(title: impl Into<String>, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        Self {
            all_day: true,
            ..Self::timed(title, start_at, end_at)
        }
    }
}

/// Partial event update. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    pub reminder_ids: Option<Vec<RecordId>>,
    pub linked_note_id: Option<Option<RecordId>>,
    pub color: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValidationError {
    EmptyId,
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl Display for EventValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "event id must not be empty"),
            Self::InvalidWindow { start, end } => {
                write!(f, "event end ({end}) must be >= start ({start})")
            }
        }
    }
}

impl Error for EventValidationError {}

/// Calendar grid kind shown by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarViewType {
    Month,
    Week,
    Day,
    Agenda,
}

impl CalendarViewType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "month" => Some(Self::Month),
            "week" => Some(Self::Week),
            "day" => Some(Self::Day),
            "agenda" => Some(Self::Agenda),
            _ => None,
        }
    }
}

/// Persisted calendar view preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarViewPrefs {
    pub default_view: CalendarViewType,
    /// 0 = Sunday, 1 = Monday.
    pub week_starts_on: u8,
    pub show_week_numbers: bool,
    pub day_start_hour: u8,
    pub day_end_hour: u8,
}

impl Default for CalendarViewPrefs {
    fn default() -> Self {
        Self {
            default_view: CalendarViewType::Month,
            week_starts_on: 0,
            show_week_numbers: false,
            day_start_hour: 6,
            day_end_hour: 22,
        }
    }
}
