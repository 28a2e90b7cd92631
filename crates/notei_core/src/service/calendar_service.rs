//! Calendar use-case service.
//!
//! # Responsibility
//! - Import `.ics` text as stored events and export stored events as `.ics`.
//! - Produce the column layout of one local day.
//!
//! # Invariants
//! - Import stores one event per decoded VEVENT; decode fallbacks are
//!   reported, never raised.

use crate::calendar::ics::{decode_calendar_text_with, encode_calendar_events_with, DecodeIssue};
use crate::calendar::layout::layout_day;
use crate::model::event::CalendarEvent;
use crate::model::reminder::RecordId;
use crate::repo::event_repo::EventRepository;
use crate::service::ServiceError;
use crate::time::Clock;
use chrono::NaiveDate;
use log::info;
use std::sync::Arc;

/// Result of one `.ics` import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Ids of the stored events, in document order.
    pub imported: Vec<RecordId>,
    pub issues: Vec<DecodeIssue>,
}

/// Owned layout entry for one event of a day view.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedEvent {
    pub event: CalendarEvent,
    pub column_index: usize,
    pub total_columns: usize,
}

/// Calendar service facade over an event repository.
pub struct CalendarService<R: EventRepository> {
    repo: R,
    clock: Arc<dyn Clock>,
}

impl<R: EventRepository> CalendarService<R> {
    pub fn new(repo: R, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Decodes `text` and stores every decoded event.
    pub fn import_ics(&self, text: &str) -> Result<ImportSummary, ServiceError> {
        let report = decode_calendar_text_with(text, &self.clock.context());
        let mut imported = Vec::with_capacity(report.events.len());
        for parsed in report.events {
            let event = self.repo.create_event(parsed.into_new_event())?;
            imported.push(event.id);
        }

        info!(
            "event=ics_import module=service status=ok imported={} issues={}",
            imported.len(),
            report.issues.len()
        );
        Ok(ImportSummary {
            imported,
            issues: report.issues,
        })
    }

    /// Encodes every stored event.
    pub fn export_ics(&self) -> Result<String, ServiceError> {
        let events = self.repo.load_events()?;
        let text = encode_calendar_events_with(&events, &self.clock.context());
        info!(
            "event=ics_export module=service status=ok events={} bytes={}",
            events.len(),
            text.len()
        );
        Ok(text)
    }

    /// Lays out the timed events of local day `date`.
    pub fn layout_for_day(&self, date: NaiveDate) -> Result<Vec<PlacedEvent>, ServiceError> {
        let events = self.repo.events_on_day(date)?;
        Ok(layout_day(&events)
            .into_iter()
            .map(|slot| PlacedEvent {
                event: slot.event.clone(),
                column_index: slot.column_index,
                total_columns: slot.total_columns,
            })
            .collect())
    }
}
