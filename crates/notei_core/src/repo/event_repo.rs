//! Calendar event and view-preference repository over versioned documents.
//!
//! # Invariants
//! - Stored events always satisfy `start_at <= end_at`.
//! - All-day events are stored snapped to local midnights with an
//!   exclusive end.

use crate::migrate::calendar::{
    events_payload, migrate_events_payload, migrate_settings_payload, settings_payload,
};
use crate::migrate::{CALENDAR_EVENTS_STORE_VERSION, CALENDAR_SETTINGS_STORE_VERSION};
use crate::model::event::{CalendarEvent, CalendarViewPrefs, EventPatch, NewEvent};
use crate::repo::document_store::{DocumentStore, CALENDAR_EVENTS_KEY, CALENDAR_SETTINGS_KEY};
use crate::repo::RepoResult;
use crate::time::Clock;
use chrono::NaiveDate;
use log::info;
use serde_json::Value;
use std::sync::Arc;

/// Repository interface for calendar events and view settings.
pub trait EventRepository {
    fn load_events(&self) -> RepoResult<Vec<CalendarEvent>>;
    fn get_event(&self, id: &str) -> RepoResult<Option<CalendarEvent>>;
    /// Validates, normalizes and stores a new event.
    fn create_event(&self, new_event: NewEvent) -> RepoResult<CalendarEvent>;
    /// Returns `Ok(None)` for unknown ids. A patch that breaks the window
    /// invariant is rejected and nothing is written.
    fn update_event(&self, id: &str, patch: &EventPatch) -> RepoResult<Option<CalendarEvent>>;
    fn delete_event(&self, id: &str) -> RepoResult<bool>;
    /// Timed events intersecting the local day `date`, by start.
    fn events_on_day(&self, date: NaiveDate) -> RepoResult<Vec<CalendarEvent>>;
    fn load_view_prefs(&self) -> RepoResult<CalendarViewPrefs>;
    fn save_view_prefs(&self, prefs: &CalendarViewPrefs) -> RepoResult<()>;
}

/// Document-backed event repository.
pub struct DocumentEventRepository<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: DocumentStore> DocumentEventRepository<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn save_events(&self, events: &[CalendarEvent]) -> RepoResult<()> {
        self.store
            .save(CALENDAR_EVENTS_KEY, &events_payload(events)?)
    }
}

impl<S: DocumentStore> EventRepository for DocumentEventRepository<S> {
    fn load_events(&self) -> RepoResult<Vec<CalendarEvent>> {
        let raw = self.store.load(CALENDAR_EVENTS_KEY)?.unwrap_or(Value::Null);
        let migrated = migrate_events_payload(&raw, &self.clock.context());
        if migrated.needs_rewrite(CALENDAR_EVENTS_STORE_VERSION) {
            self.save_events(&migrated.value)?;
            info!(
                "event=store_migrate module=repo status=ok key={CALENDAR_EVENTS_KEY} from_version={} to_version={CALENDAR_EVENTS_STORE_VERSION} dropped={}",
                migrated.source_version, migrated.dropped
            );
        }
        Ok(migrated.value)
    }

    fn get_event(&self, id: &str) -> RepoResult<Option<CalendarEvent>> {
        Ok(self.load_events()?.into_iter().find(|event| event.id == id))
    }

    fn create_event(&self, new_event: NewEvent) -> RepoResult<CalendarEvent> {
        let ctx = self.clock.context();
        let mut event = CalendarEvent::from_new(new_event, ctx.now);
        event.normalize_all_day(&ctx);
        event.validate()?;

        let mut events = self.load_events()?;
        events.push(event.clone());
        self.save_events(&events)?;
        info!(
            "event=calendar_event_create module=repo status=ok event_id={} all_day={}",
            event.id, event.all_day
        );
        Ok(event)
    }

    fn update_event(&self, id: &str, patch: &EventPatch) -> RepoResult<Option<CalendarEvent>> {
        let ctx = self.clock.context();
        let mut events = self.load_events()?;
        let Some(event) = events.iter_mut().find(|event| event.id == id) else {
            return Ok(None);
        };

        let mut updated = event.clone();
        updated.apply_patch(patch, ctx.now);
        updated.normalize_all_day(&ctx);
        updated.validate()?;
        *event = updated.clone();

        self.save_events(&events)?;
        Ok(Some(updated))
    }

    fn delete_event(&self, id: &str) -> RepoResult<bool> {
        let events = self.load_events()?;
        let before = events.len();
        let kept: Vec<CalendarEvent> = events.into_iter().filter(|event| event.id != id).collect();
        if kept.len() == before {
            return Ok(false);
        }
        self.save_events(&kept)?;
        info!("event=calendar_event_delete module=repo status=ok event_id={id}");
        Ok(true)
    }

    fn events_on_day(&self, date: NaiveDate) -> RepoResult<Vec<CalendarEvent>> {
        let (day_start, day_end) = self.clock.context().day_bounds(date);
        let mut events: Vec<CalendarEvent> = self
            .load_events()?
            .into_iter()
            .filter(|event| !event.all_day)
            .filter(|event| {
                event.start_at < day_end
                    && (event.end_at > day_start
                        || (event.start_at == event.end_at && event.start_at >= day_start))
            })
            .collect();
        events.sort_by_key(|event| event.start_at);
        Ok(events)
    }

    fn load_view_prefs(&self) -> RepoResult<CalendarViewPrefs> {
        let raw = self
            .store
            .load(CALENDAR_SETTINGS_KEY)?
            .unwrap_or(Value::Null);
        let migrated = migrate_settings_payload(&raw);
        if migrated.needs_rewrite(CALENDAR_SETTINGS_STORE_VERSION) {
            self.save_view_prefs(&migrated.value)?;
        }
        Ok(migrated.value)
    }

    fn save_view_prefs(&self, prefs: &CalendarViewPrefs) -> RepoResult<()> {
        self.store
            .save(CALENDAR_SETTINGS_KEY, &settings_payload(prefs)?)
    }
}
