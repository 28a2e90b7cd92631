//! Calendar event and calendar settings payload normalization.

use super::{item_array, payload_version, Fields, Migrated};
use super::{CALENDAR_EVENTS_STORE_VERSION, CALENDAR_SETTINGS_STORE_VERSION};
use crate::model::event::{CalendarEvent, CalendarViewPrefs, CalendarViewType};
use crate::time::TimeContext;
use chrono::Duration;
use log::debug;
use serde_json::{json, Value};

/// Normalizes one untyped calendar event record.
///
/// # Fallbacks
/// - Unparseable `startAt` falls back to `createdAt`.
/// - Unparseable or reversed `endAt` falls back to the start (the next local
///   midnight for all-day events).
/// - All-day intervals are snapped onto local midnights.
pub fn migrate_calendar_event(raw: &Value, ctx: &TimeContext) -> Option<CalendarEvent> {
    let fields = Fields::of(raw);
    let id = fields.id()?;
    let created_at = fields.instant("createdAt").unwrap_or(ctx.now);
    let all_day = fields.is_true("allDay");
    let start_at = fields.instant("startAt").unwrap_or(created_at);
    let end_at = fields
        .instant("endAt")
        .filter(|end| *end >= start_at)
        .unwrap_or_else(|| {
            if all_day {
                ctx.start_of_day(start_at) + Duration::days(1)
            } else {
                start_at
            }
        });

    let mut event = CalendarEvent {
        id,
        title: fields.string_or_empty("title"),
        notes: fields.opt_string("notes"),
        location: fields.opt_string("location"),
        start_at,
        end_at,
        all_day,
        timezone: fields.opt_string("timezone"),
        reminder_ids: fields.strings("reminderIds").unwrap_or_default(),
        linked_note_id: fields.opt_string("linkedNoteId"),
        participants: fields.strings("participants"),
        color: fields.opt_string("color"),
        recurrence: fields.object("recurrence").cloned(),
        created_at,
        updated_at: fields.instant("updatedAt").unwrap_or(created_at),
    };
    event.normalize_all_day(ctx);
    Some(event)
}

pub fn migrate_calendar_events(raw: &Value, ctx: &TimeContext) -> Vec<CalendarEvent> {
    migrate_events_payload(raw, ctx).value
}

pub fn migrate_events_payload(raw: &Value, ctx: &TimeContext) -> Migrated<Vec<CalendarEvent>> {
    let items = item_array(raw, "events");
    let events: Vec<CalendarEvent> = items
        .iter()
        .filter_map(|item| migrate_calendar_event(item, ctx))
        .collect();
    let dropped = items.len() - events.len();
    if dropped > 0 {
        debug!("event=normalize module=migrate status=skip entity=calendar_event dropped={dropped}");
    }

    Migrated {
        value: events,
        source_version: payload_version(raw),
        dropped,
    }
}

pub fn events_payload(events: &[CalendarEvent]) -> Result<Value, serde_json::Error> {
    Ok(json!({
        "version": CALENDAR_EVENTS_STORE_VERSION,
        "events": serde_json::to_value(events)?,
    }))
}

/// Normalizes calendar view preferences, field by field, onto defaults.
pub fn migrate_calendar_settings(raw: &Value) -> CalendarViewPrefs {
    let fields = Fields::of(raw);
    let defaults = CalendarViewPrefs::default();

    CalendarViewPrefs {
        default_view: fields
            .str("defaultView")
            .and_then(CalendarViewType::parse)
            .unwrap_or(defaults.default_view),
        week_starts_on: if fields.number("weekStartsOn") == Some(1.0) {
            1
        } else {
            0
        },
        show_week_numbers: fields
            .bool("showWeekNumbers")
            .unwrap_or(defaults.show_week_numbers),
        day_start_hour: hour_in_range(&fields, "dayStartHour", 23)
            .unwrap_or(defaults.day_start_hour),
        day_end_hour: hour_in_range(&fields, "dayEndHour", 24).unwrap_or(defaults.day_end_hour),
    }
}

pub fn migrate_settings_payload(raw: &Value) -> Migrated<CalendarViewPrefs> {
    Migrated {
        value: migrate_calendar_settings(raw),
        source_version: payload_version(raw),
        dropped: 0,
    }
}

/// Settings are stored flat next to their version.
pub fn settings_payload(prefs: &CalendarViewPrefs) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(prefs)?;
    if let Value::Object(object) = &mut value {
        object.insert("version".to_string(), json!(CALENDAR_SETTINGS_STORE_VERSION));
    }
    Ok(value)
}

fn hour_in_range(fields: &Fields<'_>, key: &str, max: u8) -> Option<u8> {
    fields
        .number(key)
        .filter(|hour| hour.fract() == 0.0 && *hour >= 0.0 && *hour <= f64::from(max))
        .map(|hour| hour as u8)
}
