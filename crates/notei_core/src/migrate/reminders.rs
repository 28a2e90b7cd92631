//! Reminder and reminder-list payload normalization.

use super::{item_array, payload_version, Fields, Migrated};
use super::{REMINDERS_STORE_VERSION, REMINDER_LISTS_STORE_VERSION};
use crate::model::reminder::{Frequency, Priority, Reminder, ReminderList, RepeatRule};
use chrono::{DateTime, Utc};
use log::debug;
use serde_json::{json, Value};

/// Normalizes one untyped reminder record.
///
/// Returns `None` only when the record has no usable `id`.
pub fn normalize_reminder(raw: &Value, now: DateTime<Utc>) -> Option<Reminder> {
    let fields = Fields::of(raw);
    let id = fields.id()?;
    let created_at = fields.instant("createdAt").unwrap_or(now);
    let updated_at = fields.instant("updatedAt").unwrap_or(created_at);

    Some(Reminder {
        id,
        list_id: fields.string_or_empty("listId"),
        title: fields.string_or_empty("title"),
        notes: fields.opt_string("notes"),
        linked_note_id: fields.opt_string("linkedNoteId"),
        due_at: fields.instant("dueAt"),
        remind_at: fields.instant("remindAt"),
        repeat: fields.object("repeat").map(normalize_repeat),
        priority: fields
            .str("priority")
            .and_then(Priority::parse)
            .unwrap_or_default(),
        completed_at: fields.instant("completedAt"),
        notification_fired_at: fields.instant("notificationFiredAt"),
        created_at,
        updated_at,
        sort_key: fields.integer("sortKey").unwrap_or(0),
    })
}

/// Normalizes a repeat descriptor object.
///
/// Unknown frequencies become daily; intervals below one become one.
pub fn normalize_repeat(raw: &Value) -> RepeatRule {
    let fields = Fields::of(raw);
    let interval = fields
        .number("interval")
        .filter(|n| *n >= 1.0)
        .map(|n| n.min(f64::from(u32::MAX)).trunc() as u32)
        .unwrap_or(1);
    let by_weekday = fields.array("byWeekday").map(|items| {
        items
            .iter()
            .filter_map(Value::as_u64)
            .filter(|day| *day <= 6)
            .map(|day| day as u8)
            .collect()
    });

    RepeatRule {
        freq: fields
            .str("freq")
            .and_then(Frequency::parse)
            .unwrap_or(Frequency::Daily),
        interval,
        by_weekday,
        end_at: fields.instant("endAt"),
    }
}

pub fn normalize_reminders(raw: &Value, now: DateTime<Utc>) -> Vec<Reminder> {
    migrate_reminders_payload(raw, now).value
}

/// Normalizes a whole reminders payload and reports its source version.
pub fn migrate_reminders_payload(raw: &Value, now: DateTime<Utc>) -> Migrated<Vec<Reminder>> {
    let items = item_array(raw, "reminders");
    let reminders: Vec<Reminder> = items
        .iter()
        .filter_map(|item| normalize_reminder(item, now))
        .collect();
    let dropped = items.len() - reminders.len();
    if dropped > 0 {
        debug!("event=normalize module=migrate status=skip entity=reminder dropped={dropped}");
    }

    Migrated {
        value: reminders,
        source_version: payload_version(raw),
        dropped,
    }
}

/// Serializes reminders into the current payload envelope.
pub fn reminders_payload(reminders: &[Reminder]) -> Result<Value, serde_json::Error> {
    Ok(json!({
        "version": REMINDERS_STORE_VERSION,
        "reminders": serde_json::to_value(reminders)?,
    }))
}

pub fn normalize_reminder_list(raw: &Value, now: DateTime<Utc>) -> Option<ReminderList> {
    let fields = Fields::of(raw);
    let id = fields.id()?;
    let created_at = fields.instant("createdAt").unwrap_or(now);

    Some(ReminderList {
        id,
        name: fields.string_or_empty("name"),
        emoji: fields.opt_string("emoji"),
        created_at,
        updated_at: fields.instant("updatedAt").unwrap_or(created_at),
        sort_key: fields.integer("sortKey").unwrap_or(0),
    })
}

pub fn migrate_reminder_lists_payload(
    raw: &Value,
    now: DateTime<Utc>,
) -> Migrated<Vec<ReminderList>> {
    let items = item_array(raw, "lists");
    let lists: Vec<ReminderList> = items
        .iter()
        .filter_map(|item| normalize_reminder_list(item, now))
        .collect();

    Migrated {
        dropped: items.len() - lists.len(),
        value: lists,
        source_version: payload_version(raw),
    }
}

pub fn reminder_lists_payload(lists: &[ReminderList]) -> Result<Value, serde_json::Error> {
    Ok(json!({
        "version": REMINDER_LISTS_STORE_VERSION,
        "lists": serde_json::to_value(lists)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::{migrate_reminders_payload, normalize_reminder, normalize_repeat};
    use crate::model::reminder::{Frequency, Priority};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn reminder_fields_are_coerced_with_defaults() {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let raw = json!({
            "id": "r1",
            "listId": 7,
            "title": "Pay rent",
            "remindAt": "2025-02-03T09:00:00.000Z",
            "dueAt": "not a date",
            "priority": "urgent",
            "sortKey": "3",
            "createdAt": "2025-01-30T10:00:00.000Z"
        });

        let reminder = normalize_reminder(&raw, now).unwrap();
        assert_eq!(reminder.list_id, "");
        assert_eq!(reminder.due_at, None);
        assert_eq!(
            reminder.remind_at,
            Some(Utc.with_ymd_and_hms(2025, 2, 3, 9, 0, 0).unwrap())
        );
        assert_eq!(reminder.priority, Priority::None);
        assert_eq!(reminder.sort_key, 0);
        assert_eq!(reminder.updated_at, reminder.created_at);
        assert_eq!(reminder.notification_fired_at, None);
    }

    #[test]
    fn repeat_rule_defaults_unknown_frequency_and_bad_interval() {
        let rule = normalize_repeat(&json!({ "freq": "hourly", "interval": 0, "byWeekday": [1, "2", 9, 3] }));
        assert_eq!(rule.freq, Frequency::Daily);
        assert_eq!(rule.interval, 1);
        assert_eq!(rule.by_weekday, Some(vec![1, 3]));
    }

    #[test]
    fn payload_without_version_is_flagged_for_rewrite() {
        let now = Utc::now();
        let migrated = migrate_reminders_payload(&json!([{ "id": "a" }, { "title": "no id" }]), now);
        assert_eq!(migrated.value.len(), 1);
        assert_eq!(migrated.dropped, 1);
        assert!(migrated.needs_rewrite(super::REMINDERS_STORE_VERSION));
    }
}
