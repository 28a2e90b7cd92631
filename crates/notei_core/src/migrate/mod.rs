//! Versioned normalization of persisted JSON payloads.
//!
//! # Responsibility
//! - Turn untyped store payloads (any historical shape) into typed records.
//! - Report whether a payload must be rewritten at the current version.
//!
//! # Invariants
//! - Normalization never fails: unusable items are dropped, unusable fields
//!   fall back to documented defaults.
//! - Records without a non-empty string `id` are always dropped.
//!
//! Accepted envelopes: `{ "version": N, "<items>": [...] }`, a bare array, or
//! either of those wrapped in `{ "data": ... }`.

pub mod calendar;
pub mod reminders;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub const REMINDERS_STORE_VERSION: u32 = 1;
pub const REMINDER_LISTS_STORE_VERSION: u32 = 1;
pub const CALENDAR_EVENTS_STORE_VERSION: u32 = 1;
pub const CALENDAR_SETTINGS_STORE_VERSION: u32 = 1;

/// Result of normalizing one stored payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated<T> {
    pub value: T,
    /// Version found in the payload; `0` when absent.
    pub source_version: u32,
    /// Items dropped because they could not be reconciled.
    pub dropped: usize,
}

impl<T> Migrated<T> {
    /// Whether the normalized value should be written back.
    pub fn needs_rewrite(&self, current_version: u32) -> bool {
        self.source_version != current_version
    }
}

/// Reads the payload `version`, treating anything non-numeric as `0`.
pub fn payload_version(raw: &Value) -> u32 {
    raw.as_object()
        .and_then(|object| object.get("version"))
        .and_then(Value::as_u64)
        .and_then(|version| u32::try_from(version).ok())
        .unwrap_or(0)
}

/// Locates the item array inside any accepted envelope.
pub(crate) fn item_array<'a>(raw: &'a Value, field: &str) -> &'a [Value] {
    let data = match raw.as_object().and_then(|object| object.get("data")) {
        Some(inner) if inner.is_object() || inner.is_array() => inner,
        _ => raw,
    };

    match data {
        Value::Array(items) => items.as_slice(),
        Value::Object(object) => match object.get(field) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    }
}

/// Typed, defaulting accessors over one untyped JSON record.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fields<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
    pub(crate) fn of(value: &'a Value) -> Self {
        Self {
            map: value.as_object(),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|map| map.get(key))
    }

    pub(crate) fn str(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(Value::as_str)
    }

    pub(crate) fn string_or_empty(&self, key: &str) -> String {
        self.str(key).unwrap_or_default().to_string()
    }

    pub(crate) fn opt_string(&self, key: &str) -> Option<String> {
        self.str(key).map(str::to_string)
    }

    /// Non-empty `id`, the one field every record requires.
    pub(crate) fn id(&self) -> Option<String> {
        self.str("id")
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    pub(crate) fn instant(&self, key: &str) -> Option<DateTime<Utc>> {
        self.str(key).and_then(parse_instant)
    }

    pub(crate) fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64).filter(|n| n.is_finite())
    }

    pub(crate) fn integer(&self, key: &str) -> Option<i64> {
        self.number(key).map(|n| n.trunc() as i64)
    }

    pub(crate) fn is_true(&self, key: &str) -> bool {
        self.get(key) == Some(&Value::Bool(true))
    }

    pub(crate) fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// String entries of an array field; non-strings are discarded.
    pub(crate) fn strings(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    }

    pub(crate) fn object(&self, key: &str) -> Option<&'a Value> {
        self.get(key).filter(|value| value.is_object())
    }

    pub(crate) fn array(&self, key: &str) -> Option<&'a [Value]> {
        self.get(key).and_then(Value::as_array).map(Vec::as_slice)
    }
}

/// Parses an RFC 3339 instant (the stores' ISO-8601 strings).
pub(crate) fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::{item_array, parse_instant, payload_version, Fields};
    use serde_json::json;

    #[test]
    fn item_array_accepts_all_envelopes() {
        let items = json!([{ "id": "a" }]);
        assert_eq!(item_array(&items, "reminders").len(), 1);
        assert_eq!(
            item_array(&json!({ "version": 1, "reminders": items.clone() }), "reminders").len(),
            1
        );
        assert_eq!(item_array(&json!({ "data": items.clone() }), "reminders").len(), 1);
        assert_eq!(
            item_array(&json!({ "data": { "reminders": items } }), "reminders").len(),
            1
        );
        assert!(item_array(&json!("x"), "reminders").is_empty());
        assert!(item_array(&json!(null), "reminders").is_empty());
    }

    #[test]
    fn payload_version_defaults_to_zero() {
        assert_eq!(payload_version(&json!({ "version": 1 })), 1);
        assert_eq!(payload_version(&json!({ "version": "1" })), 0);
        assert_eq!(payload_version(&json!([])), 0);
    }

    #[test]
    fn fields_type_check_values() {
        let value = json!({ "id": "", "n": 2.9, "flag": "true", "tags": ["a", 1, "b"] });
        let fields = Fields::of(&value);
        assert_eq!(fields.id(), None);
        assert_eq!(fields.integer("n"), Some(2));
        assert!(!fields.is_true("flag"));
        assert_eq!(fields.strings("tags"), Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn parse_instant_accepts_millisecond_iso_strings() {
        let parsed = parse_instant("2025-02-10T09:00:00.000Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-02-10T09:00:00+00:00");
        assert!(parse_instant("yesterday").is_none());
    }
}
