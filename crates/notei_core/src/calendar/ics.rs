//! iCalendar (RFC 5545) codec for the VEVENT subset used by import/export.
//!
//! # Responsibility
//! - Decode SUMMARY/DESCRIPTION/LOCATION/DTSTART/DTEND from VEVENT blocks.
//! - Encode stored events as a VCALENDAR document with CRLF line endings.
//!
//! # Invariants
//! - Decoding never fails; malformed values fall back and are reported as
//!   `DecodeIssue`s next to the decoded events.
//! - All-day ends are exclusive dates on both sides, so
//!   `decode(encode(e))` reproduces start/end/all-day for valid events.
//! - Encoded content lines never exceed 75 octets; folds fall on UTF-8
//!   character boundaries.

use crate::model::event::{CalendarEvent, NewEvent};
use crate::time::TimeContext;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use log::warn;

const PRODID: &str = "-//Notei//Calendar//EN";
const UID_DOMAIN: &str = "notei";
const MAX_LINE_OCTETS: usize = 75;
const DATE_FORMAT: &str = "%Y%m%d";
const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Read-only projection of one decoded VEVENT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIcsEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
}

impl ParsedIcsEvent {
    /// Converts into a create request; the caller assigns id and links.
    pub fn into_new_event(self) -> NewEvent {
        let mut new_event = if self.all_day {
            NewEvent::all_day(self.title, self.start_at, self.end_at)
        } else {
            NewEvent::timed(self.title, self.start_at, self.end_at)
        };
        new_event.notes = self.description;
        new_event.location = self.location;
        new_event
    }
}

/// Non-fatal problem found while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeIssue {
    /// Date value could not be parsed; the current instant was used.
    MalformedDate {
        property: &'static str,
        value: String,
    },
    /// VEVENT without DTSTART; the block was skipped.
    MissingStart { block: usize },
}

/// Decoded events plus the fallbacks taken to produce them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    pub events: Vec<ParsedIcsEvent>,
    pub issues: Vec<DecodeIssue>,
}

/// Decodes with the system clock and host offset.
pub fn decode_calendar_text(text: &str) -> Vec<ParsedIcsEvent> {
    decode_calendar_text_with(text, &TimeContext::system()).events
}

/// Decodes VEVENT blocks nested in a VCALENDAR block.
///
/// Floating date-times and all-day dates are read in `ctx.offset`.
pub fn decode_calendar_text_with(text: &str, ctx: &TimeContext) -> DecodeReport {
    let mut report = DecodeReport::default();
    let mut calendar_depth = 0usize;
    let mut current: Option<PendingEvent> = None;
    let mut block = 0usize;

    for line in unfold_lines(text) {
        let Some((name, value)) = split_content_line(&line) else {
            continue;
        };
        let component = value.trim();

        match name.as_str() {
            "BEGIN" if component.eq_ignore_ascii_case("VCALENDAR") => calendar_depth += 1,
            "END" if component.eq_ignore_ascii_case("VCALENDAR") => {
                if let Some(pending) = current.take() {
                    pending.flush(ctx, &mut report);
                }
                calendar_depth = calendar_depth.saturating_sub(1);
            }
            "BEGIN" if component.eq_ignore_ascii_case("VEVENT") && calendar_depth > 0 => {
                if let Some(pending) = current.take() {
                    pending.flush(ctx, &mut report);
                }
                current = Some(PendingEvent::new(block));
                block += 1;
            }
            "END" if component.eq_ignore_ascii_case("VEVENT") => {
                if let Some(pending) = current.take() {
                    pending.flush(ctx, &mut report);
                }
            }
            // Nested components (VALARM, ...) must not overwrite event fields.
            "BEGIN" => {
                if let Some(pending) = current.as_mut() {
                    pending.nested += 1;
                }
            }
            "END" => {
                if let Some(pending) = current.as_mut() {
                    pending.nested = pending.nested.saturating_sub(1);
                }
            }
            _ => {
                if let Some(pending) = current.as_mut().filter(|pending| pending.nested == 0) {
                    pending.set(&name, value);
                }
            }
        }
    }
    if let Some(pending) = current.take() {
        pending.flush(ctx, &mut report);
    }

    report
}

/// Encodes with the host offset for all-day dates.
pub fn encode_calendar_events(events: &[CalendarEvent]) -> String {
    encode_calendar_events_with(events, &TimeContext::system())
}

/// Encodes events as a VCALENDAR document. All-day dates use `ctx.offset`.
pub fn encode_calendar_events_with(events: &[CalendarEvent], ctx: &TimeContext) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
    ];

    for event in events {
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}@{UID_DOMAIN}", event.id));
        lines.push(format!("DTSTAMP:{}", format_utc(event.created_at)));
        if event.all_day {
            lines.push(format!(
                "DTSTART;VALUE=DATE:{}",
                ctx.local_date(event.start_at).format(DATE_FORMAT)
            ));
            lines.push(format!(
                "DTEND;VALUE=DATE:{}",
                exclusive_end_date(event.end_at, ctx).format(DATE_FORMAT)
            ));
        } else {
            lines.push(format!("DTSTART:{}", format_utc(event.start_at)));
            lines.push(format!("DTEND:{}", format_utc(event.end_at)));
        }
        lines.push(format!("SUMMARY:{}", escape_text(&event.title)));
        if let Some(notes) = event.notes.as_deref().filter(|notes| !notes.is_empty()) {
            lines.push(format!("DESCRIPTION:{}", escape_text(notes)));
        }
        if let Some(location) = event.location.as_deref().filter(|loc| !loc.is_empty()) {
            lines.push(format!("LOCATION:{}", escape_text(location)));
        }
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    out
}

/// Escapes TEXT values. Backslash goes first.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`escape_text`], in one left-to-right pass.
///
/// Unknown escapes keep their backslash.
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(',') => out.push(','),
            Some(';') => out.push(';'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Splits `line` into CRLF-joined physical lines of at most 75 octets.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut width = 0;
    for ch in line.chars() {
        if width + ch.len_utf8() > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += ch.len_utf8();
    }
    out
}

/// Normalizes line endings and joins continuation lines.
pub fn unfold_lines(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in normalized.split('\n') {
        if line.starts_with([' ', '\t']) && !current.is_empty() {
            current.push_str(&line[1..]);
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current = line.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Returns the upper-cased property name (parameters dropped) and raw value.
fn split_content_line(line: &str) -> Option<(String, &str)> {
    let (head, value) = line.split_once(':')?;
    let name = head.split(';').next().unwrap_or(head).trim();
    Some((name.to_ascii_uppercase(), value))
}

fn format_utc(instant: DateTime<Utc>) -> String {
    format!("{}Z", instant.format(DATE_TIME_FORMAT))
}

/// Exclusive DTEND date: a non-midnight end belongs to its local day, so the
/// exclusive bound is the day after.
fn exclusive_end_date(end_at: DateTime<Utc>, ctx: &TimeContext) -> NaiveDate {
    let date = ctx.local_date(end_at);
    if ctx.is_local_midnight(end_at) {
        date
    } else {
        date.succ_opt().unwrap_or(date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IcsDate {
    instant: DateTime<Utc>,
    all_day: bool,
}

fn parse_ics_date(value: &str, ctx: &TimeContext) -> Option<IcsDate> {
    let value = value.trim();
    if value.len() == 8 {
        let date = NaiveDate::parse_from_str(value, DATE_FORMAT).ok()?;
        return Some(IcsDate {
            instant: ctx.local_midnight(date),
            all_day: true,
        });
    }

    if value.len() >= 15 && value.as_bytes().get(8) == Some(&b'T') {
        let naive = NaiveDateTime::parse_from_str(value.get(..15)?, DATE_TIME_FORMAT).ok()?;
        let instant = match &value[15..] {
            "Z" | "z" => naive.and_utc(),
            "" => ctx.local_to_utc(naive),
            _ => return None,
        };
        return Some(IcsDate {
            instant,
            all_day: false,
        });
    }

    None
}

/// Raw property values of the VEVENT being read.
#[derive(Debug, Default)]
struct PendingEvent {
    block: usize,
    nested: usize,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    dt_start: Option<String>,
    dt_end: Option<String>,
}

impl PendingEvent {
    fn new(block: usize) -> Self {
        Self {
            block,
            ..Self::default()
        }
    }

    fn set(&mut self, name: &str, value: &str) {
        let slot = match name {
            "SUMMARY" => &mut self.summary,
            "DESCRIPTION" => &mut self.description,
            "LOCATION" => &mut self.location,
            "DTSTART" => &mut self.dt_start,
            "DTEND" => &mut self.dt_end,
            _ => return,
        };
        *slot = Some(value.to_string());
    }

    fn flush(self, ctx: &TimeContext, report: &mut DecodeReport) {
        let Some(raw_start) = self.dt_start.filter(|value| !value.trim().is_empty()) else {
            warn!(
                "event=ics_decode module=calendar status=skip reason=missing_dtstart block={}",
                self.block
            );
            report
                .issues
                .push(DecodeIssue::MissingStart { block: self.block });
            return;
        };

        let start = resolve_date("DTSTART", &raw_start, ctx, report);
        let end_at = match self.dt_end.filter(|value| !value.trim().is_empty()) {
            Some(raw_end) => resolve_date("DTEND", &raw_end, ctx, report).instant,
            None if start.all_day => start.instant + Duration::days(1),
            None => start.instant + Duration::hours(1),
        };

        report.events.push(ParsedIcsEvent {
            title: unescape_text(self.summary.as_deref().unwrap_or_default()),
            description: self.description.as_deref().map(unescape_text),
            location: self.location.as_deref().map(unescape_text),
            start_at: start.instant,
            end_at: end_at.max(start.instant),
            all_day: start.all_day,
        });
    }
}

fn resolve_date(
    property: &'static str,
    value: &str,
    ctx: &TimeContext,
    report: &mut DecodeReport,
) -> IcsDate {
    match parse_ics_date(value, ctx) {
        Some(date) => date,
        None => {
            warn!(
                "event=ics_decode module=calendar status=fallback property={property} value_len={}",
                value.len()
            );
            report.issues.push(DecodeIssue::MalformedDate {
                property,
                value: value.to_string(),
            });
            IcsDate {
                instant: ctx.now,
                all_day: false,
            }
        }
    }
}
