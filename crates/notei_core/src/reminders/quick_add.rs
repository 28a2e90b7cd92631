//! Single-line quick-add parser.
//!
//! Grammar fragments, checked in order (first match sets the anchor):
//! `in <N> h|hr|m|min`, `tomorrow`, `today`, `next week`; default is the
//! start of today. An `H:MM` token then replaces the anchor's time of day.
//! Matched fragments are removed from the title.

use crate::time::TimeContext;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").expect("valid time regex"));
static IN_OFFSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bin\s*(\d+)\s*(hr|h|min|m)\b").expect("valid relative offset regex")
});
static TODAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\btoday\b").expect("valid today regex"));
static TOMORROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\btomorrow\b").expect("valid tomorrow regex"));
static NEXT_WEEK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bnext\s+week\b").expect("valid next week regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Parsed quick-add line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuickAddResult {
    pub title: String,
    pub due_at: Option<DateTime<Utc>>,
    pub remind_at: Option<DateTime<Utc>>,
}

impl QuickAddResult {
    fn title_only(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Parses a quick-add line against `ctx`.
///
/// # Contract
/// - Never fails.
/// - `due_at` and `remind_at` are always equal.
/// - When stripping leaves no title, the untrimmed input becomes the title
///   and no timestamps are set.
pub fn parse_quick_add(input: &str, ctx: &TimeContext) -> QuickAddResult {
    let raw = input.trim();
    if raw.is_empty() {
        return QuickAddResult::title_only("");
    }

    let today = ctx.local_date(ctx.now);
    let mut consumed: Vec<&Regex> = Vec::new();
    let mut anchor: Option<DateTime<Utc>> = None;

    if let Some(caps) = IN_OFFSET_RE.captures(raw) {
        anchor = relative_offset(&caps).and_then(|offset| ctx.now.checked_add_signed(offset));
        consumed.push(&IN_OFFSET_RE);
    }
    if anchor.is_none() && TOMORROW_RE.is_match(raw) {
        anchor = Some(ctx.local_midnight(today + Duration::days(1)));
        consumed.push(&TOMORROW_RE);
    }
    if anchor.is_none() && TODAY_RE.is_match(raw) {
        anchor = Some(ctx.local_midnight(today));
        consumed.push(&TODAY_RE);
    }
    if anchor.is_none() && NEXT_WEEK_RE.is_match(raw) {
        anchor = Some(ctx.local_midnight(today + Duration::weeks(1)));
        consumed.push(&NEXT_WEEK_RE);
    }
    let mut anchor = anchor.unwrap_or_else(|| ctx.local_midnight(today));

    let mut time_token_found = false;
    if let Some(caps) = TIME_RE.captures(raw) {
        time_token_found = true;
        if let Some(time) = time_of_day(&caps) {
            anchor = ctx.local_to_utc(ctx.local_date(anchor).and_time(time));
        }
    }

    let mut title = raw.to_string();
    for re in consumed {
        title = re.replace_all(&title, " ").into_owned();
    }
    if time_token_found {
        title = TIME_RE.replace(&title, " ").into_owned();
    }
    let title = WHITESPACE_RE.replace_all(&title, " ").trim().to_string();

    if title.is_empty() {
        return QuickAddResult::title_only(input);
    }

    QuickAddResult {
        title,
        due_at: Some(anchor),
        remind_at: Some(anchor),
    }
}

fn relative_offset(caps: &Captures<'_>) -> Option<Duration> {
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2)?.as_str().to_ascii_lowercase().as_str() {
        "h" | "hr" => Duration::try_hours(amount),
        _ => Duration::try_minutes(amount),
    }
}

/// In-range `H:MM` token; `None` when hours > 23 or minutes > 59.
fn time_of_day(caps: &Captures<'_>) -> Option<NaiveTime> {
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}
