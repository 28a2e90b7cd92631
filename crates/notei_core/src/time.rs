//! Fixed-offset time model shared by the calendar and reminder engines.
//!
//! # Responsibility
//! - Carry a "now" instant and a fixed UTC offset as one explicit value.
//! - Convert between absolute instants and local calendar dates.
//!
//! # Invariants
//! - All persisted instants are UTC; local interpretation only ever uses the
//!   offset carried by `TimeContext` (no time-zone database lookups).
//! - A "local day" is `[local midnight, next local midnight)`.

use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, Timelike,
    Utc,
};
use parking_lot::Mutex;

/// Snapshot of "now" plus the fixed offset used for local interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeContext {
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
}

impl TimeContext {
    /// Captures the system clock and the host's current UTC offset.
    pub fn system() -> Self {
        let local = Local::now();
        Self {
            now: local.with_timezone(&Utc),
            offset: local.offset().fix(),
        }
    }

    pub fn fixed(offset: FixedOffset, now: DateTime<Utc>) -> Self {
        Self { now, offset }
    }

    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::fixed(utc_offset(), now)
    }

    /// Returns `now` expressed in the context offset.
    pub fn local_now(&self) -> DateTime<FixedOffset> {
        self.now.with_timezone(&self.offset)
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    /// Local calendar date of `instant`.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_local(instant).date_naive()
    }

    /// Interprets a wall-clock value in the context offset.
    pub fn local_to_utc(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        (naive - Duration::seconds(i64::from(self.offset.local_minus_utc()))).and_utc()
    }

    /// Instant of local midnight at the start of `date`.
    pub fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        self.local_to_utc(date.and_time(NaiveTime::MIN))
    }

    /// Local midnight at or before `instant`.
    pub fn start_of_day(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.local_midnight(self.local_date(instant))
    }

    pub fn is_local_midnight(&self, instant: DateTime<Utc>) -> bool {
        let local = self.to_local(instant);
        local.num_seconds_from_midnight() == 0 && local.nanosecond() == 0
    }

    /// Half-open `[start, end)` bounds of the local day containing `date`.
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.local_midnight(date);
        (start, start + Duration::days(1))
    }
}

/// Source of the current instant and the offset used for local dates.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn offset(&self) -> FixedOffset;

    fn context(&self) -> TimeContext {
        TimeContext::fixed(self.offset(), self.now())
    }
}

/// Wall clock. Uses the host offset unless one is pinned.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    pinned_offset: Option<FixedOffset>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            pinned_offset: Some(offset),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.pinned_offset
            .unwrap_or_else(|| Local::now().offset().fix())
    }
}

/// Manually driven clock for deterministic callers.
#[derive(Debug)]
pub struct FixedClock {
    offset: FixedOffset,
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(offset: FixedOffset, now: DateTime<Utc>) -> Self {
        Self {
            offset,
            now: Mutex::new(now),
        }
    }

    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(utc_offset(), now)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock();
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Parses `Z`, `+HH:MM`, `-HH:MM`, `+HHMM` or `+HH` into a fixed offset.
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Some(utc_offset());
    }

    let (sign, rest) = match trimmed.chars().next()? {
        '+' => (1, &trimmed[1..]),
        '-' => (-1, &trimmed[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (
            digits[..2].parse::<i32>().ok()?,
            digits[2..].parse::<i32>().ok()?,
        ),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
