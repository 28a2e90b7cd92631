//! Day-view column packing and the 15-minute slot grid.
//!
//! # Invariants
//! - Two entries sharing a `column_index` never overlap (`[start, end)`).
//! - Every entry reports the same `total_columns`: the column count of the
//!   whole input, not of its overlap cluster.
//! - Equal starts keep their input order.

use crate::calendar::ics::ParsedIcsEvent;
use crate::model::event::CalendarEvent;
use crate::time::TimeContext;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::ops::Range;

pub const SLOT_MINUTES: i64 = 15;
pub const MIN_DURATION_MINUTES: i64 = 30;

/// Anything with a half-open time window.
pub trait TimeRange {
    fn start(&self) -> DateTime<Utc>;
    fn end(&self) -> DateTime<Utc>;

    fn overlaps<T: TimeRange + ?Sized>(&self, other: &T) -> bool {
        self.start() < other.end() && other.start() < self.end()
    }
}

impl TimeRange for CalendarEvent {
    fn start(&self) -> DateTime<Utc> {
        self.start_at
    }

    fn end(&self) -> DateTime<Utc> {
        self.end_at
    }
}

impl TimeRange for ParsedIcsEvent {
    fn start(&self) -> DateTime<Utc> {
        self.start_at
    }

    fn end(&self) -> DateTime<Utc> {
        self.end_at
    }
}

impl TimeRange for Range<DateTime<Utc>> {
    fn start(&self) -> DateTime<Utc> {
        self.start
    }

    fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// One placed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSlot<'a, E> {
    pub event: &'a E,
    pub column_index: usize,
    pub total_columns: usize,
}

/// Packs one day's events into first-fit columns.
///
/// Events are visited by ascending start; each goes into the leftmost column
/// with no overlapping member. Output follows the visiting order. The caller
/// pre-filters to a single day.
pub fn layout_day<E: TimeRange>(events: &[E]) -> Vec<LayoutSlot<'_, E>> {
    let mut sorted: Vec<&E> = events.iter().collect();
    sorted.sort_by_key(|event| event.start());

    let mut columns: Vec<Vec<&E>> = Vec::new();
    let mut placed: Vec<(&E, usize)> = Vec::with_capacity(sorted.len());

    for event in sorted {
        let free = columns
            .iter()
            .position(|column| column.iter().all(|member| !member.overlaps(event)));
        let column_index = match free {
            Some(index) => index,
            None => {
                columns.push(Vec::new());
                columns.len() - 1
            }
        };
        columns[column_index].push(event);
        placed.push((event, column_index));
    }

    let total_columns = columns.len();
    placed
        .into_iter()
        .map(|(event, column_index)| LayoutSlot {
            event,
            column_index,
            total_columns,
        })
        .collect()
}

/// Rounds minutes to the nearest slot boundary, never below zero.
pub fn snap_to_slot(minutes_from_day_start: i64) -> i64 {
    let slot = (minutes_from_day_start + SLOT_MINUTES / 2).div_euclid(SLOT_MINUTES) * SLOT_MINUTES;
    slot.max(0)
}

/// Duration in minutes for a drag between two slot indices, at least
/// [`MIN_DURATION_MINUTES`].
pub fn clamp_duration_minutes(start_slot: i64, end_slot: i64) -> i64 {
    let slots = (end_slot - start_slot).max(MIN_DURATION_MINUTES / SLOT_MINUTES);
    snap_to_slot(slots * SLOT_MINUTES)
}

pub fn slot_to_minutes(slot_index: i64) -> i64 {
    slot_index * SLOT_MINUTES
}

/// Minutes between the visible day start (`day_start_hour`, local) and
/// `instant`, floored at zero.
pub fn minutes_from_day_start(instant: DateTime<Utc>, day_start_hour: u8, ctx: &TimeContext) -> i64 {
    let day_start = visible_day_start(ctx.local_date(instant), day_start_hour, ctx);
    (instant - day_start).num_minutes().max(0)
}

/// Inverse of [`minutes_from_day_start`] for a given local `day`.
pub fn minutes_to_instant(
    day: NaiveDate,
    day_start_hour: u8,
    minutes_from_start: i64,
    ctx: &TimeContext,
) -> DateTime<Utc> {
    visible_day_start(day, day_start_hour, ctx) + Duration::minutes(minutes_from_start)
}

fn visible_day_start(day: NaiveDate, day_start_hour: u8, ctx: &TimeContext) -> DateTime<Utc> {
    let hour = NaiveTime::from_hms_opt(u32::from(day_start_hour.min(23)), 0, 0)
        .unwrap_or(NaiveTime::MIN);
    ctx.local_to_utc(day.and_time(hour))
}
