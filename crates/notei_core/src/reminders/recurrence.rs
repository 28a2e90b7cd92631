//! Next-occurrence computation for repeating reminders.
//!
//! # Invariants
//! - Completed reminders and reminders without a repeat rule never produce an
//!   occurrence.
//! - Calendar stepping (months, years) happens in the context offset, so the
//!   local wall-clock time of the anchor is preserved.
//! - Month-end overflow follows chrono's native `checked_add_months`, which
//!   clamps to the last day of the target month (Jan 31 + 1 month = Feb 28/29).

use crate::model::reminder::{new_record_id, Frequency, Reminder, RepeatRule};
use crate::time::TimeContext;
use chrono::{DateTime, Days, FixedOffset, Months, Utc};

/// Computes the occurrence that follows `reminder`, or `None` when the series
/// is inert (completed, not repeating) or has passed its `end_at`.
///
/// The anchor is `due_at`, else `remind_at`, else `ctx.now`. Every non-null
/// schedule field is advanced by one step; the series end is checked against
/// the advanced anchor. The result gets a fresh id, keeps list and sort key,
/// and starts uncompleted and unfired.
pub fn next_occurrence(reminder: &Reminder, ctx: &TimeContext) -> Option<Reminder> {
    let rule = reminder.repeat.as_ref()?;
    if reminder.is_completed() {
        return None;
    }

    let anchor = reminder.anchor().unwrap_or(ctx.now);
    let next_anchor = step(anchor, rule, ctx.offset)?;
    if rule.end_at.is_some_and(|end_at| next_anchor > end_at) {
        return None;
    }

    let mut next = reminder.clone();
    next.id = new_record_id();
    next.due_at = match reminder.due_at {
        Some(due_at) => Some(step(due_at, rule, ctx.offset)?),
        None => None,
    };
    next.remind_at = match reminder.remind_at {
        Some(remind_at) => Some(step(remind_at, rule, ctx.offset)?),
        None => None,
    };
    next.completed_at = None;
    next.notification_fired_at = None;
    next.created_at = ctx.now;
    next.updated_at = ctx.now;
    Some(next)
}

/// Advances `anchor` by one repeat step.
///
/// Returns `None` only when the result is outside chrono's representable range.
pub fn step(anchor: DateTime<Utc>, rule: &RepeatRule, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let interval = rule.interval.max(1);
    let local = anchor.with_timezone(&offset);

    let stepped = match rule.freq {
        Frequency::Daily => local.checked_add_days(Days::new(u64::from(interval))),
        Frequency::Weekly => local.checked_add_days(Days::new(7 * u64::from(interval))),
        Frequency::Monthly => local.checked_add_months(Months::new(interval)),
        Frequency::Yearly => local.checked_add_months(Months::new(interval.checked_mul(12)?)),
        Frequency::Custom => local.checked_add_days(Days::new(1)),
    }?;

    Some(stepped.with_timezone(&Utc))
}
