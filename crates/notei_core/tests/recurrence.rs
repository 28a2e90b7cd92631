use chrono::{DateTime, Duration, TimeZone, Utc};
use notei_core::model::reminder::{Frequency, Reminder, RepeatRule};
use notei_core::reminders::recurrence::next_occurrence;
use notei_core::time::TimeContext;

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
}

fn repeating(rule: RepeatRule, due_at: DateTime<Utc>) -> Reminder {
    let mut reminder = Reminder::new("inbox", "water plants", at(2024, 12, 1));
    reminder.due_at = Some(due_at);
    reminder.remind_at = Some(due_at);
    reminder.repeat = Some(rule);
    reminder.sort_key = 7;
    reminder
}

#[test]
fn daily_series_steps_exactly_one_day_each_time() {
    let ctx = TimeContext::utc(at(2025, 1, 1));
    let mut current = repeating(RepeatRule::new(Frequency::Daily, 1), at(2025, 1, 1));

    for _ in 0..30 {
        let next = next_occurrence(&current, &ctx).expect("open-ended series continues");
        assert_eq!(next.due_at.unwrap() - current.due_at.unwrap(), Duration::hours(24));
        assert_ne!(next.id, current.id);
        current = next;
    }
    assert_eq!(current.due_at, Some(at(2025, 1, 31)));
}

#[test]
fn series_ends_when_next_instant_passes_end() {
    let ctx = TimeContext::utc(at(2025, 1, 1));
    let anchor = at(2025, 1, 1);
    let next_instant = anchor + Duration::days(1);
    let rule = RepeatRule::new(Frequency::Daily, 1).until(next_instant - Duration::seconds(1));

    assert!(next_occurrence(&repeating(rule, anchor), &ctx).is_none());

    let inclusive = RepeatRule::new(Frequency::Daily, 1).until(next_instant);
    assert!(next_occurrence(&repeating(inclusive, anchor), &ctx).is_some());
}

#[test]
fn biweekly_series_past_end_yields_nothing() {
    let ctx = TimeContext::utc(at(2025, 1, 1));
    let anchor = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
    let reminder = repeating(RepeatRule::new(Frequency::Weekly, 2).until(end), anchor);

    assert!(next_occurrence(&reminder, &ctx).is_none());
}

#[test]
fn occurrence_resets_status_and_keeps_placement() {
    let now = at(2025, 3, 1);
    let ctx = TimeContext::utc(now);
    let mut source = repeating(RepeatRule::new(Frequency::Monthly, 1), at(2025, 2, 1));
    source.notification_fired_at = Some(at(2025, 2, 1));
    source.notes = Some("kitchen and balcony".to_string());

    let next = next_occurrence(&source, &ctx).unwrap();
    assert_eq!(next.due_at, Some(at(2025, 3, 1)));
    assert_eq!(next.remind_at, Some(at(2025, 3, 1)));
    assert_eq!(next.notification_fired_at, None);
    assert_eq!(next.completed_at, None);
    assert_eq!(next.list_id, source.list_id);
    assert_eq!(next.sort_key, source.sort_key);
    assert_eq!(next.notes, source.notes);
    assert_eq!(next.repeat, source.repeat);
    assert_eq!(next.created_at, now);
}

#[test]
fn completed_or_non_repeating_reminders_never_continue() {
    let ctx = TimeContext::utc(at(2025, 1, 1));
    let mut completed = repeating(RepeatRule::new(Frequency::Daily, 1), at(2025, 1, 1));
    completed.completed_at = Some(at(2025, 1, 1));
    assert!(next_occurrence(&completed, &ctx).is_none());

    let mut plain = Reminder::new("inbox", "once", at(2025, 1, 1));
    plain.due_at = Some(at(2025, 1, 2));
    assert!(next_occurrence(&plain, &ctx).is_none());
}

#[test]
fn unscheduled_repeating_reminder_anchors_on_now_but_stays_unscheduled() {
    let ctx = TimeContext::utc(at(2025, 1, 1));
    let mut reminder = Reminder::new("inbox", "stretch", at(2025, 1, 1));
    reminder.repeat = Some(RepeatRule::new(Frequency::Daily, 1).until(at(2024, 12, 31)));
    assert!(next_occurrence(&reminder, &ctx).is_none());

    reminder.repeat = Some(RepeatRule::new(Frequency::Daily, 1));
    let next = next_occurrence(&reminder, &ctx).unwrap();
    assert_eq!(next.due_at, None);
    assert_eq!(next.remind_at, None);
}
