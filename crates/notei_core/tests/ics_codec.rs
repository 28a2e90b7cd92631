use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use notei_core::calendar::ics::{
    decode_calendar_text_with, encode_calendar_events_with, DecodeIssue,
};
use notei_core::model::event::{CalendarEvent, NewEvent};
use notei_core::time::TimeContext;
use proptest::prelude::*;

fn utc_ctx() -> TimeContext {
    TimeContext::utc(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
}

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn stored(new_event: NewEvent, ctx: &TimeContext) -> CalendarEvent {
    let mut event = CalendarEvent::from_new(new_event, ctx.now);
    event.normalize_all_day(ctx);
    event
}

fn wrap(body: &str) -> String {
    format!("BEGIN:VCALENDAR\nVERSION:2.0\n{body}END:VCALENDAR\n")
}

proptest! {
    #[test]
    fn timed_events_round_trip(
        start_secs in 946_684_800i64..4_102_444_800i64,
        length_secs in 0i64..(3 * 86_400),
        title in r"[a-zA-Z0-9 ,;:é\\\n]{0,90}",
    ) {
        let ctx = utc_ctx();
        let start = Utc.timestamp_opt(start_secs, 0).unwrap();
        let end = start + Duration::seconds(length_secs);
        let event = stored(NewEvent::timed(title.clone(), start, end), &ctx);

        let text = encode_calendar_events_with(&[event], &ctx);
        let report = decode_calendar_text_with(&text, &ctx);

        prop_assert!(report.issues.is_empty());
        prop_assert_eq!(report.events.len(), 1);
        let decoded = &report.events[0];
        prop_assert_eq!(decoded.start_at, start);
        prop_assert_eq!(decoded.end_at, end);
        prop_assert_eq!(&decoded.title, &title);
        prop_assert!(!decoded.all_day);
    }
}

#[test]
fn single_all_day_event_uses_date_values() {
    let ctx = utc_ctx();
    let event = stored(
        NewEvent::all_day("Holiday", at(2025, 3, 1, 0, 0), at(2025, 3, 2, 0, 0)),
        &ctx,
    );

    let text = encode_calendar_events_with(&[event], &ctx);
    assert!(text.contains("DTSTART;VALUE=DATE:20250301\r\n"));
    assert!(text.contains("DTEND;VALUE=DATE:20250302\r\n"));

    let decoded = decode_calendar_text_with(&text, &ctx).events;
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].start_at, at(2025, 3, 1, 0, 0));
    assert_eq!(decoded[0].end_at, at(2025, 3, 2, 0, 0));
    assert!(decoded[0].all_day);
}

#[test]
fn multi_day_all_day_event_round_trips_in_local_offset() {
    let offset = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
    let ctx = TimeContext::fixed(offset, at(2025, 1, 1, 0, 0));
    // 2025-04-10 00:00 local .. 2025-04-13 00:00 local (exclusive).
    let start = at(2025, 4, 9, 18, 30);
    let end = at(2025, 4, 12, 18, 30);
    let event = stored(NewEvent::all_day("Trip", start, end), &ctx);

    let text = encode_calendar_events_with(&[event.clone()], &ctx);
    assert!(text.contains("DTSTART;VALUE=DATE:20250410"));
    assert!(text.contains("DTEND;VALUE=DATE:20250413"));

    let decoded = &decode_calendar_text_with(&text, &ctx).events[0];
    assert_eq!(decoded.start_at, event.start_at);
    assert_eq!(decoded.end_at, event.end_at);
    assert!(decoded.all_day);
}

#[test]
fn all_day_end_with_time_of_day_exports_next_date() {
    let ctx = utc_ctx();
    // Stored without normalization, as a legacy record might be.
    let event = CalendarEvent::from_new(
        NewEvent::all_day("Offsite", at(2025, 5, 5, 0, 0), at(2025, 5, 6, 17, 0)),
        ctx.now,
    );

    let text = encode_calendar_events_with(&[event], &ctx);
    assert!(text.contains("DTEND;VALUE=DATE:20250507"));
}

#[test]
fn encoder_emits_wrapper_uid_and_crlf_lines() {
    let ctx = utc_ctx();
    let mut event = stored(
        NewEvent::timed("Sync", at(2025, 6, 2, 9, 0), at(2025, 6, 2, 9, 30)),
        &ctx,
    );
    event.id = "evt-1".to_string();
    event.notes = Some("line one\nline two; with, punctuation".to_string());
    event.location = Some(String::new());

    let text = encode_calendar_events_with(&[event], &ctx);
    assert!(text.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Notei//Calendar//EN\r\n"));
    assert!(text.ends_with("END:VCALENDAR\r\n"));
    assert!(text.contains("UID:evt-1@notei\r\n"));
    assert!(text.contains("DTSTAMP:20250601T120000Z\r\n"));
    assert!(text.contains("DTSTART:20250602T090000Z\r\n"));
    assert!(text.contains("DESCRIPTION:line one\\nline two\\; with\\, punctuation\r\n"));
    assert!(!text.contains("LOCATION"));
    assert!(!text.replace("\r\n", "").contains('\n'));
}

#[test]
fn long_lines_are_folded_and_unfold_on_decode() {
    let ctx = utc_ctx();
    let title = "Quarterly planning ".repeat(8);
    let event = stored(
        NewEvent::timed(title.clone(), at(2025, 6, 2, 9, 0), at(2025, 6, 2, 10, 0)),
        &ctx,
    );

    let text = encode_calendar_events_with(&[event], &ctx);
    assert!(text.split("\r\n").all(|line| line.len() <= 75));
    assert!(text.contains("\r\n "));

    let decoded = decode_calendar_text_with(&text, &ctx).events;
    assert_eq!(decoded[0].title, title);
}

#[test]
fn decoder_unfolds_lf_input_and_ignores_parameters() {
    let ctx = utc_ctx();
    let text = wrap(
        "BEGIN:VEVENT\n\
         summary;LANGUAGE=en:Team\n  standup\n\
         DTSTART;TZID=Europe/Paris:20250602T090000Z\n\
         DTEND:20250602T093000Z\n\
         LOCATION:Room 4\\, east wing\n\
         END:VEVENT\n",
    );

    let report = decode_calendar_text_with(&text, &ctx);
    assert!(report.issues.is_empty());
    let event = &report.events[0];
    assert_eq!(event.title, "Team standup");
    assert_eq!(event.location.as_deref(), Some("Room 4, east wing"));
    assert_eq!(event.start_at, at(2025, 6, 2, 9, 0));
    assert_eq!(event.end_at, at(2025, 6, 2, 9, 30));
}

#[test]
fn floating_times_and_missing_ends_use_defaults() {
    let ctx = TimeContext::fixed(FixedOffset::west_opt(4 * 3600).unwrap(), at(2025, 1, 1, 0, 0));
    let text = wrap(
        "BEGIN:VEVENT\r\nSUMMARY:Call\r\nDTSTART:20250602T090000\r\nEND:VEVENT\r\n\
         BEGIN:VEVENT\r\nSUMMARY:Day off\r\nDTSTART;VALUE=DATE:20250603\r\nEND:VEVENT\r\n",
    );

    let events = decode_calendar_text_with(&text, &ctx).events;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].start_at, at(2025, 6, 2, 13, 0));
    assert_eq!(events[0].end_at, at(2025, 6, 2, 14, 0));
    assert!(!events[0].all_day);
    assert_eq!(events[1].start_at, at(2025, 6, 3, 4, 0));
    assert_eq!(events[1].end_at - events[1].start_at, Duration::days(1));
    assert!(events[1].all_day);
}

#[test]
fn reopening_vevent_flushes_the_previous_one() {
    let ctx = utc_ctx();
    let text = wrap(
        "BEGIN:VEVENT\nSUMMARY:First\nDTSTART:20250602T090000Z\n\
         BEGIN:VEVENT\nSUMMARY:Second\nDTSTART:20250602T100000Z\nEND:VEVENT\n",
    );

    let titles: Vec<String> = decode_calendar_text_with(&text, &ctx)
        .events
        .into_iter()
        .map(|event| event.title)
        .collect();
    assert_eq!(titles, vec!["First", "Second"]);
}

#[test]
fn malformed_dates_fall_back_and_are_reported() {
    let ctx = utc_ctx();
    let text = wrap(
        "BEGIN:VEVENT\nSUMMARY:Broken\nDTSTART:not-a-date\nEND:VEVENT\n\
         BEGIN:VEVENT\nSUMMARY:No start\nEND:VEVENT\n",
    );

    let report = decode_calendar_text_with(&text, &ctx);
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].start_at, ctx.now);
    assert_eq!(report.events[0].end_at, ctx.now + Duration::hours(1));
    assert_eq!(
        report.issues,
        vec![
            DecodeIssue::MalformedDate {
                property: "DTSTART",
                value: "not-a-date".to_string(),
            },
            DecodeIssue::MissingStart { block: 1 },
        ]
    );
}

#[test]
fn events_outside_calendar_and_nested_components_are_ignored() {
    let ctx = utc_ctx();
    let text = "BEGIN:VEVENT\nSUMMARY:Stray\nDTSTART:20250602T090000Z\nEND:VEVENT\n\
                BEGIN:VCALENDAR\n\
                BEGIN:VEVENT\nSUMMARY:Kept\nDESCRIPTION:agenda\nDTSTART:20250602T090000Z\n\
                BEGIN:VALARM\nDESCRIPTION:alarm text\nEND:VALARM\n\
                END:VEVENT\n\
                END:VCALENDAR\n";

    let events = decode_calendar_text_with(text, &ctx).events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Kept");
    assert_eq!(events[0].description.as_deref(), Some("agenda"));
}

#[test]
fn empty_or_garbage_input_decodes_to_nothing() {
    let ctx = utc_ctx();
    assert!(decode_calendar_text_with("", &ctx).events.is_empty());
    assert!(decode_calendar_text_with("hello\nworld", &ctx).events.is_empty());
}
