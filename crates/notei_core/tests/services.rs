use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use notei_core::model::event::NewEvent;
use notei_core::model::reminder::{Frequency, NewReminder, RepeatRule};
use notei_core::repo::document_store::MemoryDocumentStore;
use notei_core::repo::event_repo::{DocumentEventRepository, EventRepository};
use notei_core::repo::reminder_repo::{DocumentReminderRepository, ReminderRepository};
use notei_core::service::calendar_service::CalendarService;
use notei_core::service::reminder_service::ReminderService;
use notei_core::service::ServiceError;
use notei_core::time::{Clock, FixedClock};
use std::sync::Arc;

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
}

fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::utc(noon()))
}

fn calendar() -> CalendarService<DocumentEventRepository<MemoryDocumentStore>> {
    let clock = clock();
    CalendarService::new(
        DocumentEventRepository::new(MemoryDocumentStore::new(), clock.clone()),
        clock,
    )
}

fn reminders() -> ReminderService<DocumentReminderRepository<MemoryDocumentStore>> {
    let clock = clock();
    ReminderService::new(
        DocumentReminderRepository::new(MemoryDocumentStore::new(), clock.clone()),
        clock,
    )
}

const TEAM_CALENDAR: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Design review\r\n\
DTSTART:20250611T090000Z\r\n\
DTEND:20250611T100000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Pairing\r\n\
DTSTART:20250611T093000Z\r\n\
DTEND:20250611T110000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Offsite\r\n\
DTSTART;VALUE=DATE:20250611\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Broken\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

#[test]
fn import_stores_events_and_reports_issues() {
    let service = calendar();
    let summary = service.import_ics(TEAM_CALENDAR).unwrap();

    assert_eq!(summary.imported.len(), 3);
    assert_eq!(summary.issues.len(), 1);
    let stored = service.repo().load_events().unwrap();
    let ids: Vec<&str> = stored.iter().map(|event| event.id.as_str()).collect();
    let imported: Vec<&str> = summary.imported.iter().map(String::as_str).collect();
    assert_eq!(ids, imported);
}

#[test]
fn day_layout_skips_all_day_events_and_packs_columns() {
    let service = calendar();
    service.import_ics(TEAM_CALENDAR).unwrap();

    let placed = service
        .layout_for_day(NaiveDate::from_ymd_opt(2025, 6, 11).unwrap())
        .unwrap();
    let summary: Vec<(&str, usize, usize)> = placed
        .iter()
        .map(|p| (p.event.title.as_str(), p.column_index, p.total_columns))
        .collect();
    assert_eq!(summary, vec![("Design review", 0, 2), ("Pairing", 1, 2)]);

    let empty = service
        .layout_for_day(NaiveDate::from_ymd_opt(2025, 6, 12).unwrap())
        .unwrap();
    assert!(empty.is_empty());
}

#[test]
fn export_round_trips_through_import() {
    let source = calendar();
    source
        .repo()
        .create_event(NewEvent::timed(
            "Retro",
            noon() + Duration::days(1),
            noon() + Duration::days(1) + Duration::minutes(45),
        ))
        .unwrap();
    let text = source.export_ics().unwrap();

    let target = calendar();
    let summary = target.import_ics(&text).unwrap();
    assert!(summary.issues.is_empty());
    let events = target.repo().load_events().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Retro");
    assert_eq!(events[0].end_at - events[0].start_at, Duration::minutes(45));
}

#[test]
fn invalid_event_window_is_rejected() {
    let service = calendar();
    let err = service
        .repo()
        .create_event(NewEvent::timed("Backwards", noon(), noon() - Duration::hours(1)))
        .unwrap_err();
    assert!(matches!(
        ServiceError::from(err),
        ServiceError::InvalidEvent(_)
    ));
    assert!(service.repo().load_events().unwrap().is_empty());
}

#[test]
fn quick_add_stores_parsed_reminder() {
    let service = reminders();
    let reminder = service.quick_add("inbox", "Dentist tomorrow 9:00").unwrap();

    let expected = Utc.with_ymd_and_hms(2025, 6, 11, 9, 0, 0).unwrap();
    assert_eq!(reminder.title, "Dentist");
    assert_eq!(reminder.due_at, Some(expected));
    assert_eq!(reminder.remind_at, Some(expected));
    assert_eq!(reminder.list_id, "inbox");
}

#[test]
fn quick_add_rejects_blank_text() {
    let service = reminders();
    assert!(matches!(
        service.quick_add("inbox", "   "),
        Err(ServiceError::EmptyTitle)
    ));
    assert!(service.repo().load_reminders().unwrap().is_empty());
}

#[test]
fn completing_a_repeating_reminder_creates_the_next_one() {
    let service = reminders();
    let due_at = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
    let created = service
        .repo()
        .create_reminder(
            "personal",
            "Take vitamins",
            NewReminder {
                due_at: Some(due_at),
                remind_at: Some(due_at),
                repeat: Some(RepeatRule::new(Frequency::Daily, 1)),
                ..NewReminder::default()
            },
        )
        .unwrap();

    let outcome = service.complete(&created.id).unwrap();
    assert_eq!(outcome.completed.completed_at, Some(noon()));
    let next = outcome.next.expect("daily series continues");
    assert_ne!(next.id, created.id);
    assert_eq!(next.due_at, Some(due_at + Duration::days(1)));
    assert_eq!(next.list_id, "personal");
    assert_eq!(next.completed_at, None);

    assert_eq!(service.repo().load_reminders().unwrap().len(), 2);
}

#[test]
fn completing_a_one_off_reminder_has_no_successor() {
    let service = reminders();
    let created = service.quick_add("inbox", "Buy milk").unwrap();

    let outcome = service.complete(&created.id).unwrap();
    assert!(outcome.next.is_none());
    assert!(matches!(
        service.complete("missing"),
        Err(ServiceError::NotFound(id)) if id == "missing"
    ));
}
