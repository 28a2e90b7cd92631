use chrono::{DateTime, Duration, TimeZone, Utc};
use notei_core::model::reminder::{NewReminder, ReminderPatch};
use notei_core::repo::document_store::{MemoryDocumentStore, SqliteDocumentStore, REMINDERS_KEY};
use notei_core::repo::reminder_repo::{
    DocumentReminderRepository, ReminderFilter, ReminderRepository, SmartFilter, SnoozePreset,
    INBOX_LIST_ID,
};
use notei_core::repo::RepoError;
use notei_core::time::FixedClock;
use std::sync::Arc;

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
}

fn memory_repo() -> DocumentReminderRepository<MemoryDocumentStore> {
    DocumentReminderRepository::new(MemoryDocumentStore::new(), Arc::new(FixedClock::utc(noon())))
}

fn due(at: DateTime<Utc>) -> NewReminder {
    NewReminder {
        due_at: Some(at),
        remind_at: Some(at),
        ..NewReminder::default()
    }
}

#[test]
fn create_assigns_increasing_sort_keys() {
    let repo = memory_repo();
    let keys: Vec<i64> = ["a", "b", "c"]
        .iter()
        .map(|title| {
            repo.create_reminder(INBOX_LIST_ID, title, NewReminder::default())
                .unwrap()
                .sort_key
        })
        .collect();
    assert_eq!(keys, vec![0, 1, 2]);

    let listed = repo
        .list_reminders(&ReminderFilter {
            list_id: Some(INBOX_LIST_ID.to_string()),
            completed: Some(false),
        })
        .unwrap();
    let titles: Vec<&str> = listed.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "b", "c"]);
}

#[test]
fn insert_rejects_duplicate_ids() {
    let repo = memory_repo();
    let created = repo
        .create_reminder(INBOX_LIST_ID, "once", NewReminder::default())
        .unwrap();

    let err = repo.insert_reminder(created).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert_eq!(repo.load_reminders().unwrap().len(), 1);
}

#[test]
fn changing_remind_at_clears_fired_marker() {
    let repo = memory_repo();
    let at = noon() + Duration::hours(1);
    let reminder = repo.create_reminder(INBOX_LIST_ID, "call", due(at)).unwrap();
    repo.update_reminder(&reminder.id, &ReminderPatch::mark_fired(at))
        .unwrap();

    let same = repo
        .update_reminder(&reminder.id, &ReminderPatch::reschedule(Some(at)))
        .unwrap()
        .unwrap();
    assert_eq!(same.notification_fired_at, Some(at));

    let moved = repo
        .update_reminder(&reminder.id, &ReminderPatch::reschedule(Some(at + Duration::hours(1))))
        .unwrap()
        .unwrap();
    assert_eq!(moved.notification_fired_at, None);

    assert!(repo
        .update_reminder("missing", &ReminderPatch::mark_fired(at))
        .unwrap()
        .is_none());
}

#[test]
fn snooze_moves_reminder_and_keeps_due_date() {
    let repo = memory_repo();
    let scheduled = repo
        .create_reminder(INBOX_LIST_ID, "report", due(noon() - Duration::hours(2)))
        .unwrap();
    let loose = repo
        .create_reminder(INBOX_LIST_ID, "stretch", NewReminder::default())
        .unwrap();

    let snoozed = repo
        .snooze_reminder(&scheduled.id, SnoozePreset::OneHour)
        .unwrap()
        .unwrap();
    assert_eq!(snoozed.remind_at, Some(noon() + Duration::hours(1)));
    assert_eq!(snoozed.due_at, scheduled.due_at);
    assert_eq!(snoozed.notification_fired_at, None);

    let snoozed = repo
        .snooze_reminder(&loose.id, SnoozePreset::FifteenMinutes)
        .unwrap()
        .unwrap();
    assert_eq!(snoozed.remind_at, Some(noon() + Duration::minutes(15)));
    assert_eq!(snoozed.due_at, snoozed.remind_at);
}

#[test]
fn smart_lists_partition_active_reminders() {
    let repo = memory_repo();
    let later_today = repo
        .create_reminder(INBOX_LIST_ID, "later today", due(noon() + Duration::hours(3)))
        .unwrap();
    let overdue = repo
        .create_reminder(INBOX_LIST_ID, "overdue", due(noon() - Duration::days(1)))
        .unwrap();
    let next_week = repo
        .create_reminder(INBOX_LIST_ID, "next week", due(noon() + Duration::days(7)))
        .unwrap();
    let tomorrow = repo
        .create_reminder(INBOX_LIST_ID, "tomorrow", due(noon() + Duration::days(1)))
        .unwrap();
    let done = repo
        .create_reminder(INBOX_LIST_ID, "done", due(noon() + Duration::hours(1)))
        .unwrap();
    repo.complete_reminder(&done.id).unwrap();
    repo.create_reminder(INBOX_LIST_ID, "someday", NewReminder::default())
        .unwrap();

    let ids = |filter| -> Vec<String> {
        repo.list_smart(filter)
            .unwrap()
            .into_iter()
            .map(|reminder| reminder.id)
            .collect()
    };

    assert_eq!(ids(SmartFilter::Today), vec![later_today.id.clone()]);
    assert_eq!(ids(SmartFilter::Overdue), vec![overdue.id.clone()]);
    assert_eq!(
        ids(SmartFilter::Scheduled),
        vec![later_today.id, tomorrow.id, next_week.id]
    );
    assert_eq!(ids(SmartFilter::Completed), vec![done.id]);
    assert_eq!(ids(SmartFilter::All).len(), 5);
}

#[test]
fn uncomplete_restores_active_state() {
    let repo = memory_repo();
    let reminder = repo
        .create_reminder(INBOX_LIST_ID, "file taxes", NewReminder::default())
        .unwrap();

    let completed = repo.complete_reminder(&reminder.id).unwrap().unwrap();
    assert_eq!(completed.completed_at, Some(noon()));

    let reopened = repo.uncomplete_reminder(&reminder.id).unwrap().unwrap();
    assert_eq!(reopened.completed_at, None);
    assert!(repo.remove_reminder(&reminder.id).unwrap());
    assert!(!repo.remove_reminder(&reminder.id).unwrap());
}

#[test]
fn default_lists_are_seeded_once() {
    let repo = memory_repo();
    let lists = repo.list_reminder_lists().unwrap();
    let ids: Vec<&str> = lists.iter().map(|list| list.id.as_str()).collect();
    assert_eq!(ids, vec![INBOX_LIST_ID, "meetings", "personal"]);

    let created = repo.create_reminder_list("Groceries", Some("🛒")).unwrap();
    assert_eq!(created.sort_key, 3);
    assert_eq!(repo.list_reminder_lists().unwrap().len(), 4);

    let renamed = repo
        .rename_reminder_list(&created.id, "Shopping")
        .unwrap()
        .unwrap();
    assert_eq!(renamed.name, "Shopping");
    assert!(repo.rename_reminder_list("nope", "x").unwrap().is_none());
}

#[test]
fn removing_a_list_moves_its_reminders_to_inbox() {
    let repo = memory_repo();
    repo.list_reminder_lists().unwrap();
    let reminder = repo
        .create_reminder("meetings", "prep slides", NewReminder::default())
        .unwrap();

    assert!(!repo.remove_reminder_list(INBOX_LIST_ID).unwrap());
    assert!(!repo.remove_reminder_list("unknown").unwrap());
    assert!(repo.remove_reminder_list("meetings").unwrap());

    let moved = repo.get_reminder(&reminder.id).unwrap().unwrap();
    assert_eq!(moved.list_id, INBOX_LIST_ID);
    let ids: Vec<String> = repo
        .list_reminder_lists()
        .unwrap()
        .into_iter()
        .map(|list| list.id)
        .collect();
    assert!(!ids.iter().any(|id| id == "meetings"));
}

#[test]
fn sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notei.db");
    let clock = Arc::new(FixedClock::utc(noon()));

    let created_id = {
        let repo = DocumentReminderRepository::new(
            SqliteDocumentStore::open(&path).unwrap(),
            clock.clone(),
        );
        let reminder = repo
            .create_reminder(INBOX_LIST_ID, "renew passport", due(noon() + Duration::days(30)))
            .unwrap();
        repo.complete_reminder(&reminder.id).unwrap();
        assert_eq!(repo.store().revision(REMINDERS_KEY).unwrap(), Some(3));
        reminder.id
    };

    let repo = DocumentReminderRepository::new(SqliteDocumentStore::open(&path).unwrap(), clock);
    let reloaded = repo.get_reminder(&created_id).unwrap().unwrap();
    assert_eq!(reloaded.title, "renew passport");
    assert_eq!(reloaded.completed_at, Some(noon()));
}
