//! Reminder and reminder-list repository over versioned documents.
//!
//! # Responsibility
//! - Provide reminder CRUD, smart lists, snoozing and list management.
//! - Expose the scheduler-facing `ReminderSource` over a shared repository.
//!
//! # Invariants
//! - Every load normalizes the stored payload and rewrites it when its
//!   version is not current.
//! - An update that changes `remind_at` clears `notification_fired_at`.
//! - An update whose `expected_remind_at` is stale writes nothing.
//! - The inbox list always exists and cannot be removed.
//! - Lists and reminders are returned ordered by `sort_key`.

use crate::migrate::reminders::{
    migrate_reminder_lists_payload, migrate_reminders_payload, reminder_lists_payload,
    reminders_payload,
};
use crate::migrate::{REMINDERS_STORE_VERSION, REMINDER_LISTS_STORE_VERSION};
use crate::model::reminder::{
    new_record_id, NewReminder, RecordId, Reminder, ReminderList, ReminderPatch,
};
use crate::reminders::scheduler::ReminderSource;
use crate::repo::document_store::{DocumentStore, REMINDERS_KEY, REMINDER_LISTS_KEY};
use crate::repo::{RepoError, RepoResult};
use crate::time::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

pub const INBOX_LIST_ID: &str = "inbox";

const DEFAULT_LISTS: [(&str, &str); 3] = [
    (INBOX_LIST_ID, "Inbox"),
    ("meetings", "Meetings"),
    ("personal", "Personal"),
];

/// Built-in reminder views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartFilter {
    /// Active, filed under the current local day.
    Today,
    /// Active, filed in the future; soonest first.
    Scheduled,
    /// Active, filed in the past.
    Overdue,
    /// Completed; most recently completed first.
    Completed,
    /// Every active reminder.
    All,
}

impl SmartFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "scheduled" => Some(Self::Scheduled),
            "overdue" => Some(Self::Overdue),
            "completed" => Some(Self::Completed),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// Plain list filter. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderFilter {
    pub list_id: Option<RecordId>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnoozePreset {
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    OneDay,
}

impl SnoozePreset {
    /// Parses `5m`, `15m`, `1h`, `1d`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "5m" => Some(Self::FiveMinutes),
            "15m" => Some(Self::FifteenMinutes),
            "1h" => Some(Self::OneHour),
            "1d" => Some(Self::OneDay),
            _ => None,
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            Self::FiveMinutes => Duration::minutes(5),
            Self::FifteenMinutes => Duration::minutes(15),
            Self::OneHour => Duration::hours(1),
            Self::OneDay => Duration::days(1),
        }
    }
}

/// Repository interface for reminders and their lists.
pub trait ReminderRepository {
    /// Loads every reminder, normalized, in stored order.
    fn load_reminders(&self) -> RepoResult<Vec<Reminder>>;
    fn get_reminder(&self, id: &str) -> RepoResult<Option<Reminder>>;
    fn list_reminders(&self, filter: &ReminderFilter) -> RepoResult<Vec<Reminder>>;
    fn list_smart(&self, filter: SmartFilter) -> RepoResult<Vec<Reminder>>;
    /// Creates a reminder at the end of the manual order.
    fn create_reminder(&self, list_id: &str, title: &str, fields: NewReminder)
        -> RepoResult<Reminder>;
    /// Stores a fully built reminder; its id must be unused.
    fn insert_reminder(&self, reminder: Reminder) -> RepoResult<Reminder>;
    fn update_reminder(&self, id: &str, patch: &ReminderPatch) -> RepoResult<Option<Reminder>>;
    fn complete_reminder(&self, id: &str) -> RepoResult<Option<Reminder>>;
    fn uncomplete_reminder(&self, id: &str) -> RepoResult<Option<Reminder>>;
    /// Moves `remind_at` to now + preset; `due_at` follows when unset.
    fn snooze_reminder(&self, id: &str, preset: SnoozePreset) -> RepoResult<Option<Reminder>>;
    fn remove_reminder(&self, id: &str) -> RepoResult<bool>;

    /// Lists reminder lists, seeding the built-in ones when missing.
    fn list_reminder_lists(&self) -> RepoResult<Vec<ReminderList>>;
    fn create_reminder_list(&self, name: &str, emoji: Option<&str>) -> RepoResult<ReminderList>;
    fn rename_reminder_list(&self, id: &str, name: &str) -> RepoResult<Option<ReminderList>>;
    /// Removes a list and moves its reminders to the inbox.
    ///
    /// Returns `false` for the inbox and for unknown ids.
    fn remove_reminder_list(&self, id: &str) -> RepoResult<bool>;
}

/// Document-backed reminder repository.
pub struct DocumentReminderRepository<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: DocumentStore> DocumentReminderRepository<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn save_reminders(&self, reminders: &[Reminder]) -> RepoResult<()> {
        self.store
            .save(REMINDERS_KEY, &reminders_payload(reminders)?)
    }

    fn load_lists(&self) -> RepoResult<Vec<ReminderList>> {
        let raw = self.store.load(REMINDER_LISTS_KEY)?.unwrap_or(Value::Null);
        let migrated = migrate_reminder_lists_payload(&raw, self.clock.now());
        if migrated.needs_rewrite(REMINDER_LISTS_STORE_VERSION) {
            self.save_lists(&migrated.value)?;
            info!(
                "event=store_migrate module=repo status=ok key={REMINDER_LISTS_KEY} from_version={} to_version={REMINDER_LISTS_STORE_VERSION} dropped={}",
                migrated.source_version, migrated.dropped
            );
        }
        Ok(migrated.value)
    }

    fn save_lists(&self, lists: &[ReminderList]) -> RepoResult<()> {
        self.store
            .save(REMINDER_LISTS_KEY, &reminder_lists_payload(lists)?)
    }
}

impl<S: DocumentStore> ReminderRepository for DocumentReminderRepository<S> {
    fn load_reminders(&self) -> RepoResult<Vec<Reminder>> {
        let raw = self.store.load(REMINDERS_KEY)?.unwrap_or(Value::Null);
        let migrated = migrate_reminders_payload(&raw, self.clock.now());
        if migrated.needs_rewrite(REMINDERS_STORE_VERSION) {
            self.save_reminders(&migrated.value)?;
            info!(
                "event=store_migrate module=repo status=ok key={REMINDERS_KEY} from_version={} to_version={REMINDERS_STORE_VERSION} dropped={}",
                migrated.source_version, migrated.dropped
            );
        }
        Ok(migrated.value)
    }

    fn get_reminder(&self, id: &str) -> RepoResult<Option<Reminder>> {
        Ok(self
            .load_reminders()?
            .into_iter()
            .find(|reminder| reminder.id == id))
    }

    fn list_reminders(&self, filter: &ReminderFilter) -> RepoResult<Vec<Reminder>> {
        let mut reminders: Vec<Reminder> = self
            .load_reminders()?
            .into_iter()
            .filter(|r| filter.list_id.as_deref().map_or(true, |list| r.list_id == list))
            .filter(|r| filter.completed.map_or(true, |done| r.is_completed() == done))
            .collect();
        reminders.sort_by_key(|r| r.sort_key);
        Ok(reminders)
    }

    fn list_smart(&self, filter: SmartFilter) -> RepoResult<Vec<Reminder>> {
        let ctx = self.clock.context();
        let (day_start, day_end) = ctx.day_bounds(ctx.local_date(ctx.now));
        let reminders = self.load_reminders()?;

        let active_where = |predicate: &dyn Fn(DateTime<Utc>) -> bool| -> Vec<Reminder> {
            reminders
                .iter()
                .filter(|r| !r.is_completed())
                .filter(|r| r.anchor().is_some_and(predicate))
                .cloned()
                .collect()
        };

        let mut result = match filter {
            SmartFilter::Today => active_where(&|at| at >= day_start && at < day_end),
            SmartFilter::Scheduled => active_where(&|at| at > ctx.now),
            SmartFilter::Overdue => active_where(&|at| at < ctx.now),
            SmartFilter::Completed => reminders
                .iter()
                .filter(|r| r.is_completed())
                .cloned()
                .collect(),
            SmartFilter::All => reminders
                .iter()
                .filter(|r| !r.is_completed())
                .cloned()
                .collect(),
        };

        match filter {
            SmartFilter::Scheduled => result.sort_by_key(|r| (r.anchor(), r.sort_key)),
            SmartFilter::Completed => {
                result.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
            }
            _ => result.sort_by_key(|r| r.sort_key),
        }
        Ok(result)
    }

    fn create_reminder(
        &self,
        list_id: &str,
        title: &str,
        fields: NewReminder,
    ) -> RepoResult<Reminder> {
        let mut reminders = self.load_reminders()?;
        let mut reminder = Reminder::new(list_id, title, self.clock.now());
        reminder.notes = fields.notes;
        reminder.linked_note_id = fields.linked_note_id;
        reminder.due_at = fields.due_at;
        reminder.remind_at = fields.remind_at;
        reminder.repeat = fields.repeat;
        reminder.priority = fields.priority;
        reminder.sort_key = next_sort_key(reminders.iter().map(|r| r.sort_key));

        reminders.push(reminder.clone());
        self.save_reminders(&reminders)?;
        info!(
            "event=reminder_create module=repo status=ok reminder_id={} list_id={}",
            reminder.id, reminder.list_id
        );
        Ok(reminder)
    }

    fn insert_reminder(&self, reminder: Reminder) -> RepoResult<Reminder> {
        let mut reminders = self.load_reminders()?;
        if reminders.iter().any(|existing| existing.id == reminder.id) {
            return Err(RepoError::InvalidData(format!(
                "reminder id `{}` already exists",
                reminder.id
            )));
        }
        reminders.push(reminder.clone());
        self.save_reminders(&reminders)?;
        Ok(reminder)
    }

    fn update_reminder(&self, id: &str, patch: &ReminderPatch) -> RepoResult<Option<Reminder>> {
        let mut reminders = self.load_reminders()?;
        let Some(reminder) = reminders.iter_mut().find(|reminder| reminder.id == id) else {
            return Ok(None);
        };
        if !reminder.apply_patch(patch, self.clock.now()) {
            debug!("event=reminder_update module=repo status=skip reason=stale reminder_id={id}");
            return Ok(Some(reminder.clone()));
        }
        let updated = reminder.clone();
        self.save_reminders(&reminders)?;
        Ok(Some(updated))
    }

    fn complete_reminder(&self, id: &str) -> RepoResult<Option<Reminder>> {
        let patch = ReminderPatch {
            completed_at: Some(Some(self.clock.now())),
            ..ReminderPatch::default()
        };
        self.update_reminder(id, &patch)
    }

    fn uncomplete_reminder(&self, id: &str) -> RepoResult<Option<Reminder>> {
        let patch = ReminderPatch {
            completed_at: Some(None),
            ..ReminderPatch::default()
        };
        self.update_reminder(id, &patch)
    }

    fn snooze_reminder(&self, id: &str, preset: SnoozePreset) -> RepoResult<Option<Reminder>> {
        let Some(current) = self.get_reminder(id)? else {
            return Ok(None);
        };
        let next = self.clock.now() + preset.duration();
        let patch = ReminderPatch {
            remind_at: Some(Some(next)),
            due_at: Some(Some(current.due_at.unwrap_or(next))),
            ..ReminderPatch::default()
        };
        self.update_reminder(id, &patch)
    }

    fn remove_reminder(&self, id: &str) -> RepoResult<bool> {
        let reminders = self.load_reminders()?;
        let before = reminders.len();
        let kept: Vec<Reminder> = reminders.into_iter().filter(|r| r.id != id).collect();
        if kept.len() == before {
            return Ok(false);
        }
        self.save_reminders(&kept)?;
        info!("event=reminder_remove module=repo status=ok reminder_id={id}");
        Ok(true)
    }

    fn list_reminder_lists(&self) -> RepoResult<Vec<ReminderList>> {
        let mut lists = self.load_lists()?;
        let now = self.clock.now();
        let mut changed = false;
        for (sort_key, (id, name)) in DEFAULT_LISTS.iter().enumerate() {
            if lists.iter().any(|list| list.id == *id) {
                continue;
            }
            lists.push(ReminderList {
                id: (*id).to_string(),
                name: (*name).to_string(),
                emoji: None,
                created_at: now,
                updated_at: now,
                sort_key: sort_key as i64,
            });
            changed = true;
        }
        if changed {
            self.save_lists(&lists)?;
        }
        lists.sort_by_key(|list| list.sort_key);
        Ok(lists)
    }

    fn create_reminder_list(&self, name: &str, emoji: Option<&str>) -> RepoResult<ReminderList> {
        let mut lists = self.load_lists()?;
        let now = self.clock.now();
        let list = ReminderList {
            id: new_record_id(),
            name: name.to_string(),
            emoji: emoji.map(str::to_string),
            created_at: now,
            updated_at: now,
            sort_key: next_sort_key(lists.iter().map(|list| list.sort_key)),
        };
        lists.push(list.clone());
        self.save_lists(&lists)?;
        Ok(list)
    }

    fn rename_reminder_list(&self, id: &str, name: &str) -> RepoResult<Option<ReminderList>> {
        let mut lists = self.load_lists()?;
        let Some(list) = lists.iter_mut().find(|list| list.id == id) else {
            return Ok(None);
        };
        list.name = name.to_string();
        list.updated_at = self.clock.now();
        let renamed = list.clone();
        self.save_lists(&lists)?;
        Ok(Some(renamed))
    }

    fn remove_reminder_list(&self, id: &str) -> RepoResult<bool> {
        if id == INBOX_LIST_ID {
            return Ok(false);
        }
        let lists = self.load_lists()?;
        if !lists.iter().any(|list| list.id == id) {
            return Ok(false);
        }

        let now = self.clock.now();
        let mut reminders = self.load_reminders()?;
        let mut moved = 0usize;
        for reminder in reminders.iter_mut().filter(|r| r.list_id == id) {
            reminder.list_id = INBOX_LIST_ID.to_string();
            reminder.updated_at = now;
            moved += 1;
        }

        let kept: Vec<ReminderList> = lists.into_iter().filter(|list| list.id != id).collect();
        self.save_lists(&kept)?;
        self.save_reminders(&reminders)?;
        info!("event=reminder_list_remove module=repo status=ok list_id={id} moved={moved}");
        Ok(true)
    }
}

/// `max(existing, 0) + 1`, or `0` for an empty collection.
fn next_sort_key(keys: impl Iterator<Item = i64>) -> i64 {
    keys.fold(None, |max: Option<i64>, key| Some(max.map_or(key, |m| m.max(key))))
        .map_or(0, |max| max.max(0) + 1)
}

/// Thread-safe handle over one repository, shared by services and the
/// scheduler.
pub struct SharedReminderRepository<R> {
    inner: Arc<Mutex<R>>,
}

impl<R> Clone for SharedReminderRepository<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: ReminderRepository> SharedReminderRepository<R> {
    pub fn new(repo: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(repo)),
        }
    }

    /// Runs `f` with exclusive access to the repository.
    pub fn with<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        let guard = self.inner.lock();
        f(&guard)
    }
}

impl<R: ReminderRepository + Send + 'static> SharedReminderRepository<R> {
    /// Runs `f` on the blocking pool so SQLite I/O and lock waits stay off
    /// the async workers.
    async fn with_blocking<T, F>(&self, f: F) -> RepoResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&R) -> RepoResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let guard = inner.lock();
            f(&guard)
        })
        .await
        .map_err(|err| RepoError::TaskFailed(err.to_string()))?
    }
}

#[async_trait]
impl<R: ReminderRepository + Send + 'static> ReminderSource for SharedReminderRepository<R> {
    async fn fetch_all_reminders(&self) -> RepoResult<Vec<Reminder>> {
        self.with_blocking(|repo| repo.load_reminders()).await
    }

    async fn update_reminder(
        &self,
        id: &str,
        patch: ReminderPatch,
    ) -> RepoResult<Option<Reminder>> {
        let id = id.to_string();
        self.with_blocking(move |repo| repo.update_reminder(&id, &patch))
            .await
    }
}
