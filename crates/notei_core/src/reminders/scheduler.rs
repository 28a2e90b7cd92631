//! Adaptive background scheduler for reminder notifications.
//!
//! # Responsibility
//! - Poll the reminder source, deliver notifications for due reminders and
//!   persist `notification_fired_at` for each confirmed delivery.
//! - Compute its own next wake time from the pending reminders.
//!
//! # Invariants
//! - At most one tick is in flight per scheduler, across restarts of its
//!   handle.
//! - `notification_fired_at` is written only after a successful delivery,
//!   and a reminder that already carries it is never delivered again.
//! - The fired marker is conditional on the delivered `remind_at`, so a
//!   reminder moved mid-delivery keeps its new occurrence.
//! - A failed delivery is retried by a later tick, never on the minimum delay.
//! - No tick failure stops the scheduler; it re-arms after the fallback.
//! - Log events carry ids and counts, never reminder titles or notes.

use crate::model::reminder::{Reminder, ReminderPatch};
use crate::repo::RepoResult;
use crate::time::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

/// Reminder query and update contract consumed by the scheduler.
#[async_trait]
pub trait ReminderSource: Send + Sync {
    async fn fetch_all_reminders(&self) -> RepoResult<Vec<Reminder>>;

    /// Applies `patch`; `Ok(None)` when the reminder no longer exists.
    ///
    /// Changing `remind_at` must clear `notification_fired_at`. A patch whose
    /// `expected_remind_at` is stale returns the record unchanged.
    async fn update_reminder(&self, id: &str, patch: ReminderPatch)
        -> RepoResult<Option<Reminder>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Notification delivery failure. Never fatal to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryError {
    message: String,
}

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification delivery failed: {}", self.message)
    }
}

impl Error for DeliveryError {}

/// Local notification surface.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn request_permission(&self) -> Permission;
    async fn deliver(&self, title: &str, body: Option<&str>) -> Result<(), DeliveryError>;
}

/// Wake-time policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Delay used when nothing is pending or a tick could not finish.
    pub fallback_interval: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fallback_interval: Duration::from_secs(60),
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl SchedulerConfig {
    /// Clamps the distance from `now` to `target` into `[min_delay, max_delay]`.
    pub fn delay_until(&self, now: DateTime<Utc>, target: DateTime<Utc>) -> Duration {
        let distance = (target - now).to_std().unwrap_or(Duration::ZERO);
        distance.clamp(self.min_delay, self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Ok,
    PermissionDenied,
    SourceFailed,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub status: TickStatus,
    /// Deliveries confirmed and persisted as fired.
    pub delivered: usize,
    /// Deliveries rejected by the notifier; retried by a later tick.
    pub failed: usize,
    pub next_delay: Duration,
}

/// Poll-fire-rearm engine. Stateless between ticks.
pub struct ReminderScheduler {
    source: Arc<dyn ReminderSource>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    /// Held for a whole tick; a restarted loop waits for the old tick.
    tick_lock: AsyncMutex<()>,
}

impl ReminderScheduler {
    pub fn new(
        source: Arc<dyn ReminderSource>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            source,
            notifier,
            clock,
            config,
            tick_lock: AsyncMutex::new(()),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Runs one poll-fire cycle and reports the delay before the next one.
    pub async fn tick(&self) -> TickReport {
        let _in_flight = self.tick_lock.lock().await;

        if self.notifier.request_permission().await == Permission::Denied {
            warn!("event=scheduler_tick module=scheduler status=permission_denied");
            return self.fallback(TickStatus::PermissionDenied, 0, 0);
        }

        let reminders = match self.source.fetch_all_reminders().await {
            Ok(reminders) => reminders,
            Err(err) => {
                warn!("event=scheduler_tick module=scheduler status=error stage=fetch error={err}");
                return self.fallback(TickStatus::SourceFailed, 0, 0);
            }
        };

        let now = self.clock.now();
        let mut delivered = 0;
        let mut failed = 0;
        let mut moved_to = Vec::new();

        for reminder in reminders.iter().filter(|r| r.is_notification_due(now)) {
            if let Err(err) = self
                .notifier
                .deliver(&reminder.title, reminder.notes.as_deref())
                .await
            {
                failed += 1;
                warn!(
                    "event=notify module=scheduler status=error reminder_id={} error={}",
                    reminder.id,
                    err.message()
                );
                continue;
            }

            match self
                .source
                .update_reminder(
                    &reminder.id,
                    ReminderPatch::mark_fired_for(reminder.remind_at, now),
                )
                .await
            {
                Ok(Some(updated)) if updated.remind_at != reminder.remind_at => {
                    moved_to.extend(updated.remind_at);
                    debug!(
                        "event=notify module=scheduler status=skip reason=rescheduled reminder_id={}",
                        reminder.id
                    );
                }
                Ok(Some(_)) => {
                    delivered += 1;
                    info!(
                        "event=notify module=scheduler status=ok reminder_id={}",
                        reminder.id
                    );
                }
                Ok(None) => {
                    debug!(
                        "event=notify module=scheduler status=skip reason=removed reminder_id={}",
                        reminder.id
                    );
                }
                Err(err) => {
                    warn!(
                        "event=scheduler_tick module=scheduler status=error stage=mark_fired reminder_id={} error={err}",
                        reminder.id
                    );
                    return self.fallback(TickStatus::SourceFailed, delivered, failed);
                }
            }
        }

        // Everything at or before `now` was attempted above.
        let soonest = reminders
            .iter()
            .filter(|r| r.awaits_notification())
            .filter_map(|r| r.remind_at)
            .filter(|at| *at > now)
            .chain(moved_to)
            .min();
        let next_delay = match soonest {
            Some(target) => self.config.delay_until(self.clock.now(), target),
            None => self.config.fallback_interval,
        };

        debug!(
            "event=scheduler_tick module=scheduler status=ok delivered={delivered} failed={failed} next_delay_ms={}",
            next_delay.as_millis()
        );
        TickReport {
            status: TickStatus::Ok,
            delivered,
            failed,
            next_delay,
        }
    }

    fn fallback(&self, status: TickStatus, delivered: usize, failed: usize) -> TickReport {
        TickReport {
            status,
            delivered,
            failed,
            next_delay: self.config.fallback_interval,
        }
    }
}

enum HandleState {
    Idle,
    Armed {
        stop_tx: watch::Sender<bool>,
        _task: JoinHandle<()>,
    },
}

/// Owner of one scheduler task.
///
/// # Invariants
/// - `start` while armed is a no-op.
/// - `stop` is safe from any state; an in-flight tick completes and its
///   re-arm becomes a no-op. A `start` right after waits for that tick.
/// - Dropping the handle stops the task.
pub struct SchedulerHandle {
    scheduler: Arc<ReminderScheduler>,
    state: Mutex<HandleState>,
}

impl SchedulerHandle {
    /// Creates an idle handle.
    pub fn new(scheduler: Arc<ReminderScheduler>) -> Self {
        Self {
            scheduler,
            state: Mutex::new(HandleState::Idle),
        }
    }

    /// Spawns the loop on the current tokio runtime: one immediate tick,
    /// then one tick per computed delay.
    ///
    /// Returns `false` when already armed.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        if matches!(*state, HandleState::Armed { .. }) {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(Arc::clone(&self.scheduler), stop_rx));
        *state = HandleState::Armed {
            stop_tx,
            _task: task,
        };
        info!("event=scheduler_start module=scheduler status=ok");
        true
    }

    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), HandleState::Idle);
        if let HandleState::Armed { stop_tx, .. } = previous {
            let _ = stop_tx.send(true);
            info!("event=scheduler_stop module=scheduler status=ok");
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(*self.state.lock(), HandleState::Armed { .. })
    }
}

/// Creates a handle for `scheduler` and starts it.
pub fn start_scheduler(scheduler: Arc<ReminderScheduler>) -> SchedulerHandle {
    let handle = SchedulerHandle::new(scheduler);
    handle.start();
    handle
}

async fn run_loop(scheduler: Arc<ReminderScheduler>, mut stop_rx: watch::Receiver<bool>) {
    loop {
        let report = scheduler.tick().await;

        // A closed channel means the handle is gone.
        if stop_rx.has_changed().unwrap_or(true) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(report.next_delay) => {}
            _ = stop_rx.changed() => break,
        }
    }
    debug!("event=scheduler_loop module=scheduler status=stopped");
}
