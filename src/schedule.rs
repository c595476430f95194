//! Scheduling driver for the daily and weekly resets
//!
//! The daily reset fires once per local calendar day at midnight. The delay
//! is recomputed from "now" on every arm rather than sleeping a fixed 24h,
//! so clock changes and missed wake-ups self-correct. `DailyDriver` also
//! guards at-most-once-per-day firing in memory; duplicate firing across a
//! process restart remains possible and is a documented risk of the design,
//! not something this module can rule out.
//!
//! The weekly reset is registered with the host's persistent periodic task
//! facility as a named unique task with keep-existing semantics, constrained
//! to run with network connectivity since the reset writes to the remote
//! store.

use chrono::{Duration, NaiveDate};
use log::{debug, warn};

use crate::calendar::until_next_midnight;
use crate::clock::Clock;
use crate::engine::{ResetOutcome, RolloverEngine};
use crate::scratch::ScratchStore;
use crate::store::ProfileStore;

/// Unique name of the weekly reset task
pub const WEEKLY_RESET_TASK: &str = "weekly_reset_work";

/// Period of the weekly reset task in days
pub const WEEKLY_RESET_PERIOD_DAYS: i64 = 7;

/// Network precondition for a periodic task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkRequirement {
    /// Runs regardless of connectivity
    Any,
    /// Deferred until the device is online
    Connected,
}

/// What to do when a task with the same name is already registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingTaskPolicy {
    /// Keep the existing schedule untouched
    Keep,
    /// Replace it with the new registration
    Replace,
}

/// Description of a named recurring task handed to the host scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicTask {
    pub name: String,
    pub period: Duration,
    pub network: NetworkRequirement,
}

/// The weekly reset registration: 7-day cadence, online only
pub fn weekly_reset_task() -> PeriodicTask {
    PeriodicTask {
        name: WEEKLY_RESET_TASK.to_string(),
        period: Duration::days(WEEKLY_RESET_PERIOD_DAYS),
        network: NetworkRequirement::Connected,
    }
}

/// Host facility for persistent named periodic tasks
pub trait TaskScheduler {
    /// Register `task` under its unique name. Returns `true` if the
    /// registration was accepted, `false` if an existing schedule was kept.
    fn register_unique(&mut self, task: PeriodicTask, policy: ExistingTaskPolicy) -> bool;
}

/// Register the weekly reset, keeping any schedule that already exists so
/// repeated registration (one per screen that cares) never doubles it up.
pub fn schedule_weekly_reset<T: TaskScheduler>(scheduler: &mut T) -> bool {
    let registered = scheduler.register_unique(weekly_reset_task(), ExistingTaskPolicy::Keep);
    if !registered {
        debug!("weekly reset already scheduled; keeping existing registration");
    }
    registered
}

/// In-memory scheduler, the reference implementation for tests and
/// simulation
#[derive(Debug, Default)]
pub struct MemoryTaskScheduler {
    tasks: Vec<PeriodicTask>,
}

impl MemoryTaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[PeriodicTask] {
        &self.tasks
    }
}

impl TaskScheduler for MemoryTaskScheduler {
    fn register_unique(&mut self, task: PeriodicTask, policy: ExistingTaskPolicy) -> bool {
        if let Some(existing) = self.tasks.iter_mut().find(|t| t.name == task.name) {
            match policy {
                ExistingTaskPolicy::Keep => false,
                ExistingTaskPolicy::Replace => {
                    *existing = task;
                    true
                }
            }
        } else {
            self.tasks.push(task);
            true
        }
    }
}

/// Drives the midnight close-out for one user session.
///
/// The host arms a one-shot timer with `delay_until_next_fire`, calls
/// `fire` when it elapses, and re-arms with a freshly computed delay.
#[derive(Debug)]
pub struct DailyDriver<C: Clock> {
    clock: C,
    last_completed: Option<NaiveDate>,
}

impl<C: Clock> DailyDriver<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            last_completed: None,
        }
    }

    /// Delay until the next local midnight, computed from the current
    /// instant
    pub fn delay_until_next_fire(&self) -> Duration {
        until_next_midnight(self.clock.now())
    }

    /// Run the daily reset if it has not already completed today.
    ///
    /// A second invocation on the same date is a no-op reporting
    /// `Completed`, so a stray duplicate timer cannot shift a zero into the
    /// weekly history twice. `Retry` outcomes do not mark the day as done,
    /// so the host's retry lands.
    pub fn fire<S, L>(&mut self, engine: &mut RolloverEngine<S, L, C>) -> ResetOutcome
    where
        S: ProfileStore,
        L: ScratchStore,
        C: Clock,
    {
        let today = self.clock.today();
        if self.last_completed == Some(today) {
            debug!("daily reset already completed on {today}; skipping duplicate");
            return ResetOutcome::Completed;
        }

        let outcome = engine.daily_reset();
        match outcome {
            ResetOutcome::Completed => self.last_completed = Some(today),
            ResetOutcome::SkippedNoProfile => {
                // Nothing to close out; do not block a later attempt today
                // in case the profile appears after login.
            }
            ResetOutcome::Retry => warn!("daily reset will be retried"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::scratch::MemoryScratch;
    use crate::store::MemoryProfileStore;
    use crate::types::Profile;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn sunday_night() -> chrono::NaiveDateTime {
        // 2024-01-14 is a Sunday
        NaiveDate::from_ymd_opt(2024, 1, 14)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_weekly_registration_keeps_existing() {
        let mut scheduler = MemoryTaskScheduler::new();

        assert!(schedule_weekly_reset(&mut scheduler));
        // A second registration (another screen starting up) is a no-op
        assert!(!schedule_weekly_reset(&mut scheduler));

        assert_eq!(scheduler.tasks().len(), 1);
        let task = &scheduler.tasks()[0];
        assert_eq!(task.name, WEEKLY_RESET_TASK);
        assert_eq!(task.period, Duration::days(7));
        assert_eq!(task.network, NetworkRequirement::Connected);
    }

    #[test]
    fn test_replace_policy_overwrites() {
        let mut scheduler = MemoryTaskScheduler::new();
        schedule_weekly_reset(&mut scheduler);

        let mut shorter = weekly_reset_task();
        shorter.period = Duration::days(1);
        assert!(scheduler.register_unique(shorter.clone(), ExistingTaskPolicy::Replace));
        assert_eq!(scheduler.tasks(), &[shorter]);
    }

    #[test]
    fn test_delay_recomputed_from_now() {
        let clock = ManualClock::new(sunday_night());
        let driver: DailyDriver<ManualClock> = DailyDriver::new(clock.clone());

        assert_eq!(driver.delay_until_next_fire(), Duration::hours(1));

        // The process slept through midnight; the next computation reflects
        // the new day instead of a stale fixed interval.
        clock.advance(Duration::hours(3));
        assert_eq!(driver.delay_until_next_fire(), Duration::hours(22));
    }

    #[test]
    fn test_fire_runs_reset_once_per_day() {
        let store = MemoryProfileStore::with_profile(
            "u1",
            Profile {
                steps_today: 42,
                weekly_steps: [10, 20, 30, 40, 50, 60, 70],
                ..Default::default()
            },
        );
        let clock = ManualClock::new(sunday_night());
        let mut engine = RolloverEngine::new(
            store.clone(),
            MemoryScratch::new(),
            clock.clone(),
            "u1",
        );
        let mut driver = DailyDriver::new(clock.clone());

        clock.advance(Duration::hours(1)); // midnight fires
        assert_eq!(driver.fire(&mut engine), ResetOutcome::Completed);
        assert_eq!(
            store.profile("u1").unwrap().weekly_steps,
            [20, 30, 40, 50, 60, 70, 42]
        );

        // A duplicate timer on the same date must not shift a zero in
        assert_eq!(driver.fire(&mut engine), ResetOutcome::Completed);
        assert_eq!(
            store.profile("u1").unwrap().weekly_steps,
            [20, 30, 40, 50, 60, 70, 42]
        );

        // The following midnight rotates again
        clock.advance(Duration::days(1));
        assert_eq!(driver.fire(&mut engine), ResetOutcome::Completed);
        assert_eq!(
            store.profile("u1").unwrap().weekly_steps,
            [30, 40, 50, 60, 70, 42, 0]
        );
    }

    #[test]
    fn test_retry_outcome_does_not_mark_day_done() {
        let store = MemoryProfileStore::with_profile("u1", Profile::default());
        let clock = ManualClock::new(sunday_night());
        let mut engine = RolloverEngine::new(
            store.clone(),
            MemoryScratch::new(),
            clock.clone(),
            "u1",
        );
        let mut driver = DailyDriver::new(clock.clone());
        clock.advance(Duration::hours(1));

        store.fail_writes(true);
        assert_eq!(driver.fire(&mut engine), ResetOutcome::Retry);

        // The host scheduler's retry later the same day still runs
        store.fail_writes(false);
        assert_eq!(driver.fire(&mut engine), ResetOutcome::Completed);
    }
}
