//! Rollover & aggregation engine
//!
//! The engine turns a monotonically increasing hardware step counter into a
//! bounded "steps today" value, maintains the 7-slot weekly step and sleep
//! histories, and performs the scheduled daily and weekly resets.
//!
//! Two update modes coexist in the weekly histories, exactly as the system
//! behaves in the field: sensor readings and sleep entries address the array
//! by calendar day (Monday=0 .. Sunday=6), while the midnight reset shifts
//! the whole array left and appends the closed day at the end. The modes can
//! disagree about which slot is "today" once a reset has fired; the tests
//! characterize that divergence instead of papering over it.
//!
//! All mutations for one user go through `&mut self`, so a host serializes
//! sensor, timer, and user-command callbacks by owning the engine from a
//! single task or wrapping it in its own mutex.

use log::{debug, warn};

use crate::calendar::{day_slot, yesterday_slot};
use crate::clock::Clock;
use crate::error::EngineError;
use crate::scratch::{ScratchStore, BASELINE_KEY};
use crate::store::{FieldWrite, ProfileStore, WriteTicket};
use crate::types::{empty_weekly_sleep, format_sleep_entry, Bmi, Profile, WEEK_SLOTS};

/// Result of consuming one sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepUpdate {
    /// Steps attributed to the current day after this reading
    pub steps_today: u32,
    /// Weekly slot the value was written to
    pub slot: usize,
    /// Whether this reading established a fresh baseline
    pub baseline_established: bool,
}

/// Outcome of a scheduled reset, mapped onto the host scheduler's retry
/// policy: `Completed` → success, `SkippedNoProfile` → failure (do not
/// retry), `Retry` → retry later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Completed,
    SkippedNoProfile,
    Retry,
}

/// Per-user rollover engine over a profile store, a device-local scratch
/// store, and a clock.
pub struct RolloverEngine<S, L, C> {
    store: S,
    scratch: L,
    clock: C,
    user_id: String,
    profile: Profile,
    baseline: Option<f64>,
    pending: Vec<WriteTicket>,
    stale: bool,
}

impl<S, L, C> RolloverEngine<S, L, C>
where
    S: ProfileStore,
    L: ScratchStore,
    C: Clock,
{
    /// Create an engine for one user session.
    ///
    /// A baseline persisted by a previous process is resumed from scratch
    /// state, so steps counted before a restart are not double-counted.
    pub fn new(store: S, scratch: L, clock: C, user_id: impl Into<String>) -> Self {
        let baseline = scratch.get(BASELINE_KEY);
        if let Some(value) = baseline {
            debug!("resuming persisted step baseline {value}");
        }
        Self {
            store,
            scratch,
            clock,
            user_id: user_id.into(),
            profile: Profile::default(),
            baseline,
            pending: Vec::new(),
            stale: false,
        }
    }

    /// Fetch the remote profile into the in-memory snapshot.
    ///
    /// Returns whether a profile document existed. A successful fetch
    /// reconciles any staleness left behind by failed writes.
    pub fn load_profile(&mut self) -> Result<bool, EngineError> {
        match self.store.get(&self.user_id) {
            Ok(Some(profile)) => {
                self.profile = profile;
                self.stale = false;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => Err(EngineError::ReadFailed(e)),
        }
    }

    /// In-memory profile snapshot
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Whether a persist failure has been observed since the last
    /// successful fetch; the displayed snapshot may be ahead of the store
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Consume one cumulative sensor reading.
    ///
    /// Never blocks on store I/O and never fails: persistence failures are
    /// observed through the write tickets on a later reading, and the next
    /// reading rewrites both fields, which is the retry.
    pub fn on_step_reading(&mut self, cumulative: f64) -> StepUpdate {
        self.observe_pending();

        let (steps_today, baseline_established) = match self.baseline {
            None => {
                // First reading of the attribution window: establish the
                // baseline, attribute nothing yet.
                self.baseline = Some(cumulative);
                self.scratch.put(BASELINE_KEY, cumulative);
                debug!("step baseline established at {cumulative}");
                (0, true)
            }
            Some(baseline) => {
                let delta = (cumulative - baseline).floor().max(0.0);
                (delta as u32, false)
            }
        };

        let slot = day_slot(self.clock.today());
        self.profile.steps_today = steps_today;
        self.profile.weekly_steps[slot] = steps_today;

        let slot_write = self
            .store
            .set_field(&self.user_id, FieldWrite::WeeklyStepSlot { slot, steps: steps_today });
        let scalar_write = self
            .store
            .set_field(&self.user_id, FieldWrite::StepsToday(steps_today));
        self.observe(slot_write);
        self.observe(scalar_write);

        StepUpdate {
            steps_today,
            slot,
            baseline_established,
        }
    }

    /// Close out the day at local midnight.
    ///
    /// Rotates the freshly read remote history (shift left, append the
    /// closed day's total), zeroes `stepsToday`, and persists the whole
    /// profile in a single write. The scratch baseline is cleared only
    /// after the write succeeds, so a failed reset keeps attributing steps
    /// against the old baseline until the retry lands.
    pub fn daily_reset(&mut self) -> ResetOutcome {
        let mut profile = match self.store.get(&self.user_id) {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                warn!("daily reset skipped: no profile for {}", self.user_id);
                return ResetOutcome::SkippedNoProfile;
            }
            Err(e) => {
                warn!("daily reset could not read profile: {e}");
                return ResetOutcome::Retry;
            }
        };

        profile.weekly_steps.rotate_left(1);
        profile.weekly_steps[WEEK_SLOTS - 1] = profile.steps_today;
        profile.steps_today = 0;

        match self.store.set(&self.user_id, &profile).wait() {
            Ok(()) => {
                self.profile = profile;
                self.baseline = None;
                self.scratch.remove(BASELINE_KEY);
                debug!("daily reset completed for {}", self.user_id);
                ResetOutcome::Completed
            }
            Err(e) => {
                warn!("daily reset write failed: {e}");
                ResetOutcome::Retry
            }
        }
    }

    /// Hard-reset both weekly histories to their all-default state.
    ///
    /// Unconditional overwrite, so firing twice in the same window is
    /// harmless.
    pub fn weekly_reset(&mut self) -> ResetOutcome {
        let steps_write = FieldWrite::WeeklySteps([0; WEEK_SLOTS]);
        let sleep_write = FieldWrite::WeeklySleep(empty_weekly_sleep());

        let steps_ticket = self.store.set_field(&self.user_id, steps_write.clone());
        let sleep_ticket = self.store.set_field(&self.user_id, sleep_write.clone());

        let mut failed = false;
        for (ticket, write) in [(steps_ticket, steps_write), (sleep_ticket, sleep_write)] {
            match ticket.wait() {
                Ok(()) => write.apply(&mut self.profile),
                Err(e) => {
                    warn!("weekly reset write failed: {e}");
                    failed = true;
                }
            }
        }

        if failed {
            ResetOutcome::Retry
        } else {
            debug!("weekly reset completed for {}", self.user_id);
            ResetOutcome::Completed
        }
    }

    /// Record last night's sleep duration into today's weekly slot,
    /// overwriting any value already there.
    ///
    /// Reads the current remote sleep substructure first (defaults applied
    /// if it was never written), then writes it back whole. Does not touch
    /// `lastNightRecorded`.
    pub fn record_sleep(&mut self, hours: u32, minutes: u32) -> Result<WriteTicket, EngineError> {
        let mut sleep = match self.store.get(&self.user_id) {
            Ok(profile) => profile.map(|p| p.sleep_or_default()).unwrap_or_default(),
            Err(e) => return Err(EngineError::ReadFailed(e)),
        };

        let slot = day_slot(self.clock.today());
        sleep.weekly_sleep[slot] = format_sleep_entry(hours, minutes);

        let write = FieldWrite::Sleep(sleep);
        write.clone().apply(&mut self.profile);
        Ok(self.store.set_field(&self.user_id, write))
    }

    /// The sleep entry for yesterday's calendar slot, for rendering
    /// "last night" independently of the free-form `lastNightRecorded`
    pub fn last_night_entry(&self) -> Option<String> {
        let slot = yesterday_slot(self.clock.today());
        self.profile
            .sleep
            .as_ref()
            .map(|sleep| sleep.weekly_sleep[slot].clone())
    }

    /// Update the daily step goal. Rejects a zero goal.
    pub fn set_daily_step_goal(&mut self, goal: u32) -> Result<WriteTicket, EngineError> {
        if goal == 0 {
            return Err(EngineError::InvalidInput(
                "daily step goal must be greater than zero".to_string(),
            ));
        }
        self.profile.daily_step_goal = goal;
        Ok(self.store.set(&self.user_id, &self.profile))
    }

    /// Overwrite the logged water intake
    pub fn update_water_intake(&mut self, liters: u32) -> WriteTicket {
        let write = FieldWrite::WaterIntake(liters);
        write.clone().apply(&mut self.profile);
        self.store.set_field(&self.user_id, write)
    }

    /// Recompute and persist the BMI entry from a new measurement
    pub fn update_bmi(&mut self, weight_kg: f64, height_cm: f64) -> Result<WriteTicket, EngineError> {
        if weight_kg <= 0.0 || height_cm <= 0.0 {
            return Err(EngineError::InvalidInput(
                "weight and height must be positive".to_string(),
            ));
        }
        let write = FieldWrite::Bmi(Bmi::compute(weight_kg, height_cm));
        write.clone().apply(&mut self.profile);
        Ok(self.store.set_field(&self.user_id, write))
    }

    /// Set the wake-up alarm time and sound
    pub fn set_alarm(&mut self, time: impl Into<String>, sound_ref: impl Into<String>) -> WriteTicket {
        let write = FieldWrite::Alarm {
            time: time.into(),
            sound_ref: sound_ref.into(),
        };
        write.clone().apply(&mut self.profile);
        self.store.set_field(&self.user_id, write)
    }

    /// Delete the whole profile document and forget all local state
    pub fn delete_account(&mut self) -> Result<(), EngineError> {
        self.store
            .delete(&self.user_id)
            .wait()
            .map_err(EngineError::WriteFailed)?;
        self.profile = Profile::default();
        self.baseline = None;
        self.scratch.remove(BASELINE_KEY);
        Ok(())
    }

    /// Observe a freshly issued write without blocking
    fn observe(&mut self, ticket: WriteTicket) {
        match ticket.poll() {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                warn!("write {} failed: {e}", ticket.id());
                self.stale = true;
            }
            None => self.pending.push(ticket),
        }
    }

    /// Sweep previously issued writes for late results
    fn observe_pending(&mut self) {
        let mut still_pending = Vec::new();
        for ticket in self.pending.drain(..) {
            match ticket.poll() {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    warn!("write {} failed: {e}", ticket.id());
                    self.stale = true;
                }
                None => still_pending.push(ticket),
            }
        }
        self.pending = still_pending;
    }
}
