//! Remote profile store interface
//!
//! The remote document store is consumed through the `ProfileStore` trait:
//! an asynchronous key-path read/write service with no cross-path
//! transactions. Writes are fire-and-observe-later — they return a
//! `WriteTicket` immediately and deliver success or failure through a result
//! channel, so no caller ever blocks on network I/O unless it chooses to
//! wait.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};

use log::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::{Bmi, Profile, SleepData, WEEK_SLOTS};

/// Asynchronous per-user profile document store
pub trait ProfileStore {
    /// Fetch the full profile; `Ok(None)` means the user has no document
    fn get(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    /// Overwrite the full profile document
    fn set(&self, user_id: &str, profile: &Profile) -> WriteTicket;

    /// Write one key path within the profile document
    fn set_field(&self, user_id: &str, write: FieldWrite) -> WriteTicket;

    /// Remove the whole profile document
    fn delete(&self, user_id: &str) -> WriteTicket;
}

/// A typed key-path write against one profile document.
///
/// Paths that the original store addressed as string key paths are carried
/// as tagged variants, so a store implementation applies exactly one field
/// and callers cannot misspell a path.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWrite {
    StepsToday(u32),
    WeeklyStepSlot { slot: usize, steps: u32 },
    WeeklySteps([u32; WEEK_SLOTS]),
    DailyStepGoal(u32),
    WaterIntake(u32),
    Bmi(Bmi),
    Sleep(SleepData),
    WeeklySleep([String; WEEK_SLOTS]),
    Alarm { time: String, sound_ref: String },
}

impl FieldWrite {
    /// Apply this write to an in-memory profile.
    ///
    /// Writes under the sleep path create the substructure with defaults
    /// when it is absent, matching how a key-path store creates
    /// intermediate nodes.
    pub fn apply(self, profile: &mut Profile) {
        match self {
            FieldWrite::StepsToday(steps) => profile.steps_today = steps,
            FieldWrite::WeeklyStepSlot { slot, steps } => {
                if slot < WEEK_SLOTS {
                    profile.weekly_steps[slot] = steps;
                }
            }
            FieldWrite::WeeklySteps(steps) => profile.weekly_steps = steps,
            FieldWrite::DailyStepGoal(goal) => profile.daily_step_goal = goal,
            FieldWrite::WaterIntake(liters) => profile.water_intake = liters,
            FieldWrite::Bmi(bmi) => profile.bmi = Some(bmi),
            FieldWrite::Sleep(sleep) => profile.sleep = Some(sleep),
            FieldWrite::WeeklySleep(weekly) => {
                let mut sleep = profile.sleep_or_default();
                sleep.weekly_sleep = weekly;
                profile.sleep = Some(sleep);
            }
            FieldWrite::Alarm { time, sound_ref } => {
                let mut sleep = profile.sleep_or_default();
                sleep.alarm_time = Some(time);
                sleep.alarm_sound_ref = Some(sound_ref);
                profile.sleep = Some(sleep);
            }
        }
    }
}

/// Receiver half of a write's result channel.
///
/// The write is already in flight when the ticket is handed back. `poll`
/// never blocks; `wait` blocks and is reserved for contexts that may
/// suspend, such as scheduled reset workers.
#[derive(Debug)]
pub struct WriteTicket {
    id: Uuid,
    rx: Receiver<Result<(), StoreError>>,
}

impl WriteTicket {
    /// Correlation id carried in log lines on both halves
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Non-blocking check for the outcome; `None` while still in flight
    pub fn poll(&self) -> Option<Result<(), StoreError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(StoreError::new(
                "store dropped the write without completing it",
            ))),
        }
    }

    /// Block until the outcome arrives
    pub fn wait(self) -> Result<(), StoreError> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(StoreError::new("store dropped the write without completing it")))
    }
}

/// Sender half of a write's result channel, held by the store implementation
#[derive(Debug)]
pub struct WriteCompletion {
    id: Uuid,
    tx: Sender<Result<(), StoreError>>,
}

impl WriteCompletion {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Deliver the outcome; the ticket holder may already be gone, which is
    /// fine for fire-and-forget callers
    pub fn complete(self, result: Result<(), StoreError>) {
        let _ = self.tx.send(result);
    }
}

/// Create a linked completion/ticket pair for one write
pub fn write_channel() -> (WriteCompletion, WriteTicket) {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel();
    (WriteCompletion { id, tx }, WriteTicket { id, rx })
}

/// In-memory profile store.
///
/// Completes every write synchronously, which makes it the reference store
/// for tests, simulation, and the FFI handle. Clones share state. Write and
/// read failures can be injected to exercise the error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    profiles: HashMap<String, Profile>,
    fail_writes: bool,
    fail_reads: bool,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with one profile
    pub fn with_profile(user_id: &str, profile: Profile) -> Self {
        let store = Self::new();
        store.insert(user_id, profile);
        store
    }

    pub fn insert(&self, user_id: &str, profile: Profile) {
        self.inner
            .lock()
            .unwrap()
            .profiles
            .insert(user_id.to_string(), profile);
    }

    /// Snapshot of a stored profile, for assertions
    pub fn profile(&self, user_id: &str) -> Option<Profile> {
        self.inner.lock().unwrap().profiles.get(user_id).cloned()
    }

    /// Make subsequent writes fail with a transient-looking reason
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }

    /// Make subsequent reads fail
    pub fn fail_reads(&self, fail: bool) {
        self.inner.lock().unwrap().fail_reads = fail;
    }

    fn complete_write<F>(&self, user_id: &str, mutate: F) -> WriteTicket
    where
        F: FnOnce(&mut MemoryStoreInner),
    {
        let (completion, ticket) = write_channel();
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            debug!("write {} for {user_id} rejected (injected failure)", completion.id());
            completion.complete(Err(StoreError::new("simulated network failure")));
        } else {
            mutate(&mut inner);
            debug!("write {} for {user_id} applied", completion.id());
            completion.complete(Ok(()));
        }
        ticket
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_reads {
            return Err(StoreError::new("simulated network failure"));
        }
        Ok(inner.profiles.get(user_id).cloned())
    }

    fn set(&self, user_id: &str, profile: &Profile) -> WriteTicket {
        let profile = profile.clone();
        self.complete_write(user_id, move |inner| {
            inner.profiles.insert(user_id.to_string(), profile);
        })
    }

    fn set_field(&self, user_id: &str, write: FieldWrite) -> WriteTicket {
        self.complete_write(user_id, move |inner| {
            let profile = inner.profiles.entry(user_id.to_string()).or_default();
            write.apply(profile);
        })
    }

    fn delete(&self, user_id: &str) -> WriteTicket {
        self.complete_write(user_id, move |inner| {
            inner.profiles.remove(user_id);
        })
    }
}
