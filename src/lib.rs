//! Stride Core - On-device rollover and aggregation engine for step and
//! sleep tracking
//!
//! Stride Core converts a cumulative hardware step counter into a bounded
//! per-day value, maintains rotating 7-slot weekly step and sleep histories,
//! and performs the scheduled midnight and weekly resets, persisting
//! everything to a remote per-user profile store.
//!
//! ## Modules
//!
//! - **Engine**: baseline tracking, delta computation, history rotation,
//!   user-initiated profile commands
//! - **Schedule**: midnight close-out driver and unique weekly task
//!   registration
//! - **Store/Scratch**: trait seams for the remote document store and the
//!   device-local baseline state

pub mod alarm;
pub mod calendar;
pub mod clock;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod scratch;
pub mod sensor;
pub mod store;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{ResetOutcome, RolloverEngine, StepUpdate};
pub use error::{EngineError, StoreError};
pub use schedule::{schedule_weekly_reset, DailyDriver, TaskScheduler};
pub use scratch::{MemoryScratch, ScratchStore};
pub use store::{FieldWrite, MemoryProfileStore, ProfileStore, WriteTicket};
pub use types::{Bmi, Profile, SleepData};

/// Crate version recorded by embedding hosts
pub const STRIDE_VERSION: &str = env!("CARGO_PKG_VERSION");
