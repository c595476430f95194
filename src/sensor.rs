//! Hardware step counter as a stream
//!
//! The step counter reports a cumulative total since an arbitrary
//! device-dependent epoch, delivered as discrete events with no start-of-day
//! semantic. It is modeled as a lazy, infinite, non-restartable stream: the
//! engine consumes readings incrementally and can never rewind.

use log::warn;

use crate::clock::Clock;
use crate::engine::{RolloverEngine, StepUpdate};
use crate::scratch::ScratchStore;
use crate::store::ProfileStore;

/// A source of cumulative step readings.
///
/// `None` means no reading is available right now; it does not mean the
/// stream ended, and callers should simply try again later.
pub trait StepSource {
    fn next_reading(&mut self) -> Option<f64>;
}

/// The always-absent sensor, for devices without step hardware.
///
/// Everything else keeps working; steps just stay at their last known
/// value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStepSensor;

impl StepSource for NoStepSensor {
    fn next_reading(&mut self) -> Option<f64> {
        None
    }
}

/// Scripted readings for tests and simulation
#[derive(Debug, Clone, Default)]
pub struct ScriptedStepSource {
    readings: std::collections::VecDeque<f64>,
}

impl ScriptedStepSource {
    pub fn new(readings: impl IntoIterator<Item = f64>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
        }
    }

    /// Append a reading to the end of the script
    pub fn push(&mut self, reading: f64) {
        self.readings.push_back(reading);
    }
}

impl StepSource for ScriptedStepSource {
    fn next_reading(&mut self) -> Option<f64> {
        self.readings.pop_front()
    }
}

/// Feed available readings into the engine, up to `max` of them.
///
/// Returns the last update produced, if any. Bounding the drain keeps a
/// chatty sensor from starving the rest of the event loop.
pub fn pump<Src, S, L, C>(
    source: &mut Src,
    engine: &mut RolloverEngine<S, L, C>,
    max: usize,
) -> Option<StepUpdate>
where
    Src: StepSource,
    S: ProfileStore,
    L: ScratchStore,
    C: Clock,
{
    let mut last = None;
    for _ in 0..max {
        match source.next_reading() {
            Some(reading) => {
                if !reading.is_finite() {
                    warn!("ignoring non-finite step reading {reading}");
                    continue;
                }
                last = Some(engine.on_step_reading(reading));
            }
            None => break,
        }
    }
    last
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

    fn make_engine() -> RolloverEngine<MemoryProfileStore, MemoryScratch, ManualClock> {
        let now = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        RolloverEngine::new(
            MemoryProfileStore::with_profile("u1", Profile::default()),
            MemoryScratch::new(),
            ManualClock::new(now),
            "u1",
        )
    }

    #[test]
    fn test_pump_consumes_incrementally() {
        let mut source = ScriptedStepSource::new([1000.0, 1100.0, 1250.0]);
        let mut engine = make_engine();

        let update = pump(&mut source, &mut engine, 2).unwrap();
        assert_eq!(update.steps_today, 100);

        // The stream cannot rewind; the next pump continues where it left
        // off.
        let update = pump(&mut source, &mut engine, 10).unwrap();
        assert_eq!(update.steps_today, 250);
        assert!(pump(&mut source, &mut engine, 10).is_none());
    }

    #[test]
    fn test_pump_skips_non_finite_readings() {
        let mut source = ScriptedStepSource::new([1000.0, f64::NAN, 1050.0]);
        let mut engine = make_engine();

        let update = pump(&mut source, &mut engine, 10).unwrap();
        assert_eq!(update.steps_today, 50);
    }

    #[test]
    fn test_absent_sensor_degrades_gracefully() {
        let mut engine = make_engine();
        assert!(pump(&mut NoStepSensor, &mut engine, 10).is_none());
        assert_eq!(engine.profile().steps_today, 0);
    }
}
