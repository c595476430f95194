//! Alarm playback as an owned resource
//!
//! Playback is modeled as an explicitly owned handle rather than a
//! process-wide mutable player: `sound_alarm` acquires the sounder, and the
//! returned guard stops it when dropped, on every exit path. Starting a new
//! alarm through the same sounder first stops whatever was playing.

use log::debug;

use crate::error::EngineError;

/// Host-side playback capability (OS media facilities)
pub trait AlarmSounder {
    /// Begin playing the referenced sound
    fn start(&mut self, sound_ref: &str) -> Result<(), EngineError>;

    /// Stop playback and release the underlying player
    fn stop(&mut self);
}

/// Active alarm playback; stops the sounder when dropped
#[derive(Debug)]
pub struct AlarmHandle<'a, S: AlarmSounder> {
    sounder: &'a mut S,
}

impl<S: AlarmSounder> AlarmHandle<'_, S> {
    /// Stop playback now instead of at end of scope
    pub fn stop(self) {}
}

impl<S: AlarmSounder> Drop for AlarmHandle<'_, S> {
    fn drop(&mut self) {
        debug!("alarm handle dropped; stopping playback");
        self.sounder.stop();
    }
}

/// Start the alarm sound, handing back the owning guard.
///
/// Any previous playback on this sounder is stopped first, so two handles
/// can never overlap on one sounder.
pub fn sound_alarm<'a, S: AlarmSounder>(
    sounder: &'a mut S,
    sound_ref: &str,
) -> Result<AlarmHandle<'a, S>, EngineError> {
    sounder.stop();
    sounder.start(sound_ref)?;
    Ok(AlarmHandle { sounder })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct RecordingSounder {
        playing: Option<String>,
        starts: u32,
        stops: u32,
        fail_start: bool,
    }

    impl AlarmSounder for RecordingSounder {
        fn start(&mut self, sound_ref: &str) -> Result<(), EngineError> {
            if self.fail_start {
                return Err(EngineError::InvalidInput("cannot decode sound".to_string()));
            }
            self.playing = Some(sound_ref.to_string());
            self.starts += 1;
            Ok(())
        }

        fn stop(&mut self) {
            self.playing = None;
            self.stops += 1;
        }
    }

    #[test]
    fn test_handle_stops_on_drop() {
        let mut sounder = RecordingSounder::default();
        {
            let _handle = sound_alarm(&mut sounder, "sunrise").unwrap();
        }
        assert_eq!(sounder.playing, None);
        assert_eq!(sounder.starts, 1);
    }

    #[test]
    fn test_handle_stops_on_early_return() {
        fn ring_until_dismissed(sounder: &mut RecordingSounder, dismiss: bool) -> Result<(), EngineError> {
            let handle = sound_alarm(sounder, "chimes")?;
            if dismiss {
                handle.stop();
                return Ok(());
            }
            Ok(())
        }

        let mut sounder = RecordingSounder::default();
        ring_until_dismissed(&mut sounder, true).unwrap();
        assert_eq!(sounder.playing, None);

        ring_until_dismissed(&mut sounder, false).unwrap();
        assert_eq!(sounder.playing, None);
    }

    #[test]
    fn test_new_alarm_supersedes_previous() {
        let mut sounder = RecordingSounder::default();
        {
            let _handle = sound_alarm(&mut sounder, "first").unwrap();
        }
        let stops_after_first = sounder.stops;
        {
            let _handle = sound_alarm(&mut sounder, "second").unwrap();
        }
        // Each acquisition stopped whatever was playing before starting,
        // and the final drop released the player.
        assert_eq!(sounder.starts, 2);
        assert!(sounder.stops > stops_after_first);
        assert_eq!(sounder.playing, None);
    }

    #[test]
    fn test_failed_start_returns_no_handle() {
        let mut sounder = RecordingSounder {
            fail_start: true,
            ..Default::default()
        };
        assert!(sound_alarm(&mut sounder, "broken").is_err());
        assert_eq!(sounder.playing, None);
    }
}
