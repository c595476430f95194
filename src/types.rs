//! Core types for the Stride profile data model
//!
//! This module defines the per-user profile record that is persisted verbatim
//! to the remote profile store, along with its nested sleep and BMI
//! substructures. All defaults are applied at construction time so a profile
//! read from a store with missing fields is always fully populated.

use serde::{Deserialize, Serialize};

/// Number of slots in the weekly step and sleep histories
pub const WEEK_SLOTS: usize = 7;

/// Default daily step goal applied at signup
pub const DEFAULT_DAILY_STEP_GOAL: u32 = 1000;

/// Default sleep goal in hours
pub const DEFAULT_SLEEP_GOAL_HOURS: u32 = 8;

/// Label stored in an untouched weekly sleep slot
pub const EMPTY_SLEEP_ENTRY: &str = "0h 0m";

/// Complete per-user persisted record.
///
/// Field names are camelCase when serialized; this struct is the de facto
/// schema of the remote document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    /// Steps attributed to the current local calendar day
    pub steps_today: u32,
    pub daily_step_goal: u32,
    /// Weekly step history; slot semantics are defined by the engine
    pub weekly_steps: [u32; WEEK_SLOTS],
    /// Liters logged; accumulates until manually overwritten
    pub water_intake: u32,
    pub sleep: Option<SleepData>,
    pub bmi: Option<Bmi>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            full_name: None,
            email: None,
            gender: None,
            steps_today: 0,
            daily_step_goal: DEFAULT_DAILY_STEP_GOAL,
            weekly_steps: [0; WEEK_SLOTS],
            water_intake: 0,
            sleep: None,
            bmi: None,
        }
    }
}

impl Profile {
    /// The sleep substructure, or defaults if it was never written.
    pub fn sleep_or_default(&self) -> SleepData {
        self.sleep.clone().unwrap_or_default()
    }
}

/// Sleep tracking substructure of the profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SleepData {
    /// Free-form duration label, written by its own flow; rendering
    /// reconciles against yesterday's weekly slot instead of trusting it
    pub last_night_recorded: Option<String>,
    pub alarm_time: Option<String>,
    pub alarm_sound_ref: Option<String>,
    pub sleep_goal_hours: u32,
    /// Weekly sleep history as `"<h>h <m>m"` labels
    pub weekly_sleep: [String; WEEK_SLOTS],
}

impl Default for SleepData {
    fn default() -> Self {
        Self {
            last_night_recorded: None,
            alarm_time: None,
            alarm_sound_ref: None,
            sleep_goal_hours: DEFAULT_SLEEP_GOAL_HOURS,
            weekly_sleep: empty_weekly_sleep(),
        }
    }
}

/// A fresh all-default weekly sleep history
pub fn empty_weekly_sleep() -> [String; WEEK_SLOTS] {
    std::array::from_fn(|_| EMPTY_SLEEP_ENTRY.to_string())
}

/// Format a sleep duration as the stored `"<h>h <m>m"` label
pub fn format_sleep_entry(hours: u32, minutes: u32) -> String {
    format!("{hours}h {minutes}m")
}

/// Parse a stored sleep label back into (hours, minutes).
///
/// Returns `None` for labels that do not match the `"<h>h <m>m"` shape;
/// free-form text can end up in these slots through older clients.
pub fn parse_sleep_entry(entry: &str) -> Option<(u32, u32)> {
    let mut parts = entry.split_whitespace();
    let hours = parts.next()?.strip_suffix('h')?.parse().ok()?;
    let minutes = parts.next()?.strip_suffix('m')?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((hours, minutes))
}

/// Body mass index entry, recomputed wholesale on each user entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bmi {
    /// Weight in kilograms
    pub weight: f64,
    /// Height in centimeters
    pub height: f64,
    /// BMI value rounded to two decimals
    pub value: f64,
    pub status: String,
}

impl Bmi {
    /// Compute a BMI entry from weight (kg) and height (cm).
    ///
    /// The value is rounded to two decimals before persisting.
    pub fn compute(weight_kg: f64, height_cm: f64) -> Self {
        let height_m = height_cm / 100.0;
        let raw = weight_kg / (height_m * height_m);
        let value = (raw * 100.0).round() / 100.0;
        Self {
            weight: weight_kg,
            height: height_cm,
            value,
            status: Self::classify(raw).to_string(),
        }
    }

    /// Standard BMI category thresholds
    pub fn classify(value: f64) -> &'static str {
        if value < 18.5 {
            "Underweight"
        } else if value < 25.0 {
            "Normal"
        } else if value < 30.0 {
            "Overweight"
        } else {
            "Obese"
        }
    }
}
