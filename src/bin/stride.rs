//! Stride CLI - Command-line interface for Stride Core
//!
//! Commands:
//! - simulate: Replay an NDJSON event script through the engine
//! - slot: Print the weekly-history slot for a date
//! - schema: Print the profile document schema as JSON

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use stride_core::calendar::{day_slot, until_next_midnight, week_labels};
use stride_core::clock::{Clock, ManualClock, SystemClock};
use stride_core::engine::{ResetOutcome, RolloverEngine};
use stride_core::schedule::DailyDriver;
use stride_core::scratch::MemoryScratch;
use stride_core::store::MemoryProfileStore;
use stride_core::types::Profile;
use stride_core::STRIDE_VERSION;

/// Stride - On-device rollover engine for step and sleep tracking
#[derive(Parser)]
#[command(name = "stride")]
#[command(author = "Stride Labs")]
#[command(version = STRIDE_VERSION)]
#[command(about = "Replay fitness events through the rollover engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an NDJSON event script through the engine
    Simulate {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// User id for the simulated session
        #[arg(long, default_value = "local-user")]
        user: String,

        /// Simulated start instant (local time)
        #[arg(long, default_value = "2024-01-15T08:00:00")]
        start: NaiveDateTime,

        /// Pretty-print the final profile even when piping
        #[arg(long)]
        pretty: bool,
    },

    /// Print the weekly-history slot for a date
    Slot {
        /// Date to index (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Print the profile document schema as JSON
    Schema,
}

/// One line of the simulation script
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Event {
    /// Cumulative sensor reading
    Steps { cumulative: f64 },
    /// Advance the simulated clock
    Advance { minutes: i64 },
    /// Jump to the next midnight and fire the daily close-out
    DailyReset,
    /// Fire the weekly hard reset
    WeeklyReset,
    Sleep { hours: u32, minutes: u32 },
    Water { liters: u32 },
    Goal { steps: u32 },
    Bmi { weight_kg: f64, height_cm: f64 },
    Alarm { time: String, sound: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            input,
            user,
            start,
            pretty,
        } => simulate(&input, &user, start, pretty),
        Commands::Slot { date } => {
            let date = date.unwrap_or_else(|| SystemClock.today());
            println!("date:   {date}");
            println!("slot:   {}", day_slot(date));
            println!("labels: {}", week_labels(date).join(" "));
            Ok(())
        }
        Commands::Schema => {
            let profile = Profile::default();
            match serde_json::to_string_pretty(&profile) {
                Ok(json) => {
                    println!("{json}");
                    Ok(())
                }
                Err(e) => Err(format!("failed to encode schema: {e}")),
            }
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::FAILURE
        }
    }
}

fn read_lines(input: &PathBuf) -> Result<Vec<String>, String> {
    if input.as_os_str() == "-" {
        let stdin = io::stdin();
        stdin
            .lock()
            .lines()
            .collect::<Result<_, _>>()
            .map_err(|e| format!("failed to read stdin: {e}"))
    } else {
        let content =
            fs::read_to_string(input).map_err(|e| format!("failed to read {input:?}: {e}"))?;
        Ok(content.lines().map(|l| l.to_string()).collect())
    }
}

fn simulate(input: &PathBuf, user: &str, start: NaiveDateTime, pretty: bool) -> Result<(), String> {
    let store = MemoryProfileStore::with_profile(user, Profile::default());
    let scratch = MemoryScratch::new();
    let clock = ManualClock::new(start);
    let mut engine = RolloverEngine::new(store.clone(), scratch, clock.clone(), user);
    let mut driver = DailyDriver::new(clock.clone());

    for (line_no, line) in read_lines(input)?.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: Event = serde_json::from_str(line)
            .map_err(|e| format!("line {}: invalid event: {e}", line_no + 1))?;
        apply_event(event, &mut engine, &mut driver, &clock)
            .map_err(|e| format!("line {}: {e}", line_no + 1))?;
    }

    let profile = store
        .profile(user)
        .ok_or_else(|| "profile disappeared during simulation".to_string())?;
    let json = if pretty || atty::is(atty::Stream::Stdout) {
        serde_json::to_string_pretty(&profile)
    } else {
        serde_json::to_string(&profile)
    }
    .map_err(|e| format!("failed to encode profile: {e}"))?;
    println!("{json}");
    Ok(())
}

fn apply_event(
    event: Event,
    engine: &mut RolloverEngine<MemoryProfileStore, MemoryScratch, ManualClock>,
    driver: &mut DailyDriver<ManualClock>,
    clock: &ManualClock,
) -> Result<(), String> {
    match event {
        Event::Steps { cumulative } => {
            let update = engine.on_step_reading(cumulative);
            eprintln!(
                "{} steps today: {} (slot {})",
                clock.now(),
                update.steps_today,
                update.slot
            );
        }
        Event::Advance { minutes } => {
            clock.advance(chrono::Duration::minutes(minutes));
        }
        Event::DailyReset => {
            clock.advance(until_next_midnight(clock.now()));
            match driver.fire(engine) {
                ResetOutcome::Completed => eprintln!("{} daily reset completed", clock.now()),
                ResetOutcome::SkippedNoProfile => eprintln!("daily reset skipped: no profile"),
                ResetOutcome::Retry => return Err("daily reset failed; would retry".to_string()),
            }
        }
        Event::WeeklyReset => match engine.weekly_reset() {
            ResetOutcome::Retry => return Err("weekly reset failed; would retry".to_string()),
            _ => eprintln!("{} weekly reset completed", clock.now()),
        },
        Event::Sleep { hours, minutes } => {
            engine
                .record_sleep(hours, minutes)
                .map_err(|e| e.to_string())?
                .wait()
                .map_err(|e| e.to_string())?;
        }
        Event::Water { liters } => {
            engine
                .update_water_intake(liters)
                .wait()
                .map_err(|e| e.to_string())?;
        }
        Event::Goal { steps } => {
            engine
                .set_daily_step_goal(steps)
                .map_err(|e| e.to_string())?
                .wait()
                .map_err(|e| e.to_string())?;
        }
        Event::Bmi {
            weight_kg,
            height_cm,
        } => {
            engine
                .update_bmi(weight_kg, height_cm)
                .map_err(|e| e.to_string())?
                .wait()
                .map_err(|e| e.to_string())?;
        }
        Event::Alarm { time, sound } => {
            engine
                .set_alarm(time, sound)
                .wait()
                .map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}
