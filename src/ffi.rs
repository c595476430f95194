//! FFI bindings for Stride Core
//!
//! C-compatible surface for mobile shells embedding the engine. The handle
//! wraps an engine over in-memory stores; the shell seeds it with the
//! profile JSON it fetched from its own remote SDK and exports the updated
//! profile JSON to persist after mutations. All functions use C strings
//! (null-terminated); returned strings are allocated and must be freed with
//! `stride_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::clock::SystemClock;
use crate::engine::{ResetOutcome, RolloverEngine};
use crate::scratch::MemoryScratch;
use crate::store::MemoryProfileStore;
use crate::types::Profile;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Opaque engine handle held by the embedding shell
pub struct StrideEngine {
    engine: RolloverEngine<MemoryProfileStore, MemoryScratch, SystemClock>,
    store: MemoryProfileStore,
    user_id: String,
}

fn outcome_code(outcome: ResetOutcome) -> i32 {
    match outcome {
        ResetOutcome::Completed => 0,
        ResetOutcome::SkippedNoProfile => 1,
        ResetOutcome::Retry => 2,
    }
}

/// Create an engine for `user_id`, optionally seeded with profile JSON.
///
/// # Safety
/// - `user_id` must be a valid null-terminated C string.
/// - `profile_json` may be NULL for a fresh default profile.
/// - The returned handle must be freed with `stride_engine_free`.
/// - Returns NULL on error; call `stride_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn stride_engine_new(
    user_id: *const c_char,
    profile_json: *const c_char,
) -> *mut StrideEngine {
    clear_last_error();

    let user_id = match cstr_to_string(user_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid user_id string pointer");
            return ptr::null_mut();
        }
    };

    let profile = if profile_json.is_null() {
        Profile::default()
    } else {
        let json = match cstr_to_string(profile_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid profile_json string pointer");
                return ptr::null_mut();
            }
        };
        match serde_json::from_str(&json) {
            Ok(profile) => profile,
            Err(e) => {
                set_last_error(&format!("Failed to parse profile JSON: {e}"));
                return ptr::null_mut();
            }
        }
    };

    let store = MemoryProfileStore::with_profile(&user_id, profile);
    let mut engine = RolloverEngine::new(
        store.clone(),
        MemoryScratch::new(),
        SystemClock,
        user_id.clone(),
    );
    if let Err(e) = engine.load_profile() {
        set_last_error(&format!("Failed to load profile: {e}"));
        return ptr::null_mut();
    }

    Box::into_raw(Box::new(StrideEngine {
        engine,
        store,
        user_id,
    }))
}

/// Free an engine handle.
///
/// # Safety
/// - `handle` must be a pointer returned by `stride_engine_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn stride_engine_free(handle: *mut StrideEngine) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Feed one cumulative sensor reading; returns the resulting steps-today,
/// or -1 on a NULL handle.
///
/// # Safety
/// - `handle` must be a valid engine handle.
#[no_mangle]
pub unsafe extern "C" fn stride_engine_on_step_reading(
    handle: *mut StrideEngine,
    cumulative: f64,
) -> i64 {
    clear_last_error();
    let Some(state) = handle.as_mut() else {
        set_last_error("NULL engine handle");
        return -1;
    };
    i64::from(state.engine.on_step_reading(cumulative).steps_today)
}

/// Run the midnight close-out. Returns 0 (completed), 1 (skipped, no
/// profile), 2 (retry), or -1 on a NULL handle.
///
/// # Safety
/// - `handle` must be a valid engine handle.
#[no_mangle]
pub unsafe extern "C" fn stride_engine_daily_reset(handle: *mut StrideEngine) -> i32 {
    clear_last_error();
    let Some(state) = handle.as_mut() else {
        set_last_error("NULL engine handle");
        return -1;
    };
    outcome_code(state.engine.daily_reset())
}

/// Run the weekly hard reset. Return codes as for `stride_engine_daily_reset`.
///
/// # Safety
/// - `handle` must be a valid engine handle.
#[no_mangle]
pub unsafe extern "C" fn stride_engine_weekly_reset(handle: *mut StrideEngine) -> i32 {
    clear_last_error();
    let Some(state) = handle.as_mut() else {
        set_last_error("NULL engine handle");
        return -1;
    };
    outcome_code(state.engine.weekly_reset())
}

/// Record last night's sleep into today's weekly slot. Returns 0 on
/// success, -1 on error.
///
/// # Safety
/// - `handle` must be a valid engine handle.
#[no_mangle]
pub unsafe extern "C" fn stride_engine_record_sleep(
    handle: *mut StrideEngine,
    hours: u32,
    minutes: u32,
) -> i32 {
    clear_last_error();
    let Some(state) = handle.as_mut() else {
        set_last_error("NULL engine handle");
        return -1;
    };
    match state.engine.record_sleep(hours, minutes) {
        Ok(ticket) => match ticket.wait() {
            Ok(()) => 0,
            Err(e) => {
                set_last_error(&format!("Sleep write failed: {e}"));
                -1
            }
        },
        Err(e) => {
            set_last_error(&format!("Sleep update failed: {e}"));
            -1
        }
    }
}

/// Export the current profile as JSON.
///
/// # Safety
/// - `handle` must be a valid engine handle.
/// - Returns a newly allocated string that must be freed with
///   `stride_free_string`; NULL on error.
#[no_mangle]
pub unsafe extern "C" fn stride_engine_profile_json(handle: *mut StrideEngine) -> *mut c_char {
    clear_last_error();
    let Some(state) = handle.as_mut() else {
        set_last_error("NULL engine handle");
        return ptr::null_mut();
    };

    // Export what the store holds, which reflects completed writes rather
    // than the optimistic snapshot.
    let profile = state
        .store
        .profile(&state.user_id)
        .unwrap_or_else(Profile::default);
    match serde_json::to_string(&profile) {
        Ok(json) => match CString::new(json) {
            Ok(cstr) => cstr.into_raw(),
            Err(_) => {
                set_last_error("Profile JSON contained an interior NUL");
                ptr::null_mut()
            }
        },
        Err(e) => {
            set_last_error(&format!("Failed to encode profile: {e}"));
            ptr::null_mut()
        }
    }
}

/// Get the last error message for this thread, or NULL if none.
///
/// # Safety
/// - The returned pointer is borrowed; it is valid until the next Stride
///   call on this thread and must not be freed.
#[no_mangle]
pub unsafe extern "C" fn stride_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|msg| msg.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Free a string returned by this library.
///
/// # Safety
/// - `ptr` must have been returned by a Stride function, or be NULL.
#[no_mangle]
pub unsafe extern "C" fn stride_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cstr(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn test_engine_lifecycle_over_ffi() {
        unsafe {
            let user = cstr("u1");
            let handle = stride_engine_new(user.as_ptr(), ptr::null());
            assert!(!handle.is_null());

            assert_eq!(stride_engine_on_step_reading(handle, 1000.0), 0);
            assert_eq!(stride_engine_on_step_reading(handle, 1150.0), 150);

            let json_ptr = stride_engine_profile_json(handle);
            assert!(!json_ptr.is_null());
            let json = CStr::from_ptr(json_ptr).to_str().unwrap().to_string();
            stride_free_string(json_ptr);
            assert!(json.contains("\"stepsToday\":150"));

            stride_engine_free(handle);
        }
    }

    #[test]
    fn test_seeded_profile_and_resets() {
        unsafe {
            let user = cstr("u1");
            let seed = cstr(r#"{"stepsToday": 42, "weeklySteps": [10,20,30,40,50,60,70]}"#);
            let handle = stride_engine_new(user.as_ptr(), seed.as_ptr());
            assert!(!handle.is_null());

            assert_eq!(stride_engine_daily_reset(handle), 0);

            let json_ptr = stride_engine_profile_json(handle);
            let json = CStr::from_ptr(json_ptr).to_str().unwrap().to_string();
            stride_free_string(json_ptr);
            assert!(json.contains("[20,30,40,50,60,70,42]"));

            assert_eq!(stride_engine_weekly_reset(handle), 0);
            stride_engine_free(handle);
        }
    }

    #[test]
    fn test_invalid_json_reports_error() {
        unsafe {
            let user = cstr("u1");
            let bad = cstr("not json");
            let handle = stride_engine_new(user.as_ptr(), bad.as_ptr());
            assert!(handle.is_null());
            assert!(!stride_last_error().is_null());
        }
    }

    #[test]
    fn test_null_handle_is_rejected() {
        unsafe {
            assert_eq!(stride_engine_on_step_reading(ptr::null_mut(), 100.0), -1);
            assert_eq!(stride_engine_daily_reset(ptr::null_mut()), -1);
            assert_eq!(stride_engine_record_sleep(ptr::null_mut(), 7, 30), -1);
        }
    }
}
