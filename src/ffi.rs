//! FFI bindings for the gaze pursuit engine
//!
//! C-compatible functions for embedding the detector in a host application.
//! Strings are null-terminated; every returned string is newly allocated and
//! must be freed by the caller with `pursuit_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::DetectorConfig;
use crate::cue::{CuePair, TrackedCue};
use crate::detector::GazeDetector;
use crate::error::PursuitError;
use crate::trace::replay_trace;
use crate::types::{Point, State};

/// No direction event for this sample
pub const PURSUIT_NONE: i32 = 0;
/// The sample classified as Increase
pub const PURSUIT_INCREASE: i32 = 1;
/// The sample classified as Decrease
pub const PURSUIT_DECREASE: i32 = 2;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

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

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Config from an optional JSON string; NULL means defaults
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<DetectorConfig, PursuitError> {
    if config_json.is_null() {
        return Ok(DetectorConfig::default());
    }
    match cstr_to_string(config_json) {
        Some(json) => DetectorConfig::from_json(&json),
        None => Err(PursuitError::ParseError(
            "Config string is not valid UTF-8".to_string(),
        )),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Replay an NDJSON or JSON-array trace and return the report as JSON.
///
/// # Safety
/// - `trace` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `pursuit_free_string`.
/// - Returns NULL on error; call `pursuit_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pursuit_replay_trace(
    trace: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let trace_str = match cstr_to_string(trace) {
        Some(s) => s,
        None => {
            set_last_error("Invalid trace string pointer");
            return ptr::null_mut();
        }
    };

    let result = config_from_ptr(config_json)
        .and_then(|config| replay_trace(&trace_str, config))
        .and_then(|report| serde_json::to_string(&report).map_err(PursuitError::from));

    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Detector API
// ============================================================================

/// Opaque handle to a GazeDetector with host-positioned cues
pub struct PursuitDetectorHandle {
    detector: GazeDetector,
    increase: TrackedCue,
    decrease: TrackedCue,
}

/// Create a stopped detector.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a pointer that must be freed with `pursuit_detector_free`.
/// - Returns NULL on error; call `pursuit_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pursuit_detector_new(
    config_json: *const c_char,
) -> *mut PursuitDetectorHandle {
    clear_last_error();

    let config = match config_from_ptr(config_json) {
        Ok(config) => config,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let increase = TrackedCue::default();
    let decrease = TrackedCue::default();
    match GazeDetector::new(config, CuePair::new(increase.clone(), decrease.clone())) {
        Ok(detector) => Box::into_raw(Box::new(PursuitDetectorHandle {
            detector,
            increase,
            decrease,
        })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a detector.
///
/// # Safety
/// - `detector` must be a valid pointer returned by `pursuit_detector_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pursuit_detector_free(detector: *mut PursuitDetectorHandle) {
    if !detector.is_null() {
        drop(Box::from_raw(detector));
    }
}

/// Move both cues. Call before each feed when the cues are animated.
///
/// # Safety
/// - `detector` must be a valid pointer returned by `pursuit_detector_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn pursuit_detector_set_cues(
    detector: *mut PursuitDetectorHandle,
    increase_x: f64,
    increase_y: f64,
    decrease_x: f64,
    decrease_y: f64,
) -> i32 {
    clear_last_error();

    if detector.is_null() {
        set_last_error("Null detector pointer");
        return -1;
    }

    let handle = &*detector;
    handle.increase.set_location(Point::new(increase_x, increase_y));
    handle.decrease.set_location(Point::new(decrease_x, decrease_y));
    0
}

/// Start a new session and return its identity as JSON.
///
/// # Safety
/// - `detector` must be a valid pointer returned by `pursuit_detector_new`.
/// - Returns a newly allocated string that must be freed with `pursuit_free_string`.
/// - Returns NULL on error; call `pursuit_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pursuit_detector_start(
    detector: *mut PursuitDetectorHandle,
) -> *mut c_char {
    clear_last_error();

    if detector.is_null() {
        set_last_error("Null detector pointer");
        return ptr::null_mut();
    }

    let handle = &mut *detector;
    let info = handle.detector.start();
    match serde_json::to_string(&info) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Stop the session and return its summary as JSON.
///
/// # Safety
/// - `detector` must be a valid pointer returned by `pursuit_detector_new`.
/// - Returns a newly allocated string that must be freed with `pursuit_free_string`.
/// - Returns NULL if the detector was not running or on error.
#[no_mangle]
pub unsafe extern "C" fn pursuit_detector_stop(
    detector: *mut PursuitDetectorHandle,
) -> *mut c_char {
    clear_last_error();

    if detector.is_null() {
        set_last_error("Null detector pointer");
        return ptr::null_mut();
    }

    let handle = &mut *detector;
    let Some(summary) = handle.detector.stop() else {
        set_last_error("Detector is not running");
        return ptr::null_mut();
    };
    match serde_json::to_string(&summary) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Clear window and hysteresis. `saccade` non-zero records it as a saccade.
///
/// # Safety
/// - `detector` must be a valid pointer returned by `pursuit_detector_new`.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn pursuit_detector_reset(
    detector: *mut PursuitDetectorHandle,
    saccade: i32,
) -> i32 {
    clear_last_error();

    if detector.is_null() {
        set_last_error("Null detector pointer");
        return -1;
    }

    let handle = &mut *detector;
    if saccade != 0 {
        handle.detector.on_saccade();
    } else {
        handle.detector.reset();
    }
    0
}

/// Feed one gaze sample.
///
/// # Safety
/// - `detector` must be a valid pointer returned by `pursuit_detector_new`.
/// - Returns `PURSUIT_INCREASE`, `PURSUIT_DECREASE` or `PURSUIT_NONE`; -1 on error.
#[no_mangle]
pub unsafe extern "C" fn pursuit_detector_feed(
    detector: *mut PursuitDetectorHandle,
    timestamp_ms: i64,
    x: f64,
    y: f64,
) -> i32 {
    clear_last_error();

    if detector.is_null() {
        set_last_error("Null detector pointer");
        return -1;
    }

    let handle = &mut *detector;
    match handle.detector.feed(timestamp_ms, Point::new(x, y)) {
        Some(detection) => match detection.state {
            State::Increase => PURSUIT_INCREASE,
            State::Decrease => PURSUIT_DECREASE,
            State::Unknown => PURSUIT_NONE,
        },
        None => PURSUIT_NONE,
    }
}

/// Current control value, or NaN for a NULL detector.
///
/// # Safety
/// - `detector` must be a valid pointer returned by `pursuit_detector_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn pursuit_detector_value(detector: *const PursuitDetectorHandle) -> f64 {
    if detector.is_null() {
        return f64::NAN;
    }
    (*detector).detector.value()
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by pursuit functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a pursuit function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pursuit_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next pursuit function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn pursuit_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn pursuit_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
