//! FFI (Foreign Function Interface) bindings for the mod manager host.
//!
//! The host serializes the slice of its state the report needs into a
//! [`HostState`] JSON document and calls into this library to build, render
//! and save reports.
//!
//! # Memory Management
//!
//! - Rust allocates memory and returns pointers to the host
//! - The calling code MUST call the corresponding `_free` functions to prevent leaks
//! - Strings are null-terminated UTF-8
//!
//! # Errors
//!
//! Functions returning pointers return null on failure. The message of the
//! last failure on the calling thread is available from
//! `modreport_last_error()`, and `modreport_last_error_is_cancellation()`
//! tells an intentional cancellation (unknown mod, unknown mod type) apart
//! from a real fault so the host can skip its error notification.
//!
//! # Usage from C
//!
//! ```c
//! CModReport *report = modreport_generate(state_json, "my-mod-id", 1);
//! if (report == NULL) {
//!     if (!modreport_last_error_is_cancellation()) {
//!         char *msg = modreport_last_error();
//!         show_error(msg);
//!         modreport_free_string(msg);
//!     }
//! } else {
//!     char *text = modreport_report_text(report);
//!     copy_to_clipboard(text);
//!     modreport_free_string(text);
//!     modreport_free_report(report);
//! }
//! ```

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::format::{render_text, to_json};
use crate::model::{HostState, ModReport};
use crate::operations::{save_report, ReportFormat};
use crate::report::{DigestMode, ReportGenerator};
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;
use std::ptr;

// ============================================================================
// C-Compatible Types
// ============================================================================

/// Opaque handle to a generated report
#[repr(C)]
pub struct CModReport {
    report: ModReport,
}

/// Digest generation modes accepted by `modreport_generate()`
#[repr(C)]
pub enum CDigestMode {
    /// Never hash files
    Never = 0,
    /// Always hash files
    Always = 1,
    /// Hash files unless the mod has more files than the configured threshold
    Auto = 2,
}

struct LastError {
    message: String,
    cancelled: bool,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

fn set_last_error(message: String, cancelled: bool) {
    if cancelled {
        log::info!("{}", message);
    } else {
        log::error!("{}", message);
    }
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(LastError { message, cancelled }));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

// ============================================================================
// Report Generation
// ============================================================================

/// Generate a report for `mod_id` from a JSON encoded host state.
/// `digests` is one of the `CDigestMode` values.
/// Returns an opaque handle, or null on failure.
/// Caller MUST call modreport_free_report() when done.
#[no_mangle]
pub extern "C" fn modreport_generate(
    state_json: *const c_char,
    mod_id: *const c_char,
    digests: c_int,
) -> *mut CModReport {
    clear_last_error();

    let (state_json, mod_id) = match (c_char_to_str(state_json), c_char_to_str(mod_id)) {
        (Some(state), Some(id)) => (state, id),
        _ => {
            set_last_error("Invalid host state or mod id string".to_string(), false);
            return ptr::null_mut();
        }
    };

    match generate(state_json, mod_id, digest_mode_from_int(digests)) {
        Ok(report) => Box::into_raw(Box::new(CModReport { report })),
        Err(e) => {
            set_last_error(e.to_string(), e.is_cancellation());
            ptr::null_mut()
        }
    }
}

fn generate(state_json: &str, mod_id: &str, digests: DigestMode) -> Result<ModReport, ReportError> {
    let state: HostState = serde_json::from_str(state_json)?;
    let config = ReportConfig::default()
        .with_env_overrides()
        .map_err(|e| ReportError::Runtime(format!("{:#}", e)))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let generator = ReportGenerator::new(config);
    // The host cannot be prompted from here, so large mods skip hashing.
    let decline = |_: usize| false;
    runtime.block_on(generator.generate(&state, mod_id, digests, &decline))
}

/// Get the number of files listed in a report.
#[no_mangle]
pub extern "C" fn modreport_report_file_count(report: *const CModReport) -> c_int {
    if report.is_null() {
        return 0;
    }
    unsafe { (*report).report.files.len() as c_int }
}

/// Render a report as plain text.
/// Caller MUST call modreport_free_string() when done.
#[no_mangle]
pub extern "C" fn modreport_report_text(report: *const CModReport) -> *mut c_char {
    if report.is_null() {
        return ptr::null_mut();
    }
    unsafe { string_to_c_char(&render_text(&(*report).report)) }
}

/// Serialize a report as JSON.
/// Caller MUST call modreport_free_string() when done.
#[no_mangle]
pub extern "C" fn modreport_report_json(report: *const CModReport) -> *mut c_char {
    if report.is_null() {
        return ptr::null_mut();
    }
    unsafe {
        match to_json(&(*report).report) {
            Ok(json) => string_to_c_char(&json),
            Err(e) => {
                set_last_error(format!("Error serializing report: {}", e), false);
                ptr::null_mut()
            }
        }
    }
}

/// Save a report into `dir`. `format` is 0 for text, 1 for JSON.
/// Returns the saved file path, or null on error.
/// Caller MUST call modreport_free_string() when done.
#[no_mangle]
pub extern "C" fn modreport_save_report(
    report: *const CModReport,
    dir: *const c_char,
    format: c_int,
) -> *mut c_char {
    if report.is_null() {
        return ptr::null_mut();
    }
    let dir = match c_char_to_str(dir) {
        Some(dir) => PathBuf::from(dir),
        None => return ptr::null_mut(),
    };
    let format = if format == 1 {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };

    unsafe {
        match save_report(&(*report).report, &dir, format) {
            Ok(path) => string_to_c_char(&path.to_string_lossy()),
            Err(e) => {
                set_last_error(format!("Error saving report: {:#}", e), false);
                ptr::null_mut()
            }
        }
    }
}

/// Free a report returned by modreport_generate().
#[no_mangle]
pub extern "C" fn modreport_free_report(report: *mut CModReport) {
    if !report.is_null() {
        unsafe {
            let _ = Box::from_raw(report);
        }
    }
}

// ============================================================================
// Error Reporting
// ============================================================================

/// Message of the last failure on this thread, or null if the last call succeeded.
/// Caller MUST call modreport_free_string() when done.
#[no_mangle]
pub extern "C" fn modreport_last_error() -> *mut c_char {
    LAST_ERROR.with(|slot| match slot.borrow().as_ref() {
        Some(err) => string_to_c_char(&err.message),
        None => ptr::null_mut(),
    })
}

/// Returns 1 if the last failure on this thread was an intentional cancellation.
#[no_mangle]
pub extern "C" fn modreport_last_error_is_cancellation() -> c_int {
    LAST_ERROR.with(|slot| match slot.borrow().as_ref() {
        Some(err) if err.cancelled => 1,
        _ => 0,
    })
}

// ============================================================================
// String Management
// ============================================================================

/// Free a string returned by FFI functions.
#[no_mangle]
pub extern "C" fn modreport_free_string(s: *mut c_char) {
    free_c_char(s);
}

// ============================================================================
// Helper Functions
// ============================================================================

fn digest_mode_from_int(value: c_int) -> DigestMode {
    match value {
        v if v == CDigestMode::Never as c_int => DigestMode::Never,
        v if v == CDigestMode::Auto as c_int => DigestMode::Ask,
        _ => DigestMode::Always,
    }
}

fn c_char_to_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s).to_str().ok() }
}

fn string_to_c_char(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn free_c_char(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            let _ = CString::from_raw(s);
        }
    }
}
