//! FFI bindings for Author Flux
//!
//! This module provides C-compatible functions for calling Flux from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `flux_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::FeatureConfig;
use crate::pipeline::{posts_to_features, posts_to_time_statistics};
use crate::timing::TimeSelection;

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

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Derive author features from NDJSON posts and return a JSON payload.
///
/// # Safety
/// - `posts_ndjson` must be a valid null-terminated C string.
/// - `config_json` may be NULL (defaults) or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `flux_free_string`.
/// - Returns NULL on error; call `flux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn flux_author_features(
    posts_ndjson: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let posts = match cstr_to_string(posts_ndjson) {
        Some(s) => s,
        None => {
            set_last_error("Invalid posts string pointer");
            return ptr::null_mut();
        }
    };

    let config = if config_json.is_null() {
        FeatureConfig::default()
    } else {
        let raw = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match FeatureConfig::from_json(&raw) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match posts_to_features(&posts, &config) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Compute posting-time statistics and return a JSON array of rows.
///
/// # Safety
/// - `posts_ndjson` and `language` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `flux_free_string`.
/// - Returns NULL on error (including when both flags are false); call
///   `flux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn flux_time_statistics(
    posts_ndjson: *const c_char,
    language: *const c_char,
    include_matching: bool,
    include_non_matching: bool,
) -> *mut c_char {
    clear_last_error();

    let posts = match cstr_to_string(posts_ndjson) {
        Some(s) => s,
        None => {
            set_last_error("Invalid posts string pointer");
            return ptr::null_mut();
        }
    };

    let language = match cstr_to_string(language) {
        Some(s) => s,
        None => {
            set_last_error("Invalid language string pointer");
            return ptr::null_mut();
        }
    };

    let config = FeatureConfig {
        language,
        time_selection: TimeSelection {
            include_matching,
            include_non_matching,
        },
        ..Default::default()
    };

    let rows = match posts_to_time_statistics(&posts, &config) {
        Ok(rows) => rows,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match serde_json::to_string(&rows) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Flux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Flux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn flux_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Flux function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn flux_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Flux library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn flux_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
