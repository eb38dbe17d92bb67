//! FFI bindings for Emotion Risk
//!
//! This module provides C-compatible functions for calling the analyzer from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `emorisk_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

use crate::config::AnalysisConfig;
use crate::encoder::ReportEncoder;
use crate::error::AnalysisError;
use crate::pipeline::EmotionAnalyzer;

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

/// Analyze a file and encode the report as compact JSON
fn analyze_to_json(analyzer: &EmotionAnalyzer, path: &str) -> Result<String, AnalysisError> {
    let path = Path::new(path);
    let result = analyzer.analyze_path(path)?;
    let source = path.file_name().map(|name| name.to_string_lossy());
    ReportEncoder::new().encode_to_json(&result, source.as_deref(), false)
}

/// Run an analysis and hand the report (or NULL plus last error) to C
fn report_or_null(analyzer: &EmotionAnalyzer, path: &str) -> *mut c_char {
    match analyze_to_json(analyzer, path) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze a workbook file with the default configuration and return the JSON report.
///
/// # Safety
/// - `path` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `emorisk_free_string`.
/// - Returns NULL on error; call `emorisk_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn emorisk_analyze_path(path: *const c_char) -> *mut c_char {
    clear_last_error();

    let path_str = match cstr_to_string(path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid path string pointer");
            return ptr::null_mut();
        }
    };

    report_or_null(&EmotionAnalyzer::new(), &path_str)
}

// ============================================================================
// Configured API
// ============================================================================

/// Opaque handle to a configured analyzer
pub struct EmotionAnalyzerHandle {
    analyzer: EmotionAnalyzer,
}

/// Create an analyzer from a JSON configuration.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string, or NULL for defaults.
/// - Returns a pointer that must be freed with `emorisk_analyzer_free`.
/// - Returns NULL on error; call `emorisk_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn emorisk_analyzer_new(
    config_json: *const c_char,
) -> *mut EmotionAnalyzerHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        AnalysisConfig::default()
    } else {
        let json_str = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match AnalysisConfig::from_json(&json_str) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let handle = Box::new(EmotionAnalyzerHandle {
        analyzer: EmotionAnalyzer::with_config(config),
    });
    Box::into_raw(handle)
}

/// Free an analyzer.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `emorisk_analyzer_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn emorisk_analyzer_free(analyzer: *mut EmotionAnalyzerHandle) {
    if !analyzer.is_null() {
        drop(Box::from_raw(analyzer));
    }
}

/// Analyze a workbook file with a configured analyzer.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `emorisk_analyzer_new`.
/// - `path` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `emorisk_free_string`.
/// - Returns NULL on error; call `emorisk_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn emorisk_analyzer_analyze_path(
    analyzer: *const EmotionAnalyzerHandle,
    path: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if analyzer.is_null() {
        set_last_error("Null analyzer pointer");
        return ptr::null_mut();
    }

    let path_str = match cstr_to_string(path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid path string pointer");
            return ptr::null_mut();
        }
    };

    report_or_null(&(*analyzer).analyzer, &path_str)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by emorisk functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an emorisk function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn emorisk_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next emorisk function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn emorisk_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn emorisk_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::fs;
    use uuid::Uuid;

    fn write_csv(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("emorisk-ffi-{}.csv", Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    fn sample_csv() -> String {
        let mut csv = String::from("Session ID,Timestamp,Emotion,Confidence\n");
        for i in 0..10 {
            let emotion = if i < 6 { "sad" } else { "neutral" };
            csv.push_str(&format!("1,2024-01-15 10:00:{i:02},{emotion},75\n"));
        }
        csv
    }

    #[test]
    fn test_ffi_analyzer_lifecycle() {
        let path = write_csv(&sample_csv());
        let config = CString::new(r#"{"allowed_extensions": ["csv"]}"#).unwrap();
        let c_path = CString::new(path.to_string_lossy().as_ref()).unwrap();

        unsafe {
            let analyzer = emorisk_analyzer_new(config.as_ptr());
            assert!(!analyzer.is_null());

            let result = emorisk_analyzer_analyze_path(analyzer, c_path.as_ptr());
            assert!(!result.is_null());

            let json = CStr::from_ptr(result).to_str().unwrap();
            let value: serde_json::Value = serde_json::from_str(json).unwrap();
            assert_eq!(value["source"]["format"], "raw_events");
            assert_eq!(value["health_predictions"][0]["risk"], "Depression");

            emorisk_free_string(result);
            emorisk_analyzer_free(analyzer);
        }

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_ffi_default_config_rejects_csv() {
        let path = write_csv(&sample_csv());
        let c_path = CString::new(path.to_string_lossy().as_ref()).unwrap();

        unsafe {
            let result = emorisk_analyze_path(c_path.as_ptr());
            assert!(result.is_null());

            let error = CStr::from_ptr(emorisk_last_error()).to_str().unwrap();
            assert!(error.starts_with("Invalid file type"));
        }

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            assert!(emorisk_analyze_path(ptr::null()).is_null());
            let error = CStr::from_ptr(emorisk_last_error()).to_str().unwrap();
            assert_eq!(error, "Invalid path string pointer");

            let bad_config = CString::new("not json").unwrap();
            assert!(emorisk_analyzer_new(bad_config.as_ptr()).is_null());
            assert!(!emorisk_last_error().is_null());

            let analyzer = emorisk_analyzer_new(ptr::null());
            assert!(!analyzer.is_null());
            emorisk_analyzer_free(analyzer);
            assert!(emorisk_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = emorisk_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, crate::VERSION);
        }
    }
}
