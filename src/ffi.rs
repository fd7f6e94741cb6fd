//! FFI bindings for Wearwire
//!
//! This module provides C-compatible functions for calling Wearwire from other
//! languages (typically the platform code that owns the Bluetooth stack).
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `wearwire_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::slice;

use crate::gatt::Characteristic;
use crate::pipeline::{decode_frame_to_json, TelemetryProcessor};
use crate::types::Device;

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

/// Helper to borrow a caller-owned byte buffer
unsafe fn bytes_from_raw<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    if data.is_null() {
        return if len == 0 { Some(&[][..]) } else { None };
    }
    Some(slice::from_raw_parts(data, len))
}

// ============================================================================
// Stateless API
// ============================================================================

/// Decode one hex-encoded frame and return reading JSON.
///
/// # Safety
/// - `characteristic`, `payload_hex`, and `device_id` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `wearwire_free_string`.
/// - Returns NULL on error; call `wearwire_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wearwire_decode_frame(
    characteristic: *const c_char,
    payload_hex: *const c_char,
    device_id: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(characteristic_str) = cstr_to_string(characteristic) else {
        set_last_error("Invalid characteristic string pointer");
        return ptr::null_mut();
    };

    let Some(payload_str) = cstr_to_string(payload_hex) else {
        set_last_error("Invalid payload string pointer");
        return ptr::null_mut();
    };

    let Some(device_str) = cstr_to_string(device_id) else {
        set_last_error("Invalid device_id string pointer");
        return ptr::null_mut();
    };

    match decode_frame_to_json(&characteristic_str, &payload_str, &device_str) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a TelemetryProcessor
pub struct TelemetryProcessorHandle {
    processor: TelemetryProcessor,
}

/// Create a new TelemetryProcessor with the specified window size.
///
/// # Safety
/// - Returns a pointer to a newly allocated TelemetryProcessor.
/// - Must be freed with `wearwire_processor_free`.
#[no_mangle]
pub unsafe extern "C" fn wearwire_processor_new(window_size: i32) -> *mut TelemetryProcessorHandle {
    clear_last_error();

    let processor = if window_size <= 0 {
        TelemetryProcessor::new()
    } else {
        TelemetryProcessor::with_window_size(window_size as usize)
    };
    Box::into_raw(Box::new(TelemetryProcessorHandle { processor }))
}

/// Free a TelemetryProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `wearwire_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn wearwire_processor_free(processor: *mut TelemetryProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Register a device with the processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `wearwire_processor_new`.
/// - `device_id` and `name` must be valid null-terminated C strings.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn wearwire_processor_register_device(
    processor: *mut TelemetryProcessorHandle,
    device_id: *const c_char,
    name: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let Some(device_str) = cstr_to_string(device_id) else {
        set_last_error("Invalid device_id string pointer");
        return -1;
    };

    let name_str = cstr_to_string(name).unwrap_or_default();

    handle
        .processor
        .register_device(Device::new(device_str, name_str));
    0
}

/// Ingest one raw notification payload and return reading JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `wearwire_processor_new`.
/// - `device_id` and `characteristic` must be valid null-terminated C strings.
/// - `data` must point to `len` readable bytes (or be NULL with `len == 0`).
/// - Returns a newly allocated string that must be freed with `wearwire_free_string`.
/// - Returns NULL when the frame is dropped or on error; call `wearwire_last_error`.
#[no_mangle]
pub unsafe extern "C" fn wearwire_processor_ingest(
    processor: *mut TelemetryProcessorHandle,
    device_id: *const c_char,
    characteristic: *const c_char,
    data: *const u8,
    len: usize,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let Some(device_str) = cstr_to_string(device_id) else {
        set_last_error("Invalid device_id string pointer");
        return ptr::null_mut();
    };

    let characteristic = match cstr_to_string(characteristic)
        .map(|s| s.parse::<Characteristic>())
    {
        Some(Ok(c)) => c,
        Some(Err(e)) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
        None => {
            set_last_error("Invalid characteristic string pointer");
            return ptr::null_mut();
        }
    };

    let Some(frame) = bytes_from_raw(data, len) else {
        set_last_error("Null data pointer");
        return ptr::null_mut();
    };

    match handle.processor.ingest(&device_str, characteristic, frame) {
        Some(reading) => match serde_json::to_string(&reading) {
            Ok(json) => string_to_cstr(&json),
            Err(e) => {
                set_last_error(&e.to_string());
                ptr::null_mut()
            }
        },
        None => {
            set_last_error("Frame dropped: malformed payload");
            ptr::null_mut()
        }
    }
}

/// Get the snapshot JSON for a device.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `wearwire_processor_new`.
/// - `device_id` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `wearwire_free_string`.
/// - Returns NULL when the device has no readings or on error.
#[no_mangle]
pub unsafe extern "C" fn wearwire_processor_snapshot(
    processor: *mut TelemetryProcessorHandle,
    device_id: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    let Some(device_str) = cstr_to_string(device_id) else {
        set_last_error("Invalid device_id string pointer");
        return ptr::null_mut();
    };

    match handle.processor.snapshot_json(&device_str) {
        Ok(Some(json)) => string_to_cstr(&json),
        Ok(None) => {
            set_last_error(&format!("No readings for device: {device_str}"));
            ptr::null_mut()
        }
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Save processor windows to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `wearwire_processor_new`.
/// - Returns a newly allocated string that must be freed with `wearwire_free_string`.
/// - Returns NULL on error; call `wearwire_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn wearwire_processor_save_windows(
    processor: *mut TelemetryProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    match handle.processor.save_windows() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Load processor windows from JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `wearwire_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn wearwire_processor_load_windows(
    processor: *mut TelemetryProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return -1;
    };

    match handle.processor.load_windows(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Free a string returned by Wearwire.
///
/// # Safety
/// - `ptr` must be a pointer returned by a Wearwire function, or NULL.
#[no_mangle]
pub unsafe extern "C" fn wearwire_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Wearwire function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn wearwire_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Wearwire library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn wearwire_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffi_decode_frame() {
        let characteristic = CString::new("2a37").unwrap();
        let payload = CString::new("004b").unwrap();
        let device = CString::new("strap").unwrap();

        unsafe {
            let result =
                wearwire_decode_frame(characteristic.as_ptr(), payload.as_ptr(), device.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let value: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert_eq!(value["heart_rate"], 75);

            wearwire_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        let device = CString::new("strap").unwrap();
        let name = CString::new("Chest Strap").unwrap();
        let characteristic = CString::new("heart_rate").unwrap();
        let frame = [0x10u8, 72, 0x00, 0x04];

        unsafe {
            let processor = wearwire_processor_new(7);
            assert!(!processor.is_null());

            assert_eq!(
                wearwire_processor_register_device(processor, device.as_ptr(), name.as_ptr()),
                0
            );

            let reading = wearwire_processor_ingest(
                processor,
                device.as_ptr(),
                characteristic.as_ptr(),
                frame.as_ptr(),
                frame.len(),
            );
            assert!(!reading.is_null());
            wearwire_free_string(reading);

            let snapshot = wearwire_processor_snapshot(processor, device.as_ptr());
            assert!(!snapshot.is_null());
            let snapshot_str = CStr::from_ptr(snapshot).to_str().unwrap();
            assert!(snapshot_str.contains("Chest Strap"));
            wearwire_free_string(snapshot);

            let windows = wearwire_processor_save_windows(processor);
            assert!(!windows.is_null());

            let processor2 = wearwire_processor_new(7);
            assert_eq!(wearwire_processor_load_windows(processor2, windows), 0);

            wearwire_free_string(windows);
            wearwire_processor_free(processor);
            wearwire_processor_free(processor2);
        }
    }

    #[test]
    fn test_ffi_dropped_frame_sets_error() {
        let device = CString::new("strap").unwrap();
        let characteristic = CString::new("2a37").unwrap();
        let frame = [0x01u8, 0x4B];

        unsafe {
            let processor = wearwire_processor_new(0);
            let reading = wearwire_processor_ingest(
                processor,
                device.as_ptr(),
                characteristic.as_ptr(),
                frame.as_ptr(),
                frame.len(),
            );
            assert!(reading.is_null());

            let error = wearwire_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("dropped"));

            wearwire_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let characteristic = CString::new("2a37").unwrap();
        let payload = CString::new("not hex").unwrap();
        let device = CString::new("strap").unwrap();

        unsafe {
            let result =
                wearwire_decode_frame(characteristic.as_ptr(), payload.as_ptr(), device.as_ptr());
            assert!(result.is_null());

            let error = wearwire_last_error();
            assert!(!error.is_null());
            assert!(!CStr::from_ptr(error).to_str().unwrap().is_empty());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = wearwire_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
