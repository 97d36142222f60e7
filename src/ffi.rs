//! FFI bindings for the BFRB tracker core
//!
//! This module provides C-compatible functions for mobile hosts. All inputs
//! and outputs are null-terminated JSON strings; returned strings are
//! allocated here and must be freed with `bfrb_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

use serde::Serialize;

use crate::auth::{guard, reduce, AuthAction, AuthSnapshot, AuthState, Route};
use crate::catalog::{Category, OptionItem};
use crate::clock::SystemClock;
use crate::history::HistorySummary;
use crate::tokens::fingerprint;
use crate::types::{Instance, RawStrategy, Strategy};
use crate::wizard::{FormDraft, TrackingWizard};

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

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Serialize `result` or record its error and return NULL
fn json_or_null<T: Serialize>(result: Result<T, String>) -> *mut c_char {
    match result.and_then(|value| serde_json::to_string(&value).map_err(|e| e.to_string())) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e);
            ptr::null_mut()
        }
    }
}

fn parse_enum<T: serde::de::DeserializeOwned>(value: &str, what: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_string()))
        .map_err(|_| format!("Unknown {what}: {value}"))
}

// ============================================================================
// Stateless API
// ============================================================================

#[derive(Serialize)]
struct CatalogCategory {
    category: Category,
    title: &'static str,
    options: &'static [OptionItem],
}

/// Full option catalog as a JSON array of categories.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with `bfrb_free_string`.
#[no_mangle]
pub unsafe extern "C" fn bfrb_catalog_json() -> *mut c_char {
    clear_last_error();

    let catalog: Vec<CatalogCategory> = Category::ALL
        .into_iter()
        .map(|category| CatalogCategory {
            category,
            title: category.title(),
            options: category.options(),
        })
        .collect();
    json_or_null(Ok(catalog))
}

/// Apply one auth action to a snapshot and return the next snapshot.
///
/// # Safety
/// - `snapshot_json` may be NULL for the initial snapshot; otherwise it and
///   `action_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `bfrb_free_string`.
/// - Returns NULL on error; call `bfrb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bfrb_auth_reduce(
    snapshot_json: *const c_char,
    action_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let current = match cstr_to_string(snapshot_json) {
        None => AuthSnapshot::default(),
        Some(json) => match serde_json::from_str::<AuthSnapshot>(&json) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                set_last_error(&format!("Invalid snapshot: {e}"));
                return ptr::null_mut();
            }
        },
    };

    let action_str = match cstr_to_string(action_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid action string pointer");
            return ptr::null_mut();
        }
    };

    json_or_null(
        serde_json::from_str::<AuthAction>(&action_str)
            .map(|action| reduce(&current, action))
            .map_err(|e| format!("Invalid action: {e}")),
    )
}

/// Route decision for an auth state and route, both given by name
/// (e.g. `"pending_approval"`, `"history"`).
///
/// # Safety
/// - `state` and `route` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `bfrb_free_string`.
/// - Returns NULL on error; call `bfrb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bfrb_guard_route(state: *const c_char, route: *const c_char) -> *mut c_char {
    clear_last_error();

    let (Some(state_str), Some(route_str)) = (cstr_to_string(state), cstr_to_string(route)) else {
        set_last_error("Invalid state or route string pointer");
        return ptr::null_mut();
    };

    json_or_null(
        parse_enum::<AuthState>(&state_str, "auth state").and_then(|state| {
            parse_enum::<Route>(&route_str, "route").map(|route| guard(state, route))
        }),
    )
}

/// Build the create payload for a wizard draft.
///
/// # Safety
/// - `draft_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `bfrb_free_string`.
/// - Returns NULL on error; call `bfrb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bfrb_build_instance_payload(draft_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json = match cstr_to_string(draft_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid draft string pointer");
            return ptr::null_mut();
        }
    };

    json_or_null(
        serde_json::from_str::<FormDraft>(&json)
            .map_err(|e| format!("Invalid draft: {e}"))
            .and_then(|draft| {
                let payload = draft.to_payload();
                payload.validate().map(|()| payload)
            }),
    )
}

/// Normalize a strategy record, or an array of them, as received from the API.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `bfrb_free_string`.
/// - Returns NULL on error; call `bfrb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bfrb_normalize_strategy(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let value: serde_json::Value = match serde_json::from_str(&json_str) {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&format!("Invalid JSON: {e}"));
            return ptr::null_mut();
        }
    };

    if value.is_array() {
        json_or_null(
            serde_json::from_value::<Vec<RawStrategy>>(value)
                .map(|raw| raw.into_iter().map(Strategy::from).collect::<Vec<_>>())
                .map_err(|e| format!("Invalid strategies: {e}")),
        )
    } else {
        json_or_null(
            serde_json::from_value::<RawStrategy>(value)
                .map(Strategy::from)
                .map_err(|e| format!("Invalid strategy: {e}")),
        )
    }
}

/// Summary statistics over a JSON array of instances.
///
/// # Safety
/// - `instances_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `bfrb_free_string`.
/// - Returns NULL on error; call `bfrb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn bfrb_history_summary(instances_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json = match cstr_to_string(instances_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    json_or_null(
        serde_json::from_str::<Vec<Instance>>(&json)
            .map(|instances| HistorySummary::from_instances(&instances))
            .map_err(|e| format!("Invalid instances: {e}")),
    )
}

/// SHA-256 hex fingerprint of a token, as stored in the blacklist.
///
/// # Safety
/// - `token` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `bfrb_free_string`.
#[no_mangle]
pub unsafe extern "C" fn bfrb_token_fingerprint(token: *const c_char) -> *mut c_char {
    clear_last_error();

    match cstr_to_string(token) {
        Some(t) => string_to_cstr(&fingerprint(&t)),
        None => {
            set_last_error("Invalid token string pointer");
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Wizard API
// ============================================================================

/// Opaque handle to a tracking wizard
pub struct WizardHandle {
    wizard: TrackingWizard,
}

/// Create a new tracking wizard on the system clock.
///
/// # Safety
/// - Returns a pointer that must be freed with `bfrb_wizard_free`.
#[no_mangle]
pub unsafe extern "C" fn bfrb_wizard_new() -> *mut WizardHandle {
    clear_last_error();

    let handle = Box::new(WizardHandle {
        wizard: TrackingWizard::new(Arc::new(SystemClock)),
    });
    Box::into_raw(handle)
}

/// Free a wizard.
///
/// # Safety
/// - `wizard` must be a valid pointer returned by `bfrb_wizard_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn bfrb_wizard_free(wizard: *mut WizardHandle) {
    if !wizard.is_null() {
        drop(Box::from_raw(wizard));
    }
}

/// Toggle a catalog option on the wizard draft.
///
/// # Safety
/// - `wizard` must be a valid pointer returned by `bfrb_wizard_new`.
/// - `category` and `id` must be valid null-terminated C strings.
/// - Returns 1 if the option is now selected, 0 if deselected, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn bfrb_wizard_toggle(
    wizard: *mut WizardHandle,
    category: *const c_char,
    id: *const c_char,
) -> i32 {
    clear_last_error();

    if wizard.is_null() {
        set_last_error("Null wizard pointer");
        return -1;
    }
    let handle = &mut *wizard;

    let Some(category) = cstr_to_string(category).and_then(|c| Category::parse(&c)) else {
        set_last_error("Invalid category");
        return -1;
    };
    let Some(id) = cstr_to_string(id) else {
        set_last_error("Invalid id string pointer");
        return -1;
    };

    match handle.wizard.toggle(category, &id) {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Advance to the next step. Returns 0 on success, -1 on the last step.
///
/// # Safety
/// - `wizard` must be a valid pointer returned by `bfrb_wizard_new`.
#[no_mangle]
pub unsafe extern "C" fn bfrb_wizard_advance(wizard: *mut WizardHandle) -> i32 {
    clear_last_error();

    if wizard.is_null() {
        set_last_error("Null wizard pointer");
        return -1;
    }
    let handle = &mut *wizard;

    match handle.wizard.advance() {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Go back one step. Returns 0 on success, 1 when already on the first step.
///
/// # Safety
/// - `wizard` must be a valid pointer returned by `bfrb_wizard_new`.
#[no_mangle]
pub unsafe extern "C" fn bfrb_wizard_back(wizard: *mut WizardHandle) -> i32 {
    clear_last_error();

    if wizard.is_null() {
        set_last_error("Null wizard pointer");
        return -1;
    }
    let handle = &mut *wizard;

    match handle.wizard.back() {
        Some(_) => 0,
        None => 1,
    }
}

/// Current step and draft as JSON.
///
/// # Safety
/// - `wizard` must be a valid pointer returned by `bfrb_wizard_new`.
/// - Returns a newly allocated string that must be freed with `bfrb_free_string`.
#[no_mangle]
pub unsafe extern "C" fn bfrb_wizard_state(wizard: *const WizardHandle) -> *mut c_char {
    clear_last_error();

    if wizard.is_null() {
        set_last_error("Null wizard pointer");
        return ptr::null_mut();
    }
    let handle = &*wizard;

    json_or_null(Ok(serde_json::json!({
        "step": handle.wizard.step(),
        "draft": handle.wizard.draft(),
    })))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by this library.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a `bfrb_` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn bfrb_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next `bfrb_` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn bfrb_last_error() -> *const c_char {
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
pub unsafe extern "C" fn bfrb_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
