//! C FFI bindings for boombox-core
//!
//! This crate provides a C-compatible API so a native GUI can drive the
//! pending file list and the preview session. Functions that can fail return
//! null or a negative value and record a message readable with
//! `bb_last_error`.

use boombox_core::{today_file_name, ExportKind, PendingFiles, PreviewSession, SortOrder};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ffi::{CStr, CString};
use std::fmt::Display;
use std::os::raw::c_char;
use std::ptr;

/// Opaque handle to a pending file list
pub struct FfiPendingFiles {
    inner: PendingFiles,
}

/// Opaque handle to a preview session
pub struct FfiSession {
    inner: PreviewSession,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn set_last_error(err: impl Display) {
    let message = err.to_string();
    tracing::warn!(error = %message, "FFI call failed");
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

fn into_c_string(s: &str) -> *mut c_char {
    CString::new(s)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Borrow a C string as UTF-8, recording an error if it is null or invalid
unsafe fn read_str<'a>(s: *const c_char, what: &str) -> Option<&'a str> {
    if s.is_null() {
        set_last_error(format!("{} is null", what));
        return None;
    }
    match CStr::from_ptr(s).to_str() {
        Ok(s) => Some(s),
        Err(_) => {
            set_last_error(format!("{} is not valid UTF-8", what));
            None
        }
    }
}

fn sort_order(descending: bool) -> SortOrder {
    if descending {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    }
}

/// Get the message of the last failed call on this thread
///
/// # Safety
/// - Returns null if no call has failed
/// - Caller must free the returned string with `bb_free_string`
#[no_mangle]
pub unsafe extern "C" fn bb_last_error() -> *mut c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_deref()
            .map(into_c_string)
            .unwrap_or(ptr::null_mut())
    })
}

/// Get the default export file name for today
///
/// # Safety
/// - Caller must free the returned string with `bb_free_string`
#[no_mangle]
pub unsafe extern "C" fn bb_default_file_name(filtered: bool) -> *mut c_char {
    let kind = if filtered {
        ExportKind::Filtered
    } else {
        ExportKind::Merged
    };
    into_c_string(&today_file_name(kind))
}

/// Create an empty pending file list
///
/// # Safety
/// - Free the result with `bb_pending_free`
#[no_mangle]
pub unsafe extern "C" fn bb_pending_new() -> *mut FfiPendingFiles {
    Box::into_raw(Box::new(FfiPendingFiles {
        inner: PendingFiles::new(),
    }))
}

/// Free a pending file list
///
/// # Safety
/// - `pending` must be a valid pointer returned by `bb_pending_new` or null
#[no_mangle]
pub unsafe extern "C" fn bb_pending_free(pending: *mut FfiPendingFiles) {
    if !pending.is_null() {
        drop(Box::from_raw(pending));
    }
}

/// Add a file, or every CSV file under a directory
///
/// # Safety
/// - `pending` must be a valid pointer returned by `bb_pending_new`
/// - `path` must be a valid C string
/// - Returns the number of files added, or -1 on error
#[no_mangle]
pub unsafe extern "C" fn bb_pending_add(pending: *mut FfiPendingFiles, path: *const c_char) -> i64 {
    if pending.is_null() {
        set_last_error("pending list is null");
        return -1;
    }
    let Some(path) = read_str(path, "path") else {
        return -1;
    };

    match (*pending).inner.add_path(path) {
        Ok(added) => {
            clear_last_error();
            added as i64
        }
        Err(e) => {
            set_last_error(e);
            -1
        }
    }
}

/// Remove the file at `index`
///
/// # Safety
/// - `pending` must be a valid pointer returned by `bb_pending_new`
/// - Returns 0 on success, -1 on error
#[no_mangle]
pub unsafe extern "C" fn bb_pending_remove(pending: *mut FfiPendingFiles, index: usize) -> i32 {
    if pending.is_null() {
        set_last_error("pending list is null");
        return -1;
    }

    match (*pending).inner.remove(index) {
        Ok(_) => {
            clear_last_error();
            0
        }
        Err(e) => {
            set_last_error(e);
            -1
        }
    }
}

/// Remove every pending file
///
/// # Safety
/// - `pending` must be a valid pointer returned by `bb_pending_new`
#[no_mangle]
pub unsafe extern "C" fn bb_pending_clear(pending: *mut FfiPendingFiles) {
    if pending.is_null() {
        return;
    }
    (*pending).inner.clear();
}

/// Get the number of pending files
///
/// # Safety
/// - `pending` must be a valid pointer returned by `bb_pending_new`
#[no_mangle]
pub unsafe extern "C" fn bb_pending_count(pending: *const FfiPendingFiles) -> usize {
    if pending.is_null() {
        return 0;
    }
    (*pending).inner.len()
}

/// Get a pending file path by index
///
/// # Safety
/// - `pending` must be a valid pointer returned by `bb_pending_new`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `bb_free_string`
#[no_mangle]
pub unsafe extern "C" fn bb_pending_path(pending: *const FfiPendingFiles, index: usize) -> *mut c_char {
    if pending.is_null() {
        return ptr::null_mut();
    }

    (*pending)
        .inner
        .files()
        .get(index)
        .and_then(|p| p.to_str())
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Merge the pending files and write the result to `output`
///
/// # Safety
/// - `pending` must be a valid pointer returned by `bb_pending_new`
/// - `output` must be a valid C string
/// - Returns the number of rows written, or -1 on error
#[no_mangle]
pub unsafe extern "C" fn bb_merge_export(
    pending: *const FfiPendingFiles,
    descending: bool,
    output: *const c_char,
) -> i64 {
    if pending.is_null() {
        set_last_error("pending list is null");
        return -1;
    }
    let Some(output) = read_str(output, "output path") else {
        return -1;
    };

    let result = (*pending)
        .inner
        .merge(sort_order(descending))
        .and_then(|table| boombox_core::export_to_path(&table, output));

    match result {
        Ok(rows) => {
            clear_last_error();
            rows as i64
        }
        Err(e) => {
            set_last_error(e);
            -1
        }
    }
}

/// Merge the pending files and open a preview session
///
/// # Safety
/// - `pending` must be a valid pointer returned by `bb_pending_new`
/// - Returns null on error
/// - Free the result with `bb_session_free`
#[no_mangle]
pub unsafe extern "C" fn bb_session_open(pending: *const FfiPendingFiles, descending: bool) -> *mut FfiSession {
    if pending.is_null() {
        set_last_error("pending list is null");
        return ptr::null_mut();
    }

    match (*pending).inner.merge(sort_order(descending)) {
        Ok(table) => {
            clear_last_error();
            Box::into_raw(Box::new(FfiSession {
                inner: PreviewSession::new(table),
            }))
        }
        Err(e) => {
            set_last_error(e);
            ptr::null_mut()
        }
    }
}

/// Free a preview session
///
/// # Safety
/// - `session` must be a valid pointer returned by `bb_session_open` or null
#[no_mangle]
pub unsafe extern "C" fn bb_session_free(session: *mut FfiSession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Set the filter text; an empty string shows every row
///
/// # Safety
/// - `session` must be a valid pointer returned by `bb_session_open`
/// - `text` must be a valid C string
/// - Returns 0 on success, -1 on error
#[no_mangle]
pub unsafe extern "C" fn bb_session_set_filter(session: *mut FfiSession, text: *const c_char) -> i32 {
    if session.is_null() {
        set_last_error("session is null");
        return -1;
    }
    let Some(text) = read_str(text, "filter text") else {
        return -1;
    };

    (*session).inner.set_filter(text);
    clear_last_error();
    0
}

/// Get the number of rows in the filtered view
///
/// # Safety
/// - `session` must be a valid pointer returned by `bb_session_open`
#[no_mangle]
pub unsafe extern "C" fn bb_session_visible_count(session: *const FfiSession) -> usize {
    if session.is_null() {
        return 0;
    }
    (*session).inner.visible_count()
}

/// Get the number of rows in the session's table
///
/// # Safety
/// - `session` must be a valid pointer returned by `bb_session_open`
#[no_mangle]
pub unsafe extern "C" fn bb_session_total_count(session: *const FfiSession) -> usize {
    if session.is_null() {
        return 0;
    }
    (*session).inner.total_count()
}

/// Get the column count
///
/// # Safety
/// - `session` must be a valid pointer returned by `bb_session_open`
#[no_mangle]
pub unsafe extern "C" fn bb_session_col_count(session: *const FfiSession) -> usize {
    if session.is_null() {
        return 0;
    }
    (*session).inner.filtered().column_count()
}

/// Get a column name by index
///
/// # Safety
/// - `session` must be a valid pointer returned by `bb_session_open`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `bb_free_string`
#[no_mangle]
pub unsafe extern "C" fn bb_session_col_name(session: *const FfiSession, index: usize) -> *mut c_char {
    if session.is_null() {
        return ptr::null_mut();
    }

    (*session)
        .inner
        .filtered()
        .columns
        .get(index)
        .map(|c| into_c_string(c))
        .unwrap_or(ptr::null_mut())
}

/// Get a displayed cell's text
///
/// # Safety
/// - `session` must be a valid pointer returned by `bb_session_open`
/// - `position` is the 1-based row number of the filtered view
/// - Returns null if row or col is out of bounds
/// - Caller must free the returned string with `bb_free_string`
#[no_mangle]
pub unsafe extern "C" fn bb_session_cell(session: *const FfiSession, position: usize, col: usize) -> *mut c_char {
    if session.is_null() {
        return ptr::null_mut();
    }

    let session = &(*session).inner;
    let Some(column) = session.filtered().columns.get(col) else {
        return ptr::null_mut();
    };

    session
        .cell_text(position, column)
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// True if the row at `position` shares its Time value with another visible row
///
/// # Safety
/// - `session` must be a valid pointer returned by `bb_session_open`
#[no_mangle]
pub unsafe extern "C" fn bb_session_is_duplicate(session: *const FfiSession, position: usize) -> bool {
    if session.is_null() {
        return false;
    }
    (*session).inner.is_duplicate(position)
}

/// Delete rows of the filtered view
///
/// # Safety
/// - `session` must be a valid pointer returned by `bb_session_open`
/// - `positions` must point to `count` 1-based row numbers, or be null when
///   `count` is 0
/// - Returns the number of rows removed
#[no_mangle]
pub unsafe extern "C" fn bb_session_delete_rows(
    session: *mut FfiSession,
    positions: *const usize,
    count: usize,
) -> usize {
    if session.is_null() || positions.is_null() || count == 0 {
        return 0;
    }

    let positions: BTreeSet<usize> = std::slice::from_raw_parts(positions, count)
        .iter()
        .copied()
        .collect();
    (*session).inner.delete_rows(&positions)
}

/// Write the filtered view to `output`
///
/// # Safety
/// - `session` must be a valid pointer returned by `bb_session_open`
/// - `output` must be a valid C string
/// - Returns the number of rows written, or -1 on error (including an empty view)
#[no_mangle]
pub unsafe extern "C" fn bb_session_export_filtered(session: *const FfiSession, output: *const c_char) -> i64 {
    if session.is_null() {
        set_last_error("session is null");
        return -1;
    }
    let Some(output) = read_str(output, "output path") else {
        return -1;
    };

    match (*session).inner.export_filtered(output) {
        Ok(rows) => {
            clear_last_error();
            rows as i64
        }
        Err(e) => {
            set_last_error(e);
            -1
        }
    }
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a bb_* function or null
#[no_mangle]
pub unsafe extern "C" fn bb_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
