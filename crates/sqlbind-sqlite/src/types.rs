//! Value binding and cell reading between sqlbind and SQLite.
//!
//! SQLite has five storage classes (INTEGER, REAL, TEXT, BLOB, NULL). Values
//! map onto them directly, except timestamps, which are stored as
//! `YYYY-MM-DD HH:MM:SS` local-time text.
//!
//! Cells are read back as raw bytes: the payload for TEXT and BLOB, SQLite's
//! own text rendering for INTEGER, and the shortest decimal that parses back
//! to the same `f64` for REAL. NULL cells read as `None`.

use crate::ffi;
use sqlbind_core::{Value, format_timestamp};
use std::ffi::{CStr, c_int};

/// Bind a Value to a prepared statement parameter.
///
/// # Safety
/// - `stmt` must be a valid, non-null prepared statement handle
/// - `index` must be a 1-based parameter index
pub unsafe fn bind_value(stmt: *mut ffi::sqlite3_stmt, index: c_int, value: &Value) -> c_int {
    // SAFETY: caller guarantees stmt is valid; buffers are copied (TRANSIENT)
    unsafe {
        match value {
            Value::Null => ffi::sqlite3_bind_null(stmt, index),

            Value::Integer(v) => ffi::sqlite3_bind_int64(stmt, index, *v),

            Value::Real(v) => ffi::sqlite3_bind_double(stmt, index, *v),

            Value::Text(s) => bind_text(stmt, index, s),

            Value::Timestamp(ts) => bind_text(stmt, index, &format_timestamp(ts)),

            Value::Blob(b) => {
                let Ok(len) = c_int::try_from(b.len()) else {
                    return ffi::SQLITE_TOOBIG;
                };
                ffi::sqlite3_bind_blob(stmt, index, b.as_ptr().cast(), len, ffi::transient())
            }
        }
    }
}

unsafe fn bind_text(stmt: *mut ffi::sqlite3_stmt, index: c_int, text: &str) -> c_int {
    let Ok(len) = c_int::try_from(text.len()) else {
        return ffi::SQLITE_TOOBIG;
    };
    // SAFETY: caller guarantees stmt is valid; SQLite copies the buffer
    unsafe { ffi::sqlite3_bind_text(stmt, index, text.as_ptr().cast(), len, ffi::transient()) }
}

/// Read a cell from the current result row.
///
/// # Safety
/// - `stmt` must be a valid prepared statement that has just returned SQLITE_ROW
/// - `index` must be a valid 0-based column index
pub unsafe fn read_cell(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Option<Vec<u8>> {
    // SAFETY: caller guarantees stmt is positioned on a row
    unsafe {
        match ffi::sqlite3_column_type(stmt, index) {
            ffi::SQLITE_NULL => return None,
            // SQLite's own rendering keeps only 15 significant digits.
            ffi::SQLITE_FLOAT => {
                let v = ffi::sqlite3_column_double(stmt, index);
                return Some(v.to_string().into_bytes());
            }
            _ => {}
        }
        // column_blob must be called before column_bytes so the byte count
        // refers to the converted representation.
        let ptr = ffi::sqlite3_column_blob(stmt, index);
        let len = usize::try_from(ffi::sqlite3_column_bytes(stmt, index)).unwrap_or(0);
        if ptr.is_null() || len == 0 {
            Some(Vec::new())
        } else {
            Some(std::slice::from_raw_parts(ptr.cast::<u8>(), len).to_vec())
        }
    }
}

/// Get the column name from a result.
///
/// # Safety
/// - `stmt` must be a valid prepared statement
/// - `index` must be a valid 0-based column index
pub unsafe fn column_name(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Option<String> {
    // SAFETY: caller guarantees stmt and index are valid
    unsafe {
        let ptr = ffi::sqlite3_column_name(stmt, index);
        if ptr.is_null() {
            None
        } else {
            Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
        }
    }
}
