//! SQLite connection implementation.
//!
//! This module provides safe wrappers around SQLite's C API and implements
//! the [`Connection`] trait from sqlbind-core.
//!
//! A [`SqliteConnection`] guards its handle with a reentrant lock. Every call
//! holds it for its whole duration, and [`Connection::exclusive`] holds it
//! across a caller's unit of work, so another thread's statements cannot
//! interleave with a transaction or an upsert on the same connection.

// Allow casts in FFI code where we need to match C types exactly
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::borrow_as_ptr)] // FFI requires raw pointers
#![allow(clippy::if_not_else)] // Clearer for error handling

use crate::ffi;
use crate::types;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use sqlbind_core::{
    Binder, Connection, Error, QueryFragment, Result, Row, Value,
    error::{ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind},
};
use std::cell::Cell;
use std::ffi::{CStr, CString, c_int};
use std::ptr;

/// How the database file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenFlags {
    /// Reads only; writes fail.
    ReadOnly,
    /// Reads and writes; the file must already exist.
    ReadWrite,
    /// Reads and writes, creating the file when missing.
    #[default]
    ReadWriteCreate,
}

impl OpenFlags {
    fn to_sqlite_flags(self) -> c_int {
        match self {
            OpenFlags::ReadOnly => ffi::SQLITE_OPEN_READONLY,
            OpenFlags::ReadWrite => ffi::SQLITE_OPEN_READWRITE,
            OpenFlags::ReadWriteCreate => ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE,
        }
    }
}

/// Where and how to open a database.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`.
    pub path: String,
    /// Access mode.
    pub flags: OpenFlags,
    /// How long a statement waits on a locked database, in milliseconds.
    /// Zero disables waiting.
    pub busy_timeout_ms: u32,
    /// DDL run once right after opening, typically `create table if not exists`.
    pub bootstrap: Option<String>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            flags: OpenFlags::default(),
            busy_timeout_ms: 5000,
            bootstrap: None,
        }
    }
}

impl SqliteConfig {
    /// A database stored at `path`.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// A private in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// Run `sql` once the handle is open. It may hold several statements.
    pub fn bootstrap(mut self, sql: impl Into<String>) -> Self {
        self.bootstrap = Some(sql.into());
        self
    }
}

/// The native handle; null once the connection has been closed.
struct SqliteInner {
    db: Cell<*mut ffi::sqlite3>,
}

// SAFETY: the handle is only touched while the owning lock is held, so it
// is never used from two threads at once.
unsafe impl Send for SqliteInner {}

impl SqliteInner {
    fn handle(&self) -> Result<*mut ffi::sqlite3> {
        let db = self.db.get();
        if db.is_null() {
            Err(Error::connection_closed())
        } else {
            Ok(db)
        }
    }
}

/// A connection to a SQLite database.
///
/// Owns exactly one native handle for its lifetime. After [`close`] every
/// operation fails with a closed-connection error; the handle is never
/// reopened.
///
/// [`close`]: SqliteConnection::close
pub struct SqliteConnection {
    inner: ReentrantMutex<SqliteInner>,
    path: String,
    binder: Binder,
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    ///
    /// When the config carries bootstrap SQL it is executed before this
    /// returns; a bootstrap failure closes the handle and is returned.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let c_path = CString::new(config.path.as_str()).map_err(|_| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Open,
                message: "Invalid path: contains null byte".to_string(),
            })
        })?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if !db.is_null() {
                // SAFETY: db is a valid (failed) handle that must still be closed
                unsafe {
                    let (msg, _) = ffi::last_error(db);
                    ffi::sqlite3_close_v2(db);
                    msg
                }
            } else {
                ffi::error_string(rc).to_string()
            };

            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Open,
                message: format!("Failed to open database: {}", msg),
            }));
        }

        if config.busy_timeout_ms > 0 {
            let ms = c_int::try_from(config.busy_timeout_ms).unwrap_or(c_int::MAX);
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, ms);
            }
        }

        tracing::debug!(path = %config.path, flags = ?config.flags, "opened sqlite database");

        let conn = Self {
            inner: ReentrantMutex::new(SqliteInner { db: Cell::new(db) }),
            path: config.path.clone(),
            binder: Binder::new(),
        };

        if let Some(sql) = &config.bootstrap {
            if let Err(e) = conn.execute_raw(sql) {
                conn.close();
                return Err(e);
            }
        }

        Ok(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database, creating it when missing.
    pub fn open_file(path: impl Into<String>) -> Result<Self> {
        Self::open(&SqliteConfig::file(path))
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the native handle is still open.
    pub fn is_open(&self) -> bool {
        !self.lock().db.get().is_null()
    }

    /// Close the native handle. Later calls fail with a closed-connection
    /// error. Closing twice is a no-op.
    ///
    /// Waits for any other thread's call or unit of work to finish first.
    pub fn close(&self) {
        let inner = self.lock();
        let db = inner.db.replace(ptr::null_mut());
        if !db.is_null() {
            // SAFETY: db is valid and no statement outlives a call
            let rc = unsafe { ffi::sqlite3_close_v2(db) };
            if rc != ffi::SQLITE_OK {
                tracing::warn!(code = rc, "sqlite3_close_v2 reported an error");
            }
            tracing::debug!(path = %self.path, "closed sqlite database");
        }
    }

    /// Execute SQL directly without preparing (for DDL, etc.)
    ///
    /// Unlike [`Connection::execute`] this accepts several `;`-separated
    /// statements, but takes no bindings and returns no rows.
    pub fn execute_raw(&self, sql: &str) -> Result<()> {
        let inner = self.lock();
        let db = inner.handle()?;
        let c_sql = CString::new(sql).map_err(|_| nul_in_sql(sql))?;

        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

        tracing::trace!(sql = %sql, "exec");

        // SAFETY: All pointers are valid
        let rc =
            unsafe { ffi::sqlite3_exec(db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg) };

        if rc != ffi::SQLITE_OK {
            let msg = if !errmsg.is_null() {
                // SAFETY: errmsg is a valid C string allocated by SQLite
                unsafe {
                    let msg = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
                    ffi::sqlite3_free(errmsg.cast());
                    msg
                }
            } else {
                ffi::error_string(rc).to_string()
            };

            return Err(Error::Query(QueryError {
                kind: QueryErrorKind::Step,
                sql: Some(sql.to_string()),
                placeholder: None,
                code: Some(rc),
                message: msg,
            }));
        }

        Ok(())
    }

    /// Get the last insert rowid.
    pub fn last_insert_rowid(&self) -> Result<i64> {
        let inner = self.lock();
        let db = inner.handle()?;
        // SAFETY: db is valid
        Ok(unsafe { ffi::sqlite3_last_insert_rowid(db) })
    }

    /// Get the number of rows changed by the last statement.
    pub fn changes(&self) -> Result<i64> {
        let inner = self.lock();
        let db = inner.handle()?;
        // SAFETY: db is valid
        Ok(i64::from(unsafe { ffi::sqlite3_changes(db) }))
    }

    fn lock(&self) -> ReentrantMutexGuard<'_, SqliteInner> {
        self.inner.lock()
    }

    /// Prepare, bind, step and collect.
    fn execute_fragment(&self, fragment: &QueryFragment) -> Result<Vec<Row>> {
        let inner = self.lock();
        let db = inner.handle()?;
        let sql = fragment.text();

        if let Some(placeholder) = fragment.conflicts().first() {
            return Err(Error::conflicting_binding(sql, placeholder));
        }

        tracing::trace!(sql = %sql, bindings = fragment.binding_count(), "execute");

        let Some(stmt) = Statement::prepare(db, sql)? else {
            // Whitespace or comments only: nothing to run.
            return Ok(Vec::new());
        };

        for (placeholder, value) in fragment.bindings() {
            stmt.bind(db, sql, placeholder, value)?;
        }

        let mut rows = Vec::new();
        loop {
            match stmt.step() {
                ffi::SQLITE_ROW => rows.push(stmt.read_row()),
                ffi::SQLITE_DONE => break,
                _ => return Err(query_error(db, QueryErrorKind::Step, sql, None)),
            }
        }

        Ok(rows)
    }
}

impl Connection for SqliteConnection {
    fn binder(&self) -> &Binder {
        &self.binder
    }

    fn execute(&self, fragment: &QueryFragment) -> Result<Vec<Row>> {
        self.execute_fragment(fragment)
    }

    fn exclusive<R, F>(&self, unit: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _held = self.lock();
        unit()
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

/// A prepared statement, cleared and finalized on drop.
struct Statement {
    raw: *mut ffi::sqlite3_stmt,
}

impl Statement {
    /// Compile the first statement in `sql`; `None` when there is nothing to
    /// compile.
    fn prepare(db: *mut ffi::sqlite3, sql: &str) -> Result<Option<Self>> {
        let c_sql = CString::new(sql).map_err(|_| nul_in_sql(sql))?;
        let len = c_int::try_from(c_sql.as_bytes().len()).map_err(|_| {
            Error::Query(QueryError {
                kind: QueryErrorKind::Prepare,
                sql: None,
                placeholder: None,
                code: Some(ffi::SQLITE_TOOBIG),
                message: "SQL text too long".to_string(),
            })
        })?;

        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(db, c_sql.as_ptr(), len, &mut stmt, ptr::null_mut())
        };

        if rc != ffi::SQLITE_OK {
            return Err(query_error(db, QueryErrorKind::Prepare, sql, None));
        }

        Ok((!stmt.is_null()).then_some(Self { raw: stmt }))
    }

    fn bind(
        &self,
        db: *mut ffi::sqlite3,
        sql: &str,
        placeholder: &str,
        value: &Value,
    ) -> Result<()> {
        let bind_failed = |message: String, code: Option<c_int>| {
            Error::Query(QueryError {
                kind: QueryErrorKind::Bind,
                sql: Some(sql.to_string()),
                placeholder: Some(placeholder.to_string()),
                code,
                message,
            })
        };

        let c_name = CString::new(placeholder)
            .map_err(|_| bind_failed("placeholder contains null byte".to_string(), None))?;

        // SAFETY: stmt is valid, c_name is a valid C string
        let index = unsafe { ffi::sqlite3_bind_parameter_index(self.raw, c_name.as_ptr()) };
        if index == 0 {
            return Err(bind_failed(
                "no such parameter in statement".to_string(),
                Some(ffi::SQLITE_RANGE),
            ));
        }

        // SAFETY: stmt is valid, index was resolved above
        let rc = unsafe { types::bind_value(self.raw, index, value) };
        if rc != ffi::SQLITE_OK {
            // SAFETY: db is valid
            let (msg, _) = unsafe { ffi::last_error(db) };
            return Err(bind_failed(msg, Some(rc)));
        }
        Ok(())
    }

    fn step(&self) -> c_int {
        // SAFETY: stmt is valid
        unsafe { ffi::sqlite3_step(self.raw) }
    }

    /// Collect the current row. NULL cells are left out.
    fn read_row(&self) -> Row {
        let mut row = Row::new();
        // SAFETY: stmt is valid and positioned on a row
        let col_count = unsafe { ffi::sqlite3_column_count(self.raw) };
        for i in 0..col_count {
            // SAFETY: i < column count
            let name =
                unsafe { types::column_name(self.raw, i) }.unwrap_or_else(|| format!("col{}", i));
            // SAFETY: stmt just returned SQLITE_ROW
            if let Some(bytes) = unsafe { types::read_cell(self.raw, i) } {
                row.insert(name, bytes);
            }
        }
        row
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        // SAFETY: raw is a valid statement that is not used after this
        unsafe {
            ffi::sqlite3_clear_bindings(self.raw);
            ffi::sqlite3_finalize(self.raw);
        }
    }
}

// Helper functions

fn nul_in_sql(sql: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Prepare,
        sql: Some(sql.to_string()),
        placeholder: None,
        code: None,
        message: "SQL contains null byte".to_string(),
    })
}

fn query_error(
    db: *mut ffi::sqlite3,
    kind: QueryErrorKind,
    sql: &str,
    placeholder: Option<&str>,
) -> Error {
    // SAFETY: db is valid
    let (message, code) = unsafe { ffi::last_error(db) };
    Error::Query(QueryError {
        kind,
        sql: Some(sql.to_string()),
        placeholder: placeholder.map(str::to_string),
        code: Some(code),
        message,
    })
}
