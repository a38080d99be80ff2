//! SQLite engine for sqlbind.
//!
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! This crate drives libsqlite3 directly and implements the `Connection`
//! trait from sqlbind-core: prepare, bind named placeholders, step, collect
//! raw cell bytes, finalize.
//!
//! # Example
//!
//! ```
//! use sqlbind_core::Connection;
//! use sqlbind_sqlite::SqliteConnection;
//!
//! let conn = SqliteConnection::open_memory().unwrap();
//! conn.execute_raw("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)").unwrap();
//!
//! let insert = "INSERT INTO users (name) VALUES (" + conn.bind("name", "Alice") + ")";
//! conn.execute(&insert).unwrap();
//!
//! let rows = conn.execute_sql("SELECT * FROM users").unwrap();
//! assert_eq!(rows[0].text("name"), Some("Alice"));
//! ```
//!
//! # Type Mapping
//!
//! | Value | SQLite storage |
//! |-------|----------------|
//! | `Null` | NULL |
//! | `Integer` | INTEGER |
//! | `Real` | REAL |
//! | `Text` | TEXT |
//! | `Blob` | BLOB |
//! | `Timestamp` | TEXT (`YYYY-MM-DD HH:MM:SS`, local time) |
//!
//! # Thread Safety
//!
//! `SqliteConnection` is both `Send` and `Sync`. An internal reentrant lock
//! keeps calls on one handle from overlapping, and
//! [`Connection::exclusive`](sqlbind_core::Connection::exclusive) holds it
//! across a transaction or upsert.

pub mod connection;
pub mod ffi;
pub mod types;

pub use connection::{OpenFlags, SqliteConfig, SqliteConnection};

/// Re-export the SQLite library version.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// Re-export the SQLite library version number.
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}
