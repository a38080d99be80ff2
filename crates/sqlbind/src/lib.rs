//! sqlbind - parameterized SQL over SQLite's C API.
//!
//! sqlbind provides:
//!
//! - Composable SQL fragments whose values always travel as named bindings
//! - Raw-bytes and text result rows
//! - Runtime schema introspection through `pragma table_info`
//! - Primary-key driven upserts
//! - A commit/rollback transaction wrapper
//!
//! # Quick Start
//!
//! ```
//! use sqlbind::prelude::*;
//! use std::collections::BTreeMap;
//!
//! let config = SqliteConfig::memory().bootstrap(
//!     "create table if not exists student \
//!      (id integer primary key autoincrement, name text, score int)",
//! );
//! let conn = SqliteConnection::open(&config).unwrap();
//!
//! let columns = table_info(&conn, "student").unwrap();
//! let mut row = BTreeMap::new();
//! row.insert("name".to_string(), Value::from("A"));
//! row.insert("score".to_string(), Value::from(10));
//! upsert(&conn, "student", &columns, &row).unwrap();
//!
//! let query = "select * from student where name = " + conn.bind("name", "A");
//! let rows = conn.execute(&query).unwrap();
//! assert_eq!(rows[0].get::<i64>("score").unwrap(), 10);
//! ```

pub use sqlbind_core::{
    Binder, Connection, Error, FromCell, QueryFragment, Result, Row, TIMESTAMP_FORMAT, TextRow,
    Value, ValueKind, error, format_timestamp, parse_timestamp,
};
pub use sqlbind_query::{
    delete_where, insert_clause, insert_into, select_first_where, select_where, set_clause,
    update_where, where_equal_clause,
};
pub use sqlbind_schema::{
    ColumnMetadata, TableInfo, UpsertAction, UpsertError, table_info, upsert, upsert_all,
    validate,
};
pub use sqlbind_sqlite::{OpenFlags, SqliteConfig, SqliteConnection, sqlite_version};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sqlbind::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Connection, Error, QueryFragment, Result, Row, SqliteConfig, SqliteConnection, Value,
        insert_clause, insert_into, select_where, set_clause, table_info, update_where, upsert,
        upsert_all, where_equal_clause,
    };
}
