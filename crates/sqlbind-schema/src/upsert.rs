//! Schema-driven upserts.
//!
//! An upsert looks up the row by its primary-key columns and then issues
//! either an `update` or an `insert`. Only input columns that exist in the
//! table are written; unknown keys are ignored.
//!
//! The existence check and the write run under [`Connection::exclusive`], so
//! no other thread's statements on the same connection land between them.
//! Other connections and processes can still interleave; wrap calls in a
//! transaction when that matters.

use crate::introspect::{ColumnMetadata, table_info};
use sqlbind_core::{Connection, Error, Value};
use sqlbind_query::{
    insert_clause, insert_into, select_first_where, set_clause, update_where, where_equal_clause,
};
use std::collections::BTreeMap;
use std::fmt;

/// Which statement an upsert ended up running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    /// No row matched the primary key; a new row was inserted.
    Inserted,
    /// A row matched the primary key and was updated in place.
    Updated,
}

/// Error returned by [`upsert`] and [`upsert_all`].
#[derive(Debug)]
pub enum UpsertError {
    /// A statement failed to execute.
    ExecutionFailed {
        /// Target table
        table: String,
        /// Underlying engine error
        source: Error,
    },
    /// None of the input columns exist in the table.
    EmptyRow {
        /// Target table
        table: String,
    },
}

impl UpsertError {
    fn execution(table: &str, source: Error) -> Self {
        Self::ExecutionFailed {
            table: table.to_string(),
            source,
        }
    }

    /// The table the failed upsert targeted.
    pub fn table(&self) -> &str {
        match self {
            Self::ExecutionFailed { table, .. } | Self::EmptyRow { table } => table,
        }
    }
}

impl fmt::Display for UpsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { table, source } => {
                write!(f, "Upsert into '{}' failed: {}", table, source)
            }
            Self::EmptyRow { table } => {
                write!(f, "Upsert into '{}': no input column matches the table", table)
            }
        }
    }
}

impl std::error::Error for UpsertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ExecutionFailed { source, .. } => Some(source),
            Self::EmptyRow { .. } => None,
        }
    }
}

/// Insert `row` into `table`, or update the existing row with the same
/// primary key.
///
/// `columns` is the table's metadata as returned by
/// [`table_info`](crate::table_info). Entries are written in column
/// declaration order. A row whose primary-key values are absent (or `Null`)
/// never matches an existing row and is inserted.
#[tracing::instrument(level = "debug", skip(conn, columns, row), fields(columns = row.len()))]
pub fn upsert<C: Connection>(
    conn: &C,
    table: &str,
    columns: &[ColumnMetadata],
    row: &BTreeMap<String, Value>,
) -> Result<UpsertAction, UpsertError> {
    conn.exclusive(|| write_row(conn, table, columns, row))
}

fn write_row<C: Connection>(
    conn: &C,
    table: &str,
    columns: &[ColumnMetadata],
    row: &BTreeMap<String, Value>,
) -> Result<UpsertAction, UpsertError> {
    let mut all_columns = Vec::new();
    let mut key_columns = Vec::new();
    for column in columns {
        if let Some(value) = row.get(&column.name) {
            all_columns.push((column.name.as_str(), value.clone()));
            if column.primary_key {
                key_columns.push((column.name.as_str(), value.clone()));
            }
        }
    }

    if all_columns.is_empty() {
        return Err(UpsertError::EmptyRow {
            table: table.to_string(),
        });
    }

    let binder = conn.binder();
    let filter = where_equal_clause(binder, key_columns);

    let exists = if filter.binding_count() == 0 {
        false
    } else {
        let query = select_first_where(table, filter.clone());
        !conn
            .execute(&query)
            .map_err(|e| UpsertError::execution(table, e))?
            .is_empty()
    };

    let (statement, action) = if exists {
        (
            update_where(table, set_clause(binder, all_columns), filter),
            UpsertAction::Updated,
        )
    } else {
        (
            insert_into(table, insert_clause(binder, all_columns)),
            UpsertAction::Inserted,
        )
    };

    conn.execute(&statement)
        .map_err(|e| UpsertError::execution(table, e))?;

    tracing::debug!(table = %table, action = ?action, "upserted row");
    Ok(action)
}

/// Introspect `table` once, then [`upsert`] each row in order, all under one
/// [`Connection::exclusive`] hold.
///
/// Stops at the first failing row. Rows before it stay written; run this
/// inside a transaction to make the batch all-or-nothing.
#[tracing::instrument(level = "debug", skip(conn, rows))]
pub fn upsert_all<'a, C, I>(conn: &C, table: &str, rows: I) -> Result<usize, UpsertError>
where
    C: Connection,
    I: IntoIterator<Item = &'a BTreeMap<String, Value>>,
{
    conn.exclusive(|| -> Result<usize, UpsertError> {
        let columns = table_info(conn, table).map_err(|e| UpsertError::execution(table, e))?;

        let mut written = 0;
        for row in rows {
            write_row(conn, table, &columns, row)?;
            written += 1;
        }
        Ok(written)
    })
}

/// Check `row` against the not-null constraints in `columns`.
///
/// Returns `false` when a not-null column without a default is missing from
/// `row` or mapped to [`Value::Null`].
pub fn validate(columns: &[ColumnMetadata], row: &BTreeMap<String, Value>) -> bool {
    columns.iter().all(|column| {
        let is_null = row.get(&column.name).is_none_or(Value::is_null);
        !(is_null && column.not_null && !column.has_default())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbind_sqlite::SqliteConnection;

    const STUDENT: &str =
        "create table student (id integer primary key autoincrement, name text, score int)";

    fn conn() -> SqliteConnection {
        let conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw(STUDENT).unwrap();
        conn
    }

    fn record<const N: usize>(entries: [(&str, Value); N]) -> BTreeMap<String, Value> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn count(conn: &SqliteConnection) -> usize {
        conn.execute_sql("select * from student").unwrap().len()
    }

    #[test]
    fn test_insert_then_update() {
        let conn = conn();
        let columns = table_info(&conn, "student").unwrap();

        let row = record([
            ("id", Value::Null),
            ("name", Value::from("A")),
            ("score", Value::from(10)),
        ]);
        assert_eq!(
            upsert(&conn, "student", &columns, &row).unwrap(),
            UpsertAction::Inserted
        );
        let id = conn.last_insert_rowid().unwrap();
        assert_eq!(count(&conn), 1);

        let row = record([("id", Value::from(id)), ("score", Value::from(20))]);
        assert_eq!(
            upsert(&conn, "student", &columns, &row).unwrap(),
            UpsertAction::Updated
        );
        assert_eq!(count(&conn), 1);

        let rows = conn.execute_sql("select * from student").unwrap();
        assert_eq!(rows[0].get::<i64>("score").unwrap(), 20);
        assert_eq!(rows[0].text("name"), Some("A"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let conn = conn();
        let columns = table_info(&conn, "student").unwrap();
        let row = record([
            ("id", Value::from(7)),
            ("name", Value::from("B")),
            ("score", Value::from(3)),
        ]);
        upsert(&conn, "student", &columns, &row).unwrap();
        upsert(&conn, "student", &columns, &row).unwrap();
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn test_no_key_always_inserts() {
        let conn = conn();
        let columns = table_info(&conn, "student").unwrap();
        let row = record([("name", Value::from("C"))]);
        upsert(&conn, "student", &columns, &row).unwrap();
        upsert(&conn, "student", &columns, &row).unwrap();
        assert_eq!(count(&conn), 2);
    }

    #[test]
    fn test_unknown_columns_are_ignored() {
        let conn = conn();
        let columns = table_info(&conn, "student").unwrap();
        let row = record([("name", Value::from("D")), ("nickname", Value::from("dd"))]);
        upsert(&conn, "student", &columns, &row).unwrap();
        assert_eq!(count(&conn), 1);

        let row = record([("nickname", Value::from("dd"))]);
        let err = upsert(&conn, "student", &columns, &row).unwrap_err();
        assert!(matches!(err, UpsertError::EmptyRow { .. }));
        assert_eq!(err.table(), "student");
    }

    #[test]
    fn test_execution_failure() {
        let conn = conn();
        conn.execute_raw("create table strict_t (id integer primary key, label text not null)")
            .unwrap();
        let columns = table_info(&conn, "strict_t").unwrap();
        let row = record([("id", Value::from(1)), ("label", Value::Null)]);
        let err = upsert(&conn, "strict_t", &columns, &row).unwrap_err();
        match &err {
            UpsertError::ExecutionFailed { source, .. } => match source {
                Error::Query(q) => assert!(q.is_constraint_violation()),
                other => panic!("unexpected source: {other:?}"),
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("Upsert into 'strict_t' failed"));
    }

    #[test]
    fn test_upsert_all_stops_at_first_failure() {
        let conn = conn();
        conn.execute_raw("create table strict_t (id integer primary key, label text not null)")
            .unwrap();
        let rows = [
            record([("id", Value::from(1)), ("label", Value::from("a"))]),
            record([("id", Value::from(2)), ("label", Value::Null)]),
            record([("id", Value::from(3)), ("label", Value::from("c"))]),
        ];
        assert!(upsert_all(&conn, "strict_t", &rows).is_err());

        let ids: Vec<i64> = conn
            .execute_sql("select id from strict_t order by id")
            .unwrap()
            .iter()
            .map(|r| r.get("id").unwrap())
            .collect();
        assert_eq!(ids, [1]);
    }

    #[test]
    fn test_upsert_all_counts_rows() {
        let conn = conn();
        let rows = [
            record([("id", Value::from(1)), ("name", Value::from("a"))]),
            record([("id", Value::from(1)), ("name", Value::from("b"))]),
            record([("id", Value::from(2)), ("name", Value::from("c"))]),
        ];
        assert_eq!(upsert_all(&conn, "student", &rows).unwrap(), 3);
        assert_eq!(count(&conn), 2);
    }

    #[test]
    fn test_validate() {
        let conn = conn();
        conn.execute_raw(
            "create table v (id integer not null primary key, label text not null, \
             tag text not null default 'x', note text)",
        )
        .unwrap();
        let columns = table_info(&conn, "v").unwrap();

        assert!(validate(&columns, &record([("label", Value::from("ok"))])));
        assert!(!validate(&columns, &record([("label", Value::Null)])));
        assert!(!validate(&columns, &record([("note", Value::from("n"))])));
        // Text "null" is an ordinary string.
        assert!(validate(&columns, &record([("label", Value::from("null"))])));
    }

    #[test]
    fn test_same_key_from_many_threads() {
        use std::sync::Arc;

        let conn = Arc::new(conn());
        let columns = Arc::new(table_info(&*conn, "student").unwrap());

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let conn = Arc::clone(&conn);
                let columns = Arc::clone(&columns);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| {
                            let row = record([("id", Value::from(1)), ("score", Value::from(n))]);
                            upsert(&*conn, "student", &columns, &row).unwrap()
                        })
                        .filter(|action| *action == UpsertAction::Inserted)
                        .count()
                })
            })
            .collect();

        let inserts: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(inserts, 1);
        assert_eq!(count(&conn), 1);
    }
}
