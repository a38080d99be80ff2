//! Table introspection.
//!
//! Columns are read from SQLite's `pragma table_info('<table>')`, whose rows
//! carry `cid, name, type, notnull, dflt_value, pk`.

use serde::{Deserialize, Serialize};
use sqlbind_core::{Connection, Result, Row};

/// Information about a table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column name
    pub name: String,
    /// Declared type as reported by SQLite. The engine may normalize its
    /// case, so compare it case-insensitively. Empty when none was declared.
    pub declared_type: String,
    /// Whether the column rejects NULL.
    ///
    /// Always `false` for columns declared `INTEGER`: an `INTEGER PRIMARY KEY`
    /// is the rowid alias and SQLite fills it in when it is omitted.
    pub not_null: bool,
    /// Whether this is part of the primary key
    pub primary_key: bool,
    /// Default value expression
    pub default_value: Option<String>,
}

impl ColumnMetadata {
    /// Whether the column has a default value expression.
    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }

    fn from_pragma_row(row: &Row) -> Option<Self> {
        let name = row.get::<String>("name").ok()?;
        let declared_type = row.get::<String>("type").unwrap_or_default();
        let notnull = row.get::<i64>("notnull").unwrap_or(0);
        let pk = row.get::<i64>("pk").unwrap_or(0);
        let default_value = row.get::<Option<String>>("dflt_value").ok().flatten();

        Some(Self {
            not_null: notnull != 0 && !declared_type.eq_ignore_ascii_case("INTEGER"),
            name,
            declared_type,
            primary_key: pk > 0,
            default_value,
        })
    }
}

/// A table name together with its columns in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<ColumnMetadata>,
}

impl TableInfo {
    /// Introspect `table` on `conn`.
    pub fn introspect<C: Connection>(conn: &C, table: &str) -> Result<Self> {
        Ok(Self {
            name: table.to_string(),
            columns: table_info(conn, table)?,
        })
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the primary-key columns, in declaration order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Whether the table exists. `pragma table_info` returns nothing for
    /// unknown tables.
    pub fn exists(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Read the columns of `table` in declaration order.
///
/// An unknown table yields an empty vector.
pub fn table_info<C: Connection>(conn: &C, table: &str) -> Result<Vec<ColumnMetadata>> {
    let sql = format!("pragma table_info('{}')", table.replace('\'', "''"));
    tracing::trace!(table = %table, "introspecting table");

    let mut rows = conn.execute_sql(&sql)?;
    rows.sort_by_key(|row| row.get::<i64>("cid").unwrap_or(i64::MAX));

    Ok(rows.iter().filter_map(ColumnMetadata::from_pragma_row).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbind_sqlite::SqliteConnection;

    fn conn() -> SqliteConnection {
        let conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw(
            "create table student (
                id integer primary key autoincrement,
                name text not null default 'anon',
                score int,
                code INTEGER NOT NULL,
                level BIGINT NOT NULL,
                photo
            )",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_columns_in_declaration_order() {
        let columns = table_info(&conn(), "student").unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "score", "code", "level", "photo"]);
    }

    #[test]
    fn test_column_metadata() {
        let columns = table_info(&conn(), "student").unwrap();

        let id = &columns[0];
        assert!(id.declared_type.eq_ignore_ascii_case("integer"));
        assert!(id.primary_key);
        assert!(!id.not_null);

        let name = &columns[1];
        assert!(name.not_null);
        assert!(!name.primary_key);
        assert_eq!(name.default_value.as_deref(), Some("'anon'"));
        assert!(name.has_default());

        let score = &columns[2];
        assert!(score.declared_type.eq_ignore_ascii_case("int"));
        assert!(!score.not_null);
        assert!(!score.has_default());

        assert_eq!(columns[5].declared_type, "");
    }

    #[test]
    fn test_integer_not_null_is_relaxed() {
        let columns = table_info(&conn(), "student").unwrap();
        // Only the INTEGER spelling is relaxed.
        assert!(!columns[3].not_null);
        assert!(columns[4].not_null);
    }

    #[test]
    fn test_unknown_table() {
        let conn = conn();
        assert!(table_info(&conn, "nope").unwrap().is_empty());
        assert!(!TableInfo::introspect(&conn, "nope").unwrap().exists());
    }

    #[test]
    fn test_quote_in_table_name() {
        let conn = conn();
        assert!(table_info(&conn, "it's").unwrap().is_empty());
    }

    #[test]
    fn test_table_info_bundle() {
        let conn = conn();
        conn.execute_raw("create table pair (a text, b text, c int, primary key (a, b))")
            .unwrap();
        let info = TableInfo::introspect(&conn, "pair").unwrap();
        assert_eq!(info.name, "pair");
        assert_eq!(info.primary_key(), ["a", "b"]);
        assert!(
            info.column("c")
                .unwrap()
                .declared_type
                .eq_ignore_ascii_case("int")
        );
        assert!(info.column("d").is_none());
    }

    #[test]
    fn test_closed_connection() {
        let conn = conn();
        conn.close();
        assert!(table_info(&conn, "student").unwrap_err().is_connection_closed());
    }
}
