//! Column/value clauses (VALUES, SET, WHERE equality).
//!
//! Each builder takes column/value pairs and binds every value under a fresh
//! placeholder from the given [`Binder`]. Column names are written into the
//! SQL as given. Empty input yields an empty fragment; callers must not
//! build an INSERT or UPDATE from it.

use sqlbind_core::{Binder, QueryFragment, Value};

/// `(c1, c2) values (:0_c1, :1_c2)`.
pub fn insert_clause<I, K, V>(binder: &Binder, columns: I) -> QueryFragment
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let mut names = Vec::new();
    let mut placeholders = Vec::new();
    let mut bindings = Vec::new();

    for (column, value) in columns {
        let column = column.as_ref();
        let (placeholder, mut bound) = binder.bind(column, value).into_parts();
        names.push(column.to_string());
        placeholders.push(placeholder);
        bindings.append(&mut bound);
    }

    if names.is_empty() {
        return QueryFragment::default();
    }

    let text = format!(
        "({}) values ({})",
        names.join(", "),
        placeholders.join(", ")
    );
    QueryFragment::from_parts(text, bindings)
}

/// `c1 = :0_c1, c2 = :1_c2`.
pub fn set_clause<I, K, V>(binder: &Binder, columns: I) -> QueryFragment
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    assignments(binder, columns, ", ")
}

/// `c1 = :0_c1 and c2 = :1_c2`.
pub fn where_equal_clause<I, K, V>(binder: &Binder, columns: I) -> QueryFragment
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    assignments(binder, columns, " and ")
}

fn assignments<I, K, V>(binder: &Binder, columns: I, separator: &str) -> QueryFragment
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let mut fragment = QueryFragment::default();
    for (i, (column, value)) in columns.into_iter().enumerate() {
        let column = column.as_ref();
        if i > 0 {
            fragment = fragment + separator;
        }
        fragment = fragment + format!("{} = ", column) + binder.bind(column, value);
    }
    fragment
}
