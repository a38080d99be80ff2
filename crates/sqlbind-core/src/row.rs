//! Result rows.
//!
//! Cells are kept as the raw bytes SQLite hands back for each column (the
//! text rendering for numbers, the payload for blobs). NULL cells are not
//! stored, so a missing key means NULL or "not selected"; the two are
//! indistinguishable at this layer.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::{Value, ValueKind, parse_timestamp};
use chrono::{DateTime, Local};
use std::collections::HashMap;

/// A result row as column name -> raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: HashMap<String, Vec<u8>>,
}

/// A result row decoded to UTF-8 text.
pub type TextRow = HashMap<String, String>;

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cell. A later cell with the same name replaces the earlier one.
    pub fn insert(&mut self, column: impl Into<String>, bytes: Vec<u8>) {
        self.cells.insert(column.into(), bytes);
    }

    /// Number of non-NULL cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if this row has no non-NULL cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Check if a non-NULL cell exists for `column`.
    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// Raw bytes of a cell.
    pub fn bytes(&self, column: &str) -> Option<&[u8]> {
        self.cells.get(column).map(Vec::as_slice)
    }

    /// A cell as UTF-8 text, `None` if missing or not valid UTF-8.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.bytes(column)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// Iterate over (column, bytes) pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.cells
            .iter()
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }

    /// Get a typed value by column name.
    pub fn get<T: FromCell>(&self, column: &str) -> Result<T> {
        T::from_cell(self.bytes(column)).map_err(|e| match e {
            Error::Type(mut te) => {
                te.column = Some(column.to_string());
                Error::Type(te)
            }
            e => e,
        })
    }

    /// Decode a cell back into a [`Value`] of the given kind.
    ///
    /// A missing cell decodes to [`Value::Null`] whatever the kind.
    pub fn value_as(&self, column: &str, kind: ValueKind) -> Result<Value> {
        if !self.contains(column) {
            return Ok(Value::Null);
        }
        Ok(match kind {
            ValueKind::Null => Value::Null,
            ValueKind::Integer => Value::Integer(self.get(column)?),
            ValueKind::Real => Value::Real(self.get(column)?),
            ValueKind::Text => Value::Text(self.get(column)?),
            ValueKind::Blob => Value::Blob(self.get(column)?),
            ValueKind::Timestamp => Value::Timestamp(self.get(column)?),
        })
    }

    /// Decode every cell as UTF-8. Cells that are not valid UTF-8 are dropped.
    pub fn into_text(self) -> TextRow {
        self.cells
            .into_iter()
            .filter_map(|(name, bytes)| String::from_utf8(bytes).ok().map(|text| (name, text)))
            .collect()
    }

    /// Render the row as a JSON object of text cells, for diagnostics.
    pub fn to_json(&self) -> serde_json::Value {
        let object = self
            .cells
            .iter()
            .map(|(name, bytes)| {
                (
                    name.clone(),
                    serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
                )
            })
            .collect();
        serde_json::Value::Object(object)
    }
}

impl FromIterator<(String, Vec<u8>)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// Trait for decoding a raw cell into a typed value.
///
/// `cell` is `None` when the column was NULL or not selected.
pub trait FromCell: Sized {
    fn from_cell(cell: Option<&[u8]>) -> Result<Self>;
}

fn type_error(expected: &'static str, actual: impl Into<String>) -> Error {
    Error::Type(TypeError {
        expected,
        actual: actual.into(),
        column: None,
    })
}

fn require<'a>(cell: Option<&'a [u8]>, expected: &'static str) -> Result<&'a [u8]> {
    cell.ok_or_else(|| type_error(expected, "NULL"))
}

fn require_text<'a>(cell: Option<&'a [u8]>, expected: &'static str) -> Result<&'a str> {
    let bytes = require(cell, expected)?;
    std::str::from_utf8(bytes).map_err(|_| type_error(expected, "non-UTF-8 bytes"))
}

impl FromCell for Vec<u8> {
    fn from_cell(cell: Option<&[u8]>) -> Result<Self> {
        require(cell, "bytes").map(<[u8]>::to_vec)
    }
}

impl FromCell for String {
    fn from_cell(cell: Option<&[u8]>) -> Result<Self> {
        require_text(cell, "text").map(str::to_string)
    }
}

impl FromCell for i64 {
    fn from_cell(cell: Option<&[u8]>) -> Result<Self> {
        let text = require_text(cell, "i64")?;
        text.trim()
            .parse()
            .map_err(|_| type_error("i64", format!("'{}'", text)))
    }
}

impl FromCell for i32 {
    fn from_cell(cell: Option<&[u8]>) -> Result<Self> {
        let wide = i64::from_cell(cell).map_err(|e| match e {
            Error::Type(mut te) => {
                te.expected = "i32";
                Error::Type(te)
            }
            e => e,
        })?;
        i32::try_from(wide).map_err(|_| type_error("i32", format!("{} out of range", wide)))
    }
}

impl FromCell for f64 {
    fn from_cell(cell: Option<&[u8]>) -> Result<Self> {
        let text = require_text(cell, "f64")?;
        text.trim()
            .parse()
            .map_err(|_| type_error("f64", format!("'{}'", text)))
    }
}

impl FromCell for bool {
    fn from_cell(cell: Option<&[u8]>) -> Result<Self> {
        i64::from_cell(cell).map(|v| v != 0)
    }
}

impl FromCell for DateTime<Local> {
    fn from_cell(cell: Option<&[u8]>) -> Result<Self> {
        let text = require_text(cell, "timestamp")?;
        parse_timestamp(text).ok_or_else(|| type_error("timestamp", format!("'{}'", text)))
    }
}

impl<T: FromCell> FromCell for Option<T> {
    fn from_cell(cell: Option<&[u8]>) -> Result<Self> {
        match cell {
            None => Ok(None),
            Some(_) => T::from_cell(cell).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        let mut row = Row::new();
        row.insert("id", b"42".to_vec());
        row.insert("score", b"9.5".to_vec());
        row.insert("name", "Zhao".as_bytes().to_vec());
        row.insert("blob", vec![0xff, 0x00, 0x01]);
        row.insert("born", b"2001-01-20 06:30:00".to_vec());
        row
    }

    #[test]
    fn test_typed_access() {
        let row = sample();
        assert_eq!(row.get::<i64>("id").unwrap(), 42);
        assert_eq!(row.get::<i32>("id").unwrap(), 42);
        assert!((row.get::<f64>("score").unwrap() - 9.5).abs() < f64::EPSILON);
        assert_eq!(row.get::<String>("name").unwrap(), "Zhao");
        assert_eq!(row.get::<Vec<u8>>("blob").unwrap(), vec![0xff, 0x00, 0x01]);
        assert_eq!(
            row.get::<DateTime<Local>>("born").unwrap(),
            parse_timestamp("2001-01-20 06:30:00").unwrap()
        );
    }

    #[test]
    fn test_missing_cell_is_null() {
        let row = sample();
        assert_eq!(row.get::<Option<i64>>("missing").unwrap(), None);
        assert_eq!(row.value_as("missing", ValueKind::Text).unwrap(), Value::Null);
        match row.get::<i64>("missing") {
            Err(Error::Type(te)) => {
                assert_eq!(te.column.as_deref(), Some("missing"));
                assert_eq!(te.actual, "NULL");
            }
            other => panic!("expected type error, got {other:?}"),
        }
    }

    #[test]
    fn test_type_mismatch_names_column() {
        let row = sample();
        let err = row.get::<i64>("name").unwrap_err();
        assert_eq!(err.to_string(), "Type error: column 'name': expected i64, found 'Zhao'");
    }

    #[test]
    fn test_value_as() {
        let row = sample();
        assert_eq!(row.value_as("id", ValueKind::Integer).unwrap(), Value::Integer(42));
        assert_eq!(row.value_as("id", ValueKind::Text).unwrap(), Value::Text("42".into()));
        assert_eq!(
            row.value_as("blob", ValueKind::Blob).unwrap(),
            Value::Blob(vec![0xff, 0x00, 0x01])
        );
    }

    #[test]
    fn test_into_text_drops_invalid_utf8() {
        let text = sample().into_text();
        assert_eq!(text.get("name").map(String::as_str), Some("Zhao"));
        assert_eq!(text.get("id").map(String::as_str), Some("42"));
        assert!(!text.contains_key("blob"));
    }

    #[test]
    fn test_last_insert_wins() {
        let row: Row = vec![
            ("x".to_string(), b"1".to_vec()),
            ("x".to_string(), b"2".to_vec()),
        ]
        .into_iter()
        .collect();
        assert_eq!(row.len(), 1);
        assert_eq!(row.text("x"), Some("2"));
    }

    #[test]
    fn test_to_json() {
        let mut row = Row::new();
        row.insert("name", b"A".to_vec());
        assert_eq!(row.to_json(), serde_json::json!({ "name": "A" }));
    }
}
