//! Schema introspection and schema-driven upserts for sqlbind.
//!
//! [`table_info`] reads a table's columns from the engine at runtime.
//! [`upsert`] uses that metadata to decide between `update` and `insert`
//! for a row keyed by its primary-key columns.

pub mod introspect;
pub mod upsert;

pub use introspect::{ColumnMetadata, TableInfo, table_info};
pub use upsert::{UpsertAction, UpsertError, upsert, upsert_all, validate};
