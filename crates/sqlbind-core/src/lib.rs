//! Core types and traits for sqlbind.
//!
//! This crate provides the engine-independent half of the binding layer:
//!
//! - [`Value`] - the closed set of bindable scalars
//! - [`QueryFragment`] and [`Binder`] - composable parameterized SQL
//! - [`Row`] - result rows as column name -> raw bytes
//! - [`Connection`] - the execution seam, with the transaction wrapper

pub mod connection;
pub mod error;
pub mod fragment;
pub mod row;
pub mod value;

pub use connection::Connection;
pub use error::{Error, Result};
pub use fragment::{Binder, QueryFragment};
pub use row::{FromCell, Row, TextRow};
pub use value::{TIMESTAMP_FORMAT, Value, ValueKind, format_timestamp, parse_timestamp};
