//! Parameterized clause builders for sqlbind.
//!
//! Builds `VALUES`, `SET` and `WHERE` clauses from column/value pairs, and
//! whole statements from those clauses. Every value goes through a named
//! placeholder; nothing a caller supplies as a value is ever interpolated
//! into SQL text.
//!
//! ```
//! use sqlbind_core::Binder;
//! use sqlbind_query::{set_clause, update_where, where_equal_clause};
//!
//! let binder = Binder::new();
//! let q = update_where(
//!     "student",
//!     set_clause(&binder, [("score", 90_i64)]),
//!     where_equal_clause(&binder, [("id", 4_i64)]),
//! );
//! assert_eq!(q.text(), "update student set score = :0_score where id = :1_id");
//! ```

pub mod clause;
pub mod statement;

pub use clause::{insert_clause, set_clause, where_equal_clause};
pub use statement::{delete_where, insert_into, select_first_where, select_where, update_where};
