//! Database connection trait.
//!
//! [`Connection`] is the seam between the fragment/schema layers and a
//! concrete engine. A driver supplies [`Connection::execute`],
//! [`Connection::exclusive`] and a [`Binder`]; statement helpers and the
//! transaction wrapper are provided on top of those.

use crate::error::{Error, Result, TransactionError, TransactionErrorKind};
use crate::fragment::{Binder, QueryFragment};
use crate::row::{Row, TextRow};
use crate::value::Value;

/// A synchronous connection to a database.
///
/// Each call is atomic with respect to other threads: a call on a shared
/// connection blocks until any other thread's call has finished. Several
/// calls made inside [`Connection::exclusive`] form one unit that no other
/// thread's calls interleave with; [`Connection::transaction`],
/// [`Connection::try_transaction`] and the schema-driven upserts run that way.
pub trait Connection {
    /// Placeholder generator for fragments executed on this connection.
    fn binder(&self) -> &Binder;

    /// Prepare, bind and run `fragment`, collecting every result row.
    ///
    /// Statements that produce no result set return an empty vector.
    fn execute(&self, fragment: &QueryFragment) -> Result<Vec<Row>>;

    /// Run `unit` while holding the connection against other threads.
    ///
    /// The hold is reentrant: `unit` may call any method on this connection,
    /// including `exclusive` itself.
    fn exclusive<R, F>(&self, unit: F) -> R
    where
        Self: Sized,
        F: FnOnce() -> R;

    /// Bind one value under a fresh placeholder from [`Connection::binder`].
    fn bind(&self, key: &str, value: impl Into<Value>) -> QueryFragment
    where
        Self: Sized,
    {
        self.binder().bind(key, value)
    }

    /// Execute literal SQL with no bindings.
    fn execute_sql(&self, sql: &str) -> Result<Vec<Row>> {
        self.execute(&QueryFragment::literal(sql))
    }

    /// Execute literal SQL and decode every cell as UTF-8 text.
    fn execute_text(&self, sql: &str) -> Result<Vec<TextRow>> {
        self.execute_sql(sql)
            .map(|rows| rows.into_iter().map(Row::into_text).collect())
    }

    /// Run `unit` inside `begin;` ... `commit;`/`rollback;`.
    ///
    /// The transaction commits when `unit` returns `true` and rolls back when
    /// it returns `false` or panics. Returns the value `unit` returned.
    fn transaction<F>(&self, unit: F) -> Result<bool>
    where
        Self: Sized,
        F: FnOnce() -> bool,
    {
        self.exclusive(|| -> Result<bool> {
            let guard = TransactionGuard::begin(self)?;
            if unit() {
                guard.commit()?;
                Ok(true)
            } else {
                guard.rollback()?;
                Ok(false)
            }
        })
    }

    /// Like [`Connection::transaction`], committing on `Ok` and rolling back
    /// on `Err`.
    fn try_transaction<T, E, F>(&self, unit: F) -> std::result::Result<T, E>
    where
        Self: Sized,
        E: From<Error>,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        self.exclusive(|| -> std::result::Result<T, E> {
            let guard = TransactionGuard::begin(self)?;
            match unit() {
                Ok(value) => {
                    guard.commit()?;
                    Ok(value)
                }
                Err(e) => {
                    guard.rollback()?;
                    Err(e)
                }
            }
        })
    }
}

/// An open transaction that rolls back on drop unless finished.
struct TransactionGuard<'conn, C: Connection> {
    conn: &'conn C,
    finished: bool,
}

impl<'conn, C: Connection> TransactionGuard<'conn, C> {
    fn begin(conn: &'conn C) -> Result<Self> {
        conn.execute_sql("begin;").map_err(|e| {
            Error::Transaction(TransactionError {
                kind: TransactionErrorKind::Begin,
                message: e.to_string(),
            })
        })?;
        tracing::debug!("transaction started");
        Ok(Self {
            conn,
            finished: false,
        })
    }

    fn commit(mut self) -> Result<()> {
        self.finished = true;
        if let Err(e) = self.conn.execute_sql("commit;") {
            // Leave the connection usable; a failed COMMIT keeps the transaction open.
            if let Err(rollback) = self.conn.execute_sql("rollback;") {
                tracing::warn!(error = %rollback, "rollback after failed commit also failed");
            }
            return Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::Commit,
                message: e.to_string(),
            }));
        }
        tracing::debug!("transaction committed");
        Ok(())
    }

    fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.execute_sql("rollback;").map_err(|e| {
            Error::Transaction(TransactionError {
                kind: TransactionErrorKind::Rollback,
                message: e.to_string(),
            })
        })?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }
}

impl<C: Connection> Drop for TransactionGuard<'_, C> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("unit of work did not finish; rolling back");
            if let Err(e) = self.conn.execute_sql("rollback;") {
                tracing::warn!(error = %e, "rollback on unwind failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Records executed SQL; fails any statement listed in `fail`.
    #[derive(Default)]
    struct Recorder {
        binder: Binder,
        log: RefCell<Vec<String>>,
        fail: Vec<&'static str>,
        held: Cell<u32>,
    }

    impl Connection for Recorder {
        fn binder(&self) -> &Binder {
            &self.binder
        }

        fn exclusive<R, F>(&self, unit: F) -> R
        where
            F: FnOnce() -> R,
        {
            self.held.set(self.held.get() + 1);
            let out = unit();
            self.held.set(self.held.get() - 1);
            out
        }

        fn execute(&self, fragment: &QueryFragment) -> Result<Vec<Row>> {
            self.log.borrow_mut().push(fragment.text().to_string());
            if self.fail.iter().any(|sql| *sql == fragment.text()) {
                return Err(Error::connection_closed());
            }
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_transaction_commits_on_true() {
        let conn = Recorder::default();
        let committed = conn
            .transaction(|| conn.execute_sql("insert").is_ok())
            .unwrap();
        assert!(committed);
        assert_eq!(*conn.log.borrow(), vec!["begin;", "insert", "commit;"]);
    }

    #[test]
    fn test_transaction_rolls_back_on_false() {
        let conn = Recorder::default();
        assert!(!conn.transaction(|| false).unwrap());
        assert_eq!(*conn.log.borrow(), vec!["begin;", "rollback;"]);
    }

    #[test]
    fn test_transaction_rolls_back_on_panic() {
        let conn = Recorder::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            conn.transaction(|| panic!("unit of work blew up"))
        }));
        assert!(result.is_err());
        assert_eq!(*conn.log.borrow(), vec!["begin;", "rollback;"]);
    }

    #[test]
    fn test_begin_failure_skips_unit() {
        let conn = Recorder {
            fail: vec!["begin;"],
            ..Recorder::default()
        };
        let mut ran = false;
        let err = conn
            .transaction(|| {
                ran = true;
                true
            })
            .unwrap_err();
        assert!(!ran);
        assert!(matches!(
            err,
            Error::Transaction(TransactionError {
                kind: TransactionErrorKind::Begin,
                ..
            })
        ));
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        let conn = Recorder {
            fail: vec!["commit;"],
            ..Recorder::default()
        };
        let err = conn.transaction(|| true).unwrap_err();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError {
                kind: TransactionErrorKind::Commit,
                ..
            })
        ));
        assert_eq!(*conn.log.borrow(), vec!["begin;", "commit;", "rollback;"]);
    }

    #[test]
    fn test_try_transaction() {
        let conn = Recorder::default();
        let ok: Result<i32> = conn.try_transaction(|| Ok(5));
        assert_eq!(ok.unwrap(), 5);
        let err: Result<i32> = conn.try_transaction(|| Err(Error::connection_closed()));
        assert!(err.unwrap_err().is_connection_closed());
        assert_eq!(
            *conn.log.borrow(),
            vec!["begin;", "commit;", "begin;", "rollback;"]
        );
    }

    #[test]
    fn test_transactions_run_exclusively() {
        let conn = Recorder::default();
        conn.transaction(|| {
            assert_eq!(conn.held.get(), 1);
            true
        })
        .unwrap();
        let _: Result<()> = conn.try_transaction(|| {
            assert_eq!(conn.held.get(), 1);
            Ok(())
        });
        assert_eq!(conn.held.get(), 0);
    }
}
