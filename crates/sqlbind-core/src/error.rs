//! Error types for sqlbind operations.

use std::fmt;

/// The primary error type for all sqlbind operations.
#[derive(Debug)]
pub enum Error {
    /// Connection-related errors (open, use after close)
    Connection(ConnectionError),
    /// Statement preparation, binding and execution errors
    Query(QueryError),
    /// Cell decoding errors
    Type(TypeError),
    /// Misuse of the transaction wrapper
    Transaction(TransactionError),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// The database could not be opened
    Open,
    /// The native handle has already been closed
    Closed,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    /// SQL text of the failing statement
    pub sql: Option<String>,
    /// Placeholder that failed to bind, for [`QueryErrorKind::Bind`]
    pub placeholder: Option<String>,
    /// Primary SQLite result code, when the engine reported one
    pub code: Option<i32>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The engine rejected the SQL text (syntax, unknown table or column)
    Prepare,
    /// A placeholder could not be resolved or its value was rejected
    Bind,
    /// Execution failed while stepping (constraint violation, busy, ...)
    Step,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    /// BEGIN was rejected (typically a transaction is already open)
    Begin,
    /// COMMIT failed; the transaction has been rolled back
    Commit,
    /// ROLLBACK failed
    Rollback,
}

impl Error {
    /// Error returned by every operation on a closed connection.
    pub fn connection_closed() -> Self {
        Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Closed,
            message: "connection is closed".to_string(),
        })
    }

    /// Is this the use-after-close error?
    pub fn is_connection_closed(&self) -> bool {
        matches!(
            self,
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Closed,
                ..
            })
        )
    }

    /// Bind error for a placeholder that was given two different values when
    /// fragments were composed. `sql` is empty when the statement is not
    /// known yet.
    pub fn conflicting_binding(sql: &str, placeholder: &str) -> Self {
        Error::Query(QueryError {
            kind: QueryErrorKind::Bind,
            sql: (!sql.is_empty()).then(|| sql.to_string()),
            placeholder: Some(placeholder.to_string()),
            code: None,
            message: "placeholder bound to two different values".to_string(),
        })
    }

    /// Kind of query failure, if this is a query error.
    pub fn query_kind(&self) -> Option<QueryErrorKind> {
        match self {
            Error::Query(q) => Some(q.kind),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl QueryError {
    /// SQLITE_CONSTRAINT and its extended codes.
    pub fn is_constraint_violation(&self) -> bool {
        self.code.is_some_and(|code| code & 0xff == 19)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e),
            Error::Query(e) => write!(f, "Query error: {}", e),
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Transaction(e) => write!(f, "Transaction error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.kind {
            QueryErrorKind::Prepare => "prepare failed",
            QueryErrorKind::Bind => "bind failed",
            QueryErrorKind::Step => "step failed",
        };
        match &self.placeholder {
            Some(placeholder) => write!(f, "{} for {}: {}", stage, placeholder, self.message),
            None => write!(f, "{}: {}", stage, self.message),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "column '{}': expected {}, found {}",
                col, self.expected, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Result type alias for sqlbind operations.
pub type Result<T> = std::result::Result<T, Error>;
