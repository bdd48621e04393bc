//! Error types for pgbridge.

use thiserror::Error;

/// The main error type for bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A named placeholder has no entry in the caller's bindings.
    #[error("No binding supplied for placeholder ':{name}'")]
    MissingBinding { name: String },

    /// Query text that the rewriter cannot make sense of.
    #[error("Translation error at position {position}: {message}")]
    Translation { position: usize, message: String },

    /// I/O or protocol failure in the wrapped driver. The connection is
    /// presumed unusable.
    #[error("Connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// Constraint violation reported by the database (SQLSTATE class 23).
    #[error("Integrity error: {0}")]
    Integrity(#[source] sqlx::Error),

    /// Invalid SQL or schema misuse (SQLSTATE classes 26 and 42).
    #[error("Programming error: {0}")]
    Programming(#[source] sqlx::Error),

    /// Bad data for the operation (SQLSTATE class 22).
    #[error("Data error: {0}")]
    Data(#[source] sqlx::Error),

    /// Invalid connection configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// DBAPI-style error kinds the upstream toolkit interprets for its
/// retry/rollback decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Binding,
    Translation,
    Connection,
    Integrity,
    Programming,
    Data,
    Config,
}

impl BridgeError {
    /// Create a translation error at the given position.
    pub fn translation(position: usize, message: impl Into<String>) -> Self {
        Self::Translation {
            position,
            message: message.into(),
        }
    }

    /// Create a missing-binding error.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingBinding { name: name.into() }
    }

    /// Classify a driver failure into the bridge taxonomy.
    ///
    /// The mapping is an explicit table over the driver's error shape and the
    /// reported SQLSTATE class, not runtime introspection of message text.
    pub fn from_driver(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(code) if code.starts_with("23") => Self::Integrity(err),
                Some(code) if code.starts_with("42") || code.starts_with("26") => {
                    Self::Programming(err)
                }
                Some(code) if code.starts_with("22") => Self::Data(err),
                // Class 08 is connection_exception on the server side.
                Some(code) if code.starts_with("08") => Self::Connection(err),
                _ => Self::Programming(err),
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Connection(err),
            _ => Self::Connection(err),
        }
    }

    /// The DBAPI-style kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingBinding { .. } => ErrorKind::Binding,
            Self::Translation { .. } => ErrorKind::Translation,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Programming(_) => ErrorKind::Programming,
            Self::Data(_) => ErrorKind::Data,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether this error indicates the connection itself is gone, as opposed
    /// to the statement merely failing.
    pub fn is_disconnect(&self) -> bool {
        let Self::Connection(source) = self else {
            return false;
        };
        match source {
            sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => true,
            _ => {
                let msg = source.to_string().to_lowercase();
                [
                    "connection closed",
                    "connection lost",
                    "server closed the connection",
                    "connection reset",
                    "broken pipe",
                    "connection refused",
                ]
                .iter()
                .any(|pattern| msg.contains(pattern))
            }
        }
    }
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
