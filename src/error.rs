use thiserror::Error;

/// Error type for dbint operations.
///
/// Every public operation that fails also records the `Display` text of
/// this error on the owning connection, see
/// [`Connection::last_error_text`](crate::Connection::last_error_text).
#[derive(Debug, Error)]
pub enum DbIntError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection is not open")]
    NotConnected,

    #[error("Environment initialization failed: {0}")]
    Environment(String),

    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("Statement is not prepared")]
    NotPrepared,

    #[error("Parameter {ordinal} is out of range (statement has {count} parameters)")]
    ParameterOutOfRange { ordinal: usize, count: usize },

    #[error("Parameter {0} is not bound")]
    UnboundParameter(usize),

    #[error("Parameter {ordinal} expects an integer, got {value:?}")]
    InvalidNumber { ordinal: usize, value: String },

    #[error("Value for parameter {ordinal} is {length} units long, buffer holds {capacity}")]
    ValueTooLong {
        ordinal: usize,
        length: usize,
        capacity: usize,
    },

    #[error("Column {0} is not a lob. Use the column value accessor or change the column type")]
    NotALob(String),
}

/// Result type alias for dbint operations
pub type Result<T> = std::result::Result<T, DbIntError>;
