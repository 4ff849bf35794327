use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Realm store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure to read realm rows from the persistent store.
///
/// Any of these aborts the refresh cycle; the previously published
/// snapshot stays live.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Realm store unavailable: {0}")]
    Unavailable(String),

    #[error("Realm store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Realm store parse error: {0}")]
    Parse(String),
}

/// A realm row carried an endpoint that could not be turned into a socket address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Could not resolve {field} '{value}': {reason}")]
    Unresolved {
        field: &'static str,
        value: String,
        reason: String,
    },
}
