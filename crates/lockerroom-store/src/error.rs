use lockerroom_shared::MessagingError;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The query needs a composite index that has not been provisioned.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// The store's access rules rejected the request.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The referenced document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored column could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// UUID parsing error.
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    /// Chrono parsing error.
    #[error("Timestamp parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),
}

impl From<StoreError> for MessagingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::FailedPrecondition(diagnostic) => MessagingError::IndexMissing { diagnostic },
            StoreError::PermissionDenied(reason) => MessagingError::Permission(reason),
            StoreError::NotFound(what) => MessagingError::NotFound(what),
            other => MessagingError::StoreUnavailable(other.to_string()),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
