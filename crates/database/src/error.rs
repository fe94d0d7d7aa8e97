//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
///
/// `Unavailable` and `Query` are deliberately distinct kinds: the first
/// means the connection itself failed (transient, the statement never
/// reached the database), the second means the statement executed and the
/// database rejected it. Callers must not collapse them.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection-level failure. The statement was dropped, never
    /// half-applied.
    #[error("database unavailable: {0}")]
    Unavailable(String),

    /// The statement reached the database and failed there (constraint
    /// violation, missing table, type error).
    #[error("query failed: {0}")]
    Query(String),

    /// The executor task has shut down.
    #[error("query executor stopped")]
    Closed,

    /// Migration error on the startup path.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Direct-connection error on the startup path.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
