//! Geo resolution error types.

use beacon_database::StorageError;
use thiserror::Error;

/// Errors that can occur while resolving an IP address to a city id.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The geo database file could not be opened or read.
    #[error("geo database error: {0}")]
    Database(String),

    /// The geo database has no usable location for this address. Also
    /// covers addresses that do not parse and records missing a country
    /// code or coordinates.
    #[error("location unknown: {0}")]
    Unknown(String),

    /// The city row could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
