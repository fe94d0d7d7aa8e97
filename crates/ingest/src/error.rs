//! Error taxonomy for the ingestion pipeline.

use beacon_database::StorageError;
use credentials::CredentialError;
use geo::GeoError;
use thiserror::Error;

/// Any failure between receiving an envelope and persisting its record.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// Canonical text for the failure response.
    ///
    /// Deliberately coarse: raw database and crypto detail stays in the
    /// logs, only the mapped error kind's text reaches the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            IngestError::Credential(CredentialError::NotReady) => "service not ready",
            IngestError::Credential(CredentialError::UnknownPlatform(_)) => "unknown platform",
            IngestError::Credential(CredentialError::Decryption) => "decryption error",
            IngestError::Credential(CredentialError::SignatureInvalid) => "signature invalid",
            IngestError::Credential(CredentialError::PayloadMalformed) => "payload malformed",
            IngestError::Geo(GeoError::Unknown(_)) | IngestError::Geo(GeoError::Database(_)) => {
                "location unknown"
            }
            IngestError::Geo(GeoError::Storage(err)) => storage_message(err),
            IngestError::Storage(err) => storage_message(err),
        }
    }
}

fn storage_message(err: &StorageError) -> &'static str {
    match err {
        StorageError::Unavailable(_) => "persistence unavailable",
        _ => "persistence error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_kinds_are_not_collapsed() {
        let unavailable: IngestError = StorageError::Unavailable("io".to_string()).into();
        let failed: IngestError = StorageError::Query("constraint".to_string()).into();
        assert_eq!(unavailable.public_message(), "persistence unavailable");
        assert_eq!(failed.public_message(), "persistence error");
    }

    #[test]
    fn messages_do_not_leak_internal_detail() {
        let err: IngestError =
            StorageError::Query("UNIQUE constraint failed: users.id".to_string()).into();
        assert!(!err.public_message().contains("UNIQUE"));
    }
}
