//! Credential error types.

use thiserror::Error;

/// Failures while establishing trust in an inbound envelope.
///
/// The variants mirror the fixed verification stages; an envelope fails
/// with the error of the first stage it cannot pass.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Key material has not finished loading yet. Fail-safe for the
    /// startup window, distinct from a denial.
    #[error("service not ready")]
    NotReady,

    /// The claimed platform id is not registered.
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    /// The token could not be decrypted with the service key.
    #[error("decryption error")]
    Decryption,

    /// The decrypted token's signature does not match the claimed
    /// platform's key.
    #[error("signature invalid")]
    SignatureInvalid,

    /// The verified payload is not the expected structure.
    #[error("payload malformed")]
    PayloadMalformed,
}

/// Failures while loading key material at startup.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid private key: {0}")]
    PrivateKey(josekit::JoseError),

    #[error("invalid public key for platform {platform}: {source}")]
    PlatformKey {
        platform: String,
        source: josekit::JoseError,
    },

    #[error("key material already installed")]
    AlreadyInstalled,
}
