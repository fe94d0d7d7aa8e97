//! Wire types for the credential pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound request body: a platform id plus its encrypted, signed token
/// (compact JWE wrapping a compact JWS).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope {
    pub platform_id: String,
    pub token: String,
}

/// The inner payload of a verified envelope. Only produced by
/// [`crate::KeyStore::verify`], so holding one means decryption and
/// signature verification both succeeded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrustedPayload {
    /// Originating client address, to be geo-resolved.
    pub ip: String,
    /// Platform-supplied user identifier. Opaque here.
    pub user: String,
    /// Opaque event data, stored as-is.
    pub data: Value,
}
