//! Envelope decryption and signature verification for Beacon.
//!
//! Inbound envelopes carry a platform id and a compact JWE token whose
//! plaintext is a compact JWS signed by that platform. The [`KeyStore`]
//! holds the service private key and the registered platform public keys
//! behind a readiness gate, and [`KeyStore::verify`] turns an envelope
//! into a [`TrustedPayload`] or a stage-specific [`CredentialError`].

pub mod envelope;
pub mod error;
pub mod keys;

pub use envelope::{Envelope, TrustedPayload};
pub use error::{CredentialError, KeyError};
pub use keys::KeyStore;
