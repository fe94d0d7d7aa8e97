//! Ingestion orchestrator for Beacon.
//!
//! This crate provides the [`Ingestor`] type which coordinates the
//! end-to-end save operation for one inbound envelope.
//!
//! ```text
//! Envelope (platform id + encrypted, signed token)
//!          ↓
//! ┌──────────────────────────────────────────────────┐
//! │                   INGESTOR                       │
//! │                                                  │
//! │  1. Credential pipeline: decrypt + verify        │
//! │         ↓                                        │
//! │  2. Geo resolver: payload IP → city id           │
//! │     (cache-aside, lookup-or-insert)              │
//! │         ↓                                        │
//! │  3. Query executor: append record                │
//! │         ↓                                        │
//! │  4. Exactly one response, success or failure     │
//! └──────────────────────────────────────────────────┘
//! ```

mod error;
mod ingestor;
mod response;

pub use error::IngestError;
pub use ingestor::Ingestor;
pub use response::SaveResponse;

// Re-export commonly used types from dependencies.
pub use beacon_database::QueryExecutor;
pub use credentials::{Envelope, KeyStore, TrustedPayload};
pub use geo::{GeoResolver, MaxMindSource};
