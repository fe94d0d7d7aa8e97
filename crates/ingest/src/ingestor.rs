//! End-to-end save pipeline: verify, resolve, persist.

use std::sync::Arc;

use beacon_database::{records, NewRecord, QueryExecutor};
use credentials::{Envelope, KeyStore};
use geo::GeoResolver;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::response::SaveResponse;

/// Composes the credential pipeline, geo resolver, and query executor
/// into the end-to-end save operation.
///
/// Each request walks verify → resolve → persist. The first failing stage
/// short-circuits; no partial outcome is exposed (a resolution failure
/// never reaches the persistence stage) and nothing is retried across
/// stages — a caller wanting resilience re-submits the whole request.
pub struct Ingestor {
    keys: Arc<KeyStore>,
    resolver: GeoResolver,
    executor: QueryExecutor,
}

impl Ingestor {
    pub fn new(keys: Arc<KeyStore>, resolver: GeoResolver, executor: QueryExecutor) -> Self {
        Self {
            keys,
            resolver,
            executor,
        }
    }

    /// Handle one envelope, emitting exactly one response.
    pub async fn save(&self, envelope: Envelope) -> SaveResponse {
        match self.process(&envelope).await {
            Ok(()) => SaveResponse::ok(),
            Err(err) => {
                warn!(platform = %envelope.platform_id, error = %err, "save failed");
                SaveResponse::failure(err.public_message())
            }
        }
    }

    async fn process(&self, envelope: &Envelope) -> Result<(), IngestError> {
        let (payload, platform_id) = self.keys.verify(envelope)?;
        debug!(platform = %platform_id, "envelope verified");

        let city_id = self.resolver.resolve(&payload.ip).await?;
        debug!(ip = %payload.ip, city_id, "location resolved");

        // String payloads are stored verbatim; anything else keeps its
        // JSON text.
        let data = match payload.data {
            Value::String(text) => text,
            other => other.to_string(),
        };
        let record = NewRecord {
            platform_id,
            city_id,
            user: payload.user,
            data,
        };
        records::insert(&self.executor, &record).await?;
        debug!(user = %record.user, city_id, "record persisted");
        Ok(())
    }
}
