//! Append-only telemetry records.

use chrono::Utc;

use crate::error::Result;
use crate::executor::{QueryExecutor, SqlParam};
use crate::models::NewRecord;

const INSERT_RECORD: &str =
    "INSERT INTO records (datetime, platform_id, city_id, user, data) VALUES (?, ?, ?, ?, ?)";

/// Append one record. The timestamp is assigned here, at write time.
/// Records are never updated or deleted.
pub async fn insert(executor: &QueryExecutor, record: &NewRecord) -> Result<()> {
    executor
        .execute(
            INSERT_RECORD,
            vec![
                SqlParam::Text(Utc::now().to_rfc3339()),
                SqlParam::Text(record.platform_id.clone()),
                SqlParam::Int(record.city_id),
                SqlParam::Text(record.user.clone()),
                SqlParam::Text(record.data.clone()),
            ],
        )
        .await?;
    Ok(())
}
