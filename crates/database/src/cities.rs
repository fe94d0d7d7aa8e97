//! City rows, deduplicated on their natural key.

use tracing::debug;

use crate::error::Result;
use crate::executor::{QueryExecutor, SqlParam};
use crate::models::CityRecord;

const SELECT_CITY: &str =
    "SELECT id FROM cities WHERE country_code = ? AND subdivisions = ? AND city = ?";
const INSERT_CITY: &str =
    "INSERT INTO cities (country_code, subdivisions, city, longitude, latitude) VALUES (?, ?, ?, ?, ?)";

/// Find the city row matching the natural key, inserting it when absent.
/// Returns the surrogate id either way.
///
/// Exactly one SELECT per call, plus one INSERT on a miss. There is no
/// unique constraint on the natural key, so two tasks racing through the
/// miss path for the same unseen location can both insert; later lookups
/// settle on whichever row the SELECT returns first. Hardening this means
/// a unique index on the key and re-selecting on insert conflict.
pub async fn lookup_or_insert(executor: &QueryExecutor, city: &CityRecord) -> Result<i64> {
    let key = vec![
        SqlParam::Text(city.country_code.clone()),
        SqlParam::Text(city.subdivisions.clone()),
        SqlParam::Text(city.city.clone()),
    ];
    if let Some(id) = executor.fetch_id(SELECT_CITY, key).await? {
        return Ok(id);
    }

    let done = executor
        .execute(
            INSERT_CITY,
            vec![
                SqlParam::Text(city.country_code.clone()),
                SqlParam::Text(city.subdivisions.clone()),
                SqlParam::Text(city.city.clone()),
                SqlParam::Float(city.longitude),
                SqlParam::Float(city.latitude),
            ],
        )
        .await?;
    debug!(
        id = done.last_insert_id,
        country = %city.country_code,
        city = %city.city,
        "inserted new city"
    );
    Ok(done.last_insert_id)
}
