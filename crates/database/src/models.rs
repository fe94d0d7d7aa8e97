//! Row types shared across the storage modules.

use sqlx::FromRow;

/// A registered client platform and its public verification key (SPKI PEM).
///
/// The full set is loaded once at startup and is read-only afterwards.
#[derive(Debug, Clone, FromRow)]
pub struct Platform {
    pub id: String,
    pub public_key: String,
}

/// A city row identified in business terms by its natural key
/// (`country_code`, `subdivisions`, `city`). The surrogate `id` assigned
/// by storage is stable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct CityRecord {
    /// ISO country code.
    pub country_code: String,
    /// Comma-joined human-readable subdivision names. May be empty.
    pub subdivisions: String,
    /// Human-readable city name. May be empty.
    pub city: String,
    pub longitude: f64,
    pub latitude: f64,
}

/// A telemetry record to append. The timestamp is assigned at write time.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub platform_id: String,
    pub city_id: i64,
    pub user: String,
    pub data: String,
}
