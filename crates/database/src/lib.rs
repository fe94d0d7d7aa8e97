//! SQLite persistence layer for Beacon.
//!
//! All runtime statements flow through the [`QueryExecutor`], which owns
//! the single database connection and survives transient outages by
//! queueing commands FIFO and reconnecting with backoff. Startup-path
//! helpers ([`migrate`], [`platforms`]) open their own short-lived
//! connections so a broken database fails the boot instead of queueing.
//!
//! # Example
//!
//! ```no_run
//! use database::{cities, CityRecord, QueryExecutor};
//! use sqlx::sqlite::SqliteConnectOptions;
//!
//! #[tokio::main]
//! async fn main() -> database::Result<()> {
//!     let options = SqliteConnectOptions::new()
//!         .filename("beacon.db")
//!         .create_if_missing(true);
//!     database::migrate(&options).await?;
//!
//!     let executor = QueryExecutor::connect(options);
//!     let city = CityRecord {
//!         country_code: "US".to_string(),
//!         subdivisions: "California".to_string(),
//!         city: "Mountain View".to_string(),
//!         longitude: -122.08,
//!         latitude: 37.39,
//!     };
//!     let city_id = cities::lookup_or_insert(&executor, &city).await?;
//!     println!("city id: {city_id}");
//!     Ok(())
//! }
//! ```

pub mod cities;
pub mod error;
pub mod executor;
pub mod models;
pub mod platforms;
pub mod records;

pub use error::{Result, StorageError};
pub use executor::{Done, QueryExecutor, SqlParam};
pub use models::{CityRecord, NewRecord, Platform};

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};

/// Run database migrations over a dedicated connection.
///
/// This should be called once at startup, before the executor is spawned.
pub async fn migrate(options: &SqliteConnectOptions) -> Result<()> {
    tracing::info!("running database migrations");
    let mut conn = options.connect().await?;
    sqlx::migrate!("./migrations").run(&mut conn).await?;
    conn.close().await?;
    tracing::info!("migrations complete");
    Ok(())
}
