//! Registered platform rows.
//!
//! Startup path: these helpers open their own short-lived connection
//! instead of going through the query executor. They run before the
//! executor is wired up, and a broken database should fail the boot
//! loudly rather than queue.

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};

use crate::error::Result;
use crate::models::Platform;

/// Load every registered platform with its public verification key.
pub async fn load_all(options: &SqliteConnectOptions) -> Result<Vec<Platform>> {
    let mut conn = options.connect().await?;
    let rows = sqlx::query_as::<_, Platform>(
        "SELECT id, public_key FROM platforms ORDER BY id",
    )
    .fetch_all(&mut conn)
    .await?;
    conn.close().await?;
    Ok(rows)
}

/// Register a platform. Used by provisioning tooling and tests.
pub async fn register(options: &SqliteConnectOptions, platform: &Platform) -> Result<()> {
    let mut conn = options.connect().await?;
    sqlx::query("INSERT INTO platforms (id, public_key) VALUES (?, ?)")
        .bind(&platform.id)
        .bind(&platform.public_key)
        .execute(&mut conn)
        .await?;
    conn.close().await?;
    Ok(())
}
