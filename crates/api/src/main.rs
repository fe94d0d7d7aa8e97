use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Json, State};
use axum::routing::{get, post};
use axum::Router;
use sqlx::sqlite::SqliteConnectOptions;
use tracing::{error, info};

use ingest::{Envelope, GeoResolver, Ingestor, KeyStore, MaxMindSource, QueryExecutor, SaveResponse};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let addr = env::var("BEACON_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let db_path = env::var("BEACON_DB_PATH").unwrap_or_else(|_| "beacon.db".to_string());
    let mmdb_path = env::var("BEACON_MMDB_PATH").expect("BEACON_MMDB_PATH is required");
    let key_path =
        env::var("BEACON_PRIVATE_KEY_PATH").expect("BEACON_PRIVATE_KEY_PATH is required");
    let lang = env::var("BEACON_DEFAULT_LANG").unwrap_or_else(|_| "en".to_string());

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true);
    beacon_database::migrate(&options)
        .await
        .expect("database migration failed");
    let executor = QueryExecutor::connect(options.clone());

    let source = MaxMindSource::open(&mmdb_path).expect("failed to open geo database");
    let resolver = GeoResolver::new(Arc::new(source), executor.clone(), lang);

    let keys = Arc::new(KeyStore::new());
    spawn_key_loader(keys.clone(), options, key_path);

    let ingestor = Arc::new(Ingestor::new(keys, resolver, executor));

    let app = Router::new()
        .route("/", get(index))
        .route("/save", post(save))
        .with_state(ingestor);

    let addr: SocketAddr = addr.parse().expect("Invalid BEACON_ADDR");
    info!(%addr, "Beacon listening");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// Load the service private key and the registered platform keys, then
/// open the key store for verification. Requests arriving before this
/// completes fail with "service not ready" instead of blocking.
fn spawn_key_loader(keys: Arc<KeyStore>, options: SqliteConnectOptions, key_path: String) {
    tokio::spawn(async move {
        let private_key = match tokio::fs::read(&key_path).await {
            Ok(pem) => pem,
            Err(err) => {
                error!(path = %key_path, error = %err, "failed to read private key");
                return;
            }
        };
        let platform_keys: Vec<(String, String)> =
            match beacon_database::platforms::load_all(&options).await {
                Ok(rows) => rows.into_iter().map(|p| (p.id, p.public_key)).collect(),
                Err(err) => {
                    error!(error = %err, "failed to load platforms");
                    return;
                }
            };
        if let Err(err) = keys.install(&private_key, &platform_keys) {
            error!(error = %err, "failed to install key material");
        }
    });
}

async fn index() -> &'static str {
    "Beacon is running"
}

async fn save(
    State(ingestor): State<Arc<Ingestor>>,
    Json(envelope): Json<Envelope>,
) -> Json<SaveResponse> {
    Json(ingestor.save(envelope).await)
}
