use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::memdump;
use crate::record::{ClientRecord, StoredRecord};
use crate::store::RecordStore;

/// Start the Axum server with the provided configuration and store.
pub async fn start_server(
    config: Arc<AppConfig>,
    record_store: Arc<dyn RecordStore>,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        store: record_store,
        config,
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router. Exposed so tests can mount it on a test
/// transport with a store double.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/client/{id}", get(get_client).post(create_client))
        .route("/score/{id}", get(get_score))
        .route("/keys", get(list_keys))
        .route("/memory", get(dump_memory))
        .route("/version", get(version))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for client creation. The score is never client-supplied.
#[derive(Debug, Deserialize)]
struct CreateClientRequest {
    fname: String,
    lname: String,
    address: String,
    city: String,
    iban: String,
    ssn: String,
    email: String,
}

/// Projection returned by the score endpoint.
#[derive(Debug, Serialize)]
struct ScoreResponse {
    id: String,
    score: f64,
}

/// Response from the key enumeration endpoint.
#[derive(Debug, Serialize)]
struct KeysResponse {
    keys: Vec<StoredRecord>,
}

/// Summary returned by the memory dump endpoint; the bytes themselves go to
/// the process's stdout, not the HTTP body.
#[derive(Debug, Serialize)]
struct DumpSummary {
    pid: u32,
    dumped: usize,
    skipped: usize,
}

/// GET /client/{id} - Fetch a stored client record.
async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredRecord>, ApiError> {
    let Some(bytes) = state.store.get(&id).await? else {
        return Err(ApiError::NotFound("unknown client_id"));
    };
    let record = ClientRecord::decode(&bytes).map_err(anyhow::Error::from)?;
    Ok(Json(StoredRecord { id, record }))
}

/// POST /client/{id} - Create a record; ids are write-once.
///
/// The existence check and the write are two store round-trips, so two
/// racing creates for one id can both pass the check. Callers wanting
/// exactly-once need a conditional store write.
async fn create_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateClientRequest>,
) -> Result<Json<StoredRecord>, ApiError> {
    if state.store.exists(&id).await? {
        return Err(ApiError::Conflict);
    }

    let record = ClientRecord {
        first_name: req.fname,
        last_name: req.lname,
        address: req.address,
        city: req.city,
        iban: req.iban,
        ssn: req.ssn,
        email: req.email,
        score: rand::random::<f64>(),
    };
    let bytes = record.encode().map_err(anyhow::Error::from)?;
    state.store.set(&id, bytes).await?;

    info!(name: "client.created", id = %id, "client record created");
    Ok(Json(StoredRecord { id, record }))
}

/// GET /score/{id} - Project just the score field.
async fn get_score(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let Some(bytes) = state.store.get(&id).await? else {
        return Err(ApiError::NotFound("unknown client"));
    };
    let record = ClientRecord::decode(&bytes).map_err(anyhow::Error::from)?;
    Ok(Json(ScoreResponse {
        id,
        score: record.score,
    }))
}

/// GET /keys - Enumerate and decode every stored record.
///
/// Best-effort: a key deleted between enumeration and fetch is skipped.
async fn list_keys(State(state): State<AppState>) -> Result<Json<KeysResponse>, ApiError> {
    let keys = state.store.keys().await?;
    if keys.is_empty() {
        return Err(ApiError::NotFound("no keys"));
    }

    let mut records = Vec::with_capacity(keys.len());
    for id in keys {
        let Some(bytes) = state.store.get(&id).await? else {
            continue;
        };
        let record = ClientRecord::decode(&bytes).map_err(anyhow::Error::from)?;
        records.push(StoredRecord { id, record });
    }
    Ok(Json(KeysResponse { keys: records }))
}

/// GET /memory - Dump the process's readable memory to stdout.
async fn dump_memory(State(_state): State<AppState>) -> Result<Json<DumpSummary>, ApiError> {
    let pid = std::process::id();
    let stats = tokio::task::spawn_blocking(|| {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        memdump::dump_self(&mut out)
    })
    .await
    .map_err(anyhow::Error::from)?
    .map_err(anyhow::Error::from)?;

    info!(
        name: "memdump.finished",
        dumped = stats.dumped,
        skipped = stats.skipped,
        "memory dump written to stdout"
    );
    Ok(Json(DumpSummary {
        pid,
        dumped: stats.dumped,
        skipped: stats.skipped,
    }))
}

/// GET /version - Service version probe.
async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
