//! C11 — HTTP surface over the repository facade.
//!
//! Built on the `axum`/`tokio` dependencies already in the dependency
//! tree. `ApiError` is one `IntoResponse` impl mapping the tagged error
//! enum to a status code and a JSON body, rather than threading match
//! arms through every handler.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

use std::collections::BTreeMap;

use crate::audio::AudioDecoder;
use crate::error::EngineError;
use crate::query::QueryStats;
use crate::repository::{Engine, TrackMetadata};
use crate::store::TrackRecord;

struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::AudioTooShort { .. } | EngineError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            EngineError::SchemaMismatch(_) => StatusCode::CONFLICT,
            EngineError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            EngineError::StoreRead(_) | EngineError::StoreWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<Engine>>,
    decoder: Arc<AudioDecoder>,
}

#[derive(Debug, Deserialize)]
struct IngestRequest {
    title: String,
    path: String,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    album_id: Option<i32>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct IngestResponse {
    track_id: i32,
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    path: String,
    #[serde(default)]
    search_all: bool,
}

#[derive(Debug, Serialize)]
struct QueryHit {
    track_id: i32,
    title: String,
    table_votes: usize,
    min_hamming_distance: usize,
    similarity: f32,
    score: f32,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    hits: Vec<QueryHit>,
}

#[derive(Debug, Serialize)]
struct TrackResponse {
    id: i32,
    album_id: Option<i32>,
    duration_ms: Option<i64>,
    artist: Option<String>,
    title: String,
    path: String,
    tags: BTreeMap<String, String>,
    total_fingerprints: i32,
}

impl From<TrackRecord> for TrackResponse {
    fn from(t: TrackRecord) -> Self {
        Self {
            id: t.id,
            album_id: t.album_id,
            duration_ms: t.duration_ms,
            artist: t.artist,
            title: t.title,
            path: t.path,
            tags: t.tags,
            total_fingerprints: t.total_fingerprints,
        }
    }
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn insert_track(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> ApiResult<impl IntoResponse> {
    let (raw, native_rate) = state.decoder.decode_file(&req.path)?;

    let mut engine = state.engine.lock().await;
    let pcm = state.decoder.resample_linear(&raw, native_rate, engine.sample_rate());
    let metadata = TrackMetadata {
        album_id: req.album_id,
        artist: req.artist,
        title: req.title,
        path: req.path,
        tags: req.tags,
    };
    let track_id = engine.insert_track(&metadata, &pcm)?;

    Ok(Json(IngestResponse { track_id }))
}

async fn query_track(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> ApiResult<impl IntoResponse> {
    let (raw, native_rate) = state.decoder.decode_file(&req.path)?;

    let mut engine = state.engine.lock().await;
    let pcm = state.decoder.resample_linear(&raw, native_rate, engine.sample_rate());
    let matches = engine.find_similar(&pcm, req.search_all)?;

    let hits = matches
        .into_iter()
        .map(|(track, stats): (TrackRecord, QueryStats)| QueryHit {
            track_id: track.id,
            title: track.title,
            table_votes: stats.table_votes,
            min_hamming_distance: stats.min_hamming_distance,
            similarity: stats.similarity,
            score: stats.score,
        })
        .collect();

    Ok(Json(QueryResponse { hits }))
}

#[derive(Debug, Deserialize)]
struct ListTracksQuery {
    artist: Option<String>,
}

async fn list_tracks(
    State(state): State<AppState>,
    Query(params): Query<ListTracksQuery>,
) -> ApiResult<impl IntoResponse> {
    let mut engine = state.engine.lock().await;
    let tracks = engine.list_tracks(params.artist.as_deref())?;
    Ok(Json(tracks.into_iter().map(TrackResponse::from).collect::<Vec<_>>()))
}

async fn get_track(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<impl IntoResponse> {
    let mut engine = state.engine.lock().await;
    match engine.get_track(id)? {
        Some(t) => Ok(Json(TrackResponse::from(t))),
        None => Err(ApiError(EngineError::StoreRead(format!("no track with id {id}")))),
    }
}

async fn reset(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let mut engine = state.engine.lock().await;
    engine.reset_database()?;
    Ok(StatusCode::NO_CONTENT)
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/tracks", post(insert_track))
        .route("/tracks", get(list_tracks))
        .route("/tracks/{id}", get(get_track))
        .route("/query", post(query_track))
        .route("/reset", post(reset))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds and serves the HTTP API on `addr` until the process is terminated.
pub async fn serve(engine: Engine, addr: SocketAddr) -> anyhow::Result<()> {
    let state = AppState {
        engine: Arc::new(Mutex::new(engine)),
        decoder: Arc::new(AudioDecoder::new()),
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
