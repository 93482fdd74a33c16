use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ftsearch::{
    DocId, Document, IndexStore, RecordDocument, SearchConfig, SearchError, SearchHit, SearchIndex, SledStore,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Deserialize)]
pub struct SearchBody {
    pub query: serde_json::Value,
    #[serde(default = "default_k")]
    pub k: usize,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<ResultHit>,
}

#[derive(Serialize)]
pub struct ResultHit {
    pub doc_id: DocId,
    pub score: f64,
}

#[derive(Serialize)]
pub struct IndexResponse {
    pub indexed: usize,
    pub postings: usize,
}

/// Errors returned to HTTP clients as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        if e.is_client_error() {
            ApiError::BadRequest(e.to_string())
        } else {
            tracing::error!(error = %e, "search engine failure");
            ApiError::Internal(e.to_string())
        }
    }
}

type Engine = Arc<SearchIndex<SledStore>>;

#[derive(Clone)]
pub struct AppState {
    pub store: SledStore,
    pub config: Arc<SearchConfig>,
    pub admin_token: Option<String>,
    namespaces: Arc<RwLock<HashMap<String, Engine>>>,
}

impl AppState {
    pub fn new(store: SledStore, config: SearchConfig, admin_token: Option<String>) -> Self {
        Self { store, config: Arc::new(config), admin_token, namespaces: Default::default() }
    }

    /// Engine for a read. A namespace nobody has written to is served by a
    /// short-lived engine that is not kept.
    pub fn engine(&self, namespace: &str) -> Result<Engine, ApiError> {
        if let Some(engine) = self.namespaces.read().get(namespace) {
            return Ok(Arc::clone(engine));
        }
        Ok(Arc::new(SearchIndex::new(self.store.clone(), namespace, (*self.config).clone())?))
    }

    /// Engine for a write, cached so that writers share its document locks.
    pub fn open(&self, namespace: &str) -> Result<Engine, ApiError> {
        if let Some(engine) = self.namespaces.read().get(namespace) {
            return Ok(Arc::clone(engine));
        }
        let mut namespaces = self.namespaces.write();
        if let Some(engine) = namespaces.get(namespace) {
            return Ok(Arc::clone(engine));
        }
        let engine =
            Arc::new(SearchIndex::new(self.store.clone(), namespace, (*self.config).clone())?);
        namespaces.insert(namespace.to_string(), Arc::clone(&engine));
        tracing::info!(namespace, "opened namespace");
        Ok(engine)
    }

    pub fn is_open(&self, namespace: &str) -> bool {
        self.namespaces.read().contains_key(namespace)
    }
}

pub fn build_app(store_dir: &str, config: SearchConfig) -> Result<Router> {
    let store = SledStore::open(store_dir)?;
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app_state = AppState::new(store, config, admin_token);

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Ok(router(app_state).layer(cors))
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/:ns/search", get(search_handler).post(search_json_handler))
        .route("/:ns/documents", post(index_handler))
        .route("/:ns/documents/:doc_id", get(status_handler).delete(remove_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

fn respond(query: String, hits: Vec<SearchHit>, k: usize, start: std::time::Instant) -> Json<SearchResponse> {
    let k = k.clamp(1, 100);
    let total_hits = hits.len();
    let results = hits
        .into_iter()
        .take(k)
        .map(|h| ResultHit { doc_id: h.document_id, score: h.score })
        .collect();
    Json(SearchResponse { query, took_s: start.elapsed().as_secs_f64(), total_hits, results })
}

pub async fn search_handler(
    State(state): State<AppState>,
    Path(ns): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let hits = state.engine(&ns)?.search(params.q.as_str())?;
    Ok(respond(params.q, hits, params.k, start))
}

pub async fn search_json_handler(
    State(state): State<AppState>,
    Path(ns): Path<String>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let query = body.query.to_string();
    let hits = state.engine(&ns)?.search_value(body.query)?;
    Ok(respond(query, hits, body.k, start))
}

pub async fn status_handler(
    State(state): State<AppState>,
    Path((ns, doc_id)): Path<(String, DocId)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let indexed = state.engine(&ns)?.contains(doc_id)?;
    Ok(Json(serde_json::json!({ "doc_id": doc_id, "indexed": indexed })))
}

// --- Admin endpoints ---
async fn index_handler(
    State(state): State<AppState>,
    Path(ns): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<IndexResponse>, ApiError> {
    authorize(&state, &headers)?;
    let docs: Vec<RecordDocument> = match body {
        serde_json::Value::Array(_) => serde_json::from_value(body),
        other => serde_json::from_value::<RecordDocument>(other).map(|d| vec![d]),
    }
    .map_err(|e| ApiError::BadRequest(format!("invalid document: {e}")))?;

    if let Some(doc) = docs.iter().find(|d| d.text_source().is_none()) {
        return Err(SearchError::UnsupportedDocument { document_id: doc.id }.into());
    }

    let engine = state.open(&ns)?;
    let mut postings = 0;
    for doc in &docs {
        postings += engine.index(doc)?;
    }
    engine.store().flush().map_err(SearchError::from)?;
    Ok(Json(IndexResponse { indexed: docs.len(), postings }))
}

async fn remove_handler(
    State(state): State<AppState>,
    Path((ns, doc_id)): Path<(String, DocId)>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let engine = state.open(&ns)?;
    let removed = engine.remove(doc_id)?;
    engine.store().flush().map_err(SearchError::from)?;
    Ok(Json(serde_json::json!({ "doc_id": doc_id, "removed": removed })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}
