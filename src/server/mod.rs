//! HTTP search API
//!
//! Routes:
//! - `GET /api/health` - liveness and version
//! - `GET /api/search?q=...&limit=N` and `POST /api/search` - hybrid search
//! - `GET /` - a minimal search page

use crate::config::ServerConfig;
use crate::search::{metadata_str, Retriever, SearchResult};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tower_http::cors::CorsLayer;

/// Results returned when the request does not ask for a count
pub const DEFAULT_LIMIT: usize = 10;

/// Upper bound on results per request
pub const MAX_LIMIT: usize = 100;

#[derive(Clone)]
struct AppState {
    retriever: Retriever,
}

/// Builds the API router over a shared retriever
pub fn router(retriever: Retriever) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/api/health", get(handle_health))
        .route("/api/search", get(handle_search_get).post(handle_search_post))
        .layer(CorsLayer::permissive())
        .with_state(AppState { retriever })
}

/// Serves the API until Ctrl-C
pub async fn serve(config: &ServerConfig, retriever: Retriever) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Search API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(retriever))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// ============ Errors ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ /api/search ============

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    q: Option<String>,
    query: Option<String>,
    /// Kept as text so a malformed value falls back to the default
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    query: String,
    results: Vec<ResultItem>,
    total: usize,
    elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
struct ResultItem {
    document_id: String,
    chunk_id: String,
    score: f32,
    text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    url: String,
    metadata: crate::storage::Metadata,
}

impl From<SearchResult> for ResultItem {
    fn from(result: SearchResult) -> Self {
        Self {
            title: metadata_str(&result.metadata, "title"),
            url: metadata_str(&result.metadata, "url"),
            document_id: result.document_id,
            chunk_id: result.chunk_id,
            score: result.score,
            text: result.text,
            metadata: result.metadata,
        }
    }
}

/// Maps a requested limit to `1..=MAX_LIMIT`; absent or non-positive means default
fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        Some(n) if n > 0 => (n as usize).min(MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    }
}

async fn handle_search_get(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.q.or(params.query).unwrap_or_default();
    let limit = params.limit.and_then(|l| l.trim().parse::<i64>().ok());
    run_search(&state, query, clamp_limit(limit)).await
}

async fn handle_search_post(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e)))?;
    run_search(&state, request.query, clamp_limit(request.limit)).await
}

async fn run_search(
    state: &AppState,
    query: String,
    limit: usize,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::bad_request("Missing query parameter 'q'"));
    }

    let started = Instant::now();
    let results = state.retriever.retrieve(&query, limit).await.map_err(|e| {
        tracing::error!("Search for {:?} failed: {}", query, e);
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Search failed".to_string(),
        }
    })?;

    let results: Vec<ResultItem> = results.into_iter().map(ResultItem::from).collect();
    tracing::info!("Query {:?} returned {} results", query, results.len());

    Ok(Json(SearchResponse {
        query,
        total: results.len(),
        results,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }))
}

// ============ GET / ============

async fn handle_root() -> Html<&'static str> {
    Html(SEARCH_PAGE)
}

const SEARCH_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>sumi-seek</title>
  <style>
    body { font-family: sans-serif; max-width: 800px; margin: 40px auto; }
    input { width: 80%; padding: 8px; font-size: 16px; }
    .result { margin: 16px 0; padding: 12px; border: 1px solid #ddd; border-radius: 4px; }
    .meta { color: #777; font-size: 12px; }
  </style>
</head>
<body>
  <h1>sumi-seek</h1>
  <form id="search">
    <input id="q" type="text" placeholder="Search..." required>
    <button type="submit">Search</button>
  </form>
  <div id="results"></div>
  <script>
    document.getElementById('search').addEventListener('submit', async (event) => {
      event.preventDefault();
      const q = document.getElementById('q').value;
      const out = document.getElementById('results');
      out.textContent = 'Searching...';
      const response = await fetch('/api/search?q=' + encodeURIComponent(q));
      if (!response.ok) { out.textContent = 'Search failed'; return; }
      const data = await response.json();
      out.textContent = '';
      for (const r of data.results) {
        const div = document.createElement('div');
        div.className = 'result';
        const link = document.createElement('a');
        link.href = r.url || '#';
        link.textContent = r.title || r.url || r.chunk_id;
        const text = document.createElement('p');
        text.textContent = r.text.length > 300 ? r.text.slice(0, 300) + '...' : r.text;
        const meta = document.createElement('div');
        meta.className = 'meta';
        meta.textContent = 'score ' + r.score.toFixed(3);
        div.append(link, text, meta);
        out.append(div);
      }
      const summary = document.createElement('p');
      summary.className = 'meta';
      summary.textContent = data.total + ' results in ' + data.elapsed_ms + ' ms';
      out.prepend(summary);
    });
  </script>
</body>
</html>
"#;
