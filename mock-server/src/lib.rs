//! Fixture HTTP service for pipeline integration tests.
//!
//! Serves fixed JSON and form documents, echoes request bodies, query
//! strings and headers back as data, and counts hits so tests can observe
//! how many requests a pipeline actually sent. Any unknown path answers
//! `400 Bad Request`.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;

pub const SITE_JSON: &str = r#"{"site": "example.com"}"#;
pub const SITE_FORM: &str = "site=example.com";

pub type Hits = Arc<AtomicUsize>;

#[derive(Debug, Serialize)]
pub struct HitCount {
    pub hits: usize,
}

pub fn app() -> Router {
    let hits: Hits = Arc::new(AtomicUsize::new(0));
    Router::new()
        .route("/json", get(json))
        .route("/form", get(form))
        .route("/echo", post(echo).put(echo).patch(echo))
        .route("/query", get(query))
        .route("/headers", get(headers))
        .route("/hits", get(count_hit))
        .route("/hits/total", get(total_hits))
        .fallback(bad_request)
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

async fn json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], SITE_JSON)
}

async fn form() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/x-www-form-urlencoded")], SITE_FORM)
}

/// Reply with the request body under the request's own content type.
async fn echo(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    tracing::debug!("echo {} bytes as {content_type}", body.len());
    ([(header::CONTENT_TYPE, content_type)], body)
}

async fn query(Query(params): Query<BTreeMap<String, String>>) -> Json<BTreeMap<String, String>> {
    Json(params)
}

async fn headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    let seen = headers
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect();
    Json(seen)
}

async fn count_hit(State(hits): State<Hits>) -> Json<HitCount> {
    let hits = hits.fetch_add(1, Ordering::SeqCst) + 1;
    Json(HitCount { hits })
}

async fn total_hits(State(hits): State<Hits>) -> Json<HitCount> {
    Json(HitCount {
        hits: hits.load(Ordering::SeqCst),
    })
}

async fn bad_request() -> StatusCode {
    StatusCode::BAD_REQUEST
}
