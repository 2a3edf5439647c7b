//! HTTP routes
//!
//! | Path | Response |
//! |---|---|
//! | `/` | `301` to `/index.html` |
//! | `/index.html` | viewer page |
//! | `/stream.mjpg` | endless `multipart/x-mixed-replace` body |
//! | anything else | `404` |
//!
//! Methods other than GET get `501` on known paths.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use super::stream::{mjpeg_body, BOUNDARY};
use crate::broadcast::FrameBroadcaster;
use crate::session::SessionState;

pub const ROOT_PATH: &str = "/";
pub const INDEX_PATH: &str = "/index.html";
pub const STREAM_PATH: &str = "/stream.mjpg";

/// Shared by every request
#[derive(Clone)]
pub struct AppState {
    pub broadcaster: Arc<FrameBroadcaster>,
    pub index_page: Arc<str>,
}

/// The connection a request arrived on
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub session_id: u64,
    pub peer_addr: SocketAddr,
}

/// Build the router; requests must carry a [`Viewer`] extension
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(ROOT_PATH, get(redirect_to_index).fallback(not_implemented))
        .route(INDEX_PATH, get(index).fallback(not_implemented))
        .route(STREAM_PATH, get(stream).fallback(not_implemented))
        .fallback(not_found)
        .with_state(state)
}

async fn redirect_to_index() -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, INDEX_PATH)]).into_response()
}

async fn index(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/html")],
        state.index_page.to_string(),
    )
        .into_response()
}

async fn stream(State(state): State<AppState>, Extension(viewer): Extension<Viewer>) -> Response {
    let session = SessionState::new(viewer.session_id, viewer.peer_addr);
    let content_type = format!("multipart/x-mixed-replace; boundary={}", BOUNDARY);

    (
        [
            (header::AGE, "0".to_string()),
            (header::CACHE_CONTROL, "no-cache, private".to_string()),
            (header::PRAGMA, "no-cache".to_string()),
            (header::CONTENT_TYPE, content_type),
        ],
        mjpeg_body(state.broadcaster, session),
    )
        .into_response()
}

async fn not_found() -> Response {
    error_page(StatusCode::NOT_FOUND)
}

async fn not_implemented() -> Response {
    error_page(StatusCode::NOT_IMPLEMENTED)
}

fn error_page(status: StatusCode) -> Response {
    let body = format!(
        "<html><head><title>Error response</title></head>\
         <body><h1>Error response</h1><p>Error code: {}</p><p>Message: {}.</p></body></html>\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    (status, [(header::CONTENT_TYPE, "text/html;charset=utf-8")], body).into_response()
}
