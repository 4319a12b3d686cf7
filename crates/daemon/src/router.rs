//! HTTP routes for browsing and downloading the shared tree.
//!
//! Every handler resolves the request path through the shared
//! [`PathResolver`] before touching the filesystem. Handlers only differ in
//! what they do with the [`ResolvedPath`] afterwards.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use engine::{
    ConfinedRoot, DirectoryLister, EngineError, ListOptions, ListingResult, PathResolver,
    ResolvedPath,
};
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::files::{FileAccessor, OpenedFile};
use crate::ui::{self, BROWSE_ROUTE};

/// Where `/` and unknown paths are sent.
pub const HOME: &str = "/browse/";

/// Errors returned from request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resolution, listing or file access failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Something outside the engine failed, such as a blocking task panicking.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            ApiError::Engine(EngineError::Confinement(_)) => "Forbidden",
            ApiError::Engine(EngineError::NotFound(_)) => "Not found",
            ApiError::Engine(EngineError::NotDirectory(_)) => "Not a directory",
            ApiError::Engine(EngineError::IsDirectory(_)) => "Is a directory",
            ApiError::Engine(EngineError::Io(_)) | ApiError::Internal(_) => {
                "Internal server error"
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected ({}): {}", status.as_u16(), self);
        }
        (status, self.public_message()).into_response()
    }
}

/// State shared by every request.
#[derive(Debug)]
pub struct AppState {
    /// Confines request paths to the shared root.
    pub resolver: PathResolver,
    /// Enumerates directories.
    pub lister: DirectoryLister,
    /// Opens files for streaming.
    pub accessor: FileAccessor,
}

impl AppState {
    /// Create state serving `root`.
    pub fn new(root: ConfinedRoot, options: ListOptions) -> Self {
        Self {
            resolver: PathResolver::new(root),
            lister: DirectoryLister::new(options),
            accessor: FileAccessor::new(),
        }
    }
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(redirect_home))
        .route("/browse", get(browse_root))
        .route("/browse/", get(browse_root))
        .route("/browse/{*path}", get(browse))
        .route("/download/{*path}", get(download))
        .route("/view/{*path}", get(view))
        .route("/api/browse", get(api_browse_root))
        .route("/api/browse/", get(api_browse_root))
        .route("/api/browse/{*path}", get(api_browse))
        .fallback(redirect_home)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn moved_permanently(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => ApiError::Internal(format!("invalid redirect target: {}", location))
            .into_response(),
    }
}

async fn redirect_home() -> Response {
    moved_permanently(HOME)
}

async fn list(state: Arc<AppState>, path: String) -> Result<ListingResult, ApiError> {
    let dir = state.resolver.resolve(&path)?;
    debug!("Listing {}", dir.request_path());

    // Directory enumeration is synchronous std::fs work.
    tokio::task::spawn_blocking(move || state.lister.list(&dir))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

async fn browse_root(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let listing = list(state, "/".to_string()).await?;
    Ok(Html(ui::render_listing(&listing)))
}

async fn browse(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Html<String>, ApiError> {
    let listing = list(state, path).await?;
    Ok(Html(ui::render_listing(&listing)))
}

async fn api_browse_root(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListingResult>, ApiError> {
    Ok(Json(list(state, "/".to_string()).await?))
}

async fn api_browse(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<ListingResult>, ApiError> {
    Ok(Json(list(state, path).await?))
}

async fn download(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let target = state.resolver.resolve(&path)?;
    let opened = state.accessor.open_for_download(&target).await?;
    info!(path = target.request_path(), size = opened.len, "Download");
    stream_file(opened)
}

async fn view(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let target = state.resolver.resolve(&path)?;
    match state.accessor.open_for_preview(&target).await {
        Ok(opened) => {
            debug!(path = target.request_path(), content_type = %opened.content_type, "Preview");
            stream_file(opened)
        }
        Err(EngineError::IsDirectory(_)) => Ok(redirect_to_browse(&target)),
        Err(e) => Err(e.into()),
    }
}

fn redirect_to_browse(target: &ResolvedPath) -> Response {
    let mut location = ui::link(BROWSE_ROUTE, target.request_path());
    if target.is_root() {
        location.push('/');
    }
    moved_permanently(&location)
}

fn stream_file(opened: OpenedFile) -> Result<Response, ApiError> {
    let header_value = |value: String| {
        HeaderValue::from_str(&value)
            .map_err(|_| ApiError::Internal(format!("invalid header value: {}", value)))
    };

    let content_type = header_value(opened.content_type.clone())?;
    let content_length = header_value(opened.len.to_string())?;
    let content_disposition = header_value(opened.content_disposition())?;

    let last_modified = opened.last_modified().map(header_value).transpose()?;

    // The handle moves into the body and is closed when the body is dropped.
    let body = Body::from_stream(ReaderStream::new(opened.file));

    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, content_length),
            (header::CONTENT_DISPOSITION, content_disposition),
        ],
        body,
    )
        .into_response();
    if let Some(value) = last_modified {
        response.headers_mut().insert(header::LAST_MODIFIED, value);
    }
    Ok(response)
}
