//! HTTP routes: listing, download and the error-to-status mapping.
//!
//! The routes are thin dispatch onto the core backend. The status contract
//! is fixed by the core error taxonomy: `NotFound` becomes 404, the two
//! wrong-entry-kind errors become 406, everything else is a 500.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::error;
use vfs::{Backend, DirEntry, TreePath, VfsError};

/// The backend shared by all request handlers.
pub type SharedBackend = Arc<dyn Backend>;

/// Build the daemon's router around a backend.
pub fn router(backend: SharedBackend) -> Router {
    Router::new()
        .route("/", get(home))
        // Both spellings serve the root listing; the wildcard below only
        // matches non-empty paths.
        .route("/list", get(list_root))
        .route("/list/", get(list_root))
        .route("/list/{*path}", get(list_path))
        .route("/download/{*path}", get(download))
        .with_state(backend)
}

/// One breadcrumb of the navigation trail.
#[derive(Debug, Serialize)]
struct BreadcrumbPayload {
    name: String,
    path: String,
}

/// One entry of a directory listing.
#[derive(Debug, Serialize)]
struct EntryPayload {
    #[serde(rename = "type")]
    entry_type: &'static str,
    name: String,
    size: String,
    size_bytes: u64,
    modified: String,
}

impl From<DirEntry> for EntryPayload {
    fn from(entry: DirEntry) -> Self {
        Self {
            entry_type: entry.entry_type.as_code(),
            name: entry.name,
            size: entry.size.formatted(),
            size_bytes: entry.size.bytes(),
            modified: entry.modified,
        }
    }
}

/// The `/list/{path}` response body.
#[derive(Debug, Serialize)]
struct ListingPayload {
    path: String,
    breadcrumbs: Vec<BreadcrumbPayload>,
    entries: Vec<EntryPayload>,
}

/// Wrapper turning core errors into HTTP responses.
struct ApiError(VfsError);

impl From<VfsError> for ApiError {
    fn from(error: VfsError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            VfsError::NotFound(_) => StatusCode::NOT_FOUND,
            VfsError::NotADirectory(_) | VfsError::IsADirectory(_) => StatusCode::NOT_ACCEPTABLE,
            VfsError::Parse(_) | VfsError::Protocol(_) | VfsError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
        }

        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

async fn home() -> Redirect {
    Redirect::to("/list/")
}

async fn list_root(State(backend): State<SharedBackend>) -> Result<Json<ListingPayload>, ApiError> {
    list_directory(backend, TreePath::new("/")).await
}

async fn list_path(
    State(backend): State<SharedBackend>,
    Path(path): Path<String>,
) -> Result<Json<ListingPayload>, ApiError> {
    list_directory(backend, TreePath::new(&path)).await
}

async fn list_directory(
    backend: SharedBackend,
    path: TreePath,
) -> Result<Json<ListingPayload>, ApiError> {
    let entries = backend.list(&path).await?;

    Ok(Json(ListingPayload {
        path: path.full_path().to_string(),
        breadcrumbs: path
            .breadcrumbs()
            .map(|(name, path)| BreadcrumbPayload { name, path })
            .collect(),
        entries: entries.into_iter().map(EntryPayload::from).collect(),
    }))
}

async fn download(
    State(backend): State<SharedBackend>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let handle = backend.open(&TreePath::new(&path)).await?;

    let headers = [
        (
            header::CONTENT_TYPE,
            "application/octet-stream".to_string(),
        ),
        (header::CONTENT_LENGTH, handle.file_size.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                disposition_filename(&handle.file_name)
            ),
        ),
    ];

    Ok((headers, Body::from_stream(handle.stream)).into_response())
}

/// Escape a file name for use inside a quoted-string header value. A literal
/// `"` or `\` would otherwise terminate or mangle the quoting.
fn disposition_filename(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}
