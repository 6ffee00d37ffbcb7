//! Media streaming.
//!
//! Routes (nested under `/api`):
//! - `GET /stream/{entry_id}` - the entry's file with range support
//! - `GET /thumbnails/{entry_id}` - the entry's thumbnail

mod direct;

pub use direct::{content_type_for, parse_range_header, serve_file, ByteRange};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use vidsync_common::EntryId;
use vidsync_db::CatalogEntry;

use crate::server::AppContext;

pub fn streaming_routes() -> Router<AppContext> {
    Router::new()
        .route("/stream/:id", get(stream_entry))
        .route("/thumbnails/:id", get(entry_thumbnail))
}

fn load_entry(ctx: &AppContext, id: &str) -> Result<CatalogEntry, StatusCode> {
    let id: EntryId = id.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    match ctx.store.get(id) {
        Ok(Some(entry)) => Ok(entry),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(entry_id = %id, error = %e, "Failed to load entry");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Stream an entry's media file.
pub async fn stream_entry(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let entry = load_entry(&ctx, &id)?;
    serve_file(&entry.path, &headers).await
}

/// Serve an entry's thumbnail image.
pub async fn entry_thumbnail(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let entry = load_entry(&ctx, &id)?;
    let thumbnail = entry.thumbnail.ok_or(StatusCode::NOT_FOUND)?;
    serve_file(&thumbnail, &headers).await
}
