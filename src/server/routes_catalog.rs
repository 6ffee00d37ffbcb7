//! Catalog API routes.
//!
//! - `GET /roots`, `POST /roots`
//! - `GET /entries[?root_id=]`
//! - `GET /entries/:id`
//! - `GET /entries/by-fingerprint/:hash`
//! - `POST /sync`

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use vidsync_common::{EntryId, RootId};
use vidsync_db::{CatalogEntry, MediaRoot, NewMediaRoot};

use super::AppContext;

pub fn catalog_routes() -> Router<AppContext> {
    Router::new()
        .route("/roots", get(list_roots).post(create_root))
        .route("/entries", get(list_entries))
        .route("/entries/:id", get(get_entry))
        .route("/entries/by-fingerprint/:hash", get(get_entry_by_fingerprint))
        .route("/sync", post(run_sync))
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({"error": message.into()}))).into_response()
}

fn internal(e: impl std::fmt::Display) -> Response {
    tracing::error!(error = %e, "Catalog request failed");
    error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    #[serde(flatten)]
    pub root: MediaRoot,
    /// A sync pass over this root is running.
    pub syncing: bool,
}

pub async fn list_roots(State(ctx): State<AppContext>) -> Response {
    match ctx.store.list_roots() {
        Ok(roots) => {
            let response: Vec<RootResponse> = roots
                .into_iter()
                .map(|root| RootResponse {
                    syncing: ctx.engine.is_syncing(&root),
                    root,
                })
                .collect();
            Json(response).into_response()
        }
        Err(e) => internal(e),
    }
}

pub async fn create_root(
    State(ctx): State<AppContext>,
    Json(req): Json<NewMediaRoot>,
) -> Response {
    if req.name.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "name must not be empty");
    }
    if req.path.as_os_str().is_empty() {
        return error(StatusCode::BAD_REQUEST, "path must not be empty");
    }

    match ctx.store.register_root(req) {
        Ok(root) => {
            tracing::info!(root_id = %root.id, root = %root.path.display(), "Registered media root");
            (StatusCode::CREATED, Json(root)).into_response()
        }
        Err(e) => internal(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    pub root_id: Option<String>,
}

pub async fn list_entries(
    State(ctx): State<AppContext>,
    Query(query): Query<EntriesQuery>,
) -> Response {
    let result = match query.root_id {
        Some(raw) => match raw.parse::<RootId>() {
            Ok(root_id) => ctx.store.list_by_root(root_id),
            Err(_) => return error(StatusCode::BAD_REQUEST, "Invalid root ID"),
        },
        None => ctx.store.list_all(),
    };

    match result {
        Ok(entries) => Json::<Vec<CatalogEntry>>(entries).into_response(),
        Err(e) => internal(e),
    }
}

pub async fn get_entry(State(ctx): State<AppContext>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<EntryId>() else {
        return error(StatusCode::BAD_REQUEST, "Invalid entry ID");
    };

    match ctx.store.get(id) {
        Ok(Some(entry)) => Json(entry).into_response(),
        Ok(None) => error(StatusCode::NOT_FOUND, "Entry not found"),
        Err(e) => internal(e),
    }
}

pub async fn get_entry_by_fingerprint(
    State(ctx): State<AppContext>,
    Path(hash): Path<String>,
) -> Response {
    match ctx.store.get_by_fingerprint(&hash.to_lowercase()) {
        Ok(Some(entry)) => Json(entry).into_response(),
        Ok(None) => error(StatusCode::NOT_FOUND, "Entry not found"),
        Err(e) => internal(e),
    }
}

pub async fn run_sync(State(ctx): State<AppContext>) -> Response {
    match ctx.engine.synchronize_all().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => internal(e),
    }
}
