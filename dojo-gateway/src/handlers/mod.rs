//! Local media API handlers
//!
//! The four routes handled entirely in-process: media listing, the
//! backward-compatible single-root listing, upload, and delete. Everything
//! else under `/api` or `/_` is proxied (see [`crate::proxy`]).

use crate::error::{GatewayError, GatewayResult};
use crate::media::{delete, scan, upload, Asset, ScanOptions};
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Response body for a successful upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Public URL of the stored file
    pub url: String,
    /// Stored path relative to the destination root
    #[serde(rename = "fileName")]
    pub file_name: String,
}

/// Request body for `POST /api/delete-media`
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Path of the file to delete, relative to the media store
    #[serde(rename = "fileName", default)]
    pub file_name: String,
}

/// Response body for a successful delete
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Always `true` on the success path
    pub success: bool,
}

/// `GET /api/media`: recursive, tagged, deduplicated multi-root listing
pub async fn list_media(State(state): State<AppState>) -> GatewayResult<Json<Vec<Asset>>> {
    let roots = state.roots().scan_roots();
    run_scan(&state, roots).await.map(Json)
}

/// `GET /api/local-media`: same shape, scoped to the single local root
///
/// Kept for callers of the historical endpoint; semantics are otherwise
/// identical to the full listing.
pub async fn list_local_media(State(state): State<AppState>) -> GatewayResult<Json<Vec<Asset>>> {
    let roots = state.roots().local_scan_roots();
    run_scan(&state, roots).await.map(Json)
}

/// `POST /api/upload`: multipart upload (`file`, optional `folder`)
pub async fn upload_media(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> GatewayResult<Json<UploadResponse>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::Validation(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let declared_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| GatewayError::Validation(format!("Unreadable file part: {e}")))?;
                file = Some((declared_name, bytes.to_vec()));
            }
            Some("folder") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| GatewayError::Validation(format!("Unreadable folder part: {e}")))?;
                folder = Some(value);
            }
            _ => {}
        }
    }

    let (declared_name, bytes) =
        file.ok_or_else(|| GatewayError::Validation("No file provided".to_string()))?;

    // Destination root is resolved once and used for both the existence
    // check and the write.
    let root = state.roots().upload_root();
    let stored = upload::store(&root, &bytes, &declared_name, folder.as_deref()).await?;

    Ok(Json(UploadResponse {
        url: stored.url,
        file_name: stored.relative_path,
    }))
}

/// `POST /api/delete-media`: JSON `{fileName}` delete
pub async fn delete_media(
    State(state): State<AppState>,
    Json(request): Json<DeleteRequest>,
) -> GatewayResult<Json<DeleteResponse>> {
    delete::remove(state.roots(), &request.file_name).await?;
    Ok(Json(DeleteResponse { success: true }))
}

/// Runs a bounded scan on the blocking pool
///
/// The walk is synchronous I/O with no caching, so it runs off the async
/// runtime, and a deadline keeps a pathological directory tree from
/// stalling the request forever.
async fn run_scan(state: &AppState, roots: Vec<PathBuf>) -> GatewayResult<Vec<Asset>> {
    let options = ScanOptions {
        max_depth: state.config().media.scan_max_depth,
        max_entries: state.config().media.scan_max_entries,
    };
    let deadline = Duration::from_millis(state.config().media.scan_timeout_ms);

    let walk = tokio::task::spawn_blocking(move || scan::scan(&roots, &options));
    let listing = tokio::time::timeout(deadline, walk)
        .await
        .map_err(|_| GatewayError::Timeout("media scan"))?
        .map_err(|e| GatewayError::Internal(format!("scan task failed: {e}")))?;
    Ok(listing)
}
