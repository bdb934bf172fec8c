//! Media deletion
//!
//! Validates the caller-supplied relative name before any filesystem path
//! is built, then resolves it against the environment's roots in a defined
//! precedence and removes the first match. Deleting something that is
//! already gone reports not-found instead of failing: the operation is
//! idempotent from the caller's point of view.

use super::roots::RootSet;
use crate::error::{GatewayError, GatewayResult};
use tokio::fs;

/// Rejects empty names and traversal attempts
///
/// Must run before any path is constructed. The `..` substring check is
/// deliberately blunt: a relative name has no legitimate use for it.
pub fn validate_file_name(file_name: &str) -> GatewayResult<()> {
    if file_name.trim().is_empty() {
        return Err(GatewayError::Validation("No filename provided".to_string()));
    }
    if file_name.contains("..") {
        return Err(GatewayError::Validation("Invalid filename".to_string()));
    }
    Ok(())
}

/// Removes `file_name` from the first root candidate that contains it
///
/// Directories are never pruned; an empty folder left behind is acceptable.
///
/// # Errors
///
/// [`GatewayError::Validation`] for invalid input, [`GatewayError::NotFound`]
/// when no candidate exists, [`GatewayError::Io`] when the unlink fails.
pub async fn remove(roots: &RootSet, file_name: &str) -> GatewayResult<()> {
    validate_file_name(file_name)?;

    for candidate in roots.delete_candidates(file_name) {
        let exists = fs::try_exists(&candidate)
            .await
            .map_err(|e| GatewayError::io("check delete target", &candidate, e))?;
        if !exists {
            continue;
        }
        fs::remove_file(&candidate)
            .await
            .map_err(|e| GatewayError::io("delete media file", &candidate, e))?;
        tracing::info!(path = %candidate.display(), "deleted media file");
        return Ok(());
    }

    Err(GatewayError::NotFound("File not found".to_string()))
}
