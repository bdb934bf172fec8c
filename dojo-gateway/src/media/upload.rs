//! Upload persistence
//!
//! Takes the binary payload from the multipart endpoint, resolves the
//! destination folder (explicit hint first, then the classifier's default
//! for the extension), and writes the file under a collision-safe name.
//!
//! Collision handling appends the millisecond epoch to the name when the
//! sanitized name already exists. This is best-effort uniqueness, not a
//! transaction: two concurrent uploads of the same name can still race
//! between the existence check and the write. Accepted limitation; a
//! stronger design would rename into place atomically.

use super::classify;
use crate::error::{GatewayError, GatewayResult};
use std::path::Path;
use tokio::fs;

/// Result of a persisted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Public URL of the stored file (`/media/...`)
    pub url: String,
    /// Path relative to the destination root (`<folder>/<name>` or `<name>`)
    pub relative_path: String,
}

/// Sanitizes a client-declared file name
///
/// Keeps only the final path component (clients may send full paths),
/// lower-cases it, and collapses whitespace runs into single dashes.
/// Returns `None` when nothing usable remains.
#[must_use]
pub fn sanitize_file_name(declared: &str) -> Option<String> {
    let base = declared
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(declared)
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }

    let mut sanitized = String::with_capacity(base.len());
    let mut in_whitespace = false;
    for ch in base.to_lowercase().chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                sanitized.push('-');
                in_whitespace = true;
            }
        } else {
            sanitized.push(ch);
            in_whitespace = false;
        }
    }
    Some(sanitized)
}

/// Persists an upload under `root`, returning its public URL and stored path
///
/// The destination root is resolved once by the caller (production writes
/// to the persistent volume, development to the local root) and used here
/// for both the existence check and the write.
///
/// # Errors
///
/// Returns [`GatewayError::Validation`] for an empty payload, an unusable
/// declared name, or a traversal attempt in the folder hint, and
/// [`GatewayError::Io`] when the filesystem write fails.
pub async fn store(
    root: &Path,
    bytes: &[u8],
    declared_name: &str,
    folder_hint: Option<&str>,
) -> GatewayResult<StoredUpload> {
    if bytes.is_empty() {
        return Err(GatewayError::Validation("No file provided".to_string()));
    }

    let file_name = sanitize_file_name(declared_name)
        .ok_or_else(|| GatewayError::Validation("Invalid file name".to_string()))?;

    let folder = resolve_folder(&file_name, folder_hint)?;

    let target_dir = if folder.is_empty() {
        root.to_path_buf()
    } else {
        root.join(&folder)
    };
    fs::create_dir_all(&target_dir)
        .await
        .map_err(|e| GatewayError::io("create upload directory", &target_dir, e))?;

    // Never overwrite: a name clash gets the millisecond epoch appended
    // before the extension. The check and the write are separate syscalls,
    // so a concurrent identical upload can still slip between them.
    let mut final_name = file_name.clone();
    let first_choice = target_dir.join(&file_name);
    let exists = fs::try_exists(&first_choice)
        .await
        .map_err(|e| GatewayError::io("check upload destination", &first_choice, e))?;
    if exists {
        final_name = timestamped_name(&file_name);
    }

    let final_path = target_dir.join(&final_name);
    fs::write(&final_path, bytes)
        .await
        .map_err(|e| GatewayError::io("write upload", &final_path, e))?;

    tracing::info!(path = %final_path.display(), bytes = bytes.len(), "stored upload");

    let relative_path = if folder.is_empty() {
        final_name
    } else {
        format!("{folder}/{final_name}")
    };
    Ok(StoredUpload {
        url: format!("/media/{relative_path}"),
        relative_path,
    })
}

/// Resolves the destination subfolder: explicit hint first, classifier default second
fn resolve_folder(file_name: &str, folder_hint: Option<&str>) -> GatewayResult<String> {
    let hint = folder_hint.unwrap_or("").trim().trim_matches('/');
    if !hint.is_empty() {
        if hint.contains("..") {
            return Err(GatewayError::Validation("Invalid folder".to_string()));
        }
        return Ok(hint.to_string());
    }

    let folder = classify::extension_of(file_name)
        .as_deref()
        .and_then(classify::default_folder)
        .unwrap_or("");
    Ok(folder.to_string())
}

/// Appends the current millisecond epoch before the extension
fn timestamped_name(file_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{millis}.{ext}"),
        _ => format!("{file_name}-{millis}"),
    }
}
