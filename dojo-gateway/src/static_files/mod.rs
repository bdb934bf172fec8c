//! Static asset serving across an ordered mount chain
//!
//! Requests that are neither local API nor proxied to the backend are
//! resolved against an ordered list of static mounts: the compiled build
//! output, the read-only media directory bundled with the image, and (in
//! production) the persistent volume. The **first** mount that contains a
//! matching file serves it.
//!
//! Note the precedence direction: static serving is first-match-wins
//! because each layer only activates when the previous one did not resolve
//! the path. The media scanner's dedup is the opposite (last root wins,
//! it overwrites map entries). Both directions are load-bearing: changing
//! either changes which physical file a given URL resolves to.

use crate::config::{Environment, GatewayConfig};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, IF_NONE_MATCH,
    IF_RANGE, LAST_MODIFIED, RANGE,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

/// Cache behavior for a static mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Content-hashed build output: cache for a year, immutable
    Immutable,
    /// Mutable media: clients must revalidate
    Revalidate,
}

impl CachePolicy {
    fn header_value(self) -> &'static str {
        match self {
            Self::Immutable => "public, max-age=31536000, immutable",
            Self::Revalidate => "public, max-age=0",
        }
    }
}

/// One static mount: a URL prefix mapped onto a directory
#[derive(Debug, Clone)]
struct Mount {
    prefix: &'static str,
    dir: PathBuf,
    cache: CachePolicy,
}

/// Ordered static mount chain; first match wins
#[derive(Debug, Clone)]
pub struct StaticChain {
    mounts: Vec<Mount>,
}

impl StaticChain {
    /// Builds the mount chain for the configured environment
    ///
    /// Order (first match wins):
    /// 1. `/build` → `<dist>/build` (immutable build output)
    /// 2. `/` → `<dist>` (bundled static files)
    /// 3. `/media` → `<dist>/media` (read-only bundled media)
    /// 4. production only: `/media` → `<persistent>/media`, then the
    ///    persistent volume root for legacy flat layouts
    ///
    /// Development additionally mounts `/media` onto the local dev root so
    /// fresh uploads are servable without a build step.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        let dist = &config.media.dist_dir;
        let mut mounts = vec![
            Mount {
                prefix: "/build",
                dir: dist.join("build"),
                cache: CachePolicy::Immutable,
            },
            Mount {
                prefix: "",
                dir: dist.clone(),
                cache: CachePolicy::Revalidate,
            },
            Mount {
                prefix: "/media",
                dir: dist.join("media"),
                cache: CachePolicy::Revalidate,
            },
        ];
        match config.environment {
            Environment::Production => {
                mounts.push(Mount {
                    prefix: "/media",
                    dir: config.media.persistent_dir.join("media"),
                    cache: CachePolicy::Revalidate,
                });
                mounts.push(Mount {
                    prefix: "/media",
                    dir: config.media.persistent_dir.clone(),
                    cache: CachePolicy::Revalidate,
                });
            }
            Environment::Development => {
                mounts.push(Mount {
                    prefix: "/media",
                    dir: config.media.public_dir.join("media"),
                    cache: CachePolicy::Revalidate,
                });
            }
        }
        Self { mounts }
    }

    /// Candidate filesystem paths for a request path, in serving order
    ///
    /// Pure path arithmetic, no I/O: traversal or undecodable paths yield
    /// no candidates, hidden files (leading dot in any component) are never
    /// served.
    #[must_use]
    pub fn candidates(&self, request_path: &str) -> Vec<(PathBuf, CachePolicy)> {
        let Some(decoded) = percent_decode_str(request_path)
            .decode_utf8()
            .ok()
            .map(|p| p.into_owned())
        else {
            return Vec::new();
        };
        if !is_safe_path(&decoded) {
            return Vec::new();
        }

        let mut out = Vec::new();
        for mount in &self.mounts {
            let Some(rest) = strip_mount_prefix(&decoded, mount.prefix) else {
                continue;
            };
            if rest.is_empty() {
                // Directory requests are page routing's problem, not ours
                continue;
            }
            out.push((mount.dir.join(rest), mount.cache));
        }
        out
    }

    /// Serves the first candidate that exists as a regular file
    ///
    /// Supports conditional GET (ETag revalidation via `If-None-Match`) and
    /// single byte ranges (`Range`/`If-Range`, 206 responses) so audio and
    /// video playback can seek. Returns `None` when no mount resolves the
    /// path; the caller then falls through to its not-found behavior.
    pub async fn serve(
        &self,
        method: &Method,
        request_path: &str,
        headers: &HeaderMap,
    ) -> Option<Response> {
        if method != Method::GET && method != Method::HEAD {
            return None;
        }

        for (path, cache) in self.candidates(request_path) {
            let Ok(metadata) = fs::metadata(&path).await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }

            let len = metadata.len();
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let mtime_secs = modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let etag = format!("\"{len:x}-{mtime_secs:x}\"");

            if let Some(if_none_match) = headers.get(IF_NONE_MATCH) {
                if if_none_match
                    .to_str()
                    .is_ok_and(|v| if_none_match_covers(v, &etag))
                {
                    return Some((StatusCode::NOT_MODIFIED, ()).into_response());
                }
            }

            let content_type = mime_guess::from_path(&path)
                .first_or_octet_stream()
                .to_string();

            // A stale If-Range validator downgrades the range request to a
            // full response instead of serving bytes of a changed file.
            if method == Method::GET {
                if let Some(range_header) = headers.get(RANGE) {
                    if if_range_matches(headers, &etag) {
                        match byte_range(range_header, len) {
                            Ok((start, end)) => {
                                let Some(bytes) = read_range(&path, start, end).await else {
                                    continue;
                                };
                                let content_range = format!("bytes {start}-{end}/{len}");
                                return Some(build_file_response(
                                    Body::from(bytes),
                                    end - start + 1,
                                    &etag,
                                    &content_type,
                                    cache,
                                    modified,
                                    Some(&content_range),
                                ));
                            }
                            Err(RangeError::Unsatisfiable) => {
                                let response = Response::builder()
                                    .status(StatusCode::RANGE_NOT_SATISFIABLE)
                                    .header(CONTENT_RANGE, format!("bytes */{len}"))
                                    .body(Body::empty())
                                    .unwrap_or_else(|_| Response::new(Body::empty()));
                                return Some(response);
                            }
                            Err(RangeError::Malformed) => {
                                return Some(
                                    (StatusCode::BAD_REQUEST, "Invalid range request")
                                        .into_response(),
                                );
                            }
                        }
                    }
                }
            }

            let body = if method == Method::HEAD {
                Body::empty()
            } else {
                match fs::read(&path).await {
                    Ok(bytes) => Body::from(bytes),
                    Err(error) => {
                        tracing::warn!(path = %path.display(), %error, "static file vanished mid-request");
                        continue;
                    }
                }
            };

            return Some(build_file_response(
                body,
                len,
                &etag,
                &content_type,
                cache,
                modified,
                None,
            ));
        }
        None
    }
}

/// Builds a static file response with content, cache, and range headers
fn build_file_response(
    body: Body,
    content_length: u64,
    etag: &str,
    content_type: &str,
    cache: CachePolicy,
    modified: SystemTime,
    content_range: Option<&str>,
) -> Response {
    let status = if content_range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(ETAG, etag)
        .header(ACCEPT_RANGES, "bytes")
        .header(CACHE_CONTROL, cache.header_value())
        .header(LAST_MODIFIED, httpdate::fmt_http_date(modified));
    if let Some(content_range) = content_range {
        builder = builder.header(CONTENT_RANGE, content_range);
    }
    builder
        .body(body)
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// `If-None-Match` may carry a comma-separated validator list or `*`
fn if_none_match_covers(header: &str, etag: &str) -> bool {
    header
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || candidate == etag)
}

/// `If-Range` gate: absent means proceed, present must name the current ETag
fn if_range_matches(headers: &HeaderMap, etag: &str) -> bool {
    match headers.get(IF_RANGE) {
        None => true,
        Some(value) => value.to_str().is_ok_and(|v| v == etag),
    }
}

/// Outcome of parsing an unusable `Range` header
enum RangeError {
    /// Not a single `bytes=` range
    Malformed,
    /// Valid syntax, but no byte of the file satisfies it
    Unsatisfiable,
}

/// Parses a single `bytes=` range against the file size
///
/// Returns the inclusive `(start, end)` byte positions. Suffix ranges
/// (`bytes=-500`) and open-ended ranges (`bytes=500-`) are supported;
/// multi-range requests are not and read as malformed.
fn byte_range(header: &HeaderValue, file_size: u64) -> Result<(u64, u64), RangeError> {
    let spec = header.to_str().map_err(|_| RangeError::Malformed)?;
    let spec = spec.strip_prefix("bytes=").ok_or(RangeError::Malformed)?;
    if spec.contains(',') {
        return Err(RangeError::Malformed);
    }
    let (start_str, end_str) = spec.split_once('-').ok_or(RangeError::Malformed)?;

    if file_size == 0 {
        return Err(RangeError::Unsatisfiable);
    }

    let (start, end) = if start_str.is_empty() {
        // Suffix range: the last N bytes, clamped to the file size
        let suffix: u64 = end_str.parse().map_err(|_| RangeError::Malformed)?;
        if suffix == 0 {
            return Err(RangeError::Unsatisfiable);
        }
        (file_size.saturating_sub(suffix), file_size - 1)
    } else {
        let start: u64 = start_str.parse().map_err(|_| RangeError::Malformed)?;
        let end = if end_str.is_empty() {
            file_size - 1
        } else {
            end_str
                .parse::<u64>()
                .map_err(|_| RangeError::Malformed)?
                .min(file_size - 1)
        };
        (start, end)
    };

    if start > end || start >= file_size {
        return Err(RangeError::Unsatisfiable);
    }
    Ok((start, end))
}

/// Reads an inclusive byte range without buffering the whole file
async fn read_range(path: &Path, start: u64, end: u64) -> Option<Vec<u8>> {
    use tokio::io::{AsyncReadExt, AsyncSeekExt};

    let mut file = fs::File::open(path).await.ok()?;
    file.seek(std::io::SeekFrom::Start(start)).await.ok()?;
    let length = usize::try_from(end - start + 1).ok()?;
    let mut buffer = vec![0u8; length];
    file.read_exact(&mut buffer).await.ok()?;
    Some(buffer)
}

/// Fallback handler: run the static chain, 404 otherwise
///
/// Page routing and the application's own not-found rendering are an
/// external collaborator; from the gateway's point of view an unresolved
/// path is simply 404.
pub async fn fallback(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    if let Some(response) = state
        .statics()
        .serve(request.method(), &path, request.headers())
        .await
    {
        return response;
    }
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Rejects traversal components and hidden files
fn is_safe_path(path: &str) -> bool {
    path.split('/')
        .all(|component| component.is_empty() || !component.starts_with('.'))
}

/// Strips a mount prefix on a segment boundary
///
/// `/build` matches `/build/q.js` but not `/builder.js`. Returns the
/// remainder without its leading slash.
fn strip_mount_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path.trim_start_matches('/'));
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn prod_chain(temp: &TempDir) -> StaticChain {
        let mut config = GatewayConfig::default();
        config.environment = Environment::Production;
        config.media.dist_dir = temp.path().join("dist");
        config.media.persistent_dir = temp.path().join("volume");
        StaticChain::from_config(&config)
    }

    #[test]
    fn candidate_order_is_bundled_before_persistent() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);

        let candidates = chain.candidates("/media/foto.jpg");
        let paths: Vec<_> = candidates.iter().map(|(p, _)| p.clone()).collect();

        // Configured order: dist (via the root mount), dist/media, then the
        // persistent volume's media/ subtree, then its flat root. The first
        // existing file in this order is served.
        assert_eq!(
            paths,
            vec![
                temp.path().join("dist/media/foto.jpg"),
                temp.path().join("dist/media/foto.jpg"),
                temp.path().join("volume/media/foto.jpg"),
                temp.path().join("volume/foto.jpg"),
            ]
        );
    }

    #[test]
    fn build_mount_is_immutable() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);

        let candidates = chain.candidates("/build/q-abc123.js");
        assert_eq!(candidates[0].1, CachePolicy::Immutable);
        assert_eq!(candidates[0].0, temp.path().join("dist/build/q-abc123.js"));
    }

    #[test]
    fn prefix_matching_respects_segment_boundaries() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);

        let candidates = chain.candidates("/builder.js");
        // Only the dist root mount applies, not /build
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].0, temp.path().join("dist/builder.js"));
    }

    #[test]
    fn traversal_yields_no_candidates() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);

        assert!(chain.candidates("/media/../gateway.toml").is_empty());
        assert!(chain.candidates("/media/%2e%2e/secret").is_empty());
        assert!(chain.candidates("/media/.hidden.jpg").is_empty());
    }

    #[tokio::test]
    async fn first_existing_mount_wins() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);

        // Same relative path exists in both the bundled and persistent roots
        std_fs::create_dir_all(temp.path().join("dist/media")).unwrap();
        std_fs::create_dir_all(temp.path().join("volume/media")).unwrap();
        std_fs::write(temp.path().join("dist/media/logo.png"), b"bundled").unwrap();
        std_fs::write(temp.path().join("volume/media/logo.png"), b"persistent").unwrap();

        let response = chain
            .serve(&Method::GET, "/media/logo.png", &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        // Bundled root is checked first in the configured order, so its
        // content is served even though the scanner's listing prefers the
        // persistent copy.
        assert_eq!(&body[..], b"bundled");
    }

    #[tokio::test]
    async fn falls_through_to_later_mounts() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);

        std_fs::create_dir_all(temp.path().join("volume/audio")).unwrap();
        std_fs::write(temp.path().join("volume/audio/sigla.mp3"), b"flat").unwrap();

        let response = chain
            .serve(&Method::GET, "/media/audio/sigla.mp3", &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "audio/mpeg"
        );
    }

    #[tokio::test]
    async fn missing_file_returns_none() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);

        let response = chain
            .serve(&Method::GET, "/media/nope.png", &HeaderMap::new())
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn etag_revalidation_returns_304() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);

        std_fs::create_dir_all(temp.path().join("dist/media")).unwrap();
        std_fs::write(temp.path().join("dist/media/logo.png"), b"x").unwrap();

        let first = chain
            .serve(&Method::GET, "/media/logo.png", &HeaderMap::new())
            .await
            .unwrap();
        let etag = first.headers().get(ETAG).unwrap().clone();

        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, etag);
        let second = chain
            .serve(&Method::GET, "/media/logo.png", &headers)
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn head_requests_omit_the_body() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);

        std_fs::create_dir_all(temp.path().join("dist/build")).unwrap();
        std_fs::write(temp.path().join("dist/build/q.js"), b"console.log(1)").unwrap();

        let response = chain
            .serve(&Method::HEAD, "/build/q.js", &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(response.headers().get(CONTENT_LENGTH).unwrap(), "14");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn if_none_match_accepts_a_validator_list() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);

        std_fs::create_dir_all(temp.path().join("dist/media")).unwrap();
        std_fs::write(temp.path().join("dist/media/logo.png"), b"x").unwrap();

        let first = chain
            .serve(&Method::GET, "/media/logo.png", &HeaderMap::new())
            .await
            .unwrap();
        let etag = first.headers().get(ETAG).unwrap().to_str().unwrap().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(
            IF_NONE_MATCH,
            HeaderValue::from_str(&format!("\"other\", {etag}")).unwrap(),
        );
        let listed = chain
            .serve(&Method::GET, "/media/logo.png", &headers)
            .await
            .unwrap();
        assert_eq!(listed.status(), StatusCode::NOT_MODIFIED);

        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("*"));
        let wildcard = chain
            .serve(&Method::GET, "/media/logo.png", &headers)
            .await
            .unwrap();
        assert_eq!(wildcard.status(), StatusCode::NOT_MODIFIED);
    }

    fn media_fixture(temp: &TempDir, name: &str, bytes: &[u8]) {
        std_fs::create_dir_all(temp.path().join("dist/media")).unwrap();
        std_fs::write(temp.path().join("dist/media").join(name), bytes).unwrap();
    }

    #[tokio::test]
    async fn range_request_returns_partial_content() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);
        let data = (0_u8..=255).cycle().take(1024).collect::<Vec<u8>>();
        media_fixture(&temp, "clip.mp4", &data);

        let mut headers = HeaderMap::new();
        headers.insert(RANGE, HeaderValue::from_static("bytes=0-99"));
        let response = chain
            .serve(&Method::GET, "/media/clip.mp4", &headers)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers().get(CONTENT_RANGE).unwrap(),
            "bytes 0-99/1024"
        );
        assert_eq!(response.headers().get(CONTENT_LENGTH).unwrap(), "100");
        assert_eq!(response.headers().get(ACCEPT_RANGES).unwrap(), "bytes");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], &data[0..100]);
    }

    #[tokio::test]
    async fn suffix_and_open_ended_ranges() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);
        media_fixture(&temp, "sigla.mp3", &[7u8; 1000]);

        let mut headers = HeaderMap::new();
        headers.insert(RANGE, HeaderValue::from_static("bytes=-100"));
        let suffix = chain
            .serve(&Method::GET, "/media/sigla.mp3", &headers)
            .await
            .unwrap();
        assert_eq!(suffix.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            suffix.headers().get(CONTENT_RANGE).unwrap(),
            "bytes 900-999/1000"
        );

        let mut headers = HeaderMap::new();
        headers.insert(RANGE, HeaderValue::from_static("bytes=800-"));
        let open = chain
            .serve(&Method::GET, "/media/sigla.mp3", &headers)
            .await
            .unwrap();
        assert_eq!(open.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            open.headers().get(CONTENT_RANGE).unwrap(),
            "bytes 800-999/1000"
        );
        assert_eq!(open.headers().get(CONTENT_LENGTH).unwrap(), "200");
    }

    #[tokio::test]
    async fn unsatisfiable_range_gets_416_with_file_size() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);
        media_fixture(&temp, "clip.mp4", &[42u8; 100]);

        let mut headers = HeaderMap::new();
        headers.insert(RANGE, HeaderValue::from_static("bytes=200-299"));
        let response = chain
            .serve(&Method::GET, "/media/clip.mp4", &headers)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(
            response.headers().get(CONTENT_RANGE).unwrap(),
            "bytes */100"
        );
    }

    #[tokio::test]
    async fn malformed_range_is_rejected() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);
        media_fixture(&temp, "clip.mp4", &[42u8; 100]);

        let mut headers = HeaderMap::new();
        headers.insert(RANGE, HeaderValue::from_static("pages=1-2"));
        let response = chain
            .serve(&Method::GET, "/media/clip.mp4", &headers)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stale_if_range_downgrades_to_the_full_file() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);
        media_fixture(&temp, "clip.mp4", &[42u8; 100]);

        let mut headers = HeaderMap::new();
        headers.insert(RANGE, HeaderValue::from_static("bytes=0-49"));
        headers.insert(IF_RANGE, HeaderValue::from_static("\"stale-etag\""));
        let response = chain
            .serve(&Method::GET, "/media/clip.mp4", &headers)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(CONTENT_RANGE));
        assert_eq!(response.headers().get(CONTENT_LENGTH).unwrap(), "100");
    }

    #[tokio::test]
    async fn post_is_not_served_statically() {
        let temp = TempDir::new().unwrap();
        let chain = prod_chain(&temp);

        std_fs::create_dir_all(temp.path().join("dist")).unwrap();
        std_fs::write(temp.path().join("dist/robots.txt"), b"x").unwrap();

        let response = chain
            .serve(&Method::POST, "/robots.txt", &HeaderMap::new())
            .await;
        assert!(response.is_none());
    }
}
