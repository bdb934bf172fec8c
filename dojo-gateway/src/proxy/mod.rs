//! Reverse proxy to the backend origin
//!
//! The admin UI (everything under `/_`) and the generic API surface
//! (everything under `/api` except the gateway's own media routes) are
//! forwarded unmodified to the configured backend origin. Method, headers,
//! and body pass through; the `Host` header is rewritten to the target so
//! the backend's cookie-based auth keeps working behind the gateway.
//!
//! The router holds no session state and classifies every request
//! independently; there is no connection affinity.

use crate::error::{GatewayError, GatewayResult};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, Response};

/// Route prefixes handled entirely in-process, never forwarded
pub const LOCAL_API_PREFIXES: &[&str] = &[
    "/api/local-media",
    "/api/media",
    "/api/upload",
    "/api/delete-media",
];

/// Hop-by-hop headers that must not be forwarded in either direction
///
/// A `static` array rather than a `const`: `HeaderName` is interior-mutable,
/// which rules out a `const` borrow of the table.
static HOP_BY_HOP: [HeaderName; 8] = [
    HeaderName::from_static("connection"),
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-authenticate"),
    HeaderName::from_static("proxy-authorization"),
    HeaderName::from_static("te"),
    HeaderName::from_static("trailer"),
    HeaderName::from_static("transfer-encoding"),
    HeaderName::from_static("upgrade"),
];

/// Whether a header must be dropped at the proxy hop
fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.iter().any(|h| h == name)
}

/// Whether a path belongs to the gateway's own media API
///
/// Prefix semantics, not exact match: `/api/media` and anything nested
/// under it is local and must never reach the backend.
#[must_use]
pub fn is_local_api(path: &str) -> bool {
    LOCAL_API_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Forwards a request to the backend origin
///
/// Registered as the catch-all for `/_` and `/api`. Paths under the local
/// API prefixes that reach this handler matched no local route, and they
/// are excluded from forwarding by contract, so they get a 404 here rather
/// than a trip to the backend.
///
/// # Errors
///
/// Returns [`GatewayError::Upstream`] (HTTP 502) when the backend cannot
/// be reached.
pub async fn forward(
    State(state): State<AppState>,
    request: Request,
) -> GatewayResult<Response<Body>> {
    let path = request.uri().path().to_string();
    if is_local_api(&path) {
        return Err(GatewayError::NotFound("Not found".to_string()));
    }

    let target = match request.uri().query() {
        Some(query) => format!("{}{}?{}", state.config().backend.origin, path, query),
        None => format!("{}{}", state.config().backend.origin, path),
    };
    tracing::debug!(%target, method = %request.method(), "forwarding to backend");

    let (parts, body) = request.into_parts();

    let upstream = state
        .http()
        .request(parts.method, &target)
        .headers(forwardable_headers(&parts.headers))
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send()
        .await?;

    let mut builder = Response::builder().status(upstream.status());
    for (name, value) in upstream.headers() {
        if !is_hop_by_hop(name) {
            builder = builder.header(name, value);
        }
    }
    let response = builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| GatewayError::Internal(format!("invalid upstream response: {e}")))?;
    Ok(response)
}

/// Strips hop-by-hop headers and `Host` (reqwest sets Host from the target URL)
fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if name == axum::http::header::HOST || is_hop_by_hop(name) {
            continue;
        }
        forwarded.insert(name.clone(), value.clone());
    }
    forwarded
}
