//! dojo-gateway: media asset gateway for the club site
//!
//! The front door for every HTTP request to the site. Each request is
//! classified into exactly one of three outcomes:
//!
//! 1. **Local media API**: listing, upload, and delete of media files,
//!    handled entirely in-process against the filesystem (no database).
//! 2. **Backend proxy**: the admin UI (`/_`) and the rest of the `/api`
//!    surface are forwarded unmodified to the backend origin.
//! 3. **Static chain**: everything else is resolved against an ordered
//!    list of static roots (build output, bundled media, persistent
//!    volume); the first root containing the file serves it.
//!
//! The media store is the union of an ephemeral build-time root and a
//! persistent runtime root, reconciled without a database: scanning
//! deduplicates by relative path (last root wins), uploads never overwrite
//! (timestamp suffix on collision), and deletes resolve organized-layout
//! paths before legacy flat ones.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dojo_gateway::{config::GatewayConfig, state::AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     dojo_gateway::observability::init()?;
//!
//!     let config = GatewayConfig::load()?;
//!     let port = config.server.port;
//!     let state = AppState::new(config)?;
//!     let app = dojo_gateway::router(state);
//!
//!     let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod media;
pub mod observability;
pub mod proxy;
pub mod state;
pub mod static_files;

use axum::extract::DefaultBodyLimit;
use axum::routing::{any, get, post};
use axum::Router;
use state::AppState;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

/// Builds the gateway router
///
/// Route precedence mirrors the classification contract: the four local
/// media routes are matched exactly, the `/api` and `/_` catch-alls
/// forward to the backend, and the fallback runs the static chain.
#[must_use]
pub fn router(state: AppState) -> Router {
    let body_limit = state.config().media.max_upload_bytes;

    Router::new()
        .route("/api/media", get(handlers::list_media))
        .route("/api/local-media", get(handlers::list_local_media))
        .route("/api/upload", post(handlers::upload_media))
        .route("/api/delete-media", post(handlers::delete_media))
        .route("/api", any(proxy::forward))
        .route("/api/{*rest}", any(proxy::forward))
        .route("/_", any(proxy::forward))
        .route("/_/{*rest}", any(proxy::forward))
        .fallback(static_files::fallback)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
