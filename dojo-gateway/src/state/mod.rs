//! Application state
//!
//! One shared, cloneable handle per process: configuration, the resolved
//! storage roots, the static mount chain, and the HTTP client used for the
//! backend proxy leg. There is no cross-request mutable state here; the
//! filesystem itself is the only thing requests share.

use crate::config::GatewayConfig;
use crate::media::RootSet;
use crate::static_files::StaticChain;
use std::sync::Arc;

/// Shared application state for the gateway
#[derive(Clone)]
pub struct AppState {
    config: Arc<GatewayConfig>,
    roots: Arc<RootSet>,
    statics: Arc<StaticChain>,
    http: reqwest::Client,
}

impl AppState {
    /// Builds state from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy HTTP client cannot be constructed.
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let roots = RootSet::from_config(&config);
        let statics = StaticChain::from_config(&config);
        // Redirects pass through to the browser untouched; following them
        // here would break the backend's auth flows.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            roots: Arc::new(roots),
            statics: Arc::new(statics),
            http,
        })
    }

    /// Gateway configuration
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Resolved storage roots
    #[must_use]
    pub fn roots(&self) -> &RootSet {
        &self.roots
    }

    /// Static mount chain
    #[must_use]
    pub fn statics(&self) -> &StaticChain {
        &self.statics
    }

    /// HTTP client for the backend proxy
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}
