//! Configuration management for the gateway
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Deployment environment variables (`NODE_ENV`, `PORT`, `BACKEND_URL`)
//! 2. `GATEWAY_`-prefixed environment variables
//! 3. `./gateway.toml` (optional)
//! 4. Hardcoded defaults (fallback)
//!
//! The plain `NODE_ENV`/`PORT`/`BACKEND_URL` names are what the hosting
//! platform injects; they take priority so a container can be repointed
//! without editing files.
//!
//! # Example Configuration
//!
//! ```toml
//! # gateway.toml
//! [server]
//! port = 3000
//!
//! [backend]
//! origin = "http://127.0.0.1:8090"
//!
//! [media]
//! dist_dir = "./dist"
//! public_dir = "./public"
//! persistent_dir = "/app/pb_data"
//! scan_timeout_ms = 10000
//! ```

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Deployment environment, selected by `NODE_ENV`
///
/// Production deployments have two storage roots (an ephemeral bundled one
/// and a persistent volume); development has a single local root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Two-root production layout
    Production,
    /// Single-root local development layout
    Development,
}

impl Environment {
    /// Parses the `NODE_ENV` convention: `"production"` and everything else
    fn from_node_env(value: &str) -> Self {
        if value.eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    /// Whether this is the production environment
    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen port
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

/// Backend origin settings for the proxied admin/API surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Origin the admin UI and generic API traffic is forwarded to
    pub origin: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:8090".to_string(),
        }
    }
}

/// Media storage and scanning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Build output directory (rebuilt on every deployment)
    pub dist_dir: PathBuf,

    /// Development media root (the framework's `public/` directory)
    pub public_dir: PathBuf,

    /// Persistent volume root (survives deployments; production only)
    pub persistent_dir: PathBuf,

    /// Upper bound on a single listing scan, in milliseconds
    pub scan_timeout_ms: u64,

    /// Hard bound on directory recursion depth during a scan
    pub scan_max_depth: usize,

    /// Hard bound on entries visited during a scan
    pub scan_max_entries: usize,

    /// Maximum accepted upload body size in bytes
    pub max_upload_bytes: usize,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            dist_dir: PathBuf::from("./dist"),
            public_dir: PathBuf::from("./public"),
            persistent_dir: PathBuf::from("/app/pb_data"),
            scan_timeout_ms: 10_000,
            scan_max_depth: 32,
            scan_max_entries: 100_000,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Complete gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Deployment environment
    pub environment: Environment,

    /// HTTP server settings
    pub server: ServerSettings,

    /// Backend proxy settings
    pub backend: BackendSettings,

    /// Media storage settings
    pub media: MediaSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerSettings::default(),
            backend: BackendSettings::default(),
            media: MediaSettings::default(),
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from defaults, `gateway.toml`, and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file or environment variable is
    /// present but malformed (for example a non-numeric `PORT`).
    pub fn load() -> anyhow::Result<Self> {
        let mut config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file("gateway.toml"))
            .merge(Env::prefixed("GATEWAY_").split("__"))
            .extract()?;

        // Platform-injected variables win over everything else.
        if let Ok(node_env) = std::env::var("NODE_ENV") {
            config.environment = Environment::from_node_env(&node_env);
        }
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT is not a valid port number: {port}"))?;
        }
        if let Ok(origin) = std::env::var("BACKEND_URL") {
            config.backend.origin = origin;
        }

        Ok(config)
    }
}
