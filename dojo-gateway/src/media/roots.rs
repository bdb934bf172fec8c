//! Storage root resolution
//!
//! The logical media store is the union of up to two filesystem roots with
//! different lifetimes: the ephemeral root is bundled with each deployment
//! (`dist/media`, read-mostly) and the persistent root survives deployments
//! (the mounted volume, read-write). Development runs with a single local
//! root under `public/media`.
//!
//! Every component that touches the filesystem resolves its paths through
//! [`RootSet`] so that listing, upload, and delete all agree on which
//! directories are in play for the current environment.

use crate::config::{Environment, GatewayConfig};
use std::path::{Path, PathBuf};

/// Resolved storage roots for one deployment environment
#[derive(Debug, Clone)]
pub struct RootSet {
    environment: Environment,
    /// Ephemeral media directory bundled with the build
    ephemeral_media: PathBuf,
    /// Persistent volume root (production only)
    persistent: PathBuf,
    /// Development media directory
    dev_media: PathBuf,
}

impl RootSet {
    /// Derives the root set from configuration
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            environment: config.environment,
            ephemeral_media: config.media.dist_dir.join("media"),
            persistent: config.media.persistent_dir.clone(),
            dev_media: config.media.public_dir.join("media"),
        }
    }

    /// Ordered roots for a full media scan
    ///
    /// Scan order encodes precedence: when two roots contain the same
    /// relative path, the scanner's dedup map keeps the entry from the
    /// **last** root listed here. Production lists the ephemeral root first
    /// and the persistent root second, so persistent files shadow bundled
    /// ones in listings.
    #[must_use]
    pub fn scan_roots(&self) -> Vec<PathBuf> {
        match self.environment {
            Environment::Production => {
                vec![self.ephemeral_media.clone(), self.persistent.clone()]
            }
            Environment::Development => vec![self.dev_media.clone()],
        }
    }

    /// Single root for the backward-compatible `/api/local-media` listing
    #[must_use]
    pub fn local_scan_roots(&self) -> Vec<PathBuf> {
        match self.environment {
            Environment::Production => vec![self.ephemeral_media.clone()],
            Environment::Development => vec![self.dev_media.clone()],
        }
    }

    /// Destination root for uploads
    ///
    /// Production writes go under the persistent volume's organized `media/`
    /// subtree (they must survive the next deployment); development writes
    /// go to the local dev root. The caller resolves this once per request
    /// and uses the same root for both the existence check and the write.
    #[must_use]
    pub fn upload_root(&self) -> PathBuf {
        match self.environment {
            Environment::Production => self.persistent.join("media"),
            Environment::Development => self.dev_media.clone(),
        }
    }

    /// Candidate absolute paths for deleting `relative_name`, in resolution order
    ///
    /// Production tries the organized `media/` subtree of the persistent
    /// volume first, then falls back to the volume root for legacy flat
    /// layouts (folders like `audio/`, `bacheca/` created before the
    /// reorganization). Development resolves only under the dev root.
    ///
    /// The caller is responsible for validating `relative_name` against
    /// traversal before this is invoked.
    #[must_use]
    pub fn delete_candidates(&self, relative_name: &str) -> Vec<PathBuf> {
        // Leading slashes would make `join` replace the base path entirely;
        // treat the input as relative no matter how it is spelled.
        let relative_name = relative_name.trim_start_matches('/');
        match self.environment {
            Environment::Production => vec![
                self.persistent.join("media").join(relative_name),
                self.persistent.join(relative_name),
            ],
            Environment::Development => vec![self.dev_media.join(relative_name)],
        }
    }

    /// The configured environment
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// The ephemeral (bundled) media directory
    #[must_use]
    pub fn ephemeral_media(&self) -> &Path {
        &self.ephemeral_media
    }

    /// The persistent volume root
    #[must_use]
    pub fn persistent(&self) -> &Path {
        &self.persistent
    }

    /// The development media directory
    #[must_use]
    pub fn dev_media(&self) -> &Path {
        &self.dev_media
    }
}
