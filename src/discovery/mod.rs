//! HTTP target discovery.
//!
//! A debugging host (Chrome, Electron with `--remote-debugging-port`)
//! lists its attachable targets at `http://host:port/json/list`.
//!
//! # Example
//!
//! ```no_run
//! use devtools_bridge::{Discovery, TargetFilter};
//!
//! # async fn example() -> devtools_bridge::Result<()> {
//! let discovery = Discovery::new("127.0.0.1", 9222)?;
//! let targets = discovery.list_targets().await?;
//! let page = TargetFilter::page().attachable().find(&targets);
//! # Ok(())
//! # }
//! ```
//!
//! No retries and no caching: call again for a fresh listing.

// ============================================================================
// Submodules
// ============================================================================

/// Target selection predicates.
pub mod filter;

/// Target and version models.
pub mod target;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Re-exports
// ============================================================================

pub use filter::TargetFilter;
pub use target::{BrowserVersion, Target, TargetType};

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP timeout for discovery requests.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Target listing path.
const LIST_PATH: &str = "json/list";

/// Version path.
const VERSION_PATH: &str = "json/version";

// ============================================================================
// Discovery
// ============================================================================

/// Client for a debugging host's HTTP discovery endpoint.
#[derive(Debug, Clone)]
pub struct Discovery {
    /// `http://host:port/`
    base: Url,
    /// Reusable HTTP client.
    http: reqwest::Client,
}

impl Discovery {
    /// Creates a discovery client with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if host/port do not form a URL.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_timeout(host, port, DEFAULT_DISCOVERY_TIMEOUT)
    }

    /// Creates a discovery client with a custom request timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if host/port do not form a URL
    /// - [`Error::Config`] if the HTTP client cannot be built
    pub fn with_timeout(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let base = base_url(host, port)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("HTTP client: {e}")))?;

        Ok(Self { base, http })
    }

    /// Returns the `http://host:port/` base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Lists all targets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] on network failure, non-2xx status
    /// or a body that is not a JSON array of targets.
    pub async fn list_targets(&self) -> Result<Vec<Target>> {
        let targets: Vec<Target> = self.get_json(LIST_PATH).await?;
        debug!(count = targets.len(), endpoint = %self.base, "Targets discovered");
        Ok(targets)
    }

    /// Lists targets and returns the first one matching `filter`.
    ///
    /// `Ok(None)` when nothing matches.
    ///
    /// # Errors
    ///
    /// Same as [`Discovery::list_targets`].
    pub async fn find(&self, filter: &TargetFilter) -> Result<Option<Target>> {
        let targets = self.list_targets().await?;
        Ok(filter.find(&targets).cloned())
    }

    /// Fetches browser version information.
    ///
    /// # Errors
    ///
    /// Same as [`Discovery::list_targets`].
    pub async fn version(&self) -> Result<BrowserVersion> {
        self.get_json(VERSION_PATH).await
    }

    /// GETs `path` and decodes the body as JSON.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let endpoint = self
            .base
            .join(path)
            .map_err(|e| Error::invalid_argument(format!("discovery path {path}: {e}")))?;

        let response = self
            .http
            .get(endpoint.clone())
            .send()
            .await
            .map_err(|e| Error::discovery(endpoint.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::discovery(endpoint.as_str(), format!("HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::discovery(endpoint.as_str(), e.to_string()))?;

        serde_json::from_slice(&body)
            .map_err(|e| Error::discovery(endpoint.as_str(), format!("invalid JSON: {e}")))
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Lists the targets of `host:port` with a one-off discovery client.
///
/// # Errors
///
/// Returns [`Error::Discovery`] on network or decode failure.
pub async fn list_targets(host: &str, port: u16) -> Result<Vec<Target>> {
    Discovery::new(host, port)?.list_targets().await
}

/// Returns the first target satisfying `predicate`.
///
/// Pure helper: never fails, `None` means "not found".
pub fn find_target<P>(targets: &[Target], mut predicate: P) -> Option<&Target>
where
    P: FnMut(&Target) -> bool,
{
    targets.iter().find(|target| predicate(target))
}

/// Builds `http://host:port/`.
fn base_url(host: &str, port: u16) -> Result<Url> {
    if host.is_empty() {
        return Err(Error::invalid_argument("discovery host is empty"));
    }
    Url::parse(&format!("http://{host}:{port}/"))
        .map_err(|e| Error::invalid_argument(format!("discovery address {host}:{port}: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
