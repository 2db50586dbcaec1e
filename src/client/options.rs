//! Connection options and configuration.
//!
//! Provides a type-safe interface for the timeouts, target selection and
//! listener error reporting used when attaching to a target.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use devtools_bridge::{ConnectOptions, TargetFilter};
//!
//! let options = ConnectOptions::new()
//!     .with_handshake_timeout(Duration::from_secs(3))
//!     .with_command_timeout(Some(Duration::from_secs(30)))
//!     .with_target_filter(TargetFilter::page().attachable().url_excludes("background"));
//! ```
//!
//! # Environment
//!
//! [`ConnectOptions::from_env`] overlays these variables on the defaults:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `DEVTOOLS_HANDSHAKE_TIMEOUT_MS` | WebSocket handshake timeout |
//! | `DEVTOOLS_COMMAND_TIMEOUT_MS` | Default command timeout (`0` = none) |
//! | `DEVTOOLS_DISCOVERY_TIMEOUT_MS` | HTTP discovery timeout |

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::discovery::{DEFAULT_DISCOVERY_TIMEOUT, TargetFilter};
use crate::error::{Error, Result};
use crate::transport::{ErrorReporter, log_reporter};

// ============================================================================
// Constants
// ============================================================================

/// Default WebSocket handshake timeout.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-command timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable names.
const ENV_HANDSHAKE_TIMEOUT: &str = "DEVTOOLS_HANDSHAKE_TIMEOUT_MS";
const ENV_COMMAND_TIMEOUT: &str = "DEVTOOLS_COMMAND_TIMEOUT_MS";
const ENV_DISCOVERY_TIMEOUT: &str = "DEVTOOLS_DISCOVERY_TIMEOUT_MS";

// ============================================================================
// ConnectOptions
// ============================================================================

/// Options for discovering and attaching to a target.
#[derive(Clone)]
pub struct ConnectOptions {
    /// Upper bound on the WebSocket handshake.
    pub handshake_timeout: Duration,

    /// Deadline for commands issued without an explicit timeout.
    ///
    /// `None` waits indefinitely.
    pub command_timeout: Option<Duration>,

    /// HTTP timeout for discovery requests.
    pub discovery_timeout: Duration,

    /// Which target [`crate::connect`] attaches to.
    pub target_filter: TargetFilter,

    /// Receives listener failures; logs them when unset.
    error_reporter: Option<ErrorReporter>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("handshake_timeout", &self.handshake_timeout)
            .field("command_timeout", &self.command_timeout)
            .field("discovery_timeout", &self.discovery_timeout)
            .field("target_filter", &self.target_filter.to_string())
            .field("error_reporter", &self.error_reporter.is_some())
            .finish()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ConnectOptions {
    /// Creates options with default settings.
    ///
    /// Attaches to the first attachable page target.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            target_filter: TargetFilter::page().attachable(),
            error_reporter: None,
        }
    }

    /// Creates default options overlaid with `DEVTOOLS_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set but not a number.
    pub fn from_env() -> Result<Self> {
        Self::new().with_overrides(|name| env::var(name).ok())
    }

    /// Applies overrides looked up through `lookup`.
    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = parse_millis(ENV_HANDSHAKE_TIMEOUT, lookup(ENV_HANDSHAKE_TIMEOUT))? {
            self.handshake_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_millis(ENV_COMMAND_TIMEOUT, lookup(ENV_COMMAND_TIMEOUT))? {
            self.command_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(ms) = parse_millis(ENV_DISCOVERY_TIMEOUT, lookup(ENV_DISCOVERY_TIMEOUT))? {
            self.discovery_timeout = Duration::from_millis(ms);
        }
        Ok(self)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectOptions {
    /// Sets the WebSocket handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the default command timeout (`None` = wait indefinitely).
    #[inline]
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the discovery HTTP timeout.
    #[inline]
    #[must_use]
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Sets the filter used to pick a target.
    #[inline]
    #[must_use]
    pub fn with_target_filter(mut self, filter: TargetFilter) -> Self {
        self.target_filter = filter;
        self
    }

    /// Routes listener failures to `reporter`.
    #[inline]
    #[must_use]
    pub fn with_error_reporter<F>(mut self, reporter: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.error_reporter = Some(Arc::new(reporter));
        self
    }

    /// Returns the configured reporter, or the logging default.
    #[must_use]
    pub(crate) fn error_reporter(&self) -> ErrorReporter {
        self.error_reporter.clone().unwrap_or_else(log_reporter)
    }
}

/// Parses an optional millisecond value.
fn parse_millis(name: &str, raw: Option<String>) -> Result<Option<u64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|e| Error::config(format!("{name}={raw:?}: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
