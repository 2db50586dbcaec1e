//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use devtools_bridge::Client;
//!
//! # fn example() -> devtools_bridge::Result<()> {
//! let client = Client::builder()
//!     .host("127.0.0.1")
//!     .port(9222)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::discovery::{Discovery, TargetFilter};
use crate::error::{Error, Result};

use super::core::Client;
use super::options::ConnectOptions;

// ============================================================================
// Constants
// ============================================================================

/// Default debugging host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default remote debugging port (`--remote-debugging-port=9222`).
pub const DEFAULT_PORT: u16 = 9222;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    /// Debugging host.
    host: String,
    /// Debugging port.
    port: u16,
    /// Connection options.
    options: ConnectOptions,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            options: ConnectOptions::default(),
        }
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder for `127.0.0.1:9222` with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the debugging host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the debugging port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Replaces all connection options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ConnectOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the target filter used by [`Client::connect`].
    #[inline]
    #[must_use]
    pub fn target_filter(mut self, filter: TargetFilter) -> Self {
        self.options.target_filter = filter;
        self
    }

    /// Sets the default command timeout (`None` = wait indefinitely).
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.options.command_timeout = timeout;
        self
    }

    /// Sets the WebSocket handshake timeout.
    #[inline]
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.options.handshake_timeout = timeout;
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the host is empty or the port is 0
    /// - [`Error::Config`] if a timeout is zero
    pub fn build(self) -> Result<Client> {
        self.validate()?;
        let discovery =
            Discovery::with_timeout(&self.host, self.port, self.options.discovery_timeout)?;
        Ok(Client::new(self.host, self.port, discovery, self.options))
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("host must not be empty"));
        }
        if self.port == 0 {
            return Err(Error::config("port must not be 0"));
        }
        if self.options.handshake_timeout.is_zero() {
            return Err(Error::config("handshake timeout must be positive"));
        }
        if self.options.command_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config(
                "command timeout must be positive (use None to wait indefinitely)",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
