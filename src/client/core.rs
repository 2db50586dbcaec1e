//! Client: discovery plus attach.
//!
//! A [`Client`] remembers which debugging host to talk to and how. Each
//! [`Client::connect`] call re-lists targets, picks one, and opens a fresh
//! [`Connection`] to it.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, info};

use crate::discovery::{Discovery, Target, TargetFilter};
use crate::error::{Error, Result};
use crate::transport::Connection;

use super::builder::ClientBuilder;
use super::options::ConnectOptions;

// ============================================================================
// Client
// ============================================================================

/// Entry point for attaching to targets on one debugging host.
#[derive(Debug, Clone)]
pub struct Client {
    host: String,
    port: u16,
    discovery: Discovery,
    options: ConnectOptions,
}

impl Client {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn new(
        host: String,
        port: u16,
        discovery: Discovery,
        options: ConnectOptions,
    ) -> Self {
        Self {
            host,
            port,
            discovery,
            options,
        }
    }

    /// Returns the debugging host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the debugging port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the discovery client.
    #[inline]
    #[must_use]
    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    /// Returns the connection options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// Lists the host's targets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] on network or decode failure.
    pub async fn targets(&self) -> Result<Vec<Target>> {
        self.discovery.list_targets().await
    }

    /// Attaches to the first target matching the configured filter.
    ///
    /// # Errors
    ///
    /// - [`Error::Discovery`] if listing fails
    /// - [`Error::TargetNotFound`] if nothing matches
    /// - connection errors from [`Connection::open`]
    pub async fn connect(&self) -> Result<Connection> {
        self.connect_matching(&self.options.target_filter).await
    }

    /// Attaches to the first target matching `filter`.
    ///
    /// # Errors
    ///
    /// Same as [`Client::connect`].
    pub async fn connect_matching(&self, filter: &TargetFilter) -> Result<Connection> {
        let targets = self.targets().await?;
        let target = filter
            .find(&targets)
            .ok_or_else(|| Error::target_not_found(filter.to_string()))?;

        debug!(target = %target, "Target selected");
        self.connect_to(target).await
    }

    /// Attaches to a specific target.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if the target has no debugger URL
    /// - connection errors from [`Connection::open`]
    pub async fn connect_to(&self, target: &Target) -> Result<Connection> {
        let url = target.ws_url().ok_or_else(|| {
            Error::invalid_argument(format!(
                "target {} is not attachable (no webSocketDebuggerUrl)",
                target.id
            ))
        })?;

        let connection = Connection::open(url, &self.options).await?;
        info!(target_id = %target.id, url = %target.url, "Attached to target");
        Ok(connection)
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Discovers the targets on `host:port` and attaches to the one selected by
/// `options.target_filter`.
///
/// # Errors
///
/// - [`Error::Discovery`] if listing fails
/// - [`Error::TargetNotFound`] if nothing matches
/// - [`Error::Connection`] / [`Error::ConnectionTimeout`] if the handshake fails
pub async fn connect(host: &str, port: u16, options: ConnectOptions) -> Result<Connection> {
    Client::builder()
        .host(host)
        .port(port)
        .options(options)
        .build()?
        .connect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::TargetType;
    use crate::identifiers::TargetId;

    #[tokio::test]
    async fn test_connect_to_unattachable_target() {
        let client = Client::builder().build().expect("client");
        let target = Target {
            id: TargetId::new("BG"),
            title: "background".into(),
            url: "chrome-extension://abc/background_page".into(),
            target_type: TargetType::BackgroundPage,
            web_socket_debugger_url: None,
            description: String::new(),
            devtools_frontend_url: None,
            favicon_url: None,
            parent_id: None,
        };

        let err = client.connect_to(&target).await.expect_err("not attachable");
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(err.to_string().contains("BG"));
    }
}
