//! Debuggable target model.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifiers::TargetId;

// ============================================================================
// TargetType
// ============================================================================

/// Kind of debuggable target.
///
/// Unknown strings decode to [`TargetType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// A top-level page or renderer.
    Page,
    /// Extension background page.
    BackgroundPage,
    /// Service worker.
    ServiceWorker,
    /// Shared worker.
    SharedWorker,
    /// Dedicated worker.
    Worker,
    /// Out-of-process iframe.
    Iframe,
    /// Embedded webview.
    Webview,
    /// The browser itself.
    Browser,
    /// Anything else.
    #[serde(other)]
    Other,
}

impl TargetType {
    /// Returns the wire name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::BackgroundPage => "background_page",
            Self::ServiceWorker => "service_worker",
            Self::SharedWorker => "shared_worker",
            Self::Worker => "worker",
            Self::Iframe => "iframe",
            Self::Webview => "webview",
            Self::Browser => "browser",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Target
// ============================================================================

/// One entry of the `/json/list` discovery response.
///
/// Immutable snapshot; discovery returns fresh values on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Target id.
    pub id: TargetId,

    /// Document title.
    #[serde(default)]
    pub title: String,

    /// Document URL.
    #[serde(default)]
    pub url: String,

    /// Target kind.
    #[serde(rename = "type")]
    pub target_type: TargetType,

    /// WebSocket endpoint; absent when another client is already attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_socket_debugger_url: Option<String>,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// DevTools frontend URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devtools_frontend_url: Option<String>,

    /// Favicon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,

    /// Parent target id for nested targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TargetId>,
}

impl Target {
    /// Returns `true` if a WebSocket can be opened to this target.
    #[inline]
    #[must_use]
    pub fn is_attachable(&self) -> bool {
        self.web_socket_debugger_url.is_some()
    }

    /// Returns `true` for page targets.
    #[inline]
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.target_type == TargetType::Page
    }

    /// Returns the WebSocket debugger URL, if any.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> Option<&str> {
        self.web_socket_debugger_url.as_deref()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {} ({})", self.target_type, self.id, self.url, self.title)
    }
}

// ============================================================================
// BrowserVersion
// ============================================================================

/// The `/json/version` discovery response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserVersion {
    /// Browser product and version, e.g. `Chrome/120.0.6099.71`.
    #[serde(rename = "Browser", default)]
    pub browser: String,

    /// CDP version, e.g. `1.3`.
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: String,

    /// User agent string.
    #[serde(rename = "User-Agent", default)]
    pub user_agent: String,

    /// V8 version.
    #[serde(rename = "V8-Version", default)]
    pub v8_version: String,

    /// Browser-level WebSocket endpoint.
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
