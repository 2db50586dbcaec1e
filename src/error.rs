//! Error types for the DevTools bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use devtools_bridge::{Connection, Error, Result};
//!
//! async fn title(connection: &Connection) -> Result<String> {
//!     match connection.invoke("Runtime", "evaluate", params).await {
//!         Ok(value) => Ok(value.to_string()),
//!         Err(Error::RequestTimeout { .. }) => Ok(String::new()),
//!         Err(e) => Err(e),
//!     }
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Discovery | [`Error::Discovery`], [`Error::TargetNotFound`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::RequestTimeout`] |
//! | Listener | [`Error::Listener`] |
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Serialization | [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;
use std::time::Duration;

use thiserror::Error;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Callers branch on the variant to tell a timeout from a protocol
/// rejection from a closed connection.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when options or environment overrides are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument passed to an API call.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// Target listing failed.
    ///
    /// Returned when the HTTP discovery endpoint is unreachable, answers
    /// with a non-2xx status, or returns a body that does not decode.
    #[error("Discovery failed at {endpoint}: {message}")]
    Discovery {
        /// Endpoint that was queried.
        endpoint: String,
        /// Description of the failure.
        message: String,
    },

    /// No discovered target matched the requested filter.
    #[error("No target matched filter: {filter}")]
    TargetNotFound {
        /// Human-readable description of the filter.
        filter: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the handshake with the debugger URL fails.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// WebSocket handshake did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection is closed.
    ///
    /// Returned for commands issued on a closed connection and for
    /// commands still pending when the connection went away.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// The remote end rejected a command.
    ///
    /// Carries the `error` object of the response frame.
    #[error("Protocol error {code}: {message}")]
    Protocol {
        /// CDP error code (0 when the remote omitted it).
        code: i64,
        /// CDP error message.
        message: String,
    },

    /// No response arrived before the request deadline.
    #[error("Request {request_id} ({method}) timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Fully qualified method of the request.
        method: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Listener Errors
    // ========================================================================
    /// An event listener panicked.
    ///
    /// Never returned to command callers; handed to the error reporter.
    #[error("Listener for {method} failed: {message}")]
    Listener {
        /// Event method being delivered.
        method: String,
        /// Panic payload rendered as text.
        message: String,
    },

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// JSON serialization error.
    ///
    /// Params that cannot be serialized, or a typed result that does not fit.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a discovery error.
    #[inline]
    pub fn discovery(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Discovery {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a target not found error.
    #[inline]
    pub fn target_not_found(filter: impl Into<String>) -> Self {
        Self::TargetNotFound {
            filter: filter.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout: Duration) -> Self {
        Self::ConnectionTimeout {
            timeout_ms: duration_ms(timeout),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(code: i64, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(
        request_id: RequestId,
        method: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self::RequestTimeout {
            request_id,
            method: method.into(),
            timeout_ms: duration_ms(timeout),
        }
    }

    /// Creates a listener error.
    #[inline]
    pub fn listener(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Listener {
            method: method.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
        )
    }

    /// Returns `true` if the connection was closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
    }

    /// Returns `true` if the remote end rejected the command.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Returns the CDP error code for protocol errors.
    #[inline]
    #[must_use]
    pub fn protocol_code(&self) -> Option<i64> {
        match self {
            Self::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry (a fresh `open` for
    /// connection-level failures).
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::RequestTimeout { .. }
                | Self::Discovery { .. }
                | Self::TargetNotFound { .. }
        )
    }
}

/// Saturating conversion used for `*_ms` fields.
#[inline]
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================
