//! DevTools Bridge - Chrome DevTools Protocol client core.
//!
//! This library discovers debuggable targets over HTTP, attaches to one over
//! a WebSocket, and multiplexes request/response commands and pushed events
//! on that socket.
//!
//! # Architecture
//!
//! - **Discovery**: `GET /json/list` and `/json/version` on the debugging port
//! - **Transport**: one WebSocket per [`Connection`], one receive loop task
//! - **Correlation**: numeric request ids starting at 1, one pending entry per
//!   request, per-request timeouts, drain on close
//! - **Dispatch**: events fanned out to listeners in registration order;
//!   each event name has its own delivery lane so wire order is preserved
//!
//! Key design principles:
//!
//! - Every request settles exactly once: response, timeout, or close
//! - A panicking listener never reaches the receive loop or other listeners
//! - No domain schemas: params and results are `serde_json::Value`
//!
//! # Quick Start
//!
//! ```no_run
//! use devtools_bridge::{ConnectOptions, Result, connect};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Attach to the first page target on the default port
//!     let connection = connect("127.0.0.1", 9222, ConnectOptions::default()).await?;
//!
//!     connection.on("Network", "requestWillBeSent", |event| {
//!         println!("request: {}", event.params["request"]["url"]);
//!     })?;
//!     connection.enable("Network").await?;
//!
//!     let result = connection
//!         .invoke("Runtime", "evaluate", json!({ "expression": "document.title" }))
//!         .await?;
//!     println!("title: {}", result["result"]["value"]);
//!
//!     connection.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], [`ClientBuilder`], [`ConnectOptions`] |
//! | [`discovery`] | HTTP target listing and selection |
//! | [`domain`] | `Domain.member` commands and events, [`Domain`] handle |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire frame types |
//! | [`transport`] | WebSocket connection, correlation, dispatch |

// ============================================================================
// Modules
// ============================================================================

/// Client factory and configuration.
///
/// Use [`Client::builder()`] or the top-level [`connect`] function.
pub mod client;

/// Target discovery over the HTTP debugging endpoint.
pub mod discovery;

/// Domain-scoped command and event helpers.
pub mod domain;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// CDP wire message types.
pub mod protocol;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ConnectOptions, connect};

// Discovery types
pub use discovery::{BrowserVersion, Discovery, Target, TargetFilter, TargetType};
pub use discovery::{find_target, list_targets};

// Domain types
pub use domain::Domain;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{RequestId, SubscriptionId, TargetId};

// Protocol types
pub use protocol::Event;

// Transport types
pub use transport::{Connection, ConnectionState, RequestStats, Subscription, WeakConnection};
