//! WebSocket transport layer.
//!
//! This module owns the WebSocket to a DevTools target and everything that
//! shares its lifetime: pending requests and event listeners.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐                    ┌─────────────────┐
//! │  Connection (Rust)           │                    │  Target         │
//! │                              │     WebSocket      │  (page/worker)  │
//! │  RequestCorrelator ─┐        │◄──────────────────►│                 │
//! │  EventDispatcher  ◄─┴─ loop  │  ws://host:port/…  │  CDP endpoint   │
//! └──────────────────────────────┘                    └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::open` - WebSocket handshake (bounded by a timeout)
//! 2. `Connection::call` / `invoke` - commands correlated by numeric id
//! 3. `Connection::subscribe` / `on` - events fanned out to listeners
//! 4. `Connection::close` - pending requests rejected, listeners dropped
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `correlator` | Id allocation, pending map, timeouts |
//! | `dispatcher` | Event listener registry and delivery lanes |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Request/response correlation.
pub mod correlator;

/// Event fan-out.
pub mod dispatcher;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, ConnectionState, Subscription, WeakConnection};
pub use correlator::RequestStats;
pub use dispatcher::{ErrorReporter, EventCallback, log_reporter};
