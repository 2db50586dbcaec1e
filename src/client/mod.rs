//! Client factory and configuration.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`ClientBuilder`] fluent configuration |
//! | `core` | [`Client`] and the top-level [`connect`] |
//! | `options` | [`ConnectOptions`] timeouts, target filter, error reporter |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for client configuration.
pub mod builder;

/// Client and top-level connect.
pub mod core;

/// Connection options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ClientBuilder, DEFAULT_HOST, DEFAULT_PORT};
pub use core::{Client, connect};
pub use options::{ConnectOptions, DEFAULT_COMMAND_TIMEOUT, DEFAULT_HANDSHAKE_TIMEOUT};
