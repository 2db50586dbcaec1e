//! CDP wire message types.
//!
//! This module defines the JSON frames exchanged with a DevTools target.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Shape |
//! |--------------|-----------|-------|
//! | `Request` | Local → Remote | `{"id", "method", "params"}` |
//! | `Response` | Remote → Local | `{"id", "result"}` or `{"id", "error"}` |
//! | `Event` | Remote → Local | `{"method", "params"}` |
//!
//! # Method Naming
//!
//! Methods and events follow `Domain.name` format:
//!
//! - `Network.enable`
//! - `Runtime.evaluate`
//! - `Network.requestWillBeSent`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Event frames |
//! | `frame` | Inbound frame classification |
//! | `request` | Request and Response frames |

// ============================================================================
// Submodules
// ============================================================================

/// Event message type.
pub mod event;

/// Inbound frame decoding and classification.
pub mod frame;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::Event;
pub use frame::Frame;
pub use request::{Request, Response, ResponseError};

// ============================================================================
// Method Names
// ============================================================================

/// Joins a domain and a member name into `Domain.member`.
///
/// ```
/// use devtools_bridge::protocol::qualified_name;
///
/// assert_eq!(qualified_name("Network", "enable"), "Network.enable");
/// ```
#[inline]
#[must_use]
pub fn qualified_name(domain: &str, member: &str) -> String {
    let mut name = String::with_capacity(domain.len() + member.len() + 1);
    name.push_str(domain);
    name.push('.');
    name.push_str(member);
    name
}

/// Splits `Domain.member` into its two halves.
///
/// Returns `None` when there is no `.` separator.
#[inline]
#[must_use]
pub fn split_name(name: &str) -> Option<(&str, &str)> {
    name.split_once('.')
}
