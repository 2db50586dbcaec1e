//! Event message type.
//!
//! Events are unsolicited notifications a target pushes once the
//! corresponding domain has been enabled.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

use super::split_name;

// ============================================================================
// Event
// ============================================================================

/// An event notification from remote end to local end.
///
/// # Format
///
/// ```json
/// {
///   "method": "Domain.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Creates an event.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Returns the domain name from the method.
    ///
    /// # Example
    ///
    /// ```
    /// use devtools_bridge::protocol::Event;
    ///
    /// let event = Event::new("Network.responseReceived", serde_json::Value::Null);
    /// assert_eq!(event.domain(), "Network");
    /// ```
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        split_name(&self.method).map_or(self.method.as_str(), |(domain, _)| domain)
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        split_name(&self.method).map_or("", |(_, name)| name)
    }

    /// Deserializes the params into a caller-chosen type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the params do not match `T`.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.params)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
