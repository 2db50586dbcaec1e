//! Domain-scoped commands and events.
//!
//! CDP groups commands and events into domains (`Network`, `Page`,
//! `Runtime`, ...). The methods here compose `Domain.member` names and
//! forward to the connection's request and listener machinery; they do not
//! know or validate any domain's schema.
//!
//! ```no_run
//! use devtools_bridge::{Connection, Result};
//! use serde_json::json;
//!
//! async fn example(connection: &Connection) -> Result<()> {
//!     let network = connection.domain("Network")?;
//!     network.on("requestWillBeSent", |event| {
//!         println!("{}", event.params["request"]["url"]);
//!     })?;
//!     network.enable().await?;
//!
//!     let result = connection
//!         .invoke("Runtime", "evaluate", json!({ "expression": "1 + 1" }))
//!         .await?;
//!     println!("{result}");
//!     Ok(())
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::protocol::{Event, qualified_name};
use crate::transport::{Connection, Subscription};

// ============================================================================
// Connection - Domain Methods
// ============================================================================

impl Connection {
    /// Invokes `domain.method` with the default command timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if a name is empty
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Protocol`] if the target rejects the command
    pub async fn invoke(&self, domain: &str, method: &str, params: Value) -> Result<Value> {
        let name = member_name(domain, method)?;
        self.call(name, params).await
    }

    /// Invokes `domain.method` with an explicit timeout.
    ///
    /// `None` waits until a response arrives or the connection closes.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::invoke`].
    pub async fn invoke_with_timeout(
        &self,
        domain: &str,
        method: &str,
        params: Value,
        request_timeout: Option<Duration>,
    ) -> Result<Value> {
        let name = member_name(domain, method)?;
        self.call_with_timeout(name, params, request_timeout).await
    }

    /// Invokes `domain.method` with serializable params and decodes the result.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::invoke`], plus [`Error::Json`] if the params
    /// cannot be serialized or the result does not fit `R`.
    pub async fn invoke_as<R, P>(&self, domain: &str, method: &str, params: P) -> Result<R>
    where
        R: DeserializeOwned,
        P: Serialize,
    {
        let params = serde_json::to_value(params)?;
        let result = self.invoke(domain, method, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Registers a listener for `domain.event`.
    ///
    /// See [`Connection::subscribe`] for where callbacks run and why they
    /// should capture a [`crate::WeakConnection`] rather than a `Connection`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if a name is empty
    /// - [`Error::ConnectionClosed`] if the connection is closed
    pub fn on<F>(&self, domain: &str, event: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let name = member_name(domain, event)?;
        self.subscribe(name, callback)
    }

    /// Sends `domain.enable` with empty params.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::invoke`].
    pub async fn enable(&self, domain: &str) -> Result<Value> {
        self.invoke(domain, "enable", json!({})).await
    }

    /// Sends `domain.disable` with empty params.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::invoke`].
    pub async fn disable(&self, domain: &str) -> Result<Value> {
        self.invoke(domain, "disable", json!({})).await
    }

    /// Returns a handle bound to one domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `name` is empty.
    pub fn domain(&self, name: impl Into<String>) -> Result<Domain> {
        let name = name.into();
        check_name("domain", &name)?;
        Ok(Domain {
            connection: self.clone(),
            name,
        })
    }
}

// ============================================================================
// Domain
// ============================================================================

/// A [`Connection`] bound to one CDP domain.
///
/// Cheap to clone; shares the underlying connection.
#[derive(Clone)]
pub struct Domain {
    connection: Connection,
    name: String,
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("name", &self.name)
            .field("url", &self.connection.url())
            .finish()
    }
}

impl Domain {
    /// Returns the domain name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// See [`Connection::invoke`].
    pub async fn invoke(&self, method: &str, params: Value) -> Result<Value> {
        self.connection.invoke(&self.name, method, params).await
    }

    /// See [`Connection::invoke_with_timeout`].
    pub async fn invoke_with_timeout(
        &self,
        method: &str,
        params: Value,
        request_timeout: Option<Duration>,
    ) -> Result<Value> {
        self.connection
            .invoke_with_timeout(&self.name, method, params, request_timeout)
            .await
    }

    /// See [`Connection::invoke_as`].
    pub async fn invoke_as<R, P>(&self, method: &str, params: P) -> Result<R>
    where
        R: DeserializeOwned,
        P: Serialize,
    {
        self.connection.invoke_as(&self.name, method, params).await
    }

    /// See [`Connection::on`].
    pub fn on<F>(&self, event: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.connection.on(&self.name, event, callback)
    }

    /// See [`Connection::enable`].
    pub async fn enable(&self) -> Result<Value> {
        self.connection.enable(&self.name).await
    }

    /// See [`Connection::disable`].
    pub async fn disable(&self) -> Result<Value> {
        self.connection.disable(&self.name).await
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Validates both halves and joins them.
fn member_name(domain: &str, member: &str) -> Result<String> {
    check_name("domain", domain)?;
    check_name("member", member)?;
    Ok(qualified_name(domain, member))
}

fn check_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::invalid_argument(format!("{kind} name must not be empty")));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
