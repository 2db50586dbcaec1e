//! WebSocket connection and event loop.
//!
//! This module handles the WebSocket connection to one DevTools target,
//! including request/response correlation and event routing.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames from the target (responses, events)
//! - Outgoing command frames from any number of callers
//! - Teardown: draining pending requests and dropping listeners
//!
//! # State Machine
//!
//! ```text
//! Connecting ──handshake──► Open ──close / socket error / bad frame──► Closed
//! ```
//!
//! There is no reconnection; open a new [`Connection`] instead.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::client::ConnectOptions;
use crate::error::{Error, Result};
use crate::identifiers::{RequestId, SubscriptionId};
use crate::protocol::{Event, Frame};

use super::correlator::{RequestCorrelator, RequestStats};
use super::dispatcher::EventDispatcher;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake in progress.
    Connecting,
    /// Frames flow in both directions.
    Open,
    /// Terminal; every further command fails with [`Error::ConnectionClosed`].
    Closed,
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
pub(crate) enum ConnectionCommand {
    /// Write one serialized request frame.
    Send { id: RequestId, frame: String },
    /// Close the socket and tear down.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Shared state behind every [`Connection`] clone.
struct ConnectionInner {
    /// Debugger URL this connection is bound to.
    url: String,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Pending request bookkeeping (shared with event loop).
    correlator: Arc<RequestCorrelator>,
    /// Listener registry (shared with event loop).
    dispatcher: Arc<EventDispatcher>,
    /// Lifecycle state published by the event loop.
    state: watch::Receiver<ConnectionState>,
    /// Deadline applied when the caller does not pass one.
    command_timeout: Option<Duration>,
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        // Last handle gone: nobody can await results any more.
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }
}

/// WebSocket connection to one DevTools target.
///
/// Handles request/response correlation and event routing.
/// The connection spawns an internal event loop task.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and cheap to clone; clones share the same
/// socket. When the last clone is dropped the socket is closed.
///
/// A listener that captures a `Connection` keeps it alive until
/// [`Connection::close`]; capture a [`WeakConnection`] instead.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Connection - Constructor
// ============================================================================

impl Connection {
    /// Opens a WebSocket to a target's debugger URL.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `url` is not a `ws://` or `wss://` URL
    /// - [`Error::ConnectionTimeout`] if the handshake exceeds the handshake timeout
    /// - [`Error::Connection`] if the handshake fails
    pub async fn open(url: &str, options: &ConnectOptions) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::invalid_argument(format!("invalid debugger URL {url}: {e}")))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(Error::invalid_argument(format!(
                "debugger URL must use ws:// or wss://, got {url}"
            )));
        }

        debug!(%url, "Opening DevTools WebSocket");

        let (ws_stream, _) = timeout(options.handshake_timeout, connect_async(parsed.as_str()))
            .await
            .map_err(|_| Error::connection_timeout(options.handshake_timeout))?
            .map_err(|e| Error::connection(format!("WebSocket handshake with {url} failed: {e}")))?;

        info!(%url, "DevTools WebSocket connected");

        Ok(Self::from_stream(ws_stream, url.to_string(), options))
    }

    /// Wraps an established WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    pub(crate) fn from_stream<S>(
        ws_stream: WebSocketStream<S>,
        url: String,
        options: &ConnectOptions,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let correlator = Arc::new(RequestCorrelator::new(command_tx.clone()));
        let dispatcher = Arc::new(EventDispatcher::new(options.error_reporter()));

        state_tx.send_replace(ConnectionState::Open);
        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&correlator),
            Arc::clone(&dispatcher),
            state_tx,
        ));

        Self {
            inner: Arc::new(ConnectionInner {
                url,
                command_tx,
                correlator,
                dispatcher,
                state: state_rx,
                command_timeout: options.command_timeout,
            }),
        }
    }
}

// ============================================================================
// Connection - Accessors
// ============================================================================

impl Connection {
    /// Returns the debugger URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Returns `true` once the connection is closed.
    ///
    /// Commands start failing as soon as teardown begins, which may be
    /// slightly before the state turns [`ConnectionState::Closed`].
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.correlator.is_closed() || self.state() == ConnectionState::Closed
    }

    /// Returns the default command timeout (`None` = wait indefinitely).
    #[inline]
    #[must_use]
    pub fn command_timeout(&self) -> Option<Duration> {
        self.inner.command_timeout
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.correlator.pending_count()
    }

    /// Returns request outcome counters.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> RequestStats {
        self.inner.correlator.stats()
    }

    /// Returns the number of listeners for a fully qualified event name.
    #[inline]
    #[must_use]
    pub fn listener_count(&self, method: &str) -> usize {
        self.inner.dispatcher.listener_count(method)
    }

    /// Returns a handle that does not keep the connection open.
    #[inline]
    #[must_use]
    pub fn downgrade(&self) -> WeakConnection {
        WeakConnection {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Waits until the connection reaches [`ConnectionState::Closed`].
    pub async fn closed(&self) {
        let mut state = self.inner.state.clone();
        let _ = state.wait_for(|s| *s == ConnectionState::Closed).await;
    }
}

// ============================================================================
// Connection - Commands and Events
// ============================================================================

impl Connection {
    /// Sends a command by fully qualified name with the default timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Protocol`] if the target rejects the command
    pub async fn call(&self, method: impl Into<String>, params: Value) -> Result<Value> {
        self.call_with_timeout(method, params, self.inner.command_timeout)
            .await
    }

    /// Sends a command by fully qualified name with an explicit timeout.
    ///
    /// `None` waits until a response arrives or the connection closes.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::call`].
    pub async fn call_with_timeout(
        &self,
        method: impl Into<String>,
        params: Value,
        request_timeout: Option<Duration>,
    ) -> Result<Value> {
        self.inner
            .correlator
            .issue(method.into(), params, request_timeout)
            .await
    }

    /// Registers a listener for a fully qualified event name.
    ///
    /// Callbacks run on a tokio task, one lane per event name. A callback
    /// that blocks holds up a runtime worker; on a `current_thread` runtime
    /// that includes the receive loop, so offload slow work with
    /// `tokio::spawn` or `spawn_blocking`.
    ///
    /// The registry owns `callback`. Capturing a `Connection` in it keeps the
    /// socket open after every other handle is dropped; use
    /// [`Connection::downgrade`] for callbacks that need to issue commands.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection is closed.
    pub fn subscribe<F>(&self, method: impl Into<String>, callback: F) -> Result<Subscription>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let method = method.into();
        let id = self.inner.dispatcher.subscribe(&method, Arc::new(callback))?;
        Ok(Subscription {
            id,
            method,
            dispatcher: Arc::downgrade(&self.inner.dispatcher),
        })
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.inner
            .dispatcher
            .unsubscribe(&subscription.method, subscription.id)
    }

    /// Closes the connection.
    ///
    /// Pending requests are rejected with [`Error::ConnectionClosed`] in the
    /// order they were issued, listeners are dropped, and the socket is
    /// closed. Idempotent.
    pub async fn close(&self) {
        debug!(url = %self.inner.url, "Closing connection");
        self.inner.correlator.drain();
        self.inner.dispatcher.close();
        let _ = self.inner.command_tx.send(ConnectionCommand::Shutdown);
        self.closed().await;
        info!(url = %self.inner.url, "Connection closed");
    }
}

// ============================================================================
// Connection - Event Loop
// ============================================================================

impl Connection {
    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlator: Arc<RequestCorrelator>,
        dispatcher: Arc<EventDispatcher>,
        state_tx: watch::Sender<ConnectionState>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming frames from the target
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(e) = Self::handle_incoming_message(
                                text.as_str(),
                                &correlator,
                                &dispatcher,
                            ) {
                                error!(error = %e, "Undecodable frame, closing connection");
                                let _ = ws_write.close().await;
                                break;
                            }
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from callers
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { id, frame }) => {
                            if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                                error!(%id, error = %e, "Failed to write request frame");
                                break;
                            }
                            trace!(%id, "Request sent");
                        }

                        Some(ConnectionCommand::Shutdown) | None => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        // Fail all pending requests and drop listeners
        correlator.drain();
        dispatcher.close();
        state_tx.send_replace(ConnectionState::Closed);

        debug!("Event loop terminated");
    }

    /// Decodes one text frame and routes it.
    ///
    /// Only text that is not JSON at all is an error; everything else is
    /// routed or discarded.
    fn handle_incoming_message(
        text: &str,
        correlator: &RequestCorrelator,
        dispatcher: &EventDispatcher,
    ) -> Result<()> {
        match Frame::decode(text)? {
            Frame::Response(response) => {
                correlator.settle(response);
            }
            Frame::Tagged(response, event) => {
                if let Some(event) = correlator.settle_or_event(response, event) {
                    dispatcher.dispatch(event);
                }
            }
            Frame::Invalid { id, code, reason } => {
                warn!(%id, %reason, frame = %truncate(text, 256), "Unreadable response frame");
                correlator.reject(id, Error::protocol(code, reason));
            }
            Frame::Event(event) => dispatcher.dispatch(event),
            Frame::Malformed(reason) => {
                warn!(%reason, frame = %truncate(text, 256), "Discarding malformed frame");
            }
        }
        Ok(())
    }
}

/// Shortens `text` for log output on a char boundary.
fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

// ============================================================================
// WeakConnection
// ============================================================================

/// Non-owning [`Connection`] handle, for use inside listeners.
#[derive(Clone)]
pub struct WeakConnection {
    inner: Weak<ConnectionInner>,
}

impl WeakConnection {
    /// Returns the connection if some strong handle still exists.
    #[inline]
    #[must_use]
    pub fn upgrade(&self) -> Option<Connection> {
        self.inner.upgrade().map(|inner| Connection { inner })
    }
}

impl fmt::Debug for WeakConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakConnection")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Handle to one event listener registration.
///
/// Dropping the handle does not unregister the listener; call
/// [`Subscription::unsubscribe`] (or close the connection) for that.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    method: String,
    dispatcher: Weak<EventDispatcher>,
}

impl Subscription {
    /// Returns the registration id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the fully qualified event name.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Removes the listener.
    ///
    /// Returns `false` if it was already removed or the connection is gone.
    pub fn unsubscribe(self) -> bool {
        self.dispatcher
            .upgrade()
            .is_some_and(|dispatcher| dispatcher.unsubscribe(&self.method, self.id))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("ééé", 2), "éé");
    }

    #[tokio::test]
    async fn test_open_rejects_http_url() {
        let err = Connection::open("http://127.0.0.1:9222/json", &ConnectOptions::default())
            .await
            .expect_err("invalid scheme");
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_open_refused_is_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let url = format!("ws://127.0.0.1:{port}/devtools/page/X");
        let err = Connection::open(&url, &ConnectOptions::default())
            .await
            .expect_err("refused");
        assert!(matches!(err, Error::Connection { .. }));
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();

        // Accept TCP but never answer the HTTP upgrade.
        let _hold = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let options = ConnectOptions::new().with_handshake_timeout(Duration::from_millis(100));
        let url = format!("ws://127.0.0.1:{port}/devtools/page/X");
        let err = Connection::open(&url, &options).await.expect_err("timeout");
        assert!(matches!(err, Error::ConnectionTimeout { timeout_ms: 100 }));
    }
}
