//! Request/response correlation.
//!
//! The correlator owns the id counter and the pending map of one
//! connection. Each pending entry is removed exactly once: by its
//! response, by its deadline, by [`RequestCorrelator::drain`], or when the
//! caller stops waiting for it.
//!
//! # Settlement Rules
//!
//! - The entry leaves the map *before* its continuation is completed.
//! - Whoever removes the entry settles it; a caller whose deadline lost the
//!   race against the response receives the response.
//! - Responses for ids that are no longer pending are counted and dropped.
//! - Dropping the future returned by `issue` removes its entry at once.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Event, Request, Response};

use super::connection::ConnectionCommand;

// ============================================================================
// Types
// ============================================================================

/// Continuation of a pending request.
type Continuation = oneshot::Sender<Result<Value>>;

/// In-flight command awaiting its response.
struct PendingRequest {
    /// Fully qualified method, kept for timeout errors.
    method: String,
    /// Completes the caller's future.
    continuation: Continuation,
}

/// State guarded by one lock so the closed check and id allocation are atomic.
struct CorrelatorState {
    next_id: RequestId,
    pending: BTreeMap<RequestId, PendingRequest>,
    closed: bool,
}

// ============================================================================
// RequestStats
// ============================================================================

/// Counters describing how requests on a connection ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestStats {
    /// Commands handed to the transport.
    pub issued: u64,
    /// Commands resolved with a result.
    pub resolved: u64,
    /// Commands rejected by the remote end.
    pub failed: u64,
    /// Commands that hit their deadline.
    pub timed_out: u64,
    /// Commands rejected because the connection closed.
    pub closed: u64,
    /// Responses that matched no pending request (late or unknown ids).
    pub discarded_responses: u64,
    /// Commands whose caller stopped waiting before they settled.
    pub abandoned: u64,
}

#[derive(Default)]
struct Counters {
    issued: AtomicU64,
    resolved: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    closed: AtomicU64,
    discarded: AtomicU64,
    abandoned: AtomicU64,
}

// ============================================================================
// RequestCorrelator
// ============================================================================

/// Assigns ids, tracks pending requests and settles them.
pub(crate) struct RequestCorrelator {
    state: Mutex<CorrelatorState>,
    outbound: mpsc::UnboundedSender<ConnectionCommand>,
    counters: Counters,
}

impl RequestCorrelator {
    /// Creates a correlator that pushes frames into `outbound`.
    pub(crate) fn new(outbound: mpsc::UnboundedSender<ConnectionCommand>) -> Self {
        Self {
            state: Mutex::new(CorrelatorState {
                next_id: RequestId::FIRST,
                pending: BTreeMap::new(),
                closed: false,
            }),
            outbound,
            counters: Counters::default(),
        }
    }

    /// Issues a command and waits for its settlement.
    ///
    /// `request_timeout` of `None` waits until a response arrives or the
    /// connection closes.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is (or becomes) closed
    /// - [`Error::RequestTimeout`] if the deadline passes first
    /// - [`Error::Protocol`] if the remote end rejects the command
    /// - [`Error::Json`] if the params cannot be serialized
    pub(crate) async fn issue(
        &self,
        method: String,
        params: Value,
        request_timeout: Option<Duration>,
    ) -> Result<Value> {
        let (continuation, mut settled) = oneshot::channel();

        let id = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Error::ConnectionClosed);
            }
            let id = state.next_id;
            state.next_id = id.next();
            state.pending.insert(
                id,
                PendingRequest {
                    method: method.clone(),
                    continuation,
                },
            );
            id
        };
        let _guard = PendingGuard {
            correlator: self,
            id,
        };

        let frame = match Request::new(id, method, params).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.forget(id);
                return Err(e);
            }
        };

        if self
            .outbound
            .send(ConnectionCommand::Send { id, frame })
            .is_err()
        {
            // Event loop is gone; teardown may already have drained us.
            if self.forget(id).is_some() {
                self.counters.closed.fetch_add(1, Ordering::Relaxed);
            }
            return Err(Error::ConnectionClosed);
        }

        self.counters.issued.fetch_add(1, Ordering::Relaxed);
        trace!(%id, "Request issued");

        let outcome = match request_timeout {
            None => settled.await,
            Some(limit) => match timeout(limit, &mut settled).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    if let Some(pending) = self.forget(id) {
                        self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
                        debug!(%id, method = %pending.method, "Request timed out");
                        return Err(Error::request_timeout(id, pending.method, limit));
                    }
                    // Settled concurrently with the deadline.
                    settled.await
                }
            },
        };

        outcome.unwrap_or(Err(Error::ConnectionClosed))
    }

    /// Routes a response to its pending request.
    ///
    /// Returns `false` when no request with that id is pending.
    pub(crate) fn settle(&self, response: Response) -> bool {
        let id = response.id;
        match self.forget(id) {
            Some(pending) => {
                self.complete(id, pending, response.into_result());
                true
            }
            None => {
                self.discard(id);
                false
            }
        }
    }

    /// Settles a frame that carries both an `id` and a `method`.
    ///
    /// Hands the event back when the id is not pending.
    pub(crate) fn settle_or_event(&self, response: Response, event: Event) -> Option<Event> {
        let id = response.id;
        match self.forget(id) {
            Some(pending) => {
                self.complete(id, pending, response.into_result());
                None
            }
            None => {
                trace!(%id, method = %event.method, "Id not pending, routing as event");
                Some(event)
            }
        }
    }

    /// Fails the pending request `id` with `error`.
    ///
    /// Returns `false` when no request with that id is pending.
    pub(crate) fn reject(&self, id: RequestId, error: Error) -> bool {
        match self.forget(id) {
            Some(pending) => {
                self.complete(id, pending, Err(error));
                true
            }
            None => {
                self.discard(id);
                false
            }
        }
    }

    fn complete(&self, id: RequestId, pending: PendingRequest, result: Result<Value>) {
        let counter = if result.is_ok() {
            &self.counters.resolved
        } else {
            &self.counters.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);

        trace!(%id, method = %pending.method, ok = result.is_ok(), "Response settled");
        let _ = pending.continuation.send(result);
    }

    fn discard(&self, id: RequestId) {
        self.counters.discarded.fetch_add(1, Ordering::Relaxed);
        debug!(%id, "Discarding response for unknown or expired request");
    }

    /// Closes the correlator and rejects every pending request in id order.
    ///
    /// Idempotent; returns the number of requests rejected by this call.
    pub(crate) fn drain(&self) -> usize {
        let pending = {
            let mut state = self.state.lock();
            state.closed = true;
            std::mem::take(&mut state.pending)
        };

        let count = pending.len();
        for (id, request) in pending {
            trace!(%id, method = %request.method, "Rejecting pending request on close");
            let _ = request.continuation.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            self.counters
                .closed
                .fetch_add(count as u64, Ordering::Relaxed);
            debug!(count, "Failed pending requests on close");
        }
        count
    }

    /// Returns `true` once [`RequestCorrelator::drain`] has run.
    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the number of pending requests.
    #[inline]
    pub(crate) fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Returns a snapshot of the counters.
    pub(crate) fn stats(&self) -> RequestStats {
        RequestStats {
            issued: self.counters.issued.load(Ordering::Relaxed),
            resolved: self.counters.resolved.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
            closed: self.counters.closed.load(Ordering::Relaxed),
            discarded_responses: self.counters.discarded.load(Ordering::Relaxed),
            abandoned: self.counters.abandoned.load(Ordering::Relaxed),
        }
    }

    /// Removes a pending entry, if still present.
    #[inline]
    fn forget(&self, id: RequestId) -> Option<PendingRequest> {
        self.state.lock().pending.remove(&id)
    }
}

// ============================================================================
// PendingGuard
// ============================================================================

/// Removes a request's entry if `issue` is dropped before it settles.
struct PendingGuard<'a> {
    correlator: &'a RequestCorrelator,
    id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        // Already gone on every path that ran to completion.
        if let Some(pending) = self.correlator.forget(self.id) {
            self.correlator
                .counters
                .abandoned
                .fetch_add(1, Ordering::Relaxed);
            debug!(id = %self.id, method = %pending.method, "Request abandoned by caller");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
