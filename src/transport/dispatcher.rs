//! Event fan-out.
//!
//! Listeners register per fully qualified event name. When an event frame
//! arrives, the event loop takes a snapshot of that name's listeners and
//! queues it on the name's delivery lane, a task that runs the callbacks
//! in registration order. The event loop itself never runs a callback.
//!
//! # Delivery Guarantees
//!
//! - Per listener, events of one name arrive in wire order.
//! - Listeners of one name run in registration order.
//! - A listener added after the snapshot misses that event; one removed
//!   after the snapshot still receives it.
//! - A panicking listener is reported and skipped; the others still run.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::SubscriptionId;
use crate::protocol::Event;

// ============================================================================
// Types
// ============================================================================

/// Event listener callback.
///
/// Runs on a delivery task; keep it short or hand work off with
/// `tokio::spawn`. Lanes only run in parallel with the receive loop on a
/// multi-threaded runtime: on `current_thread` a blocking callback stalls
/// every frame behind it.
pub type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Out-of-band sink for listener failures.
pub type ErrorReporter = Arc<dyn Fn(&Error) + Send + Sync>;

/// One registration.
#[derive(Clone)]
struct Listener {
    id: SubscriptionId,
    callback: EventCallback,
}

/// A snapshot queued on a lane.
struct Delivery {
    event: Event,
    listeners: Vec<Listener>,
}

#[derive(Default)]
struct ListenerTable {
    by_method: FxHashMap<String, Vec<Listener>>,
    closed: bool,
}

/// Reporter used when none is configured.
#[must_use]
pub fn log_reporter() -> ErrorReporter {
    Arc::new(|err: &Error| error!(error = %err, "Event listener failed"))
}

// ============================================================================
// EventDispatcher
// ============================================================================

/// Routes event frames to registered listeners.
pub(crate) struct EventDispatcher {
    listeners: RwLock<ListenerTable>,
    /// Lock order: `lanes` before `listeners`.
    lanes: Mutex<FxHashMap<String, mpsc::UnboundedSender<Delivery>>>,
    next_id: AtomicU64,
    reporter: ErrorReporter,
}

impl EventDispatcher {
    /// Creates a dispatcher reporting listener failures to `reporter`.
    pub(crate) fn new(reporter: ErrorReporter) -> Self {
        Self {
            listeners: RwLock::new(ListenerTable::default()),
            lanes: Mutex::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
            reporter,
        }
    }

    /// Registers `callback` for events named `method`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] after [`EventDispatcher::close`].
    pub(crate) fn subscribe(&self, method: &str, callback: EventCallback) -> Result<SubscriptionId> {
        let mut table = self.listeners.write();
        if table.closed {
            return Err(Error::ConnectionClosed);
        }

        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        table
            .by_method
            .entry(method.to_string())
            .or_default()
            .push(Listener { id, callback });

        debug!(%id, method, "Listener subscribed");
        Ok(id)
    }

    /// Removes a registration. Returns `false` if it was not registered.
    pub(crate) fn unsubscribe(&self, method: &str, id: SubscriptionId) -> bool {
        let (removed, now_empty) = {
            let mut table = self.listeners.write();
            let Some(listeners) = table.by_method.get_mut(method) else {
                return false;
            };
            let before = listeners.len();
            listeners.retain(|listener| listener.id != id);
            let removed = listeners.len() != before;
            let now_empty = listeners.is_empty();
            if now_empty {
                table.by_method.remove(method);
            }
            (removed, now_empty)
        };

        if now_empty {
            let mut lanes = self.lanes.lock();
            // A subscribe may have raced in between the two locks.
            if !self.listeners.read().by_method.contains_key(method) {
                lanes.remove(method);
            }
        }

        if removed {
            debug!(%id, method, "Listener unsubscribed");
        }
        removed
    }

    /// Queues `event` for every listener currently registered for it.
    pub(crate) fn dispatch(&self, event: Event) {
        let mut lanes = self.lanes.lock();

        let listeners = {
            let table = self.listeners.read();
            match table.by_method.get(&event.method) {
                Some(listeners) if !listeners.is_empty() => listeners.clone(),
                _ => {
                    trace!(method = %event.method, "Event without listeners");
                    return;
                }
            }
        };

        let lane = lanes
            .entry(event.method.clone())
            .or_insert_with(|| spawn_lane(event.method.clone(), Arc::clone(&self.reporter)));

        trace!(method = %event.method, listeners = listeners.len(), "Event queued");
        if lane.send(Delivery { event, listeners }).is_err() {
            warn!("Delivery lane stopped unexpectedly");
        }
    }

    /// Drops every registration and lane.
    ///
    /// Deliveries already queued still run.
    pub(crate) fn close(&self) {
        let mut lanes = self.lanes.lock();
        let mut table = self.listeners.write();
        table.closed = true;
        let count: usize = table.by_method.values().map(Vec::len).sum();
        table.by_method.clear();
        lanes.clear();

        if count > 0 {
            debug!(count, "Listeners dropped on close");
        }
    }

    /// Returns the number of listeners registered for `method`.
    pub(crate) fn listener_count(&self, method: &str) -> usize {
        self.listeners
            .read()
            .by_method
            .get(method)
            .map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.listeners.read();
        f.debug_struct("EventDispatcher")
            .field("methods", &table.by_method.len())
            .field("closed", &table.closed)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Delivery Lanes
// ============================================================================

/// Spawns the delivery task for one event name.
///
/// The task ends once its sender is dropped and the queue is empty.
fn spawn_lane(method: String, reporter: ErrorReporter) -> mpsc::UnboundedSender<Delivery> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Delivery>();

    tokio::spawn(async move {
        trace!(%method, "Delivery lane started");
        while let Some(delivery) = rx.recv().await {
            for listener in &delivery.listeners {
                invoke(listener, &delivery.event, &reporter);
            }
        }
        trace!(%method, "Delivery lane stopped");
    });

    tx
}

/// Runs one callback, converting a panic into a reported [`Error::Listener`].
fn invoke(listener: &Listener, event: &Event, reporter: &ErrorReporter) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| (listener.callback)(event)));

    if let Err(payload) = outcome {
        let err = Error::listener(event.method.clone(), panic_message(payload.as_ref()));
        warn!(subscription = %listener.id, method = %event.method, "Listener panicked");
        reporter(&err);
    }
}

/// Renders a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "listener panicked".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
