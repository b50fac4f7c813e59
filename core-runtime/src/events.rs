//! # Event Bus System
//!
//! Structured run events for the marketplace sync core, published over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The sync engine does not log to a global sink. It emits typed events on an
//! injected [`EventBus`]; hosts subscribe and decide what to do with them
//! (console output, metrics, alerting).
//!
//! ```text
//! ┌───────────────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ SyncOrchestrator  ├──────────>│ EventBus  ├──────────────>│ Subscriber │
//! └───────────────────┘           │ (broadcast│               └────────────┘
//! ┌───────────────────┐   emit    │  channel) │   subscribe   ┌────────────┐
//! │ Sync service      ├──────────>│           ├──────────────>│ Subscriber │
//! └───────────────────┘           └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, FeedEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Feed(FeedEvent::Loaded { records: 42 }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Supplier feed loaded");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender was dropped.
//!
//! `emit` fails when nobody is subscribed. Publishers ignore that error: an
//! unobserved run is still a valid run.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Supplier feed acquisition
    Feed(FeedEvent),
    /// Per-campaign sync runs
    Sync(SyncEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Feed(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Feed(FeedEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::RunAborted { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::BatchDispatched {
                succeeded: false, ..
            }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::RunCompleted { failed_batches, .. })
                if *failed_batches > 0 =>
            {
                EventSeverity::Warning
            }
            CoreEvent::Sync(SyncEvent::RunCompleted { .. }) => EventSeverity::Info,
            CoreEvent::Feed(FeedEvent::Loaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Feed Events
// ============================================================================

/// Events related to loading the supplier feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum FeedEvent {
    /// Feed rows are available.
    Loaded {
        /// Number of rows read.
        records: u64,
    },
    /// Feed could not be acquired; no campaign was synced.
    Failed {
        /// Human-readable error message.
        message: String,
    },
}

impl FeedEvent {
    fn description(&self) -> &str {
        match self {
            FeedEvent::Loaded { .. } => "Supplier feed loaded",
            FeedEvent::Failed { .. } => "Supplier feed unavailable",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events emitted while one marketplace campaign is reconciled and uploaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Run initiated.
    RunStarted {
        /// Unique identifier for this run.
        run_id: String,
        /// Marketplace name.
        marketplace: String,
        /// Campaign (or client) identifier.
        campaign_id: String,
    },
    /// One catalog page arrived.
    CatalogPageFetched {
        run_id: String,
        /// 1-based page number.
        page: u32,
        /// Offer ids accumulated so far.
        offers_so_far: u64,
        /// Total reported by the endpoint, if it reports one.
        total: Option<u64>,
    },
    /// Stock and price update sets are ready for dispatch.
    Reconciled {
        run_id: String,
        /// Distinct catalog offer ids.
        catalog_size: u64,
        /// Stock updates taken from the feed.
        matched_stock: u64,
        /// Zero-stock updates for catalog ids missing from the feed.
        synthesized_stock: u64,
        /// Price updates produced.
        price_updates: u64,
    },
    /// One batch upload finished.
    BatchDispatched {
        run_id: String,
        /// "stock" or "price".
        kind: String,
        /// 0-based batch index within its kind.
        index: u32,
        /// Number of updates in the batch.
        size: u64,
        /// Whether the upload call succeeded.
        succeeded: bool,
        /// Offers the marketplace rejected inside a successful call.
        rejected: u64,
        /// Failure message when `succeeded` is false.
        error: Option<String>,
    },
    /// Every batch was attempted.
    RunCompleted {
        run_id: String,
        /// Batches attempted (stock and price).
        batches: u64,
        /// Batches whose upload call failed.
        failed_batches: u64,
        /// Stock updates with a non-zero count.
        non_zero_stock: u64,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
    },
    /// Run stopped before any batch was dispatched.
    RunAborted {
        run_id: String,
        /// Stage that failed ("config", "catalog", "reconcile", "batching").
        stage: String,
        /// Human-readable error message.
        message: String,
        /// Whether the failure looks transient.
        recoverable: bool,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::RunStarted { .. } => "Sync run started",
            SyncEvent::CatalogPageFetched { .. } => "Catalog page fetched",
            SyncEvent::Reconciled { .. } => "Feed reconciled against catalog",
            SyncEvent::BatchDispatched { .. } => "Batch dispatched",
            SyncEvent::RunCompleted { .. } => "Sync run completed",
            SyncEvent::RunAborted { .. } => "Sync run aborted",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning an `EventBus` yields a handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream, SyncEvent};
///
/// let event_bus = EventBus::new(100);
/// let batches = EventStream::new(event_bus.subscribe()).filter(|event| {
///     matches!(event, CoreEvent::Sync(SyncEvent::BatchDispatched { .. }))
/// });
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events that match `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every event currently buffered that passes the filter.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(Ok(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
