//! Event interception
//!
//! Buffers incoming events in a bounded queue and notifies registered
//! handlers synchronously. The intercept counter increments for every
//! validated event, even when the queue is full and the event is dropped
//! from the pull interface: completeness accounting outranks delivery.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::Result;
use crate::event::types::ComplianceEvent;

/// Callback invoked synchronously for every intercepted event. Errors are
/// logged and never abort interception or later handlers.
pub type EventHandler = Box<dyn Fn(&ComplianceEvent) -> anyhow::Result<()> + Send + Sync>;

/// Outcome of an intercept call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptOutcome {
    /// Counted and enqueued for pull consumers.
    Accepted,
    /// Counted, but the bounded queue was full; pull consumers will not
    /// see this event.
    AcceptedDropped,
}

impl InterceptOutcome {
    pub fn dropped(&self) -> bool {
        matches!(self, Self::AcceptedDropped)
    }
}

/// Intercepts compliance events ahead of state mutation.
#[derive(Clone)]
pub struct EventInterceptor {
    sender: mpsc::Sender<ComplianceEvent>,
    receiver: Arc<Mutex<mpsc::Receiver<ComplianceEvent>>>,
    handlers: Arc<RwLock<Vec<EventHandler>>>,
    event_count: Arc<Mutex<u64>>,
}

impl EventInterceptor {
    /// Interceptor with the default queue capacity of 10,000 events.
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity);
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            handlers: Arc::new(RwLock::new(Vec::new())),
            event_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Register a handler invoked on the intercept path.
    pub async fn register_handler(&self, handler: EventHandler) {
        self.handlers.write().await.push(handler);
    }

    /// Intercept a compliance event.
    ///
    /// Validates required fields before touching any state, then offers the
    /// event to the bounded queue without blocking. The event is counted
    /// and handlers run whether or not the offer succeeds.
    pub async fn intercept(&self, event: ComplianceEvent) -> Result<InterceptOutcome> {
        event.validate()?;

        let outcome = match self.sender.try_send(event.clone()) {
            Ok(()) => InterceptOutcome::Accepted,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    event_id = %event.event_id,
                    "event queue full, event counted but dropped from pull queue"
                );
                InterceptOutcome::AcceptedDropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(event_id = %event.event_id, "event queue closed, event counted only");
                InterceptOutcome::AcceptedDropped
            }
        };

        {
            let mut count = self.event_count.lock().await;
            *count += 1;
        }

        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            if let Err(e) = handler(&event) {
                warn!(event_id = %event.event_id, "event handler failed: {}", e);
            }
        }

        debug!(event_id = %event.event_id, event_type = %event.event_type, "intercepted event");
        Ok(outcome)
    }

    /// Pull the next queued event.
    ///
    /// With a timeout, waits up to that long for an event; without one,
    /// returns immediately.
    pub async fn next(&self, timeout: Option<Duration>) -> Option<ComplianceEvent> {
        let mut receiver = self.receiver.lock().await;
        match timeout {
            Some(duration) => tokio::time::timeout(duration, receiver.recv())
                .await
                .ok()
                .flatten(),
            None => receiver.try_recv().ok(),
        }
    }

    /// Total number of events ever intercepted.
    pub async fn count(&self) -> u64 {
        *self.event_count.lock().await
    }

    /// Completeness check: every expected event was counted.
    pub async fn verify_completeness(&self, expected: u64) -> bool {
        self.count().await == expected
    }
}

impl Default for EventInterceptor {
    fn default() -> Self {
        Self::new()
    }
}
