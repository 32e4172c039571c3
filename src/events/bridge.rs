//! Event bridge between the page store and its listeners
//!
//! Listeners registered with [`PageEventBridge::add_listener`] are awaited
//! one after another, in registration order, for every published event. A
//! failing listener is logged and skipped; it never prevents delivery to the
//! others or of later events. Passive observers can additionally tap the
//! broadcast channel returned by [`PageEventBridge::subscribe`].

use crate::error::Result;
use crate::events::types::{EventEnvelope, EventStats, WikiEvent};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error};

/// Default broadcast channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Receiver of wiki events
#[async_trait]
pub trait WikiEventListener: Send + Sync {
    /// Handle one event
    async fn action_performed(&self, event: &WikiEvent) -> Result<()>;
}

/// Handle returned by [`PageEventBridge::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Outcome of delivering one event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Listeners that handled the event
    pub delivered: usize,
    /// Listeners that returned an error
    pub failed: usize,
}

/// Page event bridge
pub struct PageEventBridge {
    /// Registered listeners
    listeners: RwLock<Vec<(ListenerId, Arc<dyn WikiEventListener>)>>,
    /// Broadcast channel for passive observers
    tx: broadcast::Sender<EventEnvelope>,
    /// Event statistics
    stats: RwLock<EventStats>,
    next_id: AtomicU64,
}

impl PageEventBridge {
    /// Create a new bridge
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            listeners: RwLock::new(Vec::new()),
            tx,
            stats: RwLock::new(EventStats::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener
    pub fn add_listener(&self, listener: Arc<dyn WikiEventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        debug!(listener = id.0, "Event listener registered");
        id
    }

    /// Unregister a listener; returns false if it was not registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Publish an event to all listeners
    pub async fn publish(&self, event: WikiEvent) -> DeliveryReport {
        let envelope = EventEnvelope::new(event);
        let event_type = envelope.event.event_type();

        debug!(
            event_id = %envelope.id,
            event_type = event_type,
            page = ?envelope.event.page_path(),
            "Publishing event"
        );

        self.stats.write().record_event(event_type);

        // Snapshot so no lock is held across listener awaits
        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        let mut report = DeliveryReport::default();
        for (id, listener) in listeners {
            match listener.action_performed(&envelope.event).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(
                        listener = id.0,
                        event_type = event_type,
                        error_code = e.error_code(),
                        error = %e,
                        "Event listener failed"
                    );
                }
            }
        }

        if report.failed > 0 {
            self.stats.write().listener_failures += report.failed as u64;
        }

        // No receivers is not an error
        let _ = self.tx.send(envelope);

        report
    }

    /// Subscribe to events (for passive observers)
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Get event statistics
    pub fn stats(&self) -> EventStats {
        self.stats.read().clone()
    }
}

impl Default for PageEventBridge {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use parking_lot::Mutex;

    struct Recorder {
        seen: Mutex<Vec<WikiEvent>>,
    }

    #[async_trait]
    impl WikiEventListener for Recorder {
        async fn action_performed(&self, event: &WikiEvent) -> Result<()> {
            self.seen.lock().push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl WikiEventListener for Failing {
        async fn action_performed(&self, _event: &WikiEvent) -> Result<()> {
            Err(AppError::Internal("listener exploded".to_string()))
        }
    }

    fn recorder() -> Arc<Recorder> {
        Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_delivery_in_order() {
        let bridge = PageEventBridge::default();
        let rec = recorder();
        bridge.add_listener(rec.clone());

        bridge.publish(WikiEvent::saved("A")).await;
        bridge.publish(WikiEvent::delete_requested("B")).await;

        let seen = rec.seen.lock().clone();
        assert_eq!(
            seen,
            vec![WikiEvent::saved("A"), WikiEvent::delete_requested("B")]
        );
    }

    #[tokio::test]
    async fn test_failing_listener_is_isolated() {
        let bridge = PageEventBridge::default();
        let rec = recorder();
        bridge.add_listener(Arc::new(Failing));
        bridge.add_listener(rec.clone());

        let report = bridge.publish(WikiEvent::saved("A")).await;
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 1 });

        let report = bridge.publish(WikiEvent::saved("B")).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(rec.seen.lock().len(), 2);
        assert_eq!(bridge.stats().listener_failures, 2);
    }

    #[tokio::test]
    async fn test_remove_listener() {
        let bridge = PageEventBridge::default();
        let rec = recorder();
        let id = bridge.add_listener(rec.clone());

        assert!(bridge.remove_listener(id));
        assert!(!bridge.remove_listener(id));
        assert_eq!(bridge.listener_count(), 0);

        let report = bridge.publish(WikiEvent::saved("A")).await;
        assert_eq!(report, DeliveryReport::default());
        assert!(rec.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_subscription() {
        let bridge = PageEventBridge::default();
        let mut rx = bridge.subscribe();

        bridge.publish(WikiEvent::EngineStarted).await;

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event, WikiEvent::EngineStarted);
        assert_eq!(bridge.stats().total_events, 1);
    }
}
