use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the room server. Cloning shares the same collector.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    rooms_created: AtomicU64,
    rooms_closed: AtomicU64,
    active_rooms: AtomicU64,
    ws_connections: AtomicU64,
    intents_accepted: AtomicU64,
    intents_rejected: AtomicU64,
    events_broadcast: AtomicU64,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                rooms_created: AtomicU64::new(0),
                rooms_closed: AtomicU64::new(0),
                active_rooms: AtomicU64::new(0),
                ws_connections: AtomicU64::new(0),
                intents_accepted: AtomicU64::new(0),
                intents_rejected: AtomicU64::new(0),
                events_broadcast: AtomicU64::new(0),
            }),
        }
    }

    /// Record a room coming into existence
    pub fn record_room_created(&self) {
        self.inner.rooms_created.fetch_add(1, Ordering::Relaxed);
        let count = self.inner.active_rooms.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(active_rooms = count, "room count increased");
    }

    /// Record a room being destroyed
    pub fn record_room_closed(&self) {
        self.inner.rooms_closed.fetch_add(1, Ordering::Relaxed);
        decrement_gauge(&self.inner.active_rooms, "active_rooms");
    }

    /// Record a websocket client connecting
    pub fn record_client_connected(&self) {
        let count = self.inner.ws_connections.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(ws_connections = count, "connection count increased");
    }

    /// Record a websocket client disconnecting
    pub fn record_client_disconnected(&self) {
        decrement_gauge(&self.inner.ws_connections, "ws_connections");
    }

    /// Record a client intent the room layer accepted
    pub fn record_intent_accepted(&self) {
        self.inner.intents_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a client intent that was rejected (parse failure or rule error)
    pub fn record_intent_rejected(&self) {
        self.inner.intents_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an event delivery pass to a room's subscribers
    pub fn record_event_broadcast(&self) {
        self.inner.events_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rooms_created: self.inner.rooms_created.load(Ordering::Relaxed),
            rooms_closed: self.inner.rooms_closed.load(Ordering::Relaxed),
            active_rooms: self.inner.active_rooms.load(Ordering::Relaxed),
            ws_connections: self.inner.ws_connections.load(Ordering::Relaxed),
            intents_accepted: self.inner.intents_accepted.load(Ordering::Relaxed),
            intents_rejected: self.inner.intents_rejected.load(Ordering::Relaxed),
            events_broadcast: self.inner.events_broadcast.load(Ordering::Relaxed),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            rooms_created = snapshot.rooms_created,
            rooms_closed = snapshot.rooms_closed,
            active_rooms = snapshot.active_rooms,
            ws_connections = snapshot.ws_connections,
            intents_accepted = snapshot.intents_accepted,
            intents_rejected = snapshot.intents_rejected,
            events_broadcast = snapshot.events_broadcast,
            "server metrics"
        );
    }
}

/// Lower a gauge by one, holding it at zero if a double decrement slips in.
fn decrement_gauge(gauge: &AtomicU64, name: &str) {
    let mut current = gauge.load(Ordering::Relaxed);
    loop {
        if current == 0 {
            tracing::warn!(gauge = name, "attempted to decrement gauge below zero");
            return;
        }

        match gauge.compare_exchange(current, current - 1, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => {
                tracing::debug!(gauge = name, value = current - 1, "gauge decreased");
                return;
            }
            Err(actual) => current = actual,
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub rooms_created: u64,
    pub rooms_closed: u64,
    pub active_rooms: u64,
    pub ws_connections: u64,
    pub intents_accepted: u64,
    pub intents_rejected: u64,
    pub events_broadcast: u64,
}

impl MetricsSnapshot {
    pub fn intents_total(&self) -> u64 {
        self.intents_accepted + self.intents_rejected
    }

    pub fn intent_rejection_rate(&self) -> f64 {
        let total = self.intents_total();
        if total > 0 {
            (self.intents_rejected as f64) / (total as f64)
        } else {
            0.0
        }
    }
}
