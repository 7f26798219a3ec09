use crate::metrics::MetricsCollector;
use crate::rooms::{GameMode, RoomCode, SeatKind};
use ludo_engine::rules::{Capture, Move};
use ludo_engine::state::MatchSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

// Bounded per-subscriber channel. A subscriber that falls this far behind
// is pruned rather than allowed to gap the event stream.
const EVENT_CHANNEL_BUFFER: usize = 256;

pub type EventSender = mpsc::Sender<ServerEvent>;
pub type EventReceiver = mpsc::Receiver<ServerEvent>;

pub struct EventSubscription {
    bus: EventBus,
    room_code: RoomCode,
    subscriber_id: usize,
    pub receiver: EventReceiver,
}

impl EventSubscription {
    pub fn receiver(&mut self) -> &mut EventReceiver {
        &mut self.receiver
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.room_code, self.subscriber_id);
    }
}

#[derive(Debug, Clone)]
struct Subscriber {
    id: usize,
    /// Seat the connection occupies; `None` for spectating subscribers.
    seat: Option<usize>,
    tx: EventSender,
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

#[derive(Debug, Default)]
struct EventBusInner {
    subscribers: RwLock<HashMap<RoomCode, Vec<Subscriber>>>,
    next_id: AtomicUsize,
    metrics: Option<MetricsCollector>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus that reports every delivered broadcast to the metrics collector.
    pub fn with_metrics(metrics: MetricsCollector) -> Self {
        Self {
            inner: Arc::new(EventBusInner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicUsize::new(0),
                metrics: Some(metrics),
            }),
        }
    }

    pub fn subscribe(&self, room_code: RoomCode, seat: Option<usize>) -> EventSubscription {
        let (subscriber_id, receiver) = self.subscribe_raw(room_code.clone(), seat);
        EventSubscription {
            bus: self.clone(),
            room_code,
            subscriber_id,
            receiver,
        }
    }

    fn subscribe_raw(&self, room_code: RoomCode, seat: Option<usize>) -> (usize, EventReceiver) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        let id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        let mut guard = self
            .inner
            .subscribers
            .write()
            .expect("subscriber lock poisoned");
        guard
            .entry(room_code.clone())
            .or_default()
            .push(Subscriber { id, seat, tx });

        tracing::info!(
            room_code = %room_code,
            subscriber_id = id,
            seat = ?seat,
            "client subscribed to room events"
        );

        (id, rx)
    }

    /// Delivers `event` to every subscriber of the room, in subscription
    /// order. Callers that need events observed in emission order must not
    /// interleave broadcasts to the same room from concurrent threads.
    pub fn broadcast(&self, room_code: &RoomCode, event: ServerEvent) {
        tracing::debug!(
            room_code = %room_code,
            event_type = ?event,
            "broadcasting room event"
        );
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_event_broadcast();
        }

        let subscribers = {
            let guard = self
                .inner
                .subscribers
                .read()
                .expect("subscriber lock poisoned");
            guard.get(room_code).cloned()
        };

        if let Some(list) = subscribers {
            self.deliver(room_code, &list, event);
        } else {
            tracing::debug!(
                room_code = %room_code,
                "no subscribers for room"
            );
        }
    }

    /// Delivers `event` only to connections occupying `seat`. Used for
    /// per-seat payloads such as the legal-move list after a roll.
    pub fn send_to_seat(&self, room_code: &RoomCode, seat: usize, event: ServerEvent) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.record_event_broadcast();
        }

        let subscribers = {
            let guard = self
                .inner
                .subscribers
                .read()
                .expect("subscriber lock poisoned");
            guard.get(room_code).map(|list| {
                list.iter()
                    .filter(|sub| sub.seat == Some(seat))
                    .cloned()
                    .collect::<Vec<_>>()
            })
        };

        if let Some(list) = subscribers {
            self.deliver(room_code, &list, event);
        }
    }

    fn deliver(&self, room_code: &RoomCode, list: &[Subscriber], event: ServerEvent) {
        let mut failed = Vec::new();
        for sub in list {
            // Use try_send to avoid blocking on full channels
            // This implements backpressure by dropping events for slow subscribers
            if let Err(e) = sub.tx.try_send(event.clone()) {
                tracing::warn!(
                    room_code = %room_code,
                    subscriber_id = sub.id,
                    error = ?e,
                    "failed to send event to subscriber"
                );
                failed.push(sub.id);
            }
        }
        if !failed.is_empty() {
            self.remove_subscribers(room_code, &failed);
        }
    }

    pub fn unsubscribe(&self, room_code: &RoomCode, subscriber_id: usize) {
        self.remove_subscribers(room_code, &[subscriber_id]);
    }

    pub fn drop_room(&self, room_code: &RoomCode) {
        let mut guard = self
            .inner
            .subscribers
            .write()
            .expect("subscriber lock poisoned");
        guard.remove(room_code);
    }

    pub fn subscriber_count(&self) -> usize {
        let guard = self
            .inner
            .subscribers
            .read()
            .expect("subscriber lock poisoned");
        guard.values().map(|list| list.len()).sum()
    }

    fn remove_subscribers(&self, room_code: &RoomCode, ids: &[usize]) {
        let mut guard = self
            .inner
            .subscribers
            .write()
            .expect("subscriber lock poisoned");
        if let Some(list) = guard.get_mut(room_code) {
            list.retain(|sub| !ids.contains(&sub.id));
            if list.is_empty() {
                guard.remove(room_code);
            }
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    RoomCreated {
        code: RoomCode,
        seat: usize,
        mode: GameMode,
    },
    SeatAssigned {
        code: RoomCode,
        seat: usize,
        rejoined: bool,
    },
    PlayerJoined {
        seat: usize,
        seats: Vec<SeatInfo>,
    },
    PlayerLeft {
        seat: usize,
        seats: Vec<SeatInfo>,
    },
    GameStarted {
        snapshot: MatchSnapshot,
        seats: Vec<SeatInfo>,
    },
    DiceRolled {
        seat: usize,
        value: u8,
    },
    LegalMoves {
        seat: usize,
        moves: Vec<Move>,
    },
    MoveApplied {
        seat: usize,
        snapshot: MatchSnapshot,
        captures: Vec<Capture>,
    },
    TurnChanged {
        seat: usize,
    },
    GameOver {
        winning_seat: usize,
        snapshot: MatchSnapshot,
    },
    Error {
        code: String,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatInfo {
    pub seat: usize,
    pub kind: SeatKind,
    pub connected: bool,
}
