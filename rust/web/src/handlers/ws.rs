use crate::events::{EventSubscription, ServerEvent};
use crate::metrics::MetricsCollector;
use crate::rooms::{GameMode, RoomCode, RoomConfig, RoomError, RoomManager, SeatClaim};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use ludo_engine::rules::Ruleset;
use serde::Deserialize;
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

type WsSink = SplitSink<WebSocket, Message>;

/// Room creation parameters carried by a `create_room` intent.
///
/// # Fields
///
/// * `mode` - Seat composition (`"4p"`, `"1v3"`, `"2v2"` or `"3v1"`)
/// * `rules` - Optional rule toggles; omitted fields use the classic rules
/// * `seed` - Optional dice seed for reproducible matches
/// * `cpu_strategy` - Optional CPU strategy name (defaults to `"greedy"`)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    pub mode: GameMode,
    #[serde(default)]
    pub rules: Option<Ruleset>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub cpu_strategy: Option<String>,
}

impl CreateRoomRequest {
    fn into_config(self) -> RoomConfig {
        let defaults = RoomConfig::default();
        RoomConfig {
            mode: self.mode,
            rules: self.rules.unwrap_or_default(),
            seed: self.seed,
            cpu_strategy: self.cpu_strategy.unwrap_or(defaults.cpu_strategy),
        }
    }
}

/// One message from a connected client, tagged by `type`.
///
/// # Wire Format
///
/// ```json
/// {"type": "create_room", "mode": "1v3", "seed": 42}
/// {"type": "join_room", "code": "XK2P9"}
/// {"type": "roll"}
/// {"type": "move", "token": 2}
/// {"type": "leave"}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientIntent {
    CreateRoom(CreateRoomRequest),
    JoinRoom { code: RoomCode },
    Roll,
    Move { token: usize },
    Leave,
}

/// The room a connection currently occupies. Dropping the subscription
/// unsubscribes the connection from the room's events.
struct Membership {
    code: RoomCode,
    seat: usize,
    subscription: EventSubscription,
}

/// Drives one websocket connection for its whole lifetime.
///
/// # Path
///
/// `GET /ws` (websocket upgrade)
///
/// # Purpose
///
/// The single game transport. A connection starts without a room, claims one
/// with a `create_room` or `join_room` intent, and from then on receives the
/// room's event stream interleaved with replies to its own intents. Closing
/// the socket (or a `leave` intent) releases the seat; in a started match the
/// seat switches to autopilot until the player rejoins.
///
/// # Intents
///
/// See [`ClientIntent`] for the wire format. Rejected intents produce an
/// `error` event carrying a stable machine-readable `code`; the connection
/// itself stays open.
///
/// # Events
///
/// Every event is one JSON text frame shaped like
/// [`ServerEvent`](crate::events::ServerEvent). When the room is destroyed
/// while the connection is still in it, the client receives a final `error`
/// event with code `room_not_found` and is free to join another room.
///
/// # Arguments
///
/// * `socket` - The upgraded websocket
/// * `rooms` - Shared room registry
/// * `metrics` - Collector for connection and intent counters
pub async fn game_socket(socket: WebSocket, rooms: RoomManager, metrics: MetricsCollector) {
    let conn_id = Uuid::new_v4();
    metrics.record_client_connected();
    tracing::info!(conn_id = %conn_id, "websocket client connected");

    let (mut sink, mut stream) = socket.split();
    let mut membership: Option<Membership> = None;

    loop {
        tokio::select! {
            event = next_room_event(&mut membership) => {
                match event {
                    Some(event) => {
                        if !forward_event(&mut sink, &event).await {
                            break;
                        }
                    }
                    None => {
                        // The stream closes when the room is destroyed or this
                        // subscriber was pruned for falling behind. The seat is
                        // no longer being served either way.
                        if let Some(current) = membership.take() {
                            release_seat(&rooms, &current);
                        }
                        if !send_error(&mut sink, "room_not_found", "room closed").await {
                            break;
                        }
                    }
                }
            }
            message = stream.next() => {
                let message = match message {
                    Some(Ok(message)) => message,
                    Some(Err(err)) => {
                        tracing::debug!(conn_id = %conn_id, error = %err, "websocket read failed");
                        break;
                    }
                    None => break,
                };
                if message.is_close() {
                    break;
                }
                let Ok(text) = message.to_str() else {
                    continue;
                };
                let intent = match serde_json::from_str::<ClientIntent>(text) {
                    Ok(intent) => intent,
                    Err(err) => {
                        metrics.record_intent_rejected();
                        let reply = format!("unrecognized intent: {err}");
                        if !send_error(&mut sink, "bad_request", &reply).await {
                            break;
                        }
                        continue;
                    }
                };

                match intent {
                    ClientIntent::CreateRoom(request) => {
                        if membership.is_some() {
                            metrics.record_intent_rejected();
                            if !send_error(&mut sink, "bad_request", "leave the current room first")
                                .await
                            {
                                break;
                            }
                            continue;
                        }
                        let config = request.into_config();
                        let mode = config.mode;
                        let code = match rooms.create_room(config) {
                            Ok(code) => code,
                            Err(err) => {
                                metrics.record_intent_rejected();
                                if !send_room_error(&mut sink, &err).await {
                                    break;
                                }
                                continue;
                            }
                        };
                        // Subscribe before attaching so the join broadcast
                        // lands in this connection's stream.
                        let subscription = rooms.event_bus().subscribe(code.clone(), Some(0));
                        let created = ServerEvent::RoomCreated {
                            code: code.clone(),
                            seat: 0,
                            mode,
                        };
                        if !forward_event(&mut sink, &created).await {
                            break;
                        }
                        match rooms.attach(&code, 0) {
                            Ok(()) => {
                                metrics.record_intent_accepted();
                                membership = Some(Membership {
                                    code,
                                    seat: 0,
                                    subscription,
                                });
                            }
                            Err(err) => {
                                metrics.record_intent_rejected();
                                if !send_room_error(&mut sink, &err).await {
                                    break;
                                }
                            }
                        }
                    }
                    ClientIntent::JoinRoom { code } => {
                        if membership.is_some() {
                            metrics.record_intent_rejected();
                            if !send_error(&mut sink, "bad_request", "leave the current room first")
                                .await
                            {
                                break;
                            }
                            continue;
                        }
                        // Codes are case-insensitive on the wire; the bus and the
                        // membership must use the canonical uppercase form.
                        let code = code.to_ascii_uppercase();
                        let SeatClaim { seat, rejoined } = match rooms.join_room(&code) {
                            Ok(claim) => claim,
                            Err(err) => {
                                metrics.record_intent_rejected();
                                if !send_room_error(&mut sink, &err).await {
                                    break;
                                }
                                continue;
                            }
                        };
                        let subscription = rooms.event_bus().subscribe(code.clone(), Some(seat));
                        let assigned = ServerEvent::SeatAssigned {
                            code: code.clone(),
                            seat,
                            rejoined,
                        };
                        if !forward_event(&mut sink, &assigned).await {
                            break;
                        }
                        match rooms.attach(&code, seat) {
                            Ok(()) => {
                                metrics.record_intent_accepted();
                                membership = Some(Membership {
                                    code,
                                    seat,
                                    subscription,
                                });
                            }
                            Err(err) => {
                                metrics.record_intent_rejected();
                                if !send_room_error(&mut sink, &err).await {
                                    break;
                                }
                            }
                        }
                    }
                    ClientIntent::Roll => {
                        let Some(current) = &membership else {
                            metrics.record_intent_rejected();
                            if !send_error(&mut sink, "bad_request", "join a room first").await {
                                break;
                            }
                            continue;
                        };
                        match rooms.handle_roll(&current.code, current.seat) {
                            Ok(()) => metrics.record_intent_accepted(),
                            Err(err) => {
                                metrics.record_intent_rejected();
                                if !send_room_error(&mut sink, &err).await {
                                    break;
                                }
                            }
                        }
                    }
                    ClientIntent::Move { token } => {
                        let Some(current) = &membership else {
                            metrics.record_intent_rejected();
                            if !send_error(&mut sink, "bad_request", "join a room first").await {
                                break;
                            }
                            continue;
                        };
                        match rooms.handle_move(&current.code, current.seat, token) {
                            Ok(()) => metrics.record_intent_accepted(),
                            Err(err) => {
                                metrics.record_intent_rejected();
                                if !send_room_error(&mut sink, &err).await {
                                    break;
                                }
                            }
                        }
                    }
                    ClientIntent::Leave => {
                        let Some(current) = membership.take() else {
                            metrics.record_intent_rejected();
                            if !send_error(&mut sink, "bad_request", "join a room first").await {
                                break;
                            }
                            continue;
                        };
                        release_seat(&rooms, &current);
                        metrics.record_intent_accepted();
                    }
                }
            }
        }
    }

    if let Some(current) = membership.take() {
        release_seat(&rooms, &current);
    }
    metrics.record_client_disconnected();
    tracing::info!(conn_id = %conn_id, "websocket client disconnected");
}

/// Waits for the next event of the joined room. Without a membership the
/// future never resolves, so the select loop only reads the socket.
async fn next_room_event(membership: &mut Option<Membership>) -> Option<ServerEvent> {
    match membership {
        Some(current) => current.subscription.receiver.recv().await,
        None => std::future::pending().await,
    }
}

fn release_seat(rooms: &RoomManager, membership: &Membership) {
    if let Err(err) = rooms.detach(&membership.code, membership.seat) {
        // The room may already be gone when the socket closes late.
        tracing::debug!(
            room_code = %membership.code,
            seat = membership.seat,
            error = %err,
            "detach after close"
        );
    }
}

/// Sends one event as a JSON text frame. Returns `false` when the socket is
/// gone and the connection loop should end.
async fn forward_event(sink: &mut WsSink, event: &ServerEvent) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize server event");
            return true;
        }
    };
    sink.send(Message::text(text)).await.is_ok()
}

async fn send_error(sink: &mut WsSink, code: &str, message: &str) -> bool {
    forward_event(
        sink,
        &ServerEvent::Error {
            code: code.to_string(),
            message: message.to_string(),
        },
    )
    .await
}

async fn send_room_error(sink: &mut WsSink, err: &RoomError) -> bool {
    forward_event(
        sink,
        &ServerEvent::Error {
            code: err.wire_code().to_string(),
            message: err.to_string(),
        },
    )
    .await
}
