use crate::events::{EventBus, SeatInfo, ServerEvent};
use crate::metrics::MetricsCollector;
use ludo_ai::{create_strategy, CpuStrategy};
use ludo_engine::dice::Dice;
use ludo_engine::errors::RulesError;
use ludo_engine::rules::Ruleset;
use ludo_engine::state::{MatchState, MoveOutcome, RollOutcome, TurnPhase, SEATS};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;

pub type RoomCode = String;

const DEFAULT_ROOM_TTL: Duration = Duration::from_secs(30 * 60);
/// Finished rooms linger so late clients can still fetch the final snapshot.
const FINISHED_ROOM_LINGER: Duration = Duration::from_secs(60);

const ROOM_CODE_LEN: usize = 5;
// 0/O and 1/I are omitted so codes survive being read aloud or retyped.
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const MAX_CODE_ATTEMPTS: usize = 64;

/// Seat composition of a room. Humans always occupy the low seats and the
/// remainder are CPU seats filled at creation, so seat 0 is the creator in
/// every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    #[serde(rename = "4p")]
    FourHumans,
    #[serde(rename = "1v3")]
    OneVsThreeCpu,
    #[serde(rename = "2v2")]
    TwoVsTwoCpu,
    #[serde(rename = "3v1")]
    ThreeVsOneCpu,
}

impl GameMode {
    pub fn human_seats(self) -> usize {
        match self {
            GameMode::FourHumans => 4,
            GameMode::OneVsThreeCpu => 1,
            GameMode::TwoVsTwoCpu => 2,
            GameMode::ThreeVsOneCpu => 3,
        }
    }

    pub fn is_cpu_seat(self, seat: usize) -> bool {
        seat >= self.human_seats()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::FourHumans => "4p",
            GameMode::OneVsThreeCpu => "1v3",
            GameMode::TwoVsTwoCpu => "2v2",
            GameMode::ThreeVsOneCpu => "3v1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatKind {
    Human,
    Cpu,
}

/// Owns every live room and drives their clocks: CPU pacing ticks, turn
/// timeouts, and the grace timer for abandoned rooms. Cloning is cheap and
/// shares the same registry.
#[derive(Clone)]
pub struct RoomManager {
    inner: Arc<RoomManagerInner>,
}

struct RoomManagerInner {
    rooms: RwLock<HashMap<RoomCode, Arc<Room>>>,
    event_bus: EventBus,
    policy: RoomPolicy,
    ttl: Duration,
    metrics: Option<MetricsCollector>,
}

impl std::fmt::Debug for RoomManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomManager")
            .field("rooms", &self.room_count())
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

impl RoomManager {
    pub fn new(event_bus: EventBus) -> Self {
        Self::with_policy(event_bus, RoomPolicy::default())
    }

    pub fn with_policy(event_bus: EventBus, policy: RoomPolicy) -> Self {
        Self {
            inner: Arc::new(RoomManagerInner {
                rooms: RwLock::new(HashMap::new()),
                event_bus,
                policy,
                ttl: DEFAULT_ROOM_TTL,
                metrics: None,
            }),
        }
    }

    pub fn with_ttl(event_bus: EventBus, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RoomManagerInner {
                rooms: RwLock::new(HashMap::new()),
                event_bus,
                policy: RoomPolicy::default(),
                ttl,
                metrics: None,
            }),
        }
    }

    pub fn with_policy_and_metrics(
        event_bus: EventBus,
        policy: RoomPolicy,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            inner: Arc::new(RoomManagerInner {
                rooms: RwLock::new(HashMap::new()),
                event_bus,
                policy,
                ttl: DEFAULT_ROOM_TTL,
                metrics: Some(metrics),
            }),
        }
    }

    /// Creates a room under a fresh code, reserving seat 0 for the creator.
    /// The creator is not connected until [`RoomManager::attach`] runs, so
    /// the match never starts here.
    pub fn create_room(&self, config: RoomConfig) -> Result<RoomCode, RoomError> {
        let mut rooms = self
            .inner
            .rooms
            .write()
            .map_err(|_| RoomError::StoragePoisoned)?;

        let mut rng = rand::rng();
        let mut code = generate_room_code(&mut rng);
        let mut attempts = 1;
        while rooms.contains_key(&code) {
            if attempts >= MAX_CODE_ATTEMPTS {
                return Err(RoomError::CodesExhausted(attempts));
            }
            code = generate_room_code(&mut rng);
            attempts += 1;
        }

        let room = Arc::new(Room::new(code.clone(), config, self.inner.policy));
        let mode = room.mode();
        rooms.insert(code.clone(), room);
        let room_count = rooms.len();
        drop(rooms);

        if let Some(metrics) = &self.inner.metrics {
            metrics.record_room_created();
        }
        tracing::info!(
            room_code = %code,
            mode = mode.as_str(),
            room_count = room_count,
            "room created"
        );
        Ok(code)
    }

    /// Claims a seat in an existing room. Waiting rooms hand out the lowest
    /// free human seat; started rooms hand back a disconnected seat when the
    /// reconnect policy allows it.
    pub fn join_room(&self, code: &RoomCode) -> Result<SeatClaim, RoomError> {
        let room = self.get_room(code)?;
        room.touch();
        let mut inner = room.lock()?;
        match inner.phase {
            RoomPhase::Waiting => {
                let seat = (0..SEATS)
                    .find(|&seat| {
                        let state = &inner.seats[seat];
                        state.kind == SeatKind::Human && !state.occupied
                    })
                    .ok_or_else(|| RoomError::Full(code.clone()))?;
                inner.seats[seat].occupied = true;
                Ok(SeatClaim {
                    seat,
                    rejoined: false,
                })
            }
            RoomPhase::Playing if self.inner.policy.allow_reconnect => {
                let seat = (0..SEATS)
                    .find(|&seat| {
                        let state = &inner.seats[seat];
                        state.kind == SeatKind::Human && state.occupied && !state.connected
                    })
                    .ok_or_else(|| RoomError::AlreadyStarted(code.clone()))?;
                Ok(SeatClaim {
                    seat,
                    rejoined: true,
                })
            }
            _ => Err(RoomError::AlreadyStarted(code.clone())),
        }
    }

    /// Marks a claimed seat connected, announcing the join to the room.
    /// Starts the match once every human seat is connected and resyncs a
    /// rejoining seat with the current snapshot.
    pub fn attach(&self, code: &RoomCode, seat: usize) -> Result<(), RoomError> {
        let room = self.get_room(code)?;
        room.touch();
        let follow = room.attach(&self.inner.event_bus, seat)?;
        self.schedule(code, follow);
        Ok(())
    }

    /// Marks a seat disconnected. Empty waiting rooms are removed at once;
    /// started rooms switch the seat to autopilot and arm the grace timer
    /// when no human connection remains.
    pub fn detach(&self, code: &RoomCode, seat: usize) -> Result<(), RoomError> {
        let room = self.get_room(code)?;
        room.touch();
        let detached = room.detach(&self.inner.event_bus, seat)?;
        if detached.empty {
            self.remove_room(code, "room emptied before start");
            return Ok(());
        }
        self.schedule(code, detached.follow);
        if let Some(presence) = detached.grace {
            self.schedule_grace(code, presence);
        }
        Ok(())
    }

    /// Applies a roll intent from `seat`.
    pub fn handle_roll(&self, code: &RoomCode, seat: usize) -> Result<(), RoomError> {
        let room = self.get_room(code)?;
        room.touch();
        let follow = room.drive_roll(&self.inner.event_bus, seat)?;
        self.schedule(code, follow);
        Ok(())
    }

    /// Applies a move intent from `seat` for the given token.
    pub fn handle_move(&self, code: &RoomCode, seat: usize, token: usize) -> Result<(), RoomError> {
        let room = self.get_room(code)?;
        room.touch();
        let follow = room.drive_move(&self.inner.event_bus, seat, token)?;
        self.schedule(code, follow);
        Ok(())
    }

    /// Public view of a room for the status endpoint.
    pub fn room_status(&self, code: &RoomCode) -> Result<RoomStatus, RoomError> {
        self.get_room(code)?.status()
    }

    /// Sweeps rooms idle past the ttl, finished rooms past the linger window,
    /// and rooms whose lock a panic poisoned. Invoked periodically by the
    /// server reaper task.
    pub fn cleanup_idle_rooms(&self) {
        let expired: Vec<(RoomCode, &'static str)> = {
            let Ok(rooms) = self.inner.rooms.read() else {
                return;
            };
            rooms
                .iter()
                .filter_map(|(code, room)| {
                    if room.is_poisoned() {
                        Some((code.clone(), "room lock poisoned"))
                    } else if room.is_expired(self.inner.ttl)
                        || room.is_finished_past(FINISHED_ROOM_LINGER)
                    {
                        Some((code.clone(), "room expired"))
                    } else {
                        None
                    }
                })
                .collect()
        };
        for (code, reason) in expired {
            self.remove_room(&code, reason);
        }
    }

    pub fn active_rooms(&self) -> Vec<RoomCode> {
        self.inner
            .rooms
            .read()
            .map(|rooms| rooms.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.read().map(|rooms| rooms.len()).unwrap_or(0)
    }

    pub fn event_bus(&self) -> EventBus {
        self.inner.event_bus.clone()
    }

    /// CPU pacing tick. The epoch pins the turn the tick was armed for, so
    /// a tick that lost the race against a player intent does nothing.
    fn cpu_step(&self, code: &RoomCode, epoch: u64) {
        let Ok(room) = self.get_room(code) else {
            return;
        };
        match room.cpu_step(&self.inner.event_bus, epoch) {
            Ok(follow) => self.schedule(code, follow),
            Err(err) => {
                tracing::warn!(room_code = %code, error = %err, "cpu step failed");
            }
        }
    }

    fn turn_timeout_fired(&self, code: &RoomCode, epoch: u64) {
        let Ok(room) = self.get_room(code) else {
            return;
        };
        match room.forfeit_stalled_turn(&self.inner.event_bus, epoch) {
            Ok(follow) => self.schedule(code, follow),
            Err(err) => {
                tracing::warn!(room_code = %code, error = %err, "turn timeout failed");
            }
        }
    }

    fn grace_expired(&self, code: &RoomCode, presence: u64) {
        let Ok(room) = self.get_room(code) else {
            return;
        };
        if room.is_abandoned_since(presence) {
            self.remove_room(code, "every human seat disconnected past the grace period");
        }
    }

    fn schedule(&self, code: &RoomCode, follow: FollowUp) {
        match follow {
            FollowUp::Idle => {}
            FollowUp::CpuStep { epoch } => {
                let manager = self.clone();
                let code = code.clone();
                let pause = self.inner.policy.cpu_pause;
                tokio::spawn(async move {
                    tokio::time::sleep(pause).await;
                    manager.cpu_step(&code, epoch);
                });
            }
            FollowUp::TurnTimer { epoch } => {
                let Some(timeout) = self.inner.policy.turn_timeout else {
                    return;
                };
                let manager = self.clone();
                let code = code.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    manager.turn_timeout_fired(&code, epoch);
                });
            }
        }
    }

    fn schedule_grace(&self, code: &RoomCode, presence: u64) {
        let manager = self.clone();
        let code = code.clone();
        let grace = self.inner.policy.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            manager.grace_expired(&code, presence);
        });
    }

    // Codes are matched case-insensitively; the table stores the uppercase form.
    fn get_room(&self, code: &RoomCode) -> Result<Arc<Room>, RoomError> {
        let rooms = self
            .inner
            .rooms
            .read()
            .map_err(|_| RoomError::StoragePoisoned)?;
        rooms
            .get(&code.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    fn remove_room(&self, code: &RoomCode, reason: &str) {
        let removed = {
            let Ok(mut rooms) = self.inner.rooms.write() else {
                return;
            };
            rooms.remove(code)
        };
        if removed.is_some() {
            // Dropping the bus entry closes every subscriber channel, which
            // is how connected clients learn the room is gone.
            self.inner.event_bus.drop_room(code);
            if let Some(metrics) = &self.inner.metrics {
                metrics.record_room_closed();
            }
            tracing::info!(room_code = %code, reason = reason, "room removed");
        }
    }
}

/// A single Ludo room: immutable identity and config plus the mutable match
/// state behind one mutex, so each turn resolves atomically and its events
/// leave in board order.
pub struct Room {
    code: RoomCode,
    config: RoomConfig,
    policy: RoomPolicy,
    strategy: Box<dyn CpuStrategy>,
    inner: Mutex<RoomInner>,
    created_at: Instant,
    last_active: Mutex<Instant>,
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("code", &self.code)
            .field("mode", &self.config.mode)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

struct RoomInner {
    phase: RoomPhase,
    seats: [SeatState; SEATS],
    game: MatchState,
    dice: Dice,
    /// Bumped on every resolved transition; pending pacing ticks and turn
    /// timers compare it to detect they are stale.
    epoch: u64,
    /// Bumped on every attach and detach; pending grace timers compare it.
    presence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SeatState {
    kind: SeatKind,
    occupied: bool,
    connected: bool,
}

impl Default for SeatState {
    fn default() -> Self {
        Self {
            kind: SeatKind::Human,
            occupied: false,
            connected: false,
        }
    }
}

/// What the manager should arm after a resolved room operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FollowUp {
    Idle,
    CpuStep { epoch: u64 },
    TurnTimer { epoch: u64 },
}

struct Detached {
    follow: FollowUp,
    /// Presence stamp to arm a grace timer with, when the last human left.
    grace: Option<u64>,
    /// Waiting room with nobody left in it; remove immediately.
    empty: bool,
}

impl Room {
    fn new(code: RoomCode, config: RoomConfig, policy: RoomPolicy) -> Self {
        let dice = match config.seed {
            Some(seed) => Dice::with_seed(seed),
            None => Dice::new(),
        };
        let mut seats = [SeatState::default(); SEATS];
        for (seat, state) in seats.iter_mut().enumerate() {
            if config.mode.is_cpu_seat(seat) {
                *state = SeatState {
                    kind: SeatKind::Cpu,
                    occupied: true,
                    connected: true,
                };
            }
        }
        seats[0].occupied = true;

        let strategy = create_strategy(&config.cpu_strategy);
        let game = MatchState::new(config.rules);
        Self {
            code,
            config,
            policy,
            strategy,
            inner: Mutex::new(RoomInner {
                phase: RoomPhase::Waiting,
                seats,
                game,
                dice,
                epoch: 0,
                presence: 0,
            }),
            created_at: Instant::now(),
            last_active: Mutex::new(Instant::now()),
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn mode(&self) -> GameMode {
        self.config.mode
    }

    pub fn status(&self) -> Result<RoomStatus, RoomError> {
        let inner = self.lock()?;
        Ok(RoomStatus {
            code: self.code.clone(),
            mode: self.config.mode,
            phase: inner.phase,
            seats: seat_infos(&inner.seats),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, RoomInner>, RoomError> {
        self.inner.lock().map_err(|_| RoomError::StoragePoisoned)
    }

    fn touch(&self) {
        if let Ok(mut guard) = self.last_active.lock() {
            *guard = Instant::now();
        }
    }

    fn is_poisoned(&self) -> bool {
        self.inner.is_poisoned()
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_active
            .lock()
            .map(|guard| guard.elapsed() > ttl)
            .unwrap_or(false)
    }

    fn is_finished_past(&self, linger: Duration) -> bool {
        let finished = self
            .lock()
            .map(|inner| inner.phase == RoomPhase::Finished)
            .unwrap_or(false);
        finished
            && self
                .last_active
                .lock()
                .map(|guard| guard.elapsed() > linger)
                .unwrap_or(false)
    }

    fn attach(&self, bus: &EventBus, seat: usize) -> Result<FollowUp, RoomError> {
        let mut inner = self.lock()?;
        if seat >= SEATS || inner.seats[seat].kind != SeatKind::Human || !inner.seats[seat].occupied
        {
            return Err(RoomError::SeatUnavailable {
                room: self.code.clone(),
                seat,
            });
        }
        if inner.seats[seat].connected {
            return Err(RoomError::SeatUnavailable {
                room: self.code.clone(),
                seat,
            });
        }
        inner.seats[seat].connected = true;
        inner.presence += 1;
        bus.broadcast(
            &self.code,
            ServerEvent::PlayerJoined {
                seat,
                seats: seat_infos(&inner.seats),
            },
        );

        match inner.phase {
            RoomPhase::Waiting => {
                let humans_ready =
                    (0..self.config.mode.human_seats()).all(|seat| inner.seats[seat].connected);
                if humans_ready {
                    self.start_match(&mut inner, bus);
                    return Ok(self.follow_up(&inner));
                }
                Ok(FollowUp::Idle)
            }
            RoomPhase::Playing => {
                // Resync the rejoined seat with the full current picture.
                bus.send_to_seat(
                    &self.code,
                    seat,
                    ServerEvent::GameStarted {
                        snapshot: inner.game.snapshot(),
                        seats: seat_infos(&inner.seats),
                    },
                );
                if inner.game.turn() == seat && inner.game.phase() == TurnPhase::AwaitingMove {
                    bus.send_to_seat(
                        &self.code,
                        seat,
                        ServerEvent::LegalMoves {
                            seat,
                            moves: inner.game.legal().to_vec(),
                        },
                    );
                }
                Ok(self.follow_up(&inner))
            }
            RoomPhase::Finished => Ok(FollowUp::Idle),
        }
    }

    fn detach(&self, bus: &EventBus, seat: usize) -> Result<Detached, RoomError> {
        let mut inner = self.lock()?;
        if seat >= SEATS || inner.seats[seat].kind != SeatKind::Human || !inner.seats[seat].connected
        {
            // A second detach (explicit leave, then the socket closing) is
            // a no-op rather than an error.
            return Ok(Detached {
                follow: FollowUp::Idle,
                grace: None,
                empty: false,
            });
        }
        inner.seats[seat].connected = false;
        inner.presence += 1;
        if inner.phase == RoomPhase::Waiting {
            // Leaving an unstarted room gives the seat back to the next joiner.
            inner.seats[seat].occupied = false;
        }
        bus.broadcast(
            &self.code,
            ServerEvent::PlayerLeft {
                seat,
                seats: seat_infos(&inner.seats),
            },
        );

        let humans_connected = inner
            .seats
            .iter()
            .filter(|state| state.kind == SeatKind::Human && state.connected)
            .count();
        let empty = inner.phase == RoomPhase::Waiting
            && inner
                .seats
                .iter()
                .all(|state| state.kind == SeatKind::Cpu || !state.occupied);
        let grace = (!empty && humans_connected == 0 && inner.phase != RoomPhase::Finished)
            .then_some(inner.presence);
        let follow = if inner.phase == RoomPhase::Playing {
            self.follow_up(&inner)
        } else {
            FollowUp::Idle
        };
        Ok(Detached {
            follow,
            grace,
            empty,
        })
    }

    fn start_match(&self, inner: &mut RoomInner, bus: &EventBus) {
        inner.phase = RoomPhase::Playing;
        inner.epoch += 1;
        tracing::info!(
            room_code = %self.code,
            mode = self.config.mode.as_str(),
            "match started"
        );
        bus.broadcast(
            &self.code,
            ServerEvent::GameStarted {
                snapshot: inner.game.snapshot(),
                seats: seat_infos(&inner.seats),
            },
        );
    }

    fn drive_roll(&self, bus: &EventBus, seat: usize) -> Result<FollowUp, RoomError> {
        let mut inner = self.lock()?;
        if inner.phase == RoomPhase::Waiting {
            return Err(RoomError::NotStarted(self.code.clone()));
        }
        // Validate before drawing so a rejected intent cannot consume a die.
        if inner.game.phase() == TurnPhase::Finished {
            return Err(RulesError::MatchOver.into());
        }
        if inner.game.phase() != TurnPhase::AwaitingRoll {
            return Err(RulesError::RollNotAllowed.into());
        }
        if inner.game.turn() != seat {
            return Err(RulesError::NotYourTurn {
                expected: inner.game.turn(),
                actual: seat,
            }
            .into());
        }
        let value = inner.dice.roll();
        self.resolve_roll(&mut inner, bus, seat, value)?;
        Ok(self.follow_up(&inner))
    }

    fn drive_move(&self, bus: &EventBus, seat: usize, token: usize) -> Result<FollowUp, RoomError> {
        let mut inner = self.lock()?;
        if inner.phase == RoomPhase::Waiting {
            return Err(RoomError::NotStarted(self.code.clone()));
        }
        self.resolve_move(&mut inner, bus, seat, token)?;
        Ok(self.follow_up(&inner))
    }

    /// One CPU action per tick: a roll, or a move chosen by the strategy.
    /// Stale ticks (epoch mismatch, or the seat reconnected meanwhile) are
    /// dropped silently.
    fn cpu_step(&self, bus: &EventBus, epoch: u64) -> Result<FollowUp, RoomError> {
        let mut inner = self.lock()?;
        if inner.phase != RoomPhase::Playing || inner.epoch != epoch {
            return Ok(FollowUp::Idle);
        }
        let seat = inner.game.turn();
        let state = inner.seats[seat];
        let autopiloted =
            self.policy.autopilot_disconnected && state.kind == SeatKind::Human && !state.connected;
        if state.kind != SeatKind::Cpu && !autopiloted {
            return Ok(FollowUp::Idle);
        }
        match inner.game.phase() {
            TurnPhase::AwaitingRoll => {
                let value = inner.dice.roll();
                self.resolve_roll(&mut inner, bus, seat, value)?;
            }
            TurnPhase::AwaitingMove => {
                let legal = inner.game.legal().to_vec();
                let chosen = self.strategy.choose(&inner.game, &legal);
                self.resolve_move(&mut inner, bus, seat, chosen.token)?;
            }
            TurnPhase::Finished => return Ok(FollowUp::Idle),
        }
        Ok(self.follow_up(&inner))
    }

    fn forfeit_stalled_turn(&self, bus: &EventBus, epoch: u64) -> Result<FollowUp, RoomError> {
        let mut inner = self.lock()?;
        if inner.phase != RoomPhase::Playing || inner.epoch != epoch {
            return Ok(FollowUp::Idle);
        }
        let seat = inner.game.turn();
        inner.game.forfeit_turn(seat)?;
        inner.epoch += 1;
        tracing::info!(room_code = %self.code, seat = seat, "turn forfeited after timeout");
        bus.broadcast(
            &self.code,
            ServerEvent::TurnChanged {
                seat: inner.game.turn(),
            },
        );
        Ok(self.follow_up(&inner))
    }

    fn is_abandoned_since(&self, presence: u64) -> bool {
        self.lock()
            .map(|inner| {
                inner.presence == presence
                    && inner
                        .seats
                        .iter()
                        .all(|state| state.kind == SeatKind::Cpu || !state.connected)
            })
            .unwrap_or(false)
    }

    /// Applies a rolled value and emits the resulting events while the room
    /// lock is held, keeping the per-room event order authoritative.
    fn resolve_roll(
        &self,
        inner: &mut RoomInner,
        bus: &EventBus,
        seat: usize,
        value: u8,
    ) -> Result<RollOutcome, RoomError> {
        let outcome = inner.game.apply_roll(seat, value)?;
        inner.epoch += 1;
        bus.broadcast(
            &self.code,
            ServerEvent::DiceRolled {
                seat,
                value: outcome.value,
            },
        );
        if outcome.turn_over {
            bus.broadcast(
                &self.code,
                ServerEvent::TurnChanged {
                    seat: inner.game.turn(),
                },
            );
        } else {
            bus.send_to_seat(
                &self.code,
                seat,
                ServerEvent::LegalMoves {
                    seat,
                    moves: outcome.moves.clone(),
                },
            );
        }
        Ok(outcome)
    }

    fn resolve_move(
        &self,
        inner: &mut RoomInner,
        bus: &EventBus,
        seat: usize,
        token: usize,
    ) -> Result<MoveOutcome, RoomError> {
        let outcome = inner.game.apply_move(seat, token)?;
        inner.epoch += 1;
        bus.broadcast(
            &self.code,
            ServerEvent::MoveApplied {
                seat,
                snapshot: inner.game.snapshot(),
                captures: outcome.applied.captures.clone(),
            },
        );
        if let Some(winning_seat) = outcome.winner {
            inner.phase = RoomPhase::Finished;
            tracing::info!(
                room_code = %self.code,
                winning_seat = winning_seat,
                "match finished"
            );
            bus.broadcast(
                &self.code,
                ServerEvent::GameOver {
                    winning_seat,
                    snapshot: inner.game.snapshot(),
                },
            );
        } else {
            bus.broadcast(
                &self.code,
                ServerEvent::TurnChanged {
                    seat: inner.game.turn(),
                },
            );
        }
        Ok(outcome)
    }

    /// Decides what the manager should arm next for this room's state.
    fn follow_up(&self, inner: &RoomInner) -> FollowUp {
        if inner.phase != RoomPhase::Playing {
            return FollowUp::Idle;
        }
        let seat = inner.game.turn();
        let state = inner.seats[seat];
        let autopiloted =
            self.policy.autopilot_disconnected && state.kind == SeatKind::Human && !state.connected;
        if state.kind == SeatKind::Cpu || autopiloted {
            FollowUp::CpuStep { epoch: inner.epoch }
        } else if state.connected && self.policy.turn_timeout.is_some() {
            FollowUp::TurnTimer { epoch: inner.epoch }
        } else {
            FollowUp::Idle
        }
    }
}

#[cfg(test)]
impl Room {
    fn force_last_active(&self, instant: Instant) {
        if let Ok(mut guard) = self.last_active.lock() {
            *guard = instant;
        }
    }

    fn epoch(&self) -> u64 {
        self.lock().map(|inner| inner.epoch).unwrap_or(0)
    }

    fn presence(&self) -> u64 {
        self.lock().map(|inner| inner.presence).unwrap_or(0)
    }

    fn game_turn(&self) -> usize {
        self.lock().map(|inner| inner.game.turn()).unwrap_or(0)
    }

    fn is_playing(&self) -> bool {
        self.lock()
            .map(|inner| inner.phase == RoomPhase::Playing)
            .unwrap_or(false)
    }
}

fn seat_infos(seats: &[SeatState; SEATS]) -> Vec<SeatInfo> {
    seats
        .iter()
        .enumerate()
        .map(|(seat, state)| SeatInfo {
            seat,
            kind: state.kind,
            connected: state.connected,
        })
        .collect()
}

fn generate_room_code<R: Rng>(rng: &mut R) -> RoomCode {
    (0..ROOM_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[idx] as char
        })
        .collect()
}


/// Creation parameters for a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    pub mode: GameMode,
    #[serde(default)]
    pub rules: Ruleset,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_cpu_strategy")]
    pub cpu_strategy: String,
}

fn default_cpu_strategy() -> String {
    "greedy".to_string()
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::FourHumans,
            rules: Ruleset::default(),
            seed: None,
            cpu_strategy: default_cpu_strategy(),
        }
    }
}

/// Pacing and lifecycle knobs applied to every room a manager creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomPolicy {
    /// Delay before each CPU roll or move.
    pub cpu_pause: Duration,
    /// How long a started room survives with every human seat disconnected.
    pub grace: Duration,
    /// Forfeit a connected human turn that idles this long. `None` disables
    /// the timer.
    pub turn_timeout: Option<Duration>,
    /// Hand a disconnected seat back to a rejoining client.
    pub allow_reconnect: bool,
    /// Drive disconnected human seats with the CPU strategy.
    pub autopilot_disconnected: bool,
}

impl Default for RoomPolicy {
    fn default() -> Self {
        Self {
            cpu_pause: Duration::from_millis(450),
            grace: Duration::from_secs(60),
            turn_timeout: None,
            allow_reconnect: true,
            autopilot_disconnected: true,
        }
    }
}

impl RoomPolicy {
    /// Zero pacing so tests can drive CPU turns to completion quickly.
    pub fn for_tests() -> Self {
        Self {
            cpu_pause: Duration::ZERO,
            grace: Duration::from_secs(5),
            ..Self::default()
        }
    }
}

/// Result of claiming a seat through [`RoomManager::join_room`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatClaim {
    pub seat: usize,
    pub rejoined: bool,
}

/// Lifecycle of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    Waiting,
    Playing,
    Finished,
}

/// Point-in-time public view of a room for the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomStatus {
    pub code: RoomCode,
    pub mode: GameMode,
    pub phase: RoomPhase,
    pub seats: Vec<SeatInfo>,
}

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room not found: {0}")]
    NotFound(RoomCode),
    #[error("Room {0} has no free seat")]
    Full(RoomCode),
    #[error("Seat {seat} in room {room} is not available")]
    SeatUnavailable { room: RoomCode, seat: usize },
    #[error("Room {0} has already started")]
    AlreadyStarted(RoomCode),
    #[error("Room {0} has not started yet")]
    NotStarted(RoomCode),
    #[error("No unused room code after {0} attempts")]
    CodesExhausted(usize),
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error("Room storage lock poisoned")]
    StoragePoisoned,
}

impl RoomError {
    /// Stable machine-readable code carried by socket error events.
    pub fn wire_code(&self) -> &'static str {
        match self {
            RoomError::NotFound(_) => "room_not_found",
            RoomError::Full(_) | RoomError::SeatUnavailable { .. } => "room_full",
            RoomError::AlreadyStarted(_) => "room_already_started",
            RoomError::NotStarted(_) => "bad_request",
            RoomError::Rules(err) => match err {
                RulesError::NotYourTurn { .. }
                | RulesError::RollNotAllowed
                | RulesError::MoveNotAllowed => "not_your_turn",
                RulesError::IllegalMove { .. } | RulesError::MatchOver => "illegal_move",
                RulesError::UnknownToken { .. } => "bad_request",
                RulesError::InvalidDice { .. } => "internal_error",
            },
            RoomError::CodesExhausted(_) | RoomError::StoragePoisoned => "internal_error",
        }
    }
}

impl crate::errors::IntoErrorResponse for RoomError {
    fn status_code(&self) -> warp::http::StatusCode {
        use warp::http::StatusCode;
        match self {
            RoomError::NotFound(_) => StatusCode::NOT_FOUND,
            RoomError::Full(_) | RoomError::SeatUnavailable { .. } | RoomError::AlreadyStarted(_) => {
                StatusCode::CONFLICT
            }
            RoomError::Rules(RulesError::InvalidDice { .. })
            | RoomError::CodesExhausted(_)
            | RoomError::StoragePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
            RoomError::NotStarted(_) | RoomError::Rules(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_code(&self) -> &'static str {
        self.wire_code()
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            RoomError::NotFound(code)
            | RoomError::Full(code)
            | RoomError::AlreadyStarted(code)
            | RoomError::NotStarted(code) => Some(serde_json::json!({ "room_code": code })),
            RoomError::SeatUnavailable { room, seat } => {
                Some(serde_json::json!({ "room_code": room, "seat": seat }))
            }
            _ => None,
        }
    }

    fn severity(&self) -> crate::errors::ErrorSeverity {
        match self {
            RoomError::CodesExhausted(_) | RoomError::StoragePoisoned => {
                crate::errors::ErrorSeverity::Critical
            }
            RoomError::Rules(RulesError::InvalidDice { .. }) => crate::errors::ErrorSeverity::Server,
            _ => crate::errors::ErrorSeverity::Client,
        }
    }
}
