use serde::{Deserialize, Serialize};

use crate::board::Color;
use crate::errors::RulesError;
use crate::rules::{self, Move, Ruleset};

pub const SEATS: usize = 4;
pub const TOKENS_PER_SEAT: usize = 4;

/// Where a single token stands. Always exactly one of these states.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenPos {
    /// Not yet entered the ring.
    Yard,
    /// On the shared ring, absolute cell index 0..=51.
    Track { cell: u8 },
    /// In the color's private home lane, cell index 0..=4.
    Lane { cell: u8 },
    /// Finished.
    Home,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    AwaitingRoll,
    AwaitingMove,
    Finished,
}

/// Authoritative per-match state: token positions, whose turn it is, the
/// pending dice value, and the legal set cached from the last roll.
///
/// All mutation goes through [`apply_roll`](MatchState::apply_roll),
/// [`apply_move`](MatchState::apply_move) and
/// [`forfeit_turn`](MatchState::forfeit_turn); a move is accepted only if it
/// is in the cached legal set, which is the single enforcement point against
/// stale or fabricated intents. Dice values are taken as input, so a caller
/// replaying the same draws reproduces the same state.
#[derive(Debug, Clone)]
pub struct MatchState {
    rules: Ruleset,
    tokens: [[TokenPos; TOKENS_PER_SEAT]; SEATS],
    turn: usize,
    dice: Option<u8>,
    six_streak: u8,
    legal: Vec<Move>,
    phase: TurnPhase,
    winner: Option<usize>,
}

/// What a roll did: the drawn value, the legal set it produced, and whether
/// the turn already resolved (no legal move, or a triple-six forfeit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollOutcome {
    pub value: u8,
    pub moves: Vec<Move>,
    /// Third consecutive six: the roll was consumed with no move offered.
    pub forfeited: bool,
    /// The turn resolved without a move; `MatchState::turn` already points
    /// at the seat to roll next (same seat when an extra roll was earned).
    pub turn_over: bool,
}

/// What an accepted move did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub applied: Move,
    pub homed: bool,
    pub winner: Option<usize>,
    pub extra_roll: bool,
}

impl MatchState {
    /// Fresh match: all 16 tokens in the yard, seat 0 to roll first.
    pub fn new(rules: Ruleset) -> Self {
        Self::with_positions(rules, [[TokenPos::Yard; TOKENS_PER_SEAT]; SEATS], 0)
    }

    /// Scenario entry point: start from arbitrary positions with `turn` to
    /// roll. Positions are trusted; rule checks happen on the transitions.
    pub fn with_positions(
        rules: Ruleset,
        tokens: [[TokenPos; TOKENS_PER_SEAT]; SEATS],
        turn: usize,
    ) -> Self {
        Self {
            rules,
            tokens,
            turn: turn % SEATS,
            dice: None,
            six_streak: 0,
            legal: Vec::new(),
            phase: TurnPhase::AwaitingRoll,
            winner: None,
        }
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.rules
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn dice(&self) -> Option<u8> {
        self.dice
    }

    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    pub fn six_streak(&self) -> u8 {
        self.six_streak
    }

    /// Legal set cached from the last roll; empty outside `awaiting-move`.
    pub fn legal(&self) -> &[Move] {
        &self.legal
    }

    pub fn token(&self, seat: usize, token: usize) -> TokenPos {
        self.tokens[seat % SEATS][token % TOKENS_PER_SEAT]
    }

    pub fn tokens(&self, seat: usize) -> &[TokenPos; TOKENS_PER_SEAT] {
        &self.tokens[seat % SEATS]
    }

    pub fn finished_count(&self, seat: usize) -> usize {
        self.tokens[seat % SEATS]
            .iter()
            .filter(|&&p| p == TokenPos::Home)
            .count()
    }

    /// Records a rolled value for the active seat and caches the legal set.
    ///
    /// If the set is empty, or the roll is a forfeited third six, the turn
    /// resolves here: no token moves and the turn passes (an earned extra
    /// roll keeps it, see the turn-skip note on [`RollOutcome::turn_over`]).
    ///
    /// # Errors
    ///
    /// [`RulesError::MatchOver`] after a win, [`RulesError::NotYourTurn`]
    /// for the wrong seat, [`RulesError::RollNotAllowed`] outside
    /// `awaiting-roll`, [`RulesError::InvalidDice`] for values outside 1..=6.
    pub fn apply_roll(&mut self, seat: usize, value: u8) -> Result<RollOutcome, RulesError> {
        if self.phase == TurnPhase::Finished {
            return Err(RulesError::MatchOver);
        }
        if seat != self.turn {
            return Err(RulesError::NotYourTurn {
                expected: self.turn,
                actual: seat,
            });
        }
        if self.phase != TurnPhase::AwaitingRoll {
            return Err(RulesError::RollNotAllowed);
        }
        if !(1..=6).contains(&value) {
            return Err(RulesError::InvalidDice { value });
        }

        self.dice = Some(value);
        if value == 6 {
            self.six_streak += 1;
        } else {
            self.six_streak = 0;
        }

        if self.rules.triple_six_forfeit && value == 6 && self.six_streak >= 3 {
            self.finish_turn(false);
            return Ok(RollOutcome {
                value,
                moves: Vec::new(),
                forfeited: true,
                turn_over: true,
            });
        }

        let moves = rules::legal_moves(self, seat, value);
        if moves.is_empty() {
            let extra = self.rules.grants_extra_roll(value, false, false);
            self.finish_turn(extra);
            return Ok(RollOutcome {
                value,
                moves,
                forfeited: false,
                turn_over: true,
            });
        }

        self.legal = moves.clone();
        self.phase = TurnPhase::AwaitingMove;
        Ok(RollOutcome {
            value,
            moves,
            forfeited: false,
            turn_over: false,
        })
    }

    /// Moves the given token per the cached legal set, applying captures,
    /// then resolves the turn: win, extra roll, or pass to the next seat.
    ///
    /// # Errors
    ///
    /// [`RulesError::MatchOver`], [`RulesError::NotYourTurn`],
    /// [`RulesError::MoveNotAllowed`] outside `awaiting-move`,
    /// [`RulesError::UnknownToken`] for token ids past 3, and
    /// [`RulesError::IllegalMove`] when the token has no entry in the legal
    /// set. Rejections never mutate state.
    pub fn apply_move(&mut self, seat: usize, token: usize) -> Result<MoveOutcome, RulesError> {
        if self.phase == TurnPhase::Finished {
            return Err(RulesError::MatchOver);
        }
        if seat != self.turn {
            return Err(RulesError::NotYourTurn {
                expected: self.turn,
                actual: seat,
            });
        }
        if self.phase != TurnPhase::AwaitingMove {
            return Err(RulesError::MoveNotAllowed);
        }
        if token >= TOKENS_PER_SEAT {
            return Err(RulesError::UnknownToken { token });
        }
        let mv = self
            .legal
            .iter()
            .find(|m| m.token == token)
            .cloned()
            .ok_or(RulesError::IllegalMove { token })?;
        let dice = self.dice.ok_or(RulesError::MoveNotAllowed)?;

        self.tokens[seat][mv.token] = mv.to;
        for capture in &mv.captures {
            self.tokens[capture.seat][capture.token] = TokenPos::Yard;
        }

        let homed = mv.to == TokenPos::Home;
        if rules::check_win(self, seat) {
            self.winner = Some(seat);
            self.dice = None;
            self.legal.clear();
            self.phase = TurnPhase::Finished;
            return Ok(MoveOutcome {
                applied: mv,
                homed,
                winner: Some(seat),
                extra_roll: false,
            });
        }

        let extra = self
            .rules
            .grants_extra_roll(dice, !mv.captures.is_empty(), homed);
        self.finish_turn(extra);
        Ok(MoveOutcome {
            applied: mv,
            homed,
            winner: None,
            extra_roll: extra,
        })
    }

    /// Resolves an idle turn as a no-op and passes to the next seat.
    /// Used by the turn-timeout policy; grants no extra roll.
    pub fn forfeit_turn(&mut self, seat: usize) -> Result<(), RulesError> {
        if self.phase == TurnPhase::Finished {
            return Err(RulesError::MatchOver);
        }
        if seat != self.turn {
            return Err(RulesError::NotYourTurn {
                expected: self.turn,
                actual: seat,
            });
        }
        self.finish_turn(false);
        Ok(())
    }

    /// Immutable view for broadcast.
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            phase: self.phase,
            turn: self.turn,
            dice: self.dice,
            winner: self.winner,
            seats: (0..SEATS)
                .map(|seat| SeatSnapshot {
                    seat,
                    color: Color::from_seat(seat),
                    tokens: self.tokens[seat].to_vec(),
                    finished: self.finished_count(seat),
                })
                .collect(),
            legal: self.legal.clone(),
        }
    }

    /// The six streak survives an extra roll; it is the same extended turn.
    fn finish_turn(&mut self, extra_roll: bool) {
        self.dice = None;
        self.legal.clear();
        self.phase = TurnPhase::AwaitingRoll;
        if !extra_roll {
            self.turn = (self.turn + 1) % SEATS;
            self.six_streak = 0;
        }
    }
}

/// Broadcast view of a match. `legal` is populated only while the active
/// seat is choosing a move, so a reconnecting client can resume mid-turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub phase: TurnPhase,
    pub turn: usize,
    pub dice: Option<u8>,
    pub winner: Option<usize>,
    pub seats: Vec<SeatSnapshot>,
    #[serde(default)]
    pub legal: Vec<Move>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatSnapshot {
    pub seat: usize,
    pub color: Color,
    pub tokens: Vec<TokenPos>,
    pub finished: usize,
}
