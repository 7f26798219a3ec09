use serde::{Deserialize, Serialize};

use crate::board::{
    is_safe_cell, ring_cell, ring_progress, Color, HOME_PROGRESS, LANE_CELLS, RING_LAST_PROGRESS,
};
use crate::state::{MatchState, TokenPos, SEATS, TOKENS_PER_SEAT};

/// Named rule toggles so mode variants never fork the movement code.
///
/// Defaults give the classic game: a six leaves the yard, a six / capture /
/// finished token earns another roll, three sixes in a row forfeit the turn,
/// and doubled tokens form a blockade.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ruleset {
    /// Yard entry requires rolling a 6. When relaxed, any roll may enter.
    pub six_to_enter: bool,
    /// Rolling a 6 grants one additional roll to the same seat.
    pub extra_roll_on_six: bool,
    /// Completing a capture grants one additional roll.
    pub extra_roll_on_capture: bool,
    /// Bringing a token fully home grants one additional roll.
    pub extra_roll_on_home: bool,
    /// The third consecutive 6 in one extended turn forfeits it: the roll
    /// yields no move and the turn passes with no extra roll.
    pub triple_six_forfeit: bool,
    /// Two or more same-color tokens on a non-safe ring cell can neither be
    /// landed on by an opponent nor captured.
    pub blockades: bool,
}

impl Default for Ruleset {
    fn default() -> Self {
        Self {
            six_to_enter: true,
            extra_roll_on_six: true,
            extra_roll_on_capture: true,
            extra_roll_on_home: true,
            triple_six_forfeit: true,
            blockades: true,
        }
    }
}

impl Ruleset {
    /// Whether a resolved turn earns the same seat another roll.
    /// A single extra roll is granted no matter how many grounds coincide.
    pub fn grants_extra_roll(&self, dice: u8, captured: bool, homed: bool) -> bool {
        (self.extra_roll_on_six && dice == 6)
            || (self.extra_roll_on_capture && captured)
            || (self.extra_roll_on_home && homed)
    }
}

/// An opposing token sent back to the yard as a side effect of a move.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub seat: usize,
    pub token: usize,
    /// Ring cell the captured token stood on.
    pub cell: u8,
}

/// One candidate action for the active seat: which token moves, where it
/// lands, and which opposing tokens go back to the yard.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub token: usize,
    pub from: TokenPos,
    pub to: TokenPos,
    pub captures: Vec<Capture>,
}

/// Computes every legal move for `seat` given a rolled `dice` value.
///
/// For each of the seat's four tokens this considers yard entry (a 6, or any
/// roll when [`Ruleset::six_to_enter`] is relaxed), ring travel with the turn
/// into the color's home lane, lane travel, and the exact landing required to
/// finish. Moves that would overshoot home, or land on an opposing blockade,
/// are excluded. Captures at the destination are precomputed into each move.
///
/// # Arguments
///
/// * `state` - Current match state (token positions and ruleset)
/// * `seat` - Seat index 0..=3 whose tokens are considered
/// * `dice` - Rolled value 1..=6
///
/// # Returns
///
/// All permissible moves, at most one per token. An empty vector means the
/// seat cannot act on this roll and the turn resolves as a no-op.
///
/// # Examples
///
/// ```
/// use ludo_engine::rules::{legal_moves, Ruleset};
/// use ludo_engine::state::{MatchState, TokenPos};
///
/// let state = MatchState::new(Ruleset::default());
///
/// // All tokens are in the yard; only a six brings one out.
/// assert!(legal_moves(&state, 0, 5).is_empty());
///
/// let entries = legal_moves(&state, 0, 6);
/// assert_eq!(entries.len(), 4);
/// assert!(entries.iter().all(|m| m.to == TokenPos::Track { cell: 0 }));
/// ```
pub fn legal_moves(state: &MatchState, seat: usize, dice: u8) -> Vec<Move> {
    let color = Color::from_seat(seat);
    let rules = state.ruleset();
    let mut moves = Vec::new();

    for token in 0..TOKENS_PER_SEAT {
        let from = state.token(seat, token);
        let candidate = match from {
            TokenPos::Yard => {
                if dice == 6 || !rules.six_to_enter {
                    // Entry cells are safe, so entering never captures
                    // and is never blocked.
                    Some((TokenPos::Track { cell: color.start_cell() }, Vec::new()))
                } else {
                    None
                }
            }
            TokenPos::Track { cell } => {
                let target = ring_progress(color, cell) + dice;
                if target <= RING_LAST_PROGRESS {
                    let dest = ring_cell(color, target);
                    landing(state, seat, dest).map(|captures| (TokenPos::Track { cell: dest }, captures))
                } else if target < HOME_PROGRESS {
                    Some((TokenPos::Lane { cell: target - RING_LAST_PROGRESS - 1 }, Vec::new()))
                } else if target == HOME_PROGRESS {
                    Some((TokenPos::Home, Vec::new()))
                } else {
                    None
                }
            }
            TokenPos::Lane { cell } => {
                let target = cell + dice;
                if target < LANE_CELLS {
                    Some((TokenPos::Lane { cell: target }, Vec::new()))
                } else if target == LANE_CELLS {
                    Some((TokenPos::Home, Vec::new()))
                } else {
                    None
                }
            }
            TokenPos::Home => None,
        };
        if let Some((to, captures)) = candidate {
            moves.push(Move {
                token,
                from,
                to,
                captures,
            });
        }
    }

    moves
}

/// Resolves what landing on a ring cell does: `None` when an opposing
/// blockade bars the cell, otherwise the captures the landing causes.
fn landing(state: &MatchState, seat: usize, cell: u8) -> Option<Vec<Capture>> {
    if is_safe_cell(cell) {
        return Some(Vec::new());
    }
    let rules = state.ruleset();
    let mut captures = Vec::new();
    for other in (0..SEATS).filter(|&s| s != seat) {
        let occupants: Vec<usize> = (0..TOKENS_PER_SEAT)
            .filter(|&t| state.token(other, t) == TokenPos::Track { cell })
            .collect();
        if occupants.is_empty() {
            continue;
        }
        if rules.blockades && occupants.len() >= 2 {
            return None;
        }
        for token in occupants {
            captures.push(Capture {
                seat: other,
                token,
                cell,
            });
        }
    }
    Some(captures)
}

/// True iff all four tokens of the seat's color are home.
pub fn check_win(state: &MatchState, seat: usize) -> bool {
    (0..TOKENS_PER_SEAT).all(|t| state.token(seat, t) == TokenPos::Home)
}

/// Steps already travelled toward home, from 0 (just entered) to
/// [`HOME_PROGRESS`] (finished). Used by strategies to rank tokens.
pub fn travelled(color: Color, pos: TokenPos) -> u8 {
    match pos {
        TokenPos::Yard => 0,
        TokenPos::Track { cell } => ring_progress(color, cell),
        TokenPos::Lane { cell } => RING_LAST_PROGRESS + 1 + cell,
        TokenPos::Home => HOME_PROGRESS,
    }
}
