//! Greedy CPU strategy for Ludo seats.
//!
//! Provides the default CPU opponent for simulated seats. Implements a
//! deterministic capture-first heuristic over the legal set.

use crate::CpuStrategy;
use ludo_engine::board::{self, Color};
use ludo_engine::rules::{travelled, Move};
use ludo_engine::state::{MatchState, TokenPos};

/// Deterministic capture-first CPU strategy.
///
/// This strategy occupies CPU seats by default. It scores every legal move
/// and keeps the best one, so seeded matches replay identically.
///
/// # Strategy
///
/// In priority order:
/// 1. Prefer the move capturing the most opposing tokens
/// 2. Prefer exiting the yard
/// 3. Prefer advancing the token closest to home
/// 4. Prefer landing on a safe cell
/// 5. Tie-break by lowest token index
///
/// # Example
///
/// ```rust
/// use ludo_ai::greedy::GreedyStrategy;
/// use ludo_ai::CpuStrategy;
/// use ludo_engine::rules::Ruleset;
/// use ludo_engine::state::MatchState;
///
/// let strategy = GreedyStrategy::new();
/// assert_eq!(strategy.name(), "GreedyStrategy");
///
/// let mut state = MatchState::new(Ruleset::default());
/// let outcome = state.apply_roll(0, 6).expect("seat 0 rolls first");
///
/// // All four entry moves tie, so the lowest token index wins
/// let chosen = strategy.choose(&state, &outcome.moves);
/// assert_eq!(chosen.token, 0);
/// ```
#[derive(Debug, Clone)]
pub struct GreedyStrategy;

impl GreedyStrategy {
    /// Create a new GreedyStrategy instance.
    ///
    /// # Returns
    ///
    /// A new `GreedyStrategy` ready to pick moves
    ///
    /// # Example
    ///
    /// ```rust
    /// use ludo_ai::greedy::GreedyStrategy;
    ///
    /// let strategy = GreedyStrategy::new();
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Score a candidate move for comparison.
    ///
    /// Tuple fields are ordered so that each later field only breaks ties
    /// among earlier ones, which makes lexicographic tuple comparison
    /// exactly the documented priority.
    ///
    /// # Arguments
    ///
    /// * `color` - The moving seat's color, for progress arithmetic
    /// * `mv` - The candidate move
    ///
    /// # Returns
    ///
    /// `(captures, exits the yard, progress of the moved token, lands safe)`
    fn score(color: Color, mv: &Move) -> (usize, bool, u8, bool) {
        let captures = mv.captures.len();
        let exits_yard = matches!(mv.from, TokenPos::Yard);
        let progress = travelled(color, mv.from);
        let lands_safe = matches!(mv.to, TokenPos::Track { cell } if board::is_safe_cell(cell));
        (captures, exits_yard, progress, lands_safe)
    }
}

impl Default for GreedyStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuStrategy for GreedyStrategy {
    /// Pick the best-scoring legal move.
    ///
    /// Walks the legal set once, keeping the first move with a strictly
    /// better score than the running best. The engine generates the legal
    /// set in token order, so full ties resolve to the lowest token index.
    ///
    /// # Arguments
    ///
    /// * `state` - The match the move will be applied to
    /// * `legal` - The legal set for the pending dice, never empty
    ///
    /// # Returns
    ///
    /// The highest-priority `Move` in `legal`
    fn choose(&self, state: &MatchState, legal: &[Move]) -> Move {
        let color = Color::from_seat(state.turn());
        let mut best = &legal[0];
        let mut best_score = Self::score(color, best);
        for mv in &legal[1..] {
            let score = Self::score(color, mv);
            if score > best_score {
                best = mv;
                best_score = score;
            }
        }
        best.clone()
    }

    /// Return the name of this strategy.
    ///
    /// # Returns
    ///
    /// The string "GreedyStrategy"
    fn name(&self) -> &str {
        "GreedyStrategy"
    }
}
