//! # ludo-ai: CPU Seat Strategies for Ludo
//!
//! Provides CPU players for Ludo matches. A strategy picks one move out of
//! the legal set the engine computed for the pending dice; it never rolls
//! dice and never mutates match state.
//!
//! ## Core Components
//!
//! - [`CpuStrategy`] - Trait defining the interface for move selection
//! - [`greedy`] - Capture-first heuristic, the default for CPU seats
//! - [`random`] - Uniform pick over the legal set, for variety and testing
//! - [`create_strategy`] - Factory function for creating strategies by name
//!
//! ## Quick Start
//!
//! ```rust
//! use ludo_ai::{create_strategy, CpuStrategy};
//! use ludo_engine::rules::Ruleset;
//! use ludo_engine::state::MatchState;
//!
//! // Create the default greedy strategy
//! let strategy = create_strategy("greedy");
//!
//! // Seat 0 rolls a 6 and the strategy picks from the legal set
//! let mut state = MatchState::new(Ruleset::default());
//! let outcome = state.apply_roll(0, 6).expect("seat 0 rolls first");
//! let chosen = strategy.choose(&state, &outcome.moves);
//! state.apply_move(0, chosen.token).expect("chosen move is legal");
//! ```
//!
//! ## Strategy Names
//!
//! Currently supported strategy names:
//! - `"greedy"` - deterministic capture-first heuristic (the default)
//! - `"random"` - uniform random pick over the legal set

use ludo_engine::rules::Move;
use ludo_engine::state::MatchState;

pub mod greedy;
pub mod random;

/// Trait defining the interface for CPU seats in Ludo matches.
/// Implementors must provide methods for move selection and identification.
///
/// # Required Methods
///
/// - [`choose`](CpuStrategy::choose) - Pick one move out of the legal set
/// - [`name`](CpuStrategy::name) - Return the strategy's identifier/name
///
/// # Example Implementation
///
/// ```rust
/// use ludo_ai::CpuStrategy;
/// use ludo_engine::rules::Move;
/// use ludo_engine::state::MatchState;
///
/// struct FirstLegal;
///
/// impl CpuStrategy for FirstLegal {
///     fn choose(&self, _state: &MatchState, legal: &[Move]) -> Move {
///         // Simple strategy: always take the first legal move
///         legal[0].clone()
///     }
///
///     fn name(&self) -> &str {
///         "FirstLegal"
///     }
/// }
/// ```
pub trait CpuStrategy: Send + Sync {
    /// Pick one move for the active seat out of the legal set.
    ///
    /// # Arguments
    ///
    /// * `state` - Reference to the match the move will be applied to
    /// * `legal` - The legal set the engine computed for the pending dice
    ///
    /// # Returns
    ///
    /// A `Move` taken from `legal`. Strategies select from the exact set
    /// given and never fabricate a move.
    ///
    /// # Panics
    ///
    /// Implementations may panic if `legal` is empty. The engine resolves
    /// an empty legal set itself when the dice are applied, so a coordinator
    /// asking a strategy to choose always holds at least one legal move.
    fn choose(&self, state: &MatchState, legal: &[Move]) -> Move;

    /// Return the name/identifier of this strategy.
    ///
    /// # Returns
    ///
    /// A string slice containing the strategy's name
    fn name(&self) -> &str;
}

/// Factory function to create CPU strategies by type string.
///
/// # Arguments
///
/// * `kind` - String identifier for the strategy (e.g., "greedy")
///
/// # Returns
///
/// A boxed trait object implementing `CpuStrategy`
///
/// # Supported Strategy Names
///
/// - `"greedy"` - deterministic capture-first heuristic
/// - `"random"` - uniform random pick over the legal set
///
/// Unknown names fall back to the greedy strategy, so a room configured
/// with a stale strategy name keeps playing instead of going dark.
///
/// # Example
///
/// ```rust
/// use ludo_ai::create_strategy;
///
/// let strategy = create_strategy("greedy");
/// assert_eq!(strategy.name(), "GreedyStrategy");
/// ```
pub fn create_strategy(kind: &str) -> Box<dyn CpuStrategy> {
    match kind {
        "random" => Box::new(random::RandomStrategy::new()),
        _ => Box::new(greedy::GreedyStrategy::new()),
    }
}
