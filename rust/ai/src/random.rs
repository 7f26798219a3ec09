//! Uniform random CPU strategy.
//!
//! Picks any legal move with equal probability. Useful for soak-style tests
//! and as a baseline to compare the greedy heuristic against.

use rand::Rng;

use crate::CpuStrategy;
use ludo_engine::rules::Move;
use ludo_engine::state::MatchState;

/// CPU strategy that picks uniformly at random from the legal set.
///
/// Unlike [`GreedyStrategy`](crate::greedy::GreedyStrategy) this strategy is
/// not deterministic, so it is not used for CPU seats in live rooms. It
/// exists to exercise the engine with unbiased move selection.
///
/// # Example
///
/// ```rust
/// use ludo_ai::random::RandomStrategy;
/// use ludo_ai::CpuStrategy;
///
/// let strategy = RandomStrategy::new();
/// assert_eq!(strategy.name(), "RandomStrategy");
/// ```
#[derive(Debug, Clone)]
pub struct RandomStrategy;

impl RandomStrategy {
    /// Create a new RandomStrategy instance.
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuStrategy for RandomStrategy {
    /// Pick one legal move uniformly at random.
    ///
    /// # Arguments
    ///
    /// * `_state` - Unused; the legal set already encodes everything needed
    /// * `legal` - The legal set for the pending dice, never empty
    ///
    /// # Returns
    ///
    /// A uniformly drawn `Move` from `legal`
    fn choose(&self, _state: &MatchState, legal: &[Move]) -> Move {
        let pick = rand::rng().random_range(0..legal.len());
        legal[pick].clone()
    }

    /// Return the name of this strategy.
    ///
    /// # Returns
    ///
    /// The string "RandomStrategy"
    fn name(&self) -> &str {
        "RandomStrategy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ludo_engine::rules::Ruleset;

    #[test]
    fn test_random_creation() {
        let strategy = RandomStrategy::new();
        assert_eq!(strategy.name(), "RandomStrategy");
    }

    #[test]
    fn test_random_default() {
        let strategy = RandomStrategy;
        assert_eq!(strategy.name(), "RandomStrategy");
    }

    #[test]
    fn test_pick_is_always_a_member_of_the_legal_set() {
        let strategy = RandomStrategy::new();
        let mut state = MatchState::new(Ruleset::default());
        let outcome = state.apply_roll(0, 6).expect("roll accepted");
        assert_eq!(outcome.moves.len(), 4);

        for _ in 0..100 {
            let chosen = strategy.choose(&state, &outcome.moves);
            assert!(outcome.moves.contains(&chosen));
        }
    }

    #[test]
    fn test_single_entry_sets_have_one_outcome() {
        let strategy = RandomStrategy::new();
        let mut state = MatchState::new(Ruleset::default());
        state.apply_roll(0, 6).expect("roll accepted");
        state.apply_move(0, 0).expect("entry accepted");

        // The extra roll for the six lands a 1: only token 0 can move.
        let followup = state.apply_roll(0, 1).expect("roll accepted");
        assert_eq!(followup.moves.len(), 1);
        let chosen = strategy.choose(&state, &followup.moves);
        assert_eq!(chosen, followup.moves[0]);
    }
}
