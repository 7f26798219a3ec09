//! # ludo-engine: Ludo Match Engine Core
//!
//! A deterministic Ludo engine for four-seat matches. Tracks token
//! positions on the shared ring and the per-color home lanes, computes
//! legal moves and captures, and resolves turns including extra rolls and
//! the triple-six forfeit, with reproducible dice for replay and debugging.
//!
//! ## Core Modules
//!
//! - [`board`] - Static geometry: ring cells, safe cells, colors, home lanes
//! - [`state`] - Match state, token positions, turn transitions, snapshots
//! - [`rules`] - Legal-move computation, captures, blockades, win detection
//! - [`dice`] - Seedable six-sided die with ChaCha20 RNG
//! - [`errors`] - Error types for rule violations
//!
//! ## Quick Start
//!
//! ```rust
//! use ludo_engine::rules::Ruleset;
//! use ludo_engine::state::{MatchState, TokenPos};
//!
//! // Fresh match: everyone in the yard, seat 0 rolls first.
//! let mut state = MatchState::new(Ruleset::default());
//!
//! // Seat 0 rolls a six and brings token 0 onto the ring.
//! let rolled = state.apply_roll(0, 6).expect("seat 0 may roll");
//! assert_eq!(rolled.moves.len(), 4);
//! let moved = state.apply_move(0, 0).expect("entry is legal");
//! assert!(moved.extra_roll);
//! assert_eq!(state.token(0, 0), TokenPos::Track { cell: 0 });
//! ```
//!
//! ## Deterministic Dice
//!
//! The state machine consumes dice values as input, so any sequence can be
//! injected; a seeded [`dice::Dice`] reproduces draws exactly:
//!
//! ```rust
//! use ludo_engine::dice::Dice;
//!
//! let mut a = Dice::with_seed(42);
//! let mut b = Dice::with_seed(42);
//! assert_eq!(a.roll(), b.roll());
//! ```

pub mod board;
pub mod dice;
pub mod errors;
pub mod rules;
pub mod state;
