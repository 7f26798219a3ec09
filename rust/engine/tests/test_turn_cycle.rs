use ludo_engine::board::{ring_cell, Color};
use ludo_engine::errors::RulesError;
use ludo_engine::rules::Ruleset;
use ludo_engine::state::{MatchState, TokenPos, TurnPhase, SEATS, TOKENS_PER_SEAT};

fn all_yard() -> [[TokenPos; TOKENS_PER_SEAT]; SEATS] {
    [[TokenPos::Yard; TOKENS_PER_SEAT]; SEATS]
}

#[test]
fn new_match_starts_with_seat_zero_awaiting_roll() {
    let state = MatchState::new(Ruleset::default());
    assert_eq!(state.turn(), 0);
    assert_eq!(state.phase(), TurnPhase::AwaitingRoll);
    assert_eq!(state.dice(), None);
    for seat in 0..SEATS {
        assert!(state.tokens(seat).iter().all(|&p| p == TokenPos::Yard));
    }
}

#[test]
fn roll_without_moves_passes_the_turn() {
    let mut state = MatchState::new(Ruleset::default());
    let outcome = state.apply_roll(0, 3).unwrap();
    assert!(outcome.turn_over);
    assert!(outcome.moves.is_empty());
    assert_eq!(state.turn(), 1);
    assert_eq!(state.phase(), TurnPhase::AwaitingRoll);
}

#[test]
fn skipped_turn_mutates_nothing() {
    let mut state = MatchState::new(Ruleset::default());
    let before = serde_json::to_value(state.snapshot()).unwrap();
    state.apply_roll(0, 4).unwrap();
    let mut after = serde_json::to_value(state.snapshot()).unwrap();
    // Only the turn index may differ.
    after["turn"] = before["turn"].clone();
    assert_eq!(before, after);
}

#[test]
fn six_with_no_moves_keeps_the_turn() {
    // A six overshoots from lane cell 3 and nothing else can act, but the
    // extra roll for rolling it is still honored.
    let mut tokens = all_yard();
    tokens[0] = [
        TokenPos::Home,
        TokenPos::Home,
        TokenPos::Home,
        TokenPos::Lane { cell: 3 },
    ];
    let mut state = MatchState::with_positions(Ruleset::default(), tokens, 0);
    let outcome = state.apply_roll(0, 6).unwrap();
    assert!(outcome.turn_over);
    assert_eq!(state.turn(), 0, "extra roll keeps the seat");
}

#[test]
fn entering_then_extra_roll_for_the_six() {
    let mut state = MatchState::new(Ruleset::default());
    let rolled = state.apply_roll(0, 6).unwrap();
    assert_eq!(rolled.moves.len(), 4);
    let moved = state.apply_move(0, 2).unwrap();
    assert!(moved.extra_roll);
    assert_eq!(state.turn(), 0);
    assert_eq!(state.token(0, 2), TokenPos::Track { cell: 0 });
    assert_eq!(state.phase(), TurnPhase::AwaitingRoll);
}

#[test]
fn third_six_forfeits_the_turn() {
    let mut state = MatchState::new(Ruleset::default());
    for _ in 0..2 {
        let outcome = state.apply_roll(0, 6).unwrap();
        assert!(!outcome.forfeited);
        state.apply_move(0, 0).unwrap();
        assert_eq!(state.turn(), 0);
    }
    let third = state.apply_roll(0, 6).unwrap();
    assert!(third.forfeited);
    assert!(third.moves.is_empty());
    assert_eq!(state.turn(), 1, "no extra roll after a forfeit");
    assert_eq!(state.six_streak(), 0);
}

#[test]
fn triple_six_can_be_disabled() {
    let rules = Ruleset {
        triple_six_forfeit: false,
        ..Ruleset::default()
    };
    let mut state = MatchState::new(rules);
    for _ in 0..5 {
        let outcome = state.apply_roll(0, 6).unwrap();
        assert!(!outcome.forfeited);
        state.apply_move(0, 0).unwrap();
        assert_eq!(state.turn(), 0);
    }
}

#[test]
fn streak_resets_when_the_turn_passes() {
    let mut state = MatchState::new(Ruleset::default());
    state.apply_roll(0, 6).unwrap();
    state.apply_move(0, 0).unwrap();
    state.apply_roll(0, 2).unwrap();
    // Rolled a six then a two: streak gone, and this turn will pass.
    assert_eq!(state.six_streak(), 0);
    state.apply_move(0, 0).unwrap();
    assert_eq!(state.turn(), 1);
}

#[test]
fn captures_send_tokens_to_the_yard_not_away() {
    let mut tokens = all_yard();
    tokens[0][0] = TokenPos::Track { cell: 2 };
    tokens[1][0] = TokenPos::Track { cell: 5 };
    let mut state = MatchState::with_positions(Ruleset::default(), tokens, 0);
    state.apply_roll(0, 3).unwrap();
    let outcome = state.apply_move(0, 0).unwrap();
    assert_eq!(outcome.applied.captures.len(), 1);
    assert!(outcome.extra_roll, "capture earns another roll");
    assert_eq!(state.token(1, 0), TokenPos::Yard);
    assert_eq!(state.token(0, 0), TokenPos::Track { cell: 5 });
}

#[test]
fn wrong_seat_and_wrong_phase_are_rejected_without_mutation() {
    let mut state = MatchState::new(Ruleset::default());
    assert_eq!(
        state.apply_roll(2, 6),
        Err(RulesError::NotYourTurn {
            expected: 0,
            actual: 2
        })
    );
    assert_eq!(state.apply_move(0, 0), Err(RulesError::MoveNotAllowed));
    state.apply_roll(0, 6).unwrap();
    assert_eq!(state.apply_roll(0, 6), Err(RulesError::RollNotAllowed));
    assert_eq!(
        state.apply_move(0, 9),
        Err(RulesError::UnknownToken { token: 9 })
    );
    assert_eq!(state.phase(), TurnPhase::AwaitingMove);
    assert_eq!(state.turn(), 0);
}

#[test]
fn invalid_dice_values_are_rejected() {
    let mut state = MatchState::new(Ruleset::default());
    assert_eq!(
        state.apply_roll(0, 0),
        Err(RulesError::InvalidDice { value: 0 })
    );
    assert_eq!(
        state.apply_roll(0, 7),
        Err(RulesError::InvalidDice { value: 7 })
    );
    assert_eq!(state.phase(), TurnPhase::AwaitingRoll);
}

#[test]
fn winning_move_finishes_the_match_and_locks_it() {
    let mut tokens = all_yard();
    tokens[1] = [
        TokenPos::Home,
        TokenPos::Home,
        TokenPos::Home,
        TokenPos::Lane { cell: 4 },
    ];
    let mut state = MatchState::with_positions(Ruleset::default(), tokens, 1);
    state.apply_roll(1, 1).unwrap();
    let outcome = state.apply_move(1, 3).unwrap();
    assert_eq!(outcome.winner, Some(1));
    assert!(!outcome.extra_roll, "no extra roll on the winning move");
    assert_eq!(state.phase(), TurnPhase::Finished);
    assert_eq!(state.winner(), Some(1));
    assert_eq!(state.apply_roll(2, 4), Err(RulesError::MatchOver));
    assert_eq!(state.apply_move(1, 0), Err(RulesError::MatchOver));
}

#[test]
fn forfeit_turn_is_a_clean_pass() {
    let mut state = MatchState::new(Ruleset::default());
    state.apply_roll(0, 6).unwrap();
    state.forfeit_turn(0).unwrap();
    assert_eq!(state.turn(), 1);
    assert_eq!(state.phase(), TurnPhase::AwaitingRoll);
    assert_eq!(state.dice(), None);
    assert!(state.legal().is_empty());
    assert_eq!(
        state.forfeit_turn(0),
        Err(RulesError::NotYourTurn {
            expected: 1,
            actual: 0
        })
    );
}

#[test]
fn snapshot_serializes_with_snake_case_wire_shape() {
    let mut state = MatchState::new(Ruleset::default());
    state.apply_roll(0, 6).unwrap();
    let json = serde_json::to_value(state.snapshot()).unwrap();
    assert_eq!(json["phase"], "awaiting_move");
    assert_eq!(json["turn"], 0);
    assert_eq!(json["dice"], 6);
    assert_eq!(json["seats"][0]["color"], "red");
    assert_eq!(json["seats"][0]["tokens"][0]["kind"], "yard");
    assert_eq!(json["legal"][0]["to"]["kind"], "track");
    assert_eq!(json["legal"][0]["to"]["cell"], 0);
}

#[test]
fn snapshot_mid_ring_reports_cells() {
    let mut tokens = all_yard();
    tokens[3][1] = TokenPos::Track {
        cell: ring_cell(Color::Yellow, 5),
    };
    let state = MatchState::with_positions(Ruleset::default(), tokens, 3);
    let snap = state.snapshot();
    assert_eq!(snap.seats[3].tokens[1], TokenPos::Track { cell: 44 });
    assert_eq!(snap.seats[3].finished, 0);
}
