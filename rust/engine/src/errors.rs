use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RulesError {
    #[error("It's not seat {actual}'s turn (expected seat {expected})")]
    NotYourTurn { expected: usize, actual: usize },
    #[error("Roll not allowed while awaiting a move")]
    RollNotAllowed,
    #[error("Move not allowed before a roll")]
    MoveNotAllowed,
    #[error("Invalid dice value: {value}")]
    InvalidDice { value: u8 },
    #[error("No such token: {token}")]
    UnknownToken { token: usize },
    #[error("Token {token} has no legal move for this roll")]
    IllegalMove { token: usize },
    #[error("Match is already over")]
    MatchOver,
}
