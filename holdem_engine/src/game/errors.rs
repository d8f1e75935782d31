use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{Action, Card, PlayerId, Usd};

/// Reasons a set of cards can't be scored.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum EvalError {
    #[error("can't evaluate {0} cards, need between 5 and 7")]
    WrongCardCount(usize),
    #[error("duplicate card {0}")]
    DuplicateCard(Card),
    #[error("malformed card value {0}")]
    InvalidCard(Card),
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("invalid card {0:?}")]
pub struct ParseCardError(pub String);

/// Everything the game engine can reject or fail on.
///
/// Rejections leave the game untouched; the caller may simply try again.
/// Fatal errors (see [`GameError::is_fatal`]) mean the hand was aborted.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("not your turn")]
    OutOfTurnAction,
    #[error("player {0} isn't seated at this game")]
    UnknownPlayer(PlayerId),
    #[error("player {0} is seated twice")]
    DuplicatePlayer(PlayerId),
    #[error("no hand in progress")]
    HandNotInProgress,
    #[error("hand still in progress")]
    HandInProgress,
    #[error("can't {action}: {reason}")]
    InvalidAction { action: Action, reason: String },
    #[error("raise to ${amount} is below the minimum raise to ${minimum}")]
    RaiseTooSmall { amount: Usd, minimum: Usd },
    #[error("need ${required} but only ${available} remain")]
    InsufficientChips { required: Usd, available: Usd },
    #[error("need at least 2 players with chips")]
    NotEnoughPlayers,
    #[error("too many players ({0})")]
    TooManyPlayers(usize),
    #[error("${0} in play is more than a pot can hold")]
    TooManyChips(u64),
    #[error("invalid blinds ${small}/${big}")]
    InvalidBlinds { small: Usd, big: Usd },
    #[error("card {0} can't appear twice in a deck")]
    DuplicateCard(Card),
    #[error("game over")]
    GameOver,
    #[error("deck exhausted: requested {requested} cards, {remaining} remaining")]
    DeckExhausted { requested: usize, remaining: usize },
    #[error("chip conservation violated: expected ${expected}, found ${actual}")]
    ChipConservationViolation { expected: u64, actual: u64 },
    #[error("hand evaluation failed: {0}")]
    Evaluation(#[from] EvalError),
    #[error("hand aborted: {0}")]
    HandAborted(String),
}

impl GameError {
    /// Internal invariant failures. The hand that raised one is aborted
    /// and can't be resumed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DeckExhausted { .. }
                | Self::ChipConservationViolation { .. }
                | Self::Evaluation(_)
                | Self::HandAborted(_)
        )
    }
}
