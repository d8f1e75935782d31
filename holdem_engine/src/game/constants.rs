use super::entities::{Usd, Value};

/// A full ring. Nine seats deal at most 18 hole cards, 3 burns, and 5
/// community cards, well within a single deck.
pub const MAX_PLAYERS: usize = 9;
pub const MIN_PLAYERS: usize = 2;

pub const DEFAULT_STARTING_STACK: Usd = 1000;
pub const DEFAULT_SMALL_BLIND: Usd = 10;
pub const DEFAULT_BIG_BLIND: Usd = 20;

/// Longest player id kept after sanitizing, in characters.
pub const MAX_PLAYER_ID_LENGTH: usize = 32;

pub const HOLE_CARDS: usize = 2;
pub const BOARD_CARDS: usize = 5;
pub const DECK_SIZE: usize = 52;

pub const MIN_CARD_VALUE: Value = 2;
pub const ACE: Value = 14;
