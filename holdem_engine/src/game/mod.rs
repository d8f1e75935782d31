//! Poker game engine: cards, hand evaluation, betting, pots, and hand
//! orchestration.
//!
//! Everything here is synchronous and owned by a single caller. Tables
//! wrap a [`GameState`] in an actor to serialize access.

pub mod betting;
pub mod constants;
pub mod entities;
pub mod errors;
pub mod functional;
pub mod pot;
pub mod state_machine;

pub use betting::BettingRound;
pub use errors::{EvalError, GameError};
pub use pot::{Payout, Pot, PotLayer};
pub use state_machine::{GameSettings, GameState, Phase};
