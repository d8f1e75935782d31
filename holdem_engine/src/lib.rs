//! # Holdem Engine
//!
//! A multiplayer No-Limit Texas Hold'em engine.
//!
//! A hand is driven by [`GameState`], which owns the deck, the betting
//! rounds and the pot and moves through the streets as legal actions come
//! in. Every accepted action is checked against chip conservation; a hand
//! that breaks an invariant is aborted rather than paid out.
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, hand evaluation, side pots, betting rules and the hand
//!   state machine
//! - [`bot`]: The [`Actor`] capability and the built-in rule-based bots
//! - [`table`]: One async actor per table, with turn timeouts and a registry
//!   of running tables
//!
//! ## Example
//!
//! ```
//! use holdem_engine::{GameSettings, GameState, Phase};
//! use holdem_engine::entities::{Action, Seat};
//!
//! let seats = vec![Seat::new("alice", 1000), Seat::new("bob", 1000)];
//! let mut game = GameState::start_hand(GameSettings::new(10, 20), seats).unwrap();
//!
//! // Heads-up the button posts the small blind and acts first.
//! let first = game.next_player().unwrap().clone();
//! game.apply_action(&first, Action::Fold).unwrap();
//!
//! assert_eq!(game.phase(), Phase::Finished);
//! assert_eq!(game.chips_in_play(), 2000);
//! ```

/// Automated players.
pub mod bot;
pub use bot::{Actor, ActorError, BotDecisionMaker, Decision};

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    GameError, GameSettings, GameState, Phase,
    constants::{self, MAX_PLAYERS},
    entities, functional,
};

/// Table actors and the table registry.
pub mod table;
pub use table::{TableConfig, TableError, TableHandle, TableManager};
