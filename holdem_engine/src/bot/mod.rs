//! Automated decision makers.
//!
//! Anything that can choose a move from an [`Observation`] implements
//! [`Actor`]: the built-in rule-based bots, scripted players in tests, or an
//! adapter around a remote model. Tables call actors off their own task and
//! bound every call with a timeout, so a slow or failing actor only ever
//! costs its own seat the default action.
//!
//! ## Difficulty Presets
//!
//! ### Easy (Loose-Passive)
//! - VPIP: 45% (plays many hands)
//! - Aggression: 0.5 (passive)
//! - Never bluffs
//!
//! ### Standard (Balanced)
//! - VPIP: 30%
//! - Aggression: 1.5
//! - Bluffs 15% of time
//!
//! ### TAG (Tight-Aggressive)
//! - VPIP: 20%
//! - Aggression: 2.5
//! - Bluffs 25% of time
//!
//! ## Example
//!
//! ```
//! use holdem_engine::bot::{Actor, BotConfig, BotDecisionMaker};
//! use holdem_engine::game::{GameSettings, GameState, entities::Seat};
//! use holdem_engine::table::config::BotDifficulty;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let seats = vec![Seat::new("alice", 1000), Seat::new("bob", 1000)];
//! let game = GameState::start_hand(GameSettings::new(10, 20), seats).unwrap();
//! let bot = BotDecisionMaker::new(BotConfig::new("alice", BotDifficulty::Tag).with_seed(7));
//!
//! let observation = game.observation(game.next_player().unwrap()).unwrap();
//! let decision = bot.act(&observation).await.unwrap();
//! assert!(observation.legal_actions.contains(&decision.action));
//! # }
//! ```

use async_trait::async_trait;

use crate::game::entities::Observation;

pub mod decision;
pub mod errors;
pub mod models;

pub use decision::{BotDecisionConfig, BotDecisionMaker};
pub use errors::ActorError;
pub use models::{BotConfig, Decision, DifficultyParams};

/// Chooses moves for one seat.
///
/// `act` may take as long as it likes; the table enforces its own
/// deadline and ignores answers that arrive after the turn has passed.
#[async_trait]
pub trait Actor: Send + Sync {
    fn name(&self) -> &str;

    async fn act(&self, observation: &Observation) -> Result<Decision, ActorError>;
}
