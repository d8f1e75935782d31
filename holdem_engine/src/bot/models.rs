//! Bot configuration and decision models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::{ActorError, ActorResult};
use crate::{
    game::entities::{Action, Usd},
    table::config::BotDifficulty,
};

/// A chosen move plus optional free-text reasoning, which ends up in the
/// hand history.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub action: Action,
    pub commentary: Option<String>,
}

#[derive(Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    amount: Option<Usd>,
}

#[derive(Deserialize)]
struct RawDecision {
    action: RawAction,
    #[serde(default, alias = "commentary", alias = "reasoning")]
    thought: Option<String>,
}

impl Decision {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            commentary: None,
        }
    }

    #[must_use]
    pub fn with_commentary(mut self, commentary: impl Into<String>) -> Self {
        self.commentary = Some(commentary.into());
        self
    }

    /// Parses the JSON shape remote decision makers answer with:
    ///
    /// ```json
    /// {"action": {"type": "RAISE", "amount": 60}, "thought": "top pair"}
    /// ```
    ///
    /// `amount` is the raise-to total and only matters for `RAISE`. Text
    /// around the outermost braces is ignored.
    pub fn from_json(text: &str) -> ActorResult<Self> {
        let start = text
            .find('{')
            .ok_or_else(|| ActorError::Malformed("no JSON object found".to_string()))?;
        let end = text
            .rfind('}')
            .filter(|&end| end > start)
            .ok_or_else(|| ActorError::Malformed("unterminated JSON object".to_string()))?;
        let raw: RawDecision = serde_json::from_str(&text[start..=end])?;

        let kind = raw.action.kind.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        let action = match kind.as_str() {
            "FOLD" => Action::Fold,
            "CHECK" => Action::Check,
            "CALL" => Action::Call,
            "RAISE" | "BET" => Action::Raise(raw.action.amount.ok_or_else(|| {
                ActorError::Malformed("raise without an amount".to_string())
            })?),
            "ALL_IN" | "ALLIN" => Action::AllIn,
            other => return Err(ActorError::Malformed(format!("unknown action type {other:?}"))),
        };
        Ok(Self {
            action,
            commentary: raw.thought.filter(|thought| !thought.trim().is_empty()),
        })
    }
}

/// Bot player configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Bot display name
    pub name: String,

    /// Difficulty preset
    pub difficulty: BotDifficulty,

    /// Seeds the bot's random choices. Unseeded bots use OS randomness.
    pub seed: Option<u64>,

    /// Delay before answering, to pace automated play for spectators.
    pub think_time: Duration,
}

impl BotConfig {
    pub fn new(name: impl Into<String>, difficulty: BotDifficulty) -> Self {
        Self {
            name: name.into(),
            difficulty,
            seed: None,
            think_time: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }
}

/// Bot difficulty parameters
#[derive(Debug, Clone)]
pub struct DifficultyParams {
    /// VPIP (Voluntarily Put $ In Pot) percentage
    pub vpip: f32,

    /// Aggression factor (ratio of bets/raises to calls)
    pub aggression_factor: f32,

    /// Whether bot bluffs
    pub bluffs: bool,

    /// Bluff frequency (0.0 to 1.0)
    pub bluff_frequency: f32,
}

impl DifficultyParams {
    /// Loose-passive: plays many hands, rarely aggressive
    pub fn easy() -> Self {
        Self {
            vpip: 0.45,
            aggression_factor: 0.5,
            bluffs: false,
            bluff_frequency: 0.0,
        }
    }

    /// Balanced, semi-aggressive
    pub fn standard() -> Self {
        Self {
            vpip: 0.30,
            aggression_factor: 1.5,
            bluffs: true,
            bluff_frequency: 0.15,
        }
    }

    /// Very tight, very aggressive when playing
    pub fn tag() -> Self {
        Self {
            vpip: 0.20,
            aggression_factor: 2.5,
            bluffs: true,
            bluff_frequency: 0.25,
        }
    }

    pub fn from_difficulty(difficulty: BotDifficulty) -> Self {
        match difficulty {
            BotDifficulty::Easy => Self::easy(),
            BotDifficulty::Standard => Self::standard(),
            BotDifficulty::Tag => Self::tag(),
        }
    }
}
