//! Table configuration models.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

use super::errors::TableError;
use crate::game::{
    GameSettings,
    constants::{self, MIN_PLAYERS},
    entities::{Blinds, Usd},
};

/// Table speed variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableSpeed {
    Normal,
    Turbo,
    Hyper,
}

impl fmt::Display for TableSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSpeed::Normal => write!(f, "normal"),
            TableSpeed::Turbo => write!(f, "turbo"),
            TableSpeed::Hyper => write!(f, "hyper"),
        }
    }
}

impl FromStr for TableSpeed {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "turbo" => Ok(Self::Turbo),
            "hyper" => Ok(Self::Hyper),
            other => Err(TableError::InvalidConfig(format!("unknown table speed {other:?}"))),
        }
    }
}

/// Bot difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotDifficulty {
    Easy,     // Loose-passive, high VPIP (45%), low aggression
    Standard, // Balanced, moderate VPIP (30%)
    Tag,      // Tight-aggressive, low VPIP (20%), high aggression
}

impl fmt::Display for BotDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotDifficulty::Easy => write!(f, "easy"),
            BotDifficulty::Standard => write!(f, "standard"),
            BotDifficulty::Tag => write!(f, "tag"),
        }
    }
}

impl FromStr for BotDifficulty {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "standard" => Ok(Self::Standard),
            "tag" => Ok(Self::Tag),
            other => Err(TableError::InvalidConfig(format!(
                "unknown bot difficulty {other:?}"
            ))),
        }
    }
}

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Maximum number of seats (default: 9)
    pub max_players: usize,

    /// Small blind amount
    pub small_blind: Usd,

    /// Big blind amount
    pub big_blind: Usd,

    /// Chips each seat starts with unless its assignment says otherwise
    pub starting_stack: Usd,

    /// Table speed, which sets the action timeout
    pub speed: TableSpeed,

    /// Overrides the speed's action timeout
    pub action_timeout_ms: Option<u64>,

    /// Pause between the end of one hand and the deal of the next
    pub hand_pause_ms: u64,

    /// Stop dealing after this many hands
    pub max_hands: Option<u64>,

    /// Difficulty for bots seated by default
    pub bot_difficulty: BotDifficulty,

    /// Seeds the deck for reproducible games
    pub seed: Option<u64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "Default Table".to_string(),
            max_players: constants::MAX_PLAYERS,
            small_blind: constants::DEFAULT_SMALL_BLIND,
            big_blind: constants::DEFAULT_BIG_BLIND,
            starting_stack: constants::DEFAULT_STARTING_STACK,
            speed: TableSpeed::Normal,
            action_timeout_ms: None,
            hand_pause_ms: 0,
            max_hands: None,
            bot_difficulty: BotDifficulty::Standard,
            seed: None,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), TableError> {
        if self.small_blind == 0 {
            return Err(TableError::InvalidConfig(
                "Small blind must be positive".to_string(),
            ));
        }

        if self.big_blind < self.small_blind {
            return Err(TableError::InvalidConfig(
                "Big blind must be at least the small blind".to_string(),
            ));
        }

        if self.max_players < MIN_PLAYERS || self.max_players > constants::MAX_PLAYERS {
            return Err(TableError::InvalidConfig(format!(
                "Max players must be between {MIN_PLAYERS} and {}",
                constants::MAX_PLAYERS
            )));
        }

        if self.starting_stack < self.big_blind {
            return Err(TableError::InvalidConfig(
                "Starting stack must cover the big blind".to_string(),
            ));
        }

        if self.action_timeout_ms == Some(0) {
            return Err(TableError::InvalidConfig(
                "Action timeout must be positive".to_string(),
            ));
        }

        if self.max_hands == Some(0) {
            return Err(TableError::InvalidConfig(
                "Max hands must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Get action timeout, from the override or else the table speed
    pub fn action_timeout(&self) -> Duration {
        match self.action_timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => match self.speed {
                TableSpeed::Normal => Duration::from_secs(30),
                TableSpeed::Turbo => Duration::from_secs(15),
                TableSpeed::Hyper => Duration::from_secs(5),
            },
        }
    }

    pub fn hand_pause(&self) -> Duration {
        Duration::from_millis(self.hand_pause_ms)
    }

    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            blinds: Blinds {
                small: self.small_blind,
                big: self.big_blind,
            },
            max_players: self.max_players,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(TableConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_configs() {
        let bad = [
            TableConfig {
                big_blind: 5,
                ..Default::default()
            },
            TableConfig {
                small_blind: 0,
                ..Default::default()
            },
            TableConfig {
                max_players: 1,
                ..Default::default()
            },
            TableConfig {
                max_players: 12,
                ..Default::default()
            },
            TableConfig {
                starting_stack: 10,
                ..Default::default()
            },
            TableConfig {
                action_timeout_ms: Some(0),
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }

    #[test]
    fn timeout_follows_speed_unless_overridden() {
        let mut config = TableConfig {
            speed: TableSpeed::Hyper,
            ..Default::default()
        };
        assert_eq!(config.action_timeout(), Duration::from_secs(5));
        config.action_timeout_ms = Some(250);
        assert_eq!(config.action_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn parses_names() {
        assert_eq!("TAG".parse::<BotDifficulty>().unwrap(), BotDifficulty::Tag);
        assert_eq!("turbo".parse::<TableSpeed>().unwrap(), TableSpeed::Turbo);
        assert!("expert".parse::<BotDifficulty>().is_err());
    }
}
