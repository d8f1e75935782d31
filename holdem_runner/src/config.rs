//! Runner configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use holdem_engine::{
    MAX_PLAYERS,
    table::{BotDifficulty, TableConfig, TableSpeed},
};

/// Complete runner configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Number of tables to run
    pub num_tables: usize,
    /// Bots seated at each table
    pub bots_per_table: usize,
    /// Delay before each bot answers
    pub think_time_ms: u64,
    /// Seeds decks and bots; tables and seats get distinct derived seeds
    pub seed: Option<u64>,
    /// Table defaults configuration
    pub table_defaults: TableDefaultsConfig,
}

/// Default table configuration
#[derive(Debug, Clone)]
pub struct TableDefaultsConfig {
    /// Maximum players per table
    pub max_players: usize,
    /// Small blind amount
    pub small_blind: u32,
    /// Big blind amount
    pub big_blind: u32,
    /// Chips each bot sits down with
    pub starting_stack: u32,
    /// Table speed
    pub speed: TableSpeed,
    /// Action timeout override in milliseconds
    pub action_timeout_ms: Option<u64>,
    /// Pause between hands in milliseconds
    pub hand_pause_ms: u64,
    /// Stop each table after this many hands
    pub max_hands: Option<u64>,
    /// Default bot difficulty
    pub bot_difficulty: BotDifficulty,
}

impl RunnerConfig {
    /// Load configuration from environment variables, with CLI overrides
    /// taking priority.
    pub fn from_env(
        num_tables_override: Option<usize>,
        max_hands_override: Option<u64>,
        seed_override: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let bot_difficulty = match std::env::var("BOT_DIFFICULTY") {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "BOT_DIFFICULTY".to_string(),
                reason: format!("Unknown difficulty {value:?} (easy, standard, tag)"),
            })?,
            Err(_) => BotDifficulty::Standard,
        };

        let speed = match std::env::var("TABLE_SPEED") {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "TABLE_SPEED".to_string(),
                reason: format!("Unknown speed {value:?} (normal, turbo, hyper)"),
            })?,
            Err(_) => TableSpeed::Turbo,
        };

        let table_defaults = TableDefaultsConfig {
            max_players: parse_env_or("TABLE_MAX_PLAYERS", MAX_PLAYERS),
            small_blind: parse_env_or("TABLE_SMALL_BLIND", 10),
            big_blind: parse_env_or("TABLE_BIG_BLIND", 20),
            starting_stack: parse_env_or("STARTING_STACK", 1000),
            speed,
            action_timeout_ms: parse_env("ACTION_TIMEOUT_MS"),
            hand_pause_ms: parse_env_or("HAND_PAUSE_MS", 0),
            max_hands: max_hands_override.or_else(|| parse_env("MAX_HANDS")),
            bot_difficulty,
        };

        Ok(RunnerConfig {
            num_tables: num_tables_override.unwrap_or_else(|| parse_env_or("NUM_TABLES", 1)),
            bots_per_table: parse_env_or("BOTS_PER_TABLE", 6),
            think_time_ms: parse_env_or("BOT_THINK_TIME_MS", 0),
            seed: seed_override.or_else(|| parse_env("SEED")),
            table_defaults,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_tables == 0 {
            return Err(ConfigError::Invalid {
                var: "NUM_TABLES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        // Validate blinds
        if self.table_defaults.small_blind == 0 {
            return Err(ConfigError::Invalid {
                var: "TABLE_SMALL_BLIND".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.table_defaults.big_blind < self.table_defaults.small_blind {
            return Err(ConfigError::Invalid {
                var: "TABLE_BIG_BLIND".to_string(),
                reason: format!(
                    "Must be at least the small blind ({})",
                    self.table_defaults.small_blind
                ),
            });
        }

        if self.table_defaults.starting_stack < self.table_defaults.big_blind {
            return Err(ConfigError::Invalid {
                var: "STARTING_STACK".to_string(),
                reason: "Must cover the big blind".to_string(),
            });
        }

        // Validate player count
        if !(2..=MAX_PLAYERS).contains(&self.table_defaults.max_players) {
            return Err(ConfigError::Invalid {
                var: "TABLE_MAX_PLAYERS".to_string(),
                reason: format!("Must be between 2 and {MAX_PLAYERS}"),
            });
        }

        // Validate bot count
        if self.bots_per_table < 2 || self.bots_per_table > self.table_defaults.max_players {
            return Err(ConfigError::Invalid {
                var: "BOTS_PER_TABLE".to_string(),
                reason: format!(
                    "Must be between 2 and max players ({})",
                    self.table_defaults.max_players
                ),
            });
        }

        if self.table_defaults.action_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                var: "ACTION_TIMEOUT_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Table configuration for the table at `index`
    pub fn table_config(&self, index: usize) -> TableConfig {
        let defaults = &self.table_defaults;
        TableConfig {
            name: format!("Table {}", index + 1),
            max_players: defaults.max_players,
            small_blind: defaults.small_blind,
            big_blind: defaults.big_blind,
            starting_stack: defaults.starting_stack,
            speed: defaults.speed,
            action_timeout_ms: defaults.action_timeout_ms,
            hand_pause_ms: defaults.hand_pause_ms,
            max_hands: defaults.max_hands,
            bot_difficulty: defaults.bot_difficulty,
            seed: self.seed.map(|seed| seed.wrapping_add(index as u64)),
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    parse_env(key).unwrap_or(default)
}

fn parse_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
