//! Runs independent hold'em tables seated with bots.
//!
//! Every table is its own actor managed by a TableManager. The runner
//! waits for each table to finish and prints the final standings as JSON.

mod config;

use std::{sync::Arc, time::Duration};

use anyhow::Error;
use ctrlc::set_handler;
use holdem_engine::{
    bot::{BotConfig, BotDecisionMaker},
    entities::{PlayerId, Usd},
    table::{SeatAssignment, TableEvent, TableId, TableManager},
};
use log::info;
use pico_args::Arguments;
use serde::Serialize;
use tokio::task::JoinSet;

use config::RunnerConfig;

const HELP: &str = "\
Run hold'em tables seated with bots

USAGE:
  holdem_runner [OPTIONS]

OPTIONS:
  --tables     N           Number of tables to run     [default: env NUM_TABLES or 1]
  --hands      N           Hands to play per table     [default: env MAX_HANDS or until one player is left]
  --seed       N           Seed for decks and bots     [default: env SEED or random]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  BOTS_PER_TABLE           Bots seated at each table (default: 6)
  BOT_DIFFICULTY           easy, standard or tag (default: standard)
  BOT_THINK_TIME_MS        Delay before each bot answers (default: 0)
  TABLE_SMALL_BLIND        Small blind (default: 10)
  TABLE_BIG_BLIND          Big blind (default: 20)
  STARTING_STACK           Chips per seat (default: 1000)
  TABLE_SPEED              normal, turbo or hyper (default: turbo)
  ACTION_TIMEOUT_MS        Overrides the speed's action timeout
  HAND_PAUSE_MS            Pause between hands (default: 0)
  RUST_LOG                 Log filter, e.g. info or holdem_engine=debug
";

struct Args {
    num_tables: Option<usize>,
    max_hands: Option<u64>,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct Standing {
    player: PlayerId,
    stack: Usd,
}

#[derive(Debug, Serialize)]
struct TableOutcome {
    table_id: TableId,
    hands_played: u64,
    aborted: Option<String>,
    standings: Vec<Standing>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        num_tables: pargs.opt_value_from_str("--tables")?,
        max_hands: pargs.opt_value_from_str("--hands")?,
        seed: pargs.opt_value_from_str("--seed")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();

    let config = RunnerConfig::from_env(args.num_tables, args.max_hands, args.seed)?;
    config.validate()?;

    info!(
        "Starting {} table(s) with {} {} bots each",
        config.num_tables, config.bots_per_table, config.table_defaults.bot_difficulty
    );

    let manager = TableManager::new();
    let mut running = JoinSet::new();

    for index in 0..config.num_tables {
        let seats = bot_seats(&config, index);
        let (table_id, events) = manager
            .create_table_with_events(config.table_config(index), seats, "runner", 1024)
            .await?;
        running.spawn(watch_table(table_id, events));
    }

    let mut outcomes = Vec::with_capacity(config.num_tables);
    while let Some(outcome) = running.join_next().await {
        outcomes.push(outcome?);
    }
    outcomes.sort_by_key(|outcome| outcome.table_id);

    manager.close_all().await;

    println!("{}", serde_json::to_string_pretty(&outcomes)?);

    Ok(())
}

fn bot_seats(config: &RunnerConfig, table_index: usize) -> Vec<SeatAssignment> {
    (0..config.bots_per_table)
        .map(|seat| {
            let name = format!("bot-{}-{}", table_index + 1, seat + 1);
            let mut bot_config = BotConfig::new(name.clone(), config.table_defaults.bot_difficulty)
                .with_think_time(Duration::from_millis(config.think_time_ms));
            if let Some(seed) = config.seed {
                let offset = (table_index * config.bots_per_table + seat) as u64;
                bot_config = bot_config.with_seed(seed.wrapping_mul(31).wrapping_add(offset));
            }
            SeatAssignment::automated(name, Arc::new(BotDecisionMaker::new(bot_config)))
        })
        .collect()
}

/// Follows one table's events until it reports game over.
async fn watch_table(
    table_id: TableId,
    mut events: tokio::sync::mpsc::Receiver<TableEvent>,
) -> TableOutcome {
    let mut aborted = None;
    while let Some(event) = events.recv().await {
        match event {
            TableEvent::HandFinished(summary) => {
                let winners: Vec<String> =
                    summary.winners().iter().map(ToString::to_string).collect();
                info!(
                    "Table {}: hand #{} won by {} ({} chips)",
                    table_id,
                    summary.hand_number,
                    winners.join(", "),
                    summary.total_awarded()
                );
            }
            TableEvent::Aborted { reason, .. } => {
                log::error!("Table {}: hand aborted: {}", table_id, reason);
                aborted = Some(reason);
            }
            TableEvent::GameOver {
                hands_played,
                standings,
            } => {
                return TableOutcome {
                    table_id,
                    hands_played,
                    aborted,
                    standings: standings
                        .into_iter()
                        .map(|(player, stack)| Standing { player, stack })
                        .collect(),
                };
            }
            _ => {}
        }
    }

    log::warn!("Table {} stopped before the game ended", table_id);
    TableOutcome {
        table_id,
        hands_played: 0,
        aborted,
        standings: Vec::new(),
    }
}
