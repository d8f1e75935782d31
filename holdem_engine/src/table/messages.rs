//! Table actor message types.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::{TableId, errors::TableError};
use crate::{
    bot::{ActorError, Decision},
    game::{
        Phase,
        entities::{Action, ActionRecord, Card, HandSummary, Observation, PlayerId, PlayerView, Usd},
    },
};

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// Player action (fold, check, call, raise, all-in) from a human seat
    TakeAction {
        player_id: PlayerId,
        action: Action,
        commentary: Option<String>,
        response: oneshot::Sender<TableResponse>,
    },

    /// Get current table state
    GetState {
        response: oneshot::Sender<TableStateResponse>,
    },

    /// Get what one player is allowed to see
    GetObservation {
        player_id: PlayerId,
        response: oneshot::Sender<Result<Observation, TableError>>,
    },

    /// Close table
    Close {
        response: oneshot::Sender<TableResponse>,
    },

    /// Internal: an automated seat answered (or failed to). `hand_number`
    /// and `turn` identify the turn it was asked about.
    ActorDecision {
        hand_number: u64,
        turn: usize,
        player_id: PlayerId,
        result: Result<Decision, ActorError>,
    },

    /// Internal: enforce deadlines and deal the next hand (called by timer)
    Tick,

    /// Subscribe to table events
    Subscribe {
        subscriber_id: String,
        sender: mpsc::Sender<TableEvent>,
    },

    /// Unsubscribe from table events
    Unsubscribe { subscriber_id: String },
}

/// Events pushed to subscribers as the table runs
#[derive(Debug, Clone, Serialize)]
pub enum TableEvent {
    HandStarted {
        hand_number: u64,
        hand_id: Uuid,
        button: PlayerId,
    },
    TurnStarted {
        hand_number: u64,
        player: PlayerId,
    },
    ActionTaken {
        hand_number: u64,
        record: ActionRecord,
        /// The table acted for the player after a timeout or a bad answer.
        defaulted: bool,
    },
    HandFinished(HandSummary),
    Aborted {
        hand_number: u64,
        reason: String,
    },
    /// No more hands will be dealt. Standings are sorted by stack.
    GameOver {
        hands_played: u64,
        standings: Vec<(PlayerId, Usd)>,
    },
    Closed,
}

/// Response from table operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableResponse {
    /// Operation succeeded
    Success,

    /// Operation failed
    Error(String),

    /// Not your turn
    NotYourTurn,

    /// Invalid action for current game state
    InvalidAction(String),

    /// Player not at table
    NotAtTable,

    /// No hand is being played any more
    GameOver,
}

/// Table state response
#[derive(Debug, Clone, Serialize)]
pub struct TableStateResponse {
    pub table_id: TableId,
    pub table_name: String,
    pub max_players: usize,
    pub small_blind: Usd,
    pub big_blind: Usd,
    pub speed: String,
    pub hand_number: u64,
    pub hand_id: Uuid,
    pub hands_played: u64,
    pub phase: Phase,
    pub board: Vec<Card>,
    pub pot_size: Usd,
    pub button_idx: usize,
    /// Public view of every seat. Hole cards only appear once shown.
    pub players: Vec<PlayerView>,
    pub next_to_act: Option<PlayerId>,
    /// False once the game is over.
    pub is_active: bool,
}

impl TableResponse {
    /// Check if response is success
    pub fn is_success(&self) -> bool {
        matches!(self, TableResponse::Success)
    }

    /// Get error message if response is error
    pub fn error_message(&self) -> Option<String> {
        match self {
            TableResponse::Success => None,
            TableResponse::Error(msg) => Some(msg.clone()),
            TableResponse::NotYourTurn => Some("Not your turn".to_string()),
            TableResponse::InvalidAction(msg) => Some(format!("Invalid action: {msg}")),
            TableResponse::NotAtTable => Some("Not at table".to_string()),
            TableResponse::GameOver => Some("Game over".to_string()),
        }
    }
}
