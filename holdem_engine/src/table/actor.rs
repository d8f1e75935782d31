//! Table actor implementation with async message handling.
//!
//! Each table runs as one task that owns its [`GameState`] outright. Human
//! seats act through a [`TableHandle`]; automated seats are asked for a
//! decision on a spawned task so a slow or hung actor never stalls the
//! table. Every turn has a deadline, after which the table folds (or checks)
//! for the player.

use super::{
    TableId,
    config::TableConfig,
    errors::{TableError, TableResult},
    messages::{TableEvent, TableMessage, TableResponse, TableStateResponse},
};
use crate::{
    bot::{Actor, ActorError, Decision},
    game::{
        GameError, GameState,
        entities::{Action, Observation, PlayerId, Seat, Usd},
    },
};
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::{
    sync::{mpsc, oneshot},
    time::{Duration, Instant, MissedTickBehavior, interval},
};

const MAILBOX_CAPACITY: usize = 100;
const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Who answers for a seat.
#[derive(Clone)]
pub enum SeatController {
    /// Actions arrive through [`TableHandle::take_action`].
    Human,
    /// The table asks the actor whenever it's this seat's turn.
    Automated(Arc<dyn Actor>),
}

impl fmt::Debug for SeatController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeatController::Human => write!(f, "Human"),
            SeatController::Automated(actor) => write!(f, "Automated({})", actor.name()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SeatAssignment {
    pub player_id: PlayerId,
    /// Falls back to the table's starting stack.
    pub stack: Option<Usd>,
    pub controller: SeatController,
}

impl SeatAssignment {
    pub fn human(player_id: impl Into<PlayerId>) -> Self {
        Self {
            player_id: player_id.into(),
            stack: None,
            controller: SeatController::Human,
        }
    }

    pub fn automated(player_id: impl Into<PlayerId>, actor: Arc<dyn Actor>) -> Self {
        Self {
            player_id: player_id.into(),
            stack: None,
            controller: SeatController::Automated(actor),
        }
    }

    #[must_use]
    pub fn with_stack(mut self, stack: Usd) -> Self {
        self.stack = Some(stack);
        self
    }
}

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    table_id: TableId,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(sender: mpsc::Sender<TableMessage>, table_id: TableId) -> Self {
        Self { sender, table_id }
    }

    /// Get table ID
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Whether the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> TableResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TableError::Closed)
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> TableMessage,
    ) -> TableResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(message(tx)).await?;
        rx.await.map_err(|_| TableError::Closed)
    }

    pub async fn take_action(
        &self,
        player_id: impl Into<PlayerId>,
        action: Action,
    ) -> TableResult<TableResponse> {
        self.take_action_with_commentary(player_id, action, None)
            .await
    }

    pub async fn take_action_with_commentary(
        &self,
        player_id: impl Into<PlayerId>,
        action: Action,
        commentary: Option<String>,
    ) -> TableResult<TableResponse> {
        let player_id = player_id.into();
        self.request(|response| TableMessage::TakeAction {
            player_id,
            action,
            commentary,
            response,
        })
        .await
    }

    pub async fn state(&self) -> TableResult<TableStateResponse> {
        self.request(|response| TableMessage::GetState { response })
            .await
    }

    pub async fn observation(&self, player_id: impl Into<PlayerId>) -> TableResult<Observation> {
        let player_id = player_id.into();
        self.request(|response| TableMessage::GetObservation {
            player_id,
            response,
        })
        .await?
    }

    /// Subscribe to table events. Events are dropped for a subscriber whose
    /// buffer is full.
    pub async fn subscribe(
        &self,
        subscriber_id: impl Into<String>,
        buffer: usize,
    ) -> TableResult<mpsc::Receiver<TableEvent>> {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        self.send(TableMessage::Subscribe {
            subscriber_id: subscriber_id.into(),
            sender,
        })
        .await?;
        Ok(receiver)
    }

    pub async fn unsubscribe(&self, subscriber_id: impl Into<String>) -> TableResult<()> {
        self.send(TableMessage::Unsubscribe {
            subscriber_id: subscriber_id.into(),
        })
        .await
    }

    pub async fn close(&self) -> TableResult<TableResponse> {
        self.request(|response| TableMessage::Close { response })
            .await
    }
}

/// The turn the table is waiting on.
#[derive(Debug)]
struct PendingTurn {
    hand_number: u64,
    turn: usize,
    player_id: PlayerId,
    deadline: Instant,
}

impl PendingTurn {
    fn matches(&self, hand_number: u64, turn: usize, player_id: &PlayerId) -> bool {
        self.hand_number == hand_number && self.turn == turn && &self.player_id == player_id
    }
}

/// Table actor managing a single poker table
pub struct TableActor {
    /// Table ID
    id: TableId,

    /// Table configuration
    config: TableConfig,

    /// Poker game state
    state: GameState,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    /// Lets spawned decision tasks report back without keeping the table
    /// alive once every handle is gone
    sender: mpsc::WeakSender<TableMessage>,

    controllers: HashMap<PlayerId, SeatController>,

    /// State change subscribers
    subscribers: HashMap<String, mpsc::Sender<TableEvent>>,

    pending: Option<PendingTurn>,

    /// When the next hand is dealt, set once a hand finishes
    next_hand_at: Option<Instant>,

    hands_played: u64,

    /// No more hands will be dealt
    is_over: bool,

    /// Is table closed
    is_closed: bool,
}

impl TableActor {
    /// Create a new table actor and deal the first hand
    pub fn new(
        id: TableId,
        config: TableConfig,
        seats: Vec<SeatAssignment>,
    ) -> TableResult<(Self, TableHandle)> {
        config.validate()?;
        if seats.len() > config.max_players {
            return Err(TableError::InvalidConfig(format!(
                "{} seats for a {}-max table",
                seats.len(),
                config.max_players
            )));
        }

        let game_seats = seats
            .iter()
            .map(|s| Seat::new(s.player_id.clone(), s.stack.unwrap_or(config.starting_stack)))
            .collect();
        let state = GameState::start_hand(config.game_settings(), game_seats)?;

        let (sender, inbox) = mpsc::channel(MAILBOX_CAPACITY);
        let handle = TableHandle::new(sender.clone(), id);

        let actor = Self {
            id,
            config,
            state,
            inbox,
            sender: sender.downgrade(),
            controllers: seats
                .into_iter()
                .map(|s| (s.player_id, s.controller))
                .collect(),
            subscribers: HashMap::new(),
            pending: None,
            next_hand_at: None,
            hands_played: 0,
            is_over: false,
            is_closed: false,
        };

        Ok((actor, handle))
    }

    /// Subscribe before the actor runs. Unlike [`TableHandle::subscribe`],
    /// the receiver sees every event from the first `HandStarted` on.
    pub fn subscribe(
        &mut self,
        subscriber_id: impl Into<String>,
        buffer: usize,
    ) -> mpsc::Receiver<TableEvent> {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        self.subscribers.insert(subscriber_id.into(), sender);
        receiver
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        log::info!("Table {} '{}' starting", self.id, self.config.name);

        self.announce_hand();
        self.after_transition();

        let mut tick_interval = interval(TICK_INTERVAL);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => break,
                },

                _ = tick_interval.tick() => self.tick(),
            }

            if self.is_closed {
                break;
            }
        }

        self.notify(TableEvent::Closed);
        log::info!("Table {} '{}' closed", self.id, self.config.name);
    }

    /// Handle a table message
    fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::TakeAction {
                player_id,
                action,
                commentary,
                response,
            } => {
                let result = self.handle_action(&player_id, action, commentary);
                let _ = response.send(result);
            }

            TableMessage::GetState { response } => {
                let _ = response.send(self.get_state());
            }

            TableMessage::GetObservation {
                player_id,
                response,
            } => {
                let result = self.state.observation(&player_id).map_err(TableError::from);
                let _ = response.send(result);
            }

            TableMessage::Close { response } => {
                log::info!("Table {}: close requested", self.id);
                self.is_closed = true;
                self.pending = None;
                let _ = response.send(TableResponse::Success);
            }

            TableMessage::ActorDecision {
                hand_number,
                turn,
                player_id,
                result,
            } => self.handle_actor_decision(hand_number, turn, player_id, result),

            TableMessage::Tick => self.tick(),

            TableMessage::Subscribe {
                subscriber_id,
                sender,
            } => {
                log::debug!("Table {}: {} subscribed", self.id, subscriber_id);
                self.subscribers.insert(subscriber_id, sender);
            }

            TableMessage::Unsubscribe { subscriber_id } => {
                log::debug!("Table {}: {} unsubscribed", self.id, subscriber_id);
                self.subscribers.remove(&subscriber_id);
            }
        }
    }

    /// Handle an action from a human seat
    fn handle_action(
        &mut self,
        player_id: &PlayerId,
        action: Action,
        commentary: Option<String>,
    ) -> TableResponse {
        match self.controllers.get(player_id) {
            None => return TableResponse::NotAtTable,
            Some(SeatController::Automated(_)) => {
                return TableResponse::InvalidAction("seat is played automatically".to_string());
            }
            Some(SeatController::Human) => {}
        }
        if self.is_over {
            return TableResponse::GameOver;
        }

        match self.apply(player_id, action, commentary, false) {
            Ok(()) => TableResponse::Success,
            Err(GameError::OutOfTurnAction) => TableResponse::NotYourTurn,
            Err(GameError::UnknownPlayer(_)) => TableResponse::NotAtTable,
            Err(err) if err.is_fatal() => TableResponse::Error(err.to_string()),
            Err(err) => TableResponse::InvalidAction(err.to_string()),
        }
    }

    fn handle_actor_decision(
        &mut self,
        hand_number: u64,
        turn: usize,
        player_id: PlayerId,
        result: Result<Decision, ActorError>,
    ) {
        let is_current = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.matches(hand_number, turn, &player_id));
        if !is_current {
            log::debug!(
                "Table {}: ignoring stale decision from {} (hand {}, turn {})",
                self.id,
                player_id,
                hand_number,
                turn
            );
            return;
        }

        match result {
            Ok(decision) => {
                let action = decision.action;
                if let Err(err) = self.apply(&player_id, action, decision.commentary, false) {
                    if err.is_fatal() {
                        return;
                    }
                    log::warn!(
                        "Table {}: {} chose {} which was rejected: {}",
                        self.id,
                        player_id,
                        action,
                        err
                    );
                    self.apply_default_action("rejected decision");
                }
            }
            Err(err) => {
                log::warn!("Table {}: {} failed to decide: {}", self.id, player_id, err);
                self.apply_default_action(&err.to_string());
            }
        }
    }

    /// Apply an action and react to whatever it changed
    fn apply(
        &mut self,
        player_id: &PlayerId,
        action: Action,
        commentary: Option<String>,
        defaulted: bool,
    ) -> Result<(), GameError> {
        let hand_number = self.state.hand_number();
        match self
            .state
            .apply_action_with_commentary(player_id, action, commentary)
        {
            Ok(_) => {
                self.pending = None;
                let record = self.state.hand_log().last().cloned();
                if let Some(record) = record {
                    log::debug!("Table {}: {}", self.id, record);
                    self.notify(TableEvent::ActionTaken {
                        hand_number,
                        record,
                        defaulted,
                    });
                }
                self.after_transition();
                Ok(())
            }
            Err(err) => {
                if err.is_fatal() {
                    self.pending = None;
                    self.after_transition();
                }
                Err(err)
            }
        }
    }

    fn apply_default_action(&mut self, reason: &str) {
        let Some((player_id, action)) = self.state.default_action() else {
            return;
        };
        log::info!(
            "Table {}: {} defaults to {} ({})",
            self.id,
            player_id,
            action,
            reason
        );
        let commentary = Some(format!("default action: {reason}"));
        if let Err(err) = self.apply(&player_id, action, commentary, true) {
            log::error!(
                "Table {}: default action for {} rejected: {}",
                self.id,
                player_id,
                err
            );
        }
    }

    /// Decide what happens after the game state moved: report an aborted
    /// or finished hand, or prompt the next player.
    fn after_transition(&mut self) {
        if self.is_over {
            return;
        }

        if self.state.is_aborted() {
            let reason = self
                .state
                .fault()
                .map(ToString::to_string)
                .unwrap_or_default();
            log::error!(
                "Table {}: hand #{} aborted: {}",
                self.id,
                self.state.hand_number(),
                reason
            );
            self.notify(TableEvent::Aborted {
                hand_number: self.state.hand_number(),
                reason,
            });
            self.finish_game();
            return;
        }

        if self.state.is_hand_complete() {
            // Already recorded this hand
            if self.next_hand_at.is_some() {
                return;
            }
            self.hands_played += 1;
            if let Some(summary) = self.state.summary().cloned() {
                log::info!(
                    "Table {}: hand #{} won by {:?}",
                    self.id,
                    summary.hand_number,
                    summary.winners()
                );
                self.notify(TableEvent::HandFinished(summary));
            }

            let reached_limit = self
                .config
                .max_hands
                .is_some_and(|max| self.hands_played >= max);
            if self.state.is_game_over() || reached_limit {
                self.finish_game();
            } else {
                self.next_hand_at = Some(Instant::now() + self.config.hand_pause());
            }
            return;
        }

        self.prompt_turn();
    }

    /// Start the clock on the next player's turn, asking automated seats
    /// for their decision.
    fn prompt_turn(&mut self) {
        let Some(player_id) = self.state.next_player().cloned() else {
            return;
        };
        let hand_number = self.state.hand_number();
        let turn = self.state.action_count();
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.matches(hand_number, turn, &player_id))
        {
            return;
        }

        let timeout = self.config.action_timeout();
        self.pending = Some(PendingTurn {
            hand_number,
            turn,
            player_id: player_id.clone(),
            deadline: Instant::now() + timeout,
        });
        self.notify(TableEvent::TurnStarted {
            hand_number,
            player: player_id.clone(),
        });

        let Some(SeatController::Automated(actor)) = self.controllers.get(&player_id) else {
            return;
        };
        let actor = Arc::clone(actor);
        let observation = match self.state.observation(&player_id) {
            Ok(observation) => observation,
            Err(err) => {
                log::error!(
                    "Table {}: no observation for {}: {}",
                    self.id,
                    player_id,
                    err
                );
                return;
            }
        };
        let Some(sender) = self.sender.upgrade() else {
            return;
        };

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, actor.act(&observation)).await {
                Ok(result) => result,
                Err(_) => Err(ActorError::Timeout),
            };
            let _ = sender
                .send(TableMessage::ActorDecision {
                    hand_number,
                    turn,
                    player_id,
                    result,
                })
                .await;
        });
    }

    /// Enforce the turn deadline and deal the next hand when due
    fn tick(&mut self) {
        if self.is_over || self.is_closed {
            return;
        }
        let now = Instant::now();

        let timed_out = self
            .pending
            .as_ref()
            .is_some_and(|pending| now >= pending.deadline);
        if timed_out {
            self.apply_default_action("timed out");
        }

        if self.next_hand_at.is_some_and(|at| now >= at) {
            self.start_next_hand();
        }
    }

    fn start_next_hand(&mut self) {
        self.next_hand_at = None;
        match self.state.start_next_hand() {
            Ok(_) => {
                self.announce_hand();
                self.after_transition();
            }
            Err(GameError::GameOver) => self.finish_game(),
            Err(err) => {
                if self.state.is_aborted() {
                    self.after_transition();
                } else {
                    log::error!("Table {}: cannot deal next hand: {}", self.id, err);
                    self.finish_game();
                }
            }
        }
    }

    fn announce_hand(&mut self) {
        let button = self
            .state
            .players()
            .get(self.state.button_idx())
            .map(|p| p.id.clone());
        let Some(button) = button else {
            return;
        };
        log::info!(
            "Table {}: hand #{} starts, {} has the button",
            self.id,
            self.state.hand_number(),
            button
        );
        self.notify(TableEvent::HandStarted {
            hand_number: self.state.hand_number(),
            hand_id: self.state.hand_id(),
            button,
        });
    }

    fn finish_game(&mut self) {
        self.is_over = true;
        self.pending = None;
        self.next_hand_at = None;

        let mut standings: Vec<(PlayerId, Usd)> = self
            .state
            .players()
            .iter()
            .map(|p| (p.id.clone(), p.stack))
            .collect();
        standings.sort_by(|a, b| b.1.cmp(&a.1));

        log::info!(
            "Table {}: game over after {} hands",
            self.id,
            self.hands_played
        );
        self.notify(TableEvent::GameOver {
            hands_played: self.hands_played,
            standings,
        });
    }

    fn get_state(&self) -> TableStateResponse {
        TableStateResponse {
            table_id: self.id,
            table_name: self.config.name.clone(),
            max_players: self.config.max_players,
            small_blind: self.config.small_blind,
            big_blind: self.config.big_blind,
            speed: self.config.speed.to_string(),
            hand_number: self.state.hand_number(),
            hand_id: self.state.hand_id(),
            hands_played: self.hands_played,
            phase: self.state.phase(),
            board: self.state.board().to_vec(),
            pot_size: self.state.pot().get_size(),
            button_idx: self.state.button_idx(),
            players: self.state.public_view(),
            next_to_act: if self.is_over {
                None
            } else {
                self.state.next_player().cloned()
            },
            is_active: !self.is_over,
        }
    }

    /// Push an event to every subscriber
    fn notify(&mut self, event: TableEvent) {
        let table_id = self.id;
        self.subscribers
            .retain(|subscriber_id, sender| match sender.try_send(event.clone()) {
                Ok(_) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!(
                        "Table {}: subscriber {} channel full, dropping event",
                        table_id,
                        subscriber_id
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!(
                        "Table {}: subscriber {} disconnected, removing",
                        table_id,
                        subscriber_id
                    );
                    false
                }
            });
    }
}
