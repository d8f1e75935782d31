//! Hand orchestration.
//!
//! [`GameState`] drives a hand from blinds to payout: it posts blinds,
//! deals, runs one [`BettingRound`] per street, fast-forwards the board when
//! nobody can bet, and resolves the pot. Between hands it rotates the
//! button and deals the busted out.
//!
//! Every accepted action is followed by a chip conservation check. Any
//! internal failure aborts the hand instead of leaving it half applied.

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};
use uuid::Uuid;

use super::{
    betting::BettingRound,
    constants,
    entities::{
        Action, ActionChoices, ActionRecord, Award, Blinds, Card, Deck, HandSummary, Observation,
        Player, PlayerId, PlayerStatus, PlayerView, Seat, SeatIndex, ShownHand, Usd,
    },
    errors::GameError,
    functional::{HandValue, eval_with_board},
    pot::Pot,
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Phase {
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
    Finished,
    Aborted,
}

impl Phase {
    /// The phase that follows once this one is done. Terminal phases map
    /// to themselves.
    pub const fn next(self) -> Self {
        match self {
            Self::PreFlop => Self::Flop,
            Self::Flop => Self::Turn,
            Self::Turn => Self::River,
            Self::River => Self::Showdown,
            Self::Showdown | Self::Finished => Self::Finished,
            Self::Aborted => Self::Aborted,
        }
    }

    pub const fn is_betting(self) -> bool {
        matches!(self, Self::PreFlop | Self::Flop | Self::Turn | Self::River)
    }

    /// Community cards on the table during this phase. A hand that ended
    /// early can finish with any board.
    pub const fn board_size(self) -> Option<usize> {
        match self {
            Self::PreFlop => Some(0),
            Self::Flop => Some(3),
            Self::Turn => Some(4),
            Self::River | Self::Showdown => Some(constants::BOARD_CARDS),
            Self::Finished | Self::Aborted => None,
        }
    }

    const fn cards_dealt(self) -> usize {
        match self {
            Self::Flop => 3,
            Self::Turn | Self::River => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::PreFlop => "pre-flop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
            Self::Finished => "finished",
            Self::Aborted => "aborted",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GameSettings {
    pub blinds: Blinds,
    pub max_players: usize,
    /// Seeds the deck. Unseeded games shuffle from OS randomness.
    pub seed: Option<u64>,
}

impl GameSettings {
    #[must_use]
    pub fn new(small_blind: Usd, big_blind: Usd) -> Self {
        Self {
            blinds: Blinds {
                small: small_blind,
                big: big_blind,
            },
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), GameError> {
        let Blinds { small, big } = self.blinds;
        if small == 0 || big < small {
            return Err(GameError::InvalidBlinds { small, big });
        }
        if self.max_players > constants::MAX_PLAYERS {
            return Err(GameError::TooManyPlayers(self.max_players));
        }
        Ok(())
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            blinds: Blinds::default(),
            max_players: constants::MAX_PLAYERS,
            seed: None,
        }
    }
}

/// Seats clockwise from `start`, starting with the one to its left and
/// ending with `start` itself.
fn clockwise_from(start: SeatIndex, num_seats: usize) -> impl Iterator<Item = SeatIndex> {
    (1..=num_seats).map(move |offset| (start + offset) % num_seats)
}

#[derive(Debug)]
pub struct GameState {
    settings: GameSettings,
    deck: Deck,
    players: Vec<Player>,
    board: Vec<Card>,
    pot: Pot,
    round: BettingRound,
    phase: Phase,
    hand_id: Uuid,
    hand_number: u64,
    button_idx: SeatIndex,
    small_blind_idx: SeatIndex,
    big_blind_idx: SeatIndex,
    hand_log: Vec<ActionRecord>,
    starting_stacks: Vec<Usd>,
    total_chips: u64,
    summary: Option<HandSummary>,
    fault: Option<GameError>,
}

impl GameState {
    /// Seats `seats` in order and deals the first hand. The button starts
    /// on the first seat with chips.
    pub fn start_hand(settings: GameSettings, seats: Vec<Seat>) -> Result<Self, GameError> {
        let deck = Deck::new(settings.seed);
        Self::start_hand_with_deck(settings, seats, deck)
    }

    /// Same as [`GameState::start_hand`] but deals the first hand from
    /// `deck` as is, without shuffling it. Useful for replaying a known
    /// deal.
    pub fn start_hand_with_deck(
        settings: GameSettings,
        seats: Vec<Seat>,
        deck: Deck,
    ) -> Result<Self, GameError> {
        settings.validate()?;
        if seats.len() > settings.max_players {
            return Err(GameError::TooManyPlayers(seats.len()));
        }
        let mut ids = BTreeSet::new();
        for seat in &seats {
            if !ids.insert(&seat.id) {
                return Err(GameError::DuplicatePlayer(seat.id.clone()));
            }
        }
        // Every pot and bet is a `Usd`, so the whole table must fit in one.
        let total: u64 = seats.iter().map(|seat| u64::from(seat.stack)).sum();
        if total > u64::from(Usd::MAX) {
            return Err(GameError::TooManyChips(total));
        }
        let players: Vec<Player> = seats
            .into_iter()
            .enumerate()
            .map(|(idx, seat)| Player::new(seat, idx))
            .collect();
        if players.iter().filter(|p| p.stack > 0).count() < constants::MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }
        let button_idx = players
            .iter()
            .position(|p| p.stack > 0)
            .unwrap_or_default();
        let big_blind = settings.blinds.big;

        let mut state = Self {
            settings,
            deck,
            players,
            board: Vec::with_capacity(constants::BOARD_CARDS),
            pot: Pot::new(),
            round: BettingRound::new(Phase::PreFlop, &mut [], 0, big_blind),
            phase: Phase::PreFlop,
            hand_id: Uuid::nil(),
            hand_number: 0,
            button_idx,
            small_blind_idx: button_idx,
            big_blind_idx: button_idx,
            hand_log: Vec::new(),
            starting_stacks: Vec::new(),
            total_chips: 0,
            summary: None,
            fault: None,
        };
        state.begin_hand()?;
        Ok(state)
    }

    /// Rotates the button to the next seat with chips and deals a new hand.
    pub fn start_next_hand(&mut self) -> Result<&Self, GameError> {
        if let Some(fault) = &self.fault {
            return Err(GameError::HandAborted(fault.to_string()));
        }
        if self.phase != Phase::Finished {
            return Err(GameError::HandInProgress);
        }
        if self.num_funded() < constants::MIN_PLAYERS {
            return Err(GameError::GameOver);
        }
        let num_seats = self.players.len();
        let next_button = clockwise_from(self.button_idx, num_seats)
            .find(|&idx| self.players[idx].stack > 0)
            .unwrap_or(self.button_idx);
        self.button_idx = next_button;
        self.deck.shuffle();
        self.begin_hand()?;
        Ok(self)
    }

    fn begin_hand(&mut self) -> Result<(), GameError> {
        self.hand_id = Uuid::new_v4();
        self.hand_number += 1;
        self.phase = Phase::PreFlop;
        self.board.clear();
        self.pot.clear();
        self.hand_log.clear();
        self.summary = None;
        self.fault = None;
        for player in &mut self.players {
            player.reset_for_hand();
        }
        self.starting_stacks = self.players.iter().map(|p| p.stack).collect();
        self.total_chips = self.chips_in_play();

        let result = self.post_blinds_and_deal().and_then(|()| self.advance());
        self.guard(result)
    }

    fn post_blinds_and_deal(&mut self) -> Result<(), GameError> {
        let dealt: Vec<SeatIndex> = clockwise_from(self.button_idx, self.players.len())
            .filter(|&idx| self.players[idx].is_in_hand())
            .collect();
        let (small_blind_idx, big_blind_idx) = match dealt[..] {
            [other, _] => (self.button_idx, other),
            [first, second, ..] => (first, second),
            _ => return Err(GameError::NotEnoughPlayers),
        };
        self.small_blind_idx = small_blind_idx;
        self.big_blind_idx = big_blind_idx;

        let Blinds { small, big } = self.settings.blinds;
        for (idx, blind) in [(small_blind_idx, small), (big_blind_idx, big)] {
            let posted = self.players[idx].commit(blind);
            self.pot.bet(idx, posted);
            debug!(
                "Hand #{}: {} posts ${posted} blind.",
                self.hand_number, self.players[idx].id
            );
        }

        for _ in 0..constants::HOLE_CARDS {
            for &idx in &dealt {
                let card = self.deck.deal_card()?;
                self.players[idx].cards.push(card);
            }
        }

        self.round = BettingRound::new(Phase::PreFlop, &mut self.players, big_blind_idx, big);
        info!(
            "Hand #{} ({}) started with {} players: button {}, blinds {}.",
            self.hand_number,
            self.hand_id,
            dealt.len(),
            self.players[self.button_idx].id,
            self.settings.blinds
        );
        Ok(())
    }

    pub fn apply_action(&mut self, player_id: &PlayerId, action: Action) -> Result<&Self, GameError> {
        self.apply_action_with_commentary(player_id, action, None)
    }

    /// Applies `action` for `player_id` and moves the hand forward as far
    /// as it can go without further input.
    ///
    /// A rejected action leaves the game exactly as it was.
    pub fn apply_action_with_commentary(
        &mut self,
        player_id: &PlayerId,
        action: Action,
        commentary: Option<String>,
    ) -> Result<&Self, GameError> {
        self.ensure_in_progress()?;
        let idx = self.seat_of(player_id)?;
        let record = self
            .round
            .apply(&mut self.players, &mut self.pot, idx, action, commentary)?;
        info!("Hand #{}: {record}.", self.hand_number);
        self.hand_log.push(record);

        let result = self.advance().and_then(|()| self.verify_chips());
        self.guard(result)?;
        Ok(self)
    }

    fn ensure_in_progress(&self) -> Result<(), GameError> {
        if let Some(fault) = &self.fault {
            return Err(GameError::HandAborted(fault.to_string()));
        }
        if !self.phase.is_betting() {
            return Err(GameError::HandNotInProgress);
        }
        Ok(())
    }

    fn seat_of(&self, player_id: &PlayerId) -> Result<SeatIndex, GameError> {
        self.players
            .iter()
            .position(|p| &p.id == player_id)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))
    }

    /// Runs every transition that needs no player input: uncontested wins,
    /// dealing the next street, and showdown.
    fn advance(&mut self) -> Result<(), GameError> {
        loop {
            let in_hand: Vec<SeatIndex> = self
                .players
                .iter()
                .filter(|p| p.is_in_hand())
                .map(|p| p.seat_idx)
                .collect();
            if let [winner] = in_hand[..] {
                return self.award_uncontested(winner);
            }
            if !self.round.is_complete(&self.players) {
                return Ok(());
            }
            if self.phase == Phase::River {
                return self.showdown();
            }
            self.deal_street()?;
        }
    }

    fn deal_street(&mut self) -> Result<(), GameError> {
        let next = self.phase.next();
        self.deck.burn()?;
        let cards = self.deck.deal(next.cards_dealt())?;
        self.board.extend(cards);
        for player in &mut self.players {
            player.reset_for_street();
        }
        self.phase = next;
        self.round = BettingRound::new(
            next,
            &mut self.players,
            self.button_idx,
            self.settings.blinds.big,
        );
        debug!(
            "Hand #{}: {next} [{}].",
            self.hand_number,
            self.board
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        );
        Ok(())
    }

    fn folded_seats(&self) -> BTreeSet<SeatIndex> {
        self.players
            .iter()
            .filter(|p| !p.is_in_hand())
            .map(|p| p.seat_idx)
            .collect()
    }

    fn showdown(&mut self) -> Result<(), GameError> {
        self.phase = Phase::Showdown;
        self.round.next_action_idx = None;
        let folded = self.folded_seats();
        let refund = self.pot.return_uncalled(&folded).map(|(seat, amount)| {
            self.players[seat].stack += amount;
            (self.players[seat].id.clone(), amount)
        });

        let mut hands: BTreeMap<SeatIndex, HandValue> = BTreeMap::new();
        let mut shown = Vec::new();
        for player in self.players.iter().filter(|p| p.is_in_hand()) {
            let value = eval_with_board(&player.cards, &self.board)?;
            shown.push(ShownHand {
                player: player.id.clone(),
                cards: player.cards.clone(),
                description: value.to_string(),
                value: value.clone(),
            });
            hands.insert(player.seat_idx, value);
        }

        let layers = self.pot.layers(&folded);
        let order: Vec<SeatIndex> = clockwise_from(self.button_idx, self.players.len()).collect();
        let payouts = Pot::distribute(&layers, &hands, &order)?;
        let mut awards = Vec::with_capacity(payouts.len());
        for payout in payouts {
            let player = &mut self.players[payout.seat];
            player.stack += payout.amount;
            awards.push(Award {
                player: player.id.clone(),
                amount: payout.amount,
                pot_idx: payout.layer,
            });
        }
        self.pot.clear();
        self.finish(awards, shown, refund);
        Ok(())
    }

    fn award_uncontested(&mut self, winner: SeatIndex) -> Result<(), GameError> {
        let amount = self.pot.get_size();
        let player = &mut self.players[winner];
        player.stack += amount;
        let award = Award {
            player: player.id.clone(),
            amount,
            pot_idx: 0,
        };
        self.pot.clear();
        self.finish(vec![award], Vec::new(), None);
        Ok(())
    }

    fn finish(
        &mut self,
        awards: Vec<Award>,
        shown: Vec<ShownHand>,
        refund: Option<(PlayerId, Usd)>,
    ) {
        self.phase = Phase::Finished;
        self.round.next_action_idx = None;
        for player in &mut self.players {
            if player.stack == 0 {
                player.status = PlayerStatus::Eliminated;
            }
        }
        for award in &awards {
            info!(
                "Hand #{}: {} wins ${} from pot {}.",
                self.hand_number, award.player, award.amount, award.pot_idx
            );
        }
        let net = self
            .players
            .iter()
            .zip(&self.starting_stacks)
            .filter(|(_, start)| **start > 0)
            .map(|(p, start)| (p.id.clone(), i64::from(p.stack) - i64::from(*start)))
            .collect();
        self.summary = Some(HandSummary {
            hand_id: self.hand_id,
            hand_number: self.hand_number,
            board: self.board.clone(),
            awards,
            shown,
            refund,
            net,
        });
    }

    fn verify_chips(&self) -> Result<(), GameError> {
        let actual = self.chips_in_play();
        if actual != self.total_chips {
            return Err(GameError::ChipConservationViolation {
                expected: self.total_chips,
                actual,
            });
        }
        Ok(())
    }

    /// Passes rejections through. Fatal errors abort the hand first.
    fn guard(&mut self, result: Result<(), GameError>) -> Result<(), GameError> {
        match result {
            Err(err) if err.is_fatal() => Err(self.abort(err)),
            other => other,
        }
    }

    fn abort(&mut self, err: GameError) -> GameError {
        error!("Hand #{} aborted: {err}", self.hand_number);
        self.phase = Phase::Aborted;
        self.round.next_action_idx = None;
        self.fault = Some(err.clone());
        err
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn board(&self) -> &[Card] {
        &self.board
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == player_id)
    }

    pub fn pot(&self) -> &Pot {
        &self.pot
    }

    pub fn round(&self) -> &BettingRound {
        &self.round
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn hand_id(&self) -> Uuid {
        self.hand_id
    }

    pub fn hand_number(&self) -> u64 {
        self.hand_number
    }

    pub fn button_idx(&self) -> SeatIndex {
        self.button_idx
    }

    pub fn blind_positions(&self) -> (SeatIndex, SeatIndex) {
        (self.small_blind_idx, self.big_blind_idx)
    }

    /// Every action accepted this hand, across streets.
    pub fn hand_log(&self) -> &[ActionRecord] {
        &self.hand_log
    }

    pub fn summary(&self) -> Option<&HandSummary> {
        self.summary.as_ref()
    }

    pub fn fault(&self) -> Option<&GameError> {
        self.fault.as_ref()
    }

    pub fn total_chips(&self) -> u64 {
        self.total_chips
    }

    /// Stacks plus everything committed to the pot.
    pub fn chips_in_play(&self) -> u64 {
        let stacks: u64 = self.players.iter().map(|p| u64::from(p.stack)).sum();
        stacks + u64::from(self.pot.get_size())
    }

    pub fn is_hand_complete(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn is_aborted(&self) -> bool {
        self.phase == Phase::Aborted
    }

    fn num_funded(&self) -> usize {
        self.players.iter().filter(|p| p.stack > 0).count()
    }

    /// No further hand can be dealt.
    pub fn is_game_over(&self) -> bool {
        self.is_aborted() || (self.is_hand_complete() && self.num_funded() < constants::MIN_PLAYERS)
    }

    pub fn next_player(&self) -> Option<&PlayerId> {
        self.round
            .next_action_idx
            .and_then(|idx| self.players.get(idx))
            .map(|p| &p.id)
    }

    /// Count of actions accepted this hand. Together with the hand number
    /// it identifies a single turn.
    pub fn action_count(&self) -> usize {
        self.hand_log.len()
    }

    pub fn legal_actions(&self, player_id: &PlayerId) -> Result<ActionChoices, GameError> {
        let idx = self.seat_of(player_id)?;
        if !self.phase.is_betting() || self.round.next_action_idx != Some(idx) {
            return Ok(ActionChoices::default());
        }
        Ok(self.round.legal_actions(&self.players[idx]))
    }

    /// The action taken for the player to act when they don't answer in
    /// time: fold when facing a bet, otherwise check.
    pub fn default_action(&self) -> Option<(PlayerId, Action)> {
        if !self.phase.is_betting() {
            return None;
        }
        let player = self.players.get(self.round.next_action_idx?)?;
        let action = if self.round.to_call(player) > 0 {
            Action::Fold
        } else {
            Action::Check
        };
        Some((player.id.clone(), action))
    }

    fn is_shown(&self, player_id: &PlayerId) -> bool {
        self.summary
            .as_ref()
            .is_some_and(|summary| summary.shown.iter().any(|hand| &hand.player == player_id))
    }

    fn player_views(&self, viewer: Option<SeatIndex>) -> Vec<PlayerView> {
        self.players
            .iter()
            .map(|p| PlayerView {
                id: p.id.clone(),
                seat_idx: p.seat_idx,
                stack: p.stack,
                bet: p.bet,
                invested: self.pot.get_investment(p.seat_idx),
                status: p.status,
                cards: if viewer == Some(p.seat_idx) || self.is_shown(&p.id) {
                    p.cards.clone()
                } else {
                    Vec::new()
                },
            })
            .collect()
    }

    /// What a spectator sees: no hole cards unless shown at showdown.
    pub fn public_view(&self) -> Vec<PlayerView> {
        self.player_views(None)
    }

    /// Everything `player_id` may know right now.
    pub fn observation(&self, player_id: &PlayerId) -> Result<Observation, GameError> {
        let idx = self.seat_of(player_id)?;
        let me = &self.players[idx];
        let is_turn = self.phase.is_betting() && self.round.next_action_idx == Some(idx);
        let legal_actions = if is_turn {
            self.round.legal_actions(me)
        } else {
            ActionChoices::default()
        };
        let (min_raise_to, max_raise_to) = match legal_actions.min_raise_to() {
            Some(min) => (Some(min), Some(me.bet + me.stack)),
            None => (None, None),
        };
        let to_call = if me.can_act() {
            self.round.to_call(me).min(me.stack)
        } else {
            0
        };
        Ok(Observation {
            hand_id: self.hand_id,
            hand_number: self.hand_number,
            player: me.id.clone(),
            seat_idx: idx,
            phase: self.phase,
            hole_cards: me.cards.clone(),
            board: self.board.clone(),
            stack: me.stack,
            pot: self.pot.get_size(),
            pots: self.pot.layers(&self.folded_seats()),
            players: self.player_views(Some(idx)),
            button_idx: self.button_idx,
            blinds: self.settings.blinds,
            high_bet: self.round.high_bet,
            to_call,
            min_raise_to,
            max_raise_to,
            legal_actions,
            history: self.hand_log.clone(),
            is_turn,
        })
    }
}
