use chrono::{DateTime, Utc};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    collections::HashSet,
    fmt,
    hash::{Hash, Hasher},
    mem::discriminant,
    str::FromStr,
};
use uuid::Uuid;

use super::{
    constants,
    errors::{GameError, ParseCardError},
    functional::HandValue,
    pot::PotLayer,
    state_machine::Phase,
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    pub const ALL: [Self; 4] = [Self::Club, Self::Diamond, Self::Heart, Self::Spade];

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Diamond => "♦",
            Self::Heart => "♥",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Suit {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c" | "C" | "♣" => Ok(Self::Club),
            "d" | "D" | "♦" => Ok(Self::Diamond),
            "h" | "H" | "♥" => Ok(Self::Heart),
            "s" | "S" | "♠" => Ok(Self::Spade),
            _ => Err(ParseCardError(s.to_string())),
        }
    }
}

/// Card values run from 2 up to 14 (ace). Aces play low only inside the
/// A-2-3-4-5 straight.
pub type Value = u8;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl Card {
    pub const fn value(&self) -> Value {
        self.0
    }

    pub const fn suit(&self) -> Suit {
        self.1
    }
}

pub(crate) fn value_repr(value: Value) -> String {
    match value {
        14 => "A".to_string(),
        13 => "K".to_string(),
        12 => "Q".to_string(),
        11 => "J".to_string(),
        v => v.to_string(),
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", value_repr(self.0), self.1)
    }
}

/// Parses the short notation used in logs and tests: `As`, `Td`, `10h`,
/// `2c`.
impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .char_indices()
            .last()
            .map(|(idx, _)| idx)
            .ok_or_else(|| ParseCardError(s.to_string()))?;
        let (value, suit) = s.split_at(split);
        let value = match value {
            "A" | "a" => constants::ACE,
            "K" | "k" => 13,
            "Q" | "q" => 12,
            "J" | "j" => 11,
            "T" | "t" => 10,
            v => v
                .parse::<Value>()
                .ok()
                .filter(|v| (constants::MIN_CARD_VALUE..=10).contains(v))
                .ok_or_else(|| ParseCardError(s.to_string()))?,
        };
        let suit = suit.parse().map_err(|_| ParseCardError(s.to_string()))?;
        Ok(Self(value, suit))
    }
}

/// Parses whitespace separated cards, e.g. `"As Kd 7h"`.
pub fn parse_cards(s: &str) -> Result<Vec<Card>, ParseCardError> {
    s.split_whitespace().map(str::parse).collect()
}

/// A 52 card deck with its own random source. Two decks built from the
/// same seed deal identical sequences.
#[derive(Debug)]
pub struct Deck {
    cards: [Card; constants::DECK_SIZE],
    deck_idx: usize,
    rng: StdRng,
}

impl Deck {
    /// Builds and shuffles a fresh deck. Without a seed the deck draws its
    /// randomness from the OS.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let mut cards = [Card(constants::MIN_CARD_VALUE, Suit::Club); constants::DECK_SIZE];
        for (i, value) in (constants::MIN_CARD_VALUE..=constants::ACE).enumerate() {
            for (j, suit) in Suit::ALL.into_iter().enumerate() {
                cards[4 * i + j] = Card(value, suit);
            }
        }
        let mut deck = Self {
            cards,
            deck_idx: 0,
            rng,
        };
        deck.shuffle();
        deck
    }

    /// A deck that deals `top` first, in order, followed by the remaining
    /// cards. Later shuffles are seeded, so replays stay deterministic.
    pub fn stacked(top: &[Card], seed: u64) -> Result<Self, GameError> {
        let mut deck = Self::new(Some(seed));
        let mut seen = HashSet::with_capacity(top.len());
        for card in top {
            if !seen.insert(*card) || !(constants::MIN_CARD_VALUE..=constants::ACE).contains(&card.0) {
                return Err(GameError::DuplicateCard(*card));
            }
        }
        let rest: Vec<Card> = deck
            .cards
            .iter()
            .copied()
            .filter(|card| !seen.contains(card))
            .collect();
        for (slot, card) in deck.cards.iter_mut().zip(top.iter().chain(&rest)) {
            *slot = *card;
        }
        Ok(deck)
    }

    /// Collects every card and reshuffles. The random source carries over,
    /// so a seeded deck stays deterministic across hands.
    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut self.rng);
        self.deck_idx = 0;
    }

    pub fn remaining(&self) -> usize {
        constants::DECK_SIZE - self.deck_idx
    }

    pub fn deal_card(&mut self) -> Result<Card, GameError> {
        let card = *self
            .cards
            .get(self.deck_idx)
            .ok_or(GameError::DeckExhausted {
                requested: 1,
                remaining: 0,
            })?;
        self.deck_idx += 1;
        Ok(card)
    }

    /// Removes `n` cards from the top of the deck. Nothing is removed if
    /// fewer than `n` remain.
    pub fn deal(&mut self, n: usize) -> Result<Vec<Card>, GameError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(GameError::DeckExhausted {
                requested: n,
                remaining,
            });
        }
        let cards = self.cards[self.deck_idx..self.deck_idx + n].to_vec();
        self.deck_idx += n;
        Ok(cards)
    }

    pub fn burn(&mut self) -> Result<(), GameError> {
        self.deal_card().map(|_| ())
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Type alias for whole chips. Stacks, bets, and pots are all whole
/// numbers of chips.
pub type Usd = u32;

/// A player's public identity at the table.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: &str) -> Self {
        let id = s
            .trim()
            .chars()
            .take(constants::MAX_PLAYER_ID_LENGTH)
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Seat positions are indices into the game's player list. They stay
/// stable for the life of a game; busted players keep their seat.
pub type SeatIndex = usize;

/// A player and the chips they sit down with.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Seat {
    pub id: PlayerId,
    pub stack: Usd,
}

impl Seat {
    pub fn new(id: impl Into<PlayerId>, stack: Usd) -> Self {
        Self {
            id: id.into(),
            stack,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Blinds {
    pub small: Usd,
    pub big: Usd,
}

impl Default for Blinds {
    fn default() -> Self {
        Self {
            small: constants::DEFAULT_SMALL_BLIND,
            big: constants::DEFAULT_BIG_BLIND,
        }
    }
}

impl fmt::Display for Blinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}/{}", self.small, self.big)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PlayerStatus {
    /// Still in the hand with chips behind.
    Active,
    Folded,
    /// Still in the hand with nothing left to bet.
    AllIn,
    /// Out of chips. Keeps the seat but is dealt out.
    Eliminated,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Active => "active",
            Self::Folded => "folded",
            Self::AllIn => "all-in",
            Self::Eliminated => "eliminated",
        };
        write!(f, "{repr:10}")
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub stack: Usd,
    pub cards: Vec<Card>,
    /// Chips put in during the current street.
    pub bet: Usd,
    pub status: PlayerStatus,
    pub seat_idx: SeatIndex,
    /// Whether the player acted since the last full raise on this street.
    pub has_acted: bool,
}

impl Player {
    #[must_use]
    pub fn new(seat: Seat, seat_idx: SeatIndex) -> Self {
        let status = if seat.stack == 0 {
            PlayerStatus::Eliminated
        } else {
            PlayerStatus::Active
        };
        Self {
            id: seat.id,
            stack: seat.stack,
            cards: Vec::with_capacity(constants::HOLE_CARDS),
            bet: 0,
            status,
            seat_idx,
            has_acted: false,
        }
    }

    pub fn reset_for_hand(&mut self) {
        self.cards.clear();
        self.bet = 0;
        self.has_acted = false;
        self.status = if self.stack == 0 {
            PlayerStatus::Eliminated
        } else {
            PlayerStatus::Active
        };
    }

    pub fn reset_for_street(&mut self) {
        self.bet = 0;
        self.has_acted = false;
    }

    pub fn is_in_hand(&self) -> bool {
        matches!(self.status, PlayerStatus::Active | PlayerStatus::AllIn)
    }

    pub fn can_act(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    /// Moves up to `amount` chips from the stack into the current bet and
    /// returns how many actually moved. Emptying the stack puts the player
    /// all-in.
    pub fn commit(&mut self, amount: Usd) -> Usd {
        let amount = amount.min(self.stack);
        self.stack -= amount;
        self.bet += amount;
        if self.stack == 0 && self.status == PlayerStatus::Active {
            self.status = PlayerStatus::AllIn;
        }
        amount
    }
}

/// A player's move. `Raise` carries the total the player's street bet is
/// raised to, not the increment.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    Fold,
    Check,
    Call,
    Raise(Usd),
    AllIn,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Fold => write!(f, "fold"),
            Self::Check => write!(f, "check"),
            Self::Call => write!(f, "call"),
            Self::Raise(amount) => write!(f, "raise to ${amount}"),
            Self::AllIn => write!(f, "go all-in"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub enum ActionChoice {
    Fold,
    Check,
    /// Chips needed to call, capped at the player's stack.
    Call(Usd),
    /// Smallest legal raise-to total.
    Raise(Usd),
    AllIn,
}

impl fmt::Display for ActionChoice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Fold => write!(f, "fold"),
            Self::Check => write!(f, "check"),
            Self::Call(amount) => write!(f, "call (== ${amount})"),
            Self::Raise(amount) => write!(f, "raise (>= ${amount})"),
            Self::AllIn => write!(f, "all-in"),
        }
    }
}

// Choices compare by variant only. Amounts are informational; bet sizes
// are validated by the betting round.
impl Eq for ActionChoice {}

impl Hash for ActionChoice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(self).hash(state);
    }
}

impl PartialEq for ActionChoice {
    fn eq(&self, other: &Self) -> bool {
        discriminant(self) == discriminant(other)
    }
}

impl From<&Action> for ActionChoice {
    fn from(value: &Action) -> Self {
        match value {
            Action::Fold => Self::Fold,
            Action::Check => Self::Check,
            Action::Call => Self::Call(0),
            Action::Raise(amount) => Self::Raise(*amount),
            Action::AllIn => Self::AllIn,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ActionChoices(pub HashSet<ActionChoice>);

impl ActionChoices {
    pub fn contains(&self, action: &Action) -> bool {
        self.0.contains(&ActionChoice::from(action))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn call_amount(&self) -> Option<Usd> {
        self.0.get(&ActionChoice::Call(0)).and_then(|choice| match choice {
            ActionChoice::Call(amount) => Some(*amount),
            _ => None,
        })
    }

    pub fn min_raise_to(&self) -> Option<Usd> {
        self.0.get(&ActionChoice::Raise(0)).and_then(|choice| match choice {
            ActionChoice::Raise(amount) => Some(*amount),
            _ => None,
        })
    }
}

impl fmt::Display for ActionChoices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut choices: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        choices.sort();
        write!(f, "{}", choices.join(", "))
    }
}

impl<I> From<I> for ActionChoices
where
    I: IntoIterator<Item = ActionChoice>,
{
    fn from(iter: I) -> Self {
        Self(iter.into_iter().collect::<HashSet<_>>())
    }
}

/// One accepted action, as it appears in the hand history.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ActionRecord {
    pub player: PlayerId,
    pub street: Phase,
    pub action: Action,
    /// Chips the action moved into the pot.
    pub amount: Usd,
    pub commentary: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.player, self.action)?;
        if self.amount > 0 {
            write!(f, " (${})", self.amount)?;
        }
        Ok(())
    }
}

/// What one player can see of another.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub seat_idx: SeatIndex,
    pub stack: Usd,
    pub bet: Usd,
    /// Chips put in over the whole hand.
    pub invested: Usd,
    pub status: PlayerStatus,
    /// Empty unless these are the viewer's own cards or they were shown.
    pub cards: Vec<Card>,
}

/// The read-only snapshot an actor decides from. Opponents' hole cards
/// never appear here before showdown.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Observation {
    pub hand_id: Uuid,
    pub hand_number: u64,
    pub player: PlayerId,
    pub seat_idx: SeatIndex,
    pub phase: Phase,
    pub hole_cards: Vec<Card>,
    pub board: Vec<Card>,
    pub stack: Usd,
    pub pot: Usd,
    pub pots: Vec<PotLayer>,
    pub players: Vec<PlayerView>,
    pub button_idx: SeatIndex,
    pub blinds: Blinds,
    pub high_bet: Usd,
    pub to_call: Usd,
    pub min_raise_to: Option<Usd>,
    pub max_raise_to: Option<Usd>,
    pub legal_actions: ActionChoices,
    pub history: Vec<ActionRecord>,
    pub is_turn: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Award {
    pub player: PlayerId,
    pub amount: Usd,
    /// Index into the pot layers; 0 is the main pot.
    pub pot_idx: usize,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ShownHand {
    pub player: PlayerId,
    pub cards: Vec<Card>,
    pub value: HandValue,
    pub description: String,
}

/// How a hand ended.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandSummary {
    pub hand_id: Uuid,
    pub hand_number: u64,
    pub board: Vec<Card>,
    pub awards: Vec<Award>,
    /// Hands revealed at showdown. Empty when everyone else folded.
    pub shown: Vec<ShownHand>,
    /// An uncalled top bet handed back before the pot was split.
    pub refund: Option<(PlayerId, Usd)>,
    /// Stack change over the hand for every dealt-in player.
    pub net: Vec<(PlayerId, i64)>,
}

impl HandSummary {
    pub fn winners(&self) -> Vec<&PlayerId> {
        let mut winners: Vec<&PlayerId> = Vec::new();
        for award in &self.awards {
            if !winners.contains(&&award.player) {
                winners.push(&award.player);
            }
        }
        winners
    }

    pub fn total_awarded(&self) -> Usd {
        self.awards.iter().map(|award| award.amount).sum()
    }
}
