//! One street of betting.
//!
//! The round owns the street's high bet, the minimum raise increment, and
//! whose turn it is. Player chip state lives on [`Player`]; every mutation
//! goes through [`BettingRound::apply`], which validates first and only
//! then touches players or the pot.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{
    entities::{
        Action, ActionChoice, ActionChoices, ActionRecord, Player, PlayerStatus, SeatIndex, Usd,
    },
    errors::GameError,
    pot::Pot,
    state_machine::Phase,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BettingRound {
    pub street: Phase,
    /// Highest street bet any player has made.
    pub high_bet: Usd,
    /// Size of the last full raise, or the big blind if nobody raised yet.
    pub min_raise: Usd,
    pub next_action_idx: Option<SeatIndex>,
    /// Accepted actions on this street, oldest first.
    pub actions: Vec<ActionRecord>,
}

impl BettingRound {
    /// Opens a street. Blinds, if any, must already be posted so that the
    /// high bet picks them up. Action starts with the first seat after
    /// `after_idx` that still needs to act.
    pub fn new(street: Phase, players: &mut [Player], after_idx: SeatIndex, big_blind: Usd) -> Self {
        for player in players.iter_mut() {
            player.has_acted = false;
        }
        let high_bet = players
            .iter()
            .filter(|p| p.is_in_hand())
            .map(|p| p.bet)
            .max()
            .unwrap_or_default();
        let mut round = Self {
            street,
            high_bet,
            min_raise: big_blind,
            next_action_idx: None,
            actions: Vec::new(),
        };
        round.next_action_idx = round.next_to_act(players, after_idx);
        round
    }

    pub fn to_call(&self, player: &Player) -> Usd {
        self.high_bet.saturating_sub(player.bet)
    }

    pub fn min_raise_to(&self) -> Usd {
        self.high_bet.saturating_add(self.min_raise)
    }

    fn needs_action(&self, player: &Player) -> bool {
        player.can_act() && (!player.has_acted || player.bet < self.high_bet)
    }

    /// A street is over once nobody who can still bet owes action. A lone
    /// player with chips who already matches the high bet has nobody left
    /// to bet against.
    pub fn is_complete(&self, players: &[Player]) -> bool {
        let able: Vec<&Player> = players.iter().filter(|p| p.can_act()).collect();
        if able.len() <= 1 && able.iter().all(|p| p.bet >= self.high_bet) {
            return true;
        }
        !able.iter().any(|p| self.needs_action(p))
    }

    /// First seat clockwise after `after_idx` that owes action.
    pub fn next_to_act(&self, players: &[Player], after_idx: SeatIndex) -> Option<SeatIndex> {
        if players.is_empty() || self.is_complete(players) {
            return None;
        }
        let num_players = players.len();
        (1..=num_players)
            .map(|offset| (after_idx + offset) % num_players)
            .find(|&idx| self.needs_action(&players[idx]))
    }

    /// Actions available to `player`, assuming it's their turn.
    ///
    /// Players who already acted on this street and now face only a short
    /// all-in may call or fold but not raise.
    pub fn legal_actions(&self, player: &Player) -> ActionChoices {
        if !player.can_act() {
            return ActionChoices::default();
        }
        let to_call = self.to_call(player);
        let mut choices = vec![ActionChoice::Fold, ActionChoice::AllIn];
        if to_call == 0 {
            choices.push(ActionChoice::Check);
        } else {
            choices.push(ActionChoice::Call(to_call.min(player.stack)));
        }
        if player.stack > to_call && !player.has_acted {
            let max_raise_to = player.bet + player.stack;
            choices.push(ActionChoice::Raise(self.min_raise_to().min(max_raise_to)));
        }
        ActionChoices::from(choices)
    }

    /// Checks `action` against the round without changing anything and
    /// returns how many chips it would move from the player's stack.
    pub fn validate(&self, player: &Player, action: &Action) -> Result<Usd, GameError> {
        let invalid = |reason: &str| GameError::InvalidAction {
            action: *action,
            reason: reason.to_string(),
        };
        if !player.can_act() {
            return Err(invalid("player can't act"));
        }
        let to_call = self.to_call(player);
        match *action {
            Action::Fold => Ok(0),
            Action::Check if to_call > 0 => Err(invalid(&format!("facing ${to_call} to call"))),
            Action::Check => Ok(0),
            Action::Call if to_call == 0 => Err(invalid("nothing to call")),
            Action::Call => Ok(to_call.min(player.stack)),
            Action::Raise(_) if player.stack <= to_call => {
                Err(invalid("not enough chips to raise, call or go all-in"))
            }
            Action::Raise(_) if player.has_acted => {
                Err(invalid("betting wasn't reopened by a full raise"))
            }
            Action::Raise(amount) => {
                let max_raise_to = player.bet + player.stack;
                if amount > max_raise_to {
                    return Err(GameError::InsufficientChips {
                        required: amount - player.bet,
                        available: player.stack,
                    });
                }
                let minimum = self.min_raise_to();
                if amount < minimum && amount != max_raise_to {
                    return Err(GameError::RaiseTooSmall { amount, minimum });
                }
                Ok(amount - player.bet)
            }
            Action::AllIn => Ok(player.stack),
        }
    }

    /// Validates and applies `action` for the player at `idx`.
    ///
    /// On error nothing has changed. On success the player's chips have
    /// moved into `pot`, the high bet and minimum raise are updated, and
    /// the turn has passed on.
    pub fn apply(
        &mut self,
        players: &mut [Player],
        pot: &mut Pot,
        idx: SeatIndex,
        action: Action,
        commentary: Option<String>,
    ) -> Result<ActionRecord, GameError> {
        if self.next_action_idx != Some(idx) {
            return Err(GameError::OutOfTurnAction);
        }
        let player = players.get(idx).ok_or(GameError::OutOfTurnAction)?;
        let chips = self.validate(player, &action)?;

        let player = &mut players[idx];
        let committed = if action == Action::Fold {
            player.status = PlayerStatus::Folded;
            0
        } else {
            player.commit(chips)
        };
        pot.bet(idx, committed);
        player.has_acted = true;

        let bet = player.bet;
        if bet > self.high_bet {
            let increment = bet - self.high_bet;
            self.high_bet = bet;
            // Only a full raise reopens betting for everyone else.
            if increment >= self.min_raise {
                self.min_raise = increment;
                for (i, other) in players.iter_mut().enumerate() {
                    if i != idx && other.can_act() {
                        other.has_acted = false;
                    }
                }
            }
        }

        let record = ActionRecord {
            player: players[idx].id.clone(),
            street: self.street,
            action,
            amount: committed,
            commentary,
            timestamp: Utc::now(),
        };
        self.actions.push(record.clone());
        self.next_action_idx = self.next_to_act(players, idx);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Seat;

    fn seat_players(stacks: &[Usd]) -> Vec<Player> {
        stacks
            .iter()
            .enumerate()
            .map(|(idx, &stack)| Player::new(Seat::new(format!("p{idx}"), stack), idx))
            .collect()
    }

    /// Three-handed pre-flop with the button on seat 0 and blinds 10/20.
    fn preflop(stacks: &[Usd]) -> (Vec<Player>, Pot, BettingRound) {
        let mut players = seat_players(stacks);
        let mut pot = Pot::new();
        for (idx, blind) in [(1, 10), (2, 20)] {
            let posted = players[idx].commit(blind);
            pot.bet(idx, posted);
        }
        let round = BettingRound::new(Phase::PreFlop, &mut players, 2, 20);
        (players, pot, round)
    }

    #[test]
    fn action_starts_left_of_big_blind() {
        let (players, _, round) = preflop(&[1000, 1000, 1000]);
        assert_eq!(round.high_bet, 20);
        assert_eq!(round.next_action_idx, Some(0));
        let choices = round.legal_actions(&players[0]);
        assert!(choices.contains(&Action::Call));
        assert!(!choices.contains(&Action::Check));
        assert_eq!(choices.min_raise_to(), Some(40));
    }

    #[test]
    fn big_blind_gets_option_after_limps() {
        let (mut players, mut pot, mut round) = preflop(&[1000, 1000, 1000]);
        round.apply(&mut players, &mut pot, 0, Action::Call, None).unwrap();
        round.apply(&mut players, &mut pot, 1, Action::Call, None).unwrap();
        assert_eq!(round.next_action_idx, Some(2));
        assert!(round.legal_actions(&players[2]).contains(&Action::Check));
        round.apply(&mut players, &mut pot, 2, Action::Check, None).unwrap();
        assert!(round.is_complete(&players));
        assert_eq!(round.next_action_idx, None);
        assert_eq!(pot.get_size(), 60);
    }

    #[test]
    fn rejections_leave_state_untouched() {
        let (mut players, mut pot, mut round) = preflop(&[1000, 1000, 1000]);
        let before = (players[0].stack, pot.get_size(), round.high_bet);

        let err = round.apply(&mut players, &mut pot, 1, Action::Call, None);
        assert_eq!(err, Err(GameError::OutOfTurnAction));
        let err = round.apply(&mut players, &mut pot, 0, Action::Check, None);
        assert!(matches!(err, Err(GameError::InvalidAction { .. })));
        let err = round.apply(&mut players, &mut pot, 0, Action::Raise(30), None);
        assert_eq!(
            err,
            Err(GameError::RaiseTooSmall {
                amount: 30,
                minimum: 40
            })
        );
        let err = round.apply(&mut players, &mut pot, 0, Action::Raise(5000), None);
        assert!(matches!(err, Err(GameError::InsufficientChips { .. })));

        assert_eq!(before, (players[0].stack, pot.get_size(), round.high_bet));
        assert_eq!(round.next_action_idx, Some(0));
        assert!(round.actions.is_empty());
    }

    #[test]
    fn full_raise_sets_new_minimum_and_reopens() {
        let (mut players, mut pot, mut round) = preflop(&[1000, 1000, 1000]);
        round.apply(&mut players, &mut pot, 0, Action::Raise(60), None).unwrap();
        assert_eq!(round.high_bet, 60);
        assert_eq!(round.min_raise, 40);
        assert_eq!(round.min_raise_to(), 100);
        round.apply(&mut players, &mut pot, 1, Action::Raise(100), None).unwrap();
        assert_eq!(round.next_action_idx, Some(2));
        // Seat 0 had acted but the re-raise was full, so it may raise again.
        round.apply(&mut players, &mut pot, 2, Action::Fold, None).unwrap();
        assert_eq!(round.next_action_idx, Some(0));
        assert!(round.legal_actions(&players[0]).contains(&Action::Raise(0)));
    }

    #[test]
    fn short_all_in_does_not_reopen_betting() {
        let (mut players, mut pot, mut round) = preflop(&[1000, 1000, 70]);
        round.apply(&mut players, &mut pot, 0, Action::Raise(50), None).unwrap();
        assert_eq!(round.min_raise, 30);
        round.apply(&mut players, &mut pot, 1, Action::Call, None).unwrap();
        // Big blind shoves 70 total: a 20 chip raise, short of 30.
        let record = round.apply(&mut players, &mut pot, 2, Action::AllIn, None).unwrap();
        assert_eq!(record.amount, 50);
        assert_eq!(players[2].status, PlayerStatus::AllIn);
        assert_eq!(round.high_bet, 70);
        assert_eq!(round.min_raise, 30);

        assert_eq!(round.next_action_idx, Some(0));
        let choices = round.legal_actions(&players[0]);
        assert!(choices.contains(&Action::Call));
        assert!(choices.contains(&Action::AllIn));
        assert!(!choices.contains(&Action::Raise(0)));
        let err = round.apply(&mut players, &mut pot, 0, Action::Raise(200), None);
        assert!(matches!(err, Err(GameError::InvalidAction { .. })));

        round.apply(&mut players, &mut pot, 0, Action::Call, None).unwrap();
        round.apply(&mut players, &mut pot, 1, Action::Call, None).unwrap();
        assert!(round.is_complete(&players));
        assert_eq!(pot.get_size(), 210);
    }

    #[test]
    fn raise_to_full_stack_below_minimum_is_all_in() {
        let (mut players, mut pot, mut round) = preflop(&[30, 1000, 1000]);
        assert_eq!(round.legal_actions(&players[0]).min_raise_to(), Some(30));
        round.apply(&mut players, &mut pot, 0, Action::Raise(30), None).unwrap();
        assert_eq!(players[0].status, PlayerStatus::AllIn);
        assert_eq!(round.high_bet, 30);
        assert_eq!(round.min_raise, 20);
    }

    #[test]
    fn short_call_goes_all_in() {
        let (mut players, mut pot, mut round) = preflop(&[15, 1000, 1000]);
        assert!(!round.legal_actions(&players[0]).contains(&Action::Raise(0)));
        let record = round.apply(&mut players, &mut pot, 0, Action::Call, None).unwrap();
        assert_eq!(record.amount, 15);
        assert_eq!(players[0].status, PlayerStatus::AllIn);
        assert_eq!(round.high_bet, 20);
    }

    #[test]
    fn lone_covered_player_ends_round() {
        let (mut players, mut pot, mut round) = preflop(&[1000, 1000, 1000]);
        round.apply(&mut players, &mut pot, 0, Action::AllIn, None).unwrap();
        round.apply(&mut players, &mut pot, 1, Action::Fold, None).unwrap();
        assert_eq!(round.next_action_idx, Some(2));
        round.apply(&mut players, &mut pot, 2, Action::Call, None).unwrap();
        assert!(round.is_complete(&players));
        assert_eq!(players[2].status, PlayerStatus::AllIn);
    }
}
