//! Bot decision-making logic with difficulty-based behavior.

use async_trait::async_trait;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::{Mutex, PoisonError};

use super::{
    Actor,
    errors::ActorResult,
    models::{BotConfig, Decision, DifficultyParams},
};
use crate::game::{
    entities::{Action, Card, Observation, PlayerStatus, Usd},
    functional::{Rank, eval_with_board},
};

// === Hand Strength Base Values ===
// These represent the baseline strength for each poker hand rank

const STRENGTH_HIGH_CARD: f32 = 0.1;
const STRENGTH_ONE_PAIR: f32 = 0.25;
const STRENGTH_TWO_PAIR: f32 = 0.40;
const STRENGTH_THREE_OF_A_KIND: f32 = 0.55;
const STRENGTH_STRAIGHT: f32 = 0.70;
const STRENGTH_FLUSH: f32 = 0.75;
const STRENGTH_FULL_HOUSE: f32 = 0.85;
const STRENGTH_FOUR_OF_A_KIND: f32 = 0.95;
const STRENGTH_STRAIGHT_FLUSH: f32 = 0.99;

/// Configuration for bot decision-making thresholds and multipliers.
///
/// All threshold values are hand strength floats in range [0.0, 1.0].
/// Higher threshold = more conservative (tighter play).
///
/// # Examples
///
/// ```
/// use holdem_engine::bot::BotDecisionConfig;
///
/// let config = BotDecisionConfig::default();
/// assert_eq!(config.easy_fold_threshold, 0.08);
/// assert_eq!(config.easy_raise_threshold, 0.20);
/// ```
#[derive(Debug, Clone)]
pub struct BotDecisionConfig {
    /// Hand strength below this = fold (Easy bot).
    pub easy_fold_threshold: f32,

    /// Hand strength above this = raise (Easy bot).
    pub easy_raise_threshold: f32,

    /// Hand strength below this = fold (Standard bot).
    pub standard_fold_threshold: f32,

    /// Hand strength above this = raise (Standard bot).
    pub standard_raise_threshold: f32,

    /// Hand strength below this = fold (TAG bot).
    pub tag_fold_threshold: f32,

    /// Hand strength above this = raise (TAG bot).
    pub tag_raise_threshold: f32,

    /// Bluff size as a multiplier of the current pot.
    ///
    /// **Effect**: 1.5 = raises by 150% of pot when bluffing
    pub bluff_size_multiplier: f32,

    /// Pot odds above this add [`Self::pot_odds_bonus_value`] to the
    /// calling chance.
    pub pot_odds_bonus_threshold: f32,

    pub pot_odds_bonus_value: f32,

    /// Base probability of calling with medium-strength hands.
    ///
    /// **Effect**: call_prob = base + (aggression / divisor)
    pub base_call_probability: f32,

    pub call_aggression_divisor: f32,

    /// Base probability of raising with strong hands.
    ///
    /// **Effect**: raise_prob = base + (aggression / divisor)
    pub base_raise_probability: f32,

    pub raise_aggression_divisor: f32,

    /// Raise size multipliers (of pot plus call) by aggression band:
    /// below 1.0, below 2.0, and above.
    pub passive_raise_multiplier: f32,
    pub moderate_raise_multiplier: f32,
    pub aggressive_raise_multiplier: f32,

    /// Raise amount varies by ±this fraction.
    pub raise_variance: f32,

    /// Bonus to hand strength on or next to the button.
    pub late_position_bonus: f32,

    pub middle_position_bonus: f32,

    pub early_middle_position_penalty: f32,

    /// Penalty to hand strength when first to act.
    pub utg_position_penalty: f32,
}

impl Default for BotDecisionConfig {
    fn default() -> Self {
        Self {
            // Fold/raise thresholds by difficulty
            easy_fold_threshold: 0.08,
            easy_raise_threshold: 0.20,
            standard_fold_threshold: 0.12,
            standard_raise_threshold: 0.28,
            tag_fold_threshold: 0.18,
            tag_raise_threshold: 0.33,
            // Bluffing
            bluff_size_multiplier: 1.5,
            // Pot odds
            pot_odds_bonus_threshold: 0.25,
            pot_odds_bonus_value: 0.2,
            // Calling
            base_call_probability: 0.3,
            call_aggression_divisor: 5.0,
            // Raising
            base_raise_probability: 0.4,
            raise_aggression_divisor: 4.0,
            // Raise sizing
            passive_raise_multiplier: 2.0,
            moderate_raise_multiplier: 2.5,
            aggressive_raise_multiplier: 3.0,
            raise_variance: 0.2,
            // Position adjustments
            late_position_bonus: 0.08,
            middle_position_bonus: 0.04,
            early_middle_position_penalty: -0.03,
            utg_position_penalty: -0.05,
        }
    }
}

/// Rule-based bot. Every action it returns is one of the observation's
/// legal actions.
pub struct BotDecisionMaker {
    config: BotConfig,
    params: DifficultyParams,
    thresholds: BotDecisionConfig,
    /// Random number generator
    rng: Mutex<StdRng>,
}

impl BotDecisionMaker {
    pub fn new(config: BotConfig) -> Self {
        Self::with_config(config, BotDecisionConfig::default())
    }

    pub fn with_config(config: BotConfig, mut thresholds: BotDecisionConfig) -> Self {
        // Sampled as a symmetric range around zero
        thresholds.raise_variance = if thresholds.raise_variance.is_finite() {
            thresholds.raise_variance.abs().min(1.0)
        } else {
            0.0
        };
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            params: DifficultyParams::from_difficulty(config.difficulty),
            config,
            thresholds,
            rng: Mutex::new(rng),
        }
    }

    pub fn params(&self) -> &DifficultyParams {
        &self.params
    }

    /// Picks a move for the observed position.
    pub fn decide_action(&self, obs: &Observation) -> Decision {
        let legal = &obs.legal_actions;
        let can_check = legal.contains(&Action::Check);
        let params = &self.params;

        let hand_strength = (self.estimate_hand_strength(&obs.hole_cards, &obs.board)
            + self.calculate_position_modifier(obs))
        .clamp(0.0, 1.0);

        let (fold_threshold, raise_threshold) = match params.vpip {
            v if v > 0.40 => (
                self.thresholds.easy_fold_threshold,
                self.thresholds.easy_raise_threshold,
            ),
            v if v > 0.25 => (
                self.thresholds.standard_fold_threshold,
                self.thresholds.standard_raise_threshold,
            ),
            _ => (
                self.thresholds.tag_fold_threshold,
                self.thresholds.tag_raise_threshold,
            ),
        };

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let (action, reason) = if !can_check && obs.stack <= obs.to_call {
            // Calling puts the whole stack in.
            if hand_strength >= fold_threshold {
                (Action::Call, "calling off the stack")
            } else {
                (Action::Fold, "too weak to call off the stack")
            }
        } else if hand_strength < fold_threshold {
            let bluff = params.bluffs && rng.random_bool(f64::from(params.bluff_frequency));
            let increment = (obs.pot as f32 * self.thresholds.bluff_size_multiplier) as Usd;
            match self.raise_to(obs, increment) {
                Some(raise) if bluff => (raise, "bluffing"),
                _ if can_check => (Action::Check, "weak hand, free card"),
                _ => (Action::Fold, "weak hand"),
            }
        } else if hand_strength < raise_threshold {
            if can_check {
                (Action::Check, "medium hand, pot control")
            } else {
                let pot_odds = self.calculate_pot_odds(obs.pot, obs.to_call);
                let pot_odds_bonus = if pot_odds > self.thresholds.pot_odds_bonus_threshold {
                    self.thresholds.pot_odds_bonus_value
                } else {
                    0.0
                };
                let call_probability = self.thresholds.base_call_probability
                    + (params.aggression_factor / self.thresholds.call_aggression_divisor)
                    + pot_odds_bonus;
                if rng.random_bool(f64::from(call_probability.min(1.0))) {
                    (Action::Call, "medium hand, getting a price")
                } else {
                    (Action::Fold, "medium hand, not worth the price")
                }
            }
        } else {
            let raise_probability = self.thresholds.base_raise_probability
                + (params.aggression_factor / self.thresholds.raise_aggression_divisor);
            let wants_raise = rng.random_bool(f64::from(raise_probability.min(1.0)));
            let increment = self.calculate_raise_increment(&mut rng, obs.pot, obs.to_call);
            match self.raise_to(obs, increment) {
                Some(raise) if wants_raise => (raise, "strong hand, building the pot"),
                _ if can_check => (Action::Check, "strong hand, slow-playing"),
                _ => (Action::Call, "strong hand"),
            }
        };

        let action = if legal.contains(&action) {
            action
        } else {
            log::warn!(
                "{} picked illegal {action}, falling back to a passive move",
                self.config.name
            );
            if can_check { Action::Check } else { Action::Fold }
        };
        Decision::new(action).with_commentary(format!(
            "{reason} (strength {hand_strength:.2})"
        ))
    }

    /// A raise of roughly `increment` over the high bet, clamped to the
    /// legal range. `None` when raising isn't allowed.
    fn raise_to(&self, obs: &Observation, increment: Usd) -> Option<Action> {
        let min = obs.min_raise_to?;
        let max = obs.max_raise_to?;
        let target = obs.high_bet.saturating_add(increment).clamp(min, max);
        Some(if target >= max {
            Action::AllIn
        } else {
            Action::Raise(target)
        })
    }

    fn calculate_raise_increment(&self, rng: &mut StdRng, pot_size: Usd, to_call: Usd) -> Usd {
        let base_multiplier = match self.params.aggression_factor {
            x if x < 1.0 => self.thresholds.passive_raise_multiplier,
            x if x < 2.0 => self.thresholds.moderate_raise_multiplier,
            _ => self.thresholds.aggressive_raise_multiplier,
        };
        let variance = self.thresholds.raise_variance;
        let multiplier = base_multiplier * (1.0 + rng.random_range(-variance..=variance));
        ((pot_size + to_call) as f32 * multiplier / 2.0) as Usd
    }

    /// Pot odds as pot / (pot + call), e.g. $100 pot and $50 to call is 0.67.
    fn calculate_pot_odds(&self, pot_size: Usd, call_amount: Usd) -> f32 {
        if call_amount == 0 {
            return 1.0;
        }
        pot_size as f32 / (pot_size + call_amount) as f32
    }

    /// Later position means acting with more information.
    fn calculate_position_modifier(&self, obs: &Observation) -> f32 {
        let in_hand = obs
            .players
            .iter()
            .filter(|p| p.status != PlayerStatus::Eliminated)
            .count();
        if in_hand <= 2 || obs.players.is_empty() {
            return 0.0;
        }
        let num_seats = obs.players.len();
        // 0 is the button; larger means earlier to act post-flop.
        let pos = (obs.button_idx + num_seats - obs.seat_idx) % num_seats;
        let relative_pos = pos as f32 / num_seats as f32;
        match relative_pos {
            x if x < 0.2 => self.thresholds.late_position_bonus,
            x if x < 0.4 => self.thresholds.middle_position_bonus,
            x if x < 0.6 => 0.0,
            x if x < 0.8 => self.thresholds.early_middle_position_penalty,
            _ => self.thresholds.utg_position_penalty,
        }
    }

    /// Rough strength in [0.0, 1.0]. Made hands are scored by category
    /// with a small bonus for the top card; hole cards alone by pairs,
    /// height, suitedness, and connectedness.
    pub fn estimate_hand_strength(&self, hole_cards: &[Card], board_cards: &[Card]) -> f32 {
        if board_cards.is_empty() {
            return preflop_strength(hole_cards);
        }
        let Ok(hand) = eval_with_board(hole_cards, board_cards) else {
            return 0.0;
        };
        let base_strength = match hand.rank {
            Rank::HighCard => STRENGTH_HIGH_CARD,
            Rank::OnePair => STRENGTH_ONE_PAIR,
            Rank::TwoPair => STRENGTH_TWO_PAIR,
            Rank::ThreeOfAKind => STRENGTH_THREE_OF_A_KIND,
            Rank::Straight => STRENGTH_STRAIGHT,
            Rank::Flush => STRENGTH_FLUSH,
            Rank::FullHouse => STRENGTH_FULL_HOUSE,
            Rank::FourOfAKind => STRENGTH_FOUR_OF_A_KIND,
            Rank::StraightFlush | Rank::RoyalFlush => STRENGTH_STRAIGHT_FLUSH,
        };
        let top = hand.values.first().copied().unwrap_or_default();
        let kicker_bonus = f32::from(top) / 14.0 * 0.1;
        (base_strength + kicker_bonus).min(1.0)
    }
}

fn preflop_strength(hole_cards: &[Card]) -> f32 {
    let [a, b] = hole_cards else {
        return 0.0;
    };
    let (high, low) = (a.0.max(b.0), a.0.min(b.0));
    let mut strength = if high == low {
        0.5 + f32::from(high) / 28.0
    } else {
        f32::from(high + low) / 56.0
    };
    if a.1 == b.1 {
        strength += 0.05;
    }
    if high - low == 1 {
        strength += 0.03;
    }
    strength.min(1.0)
}

#[async_trait]
impl Actor for BotDecisionMaker {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn act(&self, observation: &Observation) -> ActorResult<Decision> {
        if !self.config.think_time.is_zero() {
            tokio::time::sleep(self.config.think_time).await;
        }
        Ok(self.decide_action(observation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        game::{
            GameSettings, GameState,
            entities::{Seat, parse_cards},
        },
        table::config::BotDifficulty,
    };

    fn bot(difficulty: BotDifficulty, seed: u64) -> BotDecisionMaker {
        BotDecisionMaker::new(BotConfig::new("bot", difficulty).with_seed(seed))
    }

    #[test]
    fn preflop_pairs_beat_rags() {
        let maker = bot(BotDifficulty::Standard, 1);
        let aces = maker.estimate_hand_strength(&parse_cards("As Ad").unwrap(), &[]);
        let deuces = maker.estimate_hand_strength(&parse_cards("2s 2d").unwrap(), &[]);
        let rags = maker.estimate_hand_strength(&parse_cards("7c 2d").unwrap(), &[]);
        assert!(aces > deuces);
        assert!(deuces > rags);
        assert!((aces - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn made_hands_rank_by_category() {
        let maker = bot(BotDifficulty::Standard, 1);
        let board = parse_cards("Kh Qs Jd 4c 2h").unwrap();
        let straight = maker.estimate_hand_strength(&parse_cards("As Td").unwrap(), &board);
        let pair = maker.estimate_hand_strength(&parse_cards("Kc 3d").unwrap(), &board);
        assert!(straight > pair);
        assert!(pair > STRENGTH_ONE_PAIR);
    }

    #[test]
    fn always_picks_a_legal_action() {
        for seed in 0..200 {
            let settings = GameSettings::new(10, 20).with_seed(seed);
            let seats = vec![
                Seat::new("a", 1000),
                Seat::new("b", 40),
                Seat::new("c", 500),
            ];
            let mut game = GameState::start_hand(settings, seats).unwrap();
            let makers = [
                bot(BotDifficulty::Easy, seed),
                bot(BotDifficulty::Standard, seed),
                bot(BotDifficulty::Tag, seed),
            ];
            while let Some(player) = game.next_player().cloned() {
                let obs = game.observation(&player).unwrap();
                let maker = &makers[obs.seat_idx];
                let decision = maker.decide_action(&obs);
                assert!(
                    obs.legal_actions.contains(&decision.action),
                    "{:?} not in {}",
                    decision.action,
                    obs.legal_actions
                );
                game.apply_action_with_commentary(&player, decision.action, decision.commentary)
                    .unwrap();
            }
            assert!(game.is_hand_complete());
            assert_eq!(game.chips_in_play(), 1540);
        }
    }

    #[test]
    fn odd_raise_variance_is_sanitized() {
        let settings = GameSettings::new(10, 20).with_seed(4);
        let seats = vec![Seat::new("a", 1000), Seat::new("b", 1000)];
        let game = GameState::start_hand(settings, seats).unwrap();
        let player = game.next_player().cloned().unwrap();
        let obs = game.observation(&player).unwrap();

        for variance in [-0.5, f32::NAN, 7.0] {
            let maker = BotDecisionMaker::with_config(
                BotConfig::new("bot", BotDifficulty::Tag).with_seed(1),
                BotDecisionConfig {
                    raise_variance: variance,
                    ..Default::default()
                },
            );
            assert!((0.0..=1.0).contains(&maker.thresholds.raise_variance));
            let mut rng = StdRng::seed_from_u64(0);
            let increment = maker.calculate_raise_increment(&mut rng, 100, 20);
            assert!(increment <= 360);
            let decision = maker.decide_action(&obs);
            assert!(obs.legal_actions.contains(&decision.action));
        }
    }

    #[test]
    fn seeded_bots_repeat_themselves() {
        let settings = GameSettings::new(10, 20).with_seed(11);
        let seats = vec![Seat::new("a", 1000), Seat::new("b", 1000)];
        let game = GameState::start_hand(settings, seats).unwrap();
        let player = game.next_player().cloned().unwrap();
        let obs = game.observation(&player).unwrap();
        let first: Vec<Decision> = (0..5)
            .map(|_| bot(BotDifficulty::Tag, 3).decide_action(&obs))
            .collect();
        let second: Vec<Decision> = (0..5)
            .map(|_| bot(BotDifficulty::Tag, 3).decide_action(&obs))
            .collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn acts_through_the_actor_trait() {
        let settings = GameSettings::new(10, 20).with_seed(5);
        let seats = vec![Seat::new("a", 1000), Seat::new("b", 1000)];
        let game = GameState::start_hand(settings, seats).unwrap();
        let player = game.next_player().cloned().unwrap();
        let obs = game.observation(&player).unwrap();
        let maker = bot(BotDifficulty::Easy, 9);
        assert_eq!(maker.name(), "bot");
        let decision = maker.act(&obs).await.unwrap();
        assert!(obs.legal_actions.contains(&decision.action));
        assert!(decision.commentary.is_some());
    }
}
