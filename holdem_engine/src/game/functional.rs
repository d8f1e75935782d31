//! Hand evaluation.
//!
//! Cards are folded into a value histogram plus per-suit bitmasks, which is
//! enough to classify any 5 to 7 card hand without enumerating the 21
//! five-card subsets.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    constants::{ACE, MIN_CARD_VALUE},
    entities::{Card, Value},
    errors::EvalError,
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "high card",
            Self::OnePair => "one pair",
            Self::TwoPair => "two pair",
            Self::ThreeOfAKind => "three of a kind",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::FullHouse => "full house",
            Self::FourOfAKind => "four of a kind",
            Self::StraightFlush => "straight flush",
            Self::RoyalFlush => "royal flush",
        };
        write!(f, "{repr}")
    }
}

/// A hand's category plus the tiebreak values that matter for it, most
/// significant first. The derived ordering compares rank, then values
/// lexicographically, which is exactly poker ordering.
///
/// | Rank            | Values                         |
/// |-----------------|--------------------------------|
/// | RoyalFlush      | `[14]`                         |
/// | StraightFlush   | `[high]` (`5` for the wheel)   |
/// | FourOfAKind     | `[quad, kicker]`               |
/// | FullHouse       | `[trips, pair]`                |
/// | Flush           | top five, descending           |
/// | Straight        | `[high]` (`5` for the wheel)   |
/// | ThreeOfAKind    | `[trips, k1, k2]`              |
/// | TwoPair         | `[high pair, low pair, kicker]`|
/// | OnePair         | `[pair, k1, k2, k3]`           |
/// | HighCard        | top five, descending           |
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HandValue {
    pub rank: Rank,
    pub values: Vec<Value>,
}

fn value_name(value: Value, plural: bool) -> String {
    let name = match value {
        2 => "two",
        3 => "three",
        4 => "four",
        5 => "five",
        6 => "six",
        7 => "seven",
        8 => "eight",
        9 => "nine",
        10 => "ten",
        11 => "jack",
        12 => "queen",
        13 => "king",
        _ => "ace",
    };
    match (plural, value) {
        (false, _) => name.to_string(),
        (true, 6) => "sixes".to_string(),
        (true, _) => format!("{name}s"),
    }
}

impl fmt::Display for HandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = |i: usize| self.values.get(i).copied().unwrap_or(MIN_CARD_VALUE);
        match self.rank {
            Rank::HighCard => write!(f, "high card, {}", value_name(v(0), false)),
            Rank::OnePair => write!(f, "pair of {}", value_name(v(0), true)),
            Rank::TwoPair => write!(
                f,
                "two pair, {} and {}",
                value_name(v(0), true),
                value_name(v(1), true)
            ),
            Rank::ThreeOfAKind => write!(f, "three {}", value_name(v(0), true)),
            Rank::Straight => write!(f, "straight, {} high", value_name(v(0), false)),
            Rank::Flush => write!(f, "flush, {} high", value_name(v(0), false)),
            Rank::FullHouse => write!(
                f,
                "full house, {} full of {}",
                value_name(v(0), true),
                value_name(v(1), true)
            ),
            Rank::FourOfAKind => write!(f, "four {}", value_name(v(0), true)),
            Rank::StraightFlush => {
                write!(f, "straight flush, {} high", value_name(v(0), false))
            }
            Rank::RoyalFlush => write!(f, "royal flush"),
        }
    }
}

/// Highest card of the best straight in a value bitmask (bit `v` set for
/// value `v`). The ace doubles as a one for the wheel.
fn straight_high(mask: u16) -> Option<Value> {
    let mask = if mask & (1 << ACE) != 0 {
        mask | (1 << 1)
    } else {
        mask
    };
    (5..=ACE).rev().find(|&high| {
        let window = 0b1_1111u16 << (high - 4);
        mask & window == window
    })
}

/// Values set in a bitmask, highest first.
fn values_desc(mask: u16) -> impl Iterator<Item = Value> {
    (MIN_CARD_VALUE..=ACE).rev().filter(move |&v| mask & (1 << v) != 0)
}

/// Scores the best five-card poker hand among 5 to 7 cards.
pub fn eval(cards: &[Card]) -> Result<HandValue, EvalError> {
    if !(5..=7).contains(&cards.len()) {
        return Err(EvalError::WrongCardCount(cards.len()));
    }

    let mut seen: u64 = 0;
    let mut counts = [0u8; ACE as usize + 1];
    let mut value_mask: u16 = 0;
    let mut suit_masks = [0u16; 4];
    for &card in cards {
        let Card(value, suit) = card;
        if !(MIN_CARD_VALUE..=ACE).contains(&value) {
            return Err(EvalError::InvalidCard(card));
        }
        let bit = 1u64 << ((u64::from(value - MIN_CARD_VALUE) * 4) + suit.index() as u64);
        if seen & bit != 0 {
            return Err(EvalError::DuplicateCard(card));
        }
        seen |= bit;
        counts[value as usize] += 1;
        value_mask |= 1 << value;
        suit_masks[suit.index()] |= 1 << value;
    }

    let flush_mask = suit_masks.into_iter().find(|mask| mask.count_ones() >= 5);
    if let Some(high) = flush_mask.and_then(straight_high) {
        let rank = if high == ACE {
            Rank::RoyalFlush
        } else {
            Rank::StraightFlush
        };
        return Ok(HandValue {
            rank,
            values: vec![high],
        });
    }

    // (count, value), biggest groups first and higher values breaking ties.
    let mut groups: Vec<(u8, Value)> = (MIN_CARD_VALUE..=ACE)
        .filter(|&v| counts[v as usize] > 0)
        .map(|v| (counts[v as usize], v))
        .collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let (top_count, top_value) = groups[0];
    let kickers = |skip: &[Value], n: usize| -> Vec<Value> {
        values_desc(value_mask)
            .filter(|v| !skip.contains(v))
            .take(n)
            .collect()
    };

    if top_count == 4 {
        let mut values = vec![top_value];
        values.extend(kickers(&[top_value], 1));
        return Ok(HandValue {
            rank: Rank::FourOfAKind,
            values,
        });
    }

    if top_count == 3 {
        let pair = groups[1..]
            .iter()
            .filter(|(count, _)| *count >= 2)
            .map(|(_, value)| *value)
            .max();
        if let Some(pair) = pair {
            return Ok(HandValue {
                rank: Rank::FullHouse,
                values: vec![top_value, pair],
            });
        }
    }

    if let Some(mask) = flush_mask {
        return Ok(HandValue {
            rank: Rank::Flush,
            values: values_desc(mask).take(5).collect(),
        });
    }

    if let Some(high) = straight_high(value_mask) {
        return Ok(HandValue {
            rank: Rank::Straight,
            values: vec![high],
        });
    }

    let hand = match (top_count, groups.get(1).map(|(count, _)| *count)) {
        (3, _) => {
            let mut values = vec![top_value];
            values.extend(kickers(&[top_value], 2));
            HandValue {
                rank: Rank::ThreeOfAKind,
                values,
            }
        }
        (2, Some(2)) => {
            let low_pair = groups[1].1;
            let mut values = vec![top_value, low_pair];
            values.extend(kickers(&[top_value, low_pair], 1));
            HandValue {
                rank: Rank::TwoPair,
                values,
            }
        }
        (2, _) => {
            let mut values = vec![top_value];
            values.extend(kickers(&[top_value], 3));
            HandValue {
                rank: Rank::OnePair,
                values,
            }
        }
        _ => HandValue {
            rank: Rank::HighCard,
            values: kickers(&[], 5),
        },
    };
    Ok(hand)
}

/// Scores hole cards together with the board.
pub fn eval_with_board(hole: &[Card], board: &[Card]) -> Result<HandValue, EvalError> {
    let cards: Vec<Card> = hole.iter().chain(board).copied().collect();
    eval(&cards)
}

/// Indices of every hand tied for best. Empty input gives an empty result.
pub fn argmax(hands: &[HandValue]) -> Vec<usize> {
    let Some(best) = hands.iter().max() else {
        return Vec::new();
    };
    hands
        .iter()
        .enumerate()
        .filter(|(_, hand)| *hand == best)
        .map(|(idx, _)| idx)
        .collect()
}
