use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{
    entities::{SeatIndex, Usd},
    errors::GameError,
    functional::HandValue,
};

/// One slice of the pot: every chip in it may only be won by a player in
/// `eligible`. The first layer is the main pot; the rest are side pots.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PotLayer {
    pub amount: Usd,
    pub eligible: BTreeSet<SeatIndex>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Payout {
    pub layer: usize,
    pub seat: SeatIndex,
    pub amount: Usd,
}

/// Chips committed during a hand, tracked per seat for the whole hand.
#[derive(Clone, Debug, Default)]
pub struct Pot {
    // Map seat indices (players) to their investment in the pot.
    investments: BTreeMap<SeatIndex, Usd>,
}

impl Pot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bet(&mut self, seat: SeatIndex, amount: Usd) {
        if amount > 0 {
            *self.investments.entry(seat).or_default() += amount;
        }
    }

    pub fn clear(&mut self) {
        self.investments.clear();
    }

    pub fn get_size(&self) -> Usd {
        self.investments.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.get_size() == 0
    }

    pub fn get_investment(&self, seat: SeatIndex) -> Usd {
        self.investments.get(&seat).copied().unwrap_or_default()
    }

    /// Hands back the part of the largest contribution nobody matched.
    /// Returns who gets it and how much. Folded players never get chips
    /// back.
    pub fn return_uncalled(&mut self, folded: &BTreeSet<SeatIndex>) -> Option<(SeatIndex, Usd)> {
        let mut ranked: Vec<(SeatIndex, Usd)> = self
            .investments
            .iter()
            .map(|(&seat, &amount)| (seat, amount))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        let (top_seat, top) = *ranked.first()?;
        let second = ranked.get(1).map_or(0, |(_, amount)| *amount);
        if top <= second || folded.contains(&top_seat) {
            return None;
        }
        let refund = top - second;
        self.investments.insert(top_seat, second);
        Some((top_seat, refund))
    }

    /// Splits the pot into layers at each distinct contribution level.
    ///
    /// Eligibility for a layer is every non-folded player who contributed
    /// at least that layer's level. Adjacent layers with the same eligible
    /// set are merged, and a layer only folded players reached is added to
    /// the one below it.
    pub fn layers(&self, folded: &BTreeSet<SeatIndex>) -> Vec<PotLayer> {
        let mut levels: Vec<Usd> = self
            .investments
            .values()
            .copied()
            .filter(|&amount| amount > 0)
            .collect();
        levels.sort_unstable();
        levels.dedup();

        let mut layers: Vec<PotLayer> = Vec::new();
        let mut prev_level = 0;
        for level in levels {
            let contributors: Vec<SeatIndex> = self
                .investments
                .iter()
                .filter(|(_, amount)| **amount >= level)
                .map(|(seat, _)| *seat)
                .collect();
            let amount = (level - prev_level) * contributors.len() as Usd;
            prev_level = level;
            let eligible: BTreeSet<SeatIndex> = contributors
                .into_iter()
                .filter(|seat| !folded.contains(seat))
                .collect();
            match layers.last_mut() {
                Some(last) if eligible.is_empty() || last.eligible == eligible => {
                    last.amount += amount;
                }
                _ => layers.push(PotLayer { amount, eligible }),
            }
        }
        layers
    }

    /// Awards each layer to the best hand among its eligible players.
    ///
    /// Ties split evenly; odd chips go one at a time to the tied winners in
    /// `order`, which should start with the first seat left of the button.
    /// Fails if a layer has no eligible hand to award it to.
    pub fn distribute(
        layers: &[PotLayer],
        hands: &BTreeMap<SeatIndex, HandValue>,
        order: &[SeatIndex],
    ) -> Result<Vec<Payout>, GameError> {
        let mut payouts = Vec::new();
        for (layer_idx, layer) in layers.iter().enumerate() {
            let best = layer
                .eligible
                .iter()
                .filter_map(|seat| hands.get(seat))
                .max()
                .ok_or_else(|| {
                    GameError::HandAborted(format!("pot {layer_idx} has no eligible winner"))
                })?;
            let winners: Vec<SeatIndex> = order
                .iter()
                .copied()
                .filter(|seat| layer.eligible.contains(seat) && hands.get(seat) == Some(best))
                .collect();
            if winners.is_empty() {
                return Err(GameError::HandAborted(format!(
                    "pot {layer_idx} winners are missing from the seating order"
                )));
            }
            let num_winners = winners.len() as Usd;
            let share = layer.amount / num_winners;
            let odd_chips = layer.amount % num_winners;
            for (i, seat) in winners.into_iter().enumerate() {
                let amount = share + Usd::from((i as Usd) < odd_chips);
                if amount > 0 {
                    payouts.push(Payout {
                        layer: layer_idx,
                        seat,
                        amount,
                    });
                }
            }
        }
        Ok(payouts)
    }
}
