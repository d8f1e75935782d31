//! Plays many hands of random legal actions and checks that chips are
//! never created or destroyed.

use holdem_engine::game::{
    GameError, GameSettings, GameState, Phase,
    entities::{Action, ActionChoice, PlayerStatus, Seat, Usd},
};
use proptest::prelude::*;

/// Turns a random pick into one of the player's legal actions.
fn pick_action(game: &GameState, pick: u16) -> Option<Action> {
    let player = game.next_player()?.clone();
    let observation = game.observation(&player).ok()?;
    let mut choices: Vec<ActionChoice> = observation.legal_actions.0.iter().copied().collect();
    // HashSet order varies between runs
    choices.sort_by_key(|choice| match choice {
        ActionChoice::Fold => 0,
        ActionChoice::Check => 1,
        ActionChoice::Call(_) => 2,
        ActionChoice::Raise(_) => 3,
        ActionChoice::AllIn => 4,
    });
    let choice = choices.get(usize::from(pick) % choices.len().max(1))?;
    Some(match *choice {
        ActionChoice::Fold => Action::Fold,
        ActionChoice::Check => Action::Check,
        ActionChoice::Call(_) => Action::Call,
        ActionChoice::Raise(min) => {
            let max = observation.max_raise_to.unwrap_or(min);
            Action::Raise(min + Usd::from(pick) % (max - min + 1))
        }
        ActionChoice::AllIn => Action::AllIn,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_chips_are_conserved_across_hands(
        stacks in prop::collection::vec(25 as Usd..=2000, 2..=9),
        seed in any::<u64>(),
        picks in prop::collection::vec(any::<u16>(), 50..400),
    ) {
        let seats: Vec<Seat> = stacks
            .iter()
            .enumerate()
            .map(|(idx, &stack)| Seat::new(format!("p{idx}"), stack))
            .collect();
        let total: u64 = stacks.iter().map(|&s| u64::from(s)).sum();
        let settings = GameSettings::new(5, 10).with_seed(seed);
        let mut game = GameState::start_hand(settings, seats).unwrap();

        for pick in picks {
            prop_assert!(!game.is_aborted(), "hand aborted: {:?}", game.fault());
            if game.is_hand_complete() {
                let summary = game.summary().unwrap();
                prop_assert_eq!(summary.net.iter().map(|(_, n)| n).sum::<i64>(), 0);
                match game.start_next_hand() {
                    Ok(_) => continue,
                    Err(GameError::GameOver) => break,
                    Err(err) => return Err(TestCaseError::fail(err.to_string())),
                }
            }

            let player = game.next_player().unwrap().clone();
            let action = pick_action(&game, pick).unwrap();
            let legal = game.legal_actions(&player).unwrap();
            prop_assert!(legal.contains(&action));
            game.apply_action(&player, action).unwrap();

            prop_assert_eq!(game.chips_in_play(), total);
            prop_assert!(game
                .players()
                .iter()
                .filter(|p| p.status == PlayerStatus::AllIn)
                .all(|p| p.stack == 0));
        }

        prop_assert_ne!(game.phase(), Phase::Aborted);
        prop_assert_eq!(game.chips_in_play(), total);
    }
}
