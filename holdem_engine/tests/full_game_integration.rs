//! Full end-to-end game flow integration tests.
//!
//! Tests complete hands from the deal to showdown through the public
//! `GameState` API, using stacked decks where the outcome matters.

use holdem_engine::{
    GameError, GameSettings, GameState, Phase,
    entities::{Action, Deck, PlayerId, PlayerStatus, Seat, Usd, parse_cards},
    functional::Rank,
};

fn id(name: &str) -> PlayerId {
    PlayerId::new(name)
}

fn stacked(cards: &str) -> Deck {
    Deck::stacked(&parse_cards(cards).unwrap(), 42).unwrap()
}

// ============================================================================
// Heads-up all-in, dealt out to the river
// ============================================================================

#[test]
fn test_heads_up_all_in_preflop() {
    // alice has the button: bob gets the first and third card.
    let deck = stacked("7c Kd 2h Ks 9d Qc Jh 3s 4c 5d 8h 6s");
    let seats = vec![Seat::new("alice", 1000), Seat::new("bob", 1000)];
    let mut game = GameState::start_hand_with_deck(GameSettings::new(10, 20), seats, deck).unwrap();

    assert_eq!(game.phase(), Phase::PreFlop);
    assert_eq!(game.next_player(), Some(&id("alice")));

    game.apply_action(&id("alice"), Action::AllIn).unwrap();
    assert_eq!(game.next_player(), Some(&id("bob")));
    game.apply_action(&id("bob"), Action::Call).unwrap();

    assert_eq!(game.phase(), Phase::Finished);
    assert_eq!(game.board(), parse_cards("Qc Jh 3s 5d 6s").unwrap());
    assert_eq!(game.player(&id("alice")).unwrap().stack, 2000);
    assert_eq!(game.player(&id("bob")).unwrap().stack, 0);
    assert_eq!(game.player(&id("bob")).unwrap().status, PlayerStatus::Eliminated);
    assert_eq!(game.pot().get_size(), 0);

    let summary = game.summary().unwrap();
    assert_eq!(summary.winners(), vec![&id("alice")]);
    assert_eq!(summary.total_awarded(), 2000);
    assert_eq!(summary.shown.len(), 2);
    let alice_hand = summary
        .shown
        .iter()
        .find(|hand| hand.player == id("alice"))
        .unwrap();
    assert_eq!(alice_hand.value.rank, Rank::OnePair);
    assert!(game.is_game_over());
}

#[test]
fn test_board_split_returns_stacks() {
    // Both play the board's broadway straight.
    let deck = stacked("2c 3d 4h 5s 9c Ac Kd Qs 7h Jh 8d Tc");
    let seats = vec![Seat::new("alice", 500), Seat::new("bob", 500)];
    let mut game = GameState::start_hand_with_deck(GameSettings::new(10, 20), seats, deck).unwrap();

    game.apply_action(&id("alice"), Action::AllIn).unwrap();
    game.apply_action(&id("bob"), Action::Call).unwrap();

    assert_eq!(game.board(), parse_cards("Ac Kd Qs Jh Tc").unwrap());
    assert_eq!(game.player(&id("alice")).unwrap().stack, 500);
    assert_eq!(game.player(&id("bob")).unwrap().stack, 500);
    assert_eq!(game.summary().unwrap().winners().len(), 2);
}

// ============================================================================
// Betting rules
// ============================================================================

#[test]
fn test_minimum_raise_enforced() {
    let seats = vec![
        Seat::new("a", 1000),
        Seat::new("b", 1000),
        Seat::new("c", 1000),
    ];
    let mut game =
        GameState::start_hand(GameSettings::new(10, 20).with_seed(11), seats).unwrap();

    // Raise to 30 is only 10 over the big blind.
    assert_eq!(
        game.apply_action(&id("a"), Action::Raise(30)).unwrap_err(),
        GameError::RaiseTooSmall {
            amount: 30,
            minimum: 40
        }
    );
    game.apply_action(&id("a"), Action::Raise(60)).unwrap();
    // Last raise was 40, so the next must reach 100.
    assert!(matches!(
        game.apply_action(&id("b"), Action::Raise(90)),
        Err(GameError::RaiseTooSmall { minimum: 100, .. })
    ));
    assert!(matches!(
        game.apply_action(&id("b"), Action::Raise(5000)),
        Err(GameError::InsufficientChips { .. })
    ));
    game.apply_action(&id("b"), Action::Raise(100)).unwrap();
    assert_eq!(game.pot().get_size(), 60 + 100 + 20);
}

#[test]
fn test_short_all_in_does_not_reopen_betting() {
    // a: button, b: small blind, c: big blind with a 50 chip stack.
    let seats = vec![Seat::new("a", 1000), Seat::new("b", 1000), Seat::new("c", 50)];
    let mut game =
        GameState::start_hand(GameSettings::new(10, 20).with_seed(12), seats).unwrap();

    game.apply_action(&id("a"), Action::Raise(40)).unwrap();
    game.apply_action(&id("b"), Action::Call).unwrap();
    // c goes all-in to 50: a raise of 10, short of the 20 minimum.
    game.apply_action(&id("c"), Action::AllIn).unwrap();

    // a and b may only call or fold.
    for name in ["a", "b"] {
        assert_eq!(game.next_player(), Some(&id(name)));
        let legal = game.legal_actions(&id(name)).unwrap();
        assert!(legal.contains(&Action::Call));
        assert!(!legal.contains(&Action::Raise(100)));
        assert!(matches!(
            game.apply_action(&id(name), Action::Raise(100)),
            Err(GameError::InvalidAction { .. })
        ));
        game.apply_action(&id(name), Action::Call).unwrap();
    }

    assert_eq!(game.phase(), Phase::Flop);
    assert_eq!(game.pot().get_size(), 150);
}

#[test]
fn test_street_not_complete_until_everyone_acted() {
    let seats = vec![Seat::new("a", 1000), Seat::new("b", 1000), Seat::new("c", 1000)];
    let mut game =
        GameState::start_hand(GameSettings::new(10, 20).with_seed(13), seats).unwrap();

    game.apply_action(&id("a"), Action::Call).unwrap();
    game.apply_action(&id("b"), Action::Call).unwrap();
    // Bets are level but the big blind still has the option.
    assert_eq!(game.phase(), Phase::PreFlop);
    assert_eq!(game.next_player(), Some(&id("c")));
    game.apply_action(&id("c"), Action::Raise(60)).unwrap();
    assert_eq!(game.phase(), Phase::PreFlop);
    game.apply_action(&id("a"), Action::Call).unwrap();
    assert_eq!(game.phase(), Phase::PreFlop);
    game.apply_action(&id("b"), Action::Fold).unwrap();
    assert_eq!(game.phase(), Phase::Flop);
    assert_eq!(game.next_player(), Some(&id("c")));
}

// ============================================================================
// Several hands in a row
// ============================================================================

#[test]
fn test_hands_rotate_until_one_player_remains() {
    let stacks: [Usd; 3] = [300, 300, 300];
    let seats = stacks
        .iter()
        .enumerate()
        .map(|(idx, &stack)| Seat::new(format!("p{idx}"), stack))
        .collect();
    let mut game =
        GameState::start_hand(GameSettings::new(10, 20).with_seed(99), seats).unwrap();

    for _ in 0..500 {
        if game.is_hand_complete() {
            match game.start_next_hand() {
                Ok(_) => {}
                Err(GameError::GameOver) => break,
                Err(err) => panic!("unexpected error: {err}"),
            }
            continue;
        }
        // Everyone shoves whenever they can.
        let (player, _) = game.default_action().unwrap();
        game.apply_action(&player, Action::AllIn).unwrap();
        assert_eq!(game.chips_in_play(), 900);
    }

    assert!(game.is_game_over());
    let funded: Vec<_> = game.players().iter().filter(|p| p.stack > 0).collect();
    assert_eq!(funded.len(), 1);
    assert_eq!(funded[0].stack, 900);
    assert_eq!(
        game.players()
            .iter()
            .filter(|p| p.status == PlayerStatus::Eliminated)
            .count(),
        2
    );
}
