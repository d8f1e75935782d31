//! Table actor and registry tests.
//!
//! These run real table actors on the Tokio runtime with short action
//! timeouts, driving them through handles the way a server would.

use async_trait::async_trait;
use holdem_engine::{
    bot::{Actor, ActorError, BotConfig, BotDecisionMaker, Decision},
    game::{
        GameError, Phase,
        entities::{Action, Observation, PlayerId, Usd},
    },
    table::{
        BotDifficulty, SeatAssignment, TableActor, TableConfig, TableError, TableEvent,
        TableHandle, TableManager, TableMessage, TableResponse,
    },
};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

/// Always answers with the same action, after an optional delay.
struct Scripted {
    action: Action,
    delay: Duration,
}

#[async_trait]
impl Actor for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn act(&self, _observation: &Observation) -> Result<Decision, ActorError> {
        tokio::time::sleep(self.delay).await;
        Ok(Decision::new(self.action).with_commentary("scripted"))
    }
}

struct Broken;

#[async_trait]
impl Actor for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    async fn act(&self, _observation: &Observation) -> Result<Decision, ActorError> {
        Err(ActorError::Failed("connection reset".to_string()))
    }
}

fn scripted(action: Action) -> Arc<dyn Actor> {
    Arc::new(Scripted {
        action,
        delay: Duration::ZERO,
    })
}

fn config(timeout_ms: u64, max_hands: Option<u64>) -> TableConfig {
    TableConfig {
        name: "test".to_string(),
        action_timeout_ms: Some(timeout_ms),
        max_hands,
        seed: Some(7),
        ..Default::default()
    }
}

fn spawn_table(config: TableConfig, seats: Vec<SeatAssignment>) -> TableHandle {
    let (actor, handle) = TableActor::new(1, config, seats).unwrap();
    tokio::spawn(actor.run());
    handle
}

/// Waits for the first event matching `pred`, failing after two seconds.
async fn wait_for(
    events: &mut mpsc::Receiver<TableEvent>,
    pred: impl Fn(&TableEvent) -> bool,
) -> TableEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = events.recv().await.expect("table stopped");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for table event")
}

fn standings_total(event: &TableEvent) -> Usd {
    match event {
        TableEvent::GameOver { standings, .. } => standings.iter().map(|(_, s)| s).sum(),
        _ => 0,
    }
}

#[tokio::test]
async fn test_human_actions_are_validated() {
    let handle = spawn_table(
        config(60_000, None),
        vec![SeatAssignment::human("alice"), SeatAssignment::human("bob")],
    );

    // Heads-up the button (alice) acts first.
    assert_eq!(
        handle.take_action("bob", Action::Call).await.unwrap(),
        TableResponse::NotYourTurn
    );
    assert_eq!(
        handle.take_action("carol", Action::Call).await.unwrap(),
        TableResponse::NotAtTable
    );
    assert!(matches!(
        handle.take_action("alice", Action::Check).await.unwrap(),
        TableResponse::InvalidAction(_)
    ));
    assert!(handle.take_action("alice", Action::Call).await.unwrap().is_success());
    assert!(handle.take_action("bob", Action::Check).await.unwrap().is_success());

    let state = handle.state().await.unwrap();
    assert_eq!(state.phase, Phase::Flop);
    assert_eq!(state.board.len(), 3);
    assert_eq!(state.pot_size, 40);
    assert_eq!(state.next_to_act, Some(PlayerId::new("bob")));
    assert!(state.players.iter().all(|p| p.cards.is_empty()));

    let observation = handle.observation("bob").await.unwrap();
    assert!(observation.is_turn);
    assert_eq!(observation.hole_cards.len(), 2);
    assert!(matches!(
        handle.observation("carol").await,
        Err(TableError::Game(_))
    ));
}

#[tokio::test]
async fn test_human_timeout_applies_default_action() {
    let handle = spawn_table(
        config(100, Some(1)),
        vec![
            SeatAssignment::human("alice"),
            SeatAssignment::automated("bob", scripted(Action::Check)),
        ],
    );
    let mut events = handle.subscribe("test", 64).await.unwrap();

    let event = wait_for(&mut events, |e| matches!(e, TableEvent::ActionTaken { .. })).await;
    let TableEvent::ActionTaken {
        record, defaulted, ..
    } = event
    else {
        unreachable!()
    };
    assert!(defaulted);
    assert_eq!(record.player, PlayerId::new("alice"));
    // Facing the big blind, so the default is a fold.
    assert_eq!(record.action, Action::Fold);

    let over = wait_for(&mut events, |e| matches!(e, TableEvent::GameOver { .. })).await;
    assert_eq!(standings_total(&over), 2000);
    let state = handle.state().await.unwrap();
    assert!(!state.is_active);
    assert_eq!(state.hands_played, 1);
    assert_eq!(
        handle.take_action("alice", Action::Call).await.unwrap(),
        TableResponse::GameOver
    );
}

#[tokio::test]
async fn test_slow_and_broken_actors_cost_only_their_own_seat() {
    let slow = Arc::new(Scripted {
        action: Action::AllIn,
        delay: Duration::from_secs(30),
    });
    let handle = spawn_table(
        config(100, Some(1)),
        vec![
            SeatAssignment::automated("slow", slow),
            SeatAssignment::automated("broken", Arc::new(Broken)),
            SeatAssignment::automated("caller", scripted(Action::Call)),
        ],
    );
    let mut events = handle.subscribe("test", 64).await.unwrap();

    // Three-handed: slow has the button and acts first, then broken (small
    // blind), then the big blind.
    let mut defaulted_players = Vec::new();
    let over = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            match events.recv().await.expect("table stopped") {
                TableEvent::ActionTaken {
                    record,
                    defaulted: true,
                    ..
                } => defaulted_players.push(record.player),
                event @ TableEvent::GameOver { .. } => return event,
                _ => {}
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(
        defaulted_players,
        vec![PlayerId::new("slow"), PlayerId::new("broken")]
    );
    assert_eq!(standings_total(&over), 3000);
}

#[tokio::test]
async fn test_stale_decisions_are_ignored() {
    let handle = spawn_table(
        config(60_000, None),
        vec![SeatAssignment::human("alice"), SeatAssignment::human("bob")],
    );
    let state = handle.state().await.unwrap();

    // Wrong turn for the current hand.
    handle
        .send(TableMessage::ActorDecision {
            hand_number: state.hand_number,
            turn: 5,
            player_id: PlayerId::new("alice"),
            result: Ok(Decision::new(Action::AllIn)),
        })
        .await
        .unwrap();
    // Right turn, earlier hand.
    handle
        .send(TableMessage::ActorDecision {
            hand_number: state.hand_number.wrapping_sub(1),
            turn: 0,
            player_id: PlayerId::new("alice"),
            result: Ok(Decision::new(Action::AllIn)),
        })
        .await
        .unwrap();

    let after = handle.state().await.unwrap();
    assert_eq!(after.pot_size, 30);
    assert_eq!(after.next_to_act, Some(PlayerId::new("alice")));
    assert_eq!(after.phase, Phase::PreFlop);
}

#[tokio::test]
async fn test_bot_table_plays_out_and_conserves_chips() {
    let seats = ["ann", "ben", "cat"]
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let bot = BotDecisionMaker::new(
                BotConfig::new(name, BotDifficulty::Standard).with_seed(idx as u64),
            );
            SeatAssignment::automated(name, Arc::new(bot))
        })
        .collect();
    let handle = spawn_table(config(1_000, Some(25)), seats);
    let mut events = handle.subscribe("test", 4096).await.unwrap();

    let mut hands = 0;
    let over = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await.expect("table stopped") {
                TableEvent::HandFinished(summary) => {
                    hands += 1;
                    assert_eq!(summary.net.iter().map(|(_, n)| n).sum::<i64>(), 0);
                }
                TableEvent::Aborted { reason, .. } => panic!("hand aborted: {reason}"),
                event @ TableEvent::GameOver { .. } => return event,
                _ => {}
            }
        }
    })
    .await
    .unwrap();

    assert!((1..=25).contains(&hands));
    assert_eq!(standings_total(&over), 3000);
}

#[tokio::test]
async fn test_automated_seats_reject_manual_actions() {
    let handle = spawn_table(
        config(60_000, None),
        vec![
            SeatAssignment::human("alice"),
            SeatAssignment::automated("bot", scripted(Action::Call)).with_stack(500),
        ],
    );
    assert!(matches!(
        handle.take_action("bot", Action::Fold).await.unwrap(),
        TableResponse::InvalidAction(_)
    ));
    let state = handle.state().await.unwrap();
    let bot = state
        .players
        .iter()
        .find(|p| p.id == PlayerId::new("bot"))
        .unwrap();
    assert_eq!(bot.stack + bot.bet, 500);
}

#[tokio::test]
async fn test_manager_runs_tables_independently() {
    let manager = TableManager::new();
    let humans = || vec![SeatAssignment::human("alice"), SeatAssignment::human("bob")];

    let first = manager.create_table(config(60_000, None), humans()).await.unwrap();
    let second = manager.create_table(config(60_000, None), humans()).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(manager.active_table_count().await, 2);

    let table = manager.get_table(first).await.unwrap();
    assert!(table.take_action("alice", Action::Call).await.unwrap().is_success());

    let other = manager.get_table(second).await.unwrap();
    let state = other.state().await.unwrap();
    assert_eq!(state.pot_size, 30);
    assert_eq!(state.next_to_act, Some(PlayerId::new("alice")));

    let listed = manager.list_tables().await;
    assert_eq!(
        listed.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![first, second]
    );
    assert!(listed.iter().all(|t| t.player_count == 2 && t.is_active));

    manager.close_table(first).await.unwrap();
    assert!(manager.get_table(first).await.is_none());
    assert!(matches!(
        manager.close_table(first).await,
        Err(TableError::NotFound(id)) if id == first
    ));
    assert!(matches!(table.state().await, Err(TableError::Closed)));
    assert_eq!(manager.active_table_count().await, 1);

    manager.close_all().await;
    assert_eq!(manager.active_table_count().await, 0);
}

#[tokio::test]
async fn test_registry_subscriber_sees_the_first_hand() {
    let manager = TableManager::new();
    let (_, mut events) = manager
        .create_table_with_events(
            config(60_000, None),
            vec![SeatAssignment::human("alice"), SeatAssignment::human("bob")],
            "watcher",
            64,
        )
        .await
        .unwrap();

    let first = tokio::time::timeout(Duration::from_millis(500), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(first, TableEvent::HandStarted { hand_number: 1, .. }));
    let second = tokio::time::timeout(Duration::from_millis(500), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        second,
        TableEvent::TurnStarted { hand_number: 1, ref player } if *player == PlayerId::new("alice")
    ));

    manager.close_all().await;
}

#[tokio::test]
async fn test_finished_tables_stop_counting_as_active() {
    let manager = TableManager::new();
    let (table_id, mut events) = manager
        .create_table_with_events(
            config(100, Some(1)),
            vec![SeatAssignment::human("alice"), SeatAssignment::human("bob")],
            "watcher",
            64,
        )
        .await
        .unwrap();
    wait_for(&mut events, |e| matches!(e, TableEvent::GameOver { .. })).await;

    assert_eq!(manager.active_table_count().await, 0);
    let listed = manager.list_tables().await;
    assert_eq!(listed.len(), 1);
    assert!(!listed[0].is_active);
    assert_eq!(listed[0].hands_played, 1);

    assert_eq!(manager.close_finished().await, 1);
    assert!(manager.get_table(table_id).await.is_none());
    assert!(manager.list_tables().await.is_empty());
}

#[tokio::test]
async fn test_oversized_stacks_rejected() {
    let manager = TableManager::new();
    let seats = vec![
        SeatAssignment::human("a").with_stack(3_000_000_000),
        SeatAssignment::human("b").with_stack(3_000_000_000),
    ];
    let result = manager.create_table(TableConfig::default(), seats).await;
    assert!(matches!(
        result,
        Err(TableError::Game(GameError::TooManyChips(6_000_000_000)))
    ));
}

#[tokio::test]
async fn test_invalid_table_config_rejected() {
    let manager = TableManager::new();
    let bad = TableConfig {
        big_blind: 5,
        ..Default::default()
    };
    let result = manager
        .create_table(bad, vec![SeatAssignment::human("a"), SeatAssignment::human("b")])
        .await;
    assert!(matches!(result, Err(TableError::InvalidConfig(_))));

    let lonely = manager
        .create_table(TableConfig::default(), vec![SeatAssignment::human("a")])
        .await;
    assert!(matches!(lonely, Err(TableError::Game(_))));
    assert_eq!(manager.active_table_count().await, 0);
}
