//! Hand Evaluation Example
//!
//! Demonstrates how to score poker hands and settle a showdown.

use holdem_engine::entities::parse_cards;
use holdem_engine::functional::{argmax, eval, eval_with_board};

fn main() {
    println!("=== Poker Hand Evaluation Example ===\n");

    // Example 1: Evaluate a single hand
    println!("Example 1: Evaluating a 7-card hand");
    let cards = parse_cards("Ah Kh Qh Jh Th 9s 2c").expect("valid cards");
    let value = eval(&cards).expect("5 to 7 cards");
    println!("Cards: {}", join(&cards));
    println!("Best hand: {value} ({})\n", value.rank);

    // Example 2: Showdown on a shared board
    println!("Example 2: Three players on the same board");
    let board = parse_cards("Tc 9d 5h 5c 2s").expect("valid cards");
    let holdings = [("alice", "Ac Td"), ("bob", "Ah Ts"), ("carol", "9c 9s")];
    let values: Vec<_> = holdings
        .iter()
        .map(|(_, hole)| {
            let hole = parse_cards(hole).expect("valid cards");
            eval_with_board(&hole, &board).expect("7 cards")
        })
        .collect();
    println!("Board: {}", join(&board));
    for ((name, hole), value) in holdings.iter().zip(&values) {
        println!("  {name:<6} {hole}  -> {value}");
    }
    let winners: Vec<&str> = argmax(&values).into_iter().map(|i| holdings[i].0).collect();
    println!("Winner(s): {}\n", winners.join(", "));

    // Example 3: One hand of every rank
    println!("Example 3: Examples of each hand rank");
    for hand in [
        "As Ks Qs Js Ts",
        "9h 8h 7h 6h 5h",
        "8s 8h 8d 8c 2s",
        "Ts Th Td 6c 6s",
        "Kc Jc 8c 5c 3c",
        "5d 4c 3h 2s Ad",
        "7s 7h 7d Qc 3s",
        "Qs Qh 5d 5c 2s",
        "9s 9h Kd 7c 4s",
        "As Qh Td 7c 3s",
    ] {
        let cards = parse_cards(hand).expect("valid cards");
        let value = eval(&cards).expect("5 cards");
        println!("{hand}: {} ({value})", value.rank);
    }

    println!("\n=== End of Hand Evaluation Example ===");
}

fn join(cards: &[holdem_engine::entities::Card]) -> String {
    cards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
