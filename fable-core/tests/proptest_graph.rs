//! Property-based tests for graph integrity, command parsing, and the
//! memory log format.

use proptest::prelude::*;

use fable_core::graph::{LocationGraph, Node};
use fable_core::memory::NarrativeMemory;
use fable_core::CommandInterpreter;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

const EXITS: [&str; 6] = ["north", "south", "east", "west", "up", "down"];

/// A consistent graph of `n0..nK` where every exit points at an existing node.
fn arb_graph() -> impl Strategy<Value = LocationGraph> {
    (2usize..8).prop_flat_map(|size| {
        prop::collection::vec(prop::collection::vec((0usize..6, 0..size), 0..4), size).prop_map(
            move |exits_per_node| {
                let nodes = exits_per_node.into_iter().enumerate().map(|(i, exits)| {
                    exits.into_iter().fold(
                        Node::new(format!("n{i}"), format!("Room {i}")),
                        |node, (exit, to)| node.with_exit(EXITS[exit], format!("n{to}")),
                    )
                });
                LocationGraph::from_nodes(nodes).expect("generated graph is consistent")
            },
        )
    })
}

fn dangling_exits(graph: &LocationGraph) -> usize {
    graph
        .nodes()
        .flat_map(|node| node.exits.values())
        .filter(|dest| !graph.contains(dest))
        .count()
}

// ---------------------------------------------------------------------------
// Property: removing a node never leaves a dangling exit
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn remove_node_prunes_every_incoming_exit(graph in arb_graph(), pick in 0usize..8) {
        let mut graph = graph;
        let id = format!("n{}", pick % graph.len());
        let before = graph.len();

        graph.remove_node(&id).expect("node exists");

        prop_assert_eq!(graph.len(), before - 1);
        prop_assert!(!graph.contains(&id));
        prop_assert_eq!(dangling_exits(&graph), 0);
        prop_assert!(graph.validate().is_ok());
    }

    #[test]
    fn failed_transition_leaves_graph_unchanged(
        graph in arb_graph(),
        pick in 0usize..8,
        exit in "[a-z]{1,8}",
    ) {
        let mut graph = graph;
        let from = format!("n{}", pick % graph.len());
        let snapshot = graph.clone();

        prop_assert!(graph.add_transition(&from, &exit, "nowhere").is_err());
        prop_assert_eq!(&graph, &snapshot);

        prop_assert!(graph.add_transition("nowhere", &exit, &from).is_err());
        prop_assert_eq!(&graph, &snapshot);
    }

    #[test]
    fn json_round_trip_preserves_graph(graph in arb_graph()) {
        let json = graph.to_json().expect("serialise");
        let back = LocationGraph::from_json(&json).expect("parse");
        prop_assert_eq!(back, graph);
    }
}

// ---------------------------------------------------------------------------
// Property: parsing ignores surrounding whitespace and case
// ---------------------------------------------------------------------------

const WORDS: [&str; 11] = [
    "north", "south", "east", "west", "n", "s", "e", "w", "look", "inventory", "inv",
];

proptest! {
    #[test]
    fn parse_normalises_whitespace_and_case(
        word in prop::sample::select(WORDS.to_vec()),
        upper in prop::collection::vec(any::<bool>(), 9),
        left in "[ \t]{0,3}",
        right in "[ \t\n]{0,3}",
    ) {
        let interpreter = CommandInterpreter::default();
        let cased: String = word
            .chars()
            .zip(upper.iter().cycle())
            .map(|(c, &up)| if up { c.to_ascii_uppercase() } else { c })
            .collect();
        let raw = format!("{left}{cased}{right}");

        prop_assert_eq!(interpreter.parse(&raw), interpreter.parse(word));
        prop_assert!(interpreter.parse(word).is_some());
    }
}

// ---------------------------------------------------------------------------
// Property: memory log format
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn log_is_header_then_one_line_per_event(
        events in prop::collection::vec("[A-Za-z ,.!]{1,40}", 1..12),
    ) {
        let mut memory = NarrativeMemory::new();
        for event in &events {
            memory.add_event(event.clone());
        }
        let log = memory.log();

        let mut expected = String::from("Previous events:\n");
        for event in &events {
            expected.push_str(event);
            expected.push('\n');
        }
        prop_assert_eq!(log, expected);
    }
}

#[test]
fn empty_memory_renders_empty_log() {
    assert_eq!(NarrativeMemory::new().log(), "");
}
