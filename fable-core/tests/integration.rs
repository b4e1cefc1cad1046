//! Integration tests: command → event → memory flows over a small manor.

use fable_core::config::PersistenceConfig;
use fable_core::event::{open_door_event, DOOR_OPEN_FLAG};
use fable_core::persistence::{SessionState, SessionStore, SqliteSessionStore};
use fable_core::{
    Command, CommandInterpreter, CommandOutcome, CoreError, Direction, EventEngine, EventRule,
    LocationGraph, SessionId, WorldState,
};

const MANOR: &str = r#"{
    "nodes": {
        "bedroom": {
            "description": "A quiet bedroom.",
            "exits": {"east": "hallway"},
            "items": ["key"]
        },
        "hallway": {
            "description": "A long hallway lined with portraits.",
            "exits": {"west": "bedroom", "north": "library"}
        },
        "library": {
            "description": "Shelves of crumbling books.",
            "exits": {"south": "hallway"},
            "actions": {"read": "The pages are blank."}
        },
        "secret_room": {
            "description": "A cramped room that smells of dust."
        }
    }
}"#;

fn manor() -> WorldState {
    let graph = LocationGraph::from_json(MANOR).expect("manor graph");
    WorldState::new(graph, "bedroom").expect("world")
}

fn play(
    interpreter: &CommandInterpreter,
    engine: &EventEngine,
    world: &mut WorldState,
    input: &str,
) -> (CommandOutcome, Vec<String>) {
    let command = interpreter.parse(input).expect("recognised command");
    let outcome = command.apply(world).expect("apply");
    let fired = engine.evaluate(world).expect("evaluate");
    (outcome, fired)
}

// ---------------------------------------------------------------------------
// Door scenario
// ---------------------------------------------------------------------------

#[test]
fn picking_up_key_and_walking_opens_the_door() {
    let interpreter = CommandInterpreter::default();
    let mut engine = EventEngine::new();
    engine.register(open_door_event());
    let mut world = manor();

    let (outcome, fired) = play(&interpreter, &engine, &mut world, "take key");
    assert_eq!(outcome, CommandOutcome::Taken(vec!["key".into()]));
    assert!(fired.is_empty());
    assert!(world.has_item("key"));

    let (outcome, fired) = play(&interpreter, &engine, &mut world, "  EAST ");
    assert_eq!(
        outcome,
        CommandOutcome::Moved {
            from: "bedroom".into(),
            to: "hallway".into()
        }
    );
    assert_eq!(fired, vec!["Open Door"]);
    assert!(world.flag(DOOR_OPEN_FLAG));
    assert_eq!(world.graph().destination("hallway", "door"), Some("secret_room"));
    assert_eq!(
        world.memory().log(),
        "Previous events:\nThe door creaks open, revealing a secret room.\n"
    );

    // Walking away and back does not re-fire.
    let (_, fired) = play(&interpreter, &engine, &mut world, "nroth");
    assert!(fired.is_empty());
    let (_, fired) = play(&interpreter, &engine, &mut world, "south");
    assert!(fired.is_empty());
    assert_eq!(world.memory().len(), 1);
}

#[test]
fn blocked_move_changes_nothing() {
    let interpreter = CommandInterpreter::default();
    let engine = EventEngine::new();
    let mut world = manor();
    let before = world.clone();

    let (outcome, fired) = play(&interpreter, &engine, &mut world, "north");
    assert_eq!(
        outcome,
        CommandOutcome::Blocked {
            direction: Direction::North
        }
    );
    assert!(fired.is_empty());
    assert_eq!(world, before);
}

#[test]
fn unrecognised_input_is_none() {
    let interpreter = CommandInterpreter::default();
    assert_eq!(interpreter.parse("jump"), None);
    assert_eq!(interpreter.parse(""), None);
    assert_eq!(
        interpreter.parse("noth"),
        Some(Command::Move {
            direction: Direction::North
        })
    );
}

// ---------------------------------------------------------------------------
// Rules loaded as data
// ---------------------------------------------------------------------------

#[test]
fn rule_list_from_toml_chains_in_one_pass() {
    #[derive(serde::Deserialize)]
    struct RuleFile {
        events: Vec<EventRule>,
    }

    let file: RuleFile = toml::from_str(
        r#"
        [[events]]
        name = "Read Blank Book"
        at_location = "library"
        sets_flags = { read_book = true }
        narrate = "The blank book hums."

        [[events]]
        name = "Hidden Passage"
        requires_flags = { read_book = true }
        sets_flags = { passage_open = true }
        add_exits = [{ from = "library", exit = "down", to = "secret_room" }]
        "#,
    )
    .expect("rules");

    let mut engine = EventEngine::new();
    for rule in file.events {
        engine.register(rule.into_event());
    }

    let mut world = manor();
    world.set_location("library").expect("teleport");
    assert_eq!(
        engine.evaluate(&mut world).expect("evaluate"),
        vec!["Read Blank Book", "Hidden Passage"]
    );
    assert_eq!(world.graph().destination("library", "down"), Some("secret_room"));
    assert!(engine.evaluate(&mut world).expect("evaluate").is_empty());
}

// ---------------------------------------------------------------------------
// Graph integrity through the world
// ---------------------------------------------------------------------------

#[test]
fn removing_a_room_prunes_exits_into_it() {
    let mut world = manor();
    world.remove_node("library").expect("remove");
    let hallway = world.graph().node("hallway").expect("hallway");
    assert!(!hallway.exits.contains_key("north"));
    assert!(world.graph().validate().is_ok());
}

#[test]
fn dangling_graph_file_is_rejected() {
    let err = LocationGraph::from_json(
        r#"{"nodes": {"a": {"description": "A", "exits": {"north": "nowhere"}}}}"#,
    )
    .expect_err("dangling exit");
    assert!(matches!(err, CoreError::UnknownNode(ref id) if id == "nowhere"));
    assert!(err.is_integrity_violation());
}

// ---------------------------------------------------------------------------
// Save / resume
// ---------------------------------------------------------------------------

#[test]
fn session_survives_save_and_resume() {
    let interpreter = CommandInterpreter::default();
    let mut engine = EventEngine::new();
    engine.register(open_door_event());
    let mut world = manor();
    let (outcome, fired) = play(&interpreter, &engine, &mut world, "take key");
    assert_eq!(outcome, CommandOutcome::Taken(vec!["key".into()]));
    assert!(fired.is_empty());
    assert!(world.has_item("key"));
    play(&interpreter, &engine, &mut world, "east");

    let dir = tempfile::tempdir().expect("tempdir");
    let store =
        SqliteSessionStore::open(dir.path().join("saves.db"), &PersistenceConfig::default())
            .expect("open");
    let id = SessionId::new();
    store.save(&SessionState::capture(id, &world)).expect("save");

    let mut resumed = store
        .load(&id)
        .expect("load")
        .expect("saved")
        .into_world()
        .expect("world");
    assert_eq!(resumed, world);

    let (outcome, fired) = play(&interpreter, &engine, &mut resumed, "look");
    assert!(fired.is_empty());
    let CommandOutcome::Described(text) = outcome else {
        panic!("expected a description, got {outcome:?}");
    };
    assert!(text.contains("door"));
}
