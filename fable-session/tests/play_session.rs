//! End-to-end sessions over the bundled manor world, played offline: the
//! `none` client always fails, so every narrative is the fallback text.

use std::path::Path;

use fable_core::config::{FableConfig, PersistenceConfig};
use fable_core::persistence::SqliteSessionStore;
use fable_core::{CommandOutcome, SessionId};
use fable_llm::{
    fallback_narrative, LlmClient, LruNarrativeCache, NarrativeGenerator, NarrativeOrigin,
};
use fable_session::{Response, Session, SessionError, WorldDefinition};

fn manor() -> WorldDefinition {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("worlds/manor.toml");
    WorldDefinition::from_file(&path).expect("manor world")
}

fn offline_generator() -> NarrativeGenerator<LlmClient, LruNarrativeCache> {
    let config = FableConfig::default();
    NarrativeGenerator::from_config(
        LlmClient::none(),
        LruNarrativeCache::from_config(&config.cache),
        &config.narrative,
    )
    .expect("generator")
}

const TRAPDOOR: &str = "A trapdoor creaks open, revealing a secret room.";

#[tokio::test]
async fn trapdoor_opens_and_secret_room_is_narrated() {
    let definition = manor();
    let generator = offline_generator();
    let mut session = Session::from_definition(&definition).expect("session");

    let report = session.play_turn("east", &generator).await.expect("turn");
    assert!(report.events.is_empty());
    session.play_turn("w", &generator).await.expect("turn");

    let report = session.play_turn("get key", &generator).await.expect("turn");
    assert_eq!(report.text(), "Taken: key.");
    assert!(report.narrative.is_none());
    assert_eq!(session.world().inventory(), ["key"]);
    assert!(session.world().current_node().expect("bedroom").items.is_empty());

    let report = session.play_turn("east", &generator).await.expect("turn");
    assert_eq!(report.events, vec!["Open Trapdoor"]);
    let hallway = fallback_narrative("manor hallway", "foreboding", "portraits, candles");
    assert_eq!(report.text(), format!("{TRAPDOOR}\n{hallway}"));

    let report = session.play_turn("door", &generator).await.expect("turn");
    assert_eq!(report.response, Response::NotUnderstood);

    let report = session.play_turn("d", &generator).await.expect("turn");
    assert_eq!(session.world().location(), "secret_room");
    assert!(report.events.is_empty());
    let chamber = fallback_narrative("hidden chamber", "mysterious", "dust, candle");
    assert_eq!(report.text(), chamber);

    assert!(session.world().flag("door_open"));
    assert_eq!(
        session.world().memory().events(),
        [hallway.clone(), TRAPDOOR.to_string(), hallway, chamber]
    );
}

#[tokio::test]
async fn standing_still_adds_nothing_to_memory() {
    let definition = manor();
    let generator = offline_generator();
    let mut session = Session::from_definition(&definition).expect("session");

    session.play_turn("east", &generator).await.expect("turn");
    for input in ["east", "inv", "look", "take"] {
        let report = session.play_turn(input, &generator).await.expect("turn");
        assert!(report.narrative.is_none(), "{input} generated prose");
    }
    let report = session.play_turn("east", &generator).await.expect("turn");
    assert_eq!(report.text(), "You can't go east.");

    assert_eq!(session.world().memory().len(), 1);
    assert_eq!(generator.cache().len(), 1);
}

#[tokio::test]
async fn narrative_history_accumulates_across_turns() {
    let definition = manor();
    let generator = offline_generator();
    let mut session = Session::from_definition(&definition).expect("session");

    for input in ["e", "n", "s"] {
        let report = session.play_turn(input, &generator).await.expect("turn");
        assert!(matches!(
            report.response,
            Response::Acted {
                outcome: CommandOutcome::Moved { .. },
                ..
            }
        ));
        let narrative = report.narrative.expect("every stop has a scene");
        assert!(matches!(narrative.origin, NarrativeOrigin::Fallback(_)));
    }

    assert_eq!(session.turns(), 3);
    assert_eq!(session.world().location(), "hallway");
    assert_eq!(session.world().memory().len(), 3);
    // Memory differs on the second hallway visit, so nothing was served from cache.
    assert_eq!(generator.cache().len(), 3);
}

#[tokio::test]
async fn save_and_resume_from_disk() {
    let definition = manor();
    let generator = offline_generator();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteSessionStore::open(dir.path().join("saves.db"), &PersistenceConfig::default())
        .expect("store");

    let mut session = Session::from_definition(&definition).expect("session");
    session.play_turn("east", &generator).await.expect("turn");
    session.save(&store).expect("save");

    let resumed = Session::load(&store, &session.id(), &definition)
        .expect("load")
        .expect("saved session");
    assert_eq!(resumed.id(), session.id());
    assert_eq!(resumed.world(), session.world());
    assert_eq!(resumed.snapshot(), session.snapshot());

    assert!(Session::load(&store, &SessionId::new(), &definition)
        .expect("load")
        .is_none());
}

#[test]
fn restoring_into_a_removed_room_is_an_internal_error() {
    let definition = manor();
    let session = Session::from_definition(&definition).expect("session");
    let mut state = session.snapshot();
    state.location = "ballroom".into();

    let err = Session::restore(state, &definition).expect_err("unknown location");
    assert!(matches!(err, SessionError::World(_)));
    assert!(err.is_internal());
}
