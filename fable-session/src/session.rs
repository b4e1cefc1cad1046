//! The per-turn pipeline.
//!
//! ```text
//! raw text ─► CommandInterpreter ─► Command::apply ─► EventEngine::evaluate
//!                 │ unrecognised                              │
//!                 ▼                                           ▼
//!          NotUnderstood                 NarrativeGenerator (if the player
//!                                        moved into a location with a scene
//!                                        style) ─► TurnReport
//! ```
//!
//! Only turns that move the player generate prose, so memory holds exactly
//! the narrative the player was shown.
//!
//! A session is single-writer: `play_turn` takes `&mut self`, so two turns
//! of one session can never interleave. The generator is shared and may
//! serve many sessions at once.

use std::collections::BTreeMap;

use tracing::{debug, info};

use fable_core::persistence::{SessionState, SessionStore};
use fable_core::{
    Command, CommandInterpreter, CommandOutcome, Event, EventEngine, SessionId, WorldState,
};
use fable_llm::{GenerationBackend, Narrative, NarrativeCache, NarrativeGenerator};

use crate::definition::{SceneStyle, WorldDefinition};
use crate::error::Result;

/// What the game did with the player's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The input matched no command. Nothing changed.
    NotUnderstood,
    /// A command ran.
    Acted {
        /// The parsed command.
        command: Command,
        /// Its effect.
        outcome: CommandOutcome,
    },
}

/// Everything that happened during one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// The raw input.
    pub input: String,
    /// Command handling result.
    pub response: Response,
    /// Names of events that fired, in order.
    pub events: Vec<String>,
    /// Memory entries written by those events, in order.
    pub narration: Vec<String>,
    /// Narrative for the location the player moved into, if it has a scene.
    pub narrative: Option<Narrative>,
}

impl TurnReport {
    /// Player-facing text for this turn: event narration first, then the
    /// command's own line.
    #[must_use]
    pub fn text(&self) -> String {
        let mut lines = self.narration.clone();
        lines.push(self.response_line());
        lines.join("\n")
    }

    fn response_line(&self) -> String {
        match &self.response {
            Response::NotUnderstood => "I didn't understand that command.".to_string(),
            Response::Acted { outcome, .. } => match (outcome, &self.narrative) {
                (CommandOutcome::Moved { .. }, Some(narrative)) => narrative.text.clone(),
                (CommandOutcome::Moved { to, .. }, None) => format!("You arrive at the {to}."),
                (CommandOutcome::Blocked { direction }, _) => format!("You can't go {direction}."),
                (CommandOutcome::Described(text), _) => text.clone(),
                (CommandOutcome::Inventory(items), _) if items.is_empty() => {
                    "You are empty-handed.".to_string()
                }
                (CommandOutcome::Inventory(items), _) => {
                    format!("You are carrying: {}.", items.join(", "))
                }
                (CommandOutcome::Taken(items), _) => format!("Taken: {}.", items.join(", ")),
                (CommandOutcome::NothingToTake { item: Some(item) }, _) => {
                    format!("There is no {item} here.")
                }
                (CommandOutcome::NothingToTake { item: None }, _) => {
                    "There is nothing here to take.".to_string()
                }
            },
        }
    }
}

/// One player's game in progress.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    world: WorldState,
    events: EventEngine,
    interpreter: CommandInterpreter,
    scenes: BTreeMap<String, SceneStyle>,
    turns: u64,
}

impl Session {
    /// New session at the definition's start location.
    ///
    /// # Errors
    ///
    /// [`crate::SessionError::World`] if the definition's graph is inconsistent.
    pub fn from_definition(definition: &WorldDefinition) -> Result<Self> {
        let world = WorldState::new(definition.graph()?, definition.start.clone())?;
        Ok(Self::assemble(SessionId::new(), world, definition))
    }

    /// Resume a saved session. Rules and scenes come from `definition`;
    /// everything else comes from `state`.
    ///
    /// # Errors
    ///
    /// [`crate::SessionError::World`] if the saved world is inconsistent.
    pub fn restore(state: SessionState, definition: &WorldDefinition) -> Result<Self> {
        let id = state.id;
        let world = state.into_world()?;
        Ok(Self::assemble(id, world, definition))
    }

    /// Load and resume a session from `store`, or `None` if it was never saved.
    ///
    /// # Errors
    ///
    /// Storage failures, or an inconsistent saved world.
    pub fn load(
        store: &impl SessionStore,
        id: &SessionId,
        definition: &WorldDefinition,
    ) -> Result<Option<Self>> {
        match store.load(id)? {
            Some(state) => Ok(Some(Self::restore(state, definition)?)),
            None => Ok(None),
        }
    }

    fn assemble(id: SessionId, world: WorldState, definition: &WorldDefinition) -> Self {
        Self {
            id,
            world,
            events: definition.event_engine(),
            interpreter: CommandInterpreter::default(),
            scenes: definition.scenes.clone(),
            turns: 0,
        }
    }

    /// Replace the command interpreter.
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: CommandInterpreter) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Register an extra event after the definition's rules.
    #[must_use]
    pub fn with_event(mut self, event: Event) -> Self {
        self.events.register(event);
        self
    }

    /// Save slot id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current world.
    #[must_use]
    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Turns played since the session was created or restored,
    /// not counting unrecognised input.
    #[must_use]
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Scene style of a location.
    #[must_use]
    pub fn scene(&self, location: &str) -> Option<&SceneStyle> {
        self.scenes.get(location)
    }

    /// Serialisable copy of the session.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        SessionState::capture(self.id, &self.world)
    }

    /// Write the session to `store`.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub fn save(&self, store: &impl SessionStore) -> Result<()> {
        store.save(&self.snapshot())?;
        Ok(())
    }

    /// Play one turn.
    ///
    /// # Errors
    ///
    /// [`crate::SessionError::World`] if a command or event action breaks
    /// world integrity. Unrecognised input is not an error.
    pub async fn play_turn<B, C>(
        &mut self,
        raw: &str,
        generator: &NarrativeGenerator<B, C>,
    ) -> Result<TurnReport>
    where
        B: GenerationBackend,
        C: NarrativeCache,
    {
        let Some(command) = self.interpreter.parse(raw) else {
            debug!(session = %self.id, input = raw, "Input not understood");
            return Ok(TurnReport {
                input: raw.to_string(),
                response: Response::NotUnderstood,
                events: Vec::new(),
                narration: Vec::new(),
                narrative: None,
            });
        };

        let outcome = command.apply(&mut self.world)?;
        let logged = self.world.memory().len();
        let events = self.events.evaluate(&mut self.world)?;
        let narration = self
            .world
            .memory()
            .events()
            .get(logged..)
            .map(<[String]>::to_vec)
            .unwrap_or_default();

        let scene = if matches!(outcome, CommandOutcome::Moved { .. }) {
            self.scenes.get(self.world.location())
        } else {
            None
        };
        let narrative = match scene {
            Some(scene) => Some(
                generator
                    .generate(&scene.request(), Some(self.world.memory_mut()))
                    .await,
            ),
            None => None,
        };

        self.turns += 1;
        info!(
            session = %self.id,
            turn = self.turns,
            command = %command.describe(),
            location = self.world.location(),
            events = events.len(),
            "Turn played"
        );

        Ok(TurnReport {
            input: raw.to_string(),
            response: Response::Acted { command, outcome },
            events,
            narration,
            narrative,
        })
    }
}
