//! Event engine: condition/action rules evaluated after every command.
//!
//! Events are evaluated in registration order against the *live* world:
//! an action's changes are visible to the conditions of events registered
//! after it within the same pass, so dependent events can chain in a single
//! turn. Evaluation order is therefore observable.
//!
//! Idempotency is each action's job. An action must leave the world in a
//! state where its own condition no longer holds (typically by setting a
//! flag), or it fires again on the next pass.
//!
//! Names are labels, not keys: registering two events with the same name
//! keeps both, and both are reported when they fire.

use std::fmt;

use tracing::debug;

use crate::error::Result;
use crate::world::WorldState;

/// Pure predicate over the world.
pub type Condition = Box<dyn Fn(&WorldState) -> bool + Send + Sync>;

/// Effect applied to the world when the condition holds.
pub type Effect = Box<dyn Fn(&mut WorldState) -> Result<()> + Send + Sync>;

/// A named condition/action pair.
pub struct Event {
    name: String,
    condition: Condition,
    action: Effect,
}

impl Event {
    /// Create an event.
    pub fn new<C, A>(name: impl Into<String>, condition: C, action: A) -> Self
    where
        C: Fn(&WorldState) -> bool + Send + Sync + 'static,
        A: Fn(&mut WorldState) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            condition: Box::new(condition),
            action: Box::new(action),
        }
    }

    /// The event's label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the condition currently holds.
    #[must_use]
    pub fn is_ready(&self, world: &WorldState) -> bool {
        (self.condition)(world)
    }

    /// Run the action if the condition holds. Returns whether it ran.
    ///
    /// # Errors
    ///
    /// Propagates the action's error.
    pub fn check_and_execute(&self, world: &mut WorldState) -> Result<bool> {
        if !self.is_ready(world) {
            return Ok(false);
        }
        (self.action)(world)?;
        Ok(true)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered registry of [`Event`]s.
#[derive(Debug, Default)]
pub struct EventEngine {
    events: Vec<Event>,
}

impl EventEngine {
    /// Create an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. No deduplication by name.
    pub fn register(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Run one evaluation pass and return the names of triggered events,
    /// in the order they fired.
    ///
    /// # Errors
    ///
    /// The first failing action aborts the pass; actions that already ran
    /// keep their effects.
    pub fn evaluate(&self, world: &mut WorldState) -> Result<Vec<String>> {
        let mut triggered = Vec::new();
        for event in &self.events {
            if event.check_and_execute(world)? {
                debug!(event = %event.name, location = world.location(), "Event triggered");
                triggered.push(event.name.clone());
            }
        }
        Ok(triggered)
    }

    /// Registered event names in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.name.as_str())
    }

    /// Number of registered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Built-in events
// ---------------------------------------------------------------------------

/// Flag set once the hallway door has been opened.
pub const DOOR_OPEN_FLAG: &str = "door_open";

/// "Open Door": standing in `hallway` holding `key` opens a `door` exit
/// into `secret_room`. Sets [`DOOR_OPEN_FLAG`] so it fires only once, but
/// only after the exit exists.
#[must_use]
pub fn open_door_event() -> Event {
    Event::new(
        "Open Door",
        |world: &WorldState| {
            world.location() == "hallway" && world.has_item("key") && !world.flag(DOOR_OPEN_FLAG)
        },
        |world: &mut WorldState| {
            world.add_transition("hallway", "door", "secret_room")?;
            world.set_flag(DOOR_OPEN_FLAG, true);
            world
                .memory_mut()
                .add_event("The door creaks open, revealing a secret room.");
            Ok(())
        },
    )
}
