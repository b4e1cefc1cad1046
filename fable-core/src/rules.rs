//! Declarative event rules, loadable from world files.
//!
//! ```toml
//! [[events]]
//! name = "Open Door"
//! at_location = "hallway"
//! requires_items = ["key"]
//! sets_flags = { door_open = true }
//! add_exits = [{ from = "hallway", exit = "door", to = "secret_room" }]
//! narrate = "The door creaks open, revealing a secret room."
//! ```
//!
//! A rule with `sets_flags` only fires while at least one of those flags is
//! not yet at its target value, which makes such rules idempotent.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::Event;
use crate::world::WorldState;

/// An exit added to the graph by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitSpec {
    /// Node that gains the exit.
    pub from: String,
    /// Exit name.
    pub exit: String,
    /// Destination node.
    pub to: String,
}

/// A condition/effect rule described as data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRule {
    /// Label reported when the rule fires.
    pub name: String,
    /// Only fire while the player stands here.
    #[serde(default)]
    pub at_location: Option<String>,
    /// Items the player must carry.
    #[serde(default)]
    pub requires_items: Vec<String>,
    /// Flags that must have these values (unset reads as `false`).
    #[serde(default)]
    pub requires_flags: BTreeMap<String, bool>,
    /// Flags to set when firing.
    #[serde(default)]
    pub sets_flags: BTreeMap<String, bool>,
    /// Items handed to the player when firing.
    #[serde(default)]
    pub grants_items: Vec<String>,
    /// Exits added to the graph when firing.
    #[serde(default)]
    pub add_exits: Vec<ExitSpec>,
    /// Text appended to narrative memory when firing.
    #[serde(default)]
    pub narrate: Option<String>,
}

impl EventRule {
    /// Whether the rule's condition holds for `world`.
    #[must_use]
    pub fn matches(&self, world: &WorldState) -> bool {
        if self
            .at_location
            .as_deref()
            .is_some_and(|loc| loc != world.location())
        {
            return false;
        }
        if !self.requires_items.iter().all(|item| world.has_item(item)) {
            return false;
        }
        if !self
            .requires_flags
            .iter()
            .all(|(flag, value)| world.flag(flag) == *value)
        {
            return false;
        }
        self.sets_flags.is_empty()
            || self
                .sets_flags
                .iter()
                .any(|(flag, value)| world.flag(flag) != *value)
    }

    /// Apply the rule's effects. Exits are added first, so a dangling exit
    /// fails before any flag or item changes.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::UnknownNode`] if an exit references a missing node.
    pub fn apply(&self, world: &mut WorldState) -> Result<()> {
        for spec in &self.add_exits {
            world.add_transition(&spec.from, &spec.exit, &spec.to)?;
        }
        for (flag, value) in &self.sets_flags {
            world.set_flag(flag.clone(), *value);
        }
        for item in &self.grants_items {
            world.add_item(item.clone());
        }
        if let Some(text) = &self.narrate {
            world.memory_mut().add_event(text.clone());
        }
        Ok(())
    }

    /// Turn the rule into a registrable [`Event`].
    #[must_use]
    pub fn into_event(self) -> Event {
        let name = self.name.clone();
        let rule = Arc::new(self);
        let condition_rule = Arc::clone(&rule);
        Event::new(
            name,
            move |world: &WorldState| condition_rule.matches(world),
            move |world: &mut WorldState| rule.apply(world),
        )
    }
}
