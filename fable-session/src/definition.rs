//! World definition files.
//!
//! A world is authored as TOML:
//!
//! ```toml
//! start = "bedroom"
//!
//! [nodes.bedroom]
//! description = "A quiet bedroom."
//! exits = { east = "hallway" }
//! items = ["key"]
//!
//! [nodes.hallway]
//! description = "A long hallway."
//! exits = { west = "bedroom" }
//!
//! [scenes.hallway]
//! location_type = "manor hallway"
//! tone = "foreboding"
//! required_elements = "portraits, candles"
//!
//! [[events]]
//! name = "Portrait Whispers"
//! at_location = "hallway"
//! sets_flags = { heard_whispers = true }
//! narrate = "The portraits whisper your name."
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use fable_core::{EventEngine, EventRule, LocationGraph, Node};
use fable_llm::NarrativeRequest;

use crate::error::{Result, SessionError};

/// One `[nodes.<id>]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Text shown on `look`.
    pub description: String,
    /// Exit name → destination id.
    #[serde(default)]
    pub exits: BTreeMap<String, String>,
    /// Items lying here.
    #[serde(default)]
    pub items: Vec<String>,
    /// Action phrase → description.
    #[serde(default)]
    pub actions: BTreeMap<String, String>,
}

/// Narrative style of a location, i.e. the inputs to narrative generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneStyle {
    /// Kind of place, e.g. "cave".
    pub location_type: String,
    /// Desired tone.
    pub tone: String,
    /// Comma-separated elements the text must mention.
    #[serde(default)]
    pub required_elements: String,
    /// Prompt template name; the configured default when absent.
    #[serde(default)]
    pub template: Option<String>,
}

impl SceneStyle {
    /// Generation request for this scene.
    #[must_use]
    pub fn request(&self) -> NarrativeRequest {
        let request = NarrativeRequest::new(
            self.location_type.clone(),
            self.tone.clone(),
            self.required_elements.clone(),
        );
        match &self.template {
            Some(name) => request.with_template(name.clone()),
            None => request,
        }
    }
}

/// A complete authored world.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldDefinition {
    /// Starting location.
    pub start: String,
    /// Locations by id.
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeDefinition>,
    /// Scene styles by location id. Locations without one get no narrative.
    #[serde(default)]
    pub scenes: BTreeMap<String, SceneStyle>,
    /// Event rules, in evaluation order.
    #[serde(default)]
    pub events: Vec<EventRule>,
}

impl WorldDefinition {
    /// Parse and check a definition.
    ///
    /// # Errors
    ///
    /// [`SessionError::Definition`] if the TOML is invalid or the world is
    /// inconsistent (see [`WorldDefinition::validate`]).
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let definition: Self =
            toml::from_str(toml_str).map_err(|e| SessionError::Definition(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Load a definition from disk.
    ///
    /// # Errors
    ///
    /// [`SessionError::World`] if the file cannot be read, otherwise as
    /// [`WorldDefinition::from_toml`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(fable_core::CoreError::from)?;
        Self::from_toml(&content)
    }

    /// Check that every id the definition mentions names a defined node.
    ///
    /// # Errors
    ///
    /// [`SessionError::Definition`] naming the first dangling reference.
    pub fn validate(&self) -> Result<()> {
        let known = |id: &str| self.nodes.contains_key(id);
        let dangling = |what: String| Err(SessionError::Definition(what));

        if !known(&self.start) {
            return dangling(format!("start location '{}' is not defined", self.start));
        }
        for (id, node) in &self.nodes {
            if let Some((exit, to)) = node.exits.iter().find(|(_, to)| !known(to)) {
                return dangling(format!("exit '{exit}' of '{id}' leads to unknown '{to}'"));
            }
        }
        if let Some(id) = self.scenes.keys().find(|id| !known(id)) {
            return dangling(format!("scene for unknown location '{id}'"));
        }
        for rule in &self.events {
            if let Some(loc) = rule.at_location.as_deref().filter(|loc| !known(loc)) {
                return dangling(format!("event '{}' is bound to unknown '{loc}'", rule.name));
            }
            if let Some(spec) = rule
                .add_exits
                .iter()
                .find(|spec| !known(&spec.from) || !known(&spec.to))
            {
                return dangling(format!(
                    "event '{}' adds exit '{}' between unknown locations '{}' → '{}'",
                    rule.name, spec.exit, spec.from, spec.to
                ));
            }
        }
        Ok(())
    }

    /// Build the location graph.
    ///
    /// # Errors
    ///
    /// [`SessionError::World`] if the graph is inconsistent.
    pub fn graph(&self) -> Result<LocationGraph> {
        let nodes = self.nodes.iter().map(|(id, def)| Node {
            id: id.clone(),
            description: def.description.clone(),
            exits: def.exits.clone(),
            items: def.items.clone(),
            actions: def.actions.clone(),
        });
        Ok(LocationGraph::from_nodes(nodes)?)
    }

    /// Event engine with every rule registered in file order.
    #[must_use]
    pub fn event_engine(&self) -> EventEngine {
        let mut engine = EventEngine::new();
        for rule in &self.events {
            engine.register(rule.clone().into_event());
        }
        engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAVE: &str = r#"
        start = "entrance"

        [nodes.entrance]
        description = "A gaping cave mouth."
        exits = { north = "grotto" }

        [nodes.grotto]
        description = "Water drips somewhere."
        exits = { south = "entrance" }
        items = ["torch"]

        [scenes.grotto]
        location_type = "cave"
        tone = "mysterious"
        required_elements = "stalactites, bats"

        [[events]]
        name = "Bats Scatter"
        at_location = "grotto"
        sets_flags = { bats_scattered = true }
        narrate = "A cloud of bats bursts past you."
    "#;

    #[test]
    fn parses_and_builds() {
        let def = WorldDefinition::from_toml(CAVE).expect("definition");
        let graph = def.graph().expect("graph");
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.destination("entrance", "north"), Some("grotto"));
        assert_eq!(graph.node("grotto").expect("grotto").items, vec!["torch"]);
        assert_eq!(def.event_engine().names().collect::<Vec<_>>(), vec!["Bats Scatter"]);

        let request = def.scenes["grotto"].request();
        assert_eq!(request.required_elements, "stalactites, bats");
        assert_eq!(request.template, None);
    }

    #[test]
    fn unknown_start_is_rejected() {
        let err = WorldDefinition::from_toml("start = \"void\"\n").expect_err("invalid");
        assert!(matches!(err, SessionError::Definition(ref msg) if msg.contains("void")));
    }

    #[test]
    fn dangling_exit_is_rejected() {
        let toml = r#"
            start = "a"
            [nodes.a]
            description = "A"
            exits = { up = "attic" }
        "#;
        assert!(matches!(
            WorldDefinition::from_toml(toml),
            Err(SessionError::Definition(ref msg)) if msg.contains("attic")
        ));
    }

    #[test]
    fn rule_exit_to_unknown_node_is_rejected() {
        let toml = r#"
            start = "a"
            [nodes.a]
            description = "A"

            [[events]]
            name = "Trapdoor"
            add_exits = [{ from = "a", exit = "down", to = "pit" }]
        "#;
        assert!(matches!(
            WorldDefinition::from_toml(toml),
            Err(SessionError::Definition(ref msg)) if msg.contains("pit")
        ));
    }

    #[test]
    fn scene_for_unknown_node_is_rejected() {
        let toml = r#"
            start = "a"
            [nodes.a]
            description = "A"
            [scenes.b]
            location_type = "void"
            tone = "empty"
        "#;
        assert!(WorldDefinition::from_toml(toml).is_err());
    }

    #[test]
    fn malformed_toml_is_definition_error() {
        assert!(matches!(
            WorldDefinition::from_toml("start = "),
            Err(SessionError::Definition(_))
        ));
    }
}
