//! Location graph: the rooms of an adventure and the exits between them.
//!
//! The graph owns every [`Node`] exclusively. Integrity is enforced at the
//! mutation boundary: every value in a node's `exits` map names a node that
//! exists in the graph. Bulk loading ([`LocationGraph::from_nodes`]) may hold
//! forward references while it inserts, but validates before returning.
//!
//! Serialized form (shared with the JSON world files):
//!
//! ```json
//! { "nodes": { "hallway": { "description": "...", "exits": { "north": "library" },
//!                            "items": ["key"], "actions": { "examine room": "..." } } } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};

/// A single location in the adventure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the graph.
    pub id: String,
    /// Prose shown to the player on arrival.
    pub description: String,
    /// Direction (or exit name) → destination node id.
    #[serde(default)]
    pub exits: BTreeMap<String, String>,
    /// Items lying here, in placement order. Duplicates are allowed.
    #[serde(default)]
    pub items: Vec<String>,
    /// Action phrase → description of what happens.
    #[serde(default)]
    pub actions: BTreeMap<String, String>,
}

impl Node {
    /// Create a node with no exits, items, or actions.
    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            exits: BTreeMap::new(),
            items: Vec::new(),
            actions: BTreeMap::new(),
        }
    }

    /// Add an exit.
    #[must_use]
    pub fn with_exit(mut self, exit: impl Into<String>, destination: impl Into<String>) -> Self {
        self.exits.insert(exit.into(), destination.into());
        self
    }

    /// Add an item.
    #[must_use]
    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.items.push(item.into());
        self
    }

    /// Add an action phrase and its description.
    #[must_use]
    pub fn with_action(mut self, phrase: impl Into<String>, description: impl Into<String>) -> Self {
        self.actions.insert(phrase.into(), description.into());
        self
    }
}

/// A partial update for [`LocationGraph::update_node`].
///
/// Only the fields that are `Some` are overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeUpdate {
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement exit map (validated against the graph).
    pub exits: Option<BTreeMap<String, String>>,
    /// Replacement item list.
    pub items: Option<Vec<String>>,
    /// Replacement action map.
    pub actions: Option<BTreeMap<String, String>>,
}

impl NodeUpdate {
    /// Start an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Overwrite the exit map.
    #[must_use]
    pub fn exits(mut self, exits: BTreeMap<String, String>) -> Self {
        self.exits = Some(exits);
        self
    }

    /// Overwrite the item list.
    #[must_use]
    pub fn items(mut self, items: Vec<String>) -> Self {
        self.items = Some(items);
        self
    }

    /// Overwrite the action map.
    #[must_use]
    pub fn actions(mut self, actions: BTreeMap<String, String>) -> Self {
        self.actions = Some(actions);
        self
    }
}

/// The location graph: node id → [`Node`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GraphRecord", into = "GraphRecord")]
pub struct LocationGraph {
    nodes: BTreeMap<String, Node>,
}

impl LocationGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a batch of nodes.
    ///
    /// Exits may reference nodes that appear later in the batch; any exit
    /// still dangling once every node is inserted is reported as
    /// [`CoreError::UnknownNode`].
    ///
    /// # Errors
    ///
    /// [`CoreError::DuplicateNode`] on a repeated id, or
    /// [`CoreError::UnknownNode`] for a dangling exit.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self> {
        let mut graph = Self::new();
        for node in nodes {
            if graph.nodes.contains_key(&node.id) {
                return Err(CoreError::DuplicateNode(node.id));
            }
            graph.nodes.insert(node.id.clone(), node);
        }
        graph.validate()?;
        debug!(nodes = graph.len(), "Location graph loaded");
        Ok(graph)
    }

    /// Parse a graph from its JSON representation.
    ///
    /// # Errors
    ///
    /// [`CoreError::Serialization`] for malformed JSON, otherwise the same
    /// errors as [`LocationGraph::from_nodes`].
    pub fn from_json(json: &str) -> Result<Self> {
        let record: GraphRecord =
            serde_json::from_str(json).map_err(|e| CoreError::Serialization(e.to_string()))?;
        Self::try_from(record)
    }

    /// Render the graph as JSON.
    ///
    /// # Errors
    ///
    /// [`CoreError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Insert a new node.
    ///
    /// The node's own exits must point at existing nodes (or at itself).
    ///
    /// # Errors
    ///
    /// [`CoreError::DuplicateNode`] if the id is taken, or
    /// [`CoreError::UnknownNode`] if one of its exits dangles.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(CoreError::DuplicateNode(node.id));
        }
        self.check_exits(&node.id, &node.exits)?;
        debug!(node = %node.id, exits = node.exits.len(), "Node added");
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Remove a node and prune every exit elsewhere that pointed at it.
    ///
    /// Returns the removed node.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownNode`] if the id is absent.
    pub fn remove_node(&mut self, id: &str) -> Result<Node> {
        let removed = self
            .nodes
            .remove(id)
            .ok_or_else(|| CoreError::UnknownNode(id.to_string()))?;

        let mut pruned = 0usize;
        for node in self.nodes.values_mut() {
            let before = node.exits.len();
            node.exits.retain(|_, destination| destination != id);
            pruned += before - node.exits.len();
        }

        debug!(node = %id, pruned_exits = pruned, "Node removed");
        Ok(removed)
    }

    /// Overwrite the supplied fields of an existing node.
    ///
    /// A replacement exit map is validated first; on failure the node is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownNode`] if the node (or a new exit destination)
    /// does not exist.
    pub fn update_node(&mut self, id: &str, update: NodeUpdate) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(CoreError::UnknownNode(id.to_string()));
        }
        if let Some(exits) = &update.exits {
            self.check_exits(id, exits)?;
        }

        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| CoreError::UnknownNode(id.to_string()))?;
        if let Some(description) = update.description {
            node.description = description;
        }
        if let Some(exits) = update.exits {
            node.exits = exits;
        }
        if let Some(items) = update.items {
            node.items = items;
        }
        if let Some(actions) = update.actions {
            node.actions = actions;
        }
        Ok(())
    }

    /// Set `exits[exit] = to` on node `from`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownNode`] if either node is absent.
    pub fn add_transition(&mut self, from: &str, exit: &str, to: &str) -> Result<()> {
        if !self.nodes.contains_key(to) {
            return Err(CoreError::UnknownNode(to.to_string()));
        }
        let node = self
            .nodes
            .get_mut(from)
            .ok_or_else(|| CoreError::UnknownNode(from.to_string()))?;
        node.exits.insert(exit.to_string(), to.to_string());
        debug!(from, exit, to, "Transition added");
        Ok(())
    }

    /// Delete exit `exit` from node `from`, returning its former destination.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownTransition`] if the node or the exit is absent.
    pub fn remove_transition(&mut self, from: &str, exit: &str) -> Result<String> {
        self.nodes
            .get_mut(from)
            .and_then(|node| node.exits.remove(exit))
            .ok_or_else(|| CoreError::UnknownTransition {
                from: from.to_string(),
                exit: exit.to_string(),
            })
    }

    /// Remove the first occurrence of `item` from a node's item list.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownNode`] if the node is absent, or
    /// [`CoreError::UnknownItem`] if the item is not lying there.
    pub fn take_item(&mut self, id: &str, item: &str) -> Result<String> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| CoreError::UnknownNode(id.to_string()))?;
        let index = node
            .items
            .iter()
            .position(|i| i == item)
            .ok_or_else(|| CoreError::UnknownItem(item.to_string()))?;
        Ok(node.items.remove(index))
    }

    /// Append an item to a node's item list.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownNode`] if the node is absent.
    pub fn place_item(&mut self, id: &str, item: impl Into<String>) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| CoreError::UnknownNode(id.to_string()))?;
        node.items.push(item.into());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Whether a node with this id exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Where exit `exit` on node `from` leads, if it exists.
    #[must_use]
    pub fn destination(&self, from: &str, exit: &str) -> Option<&str> {
        self.nodes
            .get(from)
            .and_then(|node| node.exits.get(exit))
            .map(String::as_str)
    }

    /// Node ids in sorted order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check that every exit in the graph points at an existing node.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownNode`] naming the first dangling destination.
    pub fn validate(&self) -> Result<()> {
        for node in self.nodes.values() {
            self.check_exits(&node.id, &node.exits)?;
        }
        Ok(())
    }

    fn check_exits(&self, owner: &str, exits: &BTreeMap<String, String>) -> Result<()> {
        match exits
            .values()
            .find(|dest| dest.as_str() != owner && !self.nodes.contains_key(dest.as_str()))
        {
            Some(dangling) => Err(CoreError::UnknownNode(dangling.clone())),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

/// Wire shape of a [`LocationGraph`]: nodes keyed by id, id not repeated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GraphRecord {
    #[serde(default)]
    nodes: BTreeMap<String, NodeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeRecord {
    description: String,
    #[serde(default)]
    exits: BTreeMap<String, String>,
    #[serde(default)]
    items: Vec<String>,
    #[serde(default)]
    actions: BTreeMap<String, String>,
}

impl TryFrom<GraphRecord> for LocationGraph {
    type Error = CoreError;

    fn try_from(record: GraphRecord) -> Result<Self> {
        Self::from_nodes(record.nodes.into_iter().map(|(id, n)| Node {
            id,
            description: n.description,
            exits: n.exits,
            items: n.items,
            actions: n.actions,
        }))
    }
}

impl From<LocationGraph> for GraphRecord {
    fn from(graph: LocationGraph) -> Self {
        let nodes = graph
            .nodes
            .into_iter()
            .map(|(id, n)| {
                (
                    id,
                    NodeRecord {
                        description: n.description,
                        exits: n.exits,
                        items: n.items,
                        actions: n.actions,
                    },
                )
            })
            .collect();
        Self { nodes }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn two_rooms() -> LocationGraph {
        let mut graph = LocationGraph::new();
        graph.add_node(Node::new("hallway", "A dusty hallway.")).expect("add");
        graph.add_node(Node::new("library", "Shelves of books.")).expect("add");
        graph
    }

    #[test]
    fn add_node_rejects_duplicate() {
        let mut graph = two_rooms();
        let err = graph
            .add_node(Node::new("hallway", "Another hallway."))
            .expect_err("duplicate");
        assert!(matches!(err, CoreError::DuplicateNode(ref id) if id == "hallway"));
        assert_eq!(graph.node("hallway").expect("kept").description, "A dusty hallway.");
    }

    #[test]
    fn add_node_rejects_dangling_exit() {
        let mut graph = two_rooms();
        let err = graph
            .add_node(Node::new("cellar", "Damp.").with_exit("up", "attic"))
            .expect_err("dangling");
        assert!(matches!(err, CoreError::UnknownNode(ref id) if id == "attic"));
        assert!(!graph.contains("cellar"));
    }

    #[test]
    fn add_node_allows_self_loop() {
        let mut graph = LocationGraph::new();
        graph
            .add_node(Node::new("maze", "Twisty passages.").with_exit("west", "maze"))
            .expect("self loop");
        assert_eq!(graph.destination("maze", "west"), Some("maze"));
    }

    #[test]
    fn remove_node_prunes_incoming_exits() {
        let mut graph = two_rooms();
        graph.add_transition("hallway", "north", "library").expect("t");
        graph.add_transition("library", "south", "hallway").expect("t");

        let removed = graph.remove_node("library").expect("remove");
        assert_eq!(removed.id, "library");
        assert!(graph.node("hallway").expect("hallway").exits.is_empty());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn remove_unknown_node_fails() {
        let mut graph = two_rooms();
        assert!(matches!(
            graph.remove_node("attic"),
            Err(CoreError::UnknownNode(_))
        ));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn update_node_only_touches_supplied_fields() {
        let mut graph = two_rooms();
        graph.place_item("hallway", "key").expect("place");
        graph
            .update_node("hallway", NodeUpdate::new().description("A swept hallway."))
            .expect("update");

        let node = graph.node("hallway").expect("hallway");
        assert_eq!(node.description, "A swept hallway.");
        assert_eq!(node.items, vec!["key".to_string()]);
    }

    #[test]
    fn update_node_with_dangling_exits_leaves_node_unchanged() {
        let mut graph = two_rooms();
        graph.add_transition("hallway", "north", "library").expect("t");
        let before = graph.clone();

        let mut exits = BTreeMap::new();
        exits.insert("down".to_string(), "cellar".to_string());
        let err = graph
            .update_node(
                "hallway",
                NodeUpdate::new().description("changed").exits(exits),
            )
            .expect_err("dangling");
        assert!(matches!(err, CoreError::UnknownNode(ref id) if id == "cellar"));
        assert_eq!(graph, before);
    }

    #[test]
    fn update_unknown_node_fails() {
        let mut graph = two_rooms();
        assert!(matches!(
            graph.update_node("attic", NodeUpdate::new().description("x")),
            Err(CoreError::UnknownNode(_))
        ));
    }

    #[test]
    fn add_transition_overwrites() {
        let mut graph = two_rooms();
        graph.add_node(Node::new("study", "A quiet study.")).expect("add");
        graph.add_transition("hallway", "north", "library").expect("t");
        graph.add_transition("hallway", "north", "study").expect("t");
        assert_eq!(graph.destination("hallway", "north"), Some("study"));
    }

    #[test]
    fn add_transition_to_unknown_node_fails_without_change() {
        let mut graph = two_rooms();
        let before = graph.clone();
        assert!(matches!(
            graph.add_transition("hallway", "north", "attic"),
            Err(CoreError::UnknownNode(ref id)) if id == "attic"
        ));
        assert!(matches!(
            graph.add_transition("attic", "south", "hallway"),
            Err(CoreError::UnknownNode(ref id)) if id == "attic"
        ));
        assert_eq!(graph, before);
    }

    #[test]
    fn remove_transition_reports_missing_exit() {
        let mut graph = two_rooms();
        graph.add_transition("hallway", "north", "library").expect("t");
        assert_eq!(
            graph.remove_transition("hallway", "north").expect("remove"),
            "library"
        );
        assert!(matches!(
            graph.remove_transition("hallway", "north"),
            Err(CoreError::UnknownTransition { .. })
        ));
        assert!(matches!(
            graph.remove_transition("attic", "north"),
            Err(CoreError::UnknownTransition { .. })
        ));
    }

    #[test]
    fn take_item_removes_first_occurrence() {
        let mut graph = two_rooms();
        graph.place_item("hallway", "coin").expect("place");
        graph.place_item("hallway", "key").expect("place");
        graph.place_item("hallway", "coin").expect("place");

        graph.take_item("hallway", "coin").expect("take");
        assert_eq!(
            graph.node("hallway").expect("hallway").items,
            vec!["key".to_string(), "coin".to_string()]
        );
        assert!(matches!(
            graph.take_item("hallway", "lamp"),
            Err(CoreError::UnknownItem(_))
        ));
    }

    #[test]
    fn from_json_allows_forward_references() {
        let graph = LocationGraph::from_json(
            r#"{"nodes": {
                "hallway": {"description": "Hall.", "exits": {"north": "library"}, "items": ["key"]},
                "library": {"description": "Books.", "actions": {"read book": "Dull."}}
            }}"#,
        )
        .expect("parse");
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.destination("hallway", "north"), Some("library"));
        assert_eq!(
            graph.node("library").expect("library").actions["read book"],
            "Dull."
        );
    }

    #[test]
    fn from_json_rejects_dangling_exit() {
        let result = LocationGraph::from_json(
            r#"{"nodes": {"hallway": {"description": "Hall.", "exits": {"north": "attic"}}}}"#,
        );
        assert!(matches!(result, Err(CoreError::UnknownNode(ref id)) if id == "attic"));
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            LocationGraph::from_json("{not json"),
            Err(CoreError::Serialization(_))
        ));
    }

    #[test]
    fn json_round_trip_is_exact() {
        let mut graph = two_rooms();
        graph.add_transition("hallway", "north", "library").expect("t");
        graph.place_item("library", "book").expect("place");
        graph.place_item("library", "book").expect("place");
        graph
            .update_node(
                "library",
                NodeUpdate::new().actions(BTreeMap::from([(
                    "read book".to_string(),
                    "You learn nothing.".to_string(),
                )])),
            )
            .expect("update");

        let json = graph.to_json().expect("encode");
        let restored = LocationGraph::from_json(&json).expect("decode");
        assert_eq!(restored, graph);
    }
}
