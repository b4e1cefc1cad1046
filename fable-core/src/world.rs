//! World state: the typed snapshot that commands and events operate on.
//!
//! Everything a condition may read and an action may change lives here:
//! the player's location, inventory and flags, plus handles to the
//! [`LocationGraph`] and [`NarrativeMemory`]. Graph edits go through
//! methods on [`WorldState`] so the player can never be left standing in a
//! node that no longer exists.

use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::graph::{LocationGraph, Node, NodeUpdate};
use crate::memory::NarrativeMemory;

/// Mutable state of one play session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldState {
    graph: LocationGraph,
    memory: NarrativeMemory,
    location: String,
    inventory: Vec<String>,
    flags: BTreeMap<String, bool>,
}

impl WorldState {
    /// Start a new session at `start` with empty inventory, flags, and memory.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownNode`] if `start` is not in the graph.
    pub fn new(graph: LocationGraph, start: impl Into<String>) -> Result<Self> {
        Self::from_parts(
            graph,
            NarrativeMemory::new(),
            start,
            Vec::new(),
            BTreeMap::new(),
        )
    }

    /// Reassemble a world from previously saved parts.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownNode`] if `location` is not in the graph or the
    /// graph holds a dangling exit.
    pub fn from_parts(
        graph: LocationGraph,
        memory: NarrativeMemory,
        location: impl Into<String>,
        inventory: Vec<String>,
        flags: BTreeMap<String, bool>,
    ) -> Result<Self> {
        let location = location.into();
        graph.validate()?;
        if !graph.contains(&location) {
            return Err(CoreError::UnknownNode(location));
        }
        Ok(Self {
            graph,
            memory,
            location,
            inventory,
            flags,
        })
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// Id of the node the player is standing in.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The node the player is standing in.
    #[must_use]
    pub fn current_node(&self) -> Option<&Node> {
        self.graph.node(&self.location)
    }

    /// Items carried by the player, in pickup order.
    #[must_use]
    pub fn inventory(&self) -> &[String] {
        &self.inventory
    }

    /// Whether the player carries at least one `item`.
    #[must_use]
    pub fn has_item(&self, item: &str) -> bool {
        self.inventory.iter().any(|i| i == item)
    }

    /// Value of a flag; unset flags read as `false`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// All flags that have been set (to either value).
    #[must_use]
    pub fn flags(&self) -> &BTreeMap<String, bool> {
        &self.flags
    }

    /// Read-only graph handle.
    #[must_use]
    pub fn graph(&self) -> &LocationGraph {
        &self.graph
    }

    /// Read-only memory handle.
    #[must_use]
    pub fn memory(&self) -> &NarrativeMemory {
        &self.memory
    }

    // ------------------------------------------------------------------
    // Player state
    // ------------------------------------------------------------------

    /// Move the player to `node`.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownNode`] if `node` is not in the graph.
    pub fn set_location(&mut self, node: impl Into<String>) -> Result<()> {
        let node = node.into();
        if !self.graph.contains(&node) {
            return Err(CoreError::UnknownNode(node));
        }
        self.location = node;
        Ok(())
    }

    /// Give the player an item.
    pub fn add_item(&mut self, item: impl Into<String>) {
        self.inventory.push(item.into());
    }

    /// Take one `item` away from the player.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownItem`] if the player does not carry it.
    pub fn remove_item(&mut self, item: &str) -> Result<String> {
        let index = self
            .inventory
            .iter()
            .position(|i| i == item)
            .ok_or_else(|| CoreError::UnknownItem(item.to_string()))?;
        Ok(self.inventory.remove(index))
    }

    /// Move `item` from the current location into the inventory.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownItem`] if the item is not lying here.
    pub fn take_item_from_location(&mut self, item: &str) -> Result<()> {
        let taken = self.graph.take_item(&self.location, item)?;
        self.inventory.push(taken);
        Ok(())
    }

    /// Set a flag.
    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    /// Mutable memory handle.
    pub fn memory_mut(&mut self) -> &mut NarrativeMemory {
        &mut self.memory
    }

    // ------------------------------------------------------------------
    // Graph edits
    // ------------------------------------------------------------------

    /// See [`LocationGraph::add_node`].
    ///
    /// # Errors
    ///
    /// Same as [`LocationGraph::add_node`].
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        self.graph.add_node(node)
    }

    /// See [`LocationGraph::remove_node`]. The current location cannot be removed.
    ///
    /// # Errors
    ///
    /// [`CoreError::OccupiedNode`] for the current location, otherwise the
    /// same as [`LocationGraph::remove_node`].
    pub fn remove_node(&mut self, id: &str) -> Result<Node> {
        if id == self.location {
            return Err(CoreError::OccupiedNode(id.to_string()));
        }
        self.graph.remove_node(id)
    }

    /// See [`LocationGraph::update_node`].
    ///
    /// # Errors
    ///
    /// Same as [`LocationGraph::update_node`].
    pub fn update_node(&mut self, id: &str, update: NodeUpdate) -> Result<()> {
        self.graph.update_node(id, update)
    }

    /// See [`LocationGraph::add_transition`].
    ///
    /// # Errors
    ///
    /// Same as [`LocationGraph::add_transition`].
    pub fn add_transition(&mut self, from: &str, exit: &str, to: &str) -> Result<()> {
        self.graph.add_transition(from, exit, to)
    }

    /// See [`LocationGraph::remove_transition`].
    ///
    /// # Errors
    ///
    /// Same as [`LocationGraph::remove_transition`].
    pub fn remove_transition(&mut self, from: &str, exit: &str) -> Result<String> {
        self.graph.remove_transition(from, exit)
    }

    /// Split the world back into its parts (graph, memory, location, inventory, flags).
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        LocationGraph,
        NarrativeMemory,
        String,
        Vec<String>,
        BTreeMap<String, bool>,
    ) {
        (
            self.graph,
            self.memory,
            self.location,
            self.inventory,
            self.flags,
        )
    }
}
