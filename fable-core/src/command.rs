//! Command interpreter: noisy player text to a typed [`Command`].
//!
//! Parsing is two-staged:
//!
//! 1. Normalize (trim + lowercase) and look the text up in a fixed table of
//!    canonical words and abbreviations. An exact hit wins immediately.
//! 2. Otherwise score every table key with a sequence-similarity ratio
//!    (`2·M / (|a| + |b|)`, where `M` counts characters in the recursively
//!    found longest common blocks) and keep the single best key scoring at
//!    or above the cutoff. Ties go to the earlier table entry.
//!
//! Input of the form `<verb> <object>` is resolved on its verb alone when
//! that verb names a command taking an object (`take key`, `get lamp`).
//!
//! Anything else is unrecognized, which is an ordinary outcome (`None`),
//! not an error.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CommandConfig;
use crate::error::Result;
use crate::world::WorldState;

/// Default similarity cutoff for approximate matches.
pub const DEFAULT_FUZZY_CUTOFF: f64 = 0.7;

/// A compass or vertical direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// North.
    North,
    /// South.
    South,
    /// East.
    East,
    /// West.
    West,
    /// Up.
    Up,
    /// Down.
    Down,
}

impl Direction {
    /// Exit name used for this direction in the location graph.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured player intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Walk through the exit named after `direction`.
    Move {
        /// Which way to go.
        direction: Direction,
    },
    /// Describe the current location.
    Look,
    /// List carried items.
    Inventory,
    /// Pick up an item lying at the current location; `None` takes
    /// everything there.
    Take {
        /// Item name, as typed.
        item: Option<String>,
    },
}

/// What applying a [`Command`] did to the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The player walked from one node to another.
    Moved {
        /// Node left behind.
        from: String,
        /// Node entered.
        to: String,
    },
    /// There is no exit that way; nothing changed.
    Blocked {
        /// Direction attempted.
        direction: Direction,
    },
    /// Text describing the current location.
    Described(String),
    /// Items currently carried.
    Inventory(Vec<String>),
    /// Items moved from the location into the inventory.
    Taken(Vec<String>),
    /// Nothing matching was lying here; nothing changed.
    NothingToTake {
        /// Item asked for, if any.
        item: Option<String>,
    },
}

impl Command {
    /// Short human-readable description, e.g. `"Moving north"`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Move { direction } => format!("Moving {direction}"),
            Self::Look => "Looking around".to_string(),
            Self::Inventory => "Checking inventory".to_string(),
            Self::Take { item: Some(item) } => format!("Taking {item}"),
            Self::Take { item: None } => "Taking everything".to_string(),
        }
    }

    /// Apply this command to the world.
    ///
    /// # Errors
    ///
    /// Propagates graph integrity errors; an impassable direction is
    /// [`CommandOutcome::Blocked`], not an error.
    pub fn apply(&self, world: &mut WorldState) -> Result<CommandOutcome> {
        match self {
            Self::Move { direction } => {
                let Some(to) = world
                    .graph()
                    .destination(world.location(), direction.as_str())
                    .map(str::to_string)
                else {
                    return Ok(CommandOutcome::Blocked {
                        direction: *direction,
                    });
                };
                let from = world.location().to_string();
                world.set_location(to.clone())?;
                debug!(%from, %to, "Player moved");
                Ok(CommandOutcome::Moved { from, to })
            }
            Self::Look => Ok(CommandOutcome::Described(look_text(world))),
            Self::Inventory => Ok(CommandOutcome::Inventory(world.inventory().to_vec())),
            Self::Take { item } => take(world, item.as_deref()),
        }
    }
}

fn take(world: &mut WorldState, item: Option<&str>) -> Result<CommandOutcome> {
    let lying: Vec<String> = world
        .current_node()
        .map(|node| node.items.clone())
        .unwrap_or_default();
    let wanted: Vec<String> = match item {
        Some(item) => lying.into_iter().filter(|i| i == item).take(1).collect(),
        None => lying,
    };
    if wanted.is_empty() {
        return Ok(CommandOutcome::NothingToTake {
            item: item.map(str::to_string),
        });
    }
    for name in &wanted {
        world.take_item_from_location(name)?;
    }
    debug!(items = ?wanted, location = world.location(), "Items taken");
    Ok(CommandOutcome::Taken(wanted))
}

fn look_text(world: &WorldState) -> String {
    let Some(node) = world.current_node() else {
        return String::new();
    };
    let mut text = node.description.clone();
    if !node.exits.is_empty() {
        let exits: Vec<&str> = node.exits.keys().map(String::as_str).collect();
        text.push_str(&format!("\nExits: {}.", exits.join(", ")));
    }
    if !node.items.is_empty() {
        text.push_str(&format!("\nYou see: {}.", node.items.join(", ")));
    }
    text
}

/// Maps raw player text to [`Command`]s.
#[derive(Debug, Clone)]
pub struct CommandInterpreter {
    table: Vec<(String, Command)>,
    cutoff: f64,
}

impl Default for CommandInterpreter {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_CUTOFF)
    }
}

impl CommandInterpreter {
    /// Interpreter with the standard vocabulary and the given cutoff.
    #[must_use]
    pub fn new(cutoff: f64) -> Self {
        let mv = |direction| Command::Move { direction };
        let table = [
            ("north", mv(Direction::North)),
            ("n", mv(Direction::North)),
            ("south", mv(Direction::South)),
            ("s", mv(Direction::South)),
            ("east", mv(Direction::East)),
            ("e", mv(Direction::East)),
            ("west", mv(Direction::West)),
            ("w", mv(Direction::West)),
            ("up", mv(Direction::Up)),
            ("u", mv(Direction::Up)),
            ("down", mv(Direction::Down)),
            ("d", mv(Direction::Down)),
            ("look", Command::Look),
            ("l", Command::Look),
            ("inventory", Command::Inventory),
            ("inv", Command::Inventory),
            ("i", Command::Inventory),
            ("take", Command::Take { item: None }),
            ("get", Command::Take { item: None }),
        ]
        .into_iter()
        .map(|(word, command)| (word.to_string(), command))
        .collect();

        Self { table, cutoff }
    }

    /// Interpreter configured from [`CommandConfig`].
    #[must_use]
    pub fn from_config(config: &CommandConfig) -> Self {
        Self::new(config.fuzzy_cutoff)
    }

    /// Add (or replace) a vocabulary entry. New words go to the end of the
    /// table, so they lose similarity ties to existing ones.
    #[must_use]
    pub fn with_entry(mut self, word: impl Into<String>, command: Command) -> Self {
        let word = word.into().trim().to_lowercase();
        match self.table.iter_mut().find(|(w, _)| *w == word) {
            Some(entry) => entry.1 = command,
            None => self.table.push((word, command)),
        }
        self
    }

    /// Parse raw text. Returns `None` when nothing matches closely enough.
    #[must_use]
    pub fn parse(&self, raw: &str) -> Option<Command> {
        let normalized = raw.trim().to_lowercase();

        if let Some((verb, object)) = normalized.split_once(char::is_whitespace) {
            if let Some(Command::Take { .. }) = self.lookup(verb) {
                return Some(Command::Take {
                    item: Some(object.trim().to_string()),
                });
            }
        }
        self.lookup(&normalized)
    }

    fn lookup(&self, normalized: &str) -> Option<Command> {
        if let Some((_, command)) = self.table.iter().find(|(word, _)| *word == normalized) {
            return Some(command.clone());
        }

        let mut best: Option<(f64, &str, &Command)> = None;
        for (word, command) in &self.table {
            let score = similarity(word, normalized);
            if score >= self.cutoff && best.is_none_or(|(top, _, _)| score > top) {
                best = Some((score, word, command));
            }
        }

        match best {
            Some((score, word, command)) => {
                debug!(input = %normalized, matched = word, score, "Approximate command match");
                Some(command.clone())
            }
            None => {
                debug!(input = %normalized, "Unrecognized command");
                None
            }
        }
    }
}

/// Sequence-similarity ratio in `[0, 1]` between two strings.
///
/// `2·M / (|a| + |b|)` where `M` is the number of characters in matching
/// blocks found by repeatedly taking the longest common substring and
/// recursing on both sides of it. Two empty strings score `1.0`.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = 2.0 * matching_chars(&a, &b) as f64 / total as f64;
    ratio
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_common_block(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`.
/// Among equally long blocks the one starting earliest in `a`, then in `b`, wins.
fn longest_common_block(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    let width = bhi - blo + 1;
    let mut prev = vec![0usize; width];
    let mut cur = vec![0usize; width];
    for i in alo..ahi {
        for j in blo..bhi {
            cur[j - blo + 1] = if a[i] == b[j] {
                let k = prev[j - blo] + 1;
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
                k
            } else {
                0
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    (best_i, best_j, best_k)
}
