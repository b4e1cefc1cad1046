//! # Fable Core Library
//!
//! Game-agnostic core of a text adventure:
//!
//! - [`LocationGraph`]: named locations connected by named exits, with
//!   referential integrity enforced on every mutation
//! - [`CommandInterpreter`]: free text to a closed [`Command`] set, with
//!   approximate matching for typos
//! - [`EventEngine`]: condition/action rules over [`WorldState`], plus
//!   declarative [`EventRule`]s loadable from world files
//! - [`NarrativeMemory`]: ordered log of narrated events, rendered as
//!   context for text generation
//! - [`persistence`]: session saves in SQLite
//!
//! Nothing here performs I/O except [`persistence`] and
//! [`FableConfig::from_file`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod memory;
pub mod persistence;
pub mod rules;
pub mod types;
pub mod world;

pub use command::{Command, CommandInterpreter, CommandOutcome, Direction};
pub use config::FableConfig;
pub use error::{CoreError, Result};
pub use event::{Event, EventEngine};
pub use graph::{LocationGraph, Node, NodeUpdate};
pub use memory::NarrativeMemory;
pub use persistence::{SessionState, SessionStore, SqliteSessionStore};
pub use rules::{EventRule, ExitSpec};
pub use types::SessionId;
pub use world::WorldState;
