//! # fable-session: Play Sessions for Fable
//!
//! Wires the game-agnostic `fable-core` world model and the `fable-llm`
//! narrative pipeline into a playable session.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              fable-session               │
//! │  ┌──────────────┐   ┌─────────────────┐  │
//! │  │ Definition   │──►│     Session     │  │
//! │  │ (TOML world) │   │  play_turn()    │  │
//! │  └──────────────┘   └───────┬─────────┘  │
//! │            ┌────────────────┴──────┐     │
//! │            ▼                       ▼     │
//! │    ┌──────────────┐       ┌────────────┐ │
//! │    │  fable-core  │       │ fable-llm  │ │
//! │    └──────────────┘       └────────────┘ │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `definition`: world files: nodes, scene styles, event rules
//! - `session`: the turn pipeline and save/restore
//! - `error`: session errors

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod definition;
pub mod error;
pub mod session;

pub use definition::{NodeDefinition, SceneStyle, WorldDefinition};
pub use error::{Result, SessionError};
pub use session::{Response, Session, TurnReport};
