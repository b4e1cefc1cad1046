//! Session persistence.
//!
//! A [`SessionState`] is the serialisable form of a [`WorldState`] plus the
//! id of the save slot it belongs to. [`SqliteSessionStore`] keeps one row
//! per session:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS sessions (
//!     session_id TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```
//!
//! The payload is JSON, so the schema does not change when the world model
//! grows new fields. An optional CRC-32 of the payload flags corrupted saves.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{CoreError, Result};
use crate::graph::LocationGraph;
use crate::memory::NarrativeMemory;
use crate::types::SessionId;
use crate::world::WorldState;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Everything needed to resume a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Save slot.
    pub id: SessionId,
    /// Location graph, including any edits made during play.
    pub graph: LocationGraph,
    /// Narrative memory, oldest first.
    pub memory: NarrativeMemory,
    /// Player location.
    pub location: String,
    /// Player inventory in pickup order.
    pub inventory: Vec<String>,
    /// World flags.
    pub flags: BTreeMap<String, bool>,
}

impl SessionState {
    /// Capture a copy of `world` under `id`.
    #[must_use]
    pub fn capture(id: SessionId, world: &WorldState) -> Self {
        Self {
            id,
            graph: world.graph().clone(),
            memory: world.memory().clone(),
            location: world.location().to_string(),
            inventory: world.inventory().to_vec(),
            flags: world.flags().clone(),
        }
    }

    /// Rebuild the live world.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownNode`] if the saved location or an exit no longer
    /// resolves.
    pub fn into_world(self) -> Result<WorldState> {
        WorldState::from_parts(
            self.graph,
            self.memory,
            self.location,
            self.inventory,
            self.flags,
        )
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Storage backend for session saves.
pub trait SessionStore {
    /// Load a session, or `None` if nothing is saved under `id`.
    ///
    /// # Errors
    ///
    /// Storage or decoding failures.
    fn load(&self, id: &SessionId) -> Result<Option<SessionState>>;

    /// Save (upsert) a session.
    ///
    /// # Errors
    ///
    /// Storage or encoding failures.
    fn save(&self, state: &SessionState) -> Result<()>;
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// CRC-32 (ISO 3309, reflected polynomial).
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SqliteSessionStore
// ---------------------------------------------------------------------------

/// [`SessionStore`] backed by a SQLite file.
///
/// ```no_run
/// # use fable_core::persistence::{SqliteSessionStore, SessionStore};
/// # use fable_core::config::PersistenceConfig;
/// # use fable_core::types::SessionId;
/// let store = SqliteSessionStore::open("saves.db", &PersistenceConfig::default())?;
/// let loaded = store.load(&SessionId::new())?;
/// assert!(loaded.is_none());
/// # Ok::<(), fable_core::error::CoreError>(())
/// ```
pub struct SqliteSessionStore {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSessionStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqliteSessionStore {
    /// Open (or create) a save database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;
        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Session store opened"
        );

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Delete a saved session. Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn delete(&self, id: &SessionId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM sessions WHERE session_id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    /// Ids of all saved sessions, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] on SQLite failures.
    pub fn list_sessions(&self) -> Result<Vec<SessionId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT session_id FROM sessions ORDER BY updated_at DESC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            let raw = row?;
            match raw.parse::<SessionId>() {
                Ok(id) => ids.push(id),
                Err(_) => warn!(id = %raw, "Skipping row with invalid session id"),
            }
        }
        Ok(ids)
    }

    /// Path of the database file (`:memory:` for in-memory stores).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run SQLite's integrity check.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

impl SessionStore for SqliteSessionStore {
    fn load(&self, id: &SessionId) -> Result<Option<SessionState>> {
        let start = Instant::now();
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data, checksum FROM sessions WHERE session_id = ?1")?;

        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![id.to_string()], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        session = %id,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch, save may be corrupted"
                    );
                }
            }
        }

        let state: SessionState =
            serde_json::from_slice(&data).map_err(|e| CoreError::Serialization(e.to_string()))?;

        debug!(
            session = %id,
            bytes = data.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded session"
        );
        Ok(Some(state))
    }

    fn save(&self, state: &SessionState) -> Result<()> {
        let start = Instant::now();
        let json =
            serde_json::to_vec(state).map_err(|e| CoreError::Serialization(e.to_string()))?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO sessions (session_id, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![state.id.to_string(), json, now, checksum],
        )?;

        debug!(
            session = %state.id,
            location = %state.location,
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved session"
        );
        Ok(())
    }
}

/// Adds `.optional()` to `rusqlite::Result`, mapping `QueryReturnedNoRows`
/// to `Ok(None)`.
trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
