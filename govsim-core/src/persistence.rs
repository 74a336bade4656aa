//! SQLite save store.
//!
//! Each save is a whole [`State`] serialised to JSON, stored verbatim with
//! some metadata for listing:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS saves (
//!     save_id        TEXT PRIMARY KEY,
//!     seq            INTEGER NOT NULL,
//!     name           TEXT NOT NULL,
//!     turn           INTEGER NOT NULL,
//!     node_id        TEXT NOT NULL,
//!     format_version TEXT NOT NULL,
//!     saved_at       TEXT NOT NULL,
//!     data           BLOB NOT NULL,
//!     checksum       TEXT
//! );
//! ```
//!
//! - Loading hands back a state equal to the one saved; there is no format
//!   migration.
//! - At most `max_saves` rows are kept. Saving at capacity evicts the oldest
//!   save (lowest `seq`) first.
//! - An optional CRC-32 detects corruption; a mismatch is logged, not fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, params};
use serde::Serialize;
use tracing::{Level, debug, info, span, warn};
use uuid::Uuid;

use crate::config::PersistenceConfig;
use crate::error::{Result, SimError};
use crate::state::State;
use crate::telemetry::{SimCounters, spans};
use crate::types::{SaveId, Turn};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS saves (
    save_id        TEXT PRIMARY KEY,
    seq            INTEGER NOT NULL,
    name           TEXT NOT NULL,
    turn           INTEGER NOT NULL,
    node_id        TEXT NOT NULL,
    format_version TEXT NOT NULL,
    saved_at       TEXT NOT NULL,
    data           BLOB NOT NULL,
    checksum       TEXT
);";

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as lowercase hex.
fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// CRC-32 (ISO 3309 / ITU-T V.42), bitwise.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SaveStore
// ---------------------------------------------------------------------------

/// Listing entry for a stored save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMeta {
    /// Save id.
    pub id: SaveId,
    /// User-chosen name.
    pub name: String,
    /// Turn the state was on.
    pub turn: Turn,
    /// Node the state was on.
    pub node_id: String,
    /// Format version the row was written with.
    pub format_version: String,
    /// When the save was written.
    pub saved_at: DateTime<Utc>,
}

/// Handle to an open save database.
///
/// ```no_run
/// # use govsim_core::persistence::SaveStore;
/// # use govsim_core::config::PersistenceConfig;
/// # fn demo(state: &govsim_core::State) -> govsim_core::error::Result<()> {
/// let store = SaveStore::open("saves.db", &PersistenceConfig::default())?;
/// let id = store.save(state, "before the vote")?;
/// let restored = store.load(&id)?;
/// assert_eq!(restored.as_ref(), Some(state));
/// # Ok(())
/// # }
/// ```
pub struct SaveStore {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
    counters: Option<Arc<SimCounters>>,
}

impl std::fmt::Debug for SaveStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SaveStore {
    /// Open (or create) a save database at `path`.
    ///
    /// # Errors
    /// [`SimError::Database`] on SQLite failures.
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

        info!(path = %db_path.display(), wal = config.wal_mode, "save store opened");
        Ok(Self { conn, config: config.clone(), db_path, counters: None })
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// [`SimError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
            counters: None,
        })
    }

    /// Report saves and loads into shared counters.
    #[must_use]
    pub fn with_counters(mut self, counters: Arc<SimCounters>) -> Self {
        self.counters = Some(counters);
        self
    }

    fn bump(&self, pick: impl Fn(&SimCounters) -> &std::sync::atomic::AtomicU64) {
        if let Some(c) = &self.counters {
            SimCounters::add(pick(c), 1);
        }
    }

    // ------------------------------------------------------------------
    // Core operations
    // ------------------------------------------------------------------

    /// Store `state` under `name`, evicting the oldest saves if at capacity.
    ///
    /// # Errors
    /// [`SimError::Serialization`] if encoding fails, [`SimError::Database`]
    /// on SQLite failures.
    pub fn save(&self, state: &State, name: &str) -> Result<SaveId> {
        let span = span!(Level::DEBUG, spans::PERSIST_SAVE, turn = state.turn);
        let _enter = span.enter();
        let start = Instant::now();
        let json = serde_json::to_vec(state)?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
        let id = SaveId::new();

        let tx = self.conn.unchecked_transaction()?;
        let mut count = count_rows(&tx)?;
        while count >= self.config.max_saves {
            let oldest: Option<String> = tx
                .query_row("SELECT save_id FROM saves ORDER BY seq ASC LIMIT 1", [], |row| row.get(0))
                .optional()?;
            let Some(oldest) = oldest else { break };
            tx.execute("DELETE FROM saves WHERE save_id = ?1", params![oldest])?;
            info!(evicted = %oldest, max_saves = self.config.max_saves, "save evicted at capacity");
            self.bump(|c| &c.saves_evicted);
            count -= 1;
        }

        let seq: i64 =
            tx.query_row("SELECT COALESCE(MAX(seq), 0) + 1 FROM saves", [], |row| row.get(0))?;
        tx.execute(
            "INSERT INTO saves (save_id, seq, name, turn, node_id, format_version, saved_at, data, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id.0.to_string(),
                seq,
                name,
                state.turn,
                state.current_node_id,
                self.config.format_version,
                Utc::now().to_rfc3339(),
                json,
                checksum,
            ],
        )?;
        tx.commit()?;
        self.bump(|c| &c.saves_completed);

        debug!(
            save = %id,
            name,
            turn = state.turn,
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "state saved"
        );
        Ok(id)
    }

    /// Load a save. `None` if no such save exists.
    ///
    /// # Errors
    /// [`SimError::Serialization`] if the stored JSON is not a state,
    /// [`SimError::Database`] on SQLite failures.
    pub fn load(&self, id: &SaveId) -> Result<Option<State>> {
        let span = span!(Level::DEBUG, spans::PERSIST_LOAD);
        let _enter = span.enter();
        let start = Instant::now();
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data, checksum, format_version FROM saves WHERE save_id = ?1")?;
        let row: Option<(Vec<u8>, Option<String>, String)> = stmt
            .query_row(params![id.0.to_string()], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .optional()?;

        let Some((data, stored_checksum, version)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(save = %id, %expected, %actual, "checksum mismatch, possible save corruption");
                }
            }
        }
        if version != self.config.format_version {
            warn!(save = %id, stored = %version, current = %self.config.format_version, "format version differs");
        }

        let state: State = serde_json::from_slice(&data)?;
        self.bump(|c| &c.loads_completed);
        debug!(save = %id, turn = state.turn, elapsed_us = start.elapsed().as_micros(), "state loaded");
        Ok(Some(state))
    }

    /// Rename a save.
    ///
    /// # Errors
    /// [`SimError::SaveNotFound`] if the id is unknown.
    pub fn rename(&self, id: &SaveId, name: &str) -> Result<()> {
        let updated = self
            .conn
            .execute("UPDATE saves SET name = ?1 WHERE save_id = ?2", params![name, id.0.to_string()])?;
        if updated == 0 {
            return Err(SimError::SaveNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Delete a save. Returns whether a row was removed.
    ///
    /// # Errors
    /// [`SimError::Database`] on SQLite failures.
    pub fn delete(&self, id: &SaveId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM saves WHERE save_id = ?1", params![id.0.to_string()])?;
        Ok(deleted > 0)
    }

    /// All saves, oldest first.
    ///
    /// # Errors
    /// [`SimError::Database`] on SQLite failures.
    pub fn list(&self) -> Result<Vec<SaveMeta>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT save_id, name, turn, node_id, format_version, saved_at
             FROM saves ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Turn>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut saves = Vec::new();
        for row in rows {
            let (id, name, turn, node_id, format_version, saved_at) = row?;
            let Ok(uuid) = Uuid::parse_str(&id) else {
                warn!(id = %id, "skipping row with invalid save id");
                continue;
            };
            let saved_at = DateTime::parse_from_rfc3339(&saved_at)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_default();
            saves.push(SaveMeta { id: SaveId(uuid), name, turn, node_id, format_version, saved_at });
        }
        Ok(saves)
    }

    /// Number of stored saves.
    ///
    /// # Errors
    /// [`SimError::Database`] on SQLite failures.
    pub fn count(&self) -> Result<usize> {
        count_rows(&self.conn)
    }

    // ------------------------------------------------------------------
    // Utility
    // ------------------------------------------------------------------

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    /// [`SimError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;
        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "save store backup completed"
        );
        Ok(())
    }

    /// Path to the database file, or `:memory:`.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn count_rows(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM saves", [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or(0))
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
