//! SQLite store for per-user fridge inventories
//!
//! One row per user id. Uses parameterized queries exclusively (no SQL string
//! concatenation) and wraps every write in a transaction, so a failed update
//! leaves the previously stored inventory intact.

use crate::error::StoreError;
use crate::inventory::Inventory;
use rusqlite::{params, Connection, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Initialize the database schema
///
/// Creates the `fridges` table if it doesn't exist: one row per user, with
/// the full inventory serialized into a single JSON column that is read and
/// replaced wholesale on every update.
fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS fridges (
            uid TEXT PRIMARY KEY,
            inventory TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// Gateway to the per-user fridge rows.
///
/// Cheap to clone: clones share one connection behind a mutex (and the
/// per-user lock registry), so the store can be handed to worker threads the
/// same way the daemon shares its connection.
#[derive(Clone)]
pub struct FridgeStore {
    conn: Arc<Mutex<Connection>>,
    user_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl FridgeStore {
    /// Open (or create) the database at `path`.
    ///
    /// `busy_timeout` bounds how long any single operation waits on a locked
    /// database before surfacing [`StoreError::Unavailable`].
    pub fn open(path: &Path, busy_timeout: Duration) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        init_schema(&conn)?;
        log::info!("Opened fridge database: {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// Open a fresh in-memory database (used by tests).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already-configured connection. The schema must exist.
    pub(crate) fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            user_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetch the stored inventory for a user.
    ///
    /// Returns `None` when no row exists for `uid` -- distinct from
    /// `Some(empty)`, which means the user has a fridge with nothing in it.
    /// The stored JSON is validated here, at the deserialization boundary.
    pub fn fetch(&self, uid: &str) -> StoreResult<Option<Inventory>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT inventory FROM fridges WHERE uid = ?1")?;
        let mut rows = stmt.query(params![uid])?;

        match rows.next()? {
            Some(row) => {
                let encoded: String = row.get(0)?;
                let inventory =
                    serde_json::from_str(&encoded).map_err(|source| StoreError::Serde {
                        uid: uid.to_string(),
                        source,
                    })?;
                Ok(Some(inventory))
            }
            None => Ok(None),
        }
    }

    /// Insert an empty fridge row for `uid` if none exists.
    ///
    /// Idempotent: succeeds without touching anything when the row is already
    /// there (create-or-ignore semantics).
    pub fn create_if_absent(&self, uid: &str) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let created = tx.execute(
            "INSERT OR IGNORE INTO fridges (uid, inventory) VALUES (?1, '{}')",
            params![uid],
        )?;
        tx.commit()?;

        if created > 0 {
            log::info!("Created empty fridge for user {}", uid);
        }
        Ok(())
    }

    /// Overwrite the entire stored inventory for `uid`.
    ///
    /// All-or-nothing: runs in an immediate-mode transaction, and any failure
    /// (including a missing row) rolls back, leaving the prior value intact.
    pub fn replace(&self, uid: &str, inventory: &Inventory) -> StoreResult<()> {
        let encoded = serde_json::to_string(inventory).map_err(|source| StoreError::Serde {
            uid: uid.to_string(),
            source,
        })?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE fridges SET inventory = ?2, updated_at = datetime('now') WHERE uid = ?1",
            params![uid, encoded],
        )?;
        if changed == 0 {
            // Dropping the transaction rolls it back
            return Err(StoreError::NoRecord {
                uid: uid.to_string(),
            });
        }
        tx.commit()?;

        log::debug!(
            "Replaced inventory for user {} ({} items)",
            uid,
            inventory.len()
        );
        Ok(())
    }

    /// Per-user lock guarding the whole read-modify-write of one update.
    ///
    /// Callers acquire this before `fetch` and hold it through `replace`:
    /// concurrent updates for the same uid serialize, while different uids
    /// get independent locks. The registry never shrinks, which is fine at
    /// one-entry-per-user cardinality.
    pub fn user_lock(&self, uid: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().unwrap();
        locks.entry(uid.to_string()).or_default().clone()
    }

    /// Total number of fridge rows in the database
    pub fn fridge_count(&self) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row("SELECT COUNT(*) FROM fridges", [], |row| row.get(0))?;
        Ok(count)
    }
}
