//! Sequence counter stores and SKU minting
//!
//! Two stores are available:
//! - `FileSequenceStore`: a plain-text file holding one integer. Read,
//!   increment and write are separate steps with no locking, so two runs
//!   started at the same time can mint the same SKU.
//! - `SqliteSequenceStore`: one row in SQLite, incremented inside an
//!   `IMMEDIATE` transaction. Concurrent runs serialize on the write lock.

use crate::error::{ListerError, Result};
use crate::models::Sku;
use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Default file name of the plain-text counter
pub const DEFAULT_COUNTER_FILE: &str = "sequential_number.txt";

/// Row key used in the SQLite `sequence` table
const SKU_SEQUENCE: &str = "sku";

/// A persisted, monotonically increasing counter
pub trait SequenceStore {
    /// Increment the stored value and return the new one
    fn advance(&self) -> Result<u64>;

    /// Create the store holding `value`; an existing store is only reset with `force`
    fn initialize(&self, value: u64, force: bool) -> Result<()>;

    /// Where the counter lives, for log messages
    fn location(&self) -> &Path;
}

/// Counter kept as text in a single file
#[derive(Debug, Clone)]
pub struct FileSequenceStore {
    path: PathBuf,
}

impl FileSequenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_current(&self) -> Result<u64> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ListerError::StoreNotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        content
            .trim()
            .parse::<u64>()
            .map_err(|_| ListerError::CounterParse {
                path: self.path.clone(),
                content,
            })
    }
}

impl SequenceStore for FileSequenceStore {
    fn advance(&self) -> Result<u64> {
        let current = self.read_current()?;
        let next = current
            .checked_add(1)
            .ok_or_else(|| ListerError::CounterExhausted {
                path: self.path.clone(),
                value: current.to_string(),
            })?;
        std::fs::write(&self.path, next.to_string())?;
        log::debug!("Counter {} advanced to {}", self.path.display(), next);
        Ok(next)
    }

    fn initialize(&self, value: u64, force: bool) -> Result<()> {
        if self.path.exists() && !force {
            return Err(ListerError::Config(format!(
                "counter file {} already exists (use --force to reset it)",
                self.path.display()
            )));
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, value.to_string())?;
        log::info!("Counter {} set to {}", self.path.display(), value);
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// Counter kept in a SQLite database
pub struct SqliteSequenceStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteSequenceStore {
    /// Open (or create) the database and make sure the schema exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                log::info!("Created directory: {}", parent.display());
            }
        }

        let conn = Connection::open(&path)?;
        // Concurrent runs wait for the write lock instead of failing immediately
        conn.busy_timeout(Duration::from_secs(10))?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Create the `sequence` table if it doesn't exist
fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sequence (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )
}

impl SequenceStore for SqliteSequenceStore {
    fn advance(&self) -> Result<u64> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<i64> = tx
            .query_row(
                "SELECT value FROM sequence WHERE name = ?1",
                params![SKU_SEQUENCE],
                |row| row.get(0),
            )
            .optional()?;

        let Some(current) = current else {
            return Err(ListerError::StoreNotFound(self.path.clone()));
        };

        // Dropping `tx` on the error path rolls back, leaving the row as it was
        let next = current
            .checked_add(1)
            .ok_or_else(|| ListerError::CounterExhausted {
                path: self.path.clone(),
                value: current.to_string(),
            })?;
        tx.execute(
            "UPDATE sequence SET value = ?1, updated_at = datetime('now') WHERE name = ?2",
            params![next, SKU_SEQUENCE],
        )?;
        tx.commit()?;

        log::debug!("Counter {} advanced to {}", self.path.display(), next);
        u64::try_from(next).map_err(|_| ListerError::CounterParse {
            path: self.path.clone(),
            content: next.to_string(),
        })
    }

    fn initialize(&self, value: u64, force: bool) -> Result<()> {
        let stored = i64::try_from(value)
            .map_err(|_| ListerError::Config(format!("counter value {value} is too large")))?;

        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM sequence WHERE name = ?1",
            params![SKU_SEQUENCE],
            |row| row.get(0),
        )?;
        if exists && !force {
            return Err(ListerError::Config(format!(
                "counter in {} already exists (use --force to reset it)",
                self.path.display()
            )));
        }

        tx.execute(
            "INSERT OR REPLACE INTO sequence (name, value, updated_at)
             VALUES (?1, ?2, datetime('now'))",
            params![SKU_SEQUENCE, stored],
        )?;
        tx.commit()?;

        log::info!("Counter {} set to {}", self.path.display(), value);
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// Mints date-prefixed SKUs from a sequence store
pub struct SkuMinter {
    store: Box<dyn SequenceStore>,
}

impl SkuMinter {
    pub fn new(store: Box<dyn SequenceStore>) -> Self {
        Self { store }
    }

    /// Spend one counter value and build the SKU for `date`
    pub fn next(&self, date: NaiveDate) -> Result<Sku> {
        let sequence = self.store.advance()?;
        let sku = Sku::new(date, sequence);
        log::info!("Minted SKU {} from {}", sku, self.store.location().display());
        Ok(sku)
    }

    /// Same as `next` using the local calendar date
    pub fn next_today(&self) -> Result<Sku> {
        self.next(Local::now().date_naive())
    }
}

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;
