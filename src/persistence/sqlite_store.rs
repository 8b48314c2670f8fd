//! SQLite implementation of the AlertStore trait

use super::{AlertQuery, AlertStore, PersistenceError};
use crate::models::{BurstAlert, StoredAlert};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// id, source_address, attempt_count, window_seconds, detected_at
type AlertRow = (i64, String, i64, f64, i64);

/// SQLite-based alert storage
///
/// Detection times are stored as epoch milliseconds so range filters and
/// ordering happen in SQL.
pub struct SqliteAlertStore {
    conn: Mutex<Connection>,
}

impl SqliteAlertStore {
    /// Create a new SQLite alert store at the specified path
    ///
    /// Creates the database file and initializes the schema if it doesn't exist.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(db_path)?;
        let store = SqliteAlertStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (useful for testing)
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteAlertStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<(), PersistenceError> {
        let conn = self.lock()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.conn.lock().map_err(|_| PersistenceError::LockPoisoned)
    }

    /// Helper to rebuild a detection time from stored milliseconds
    fn parse_millis(millis: i64) -> Result<DateTime<Utc>, PersistenceError> {
        DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            PersistenceError::InvalidData(format!("Invalid detection time: {}", millis))
        })
    }

    /// Build a stored alert from a raw row
    fn stored_from_row(row: AlertRow) -> Result<StoredAlert, PersistenceError> {
        let (id, source_address, attempt_count, window_seconds, detected_at) = row;
        let attempt_count = usize::try_from(attempt_count).map_err(|_| {
            PersistenceError::InvalidData(format!("Invalid attempt count: {}", attempt_count))
        })?;

        Ok(StoredAlert {
            id,
            alert: BurstAlert {
                source_address,
                attempt_count,
                window_seconds,
                detected_at: Self::parse_millis(detected_at)?,
            },
        })
    }
}

impl AlertStore for SqliteAlertStore {
    fn create(&self, alert: &BurstAlert) -> Result<StoredAlert, PersistenceError> {
        let detected_millis = alert.detected_at.timestamp_millis();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO burst_alerts (source_address, attempt_count, window_seconds, detected_at)
             VALUES (?, ?, ?, ?)",
            params![
                alert.source_address,
                alert.attempt_count as i64,
                alert.window_seconds,
                detected_millis
            ],
        )?;

        // Hand back the detection time as stored, at millisecond precision
        Ok(StoredAlert {
            id: conn.last_insert_rowid(),
            alert: BurstAlert {
                detected_at: Self::parse_millis(detected_millis)?,
                ..alert.clone()
            },
        })
    }

    fn query(&self, query: &AlertQuery) -> Result<Vec<StoredAlert>, PersistenceError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, source_address, attempt_count, window_seconds, detected_at
             FROM burst_alerts
             WHERE (?1 IS NULL OR source_address = ?1)
               AND (?2 IS NULL OR detected_at >= ?2)
               AND (?3 IS NULL OR detected_at <= ?3)
             ORDER BY detected_at DESC, id DESC",
        )?;

        let rows = stmt
            .query_map(
                params![
                    query.address,
                    query.start().map(|t| t.timestamp_millis()),
                    query.end().map(|t| t.timestamp_millis())
                ],
                |row| {
                    let id: i64 = row.get(0)?;
                    let source_address: String = row.get(1)?;
                    let attempt_count: i64 = row.get(2)?;
                    let window_seconds: f64 = row.get(3)?;
                    let detected_at: i64 = row.get(4)?;
                    Ok((id, source_address, attempt_count, window_seconds, detected_at))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(Self::stored_from_row).collect()
    }

    fn clear_all(&self) -> Result<(), PersistenceError> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM burst_alerts;")?;
        Ok(())
    }
}
