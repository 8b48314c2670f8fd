//! Persistence module for alert storage
//!
//! Alerts produced by an analysis run are appended to a store and can later
//! be queried by source address and detection date.

pub mod sqlite_store;

pub use sqlite_store::SqliteAlertStore;

use chrono::{DateTime, NaiveDate, Utc};
use crate::models::{BurstAlert, StoredAlert};
use thiserror::Error;

/// Errors that can occur during persistence operations
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid data in database: {0}")]
    InvalidData(String),

    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// Filter for stored alerts
///
/// `from` starts at midnight of that day; `to` runs through the last
/// millisecond of its day. Either bound may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertQuery {
    pub address: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AlertQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_address(address: impl Into<String>) -> Self {
        AlertQuery {
            address: Some(address.into()),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Inclusive lower bound of the detection time
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.from
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// Inclusive upper bound of the detection time
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.to
            .and_then(|day| day.and_hms_milli_opt(23, 59, 59, 999))
            .map(|naive| naive.and_utc())
    }
}

/// Trait for alert persistence backends
///
/// Implementations are shared between concurrent analysis runs, so they
/// must be `Send + Sync`.
pub trait AlertStore: Send + Sync {
    /// Append an alert and return the stored record
    fn create(&self, alert: &BurstAlert) -> Result<StoredAlert, PersistenceError>;

    /// Fetch alerts matching the query, newest detection first
    fn query(&self, query: &AlertQuery) -> Result<Vec<StoredAlert>, PersistenceError>;

    /// Clear all data (useful for testing)
    fn clear_all(&self) -> Result<(), PersistenceError>;
}
