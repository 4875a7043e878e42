//! Store Module
//!
//! The store is the only shared mutable resource in the server. Every
//! connection task holds an `Arc<dyn Store>` handed to it by the listener,
//! and every completed `add` becomes one [`Record`] in it.
//!
//! ## Implementations
//!
//! - [`MemoryStore`]: rows live in process memory (default, used by tests)
//! - [`FileStore`]: rows are appended to a JSON-lines file and replayed on startup
//!
//! ## Contract
//!
//! ```text
//! ensure_schema()      idempotent, called once before serving
//! create(NewRecord)    -> id        (1, 2, 3, ... per successful create)
//! list_all()           -> [Record]  (ordered by id)
//! get_by_id(id)        -> Option<Record>
//! update(Record)       -> bool      (not reachable from the protocol)
//! delete(id)           -> bool      (not reachable from the protocol)
//! ```
//!
//! A create either stores a fully populated row or fails without leaving
//! anything behind. Concurrent creates from different connections are
//! made atomic by the implementation, not by the caller.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length (in characters) of a record's command label.
pub const MAX_LABEL_LEN: usize = 100;

/// Format used when a timestamp is rendered in a response.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A persisted row representing one completed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier assigned by the store
    pub id: u64,
    /// Label of the operation that produced this row
    pub command: String,
    /// Result of the operation
    pub result: i32,
    /// When the row was created
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// Renders the timestamp the way responses show it.
    pub fn timestamp(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// A row that has not been assigned an identifier yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub command: String,
    pub result: i32,
    /// Defaults to the creation time when `None`
    pub created_at: Option<DateTime<Utc>>,
}

impl NewRecord {
    /// Creates a row stamped by the store at creation time.
    pub fn new(command: impl Into<String>, result: i32) -> Self {
        Self {
            command: command.into(),
            result,
            created_at: None,
        }
    }

    /// Sets an explicit timestamp.
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Checks the constraints every store enforces before writing.
    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        check_label(&self.command)
    }

    /// Assigns an identifier, filling in the timestamp if missing.
    pub(crate) fn into_record(self, id: u64) -> Record {
        Record {
            id,
            command: self.command,
            result: self.result,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

pub(crate) fn check_label(label: &str) -> Result<(), StoreError> {
    if label.is_empty() {
        return Err(StoreError::Constraint("command label is empty".to_string()));
    }
    let len = label.chars().count();
    if len > MAX_LABEL_LEN {
        return Err(StoreError::Constraint(format!(
            "command label is {} characters (max: {})",
            len, MAX_LABEL_LEN
        )));
    }
    Ok(())
}

/// Errors reported by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored row could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The row violates a column constraint
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The store was used before `ensure_schema` completed
    #[error("store not initialized")]
    NotReady,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The persistence collaborator used by the command handler.
#[async_trait]
pub trait Store: Send + Sync {
    /// Prepares the backing storage. Safe to call more than once.
    async fn ensure_schema(&self) -> StoreResult<()>;

    /// Persists a new row and returns its identifier.
    async fn create(&self, record: NewRecord) -> StoreResult<u64>;

    /// Returns every row, ordered by identifier.
    async fn list_all(&self) -> StoreResult<Vec<Record>>;

    /// Looks up a single row.
    async fn get_by_id(&self, id: u64) -> StoreResult<Option<Record>>;

    /// Replaces the label and result of an existing row.
    ///
    /// Returns `false` if no row has that identifier.
    async fn update(&self, record: Record) -> StoreResult<bool>;

    /// Removes a row. Returns `false` if it did not exist.
    async fn delete(&self, id: u64) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_label_limits() {
        assert!(check_label("add").is_ok());
        assert!(check_label(&"x".repeat(MAX_LABEL_LEN)).is_ok());
        assert!(matches!(
            check_label(&"x".repeat(MAX_LABEL_LEN + 1)),
            Err(StoreError::Constraint(_))
        ));
        assert!(matches!(check_label(""), Err(StoreError::Constraint(_))));
    }

    #[test]
    fn test_into_record_keeps_explicit_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        let record = NewRecord::new("add", 7).at(ts).into_record(4);

        assert_eq!(record.id, 4);
        assert_eq!(record.created_at, ts);
        assert_eq!(record.timestamp(), "2024-03-01 12:30:05");
    }

    #[test]
    fn test_into_record_stamps_missing_timestamp() {
        let before = Utc::now();
        let record = NewRecord::new("add", 1).into_record(1);
        assert!(record.created_at >= before);
    }
}
