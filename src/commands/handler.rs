//! Command Handler Module
//!
//! Executes parsed commands against the store and builds the response.
//!
//! ## Commands
//!
//! - `add a b`: computes `a + b` with overflow checking and persists it as a
//!   record labelled `add`. An overflowing sum is refused and nothing is stored.
//! - `getall`: returns every stored record.
//! - anything else: the fixed command error.
//!
//! Store failures are logged here and turned into [`Response::StoreFailure`];
//! they never end the connection.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  Command    │───>│  dispatch   │───>│  Response   │     │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘     │
//! │                            │                                │
//! │                            ▼                                │
//! │                      Arc<dyn Store>                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::protocol::{Command, Response};
use crate::store::{NewRecord, Record, Store};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Executes commands against a shared store.
///
/// Cloning is cheap; every connection gets its own clone.
#[derive(Clone)]
pub struct CommandHandler {
    store: Arc<dyn Store>,
}

impl CommandHandler {
    /// Creates a new command handler with the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Executes a command and returns the response.
    pub async fn execute(&self, command: Command) -> Response {
        match &command {
            Command::Add(a, b) => self.cmd_add(command.label(), *a, *b).await,
            Command::ListAll => self.cmd_getall().await,
            Command::Unknown(label) => {
                debug!(command = %label, "Unknown command");
                Response::CommandError
            }
        }
    }

    /// Stores `a + b` under `label`.
    async fn cmd_add(&self, label: &str, a: i32, b: i32) -> Response {
        let sum = match a.checked_add(b) {
            Some(sum) => sum,
            None => {
                warn!(a, b, "Sum overflows, nothing stored");
                return Response::Overflow;
            }
        };

        let created_at = Utc::now();
        let record = NewRecord::new(label, sum).at(created_at);

        match self.store.create(record).await {
            Ok(id) => {
                debug!(id, result = sum, "Record created");
                Response::Saved(Record {
                    id,
                    command: label.to_string(),
                    result: sum,
                    created_at,
                })
            }
            Err(e) => {
                error!(error = %e, "Failed to store result");
                Response::StoreFailure
            }
        }
    }

    async fn cmd_getall(&self) -> Response {
        match self.store.list_all().await {
            Ok(records) => {
                debug!(count = records.len(), "Listing records");
                Response::Records(records)
            }
            Err(e) => {
                error!(error = %e, "Failed to list records");
                Response::StoreFailure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError, StoreResult};
    use async_trait::async_trait;

    /// A store whose every call fails.
    struct BrokenStore;

    #[async_trait]
    impl Store for BrokenStore {
        async fn ensure_schema(&self) -> StoreResult<()> {
            Ok(())
        }
        async fn create(&self, _record: NewRecord) -> StoreResult<u64> {
            Err(StoreError::NotReady)
        }
        async fn list_all(&self) -> StoreResult<Vec<Record>> {
            Err(StoreError::NotReady)
        }
        async fn get_by_id(&self, _id: u64) -> StoreResult<Option<Record>> {
            Err(StoreError::NotReady)
        }
        async fn update(&self, _record: Record) -> StoreResult<bool> {
            Err(StoreError::NotReady)
        }
        async fn delete(&self, _id: u64) -> StoreResult<bool> {
            Err(StoreError::NotReady)
        }
    }

    fn create_handler() -> (CommandHandler, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CommandHandler::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_add_persists_sum() {
        let (handler, store) = create_handler();

        let response = handler.execute(Command::Add(2, 3)).await;
        match response {
            Response::Saved(record) => {
                assert_eq!(record.id, 1);
                assert_eq!(record.command, "add");
                assert_eq!(record.result, 5);
            }
            other => panic!("unexpected response: {:?}", other),
        }

        let rows = store.list_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].result, 5);
    }

    #[tokio::test]
    async fn test_saved_record_matches_stored_row() {
        let (handler, store) = create_handler();

        let Response::Saved(reply) = handler.execute(Command::Add(-10, 4)).await else {
            panic!("expected a saved record");
        };
        let stored = store.get_by_id(reply.id).await.unwrap().unwrap();
        assert_eq!(reply, stored);
    }

    #[tokio::test]
    async fn test_add_overflow_stores_nothing() {
        let (handler, store) = create_handler();

        assert_eq!(handler.execute(Command::Add(i32::MAX, 1)).await, Response::Overflow);
        assert_eq!(handler.execute(Command::Add(i32::MIN, -1)).await, Response::Overflow);
        assert!(store.is_empty());

        // Extremes that still fit are fine
        assert!(matches!(
            handler.execute(Command::Add(i32::MAX, i32::MIN)).await,
            Response::Saved(_)
        ));
    }

    #[tokio::test]
    async fn test_getall_empty() {
        let (handler, _) = create_handler();
        let response = handler.execute(Command::ListAll).await;
        assert_eq!(response, Response::Records(Vec::new()));
        assert!(response.serialize().is_empty());
    }

    #[tokio::test]
    async fn test_getall_after_adds() {
        let (handler, _) = create_handler();

        for (a, b) in [(1, 1), (2, 2), (3, 3)] {
            handler.execute(Command::Add(a, b)).await;
        }

        let Response::Records(records) = handler.execute(Command::ListAll).await else {
            panic!("expected records");
        };
        let results: Vec<i32> = records.iter().map(|r| r.result).collect();
        assert_eq!(results, vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let (handler, store) = create_handler();
        assert_eq!(
            handler.execute(Command::Unknown("mul".into())).await,
            Response::CommandError
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure() {
        let handler = CommandHandler::new(Arc::new(BrokenStore));

        assert_eq!(handler.execute(Command::Add(1, 2)).await, Response::StoreFailure);
        assert_eq!(handler.execute(Command::ListAll).await, Response::StoreFailure);
    }
}
