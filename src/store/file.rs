//! File-Backed Store
//!
//! Rows are appended to a file as one JSON object per line:
//!
//! ```text
//! {"id":1,"command":"add","result":5,"created_at":"2024-03-01T12:30:05Z"}
//! {"id":2,"command":"add","result":-3,"created_at":"2024-03-01T12:30:09Z"}
//! ```
//!
//! `ensure_schema` creates the file (and its parent directories) if needed
//! and replays it into memory, so reads never touch the disk. A create
//! writes one complete line and syncs it before the row becomes visible.
//! If the append fails, the file is cut back to its previous length.
//!
//! Update and delete rewrite the whole file. A rewritten file starts with a
//! sequence line carrying the last identifier handed out, so deleting the
//! newest row never lets its identifier come back after a restart:
//!
//! ```text
//! {"last_id":2}
//! {"id":1,"command":"add","result":5,"created_at":"2024-03-01T12:30:05Z"}
//! ```
//!
//! A trailing line without a newline can only come from a write that was
//! interrupted by a crash; replay drops it. Any other unreadable line is
//! reported as corruption.

use crate::store::{check_label, NewRecord, Record, Store, StoreError, StoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One line of the backing file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Line {
    Row(Record),
    Sequence { last_id: u64 },
}

/// What replaying a file produced.
struct Replayed {
    rows: BTreeMap<u64, Record>,
    /// Highest identifier ever handed out, as far as the file knows
    last_id: u64,
    /// Byte length covered by complete lines
    valid_len: usize,
}

/// Open file plus the rows replayed from it.
struct FileState {
    file: File,
    /// Length of the file up to the last complete line
    len: u64,
    rows: BTreeMap<u64, Record>,
    last_id: u64,
}

/// A store that survives restarts.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<Option<FileState>>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .finish()
    }
}

impl FileStore {
    /// Creates a store backed by `path`. Nothing is touched until
    /// [`Store::ensure_schema`] runs.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(None),
        }
    }

    async fn open(&self) -> StoreResult<FileState> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let Replayed {
            rows,
            last_id,
            valid_len,
        } = replay(&contents)?;
        if valid_len < contents.len() {
            warn!(
                path = %self.path.display(),
                dropped = contents.len() - valid_len,
                "Dropping incomplete trailing row"
            );
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.set_len(valid_len as u64).await?;

        info!(
            path = %self.path.display(),
            rows = rows.len(),
            last_id,
            "File store opened"
        );

        Ok(FileState {
            file,
            len: valid_len as u64,
            rows,
            last_id,
        })
    }

    /// Rewrites the whole file from `rows` and swaps it into place.
    ///
    /// `state` is only touched once the new file is in place, so a failure
    /// at any step leaves the store serving the old file.
    async fn rewrite(&self, state: &mut FileState, rows: BTreeMap<u64, Record>) -> StoreResult<()> {
        let mut contents = serde_json::to_string(&Line::Sequence {
            last_id: state.last_id,
        })?;
        contents.push('\n');
        for record in rows.values() {
            contents.push_str(&serde_json::to_string(record)?);
            contents.push('\n');
        }

        let tmp = self.path.with_extension("tmp");
        let swapped = async {
            let mut out = File::create(&tmp).await?;
            out.write_all(contents.as_bytes()).await?;
            out.sync_all().await?;
            drop(out);

            // The append handle follows the inode through the rename
            let file = OpenOptions::new().append(true).open(&tmp).await?;
            fs::rename(&tmp, &self.path).await?;
            Ok::<_, std::io::Error>(file)
        }
        .await;

        let file = match swapped {
            Ok(file) => file,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&tmp).await {
                    debug!(error = %cleanup, "No temporary file to clean up");
                }
                return Err(e.into());
            }
        };

        state.file = file;
        state.len = contents.len() as u64;
        state.rows = rows;
        debug!(path = %self.path.display(), rows = state.rows.len(), "File store rewritten");
        Ok(())
    }
}

/// Parses file contents into rows and the identifier sequence.
fn replay(contents: &str) -> StoreResult<Replayed> {
    let mut rows = BTreeMap::new();
    let mut last_id = 0;
    let mut offset = 0;

    for line in contents.split_inclusive('\n') {
        // A row only counts once its newline made it to disk
        if !line.ends_with('\n') {
            break;
        }

        let text = line.trim_end();
        if !text.is_empty() {
            match serde_json::from_str::<Line>(text)? {
                Line::Row(record) => {
                    last_id = last_id.max(record.id);
                    rows.insert(record.id, record);
                }
                Line::Sequence { last_id: mark } => last_id = last_id.max(mark),
            }
        }
        offset += line.len();
    }

    Ok(Replayed {
        rows,
        last_id,
        valid_len: offset,
    })
}

#[async_trait]
impl Store for FileStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        let mut guard = self.state.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }
        Ok(())
    }

    async fn create(&self, record: NewRecord) -> StoreResult<u64> {
        record.validate()?;

        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(StoreError::NotReady)?;

        let id = state.last_id + 1;
        let record = record.into_record(id);
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let written = async {
            state.file.write_all(line.as_bytes()).await?;
            state.file.flush().await?;
            state.file.sync_data().await
        }
        .await;

        if let Err(e) = written {
            // Cut back any partial line so the next append starts clean
            if let Err(trunc) = state.file.set_len(state.len).await {
                warn!(error = %trunc, "Failed to truncate after write error");
            }
            return Err(e.into());
        }

        state.len += line.len() as u64;
        state.last_id = id;
        state.rows.insert(id, record);
        Ok(id)
    }

    async fn list_all(&self) -> StoreResult<Vec<Record>> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(StoreError::NotReady)?;
        Ok(state.rows.values().cloned().collect())
    }

    async fn get_by_id(&self, id: u64) -> StoreResult<Option<Record>> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(StoreError::NotReady)?;
        Ok(state.rows.get(&id).cloned())
    }

    async fn update(&self, record: Record) -> StoreResult<bool> {
        check_label(&record.command)?;

        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(StoreError::NotReady)?;

        let mut rows = state.rows.clone();
        match rows.get_mut(&record.id) {
            Some(existing) => {
                existing.command = record.command;
                existing.result = record.result;
            }
            None => return Ok(false),
        }

        self.rewrite(state, rows).await?;
        Ok(true)
    }

    async fn delete(&self, id: u64) -> StoreResult<bool> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(StoreError::NotReady)?;

        let mut rows = state.rows.clone();
        if rows.remove(&id).is_none() {
            return Ok(false);
        }

        self.rewrite(state, rows).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_use_before_schema_fails() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("records.jsonl"));

        let err = store.create(NewRecord::new("add", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotReady));
        assert!(matches!(
            store.list_all().await.unwrap_err(),
            StoreError::NotReady
        ));
    }

    #[tokio::test]
    async fn test_ensure_schema_creates_file_and_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("records.jsonl");
        let store = FileStore::new(&path);

        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();

        assert!(path.exists());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        {
            let store = FileStore::new(&path);
            store.ensure_schema().await.unwrap();
            assert_eq!(store.create(NewRecord::new("add", 3)).await.unwrap(), 1);
            assert_eq!(store.create(NewRecord::new("add", 8)).await.unwrap(), 2);
        }

        let store = FileStore::new(&path);
        store.ensure_schema().await.unwrap();

        let rows = store.list_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].result, 3);
        assert_eq!(rows[1].result, 8);

        // The sequence continues where it left off
        assert_eq!(store.create(NewRecord::new("add", 1)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_incomplete_trailing_row_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        let good = r#"{"id":1,"command":"add","result":2,"created_at":"2024-03-01T12:30:05Z"}"#;
        std::fs::write(&path, format!("{}\n{{\"id\":2,\"comm", good)).unwrap();

        let store = FileStore::new(&path);
        store.ensure_schema().await.unwrap();

        assert_eq!(store.list_all().await.unwrap().len(), 1);
        assert_eq!(store.create(NewRecord::new("add", 4)).await.unwrap(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().all(|l| serde_json::from_str::<Record>(l).is_ok()));
    }

    #[tokio::test]
    async fn test_deleted_newest_id_is_not_reused_after_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        {
            let store = FileStore::new(&path);
            store.ensure_schema().await.unwrap();
            assert_eq!(store.create(NewRecord::new("add", 1)).await.unwrap(), 1);
            assert_eq!(store.create(NewRecord::new("add", 2)).await.unwrap(), 2);
            assert!(store.delete(2).await.unwrap());
        }

        let store = FileStore::new(&path);
        store.ensure_schema().await.unwrap();
        assert_eq!(store.list_all().await.unwrap().len(), 1);
        assert_eq!(store.create(NewRecord::new("add", 3)).await.unwrap(), 3);

        // Deleting everything still keeps the sequence
        for id in [1, 3] {
            assert!(store.delete(id).await.unwrap());
        }
        drop(store);

        let store = FileStore::new(&path);
        store.ensure_schema().await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(store.create(NewRecord::new("add", 4)).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_failed_rewrite_keeps_serving_old_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let store = FileStore::new(&path);
        store.ensure_schema().await.unwrap();

        store.create(NewRecord::new("add", 1)).await.unwrap();
        store.create(NewRecord::new("add", 2)).await.unwrap();

        // A directory where the temporary file should go makes the rewrite fail
        let blocker = path.with_extension("tmp");
        std::fs::create_dir(&blocker).unwrap();

        assert!(matches!(store.delete(1).await, Err(StoreError::Io(_))));
        assert_eq!(store.list_all().await.unwrap().len(), 2);
        assert!(blocker.is_dir());

        // Appends still reach the real file
        assert_eq!(store.create(NewRecord::new("add", 3)).await.unwrap(), 3);
        std::fs::remove_dir(&blocker).unwrap();

        let reopened = FileStore::new(&path);
        reopened.ensure_schema().await.unwrap();
        let ids: Vec<u64> = reopened
            .list_all()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        std::fs::write(&path, "not json\n").unwrap();

        let store = FileStore::new(&path);
        let err = store.ensure_schema().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_update_and_delete_rewrite_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let store = FileStore::new(&path);
        store.ensure_schema().await.unwrap();

        let first = store.create(NewRecord::new("add", 1)).await.unwrap();
        let second = store.create(NewRecord::new("add", 2)).await.unwrap();

        let mut row = store.get_by_id(first).await.unwrap().unwrap();
        row.result = 100;
        assert!(store.update(row).await.unwrap());
        assert!(store.delete(second).await.unwrap());
        assert!(!store.delete(second).await.unwrap());

        // Appends still land after the rewrite
        let third = store.create(NewRecord::new("add", 3)).await.unwrap();
        assert_eq!(third, 3);

        let reopened = FileStore::new(&path);
        reopened.ensure_schema().await.unwrap();
        let rows = reopened.list_all().await.unwrap();
        let results: Vec<(u64, i32)> = rows.iter().map(|r| (r.id, r.result)).collect();
        assert_eq!(results, vec![(1, 100), (3, 3)]);
    }
}
