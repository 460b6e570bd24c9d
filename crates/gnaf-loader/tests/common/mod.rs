//! In-memory collaborators for command tests
//!
//! - `MemoryStore`: buckets and keys held in a map
//! - `MemoryQueue`: visible and in-flight messages, mimicking SQS visibility
//! - `RecordingLoader`: records every database call instead of running SQL

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use gnaf_common::types::{ObjectRef, TableName};
use gnaf_loader::db::BulkLoader;
use gnaf_loader::queue::{Queue, ReceivedMessage};
use gnaf_loader::storage::ObjectStore;
use gnaf_loader::{LoaderError, LogContext, Result};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

pub fn test_log() -> LogContext {
    LogContext::for_command("test")
}

/// Write a zip archive with the given members; names ending in `/` become
/// directory entries
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, SimpleFileOptions::default())
                .unwrap();
        } else {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

// ============================================================================
// Object storage
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data.into());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectRef>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(b, k)| ObjectRef::new(b, k))
            .collect())
    }

    async fn download(&self, object: &ObjectRef, path: &Path) -> Result<u64> {
        let data = self
            .get(&object.bucket, &object.key)
            .ok_or_else(|| LoaderError::storage(format!("NoSuchKey: {}", object)))?;
        std::fs::write(path, &data)?;
        Ok(data.len() as u64)
    }

    async fn upload(&self, path: &Path, object: &ObjectRef) -> Result<()> {
        let data = std::fs::read(path)?;
        self.put(&object.bucket, &object.key, data);
        Ok(())
    }
}

// ============================================================================
// Queue
// ============================================================================

#[derive(Default)]
struct QueueState {
    next_id: usize,
    visible: VecDeque<ReceivedMessage>,
    in_flight: Vec<ReceivedMessage>,
}

/// A fetched message stays in flight (invisible but not deleted) until removed
pub struct MemoryQueue {
    name: String,
    state: Mutex<QueueState>,
}

impl MemoryQueue {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn push(&self, body: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.visible.push_back(ReceivedMessage {
            message_id: format!("msg-{}", id),
            receipt_handle: format!("receipt-{}", id),
            body: body.to_string(),
        });
    }

    /// Bodies of every message not yet deleted, visible or in flight
    pub fn remaining(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .in_flight
            .iter()
            .chain(state.visible.iter())
            .map(|m| m.body.clone())
            .collect()
    }

    pub fn visible(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.visible.iter().map(|m| m.body.clone()).collect()
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, body: &str) -> Result<()> {
        self.push(body);
        Ok(())
    }

    async fn fetch(&self) -> Result<Option<ReceivedMessage>> {
        let mut state = self.state.lock().unwrap();
        let Some(message) = state.visible.pop_front() else {
            return Ok(None);
        };
        state.in_flight.push(message.clone());
        Ok(Some(message))
    }

    async fn remove(&self, message: &ReceivedMessage) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.in_flight.len();
        state
            .in_flight
            .retain(|m| m.receipt_handle != message.receipt_handle);
        if state.in_flight.len() == before {
            return Err(LoaderError::queue(format!(
                "ReceiptHandleIsInvalid: {}",
                message.receipt_handle
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Database
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderCall {
    Truncate(String),
    DisableForeignKeys,
    EnableForeignKeys,
    /// Table, file name and file contents at the time of the call
    Import(String, String, String),
    Close,
}

#[derive(Default)]
pub struct RecordingLoader {
    pub calls: Vec<LoaderCall>,
    /// Tables that do not exist
    pub missing: HashSet<String>,
    /// Tables whose import is rejected
    pub failing: HashSet<String>,
    closed: bool,
}

impl RecordingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn truncated(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                LoaderCall::Truncate(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn imports(&self) -> Vec<(String, String, String)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                LoaderCall::Import(t, f, c) => Some((t.clone(), f.clone(), c.clone())),
                _ => None,
            })
            .collect()
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(LoaderError::ConnectionClosed);
        }
        Ok(())
    }
}

fn relation_missing(table: &TableName) -> LoaderError {
    LoaderError::Database(sqlx::Error::Protocol(format!(
        "relation \"{}\" does not exist",
        table
    )))
}

#[async_trait]
impl BulkLoader for RecordingLoader {
    async fn truncate_table(&mut self, table: &TableName) -> Result<()> {
        self.check_open()?;
        if self.missing.contains(&table.to_string()) {
            return Err(relation_missing(table));
        }
        self.calls.push(LoaderCall::Truncate(table.to_string()));
        Ok(())
    }

    async fn disable_foreign_key_checks(&mut self) -> Result<()> {
        self.check_open()?;
        self.calls.push(LoaderCall::DisableForeignKeys);
        Ok(())
    }

    async fn enable_foreign_key_checks(&mut self) -> Result<()> {
        self.check_open()?;
        self.calls.push(LoaderCall::EnableForeignKeys);
        Ok(())
    }

    async fn import_file(&mut self, path: &Path, table: &TableName) -> Result<u64> {
        self.check_open()?;
        let contents = std::fs::read_to_string(path)?;
        if self.missing.contains(&table.to_string()) {
            return Err(relation_missing(table));
        }
        if self.failing.contains(&table.to_string()) {
            return Err(LoaderError::Database(sqlx::Error::Protocol(format!(
                "invalid input syntax while copying into {}",
                table
            ))));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let rows = contents.lines().count().saturating_sub(1) as u64;
        self.calls
            .push(LoaderCall::Import(table.to_string(), file_name, contents));
        Ok(rows)
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.calls.push(LoaderCall::Close);
        }
        Ok(())
    }
}
