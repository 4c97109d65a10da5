use crate::{LogStore, sort_by_request_time};
use chrono::{DateTime, Utc};
use egress_core::{EgressError, EgressResult, LogEntry, LogId, StoredEntry};
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// In-process log store.
///
/// Used by tests and by short-lived tools that only need the entries for
/// the lifetime of the process.
#[derive(Default)]
pub struct MemoryLogStore {
    entries: RwLock<Vec<StoredEntry>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry in append order.
    pub fn entries(&self) -> Vec<StoredEntry> {
        self.entries
            .read()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogStore for MemoryLogStore {
    fn append(&self, entry: &LogEntry) -> EgressResult<LogId> {
        let id = Uuid::new_v4();
        let mut entries = self
            .entries
            .write()
            .map_err(|_| EgressError::StoreError("memory store lock poisoned".into()))?;
        entries.push(StoredEntry { id, entry: entry.clone() });
        debug!(%id, url = %entry.request_url, "Log entry stored in memory");
        Ok(id)
    }

    fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> EgressResult<Vec<StoredEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| EgressError::StoreError("memory store lock poisoned".into()))?;
        let mut hits: Vec<StoredEntry> = entries
            .iter()
            .filter(|s| s.entry.request_time >= from && s.entry.request_time < to)
            .cloned()
            .collect();
        sort_by_request_time(&mut hits);
        Ok(hits)
    }
}
