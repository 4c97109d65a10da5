//! Log stores: where intercepted calls end up.
//!
//! A store only needs to append entries and hand them back by
//! `request_time` range. [`memory::MemoryLogStore`] keeps everything in
//! process; [`jsonl::JsonlLogStore`] writes one JSON object per line to a
//! rotating file.

pub mod jsonl;
pub mod memory;
pub mod week;

use chrono::{DateTime, Utc};
use egress_core::config::{StoreConfig, StoreKind};
use egress_core::{EgressResult, LogEntry, LogId, StoredEntry};
use std::sync::Arc;

pub use jsonl::JsonlLogStore;
pub use memory::MemoryLogStore;

/// Durable, append-only storage of log entries.
///
/// Implementations must be safe to call from many tasks at once.
pub trait LogStore: Send + Sync {
    /// Persist `entry` and return the id assigned to it.
    fn append(&self, entry: &LogEntry) -> EgressResult<LogId>;

    /// Entries with `from <= request_time < to`, oldest first.
    fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> EgressResult<Vec<StoredEntry>>;

    /// Earliest `request_time` in the store.
    fn earliest_request_time(&self) -> EgressResult<Option<DateTime<Utc>>> {
        let all = self.range(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)?;
        Ok(all.first().map(|s| s.entry.request_time))
    }
}

impl<S: LogStore + ?Sized> LogStore for Arc<S> {
    fn append(&self, entry: &LogEntry) -> EgressResult<LogId> {
        (**self).append(entry)
    }

    fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> EgressResult<Vec<StoredEntry>> {
        (**self).range(from, to)
    }

    fn earliest_request_time(&self) -> EgressResult<Option<DateTime<Utc>>> {
        (**self).earliest_request_time()
    }
}

/// Build the store selected by `config.kind`.
pub fn open_store(config: &StoreConfig) -> EgressResult<Arc<dyn LogStore>> {
    let store: Arc<dyn LogStore> = match config.kind {
        StoreKind::Memory => Arc::new(MemoryLogStore::new()),
        StoreKind::File => Arc::new(JsonlLogStore::open(config)?),
    };
    Ok(store)
}

/// Sort by `request_time`, keeping append order for ties.
fn sort_by_request_time(entries: &mut [StoredEntry]) {
    entries.sort_by_key(|s| s.entry.request_time);
}
