//! File-backed log store: one JSON object per line.
//!
//! Appends go through [`RotatingLineWriter`], so the active file rotates
//! daily and by size. Range queries scan the rotated files and the active
//! file; lines that fail to parse are skipped with a warning.

use crate::{LogStore, sort_by_request_time};
use chrono::{DateTime, Utc};
use egress_core::config::StoreConfig;
use egress_core::{EgressError, EgressResult, LogEntry, LogId, StoredEntry};
use egress_observability::line_writer::{RotatingLineWriter, RotationConfig, rotated_files};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct JsonlLogStore {
    writer: RotatingLineWriter,
}

impl JsonlLogStore {
    pub fn open(config: &StoreConfig) -> EgressResult<Self> {
        if config.file_path.as_os_str().is_empty() {
            return Err(EgressError::ConfigError("store.file_path must not be empty".into()));
        }
        Self::with_rotation(RotationConfig {
            file_path: config.file_path.clone(),
            max_file_size_bytes: config.max_file_size_bytes,
            max_rotated_files: config.max_rotated_files,
        })
    }

    pub fn with_rotation(rotation: RotationConfig) -> EgressResult<Self> {
        Ok(Self {
            writer: RotatingLineWriter::new(rotation)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.writer.path()
    }

    fn scan_file(
        path: &Path,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        out: &mut Vec<StoredEntry>,
    ) -> EgressResult<()> {
        let file = match File::open(path) {
            Ok(f) => f,
            // Rotated away between listing and opening.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredEntry>(&line) {
                Ok(stored) => {
                    let t = stored.entry.request_time;
                    if t >= from && t < to {
                        out.push(stored);
                    }
                }
                Err(e) => warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    error = %e,
                    "Skipping unreadable log line"
                ),
            }
        }
        Ok(())
    }
}

impl LogStore for JsonlLogStore {
    fn append(&self, entry: &LogEntry) -> EgressResult<LogId> {
        let stored = StoredEntry { id: Uuid::new_v4(), entry: entry.clone() };
        let line = serde_json::to_string(&stored)?;
        self.writer.write_line(&line)?;
        debug!(id = %stored.id, url = %entry.request_url, "Log entry appended");
        Ok(stored.id)
    }

    fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> EgressResult<Vec<StoredEntry>> {
        let mut hits = Vec::new();
        for path in rotated_files(self.path())? {
            Self::scan_file(&path, from, to, &mut hits)?;
        }
        Self::scan_file(self.path(), from, to, &mut hits)?;
        sort_by_request_time(&mut hits);
        Ok(hits)
    }
}
