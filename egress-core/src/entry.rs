//! The persisted record of one intercepted call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Identifier assigned by a log store on append.
pub type LogId = Uuid;

/// What came back from the remote side.
///
/// Present only when the transport produced a response; status, headers and
/// body therefore always travel together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body, or `{}` when the body was not JSON.
    pub body: Value,
}

/// One intercepted outbound request and its outcome.
///
/// Request headers, payload and query parameters are stored as the compact
/// JSON text of their *masked* form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    // ── Request ───────────────────────────────────────────────────
    pub request_url: String,
    pub request_method: String,
    pub request_headers: String,
    pub request_payload: String,
    pub request_query_params: String,

    // ── Response ──────────────────────────────────────────────────
    /// `None` when the call failed before a response arrived.
    pub response: Option<ResponseRecord>,

    // ── Time ──────────────────────────────────────────────────────
    pub request_time: DateTime<Utc>,
    pub response_time: DateTime<Utc>,

    /// Error description for failed calls, empty otherwise.
    #[serde(default)]
    pub message: String,
}

impl LogEntry {
    pub fn is_failure(&self) -> bool {
        self.response.is_none()
    }

    pub fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status_code)
    }

    /// Wall-clock span between request and response timestamps.
    pub fn duration_ms(&self) -> f64 {
        (self.response_time - self.request_time)
            .num_microseconds()
            .map(|us| us as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

/// A log entry together with the id its store assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: LogId,
    #[serde(flatten)]
    pub entry: LogEntry,
}
