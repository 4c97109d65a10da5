//! Builds [`LogEntry`] values and telemetry events for one call.
//!
//! A [`PendingRecord`] is taken before the request is handed to the
//! transport. It holds the request data in its masked, serialized form plus
//! the start timestamps, and is finalized once the transport returns. No I/O
//! happens here.

use crate::transport::ObservedResponse;
use chrono::{DateTime, SecondsFormat, Utc};
use egress_core::{LogEntry, OutboundRequest, RequestBody, ResponseRecord};
use egress_observability::{SensitiveFields, TelemetryEvent, mask, mask_headers};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Instant;

const EMPTY_OBJECT: &str = "{}";

/// Recorded instead of an empty error description.
const FALLBACK_FAILURE_MESSAGE: &str = "transport error";

#[derive(Debug, Clone)]
pub struct PendingRecord {
    pub url: String,
    pub method: String,
    /// Masked headers as compact JSON.
    pub request_headers: String,
    /// Masked body as compact JSON.
    pub request_payload: String,
    /// Masked query parameters as compact JSON.
    pub request_query_params: String,
    pub request_time: DateTime<Utc>,
    started: Instant,
}

impl PendingRecord {
    /// Capture the request side of a call. Must run before delegation.
    pub fn build(request: &OutboundRequest, sensitive: &SensitiveFields) -> Self {
        let headers = mask_headers(sensitive, &request.headers);
        let query = mask(sensitive, &string_map(&request.query));

        Self {
            url: request.url.clone(),
            method: request.method.as_str().to_string(),
            request_headers: to_text(&headers),
            request_payload: payload_text(&request.body, sensitive),
            request_query_params: to_text(&query),
            request_time: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Milliseconds since [`PendingRecord::build`], from a monotonic clock.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    pub fn finalize_success<R: ObservedResponse + ?Sized>(&self, response: &R) -> LogEntry {
        let body = serde_json::from_slice::<Value>(response.body_bytes())
            .unwrap_or_else(|_| Value::Object(Map::new()));
        self.entry(
            Some(ResponseRecord {
                status_code: response.status_code(),
                headers: response.header_map(),
                body,
            }),
            String::new(),
        )
    }

    pub fn finalize_failure(&self, error: &dyn Display) -> LogEntry {
        let mut message = error.to_string();
        if message.is_empty() {
            message = FALLBACK_FAILURE_MESSAGE.to_string();
        }
        self.entry(None, message)
    }

    fn entry(&self, response: Option<ResponseRecord>, message: String) -> LogEntry {
        LogEntry {
            request_url: self.url.clone(),
            request_method: self.method.clone(),
            request_headers: self.request_headers.clone(),
            request_payload: self.request_payload.clone(),
            request_query_params: self.request_query_params.clone(),
            response,
            request_time: self.request_time,
            // Wall clocks can step backwards; never record a negative span.
            response_time: Utc::now().max(self.request_time),
            message,
        }
    }

    /// Telemetry for a finished call, successful or not.
    ///
    /// `duration_ms` is the [`PendingRecord::elapsed_ms`] reading taken when
    /// the transport returned, so persisting the entry is not counted.
    pub fn event(&self, entry: &LogEntry, duration_ms: f64) -> TelemetryEvent {
        let (status_code, response_headers, response_data, exception) = match &entry.response {
            Some(r) => (
                Some(r.status_code),
                Some(to_text(&r.headers)),
                Some(to_text(&r.body)),
                None,
            ),
            None => (None, None, None, Some(entry.message.clone())),
        };

        TelemetryEvent {
            url: self.url.clone(),
            method: self.method.clone(),
            request_headers: self.request_headers.clone(),
            request_payload: self.request_payload.clone(),
            request_query_params: self.request_query_params.clone(),
            request_time: rfc3339(entry.request_time),
            response_time: rfc3339(entry.response_time),
            duration_ms,
            status_code,
            response_headers,
            response_data,
            exception,
        }
    }
}

// ── Serialization helpers ────────────────────────────────────────────────────

fn payload_text(body: &RequestBody, sensitive: &SensitiveFields) -> String {
    match body {
        RequestBody::None | RequestBody::Json(Value::Null) => EMPTY_OBJECT.to_string(),
        RequestBody::Form(fields) => to_text(&mask(sensitive, &string_map(fields))),
        RequestBody::Json(Value::Object(fields)) => to_text(&mask(sensitive, fields)),
        // Arrays and scalars carry no field names to match against.
        RequestBody::Json(other) => to_text(other),
        RequestBody::Text(text) if text.is_empty() => EMPTY_OBJECT.to_string(),
        RequestBody::Text(text) => to_text(text),
    }
}

fn string_map(fields: &BTreeMap<String, String>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

fn to_text<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| EMPTY_OBJECT.to_string())
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}
