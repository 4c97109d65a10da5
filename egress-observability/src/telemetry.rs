//! Structured telemetry for intercepted calls.
//!
//! The interceptor reports every call to a [`TelemetrySink`] handed to it at
//! construction. [`TracingSink`] forwards to `tracing`; tests substitute
//! their own sink to capture events.

use serde::Serialize;
use tracing::{error, info, warn};

/// Tracing target used for all outbound-request events.
pub const TARGET: &str = "egress::outbound";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryLevel {
    Info,
    Warn,
    Error,
}

impl TelemetryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryLevel::Info => "info",
            TelemetryLevel::Warn => "warn",
            TelemetryLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for TelemetryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields attached to one telemetry event.
///
/// Request data is always the masked form. Response fields are `None` when
/// the call failed before a response arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub url: String,
    pub method: String,
    pub request_headers: String,
    pub request_payload: String,
    pub request_query_params: String,
    /// RFC 3339.
    pub request_time: String,
    /// RFC 3339.
    pub response_time: String,
    pub duration_ms: f64,
    pub status_code: Option<u16>,
    pub response_headers: Option<String>,
    pub response_data: Option<String>,
    pub exception: Option<String>,
}

/// Destination for telemetry events.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, level: TelemetryLevel, message: &str, event: &TelemetryEvent);
}

/// Default sink: one `tracing` event per call with every field structured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, level: TelemetryLevel, message: &str, event: &TelemetryEvent) {
        let status = event.status_code.map(u64::from);
        let response_headers = event.response_headers.as_deref();
        let response_data = event.response_data.as_deref();
        let exception = event.exception.as_deref();

        macro_rules! emit_at {
            ($mac:ident) => {
                $mac!(
                    target: TARGET,
                    url = %event.url,
                    method = %event.method,
                    request_headers = %event.request_headers,
                    request_payload = %event.request_payload,
                    request_query_params = %event.request_query_params,
                    request_time = %event.request_time,
                    response_time = %event.response_time,
                    duration_ms = event.duration_ms,
                    status_code = status,
                    response_headers = response_headers,
                    response_data = response_data,
                    exception = exception,
                    "{}",
                    message
                )
            };
        }

        match level {
            TelemetryLevel::Info => emit_at!(info),
            TelemetryLevel::Warn => emit_at!(warn),
            TelemetryLevel::Error => emit_at!(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn sample() -> TelemetryEvent {
        TelemetryEvent {
            url: "https://api.example.com/v1/me".into(),
            method: "GET".into(),
            request_headers: r#"{"Authorization":"B*****************n"}"#.into(),
            request_payload: "{}".into(),
            request_query_params: "{}".into(),
            request_time: "2025-01-15T10:30:45Z".into(),
            response_time: "2025-01-15T10:30:45.120Z".into(),
            duration_ms: 120.0,
            status_code: Some(200),
            response_headers: Some(r#"{"content-type":"application/json"}"#.into()),
            response_data: Some(r#"{"id":1}"#.into()),
            exception: None,
        }
    }

    #[test]
    fn level_display_is_lowercase() {
        assert_eq!(TelemetryLevel::Info.to_string(), "info");
        assert_eq!(TelemetryLevel::Warn.to_string(), "warn");
        assert_eq!(TelemetryLevel::Error.to_string(), "error");
    }

    #[test]
    fn event_serializes_all_fields() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["status_code"], 200);
        assert_eq!(json["duration_ms"], 120.0);
        assert!(json["exception"].is_null());
        assert_eq!(json["url"], "https://api.example.com/v1/me");
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Text output of everything `f` logs.
    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn tracing_sink_emits_at_every_level() {
        let out = capture(|| {
            for level in [TelemetryLevel::Info, TelemetryLevel::Warn, TelemetryLevel::Error] {
                TracingSink.emit(level, "outbound request", &sample());
            }
        });
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        for (line, level) in lines.iter().zip(["INFO", "WARN", "ERROR"]) {
            assert!(line.contains(level), "{line}");
            assert!(line.contains(TARGET), "{line}");
            assert!(line.contains("outbound request"), "{line}");
            assert!(line.contains("status_code=200"), "{line}");
            assert!(line.contains("url=https://api.example.com/v1/me"), "{line}");
        }
    }

    #[test]
    fn tracing_sink_handles_failure_event() {
        let event = TelemetryEvent {
            status_code: None,
            response_headers: None,
            response_data: None,
            exception: Some("connection refused".into()),
            ..sample()
        };
        let out = capture(|| TracingSink.emit(TelemetryLevel::Error, "outbound request", &event));
        assert!(out.contains("ERROR"));
        assert!(out.contains("connection refused"));
        assert!(!out.contains("status_code="));
    }
}
