pub mod line_writer;
pub mod masking;
pub mod telemetry;

pub use masking::{SensitiveFields, mask, mask_headers};
pub use telemetry::{TelemetryEvent, TelemetryLevel, TelemetrySink, TracingSink};
