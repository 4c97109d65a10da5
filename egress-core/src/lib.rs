pub mod config;
pub mod entry;
pub mod error;
pub mod request;

pub use config::EgressConfig;
pub use entry::{LogEntry, LogId, ResponseRecord, StoredEntry};
pub use error::{EgressError, EgressResult};
pub use request::{OutboundRequest, RequestBody};
