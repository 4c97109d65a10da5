//! Intercepting HTTP client.
//!
//! [`Interceptor`] decorates any [`HttpTransport`]. While an
//! [`ActivationGuard`] is alive, every request that goes through
//! [`Interceptor::perform`] is masked, recorded in a log store and reported
//! to a telemetry sink. The caller always gets back exactly what the wrapped
//! transport returned.

pub mod interceptor;
pub mod record;
pub mod reqwest_transport;
pub mod transport;

pub use interceptor::{ActivationGuard, Interceptor};
pub use record::PendingRecord;
pub use reqwest_transport::ReqwestTransport;
pub use transport::{HttpResponse, HttpTransport, ObservedResponse};
