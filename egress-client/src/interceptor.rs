//! The interception wrapper.
//!
//! `Interceptor` wraps one transport. It passes requests straight through
//! until [`Interceptor::activate`] hands out an [`ActivationGuard`]; from then
//! until the guard is dropped (or explicitly deactivated) every call is
//! recorded:
//!
//! 1. a [`PendingRecord`] is built from the masked request,
//! 2. the wrapped transport is called with the identical request,
//! 3. the outcome is finalized, appended to the [`LogStore`] and reported to
//!    the [`TelemetrySink`],
//! 4. the transport's own response or error is returned unchanged.

use crate::record::PendingRecord;
use crate::transport::HttpTransport;
use egress_core::{EgressError, EgressResult, LogEntry, OutboundRequest};
use egress_observability::{SensitiveFields, TelemetryEvent, TelemetryLevel, TelemetrySink, TracingSink};
use egress_store::LogStore;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Message attached to every per-call telemetry event.
const CALL_MESSAGE: &str = "outbound request";
const PERSIST_FAILED_MESSAGE: &str = "failed to persist outbound request log";

struct Activation {
    id: u64,
    fields: Arc<SensitiveFields>,
}

type Slot = Arc<Mutex<Option<Activation>>>;

fn lock_slot(slot: &Mutex<Option<Activation>>) -> MutexGuard<'_, Option<Activation>> {
    // The slot holds plain data; a panic elsewhere cannot leave it torn.
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Interceptor<T> {
    transport: T,
    store: Arc<dyn LogStore>,
    telemetry: Arc<dyn TelemetrySink>,
    slot: Slot,
    next_id: AtomicU64,
}

impl<T: HttpTransport> Interceptor<T> {
    /// Wrap `transport`, recording into `store` and reporting through
    /// [`TracingSink`].
    pub fn new(transport: T, store: Arc<dyn LogStore>) -> Self {
        Self {
            transport,
            store,
            telemetry: Arc::new(TracingSink),
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn is_active(&self) -> bool {
        lock_slot(&self.slot).is_some()
    }

    /// Start recording, masking `fields`.
    ///
    /// Fails with [`EgressError::AlreadyActive`] while another guard from
    /// this interceptor is alive.
    pub fn activate(&self, fields: SensitiveFields) -> EgressResult<ActivationGuard> {
        let mut slot = lock_slot(&self.slot);
        if slot.is_some() {
            warn!("Interception activation rejected, a scope is already active");
            return Err(EgressError::AlreadyActive);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(scope = id, sensitive_fields = fields.len(), "Interception activated");
        *slot = Some(Activation { id, fields: Arc::new(fields) });

        Ok(ActivationGuard {
            slot: Arc::clone(&self.slot),
            id,
            released: false,
        })
    }

    /// [`Interceptor::activate`] with `Authorization`, `access_token` and
    /// `token`.
    pub fn activate_default(&self) -> EgressResult<ActivationGuard> {
        self.activate(SensitiveFields::default())
    }

    /// Drop whatever scope is active without going through its guard.
    ///
    /// Recovers an interceptor whose guard was leaked; the leaked guard then
    /// reports [`EgressError::NotActive`]. Returns whether a scope was active.
    pub fn clear_activation(&self) -> bool {
        let cleared = lock_slot(&self.slot).take();
        if let Some(activation) = &cleared {
            warn!(scope = activation.id, "Interception scope cleared");
        }
        cleared.is_some()
    }

    /// Run `fut` inside an activation scope.
    ///
    /// Only activation can fail. If the scope was cleared while `fut` ran,
    /// the output is still returned.
    pub async fn intercept<F: Future>(&self, fields: SensitiveFields, fut: F) -> EgressResult<F::Output> {
        let guard = self.activate(fields)?;
        let scope = guard.id;
        let output = fut.await;
        if let Err(e) = guard.deactivate() {
            warn!(scope, error = %e, "Interception scope already ended");
        }
        Ok(output)
    }

    fn current_fields(&self) -> Option<Arc<SensitiveFields>> {
        lock_slot(&self.slot).as_ref().map(|a| Arc::clone(&a.fields))
    }

    /// Send `request` through the wrapped transport, recording it when a
    /// scope is active.
    pub async fn perform(&self, request: OutboundRequest) -> Result<T::Response, T::Error> {
        // Snapshot once: a scope ending mid-call does not change this call.
        let Some(fields) = self.current_fields() else {
            return self.transport.perform(request).await;
        };

        let pending = PendingRecord::build(&request, &fields);
        let outcome = self.transport.perform(request).await;
        let duration_ms = pending.elapsed_ms();
        match outcome {
            Ok(response) => {
                let entry = pending.finalize_success(&response);
                self.record(&pending, &entry, duration_ms, TelemetryLevel::Info);
                Ok(response)
            }
            Err(error) => {
                let entry = pending.finalize_failure(&error);
                self.record(&pending, &entry, duration_ms, TelemetryLevel::Error);
                Err(error)
            }
        }
    }

    /// Persist, then report. A store failure is reported and swallowed.
    fn record(&self, pending: &PendingRecord, entry: &LogEntry, duration_ms: f64, level: TelemetryLevel) {
        let event = pending.event(entry, duration_ms);
        match self.store.append(entry) {
            Ok(id) => debug!(%id, url = %entry.request_url, "Outbound request recorded"),
            Err(e) => {
                let warning = TelemetryEvent { exception: Some(e.to_string()), ..event.clone() };
                self.telemetry.emit(TelemetryLevel::Warn, PERSIST_FAILED_MESSAGE, &warning);
            }
        }
        self.telemetry.emit(level, CALL_MESSAGE, &event);
    }

    // ── Convenience methods (all funnel through `perform`) ──

    pub async fn get(&self, url: impl Into<String>) -> Result<T::Response, T::Error> {
        self.perform(OutboundRequest::get(url)).await
    }

    pub async fn post_json(&self, url: impl Into<String>, body: Value) -> Result<T::Response, T::Error> {
        self.perform(OutboundRequest::post(url).json(body)).await
    }

    pub async fn post_form(
        &self,
        url: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) -> Result<T::Response, T::Error> {
        self.perform(OutboundRequest::post(url).form(fields)).await
    }
}

/// Keeps interception active for as long as it lives.
///
/// Dropping the guard ends the scope on every exit path, including `?`
/// returns, panics and cancelled futures.
#[must_use = "interception stops as soon as the guard is dropped"]
pub struct ActivationGuard {
    slot: Slot,
    id: u64,
    released: bool,
}

impl ActivationGuard {
    /// End the scope, reporting [`EgressError::NotActive`] if it was
    /// already cleared.
    pub fn deactivate(mut self) -> EgressResult<()> {
        self.released = true;
        release(&self.slot, self.id)
    }
}

impl Drop for ActivationGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = release(&self.slot, self.id) {
            warn!(scope = self.id, error = %e, "Interception scope already ended");
        }
    }
}

fn release(slot: &Mutex<Option<Activation>>, id: u64) -> EgressResult<()> {
    let mut slot = lock_slot(slot);
    match slot.as_ref() {
        Some(active) if active.id == id => {
            *slot = None;
            info!(scope = id, "Interception deactivated");
            Ok(())
        }
        _ => Err(EgressError::NotActive),
    }
}
