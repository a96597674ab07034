//! In-memory gateway implementation.

use super::{BoxFuture, GatewayError, GatewayResult, PersistenceGateway};
use crate::widget::{OverlayId, PatchBody, WidgetDraft, WidgetId, WidgetRecord};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Gateway operation, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    List,
    Create,
    Patch,
}

#[derive(Debug, Clone)]
struct Injected {
    error: GatewayError,
    /// Remaining failures, or `None` to fail until cleared.
    remaining: Option<u32>,
}

/// In-memory backend for testing and offline use.
///
/// Stores records in insertion order and assigns UUID ids. Failures can be
/// injected per operation, and every accepted patch is logged.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    widgets: Mutex<Vec<WidgetRecord>>,
    failures: Mutex<HashMap<GatewayOp, Injected>>,
    calls: Mutex<HashMap<GatewayOp, usize>>,
    patch_log: Mutex<Vec<PatchBody>>,
    latency: Mutex<Option<Duration>>,
}

// Poisoning only means a test panicked mid-call; the data is still usable.
fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryGateway {
    /// Create a new empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway pre-seeded with records.
    pub fn with_records(records: impl IntoIterator<Item = WidgetRecord>) -> Self {
        let gateway = Self::new();
        guard(&gateway.widgets).extend(records);
        gateway
    }

    /// Insert or replace a record directly, bypassing the API.
    pub fn insert(&self, record: WidgetRecord) {
        let mut widgets = guard(&self.widgets);
        match widgets.iter_mut().find(|w| w.id == record.id) {
            Some(existing) => *existing = record,
            None => widgets.push(record),
        }
    }

    /// Remove a record directly, as another client deleting it would.
    pub fn remove(&self, id: &WidgetId) -> Option<WidgetRecord> {
        let mut widgets = guard(&self.widgets);
        let index = widgets.iter().position(|w| &w.id == id)?;
        Some(widgets.remove(index))
    }

    /// Snapshot of a stored record.
    pub fn record(&self, id: &WidgetId) -> Option<WidgetRecord> {
        guard(&self.widgets).iter().find(|w| &w.id == id).cloned()
    }

    /// Snapshot of every stored record.
    pub fn records(&self) -> Vec<WidgetRecord> {
        guard(&self.widgets).clone()
    }

    /// Fail every call to `op` until [`clear_failures`](Self::clear_failures).
    pub fn fail(&self, op: GatewayOp, error: GatewayError) {
        guard(&self.failures).insert(op, Injected { error, remaining: None });
    }

    /// Fail the next `times` calls to `op`.
    pub fn fail_times(&self, op: GatewayOp, times: u32, error: GatewayError) {
        guard(&self.failures).insert(
            op,
            Injected {
                error,
                remaining: Some(times),
            },
        );
    }

    pub fn clear_failures(&self) {
        guard(&self.failures).clear();
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *guard(&self.latency) = latency;
    }

    /// Number of calls made to `op`, failed ones included.
    pub fn calls(&self, op: GatewayOp) -> usize {
        guard(&self.calls).get(&op).copied().unwrap_or(0)
    }

    /// Every patch body accepted so far, in arrival order.
    pub fn patch_log(&self) -> Vec<PatchBody> {
        guard(&self.patch_log).clone()
    }

    async fn simulate_latency(&self) {
        let latency = *guard(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Count the call and consume an injected failure, if any.
    fn enter(&self, op: GatewayOp) -> GatewayResult<()> {
        *guard(&self.calls).entry(op).or_insert(0) += 1;

        let mut failures = guard(&self.failures);
        let Some(injected) = failures.get_mut(&op) else {
            return Ok(());
        };
        let error = injected.error.clone();
        match injected.remaining {
            None => Err(error),
            Some(0) => {
                failures.remove(&op);
                Ok(())
            }
            Some(1) => {
                failures.remove(&op);
                Err(error)
            }
            Some(n) => {
                injected.remaining = Some(n - 1);
                Err(error)
            }
        }
    }

    fn apply_patch(&self, body: &PatchBody) -> GatewayResult<()> {
        let mut widgets = guard(&self.widgets);
        let record = widgets
            .iter_mut()
            .find(|w| w.id == body.widget_id)
            .ok_or_else(|| GatewayError::from_status(404, "Widget not found"))?;

        let mut value = serde_json::to_value(&*record).map_err(|e| GatewayError::Decode(e.to_string()))?;
        if let Value::Object(fields) = &mut value {
            for (key, update) in &body.updates {
                if key != "id" {
                    fields.insert(key.clone(), update.clone());
                }
            }
        }
        *record = serde_json::from_value(value).map_err(|e| GatewayError::from_status(422, e.to_string()))?;
        Ok(())
    }
}

impl PersistenceGateway for MemoryGateway {
    fn list_widgets(&self, overlay_id: &OverlayId) -> BoxFuture<'_, GatewayResult<Vec<WidgetRecord>>> {
        let overlay_id = overlay_id.clone();
        Box::pin(async move {
            self.simulate_latency().await;
            self.enter(GatewayOp::List)?;
            Ok(guard(&self.widgets)
                .iter()
                .filter(|w| w.draft.overlay_id == overlay_id)
                .cloned()
                .collect())
        })
    }

    fn create_widget(&self, draft: &WidgetDraft) -> BoxFuture<'_, GatewayResult<WidgetId>> {
        let draft = draft.clone();
        Box::pin(async move {
            self.simulate_latency().await;
            self.enter(GatewayOp::Create)?;
            let id = WidgetId::new(uuid::Uuid::new_v4().to_string());
            guard(&self.widgets).push(WidgetRecord { id: id.clone(), draft });
            Ok(id)
        })
    }

    fn patch_widget(&self, body: &PatchBody) -> BoxFuture<'_, GatewayResult<()>> {
        let body = body.clone();
        Box::pin(async move {
            self.simulate_latency().await;
            self.enter(GatewayOp::Patch)?;
            self.apply_patch(&body)?;
            guard(&self.patch_log).push(body);
            Ok(())
        })
    }
}
