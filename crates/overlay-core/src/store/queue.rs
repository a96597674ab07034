//! Background delivery of widget patches.
//!
//! Every widget gets its own lane: a task on the caller's runtime that
//! delivers that widget's patches in order. Patches that pile up while a
//! request is in flight (or waiting to be retried) are merged into one, so
//! the last write that reaches the backend always carries the latest local
//! values.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::gateway::{GatewayError, GatewayResult, PersistenceGateway, env_parse};
use crate::widget::{PatchBody, WidgetField, WidgetId};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_MS: u64 = 200;
pub const DEFAULT_RETRY_MAX_MS: u64 = 5000;

/// Retry settings for patch delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Attempts per batch, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry. Doubles on each further retry.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_MS),
        }
    }
}

impl SyncConfig {
    /// Read `OVERLAY_SYNC_MAX_ATTEMPTS`, `OVERLAY_SYNC_RETRY_BASE_MS` and
    /// `OVERLAY_SYNC_RETRY_MAX_MS`.
    pub fn from_env() -> Self {
        Self {
            max_attempts: env_parse("OVERLAY_SYNC_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
            base_delay: Duration::from_millis(env_parse("OVERLAY_SYNC_RETRY_BASE_MS", DEFAULT_RETRY_BASE_MS)),
            max_delay: Duration::from_millis(env_parse("OVERLAY_SYNC_RETRY_MAX_MS", DEFAULT_RETRY_MAX_MS)),
        }
    }

    /// Delay after the given number of failed attempts (1-based).
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(20);
        self.base_delay.saturating_mul(1 << exponent).min(self.max_delay)
    }
}

/// Outcome of one delivered or abandoned batch.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Delivered {
        widget_id: WidgetId,
        fields: Vec<WidgetField>,
        /// Number of enqueued patches this batch covered.
        commands: usize,
    },
    Failed {
        widget_id: WidgetId,
        fields: Vec<WidgetField>,
        commands: usize,
        error: GatewayError,
    },
}

impl SyncEvent {
    pub fn widget_id(&self) -> &WidgetId {
        match self {
            Self::Delivered { widget_id, .. } | Self::Failed { widget_id, .. } => widget_id,
        }
    }

    pub fn commands(&self) -> usize {
        match self {
            Self::Delivered { commands, .. } | Self::Failed { commands, .. } => *commands,
        }
    }
}

type Updates = Map<String, Value>;

/// Per-widget patch lanes.
pub struct PatchQueue {
    gateway: Arc<dyn PersistenceGateway>,
    runtime: Handle,
    config: SyncConfig,
    lanes: HashMap<WidgetId, mpsc::UnboundedSender<Updates>>,
    events: mpsc::UnboundedSender<SyncEvent>,
}

impl PatchQueue {
    /// Create a queue. Outcomes arrive on the returned receiver.
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        runtime: Handle,
        config: SyncConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let queue = Self {
            gateway,
            runtime,
            config,
            lanes: HashMap::new(),
            events,
        };
        (queue, receiver)
    }

    /// Queue a patch for delivery. Returns the updates back if no lane could
    /// take them (the runtime is gone).
    pub fn enqueue(&mut self, widget_id: &WidgetId, updates: Updates) -> Result<(), Updates> {
        let updates = match self.lanes.get(widget_id) {
            Some(lane) => match lane.send(updates) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(updates)) => updates,
            },
            None => updates,
        };

        let lane = self.spawn_lane(widget_id.clone());
        let result = lane.send(updates).map_err(|mpsc::error::SendError(updates)| updates);
        if result.is_ok() {
            self.lanes.insert(widget_id.clone(), lane);
        }
        result
    }

    fn spawn_lane(&self, widget_id: WidgetId) -> mpsc::UnboundedSender<Updates> {
        let (sender, receiver) = mpsc::unbounded_channel();
        log::debug!("Opening patch lane for widget {}", widget_id);
        self.runtime.spawn(run_lane(
            widget_id,
            Arc::clone(&self.gateway),
            self.config,
            receiver,
            self.events.clone(),
        ));
        sender
    }
}

/// Merge everything already waiting in the lane into `updates`.
/// Returns how many patches were merged.
fn drain(receiver: &mut mpsc::UnboundedReceiver<Updates>, updates: &mut Updates) -> usize {
    let mut merged = 0;
    while let Ok(next) = receiver.try_recv() {
        updates.extend(next);
        merged += 1;
    }
    merged
}

fn fields_of(updates: &Updates) -> Vec<WidgetField> {
    let mut fields: Vec<_> = updates.keys().filter_map(|key| WidgetField::from_key(key)).collect();
    fields.sort();
    fields
}

async fn run_lane(
    widget_id: WidgetId,
    gateway: Arc<dyn PersistenceGateway>,
    config: SyncConfig,
    mut receiver: mpsc::UnboundedReceiver<Updates>,
    events: mpsc::UnboundedSender<SyncEvent>,
) {
    while let Some(mut updates) = receiver.recv().await {
        let mut commands = 1 + drain(&mut receiver, &mut updates);
        let result = deliver(
            &*gateway,
            &widget_id,
            &config,
            &mut receiver,
            &mut updates,
            &mut commands,
        )
        .await;

        let fields = fields_of(&updates);
        let event = match result {
            Ok(()) => SyncEvent::Delivered {
                widget_id: widget_id.clone(),
                fields,
                commands,
            },
            Err(error) => {
                log::warn!("Giving up on patch for widget {} ({:?}): {}", widget_id, fields, error);
                SyncEvent::Failed {
                    widget_id: widget_id.clone(),
                    fields,
                    commands,
                    error,
                }
            }
        };
        if events.send(event).is_err() {
            // The store is gone; nobody is left to report to.
            break;
        }
    }
}

async fn deliver(
    gateway: &dyn PersistenceGateway,
    widget_id: &WidgetId,
    config: &SyncConfig,
    receiver: &mut mpsc::UnboundedReceiver<Updates>,
    updates: &mut Updates,
    commands: &mut usize,
) -> GatewayResult<()> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let body = PatchBody {
            widget_id: widget_id.clone(),
            updates: updates.clone(),
        };
        match gateway.patch_widget(&body).await {
            Ok(()) => return Ok(()),
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                let delay = config.backoff(attempt);
                log::debug!(
                    "Patch for widget {} failed (attempt {}/{}): {}; retrying in {:?}",
                    widget_id,
                    attempt,
                    max_attempts,
                    error,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                // Retry with whatever arrived in the meantime.
                *commands += drain(receiver, updates);
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayOp, MemoryGateway};
    use crate::widget::{OverlayId, WidgetKind, WidgetRecord};
    use serde_json::json;

    fn seeded() -> (Arc<MemoryGateway>, WidgetId) {
        let id = WidgetId::new("w1");
        let gateway = Arc::new(MemoryGateway::with_records([WidgetRecord {
            id: id.clone(),
            draft: WidgetKind::Text.draft(&OverlayId::new("ov"), 0),
        }]));
        (gateway, id)
    }

    fn updates(key: &str, value: Value) -> Updates {
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        map
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = SyncConfig {
            max_attempts: 10,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(1000),
        };
        assert_eq!(config.backoff(1), Duration::from_millis(200));
        assert_eq!(config.backoff(2), Duration::from_millis(400));
        assert_eq!(config.backoff(3), Duration::from_millis(800));
        assert_eq!(config.backoff(4), Duration::from_millis(1000));
        assert_eq!(config.backoff(60), Duration::from_millis(1000));
    }

    #[test]
    fn test_sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay, Duration::from_millis(200));
        assert_eq!(config.max_delay, Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_queued_patches_coalesce() {
        let (gateway, id) = seeded();
        let (mut queue, mut events) = PatchQueue::new(gateway.clone(), Handle::current(), SyncConfig::default());

        queue.enqueue(&id, updates("x", json!(1))).unwrap();
        queue.enqueue(&id, updates("y", json!(2))).unwrap();
        queue.enqueue(&id, updates("x", json!(3))).unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            SyncEvent::Delivered {
                widget_id: id.clone(),
                fields: vec![WidgetField::X, WidgetField::Y],
                commands: 3,
            }
        );
        let log = gateway.patch_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].updates["x"], json!(3));
        assert_eq!(log[0].updates["y"], json!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures() {
        let (gateway, id) = seeded();
        gateway.fail_times(GatewayOp::Patch, 2, GatewayError::Transport("reset".into()));
        let (mut queue, mut events) = PatchQueue::new(gateway.clone(), Handle::current(), SyncConfig::default());

        queue.enqueue(&id, updates("x", json!(10))).unwrap();
        let event = events.recv().await.unwrap();
        assert!(matches!(event, SyncEvent::Delivered { .. }));
        assert_eq!(gateway.calls(GatewayOp::Patch), 3);
        assert_eq!(gateway.record(&id).unwrap().draft.x, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let (gateway, id) = seeded();
        gateway.fail(GatewayOp::Patch, GatewayError::from_status(503, "maintenance"));
        let (mut queue, mut events) = PatchQueue::new(gateway.clone(), Handle::current(), SyncConfig::default());

        queue.enqueue(&id, updates("width", json!(90))).unwrap();
        match events.recv().await.unwrap() {
            SyncEvent::Failed { fields, error, commands, .. } => {
                assert_eq!(fields, vec![WidgetField::Width]);
                assert_eq!(commands, 1);
                assert_eq!(error.status(), Some(503));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(gateway.calls(GatewayOp::Patch), 3);
    }

    #[tokio::test]
    async fn test_rejection_is_terminal() {
        let (gateway, id) = seeded();
        gateway.fail(GatewayOp::Patch, GatewayError::from_status(422, "bad"));
        let (mut queue, mut events) = PatchQueue::new(gateway.clone(), Handle::current(), SyncConfig::default());

        queue.enqueue(&id, updates("x", json!(1))).unwrap();
        assert!(matches!(events.recv().await.unwrap(), SyncEvent::Failed { .. }));
        assert_eq!(gateway.calls(GatewayOp::Patch), 1);
    }

    #[tokio::test]
    async fn test_lanes_are_per_widget() {
        let (gateway, a) = seeded();
        let b = WidgetId::new("w2");
        gateway.insert(WidgetRecord {
            id: b.clone(),
            draft: WidgetKind::Timer.draft(&OverlayId::new("ov"), 1),
        });
        let (mut queue, mut events) = PatchQueue::new(gateway.clone(), Handle::current(), SyncConfig::default());

        queue.enqueue(&a, updates("x", json!(5))).unwrap();
        queue.enqueue(&b, updates("x", json!(6))).unwrap();
        let mut seen = vec![
            events.recv().await.unwrap().widget_id().clone(),
            events.recv().await.unwrap().widget_id().clone(),
        ];
        seen.sort();
        assert_eq!(seen, vec![a.clone(), b.clone()]);
        assert_eq!(gateway.record(&a).unwrap().draft.x, 5);
        assert_eq!(gateway.record(&b).unwrap().draft.x, 6);
    }
}
