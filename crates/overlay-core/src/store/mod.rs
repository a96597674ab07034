//! Optimistic widget store.
//!
//! The store owns the widget collection the editor renders. Local changes
//! apply immediately; persistence runs in the background through the
//! [`PatchQueue`] and never holds up a read.

mod queue;

pub use queue::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BASE_MS, DEFAULT_RETRY_MAX_MS, PatchQueue, SyncConfig, SyncEvent,
};

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::mpsc as std_mpsc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::{EditorError, EditorResult};
use crate::gateway::{BoxFuture, GatewayResult, PersistenceGateway};
use crate::widget::{
    ModelError, OverlayId, Widget, WidgetDraft, WidgetField, WidgetId, WidgetKind, WidgetPatch, WidgetRecord,
};

/// Progress of the initial load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// The last load failed with this message.
    Failed(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Change notifications for store subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A load was sent.
    Loading,
    /// The collection was replaced by a load.
    Reloaded,
    LoadFailed(String),
    WidgetAdded(WidgetId),
    CreateFailed(String),
    WidgetChanged {
        id: WidgetId,
        geometry: bool,
        config: bool,
    },
    /// The widget's set of unsynced fields changed.
    SyncChanged(WidgetId),
}

/// Result of a request started with [`OptimisticStore::start_load`] or
/// [`OptimisticStore::start_create`].
enum Background {
    Loaded(GatewayResult<Vec<WidgetRecord>>),
    Created {
        draft: WidgetDraft,
        result: GatewayResult<WidgetId>,
    },
}

/// Widget collection with optimistic local updates.
pub struct OptimisticStore {
    overlay_id: OverlayId,
    gateway: Arc<dyn PersistenceGateway>,
    runtime: Handle,
    background_tx: mpsc::UnboundedSender<Background>,
    background_rx: mpsc::UnboundedReceiver<Background>,
    /// Started requests whose result has not been applied yet.
    background: usize,
    /// Creates sent and not yet answered.
    creating: usize,
    /// Insertion order; renderers sort by z-index themselves.
    widgets: Vec<Widget>,
    queue: PatchQueue,
    sync_events: mpsc::UnboundedReceiver<SyncEvent>,
    /// Patches handed to the queue whose outcome has not been applied yet.
    pending: usize,
    unsynced: HashMap<WidgetId, BTreeSet<WidgetField>>,
    load_state: LoadState,
    subscribers: Vec<std_mpsc::Sender<StoreEvent>>,
}

impl OptimisticStore {
    /// Create an empty store. Background delivery runs on `runtime`.
    pub fn new(overlay_id: OverlayId, gateway: Arc<dyn PersistenceGateway>, runtime: Handle) -> Self {
        Self::with_sync_config(overlay_id, gateway, runtime, SyncConfig::default())
    }

    pub fn with_sync_config(
        overlay_id: OverlayId,
        gateway: Arc<dyn PersistenceGateway>,
        runtime: Handle,
        config: SyncConfig,
    ) -> Self {
        let (queue, sync_events) = PatchQueue::new(Arc::clone(&gateway), runtime.clone(), config);
        let (background_tx, background_rx) = mpsc::unbounded_channel();
        Self {
            overlay_id,
            gateway,
            runtime,
            background_tx,
            background_rx,
            background: 0,
            creating: 0,
            widgets: Vec::new(),
            queue,
            sync_events,
            pending: 0,
            unsynced: HashMap::new(),
            load_state: LoadState::Idle,
            subscribers: Vec::new(),
        }
    }

    /// All widgets in insertion order.
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn widget(&self, id: &WidgetId) -> Option<&Widget> {
        self.widgets.iter().find(|w| &w.id == id)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    /// Register for change notifications.
    pub fn subscribe(&mut self) -> std_mpsc::Receiver<StoreEvent> {
        let (sender, receiver) = std_mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    fn emit(&mut self, event: StoreEvent) {
        self.subscribers.retain(|s| s.send(event.clone()).is_ok());
    }

    /// Mark the store as loading and build the fetch. The returned future
    /// does not borrow the store.
    fn load_request(&mut self) -> BoxFuture<'static, GatewayResult<Vec<WidgetRecord>>> {
        self.load_state = LoadState::Loading;
        self.emit(StoreEvent::Loading);
        let gateway = Arc::clone(&self.gateway);
        let overlay_id = self.overlay_id.clone();
        Box::pin(async move { gateway.list_widgets(&overlay_id).await })
    }

    fn apply_load(&mut self, result: GatewayResult<Vec<WidgetRecord>>) -> EditorResult<usize> {
        match result {
            Ok(records) => {
                self.widgets = records.into_iter().map(Widget::from_record).collect();
                self.unsynced.clear();
                self.load_state = LoadState::Loaded;
                log::info!("Loaded {} widgets for overlay {}", self.widgets.len(), self.overlay_id);
                self.emit(StoreEvent::Reloaded);
                Ok(self.widgets.len())
            }
            Err(e) => {
                let message = e.to_string();
                log::warn!("Loading overlay {} failed: {}", self.overlay_id, message);
                self.load_state = LoadState::Failed(message.clone());
                self.emit(StoreEvent::LoadFailed(message));
                Err(EditorError::load(e))
            }
        }
    }

    /// Replace the collection with the backend's.
    ///
    /// On failure the current widgets stay and the error becomes the
    /// visible load error. Holds the store until the backend answers;
    /// a UI thread should use [`start_load`](Self::start_load).
    pub async fn load(&mut self) -> EditorResult<usize> {
        let request = self.load_request();
        let result = request.await;
        self.apply_load(result)
    }

    /// Start a load in the background. The state is [`LoadState::Loading`]
    /// until [`pump`](Self::pump) picks up the answer.
    pub fn start_load(&mut self) {
        let request = self.load_request();
        let outcomes = self.background_tx.clone();
        self.background += 1;
        self.runtime.spawn(async move {
            // A dropped store has nobody to tell.
            let _ = outcomes.send(Background::Loaded(request.await));
        });
    }

    fn create_request(&mut self, kind: WidgetKind) -> (WidgetDraft, BoxFuture<'static, GatewayResult<WidgetId>>) {
        // Creates in flight count, so concurrent creates stack in order.
        let z_index = i32::try_from(self.widgets.len() + self.creating).unwrap_or(i32::MAX);
        self.creating += 1;
        let draft = kind.draft(&self.overlay_id, z_index);
        let body = draft.clone();
        let gateway = Arc::clone(&self.gateway);
        (draft, Box::pin(async move { gateway.create_widget(&body).await }))
    }

    fn apply_create(&mut self, draft: WidgetDraft, result: GatewayResult<WidgetId>) -> EditorResult<WidgetId> {
        self.creating = self.creating.saturating_sub(1);
        match result {
            Ok(id) => {
                log::info!("Created {} widget {} at z {}", draft.kind, id, draft.z_index);
                self.widgets.push(Widget::from_record(WidgetRecord { id: id.clone(), draft }));
                self.emit(StoreEvent::WidgetAdded(id.clone()));
                Ok(id)
            }
            Err(e) => {
                log::warn!("Creating {} widget failed: {}", draft.kind, e);
                self.emit(StoreEvent::CreateFailed(e.to_string()));
                Err(EditorError::create(e))
            }
        }
    }

    /// Create a widget with its kind's defaults.
    ///
    /// Not optimistic: the widget is added only once the backend has
    /// assigned it an id.
    pub async fn create(&mut self, kind: WidgetKind) -> EditorResult<WidgetId> {
        let (draft, request) = self.create_request(kind);
        let result = request.await;
        self.apply_create(draft, result)
    }

    /// Start a create in the background. The widget appears, or
    /// [`StoreEvent::CreateFailed`] is sent, when [`pump`](Self::pump) picks
    /// up the answer.
    pub fn start_create(&mut self, kind: WidgetKind) {
        let (draft, request) = self.create_request(kind);
        let outcomes = self.background_tx.clone();
        self.background += 1;
        self.runtime.spawn(async move {
            let result = request.await;
            let _ = outcomes.send(Background::Created { draft, result });
        });
    }

    /// True while a create is waiting for the backend.
    pub fn is_creating(&self) -> bool {
        self.creating > 0
    }

    /// Apply a patch locally and queue it for the backend.
    ///
    /// Reads see the change as soon as this returns. Fails without touching
    /// anything if the widget is unknown or the config change is invalid.
    pub fn update(&mut self, id: &WidgetId, patch: WidgetPatch) -> EditorResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let widget = self
            .widgets
            .iter_mut()
            .find(|w| &w.id == id)
            .ok_or_else(|| ModelError::UnknownWidget(id.clone()))?;
        let updates = widget.apply(&patch)?;

        self.emit(StoreEvent::WidgetChanged {
            id: id.clone(),
            geometry: patch.touches_geometry(),
            config: patch.touches_config(),
        });
        self.send(id, updates);
        Ok(())
    }

    fn send(&mut self, id: &WidgetId, updates: serde_json::Map<String, serde_json::Value>) {
        match self.queue.enqueue(id, updates) {
            Ok(()) => self.pending += 1,
            Err(updates) => {
                let fields: Vec<_> = updates.keys().filter_map(|k| WidgetField::from_key(k)).collect();
                log::warn!("No runtime to deliver patch for widget {}", id);
                self.mark_unsynced(id, &fields);
            }
        }
    }

    fn mark_unsynced(&mut self, id: &WidgetId, fields: &[WidgetField]) {
        let set = self.unsynced.entry(id.clone()).or_default();
        let before = set.len();
        set.extend(fields.iter().copied());
        if set.len() != before {
            self.emit(StoreEvent::SyncChanged(id.clone()));
        }
    }

    fn mark_synced(&mut self, id: &WidgetId, fields: &[WidgetField]) {
        let Some(set) = self.unsynced.get_mut(id) else {
            return;
        };
        let before = set.len();
        for field in fields {
            set.remove(field);
        }
        let changed = set.len() != before;
        if set.is_empty() {
            self.unsynced.remove(id);
        }
        if changed {
            self.emit(StoreEvent::SyncChanged(id.clone()));
        }
    }

    fn apply_sync_event(&mut self, event: SyncEvent) {
        self.pending = self.pending.saturating_sub(event.commands());
        match event {
            SyncEvent::Delivered { widget_id, fields, .. } => self.mark_synced(&widget_id, &fields),
            SyncEvent::Failed { widget_id, fields, .. } => {
                if self.widget(&widget_id).is_some() {
                    self.mark_unsynced(&widget_id, &fields);
                }
            }
        }
    }

    fn apply_background(&mut self, outcome: Background) {
        self.background = self.background.saturating_sub(1);
        let result = match outcome {
            Background::Loaded(result) => self.apply_load(result).map(|_| ()),
            Background::Created { draft, result } => self.apply_create(draft, result).map(|_| ()),
        };
        // Subscribers have already been told through the store events.
        if let Err(e) = result {
            log::debug!("Background request finished with an error: {}", e);
        }
    }

    /// Apply background results and persistence outcomes that have
    /// arrived. Never blocks. Returns the number of outcomes applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.background_rx.try_recv() {
            self.apply_background(outcome);
            applied += 1;
        }
        while let Ok(event) = self.sync_events.try_recv() {
            self.apply_sync_event(event);
            applied += 1;
        }
        applied
    }

    /// Wait until every started load and create has been answered and every
    /// queued patch has been delivered or given up on.
    pub async fn settle(&mut self) {
        self.pump();
        while self.background > 0 {
            match self.background_rx.recv().await {
                Some(outcome) => self.apply_background(outcome),
                None => break,
            }
        }
        while self.pending > 0 {
            match self.sync_events.recv().await {
                Some(event) => self.apply_sync_event(event),
                None => break,
            }
        }
    }

    /// Patches queued whose outcome has not been applied yet.
    pub fn pending_commands(&self) -> usize {
        self.pending
    }

    /// Fields of a widget whose last delivery failed.
    pub fn unsynced_fields(&self, id: &WidgetId) -> Vec<WidgetField> {
        self.unsynced
            .get(id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_synced(&self, id: &WidgetId) -> bool {
        !self.unsynced.contains_key(id)
    }

    /// Send the current values of a widget's unsynced fields again.
    /// Returns false when there was nothing to send.
    pub fn resync(&mut self, id: &WidgetId) -> EditorResult<bool> {
        let widget = self.widget(id).ok_or_else(|| ModelError::UnknownWidget(id.clone()))?;
        let fields = self.unsynced_fields(id);
        if fields.is_empty() {
            return Ok(false);
        }
        let updates = widget.field_values(&fields);
        log::info!("Resending {:?} of widget {}", fields, id);
        self.send(id, updates);
        Ok(true)
    }
}
