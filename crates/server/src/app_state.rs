use control_schema::ControlSchema;
use serde_json::{Map, Value};
use storage::{ControlSource, StateStore};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// Everything the server keeps for its lifetime. All mutations of the state
/// document go through the single `state` mutex.
pub(crate) struct AppState {
    pub(crate) controls: ControlSource,
    pub(crate) store: StateStore,
    pub(crate) defaults: Map<String, Value>,
    pub(crate) schema: RwLock<ControlSchema>,
    pub(crate) state: Mutex<Map<String, Value>>,
}

impl AppState {
    /// Builds the schema from the control source and loads the state
    /// document merged against `defaults`.
    pub(crate) fn load(
        controls: ControlSource,
        store: StateStore,
        defaults: Map<String, Value>,
    ) -> anyhow::Result<Self> {
        let schema = controls.load_schema();
        let state = store.load(&defaults, &schema)?;
        info!(
            controls = schema.catalog().len(),
            indexed = schema.index().len(),
            state_path = %store.path().display(),
            "loaded dashboard state"
        );
        Ok(Self {
            controls,
            store,
            defaults,
            schema: RwLock::new(schema),
            state: Mutex::new(state),
        })
    }

    /// Re-reads the control source and swaps in the rebuilt schema.
    pub(crate) async fn reload_controls(&self) {
        let schema = self.controls.load_schema();
        *self.schema.write().await = schema;
    }
}
