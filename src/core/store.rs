//! Grid state store: last message of each type wins
//!
//! All state transitions go through [`reduce`], a total function over
//! `(state, message)`. The store only holds the latest result and reports which
//! slices a message replaced.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::grid::{reconcile, GridState};
use super::layers::GridView;
use super::protocol::{InboundMessage, OverlayLayerDescriptor};

/// Immutable store snapshot. Cloning is cheap: both slices sit behind `Arc`.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    /// Reconciled grid; `None` until the first `GRID` snapshot
    pub grid: Option<Arc<GridState>>,
    pub overlays: Arc<Vec<OverlayLayerDescriptor>>,
    /// Bumped whenever the grid slice is replaced
    pub grid_version: u64,
    /// Bumped whenever the overlay list is replaced
    pub overlay_version: u64,
    /// Bumped on every full snapshot
    pub session_version: u64,
}

impl StoreState {
    pub fn grid_view(&self) -> Option<GridView<'_>> {
        self.grid.as_deref().map(|grid| GridView {
            grid,
            version: self.grid_version,
        })
    }

    /// Table aspect ratio (ncols / nrows), known once a snapshot arrived
    pub fn table_ratio(&self) -> Option<f64> {
        self.grid.as_ref()?.header.aspect_ratio()
    }
}

/// Apply one inbound message to a state, producing the next state.
///
/// - snapshot: resets everything, reconciling its attribute array into the new grid
/// - attribute update: reconciles into the current features only
/// - overlay update: replaces the overlay list
/// - error: logged, no state change
pub fn reduce(state: &StoreState, message: InboundMessage) -> StoreState {
    match message {
        InboundMessage::Snapshot(snapshot) => {
            let snapshot = *snapshot;
            let grid = reconcile(&snapshot.grid, &snapshot.attributes);
            info!(
                cells = grid.cell_count(),
                overlays = snapshot.overlays.len(),
                "Grid snapshot applied"
            );
            StoreState {
                grid: Some(Arc::new(grid)),
                overlays: Arc::new(snapshot.overlays),
                grid_version: state.grid_version + 1,
                overlay_version: state.overlay_version + 1,
                session_version: state.session_version + 1,
            }
        }
        InboundMessage::AttributeUpdate(records) => {
            let Some(grid) = state.grid.as_deref() else {
                warn!(records = records.len(), "Attribute update before any grid snapshot, ignoring");
                return state.clone();
            };
            debug!(records = records.len(), "Attribute update applied");
            StoreState {
                grid: Some(Arc::new(reconcile(grid, &records))),
                grid_version: state.grid_version + 1,
                ..state.clone()
            }
        }
        InboundMessage::OverlayUpdate(overlays) => {
            debug!(overlays = overlays.len(), "Overlay list replaced");
            StoreState {
                overlays: Arc::new(overlays),
                overlay_version: state.overlay_version + 1,
                ..state.clone()
            }
        }
        InboundMessage::Error(content) => {
            error!(content = %content, "Error from cityIO");
            state.clone()
        }
    }
}

/// Which slices of the store a message replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Change {
    pub reset: bool,
    pub grid: bool,
    pub overlays: bool,
}

impl Change {
    fn between(before: &StoreState, after: &StoreState) -> Self {
        Self {
            reset: before.session_version != after.session_version,
            grid: before.grid_version != after.grid_version,
            overlays: before.overlay_version != after.overlay_version,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.reset || self.grid || self.overlays)
    }
}

/// Sole owner of the grid state and overlay list
#[derive(Debug, Default)]
pub struct GridStateStore {
    state: StoreState,
}

impl GridStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, message: InboundMessage) -> Change {
        let next = reduce(&self.state, message);
        let change = Change::between(&self.state, &next);
        self.state = next;
        change
    }

    /// Read-only snapshot for layer building
    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn overlay_count(&self) -> usize {
        self.state.overlays.len()
    }

    /// Drop the grid and overlays. Version counters keep counting so layer
    /// keys from before the clear are never reused.
    pub fn clear(&mut self) {
        let state = &self.state;
        self.state = StoreState {
            grid_version: state.grid_version + 1,
            overlay_version: state.overlay_version + 1,
            session_version: state.session_version + 1,
            ..StoreState::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::parse_message;
    use crate::core::protocol::tests::grid_message;
    use serde_json::json;

    fn msg(text: &str) -> InboundMessage {
        parse_message(text).unwrap()
    }

    fn overlay_update(types: &[&str]) -> InboundMessage {
        let layers: Vec<_> = types
            .iter()
            .map(|t| json!({"id": format!("{t}-layer"), "type": t, "data": []}))
            .collect();
        msg(&json!({"type": "INDICATOR", "content": {"moduleData": {"deckgl": layers}}}).to_string())
    }

    #[test]
    fn test_snapshot_resets_everything() {
        let mut store = GridStateStore::new();
        store.apply(overlay_update(&["arc", "heatmap"]));
        let change = store.apply(msg(&grid_message(3, json!([]))));

        assert!(change.reset && change.grid && change.overlays);
        let state = store.state();
        assert_eq!(state.grid.as_ref().unwrap().cell_count(), 3);
        assert_eq!(store.overlay_count(), 0);
        assert_eq!(state.table_ratio(), Some(2.0));
        // attributes from the snapshot are reconciled in
        assert_eq!(state.grid.as_ref().unwrap().features[2].properties["id"], json!(2));
        assert_eq!(state.grid.as_ref().unwrap().features[2].properties["color"], json!([2, 100, 200]));
    }

    #[test]
    fn test_attribute_update_only_touches_grid() {
        let mut store = GridStateStore::new();
        store.apply(msg(&grid_message(2, json!([{"id": "h", "type": "heatmap", "data": []}]))));
        let before = store.state().clone();

        let change = store.apply(msg(r#"{"type": "GEOGRIDDATA_UPDATE", "content": [{"color": "ffffff"}]}"#));
        assert_eq!(change, Change { reset: false, grid: true, overlays: false });

        let after = store.state();
        assert!(Arc::ptr_eq(&before.overlays, &after.overlays));
        let features = &after.grid.as_ref().unwrap().features;
        assert_eq!(features[0].properties["color"], json!("ffffff"));
        assert_eq!(features[1].properties, before.grid.as_ref().unwrap().features[1].properties);
        // the old snapshot is untouched
        assert_eq!(before.grid.as_ref().unwrap().features[0].properties["color"], json!([0, 100, 200]));
    }

    #[test]
    fn test_attribute_update_before_snapshot_is_ignored() {
        let mut store = GridStateStore::new();
        let change = store.apply(msg(r#"{"type": "GEOGRIDDATA_UPDATE", "content": [{}]}"#));
        assert!(change.is_empty());
        assert!(store.state().grid.is_none());
    }

    #[test]
    fn test_overlay_update_replaces_list() {
        let mut store = GridStateStore::new();
        store.apply(msg(&grid_message(1, json!([]))));
        let grid_before = store.state().grid.clone();

        let change = store.apply(overlay_update(&["arc", "heatmap", "geojson"]));
        assert_eq!(change, Change { reset: false, grid: false, overlays: true });
        assert_eq!(store.overlay_count(), 3);

        store.apply(overlay_update(&["trips"]));
        assert_eq!(store.overlay_count(), 1);
        assert_eq!(store.state().overlays[0].layer_type, "trips");
        assert!(Arc::ptr_eq(grid_before.as_ref().unwrap(), store.state().grid.as_ref().unwrap()));
    }

    #[test]
    fn test_error_message_changes_nothing() {
        let mut store = GridStateStore::new();
        store.apply(msg(&grid_message(1, json!([]))));
        let change = store.apply(msg(r#"{"type": "ERROR", "content": "boom"}"#));
        assert!(change.is_empty());
        assert_eq!(store.state().grid_version, 1);
    }

    #[test]
    fn test_reduce_is_pure() {
        let state = StoreState::default();
        let next = reduce(&state, overlay_update(&["arc"]));
        assert_eq!(state.overlay_version, 0);
        assert!(state.overlays.is_empty());
        assert_eq!(next.overlay_version, 1);
    }

    #[test]
    fn test_clear_keeps_versions_counting() {
        let mut store = GridStateStore::new();
        store.apply(msg(&grid_message(2, json!([]))));
        store.apply(overlay_update(&["arc"]));
        let before = store.state().clone();

        store.clear();
        assert!(store.state().grid.is_none());
        assert_eq!(store.overlay_count(), 0);

        let change = store.apply(msg(&grid_message(2, json!([]))));
        assert!(change.reset);
        let after = store.state();
        assert!(after.grid_version > before.grid_version);
        assert!(after.overlay_version > before.overlay_version);
        assert!(after.session_version > before.session_version);
    }
}
