//! Render list assembly
//!
//! Paint order is list order: basemap first, selected overlay last (topmost).

use serde::Serialize;
use tracing::warn;

use super::layers::{build_mesh, build_overlay, build_text, build_tile, LayerSpec};
use super::store::StoreState;

/// What one paint consists of
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub layers: Vec<LayerSpec>,
    /// One-line status: selected overlay id, or why it is missing
    pub status: Option<String>,
}

impl Frame {
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(LayerSpec::id).collect()
    }
}

#[derive(Debug, Clone)]
pub struct RenderCompositor {
    tile_url: String,
    labels: bool,
}

impl RenderCompositor {
    pub fn new(tile_url: impl Into<String>, labels: bool) -> Self {
        Self {
            tile_url: tile_url.into(),
            labels,
        }
    }

    /// `[tile, mesh, text?, overlay?]` from the store state and the selected overlay.
    ///
    /// `None` until a grid is known. An overlay that cannot be built is left out
    /// and reported in the status line; the base layers are still returned.
    pub fn compose(&self, state: &StoreState, selected: Option<usize>) -> Option<Frame> {
        let grid = state.grid_view()?;

        let mut layers = vec![build_tile(&self.tile_url), build_mesh(grid)];
        if self.labels {
            layers.push(build_text(grid));
        }

        let mut status = None;
        if let Some((index, descriptor)) = selected.and_then(|i| Some((i, state.overlays.get(i)?))) {
            match build_overlay(index, descriptor, state.overlay_version, grid) {
                Ok(layer) => {
                    status = Some(descriptor.id.clone());
                    layers.push(layer);
                }
                Err(e) => {
                    warn!(index, id = %descriptor.id, error = %e, "Overlay left out of render list");
                    status = Some(e.to_string());
                }
            }
        }

        Some(Frame { layers, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::parse_message;
    use crate::core::protocol::tests::grid_message;
    use crate::core::store::GridStateStore;
    use serde_json::json;

    fn store_with(layers: serde_json::Value) -> GridStateStore {
        let mut store = GridStateStore::new();
        store.apply(parse_message(&grid_message(2, layers)).unwrap());
        store
    }

    #[test]
    fn test_no_grid_no_frame() {
        let compositor = RenderCompositor::new("t", true);
        assert_eq!(compositor.compose(&StoreState::default(), None), None);
    }

    #[test]
    fn test_order_with_overlay() {
        let store = store_with(json!([
            {"id": "density", "type": "heatmap", "data": []},
            {"id": "flows", "type": "arc", "data": []}
        ]));
        let frame = RenderCompositor::new("t", true).compose(store.state(), Some(1)).unwrap();
        assert_eq!(frame.layer_ids(), ["sat-view-layer", "grid-layer", "grid-labels", "arc-layer-1"]);
        assert_eq!(frame.status.as_deref(), Some("flows"));
    }

    #[test]
    fn test_without_labels_or_overlays() {
        let store = store_with(json!([]));
        let frame = RenderCompositor::new("t", false).compose(store.state(), None).unwrap();
        assert_eq!(frame.layer_ids(), ["sat-view-layer", "grid-layer"]);
        assert_eq!(frame.status, None);
    }

    #[test]
    fn test_unsupported_overlay_is_excluded() {
        let store = store_with(json!([{"id": "cars", "type": "trips", "data": []}]));
        let frame = RenderCompositor::new("t", false).compose(store.state(), Some(0)).unwrap();
        assert_eq!(frame.layer_ids(), ["sat-view-layer", "grid-layer"]);
        assert_eq!(frame.status.as_deref(), Some("Layer type not yet supported: trips"));
    }

    #[test]
    fn test_out_of_range_selection_is_ignored() {
        let store = store_with(json!([{"id": "a", "type": "heatmap", "data": []}]));
        let frame = RenderCompositor::new("t", false).compose(store.state(), Some(5)).unwrap();
        assert_eq!(frame.layers.len(), 2);
    }

    #[test]
    fn test_compose_is_deterministic() {
        let store = store_with(json!([{"id": "a", "type": "heatmap", "data": [{"coordinates": [0, 0]}]}]));
        let compositor = RenderCompositor::new("t", true);
        assert_eq!(
            compositor.compose(store.state(), Some(0)),
            compositor.compose(store.state(), Some(0))
        );
    }
}
