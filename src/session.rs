//! One table session: message reduction, selection, camera and render list
//!
//! The session is driven from a single control thread by three kinds of
//! events: transport messages ([`ProjectionSession::handle_text`]), input
//! events ([`ProjectionSession::handle_input`]) and camera changes reported by
//! the painter ([`ProjectionSession::on_camera_change`]). After each event the
//! current [`Frame`] reflects the new state.

use std::rc::Rc;
use tracing::{debug, info, trace, warn};

use crate::core::layers::{TileBitmap, TileCoord};
use crate::core::persist::{view_state_key, KEYSTONE_KEY};
use crate::core::protocol::ProtocolError;
use crate::core::store::Change;
use crate::core::view::ViewStateError;
use crate::core::{
    parse_message, BlobStore, EditModes, Frame, GridStateStore, InputEvent, LayerSelector, LayerSpec,
    RenderCompositor, Settings, SurfaceStyle, TableName, ViewState, ViewStateManager,
};
use crate::time::now_seconds;

/// Rendering engine boundary: paints `layers` in order under `camera`.
/// Camera changes it observes go back through [`ProjectionSession::on_camera_change`].
pub trait Painter {
    fn paint(&mut self, camera: &ViewState, layers: &[LayerSpec]);
}

/// What an input event did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Unchanged,
    /// Render list or surface changed
    Redraw,
    /// Persisted state cleared; the transport should reconnect and resubscribe
    Restart,
}

pub struct ProjectionSession {
    table: TableName,
    store: GridStateStore,
    selector: LayerSelector,
    /// Created from the header of the first snapshot
    view: Option<ViewStateManager>,
    modes: EditModes,
    compositor: RenderCompositor,
    blobs: Rc<dyn BlobStore>,
    frame: Option<Frame>,
    last_update: Option<f64>,
}

impl ProjectionSession {
    pub fn new(table: TableName, settings: &Settings, blobs: Rc<dyn BlobStore>) -> Self {
        info!(table = %table, "Starting projection session");
        Self {
            table,
            store: GridStateStore::new(),
            selector: LayerSelector::default(),
            view: None,
            modes: EditModes::default(),
            compositor: RenderCompositor::new(settings.tile_url_template(), settings.labels),
            blobs,
            frame: None,
            last_update: None,
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Reduce one inbound text frame into the session.
    ///
    /// Bad messages are returned as errors and leave the state untouched.
    pub fn handle_text(&mut self, msg: &str) -> Result<Change, ProtocolError> {
        let message = parse_message(msg)?;
        trace!(kind = %message.kind(), "Message received");

        let change = self.store.apply(message);
        let overlays = self.store.overlay_count();

        if change.reset {
            self.selector.reset(overlays);
            if self.view.is_none() {
                self.view = self.store.state().grid.as_ref().map(|grid| {
                    ViewStateManager::load(&grid.header, self.blobs.clone(), view_state_key(&self.table))
                });
            }
        } else if change.overlays {
            self.selector.resize(overlays);
        }

        if !change.is_empty() {
            self.last_update = Some(now_seconds());
            self.recompose();
        }
        Ok(change)
    }

    pub fn handle_input(&mut self, event: InputEvent) -> InputOutcome {
        debug!(?event, "Input event");
        match event {
            InputEvent::AdvanceLayer => {
                if self.selector.advance().is_none() {
                    return InputOutcome::Unchanged;
                }
                self.recompose();
                InputOutcome::Redraw
            }
            InputEvent::ToggleEditMode => {
                let on = self.modes.toggle_edit_mode();
                info!(edit_mode = on, "Keystone edit mode toggled");
                InputOutcome::Redraw
            }
            InputEvent::ToggleViewStateEditor => {
                let on = self.modes.toggle_view_state_editor();
                info!(view_state_editor = on, "View state editor toggled");
                InputOutcome::Redraw
            }
            InputEvent::Reset => {
                self.reset();
                InputOutcome::Restart
            }
        }
    }

    /// Camera moved in the painter. Returns the locked pose now in effect,
    /// `None` before the first snapshot.
    pub fn on_camera_change(&mut self, proposed: ViewState) -> Option<ViewState> {
        Some(self.view.as_mut()?.on_camera_change(proposed))
    }

    /// Numeric edit from the view-state editor; ignored while the editor is hidden
    pub fn edit_view_field(&mut self, field: &str, value: f64) -> Result<Option<ViewState>, ViewStateError> {
        if !self.modes.view_state_editor {
            debug!(field, "View state editor hidden, ignoring edit");
            return Ok(None);
        }
        match self.view.as_mut() {
            Some(view) => view.edit_field(field, value).map(Some),
            None => Ok(None),
        }
    }

    /// Clear both persisted blobs and start over with an empty state
    pub fn reset(&mut self) {
        warn!(table = %self.table, "Clearing saved calibration and restarting session");
        if let Err(e) = self.blobs.remove(KEYSTONE_KEY) {
            warn!(error = %e, "Failed to clear keystone state");
        }
        match &self.view {
            Some(view) => view.clear(),
            None => {
                if let Err(e) = self.blobs.remove(&view_state_key(&self.table)) {
                    warn!(error = %e, "Failed to clear saved view state");
                }
            }
        }

        self.store.clear();
        self.selector = LayerSelector::default();
        self.view = None;
        self.modes = EditModes::default();
        self.frame = None;
        self.last_update = None;
    }

    /// Paint the current frame; false when nothing can be painted yet
    pub fn render(&self, painter: &mut dyn Painter) -> bool {
        match (&self.frame, &self.view) {
            (Some(frame), Some(view)) => {
                painter.paint(view.pose(), &frame.layers);
                true
            }
            _ => false,
        }
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn camera(&self) -> Option<&ViewState> {
        self.view.as_ref().map(ViewStateManager::pose)
    }

    pub fn status(&self) -> Option<&str> {
        self.frame.as_ref()?.status.as_deref()
    }

    pub fn modes(&self) -> EditModes {
        self.modes
    }

    pub fn selected_overlay(&self) -> Option<usize> {
        self.selector.current()
    }

    /// Keystone surface props; `None` until the table ratio is known
    pub fn surface(&self) -> Option<SurfaceStyle> {
        let ratio = self.store.state().table_ratio()?;
        Some(SurfaceStyle::new(ratio, self.modes))
    }

    /// URL and geographic bounds of one basemap tile; `None` before the first frame
    pub fn tile_bitmap(&self, coord: TileCoord) -> Option<TileBitmap> {
        self.frame.as_ref()?.layers.iter().find_map(|layer| match layer {
            LayerSpec::Tile(tile) => Some(tile.bitmap(coord)),
            _ => None,
        })
    }

    /// `now_seconds()` of the last message that changed state
    pub fn last_update(&self) -> Option<f64> {
        self.last_update
    }

    fn recompose(&mut self) {
        self.frame = self.compositor.compose(self.store.state(), self.selector.current());
        if let Some(frame) = &self.frame {
            debug!(layers = ?frame.layer_ids(), status = ?frame.status, "Render list rebuilt");
        }
    }
}
