//! Discrete input events and the edit-mode toggles they drive
//!
//! Key presses are turned into [`InputEvent`]s by the shell and routed to the
//! state owners explicitly; nothing listens to raw keys globally.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Show the next overlay layer
    AdvanceLayer,
    /// Toggle keystone corner editing on the projection surface
    ToggleEditMode,
    /// Toggle the numeric camera pose editor
    ToggleViewStateEditor,
    /// Clear persisted calibration and restart the session
    Reset,
}

impl InputEvent {
    /// Key bindings: Enter cycles layers, Space toggles keystone editing, `z` the pose editor
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Enter" => Some(InputEvent::AdvanceLayer),
            " " => Some(InputEvent::ToggleEditMode),
            "z" => Some(InputEvent::ToggleViewStateEditor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditModes {
    pub edit_mode: bool,
    pub view_state_editor: bool,
}

impl EditModes {
    pub fn toggle_edit_mode(&mut self) -> bool {
        self.edit_mode = !self.edit_mode;
        self.edit_mode
    }

    pub fn toggle_view_state_editor(&mut self) -> bool {
        self.view_state_editor = !self.view_state_editor;
        self.view_state_editor
    }
}

/// Props for the keystone surface wrapping the rendered map.
///
/// The surface is one viewport high and `ratio` viewports wide so the map keeps
/// the physical table's proportions. Edit mode paints it red to make the
/// corners easy to find on the projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceStyle {
    pub is_edit_mode: bool,
    /// Height in viewport-height units
    pub height_vh: f64,
    /// Width in viewport-height units
    pub width_vh: f64,
    pub background_color: Option<&'static str>,
    pub border: &'static str,
}

impl SurfaceStyle {
    pub fn new(table_ratio: f64, modes: EditModes) -> Self {
        Self {
            is_edit_mode: modes.edit_mode,
            height_vh: 100.0,
            width_vh: table_ratio * 100.0,
            background_color: modes.edit_mode.then_some("red"),
            border: if modes.edit_mode { "1px solid red" } else { "1px solid white" },
        }
    }
}
