//! Browser entry point
//!
//! A JavaScript painter drives `ProjectionApp`: it calls `tick()` once per
//! animation frame, paints `frame_json()` under `camera_json()` and reports
//! camera moves and key presses back.

use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;

use crate::core::layers::TileCoord;
use crate::core::{BlobStore, InputEvent, MemoryBlobStore, Settings, TableName, ViewState};
use crate::session::{InputOutcome, ProjectionSession};
use crate::web_storage::LocalStorageBlobStore;
use crate::websocket_wasm::{MessageBuffer, WsClient};

const BUDGET_MS: f64 = 12.0;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    // Initialize tracing for browser console
    tracing_wasm::set_as_global_default();
}

#[wasm_bindgen]
pub struct ProjectionApp {
    session: ProjectionSession,
    ws_url: String,
    msg_buffer: MessageBuffer,
    client: Option<WsClient>,
}

#[wasm_bindgen]
impl ProjectionApp {
    /// Start a session for `table`. `url` overrides the cityIO endpoint.
    #[wasm_bindgen(constructor)]
    pub fn new(table: &str, url: Option<String>, mapbox_token: Option<String>) -> Result<ProjectionApp, JsValue> {
        let table = TableName::parse(Some(table)).ok_or_else(|| JsValue::from_str("table name is required"))?;

        let mut settings = Settings::default();
        if let Some(url) = url {
            settings.ws_url = url;
        }
        if let Some(token) = mapbox_token {
            settings.mapbox_token = token;
        }

        let blobs: Rc<dyn BlobStore> = match LocalStorageBlobStore::new() {
            Ok(store) => Rc::new(store),
            Err(e) => {
                warn!(error = %e, "localStorage unavailable, calibration will not persist");
                Rc::new(MemoryBlobStore::new())
            }
        };

        let session = ProjectionSession::new(table.clone(), &settings, blobs);
        let msg_buffer: MessageBuffer = Rc::new(std::cell::RefCell::new(VecDeque::new()));
        let client = WsClient::connect(&settings.ws_url, table, msg_buffer.clone());

        Ok(Self {
            session,
            ws_url: settings.ws_url,
            msg_buffer,
            client: Some(client),
        })
    }

    /// Drain buffered messages within the frame budget. Returns true when the
    /// render list changed.
    pub fn tick(&mut self) -> bool {
        let deadline = js_sys::Date::now() + BUDGET_MS;
        let mut changed = false;
        loop {
            let Some(msg) = self.msg_buffer.borrow_mut().pop_front() else {
                break;
            };
            match self.session.handle_text(&msg) {
                Ok(change) => changed |= !change.is_empty(),
                Err(e) => warn!(error = %e, "Dropping message"),
            }
            if js_sys::Date::now() >= deadline {
                break;
            }
        }
        changed
    }

    /// Current render list as JSON, `undefined` before the first snapshot
    pub fn frame_json(&self) -> Result<Option<String>, JsValue> {
        self.session.frame().map(to_json).transpose()
    }

    pub fn camera_json(&self) -> Result<Option<String>, JsValue> {
        self.session.camera().map(to_json).transpose()
    }

    /// Keystone surface props as JSON
    pub fn surface_json(&self) -> Result<Option<String>, JsValue> {
        self.session.surface().as_ref().map(to_json).transpose()
    }

    /// URL and `[west, south, east, north]` bounds of basemap tile `z/x/y`
    pub fn tile_bitmap_json(&self, z: u8, x: u32, y: u32) -> Result<Option<String>, JsValue> {
        self.session.tile_bitmap(TileCoord { z, x, y }).as_ref().map(to_json).transpose()
    }

    pub fn status(&self) -> Option<String> {
        self.session.status().map(str::to_string)
    }

    pub fn connection(&self) -> String {
        match &self.client {
            Some(client) => client.state().to_string(),
            None => "Disconnected".to_string(),
        }
    }

    /// Camera moved in the painter; returns the locked pose to apply
    pub fn on_camera_change(&mut self, json: &str) -> Result<Option<String>, JsValue> {
        let proposed: ViewState = serde_json::from_str(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.session.on_camera_change(proposed).as_ref().map(to_json).transpose()
    }

    /// Numeric edit from the view-state editor
    pub fn edit_view_field(&mut self, field: &str, value: f64) -> Result<Option<String>, JsValue> {
        let pose = self
            .session
            .edit_view_field(field, value)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        pose.as_ref().map(to_json).transpose()
    }

    /// Key press (`KeyboardEvent.key`) or `"reset"`. Returns true when a redraw is needed.
    pub fn key(&mut self, name: &str) -> bool {
        let event = match name {
            "reset" => InputEvent::Reset,
            _ => match InputEvent::from_key(name) {
                Some(event) => event,
                None => return false,
            },
        };
        match self.session.handle_input(event) {
            InputOutcome::Unchanged => false,
            InputOutcome::Redraw => true,
            InputOutcome::Restart => {
                self.restart();
                true
            }
        }
    }
}

impl ProjectionApp {
    fn restart(&mut self) {
        info!(url = %self.ws_url, "Reconnecting after reset");
        self.client = None;
        self.msg_buffer.borrow_mut().clear();
        self.client = Some(WsClient::connect(
            &self.ws_url,
            self.session.table().clone(),
            self.msg_buffer.clone(),
        ));
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}
