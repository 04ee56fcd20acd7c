//! CityScope projection - real-time spatial layer sync for projection-mapped tables
//!
//! Subscribes to one cityIO table over WebSocket and keeps an ordered render
//! list up to date:
//! - Satellite basemap, grid cell mesh and cell labels
//! - One user-selected analytical overlay (heatmap, arcs, extruded GeoJSON)
//!
//! The camera is locked top-down and persisted per device, together with the
//! keystone calibration of the projection surface.

pub mod core;
pub mod session;
pub mod storage;
pub mod time;
pub mod ws_state;

#[cfg(feature = "cli")]
pub mod websocket_native;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
mod web;
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub mod web_storage;
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub mod websocket_wasm;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub use web::ProjectionApp;

pub use session::{InputOutcome, Painter, ProjectionSession};
