//! Platform-agnostic core module - shared between WASM and CLI

pub mod color;
pub mod compositor;
pub mod grid;
pub mod input;
pub mod layers;
pub mod link;
pub mod persist;
pub mod protocol;
pub mod selector;
pub mod settings;
pub mod store;
pub mod view;

pub use color::{hex_to_rgba, Color};
pub use compositor::{Frame, RenderCompositor};
pub use grid::{reconcile, GridFeature, GridHeader, GridState, LngLat};
pub use input::{EditModes, InputEvent, SurfaceStyle};
pub use layers::{DependencyKey, LayerError, LayerSpec};
pub use link::{ConnectionSlot, ConnectionSupervisor};
pub use persist::{BlobStore, MemoryBlobStore, StorageError};
pub use protocol::{parse_message, InboundMessage, OutboundMessage, OverlayLayerDescriptor, ProtocolError, TableName};
pub use selector::LayerSelector;
pub use settings::{MapStyle, Settings};
pub use store::{reduce, GridStateStore, StoreState};
pub use view::{ViewState, ViewStateManager};
