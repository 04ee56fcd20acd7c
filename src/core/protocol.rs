//! cityIO WebSocket message parser
//!
//! Inbound messages are JSON objects tagged by `type`:
//! - `GRID`: full table snapshot (geometry, attributes, optional overlays)
//! - `GEOGRIDDATA_UPDATE`: replacement attribute array
//! - `INDICATOR`: replacement overlay list under `moduleData.deckgl`
//! - `ERROR`: diagnostic payload, logged only
//!
//! Outbound there is a single message, `LISTEN`, subscribing to one table.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::{trace, warn};

use super::grid::{GridFeature, GridHeader, GridState, Properties};

/// Errors for messages that cannot be turned into an [`InboundMessage`]
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message has no string `type` field")]
    MissingType,

    #[error("unrecognized message type: {0}")]
    UnknownType(String),

    #[error("malformed {kind} message: {source}")]
    Malformed {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} content must be {expected}")]
    UnexpectedShape {
        kind: MessageKind,
        expected: &'static str,
    },
}

/// Inbound message tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Snapshot,
    AttributeUpdate,
    OverlayUpdate,
    Error,
}

impl MessageKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "GRID" => Some(MessageKind::Snapshot),
            "GEOGRIDDATA_UPDATE" => Some(MessageKind::AttributeUpdate),
            "INDICATOR" => Some(MessageKind::OverlayUpdate),
            "ERROR" => Some(MessageKind::Error),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            MessageKind::Snapshot => "GRID",
            MessageKind::AttributeUpdate => "GEOGRIDDATA_UPDATE",
            MessageKind::OverlayUpdate => "INDICATOR",
            MessageKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Overlay visualization descriptor as published by analysis modules.
///
/// `layer_type` stays a raw string so an unknown tag reaches the layer factory
/// and can be reported there instead of failing the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayLayerDescriptor {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub properties: Option<Properties>,
}

impl OverlayLayerDescriptor {
    /// Look up an optional property
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref()?.get(key)
    }
}

/// Full table state carried by a `GRID` message
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub grid: GridState,
    pub attributes: Vec<Value>,
    pub overlays: Vec<OverlayLayerDescriptor>,
}

/// A parsed inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Snapshot(Box<Snapshot>),
    AttributeUpdate(Vec<Value>),
    OverlayUpdate(Vec<OverlayLayerDescriptor>),
    Error(Value),
}

impl InboundMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            InboundMessage::Snapshot(_) => MessageKind::Snapshot,
            InboundMessage::AttributeUpdate(_) => MessageKind::AttributeUpdate,
            InboundMessage::OverlayUpdate(_) => MessageKind::OverlayUpdate,
            InboundMessage::Error(_) => MessageKind::Error,
        }
    }
}

// Wire shape of GRID content
#[derive(Deserialize)]
struct GridContent {
    #[serde(rename = "GEOGRID")]
    geogrid: GeoGrid,
    #[serde(rename = "GEOGRIDDATA", default)]
    attributes: Option<Vec<Value>>,
    #[serde(rename = "LAYERS", default)]
    layers: Option<Value>,
    #[serde(default)]
    deckgl: Option<Value>,
}

#[derive(Deserialize)]
struct GeoGrid {
    properties: GeoGridProperties,
    #[serde(default)]
    features: Vec<GridFeature>,
}

#[derive(Deserialize)]
struct GeoGridProperties {
    header: GridHeader,
}

/// Parse one WebSocket text frame
pub fn parse_message(msg: &str) -> Result<InboundMessage, ProtocolError> {
    trace!(len = msg.len(), "Parsing message");

    let mut json: Value = serde_json::from_str(msg)?;
    let tag = json["type"].as_str().ok_or(ProtocolError::MissingType)?;
    let kind = MessageKind::from_tag(tag).ok_or_else(|| ProtocolError::UnknownType(tag.to_string()))?;
    let content = json.get_mut("content").map(Value::take).unwrap_or(Value::Null);

    match kind {
        MessageKind::Snapshot => {
            let content: GridContent = serde_json::from_value(content)
                .map_err(|source| ProtocolError::Malformed { kind, source })?;
            let layers = content.layers.or(content.deckgl).unwrap_or(Value::Null);
            Ok(InboundMessage::Snapshot(Box::new(Snapshot {
                grid: GridState::new(content.geogrid.properties.header, content.geogrid.features),
                attributes: content.attributes.unwrap_or_default(),
                overlays: parse_overlays(&layers),
            })))
        }
        MessageKind::AttributeUpdate => match content {
            Value::Array(records) => Ok(InboundMessage::AttributeUpdate(records)),
            _ => Err(ProtocolError::UnexpectedShape { kind, expected: "an array" }),
        },
        MessageKind::OverlayUpdate => {
            let layers = &content["moduleData"]["deckgl"];
            Ok(InboundMessage::OverlayUpdate(parse_overlays(layers)))
        }
        MessageKind::Error => Ok(InboundMessage::Error(content)),
    }
}

/// Parse an overlay list leniently: entries that are not valid descriptors are
/// dropped individually, anything that is not an array yields no overlays.
fn parse_overlays(value: &Value) -> Vec<OverlayLayerDescriptor> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            OverlayLayerDescriptor::deserialize(item)
                .map_err(|e| warn!(index = i, error = %e, "Skipping malformed overlay descriptor"))
                .ok()
        })
        .collect()
}

/// Name of the table (cityIO grid id) a session subscribes to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// `None` for a missing or blank name: no session starts without a table
    pub fn parse(name: Option<&str>) -> Option<Self> {
        let name = name?.trim();
        if name.is_empty() {
            return None;
        }
        Some(TableName(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Messages sent to cityIO
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "content")]
pub enum OutboundMessage {
    #[serde(rename = "LISTEN")]
    Listen {
        #[serde(rename = "gridId")]
        grid_id: String,
    },
}

impl OutboundMessage {
    pub fn listen(table: &TableName) -> Self {
        OutboundMessage::Listen {
            grid_id: table.as_str().to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
