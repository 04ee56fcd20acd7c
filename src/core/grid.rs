//! Grid geometry and per-cell attribute reconciliation
//!
//! A table's grid is a fixed set of polygons loaded once per session. Only the
//! `properties` of each cell change afterwards, delivered as a positional array
//! of attribute records aligned to the features by index.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, trace};

use super::color::Color;

/// Per-cell property bag (color, height, name, ...)
pub type Properties = Map<String, Value>;

/// Geographic position. Accepts `[lng, lat]` or `[lng, lat, z]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn midpoint(&self, other: &LngLat) -> LngLat {
        LngLat::new((self.lng + other.lng) / 2.0, (self.lat + other.lat) / 2.0)
    }
}

impl TryFrom<Vec<f64>> for LngLat {
    type Error = String;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [lng, lat, ..] => Ok(LngLat::new(*lng, *lat)),
            _ => Err(format!("position needs at least 2 coordinates, got {}", v.len())),
        }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(p: LngLat) -> Self {
        [p.lng, p.lat]
    }
}

/// Table header: geographic anchor, rotation and cell layout.
/// Immutable for the life of a table session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridHeader {
    pub latitude: f64,
    pub longitude: f64,
    /// Rotation in degrees
    #[serde(rename = "rotation", default)]
    pub rotation_degrees: f64,
    #[serde(rename = "cellSize")]
    pub cell_size: f64,
    #[serde(rename = "ncols")]
    pub num_cols: u32,
    #[serde(rename = "nrows")]
    pub num_rows: u32,
}

impl GridHeader {
    /// Physical table aspect ratio (columns / rows), used to size the projection surface
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.num_rows == 0 {
            return None;
        }
        Some(self.num_cols as f64 / self.num_rows as f64)
    }
}

/// Polygon geometry: outer ring first, closed (last point repeats the first)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    #[serde(default)]
    pub coordinates: Vec<Vec<LngLat>>,
}

impl Polygon {
    pub fn outer_ring(&self) -> &[LngLat] {
        self.coordinates.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// One grid cell. Geometry is shared between successive grid states; only the
/// properties are ever replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridFeature {
    pub geometry: Arc<Polygon>,
    #[serde(default)]
    pub properties: Properties,
}

impl GridFeature {
    /// Approximate cell centre: midpoint of ring points 1 and `len - 2`.
    ///
    /// For a closed rectangular ring these are opposite corners, so this is the
    /// rectangle centre. Not a true polygon centroid and must stay this way to
    /// line up with existing tables.
    pub fn centroid(&self) -> Option<LngLat> {
        let ring = self.geometry.outer_ring();
        let first = ring.get(1).or(ring.first())?;
        let last = ring
            .len()
            .checked_sub(2)
            .and_then(|i| ring.get(i))
            .unwrap_or(first);
        Some(first.midpoint(last))
    }

    /// Fill colour from `properties.color`, black when absent or invalid
    pub fn color(&self) -> Color {
        self.properties
            .get("color")
            .and_then(Color::from_json)
            .unwrap_or(Color::BLACK)
    }

    /// Extrusion height from `properties.height`, 0 when absent
    pub fn height(&self) -> f64 {
        self.properties
            .get("height")
            .and_then(Value::as_f64)
            .filter(|h| h.is_finite())
            .unwrap_or(0.0)
    }

    /// Two-character label: `name` if present, else the positional `id`
    pub fn label(&self) -> Option<String> {
        let text = match self.properties.get("name") {
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            _ => match self.properties.get("id")? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            },
        };
        Some(text.chars().take(2).collect())
    }
}

/// Header plus cells for one table. `features.len()` never changes within a session.
#[derive(Debug, Clone, PartialEq)]
pub struct GridState {
    pub header: GridHeader,
    pub features: Vec<GridFeature>,
}

impl GridState {
    pub fn new(header: GridHeader, features: Vec<GridFeature>) -> Self {
        Self { header, features }
    }

    pub fn cell_count(&self) -> usize {
        self.features.len()
    }
}

/// Merge positional attribute records into the grid.
///
/// Record `i` (plus `id: i`) replaces the properties of feature `i` for every
/// index both sequences share. Cells past the shorter length keep their prior
/// properties. Geometry is shared, never copied or touched. Returns a new state;
/// the input is left as is for any reader still holding it.
pub fn reconcile(grid: &GridState, records: &[Value]) -> GridState {
    let n = grid.features.len();
    let m = records.len();
    if n != m {
        debug!(features = n, records = m, "Attribute count differs from cell count, merging common prefix");
    }

    let features = grid
        .features
        .iter()
        .enumerate()
        .map(|(i, feature)| match records.get(i) {
            Some(record) => GridFeature {
                geometry: Arc::clone(&feature.geometry),
                properties: with_id(record, i),
            },
            None => feature.clone(),
        })
        .collect();

    trace!(merged = n.min(m), "Attributes reconciled");
    GridState::new(grid.header.clone(), features)
}

fn with_id(record: &Value, index: usize) -> Properties {
    let mut properties = match record {
        Value::Object(map) => map.clone(),
        _ => Properties::new(),
    };
    properties.insert("id".to_string(), Value::from(index));
    properties
}
