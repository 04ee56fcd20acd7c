//! Layer factory: descriptors and grid state to renderer-ready layer specs
//!
//! Every builder is a pure function. The produced [`LayerSpec`] serializes to
//! the JSON a deck.gl-style painter consumes and carries a [`DependencyKey`]
//! so the painter can skip rebuilding layers whose inputs did not change.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::f64::consts::PI;
use std::hash::{Hash, Hasher};
use thiserror::Error;
use tracing::{debug, trace};

use super::color::{hex_to_rgba, Color};
use super::grid::{GridState, LngLat, Properties};
use super::protocol::OverlayLayerDescriptor;

/// Horizontal mesh scale divisor: each block is `cellSize / MESH_SCALE_DIVISOR` wide
pub const MESH_SCALE_DIVISOR: f64 = 2.1;

pub const HEATMAP_RADIUS_PIXELS: f64 = 100.0;
pub const HEATMAP_INTENSITY: f64 = 0.5;
pub const HEATMAP_OPACITY: f64 = 0.85;
pub const HEATMAP_THRESHOLD: f64 = 0.5;
/// Heatmap points are lifted above the grid blocks
const HEATMAP_ELEVATION: f64 = 100.0;
/// green → yellow → red → transparent
pub const HEATMAP_COLOR_RANGE: [[u8; 4]; 4] = [
    [0, 255, 0, 255],
    [255, 255, 0, 255],
    [255, 0, 0, 255],
    [0, 0, 0, 0],
];

pub const ARC_SOURCE_COLOR: Color = Color::Rgb([255, 0, 0]);
pub const ARC_TARGET_COLOR: Color = Color::Rgb([0, 255, 0]);

pub const GEOJSON_ELEVATION: f64 = 30.0;
pub const GEOJSON_LINE_WIDTH_SCALE: f64 = 20.0;
pub const GEOJSON_LINE_WIDTH_MIN_PIXELS: f64 = 2.0;

pub const TILE_LAYER_ID: &str = "sat-view-layer";
pub const TILE_MIN_ZOOM: u8 = 0;
pub const TILE_MAX_ZOOM: u8 = 21;
pub const TILE_SIZE: u32 = 256;

pub const MESH_LAYER_ID: &str = "grid-layer";
pub const MESH_OPACITY: f64 = 0.9;
pub const TEXT_LAYER_ID: &str = "grid-labels";

/// Overlay builders that failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayerError {
    #[error("Layer type not yet supported: {0}")]
    Unsupported(String),

    #[error("Layer {id} has malformed data: {reason}")]
    Malformed { id: String, reason: String },
}

/// Comparable stamp of the upstream state a layer was built from.
///
/// Two specs with equal keys were built from the same inputs; a painter may
/// keep its previous GPU state for them. Serialized as a hex string so it
/// survives a trip through JavaScript numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyKey(u64);

impl DependencyKey {
    pub fn of<T: Hash + ?Sized>(inputs: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        inputs.hash(&mut hasher);
        DependencyKey(hasher.finish())
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Serialize for DependencyKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{:016x}", self.0))
    }
}

/// Read view of the grid plus the version it was published under
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    pub grid: &'a GridState,
    pub version: u64,
}

/// Overlay types the factory knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Heatmap,
    Arc,
    GeoJson,
}

impl OverlayKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "heatmap" => Some(OverlayKind::Heatmap),
            "arc" => Some(OverlayKind::Arc),
            "geojson" => Some(OverlayKind::GeoJson),
            _ => None,
        }
    }
}

// ============================================================================
// Layer specs
// ============================================================================

/// A renderer-ready layer. Painted in list order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerSpec {
    Tile(TileLayerSpec),
    Mesh(MeshLayerSpec),
    Text(TextLayerSpec),
    Heatmap(HeatmapLayerSpec),
    Arc(ArcLayerSpec),
    #[serde(rename = "geojson")]
    GeoJson(GeoJsonLayerSpec),
}

impl LayerSpec {
    pub fn id(&self) -> &str {
        match self {
            LayerSpec::Tile(l) => &l.id,
            LayerSpec::Mesh(l) => &l.id,
            LayerSpec::Text(l) => &l.id,
            LayerSpec::Heatmap(l) => &l.id,
            LayerSpec::Arc(l) => &l.id,
            LayerSpec::GeoJson(l) => &l.id,
        }
    }

    pub fn key(&self) -> DependencyKey {
        match self {
            LayerSpec::Tile(l) => l.key,
            LayerSpec::Mesh(l) => l.key,
            LayerSpec::Text(l) => l.key,
            LayerSpec::Heatmap(l) => l.key,
            LayerSpec::Arc(l) => l.key,
            LayerSpec::GeoJson(l) => l.key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedPoint {
    pub position: [f64; 3],
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapLayerSpec {
    pub id: String,
    pub key: DependencyKey,
    pub points: Vec<WeightedPoint>,
    pub radius_pixels: f64,
    pub intensity: f64,
    pub opacity: f64,
    pub threshold: f64,
    pub color_range: [[u8; 4]; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcSegment {
    pub source: LngLat,
    pub target: LngLat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcLayerSpec {
    pub id: String,
    pub key: DependencyKey,
    pub arcs: Vec<ArcSegment>,
    pub source_color: Color,
    pub target_color: Color,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtrudedPolygon {
    pub rings: Vec<Vec<LngLat>>,
    pub fill_color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonLayerSpec {
    pub id: String,
    pub key: DependencyKey,
    pub polygons: Vec<ExtrudedPolygon>,
    pub line_color: Color,
    pub extruded: bool,
    pub elevation: f64,
    pub line_width_scale: f64,
    pub line_width_min_pixels: f64,
}

/// Raster basemap. The painter fetches `url_template` per tile and draws each
/// response as a bitmap over the tile's bounding box (see [`TileLayerSpec::bitmap`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLayerSpec {
    pub id: String,
    pub key: DependencyKey,
    pub url_template: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub tile_size: u32,
}

/// Slippy-map tile address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// Geographic bounds `[west, south, east, north]` in degrees (web mercator)
    pub fn bounds(&self) -> [f64; 4] {
        let n = 2f64.powi(self.z as i32);
        let lng = |x: f64| x / n * 360.0 - 180.0;
        let lat = |y: f64| (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
        let (x, y) = (self.x as f64, self.y as f64);
        [lng(x), lat(y + 1.0), lng(x + 1.0), lat(y)]
    }
}

/// One fetched tile placed on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileBitmap {
    pub url: String,
    pub bounds: [f64; 4],
}

impl TileLayerSpec {
    pub fn tile_url(&self, coord: TileCoord) -> String {
        self.url_template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }

    pub fn bitmap(&self, coord: TileCoord) -> TileBitmap {
        TileBitmap {
            url: self.tile_url(coord),
            bounds: coord.bounds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshCell {
    /// Position of the cell in the grid feature sequence
    pub index: usize,
    pub position: [f64; 3],
    pub color: Color,
}

/// One extruded block per grid cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshLayerSpec {
    pub id: String,
    pub key: DependencyKey,
    pub cells: Vec<MeshCell>,
    /// Shared by every block: `[-180, rotation, -90]`
    pub orientation: [f64; 3],
    /// Shared by every block: `[cellSize / k, 1, cellSize / k]`
    pub scale: [f64; 3],
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellLabel {
    pub text: String,
    pub position: [f64; 3],
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayerSpec {
    pub id: String,
    pub key: DependencyKey,
    pub labels: Vec<CellLabel>,
}

// ============================================================================
// Base layer builders
// ============================================================================

/// Basemap tile layer for a styled tile endpoint
pub fn build_tile(url_template: &str) -> LayerSpec {
    LayerSpec::Tile(TileLayerSpec {
        id: TILE_LAYER_ID.to_string(),
        key: DependencyKey::of(url_template),
        url_template: url_template.to_string(),
        min_zoom: TILE_MIN_ZOOM,
        max_zoom: TILE_MAX_ZOOM,
        tile_size: TILE_SIZE,
    })
}

/// Grid geometry as one block per cell
pub fn build_mesh(view: GridView<'_>) -> LayerSpec {
    let header = &view.grid.header;
    let cells = view
        .grid
        .features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| {
            let center = feature.centroid()?;
            Some(MeshCell {
                index,
                position: [center.lng, center.lat, 1.0],
                color: feature.color(),
            })
        })
        .collect::<Vec<_>>();

    let horizontal = header.cell_size / MESH_SCALE_DIVISOR;
    trace!(cells = cells.len(), "Mesh layer built");

    LayerSpec::Mesh(MeshLayerSpec {
        id: MESH_LAYER_ID.to_string(),
        key: DependencyKey::of(&(MESH_LAYER_ID, view.version)),
        cells,
        orientation: [-180.0, header.rotation_degrees, -90.0],
        scale: [horizontal, 1.0, horizontal],
        opacity: MESH_OPACITY,
    })
}

/// Two-character labels floating just above each block, in the inverse of the cell colour
pub fn build_text(view: GridView<'_>) -> LayerSpec {
    let labels = view
        .grid
        .features
        .iter()
        .filter_map(|feature| {
            let center = feature.centroid()?;
            Some(CellLabel {
                text: feature.label()?,
                position: [center.lng, center.lat, feature.height() + 1.0],
                color: feature.color().inverted(),
            })
        })
        .collect();

    LayerSpec::Text(TextLayerSpec {
        id: TEXT_LAYER_ID.to_string(),
        key: DependencyKey::of(&(TEXT_LAYER_ID, view.version)),
        labels,
    })
}

// ============================================================================
// Overlay builders
// ============================================================================

/// Build the overlay at `index` of the current overlay list.
///
/// `overlay_version` identifies the overlay batch the descriptor came from.
pub fn build_overlay(
    index: usize,
    descriptor: &OverlayLayerDescriptor,
    overlay_version: u64,
    _grid: GridView<'_>,
) -> Result<LayerSpec, LayerError> {
    let kind = OverlayKind::from_tag(&descriptor.layer_type)
        .ok_or_else(|| LayerError::Unsupported(descriptor.layer_type.clone()))?;
    let key = DependencyKey::of(&(overlay_version, index));

    debug!(index, id = %descriptor.id, kind = ?kind, "Building overlay layer");
    match kind {
        OverlayKind::Heatmap => build_heatmap(index, descriptor, key),
        OverlayKind::Arc => build_arc(index, descriptor, key),
        OverlayKind::GeoJson => build_geojson(index, descriptor, key),
    }
}

fn malformed(descriptor: &OverlayLayerDescriptor, reason: &str) -> LayerError {
    LayerError::Malformed {
        id: descriptor.id.clone(),
        reason: reason.to_string(),
    }
}

fn data_items<'a>(descriptor: &'a OverlayLayerDescriptor) -> Result<&'a [Value], LayerError> {
    descriptor
        .data
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| malformed(descriptor, "data must be an array"))
}

/// Deserialize each item, dropping the ones that do not fit
fn parse_items<T: for<'de> Deserialize<'de>>(items: &[Value]) -> Vec<T> {
    let parsed: Vec<T> = items.iter().filter_map(|item| T::deserialize(item).ok()).collect();
    if parsed.len() != items.len() {
        debug!(skipped = items.len() - parsed.len(), "Skipped malformed overlay items");
    }
    parsed
}

#[derive(Deserialize)]
struct HeatmapDatum {
    coordinates: LngLat,
    #[serde(default = "default_weight")]
    weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

fn build_heatmap(
    index: usize,
    descriptor: &OverlayLayerDescriptor,
    key: DependencyKey,
) -> Result<LayerSpec, LayerError> {
    let points = parse_items::<HeatmapDatum>(data_items(descriptor)?)
        .into_iter()
        .map(|d| WeightedPoint {
            position: [d.coordinates.lng, d.coordinates.lat, HEATMAP_ELEVATION],
            weight: d.weight,
        })
        .collect();

    Ok(LayerSpec::Heatmap(HeatmapLayerSpec {
        id: format!("heatmap-layer-{index}"),
        key,
        points,
        radius_pixels: HEATMAP_RADIUS_PIXELS,
        intensity: HEATMAP_INTENSITY,
        opacity: HEATMAP_OPACITY,
        threshold: HEATMAP_THRESHOLD,
        color_range: HEATMAP_COLOR_RANGE,
    }))
}

#[derive(Deserialize)]
struct Endpoint {
    coordinates: LngLat,
}

#[derive(Deserialize)]
struct ArcDatum {
    from: Endpoint,
    to: Endpoint,
}

fn build_arc(
    index: usize,
    descriptor: &OverlayLayerDescriptor,
    key: DependencyKey,
) -> Result<LayerSpec, LayerError> {
    let arcs = parse_items::<ArcDatum>(data_items(descriptor)?)
        .into_iter()
        .map(|d| ArcSegment {
            source: d.from.coordinates,
            target: d.to.coordinates,
        })
        .collect();

    let width = descriptor
        .property("width")
        .and_then(Value::as_f64)
        .filter(|w| w.is_finite() && *w > 0.0)
        .unwrap_or(1.0);

    Ok(LayerSpec::Arc(ArcLayerSpec {
        id: format!("arc-layer-{index}"),
        key,
        arcs,
        source_color: ARC_SOURCE_COLOR,
        target_color: ARC_TARGET_COLOR,
        width,
    }))
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum PolygonGeometry {
    Polygon { coordinates: Vec<Vec<LngLat>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<LngLat>>> },
}

#[derive(Deserialize)]
struct PolygonFeature {
    geometry: PolygonGeometry,
    #[serde(default)]
    properties: Properties,
}

fn build_geojson(
    index: usize,
    descriptor: &OverlayLayerDescriptor,
    key: DependencyKey,
) -> Result<LayerSpec, LayerError> {
    // Either a FeatureCollection or a bare feature array
    let items = match descriptor.data.get("features") {
        Some(features) => features
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| malformed(descriptor, "features must be an array"))?,
        None => data_items(descriptor)?,
    };

    let default_fill = descriptor.property("fillColor").and_then(Value::as_str);
    let line_color = hex_to_rgba(descriptor.property("lineColor").and_then(Value::as_str));

    let mut polygons = Vec::new();
    for feature in parse_items::<PolygonFeature>(items) {
        let fill_color = hex_to_rgba(
            feature
                .properties
                .get("color")
                .and_then(Value::as_str)
                .or(default_fill),
        );
        match feature.geometry {
            PolygonGeometry::Polygon { coordinates } => polygons.push(ExtrudedPolygon {
                rings: coordinates,
                fill_color,
            }),
            PolygonGeometry::MultiPolygon { coordinates } => {
                polygons.extend(coordinates.into_iter().map(|rings| ExtrudedPolygon { rings, fill_color }))
            }
        }
    }

    Ok(LayerSpec::GeoJson(GeoJsonLayerSpec {
        id: format!("geojson-layer-{index}"),
        key,
        polygons,
        line_color,
        extruded: true,
        elevation: GEOJSON_ELEVATION,
        line_width_scale: GEOJSON_LINE_WIDTH_SCALE,
        line_width_min_pixels: GEOJSON_LINE_WIDTH_MIN_PIXELS,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::reconcile;
    use crate::core::grid::tests::grid;
    use serde_json::json;

    fn descriptor(layer_type: &str, data: Value, properties: Option<Value>) -> OverlayLayerDescriptor {
        OverlayLayerDescriptor {
            id: format!("{layer_type}-id"),
            layer_type: layer_type.to_string(),
            data,
            properties: properties.and_then(|p| p.as_object().cloned()),
        }
    }

    fn view(g: &GridState) -> GridView<'_> {
        GridView { grid: g, version: 1 }
    }

    #[test]
    fn test_heatmap() {
        let g = grid(1);
        let d = descriptor(
            "heatmap",
            json!([{"coordinates": [1.0, 2.0], "weight": 4}, {"coordinates": [3.0, 4.0]}, {"weight": 1}]),
            None,
        );
        let LayerSpec::Heatmap(layer) = build_overlay(2, &d, 7, view(&g)).unwrap() else {
            panic!("expected heatmap");
        };
        assert_eq!(layer.id, "heatmap-layer-2");
        assert_eq!(layer.points.len(), 2);
        assert_eq!(layer.points[0].position, [1.0, 2.0, 100.0]);
        assert_eq!(layer.points[0].weight, 4.0);
        assert_eq!(layer.points[1].weight, 1.0);
        assert_eq!(layer.radius_pixels, 100.0);
        assert_eq!(layer.color_range[3], [0, 0, 0, 0]);
    }

    #[test]
    fn test_arc_width() {
        let g = grid(1);
        let data = json!([{"from": {"coordinates": [0, 0]}, "to": {"coordinates": [1, 1]}}]);
        let LayerSpec::Arc(plain) = build_overlay(0, &descriptor("arc", data.clone(), None), 1, view(&g)).unwrap() else {
            panic!("expected arc");
        };
        assert_eq!(plain.width, 1.0);
        assert_eq!(plain.source_color, Color::Rgb([255, 0, 0]));
        assert_eq!(plain.target_color, Color::Rgb([0, 255, 0]));
        assert_eq!(plain.arcs[0].target, LngLat::new(1.0, 1.0));

        let wide = descriptor("arc", data, Some(json!({"width": 5})));
        let LayerSpec::Arc(wide) = build_overlay(0, &wide, 1, view(&g)).unwrap() else {
            panic!("expected arc");
        };
        assert_eq!(wide.width, 5.0);
    }

    #[test]
    fn test_geojson_colors() {
        let g = grid(1);
        let square = json!([[[0, 0], [1, 0], [1, 1], [0, 0]]]);
        let data = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Polygon", "coordinates": square}, "properties": {"color": "ff000080"}},
                {"type": "Feature", "geometry": {"type": "MultiPolygon", "coordinates": [square, square]}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0, 0]}}
            ]
        });
        let d = descriptor("geojson", data, Some(json!({"lineColor": "ffffff"})));
        let LayerSpec::GeoJson(layer) = build_overlay(1, &d, 1, view(&g)).unwrap() else {
            panic!("expected geojson");
        };
        assert_eq!(layer.id, "geojson-layer-1");
        assert_eq!(layer.polygons.len(), 3);
        assert_eq!(layer.polygons[0].fill_color, Color::Rgba([255, 0, 0, 128]));
        assert_eq!(layer.polygons[1].fill_color, Color::BLACK);
        assert_eq!(layer.line_color, Color::Rgb([255, 255, 255]));
        assert_eq!(layer.elevation, 30.0);
        assert_eq!(layer.line_width_scale, 20.0);
    }

    #[test]
    fn test_unsupported_type() {
        let g = grid(1);
        let err = build_overlay(0, &descriptor("trips", json!([]), None), 1, view(&g)).unwrap_err();
        assert_eq!(err, LayerError::Unsupported("trips".into()));
        assert_eq!(err.to_string(), "Layer type not yet supported: trips");
    }

    #[test]
    fn test_malformed_data() {
        let g = grid(1);
        let err = build_overlay(0, &descriptor("heatmap", json!({"a": 1}), None), 1, view(&g)).unwrap_err();
        assert!(matches!(err, LayerError::Malformed { .. }));
    }

    #[test]
    fn test_mesh() {
        let g = reconcile(&grid(2), &[json!({"color": [10, 20, 30]}), json!({"color": "ffffff"})]);
        let LayerSpec::Mesh(mesh) = build_mesh(view(&g)) else {
            panic!("expected mesh");
        };
        assert_eq!(mesh.id, "grid-layer");
        assert_eq!(mesh.cells.len(), 2);
        assert_eq!(mesh.cells[1].position, [1.5, 0.5, 1.0]);
        assert_eq!(mesh.cells[0].color, Color::Rgb([10, 20, 30]));
        assert_eq!(mesh.orientation, [-180.0, 90.0, -90.0]);
        assert_eq!(mesh.scale, [10.0, 1.0, 10.0]);
    }

    #[test]
    fn test_text_labels() {
        let g = reconcile(&grid(2), &[json!({"name": "Office", "color": [255, 0, 0], "height": 4}), json!({})]);
        let LayerSpec::Text(text) = build_text(view(&g)) else {
            panic!("expected text");
        };
        assert_eq!(text.labels[0].text, "Of");
        assert_eq!(text.labels[0].position[2], 5.0);
        assert_eq!(text.labels[0].color, Color::Rgb([0, 255, 255]));
        // falls back to the positional id
        assert_eq!(text.labels[1].text, "1");
        assert_eq!(text.labels[1].color, Color::Rgb([255, 255, 255]));
    }

    #[test]
    fn test_dependency_keys() {
        let g = grid(1);
        let v1 = GridView { grid: &g, version: 1 };
        let v2 = GridView { grid: &g, version: 2 };
        assert_eq!(build_mesh(v1).key(), build_mesh(v1).key());
        assert_ne!(build_mesh(v1).key(), build_mesh(v2).key());
        assert_ne!(build_mesh(v1).key(), build_text(v1).key());
        assert_eq!(build_tile("a").key(), build_tile("a").key());
        assert_ne!(build_tile("a").key(), build_tile("b").key());

        let d = descriptor("heatmap", json!([]), None);
        let a = build_overlay(0, &d, 3, v1).unwrap().key();
        assert_eq!(a, build_overlay(0, &d, 3, v2).unwrap().key());
        assert_ne!(a, build_overlay(0, &d, 4, v1).unwrap().key());
    }

    #[test]
    fn test_tile_bitmap_bounds() {
        let LayerSpec::Tile(tile) = build_tile("https://tiles/{z}/{x}/{y}") else {
            panic!("expected tile");
        };
        assert_eq!((tile.min_zoom, tile.max_zoom, tile.tile_size), (0, 21, 256));

        let bitmap = tile.bitmap(TileCoord { z: 1, x: 1, y: 0 });
        assert_eq!(bitmap.url, "https://tiles/1/1/0");
        let [west, south, east, north] = bitmap.bounds;
        assert_eq!((west, south, east), (0.0, 0.0, 180.0));
        assert!((north - 85.0511).abs() < 1e-3);
    }

    #[test]
    fn test_spec_serialization_tags() {
        let v = serde_json::to_value(build_tile("t")).unwrap();
        assert_eq!(v["type"], "tile");
        assert_eq!(v["id"], "sat-view-layer");
        assert_eq!(v["tileSize"], 256);
        assert!(v["key"].is_string());
    }
}
