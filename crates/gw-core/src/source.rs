//! Source-centric data model: render sources and the render layers that draw
//! them, in the vocabulary of a map style.
//!
//! Every `MapLayer::source_id` must name an existing `MapSource`. The
//! `StateManager` in `gw-engine` enforces that invariant; this module only
//! defines the shapes.

use crate::id::{LayerId, SourceId};
use crate::layer::DemEncoding;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Paint / layout / metadata property bag.
pub type PropertyMap = Map<String, Value>;

// ─── Sources ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SourceKind {
    #[serde(rename = "geojson")]
    GeoJson { data: Value },
    Vector {
        tiles: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_zoom: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_zoom: Option<f64>,
    },
    Raster {
        tiles: Vec<String>,
        tile_size: u32,
    },
    RasterDem {
        tiles: Vec<String>,
        tile_size: u32,
        #[serde(default)]
        encoding: DemEncoding,
    },
}

impl SourceKind {
    pub fn is_dem(&self) -> bool {
        matches!(self, SourceKind::RasterDem { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSource {
    pub id: SourceId,
    #[serde(flatten)]
    pub kind: SourceKind,
    /// Present in the engine before this workspace touched it (base map).
    /// Represented in state, never re-created or removed by reconciliation.
    #[serde(default)]
    pub is_base_layer: bool,
}

impl MapSource {
    pub fn new(id: SourceId, kind: SourceKind) -> Self {
        Self {
            id,
            kind,
            is_base_layer: false,
        }
    }
}

// ─── Render layers ───────────────────────────────────────────────────────

/// Render layer type, as understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderKind {
    Background,
    Fill,
    FillExtrusion,
    Line,
    Circle,
    Symbol,
    Raster,
    Hillshade,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapLayer {
    pub id: LayerId,
    #[serde(rename = "type")]
    pub kind: RenderKind,
    /// `None` only for layers that draw without data (background).
    #[serde(default, rename = "source", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<SourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub paint: PropertyMap,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub layout: PropertyMap,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: PropertyMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<f64>,
    #[serde(default)]
    pub is_base_layer: bool,
}

impl MapLayer {
    pub fn new(id: LayerId, kind: RenderKind, source_id: SourceId) -> Self {
        Self {
            id,
            kind,
            source_id: Some(source_id),
            source_layer: None,
            filter: None,
            paint: PropertyMap::new(),
            layout: PropertyMap::new(),
            metadata: PropertyMap::new(),
            min_zoom: None,
            max_zoom: None,
            is_base_layer: false,
        }
    }

    #[must_use]
    pub fn with_paint(mut self, name: &str, value: Value) -> Self {
        self.paint.insert(name.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_layout(mut self, name: &str, value: Value) -> Self {
        self.layout.insert(name.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Whether two versions of a layer differ in something that cannot be
    /// patched through property setters.
    pub fn structurally_differs(&self, other: &MapLayer) -> bool {
        self.kind != other.kind
            || self.source_id != other.source_id
            || self.source_layer != other.source_layer
            || self.filter != other.filter
            || self.min_zoom != other.min_zoom
            || self.max_zoom != other.max_zoom
    }
}

/// Partial layer update. Each map is merged per key into the existing layer;
/// a `null` value removes the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerPatch {
    pub paint: PropertyMap,
    pub layout: PropertyMap,
    pub metadata: PropertyMap,
}

// ─── Terrain & snapshots ─────────────────────────────────────────────────

/// The single active elevation source driving 3D relief.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    pub source: SourceId,
    pub exaggeration: f64,
}

/// Everything currently registered in an engine's style, bottom to top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleSnapshot {
    pub sources: Vec<MapSource>,
    pub layers: Vec<MapLayer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn source_serializes_in_style_vocabulary() {
        let src = MapSource::new(
            SourceId::intern("dem"),
            SourceKind::RasterDem {
                tiles: vec!["https://dem/{z}/{x}/{y}.png".into()],
                tile_size: 512,
                encoding: DemEncoding::Terrarium,
            },
        );
        let v = serde_json::to_value(&src).unwrap();
        assert_eq!(v["type"], json!("raster-dem"));
        assert_eq!(v["tileSize"], json!(512));
        assert_eq!(v["encoding"], json!("terrarium"));
    }

    #[test]
    fn layer_serializes_source_field() {
        let layer = MapLayer::new(LayerId::intern("water"), RenderKind::Fill, SourceId::intern("osm"))
            .with_paint("fill-color", json!("#0af"));
        let v = serde_json::to_value(&layer).unwrap();
        assert_eq!(v["source"], json!("osm"));
        assert_eq!(v["type"], json!("fill"));
        assert_eq!(v["paint"]["fill-color"], json!("#0af"));
        assert!(v.get("layout").is_none());
    }

    #[test]
    fn paint_change_is_not_structural() {
        let a = MapLayer::new(LayerId::intern("l"), RenderKind::Line, SourceId::intern("s"));
        let b = a.clone().with_paint("line-width", json!(3));
        assert!(!a.structurally_differs(&b));
        let c = a.clone().with_filter(json!(["==", "$type", "LineString"]));
        assert!(a.structurally_differs(&c));
    }
}
