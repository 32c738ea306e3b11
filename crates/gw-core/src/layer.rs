//! Layer-centric data model: what the layer store holds and what it hands to
//! a layer engine.

use crate::id::LayerId;
use crate::view::BBox;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Kinds ───────────────────────────────────────────────────────────────

/// What kind of dataset a layer displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    Vector,
    Raster,
    RasterDem,
    Wms,
    #[serde(rename = "geojson")]
    GeoJson,
}

/// How a raster layer's pixels are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterKind {
    Imagery,
    Elevation,
}

/// Pixel encoding of an elevation tile set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemEncoding {
    #[default]
    Mapbox,
    Terrarium,
}

// ─── Source payload ──────────────────────────────────────────────────────

/// The opaque payload a layer renders. Fetched by REST collaborators and
/// forwarded to the engine unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SourcePayload {
    /// Inline GeoJSON (feature, feature collection or geometry).
    #[serde(rename = "geojson")]
    GeoJson { data: Value },
    /// Tile URL templates (`{z}/{x}/{y}`), vector or raster.
    Tiles {
        tiles: Vec<String>,
        #[serde(default = "default_tile_size")]
        tile_size: u32,
        /// Layer inside a vector tile set. Ignored for raster tiles.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_layer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_zoom: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_zoom: Option<f64>,
    },
    /// Digital elevation model tiles.
    Dem {
        tiles: Vec<String>,
        #[serde(default = "default_tile_size")]
        tile_size: u32,
        #[serde(default)]
        encoding: DemEncoding,
    },
}

fn default_tile_size() -> u32 {
    256
}

impl SourcePayload {
    pub fn geojson(data: Value) -> Self {
        SourcePayload::GeoJson { data }
    }

    pub fn tiles(template: impl Into<String>) -> Self {
        SourcePayload::Tiles {
            tiles: vec![template.into()],
            tile_size: default_tile_size(),
            source_layer: None,
            min_zoom: None,
            max_zoom: None,
        }
    }

    pub fn dem(template: impl Into<String>) -> Self {
        SourcePayload::Dem {
            tiles: vec![template.into()],
            tile_size: default_tile_size(),
            encoding: DemEncoding::default(),
        }
    }
}

// ─── Style ───────────────────────────────────────────────────────────────

/// Fill / stroke / point paint for a layer. Unset fields fall back to the
/// engine adapter's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_radius: Option<f64>,
    /// Whole-layer opacity for raster and hillshade layers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

// ─── Layer model ─────────────────────────────────────────────────────────

/// A layer as the layer store owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerModel {
    pub id: LayerId,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub name: String,
    pub source: SourcePayload,
    #[serde(default)]
    pub style: LayerStyle,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Stacking position; higher renders on top.
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster_kind: Option<RasterKind>,
    #[serde(default)]
    pub terrain_enabled: bool,
}

fn default_visible() -> bool {
    true
}

impl LayerModel {
    /// A visible layer with default style. `order` is assigned by the store.
    pub fn new(id: LayerId, kind: LayerKind, name: impl Into<String>, source: SourcePayload) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            source,
            style: LayerStyle::default(),
            visible: true,
            order: 0,
            bbox: None,
            raster_kind: match kind {
                LayerKind::RasterDem => Some(RasterKind::Elevation),
                _ => None,
            },
            terrain_enabled: false,
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: LayerStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_bbox(mut self, bbox: BBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    #[must_use]
    pub fn with_terrain(mut self, enabled: bool) -> Self {
        self.terrain_enabled = enabled;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Produce the wire form handed to a layer engine.
    pub fn serialize(&self) -> SerializedLayer {
        SerializedLayer {
            id: self.id,
            kind: self.kind,
            data: self.source.clone(),
            style: self.style.clone(),
            visible: self.visible,
            order: self.order,
            bbox: self.bbox,
            raster_kind: self.raster_kind,
            terrain_enabled: self.terrain_enabled,
        }
    }
}

// ─── Serialized layer ────────────────────────────────────────────────────

/// Store → engine wire format. Produced on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedLayer {
    pub id: LayerId,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub data: SourcePayload,
    pub style: LayerStyle,
    pub visible: bool,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster_kind: Option<RasterKind>,
    #[serde(default)]
    pub terrain_enabled: bool,
}

impl SerializedLayer {
    /// Whether the layer carries elevation data.
    pub fn is_elevation(&self) -> bool {
        self.kind == LayerKind::RasterDem || self.raster_kind == Some(RasterKind::Elevation)
    }

    /// Whether the layer may drive terrain right now.
    pub fn is_terrain_candidate(&self) -> bool {
        self.is_elevation() && self.visible && self.terrain_enabled
    }

    /// Equality over the fields that affect rendering. `bbox` only feeds
    /// `fit_to_layer` and does not count.
    pub fn render_eq(&self, other: &SerializedLayer) -> bool {
        self.kind == other.kind
            && self.visible == other.visible
            && self.order == other.order
            && self.style == other.style
            && self.data == other.data
            && self.raster_kind == other.raster_kind
            && self.terrain_enabled == other.terrain_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn kind_wire_names() {
        assert_eq!(serde_json::to_value(LayerKind::RasterDem).unwrap(), json!("raster-dem"));
        assert_eq!(serde_json::to_value(LayerKind::GeoJson).unwrap(), json!("geojson"));
        let k: LayerKind = serde_json::from_value(json!("wms")).unwrap();
        assert_eq!(k, LayerKind::Wms);
    }

    #[test]
    fn raster_dem_defaults_to_elevation() {
        let layer = LayerModel::new(
            LayerId::intern("dem"),
            LayerKind::RasterDem,
            "DEM",
            SourcePayload::dem("https://tiles/{z}/{x}/{y}.png"),
        );
        assert!(layer.serialize().is_elevation());
        assert!(!layer.serialize().is_terrain_candidate());
        assert!(layer.with_terrain(true).serialize().is_terrain_candidate());
    }

    #[test]
    fn render_eq_ignores_bbox_and_name() {
        let a = LayerModel::new(
            LayerId::intern("a"),
            LayerKind::GeoJson,
            "A",
            SourcePayload::geojson(json!({"type": "FeatureCollection", "features": []})),
        );
        let mut b = a.clone().with_bbox([0.0, 0.0, 1.0, 1.0]);
        b.name = "renamed".into();
        assert!(a.serialize().render_eq(&b.serialize()));

        let hidden = a.clone().hidden();
        assert!(!a.serialize().render_eq(&hidden.serialize()));
    }

    #[test]
    fn layer_model_parses_from_json() {
        let layer: LayerModel = serde_json::from_value(json!({
            "id": "roads",
            "type": "vector",
            "name": "Roads",
            "source": {"kind": "tiles", "tiles": ["https://t/{z}/{x}/{y}.pbf"], "sourceLayer": "roads"},
        }))
        .unwrap_or_else(|e| panic!("parse failed: {e}"));
        assert!(layer.visible);
        assert_eq!(layer.order, 0);
        match layer.source {
            SourcePayload::Tiles { tile_size, .. } => assert_eq!(tile_size, 256),
            other => panic!("expected tiles, got {other:?}"),
        }
    }
}
