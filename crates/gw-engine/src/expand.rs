//! Expansion of a store layer into render entities.
//!
//! A [`SerializedLayer`] becomes exactly one [`MapSource`] named after the
//! layer plus the render layers that draw it:
//!
//! | kind | sub-layers |
//! |---|---|
//! | `geojson`, `vector` | `<id>::fill`, `<id>::line`, `<id>::circle` |
//! | `raster`, `wms` (imagery) | `<id>::raster` |
//! | `raster-dem`, raster elevation | `<id>::hillshade` |
//!
//! Sub-layers are listed bottom to top.

use gw_core::{
    LayerId, LayerKind, LayerStyle, MapLayer, MapSource, RenderKind, SerializedLayer,
    SourceKind, SourcePayload, Terrain,
};
use serde_json::{Value, json};
use smallvec::SmallVec;

pub type SubLayers = SmallVec<[MapLayer; 3]>;

const DEFAULT_COLOR: &str = "#3388ff";
const DEFAULT_FILL_OPACITY: f64 = 0.4;
const DEFAULT_STROKE_WIDTH: f64 = 2.0;
const DEFAULT_POINT_RADIUS: f64 = 5.0;

/// The render form of one store layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub source: MapSource,
    pub layers: SubLayers,
}

/// Id of the render sub-layer of `layer` with the given suffix.
pub fn sub_layer_id(layer: LayerId, suffix: &str) -> LayerId {
    LayerId::intern(&format!("{layer}::{suffix}"))
}

pub fn expand(layer: &SerializedLayer) -> Expansion {
    let source_id = layer.id.source_id();
    let source = MapSource::new(source_id, source_kind(layer));
    let visibility = json!(if layer.visible { "visible" } else { "none" });
    let style = &layer.style;

    let mut layers = SubLayers::new();
    let elevation = draws_elevation(layer);
    match layer.kind {
        LayerKind::GeoJson | LayerKind::Vector => {
            let source_layer = match &layer.data {
                SourcePayload::Tiles { source_layer, .. } => source_layer.clone(),
                _ => None,
            };
            let stroke = style.stroke_color.as_deref().unwrap_or(DEFAULT_COLOR);
            let fill = style.fill_color.as_deref().unwrap_or(DEFAULT_COLOR);
            let point = style.point_color.as_deref().unwrap_or(fill);

            let polygons = json!(["==", "$type", "Polygon"]);
            let lines = json!(["any", ["==", "$type", "LineString"], ["==", "$type", "Polygon"]]);
            let points = json!(["==", "$type", "Point"]);

            let parts = [
                MapLayer::new(sub_layer_id(layer.id, "fill"), RenderKind::Fill, source_id)
                    .with_filter(polygons)
                    .with_paint("fill-color", json!(fill))
                    .with_paint(
                        "fill-opacity",
                        json!(style.fill_opacity.unwrap_or(DEFAULT_FILL_OPACITY)),
                    ),
                MapLayer::new(sub_layer_id(layer.id, "line"), RenderKind::Line, source_id)
                    .with_filter(lines)
                    .with_paint("line-color", json!(stroke))
                    .with_paint(
                        "line-width",
                        json!(style.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH)),
                    )
                    .with_paint("line-opacity", json!(style.stroke_opacity.unwrap_or(1.0))),
                MapLayer::new(sub_layer_id(layer.id, "circle"), RenderKind::Circle, source_id)
                    .with_filter(points)
                    .with_paint("circle-color", json!(point))
                    .with_paint(
                        "circle-radius",
                        json!(style.point_radius.unwrap_or(DEFAULT_POINT_RADIUS)),
                    )
                    .with_paint("circle-stroke-color", json!(stroke))
                    .with_paint("circle-stroke-width", json!(1)),
            ];
            for mut part in parts {
                part.source_layer = source_layer.clone();
                layers.push(part);
            }
        }
        LayerKind::Raster | LayerKind::Wms | LayerKind::RasterDem if elevation => {
            layers.push(
                MapLayer::new(sub_layer_id(layer.id, "hillshade"), RenderKind::Hillshade, source_id)
                    .with_paint("hillshade-exaggeration", json!(opacity(style) * 0.5)),
            );
        }
        LayerKind::Raster | LayerKind::Wms | LayerKind::RasterDem => {
            layers.push(
                MapLayer::new(sub_layer_id(layer.id, "raster"), RenderKind::Raster, source_id)
                    .with_paint("raster-opacity", json!(opacity(style))),
            );
        }
    }
    for part in &mut layers {
        part.layout.insert("visibility".into(), visibility.clone());
    }
    Expansion { source, layers }
}

/// Terrain settings for an elevation layer.
pub fn terrain_for(layer: &SerializedLayer, exaggeration: f64) -> Terrain {
    Terrain {
        source: layer.id.source_id(),
        exaggeration,
    }
}

/// Elevation layers and layers carrying a DEM payload render as hillshade.
fn draws_elevation(layer: &SerializedLayer) -> bool {
    layer.is_elevation() || matches!(layer.data, SourcePayload::Dem { .. })
}

fn opacity(style: &LayerStyle) -> f64 {
    style.opacity.unwrap_or(1.0).clamp(0.0, 1.0)
}

fn source_kind(layer: &SerializedLayer) -> SourceKind {
    let elevation = draws_elevation(layer);
    match &layer.data {
        SourcePayload::GeoJson { data } => SourceKind::GeoJson { data: data.clone() },
        SourcePayload::Tiles {
            tiles,
            tile_size,
            min_zoom,
            max_zoom,
            ..
        } => match layer.kind {
            LayerKind::Vector | LayerKind::GeoJson => SourceKind::Vector {
                tiles: tiles.clone(),
                min_zoom: *min_zoom,
                max_zoom: *max_zoom,
            },
            _ if elevation => SourceKind::RasterDem {
                tiles: tiles.clone(),
                tile_size: *tile_size,
                encoding: Default::default(),
            },
            _ => SourceKind::Raster {
                tiles: tiles.clone(),
                tile_size: *tile_size,
            },
        },
        SourcePayload::Dem {
            tiles,
            tile_size,
            encoding,
        } => SourceKind::RasterDem {
            tiles: tiles.clone(),
            tile_size: *tile_size,
            encoding: *encoding,
        },
    }
}

/// GeoJSON data carried by a layer, if any.
pub fn geojson_data(layer: &SerializedLayer) -> Option<&Value> {
    match &layer.data {
        SourcePayload::GeoJson { data } => Some(data),
        _ => None,
    }
}
