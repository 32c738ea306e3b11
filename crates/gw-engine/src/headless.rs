//! In-memory render target.
//!
//! `HeadlessMap` keeps a style (sources, layer stack, terrain), a camera and
//! draw state in memory, validating operations the way a style engine does:
//! duplicate ids, layers without their source, and removing a source that
//! is still drawn are all rejected. Every mutation is journaled, which makes
//! it the reference target for counting engine calls.

use crate::target::RenderTarget;
use gw_core::geo::bbox_center;
use gw_core::{
    BBox, DrawMode, EngineError, FeatureCollection, LayerId, MapLayer, MapSource, MapView,
    SourceId, SourceKind, StyleSnapshot, Terrain,
};
use serde_json::Value;
use std::collections::HashSet;

/// One mutation issued against a [`HeadlessMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum TargetOp {
    JumpTo(MapView),
    FitBounds(BBox),
    AddSource(SourceId),
    RemoveSource(SourceId),
    SetSourceData(SourceId),
    AddLayer(LayerId),
    RemoveLayer(LayerId),
    MoveLayer(LayerId, Option<LayerId>),
    SetPaint(LayerId, String),
    SetLayout(LayerId, String),
    SetTerrain(Option<SourceId>),
    SetDrawMode(Option<DrawMode>),
    ClearDraw,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessMap {
    camera: MapView,
    sources: Vec<MapSource>,
    /// Bottom to top.
    layers: Vec<MapLayer>,
    terrain: Option<Terrain>,
    draw_mode: Option<DrawMode>,
    features: FeatureCollection,
    journal: Vec<TargetOp>,
    failing: HashSet<String>,
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map whose style already contains a base map. Nothing is journaled.
    pub fn with_style(sources: Vec<MapSource>, layers: Vec<MapLayer>) -> Self {
        Self {
            sources,
            layers,
            ..Self::default()
        }
    }

    pub fn journal(&self) -> &[TargetOp] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<TargetOp> {
        std::mem::take(&mut self.journal)
    }

    /// Make every operation naming `id` (a layer or source id) fail.
    pub fn fail_on(&mut self, id: &str) {
        self.failing.insert(id.to_string());
    }

    pub fn source(&self, id: SourceId) -> Option<&MapSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn layer(&self, id: LayerId) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn draw_mode(&self) -> Option<DrawMode> {
        self.draw_mode
    }

    /// Simulate a user gesture moving the camera. Not journaled: the engine
    /// did this on its own.
    pub fn simulate_camera(&mut self, view: MapView) {
        self.camera = view;
    }

    /// Simulate the draw tool adding a feature.
    pub fn simulate_draw(&mut self, feature: Value) {
        self.features.features.push(feature);
    }

    /// Simulate a style swap: every source and layer is replaced.
    pub fn simulate_style_load(&mut self, sources: Vec<MapSource>, layers: Vec<MapLayer>) {
        self.sources = sources;
        self.layers = layers;
        self.terrain = None;
    }

    fn check(&self, op: &'static str, id: &str) -> Result<(), EngineError> {
        if self.failing.contains(id) {
            return Err(EngineError::rejected(op, id, "injected failure"));
        }
        Ok(())
    }

    fn layer_index(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    fn insert_position(&self, op: &'static str, before: Option<LayerId>) -> Result<usize, EngineError> {
        match before {
            Some(b) => self
                .layer_index(b)
                .ok_or_else(|| EngineError::rejected(op, b, "before layer does not exist")),
            None => Ok(self.layers.len()),
        }
    }
}

/// Coarse zoom that fits a bbox in a 512px viewport. Camera math belongs to
/// real renderers; this only keeps the headless camera plausible.
fn zoom_for_bbox(bbox: &BBox) -> f64 {
    let span = (bbox[2] - bbox[0]).abs().max((bbox[3] - bbox[1]).abs() * 2.0);
    if span <= f64::EPSILON {
        return 16.0;
    }
    (360.0 / span).log2().clamp(0.0, 22.0)
}

impl RenderTarget for HeadlessMap {
    fn camera(&self) -> MapView {
        self.camera
    }

    fn jump_to(&mut self, view: &MapView) -> Result<(), EngineError> {
        self.camera = *view;
        self.journal.push(TargetOp::JumpTo(*view));
        Ok(())
    }

    fn fit_bounds(&mut self, bounds: &BBox, _padding: f64) -> Result<(), EngineError> {
        self.camera = MapView {
            center: bbox_center(bounds),
            zoom: zoom_for_bbox(bounds),
            ..self.camera
        };
        self.journal.push(TargetOp::FitBounds(*bounds));
        Ok(())
    }

    fn add_source(&mut self, source: &MapSource) -> Result<(), EngineError> {
        self.check("addSource", source.id.as_str())?;
        if self.source(source.id).is_some() {
            return Err(EngineError::rejected("addSource", source.id, "already exists"));
        }
        self.sources.push(source.clone());
        self.journal.push(TargetOp::AddSource(source.id));
        Ok(())
    }

    fn remove_source(&mut self, id: SourceId) -> Result<(), EngineError> {
        self.check("removeSource", id.as_str())?;
        if self.layers.iter().any(|l| l.source_id == Some(id)) {
            return Err(EngineError::rejected("removeSource", id, "source is in use"));
        }
        let before = self.sources.len();
        self.sources.retain(|s| s.id != id);
        if self.sources.len() == before {
            return Err(EngineError::rejected("removeSource", id, "does not exist"));
        }
        if self.terrain.is_some_and(|t| t.source == id) {
            self.terrain = None;
        }
        self.journal.push(TargetOp::RemoveSource(id));
        Ok(())
    }

    fn set_source_data(&mut self, id: SourceId, data: &Value) -> Result<(), EngineError> {
        self.check("setData", id.as_str())?;
        let source = self
            .sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| EngineError::rejected("setData", id, "does not exist"))?;
        match &mut source.kind {
            SourceKind::GeoJson { data: current } => *current = data.clone(),
            _ => return Err(EngineError::rejected("setData", id, "not a geojson source")),
        }
        self.journal.push(TargetOp::SetSourceData(id));
        Ok(())
    }

    fn add_layer(&mut self, layer: &MapLayer, before: Option<LayerId>) -> Result<(), EngineError> {
        self.check("addLayer", layer.id.as_str())?;
        if self.layer_index(layer.id).is_some() {
            return Err(EngineError::rejected("addLayer", layer.id, "already exists"));
        }
        if let Some(src) = layer.source_id
            && self.source(src).is_none()
        {
            return Err(EngineError::rejected(
                "addLayer",
                layer.id,
                format!("source '{src}' does not exist"),
            ));
        }
        let at = self.insert_position("addLayer", before)?;
        self.layers.insert(at, layer.clone());
        self.journal.push(TargetOp::AddLayer(layer.id));
        Ok(())
    }

    fn remove_layer(&mut self, id: LayerId) -> Result<(), EngineError> {
        self.check("removeLayer", id.as_str())?;
        let idx = self
            .layer_index(id)
            .ok_or_else(|| EngineError::rejected("removeLayer", id, "does not exist"))?;
        self.layers.remove(idx);
        self.journal.push(TargetOp::RemoveLayer(id));
        Ok(())
    }

    fn move_layer(&mut self, id: LayerId, before: Option<LayerId>) -> Result<(), EngineError> {
        self.check("moveLayer", id.as_str())?;
        let idx = self
            .layer_index(id)
            .ok_or_else(|| EngineError::rejected("moveLayer", id, "does not exist"))?;
        // Validate before mutating so a bad `before` leaves the stack intact.
        self.insert_position("moveLayer", before)?;
        let layer = self.layers.remove(idx);
        let at = self.insert_position("moveLayer", before)?;
        self.layers.insert(at, layer);
        self.journal.push(TargetOp::MoveLayer(id, before));
        Ok(())
    }

    fn set_paint_property(
        &mut self,
        id: LayerId,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), EngineError> {
        self.check("setPaintProperty", id.as_str())?;
        let idx = self
            .layer_index(id)
            .ok_or_else(|| EngineError::rejected("setPaintProperty", id, "does not exist"))?;
        let paint = &mut self.layers[idx].paint;
        match value {
            Some(v) => {
                paint.insert(name.to_string(), v.clone());
            }
            None => {
                paint.remove(name);
            }
        }
        self.journal.push(TargetOp::SetPaint(id, name.to_string()));
        Ok(())
    }

    fn set_layout_property(
        &mut self,
        id: LayerId,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), EngineError> {
        self.check("setLayoutProperty", id.as_str())?;
        let idx = self
            .layer_index(id)
            .ok_or_else(|| EngineError::rejected("setLayoutProperty", id, "does not exist"))?;
        let layout = &mut self.layers[idx].layout;
        match value {
            Some(v) => {
                layout.insert(name.to_string(), v.clone());
            }
            None => {
                layout.remove(name);
            }
        }
        self.journal.push(TargetOp::SetLayout(id, name.to_string()));
        Ok(())
    }

    fn layer_stack(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    fn terrain(&self) -> Option<Terrain> {
        self.terrain
    }

    fn set_terrain(&mut self, terrain: Option<&Terrain>) -> Result<(), EngineError> {
        if let Some(t) = terrain {
            self.check("setTerrain", t.source.as_str())?;
            match self.source(t.source) {
                Some(src) if src.kind.is_dem() => {}
                Some(_) => {
                    return Err(EngineError::rejected("setTerrain", t.source, "not a raster-dem source"));
                }
                None => return Err(EngineError::rejected("setTerrain", t.source, "does not exist")),
            }
        }
        self.terrain = terrain.copied();
        self.journal.push(TargetOp::SetTerrain(terrain.map(|t| t.source)));
        Ok(())
    }

    fn snapshot(&self) -> StyleSnapshot {
        StyleSnapshot {
            sources: self.sources.clone(),
            layers: self.layers.clone(),
        }
    }

    fn set_draw_mode(&mut self, mode: Option<DrawMode>) -> Result<(), EngineError> {
        self.draw_mode = mode;
        self.journal.push(TargetOp::SetDrawMode(mode));
        Ok(())
    }

    fn draw_features(&self) -> FeatureCollection {
        self.features.clone()
    }

    fn clear_draw(&mut self) -> Result<(), EngineError> {
        self.features = FeatureCollection::default();
        self.journal.push(TargetOp::ClearDraw);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::RenderKind;
    use serde_json::json;

    fn geojson_source(id: &str) -> MapSource {
        MapSource::new(
            SourceId::intern(id),
            SourceKind::GeoJson {
                data: json!({"type": "FeatureCollection", "features": []}),
            },
        )
    }

    #[test]
    fn layer_requires_source() {
        let mut map = HeadlessMap::new();
        let layer = MapLayer::new(LayerId::intern("h-a"), RenderKind::Fill, SourceId::intern("h-src"));
        assert!(map.add_layer(&layer, None).is_err());
        map.add_source(&geojson_source("h-src")).unwrap();
        map.add_layer(&layer, None).unwrap();
        assert!(map.remove_source(SourceId::intern("h-src")).is_err());
    }

    #[test]
    fn move_layer_below_other() {
        let mut map = HeadlessMap::new();
        map.add_source(&geojson_source("h-s")).unwrap();
        for id in ["h-1", "h-2", "h-3"] {
            let layer = MapLayer::new(LayerId::intern(id), RenderKind::Line, SourceId::intern("h-s"));
            map.add_layer(&layer, None).unwrap();
        }
        map.move_layer(LayerId::intern("h-3"), Some(LayerId::intern("h-1")))
            .unwrap();
        let layer_stack = map.layer_stack();
        let stack: Vec<&str> = layer_stack.iter().map(|id| id.as_str()).collect();
        assert_eq!(stack, vec!["h-3", "h-1", "h-2"]);
    }

    #[test]
    fn injected_failure_rejects_without_journaling() {
        let mut map = HeadlessMap::new();
        map.fail_on("h-bad");
        assert!(map.add_source(&geojson_source("h-bad")).is_err());
        assert!(map.journal().is_empty());
    }

    #[test]
    fn terrain_requires_dem_source() {
        let mut map = HeadlessMap::new();
        map.add_source(&geojson_source("h-vec")).unwrap();
        let t = Terrain {
            source: SourceId::intern("h-vec"),
            exaggeration: 1.0,
        };
        assert!(map.set_terrain(Some(&t)).is_err());
        assert_eq!(map.terrain(), None);
    }
}
