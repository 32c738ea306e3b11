//! The low-level capability of a live map renderer.
//!
//! `RenderTarget` is the style / camera / draw API a concrete engine exposes
//! (a MapLibre map behind the JS bridge, or the in-memory
//! [`HeadlessMap`](crate::headless::HeadlessMap)). Every method is a single
//! engine operation; the reconciler decides which ones to issue.

use gw_core::{
    BBox, DrawMode, EngineError, FeatureCollection, LayerId, MapLayer, MapSource, MapView,
    SourceId, StyleSnapshot, Terrain,
};
use serde_json::Value;

pub trait RenderTarget {
    // ─── Camera ──────────────────────────────────────────────────────────

    fn camera(&self) -> MapView;

    /// Move the camera immediately, without animation.
    fn jump_to(&mut self, view: &MapView) -> Result<(), EngineError>;

    fn fit_bounds(&mut self, bounds: &BBox, padding: f64) -> Result<(), EngineError>;

    // ─── Sources ─────────────────────────────────────────────────────────

    fn add_source(&mut self, source: &MapSource) -> Result<(), EngineError>;

    fn remove_source(&mut self, id: SourceId) -> Result<(), EngineError>;

    /// Replace the data of a GeoJSON source in place.
    fn set_source_data(&mut self, id: SourceId, data: &Value) -> Result<(), EngineError>;

    // ─── Layers ──────────────────────────────────────────────────────────

    /// Add a render layer below `before`, or on top when `before` is `None`.
    fn add_layer(&mut self, layer: &MapLayer, before: Option<LayerId>) -> Result<(), EngineError>;

    fn remove_layer(&mut self, id: LayerId) -> Result<(), EngineError>;

    /// Move a layer below `before`, or to the top when `before` is `None`.
    fn move_layer(&mut self, id: LayerId, before: Option<LayerId>) -> Result<(), EngineError>;

    /// Set (or unset with `None`) one paint property.
    fn set_paint_property(
        &mut self,
        id: LayerId,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), EngineError>;

    /// Set (or unset with `None`) one layout property.
    fn set_layout_property(
        &mut self,
        id: LayerId,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), EngineError>;

    /// Layer ids in render order, bottom to top.
    fn layer_stack(&self) -> Vec<LayerId>;

    // ─── Terrain ─────────────────────────────────────────────────────────

    fn terrain(&self) -> Option<Terrain>;

    fn set_terrain(&mut self, terrain: Option<&Terrain>) -> Result<(), EngineError>;

    /// Every source and layer currently in the style.
    fn snapshot(&self) -> StyleSnapshot;

    // ─── Draw ────────────────────────────────────────────────────────────

    fn set_draw_mode(&mut self, mode: Option<DrawMode>) -> Result<(), EngineError>;

    fn draw_features(&self) -> FeatureCollection;

    fn clear_draw(&mut self) -> Result<(), EngineError>;
}

/// Engine-originated notifications the host forwards to an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A pan / zoom / rotate gesture ended, or the camera settled.
    MoveEnd,
    /// The style was (re)loaded; previously added sources and layers are gone.
    StyleLoad,
    /// Draw geometry changed (including in-progress edits).
    DrawChange,
    /// A draw gesture completed a feature.
    DrawFinish,
}

impl EngineEvent {
    /// Map a renderer event name (`moveend`, `style.load`, `draw.change`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "moveend" | "zoomend" | "rotateend" | "pitchend" => Some(EngineEvent::MoveEnd),
            "style.load" | "load" => Some(EngineEvent::StyleLoad),
            "draw.change" | "draw.update" | "draw.delete" => Some(EngineEvent::DrawChange),
            "draw.finish" | "draw.create" => Some(EngineEvent::DrawFinish),
            _ => None,
        }
    }
}
