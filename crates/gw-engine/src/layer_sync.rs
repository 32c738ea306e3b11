//! Layer-level diff from serialized store layers to source-centric state.
//!
//! `LayerSync` remembers the last layer list it was given. On each call it
//! classifies layers as added, updated (any render-relevant field differs)
//! or removed, rewrites only those in the [`StateManager`], reorders the
//! managed render layers by `order`, and reselects terrain. The resulting
//! state is then reconciled into the target by [`DirectMap`].

use crate::direct::DirectMap;
use crate::expand::{Expansion, expand, geojson_data, terrain_for};
use crate::reconcile::SyncFailure;
use crate::state::StateManager;
use crate::target::RenderTarget;
use crate::terrain::select_terrain;
use gw_core::geo::geojson_bbox;
use gw_core::{BBox, LayerId, MapLayer, SerializedLayer, StateError};
use std::collections::{HashMap, HashSet};

/// Outcome of one `LayerEngine::sync` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub added: Vec<LayerId>,
    pub updated: Vec<LayerId>,
    pub removed: Vec<LayerId>,
    /// Render target operations issued.
    pub engine_calls: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.engine_calls == 0
    }
}

#[derive(Debug, Default)]
pub struct LayerSync {
    previous: HashMap<LayerId, SerializedLayer>,
    terrain_exaggeration: f64,
}

impl LayerSync {
    pub fn new(terrain_exaggeration: f64) -> Self {
        Self {
            previous: HashMap::new(),
            terrain_exaggeration,
        }
    }

    /// Bring `map` in line with `layers`.
    pub fn apply<R: RenderTarget>(
        &mut self,
        map: &mut DirectMap<R>,
        layers: &[SerializedLayer],
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let mut sorted: Vec<&SerializedLayer> = layers.iter().collect();
        sorted.sort_by_key(|l| l.order);

        let wanted: HashSet<LayerId> = sorted.iter().map(|l| l.id).collect();
        if wanted.len() != sorted.len() {
            log::warn!("sync received duplicate layer ids; the last one wins");
        }
        report.removed = self
            .previous
            .keys()
            .copied()
            .filter(|id| !wanted.contains(id))
            .collect();
        report.removed.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let mut changed: Vec<&SerializedLayer> = Vec::new();
        for layer in sorted.iter().copied() {
            match self.previous.get(&layer.id) {
                None => report.added.push(layer.id),
                Some(prev) if !prev.render_eq(layer) => report.updated.push(layer.id),
                Some(_) => continue,
            }
            changed.push(layer);
        }

        let exaggeration = self.terrain_exaggeration;
        let previous = &self.previous;
        let result = map.mutate(|state| -> Result<(), StateError> {
            for id in &report.removed {
                match state.remove_source_cascade(id.source_id()) {
                    Ok(dropped) => log::debug!("removed layer '{id}' ({} render layer(s))", dropped.len()),
                    Err(e) => log::warn!("removing layer '{id}': {e}"),
                }
            }
            for layer in &changed {
                let stale_parts = previous.get(&layer.id).map(|prev| expand(prev).layers);
                write_expansion(state, expand(layer), stale_parts.as_deref());
            }
            reorder_managed(state, &sorted)?;

            let terrain = select_terrain(layers).map(|l| terrain_for(l, exaggeration));
            if let Err(e) = state.set_terrain(terrain) {
                log::warn!("terrain not applied: {e}");
                state.set_terrain(None)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            log::error!("layer sync left state inconsistent: {e}");
        }

        let reconciled = map.last_report();
        report.engine_calls = reconciled.calls;
        report.failures = reconciled.failures.clone();

        self.previous = sorted.into_iter().map(|l| (l.id, l.clone())).collect();
        if !report.is_noop() {
            log::debug!(
                "sync: +{} ~{} -{} ({} engine call(s), {} failure(s))",
                report.added.len(),
                report.updated.len(),
                report.removed.len(),
                report.engine_calls,
                report.failures.len()
            );
        }
        report
    }

    /// Bounds of a synced layer: its declared bbox, else the extent of its
    /// GeoJSON data.
    pub fn bbox_of(&self, id: LayerId) -> Option<BBox> {
        let layer = self.previous.get(&id)?;
        layer.bbox.or_else(|| geojson_data(layer).and_then(geojson_bbox))
    }

    pub fn layer_count(&self) -> usize {
        self.previous.len()
    }

    /// Forget synced layers so the next call re-adds everything.
    pub fn reset(&mut self) {
        self.previous.clear();
    }
}

/// Replace a layer's source and render layers in `state`. Render layers of
/// the previous expansion that the new one lacks are removed.
fn write_expansion(state: &mut StateManager, exp: Expansion, stale: Option<&[MapLayer]>) {
    if let Some(stale) = stale {
        for part in stale {
            if !exp.layers.iter().any(|l| l.id == part.id) {
                state.remove_layer(part.id);
            }
        }
    }
    state.set_source(exp.source);
    for part in exp.layers {
        let id = part.id;
        if let Err(e) = state.set_layer(part) {
            log::error!("render layer '{id}': {e}");
        }
    }
}

/// Base layers first in their imported order, then the render layers of
/// `sorted` bottom to top.
fn reorder_managed(state: &mut StateManager, sorted: &[&SerializedLayer]) -> Result<(), StateError> {
    let mut order: Vec<LayerId> = state
        .layers()
        .filter(|l| l.is_base_layer)
        .map(|l| l.id)
        .collect();
    let mut listed: HashSet<LayerId> = order.iter().copied().collect();
    for layer in sorted {
        for part in expand(layer).layers {
            if state.layer(part.id).is_some() && listed.insert(part.id) {
                order.push(part.id);
            }
        }
    }
    // Managed render layers added outside of sync keep their relative order
    // on top.
    let extra: Vec<LayerId> = state
        .layer_order()
        .iter()
        .copied()
        .filter(|id| !listed.contains(id))
        .collect();
    order.extend(extra);
    state.reorder_layers(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessMap;
    use gw_core::{LayerKind, LayerModel, SourcePayload, WorkspaceConfig};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn point_layer(id: &str, order: u32) -> SerializedLayer {
        let mut layer = LayerModel::new(
            LayerId::intern(id),
            LayerKind::GeoJson,
            id,
            SourcePayload::geojson(json!({
                "type": "FeatureCollection",
                "features": [{"type": "Feature", "properties": {},
                    "geometry": {"type": "Point", "coordinates": [order as f64, 1.0]}}]
            })),
        );
        layer.order = order;
        layer.serialize()
    }

    fn mounted() -> DirectMap<HeadlessMap> {
        let mut map = DirectMap::new("ls", &WorkspaceConfig::default());
        map.mount(HeadlessMap::new());
        map
    }

    #[test]
    fn identical_input_is_a_no_op() {
        let mut map = mounted();
        let mut sync = LayerSync::new(1.0);
        let layers = vec![point_layer("ls-a", 0), point_layer("ls-b", 1)];
        let first = sync.apply(&mut map, &layers);
        assert_eq!(first.added.len(), 2);
        assert!(first.engine_calls > 0);

        let second = sync.apply(&mut map, &layers);
        assert!(second.is_noop(), "{second:?}");
    }

    #[test]
    fn bbox_falls_back_to_geojson_extent() {
        let mut map = mounted();
        let mut sync = LayerSync::new(1.0);
        sync.apply(&mut map, &[point_layer("ls-bb", 3)]);
        assert_eq!(sync.bbox_of(LayerId::intern("ls-bb")), Some([3.0, 1.0, 3.0, 1.0]));
        assert_eq!(sync.bbox_of(LayerId::intern("ls-none")), None);
    }

    #[test]
    fn reordering_restacks_render_layers() {
        let mut map = mounted();
        let mut sync = LayerSync::new(1.0);
        sync.apply(&mut map, &[point_layer("ls-x", 0), point_layer("ls-y", 1)]);
        let report = sync.apply(&mut map, &[point_layer("ls-x", 1), point_layer("ls-y", 0)]);
        assert_eq!(report.updated.len(), 2);

        let stack: Vec<String> = map
            .target()
            .unwrap()
            .layer_stack()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            stack,
            vec![
                "ls-y::fill",
                "ls-y::line",
                "ls-y::circle",
                "ls-x::fill",
                "ls-x::line",
                "ls-x::circle",
            ]
        );
    }
}
