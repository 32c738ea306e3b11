//! Diff-based reconciliation of a [`StateManager`] into a [`RenderTarget`].
//!
//! The reconciler remembers what it last applied and, on each run, issues
//! only the operations needed to make the target match the state:
//!
//! 1. remove render layers that are gone or changed structurally
//! 2. clear terrain that points at a source about to disappear
//! 3. remove and re-add tile sources whose definition changed
//! 4. add new sources
//! 5. replace GeoJSON data in place
//! 6. add new layers, patch paint / layout per key on existing ones
//! 7. remove sources that are no longer referenced
//! 8. restack so render order equals `layer_order`
//! 9. set or clear terrain against the target's current terrain
//!
//! Sources are always added before the layers that draw them and removed
//! after. Each operation that the target rejects is logged with the
//! offending id and recorded in the report; the pass continues. A run over
//! unchanged state issues zero calls.

use crate::state::StateManager;
use crate::target::RenderTarget;
use gw_core::{
    EngineError, LayerId, MapLayer, MapSource, PropertyMap, SourceId, SourceKind, StyleSnapshot,
};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// One engine operation that failed during a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    /// Id of the source or layer the operation targeted.
    pub id: String,
    pub error: EngineError,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Engine operations issued, failed ones included.
    pub calls: usize,
    pub failures: Vec<SyncFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Count one call and record its failure, if any. Returns whether the
    /// call succeeded.
    fn record(&mut self, id: impl fmt::Display, result: Result<(), EngineError>) -> bool {
        self.calls += 1;
        match result {
            Ok(()) => true,
            Err(error) => {
                log::error!("reconcile: {error}");
                self.failures.push(SyncFailure {
                    id: id.to_string(),
                    error,
                });
                false
            }
        }
    }
}

/// What has been pushed into the current target.
#[derive(Debug, Default)]
pub struct Reconciler {
    sources: HashMap<SourceId, MapSource>,
    layers: HashMap<LayerId, MapLayer>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything applied. Used when the target is replaced or its
    /// style reloaded.
    pub fn reset(&mut self) {
        self.sources.clear();
        self.layers.clear();
    }

    /// Treat managed entries already present in the target as applied, in
    /// the form the target holds them. The next pass patches them instead of
    /// adding duplicates.
    pub fn adopt(&mut self, state: &StateManager, snapshot: &StyleSnapshot) {
        for source in &snapshot.sources {
            if state.source(source.id).is_some_and(|s| !s.is_base_layer) {
                self.sources.insert(source.id, source.clone());
            }
        }
        for layer in &snapshot.layers {
            if state.layer(layer.id).is_some_and(|l| !l.is_base_layer) {
                self.layers.insert(layer.id, layer.clone());
            }
        }
    }

    pub fn reconcile<R: RenderTarget + ?Sized>(
        &mut self,
        state: &StateManager,
        target: &mut R,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let rebuild: HashSet<SourceId> = self
            .sources
            .iter()
            .filter(|(id, applied)| {
                state
                    .source(**id)
                    .is_some_and(|wanted| !wanted.is_base_layer && needs_rebuild(applied, wanted))
            })
            .map(|(id, _)| *id)
            .collect();
        let stale_sources: Vec<SourceId> = self
            .sources
            .keys()
            .copied()
            .filter(|id| state.source(*id).is_none_or(|s| s.is_base_layer))
            .collect();

        // 1. Stale or structurally changed layers.
        let mut stale_layers: Vec<LayerId> = self
            .layers
            .iter()
            .filter(|(id, applied)| match state.layer(**id) {
                Some(wanted) if !wanted.is_base_layer => {
                    applied.structurally_differs(wanted)
                        || wanted.source_id.is_some_and(|s| rebuild.contains(&s))
                }
                _ => true,
            })
            .map(|(id, _)| *id)
            .collect();
        // Top-most first keeps the stack compact while removing.
        let stack = target.layer_stack();
        stale_layers.sort_by_key(|id| std::cmp::Reverse(stack.iter().position(|s| s == id)));
        for id in stale_layers {
            if report.record(id, target.remove_layer(id)) {
                self.layers.remove(&id);
            }
        }

        // 2. Terrain on a source that is about to go away.
        if let Some(current) = target.terrain()
            && (rebuild.contains(&current.source) || stale_sources.contains(&current.source))
            && report.record(current.source, target.set_terrain(None))
        {
            log::debug!("cleared terrain on departing source '{}'", current.source);
        }

        // 3. Sources whose definition cannot be patched in place.
        for id in &rebuild {
            if report.record(id, target.remove_source(*id)) {
                self.sources.remove(id);
            }
        }

        // 4 + 5. New sources, GeoJSON data updates.
        let mut managed_sources: Vec<&MapSource> =
            state.sources().filter(|s| !s.is_base_layer).collect();
        managed_sources.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        for wanted in managed_sources {
            match self.sources.get(&wanted.id) {
                None => {
                    if report.record(wanted.id, target.add_source(wanted)) {
                        self.sources.insert(wanted.id, wanted.clone());
                    }
                }
                Some(applied) if applied != wanted => {
                    if let SourceKind::GeoJson { data } = &wanted.kind
                        && report.record(wanted.id, target.set_source_data(wanted.id, data))
                    {
                        self.sources.insert(wanted.id, wanted.clone());
                    }
                }
                Some(_) => {}
            }
        }

        // 6. Layers: add new, patch existing.
        for wanted in state.layers().filter(|l| !l.is_base_layer) {
            if let Some(src) = wanted.source_id
                && !self.sources.contains_key(&src)
                && state.source(src).is_none_or(|s| !s.is_base_layer)
            {
                log::warn!("skipping layer '{}': source '{src}' is not in the engine", wanted.id);
                continue;
            }
            match self.layers.get_mut(&wanted.id) {
                None => {
                    if report.record(wanted.id, target.add_layer(wanted, None)) {
                        self.layers.insert(wanted.id, wanted.clone());
                    }
                }
                Some(applied) => patch_layer(applied, wanted, target, &mut report),
            }
        }

        // 7. Sources nothing draws anymore.
        for id in stale_sources {
            if report.record(id, target.remove_source(id)) {
                self.sources.remove(&id);
            }
        }

        // 8. Stacking order.
        let wanted_order: Vec<LayerId> = state
            .layer_order()
            .iter()
            .copied()
            .filter(|id| state.layer(*id).is_some_and(|l| l.is_base_layer) || self.layers.contains_key(id))
            .collect();
        restack(target, &wanted_order, &mut report);

        // 9. Terrain.
        let wanted_terrain = state.terrain();
        if target.terrain() != wanted_terrain {
            let id = wanted_terrain.map_or_else(|| "terrain".to_string(), |t| t.source.to_string());
            report.record(id, target.set_terrain(wanted_terrain.as_ref()));
        }

        if report.calls > 0 {
            log::debug!(
                "reconciled: {} call(s), {} failure(s)",
                report.calls,
                report.failures.len()
            );
        }
        report
    }
}

/// Whether a source must be removed and re-added to change from `applied` to
/// `wanted`. Only GeoJSON data can be replaced in place.
fn needs_rebuild(applied: &MapSource, wanted: &MapSource) -> bool {
    match (&applied.kind, &wanted.kind) {
        (SourceKind::GeoJson { .. }, SourceKind::GeoJson { .. }) => false,
        (a, b) => a != b,
    }
}

fn patch_layer<R: RenderTarget + ?Sized>(
    applied: &mut MapLayer,
    wanted: &MapLayer,
    target: &mut R,
    report: &mut ReconcileReport,
) {
    for key in changed_keys(&applied.paint, &wanted.paint) {
        let value = wanted.paint.get(&key);
        if report.record(wanted.id, target.set_paint_property(wanted.id, &key, value)) {
            set_or_remove(&mut applied.paint, key, value);
        }
    }
    for key in changed_keys(&applied.layout, &wanted.layout) {
        let value = wanted.layout.get(&key);
        if report.record(wanted.id, target.set_layout_property(wanted.id, &key, value)) {
            set_or_remove(&mut applied.layout, key, value);
        }
    }
    // Metadata never reaches the renderer.
    applied.metadata.clone_from(&wanted.metadata);
}

fn changed_keys(applied: &PropertyMap, wanted: &PropertyMap) -> Vec<String> {
    let mut keys: Vec<String> = wanted
        .iter()
        .filter(|(k, v)| applied.get(*k) != Some(*v))
        .map(|(k, _)| k.clone())
        .collect();
    keys.extend(applied.keys().filter(|k| !wanted.contains_key(*k)).cloned());
    keys
}

fn set_or_remove(map: &mut PropertyMap, key: String, value: Option<&serde_json::Value>) {
    match value {
        Some(v) => {
            map.insert(key, v.clone());
        }
        None => {
            map.remove(&key);
        }
    }
}

/// Move layers until their relative order in the target equals `wanted`
/// (bottom to top). Layers the target holds but `wanted` does not mention
/// keep their place. Works top-down against a local copy of the stack, so
/// an already ordered stack costs nothing.
pub fn restack<R: RenderTarget + ?Sized>(
    target: &mut R,
    wanted: &[LayerId],
    report: &mut ReconcileReport,
) {
    let wanted_set: HashSet<LayerId> = wanted.iter().copied().collect();
    let mut current: Vec<LayerId> = target
        .layer_stack()
        .into_iter()
        .filter(|id| wanted_set.contains(id))
        .collect();
    let wanted: Vec<LayerId> = wanted.iter().copied().filter(|id| current.contains(id)).collect();

    for (i, id) in wanted.iter().enumerate().rev() {
        let above = wanted.get(i + 1).copied();
        let Some(pos) = current.iter().position(|l| l == id) else {
            continue;
        };
        let in_place = match above {
            Some(a) => current.get(pos + 1) == Some(&a),
            None => pos + 1 == current.len(),
        };
        if in_place {
            continue;
        }
        if report.record(*id, target.move_layer(*id, above)) {
            current.remove(pos);
            let at = above
                .and_then(|a| current.iter().position(|l| *l == a))
                .unwrap_or(current.len());
            current.insert(at, *id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessMap, TargetOp};
    use gw_core::{DemEncoding, LayerPatch, RenderKind, Terrain};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn geojson(id: &str, n: f64) -> MapSource {
        MapSource::new(
            SourceId::intern(id),
            SourceKind::GeoJson {
                data: json!({"type": "Point", "coordinates": [n, n]}),
            },
        )
    }

    fn line(id: &str, source: &str) -> MapLayer {
        MapLayer::new(LayerId::intern(id), RenderKind::Line, SourceId::intern(source))
    }

    fn stack(map: &HeadlessMap) -> Vec<String> {
        map.layer_stack().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut state = StateManager::new();
        state.add_source(geojson("rc-a", 1.0));
        state.add_layer(line("rc-a-line", "rc-a"), None).unwrap();
        let mut map = HeadlessMap::new();
        let mut rec = Reconciler::new();

        let first = rec.reconcile(&state, &mut map);
        assert_eq!(first.calls, 2);
        assert!(first.is_clean());

        let second = rec.reconcile(&state, &mut map);
        assert_eq!(second, ReconcileReport::default());
    }

    #[test]
    fn sources_added_before_layers_and_removed_after() {
        let mut state = StateManager::new();
        state.add_source(geojson("rc-s", 1.0));
        state.add_layer(line("rc-l", "rc-s"), None).unwrap();
        let mut map = HeadlessMap::new();
        let mut rec = Reconciler::new();
        rec.reconcile(&state, &mut map);
        assert_eq!(
            map.take_journal(),
            vec![
                TargetOp::AddSource(SourceId::intern("rc-s")),
                TargetOp::AddLayer(LayerId::intern("rc-l")),
            ]
        );

        state.remove_source_cascade(SourceId::intern("rc-s")).unwrap();
        rec.reconcile(&state, &mut map);
        assert_eq!(
            map.take_journal(),
            vec![
                TargetOp::RemoveLayer(LayerId::intern("rc-l")),
                TargetOp::RemoveSource(SourceId::intern("rc-s")),
            ]
        );
    }

    #[test]
    fn paint_change_is_patched_in_place() {
        let mut state = StateManager::new();
        state.add_source(geojson("rc-p", 1.0));
        state
            .add_layer(line("rc-pl", "rc-p").with_paint("line-width", json!(1)), None)
            .unwrap();
        let mut map = HeadlessMap::new();
        let mut rec = Reconciler::new();
        rec.reconcile(&state, &mut map);
        map.take_journal();

        let mut patch = LayerPatch::default();
        patch.paint.insert("line-width".into(), json!(3));
        state.update_layer(LayerId::intern("rc-pl"), patch).unwrap();
        rec.reconcile(&state, &mut map);
        assert_eq!(
            map.take_journal(),
            vec![TargetOp::SetPaint(LayerId::intern("rc-pl"), "line-width".into())]
        );
    }

    #[test]
    fn geojson_data_replaced_without_rebuild() {
        let mut state = StateManager::new();
        state.add_source(geojson("rc-g", 1.0));
        let mut map = HeadlessMap::new();
        let mut rec = Reconciler::new();
        rec.reconcile(&state, &mut map);
        map.take_journal();

        state.set_source(geojson("rc-g", 2.0));
        rec.reconcile(&state, &mut map);
        assert_eq!(
            map.take_journal(),
            vec![TargetOp::SetSourceData(SourceId::intern("rc-g"))]
        );
    }

    #[test]
    fn restack_only_moves_what_is_out_of_place() {
        let mut state = StateManager::new();
        state.add_source(geojson("rc-o", 1.0));
        for id in ["rc-o1", "rc-o2", "rc-o3"] {
            state.add_layer(line(id, "rc-o"), None).unwrap();
        }
        let mut map = HeadlessMap::new();
        let mut rec = Reconciler::new();
        rec.reconcile(&state, &mut map);
        map.take_journal();

        state
            .reorder_layers(vec![
                LayerId::intern("rc-o3"),
                LayerId::intern("rc-o1"),
                LayerId::intern("rc-o2"),
            ])
            .unwrap();
        let report = rec.reconcile(&state, &mut map);
        assert!(report.is_clean());
        assert!(
            map.take_journal()
                .iter()
                .all(|op| matches!(op, TargetOp::MoveLayer(..)))
        );
        assert_eq!(stack(&map), vec!["rc-o3", "rc-o1", "rc-o2"]);
        assert_eq!(rec.reconcile(&state, &mut map).calls, 0);
    }

    #[test]
    fn failure_is_contained_per_item() {
        let mut state = StateManager::new();
        state.add_source(geojson("rc-ok", 1.0));
        state.add_source(geojson("rc-bad", 1.0));
        state.add_layer(line("rc-ok-line", "rc-ok"), None).unwrap();
        state.add_layer(line("rc-bad-line", "rc-bad"), None).unwrap();
        let mut map = HeadlessMap::new();
        map.fail_on("rc-bad");
        let mut rec = Reconciler::new();

        let report = rec.reconcile(&state, &mut map);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "rc-bad");
        assert_eq!(stack(&map), vec!["rc-ok-line"]);
    }

    #[test]
    fn terrain_follows_state() {
        let mut state = StateManager::new();
        state.add_source(MapSource::new(
            SourceId::intern("rc-dem"),
            SourceKind::RasterDem {
                tiles: vec!["https://dem/{z}/{x}/{y}.png".into()],
                tile_size: 512,
                encoding: DemEncoding::Terrarium,
            },
        ));
        let terrain = Terrain {
            source: SourceId::intern("rc-dem"),
            exaggeration: 1.5,
        };
        state.set_terrain(Some(terrain)).unwrap();
        let mut map = HeadlessMap::new();
        let mut rec = Reconciler::new();
        rec.reconcile(&state, &mut map);
        assert_eq!(map.terrain(), Some(terrain));

        state.set_terrain(None).unwrap();
        let report = rec.reconcile(&state, &mut map);
        assert_eq!(report.calls, 1);
        assert_eq!(map.terrain(), None);
    }

    #[test]
    fn base_layers_are_never_touched() {
        let mut map = HeadlessMap::with_style(
            vec![geojson("rc-osm", 0.0)],
            vec![line("rc-land", "rc-osm")],
        );
        let mut state = StateManager::new();
        state.import_base(map.snapshot());
        state.add_source(geojson("rc-mine", 1.0));
        state.add_layer(line("rc-mine-line", "rc-mine"), None).unwrap();
        let mut rec = Reconciler::new();
        rec.reconcile(&state, &mut map);
        assert_eq!(stack(&map), vec!["rc-land", "rc-mine-line"]);
        assert!(
            !map.journal()
                .iter()
                .any(|op| matches!(op, TargetOp::AddSource(id) if id.as_str() == "rc-osm"))
        );
    }
}
