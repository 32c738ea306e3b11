//! Integration tests: layer sync through the map adapter (gw-engine ↔ gw-core).
//!
//! Every scenario drives `LayerEngine::sync` on a `MapAdapter` mounted on a
//! `HeadlessMap` and inspects the target's journal.

use gw_core::{
    LayerId, LayerKind, LayerModel, LayerStyle, MapLayer, MapSource, RenderKind, SerializedLayer,
    SourceId, SourceKind, SourcePayload, WorkspaceConfig,
};
use gw_engine::{EngineEvent, HeadlessMap, LayerEngine, MapAdapter, RenderTarget, TargetOp};
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn geojson_layer(id: &str, order: u32) -> LayerModel {
    let mut layer = LayerModel::new(
        LayerId::intern(id),
        LayerKind::GeoJson,
        id,
        SourcePayload::geojson(json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {},
                "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}}]
        })),
    );
    layer.order = order;
    layer
}

fn dem_layer(id: &str, order: u32) -> LayerModel {
    let mut layer = LayerModel::new(
        LayerId::intern(id),
        LayerKind::RasterDem,
        id,
        SourcePayload::dem(format!("https://dem.example/{id}/{{z}}/{{x}}/{{y}}.png")),
    )
    .with_terrain(true);
    layer.order = order;
    layer
}

fn serialize(layers: &[LayerModel]) -> Vec<SerializedLayer> {
    layers.iter().map(LayerModel::serialize).collect()
}

fn adapter() -> MapAdapter<HeadlessMap> {
    init_logger();
    MapAdapter::mounted("it", &WorkspaceConfig::default(), HeadlessMap::new())
}

fn journal(adapter: &MapAdapter<HeadlessMap>) -> Vec<TargetOp> {
    adapter.with_target_mut(HeadlessMap::take_journal).unwrap_or_default()
}

fn stack(adapter: &MapAdapter<HeadlessMap>) -> Vec<String> {
    adapter
        .with_target(|t| t.layer_stack().iter().map(ToString::to_string).collect())
        .unwrap_or_default()
}

// ─── Idempotence ─────────────────────────────────────────────────────────

#[test]
fn sync_twice_issues_no_second_mutation() {
    let adapter = adapter();
    let layers = serialize(&[geojson_layer("it-roads", 0), dem_layer("it-dem", 1)]);

    adapter.sync(&layers);
    assert!(!journal(&adapter).is_empty());

    adapter.sync(&layers);
    assert!(journal(&adapter).is_empty());
    assert!(adapter.last_sync().is_noop());
}

// ─── Add / remove / diff ─────────────────────────────────────────────────

#[test]
fn removing_one_layer_leaves_the_other_untouched() {
    let adapter = adapter();
    let a = geojson_layer("it-a", 0);
    let b = geojson_layer("it-b", 1);
    adapter.sync(&serialize(&[a.clone(), b.clone()]));
    journal(&adapter);

    let mut b_moved = b.clone();
    b_moved.order = 0;
    adapter.sync(&serialize(&[b_moved]));

    let report = adapter.last_sync();
    assert_eq!(report.removed, vec![LayerId::intern("it-a")]);
    assert_eq!(report.updated, vec![LayerId::intern("it-b")]);
    assert!(report.added.is_empty());

    let ops = journal(&adapter);
    let touches_b = ops.iter().any(|op| match op {
        TargetOp::AddSource(id) | TargetOp::RemoveSource(id) => id.as_str() == "it-b",
        TargetOp::AddLayer(id) | TargetOp::RemoveLayer(id) => id.as_str().starts_with("it-b::"),
        _ => false,
    });
    assert!(!touches_b, "layer B must not be re-created: {ops:?}");
    assert_eq!(stack(&adapter), vec!["it-b::fill", "it-b::line", "it-b::circle"]);
    assert!(ops.contains(&TargetOp::RemoveSource(SourceId::intern("it-a"))));
}

#[test]
fn style_change_patches_paint_only() {
    let adapter = adapter();
    let layer = geojson_layer("it-style", 0);
    adapter.sync(&serialize(std::slice::from_ref(&layer)));
    journal(&adapter);

    let styled = layer.with_style(LayerStyle {
        stroke_width: Some(6.0),
        ..LayerStyle::default()
    });
    adapter.sync(&serialize(&[styled]));
    assert_eq!(
        journal(&adapter),
        vec![TargetOp::SetPaint(
            LayerId::intern("it-style::line"),
            "line-width".into()
        )]
    );
}

#[test]
fn hiding_a_layer_sets_visibility_layout() {
    let adapter = adapter();
    let layer = dem_layer("it-hide", 0).with_terrain(false);
    adapter.sync(&serialize(std::slice::from_ref(&layer)));
    journal(&adapter);

    adapter.sync(&serialize(&[layer.hidden()]));
    assert_eq!(
        journal(&adapter),
        vec![TargetOp::SetLayout(
            LayerId::intern("it-hide::hillshade"),
            "visibility".into()
        )]
    );
}

// ─── Terrain ─────────────────────────────────────────────────────────────

#[test]
fn terrain_uses_highest_order_candidate() {
    let adapter = adapter();
    adapter.sync(&serialize(&[
        dem_layer("it-t1", 1),
        dem_layer("it-t3", 3),
        dem_layer("it-t2", 2),
    ]));
    let terrain = adapter.with_target(RenderTarget::terrain).flatten();
    assert_eq!(terrain.map(|t| t.source), Some(SourceId::intern("it-t3")));
}

#[test]
fn terrain_cleared_when_no_candidate_remains() {
    let adapter = adapter();
    let dem = dem_layer("it-only-dem", 0);
    adapter.sync(&serialize(std::slice::from_ref(&dem)));
    assert!(adapter.with_target(RenderTarget::terrain).flatten().is_some());

    adapter.sync(&serialize(&[dem.hidden()]));
    assert!(adapter.with_target(RenderTarget::terrain).flatten().is_none());
}

#[test]
fn removing_terrain_layer_clears_terrain_first() {
    let adapter = adapter();
    adapter.sync(&serialize(&[dem_layer("it-gone", 0)]));
    journal(&adapter);

    adapter.sync(&[]);
    let ops = journal(&adapter);
    let clear = ops.iter().position(|op| *op == TargetOp::SetTerrain(None));
    let remove = ops
        .iter()
        .position(|op| *op == TargetOp::RemoveSource(SourceId::intern("it-gone")));
    assert!(clear.is_some() && remove.is_some());
    assert!(clear < remove);
}

// ─── Failure containment ─────────────────────────────────────────────────

#[test]
fn engine_failure_is_contained_per_layer() {
    let adapter = adapter();
    adapter.with_target_mut(|t| t.fail_on("it-broken::line"));
    adapter.sync(&serialize(&[
        geojson_layer("it-broken", 0),
        geojson_layer("it-fine", 1),
    ]));

    let report = adapter.last_sync();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, "it-broken::line");
    assert_eq!(
        stack(&adapter),
        vec![
            "it-broken::fill",
            "it-broken::circle",
            "it-fine::fill",
            "it-fine::line",
            "it-fine::circle",
        ]
    );
}

// ─── Base style ──────────────────────────────────────────────────────────

#[test]
fn style_reload_restores_layers_above_new_base() {
    init_logger();
    let basemap = |layer: &str| {
        (
            vec![MapSource::new(
                SourceId::intern("it-osm"),
                SourceKind::Vector {
                    tiles: vec!["https://tiles.example/{z}/{x}/{y}.pbf".into()],
                    min_zoom: None,
                    max_zoom: Some(14.0),
                },
            )],
            vec![MapLayer::new(LayerId::intern(layer), RenderKind::Fill, SourceId::intern("it-osm"))],
        )
    };
    let (sources, layers) = basemap("it-streets");
    let adapter = MapAdapter::mounted(
        "it-base",
        &WorkspaceConfig::default(),
        HeadlessMap::with_style(sources, layers),
    );
    adapter.sync(&serialize(&[geojson_layer("it-mine", 0)]));
    assert_eq!(stack(&adapter)[0], "it-streets");

    let (sources, layers) = basemap("it-satellite");
    adapter.with_target_mut(|t| t.simulate_style_load(sources, layers));
    adapter.handle_event(EngineEvent::StyleLoad);
    assert_eq!(
        stack(&adapter),
        vec!["it-satellite", "it-mine::fill", "it-mine::line", "it-mine::circle"]
    );

    // Base layers never count as managed changes.
    journal(&adapter);
    adapter.sync(&serialize(&[geojson_layer("it-mine", 0)]));
    assert!(journal(&adapter).is_empty());
}
