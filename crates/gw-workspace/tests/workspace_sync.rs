//! Integration tests: workspace stores bound to a map adapter
//! (gw-workspace ↔ gw-engine ↔ gw-core).

use gw_core::{
    DrawMode, LayerId, LayerKind, LayerModel, MapView, SourcePayload, WorkspaceConfig,
};
use gw_engine::{EngineEvent, HeadlessMap, MapAdapter, MapEngine, RenderTarget, TargetOp};
use gw_workspace::{WorkspaceManager, WorkspaceStore};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

type Adapter = MapAdapter<HeadlessMap>;
type Workspace = WorkspaceStore<Adapter>;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn bound_workspace(id: &str) -> Workspace {
    init_logger();
    let config = WorkspaceConfig::default();
    let mut ws = Workspace::new(id, &config);
    ws.bind(Adapter::mounted(id, &config, HeadlessMap::new()));
    ws
}

fn engine(ws: &Workspace) -> &Adapter {
    ws.engine().expect("workspace is bound")
}

fn take_journal(ws: &Workspace) -> Vec<TargetOp> {
    engine(ws)
        .with_target_mut(HeadlessMap::take_journal)
        .unwrap_or_default()
}

fn stack(ws: &Workspace) -> Vec<String> {
    engine(ws)
        .with_target(|t| t.layer_stack().iter().map(ToString::to_string).collect())
        .unwrap_or_default()
}

fn raster(id: &str) -> LayerModel {
    LayerModel::new(
        LayerId::intern(id),
        LayerKind::Raster,
        id,
        SourcePayload::tiles(format!("https://tiles.example/{id}/{{z}}/{{x}}/{{y}}.png")),
    )
}

// ─── Viewport ────────────────────────────────────────────────────────────

#[test]
fn user_pan_updates_store_without_feedback() {
    let ws = bound_workspace("ws-pan");
    take_journal(&ws);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _sub = ws.map.subscribe(move |v| sink.borrow_mut().push(*v));

    let panned = MapView {
        center: [2.35, 48.85],
        zoom: 11.0,
        bearing: 15.0,
        pitch: 30.0,
    };
    engine(&ws).with_target_mut(|t| t.simulate_camera(panned));
    engine(&ws).handle_event(EngineEvent::MoveEnd);

    assert_eq!(ws.map.view(), panned);
    assert_eq!(*seen.borrow(), vec![panned]);
    assert!(
        !take_journal(&ws)
            .iter()
            .any(|op| matches!(op, TargetOp::JumpTo(_))),
        "an engine-originated view must not be pushed back"
    );
}

#[test]
fn programmatic_view_is_clamped_and_pushed_once() {
    let ws = bound_workspace("ws-zoom");
    take_journal(&ws);

    ws.map.set_zoom(25.0);
    ws.map.set_center([200.0, 95.0]);

    assert_eq!(ws.map.view().zoom, 22.0);
    assert_eq!(ws.map.view().center, [-160.0, 90.0]);
    let jumps: Vec<MapView> = take_journal(&ws)
        .into_iter()
        .filter_map(|op| match op {
            TargetOp::JumpTo(v) => Some(v),
            _ => None,
        })
        .collect();
    assert_eq!(jumps.len(), 2);
    assert_eq!(engine(&ws).get_view(), ws.map.view());
}

#[test]
fn fit_to_layer_moves_camera_into_store() {
    let ws = bound_workspace("ws-fit");
    let layer = LayerModel::new(
        LayerId::intern("ws-fit-pts"),
        LayerKind::GeoJson,
        "Points",
        SourcePayload::geojson(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [10.0, 40.0]}},
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [12.0, 42.0]}}
            ]
        })),
    );
    let id = ws.layers.add_layer(layer, None);
    ws.layers.fit_to_layer(id);
    assert_eq!(ws.map.view().center, [11.0, 41.0]);
}

// ─── Layers ──────────────────────────────────────────────────────────────

#[test]
fn layer_store_drives_engine_stack() {
    let ws = bound_workspace("ws-layers");
    for id in ["ws-l1", "ws-l2", "ws-l3"] {
        ws.layers.add_layer(raster(id), None);
    }
    assert_eq!(stack(&ws), vec!["ws-l1::raster", "ws-l2::raster", "ws-l3::raster"]);

    ws.layers.move_layer(LayerId::intern("ws-l3"), 0);
    ws.layers.remove_layer(LayerId::intern("ws-l1"));
    assert_eq!(stack(&ws), vec!["ws-l3::raster", "ws-l2::raster"]);
    let orders: Vec<u32> = ws.layers.layers_array().iter().map(|l| l.order).collect();
    assert_eq!(orders, vec![0, 1]);

    take_journal(&ws);
    ws.layers.rename_layer(LayerId::intern("ws-l2"), "Second");
    assert!(take_journal(&ws).is_empty(), "renames never reach the engine");
}

#[test]
fn layers_added_before_mount_appear_on_mount() {
    init_logger();
    let config = WorkspaceConfig::default();
    let mut ws = Workspace::new("ws-late", &config);
    ws.bind(Adapter::new("ws-late", &config));
    ws.layers.add_layer(raster("ws-late-a"), None);
    ws.tools.set_tool(Some(DrawMode::Rectangle));

    let map = HeadlessMap::new();
    engine(&ws).mount(map);
    assert_eq!(stack(&ws), vec!["ws-late-a::raster"]);
    assert_eq!(
        engine(&ws).with_target(HeadlessMap::draw_mode).flatten(),
        Some(DrawMode::Rectangle)
    );
}

// ─── Tools & draw ────────────────────────────────────────────────────────

#[test]
fn at_most_one_tool_reaches_the_engine() {
    let ws = bound_workspace("ws-tools");
    ws.tools.toggle_tool(DrawMode::Polygon);
    ws.tools.toggle_tool(DrawMode::Point);
    assert_eq!(ws.tools.active_tool(), Some(DrawMode::Point));

    let modes: Vec<Option<DrawMode>> = take_journal(&ws)
        .into_iter()
        .filter_map(|op| match op {
            TargetOp::SetDrawMode(m) => Some(m),
            _ => None,
        })
        .collect();
    assert_eq!(modes, vec![None, Some(DrawMode::Polygon), Some(DrawMode::Point)]);
    assert_eq!(engine(&ws).with_target(HeadlessMap::draw_mode).flatten(), Some(DrawMode::Point));
}

#[test]
fn draw_store_mirrors_engine_geometry() {
    let ws = bound_workspace("ws-draw");
    engine(&ws).with_target_mut(|t| {
        t.simulate_draw(json!({"type": "Feature", "properties": {},
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}))
    });
    engine(&ws).handle_event(EngineEvent::DrawFinish);
    assert_eq!(ws.draw.feature_count(), 1);

    ws.draw.clear_geometry();
    assert_eq!(ws.draw.feature_count(), 0);
    assert!(
        engine(&ws)
            .with_target(|t| t.draw_features())
            .is_some_and(|fc| fc.is_empty())
    );
}

// ─── Lifecycle ───────────────────────────────────────────────────────────

#[test]
fn unbind_stops_both_directions() {
    let mut ws = bound_workspace("ws-unbind");
    let adapter = ws.unbind().expect("engine returned");
    assert!(adapter.is_ready());
    let before = adapter.get_view();

    ws.map.set_zoom(12.0);
    assert_eq!(adapter.get_view(), before);

    adapter.with_target_mut(|t| {
        t.simulate_camera(MapView {
            zoom: 3.0,
            ..MapView::default()
        })
    });
    adapter.handle_event(EngineEvent::MoveEnd);
    assert_eq!(ws.map.view().zoom, 12.0);
}

#[test]
fn manager_creates_and_closes_workspaces() {
    init_logger();
    let config = WorkspaceConfig::default();
    let mut manager: WorkspaceManager<Workspace> = WorkspaceManager::new(config.clone());

    let ws = manager.get_or_create_workspace("ws-m1");
    ws.bind(Adapter::mounted("ws-m1", &config, HeadlessMap::new()));
    ws.layers.add_layer(raster("ws-m1-layer"), None);
    manager.create_workspace("ws-m2");

    assert_eq!(manager.len(), 2);
    assert_eq!(manager.active_id(), Some("ws-m1"));
    assert!(manager.active_workspace().is_some_and(Workspace::is_bound));

    assert!(manager.close_workspace("ws-m1"));
    assert!(manager.active_workspace().is_none());
    assert!(manager.set_active("ws-m2"));
    assert_eq!(
        manager.active_workspace().map(|w| w.layers.len()),
        Some(0)
    );
}
