//! WASM bridge for GW: exposes workspaces to a JavaScript map renderer.
//!
//! Compiled via `wasm-pack build --target web`. The page creates one
//! [`GwWorkspaces`], opens workspaces by id, mounts each onto a map facade
//! (see [`target`]) and forwards the map's events through `handle_event`.
//! Structured values are exchanged as JSON strings.

mod logger;
pub mod target;

use gw_core::{BBox, DrawMode, LayerId, LayerModel, LayerStyle, ViewPatch, WorkspaceConfig};
use gw_engine::{EngineEvent, MapAdapter, SyncReport};
use gw_workspace::{WorkspaceManager, WorkspaceStore};
use serde_json::{json, Value};
use target::JsRenderTarget;
use wasm_bindgen::prelude::*;

type JsWorkspace = WorkspaceStore<MapAdapter<JsRenderTarget>>;

/// Every workspace of one page.
///
/// Workspaces are bound to an engine adapter as soon as they are created, so
/// layers, view and tool set before `mount` are applied once the map exists.
#[wasm_bindgen]
pub struct GwWorkspaces {
    manager: WorkspaceManager<JsWorkspace>,
}

#[wasm_bindgen]
impl GwWorkspaces {
    /// Create the registry from a JSON `WorkspaceConfig` (`""` for defaults).
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<GwWorkspaces, JsValue> {
        console_error_panic_hook_setup();
        logger::init(log::LevelFilter::Info);

        let config = if config_json.trim().is_empty() {
            WorkspaceConfig::default()
        } else {
            WorkspaceConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        Ok(Self {
            manager: WorkspaceManager::new(config),
        })
    }

    // ─── Workspaces ──────────────────────────────────────────────────────

    /// Open a workspace, or return the existing one with that id.
    pub fn create_workspace(&mut self, id: &str) {
        let config = self.manager.config().clone();
        let ws = self.manager.get_or_create_workspace(id);
        if !ws.is_bound() {
            ws.bind(MapAdapter::new(id, &config));
        }
    }

    pub fn close_workspace(&mut self, id: &str) -> bool {
        self.manager.close_workspace(id)
    }

    pub fn set_active(&mut self, id: &str) -> bool {
        self.manager.set_active(id)
    }

    pub fn active_workspace(&self) -> Option<String> {
        self.manager.active_id().map(str::to_string)
    }

    /// JSON array of workspace ids.
    pub fn workspace_ids(&self) -> String {
        let ids: Vec<&str> = self.manager.ids().collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// Attach a map facade to a workspace, creating the workspace if needed.
    /// Returns `true` if a previous facade was replaced.
    pub fn mount(&mut self, id: &str, facade: JsValue) -> bool {
        self.create_workspace(id);
        self.engine(id)
            .is_some_and(|engine| engine.mount(JsRenderTarget::new(facade)).is_some())
    }

    /// Detach the map facade. The workspace keeps its state.
    pub fn unmount(&self, id: &str) -> bool {
        self.engine(id).is_some_and(|engine| engine.unmount().is_some())
    }

    /// Forward a map event by name (`moveend`, `style.load`, `draw.create`, ...).
    /// Returns `false` for unknown workspaces and ignored events.
    pub fn handle_event(&self, id: &str, event: &str) -> bool {
        let Some(event) = EngineEvent::from_name(event) else {
            log::trace!("ignoring map event '{event}'");
            return false;
        };
        match self.engine(id) {
            Some(engine) => {
                engine.handle_event(event);
                true
            }
            None => false,
        }
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    /// Add a layer from `LayerModel` JSON. An `order` present in the JSON
    /// places the layer there; otherwise it goes on top.
    /// Returns `{"ok":true,"result":id}`.
    pub fn add_layer(&self, id: &str, layer_json: &str) -> String {
        respond(self.with_workspace(id, |ws| {
            let (layer, order) = parse_layer(layer_json)?;
            Ok(json!(ws.layers.add_layer(layer, order)))
        }))
    }

    pub fn remove_layer(&self, id: &str, layer_id: &str) -> bool {
        self.workspace(id)
            .is_some_and(|ws| ws.layers.remove_layer(LayerId::intern(layer_id)).is_some())
    }

    pub fn move_layer(&self, id: &str, layer_id: &str, order: usize) -> bool {
        self.workspace(id)
            .is_some_and(|ws| ws.layers.move_layer(LayerId::intern(layer_id), order))
    }

    /// New visibility, or `undefined` for an unknown layer.
    pub fn toggle_visibility(&self, id: &str, layer_id: &str) -> Option<bool> {
        self.workspace(id)?
            .layers
            .toggle_visibility(LayerId::intern(layer_id))
    }

    pub fn set_style(&self, id: &str, layer_id: &str, style_json: &str) -> String {
        respond(self.with_workspace(id, |ws| {
            let style: LayerStyle = serde_json::from_str(style_json).map_err(|e| e.to_string())?;
            if ws.layers.set_style(LayerId::intern(layer_id), style) {
                Ok(Value::Null)
            } else {
                Err(format!("unknown layer '{layer_id}'"))
            }
        }))
    }

    pub fn set_terrain_enabled(&self, id: &str, layer_id: &str, enabled: bool) -> bool {
        self.workspace(id)
            .is_some_and(|ws| ws.layers.set_terrain_enabled(LayerId::intern(layer_id), enabled))
    }

    pub fn rename_layer(&self, id: &str, layer_id: &str, name: &str) -> bool {
        self.workspace(id)
            .is_some_and(|ws| ws.layers.rename_layer(LayerId::intern(layer_id), name))
    }

    /// JSON array of the workspace's layers in stacking order.
    pub fn get_layers(&self, id: &str) -> String {
        self.workspace(id)
            .and_then(|ws| serde_json::to_string(&ws.layers.layers_array()).ok())
            .unwrap_or_else(|| "[]".to_string())
    }

    pub fn fit_to_layer(&self, id: &str, layer_id: &str) {
        if let Some(ws) = self.workspace(id) {
            ws.layers.fit_to_layer(LayerId::intern(layer_id));
        }
    }

    /// Outcome of the most recent layer sync, as JSON.
    pub fn last_sync(&self, id: &str) -> String {
        self.engine(id)
            .map(|engine| sync_report_json(&engine.last_sync()).to_string())
            .unwrap_or_else(|| "null".to_string())
    }

    // ─── View ────────────────────────────────────────────────────────────

    pub fn get_view(&self, id: &str) -> String {
        self.workspace(id)
            .and_then(|ws| serde_json::to_string(&ws.map.view()).ok())
            .unwrap_or_else(|| "null".to_string())
    }

    /// Apply a partial view (`{"zoom": 8}`). Returns the clamped view.
    pub fn set_view(&self, id: &str, patch_json: &str) -> String {
        respond(self.with_workspace(id, |ws| {
            let patch: ViewPatch = serde_json::from_str(patch_json).map_err(|e| e.to_string())?;
            ws.map.set_view(&patch);
            serde_json::to_value(ws.map.view()).map_err(|e| e.to_string())
        }))
    }

    pub fn fit_bounds(&self, id: &str, bbox_json: &str, padding: Option<f64>) -> String {
        respond(self.with_workspace(id, |ws| {
            let bbox: BBox = serde_json::from_str(bbox_json).map_err(|e| e.to_string())?;
            ws.map.fit_bounds(bbox, padding);
            serde_json::to_value(ws.map.view()).map_err(|e| e.to_string())
        }))
    }

    // ─── Tools & draw ────────────────────────────────────────────────────

    /// Activate a draw tool by name, or deactivate with `undefined`.
    pub fn set_tool(&self, id: &str, mode: Option<String>) -> String {
        respond(self.with_workspace(id, |ws| {
            let mode = mode.as_deref().map(str::parse::<DrawMode>).transpose()?;
            ws.tools.set_tool(mode);
            Ok(json!(ws.tools.active_tool()))
        }))
    }

    pub fn toggle_tool(&self, id: &str, mode: &str) -> String {
        respond(self.with_workspace(id, |ws| {
            ws.tools.toggle_tool(mode.parse()?);
            Ok(json!(ws.tools.active_tool()))
        }))
    }

    pub fn active_tool(&self, id: &str) -> Option<String> {
        self.workspace(id)?
            .tools
            .active_tool()
            .map(|mode| mode.as_str().to_string())
    }

    /// Drawn geometry as a GeoJSON FeatureCollection.
    pub fn get_geometry(&self, id: &str) -> String {
        self.workspace(id)
            .and_then(|ws| serde_json::to_string(&ws.draw.geometry()).ok())
            .unwrap_or_else(|| "null".to_string())
    }

    pub fn clear_geometry(&self, id: &str) -> bool {
        match self.workspace(id) {
            Some(ws) => {
                ws.draw.clear_geometry();
                true
            }
            None => false,
        }
    }
}

impl GwWorkspaces {
    fn workspace(&self, id: &str) -> Option<&JsWorkspace> {
        let ws = self.manager.get(id);
        if ws.is_none() {
            log::warn!("unknown workspace '{id}'");
        }
        ws
    }

    fn engine(&self, id: &str) -> Option<&MapAdapter<JsRenderTarget>> {
        self.workspace(id)?.engine()
    }

    fn with_workspace(
        &self,
        id: &str,
        f: impl FnOnce(&JsWorkspace) -> Result<Value, String>,
    ) -> Result<Value, String> {
        match self.manager.get(id) {
            Some(ws) => f(ws),
            None => Err(format!("unknown workspace '{id}'")),
        }
    }
}

/// Set the console log level (`off`, `error`, `warn`, `info`, `debug`, `trace`).
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> bool {
    match logger::parse_level(level) {
        Some(level) => {
            logger::init(level);
            true
        }
        None => false,
    }
}

/// Validate a workspace config. Returns JSON: `{"ok":true}` or `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_config(json: &str) -> String {
    respond(
        WorkspaceConfig::from_json(json)
            .map(|_| Value::Null)
            .map_err(|e| e.to_string()),
    )
}

/// Decode a layer, noting whether the caller chose its order.
fn parse_layer(layer_json: &str) -> Result<(LayerModel, Option<usize>), String> {
    let value: Value = serde_json::from_str(layer_json).map_err(|e| e.to_string())?;
    let order = value
        .get("order")
        .and_then(Value::as_u64)
        .and_then(|o| usize::try_from(o).ok());
    let layer = serde_json::from_value(value).map_err(|e| e.to_string())?;
    Ok((layer, order))
}

fn respond(result: Result<Value, String>) -> String {
    match result {
        Ok(Value::Null) => json!({ "ok": true }),
        Ok(value) => json!({ "ok": true, "result": value }),
        Err(error) => json!({ "ok": false, "error": error }),
    }
    .to_string()
}

fn sync_report_json(report: &SyncReport) -> Value {
    let failures: Vec<Value> = report
        .failures
        .iter()
        .map(|f| json!({ "id": f.id, "error": f.error.to_string() }))
        .collect();
    json!({
        "added": report.added,
        "updated": report.updated,
        "removed": report.removed,
        "engineCalls": report.engine_calls,
        "failures": failures,
    })
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("GW WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
