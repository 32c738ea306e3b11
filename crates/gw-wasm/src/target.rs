//! `RenderTarget` over a JavaScript map facade.
//!
//! The host page wraps its MapLibre map (and draw plugin) in a plain object
//! and hands it to `GwWorkspaces::mount`. Structured arguments and return
//! values cross the boundary as JSON strings; ids and names as plain strings.
//!
//! | method              | arguments                              | returns            |
//! |---------------------|----------------------------------------|--------------------|
//! | `getCamera`         |                                        | `MapView` JSON     |
//! | `jumpTo`            | `MapView` JSON                         |                    |
//! | `fitBounds`         | `[w,s,e,n]` JSON, padding              |                    |
//! | `addSource`         | id, source JSON                        |                    |
//! | `removeSource`      | id                                     |                    |
//! | `setSourceData`     | id, GeoJSON                            |                    |
//! | `addLayer`          | layer JSON, before id or `undefined`   |                    |
//! | `removeLayer`       | id                                     |                    |
//! | `moveLayer`         | id, before id or `undefined`           |                    |
//! | `setPaintProperty`  | id, name, value JSON or `null`         |                    |
//! | `setLayoutProperty` | id, name, value JSON or `null`         |                    |
//! | `getLayerIds`       |                                        | `string[]` JSON    |
//! | `getTerrain`        |                                        | terrain JSON/null  |
//! | `setTerrain`        | terrain JSON or `null`                 |                    |
//! | `getStyle`          |                                        | `{sources,layers}` |
//! | `setDrawMode`       | mode name or `null`                    |                    |
//! | `getDrawFeatures`   |                                        | FeatureCollection  |
//! | `clearDraw`         |                                        |                    |
//!
//! A thrown exception becomes an `EngineError` for that one operation.

use gw_core::{
    BBox, DrawMode, EngineError, FeatureCollection, LayerId, MapLayer, MapSource, MapView,
    SourceId, StyleSnapshot, Terrain,
};
use gw_engine::RenderTarget;
use js_sys::{Array, Function, Reflect};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};

/// Style listing as returned by `getStyle`, entries still undecoded.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StyleJson {
    sources: Vec<Value>,
    layers: Vec<Value>,
}

/// Decode a `getStyle` result entry by entry. Entries this crate cannot
/// represent (other render types, TileJSON `url` sources, ...) are skipped
/// so the rest of the base style still gets adopted.
pub(crate) fn decode_style(raw: &str) -> StyleSnapshot {
    let style: StyleJson = match serde_json::from_str(raw) {
        Ok(style) => style,
        Err(err) => {
            log::error!("getStyle: malformed result: {err}");
            return StyleSnapshot::default();
        }
    };
    StyleSnapshot {
        sources: decode_entries("source", style.sources),
        layers: decode_entries("layer", style.layers),
    }
}

fn decode_entries<T: DeserializeOwned>(what: &str, entries: Vec<Value>) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let id = entry.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
            serde_json::from_value(entry)
                .map_err(|err| log::warn!("getStyle: skipping {what} '{id}': {err}"))
                .ok()
        })
        .collect()
}

pub struct JsRenderTarget {
    facade: JsValue,
}

impl JsRenderTarget {
    pub fn new(facade: JsValue) -> Self {
        Self { facade }
    }

    fn call(
        &self,
        op: &'static str,
        target: &str,
        args: &[JsValue],
    ) -> Result<JsValue, EngineError> {
        let method = Reflect::get(&self.facade, &JsValue::from_str(op))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| EngineError::rejected(op, target, "facade does not implement it"))?;
        let array = Array::new();
        for arg in args {
            array.push(arg);
        }
        method
            .apply(&self.facade, &array)
            .map_err(|err| EngineError::rejected(op, target, describe(&err)))
    }

    /// Call a read-only method returning a JSON string.
    fn query_raw(&self, op: &'static str) -> Option<String> {
        match self.call(op, "", &[]) {
            Ok(value) => value.as_string(),
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    /// Call a read-only method and decode its JSON result.
    fn query<T: DeserializeOwned>(&self, op: &'static str) -> Option<T> {
        let raw = self.query_raw(op)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log::error!("{op}: malformed result: {err}");
                None
            }
        }
    }
}

fn describe(err: &JsValue) -> String {
    if let Some(message) = err.as_string() {
        return message;
    }
    match err.dyn_ref::<js_sys::Error>() {
        Some(error) => String::from(error.message()),
        None => "unknown error".to_string(),
    }
}

fn json_arg<T: Serialize + ?Sized>(
    op: &'static str,
    target: &str,
    value: &T,
) -> Result<JsValue, EngineError> {
    serde_json::to_string(value)
        .map(|s| JsValue::from_str(&s))
        .map_err(|err| EngineError::rejected(op, target, err.to_string()))
}

fn optional_id(id: Option<LayerId>) -> JsValue {
    id.map_or(JsValue::UNDEFINED, |id| JsValue::from_str(id.as_str()))
}

fn property_arg(op: &'static str, id: LayerId, value: Option<&Value>) -> Result<JsValue, EngineError> {
    match value {
        Some(value) => json_arg(op, id.as_str(), value),
        None => Ok(JsValue::NULL),
    }
}

impl RenderTarget for JsRenderTarget {
    fn camera(&self) -> MapView {
        self.query("getCamera").unwrap_or_default()
    }

    fn jump_to(&mut self, view: &MapView) -> Result<(), EngineError> {
        let arg = json_arg("jumpTo", "camera", view)?;
        self.call("jumpTo", "camera", &[arg]).map(drop)
    }

    fn fit_bounds(&mut self, bounds: &BBox, padding: f64) -> Result<(), EngineError> {
        let arg = json_arg("fitBounds", "camera", bounds)?;
        self.call("fitBounds", "camera", &[arg, JsValue::from_f64(padding)])
            .map(drop)
    }

    fn add_source(&mut self, source: &MapSource) -> Result<(), EngineError> {
        let id = source.id.as_str();
        let arg = json_arg("addSource", id, source)?;
        self.call("addSource", id, &[JsValue::from_str(id), arg]).map(drop)
    }

    fn remove_source(&mut self, id: SourceId) -> Result<(), EngineError> {
        self.call("removeSource", id.as_str(), &[JsValue::from_str(id.as_str())])
            .map(drop)
    }

    fn set_source_data(&mut self, id: SourceId, data: &Value) -> Result<(), EngineError> {
        let arg = json_arg("setSourceData", id.as_str(), data)?;
        self.call("setSourceData", id.as_str(), &[JsValue::from_str(id.as_str()), arg])
            .map(drop)
    }

    fn add_layer(&mut self, layer: &MapLayer, before: Option<LayerId>) -> Result<(), EngineError> {
        let id = layer.id.as_str();
        let arg = json_arg("addLayer", id, layer)?;
        self.call("addLayer", id, &[arg, optional_id(before)]).map(drop)
    }

    fn remove_layer(&mut self, id: LayerId) -> Result<(), EngineError> {
        self.call("removeLayer", id.as_str(), &[JsValue::from_str(id.as_str())])
            .map(drop)
    }

    fn move_layer(&mut self, id: LayerId, before: Option<LayerId>) -> Result<(), EngineError> {
        self.call(
            "moveLayer",
            id.as_str(),
            &[JsValue::from_str(id.as_str()), optional_id(before)],
        )
        .map(drop)
    }

    fn set_paint_property(
        &mut self,
        id: LayerId,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), EngineError> {
        let arg = property_arg("setPaintProperty", id, value)?;
        self.call(
            "setPaintProperty",
            id.as_str(),
            &[JsValue::from_str(id.as_str()), JsValue::from_str(name), arg],
        )
        .map(drop)
    }

    fn set_layout_property(
        &mut self,
        id: LayerId,
        name: &str,
        value: Option<&Value>,
    ) -> Result<(), EngineError> {
        let arg = property_arg("setLayoutProperty", id, value)?;
        self.call(
            "setLayoutProperty",
            id.as_str(),
            &[JsValue::from_str(id.as_str()), JsValue::from_str(name), arg],
        )
        .map(drop)
    }

    fn layer_stack(&self) -> Vec<LayerId> {
        self.query::<Vec<String>>("getLayerIds")
            .map(|ids| ids.iter().map(|id| LayerId::intern(id)).collect())
            .unwrap_or_default()
    }

    fn terrain(&self) -> Option<Terrain> {
        self.query::<Option<Terrain>>("getTerrain").flatten()
    }

    fn set_terrain(&mut self, terrain: Option<&Terrain>) -> Result<(), EngineError> {
        let target = terrain.map_or("none", |t| t.source.as_str());
        let arg = match terrain {
            Some(terrain) => json_arg("setTerrain", target, terrain)?,
            None => JsValue::NULL,
        };
        self.call("setTerrain", target, &[arg]).map(drop)
    }

    fn snapshot(&self) -> StyleSnapshot {
        self.query_raw("getStyle")
            .map(|raw| decode_style(&raw))
            .unwrap_or_default()
    }

    fn set_draw_mode(&mut self, mode: Option<DrawMode>) -> Result<(), EngineError> {
        let arg = mode.map_or(JsValue::NULL, |m| JsValue::from_str(m.as_str()));
        self.call("setDrawMode", "draw", &[arg]).map(drop)
    }

    fn draw_features(&self) -> FeatureCollection {
        self.query("getDrawFeatures").unwrap_or_default()
    }

    fn clear_draw(&mut self) -> Result<(), EngineError> {
        self.call("clearDraw", "draw", &[]).map(drop)
    }
}
