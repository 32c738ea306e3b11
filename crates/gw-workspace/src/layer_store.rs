//! Layer collection store.
//!
//! The layers are kept sorted by `order`, and `order` always equals the
//! index: `0..n` with no gaps. A bound [`LayerEngine`] receives the
//! serialized layer list whenever it changes (and once on bind); changes
//! that do not affect rendering, like a rename, never reach the engine.

use gw_core::{
    BBox, LayerId, LayerModel, LayerStyle, Observable, SerializedLayer, Subscription,
};
use gw_engine::LayerEngine;
use std::rc::{Rc, Weak};

pub struct LayerStore {
    layers: Observable<Vec<LayerModel>>,
    bindings: Vec<Subscription>,
    engine: Option<Weak<dyn LayerEngine>>,
}

fn renumber(layers: &mut [LayerModel]) {
    for (i, layer) in layers.iter_mut().enumerate() {
        layer.order = i as u32;
    }
}

fn serialize_all(layers: &[LayerModel]) -> Vec<SerializedLayer> {
    layers.iter().map(LayerModel::serialize).collect()
}

impl Default for LayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStore {
    pub fn new() -> Self {
        Self {
            layers: Observable::new(Vec::new()),
            bindings: Vec::new(),
            engine: None,
        }
    }

    // ─── Binding ─────────────────────────────────────────────────────────

    /// Bind to an engine and sync the current layers right away.
    pub fn bind<E: LayerEngine + 'static>(&mut self, engine: &Rc<E>) {
        self.destroy();
        let shared: Rc<dyn LayerEngine> = engine.clone();
        let weak = Rc::downgrade(&shared);

        let (serialized, link) = self.layers.derive(|layers| serialize_all(layers));
        let push = serialized.subscribe_immediate(move |layers: &Vec<SerializedLayer>| {
            if let Some(engine) = weak.upgrade() {
                engine.sync(layers);
            }
        });
        self.bindings = vec![link, push];
        self.engine = Some(Rc::downgrade(&shared));
    }

    pub fn destroy(&mut self) {
        self.bindings.clear();
        self.engine = None;
    }

    fn engine(&self) -> Option<Rc<dyn LayerEngine>> {
        self.engine.as_ref().and_then(Weak::upgrade)
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Add a layer. With `order` unset the layer is appended on top (a
    /// layer with the same id is replaced in place and keeps its order).
    /// With `order` set the layer is inserted there, shifting the layers
    /// above it up; an order past the top appends.
    pub fn add_layer(&self, mut layer: LayerModel, order: Option<usize>) -> LayerId {
        let id = layer.id;
        self.layers.update(|layers| {
            let existing = layers.iter().position(|l| l.id == id);
            if existing.is_some() {
                log::warn!("layer '{id}' already exists, replacing it");
            }
            match (existing, order) {
                (Some(i), None) => {
                    layer.order = i as u32;
                    layers[i] = layer;
                }
                (None, None) => {
                    layer.order = layers.len() as u32;
                    layers.push(layer);
                }
                (existing, Some(order)) => {
                    if let Some(i) = existing {
                        layers.remove(i);
                    }
                    let at = order.min(layers.len());
                    layers.insert(at, layer);
                    renumber(layers);
                }
            }
        });
        id
    }

    pub fn remove_layer(&self, id: LayerId) -> Option<LayerModel> {
        let removed = self.layers.update(|layers| {
            let i = layers.iter().position(|l| l.id == id)?;
            let removed = layers.remove(i);
            renumber(layers);
            Some(removed)
        });
        if removed.is_none() {
            log::warn!("remove_layer: unknown layer '{id}'");
        }
        removed
    }

    /// Move a layer to `new_order` (clamped to the top).
    pub fn move_layer(&self, id: LayerId, new_order: usize) -> bool {
        let moved = self.layers.update(|layers| {
            let Some(i) = layers.iter().position(|l| l.id == id) else {
                return false;
            };
            let layer = layers.remove(i);
            let at = new_order.min(layers.len());
            layers.insert(at, layer);
            renumber(layers);
            true
        });
        if !moved {
            log::warn!("move_layer: unknown layer '{id}'");
        }
        moved
    }

    /// Flip visibility. Returns the new visibility.
    pub fn toggle_visibility(&self, id: LayerId) -> Option<bool> {
        self.modify(id, |layer| {
            layer.visible = !layer.visible;
            layer.visible
        })
    }

    pub fn set_visibility(&self, id: LayerId, visible: bool) -> bool {
        self.modify(id, |layer| layer.visible = visible).is_some()
    }

    pub fn set_style(&self, id: LayerId, style: LayerStyle) -> bool {
        self.modify(id, |layer| layer.style = style).is_some()
    }

    pub fn set_terrain_enabled(&self, id: LayerId, enabled: bool) -> bool {
        self.modify(id, |layer| layer.terrain_enabled = enabled).is_some()
    }

    pub fn rename_layer(&self, id: LayerId, name: impl Into<String>) -> bool {
        let name = name.into();
        self.modify(id, |layer| layer.name = name).is_some()
    }

    fn modify<T>(&self, id: LayerId, f: impl FnOnce(&mut LayerModel) -> T) -> Option<T> {
        let out = self
            .layers
            .update(|layers| layers.iter_mut().find(|l| l.id == id).map(f));
        if out.is_none() {
            log::warn!("unknown layer '{id}'");
        }
        out
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn get(&self, id: LayerId) -> Option<LayerModel> {
        self.layers.with(|layers| layers.iter().find(|l| l.id == id).cloned())
    }

    /// All layers, bottom to top.
    pub fn layers_array(&self) -> Vec<LayerModel> {
        self.layers.get()
    }

    pub fn serialized_layers(&self) -> Vec<SerializedLayer> {
        self.layers.with(|layers| serialize_all(layers))
    }

    pub fn len(&self) -> usize {
        self.layers.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self, listener: impl Fn(&Vec<LayerModel>) + 'static) -> Subscription {
        self.layers.subscribe(listener)
    }

    // ─── Camera ──────────────────────────────────────────────────────────

    pub fn fit_to_layer(&self, id: LayerId) {
        match self.engine() {
            Some(engine) => engine.fit_to_layer(id),
            None => log::debug!("fit_to_layer on an unbound layer store ignored"),
        }
    }

    pub fn fit_to_bounds(&self, bbox: BBox) {
        match self.engine() {
            Some(engine) => engine.fit_to_bounds(bbox),
            None => log::debug!("fit_to_bounds on an unbound layer store ignored"),
        }
    }
}
