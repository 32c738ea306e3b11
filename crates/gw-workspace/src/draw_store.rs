//! Read-only mirror of the draw engine's geometry.
//!
//! The engine owns the features; this store only reflects them. The one
//! mutation it offers, `clear_geometry`, clears the engine and the mirror.

use gw_core::{FeatureCollection, Observable, Subscription};
use gw_engine::DrawEngine;
use std::rc::{Rc, Weak};

pub struct DrawStore {
    geometry: Observable<FeatureCollection>,
    bindings: Vec<Subscription>,
    engine: Option<Weak<dyn DrawEngine>>,
}

impl Default for DrawStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawStore {
    pub fn new() -> Self {
        Self {
            geometry: Observable::new(FeatureCollection::default()),
            bindings: Vec::new(),
            engine: None,
        }
    }

    pub fn bind<E: DrawEngine + 'static>(&mut self, engine: &Rc<E>) {
        self.destroy();
        self.geometry.set(engine.get_features());

        let geometry = self.geometry.clone();
        let mirror = engine.on_change(Box::new(move |features: &FeatureCollection| {
            geometry.set(features.clone());
        }));
        let shared: Rc<dyn DrawEngine> = engine.clone();
        self.bindings = vec![mirror];
        self.engine = Some(Rc::downgrade(&shared));
    }

    pub fn destroy(&mut self) {
        self.bindings.clear();
        self.engine = None;
    }

    pub fn geometry(&self) -> FeatureCollection {
        self.geometry.get()
    }

    pub fn feature_count(&self) -> usize {
        self.geometry.with(FeatureCollection::len)
    }

    /// Clear drawn geometry in the engine and locally.
    pub fn clear_geometry(&self) {
        if let Some(engine) = self.engine.as_ref().and_then(Weak::upgrade) {
            engine.clear();
        }
        self.geometry.set(FeatureCollection::default());
    }

    pub fn subscribe(&self, listener: impl Fn(&FeatureCollection) + 'static) -> Subscription {
        self.geometry.subscribe(listener)
    }
}
