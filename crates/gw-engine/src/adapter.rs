//! The concrete engine adapter.
//!
//! `MapAdapter<R>` implements all three capability ports on top of a
//! [`DirectMap`] and a [`LayerSync`], for any [`RenderTarget`]. It can be
//! created and bound to a workspace before the live map exists; calls made
//! while unmounted only update internal state and are applied on `mount`.
//!
//! The host forwards renderer events through [`MapAdapter::handle_event`].
//! Listeners are always invoked after every internal borrow is released, so
//! a listener may call straight back into the adapter.

use crate::direct::DirectMap;
use crate::layer_sync::{LayerSync, SyncReport};
use crate::ports::{DrawEngine, LayerEngine, MapEngine};
use crate::target::{EngineEvent, RenderTarget};
use gw_core::{
    BBox, DrawMode, FeatureCollection, LayerId, Listeners, MapView, SerializedLayer, Subscription,
    ViewPatch, WorkspaceConfig,
};
use std::cell::RefCell;

pub struct MapAdapter<R: RenderTarget> {
    map: RefCell<DirectMap<R>>,
    layers: RefCell<LayerSync>,
    last_sync: RefCell<SyncReport>,
    view_listeners: Listeners<MapView>,
    draw_listeners: Listeners<FeatureCollection>,
}

impl<R: RenderTarget> MapAdapter<R> {
    pub fn new(id: impl Into<String>, config: &WorkspaceConfig) -> Self {
        Self {
            map: RefCell::new(DirectMap::new(id, config)),
            layers: RefCell::new(LayerSync::new(config.terrain_exaggeration)),
            last_sync: RefCell::new(SyncReport::default()),
            view_listeners: Listeners::new(),
            draw_listeners: Listeners::new(),
        }
    }

    /// An adapter that is mounted right away.
    pub fn mounted(id: impl Into<String>, config: &WorkspaceConfig, target: R) -> Self {
        let adapter = Self::new(id, config);
        adapter.mount(target);
        adapter
    }

    /// Attach a live target and push everything accumulated so far: layers,
    /// a pending view, the draw mode. Returns the previously mounted target.
    pub fn mount(&self, target: R) -> Option<R> {
        let (previous, view_changed, features) = {
            let mut map = self.map.borrow_mut();
            let before = map.view();
            let previous = map.mount(target);
            let after = map.view();
            (previous, (after != before).then_some(after), map.draw_features())
        };
        if let Some(view) = view_changed {
            self.view_listeners.emit(&view);
        }
        if !features.is_empty() {
            self.draw_listeners.emit(&features);
        }
        previous
    }

    pub fn unmount(&self) -> Option<R> {
        self.map.borrow_mut().unmount()
    }

    /// Deliver a renderer event.
    pub fn handle_event(&self, event: EngineEvent) {
        log::trace!("engine event {event:?}");
        match event {
            EngineEvent::MoveEnd | EngineEvent::StyleLoad => {
                let changed = self.map.borrow_mut().handle_event(event);
                if let Some(view) = changed {
                    self.view_listeners.emit(&view);
                }
            }
            EngineEvent::DrawChange | EngineEvent::DrawFinish => {
                let features = self.map.borrow().draw_features();
                self.draw_listeners.emit(&features);
            }
        }
    }

    /// Report of the most recent `sync`.
    pub fn last_sync(&self) -> SyncReport {
        self.last_sync.borrow().clone()
    }

    /// Read access to the mounted target.
    pub fn with_target<T>(&self, f: impl FnOnce(&R) -> T) -> Option<T> {
        self.map.borrow().target().map(f)
    }

    /// Write access to the mounted target, for hosts that drive the renderer
    /// directly (and for simulating gestures on a headless target).
    pub fn with_target_mut<T>(&self, f: impl FnOnce(&mut R) -> T) -> Option<T> {
        self.map.borrow_mut().target_mut().map(f)
    }

    fn fit(&self, bounds: BBox, padding: Option<f64>) {
        let changed = self.map.borrow_mut().fit_bounds(bounds, padding);
        if let Some(view) = changed {
            self.view_listeners.emit(&view);
        }
    }
}

impl<R: RenderTarget> MapEngine for MapAdapter<R> {
    fn is_ready(&self) -> bool {
        self.map.borrow().is_mounted()
    }

    fn get_view(&self) -> MapView {
        self.map.borrow().view()
    }

    fn set_view(&self, patch: &ViewPatch) {
        let (changed, mounted) = {
            let mut map = self.map.borrow_mut();
            let before = map.view();
            let after = map.set_view(patch);
            ((after != before).then_some(after), map.is_mounted())
        };
        match changed {
            Some(view) if mounted => self.view_listeners.emit(&view),
            Some(_) => log::debug!("set_view while unmounted, applied on mount"),
            None => {}
        }
    }

    fn on_view_change(&self, callback: Box<dyn Fn(&MapView)>) -> Subscription {
        self.view_listeners.add(callback)
    }

    fn fit_bounds(&self, bounds: BBox, padding: Option<f64>) {
        self.fit(bounds, padding);
    }
}

impl<R: RenderTarget> LayerEngine for MapAdapter<R> {
    fn sync(&self, layers: &[SerializedLayer]) {
        let report = {
            let mut map = self.map.borrow_mut();
            self.layers.borrow_mut().apply(&mut map, layers)
        };
        if !report.failures.is_empty() {
            log::warn!("sync finished with {} failed engine call(s)", report.failures.len());
        }
        *self.last_sync.borrow_mut() = report;
    }

    fn fit_to_layer(&self, id: LayerId) {
        let bbox = self.layers.borrow().bbox_of(id);
        match bbox {
            Some(bbox) => self.fit(bbox, None),
            None => log::warn!("fit_to_layer: no bounds known for layer '{id}'"),
        }
    }

    fn fit_to_bounds(&self, bbox: BBox) {
        self.fit(bbox, None);
    }
}

impl<R: RenderTarget> DrawEngine for MapAdapter<R> {
    fn set_mode(&self, mode: Option<DrawMode>) {
        self.map.borrow_mut().set_draw_mode(mode);
    }

    fn get_mode(&self) -> Option<DrawMode> {
        self.map.borrow().draw_mode()
    }

    fn on_change(&self, callback: Box<dyn Fn(&FeatureCollection)>) -> Subscription {
        self.draw_listeners.add(callback)
    }

    fn clear(&self) {
        let features = {
            let mut map = self.map.borrow_mut();
            map.clear_draw();
            map.draw_features()
        };
        self.draw_listeners.emit(&features);
    }

    fn get_features(&self) -> FeatureCollection {
        self.map.borrow().draw_features()
    }
}
