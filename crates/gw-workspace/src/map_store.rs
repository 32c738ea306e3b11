//! Viewport store.
//!
//! Holds the observable `MapView` of one workspace and keeps it in sync with
//! a bound [`MapEngine`] in both directions:
//!
//! - engine → store: the engine's view-change listener writes the view with
//!   the `updating_from_engine` guard raised;
//! - store → engine: a watcher on the view pushes it through `set_view`,
//!   unless the guard is raised.
//!
//! The guard is what stops a user pan from bouncing back into the engine.

use gw_core::{
    BBox, MapView, Observable, ReentrancyGuard, Subscription, ViewConstraints, ViewPatch,
    WorkspaceConfig,
};
use gw_engine::MapEngine;
use std::rc::{Rc, Weak};

pub struct MapStore {
    view: Observable<MapView>,
    constraints: ViewConstraints,
    updating_from_engine: ReentrancyGuard,
    bindings: Vec<Subscription>,
    engine: Option<Weak<dyn MapEngine>>,
}

impl MapStore {
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            view: Observable::new(config.start_view()),
            constraints: config.constraints,
            updating_from_engine: ReentrancyGuard::new(),
            bindings: Vec::new(),
            engine: None,
        }
    }

    // ─── Binding ─────────────────────────────────────────────────────────

    /// Bind to an engine. Any previous binding is destroyed first. The
    /// store adopts the engine's current view.
    pub fn bind<E: MapEngine + 'static>(&mut self, engine: &Rc<E>) {
        self.destroy();
        let constraints = self.constraints;

        {
            let _scope = self.updating_from_engine.enter();
            self.view.set(constraints.clamp(engine.get_view()));
        }

        let view = self.view.clone();
        let guard = self.updating_from_engine.clone();
        let from_engine = engine.on_view_change(Box::new(move |engine_view: &MapView| {
            let _scope = guard.enter();
            view.set(constraints.clamp(*engine_view));
        }));

        let shared: Rc<dyn MapEngine> = engine.clone();
        let weak = Rc::downgrade(&shared);
        let guard = self.updating_from_engine.clone();
        let to_engine = self.view.subscribe(move |view: &MapView| {
            if guard.is_active() {
                return;
            }
            if let Some(engine) = weak.upgrade() {
                engine.set_view(&ViewPatch::from(*view));
            }
        });

        self.bindings = vec![from_engine, to_engine];
        self.engine = Some(Rc::downgrade(&shared));
    }

    /// Remove both sync directions and forget the engine.
    pub fn destroy(&mut self) {
        self.bindings.clear();
        self.engine = None;
    }

    pub fn is_bound(&self) -> bool {
        self.engine.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    // ─── View ────────────────────────────────────────────────────────────

    pub fn view(&self) -> MapView {
        self.view.get()
    }

    pub fn constraints(&self) -> ViewConstraints {
        self.constraints
    }

    /// Merge a partial view, clamp it, and push it to the engine.
    pub fn set_view(&self, patch: &ViewPatch) {
        let constraints = self.constraints;
        self.view.update(|view| *view = constraints.clamp(view.merged(patch)));
    }

    pub fn set_center(&self, center: [f64; 2]) {
        self.set_view(&ViewPatch::center(center));
    }

    pub fn set_zoom(&self, zoom: f64) {
        self.set_view(&ViewPatch::zoom(zoom));
    }

    /// Ask the engine to fit `bounds`. The resulting view comes back through
    /// the engine listener. A no-op when unbound.
    pub fn fit_bounds(&self, bounds: BBox, padding: Option<f64>) {
        match self.engine.as_ref().and_then(Weak::upgrade) {
            Some(engine) => engine.fit_bounds(bounds, padding),
            None => log::debug!("fit_bounds on an unbound map store ignored"),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&MapView) + 'static) -> Subscription {
        self.view.subscribe(listener)
    }
}
