//! A map coupled directly to a render target.
//!
//! `DirectMap` bundles the source-centric [`StateManager`], the
//! [`ViewportManager`] and the [`Reconciler`]. State can be built before a
//! target exists; everything accumulated while unmounted is applied on
//! mount. Each successful mutation is pushed into the mounted target
//! immediately.

use crate::reconcile::{ReconcileReport, Reconciler};
use crate::state::StateManager;
use crate::target::{EngineEvent, RenderTarget};
use crate::viewport::ViewportManager;
use gw_core::{
    BBox, DrawMode, FeatureCollection, LayerId, MapView, SourceId, StateError, ViewPatch,
    WorkspaceConfig,
};

pub struct DirectMap<R: RenderTarget> {
    id: String,
    target: Option<R>,
    state: StateManager,
    viewport: ViewportManager,
    reconciler: Reconciler,
    fit_padding: f64,
    draw_mode: Option<DrawMode>,
    last_report: ReconcileReport,
}

impl<R: RenderTarget> DirectMap<R> {
    pub fn new(id: impl Into<String>, config: &WorkspaceConfig) -> Self {
        Self {
            id: id.into(),
            target: None,
            state: StateManager::new(),
            viewport: ViewportManager::new(config),
            reconciler: Reconciler::new(),
            fit_padding: config.fit_padding,
            draw_mode: None,
            last_report: ReconcileReport::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Attach a live target. Whatever the target already holds is adopted
    /// as base style; a view set while unmounted is pushed, otherwise the
    /// target's camera is adopted. A stored draw mode is re-applied.
    /// Returns the previously mounted target.
    pub fn mount(&mut self, mut target: R) -> Option<R> {
        let previous = self.unmount();
        self.import_from(&target);

        if self.viewport.is_dirty() {
            if let Err(e) = self.viewport.flush(&mut target) {
                log::error!("map '{}': pushing initial view failed: {e}", self.id);
            }
        } else {
            self.viewport.sync_from_target(&target);
        }
        self.last_report = self.reconciler.reconcile(&self.state, &mut target);
        if let Some(mode) = self.draw_mode
            && let Err(e) = target.set_draw_mode(Some(mode))
        {
            log::error!("map '{}': restoring draw mode failed: {e}", self.id);
        }
        log::info!(
            "map '{}' mounted ({} layer(s), {} engine call(s))",
            self.id,
            self.state.layer_count(),
            self.last_report.calls
        );
        self.target = Some(target);
        previous
    }

    /// Detach and return the target. State is kept.
    pub fn unmount(&mut self) -> Option<R> {
        let target = self.target.take();
        if target.is_some() {
            self.reconciler.reset();
            log::info!("map '{}' unmounted", self.id);
        }
        target
    }

    pub fn is_mounted(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<&R> {
        self.target.as_ref()
    }

    pub fn target_mut(&mut self) -> Option<&mut R> {
        self.target.as_mut()
    }

    // ─── State ───────────────────────────────────────────────────────────

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Run a state mutation and, if it succeeds, reconcile the target.
    ///
    /// # Errors
    /// Whatever `f` returns. State changes made before the error stay, and
    /// are pushed by the next successful mutation.
    pub fn mutate<T, E>(
        &mut self,
        f: impl FnOnce(&mut StateManager) -> Result<T, E>,
    ) -> Result<T, E> {
        let out = f(&mut self.state)?;
        self.reconcile();
        Ok(out)
    }

    /// Remove a source and every layer drawing it. While mounted, the
    /// target's current style is imported first, so entries the host added
    /// behind this map's back are cascaded too; base entries removed this
    /// way are also taken out of the target.
    ///
    /// # Errors
    /// [`StateError::UnknownSource`] if neither state nor target knows it.
    pub fn remove_source_cascade(&mut self, id: SourceId) -> Result<Vec<LayerId>, StateError> {
        if let Some(target) = self.target.take() {
            self.import_from(&target);
            self.target = Some(target);
        }
        let base_layers: Vec<LayerId> = self
            .state
            .layers_using(id)
            .into_iter()
            .filter(|l| self.state.layer(*l).is_some_and(|l| l.is_base_layer))
            .collect();
        let base_source = self.state.source(id).is_some_and(|s| s.is_base_layer);

        let removed = self.mutate(|s| s.remove_source_cascade(id))?;
        if let Some(target) = self.target.as_mut() {
            for layer in base_layers {
                if let Err(e) = target.remove_layer(layer) {
                    log::error!("map '{}': {e}", self.id);
                }
            }
            if base_source && let Err(e) = target.remove_source(id) {
                log::error!("map '{}': {e}", self.id);
            }
        }
        Ok(removed)
    }

    /// Adopt the target's current style as base entries.
    fn import_from(&mut self, target: &R) {
        let snapshot = target.snapshot();
        self.state.import_base(snapshot.clone());
        self.reconciler.adopt(&self.state, &snapshot);
    }

    /// Push pending state into the target. A no-op while unmounted.
    pub fn reconcile(&mut self) -> &ReconcileReport {
        self.last_report = match self.target.as_mut() {
            Some(target) => self.reconciler.reconcile(&self.state, target),
            None => ReconcileReport::default(),
        };
        &self.last_report
    }

    pub fn last_report(&self) -> &ReconcileReport {
        &self.last_report
    }

    // ─── View ────────────────────────────────────────────────────────────

    pub fn view(&self) -> MapView {
        self.viewport.view()
    }

    /// Apply a partial view and push it. Returns the clamped result.
    pub fn set_view(&mut self, patch: &ViewPatch) -> MapView {
        let view = self.viewport.apply(patch);
        if let Some(target) = self.target.as_mut()
            && let Err(e) = self.viewport.flush(target)
        {
            log::error!("map '{}': jump_to failed: {e}", self.id);
        }
        view
    }

    /// Fit the camera to `bounds`. Returns the new view if the camera moved.
    pub fn fit_bounds(&mut self, bounds: BBox, padding: Option<f64>) -> Option<MapView> {
        let padding = padding.unwrap_or(self.fit_padding);
        let Some(target) = self.target.as_mut() else {
            log::debug!("map '{}': fit_bounds while unmounted ignored", self.id);
            return None;
        };
        match self.viewport.fit_bounds(target, &bounds, padding) {
            Ok(view) => view,
            Err(e) => {
                log::error!("map '{}': fit_bounds failed: {e}", self.id);
                None
            }
        }
    }

    // ─── Draw ────────────────────────────────────────────────────────────

    /// Select the draw mode. Kept across unmount and applied on mount.
    pub fn set_draw_mode(&mut self, mode: Option<DrawMode>) {
        self.draw_mode = mode;
        let Some(target) = self.target.as_mut() else {
            log::debug!("map '{}': draw mode stored until mount", self.id);
            return;
        };
        if let Err(e) = target.set_draw_mode(mode) {
            log::error!("map '{}': set_draw_mode failed: {e}", self.id);
        }
    }

    pub fn draw_mode(&self) -> Option<DrawMode> {
        self.draw_mode
    }

    pub fn draw_features(&self) -> FeatureCollection {
        self.target
            .as_ref()
            .map(RenderTarget::draw_features)
            .unwrap_or_default()
    }

    pub fn clear_draw(&mut self) {
        if let Some(target) = self.target.as_mut()
            && let Err(e) = target.clear_draw()
        {
            log::error!("map '{}': clear_draw failed: {e}", self.id);
        }
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// React to an engine event. Returns the new view when the camera moved.
    pub fn handle_event(&mut self, event: EngineEvent) -> Option<MapView> {
        let target = self.target.as_mut()?;
        match event {
            EngineEvent::MoveEnd => self.viewport.sync_from_target(target),
            EngineEvent::StyleLoad => {
                // The style swap dropped every managed entry; re-adopt the
                // new base and push everything again.
                self.reconciler.reset();
                let snapshot = target.snapshot();
                self.state.import_base(snapshot.clone());
                self.reconciler.adopt(&self.state, &snapshot);
                self.last_report = self.reconciler.reconcile(&self.state, target);
                log::info!(
                    "map '{}': style reloaded, {} engine call(s) to restore",
                    self.id,
                    self.last_report.calls
                );
                None
            }
            EngineEvent::DrawChange | EngineEvent::DrawFinish => None,
        }
    }
}

impl<R: RenderTarget> std::fmt::Debug for DirectMap<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectMap")
            .field("id", &self.id)
            .field("mounted", &self.is_mounted())
            .field("layers", &self.state.layer_count())
            .field("view", &self.viewport.view())
            .finish()
    }
}
