//! Viewport state of a directly coupled map.
//!
//! The view is kept as data. Programmatic changes mark it dirty and are
//! pushed on the next `flush`; camera changes read back from the target
//! clear the flag, so a view that came from the engine is never pushed back
//! into it.

use crate::target::RenderTarget;
use gw_core::{BBox, EngineError, MapView, ViewConstraints, ViewPatch, WorkspaceConfig};

#[derive(Debug, Clone)]
pub struct ViewportManager {
    view: MapView,
    constraints: ViewConstraints,
    dirty: bool,
}

impl ViewportManager {
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            view: config.start_view(),
            constraints: config.constraints,
            dirty: false,
        }
    }

    pub fn view(&self) -> MapView {
        self.view
    }

    pub fn constraints(&self) -> ViewConstraints {
        self.constraints
    }

    /// Whether a programmatic change is waiting to be pushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Merge and clamp a partial view. Returns the resulting view.
    pub fn apply(&mut self, patch: &ViewPatch) -> MapView {
        let next = self.constraints.clamp(self.view.merged(patch));
        if next != self.view {
            self.view = next;
            self.dirty = true;
        }
        self.view
    }

    /// Push a pending change into the target.
    ///
    /// # Errors
    /// The target's rejection; the change stays pending.
    pub fn flush<R: RenderTarget + ?Sized>(&mut self, target: &mut R) -> Result<bool, EngineError> {
        if !self.dirty {
            return Ok(false);
        }
        target.jump_to(&self.view)?;
        self.dirty = false;
        Ok(true)
    }

    /// Adopt the target's camera. Returns the new view if it differs from
    /// the current one.
    pub fn sync_from_target<R: RenderTarget + ?Sized>(&mut self, target: &R) -> Option<MapView> {
        self.dirty = false;
        let camera = self.constraints.clamp(target.camera());
        if camera == self.view {
            return None;
        }
        log::trace!("view from engine: {camera:?}");
        self.view = camera;
        Some(camera)
    }

    /// Fit the target's camera to `bounds`, then read the result back.
    ///
    /// # Errors
    /// The target's rejection.
    pub fn fit_bounds<R: RenderTarget + ?Sized>(
        &mut self,
        target: &mut R,
        bounds: &BBox,
        padding: f64,
    ) -> Result<Option<MapView>, EngineError> {
        target.fit_bounds(bounds, padding)?;
        Ok(self.sync_from_target(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessMap, TargetOp};
    use pretty_assertions::assert_eq;

    #[test]
    fn apply_clamps_and_marks_dirty() {
        let mut vp = ViewportManager::new(&WorkspaceConfig::default());
        let view = vp.apply(&ViewPatch::zoom(25.0));
        assert_eq!(view.zoom, 22.0);
        assert!(vp.is_dirty());

        let mut map = HeadlessMap::new();
        assert_eq!(vp.flush(&mut map), Ok(true));
        assert_eq!(vp.flush(&mut map), Ok(false));
        assert_eq!(map.journal().len(), 1);
    }

    #[test]
    fn engine_view_is_not_pushed_back() {
        let mut vp = ViewportManager::new(&WorkspaceConfig::default());
        let mut map = HeadlessMap::new();
        let panned = MapView {
            center: [5.0, 45.0],
            zoom: 9.0,
            ..MapView::default()
        };
        map.simulate_camera(panned);
        assert_eq!(vp.sync_from_target(&map), Some(panned));
        assert_eq!(vp.flush(&mut map), Ok(false));
        assert!(!map.journal().iter().any(|op| matches!(op, TargetOp::JumpTo(_))));
    }

    #[test]
    fn unchanged_patch_stays_clean() {
        let mut vp = ViewportManager::new(&WorkspaceConfig::default());
        let current = vp.view();
        vp.apply(&ViewPatch::from(current));
        assert!(!vp.is_dirty());
    }
}
