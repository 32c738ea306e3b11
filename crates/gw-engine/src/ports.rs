//! Engine capability ports.
//!
//! Three independent contracts a concrete rendering engine implements. The
//! workspace stores depend only on these traits, never on a renderer.
//!
//! Calls on an engine that is not mounted yet are no-ops: they must not
//! panic, and callers may invoke them before `is_ready()` turns true.
//! Methods take `&self`; engines keep their mutable parts behind interior
//! mutability so that callbacks fired during a call can re-enter the engine.

use gw_core::{
    BBox, DrawMode, FeatureCollection, LayerId, MapView, SerializedLayer, Subscription, ViewPatch,
};

/// View control.
pub trait MapEngine {
    /// Whether a live renderer is attached.
    fn is_ready(&self) -> bool;

    fn get_view(&self) -> MapView;

    /// Apply a view change immediately (no animation).
    fn set_view(&self, patch: &ViewPatch);

    /// Fires on every committed view change: at gesture end and after a
    /// programmatic `set_view`, never per animation frame.
    fn on_view_change(&self, callback: Box<dyn Fn(&MapView)>) -> Subscription;

    fn fit_bounds(&self, bounds: BBox, padding: Option<f64>);
}

/// Layer synchronization.
pub trait LayerEngine {
    /// Make the rendered layers match `layers` (sorted by `order`).
    /// Idempotent: a second call with identical input mutates nothing.
    fn sync(&self, layers: &[SerializedLayer]);

    fn fit_to_layer(&self, id: LayerId);

    fn fit_to_bounds(&self, bbox: BBox);
}

/// Draw tool control.
pub trait DrawEngine {
    fn set_mode(&self, mode: Option<DrawMode>);

    fn get_mode(&self) -> Option<DrawMode>;

    /// Fires on every geometry mutation, including in-progress edits.
    fn on_change(&self, callback: Box<dyn Fn(&FeatureCollection)>) -> Subscription;

    fn clear(&self);

    fn get_features(&self) -> FeatureCollection;
}

/// An engine providing all three capabilities.
pub trait Engine: MapEngine + LayerEngine + DrawEngine {}

impl<T: MapEngine + LayerEngine + DrawEngine + ?Sized> Engine for T {}
