//! Source-centric style state: sources, render layers, their order, and
//! terrain, kept as pure data.
//!
//! Invariants upheld by every method:
//! - each layer's `source_id` names a source in `sources`;
//! - `layer_order` lists every key of `layers` exactly once (bottom to top);
//! - `terrain`, when set, names a raster-dem source.
//!
//! The [`Reconciler`](crate::reconcile::Reconciler) pushes this state into a
//! live render target.

use gw_core::{
    LayerId, LayerPatch, MapLayer, MapSource, PropertyMap, SourceId, StateError, StyleSnapshot,
    Terrain,
};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct StateManager {
    sources: HashMap<SourceId, MapSource>,
    layers: HashMap<LayerId, MapLayer>,
    layer_order: Vec<LayerId>,
    terrain: Option<Terrain>,
}

impl StateManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Sources ─────────────────────────────────────────────────────────

    /// Register a source. A duplicate id replaces the existing source.
    pub fn add_source(&mut self, source: MapSource) {
        if self.sources.contains_key(&source.id) {
            log::warn!("source '{}' already exists, replacing it", source.id);
        }
        self.set_source(source);
    }

    /// Insert or replace a source without the duplicate warning.
    pub fn set_source(&mut self, source: MapSource) {
        if let Some(terrain) = self.terrain
            && terrain.source == source.id
            && !source.kind.is_dem()
        {
            log::warn!("source '{}' is no longer raster-dem, clearing terrain", source.id);
            self.terrain = None;
        }
        self.sources.insert(source.id, source);
    }

    /// Remove a source that no layer references.
    ///
    /// # Errors
    /// [`StateError::SourceInUse`] naming every dependent layer.
    pub fn remove_source(&mut self, id: SourceId) -> Result<Option<MapSource>, StateError> {
        let dependents = self.layers_using(id);
        if !dependents.is_empty() {
            return Err(StateError::SourceInUse {
                source_id: id,
                layers: dependents,
            });
        }
        let removed = self.sources.remove(&id);
        if removed.is_none() {
            log::warn!("remove_source: unknown source '{id}'");
        }
        if self.terrain.is_some_and(|t| t.source == id) {
            self.terrain = None;
        }
        Ok(removed)
    }

    /// Remove a source together with every layer drawing it. Returns the
    /// removed layer ids.
    ///
    /// # Errors
    /// [`StateError::UnknownSource`] if the source does not exist.
    pub fn remove_source_cascade(&mut self, id: SourceId) -> Result<Vec<LayerId>, StateError> {
        if !self.sources.contains_key(&id) {
            return Err(StateError::UnknownSource(id));
        }
        let dependents = self.layers_using(id);
        for layer in &dependents {
            self.layers.remove(layer);
        }
        self.layer_order.retain(|l| !dependents.contains(l));
        self.sources.remove(&id);
        if self.terrain.is_some_and(|t| t.source == id) {
            self.terrain = None;
        }
        Ok(dependents)
    }

    /// Layers drawing `source`, in render order.
    pub fn layers_using(&self, source: SourceId) -> Vec<LayerId> {
        self.layer_order
            .iter()
            .copied()
            .filter(|id| self.layers.get(id).and_then(|l| l.source_id) == Some(source))
            .collect()
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    /// Add a layer below `before`, or on top. A duplicate id updates the
    /// existing layer in place and keeps its position.
    ///
    /// # Errors
    /// [`StateError::MissingSource`] if the layer's source is not registered.
    pub fn add_layer(&mut self, layer: MapLayer, before: Option<LayerId>) -> Result<(), StateError> {
        self.check_source(&layer)?;
        if self.layers.contains_key(&layer.id) {
            log::warn!("layer '{}' already exists, updating it in place", layer.id);
            self.layers.insert(layer.id, layer);
            return Ok(());
        }
        let at = self.insert_index(before);
        self.layer_order.insert(at, layer.id);
        self.layers.insert(layer.id, layer);
        Ok(())
    }

    /// Insert or replace a layer without warnings. New layers go on top.
    ///
    /// # Errors
    /// [`StateError::MissingSource`] if the layer's source is not registered.
    pub fn set_layer(&mut self, layer: MapLayer) -> Result<(), StateError> {
        self.check_source(&layer)?;
        if !self.layers.contains_key(&layer.id) {
            self.layer_order.push(layer.id);
        }
        self.layers.insert(layer.id, layer);
        Ok(())
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Option<MapLayer> {
        let removed = self.layers.remove(&id);
        match removed {
            Some(_) => self.layer_order.retain(|l| *l != id),
            None => log::warn!("remove_layer: unknown layer '{id}'"),
        }
        removed
    }

    /// Merge `patch` into a layer per key. A `null` value removes the key.
    ///
    /// # Errors
    /// [`StateError::UnknownLayer`] if the layer does not exist.
    pub fn update_layer(&mut self, id: LayerId, patch: LayerPatch) -> Result<(), StateError> {
        let layer = self.layers.get_mut(&id).ok_or(StateError::UnknownLayer(id))?;
        merge_properties(&mut layer.paint, patch.paint);
        merge_properties(&mut layer.layout, patch.layout);
        merge_properties(&mut layer.metadata, patch.metadata);
        Ok(())
    }

    /// Replace the layer order. `order` must list every layer exactly once.
    ///
    /// # Errors
    /// A `Reorder*` variant of [`StateError`] describing the mismatch.
    pub fn reorder_layers(&mut self, order: Vec<LayerId>) -> Result<(), StateError> {
        if order.len() != self.layers.len() {
            return Err(StateError::ReorderLength {
                expected: self.layers.len(),
                actual: order.len(),
            });
        }
        let mut seen = HashSet::with_capacity(order.len());
        for id in &order {
            if !self.layers.contains_key(id) {
                return Err(StateError::ReorderUnknown(*id));
            }
            if !seen.insert(*id) {
                return Err(StateError::ReorderDuplicate(*id));
            }
        }
        self.layer_order = order;
        Ok(())
    }

    /// Move one layer below `before`, or to the top.
    ///
    /// # Errors
    /// [`StateError::UnknownLayer`] if `id` does not exist.
    pub fn move_layer(&mut self, id: LayerId, before: Option<LayerId>) -> Result<(), StateError> {
        if !self.layers.contains_key(&id) {
            return Err(StateError::UnknownLayer(id));
        }
        if before == Some(id) {
            return Ok(());
        }
        self.layer_order.retain(|l| *l != id);
        let at = self.insert_index(before);
        self.layer_order.insert(at, id);
        Ok(())
    }

    // ─── Terrain ─────────────────────────────────────────────────────────

    /// Set or clear the terrain source.
    ///
    /// # Errors
    /// [`StateError::UnknownSource`] or [`StateError::NotElevation`].
    pub fn set_terrain(&mut self, terrain: Option<Terrain>) -> Result<(), StateError> {
        if let Some(t) = terrain {
            let source = self
                .sources
                .get(&t.source)
                .ok_or(StateError::UnknownSource(t.source))?;
            if !source.kind.is_dem() {
                return Err(StateError::NotElevation(t.source));
            }
        }
        self.terrain = terrain;
        Ok(())
    }

    pub fn terrain(&self) -> Option<Terrain> {
        self.terrain
    }

    // ─── Base style ──────────────────────────────────────────────────────

    /// Adopt everything already present in a render target as base layers.
    /// Base entries sit below managed layers and are never re-created or
    /// removed by reconciliation. Previously imported base entries that are
    /// gone from the snapshot are dropped.
    pub fn import_base(&mut self, snapshot: StyleSnapshot) {
        let stale: Vec<LayerId> = self
            .layer_order
            .iter()
            .copied()
            .filter(|id| self.layers.get(id).is_some_and(|l| l.is_base_layer))
            .collect();
        for id in stale {
            self.layers.remove(&id);
        }
        self.layer_order.retain(|id| self.layers.contains_key(id));
        self.sources.retain(|_, s| !s.is_base_layer);

        for mut source in snapshot.sources {
            if self.sources.contains_key(&source.id) {
                // A managed source the target still holds from a previous mount.
                continue;
            }
            source.is_base_layer = true;
            self.sources.insert(source.id, source);
        }
        let mut base_order = Vec::new();
        for mut layer in snapshot.layers {
            if self.layers.contains_key(&layer.id) {
                continue;
            }
            layer.is_base_layer = true;
            base_order.push(layer.id);
            self.layers.insert(layer.id, layer);
        }
        base_order.append(&mut self.layer_order);
        self.layer_order = base_order;
        log::debug!(
            "imported base style: {} source(s), {} layer(s)",
            self.sources.values().filter(|s| s.is_base_layer).count(),
            self.layers.values().filter(|l| l.is_base_layer).count()
        );
    }

    /// Drop every managed (non-base) source and layer and the terrain.
    pub fn clear_managed(&mut self) {
        self.layers.retain(|_, l| l.is_base_layer);
        self.layer_order.retain(|id| self.layers.contains_key(id));
        self.sources.retain(|_, s| s.is_base_layer);
        self.terrain = None;
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn source(&self, id: SourceId) -> Option<&MapSource> {
        self.sources.get(&id)
    }

    pub fn layer(&self, id: LayerId) -> Option<&MapLayer> {
        self.layers.get(&id)
    }

    pub fn sources(&self) -> impl Iterator<Item = &MapSource> {
        self.sources.values()
    }

    /// Layers in render order, bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = &MapLayer> {
        self.layer_order.iter().filter_map(|id| self.layers.get(id))
    }

    pub fn layer_order(&self) -> &[LayerId] {
        &self.layer_order
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn check_source(&self, layer: &MapLayer) -> Result<(), StateError> {
        match layer.source_id {
            Some(src) if !self.sources.contains_key(&src) => Err(StateError::MissingSource {
                layer: layer.id,
                source_id: src,
            }),
            _ => Ok(()),
        }
    }

    fn insert_index(&self, before: Option<LayerId>) -> usize {
        match before {
            Some(b) => match self.layer_order.iter().position(|l| *l == b) {
                Some(i) => i,
                None => {
                    log::warn!("before-layer '{b}' not found, appending on top");
                    self.layer_order.len()
                }
            },
            None => self.layer_order.len(),
        }
    }
}

fn merge_properties(into: &mut PropertyMap, patch: PropertyMap) {
    for (key, value) in patch {
        if value.is_null() {
            into.remove(&key);
        } else {
            into.insert(key, value);
        }
    }
}
