//! One workspace: the four stores plus the engine they are bound to.
//!
//! The workspace owns its engine. Stores only hold weak handles, so after
//! `unbind` drops every subscription the engine can be handed back to the
//! caller intact.

use crate::draw_store::DrawStore;
use crate::layer_store::LayerStore;
use crate::map_store::MapStore;
use crate::tool_store::ToolStore;
use gw_core::WorkspaceConfig;
use gw_engine::Engine;
use std::rc::Rc;

pub struct WorkspaceStore<E: Engine + 'static> {
    id: String,
    pub map: MapStore,
    pub layers: LayerStore,
    pub tools: ToolStore,
    pub draw: DrawStore,
    engine: Option<Rc<E>>,
}

impl<E: Engine + 'static> WorkspaceStore<E> {
    pub fn new(id: impl Into<String>, config: &WorkspaceConfig) -> Self {
        Self {
            id: id.into(),
            map: MapStore::new(config),
            layers: LayerStore::new(),
            tools: ToolStore::new(),
            draw: DrawStore::new(),
            engine: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Bind every store to `engine`, which the workspace takes ownership of.
    /// A previously bound engine is unbound first and returned.
    pub fn bind(&mut self, engine: E) -> Option<E> {
        let previous = self.unbind();
        let engine = Rc::new(engine);
        self.map.bind(&engine);
        self.layers.bind(&engine);
        self.tools.bind(&engine);
        self.draw.bind(&engine);
        self.engine = Some(engine);
        log::info!("workspace '{}' bound", self.id);
        previous
    }

    /// Drop every store subscription, then release the engine.
    pub fn unbind(&mut self) -> Option<E> {
        self.map.destroy();
        self.layers.destroy();
        self.tools.destroy();
        self.draw.destroy();
        let engine = self.engine.take()?;
        log::info!("workspace '{}' unbound", self.id);
        match Rc::try_unwrap(engine) {
            Ok(engine) => Some(engine),
            Err(_) => {
                log::error!("workspace '{}': engine still shared after unbind, dropping handle", self.id);
                None
            }
        }
    }

    pub fn is_bound(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_deref()
    }
}

impl<E: Engine + 'static> Drop for WorkspaceStore<E> {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl<E: Engine + 'static> std::fmt::Debug for WorkspaceStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceStore")
            .field("id", &self.id)
            .field("bound", &self.is_bound())
            .field("layers", &self.layers.len())
            .field("active_tool", &self.tools.active_tool())
            .finish()
    }
}
