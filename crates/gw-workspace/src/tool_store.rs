//! Active draw tool. At most one tool is active per workspace; activating a
//! tool replaces the previous one.

use gw_core::{DrawMode, Observable, Subscription};
use gw_engine::DrawEngine;
use std::rc::Rc;

pub struct ToolStore {
    active: Observable<Option<DrawMode>>,
    bindings: Vec<Subscription>,
}

impl Default for ToolStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolStore {
    pub fn new() -> Self {
        Self {
            active: Observable::new(None),
            bindings: Vec::new(),
        }
    }

    /// Bind to an engine. The engine's mode is set to the active tool right
    /// away, then on every change.
    pub fn bind<E: DrawEngine + 'static>(&mut self, engine: &Rc<E>) {
        self.destroy();
        let shared: Rc<dyn DrawEngine> = engine.clone();
        let weak = Rc::downgrade(&shared);
        let push = self.active.subscribe_immediate(move |mode: &Option<DrawMode>| {
            if let Some(engine) = weak.upgrade() {
                engine.set_mode(*mode);
            }
        });
        self.bindings = vec![push];
    }

    pub fn destroy(&mut self) {
        self.bindings.clear();
    }

    pub fn active_tool(&self) -> Option<DrawMode> {
        self.active.get()
    }

    pub fn set_tool(&self, mode: Option<DrawMode>) {
        self.active.set(mode);
    }

    /// Deactivate `mode` if it is active, otherwise activate it.
    pub fn toggle_tool(&self, mode: DrawMode) {
        self.active
            .update(|active| *active = if *active == Some(mode) { None } else { Some(mode) });
    }

    pub fn clear_tool(&self) {
        self.set_tool(None);
    }

    pub fn subscribe(&self, listener: impl Fn(&Option<DrawMode>) + 'static) -> Subscription {
        self.active.subscribe(listener)
    }
}
