//! Registry of named workspaces.
//!
//! The registry is a plain value created once by the application and passed
//! around explicitly. It is generic over [`ManagedWorkspace`], so the same
//! registry manages port-based [`WorkspaceStore`]s or directly coupled
//! [`DirectMap`]s.

use crate::workspace::WorkspaceStore;
use gw_core::WorkspaceConfig;
use gw_engine::{DirectMap, Engine, RenderTarget};
use std::collections::BTreeMap;

/// Something the workspace manager can create and close.
pub trait ManagedWorkspace {
    fn open(id: &str, config: &WorkspaceConfig) -> Self;

    fn id(&self) -> &str;

    /// Release the engine. Called before the workspace is dropped.
    fn release(&mut self);
}

impl<E: Engine + 'static> ManagedWorkspace for WorkspaceStore<E> {
    fn open(id: &str, config: &WorkspaceConfig) -> Self {
        WorkspaceStore::new(id, config)
    }

    fn id(&self) -> &str {
        WorkspaceStore::id(self)
    }

    fn release(&mut self) {
        self.unbind();
    }
}

impl<R: RenderTarget> ManagedWorkspace for DirectMap<R> {
    fn open(id: &str, config: &WorkspaceConfig) -> Self {
        DirectMap::new(id, config)
    }

    fn id(&self) -> &str {
        DirectMap::id(self)
    }

    fn release(&mut self) {
        self.unmount();
    }
}

#[derive(Debug)]
pub struct WorkspaceManager<W: ManagedWorkspace> {
    workspaces: BTreeMap<String, W>,
    active: Option<String>,
    config: WorkspaceConfig,
}

impl<W: ManagedWorkspace> WorkspaceManager<W> {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self {
            workspaces: BTreeMap::new(),
            active: None,
            config,
        }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Create a workspace. An existing workspace with the same id is kept
    /// and returned. The first workspace becomes active.
    pub fn create_workspace(&mut self, id: &str) -> &mut W {
        if self.workspaces.contains_key(id) {
            log::warn!("workspace '{id}' already exists");
        }
        self.get_or_create_workspace(id)
    }

    pub fn get_or_create_workspace(&mut self, id: &str) -> &mut W {
        if self.active.is_none() {
            self.active = Some(id.to_string());
        }
        let config = &self.config;
        self.workspaces.entry(id.to_string()).or_insert_with(|| {
            log::debug!("workspace '{id}' created");
            W::open(id, config)
        })
    }

    pub fn get(&self, id: &str) -> Option<&W> {
        self.workspaces.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut W> {
        self.workspaces.get_mut(id)
    }

    /// Release the workspace's engine, then remove it. Returns whether the
    /// workspace existed.
    pub fn close_workspace(&mut self, id: &str) -> bool {
        let Some(mut workspace) = self.workspaces.remove(id) else {
            log::warn!("close_workspace: unknown workspace '{id}'");
            return false;
        };
        workspace.release();
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
        log::debug!("workspace '{id}' closed");
        true
    }

    pub fn close_all(&mut self) {
        for (_, mut workspace) in std::mem::take(&mut self.workspaces) {
            workspace.release();
        }
        self.active = None;
    }

    pub fn set_active(&mut self, id: &str) -> bool {
        if !self.workspaces.contains_key(id) {
            log::warn!("set_active: unknown workspace '{id}'");
            return false;
        }
        self.active = Some(id.to_string());
        true
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_workspace(&self) -> Option<&W> {
        self.workspaces.get(self.active.as_deref()?)
    }

    pub fn active_workspace_mut(&mut self) -> Option<&mut W> {
        let id = self.active.as_deref()?;
        self.workspaces.get_mut(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.workspaces.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }
}

impl<W: ManagedWorkspace> Drop for WorkspaceManager<W> {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_engine::HeadlessMap;

    type DirectManager = WorkspaceManager<DirectMap<HeadlessMap>>;

    #[test]
    fn first_workspace_becomes_active() {
        let mut manager = DirectManager::new(WorkspaceConfig::default());
        manager.create_workspace("a");
        manager.create_workspace("b");
        assert_eq!(manager.active_id(), Some("a"));
        assert!(manager.set_active("b"));
        assert!(!manager.set_active("zzz"));
        assert_eq!(manager.ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn close_releases_engine_and_clears_active() {
        let mut manager = DirectManager::new(WorkspaceConfig::default());
        manager.create_workspace("main").mount(HeadlessMap::new());
        assert!(manager.get("main").is_some_and(DirectMap::is_mounted));

        assert!(manager.close_workspace("main"));
        assert!(manager.active_workspace().is_none());
        assert!(manager.is_empty());
        assert!(!manager.close_workspace("main"));
    }
}
