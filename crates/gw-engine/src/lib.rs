pub mod adapter;
pub mod direct;
pub mod expand;
pub mod headless;
pub mod layer_sync;
pub mod ports;
pub mod reconcile;
pub mod state;
pub mod target;
pub mod terrain;
pub mod viewport;

pub use adapter::MapAdapter;
pub use direct::DirectMap;
pub use headless::{HeadlessMap, TargetOp};
pub use layer_sync::{LayerSync, SyncReport};
pub use ports::{DrawEngine, Engine, LayerEngine, MapEngine};
pub use reconcile::{ReconcileReport, Reconciler, SyncFailure};
pub use state::StateManager;
pub use target::{EngineEvent, RenderTarget};
pub use viewport::ViewportManager;
