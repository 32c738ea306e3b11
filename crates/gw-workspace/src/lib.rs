pub mod draw_store;
pub mod layer_store;
pub mod manager;
pub mod map_store;
pub mod tool_store;
pub mod workspace;

pub use draw_store::DrawStore;
pub use layer_store::LayerStore;
pub use manager::{ManagedWorkspace, WorkspaceManager};
pub use map_store::MapStore;
pub use tool_store::ToolStore;
pub use workspace::WorkspaceStore;
