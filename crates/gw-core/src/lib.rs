pub mod config;
pub mod draw;
pub mod error;
pub mod geo;
pub mod id;
pub mod layer;
pub mod observe;
pub mod source;
pub mod view;

pub use config::WorkspaceConfig;
pub use draw::{DrawMode, FeatureCollection};
pub use error::{ConfigError, EngineError, StateError};
pub use id::{LayerId, SourceId};
pub use layer::{
    DemEncoding, LayerKind, LayerModel, LayerStyle, RasterKind, SerializedLayer, SourcePayload,
};
pub use observe::{Listeners, Observable, ReentrancyGuard, Subscription};
pub use source::{
    LayerPatch, MapLayer, MapSource, PropertyMap, RenderKind, SourceKind, StyleSnapshot, Terrain,
};
pub use view::{BBox, MapView, ViewConstraints, ViewPatch};
