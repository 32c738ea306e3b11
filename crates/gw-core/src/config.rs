//! Workspace configuration.
//!
//! Constructed once at application start (usually from JSON handed over by
//! the host page) and passed by reference to the workspace manager, which
//! hands it to every store and adapter it creates.

use crate::error::ConfigError;
use crate::view::{MapView, ViewConstraints};
use serde::{Deserialize, Serialize};

/// Configuration for one workspace manager and the workspaces it creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Zoom and pitch limits applied to every view.
    pub constraints: ViewConstraints,

    /// View of a freshly created workspace, before any engine is bound.
    pub initial_view: MapView,

    /// Padding in pixels used by `fit_to_layer` / `fit_to_bounds`.
    /// Default: **40**.
    pub fit_padding: f64,

    /// Vertical exaggeration of the active terrain source. Default: **1.0**.
    pub terrain_exaggeration: f64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            constraints: ViewConstraints::default(),
            initial_view: MapView::default(),
            fit_padding: 40.0,
            terrain_exaggeration: 1.0,
        }
    }
}

impl WorkspaceConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` if the JSON is malformed or the zoom range is
    /// inverted.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: WorkspaceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.constraints;
        if !(c.min_zoom.is_finite() && c.max_zoom.is_finite()) || c.min_zoom > c.max_zoom {
            return Err(ConfigError::Invalid(format!(
                "zoom range [{}, {}] is empty",
                c.min_zoom, c.max_zoom
            )));
        }
        if !c.max_pitch.is_finite() || c.max_pitch < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max pitch {} must be >= 0",
                c.max_pitch
            )));
        }
        Ok(())
    }

    /// The initial view after constraint normalization.
    pub fn start_view(&self) -> MapView {
        self.constraints.clamp(self.initial_view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_is_default() {
        let config = WorkspaceConfig::from_json("{}").unwrap();
        assert_eq!(config, WorkspaceConfig::default());
    }

    #[test]
    fn partial_constraints_keep_other_defaults() {
        let config = WorkspaceConfig::from_json(r#"{"constraints": {"maxZoom": 18}}"#).unwrap();
        assert_eq!(config.constraints.max_zoom, 18.0);
        assert_eq!(config.constraints.min_zoom, 0.0);
        assert_eq!(config.fit_padding, 40.0);
    }

    #[test]
    fn inverted_zoom_range_rejected() {
        let err = WorkspaceConfig::from_json(r#"{"constraints": {"minZoom": 10, "maxZoom": 4}}"#);
        assert!(matches!(err, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            WorkspaceConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
