//! Draw tool modes and the geometry they produce.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The active interaction of the draw subsystem. At most one per workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawMode {
    Point,
    Linestring,
    Polygon,
    Rectangle,
    Circle,
    Freehand,
    Select,
    Static,
}

impl DrawMode {
    pub const ALL: [DrawMode; 8] = [
        DrawMode::Point,
        DrawMode::Linestring,
        DrawMode::Polygon,
        DrawMode::Rectangle,
        DrawMode::Circle,
        DrawMode::Freehand,
        DrawMode::Select,
        DrawMode::Static,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DrawMode::Point => "point",
            DrawMode::Linestring => "linestring",
            DrawMode::Polygon => "polygon",
            DrawMode::Rectangle => "rectangle",
            DrawMode::Circle => "circle",
            DrawMode::Freehand => "freehand",
            DrawMode::Select => "select",
            DrawMode::Static => "static",
        }
    }
}

impl fmt::Display for DrawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrawMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrawMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown draw mode '{s}'"))
    }
}

/// GeoJSON `FeatureCollection` snapshot owned by a draw engine.
/// Features are opaque GeoJSON objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Value>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Value>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_mode_case_insensitive() {
        assert_eq!("Polygon".parse::<DrawMode>(), Ok(DrawMode::Polygon));
        assert_eq!("freehand".parse::<DrawMode>(), Ok(DrawMode::Freehand));
        assert!("lasso".parse::<DrawMode>().is_err());
    }

    #[test]
    fn feature_collection_wire_shape() {
        let fc = FeatureCollection::new(vec![json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
            "properties": {}
        })]);
        let v = serde_json::to_value(&fc).unwrap();
        assert_eq!(v["type"], json!("FeatureCollection"));
        assert_eq!(v["features"].as_array().map(Vec::len), Some(1));

        let back: FeatureCollection =
            serde_json::from_value(json!({"type": "FeatureCollection", "features": []})).unwrap();
        assert!(back.is_empty());
    }
}
