//! Bounding-box helpers over opaque GeoJSON payloads.

use crate::view::BBox;
use serde_json::Value;

/// Bounding box of every coordinate pair in a GeoJSON value (geometry,
/// feature, or feature collection). Returns `None` when no finite
/// coordinates are found. A top-level `bbox` member wins when present.
pub fn geojson_bbox(value: &Value) -> Option<BBox> {
    if let Some(bbox) = declared_bbox(value) {
        return Some(bbox);
    }
    let mut acc: Option<BBox> = None;
    collect(value, &mut acc);
    acc
}

fn declared_bbox(value: &Value) -> Option<BBox> {
    let arr = value.get("bbox")?.as_array()?;
    if arr.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, v) in out.iter_mut().zip(arr) {
        *slot = v.as_f64()?;
    }
    Some(out)
}

fn collect(value: &Value, acc: &mut Option<BBox>) {
    match value {
        Value::Object(obj) => {
            if let Some(coords) = obj.get("coordinates") {
                walk_coordinates(coords, acc);
            }
            for key in ["geometry", "geometries", "features"] {
                if let Some(child) = obj.get(key) {
                    collect(child, acc);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect(item, acc)),
        _ => {}
    }
}

fn walk_coordinates(value: &Value, acc: &mut Option<BBox>) {
    let Value::Array(items) = value else {
        return;
    };
    // A position is an array whose first two members are numbers.
    if let (Some(x), Some(y)) = (
        items.first().and_then(Value::as_f64),
        items.get(1).and_then(Value::as_f64),
    ) {
        extend(acc, x, y);
        return;
    }
    items.iter().for_each(|item| walk_coordinates(item, acc));
}

/// Grow `acc` to include the point `(x, y)`.
pub fn extend(acc: &mut Option<BBox>, x: f64, y: f64) {
    if !x.is_finite() || !y.is_finite() {
        return;
    }
    match acc {
        Some([w, s, e, n]) => {
            *w = w.min(x);
            *s = s.min(y);
            *e = e.max(x);
            *n = n.max(y);
        }
        None => *acc = Some([x, y, x, y]),
    }
}

/// Center point of a bounding box.
pub fn bbox_center(bbox: &BBox) -> [f64; 2] {
    [(bbox[0] + bbox[2]) / 2.0, (bbox[1] + bbox[3]) / 2.0]
}
