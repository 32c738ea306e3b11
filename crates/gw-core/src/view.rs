//! Map viewport: camera state, partial updates, and constraint normalization.
//!
//! Every view that enters a store or an engine passes through
//! [`ViewConstraints::clamp`], so the invariants below hold everywhere:
//!
//! - `zoom` ∈ `[min_zoom, max_zoom]`
//! - `bearing` ∈ `[0, 360)`
//! - `pitch` ∈ `[0, max_pitch]`
//! - longitude wrapped into `[-180, 180]`, latitude clamped to `[-90, 90]`

use serde::{Deserialize, Serialize};

/// `[west, south, east, north]` in degrees.
pub type BBox = [f64; 4];

/// Camera state of one workspace map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    /// `[lng, lat]` in degrees.
    pub center: [f64; 2],
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            zoom: 2.0,
            bearing: 0.0,
            pitch: 0.0,
        }
    }
}

impl MapView {
    /// Overlay the set fields of `patch` onto this view. Non-finite values
    /// in the patch are dropped.
    #[must_use]
    pub fn merged(mut self, patch: &ViewPatch) -> Self {
        if let Some([lng, lat]) = patch.center {
            if lng.is_finite() && lat.is_finite() {
                self.center = [lng, lat];
            } else {
                log::warn!("ignoring non-finite center [{lng}, {lat}]");
            }
        }
        if let Some(zoom) = patch.zoom.filter(|z| z.is_finite()) {
            self.zoom = zoom;
        }
        if let Some(bearing) = patch.bearing.filter(|b| b.is_finite()) {
            self.bearing = bearing;
        }
        if let Some(pitch) = patch.pitch.filter(|p| p.is_finite()) {
            self.pitch = pitch;
        }
        self
    }
}

/// A partial view update. Unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewPatch {
    pub center: Option<[f64; 2]>,
    pub zoom: Option<f64>,
    pub bearing: Option<f64>,
    pub pitch: Option<f64>,
}

impl ViewPatch {
    pub fn center(center: [f64; 2]) -> Self {
        Self {
            center: Some(center),
            ..Self::default()
        }
    }

    pub fn zoom(zoom: f64) -> Self {
        Self {
            zoom: Some(zoom),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.center.is_none() && self.zoom.is_none() && self.bearing.is_none() && self.pitch.is_none()
    }
}

impl From<MapView> for ViewPatch {
    fn from(view: MapView) -> Self {
        Self {
            center: Some(view.center),
            zoom: Some(view.zoom),
            bearing: Some(view.bearing),
            pitch: Some(view.pitch),
        }
    }
}

/// Engine-defined limits applied to every view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewConstraints {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub max_pitch: f64,
}

impl Default for ViewConstraints {
    fn default() -> Self {
        Self {
            min_zoom: 0.0,
            max_zoom: 22.0,
            max_pitch: 60.0,
        }
    }
}

impl ViewConstraints {
    /// Normalize a view so it satisfies every viewport invariant.
    #[must_use]
    pub fn clamp(&self, view: MapView) -> MapView {
        let [lng, lat] = view.center;
        MapView {
            center: [wrap_longitude(lng), lat.clamp(-90.0, 90.0)],
            zoom: view.zoom.clamp(self.min_zoom, self.max_zoom.max(self.min_zoom)),
            bearing: normalize_bearing(view.bearing),
            pitch: view.pitch.clamp(0.0, self.max_pitch.max(0.0)),
        }
    }
}

/// Wrap a longitude into `[-180, 180]`. Values already in range are kept
/// as-is, so `180` stays `180`.
pub fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Normalize a bearing into `[0, 360)`.
pub fn normalize_bearing(bearing: f64) -> f64 {
    let b = bearing.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if b >= 360.0 { 0.0 } else { b }
}
