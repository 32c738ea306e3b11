//! Terrain source selection.

use gw_core::SerializedLayer;

/// The layer that should drive terrain: the highest-`order` layer that is an
/// elevation layer, visible, and terrain-enabled. `None` clears terrain.
///
/// Ties on `order` resolve to the later layer in the slice.
pub fn select_terrain(layers: &[SerializedLayer]) -> Option<&SerializedLayer> {
    layers
        .iter()
        .filter(|l| l.is_terrain_candidate())
        .max_by_key(|l| l.order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::{LayerId, LayerKind, LayerModel, SourcePayload};

    fn dem(id: &str, order: u32) -> LayerModel {
        let mut layer = LayerModel::new(
            LayerId::intern(id),
            LayerKind::RasterDem,
            id,
            SourcePayload::dem("https://dem/{z}/{x}/{y}.png"),
        )
        .with_terrain(true);
        layer.order = order;
        layer
    }

    #[test]
    fn highest_order_wins() {
        let layers: Vec<_> = [dem("t-1", 1), dem("t-3", 3), dem("t-2", 2)]
            .iter()
            .map(LayerModel::serialize)
            .collect();
        assert_eq!(select_terrain(&layers).map(|l| l.id.as_str()), Some("t-3"));
    }

    #[test]
    fn hidden_or_disabled_layers_are_skipped() {
        let layers: Vec<_> = [
            dem("t-low", 1),
            dem("t-hidden", 5).hidden(),
            dem("t-off", 4).with_terrain(false),
        ]
        .iter()
        .map(LayerModel::serialize)
        .collect();
        assert_eq!(select_terrain(&layers).map(|l| l.id.as_str()), Some("t-low"));
        assert!(select_terrain(&layers[1..]).is_none());
    }
}
