//! Error types shared across the workspace crates.
//!
//! `StateError` is an invariant violation: a caller sequenced operations
//! wrongly (layer before its source, reorder with a partial id set) and must
//! surface it. `EngineError` is a render engine rejecting one operation; the
//! reconciler contains it per item and keeps going.

use crate::id::{LayerId, SourceId};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("layer '{layer}' references source '{source_id}', which has not been added")]
    MissingSource { layer: LayerId, source_id: SourceId },

    #[error("source '{source_id}' is still used by layer(s) {}", join_ids(.layers))]
    SourceInUse {
        source_id: SourceId,
        layers: Vec<LayerId>,
    },

    #[error("source '{0}' is not a raster-dem source and cannot drive terrain")]
    NotElevation(SourceId),

    #[error("unknown source '{0}'")]
    UnknownSource(SourceId),

    #[error("unknown layer '{0}'")]
    UnknownLayer(LayerId),

    #[error("reorder needs all {expected} layer ids, got {actual}")]
    ReorderLength { expected: usize, actual: usize },

    #[error("reorder references unknown layer '{0}'")]
    ReorderUnknown(LayerId),

    #[error("reorder lists layer '{0}' more than once")]
    ReorderDuplicate(LayerId),
}

fn join_ids(ids: &[LayerId]) -> String {
    let mut out = String::new();
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "'{id}'");
    }
    out
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("{op} '{target}' rejected by engine: {reason}")]
    Rejected {
        op: &'static str,
        target: String,
        reason: String,
    },
}

impl EngineError {
    pub fn rejected(op: &'static str, target: impl ToString, reason: impl Into<String>) -> Self {
        EngineError::Rejected {
            op,
            target: target.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid workspace config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid workspace config: {0}")]
    Invalid(String),
}
