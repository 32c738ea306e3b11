use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner shared by layer and source IDs.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Counter behind `with_prefix`, shared so generated IDs never collide
/// across the two ID kinds.
static COUNTER: AtomicU64 = AtomicU64::new(0);

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string, or return the existing handle if already interned.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }

            /// Generate a unique ID with a prefix (e.g. `upload_3`, `draw_7`).
            pub fn with_prefix(prefix: &str) -> Self {
                let n = COUNTER.fetch_add(1, Ordering::Relaxed);
                Self::intern(&format!("{prefix}_{n}"))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::intern(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Identifier of a layer: a `LayerModel` in the layer store, or a render
    /// layer (`MapLayer`) in the style of a live engine.
    /// Internally a `Spur` index: 4 bytes, Copy, O(1) Eq and Hash.
    LayerId
);

interned_id!(
    /// Identifier of a data source registered with the render engine.
    SourceId
);

impl LayerId {
    /// The source a store layer publishes its payload under. Store layers own
    /// exactly one source, named after the layer.
    pub fn source_id(&self) -> SourceId {
        SourceId::intern(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = LayerId::intern("parcels");
        let b = LayerId::intern("parcels");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "parcels");
    }

    #[test]
    fn prefixed_ids_are_unique() {
        let a = LayerId::with_prefix("upload");
        let b = LayerId::with_prefix("upload");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("upload_"));
    }

    #[test]
    fn layer_owns_source_with_same_name() {
        let id = LayerId::intern("dem");
        assert_eq!(id.source_id().as_str(), "dem");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = SourceId::intern("osm");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"osm\"");
        let back: SourceId = serde_json::from_str("\"osm\"").unwrap();
        assert_eq!(back, id);
    }
}
