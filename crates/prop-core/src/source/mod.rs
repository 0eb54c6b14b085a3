//! Property sources and their ordering
//!
//! A [`PropertySource`] is a named provider of key/value entries. Sources are
//! ranked by an integer ordinal (see [`OrdinalResolver`]) and kept in a
//! [`SourceRegistry`] sorted ascending: the last source is the most
//! significant one when values are combined.

mod ordinal;
mod registry;

pub use ordinal::{DEFAULT_ORDINAL, ORDINAL_KEY, OrdinalResolver, ordinal, ordinal_with_key};
pub use registry::SourceRegistry;

use prop_value::{META_ORDINAL, META_SOURCE, PropertyValue};
use std::collections::BTreeMap;

/// Change notification capability declared by a source
///
/// Informational only; the engine consumes a snapshot per evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChangeSupport {
    /// The source may change but does not notify
    #[default]
    Unsupported,
    /// The source publishes change notifications
    Supported,
    /// The source never changes
    Immutable,
}

/// A named provider of configuration entries
///
/// Implementations are expected to behave as immutable snapshots for the
/// duration of a call. The name is the identity of a source: registries
/// ignore a second source with an already registered name.
pub trait PropertySource: Send + Sync {
    /// Unique name of this source
    fn name(&self) -> &str;

    /// Intrinsic ordinal override
    ///
    /// Consulted only when the source does not expose a `tamaya.ordinal`
    /// entry.
    fn ordinal(&self) -> Option<i32> {
        None
    }

    /// Static priority fixed at construction time
    ///
    /// Lowest precedence of the ordinal strategies.
    fn declared_priority(&self) -> Option<i32> {
        None
    }

    /// Look up a single key
    fn get(&self, key: &str) -> Option<PropertyValue>;

    /// All entries of this source
    fn properties(&self) -> BTreeMap<String, PropertyValue>;

    /// Whether the source may be enumerated by [`properties`](Self::properties)
    ///
    /// Non-scannable sources still answer exact-key lookups.
    fn is_scannable(&self) -> bool {
        true
    }

    fn change_support(&self) -> ChangeSupport {
        ChangeSupport::Unsupported
    }

    /// Type name used to break ordinal ties
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// View over a source that stamps provenance metadata onto its values
///
/// Values that already carry `source` or `ordinal` metadata keep them.
pub(crate) struct AnnotatedSource<'a> {
    inner: &'a dyn PropertySource,
    ordinal: i32,
}

impl<'a> AnnotatedSource<'a> {
    pub(crate) fn new(inner: &'a dyn PropertySource, ordinal: i32) -> Self {
        Self { inner, ordinal }
    }

    fn annotate(&self, value: PropertyValue) -> PropertyValue {
        if value.source().is_some() && value.meta(META_ORDINAL).is_some() {
            return value;
        }
        let mut value = value.mutable();
        if value.source().is_none() {
            let _ = value.set_meta(META_SOURCE, self.inner.name());
        }
        if value.meta(META_ORDINAL).is_none() {
            let _ = value.set_meta(META_ORDINAL, self.ordinal.to_string());
        }
        value
    }
}

impl PropertySource for AnnotatedSource<'_> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn ordinal(&self) -> Option<i32> {
        Some(self.ordinal)
    }

    fn declared_priority(&self) -> Option<i32> {
        self.inner.declared_priority()
    }

    fn get(&self, key: &str) -> Option<PropertyValue> {
        self.inner.get(key).map(|value| self.annotate(value))
    }

    fn properties(&self) -> BTreeMap<String, PropertyValue> {
        self.inner
            .properties()
            .into_iter()
            .map(|(key, value)| (key, self.annotate(value)))
            .collect()
    }

    fn is_scannable(&self) -> bool {
        self.inner.is_scannable()
    }

    fn change_support(&self) -> ChangeSupport {
        self.inner.change_support()
    }

    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StaticSource;
    use super::*;

    #[test]
    fn test_annotated_source_adds_provenance() {
        let inner = StaticSource::new("defaults", &[("a", "1")]);
        let view = AnnotatedSource::new(&inner, 100);

        let value = view.get("a").unwrap();
        assert_eq!(value.source(), Some("defaults"));
        assert_eq!(value.meta(META_ORDINAL), Some("100"));
        assert!(view.get("missing").is_none());
    }

    #[test]
    fn test_annotated_source_keeps_existing_metadata() {
        struct Tagged;
        impl PropertySource for Tagged {
            fn name(&self) -> &str {
                "tagged"
            }
            fn get(&self, key: &str) -> Option<PropertyValue> {
                Some(
                    PropertyValue::builder(key)
                        .value("v")
                        .source("upstream")
                        .meta(META_ORDINAL, "7")
                        .build(),
                )
            }
            fn properties(&self) -> BTreeMap<String, PropertyValue> {
                BTreeMap::new()
            }
        }

        let view = AnnotatedSource::new(&Tagged, 100);
        let value = view.get("k").unwrap();
        assert_eq!(value.source(), Some("upstream"));
        assert_eq!(value.meta(META_ORDINAL), Some("7"));
    }

    #[test]
    fn test_type_name_defaults_to_concrete_type() {
        let source: &dyn PropertySource = &StaticSource::new("x", &[]);
        assert!(source.type_name().ends_with("StaticSource"));
    }
}
