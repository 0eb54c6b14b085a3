//! Builder for scalar property values

use crate::{META_SOURCE, PropertyValue};
use std::collections::BTreeMap;

/// Fluent builder for scalar [`PropertyValue`]s with metadata
#[derive(Debug, Clone, Default)]
pub struct PropertyValueBuilder {
    key: String,
    value: Option<String>,
    metadata: BTreeMap<String, String>,
}

impl PropertyValueBuilder {
    /// Start a builder for the given key
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Set the scalar payload
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Record the originating property source
    pub fn source(self, source: impl Into<String>) -> Self {
        self.meta(META_SOURCE, source)
    }

    /// Add a metadata entry
    pub fn meta(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    /// Copy a set of metadata entries
    pub fn metadata<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Build the value; builder-set metadata does not count as a mutation
    pub fn build(self) -> PropertyValue {
        PropertyValue::from_parts(self.key, self.value, self.metadata)
    }
}
