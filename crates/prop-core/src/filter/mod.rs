//! Property filters
//!
//! Filters rewrite or remove values after the sources have been combined.
//! The [`FilterPipeline`] runs the whole filter chain repeatedly until the
//! values stop changing or the pass bound is reached.

mod pipeline;

pub use pipeline::{FilterPipeline, MAX_FILTER_PASSES, Relaxation, sort_filters};

use crate::FilterError;
use crate::context::ConfigurationContext;
use prop_value::PropertyValue;
use std::collections::BTreeMap;

/// A post-merge transform over property values
///
/// Filters must be pure and reentrant: the pipeline may offer the same value
/// several times within one evaluation.
pub trait PropertyFilter: Send + Sync {
    /// Transform `value`
    ///
    /// `Ok(None)` removes the key. An `Err` is logged by the pipeline and the
    /// value passes through unchanged.
    fn filter_property(
        &self,
        value: PropertyValue,
        context: &FilterContext<'_>,
    ) -> Result<Option<PropertyValue>, FilterError>;

    /// Higher priorities run first
    fn priority(&self) -> i32 {
        0
    }

    fn name(&self) -> &str;
}

/// Whether a filter runs for a single lookup or a whole-set evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterScope {
    Single,
    Bulk,
}

/// Per-pass record handed to every filter invocation
#[derive(Clone, Copy)]
pub struct FilterContext<'a> {
    key: &'a str,
    value: &'a PropertyValue,
    raw: &'a BTreeMap<String, PropertyValue>,
    scope: FilterScope,
    context: &'a ConfigurationContext,
}

impl<'a> FilterContext<'a> {
    /// Context for a single-key evaluation
    pub fn single(
        key: &'a str,
        value: &'a PropertyValue,
        raw: &'a BTreeMap<String, PropertyValue>,
        context: &'a ConfigurationContext,
    ) -> Self {
        Self {
            key,
            value,
            raw,
            scope: FilterScope::Single,
            context,
        }
    }

    /// Context for one key of a whole-set evaluation
    pub fn bulk(
        key: &'a str,
        value: &'a PropertyValue,
        raw: &'a BTreeMap<String, PropertyValue>,
        context: &'a ConfigurationContext,
    ) -> Self {
        Self {
            key,
            value,
            raw,
            scope: FilterScope::Bulk,
            context,
        }
    }

    /// The key under evaluation
    pub fn key(&self) -> &str {
        self.key
    }

    /// The unfiltered value the evaluation started from
    pub fn value(&self) -> &PropertyValue {
        self.value
    }

    /// Raw, unfiltered values of the evaluation
    ///
    /// For single-key lookups this holds only the key under evaluation.
    pub fn raw_values(&self) -> &BTreeMap<String, PropertyValue> {
        self.raw
    }

    pub fn scope(&self) -> FilterScope {
        self.scope
    }

    pub fn is_single(&self) -> bool {
        self.scope == FilterScope::Single
    }

    /// The context whose filters are running
    pub fn configuration_context(&self) -> &ConfigurationContext {
        self.context
    }
}

impl std::fmt::Debug for FilterContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterContext")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("raw_values", &self.raw.len())
            .finish()
    }
}
