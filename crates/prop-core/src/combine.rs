//! Combination policies and the raw value evaluator
//!
//! Sources are folded in registry order, least significant first. The
//! policy decides how each source's candidate is merged into the value
//! accumulated so far.

use crate::source::{AnnotatedSource, ChangeSupport, PropertySource, SourceRegistry};
use prop_value::{META_SOURCE, PropertyValue};
use std::collections::BTreeMap;

/// Reduces the candidates of all sources for one key into a single value
pub trait CombinationPolicy: Send + Sync {
    /// Merge the candidate of `source` for `key` into `current`
    fn collect(
        &self,
        current: Option<PropertyValue>,
        key: &str,
        source: &dyn PropertySource,
    ) -> Option<PropertyValue>;

    fn name(&self) -> &str;
}

/// Last non-absent value wins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverridingPolicy;

impl CombinationPolicy for OverridingPolicy {
    fn collect(
        &self,
        current: Option<PropertyValue>,
        key: &str,
        source: &dyn PropertySource,
    ) -> Option<PropertyValue> {
        source.get(key).or(current)
    }

    fn name(&self) -> &str {
        "overriding"
    }
}

/// Joins the scalar values of every source that defines the key
///
/// Values are joined in registry order and the `source` metadata lists all
/// contributors separated by commas. Containers fall back to overriding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatenatingPolicy {
    separator: String,
}

impl ConcatenatingPolicy {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }
}

impl Default for ConcatenatingPolicy {
    fn default() -> Self {
        Self::new(",")
    }
}

impl CombinationPolicy for ConcatenatingPolicy {
    fn collect(
        &self,
        current: Option<PropertyValue>,
        key: &str,
        source: &dyn PropertySource,
    ) -> Option<PropertyValue> {
        let Some(next) = source.get(key) else {
            return current;
        };
        let Some(current) = current else {
            return Some(next);
        };

        let (Some(left), Some(right)) = (current.value(), next.value()) else {
            return Some(next);
        };

        let sources = match (current.source(), next.source()) {
            (Some(a), Some(b)) => format!("{},{}", a, b),
            (Some(a), None) => a.to_string(),
            (None, Some(b)) => b.to_string(),
            (None, None) => String::new(),
        };

        let mut builder = PropertyValue::builder(key)
            .value(format!("{}{}{}", left, self.separator, right))
            .metadata(current.metadata().clone())
            .metadata(next.metadata().clone());
        if !sources.is_empty() {
            builder = builder.meta(META_SOURCE, sources);
        }
        Some(builder.build())
    }

    fn name(&self) -> &str {
        "concatenating"
    }
}

/// Fold every source's candidate for `key`
pub fn evaluate_raw_value(
    key: &str,
    sources: &SourceRegistry,
    policy: &dyn CombinationPolicy,
) -> Option<PropertyValue> {
    sources.iter().fold(None, |current, (source, ordinal)| {
        let view = AnnotatedSource::new(source.as_ref(), ordinal);
        policy.collect(current, key, &view)
    })
}

/// Fold the union of keys of every scannable source
///
/// Each source's property map is read once. Non-scannable sources only take
/// part in exact-key lookups.
pub fn evaluate_raw_values(
    sources: &SourceRegistry,
    policy: &dyn CombinationPolicy,
) -> BTreeMap<String, PropertyValue> {
    let mut result: BTreeMap<String, PropertyValue> = BTreeMap::new();

    for (source, ordinal) in sources.iter() {
        if !source.is_scannable() {
            tracing::trace!(source = source.name(), "Skipping non-scannable source");
            continue;
        }

        let view = AnnotatedSource::new(source.as_ref(), ordinal);
        let snapshot = Snapshot {
            entries: view.properties(),
            view,
        };

        for key in snapshot.entries.keys() {
            let current = result.remove(key);
            if let Some(value) = policy.collect(current, key, &snapshot) {
                result.insert(key.clone(), value);
            }
        }
    }

    result
}

/// A source frozen to the property map it returned for one bulk evaluation
///
/// Everything but the entries is answered by the annotated source, as in
/// [`evaluate_raw_value`].
struct Snapshot<'a> {
    view: AnnotatedSource<'a>,
    entries: BTreeMap<String, PropertyValue>,
}

impl PropertySource for Snapshot<'_> {
    fn name(&self) -> &str {
        self.view.name()
    }

    fn ordinal(&self) -> Option<i32> {
        self.view.ordinal()
    }

    fn declared_priority(&self) -> Option<i32> {
        self.view.declared_priority()
    }

    fn get(&self, key: &str) -> Option<PropertyValue> {
        self.entries.get(key).cloned()
    }

    fn properties(&self) -> BTreeMap<String, PropertyValue> {
        self.entries.clone()
    }

    fn is_scannable(&self) -> bool {
        self.view.is_scannable()
    }

    fn change_support(&self) -> ChangeSupport {
        self.view.change_support()
    }

    fn type_name(&self) -> &'static str {
        self.view.type_name()
    }
}
