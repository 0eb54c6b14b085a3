//! The configuration context
//!
//! A [`ConfigurationContext`] is the published snapshot every lookup runs
//! against: the ordered property sources, the ordered filters, the converter
//! registry and the combination policy. It is built once by a
//! [`ConfigurationContextBuilder`] and shared by cloning the handle.

mod builder;

pub use builder::ConfigurationContextBuilder;

use crate::combine::{self, CombinationPolicy, OverridingPolicy};
use crate::convert::ConverterRegistry;
use crate::filter::{FilterPipeline, PropertyFilter, sort_filters};
use crate::source::{PropertySource, SourceRegistry};
use parking_lot::RwLock;
use prop_value::PropertyValue;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

struct ContextInner {
    sources: RwLock<Arc<SourceRegistry>>,
    filters: RwLock<Arc<[Arc<dyn PropertyFilter>]>>,
    converters: Arc<ConverterRegistry>,
    policy: Arc<dyn CombinationPolicy>,
    pipeline: FilterPipeline,
}

/// Shared handle to a built configuration context
///
/// Cloning is cheap. Equality and hashing are structural: source names,
/// filter names, converter registrations and the policy name.
#[derive(Clone)]
pub struct ConfigurationContext {
    inner: Arc<ContextInner>,
}

impl Default for ConfigurationContext {
    /// A context without sources, filters or converters
    fn default() -> Self {
        Self::from_parts(
            SourceRegistry::default(),
            Vec::new(),
            Arc::new(ConverterRegistry::default()),
            Arc::new(OverridingPolicy),
            FilterPipeline::default(),
        )
    }
}

impl ConfigurationContext {
    pub(crate) fn from_parts(
        sources: SourceRegistry,
        filters: Vec<Arc<dyn PropertyFilter>>,
        converters: Arc<ConverterRegistry>,
        policy: Arc<dyn CombinationPolicy>,
        pipeline: FilterPipeline,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                sources: RwLock::new(Arc::new(sources)),
                filters: RwLock::new(filters.into()),
                converters,
                policy,
                pipeline,
            }),
        }
    }

    /// Start a builder
    pub fn builder() -> ConfigurationContextBuilder {
        ConfigurationContextBuilder::new()
    }

    /// A builder seeded with this context's components
    pub fn to_builder(&self) -> ConfigurationContextBuilder {
        ConfigurationContextBuilder::from_context(self)
    }

    /// Snapshot of the property sources, least significant first
    pub fn property_sources(&self) -> Arc<SourceRegistry> {
        Arc::clone(&self.inner.sources.read())
    }

    /// Find a property source by name
    pub fn property_source(&self, name: &str) -> Option<Arc<dyn PropertySource>> {
        self.inner.sources.read().get(name).cloned()
    }

    /// Snapshot of the filters in execution order
    pub fn property_filters(&self) -> Arc<[Arc<dyn PropertyFilter>]> {
        Arc::clone(&self.inner.filters.read())
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.inner.converters
    }

    pub fn combination_policy(&self) -> &dyn CombinationPolicy {
        self.inner.policy.as_ref()
    }

    pub fn filter_pipeline(&self) -> FilterPipeline {
        self.inner.pipeline
    }

    pub(crate) fn converter_registry(&self) -> &Arc<ConverterRegistry> {
        &self.inner.converters
    }

    pub(crate) fn policy(&self) -> &Arc<dyn CombinationPolicy> {
        &self.inner.policy
    }

    /// Combine the candidates of all sources for `key`
    pub fn evaluate_raw_value(&self, key: &str) -> Option<PropertyValue> {
        let sources = self.property_sources();
        combine::evaluate_raw_value(key, &sources, self.combination_policy())
    }

    /// Combine the union of keys of all scannable sources
    pub fn evaluate_raw_values(&self) -> BTreeMap<String, PropertyValue> {
        let sources = self.property_sources();
        combine::evaluate_raw_values(&sources, self.combination_policy())
    }

    /// Run the filter chain over a single value
    pub fn filter_value(&self, key: &str, value: PropertyValue) -> Option<PropertyValue> {
        let filters = self.property_filters();
        self.inner.pipeline.apply_filter(key, value, &filters, self)
    }

    /// Run the filter chain over a raw value map
    pub fn filter_values(
        &self,
        raw: &BTreeMap<String, PropertyValue>,
    ) -> BTreeMap<String, PropertyValue> {
        let filters = self.property_filters();
        self.inner.pipeline.apply_filters(raw, &filters, self)
    }

    /// Add property sources to a published context
    ///
    /// The source list is copied, extended, re-sorted by ordinal and swapped
    /// in under the write lock; concurrent readers keep their snapshot.
    /// Manual reorderings made by the builder are not preserved.
    #[deprecated(note = "build a new context with ConfigurationContextBuilder instead")]
    pub fn add_property_sources<I>(&self, sources: I)
    where
        I: IntoIterator<Item = Arc<dyn PropertySource>>,
    {
        let mut current = self.inner.sources.write();
        let mut updated = SourceRegistry::clone(&current);
        for source in sources {
            updated.add(source);
        }
        updated.sort_by_ordinal();
        *current = Arc::new(updated);
    }

    /// Add a filter to a published context
    ///
    /// Copy, re-sort by priority and swap under the write lock.
    #[deprecated(note = "build a new context with ConfigurationContextBuilder instead")]
    pub fn add_property_filter(&self, filter: Arc<dyn PropertyFilter>) {
        let mut current = self.inner.filters.write();
        if current.iter().any(|existing| Arc::ptr_eq(existing, &filter)) {
            return;
        }
        let mut updated: Vec<Arc<dyn PropertyFilter>> = current.to_vec();
        updated.push(filter);
        sort_filters(&mut updated);
        *current = updated.into();
    }

    fn signature(&self) -> ContextSignature {
        let sources = self
            .property_sources()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let filters = self
            .property_filters()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        let converters = self
            .converters()
            .entries()
            .into_iter()
            .map(|(key, converter)| (key.name().to_string(), converter.name().to_string()))
            .collect();
        ContextSignature {
            sources,
            filters,
            converters,
            policy: self.combination_policy().name().to_string(),
        }
    }
}

#[derive(PartialEq, Eq, Hash)]
struct ContextSignature {
    sources: Vec<String>,
    filters: Vec<String>,
    converters: Vec<(String, String)>,
    policy: String,
}

impl PartialEq for ConfigurationContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.signature() == other.signature()
    }
}

impl Eq for ConfigurationContext {}

impl Hash for ConfigurationContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signature().hash(state);
    }
}

impl fmt::Debug for ConfigurationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let signature = self.signature();
        f.debug_struct("ConfigurationContext")
            .field("sources", &signature.sources)
            .field("filters", &signature.filters)
            .field("converters", &signature.converters.len())
            .field("policy", &signature.policy)
            .finish()
    }
}
