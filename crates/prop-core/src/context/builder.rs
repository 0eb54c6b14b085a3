//! Single-use builder for configuration contexts

use super::ConfigurationContext;
use crate::combine::{CombinationPolicy, OverridingPolicy};
use crate::convert::{ConverterRegistry, PropertyConverter, TypeCatalog, TypeKey};
use crate::env::ServiceEnvironment;
use crate::filter::{FilterPipeline, MAX_FILTER_PASSES, PropertyFilter, sort_filters};
use crate::source::{PropertySource, SourceRegistry};
use crate::{Error, Result};
use std::cmp::Ordering;
use std::sync::Arc;

/// Accumulates the components of a [`ConfigurationContext`]
///
/// Sources are kept in ordinal order as they are added; the reordering
/// operations move them explicitly. Filters are kept sorted by priority as
/// they are added, [`sort_property_filters`](Self::sort_property_filters)
/// imposes a custom order. Converters are registered in insertion order.
///
/// The builder is single-use: after [`build`](Self::build) every mutating
/// call fails with [`Error::BuilderBuilt`].
pub struct ConfigurationContextBuilder {
    sources: SourceRegistry,
    filters: Vec<Arc<dyn PropertyFilter>>,
    converters: Vec<(TypeKey, Arc<dyn PropertyConverter>)>,
    policy: Arc<dyn CombinationPolicy>,
    catalog: TypeCatalog,
    max_filter_passes: usize,
    built: bool,
}

impl Default for ConfigurationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationContextBuilder {
    pub fn new() -> Self {
        Self {
            sources: SourceRegistry::default(),
            filters: Vec::new(),
            converters: Vec::new(),
            policy: Arc::new(OverridingPolicy),
            catalog: TypeCatalog::default(),
            max_filter_passes: MAX_FILTER_PASSES,
            built: false,
        }
    }

    /// A builder holding the components of an existing context
    ///
    /// Converters synthesised by the context so far are carried over as
    /// regular registrations.
    pub fn from_context(context: &ConfigurationContext) -> Self {
        Self {
            sources: SourceRegistry::clone(&context.property_sources()),
            filters: context.property_filters().to_vec(),
            converters: context.converters().entries(),
            policy: Arc::clone(context.policy()),
            catalog: context.converter_registry().catalog().clone(),
            max_filter_passes: context.filter_pipeline().max_passes(),
            built: false,
        }
    }

    fn ensure_not_built(&self) -> Result<()> {
        if self.built {
            return Err(Error::BuilderBuilt);
        }
        Ok(())
    }

    /// Add property sources at their ordinal position
    ///
    /// Sources whose name is already present are ignored.
    pub fn add_property_sources<I>(&mut self, sources: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = Arc<dyn PropertySource>>,
    {
        self.ensure_not_built()?;
        for source in sources {
            self.sources.add(source);
        }
        Ok(self)
    }

    /// Remove property sources by name
    ///
    /// Fails without removing anything if one of the names is unknown.
    pub fn remove_property_sources(&mut self, names: &[&str]) -> Result<&mut Self> {
        self.ensure_not_built()?;
        if let Some(missing) = names.iter().find(|name| !self.sources.contains(name)) {
            return Err(Error::SourceNotFound {
                name: missing.to_string(),
            });
        }
        for name in names {
            self.sources.remove(name)?;
        }
        Ok(self)
    }

    /// Move a source one slot towards the most significant end
    pub fn increase_priority(&mut self, name: &str) -> Result<&mut Self> {
        self.ensure_not_built()?;
        self.sources.increase_priority(name)?;
        Ok(self)
    }

    /// Move a source one slot towards the least significant end
    pub fn decrease_priority(&mut self, name: &str) -> Result<&mut Self> {
        self.ensure_not_built()?;
        self.sources.decrease_priority(name)?;
        Ok(self)
    }

    /// Make a source the most significant one
    pub fn highest_priority(&mut self, name: &str) -> Result<&mut Self> {
        self.ensure_not_built()?;
        self.sources.highest_priority(name)?;
        Ok(self)
    }

    /// Make a source the least significant one
    pub fn lowest_priority(&mut self, name: &str) -> Result<&mut Self> {
        self.ensure_not_built()?;
        self.sources.lowest_priority(name)?;
        Ok(self)
    }

    /// Re-sort the sources with a custom comparator
    pub fn sort_property_sources<F>(&mut self, compare: F) -> Result<&mut Self>
    where
        F: FnMut(&dyn PropertySource, &dyn PropertySource) -> Ordering,
    {
        self.ensure_not_built()?;
        self.sources.sort_by(compare);
        Ok(self)
    }

    /// The sources in their current order, least significant first
    pub fn property_sources(&self) -> Vec<Arc<dyn PropertySource>> {
        self.sources.sources()
    }

    /// Add filters, keeping the list sorted by priority
    ///
    /// A filter instance that is already present is ignored.
    pub fn add_property_filters<I>(&mut self, filters: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = Arc<dyn PropertyFilter>>,
    {
        self.ensure_not_built()?;
        for filter in filters {
            if self.filters.iter().any(|f| Arc::ptr_eq(f, &filter)) {
                tracing::debug!(filter = filter.name(), "Ignoring duplicate property filter");
                continue;
            }
            self.filters.push(filter);
        }
        sort_filters(&mut self.filters);
        Ok(self)
    }

    /// Remove filters by name
    ///
    /// Fails without removing anything if one of the names is unknown.
    pub fn remove_property_filters(&mut self, names: &[&str]) -> Result<&mut Self> {
        self.ensure_not_built()?;
        if let Some(missing) = names
            .iter()
            .find(|name| !self.filters.iter().any(|f| f.name() == **name))
        {
            return Err(Error::FilterNotFound {
                name: missing.to_string(),
            });
        }
        self.filters.retain(|f| !names.contains(&f.name()));
        Ok(self)
    }

    /// Re-sort the filters with a custom comparator
    pub fn sort_property_filters<F>(&mut self, mut compare: F) -> Result<&mut Self>
    where
        F: FnMut(&dyn PropertyFilter, &dyn PropertyFilter) -> Ordering,
    {
        self.ensure_not_built()?;
        self.filters.sort_by(|a, b| compare(a.as_ref(), b.as_ref()));
        Ok(self)
    }

    /// The filters in their current order
    pub fn property_filters(&self) -> Vec<Arc<dyn PropertyFilter>> {
        self.filters.clone()
    }

    /// Register a converter for `T`
    pub fn add_property_converter<T: ?Sized + 'static>(
        &mut self,
        converter: Arc<dyn PropertyConverter>,
    ) -> Result<&mut Self> {
        self.add_property_converter_for(TypeKey::of::<T>(), converter)
    }

    /// Register a converter for an explicit target key
    pub fn add_property_converter_for(
        &mut self,
        target: TypeKey,
        converter: Arc<dyn PropertyConverter>,
    ) -> Result<&mut Self> {
        self.ensure_not_built()?;
        self.converters.push((target, converter));
        Ok(self)
    }

    /// Drop every converter registered for `target`
    pub fn remove_property_converters(&mut self, target: TypeKey) -> Result<&mut Self> {
        self.ensure_not_built()?;
        self.converters.retain(|(key, _)| *key != target);
        Ok(self)
    }

    /// Registered converters in insertion order
    pub fn property_converters(&self) -> Vec<(TypeKey, Arc<dyn PropertyConverter>)> {
        self.converters.clone()
    }

    pub fn set_combination_policy(
        &mut self,
        policy: Arc<dyn CombinationPolicy>,
    ) -> Result<&mut Self> {
        self.ensure_not_built()?;
        self.policy = policy;
        Ok(self)
    }

    /// Declare the types converters may be synthesised for
    pub fn set_type_catalog(&mut self, catalog: TypeCatalog) -> Result<&mut Self> {
        self.ensure_not_built()?;
        self.catalog = catalog;
        Ok(self)
    }

    /// Bound the number of passes over the filter chain
    pub fn set_max_filter_passes(&mut self, max_passes: usize) -> Result<&mut Self> {
        self.ensure_not_built()?;
        self.max_filter_passes = max_passes;
        Ok(self)
    }

    /// Add every property source offered by `env`
    pub fn add_default_property_sources(&mut self, env: &ServiceEnvironment) -> Result<&mut Self> {
        self.add_property_sources(env.property_sources())
    }

    /// Add every property filter offered by `env`
    pub fn add_default_property_filters(&mut self, env: &ServiceEnvironment) -> Result<&mut Self> {
        self.add_property_filters(env.property_filters())
    }

    /// Register every converter offered by `env`, highest priority first
    pub fn add_default_property_converters(
        &mut self,
        env: &ServiceEnvironment,
    ) -> Result<&mut Self> {
        self.ensure_not_built()?;
        self.converters.extend(
            env.converters()
                .iter()
                .map(|service| (service.target, Arc::clone(&service.converter))),
        );
        Ok(self)
    }

    /// Publish the context
    pub fn build(&mut self) -> Result<ConfigurationContext> {
        self.ensure_not_built()?;
        self.built = true;

        let registry = ConverterRegistry::new(self.catalog.clone());
        for (target, converter) in &self.converters {
            registry.register(*target, Arc::clone(converter));
        }

        tracing::debug!(
            sources = self.sources.len(),
            filters = self.filters.len(),
            converters = self.converters.len(),
            policy = self.policy.name(),
            "Built configuration context"
        );

        Ok(ConfigurationContext::from_parts(
            self.sources.clone(),
            self.filters.clone(),
            Arc::new(registry),
            Arc::clone(&self.policy),
            FilterPipeline::with_max_passes(self.max_filter_passes),
        ))
    }
}
