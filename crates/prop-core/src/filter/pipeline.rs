//! Bounded fixed-point evaluation of the filter chain

use super::{FilterContext, PropertyFilter};
use crate::context::ConfigurationContext;
use prop_value::PropertyValue;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default upper bound of passes over the filter chain
pub const MAX_FILTER_PASSES: usize = 10;

/// Outcome of filtering one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relaxation {
    /// The filtered value, `None` if a filter removed it
    pub value: Option<PropertyValue>,
    /// Number of passes run, including the final unchanged one
    pub passes: usize,
    /// `false` when the pass bound was hit while values were still changing
    pub converged: bool,
}

/// Runs a filter chain until nothing changes
///
/// Each pass feeds every filter the output of the previous one. A pass in
/// which no filter changed its input ends the evaluation. A removal ends it
/// immediately. When the bound is reached the last value is returned and a
/// warning is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterPipeline {
    max_passes: usize,
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self {
            max_passes: MAX_FILTER_PASSES,
        }
    }
}

impl FilterPipeline {
    /// Pipeline with a custom pass bound (at least one pass)
    pub fn with_max_passes(max_passes: usize) -> Self {
        Self {
            max_passes: max_passes.max(1),
        }
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Filter the value of a single key
    pub fn apply_filter(
        &self,
        key: &str,
        value: PropertyValue,
        filters: &[Arc<dyn PropertyFilter>],
        context: &ConfigurationContext,
    ) -> Option<PropertyValue> {
        self.apply_traced(key, value, filters, context).value
    }

    /// Filter the value of a single key and report how the evaluation went
    pub fn apply_traced(
        &self,
        key: &str,
        value: PropertyValue,
        filters: &[Arc<dyn PropertyFilter>],
        context: &ConfigurationContext,
    ) -> Relaxation {
        let raw = BTreeMap::from([(key.to_string(), value)]);
        let initial = &raw[key];
        let filter_context = FilterContext::single(key, initial, &raw, context);
        self.relax(initial, filters, &filter_context)
    }

    /// Filter a whole raw value map
    ///
    /// Keys are filtered independently. Every filter sees the raw map as its
    /// cross-key context, never a partially filtered one. Removed keys are
    /// dropped from the result.
    pub fn apply_filters(
        &self,
        raw: &BTreeMap<String, PropertyValue>,
        filters: &[Arc<dyn PropertyFilter>],
        context: &ConfigurationContext,
    ) -> BTreeMap<String, PropertyValue> {
        let mut result = BTreeMap::new();
        for (key, value) in raw {
            let filter_context = FilterContext::bulk(key, value, raw, context);
            if let Some(filtered) = self.relax(value, filters, &filter_context).value {
                result.insert(key.clone(), filtered);
            }
        }
        result
    }

    fn relax(
        &self,
        initial: &PropertyValue,
        filters: &[Arc<dyn PropertyFilter>],
        context: &FilterContext<'_>,
    ) -> Relaxation {
        let key = context.key();
        let mut current = initial.clone();

        for pass in 1..=self.max_passes {
            let mut changed = false;

            for filter in filters {
                let input = current.clone();
                match filter.filter_property(current, context) {
                    Ok(Some(output)) => {
                        if output != input {
                            changed = true;
                        }
                        current = output;
                    }
                    Ok(None) => {
                        tracing::trace!(key, filter = filter.name(), pass, "Filter removed value");
                        return Relaxation {
                            value: None,
                            passes: pass,
                            converged: true,
                        };
                    }
                    Err(err) => {
                        tracing::debug!(
                            key,
                            filter = filter.name(),
                            error = %err,
                            "Filter failed, keeping unfiltered value"
                        );
                        current = input;
                    }
                }
            }

            tracing::trace!(key, pass, changed, "Filter pass complete");
            if !changed {
                return Relaxation {
                    value: Some(current),
                    passes: pass,
                    converged: true,
                };
            }
        }

        tracing::warn!(
            key,
            passes = self.max_passes,
            "Maximal filter pass count reached, returning last filtered value"
        );
        Relaxation {
            value: Some(current),
            passes: self.max_passes,
            converged: false,
        }
    }
}

/// Order filters by descending priority, then ascending name
pub fn sort_filters(filters: &mut [Arc<dyn PropertyFilter>]) {
    filters.sort_by(|a, b| {
        b.priority()
            .cmp(&a.priority())
            .then_with(|| a.name().cmp(b.name()))
    });
}
