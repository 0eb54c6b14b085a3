//! Type-indexed converter lookup

use super::types::AdaptedConverter;
use super::{ConversionContext, PropertyConverter, TypeCatalog, TypeKey};
use crate::{Error, Result};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Converters per target type
///
/// Lookups take the read lock. Synthesised converters are built without
/// holding any lock and registered under the write lock afterwards.
pub struct ConverterRegistry {
    converters: RwLock<HashMap<TypeKey, Vec<Arc<dyn PropertyConverter>>>>,
    catalog: TypeCatalog,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new(TypeCatalog::default())
    }
}

impl ConverterRegistry {
    /// Empty registry synthesising converters from `catalog`
    pub fn new(catalog: TypeCatalog) -> Self {
        Self {
            converters: RwLock::new(HashMap::new()),
            catalog,
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Append a converter for `target`
    ///
    /// Registering the same converter twice keeps both entries.
    pub fn register(&self, target: TypeKey, converter: Arc<dyn PropertyConverter>) {
        tracing::trace!(target_type = %target, converter = converter.name(), "Registered property converter");
        self.converters
            .write()
            .entry(target)
            .or_default()
            .push(converter);
    }

    /// Drop every converter registered for `target`
    pub fn remove(&self, target: TypeKey) -> Vec<Arc<dyn PropertyConverter>> {
        self.converters.write().remove(&target).unwrap_or_default()
    }

    /// Converters registered for exactly `target`
    pub fn converters_for(&self, target: TypeKey) -> Vec<Arc<dyn PropertyConverter>> {
        self.converters
            .read()
            .get(&target)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of converters registered for exactly `target`
    pub fn converter_count(&self, target: TypeKey) -> usize {
        self.converters.read().get(&target).map_or(0, Vec::len)
    }

    /// Target types with at least one registered converter
    pub fn registered_types(&self) -> Vec<TypeKey> {
        self.converters
            .read()
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(key, _)| *key)
            .collect()
    }

    /// All registrations, grouped by target type name
    pub fn entries(&self) -> Vec<(TypeKey, Arc<dyn PropertyConverter>)> {
        let converters = self.converters.read();
        let mut keys: Vec<&TypeKey> = converters.keys().collect();
        keys.sort_by_key(|key| key.name());
        keys.into_iter()
            .flat_map(|key| {
                converters[key]
                    .iter()
                    .map(move |converter| (*key, Arc::clone(converter)))
            })
            .collect()
    }

    /// Converters able to produce `target`
    ///
    /// Tries the exact type, a declared equivalent, the nearest declared
    /// ancestor and finally synthesis. A synthesised converter is registered
    /// for `target` so later lookups find it directly.
    pub fn lookup(&self, target: TypeKey) -> Vec<Arc<dyn PropertyConverter>> {
        {
            let converters = self.converters.read();

            if let Some(exact) = registered(&converters, target) {
                return exact.clone();
            }

            if let Some(equivalence) = self.catalog.equivalence(target) {
                if let Some(found) = registered(&converters, equivalence.source) {
                    tracing::trace!(
                        target_type = %target,
                        equivalent = %equivalence.source,
                        "Using equivalent type converters"
                    );
                    return found
                        .iter()
                        .map(|converter| {
                            Arc::new(AdaptedConverter::new(Arc::clone(converter), equivalence))
                                as Arc<dyn PropertyConverter>
                        })
                        .collect();
                }
            }

            for ancestor in self.catalog.ancestors(target) {
                if let Some(found) = registered(&converters, ancestor) {
                    tracing::trace!(target_type = %target, %ancestor, "Using ancestor converters");
                    return found.clone();
                }
            }
        }

        let Some(synthesized) = self.catalog.synthesize(target) else {
            return Vec::new();
        };

        let mut converters = self.converters.write();
        let list = converters.entry(target).or_default();
        if list.is_empty() {
            tracing::debug!(
                target_type = %target,
                converter = synthesized.name(),
                "Registered synthesised converter"
            );
            list.push(synthesized);
        }
        list.clone()
    }

    /// Convert `raw` to `T`
    ///
    /// Converters returned by [`lookup`](Self::lookup) for the context's
    /// target are tried in order and the first value wins. Failing
    /// converters are logged and skipped, as are values of the wrong type.
    /// When nothing matches, a `String` target gets the raw value back and
    /// every other target fails with [`Error::Unconvertible`].
    pub fn convert<T: Any + Send + Sync>(
        &self,
        raw: &str,
        context: &ConversionContext<'_>,
    ) -> Result<T> {
        let target = context.target();

        for converter in self.lookup(target) {
            match converter.convert(raw, context) {
                Ok(Some(converted)) => match converted.downcast::<T>() {
                    Ok(value) => return Ok(*value),
                    Err(_) => tracing::warn!(
                        target_type = %target,
                        converter = converter.name(),
                        expected = std::any::type_name::<T>(),
                        "Converter returned a value of an unexpected type"
                    ),
                },
                Ok(None) => {}
                Err(err) => tracing::debug!(
                    target_type = %target,
                    converter = converter.name(),
                    key = context.key().unwrap_or_default(),
                    error = %err,
                    "Converter failed"
                ),
            }
        }

        let fallback: Box<dyn Any> = Box::new(raw.to_string());
        if let Ok(value) = fallback.downcast::<T>() {
            return Ok(*value);
        }

        Err(Error::Unconvertible {
            key: context.key().map(str::to_string),
            target: target.name().to_string(),
            value: raw.to_string(),
            supported_formats: context.supported_formats(),
        })
    }
}

fn registered(
    converters: &HashMap<TypeKey, Vec<Arc<dyn PropertyConverter>>>,
    key: TypeKey,
) -> Option<&Vec<Arc<dyn PropertyConverter>>> {
    converters.get(&key).filter(|list| !list.is_empty())
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let converters = self.converters.read();
        f.debug_map()
            .entries(converters.iter().map(|(key, list)| {
                (
                    key.name(),
                    list.iter().map(|c| c.name().to_string()).collect::<Vec<_>>(),
                )
            }))
            .finish()
    }
}
