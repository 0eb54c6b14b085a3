//! Service environment
//!
//! The environment is an explicit, caller-built catalogue of services that
//! the context builder's "add defaults" operations draw from. Services are
//! grouped by their (possibly unsized) service type and handed out ordered
//! by descending priority, then ascending name.

use crate::convert::{PropertyConverter, TypeKey, builtin_converters};
use crate::filter::PropertyFilter;
use crate::source::PropertySource;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

struct ServiceEntry<S: ?Sized> {
    service: Arc<S>,
    priority: i32,
    name: String,
}

/// A converter offered as a default, together with its target type.
#[derive(Clone)]
pub struct ConverterService {
    pub target: TypeKey,
    pub converter: Arc<dyn PropertyConverter>,
}

impl fmt::Debug for ConverterService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterService")
            .field("target", &self.target)
            .field("converter", &self.converter.name())
            .finish()
    }
}

/// Registry of default services keyed by service type.
#[derive(Default)]
pub struct ServiceEnvironment {
    services: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    names: HashMap<TypeId, &'static str>,
}

impl ServiceEnvironment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment offering the built-in converters.
    pub fn with_defaults() -> Self {
        let mut env = Self::new();
        for (target, converter) in builtin_converters() {
            env.register_converter(target, converter, 0);
        }
        env
    }

    /// Register a service instance.
    ///
    /// Services with equal priority are ordered by name.
    pub fn register_service<S>(&mut self, service: Arc<S>, priority: i32, name: impl Into<String>)
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::trace!(
            service_type = std::any::type_name::<S>(),
            service = %name,
            priority,
            "Registered service"
        );

        self.names
            .insert(TypeId::of::<S>(), std::any::type_name::<S>());
        let entries = self
            .services
            .entry(TypeId::of::<S>())
            .or_insert_with(|| Box::new(Vec::<ServiceEntry<S>>::new()) as Box<dyn Any + Send + Sync>)
            .downcast_mut::<Vec<ServiceEntry<S>>>();

        // Keyed by the TypeId of S, the downcast cannot fail
        if let Some(entries) = entries {
            entries.push(ServiceEntry {
                service,
                priority,
                name,
            });
            entries.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        }
    }

    /// All services of type `S`, highest priority first.
    pub fn services<S>(&self) -> Vec<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.services
            .get(&TypeId::of::<S>())
            .and_then(|entries| entries.downcast_ref::<Vec<ServiceEntry<S>>>())
            .map(|entries| entries.iter().map(|e| Arc::clone(&e.service)).collect())
            .unwrap_or_default()
    }

    /// The highest priority service of type `S`.
    pub fn service<S>(&self) -> Option<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.services::<S>().into_iter().next()
    }

    /// Offer a property source as a default.
    pub fn register_property_source(&mut self, source: Arc<dyn PropertySource>, priority: i32) {
        let name = source.name().to_string();
        self.register_service::<dyn PropertySource>(source, priority, name);
    }

    /// Offer a property filter as a default, using its own priority.
    pub fn register_property_filter(&mut self, filter: Arc<dyn PropertyFilter>) {
        let (priority, name) = (filter.priority(), filter.name().to_string());
        self.register_service::<dyn PropertyFilter>(filter, priority, name);
    }

    /// Offer a converter for `target` as a default.
    pub fn register_converter(
        &mut self,
        target: TypeKey,
        converter: Arc<dyn PropertyConverter>,
        priority: i32,
    ) {
        let name = format!("{}:{}", target.name(), converter.name());
        self.register_service(Arc::new(ConverterService { target, converter }), priority, name);
    }

    pub fn property_sources(&self) -> Vec<Arc<dyn PropertySource>> {
        self.services::<dyn PropertySource>()
    }

    pub fn property_filters(&self) -> Vec<Arc<dyn PropertyFilter>> {
        self.services::<dyn PropertyFilter>()
    }

    pub fn converters(&self) -> Vec<Arc<ConverterService>> {
        self.services::<ConverterService>()
    }
}

impl fmt::Debug for ServiceEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names.values().copied().collect();
        names.sort_unstable();
        f.debug_struct("ServiceEnvironment")
            .field("service_types", &names)
            .finish()
    }
}
