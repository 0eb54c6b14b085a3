//! Type identities, type hierarchy and converter synthesis
//!
//! Rust has no runtime reflection, so everything the converter registry
//! needs to know about a type beyond its identity is declared up front in a
//! [`TypeCatalog`]:
//!
//! - its supertype chain and the "interfaces" (usually `dyn Trait` keys) it
//!   implements, walked when no converter is registered for the type itself
//! - equivalent types whose converters can be reused through an adapter
//! - how to build a converter on demand: enumerations, named string
//!   factories and string constructors
//!
//! Types that are not declared are never synthesised.

use super::builtin::ParseConverter;
use super::{ConversionContext, ConvertedValue, PropertyConverter};
use crate::ConverterError;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

/// Factory names probed during synthesis, in order of preference
pub const FACTORY_METHODS: [&str; 7] = [
    "of",
    "value_of",
    "instance_of",
    "get_instance",
    "from",
    "from_string",
    "parse",
];

/// Identity of a conversion target
///
/// Works for unsized types, so `TypeKey::of::<dyn Trait>()` can stand for an
/// interface in a type hierarchy. Equality and hashing use the [`TypeId`]
/// only; the name is for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check whether this key identifies `T`
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Position of a type in the declared type hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    key: TypeKey,
    superclass: Option<TypeKey>,
    interfaces: Vec<TypeKey>,
}

impl TypeDescriptor {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            superclass: None,
            interfaces: Vec::new(),
        }
    }

    /// Declare the direct supertype
    pub fn extends<P: ?Sized + 'static>(mut self) -> Self {
        self.superclass = Some(TypeKey::of::<P>());
        self
    }

    /// Declare a directly implemented interface
    pub fn implements<I: ?Sized + 'static>(mut self) -> Self {
        let key = TypeKey::of::<I>();
        if !self.interfaces.contains(&key) {
            self.interfaces.push(key);
        }
        self
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn superclass(&self) -> Option<TypeKey> {
        self.superclass
    }

    pub fn interfaces(&self) -> &[TypeKey] {
        &self.interfaces
    }
}

/// An enumeration whose members can be parsed by name
///
/// Matching is case-insensitive on the trimmed input.
pub trait ConfigEnum: Sized + Clone + Send + Sync + 'static {
    /// All members in declaration order
    fn variants() -> &'static [Self];

    /// Canonical name of this member
    fn variant_name(&self) -> &str;
}

type Adapter = Arc<dyn Fn(ConvertedValue) -> Option<ConvertedValue> + Send + Sync>;

/// A type whose converters may stand in for another one
#[derive(Clone)]
pub(crate) struct Equivalence {
    pub(crate) source: TypeKey,
    adapt: Adapter,
}

/// Startup-built description of the types the registry may convert to
#[derive(Clone, Default)]
pub struct TypeCatalog {
    descriptors: HashMap<TypeKey, TypeDescriptor>,
    equivalences: HashMap<TypeKey, Equivalence>,
    enumerations: HashMap<TypeKey, Arc<dyn PropertyConverter>>,
    factories: HashMap<TypeKey, Vec<(&'static str, Arc<dyn PropertyConverter>)>>,
    constructors: HashMap<TypeKey, Arc<dyn PropertyConverter>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the supertype and interfaces of a type
    pub fn declare(mut self, descriptor: TypeDescriptor) -> Self {
        self.descriptors.insert(descriptor.key(), descriptor);
        self
    }

    /// Reuse converters registered for `S` when converting to `T`
    pub fn equivalent<T, S>(mut self, adapt: fn(S) -> T) -> Self
    where
        T: Any + Send + Sync,
        S: Any + Send + Sync,
    {
        let adapter: Adapter = Arc::new(move |value: ConvertedValue| {
            value
                .downcast::<S>()
                .ok()
                .map(|source| Box::new(adapt(*source)) as ConvertedValue)
        });
        self.equivalences.insert(
            TypeKey::of::<T>(),
            Equivalence {
                source: TypeKey::of::<S>(),
                adapt: adapter,
            },
        );
        self
    }

    /// Allow synthesising a case-insensitive member converter for `E`
    pub fn enumeration<E: ConfigEnum>(mut self) -> Self {
        self.enumerations
            .insert(TypeKey::of::<E>(), Arc::new(EnumConverter::<E>::new()));
        self
    }

    /// Declare a named string factory for `T`
    ///
    /// Only names listed in [`FACTORY_METHODS`] are considered during
    /// synthesis; when several are declared the earliest listed wins.
    pub fn factory<T, F, E>(mut self, name: &'static str, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: fmt::Display + 'static,
    {
        if !FACTORY_METHODS.contains(&name) {
            tracing::debug!(
                target_type = std::any::type_name::<T>(),
                factory = name,
                "Factory name is not probed during synthesis"
            );
        }
        let converter: Arc<dyn PropertyConverter> = Arc::new(FactoryConverter {
            name: format!("{}::{}", short_name::<T>(), name),
            factory,
            _marker: PhantomData,
        });
        self.factories
            .entry(TypeKey::of::<T>())
            .or_default()
            .push((name, converter));
        self
    }

    /// Declare an infallible string constructor for `T`
    pub fn constructor<T, F>(mut self, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&str) -> T + Send + Sync + 'static,
    {
        let converter = FactoryConverter {
            name: format!("{}::new", short_name::<T>()),
            factory: move |raw: &str| Ok::<T, ConverterError>(constructor(raw)),
            _marker: PhantomData,
        };
        self.constructors
            .insert(TypeKey::of::<T>(), Arc::new(converter));
        self
    }

    /// Use the [`FromStr`] implementation of `T` as its string constructor
    pub fn parsable<T>(mut self) -> Self
    where
        T: FromStr + Any + Send + Sync,
        T::Err: fmt::Display,
    {
        self.constructors
            .insert(TypeKey::of::<T>(), Arc::new(ParseConverter::<T>::new()));
        self
    }

    pub fn descriptor(&self, key: TypeKey) -> Option<&TypeDescriptor> {
        self.descriptors.get(&key)
    }

    pub(crate) fn equivalence(&self, key: TypeKey) -> Option<&Equivalence> {
        self.equivalences.get(&key)
    }

    /// Ancestors of `key`, nearest first
    ///
    /// The supertype chain comes first, then every implemented interface in
    /// breadth-first order: interfaces of the type itself, then those of its
    /// supertypes, then the interfaces those extend.
    pub fn ancestors(&self, key: TypeKey) -> Vec<TypeKey> {
        let mut visited = HashSet::from([key]);
        let mut chain = Vec::new();

        let mut current = self.descriptor(key).and_then(TypeDescriptor::superclass);
        while let Some(parent) = current {
            if !visited.insert(parent) {
                break;
            }
            chain.push(parent);
            current = self.descriptor(parent).and_then(TypeDescriptor::superclass);
        }

        let mut queue: VecDeque<TypeKey> = std::iter::once(key)
            .chain(chain.iter().copied())
            .filter_map(|k| self.descriptor(k))
            .flat_map(|d| d.interfaces().iter().copied())
            .collect();

        let mut ancestors = chain;
        while let Some(interface) = queue.pop_front() {
            if !visited.insert(interface) {
                continue;
            }
            ancestors.push(interface);
            if let Some(descriptor) = self.descriptor(interface) {
                queue.extend(descriptor.interfaces().iter().copied());
                queue.extend(descriptor.superclass());
            }
        }
        ancestors
    }

    /// Build a converter for a type without registered converters
    ///
    /// Tries the declared enumeration, then the factories in
    /// [`FACTORY_METHODS`] order, then the string constructor. `String`
    /// never gets a synthesised converter.
    pub fn synthesize(&self, key: TypeKey) -> Option<Arc<dyn PropertyConverter>> {
        if key.is::<String>() {
            return None;
        }

        if let Some(converter) = self.enumerations.get(&key) {
            return Some(Arc::clone(converter));
        }

        if let Some(factories) = self.factories.get(&key) {
            let found = FACTORY_METHODS.iter().find_map(|candidate| {
                factories
                    .iter()
                    .find(|(name, _)| name == candidate)
                    .map(|(_, converter)| Arc::clone(converter))
            });
            if found.is_some() {
                return found;
            }
        }

        self.constructors.get(&key).map(Arc::clone)
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("descriptors", &self.descriptors.len())
            .field("equivalences", &self.equivalences.len())
            .field("enumerations", &self.enumerations.len())
            .field("factories", &self.factories.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

fn short_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

/// Converter reusing another type's converter through an adapter
pub(crate) struct AdaptedConverter {
    inner: Arc<dyn PropertyConverter>,
    adapt: Adapter,
}

impl AdaptedConverter {
    pub(crate) fn new(inner: Arc<dyn PropertyConverter>, equivalence: &Equivalence) -> Self {
        Self {
            inner,
            adapt: Arc::clone(&equivalence.adapt),
        }
    }
}

impl PropertyConverter for AdaptedConverter {
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError> {
        match self.inner.convert(value, context)? {
            Some(converted) => (self.adapt)(converted).map(Some).ok_or_else(|| {
                ConverterError::new(format!(
                    "{} returned a value of an unexpected type",
                    self.inner.name()
                ))
            }),
            None => Ok(None),
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Case-insensitive member lookup for a [`ConfigEnum`]
pub(crate) struct EnumConverter<E> {
    name: String,
    _marker: PhantomData<fn() -> E>,
}

impl<E: ConfigEnum> EnumConverter<E> {
    pub(crate) fn new() -> Self {
        Self {
            name: format!("EnumConverter<{}>", short_name::<E>()),
            _marker: PhantomData,
        }
    }
}

impl<E: ConfigEnum> PropertyConverter for EnumConverter<E> {
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError> {
        let names: Vec<&str> = E::variants().iter().map(ConfigEnum::variant_name).collect();
        context.add_supported_formats(&self.name, &names);

        let trimmed = value.trim();
        Ok(E::variants()
            .iter()
            .find(|variant| variant.variant_name().eq_ignore_ascii_case(trimmed))
            .map(|variant| Box::new(variant.clone()) as ConvertedValue))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wraps a fallible string factory
struct FactoryConverter<T, F, E> {
    name: String,
    factory: F,
    _marker: PhantomData<fn() -> Result<T, E>>,
}

impl<T, F, E> PropertyConverter for FactoryConverter<T, F, E>
where
    T: Any + Send + Sync,
    F: Fn(&str) -> Result<T, E> + Send + Sync,
    E: fmt::Display,
{
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError> {
        context.add_supported_formats(&self.name, &["<String>"]);
        (self.factory)(value)
            .map(|converted| Some(Box::new(converted) as ConvertedValue))
            .map_err(|err| ConverterError::new(format!("{}: {}", self.name, err)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
