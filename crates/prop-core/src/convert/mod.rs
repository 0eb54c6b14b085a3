//! Typed conversion of property values
//!
//! Converters are registered per target [`TypeKey`] in a
//! [`ConverterRegistry`]. A lookup tries, in order:
//!
//! 1. converters registered for the exact type
//! 2. converters of a declared equivalent type, adapted to the target
//! 3. converters of the nearest declared ancestor (supertypes first, then
//!    interfaces breadth-first)
//! 4. a converter synthesised from the [`TypeCatalog`], which is then
//!    registered for the exact type
//!
//! Converters are type erased: they return a boxed [`Any`] that the registry
//! downcasts to the requested type.

mod builtin;
mod context;
mod registry;
mod types;

pub use builtin::builtin_converters;
pub use context::ConversionContext;
pub use registry::ConverterRegistry;
pub use types::{ConfigEnum, FACTORY_METHODS, TypeCatalog, TypeDescriptor, TypeKey};

use crate::ConverterError;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// A type-erased conversion result
pub type ConvertedValue = Box<dyn Any + Send + Sync>;

/// Parses raw strings into values of one target type
pub trait PropertyConverter: Send + Sync {
    /// Convert `value`
    ///
    /// `Ok(None)` means the input is not understood; converters should
    /// record the formats they accept in `context` before returning it.
    /// An `Err` is logged by the registry, which then tries the next
    /// converter.
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError>;

    fn name(&self) -> &str;
}

/// Converter backed by a typed closure
pub struct FnConverter<T, F> {
    name: String,
    convert: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> FnConverter<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&str, &ConversionContext<'_>) -> Result<Option<T>, ConverterError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, convert: F) -> Self {
        Self {
            name: name.into(),
            convert,
            _marker: PhantomData,
        }
    }
}

impl<T, F> PropertyConverter for FnConverter<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&str, &ConversionContext<'_>) -> Result<Option<T>, ConverterError> + Send + Sync,
{
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError> {
        Ok((self.convert)(value, context)?.map(|converted| Box::new(converted) as ConvertedValue))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a typed closure as a shareable converter
///
/// ```
/// use prop_core::{ConversionContext, converter_fn};
///
/// let hex = converter_fn("hex", |raw: &str, _: &ConversionContext<'_>| {
///     Ok(u32::from_str_radix(raw.trim_start_matches("0x"), 16).ok())
/// });
/// assert_eq!(hex.name(), "hex");
/// ```
pub fn converter_fn<T, F>(name: impl Into<String>, convert: F) -> Arc<dyn PropertyConverter>
where
    T: Any + Send + Sync,
    F: Fn(&str, &ConversionContext<'_>) -> Result<Option<T>, ConverterError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnConverter::new(name, convert))
}
