//! Property resolution engine
//!
//! Merges an ordered set of property sources into one value per key, runs
//! the merged values through a filter chain until they settle and converts
//! them to typed values on request.
//!
//! - **Sources**: [`PropertySource`] implementations ranked by ordinal and
//!   held in a [`SourceRegistry`], least significant first
//! - **Combination**: a [`CombinationPolicy`] folds the candidates of all
//!   sources for a key ([`OverridingPolicy`] by default: last one wins)
//! - **Filters**: [`PropertyFilter`]s applied by the [`FilterPipeline`] to a
//!   fixed point, bounded to [`MAX_FILTER_PASSES`] passes
//! - **Conversion**: a [`ConverterRegistry`] keyed by [`TypeKey`], with
//!   equivalent-type, hierarchy and [`TypeCatalog`] synthesis fallbacks
//! - **Facade**: [`Configuration`] over a published [`ConfigurationContext`]
//!
//! # Example
//!
//! ```
//! use prop_core::{Configuration, ConfigurationContextBuilder, ServiceEnvironment};
//!
//! let mut builder = ConfigurationContextBuilder::new();
//! builder
//!     .add_default_property_converters(&ServiceEnvironment::with_defaults())
//!     .unwrap();
//! let config = Configuration::new(builder.build().unwrap());
//!
//! assert_eq!(config.get("server.port"), None);
//! assert_eq!(config.convert::<u16>("server.port", "0x1F90").unwrap(), 8080);
//! ```

pub mod combine;
pub mod configuration;
pub mod context;
pub mod convert;
pub mod env;
pub mod error;
pub mod filter;
pub mod logging;
pub mod source;

pub use combine::{CombinationPolicy, ConcatenatingPolicy, OverridingPolicy};
pub use configuration::{Configuration, ConfigurationSnapshot};
pub use context::{ConfigurationContext, ConfigurationContextBuilder};
pub use convert::{
    ConfigEnum, ConversionContext, ConvertedValue, ConverterRegistry, FnConverter,
    PropertyConverter, TypeCatalog, TypeDescriptor, TypeKey, builtin_converters, converter_fn,
};
pub use env::{ConverterService, ServiceEnvironment};
pub use error::{ConverterError, Error, FilterError, Result};
pub use filter::{
    FilterContext, FilterPipeline, FilterScope, MAX_FILTER_PASSES, PropertyFilter, Relaxation,
};
pub use source::{
    ChangeSupport, DEFAULT_ORDINAL, ORDINAL_KEY, OrdinalResolver, PropertySource, SourceRegistry,
};

pub use prop_value::{PropertyValue, PropertyValueBuilder, ValueKind};
