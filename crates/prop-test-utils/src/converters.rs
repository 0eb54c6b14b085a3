//! Converter fixtures.

use parking_lot::Mutex;
use prop_core::{ConversionContext, ConvertedValue, ConverterError, PropertyConverter};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type Parse<T> = dyn Fn(&str) -> Option<T> + Send + Sync;

/// A converter that records how often it was asked to convert.
pub struct CountingConverter<T> {
    name: String,
    formats: Mutex<Vec<&'static str>>,
    calls: AtomicUsize,
    parse: Box<Parse<T>>,
}

impl<T: Any + Send + Sync> CountingConverter<T> {
    pub fn new<F>(name: &str, parse: F) -> Arc<Self>
    where
        F: Fn(&str) -> Option<T> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.to_string(),
            formats: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            parse: Box::new(parse),
        })
    }

    /// A converter that never understands its input.
    pub fn declining(name: &str) -> Arc<Self> {
        Self::new(name, |_| None)
    }

    /// Number of conversions attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<T> CountingConverter<T> {
    /// Formats reported to the conversion context on every call.
    ///
    /// Applies to every handle of this converter, including clones taken
    /// before the call.
    pub fn with_formats(self: Arc<Self>, formats: &[&'static str]) -> Arc<Self> {
        self.formats.lock().extend_from_slice(formats);
        self
    }
}

impl<T: Any + Send + Sync> PropertyConverter for CountingConverter<T> {
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let formats = self.formats.lock();
        if !formats.is_empty() {
            context.add_supported_formats(&self.name, &formats);
        }
        drop(formats);
        Ok((self.parse)(value).map(|converted| Box::new(converted) as ConvertedValue))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
