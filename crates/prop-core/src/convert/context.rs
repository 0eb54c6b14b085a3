//! Per-conversion diagnostics record

use super::TypeKey;
use crate::configuration::Configuration;
use parking_lot::Mutex;
use std::fmt;

/// Record of one conversion attempt
///
/// Converters append human readable "supported formats" entries while they
/// try the raw value. When no converter succeeds the accumulated entries are
/// reported in [`Error::Unconvertible`](crate::Error::Unconvertible).
/// Entries are appended through `&self` and may come from several threads.
pub struct ConversionContext<'a> {
    key: Option<String>,
    target: TypeKey,
    configuration: Option<&'a Configuration>,
    supported_formats: Mutex<Vec<String>>,
}

impl<'a> ConversionContext<'a> {
    /// Context for converting to `target`
    pub fn new(target: TypeKey) -> Self {
        Self {
            key: None,
            target,
            configuration: None,
            supported_formats: Mutex::new(Vec::new()),
        }
    }

    /// Context for converting to `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>())
    }

    /// Record the key whose value is being converted
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Record the configuration the value was read from
    pub fn with_configuration(mut self, configuration: &'a Configuration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// The requested target type
    pub fn target(&self) -> TypeKey {
        self.target
    }

    /// The configuration being read, if any
    ///
    /// Converters may use it to resolve related keys.
    pub fn configuration(&self) -> Option<&'a Configuration> {
        self.configuration
    }

    /// Record formats understood by `converter`
    ///
    /// Each entry is stored as `"<format> (<converter>)"`; duplicates are
    /// dropped.
    pub fn add_supported_formats(&self, converter: &str, formats: &[&str]) {
        let mut supported = self.supported_formats.lock();
        for format in formats {
            let entry = format!("{} ({})", format, converter);
            if !supported.contains(&entry) {
                supported.push(entry);
            }
        }
    }

    /// Formats recorded so far, in insertion order
    pub fn supported_formats(&self) -> Vec<String> {
        self.supported_formats.lock().clone()
    }
}

impl fmt::Debug for ConversionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionContext")
            .field("key", &self.key)
            .field("target", &self.target)
            .field("supported_formats", &*self.supported_formats.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    #[test]
    fn test_formats_are_deduplicated() {
        let context = ConversionContext::of::<u32>().with_key("port");
        context.add_supported_formats("IntegerConverter", &["<int>", "MAX"]);
        context.add_supported_formats("IntegerConverter", &["<int>"]);

        assert_eq!(context.key(), Some("port"));
        assert_eq!(
            context.supported_formats(),
            vec!["<int> (IntegerConverter)", "MAX (IntegerConverter)"]
        );
    }

    #[test]
    fn test_formats_from_many_threads() {
        let context = ConversionContext::of::<String>();
        thread::scope(|scope| {
            for i in 0..8 {
                let context = &context;
                scope.spawn(move || {
                    context.add_supported_formats(&format!("c{}", i), &["<fmt>"]);
                });
            }
        });
        assert_eq!(context.supported_formats().len(), 8);
    }
}
