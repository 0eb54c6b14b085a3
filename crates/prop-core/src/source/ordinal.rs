//! Ordinal resolution for property sources

use super::PropertySource;

/// Reserved key a source may expose to declare its own ordinal
pub const ORDINAL_KEY: &str = "tamaya.ordinal";

/// Ordinal of a source that declares nothing
pub const DEFAULT_ORDINAL: i32 = 0;

/// Computes the ordinal of a property source
///
/// Strategies are tried in order and the first applicable one wins:
///
/// 1. the source's own entry under the ordinal key, parsed as an integer
/// 2. the source's intrinsic [`PropertySource::ordinal`] override
/// 3. the source's [`PropertySource::declared_priority`]
/// 4. [`DEFAULT_ORDINAL`]
///
/// A malformed ordinal entry is logged and skipped, resolution never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdinalResolver {
    key: String,
}

impl Default for OrdinalResolver {
    fn default() -> Self {
        Self {
            key: ORDINAL_KEY.to_string(),
        }
    }
}

impl OrdinalResolver {
    /// Resolver reading the ordinal from a custom key
    pub fn with_key(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// The key consulted by the first strategy
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Resolve the ordinal of `source`
    pub fn resolve(&self, source: &dyn PropertySource) -> i32 {
        if let Some(entry) = source.get(&self.key) {
            match entry.value().map(|raw| raw.trim().parse::<i32>()) {
                Some(Ok(ordinal)) => return ordinal,
                Some(Err(err)) => tracing::debug!(
                    source = source.name(),
                    key = %self.key,
                    value = entry.value().unwrap_or_default(),
                    %err,
                    "Ignoring unparseable ordinal entry"
                ),
                None => tracing::debug!(
                    source = source.name(),
                    key = %self.key,
                    "Ignoring ordinal entry without a scalar value"
                ),
            }
        }

        if let Some(ordinal) = source.ordinal() {
            return ordinal;
        }

        if let Some(priority) = source.declared_priority() {
            return priority;
        }

        DEFAULT_ORDINAL
    }
}

/// Resolve the ordinal of `source` using the default `tamaya.ordinal` key
pub fn ordinal(source: &dyn PropertySource) -> i32 {
    OrdinalResolver::default().resolve(source)
}

/// Resolve the ordinal of `source`, reading the override from `key`
pub fn ordinal_with_key(source: &dyn PropertySource, key: &str) -> i32 {
    OrdinalResolver::with_key(key).resolve(source)
}
