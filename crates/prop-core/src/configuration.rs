//! The configuration facade

use crate::Result;
use crate::context::ConfigurationContext;
use crate::convert::ConversionContext;
use chrono::{DateTime, Utc};
use prop_value::{PropertyValue, ValueKind};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;

/// Read access to a configuration context
///
/// Every lookup combines the sources, filters the result and, for typed
/// access, converts it. Nothing is cached between calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Configuration {
    context: ConfigurationContext,
}

impl From<ConfigurationContext> for Configuration {
    fn from(context: ConfigurationContext) -> Self {
        Self::new(context)
    }
}

impl Configuration {
    pub fn new(context: ConfigurationContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ConfigurationContext {
        &self.context
    }

    /// The filtered value of `key`, with metadata
    pub fn get_value(&self, key: &str) -> Option<PropertyValue> {
        let raw = self.context.evaluate_raw_value(key)?;
        self.context.filter_value(key, raw)
    }

    /// The filtered scalar value of `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_value(key)
            .and_then(|value| value.value().map(str::to_string))
    }

    pub fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// The value of `key` converted to `T`
    ///
    /// An absent key yields `Ok(None)` without consulting any converter.
    /// A present value that no converter understands yields
    /// [`Error::Unconvertible`](crate::Error::Unconvertible), except for
    /// `String` targets which get the raw value.
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Some(raw) => self.convert(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_as_or_default<T: Any + Send + Sync>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get_as(key)?.unwrap_or(default))
    }

    /// Convert a raw string as if it were the value of `key`
    pub fn convert<T: Any + Send + Sync>(&self, key: &str, raw: &str) -> Result<T> {
        let context = ConversionContext::of::<T>()
            .with_key(key)
            .with_configuration(self);
        self.context.converters().convert::<T>(raw, &context)
    }

    /// All filtered properties as flat strings
    ///
    /// Containers are flattened (`a.b`, `a[0]`). Each metadata entry of a
    /// value is listed as `_<key>.<name>` next to it.
    pub fn properties(&self) -> BTreeMap<String, String> {
        let raw = self.context.evaluate_raw_values();
        let filtered = self.context.filter_values(&raw);

        let mut flat = BTreeMap::new();
        for (key, value) in filtered {
            match value.kind() {
                ValueKind::Scalar(Some(scalar)) => {
                    flat.insert(key.clone(), scalar.clone());
                }
                ValueKind::Scalar(None) => {}
                ValueKind::List(_) | ValueKind::Map(_) => flat.extend(value.to_map_under(&key)),
            }
            for (name, meta) in value.metadata() {
                flat.insert(format!("_{}.{}", key, name), meta.clone());
            }
        }
        flat
    }

    /// Capture the current values of `keys`
    ///
    /// Absent keys are left out.
    pub fn snapshot<I, K>(&self, keys: I) -> ConfigurationSnapshot
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let properties = keys
            .into_iter()
            .filter_map(|key| {
                let key = key.as_ref();
                self.get(key).map(|value| (key.to_string(), value))
            })
            .collect();
        ConfigurationSnapshot {
            created_at: Utc::now(),
            properties,
        }
    }
}

/// Frozen set of property values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    pub created_at: DateTime<Utc>,
    pub properties: BTreeMap<String, String>,
}

impl ConfigurationSnapshot {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
