//! In-memory property source fixture.

use prop_core::{ChangeSupport, PropertySource, PropertyValue};
use std::collections::BTreeMap;

/// A property source backed by a plain string map.
///
/// # Example
///
/// ```rust
/// use prop_core::PropertySource;
/// use prop_test_utils::MapPropertySource;
///
/// let source = MapPropertySource::new("defaults", &[("server.port", "80")]).with_ordinal(100);
/// assert_eq!(source.get("server.port").unwrap().value(), Some("80"));
/// assert_eq!(source.ordinal(), Some(100));
/// ```
#[derive(Debug, Clone)]
pub struct MapPropertySource {
    name: String,
    entries: BTreeMap<String, String>,
    ordinal: Option<i32>,
    priority: Option<i32>,
    scannable: bool,
    change_support: ChangeSupport,
}

impl MapPropertySource {
    /// Create a scannable source without an intrinsic ordinal.
    pub fn new(name: &str, entries: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            entries: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ordinal: None,
            priority: None,
            scannable: true,
            change_support: ChangeSupport::Immutable,
        }
    }

    /// Create a source from a TOML document.
    ///
    /// Tables are flattened to dotted keys and arrays to indexed keys, so
    /// `[server] port = 80` becomes `server.port` and `hosts = ["a"]`
    /// becomes `hosts[0]`.
    pub fn from_toml(name: &str, document: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = document.parse()?;
        let mut source = Self::new(name, &[]);
        flatten_table("", &table, &mut source.entries);
        Ok(source)
    }

    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Hide the entries from bulk enumeration.
    pub fn unscannable(mut self) -> Self {
        self.scannable = false;
        self
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> Option<i32> {
        self.ordinal
    }

    fn declared_priority(&self) -> Option<i32> {
        self.priority
    }

    fn get(&self, key: &str) -> Option<PropertyValue> {
        self.entries
            .get(key)
            .map(|value| PropertyValue::of(key, value.as_str(), self.name.as_str()))
    }

    fn properties(&self) -> BTreeMap<String, PropertyValue> {
        self.entries
            .iter()
            .map(|(key, value)| {
                (
                    key.clone(),
                    PropertyValue::of(key.as_str(), value.as_str(), self.name.as_str()),
                )
            })
            .collect()
    }

    fn is_scannable(&self) -> bool {
        self.scannable
    }

    fn change_support(&self) -> ChangeSupport {
        self.change_support
    }
}

fn flatten_table(prefix: &str, table: &toml::Table, out: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        flatten_value(path, value, out);
    }
}

fn flatten_value(path: String, value: &toml::Value, out: &mut BTreeMap<String, String>) {
    match value {
        toml::Value::Table(table) => flatten_table(&path, table, out),
        toml::Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(format!("{}[{}]", path, index), item, out);
            }
        }
        toml::Value::String(s) => {
            out.insert(path, s.clone());
        }
        other => {
            out.insert(path, other.to_string());
        }
    }
}
