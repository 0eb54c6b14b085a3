//! The property value tree

use crate::{Error, META_SOURCE, PropertyValueBuilder, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The payload of a [`PropertyValue`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// A leaf with an optional string payload
    Scalar(Option<String>),
    /// Ordered child values, addressed as `key[0]`, `key[1]`, ...
    List(Vec<PropertyValue>),
    /// Key-unique child values in insertion order, addressed as `key.child`
    Map(Vec<PropertyValue>),
}

impl ValueKind {
    /// Human readable variant name
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Scalar(_) => "scalar",
            ValueKind::List(_) => "list",
            ValueKind::Map(_) => "map",
        }
    }
}

/// A single node in a property value tree
///
/// Equality compares key, payload and metadata; the version counter and the
/// mutability flag are bookkeeping and do not participate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "PropertyValueRepr")]
pub struct PropertyValue {
    key: String,
    kind: ValueKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    version: u64,
    #[serde(default)]
    immutable: bool,
    /// Qualified key assigned by the owning parent, `None` for roots
    #[serde(skip)]
    path: Option<String>,
}

#[derive(Deserialize)]
struct PropertyValueRepr {
    key: String,
    kind: ValueKind,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    version: u64,
    #[serde(default)]
    immutable: bool,
}

impl From<PropertyValueRepr> for PropertyValue {
    fn from(repr: PropertyValueRepr) -> Self {
        let mut value = Self {
            key: repr.key,
            kind: repr.kind,
            metadata: repr.metadata,
            version: repr.version,
            immutable: repr.immutable,
            path: None,
        };
        value.refresh_paths();
        value
    }
}

impl PropertyValue {
    fn with_kind(key: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            key: key.into(),
            kind,
            metadata: BTreeMap::new(),
            version: 0,
            immutable: false,
            path: None,
        }
    }

    pub(crate) fn from_parts(
        key: String,
        value: Option<String>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        let mut pv = Self::with_kind(key, ValueKind::Scalar(value));
        pv.metadata = metadata;
        pv
    }

    /// Create a scalar value
    pub fn scalar(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_kind(key, ValueKind::Scalar(Some(value.into())))
    }

    /// Create a scalar without payload
    pub fn empty(key: impl Into<String>) -> Self {
        Self::with_kind(key, ValueKind::Scalar(None))
    }

    /// Create a scalar value tagged with the name of its property source
    pub fn of(key: impl Into<String>, value: impl Into<String>, source: impl Into<String>) -> Self {
        let mut pv = Self::scalar(key, value);
        pv.metadata.insert(META_SOURCE.to_string(), source.into());
        pv
    }

    /// Create an empty list value
    pub fn list(key: impl Into<String>) -> Self {
        Self::with_kind(key, ValueKind::List(Vec::new()))
    }

    /// Create an empty map value
    pub fn map(key: impl Into<String>) -> Self {
        Self::with_kind(key, ValueKind::Map(Vec::new()))
    }

    /// Start building a scalar value
    pub fn builder(key: impl Into<String>) -> PropertyValueBuilder {
        PropertyValueBuilder::new(key)
    }

    /// The local key of this node
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The fully qualified key, e.g. `server.hosts[1]`
    ///
    /// Roots return their own key.
    pub fn qualified_key(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.key)
    }

    /// The payload variant
    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// The scalar payload, `None` for containers and empty scalars
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Scalar(value) => value.as_deref(),
            _ => None,
        }
    }

    /// Name of the property source this value came from
    pub fn source(&self) -> Option<&str> {
        self.meta(META_SOURCE)
    }

    /// Look up a single metadata entry
    pub fn meta(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).map(String::as_str)
    }

    /// All metadata entries
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Number of successful mutations applied to this node
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// `true` for scalars
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, ValueKind::Scalar(_))
    }

    /// Child values; empty for scalars
    pub fn children(&self) -> &[PropertyValue] {
        match &self.kind {
            ValueKind::Scalar(_) => &[],
            ValueKind::List(items) => items,
            ValueKind::Map(fields) => fields,
        }
    }

    /// Find a direct child by key (maps) or by index (lists)
    pub fn child(&self, key: &str) -> Option<&PropertyValue> {
        match &self.kind {
            ValueKind::Scalar(_) => None,
            ValueKind::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            ValueKind::Map(fields) => fields.iter().find(|f| f.key == key),
        }
    }

    /// Number of direct children
    pub fn len(&self) -> usize {
        self.children().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children().is_empty()
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.immutable {
            return Err(Error::Immutable {
                key: self.qualified_key().to_string(),
            });
        }
        Ok(())
    }

    /// Replace the scalar payload
    pub fn set_value(&mut self, value: Option<String>) -> Result<()> {
        self.ensure_mutable()?;
        match &mut self.kind {
            ValueKind::Scalar(current) => {
                *current = value;
                self.version += 1;
                Ok(())
            }
            _ => Err(Error::WrongKind {
                key: self.key.clone(),
                expected: "scalar",
            }),
        }
    }

    /// Set a metadata entry
    pub fn set_meta(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.ensure_mutable()?;
        self.metadata.insert(name.into(), value.into());
        self.version += 1;
        Ok(())
    }

    /// Remove a metadata entry, returning its previous value
    pub fn remove_meta(&mut self, name: &str) -> Result<Option<String>> {
        self.ensure_mutable()?;
        let removed = self.metadata.remove(name);
        if removed.is_some() {
            self.version += 1;
        }
        Ok(removed)
    }

    /// Add or replace a field of a map value
    ///
    /// A field with the same key is replaced in place, keeping its position.
    pub fn set_field(&mut self, mut child: PropertyValue) -> Result<&mut PropertyValue> {
        self.ensure_mutable()?;
        let base = self.qualified_key().to_string();
        let ValueKind::Map(fields) = &mut self.kind else {
            return Err(Error::WrongKind {
                key: self.key.clone(),
                expected: "map",
            });
        };

        child.path = Some(join_key(&base, &child.key));
        child.refresh_paths();

        let index = match fields.iter().position(|f| f.key == child.key) {
            Some(existing) => {
                fields[existing] = child;
                existing
            }
            None => {
                fields.push(child);
                fields.len() - 1
            }
        };
        self.version += 1;
        Ok(&mut fields[index])
    }

    /// Append an element to a list value
    pub fn add_value(&mut self, mut child: PropertyValue) -> Result<&mut PropertyValue> {
        self.ensure_mutable()?;
        let base = self.qualified_key().to_string();
        let ValueKind::List(items) = &mut self.kind else {
            return Err(Error::WrongKind {
                key: self.key.clone(),
                expected: "list",
            });
        };

        child.path = Some(format!("{}[{}]", base, items.len()));
        child.refresh_paths();
        items.push(child);
        self.version += 1;
        let last = items.len() - 1;
        Ok(&mut items[last])
    }

    /// Attach a child to this container, re-parenting it
    ///
    /// Maps treat the child as a field, lists append it.
    pub fn attach(&mut self, child: PropertyValue) -> Result<&mut PropertyValue> {
        match self.kind {
            ValueKind::Map(_) => self.set_field(child),
            ValueKind::List(_) => self.add_value(child),
            ValueKind::Scalar(_) => Err(Error::WrongKind {
                key: self.key.clone(),
                expected: "list or map",
            }),
        }
    }

    /// Attach a new, empty map child
    pub fn add_object(&mut self, key: impl Into<String>) -> Result<&mut PropertyValue> {
        self.attach(PropertyValue::map(key))
    }

    /// Attach a new, empty list child
    pub fn add_list(&mut self, key: impl Into<String>) -> Result<&mut PropertyValue> {
        self.attach(PropertyValue::list(key))
    }

    /// Freeze this node and all of its descendants
    pub fn freeze(&mut self) {
        self.immutable = true;
        match &mut self.kind {
            ValueKind::Scalar(_) => {}
            ValueKind::List(children) | ValueKind::Map(children) => {
                children.iter_mut().for_each(PropertyValue::freeze);
            }
        }
    }

    /// A frozen deep copy
    pub fn immutable(&self) -> Self {
        let mut copy = self.clone();
        copy.freeze();
        copy
    }

    /// A mutable deep copy
    pub fn mutable(&self) -> Self {
        let mut copy = self.clone();
        copy.thaw();
        copy
    }

    fn thaw(&mut self) {
        self.immutable = false;
        match &mut self.kind {
            ValueKind::Scalar(_) => {}
            ValueKind::List(children) | ValueKind::Map(children) => {
                children.iter_mut().for_each(PropertyValue::thaw);
            }
        }
    }

    /// A mutable scalar copy carrying `value`
    ///
    /// Key, qualified key and metadata are preserved. The result is always a
    /// scalar, even when called on a container.
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            key: self.key.clone(),
            kind: ValueKind::Scalar(Some(value.into())),
            metadata: self.metadata.clone(),
            version: self.version + 1,
            immutable: false,
            path: self.path.clone(),
        }
    }

    /// Flatten all leaves into `qualified.key -> value` pairs
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.to_map_under(self.qualified_key())
    }

    /// Like [`to_map`](Self::to_map), rooted at `prefix` instead of the
    /// value's own qualified key
    pub fn to_map_under(&self, prefix: &str) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        self.flatten_into(prefix, &mut out);
        out
    }

    /// Scalar payloads of the direct children keyed by local key
    ///
    /// A scalar maps to itself.
    pub fn to_local_map(&self) -> BTreeMap<String, String> {
        match &self.kind {
            ValueKind::Scalar(Some(value)) => BTreeMap::from([(self.key.clone(), value.clone())]),
            ValueKind::Scalar(None) => BTreeMap::new(),
            ValueKind::Map(fields) => fields
                .iter()
                .filter_map(|f| f.value().map(|v| (f.key.clone(), v.to_string())))
                .collect(),
            ValueKind::List(items) => items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| item.value().map(|v| (i.to_string(), v.to_string())))
                .collect(),
        }
    }

    fn flatten_into(&self, prefix: &str, out: &mut BTreeMap<String, String>) {
        match &self.kind {
            ValueKind::Scalar(Some(value)) => {
                out.insert(prefix.to_string(), value.clone());
            }
            ValueKind::Scalar(None) => {}
            ValueKind::Map(fields) => {
                for field in fields {
                    field.flatten_into(&join_key(prefix, &field.key), out);
                }
            }
            ValueKind::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.flatten_into(&format!("{}[{}]", prefix, i), out);
                }
            }
        }
    }

    /// Recompute the qualified keys of every descendant
    fn refresh_paths(&mut self) {
        let base = self.qualified_key().to_string();
        match &mut self.kind {
            ValueKind::Scalar(_) => {}
            ValueKind::Map(fields) => {
                for field in fields.iter_mut() {
                    field.path = Some(join_key(&base, &field.key));
                    field.refresh_paths();
                }
            }
            ValueKind::List(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    item.path = Some(format!("{}[{}]", base, i));
                    item.refresh_paths();
                }
            }
        }
    }
}

fn join_key(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else if key.is_empty() {
        base.to_string()
    } else {
        format!("{}.{}", base, key)
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.kind == other.kind && self.metadata == other.metadata
    }
}

impl Eq for PropertyValue {}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Scalar(Some(value)) => write!(f, "{}={}", self.qualified_key(), value),
            ValueKind::Scalar(None) => write!(f, "{}=<none>", self.qualified_key()),
            kind => write!(
                f,
                "{}=<{} of {}>",
                self.qualified_key(),
                kind.name(),
                self.len()
            ),
        }
    }
}
