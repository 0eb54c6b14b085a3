//! Ordered collection of property sources

use super::{OrdinalResolver, PropertySource};
use crate::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
struct Entry {
    source: Arc<dyn PropertySource>,
    ordinal: i32,
}

impl Entry {
    fn sort_key(&self) -> (i32, &'static str) {
        (self.ordinal, self.source.type_name())
    }
}

/// Property sources ordered by ascending ordinal
///
/// Ties are broken by [`PropertySource::type_name`]. The last entry is the
/// most significant: combination policies fold from first to last, so later
/// sources override earlier ones.
///
/// Ordinals are resolved once when a source is added. The explicit
/// reordering operations move entries without touching their ordinals.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    entries: Vec<Entry>,
    resolver: OrdinalResolver,
}

impl SourceRegistry {
    /// Create a registry holding `sources` in ordinal order
    pub fn new<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn PropertySource>>,
    {
        Self::with_resolver(OrdinalResolver::default(), sources)
    }

    /// Create a registry using a custom ordinal resolver
    pub fn with_resolver<I>(resolver: OrdinalResolver, sources: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn PropertySource>>,
    {
        let mut registry = Self {
            entries: Vec::new(),
            resolver,
        };
        for source in sources {
            registry.add(source);
        }
        registry
    }

    /// Insert a source at its ordinal position
    ///
    /// The source lands after every entry whose (ordinal, type name) is
    /// less than or equal to its own, so manual reorderings of existing
    /// entries survive. Returns `false` if a source with the same name is
    /// already registered.
    pub fn add(&mut self, source: Arc<dyn PropertySource>) -> bool {
        if self.contains(source.name()) {
            tracing::debug!(source = source.name(), "Ignoring duplicate property source");
            return false;
        }

        let entry = Entry {
            ordinal: self.resolver.resolve(source.as_ref()),
            source,
        };
        let position = self
            .entries
            .iter()
            .rposition(|e| e.sort_key() <= entry.sort_key())
            .map_or(0, |i| i + 1);

        tracing::trace!(
            source = entry.source.name(),
            ordinal = entry.ordinal,
            position,
            "Registered property source"
        );
        self.entries.insert(position, entry);
        true
    }

    /// Remove a source by name
    pub fn remove(&mut self, name: &str) -> Result<Arc<dyn PropertySource>> {
        let index = self.index_of(name)?;
        Ok(self.entries.remove(index).source)
    }

    /// Check whether a source with the given name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.source.name() == name)
    }

    /// Find a source by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn PropertySource>> {
        self.entries
            .iter()
            .find(|e| e.source.name() == name)
            .map(|e| &e.source)
    }

    /// The resolved ordinal of a registered source
    pub fn ordinal_of(&self, name: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|e| e.source.name() == name)
            .map(|e| e.ordinal)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.source.name() == name)
            .ok_or_else(|| Error::SourceNotFound {
                name: name.to_string(),
            })
    }

    /// Move a source one slot towards the most significant end
    pub fn increase_priority(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        if index + 1 < self.entries.len() {
            self.entries.swap(index, index + 1);
        }
        Ok(())
    }

    /// Move a source one slot towards the least significant end
    pub fn decrease_priority(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        if index > 0 {
            self.entries.swap(index - 1, index);
        }
        Ok(())
    }

    /// Make a source the most significant one
    pub fn highest_priority(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        let entry = self.entries.remove(index);
        self.entries.push(entry);
        Ok(())
    }

    /// Make a source the least significant one
    pub fn lowest_priority(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        let entry = self.entries.remove(index);
        self.entries.insert(0, entry);
        Ok(())
    }

    /// Re-sort all sources with a custom comparator (stable)
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&dyn PropertySource, &dyn PropertySource) -> Ordering,
    {
        self.entries
            .sort_by(|a, b| compare(a.source.as_ref(), b.source.as_ref()));
    }

    /// Restore the default ordinal order (stable)
    pub fn sort_by_ordinal(&mut self) {
        self.entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }

    /// Sources with their resolved ordinals, least significant first
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<dyn PropertySource>, i32)> {
        self.entries.iter().map(|e| (&e.source, e.ordinal))
    }

    /// Sources, least significant first
    pub fn sources(&self) -> Vec<Arc<dyn PropertySource>> {
        self.entries.iter().map(|e| Arc::clone(&e.source)).collect()
    }

    /// Source names, least significant first
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.source.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.source.name(), e.ordinal)))
            .finish()
    }
}
