//! Scripted property filters.
//!
//! Each filter counts its invocations so tests can assert how many passes
//! the pipeline made.

use prop_core::{FilterContext, FilterError, PropertyFilter, PropertyValue};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type Script = dyn Fn(PropertyValue, &FilterContext<'_>) -> Result<Option<PropertyValue>, FilterError>
    + Send
    + Sync;

/// A filter driven by a closure.
pub struct ScriptedFilter {
    name: String,
    priority: i32,
    calls: AtomicUsize,
    script: Box<Script>,
}

impl ScriptedFilter {
    pub fn new<F>(name: &str, script: F) -> Self
    where
        F: Fn(PropertyValue, &FilterContext<'_>) -> Result<Option<PropertyValue>, FilterError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.to_string(),
            priority: 0,
            calls: AtomicUsize::new(0),
            script: Box::new(script),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Number of times the filter has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Replace the value of `key` with `replacement`.
    pub fn replace(key: &str, replacement: &str) -> Self {
        let (key, replacement) = (key.to_string(), replacement.to_string());
        Self::new(&format!("replace:{}", key), move |value, ctx| {
            if ctx.key() == key {
                Ok(Some(value.with_value(replacement.as_str())))
            } else {
                Ok(Some(value))
            }
        })
    }

    /// Remove `key` from the result.
    pub fn remove(key: &str) -> Self {
        let key = key.to_string();
        Self::new(&format!("remove:{}", key), move |value, ctx| {
            if ctx.key() == key {
                Ok(None)
            } else {
                Ok(Some(value))
            }
        })
    }

    /// Append a marker on every pass, so the chain never settles.
    pub fn always_changing() -> Self {
        Self::new("always-changing", |value, _| {
            let next = format!("{}+", value.value().unwrap_or_default());
            Ok(Some(value.with_value(next)))
        })
    }

    /// Fail on every invocation.
    pub fn failing() -> Self {
        Self::new("failing", |_, ctx| {
            Err(FilterError::new(format!("refusing to filter {}", ctx.key())))
        })
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl PropertyFilter for ScriptedFilter {
    fn filter_property(
        &self,
        value: PropertyValue,
        context: &FilterContext<'_>,
    ) -> Result<Option<PropertyValue>, FilterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(value, context)
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn name(&self) -> &str {
        &self.name
    }
}
