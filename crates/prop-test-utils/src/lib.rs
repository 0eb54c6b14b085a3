//! Shared test utilities for the property resolution workspace.
//!
//! Fixtures used by the integration suites of `prop-core` and the workspace
//! level tests. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`source`]: [`MapPropertySource`] in-memory source, optionally loaded from TOML
//! - [`filters`]: scripted filters with call counters
//! - [`converters`]: [`CountingConverter`] for observing converter dispatch

pub mod converters;
pub mod filters;
pub mod source;

pub use converters::CountingConverter;
pub use filters::ScriptedFilter;
pub use source::MapPropertySource;
