//! Property value model
//!
//! Every stage of the resolution engine exchanges [`PropertyValue`] trees:
//! property sources produce them, combination policies fold them, filters
//! rewrite them and the configuration facade flattens them back to strings.
//!
//! A value is one of three variants:
//!
//! - **Scalar** - an optional string payload
//! - **List** - an ordered sequence of child values
//! - **Map** - key-unique, insertion-ordered child values
//!
//! Each value carries a metadata map (provenance, ordinal, timestamps), a
//! version counter bumped on every mutation and a mutability flag. Children
//! are owned by exactly one parent: attaching a child moves it into the new
//! owner and recomputes its qualified key.
//!
//! # Example
//!
//! ```
//! use prop_value::PropertyValue;
//!
//! let mut server = PropertyValue::map("server");
//! server.set_field(PropertyValue::scalar("port", "8080")).unwrap();
//!
//! let flat = server.to_map();
//! assert_eq!(flat["server.port"], "8080");
//! ```

mod builder;
pub mod error;
mod value;

pub use builder::PropertyValueBuilder;
pub use error::{Error, Result};
pub use value::{PropertyValue, ValueKind};

/// Metadata entry naming the property source a value came from
pub const META_SOURCE: &str = "source";

/// Metadata entry holding the ordinal of the contributing source
pub const META_ORDINAL: &str = "ordinal";

/// Metadata entry holding a creation timestamp
pub const META_TIMESTAMP: &str = "timestamp";
