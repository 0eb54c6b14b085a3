//! End-to-end integration test for the resolution pipeline
//!
//! This test exercises the complete flow: layered sources -> combination ->
//! filtering to a fixed point -> typed conversion -> snapshot.

use pretty_assertions::assert_eq;
use prop_core::{
    Configuration, ConfigurationContextBuilder, ConfigurationSnapshot, FilterContext,
    FilterError, FilterScope, PropertyFilter, PropertySource, PropertyValue, ServiceEnvironment,
};
use prop_test_utils::MapPropertySource;
use std::sync::Arc;
use std::time::Duration;

const APP_TOML: &str = r#"
[app]
name = "inventory"
home = "/srv/${app.name}"
data = "${app.home}/data"

[server]
port = 8080
timeout = "30s"

[db]
url = "postgres://${db.host}:${db.port}/inventory"
host = "localhost"
port = 5432
password = "changeme"
"#;

/// Expands `${key}` references against the combined raw values
struct PlaceholderFilter;

impl PlaceholderFilter {
    fn expand(raw: &str, context: &FilterContext<'_>) -> String {
        let mut out = String::new();
        let mut rest = raw;
        while let Some(start) = rest.find("${") {
            let Some(len) = rest[start + 2..].find('}') else {
                break;
            };
            let name = &rest[start + 2..start + 2 + len];
            out.push_str(&rest[..start]);
            match context
                .configuration_context()
                .evaluate_raw_value(name)
                .and_then(|value| value.value().map(str::to_string))
            {
                Some(resolved) => out.push_str(&resolved),
                None => out.push_str(&rest[start..start + 3 + len]),
            }
            rest = &rest[start + 3 + len..];
        }
        out.push_str(rest);
        out
    }
}

impl PropertyFilter for PlaceholderFilter {
    fn filter_property(
        &self,
        value: PropertyValue,
        context: &FilterContext<'_>,
    ) -> Result<Option<PropertyValue>, FilterError> {
        let Some(raw) = value.value() else {
            return Ok(Some(value));
        };
        if !raw.contains("${") {
            return Ok(Some(value));
        }
        let expanded = Self::expand(raw, context);
        Ok(Some(value.with_value(expanded)))
    }

    fn priority(&self) -> i32 {
        10
    }

    fn name(&self) -> &str {
        "placeholders"
    }
}

/// Hides secrets from bulk listings, single lookups still see them
struct MaskingFilter;

impl PropertyFilter for MaskingFilter {
    fn filter_property(
        &self,
        value: PropertyValue,
        context: &FilterContext<'_>,
    ) -> Result<Option<PropertyValue>, FilterError> {
        if context.scope() == FilterScope::Bulk && context.key().ends_with("password") {
            return Ok(Some(value.with_value("*****")));
        }
        Ok(Some(value))
    }

    fn name(&self) -> &str {
        "masking"
    }
}

fn configuration() -> Configuration {
    let file = MapPropertySource::from_toml("app.toml", APP_TOML)
        .unwrap()
        .with_ordinal(100);
    let environment = MapPropertySource::new(
        "environment",
        &[
            ("tamaya.ordinal", "300"),
            ("db.host", "db.internal"),
            ("server.port", "9090"),
        ],
    );

    let mut env = ServiceEnvironment::with_defaults();
    env.register_property_filter(Arc::new(PlaceholderFilter));
    env.register_property_filter(Arc::new(MaskingFilter));

    let mut builder = ConfigurationContextBuilder::new();
    builder
        .add_property_sources([
            Arc::new(file) as Arc<dyn PropertySource>,
            Arc::new(environment),
        ])
        .unwrap()
        .add_default_property_filters(&env)
        .unwrap()
        .add_default_property_converters(&env)
        .unwrap();
    Configuration::new(builder.build().unwrap())
}

#[test]
fn test_layered_lookup() {
    let config = configuration();

    assert_eq!(config.get("app.name").as_deref(), Some("inventory"));
    assert_eq!(config.get("server.port").as_deref(), Some("9090"));
    assert_eq!(config.get_value("server.port").unwrap().source(), Some("environment"));
    assert_eq!(config.get_value("app.name").unwrap().source(), Some("app.toml"));
}

#[test]
fn test_placeholders_resolve_across_passes() {
    let config = configuration();

    assert_eq!(config.get("app.home").as_deref(), Some("/srv/inventory"));
    assert_eq!(config.get("app.data").as_deref(), Some("/srv/inventory/data"));
    assert_eq!(
        config.get("db.url").as_deref(),
        Some("postgres://db.internal:5432/inventory")
    );
}

#[test]
fn test_typed_access() {
    let config = configuration();

    assert_eq!(config.get_as::<u16>("server.port").unwrap(), Some(9090));
    assert_eq!(
        config.get_as::<Duration>("server.timeout").unwrap(),
        Some(Duration::from_secs(30))
    );
    assert_eq!(config.get_as_or_default::<u32>("server.threads", 4).unwrap(), 4);
    assert!(config.get_as::<u16>("app.name").is_err());
}

#[test]
fn test_secrets_masked_in_listing_only() {
    let config = configuration();

    assert_eq!(config.get("db.password").as_deref(), Some("changeme"));

    let props = config.properties();
    assert_eq!(props.get("db.password").map(String::as_str), Some("*****"));
    assert_eq!(props.get("db.url").map(String::as_str), Some("postgres://db.internal:5432/inventory"));
    assert_eq!(props.get("_db.host.source").map(String::as_str), Some("environment"));
    assert_eq!(props.get("_db.host.ordinal").map(String::as_str), Some("300"));
}

#[test]
fn test_snapshot_serializes() {
    let config = configuration();
    let snapshot = config.snapshot(["app.data", "server.port", "missing"]);

    assert_eq!(snapshot.len(), 2);
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["properties"]["server.port"], "9090");

    let restored: ConfigurationSnapshot = serde_json::from_value(json).unwrap();
    assert_eq!(restored.get("app.data"), Some("/srv/inventory/data"));
}
