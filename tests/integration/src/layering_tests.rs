//! Workspace-level tests for deriving and extending contexts

use pretty_assertions::assert_eq;
use prop_core::{
    ConcatenatingPolicy, Configuration, ConfigurationContext, ConfigurationContextBuilder,
    PropertySource, ServiceEnvironment, TypeCatalog, TypeKey,
};
use prop_test_utils::{MapPropertySource, ScriptedFilter};
use prop_value::ValueKind;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Port(u16);

fn base_context() -> ConfigurationContext {
    let mut builder = ConfigurationContextBuilder::new();
    builder
        .add_property_sources([
            Arc::new(MapPropertySource::new("defaults", &[("port", "80"), ("tags", "base")]).with_ordinal(0))
                as Arc<dyn PropertySource>,
            Arc::new(MapPropertySource::new("site", &[("port", "8080"), ("tags", "site")]).with_ordinal(50)),
        ])
        .unwrap()
        .add_default_property_converters(&ServiceEnvironment::with_defaults())
        .unwrap()
        .set_type_catalog(TypeCatalog::new().equivalent::<Port, u16>(Port))
        .unwrap();
    builder.build().unwrap()
}

#[test]
fn test_derived_context_leaves_original_untouched() {
    let base = base_context();

    let mut builder = base.to_builder();
    builder
        .add_property_sources([Arc::new(
            MapPropertySource::new("local", &[("port", "3000")]).with_ordinal(90),
        ) as Arc<dyn PropertySource>])
        .unwrap()
        .add_property_filters([Arc::new(ScriptedFilter::replace("tags", "derived"))
            as Arc<dyn prop_core::PropertyFilter>])
        .unwrap();
    let derived = builder.build().unwrap();

    let base_config = Configuration::new(base.clone());
    let derived_config = Configuration::new(derived.clone());

    assert_eq!(base_config.get("port").as_deref(), Some("8080"));
    assert_eq!(derived_config.get("port").as_deref(), Some("3000"));
    assert_eq!(base_config.get("tags").as_deref(), Some("site"));
    assert_eq!(derived_config.get("tags").as_deref(), Some("derived"));
    assert_ne!(base, derived);
}

#[test]
fn test_equal_contexts_compare_structurally() {
    assert_eq!(base_context(), base_context());
}

#[test]
fn test_equivalent_type_reuses_converters() {
    let config = Configuration::new(base_context());

    assert_eq!(config.get_as::<Port>("port").unwrap(), Some(Port(8080)));
    assert_eq!(
        config.context().converters().converter_count(TypeKey::of::<Port>()),
        0
    );
}

#[test]
fn test_switching_policy_in_derived_context() {
    let mut builder = base_context().to_builder();
    builder
        .set_combination_policy(Arc::new(ConcatenatingPolicy::default()))
        .unwrap();
    let config = Configuration::new(builder.build().unwrap());

    assert_eq!(config.get("tags").as_deref(), Some("base,site"));
    assert_eq!(config.context().combination_policy().name(), "concatenating");
}

#[test]
fn test_container_values_flatten_in_listing() {
    struct Cluster;

    impl PropertySource for Cluster {
        fn name(&self) -> &str {
            "cluster"
        }

        fn get(&self, key: &str) -> Option<prop_core::PropertyValue> {
            self.properties().remove(key)
        }

        fn properties(&self) -> std::collections::BTreeMap<String, prop_core::PropertyValue> {
            let mut nodes = prop_core::PropertyValue::list("nodes");
            let _ = nodes.add_value(prop_core::PropertyValue::scalar("", "alpha"));
            let _ = nodes.add_value(prop_core::PropertyValue::scalar("", "beta"));
            std::collections::BTreeMap::from([("nodes".to_string(), nodes)])
        }
    }

    let mut builder = ConfigurationContextBuilder::new();
    builder
        .add_property_sources([Arc::new(Cluster) as Arc<dyn PropertySource>])
        .unwrap();
    let config = Configuration::new(builder.build().unwrap());

    let nodes = config.get_value("nodes").unwrap();
    assert!(matches!(nodes.kind(), ValueKind::List(items) if items.len() == 2));

    let props = config.properties();
    assert_eq!(props.get("nodes[0]").map(String::as_str), Some("alpha"));
    assert_eq!(props.get("nodes[1]").map(String::as_str), Some("beta"));
    assert_eq!(props.get("_nodes.source").map(String::as_str), Some("cluster"));
}
