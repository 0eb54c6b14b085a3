use prop_core::source::ordinal;
use prop_core::{Configuration, ConfigurationContextBuilder, PropertySource, SourceRegistry};
use prop_test_utils::MapPropertySource;
use proptest::prelude::*;
use std::sync::Arc;

fn sources(ordinals: &[i32]) -> Vec<Arc<dyn PropertySource>> {
    ordinals
        .iter()
        .enumerate()
        .map(|(i, ordinal)| {
            let name = format!("s{}", i);
            Arc::new(
                MapPropertySource::new(&name, &[("k", name.as_str())]).with_ordinal(*ordinal),
            ) as Arc<dyn PropertySource>
        })
        .collect()
}

proptest! {
    #[test]
    fn test_registry_is_sorted_ascending(ordinals in prop::collection::vec(-1000i32..1000, 0..16)) {
        let registry = SourceRegistry::new(sources(&ordinals));

        prop_assert_eq!(registry.len(), ordinals.len());
        let resolved: Vec<i32> = registry.iter().map(|(_, ordinal)| ordinal).collect();
        prop_assert!(resolved.windows(2).all(|pair| pair[0] <= pair[1]));
        for (source, resolved) in registry.iter() {
            prop_assert_eq!(ordinal(source.as_ref()), resolved);
        }
    }

    #[test]
    fn test_most_significant_source_wins(ordinals in prop::collection::vec(-1000i32..1000, 1..16)) {
        let mut builder = ConfigurationContextBuilder::new();
        builder.add_property_sources(sources(&ordinals)).unwrap();
        let config = Configuration::new(builder.build().unwrap());

        // Every source has the same type, so the last inserted of the
        // highest ordinal is the most significant one
        let max = *ordinals.iter().max().unwrap();
        let winner = ordinals.iter().rposition(|o| *o == max).unwrap();
        prop_assert_eq!(config.get("k"), Some(format!("s{}", winner)));
    }

    #[test]
    fn test_insertion_order_does_not_matter_for_distinct_ordinals(
        ordinals in prop::collection::hash_set(-1000i32..1000, 1..16)
    ) {
        let ordinals: Vec<i32> = ordinals.into_iter().collect();
        let mut reversed = sources(&ordinals);
        reversed.reverse();

        let forward = SourceRegistry::new(sources(&ordinals));
        let backward = SourceRegistry::new(reversed);
        prop_assert_eq!(forward.names(), backward.names());
    }
}
