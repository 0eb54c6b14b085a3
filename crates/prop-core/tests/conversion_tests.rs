//! Tests for typed access and converter resolution

use prop_core::{
    ConfigEnum, Configuration, ConfigurationContextBuilder, ConversionContext, ConvertedValue,
    ConverterError, Error, PropertyConverter, PropertySource, ServiceEnvironment, TypeCatalog,
    TypeDescriptor, TypeKey,
};
use prop_test_utils::{CountingConverter, MapPropertySource};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundingMode {
    Up,
    Down,
    Ceiling,
    Floor,
    HalfUp,
}

impl ConfigEnum for RoundingMode {
    fn variants() -> &'static [Self] {
        &[
            RoundingMode::Up,
            RoundingMode::Down,
            RoundingMode::Ceiling,
            RoundingMode::Floor,
            RoundingMode::HalfUp,
        ]
    }

    fn variant_name(&self) -> &str {
        match self {
            RoundingMode::Up => "UP",
            RoundingMode::Down => "DOWN",
            RoundingMode::Ceiling => "CEILING",
            RoundingMode::Floor => "FLOOR",
            RoundingMode::HalfUp => "HALF_UP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Currency(String);

impl Currency {
    fn of(code: &str) -> Result<Self, String> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Currency(code.to_ascii_uppercase()))
        } else {
            Err(format!("not an ISO 4217 code: {}", code))
        }
    }
}

fn configuration(entries: &[(&str, &str)], catalog: TypeCatalog) -> Configuration {
    let mut builder = ConfigurationContextBuilder::new();
    builder
        .add_property_sources([Arc::new(MapPropertySource::new("test", entries)) as Arc<dyn PropertySource>])
        .unwrap()
        .add_default_property_converters(&ServiceEnvironment::with_defaults())
        .unwrap()
        .set_type_catalog(catalog)
        .unwrap();
    Configuration::new(builder.build().unwrap())
}

mod builtin_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_primitive_access() {
        let config = configuration(
            &[("port", "8080"), ("debug", "TRUE"), ("ratio", "0.25"), ("timeout", "1500ms")],
            TypeCatalog::new(),
        );

        assert_eq!(config.get_as::<u16>("port").unwrap(), Some(8080));
        assert_eq!(config.get_as::<bool>("debug").unwrap(), Some(true));
        assert_eq!(config.get_as::<f64>("ratio").unwrap(), Some(0.25));
        assert_eq!(
            config.get_as::<std::time::Duration>("timeout").unwrap(),
            Some(std::time::Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_absent_key_skips_conversion() {
        let counting = CountingConverter::<u8>::declining("never");
        let mut builder = ConfigurationContextBuilder::new();
        builder
            .add_property_converter::<u8>(counting.clone())
            .unwrap();
        let config = Configuration::new(builder.build().unwrap());

        assert_eq!(config.get_as::<u8>("missing").unwrap(), None);
        assert_eq!(counting.calls(), 0);
    }

    #[test]
    fn test_unconvertible_reports_formats() {
        let config = configuration(&[("port", "eighty")], TypeCatalog::new());

        match config.get_as::<u16>("port") {
            Err(Error::Unconvertible {
                key,
                target,
                value,
                supported_formats,
            }) => {
                assert_eq!(key.as_deref(), Some("port"));
                assert_eq!(target, "u16");
                assert_eq!(value, "eighty");
                assert!(!supported_formats.is_empty());
            }
            other => panic!("expected Unconvertible, got {:?}", other),
        }
    }

    #[test]
    fn test_string_target_falls_back_to_raw() {
        let mut builder = ConfigurationContextBuilder::new();
        builder
            .add_property_sources([Arc::new(MapPropertySource::new("s", &[("name", "demo")])) as Arc<dyn PropertySource>])
            .unwrap();
        let config = Configuration::new(builder.build().unwrap());

        assert_eq!(config.get_as::<String>("name").unwrap().as_deref(), Some("demo"));
    }
}

mod priority_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_explicit_converter_preempts_synthesis() {
        let explicit = CountingConverter::new("explicit", |raw| Some(Currency(format!("X-{}", raw))));
        let mut builder = ConfigurationContextBuilder::new();
        builder
            .add_property_sources([Arc::new(MapPropertySource::new("s", &[("currency", "eur")])) as Arc<dyn PropertySource>])
            .unwrap()
            .add_property_converter::<Currency>(explicit.clone())
            .unwrap()
            .set_type_catalog(TypeCatalog::new().factory::<Currency, _, _>("of", Currency::of))
            .unwrap();
        let config = Configuration::new(builder.build().unwrap());

        let value = config.get_as::<Currency>("currency").unwrap();

        assert_eq!(value, Some(Currency("X-eur".into())));
        assert_eq!(explicit.calls(), 1);
        assert_eq!(config.context().converters().converter_count(TypeKey::of::<Currency>()), 1);
    }

    #[test]
    fn test_first_non_empty_result_wins() {
        let declining = CountingConverter::<u32>::declining("declining");
        let first = CountingConverter::new("first", |_| Some(1u32));
        let second = CountingConverter::new("second", |_| Some(2u32));
        let mut builder = ConfigurationContextBuilder::new();
        builder
            .add_property_sources([Arc::new(MapPropertySource::new("s", &[("n", "x")])) as Arc<dyn PropertySource>])
            .unwrap()
            .add_property_converter::<u32>(declining.clone())
            .unwrap()
            .add_property_converter::<u32>(first.clone())
            .unwrap()
            .add_property_converter::<u32>(second.clone())
            .unwrap();
        let config = Configuration::new(builder.build().unwrap());

        assert_eq!(config.get_as::<u32>("n").unwrap(), Some(1));
        assert_eq!(
            (declining.calls(), first.calls(), second.calls()),
            (1, 1, 0)
        );
    }

    #[test]
    fn test_failing_converter_is_skipped() {
        struct Exploding;
        impl PropertyConverter for Exploding {
            fn convert(
                &self,
                _: &str,
                _: &ConversionContext<'_>,
            ) -> Result<Option<ConvertedValue>, ConverterError> {
                Err(ConverterError::new("boom"))
            }
            fn name(&self) -> &str {
                "exploding"
            }
        }

        let fallback = CountingConverter::new("fallback", |_| Some(7i64));
        let mut builder = ConfigurationContextBuilder::new();
        builder
            .add_property_sources([Arc::new(MapPropertySource::new("s", &[("n", "x")])) as Arc<dyn PropertySource>])
            .unwrap()
            .add_property_converter::<i64>(Arc::new(Exploding))
            .unwrap()
            .add_property_converter::<i64>(fallback)
            .unwrap();
        let config = Configuration::new(builder.build().unwrap());

        assert_eq!(config.get_as::<i64>("n").unwrap(), Some(7));
    }
}

mod synthesis_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_enum_members_match_case_insensitively() {
        let config = configuration(
            &[("a", "CEILING"), ("b", "ceiling"), ("c", "CeiLinG"), ("d", " half_up ")],
            TypeCatalog::new().enumeration::<RoundingMode>(),
        );

        for key in ["a", "b", "c"] {
            assert_eq!(config.get_as::<RoundingMode>(key).unwrap(), Some(RoundingMode::Ceiling));
        }
        assert_eq!(config.get_as::<RoundingMode>("d").unwrap(), Some(RoundingMode::HalfUp));
    }

    #[test]
    fn test_unknown_enum_member_yields_no_result() {
        let config = configuration(&[], TypeCatalog::new().enumeration::<RoundingMode>());
        let registry = config.context().converters();

        let converters = registry.lookup(TypeKey::of::<RoundingMode>());
        assert_eq!(converters.len(), 1);

        let context = ConversionContext::of::<RoundingMode>();
        let result = converters[0].convert("fooBars", &context).unwrap();
        assert!(result.is_none());
        assert!(
            context
                .supported_formats()
                .iter()
                .any(|format| format.starts_with("CEILING"))
        );
    }

    #[test]
    fn test_unknown_enum_member_is_unconvertible_through_facade() {
        let config = configuration(
            &[("mode", "fooBars")],
            TypeCatalog::new().enumeration::<RoundingMode>(),
        );
        assert!(matches!(
            config.get_as::<RoundingMode>("mode"),
            Err(Error::Unconvertible { .. })
        ));
    }

    #[test]
    fn test_factory_synthesis_registers_once() {
        let config = configuration(
            &[("currency", "chf"), ("other", "usd")],
            TypeCatalog::new().factory::<Currency, _, _>("of", Currency::of),
        );
        let key = TypeKey::of::<Currency>();
        assert_eq!(config.context().converters().converter_count(key), 0);

        assert_eq!(config.get_as::<Currency>("currency").unwrap(), Some(Currency("CHF".into())));
        assert_eq!(config.context().converters().converter_count(key), 1);

        assert_eq!(config.get_as::<Currency>("other").unwrap(), Some(Currency("USD".into())));
        assert_eq!(config.context().converters().converter_count(key), 1);
    }

    #[test]
    fn test_factory_error_is_unconvertible() {
        let config = configuration(
            &[("currency", "euro")],
            TypeCatalog::new().factory::<Currency, _, _>("of", Currency::of),
        );
        assert!(matches!(
            config.get_as::<Currency>("currency"),
            Err(Error::Unconvertible { .. })
        ));
    }

    #[test]
    fn test_undeclared_type_is_unconvertible() {
        let config = configuration(&[("currency", "chf")], TypeCatalog::new());
        assert!(config.get_as::<Currency>("currency").is_err());
        assert_eq!(
            config.context().converters().converter_count(TypeKey::of::<Currency>()),
            0
        );
    }
}

mod hierarchy_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    trait Runnable: Send + Sync {
        fn run(&self) -> String;
    }

    #[derive(Debug, PartialEq)]
    struct Job(String);

    impl Runnable for Job {
        fn run(&self) -> String {
            format!("running {}", self.0)
        }
    }

    #[derive(Debug, PartialEq)]
    struct Task(String);

    impl Runnable for Task {
        fn run(&self) -> String {
            format!("task {}", self.0)
        }
    }

    /// Builds whichever runnable the conversion asks for
    struct RunnableConverter;

    impl PropertyConverter for RunnableConverter {
        fn convert(
            &self,
            value: &str,
            context: &ConversionContext<'_>,
        ) -> Result<Option<ConvertedValue>, ConverterError> {
            let target = context.target();
            if target.is::<Job>() {
                Ok(Some(Box::new(Job(value.to_string())) as ConvertedValue))
            } else if target.is::<Task>() {
                Ok(Some(Box::new(Task(value.to_string())) as ConvertedValue))
            } else {
                Ok(None)
            }
        }

        fn name(&self) -> &str {
            "RunnableConverter"
        }
    }

    fn configuration() -> Configuration {
        let catalog = TypeCatalog::new()
            .declare(TypeDescriptor::of::<Job>().implements::<dyn Runnable>())
            .declare(TypeDescriptor::of::<Task>().implements::<dyn Runnable>());
        let mut builder = ConfigurationContextBuilder::new();
        builder
            .add_property_sources([Arc::new(MapPropertySource::new("s", &[("job", "backup"), ("task", "sweep")])) as Arc<dyn PropertySource>])
            .unwrap()
            .add_property_converter::<dyn Runnable>(Arc::new(RunnableConverter))
            .unwrap()
            .set_type_catalog(catalog)
            .unwrap();
        Configuration::new(builder.build().unwrap())
    }

    #[test]
    fn test_interface_converter_serves_implementors() {
        let config = configuration();

        let job = config.get_as::<Job>("job").unwrap().unwrap();
        assert_eq!(job.run(), "running backup");

        let task = config.get_as::<Task>("task").unwrap().unwrap();
        assert_eq!(task, Task("sweep".into()));
    }

    #[test]
    fn test_ancestor_converters_are_not_copied() {
        let config = configuration();
        config.get_as::<Job>("job").unwrap();

        let registry = config.context().converters();
        assert_eq!(registry.converter_count(TypeKey::of::<Job>()), 0);
        assert_eq!(registry.converter_count(TypeKey::of::<dyn Runnable>()), 1);
    }
}
