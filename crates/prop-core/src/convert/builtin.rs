//! Default converters for standard library types

use super::{ConversionContext, ConvertedValue, PropertyConverter, TypeKey};
use crate::ConverterError;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// All default converters keyed by their target type
pub fn builtin_converters() -> Vec<(TypeKey, Arc<dyn PropertyConverter>)> {
    vec![
        entry::<String>(Arc::new(StringConverter)),
        entry::<bool>(Arc::new(BoolConverter)),
        entry::<char>(Arc::new(CharConverter)),
        entry::<i8>(Arc::new(IntegerConverter::<i8>::new())),
        entry::<i16>(Arc::new(IntegerConverter::<i16>::new())),
        entry::<i32>(Arc::new(IntegerConverter::<i32>::new())),
        entry::<i64>(Arc::new(IntegerConverter::<i64>::new())),
        entry::<isize>(Arc::new(IntegerConverter::<isize>::new())),
        entry::<u8>(Arc::new(IntegerConverter::<u8>::new())),
        entry::<u16>(Arc::new(IntegerConverter::<u16>::new())),
        entry::<u32>(Arc::new(IntegerConverter::<u32>::new())),
        entry::<u64>(Arc::new(IntegerConverter::<u64>::new())),
        entry::<usize>(Arc::new(IntegerConverter::<usize>::new())),
        entry::<f32>(Arc::new(FloatConverter::<f32>::new())),
        entry::<f64>(Arc::new(FloatConverter::<f64>::new())),
        entry::<Duration>(Arc::new(DurationConverter)),
        entry::<PathBuf>(Arc::new(ParseConverter::<PathBuf>::new())),
        entry::<IpAddr>(Arc::new(ParseConverter::<IpAddr>::new())),
        entry::<SocketAddr>(Arc::new(ParseConverter::<SocketAddr>::new())),
    ]
}

fn entry<T: 'static>(converter: Arc<dyn PropertyConverter>) -> (TypeKey, Arc<dyn PropertyConverter>) {
    (TypeKey::of::<T>(), converter)
}

fn boxed<T: Any + Send + Sync>(value: T) -> Option<ConvertedValue> {
    Some(Box::new(value))
}

struct StringConverter;

impl PropertyConverter for StringConverter {
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError> {
        context.add_supported_formats(self.name(), &["<String>"]);
        Ok(boxed(value.to_string()))
    }

    fn name(&self) -> &str {
        "StringConverter"
    }
}

struct BoolConverter;

impl PropertyConverter for BoolConverter {
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError> {
        context.add_supported_formats(
            self.name(),
            &[
                "yes (ignore case)",
                "y (ignore case)",
                "true (ignore case)",
                "t (ignore case)",
                "on (ignore case)",
                "no (ignore case)",
                "n (ignore case)",
                "false (ignore case)",
                "f (ignore case)",
                "off (ignore case)",
            ],
        );
        let parsed = match value.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "t" | "on" => Some(true),
            "no" | "n" | "false" | "f" | "off" => Some(false),
            _ => None,
        };
        Ok(parsed.and_then(boxed))
    }

    fn name(&self) -> &str {
        "BoolConverter"
    }
}

struct CharConverter;

impl PropertyConverter for CharConverter {
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError> {
        context.add_supported_formats(self.name(), &["'<char>'", "<char>"]);

        // A lone whitespace character is a valid value
        let mut chars = value.chars();
        if let (Some(single), None) = (chars.next(), chars.next()) {
            return Ok(boxed(single));
        }

        let trimmed = value.trim();
        let inner = trimmed
            .strip_prefix('\'')
            .and_then(|rest| rest.strip_suffix('\''))
            .unwrap_or(trimmed);

        let mut chars = inner.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Ok(None),
            (Some(single), None) => Ok(boxed(single)),
            _ => Err(ConverterError::new(format!(
                "'{}' holds more than one character",
                value
            ))),
        }
    }

    fn name(&self) -> &str {
        "CharConverter"
    }
}

/// Integer types understood by [`IntegerConverter`]
trait Integer: TryFrom<i128> + Any + Send + Sync {
    const MIN: Self;
    const MAX: Self;
}

macro_rules! impl_integer {
    ($($t:ty),*) => {
        $(
            impl Integer for $t {
                const MIN: Self = <$t>::MIN;
                const MAX: Self = <$t>::MAX;
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Decode an integer literal
///
/// Accepts an optional sign followed by decimal digits, `0x`/`0X`/`#` hex
/// digits or `0`-prefixed octal digits.
fn decode_integer(raw: &str) -> Option<i128> {
    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let (radix, digits) = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
        .or_else(|| unsigned.strip_prefix('#'))
    {
        (16, hex)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (8, &unsigned[1..])
    } else {
        (10, unsigned)
    };

    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

struct IntegerConverter<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Integer> IntegerConverter<T> {
    fn new() -> Self {
        Self {
            name: format!("IntegerConverter<{}>", std::any::type_name::<T>()),
            _marker: PhantomData,
        }
    }
}

impl<T: Integer> PropertyConverter for IntegerConverter<T> {
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError> {
        context.add_supported_formats(
            &self.name,
            &["<int>", "0x<hex>", "#<hex>", "0<octal>", "MIN", "MIN_VALUE", "MAX", "MAX_VALUE"],
        );

        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("MIN") || trimmed.eq_ignore_ascii_case("MIN_VALUE") {
            return Ok(boxed(T::MIN));
        }
        if trimmed.eq_ignore_ascii_case("MAX") || trimmed.eq_ignore_ascii_case("MAX_VALUE") {
            return Ok(boxed(T::MAX));
        }

        let Some(decoded) = decode_integer(trimmed) else {
            return Ok(None);
        };
        T::try_from(decoded).map(boxed).map_err(|_| {
            ConverterError::new(format!(
                "{} is out of range for {}",
                decoded,
                std::any::type_name::<T>()
            ))
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Floating point types understood by [`FloatConverter`]
trait Float: FromStr + Any + Send + Sync {
    const NAN: Self;
    const INFINITY: Self;
    const NEG_INFINITY: Self;
    const MAX: Self;
    /// Smallest positive subnormal value
    fn min_value() -> Self;
}

impl Float for f32 {
    const NAN: Self = f32::NAN;
    const INFINITY: Self = f32::INFINITY;
    const NEG_INFINITY: Self = f32::NEG_INFINITY;
    const MAX: Self = f32::MAX;
    fn min_value() -> Self {
        f32::from_bits(1)
    }
}

impl Float for f64 {
    const NAN: Self = f64::NAN;
    const INFINITY: Self = f64::INFINITY;
    const NEG_INFINITY: Self = f64::NEG_INFINITY;
    const MAX: Self = f64::MAX;
    fn min_value() -> Self {
        f64::from_bits(1)
    }
}

struct FloatConverter<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Float> FloatConverter<T> {
    fn new() -> Self {
        Self {
            name: format!("FloatConverter<{}>", std::any::type_name::<T>()),
            _marker: PhantomData,
        }
    }
}

impl<T: Float> PropertyConverter for FloatConverter<T> {
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError> {
        context.add_supported_formats(
            &self.name,
            &["<float>", "NaN", "POSITIVE_INFINITY", "NEGATIVE_INFINITY", "MIN_VALUE", "MAX_VALUE"],
        );

        let trimmed = value.trim();
        let special = match trimmed.to_ascii_uppercase().as_str() {
            "NAN" => Some(T::NAN),
            "POSITIVE_INFINITY" => Some(T::INFINITY),
            "NEGATIVE_INFINITY" => Some(T::NEG_INFINITY),
            "MIN_VALUE" => Some(T::min_value()),
            "MAX_VALUE" => Some(T::MAX),
            _ => None,
        };
        if let Some(special) = special {
            return Ok(boxed(special));
        }
        Ok(trimmed.parse::<T>().ok().and_then(boxed))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `<n>ms`, `<n>s`, `<n>m`, `<n>h`, `<n>d` or plain seconds
struct DurationConverter;

impl PropertyConverter for DurationConverter {
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError> {
        context.add_supported_formats(
            self.name(),
            &["<seconds>", "<n>ms", "<n>s", "<n>m", "<n>h", "<n>d"],
        );

        let trimmed = value.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);
        let Ok(amount) = digits.parse::<u64>() else {
            return Ok(None);
        };

        let duration = match unit.trim() {
            "ms" => Some(Duration::from_millis(amount)),
            "" | "s" => Some(Duration::from_secs(amount)),
            "m" => amount.checked_mul(60).map(Duration::from_secs),
            "h" => amount.checked_mul(3_600).map(Duration::from_secs),
            "d" => amount.checked_mul(86_400).map(Duration::from_secs),
            _ => return Ok(None),
        };
        duration
            .map(boxed)
            .ok_or_else(|| ConverterError::new(format!("duration '{}' overflows", trimmed)))
    }

    fn name(&self) -> &str {
        "DurationConverter"
    }
}

/// Converter using the [`FromStr`] implementation of `T`
pub(crate) struct ParseConverter<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ParseConverter<T>
where
    T: FromStr + Any + Send + Sync,
    T::Err: fmt::Display,
{
    pub(crate) fn new() -> Self {
        let name = std::any::type_name::<T>();
        Self {
            name: format!("ParseConverter<{}>", name.rsplit("::").next().unwrap_or(name)),
            _marker: PhantomData,
        }
    }
}

impl<T> PropertyConverter for ParseConverter<T>
where
    T: FromStr + Any + Send + Sync,
    T::Err: fmt::Display,
{
    fn convert(
        &self,
        value: &str,
        context: &ConversionContext<'_>,
    ) -> Result<Option<ConvertedValue>, ConverterError> {
        context.add_supported_formats(&self.name, &["<String>"]);
        value
            .trim()
            .parse::<T>()
            .map(boxed)
            .map_err(|err| ConverterError::new(format!("{}: {}", self.name, err)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
