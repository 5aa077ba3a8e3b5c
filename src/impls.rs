/*!
The conversions pre-registered in [`ValueRegistry::default`][crate::ValueRegistry]
for various primitive and standard library types
 */

use std::convert::Infallible;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

use crate::duration::parse_duration;
use crate::value::ValueRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid boolean {0:?}")]
pub struct ParseBoolError(String);

/// Booleans accept the usual spellings of true and false, including `1`
/// and `0`
pub fn parse_bool(raw: &str) -> Result<bool, ParseBoolError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(ParseBoolError(raw.to_owned())),
    }
}

/// Parse an integer, detecting the base from its prefix: `0x`, `0o` and
/// `0b`, or a leading `0` for legacy octal. Underscores may separate digits
/// only when a prefix is present.
fn parse_integer<T>(
    raw: &str,
    from_str_radix: fn(&str, u32) -> Result<T, ParseIntError>,
) -> Result<T, ParseIntError> {
    let (sign, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.strip_prefix('+').unwrap_or(raw)),
    };

    let prefixed = |prefixes: [&str; 2]| {
        prefixes
            .into_iter()
            .find_map(|prefix| unsigned.strip_prefix(prefix))
    };

    let (radix, digits) = if let Some(digits) = prefixed(["0x", "0X"]) {
        (16, digits)
    } else if let Some(digits) = prefixed(["0o", "0O"]) {
        (8, digits)
    } else if let Some(digits) = prefixed(["0b", "0B"]) {
        (2, digits)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (8, &unsigned[1..])
    } else {
        return from_str_radix(&format!("{sign}{unsigned}"), 10);
    };

    // A second sign after the prefix is never valid; a lone sign reports an
    // invalid digit
    if digits.starts_with(['+', '-']) {
        return from_str_radix(&digits[..1], radix);
    }

    from_str_radix(&format!("{sign}{}", digits.replace('_', "")), radix)
}

macro_rules! integers {
    ($registry:ident: $($type:ident)*) => {$(
        let _ = $registry.register::<$type, ParseIntError>(|raw| parse_integer(raw, $type::from_str_radix));
    )*};
}

macro_rules! infallible {
    ($registry:ident: $($type:ty => $convert:expr,)*) => {$(
        let _ = $registry.register::<$type, Infallible>(|raw| Ok($convert(raw)));
    )*};
}

/// Fill an empty registry with the built-in conversions. Registering into an
/// empty registry can't collide, so the results are discarded.
pub fn register_builtins(registry: &mut ValueRegistry) {
    let _ = registry.register(parse_bool);

    integers! {registry:
        i8 i16 i32 i64 isize
        u8 u16 u32 u64 usize
    }

    let _ = registry.register(|raw: &str| raw.parse::<f32>());
    let _ = registry.register(|raw: &str| raw.parse::<f64>());

    infallible! {registry:
        String => str::to_owned,
        PathBuf => PathBuf::from,
    }

    let _ = registry.register(parse_duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(raw: &str) -> Result<i64, ParseIntError> {
        parse_integer(raw, i64::from_str_radix)
    }

    fn uint(raw: &str) -> Result<u32, ParseIntError> {
        parse_integer(raw, u32::from_str_radix)
    }

    #[test]
    fn bool_spellings() {
        for raw in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(raw), Ok(true), "{raw}");
        }
        for raw in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(raw), Ok(false), "{raw}");
        }

        assert_eq!(
            parse_bool("yes").unwrap_err().to_string(),
            "invalid boolean \"yes\""
        );
        assert!(parse_bool("tRUE").is_err());
    }

    #[test]
    fn integer_bases() {
        assert_eq!(int("42"), Ok(42));
        assert_eq!(int("+42"), Ok(42));
        assert_eq!(int("-42"), Ok(-42));
        assert_eq!(int("0x2A"), Ok(42));
        assert_eq!(int("-0X2a"), Ok(-42));
        assert_eq!(int("0o52"), Ok(42));
        assert_eq!(int("052"), Ok(42));
        assert_eq!(int("0b10_1010"), Ok(42));
        assert_eq!(int("0"), Ok(0));
    }

    #[test]
    fn integer_rejections() {
        assert!(int("").is_err());
        assert!(int("0x").is_err());
        assert!(int("09").is_err());
        assert!(int("4_2").is_err());
        assert!(int("0x-2A").is_err());
        assert!(int("--1").is_err());
        assert!(uint("-1").is_err());
        assert!(uint("0x1_0000_0000").is_err());
    }

    #[test]
    fn builtin_strings() {
        let registry = ValueRegistry::default();
        assert_eq!(registry.parse::<String>(""), Ok(String::new()));
        assert_eq!(
            registry.parse::<PathBuf>("/dev/ttyUSB0"),
            Ok(PathBuf::from("/dev/ttyUSB0"))
        );
    }
}
