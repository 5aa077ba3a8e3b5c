/*!
Parsing of human duration strings, such as `300ms`, `1.5h` or `2h45m`.
 */

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DurationError {
    #[error("invalid duration {0:?}")]
    Invalid(String),

    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },

    #[error("negative duration {0:?} is not supported")]
    Negative(String),

    #[error("duration {0:?} is out of range")]
    OutOfRange(String),
}

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Only this many fractional digits are significant; the rest can't affect
/// the result at nanosecond precision
const FRACTION_DIGITS: usize = 18;

fn unit_nanos(unit: &str) -> Option<u128> {
    Some(match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SECOND,
        "m" => 60 * NANOS_PER_SECOND,
        "h" => 60 * 60 * NANOS_PER_SECOND,
        _ => return None,
    })
}

/// Split off the leading run of ascii digits
fn split_digits(input: &str) -> (&str, &str) {
    let end = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());

    input.split_at(end)
}

/**
Parse a duration string: a sequence of decimal numbers, each with an optional
fraction and a mandatory unit suffix. Valid units are `ns`, `us` (or `µs`),
`ms`, `s`, `m` and `h`. A bare `0` is also accepted.

```
use std::time::Duration;
use optbind::duration::parse_duration;

assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
assert_eq!(parse_duration("1.5s"), Ok(Duration::from_millis(1500)));
assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
```
 */
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let invalid = || DurationError::Invalid(input.to_owned());

    let rest = match input.strip_prefix('-') {
        Some(_) => return Err(DurationError::Negative(input.to_owned())),
        None => input.strip_prefix('+').unwrap_or(input),
    };

    match rest {
        "0" => return Ok(Duration::ZERO),
        "" => return Err(invalid()),
        _ => {}
    }

    let mut rest = rest;
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let (whole, tail) = split_digits(rest);

        let (fraction, tail) = match tail.strip_prefix('.') {
            Some(tail) => split_digits(tail),
            None => ("", tail),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let unit_end = tail
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let scale = match unit {
            "" => return Err(DurationError::MissingUnit(input.to_owned())),
            unit => unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
                unit: unit.to_owned(),
                input: input.to_owned(),
            })?,
        };

        let out_of_range = || DurationError::OutOfRange(input.to_owned());

        let whole: u128 = match whole {
            "" => 0,
            whole => whole.parse().map_err(|_| out_of_range())?,
        };

        let fraction = &fraction[..fraction.len().min(FRACTION_DIGITS)];
        let fraction_nanos = match fraction {
            "" => 0,
            fraction => {
                let numerator: u128 = fraction.parse().map_err(|_| invalid())?;
                numerator * scale / 10u128.pow(fraction.len() as u32)
            }
        };

        total = whole
            .checked_mul(scale)
            .and_then(|nanos| nanos.checked_add(fraction_nanos))
            .and_then(|nanos| nanos.checked_add(total))
            .ok_or_else(out_of_range)?;

        rest = tail;
    }

    let seconds = u64::try_from(total / NANOS_PER_SECOND)
        .map_err(|_| DurationError::OutOfRange(input.to_owned()))?;

    Ok(Duration::new(seconds, (total % NANOS_PER_SECOND) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_units() {
        assert_eq!(parse_duration("300ms"), Ok(Duration::from_millis(300)));
        assert_eq!(parse_duration("10ns"), Ok(Duration::from_nanos(10)));
        assert_eq!(parse_duration("7µs"), Ok(Duration::from_micros(7)));
        assert_eq!(parse_duration("7us"), Ok(Duration::from_micros(7)));
        assert_eq!(parse_duration("+5m"), Ok(Duration::from_secs(300)));
    }

    #[test]
    fn compound_and_fractional() {
        assert_eq!(parse_duration("2h45m"), Ok(Duration::from_secs(9900)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration(".5s"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("1.s"), Ok(Duration::from_secs(1)));
        assert_eq!(
            parse_duration("1h2m3s4ms"),
            Ok(Duration::from_millis(3_723_004))
        );
    }

    #[test]
    fn rejections() {
        assert_eq!(
            parse_duration(""),
            Err(DurationError::Invalid(String::new()))
        );
        assert_eq!(
            parse_duration("10"),
            Err(DurationError::MissingUnit("10".to_owned()))
        );
        assert_eq!(
            parse_duration("3d"),
            Err(DurationError::UnknownUnit {
                unit: "d".to_owned(),
                input: "3d".to_owned()
            })
        );
        assert_eq!(
            parse_duration("-1s"),
            Err(DurationError::Negative("-1s".to_owned()))
        );
        assert_eq!(
            parse_duration(".s"),
            Err(DurationError::Invalid(".s".to_owned()))
        );
        assert!(matches!(
            parse_duration("99999999999999999999999h"),
            Err(DurationError::OutOfRange(_))
        ));
    }
}
