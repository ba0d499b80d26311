//! Parsing of compact, unit-suffixed duration strings
//!
//! Accepted values are one or more `<number><unit>` pairs, optionally prefixed
//! with `+`:
//!
//! ```text
//! 60s    2m    1h30m    1.5h    250ms    90us
//! ```
//!
//! Supported units are `ns`, `us` (also `µs`/`μs`), `ms`, `s`, `m` and `h`.
//! A bare number without a unit is rejected, as is any value that is not
//! strictly positive.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

static COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+(?:\.[0-9]*)?|\.[0-9]+)(ns|us|µs|μs|ms|s|m|h)").expect("duration regex is valid")
});

/// Errors produced by [`parse_duration`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,

    #[error("invalid duration {0:?}")]
    Invalid(String),

    #[error("duration {0:?} must be greater than zero")]
    NotPositive(String),

    #[error("duration {0:?} is out of range")]
    Overflow(String),
}

/// Parse a duration such as `"60s"`, `"2m"` or `"1h30m"`.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    if input.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let body = match input.as_bytes()[0] {
        b'+' => &input[1..],
        b'-' => return Err(DurationParseError::NotPositive(input.to_string())),
        _ => input,
    };
    if body.is_empty() {
        return Err(DurationParseError::Invalid(input.to_string()));
    }

    let mut total: u128 = 0;
    let mut end = 0;

    for caps in COMPONENT.captures_iter(body) {
        let whole = caps.get(0).expect("capture 0 always exists");

        // components must be contiguous and cover the whole input
        if whole.start() != end {
            return Err(DurationParseError::Invalid(input.to_string()));
        }
        end = whole.end();

        let nanos = component_nanos(&caps[1], unit_nanos(&caps[2]))
            .ok_or_else(|| DurationParseError::Overflow(input.to_string()))?;
        total = total
            .checked_add(nanos)
            .ok_or_else(|| DurationParseError::Overflow(input.to_string()))?;
    }

    if end != body.len() {
        return Err(DurationParseError::Invalid(input.to_string()));
    }

    // also catches fractions that round down to nothing, e.g. "0.1ns"
    if total == 0 {
        return Err(DurationParseError::NotPositive(input.to_string()));
    }

    let secs = u64::try_from(total / NANOS_PER_SEC)
        .map_err(|_| DurationParseError::Overflow(input.to_string()))?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Value of a single `<number><unit>` component in nanoseconds.
///
/// Fraction digits beyond nanosecond precision are truncated.
fn component_nanos(number: &str, unit: u128) -> Option<u128> {
    let (int, frac) = number.split_once('.').unwrap_or((number, ""));

    let int: u128 = if int.is_empty() { 0 } else { int.parse().ok()? };
    let mut nanos = int.checked_mul(unit)?;

    let mut scale = 1u128;
    let mut frac_value = 0u128;
    for digit in frac.bytes().take(18) {
        frac_value = frac_value * 10 + u128::from(digit - b'0');
        scale *= 10;
    }
    nanos = nanos.checked_add(frac_value * unit / scale)?;

    Some(nanos)
}

fn unit_nanos(unit: &str) -> u128 {
    match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 3600 * NANOS_PER_SEC,
        _ => unreachable!("unit {unit} is not matched by the component regex"),
    }
}
