use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

lazy_static! {
    static ref DURATION_REGEX: Regex = Regex::new(r"(?P<amount>\d+)(?P<unit>[hmd])").unwrap();
}

const MINUTE_MS: u64 = 60 * 1000;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

// Parses the `<integer><unit>` giveaway duration into milliseconds. Only the
// first match is taken into account, everything around it is ignored.
pub fn parse_duration_ms(text: &str) -> Result<u64> {
    let captures = match DURATION_REGEX.captures(text) {
        Some(captures) => captures,
        None => {
            let message = format!(
                "Can't parse the `{}` duration. Use a number followed by `m`, `h` or `d` (e.g. `30m`).",
                text
            );
            return Err(Error::InvalidDuration(message));
        }
    };

    let overflow = || Error::InvalidDuration(format!("The `{}` duration is too long.", text));
    let amount = captures["amount"].parse::<u64>().map_err(|_| overflow())?;
    let unit_ms = match &captures["unit"] {
        "m" => MINUTE_MS,
        "h" => HOUR_MS,
        _ => DAY_MS,
    };

    let total = amount.checked_mul(unit_ms).ok_or_else(overflow)?;
    if total > i64::MAX as u64 {
        return Err(overflow());
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use crate::commands::giveaway::parser::parse_duration_ms;
    use crate::error::Error;

    #[test]
    fn test_parse_hours() {
        assert_eq!(parse_duration_ms("1h").unwrap(), 3_600_000);
    }

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_duration_ms("30m").unwrap(), 1_800_000);
    }

    #[test]
    fn test_parse_days() {
        assert_eq!(parse_duration_ms("2d").unwrap(), 172_800_000);
    }

    #[test]
    fn test_parse_takes_first_match_only() {
        assert_eq!(parse_duration_ms("in 10m and 3h").unwrap(), 600_000);
        assert_eq!(parse_duration_ms("5h30m").unwrap(), 18_000_000);
    }

    #[test]
    fn test_get_error_for_garbage() {
        let result = parse_duration_ms("xyz");

        assert_eq!(result.is_err(), true);
        assert_eq!(
            result.unwrap_err(),
            Error::InvalidDuration(
                "Can't parse the `xyz` duration. Use a number followed by `m`, `h` or `d` (e.g. `30m`)."
                    .to_string()
            )
        );
    }

    #[test]
    fn test_get_error_for_unsupported_unit() {
        assert_eq!(parse_duration_ms("10s").is_err(), true);
        assert_eq!(parse_duration_ms("").is_err(), true);
    }

    #[test]
    fn test_get_error_for_overflow() {
        let result = parse_duration_ms("99999999999999999999d");

        assert_eq!(
            result.unwrap_err(),
            Error::InvalidDuration("The `99999999999999999999d` duration is too long.".to_string())
        );
    }
}
