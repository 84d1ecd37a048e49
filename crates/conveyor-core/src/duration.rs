//! Parsing of human-readable artifact expiry durations.

use crate::error::Error;
use chrono::Duration;

/// Parse an `expire_in` value such as "30 minutes", "1 week" or
/// "2 days 12 hours" into a duration.
///
/// Accepted units: seconds, minutes, hours, days, weeks, months (30
/// days), years (365 days), singular or plural, plus the short forms
/// s/m/h/d/w. A bare number means seconds. Malformed input is a
/// definition-time error.
pub fn parse_expire_in(input: &str) -> Result<Duration, Error> {
    let invalid = |message: &str| Error::InvalidExpiry(input.to_string(), message.to_string());

    // Accumulate whole seconds with checked math; an amount the duration
    // type cannot represent is a definition error, never a silent wrap.
    let mut total_secs: i64 = 0;
    let mut terms = 0;
    let mut words = input.split_whitespace();

    while let Some(word) = words.next() {
        let (digits, suffix) = split_number(word);
        if digits.is_empty() {
            return Err(invalid("expected a number"));
        }
        let amount: i64 = digits.parse().map_err(|_| invalid("number out of range"))?;

        // Unit either glued to the number ("30m") or the next word ("30 minutes").
        let unit = if suffix.is_empty() {
            words.next().unwrap_or("seconds")
        } else {
            suffix
        };

        let unit_secs: i64 = match unit {
            "s" | "sec" | "secs" | "second" | "seconds" => 1,
            "m" | "min" | "mins" | "minute" | "minutes" => 60,
            "h" | "hr" | "hrs" | "hour" | "hours" => 3_600,
            "d" | "day" | "days" => 86_400,
            "w" | "week" | "weeks" => 7 * 86_400,
            "month" | "months" => 30 * 86_400,
            "year" | "years" => 365 * 86_400,
            _ => return Err(invalid("unknown unit")),
        };

        total_secs = amount
            .checked_mul(unit_secs)
            .and_then(|secs| total_secs.checked_add(secs))
            .ok_or_else(|| invalid("number out of range"))?;
        terms += 1;
    }

    if terms == 0 {
        return Err(invalid("empty duration"));
    }
    Duration::try_seconds(total_secs).ok_or_else(|| invalid("duration out of range"))
}

fn split_number(word: &str) -> (&str, &str) {
    let end = word
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(word.len());
    (&word[..end], &word[end..])
}
