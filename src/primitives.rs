//! Canonical text codec for primitive wire values
//!
//! Everything the XML layer reads or writes as character data passes through
//! this module: booleans, integers, doubles, UTC timestamps, ISO 8601
//! durations and whitespace-delimited lists thereof. Decode failures are
//! reported as [`MeasError::Parse`] with the offending input preserved.
//!
//! Timestamps are the one place with real policy: encoding a timestamp that
//! does not carry an explicit UTC offset fails with [`MeasError::DateTime`].
//! All timestamp-bearing model types rely on this single enforcement point.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use crate::error::{MeasError, Result};

/// A timestamp as read off the wire, before any UTC policy is applied
///
/// Wire timestamps either carry an explicit zone (normalised to UTC on
/// decode) or none at all. A zoneless timestamp is preserved as-is rather
/// than being coerced; the caller decides whether that is acceptable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WireTime {
    /// Carried an explicit offset; already normalised to UTC
    Utc(OffsetDateTime),
    /// Carried no zone designation at all
    Unspecified(PrimitiveDateTime),
}

impl WireTime {
    /// The timestamp, required to have carried an explicit zone
    ///
    /// This is the path every model constructor uses.
    pub fn require_utc(self) -> Result<OffsetDateTime> {
        match self {
            Self::Utc(t) => Ok(t),
            Self::Unspecified(t) => Err(MeasError::date_time(format!(
                "'{t}' carries no zone designation"
            ))),
        }
    }

    /// The timestamp, reading a zoneless value as if it were UTC
    ///
    /// Only used for optional legacy fields where refusing the value would
    /// lose more information than assuming the zone.
    pub fn to_utc_lossy(self) -> OffsetDateTime {
        match self {
            Self::Utc(t) => t,
            Self::Unspecified(t) => t.assume_utc(),
        }
    }
}

/// Fail unless the timestamp is explicitly UTC
pub fn ensure_utc(t: OffsetDateTime) -> Result<OffsetDateTime> {
    if t.offset().is_utc() {
        Ok(t)
    } else {
        Err(MeasError::date_time(format!(
            "'{t}' has offset {}",
            t.offset()
        )))
    }
}

/// Encode a timestamp in RFC 3339 form; fails unless it is UTC
pub fn encode_timestamp(t: OffsetDateTime) -> Result<String> {
    let t = ensure_utc(t)?;
    t.format(&Rfc3339)
        .map_err(|e| MeasError::date_time(e.to_string()))
}

/// Decode a timestamp, normalising zoned values to UTC
///
/// A value without any zone designation decodes as
/// [`WireTime::Unspecified`] and is never silently coerced.
pub fn decode_timestamp(raw: &str) -> Result<WireTime> {
    let raw = raw.trim();
    if let Ok(t) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(WireTime::Utc(t.to_offset(time::UtcOffset::UTC)));
    }
    let zoneless_subsec =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
    let zoneless = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(t) = PrimitiveDateTime::parse(raw, zoneless_subsec) {
        return Ok(WireTime::Unspecified(t));
    }
    if let Ok(t) = PrimitiveDateTime::parse(raw, zoneless) {
        return Ok(WireTime::Unspecified(t));
    }
    Err(MeasError::parse("timestamp", raw))
}

/// Decode a timestamp and require an explicit UTC designation
pub fn decode_utc_timestamp(raw: &str) -> Result<OffsetDateTime> {
    decode_timestamp(raw)?.require_utc()
}

/// Encode a boolean as `true`/`false`
pub fn encode_bool(value: bool) -> String {
    value.to_string()
}

/// Decode an XML boolean (`true`/`false`/`1`/`0`)
pub fn decode_bool(raw: &str) -> Result<bool> {
    match raw.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(MeasError::parse("boolean", other)),
    }
}

/// Encode a 64-bit integer
pub fn encode_long(value: i64) -> String {
    value.to_string()
}

/// Decode a 64-bit integer
pub fn decode_long(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| MeasError::parse("long", raw.trim()))
}

/// Encode a double using the shortest exact decimal form
pub fn encode_double(value: f64) -> String {
    value.to_string()
}

/// Decode a double
pub fn decode_double(raw: &str) -> Result<f64> {
    raw.trim()
        .parse()
        .map_err(|_| MeasError::parse("double", raw.trim()))
}

/// Encode a duration as an ISO 8601 day-time duration, e.g. `PT30M`
///
/// Calendar components (years, months) are never produced; negative
/// durations are rejected.
pub fn encode_duration(d: Duration) -> Result<String> {
    if d.is_negative() {
        return Err(MeasError::InvalidDuration {
            message: format!("negative duration {d}"),
        });
    }
    let days = d.whole_days();
    let hours = d.whole_hours() - days * 24;
    let minutes = d.whole_minutes() - d.whole_hours() * 60;
    let seconds = d.whole_seconds() - d.whole_minutes() * 60;
    let nanos = d.subsec_nanoseconds();

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    let mut time_part = String::new();
    if hours > 0 {
        time_part.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        time_part.push_str(&format!("{minutes}M"));
    }
    if nanos != 0 {
        let frac = format!("{:.9}", f64::from(nanos) / 1e9);
        let frac = frac.trim_start_matches('0').trim_end_matches('0');
        time_part.push_str(&format!("{seconds}{frac}S"));
    } else if seconds > 0 || (days == 0 && hours == 0 && minutes == 0) {
        time_part.push_str(&format!("{seconds}S"));
    }
    if !time_part.is_empty() {
        out.push('T');
        out.push_str(&time_part);
    }
    Ok(out)
}

/// Decode an ISO 8601 day-time duration
///
/// Calendar components (years, months) are not supported because they have
/// no fixed length; their presence is a parse failure.
pub fn decode_duration(raw: &str) -> Result<Duration> {
    let text = raw.trim();
    let err = || MeasError::parse("duration", text);

    let rest = text.strip_prefix('P').ok_or_else(err)?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };
    if rest.is_empty() || (date_part.is_empty() && time_part.is_none_or(str::is_empty)) {
        return Err(err());
    }

    let mut total = Duration::ZERO;
    let mut number = String::new();
    for c in date_part.chars() {
        match c {
            '0'..='9' => number.push(c),
            'D' => {
                let days: i64 = number.parse().map_err(|_| err())?;
                total += Duration::days(days);
                number.clear();
            }
            // Calendar components have no fixed length.
            'Y' | 'M' | 'W' => return Err(err()),
            _ => return Err(err()),
        }
    }
    if !number.is_empty() {
        return Err(err());
    }

    if let Some(time_part) = time_part {
        for c in time_part.chars() {
            match c {
                '0'..='9' | '.' => number.push(c),
                'H' => {
                    let hours: i64 = number.parse().map_err(|_| err())?;
                    total += Duration::hours(hours);
                    number.clear();
                }
                'M' => {
                    let minutes: i64 = number.parse().map_err(|_| err())?;
                    total += Duration::minutes(minutes);
                    number.clear();
                }
                'S' => {
                    let seconds: f64 = number.parse().map_err(|_| err())?;
                    total += Duration::seconds_f64(seconds);
                    number.clear();
                }
                _ => return Err(err()),
            }
        }
        if !number.is_empty() {
            return Err(err());
        }
    }
    Ok(total)
}

/// Join list elements with single spaces; elements must be whitespace-free
pub fn encode_string_list<'a, I>(items: I) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for item in items {
        if item.chars().any(char::is_whitespace) {
            return Err(MeasError::InvalidCellValue {
                message: format!("list element '{item}' contains whitespace"),
            });
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(item);
    }
    Ok(out)
}

/// Split a whitespace-delimited list into its elements
pub fn decode_list(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Encode a double vector as a whitespace-delimited list
pub fn encode_double_list(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode a whitespace-delimited double list
pub fn decode_double_list(text: &str) -> Result<Vec<f64>> {
    decode_list(text).into_iter().map(decode_double).collect()
}

/// Encode a timestamp vector as a whitespace-delimited list; all UTC
pub fn encode_timestamp_list(values: &[OffsetDateTime]) -> Result<String> {
    let encoded: Vec<String> = values
        .iter()
        .map(|t| encode_timestamp(*t))
        .collect::<Result<_>>()?;
    Ok(encoded.join(" "))
}

/// Decode a whitespace-delimited timestamp list, requiring UTC throughout
pub fn decode_timestamp_list(text: &str) -> Result<Vec<OffsetDateTime>> {
    decode_list(text)
        .into_iter()
        .map(decode_utc_timestamp)
        .collect()
}
