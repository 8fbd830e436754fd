//! The item variant family: every value shape an observation result can take
//!
//! One closed enum covers all fourteen shapes, so dispatch sites are
//! exhaustively checked instead of downcast. Composite payloads (arrays,
//! records, time series) live in their own modules; the scalar payload
//! structs live here.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use crate::array::Array;
use crate::error::{MeasError, Result};
use crate::primitives;
use crate::record::DataRecord;
use crate::timeseries::{TimeSeriesConstant, TimeSeriesFlexible};

/// A measured quantity with its unit of measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub unit: String,
    pub value: f64,
}

impl Measurement {
    pub fn new<S: Into<String>>(unit: S, value: f64) -> Self {
        Self {
            unit: unit.into(),
            value,
        }
    }
}

/// An inclusive quantity range with its unit of measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRange {
    pub unit: String,
    pub lower: f64,
    pub upper: f64,
}

impl MeasurementRange {
    /// Fails with `RangeOrder` if `lower > upper`
    pub fn new<S: Into<String>>(unit: S, lower: f64, upper: f64) -> Result<Self> {
        if lower > upper {
            return Err(MeasError::range_order(format!("{lower} > {upper}")));
        }
        Ok(Self {
            unit: unit.into(),
            lower,
            upper,
        })
    }
}

/// An inclusive integer range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub lower: i64,
    pub upper: i64,
}

impl CountRange {
    /// Fails with `RangeOrder` if `lower > upper`
    pub fn new(lower: i64, upper: i64) -> Result<Self> {
        if lower > upper {
            return Err(MeasError::range_order(format!("{lower} > {upper}")));
        }
        Ok(Self { lower, upper })
    }
}

/// A pair of category bounds
///
/// Categories have no implicit order, so the bounds are accepted as given;
/// both must be non-empty and whitespace-free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRange {
    pub lower: String,
    pub upper: String,
}

impl CategoryRange {
    pub fn new<S: Into<String>>(lower: S, upper: S) -> Result<Self> {
        let lower = valid_bound(lower.into())?;
        let upper = valid_bound(upper.into())?;
        Ok(Self { lower, upper })
    }
}

/// A single point in time, always UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInstant {
    pub time: OffsetDateTime,
}

impl TimeInstant {
    /// Fails with `DateTime` unless the timestamp is explicitly UTC
    pub fn new(time: OffsetDateTime) -> Result<Self> {
        Ok(Self {
            time: primitives::ensure_utc(time)?,
        })
    }
}

/// A closed time interval, both ends UTC and well-ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl TimeRange {
    /// Fails with `DateTime` for non-UTC ends and `RangeOrder` if `start > end`
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self> {
        let start = primitives::ensure_utc(start)?;
        let end = primitives::ensure_utc(end)?;
        if start > end {
            return Err(MeasError::range_order(format!("{start} > {end}")));
        }
        Ok(Self { start, end })
    }
}

fn valid_category(value: String) -> Result<String> {
    if value.chars().any(char::is_whitespace) {
        return Err(MeasError::CategoryWhitespace { value });
    }
    Ok(value)
}

// Range bounds are additionally required to be non-empty.
fn valid_bound(value: String) -> Result<String> {
    let value = valid_category(value)?;
    if value.is_empty() {
        return Err(MeasError::CategoryWhitespace { value });
    }
    Ok(value)
}

/// One value shape of an observation result or data-record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Boolean(bool),
    Category(Option<String>),
    CategoryRange(CategoryRange),
    Count(i64),
    CountRange(CountRange),
    Measurement(Measurement),
    MeasurementRange(MeasurementRange),
    Text(Option<String>),
    TimeInstant(TimeInstant),
    TimeRange(TimeRange),
    Array(Array),
    DataRecord(DataRecord),
    TimeSeriesConstant(TimeSeriesConstant),
    TimeSeriesFlexible(TimeSeriesFlexible),
}

impl Item {
    /// A category item; the value must be whitespace-free
    ///
    /// An empty value is normalised to the empty category.
    pub fn category<S: Into<String>>(value: S) -> Result<Self> {
        let value = valid_category(value.into())?;
        if value.is_empty() {
            Ok(Self::Category(None))
        } else {
            Ok(Self::Category(Some(value)))
        }
    }

    /// The category item with no value
    pub fn empty_category() -> Self {
        Self::Category(None)
    }

    /// A free-text item; an empty value is normalised to no value
    pub fn text<S: Into<String>>(value: S) -> Self {
        let value = value.into();
        if value.is_empty() {
            Self::Text(None)
        } else {
            Self::Text(Some(value))
        }
    }

    /// The discriminator identifying which wire slot shape this item uses
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Boolean(_) => TypeTag::Truth,
            Self::Category(_) => TypeTag::Category,
            Self::CategoryRange(_) => TypeTag::CategoryRange,
            Self::Count(_) => TypeTag::Count,
            Self::CountRange(_) => TypeTag::CountRange,
            Self::Measurement(_) => TypeTag::Measurement,
            Self::MeasurementRange(_) => TypeTag::MeasurementRange,
            Self::Text(_) => TypeTag::Text,
            Self::TimeInstant(_) | Self::TimeRange(_) => TypeTag::Temporal,
            Self::Array(_) | Self::DataRecord(_) => TypeTag::Complex,
            Self::TimeSeriesConstant(_) => TypeTag::TimeSeriesConstant,
            Self::TimeSeriesFlexible(_) => TypeTag::TimeSeriesFlexible,
        }
    }

    /// Whether this item may carry a data quality when used as a record field
    ///
    /// Composite items (records, arrays, time series) carry quality per
    /// element instead and report `false` here.
    pub fn supports_quality_in_record(&self) -> bool {
        !matches!(
            self,
            Self::Array(_)
                | Self::DataRecord(_)
                | Self::TimeSeriesConstant(_)
                | Self::TimeSeriesFlexible(_)
        )
    }

    /// A short human-readable rendering of the value
    pub fn display_string(&self) -> String {
        match self {
            Self::Boolean(v) => v.to_string(),
            Self::Category(v) => v.clone().unwrap_or_default(),
            Self::CategoryRange(r) => {
                if r.lower.is_empty() || r.upper.is_empty() {
                    String::new()
                } else {
                    format!("{}..{}", r.lower, r.upper)
                }
            }
            Self::Count(v) => v.to_string(),
            Self::CountRange(r) => format!("{}..{}", r.lower, r.upper),
            Self::Measurement(m) => format!("{} {}", round3(m.value), m.unit),
            Self::MeasurementRange(r) => {
                format!("{}..{} {}", round3(r.lower), round3(r.upper), r.unit)
            }
            Self::Text(v) => v.clone().unwrap_or_default(),
            Self::TimeInstant(t) => display_time(t.time),
            Self::TimeRange(r) => {
                format!("{}..{}", display_time(r.start), display_time(r.end))
            }
            Self::Array(a) => format!("Array {}x{}", a.row_count(), a.column_count()),
            Self::DataRecord(r) => format!("Data record ({} fields)", r.len()),
            Self::TimeSeriesConstant(ts) => format!("Time series ({} values)", ts.len()),
            Self::TimeSeriesFlexible(ts) => format!("Time series ({} values)", ts.len()),
        }
    }
}

fn round3(value: f64) -> String {
    let mut text = format!("{value:.3}");
    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    text
}

fn display_time(time: OffsetDateTime) -> String {
    primitives::encode_timestamp(time).unwrap_or_else(|_| time.to_string())
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl From<bool> for Item {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Item {
    fn from(value: i64) -> Self {
        Self::Count(value)
    }
}

impl From<Measurement> for Item {
    fn from(value: Measurement) -> Self {
        Self::Measurement(value)
    }
}

impl From<MeasurementRange> for Item {
    fn from(value: MeasurementRange) -> Self {
        Self::MeasurementRange(value)
    }
}

impl From<CountRange> for Item {
    fn from(value: CountRange) -> Self {
        Self::CountRange(value)
    }
}

impl From<CategoryRange> for Item {
    fn from(value: CategoryRange) -> Self {
        Self::CategoryRange(value)
    }
}

impl From<TimeInstant> for Item {
    fn from(value: TimeInstant) -> Self {
        Self::TimeInstant(value)
    }
}

impl From<TimeRange> for Item {
    fn from(value: TimeRange) -> Self {
        Self::TimeRange(value)
    }
}

impl From<Array> for Item {
    fn from(value: Array) -> Self {
        Self::Array(value)
    }
}

impl From<DataRecord> for Item {
    fn from(value: DataRecord) -> Self {
        Self::DataRecord(value)
    }
}

impl From<TimeSeriesConstant> for Item {
    fn from(value: TimeSeriesConstant) -> Self {
        Self::TimeSeriesConstant(value)
    }
}

impl From<TimeSeriesFlexible> for Item {
    fn from(value: TimeSeriesFlexible) -> Self {
        Self::TimeSeriesFlexible(value)
    }
}

/// Observation result type discriminator, serialised as a URI
///
/// The first six carry the standard O&M vocabulary URIs; the rest use the
/// custom vocabulary prefix. `Complex` and `Temporal` cover two item shapes
/// each and are disambiguated by payload shape on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Category,
    CategoryRange,
    Complex,
    Count,
    CountRange,
    Measurement,
    MeasurementRange,
    Temporal,
    Text,
    TimeSeriesConstant,
    TimeSeriesFlexible,
    Truth,
}

impl TypeTag {
    /// All tags, in a fixed order
    pub const ALL: [TypeTag; 12] = [
        TypeTag::Category,
        TypeTag::CategoryRange,
        TypeTag::Complex,
        TypeTag::Count,
        TypeTag::CountRange,
        TypeTag::Measurement,
        TypeTag::MeasurementRange,
        TypeTag::Temporal,
        TypeTag::Text,
        TypeTag::TimeSeriesConstant,
        TypeTag::TimeSeriesFlexible,
        TypeTag::Truth,
    ];

    /// The observation type URI serialised for this tag
    pub fn uri(self) -> &'static str {
        match self {
            Self::Category => {
                "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_CategoryObservation"
            }
            Self::Complex => {
                "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_ComplexObservation"
            }
            Self::Count => {
                "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_CountObservation"
            }
            Self::Measurement => {
                "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement"
            }
            Self::Temporal => {
                "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_TemporalObservation"
            }
            Self::Truth => {
                "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_TruthObservation"
            }
            Self::CategoryRange => "cocop/observationType/categoryRange",
            Self::CountRange => "cocop/observationType/countRange",
            Self::MeasurementRange => "cocop/observationType/measurementRange",
            Self::Text => "cocop/observationType/text",
            Self::TimeSeriesConstant => "cocop/observationType/timeSeriesConstant",
            Self::TimeSeriesFlexible => "cocop/observationType/timeSeriesFlexible",
        }
    }

    /// Resolve a wire URI; unknown URIs fail with `UnsupportedType`
    pub fn from_uri(uri: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.uri() == uri)
            .ok_or_else(|| MeasError::UnsupportedType {
                uri: uri.to_string(),
            })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_category_rejects_whitespace() {
        assert!(Item::category("process/step1").is_ok());
        assert!(matches!(
            Item::category("process step"),
            Err(MeasError::CategoryWhitespace { .. })
        ));
        assert_eq!(Item::category("").unwrap(), Item::Category(None));
    }

    #[test]
    fn test_numeric_ranges_require_order() {
        assert!(CountRange::new(2, 5).is_ok());
        assert!(matches!(
            CountRange::new(5, 2),
            Err(MeasError::RangeOrder { .. })
        ));
        assert!(MeasurementRange::new("m", 2.0, 5.0).is_ok());
        assert!(MeasurementRange::new("m", 5.0, 2.0).is_err());
    }

    #[test]
    fn test_category_range_is_unordered() {
        // Categories have no implicit order; "b".."a" is a valid pair.
        let r = CategoryRange::new("b", "a").unwrap();
        assert_eq!(r.lower, "b");
        assert!(CategoryRange::new("", "a").is_err());
        assert!(CategoryRange::new("a b", "c").is_err());
    }

    #[test]
    fn test_time_variants_require_utc() {
        let utc = datetime!(2020-01-01 00:00 UTC);
        let offset = datetime!(2020-01-01 00:00 +02:00);
        assert!(TimeInstant::new(utc).is_ok());
        assert!(matches!(
            TimeInstant::new(offset),
            Err(MeasError::DateTime { .. })
        ));
        assert!(TimeRange::new(utc, utc).is_ok());
        assert!(TimeRange::new(offset, utc).is_err());
        assert!(matches!(
            TimeRange::new(utc + time::Duration::hours(1), utc),
            Err(MeasError::RangeOrder { .. })
        ));
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(Item::Boolean(true).display_string(), "true");
        assert_eq!(Item::Count(42).display_string(), "42");
        assert_eq!(Item::category("ok").unwrap().display_string(), "ok");
        assert_eq!(
            Item::from(Measurement::new("Cel", 22.4)).display_string(),
            "22.4 Cel"
        );
        assert_eq!(
            Item::from(Measurement::new("kg", 5.0)).display_string(),
            "5 kg"
        );
        assert_eq!(
            Item::from(Measurement::new("kg", 1.23456)).display_string(),
            "1.235 kg"
        );
        assert_eq!(
            Item::from(MeasurementRange::new("m", 1.5, 2.5).unwrap()).display_string(),
            "1.5..2.5 m"
        );
        assert_eq!(
            Item::from(CountRange::new(2, 5).unwrap()).display_string(),
            "2..5"
        );
        assert_eq!(
            Item::from(TimeInstant::new(datetime!(2020-01-01 00:00 UTC)).unwrap())
                .display_string(),
            "2020-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(Item::Boolean(true).type_tag(), TypeTag::Truth);
        assert_eq!(Item::text("x").type_tag(), TypeTag::Text);
        assert_eq!(
            Item::from(DataRecord::new()).type_tag(),
            TypeTag::Complex
        );
        assert_eq!(
            TimeInstant::new(datetime!(2020-01-01 00:00 UTC))
                .map(Item::from)
                .unwrap()
                .type_tag(),
            TypeTag::Temporal
        );
    }

    #[test]
    fn test_uri_round_trip() {
        for tag in TypeTag::ALL {
            assert_eq!(TypeTag::from_uri(tag.uri()).unwrap(), tag);
        }
        assert!(matches!(
            TypeTag::from_uri("urn:unknown"),
            Err(MeasError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_quality_support() {
        assert!(Item::Boolean(true).supports_quality_in_record());
        assert!(Item::from(Measurement::new("s", 1.0)).supports_quality_in_record());
        assert!(!Item::from(DataRecord::new()).supports_quality_in_record());
    }
}
