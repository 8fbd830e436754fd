//! Error types for measurement message operations

use thiserror::Error;

/// Result type alias for measurement message operations
pub type Result<T> = std::result::Result<T, MeasError>;

/// Errors that can occur while building or (de)serialising measurement data
///
/// Validation variants are raised synchronously when a value is constructed
/// or mutated; decode variants are raised while reading wire documents and
/// carry enough context to locate the failing field, row or element.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasError {
    /// A timestamp does not carry an explicit UTC designation
    #[error("timestamp is not in UTC: {message}")]
    DateTime { message: String },

    /// A range was constructed with its lower bound above its upper bound
    #[error("range bounds out of order: {message}")]
    RangeOrder { message: String },

    /// A category value contains whitespace, or a range bound is empty
    #[error("category value must be non-empty and whitespace-free: '{value}'")]
    CategoryWhitespace { value: String },

    /// A data record already holds a field with this name
    #[error("duplicate field name: '{name}'")]
    DuplicateField { name: String },

    /// A data quality was attached to a field whose item cannot carry one
    #[error("item in field '{name}' does not support a data quality")]
    UnsupportedQuality { name: String },

    /// A data record lookup failed
    #[error("no field named '{name}'")]
    FieldNotFound { name: String },

    /// An array column name is empty or contains a colon or whitespace
    #[error("invalid column name: '{name}'")]
    InvalidColumnName { name: String },

    /// An external column type has no counterpart in the column type set
    #[error("unsupported column type: {type_name}")]
    UnsupportedColumnType { type_name: String },

    /// A unit of measure was given for a column that is not measurement-typed
    #[error("unit of measure is only allowed on measurement columns: '{name}'")]
    UnitOnNonMeasureColumn { name: String },

    /// A row does not have one cell per column
    #[error("row has {actual} cells, expected {expected}")]
    CellCountMismatch { expected: usize, actual: usize },

    /// A cell value does not match the declared type of its column
    #[error("cell {index} has type {actual}, but column '{column}' expects {expected}")]
    CellTypeMismatch {
        index: usize,
        column: String,
        expected: String,
        actual: String,
    },

    /// A cell value cannot be represented in the textual cell encoding
    #[error("invalid cell value: {message}")]
    InvalidCellValue { message: String },

    /// A row index is outside the stored row range
    #[error("row index {index} out of bounds ({len} rows)")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A time series item was appended with a timestamp before its predecessor
    #[error("time series timestamps must be non-decreasing: {message}")]
    OutOfOrderTimestamp { message: String },

    /// A duration value is not usable as a sampling interval
    #[error("invalid duration: {message}")]
    InvalidDuration { message: String },

    /// A data quality string is not of the form `good` or `bad[/reason]`
    #[error("invalid data quality value: '{value}'")]
    InvalidQuality { value: String },

    /// A primitive text value could not be parsed
    #[error("cannot parse {type_name} from '{raw}'")]
    Parse { type_name: &'static str, raw: String },

    /// A required element or attribute is absent from the wire document
    #[error("required element missing: {name}")]
    RequiredFieldMissing { name: String },

    /// A value list holds the wrong number of entries
    #[error("expected {expected} values, got {actual}")]
    WrongValueCount { expected: usize, actual: usize },

    /// Value and quality vectors diverge in length
    #[error("quality vector size mismatch: {values} values, {qualities} qualities")]
    QualitySizeMismatch { values: usize, qualities: usize },

    /// Timestamp and value vectors diverge in length
    #[error("domain size mismatch: {timestamps} timestamps, {values} values")]
    SizeMismatch { timestamps: usize, values: usize },

    /// An observation type URI is not part of the supported set
    #[error("unsupported observation type URI: '{uri}'")]
    UnsupportedType { uri: String },

    /// The root element of a wire document selects no known decoder
    #[error("unsupported root element: '{name}'")]
    UnsupportedRootElement { name: String },

    /// A feature of interest carries both a reference and a structured form
    #[error("feature of interest has both a reference and a structured form")]
    InconsistentFeatureOfInterest,

    /// The document is not well-formed XML
    #[error("malformed XML: {message}")]
    Xml { message: String },

    /// A nested decode failure, wrapped with the context it occurred in
    #[error("{context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: Box<MeasError>,
    },

    /// JSON (de)serialisation failure
    #[cfg(feature = "json")]
    #[error("JSON error: {message}")]
    Json { message: String },
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for MeasError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

impl MeasError {
    /// Create a UTC violation error
    pub fn date_time<S: Into<String>>(message: S) -> Self {
        Self::DateTime {
            message: message.into(),
        }
    }

    /// Create a range ordering error
    pub fn range_order<S: Into<String>>(message: S) -> Self {
        Self::RangeOrder {
            message: message.into(),
        }
    }

    /// Create a primitive parse error
    pub fn parse<S: Into<String>>(type_name: &'static str, raw: S) -> Self {
        Self::Parse {
            type_name,
            raw: raw.into(),
        }
    }

    /// Create a missing-element error
    pub fn required<S: Into<String>>(name: S) -> Self {
        Self::RequiredFieldMissing { name: name.into() }
    }

    /// Create a malformed-XML error
    pub fn xml<S: Into<String>>(message: S) -> Self {
        Self::Xml {
            message: message.into(),
        }
    }

    /// Wrap this error with decode context, e.g. the field or row it occurred in
    pub fn in_context<S: Into<String>>(self, context: S) -> Self {
        Self::Decode {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error underneath any decode-context wrapping
    pub fn root_cause(&self) -> &MeasError {
        match self {
            Self::Decode { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Extension for wrapping decode results with locatable context
pub(crate) trait ResultExt<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T> {
        self.map_err(|e| e.in_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MeasError::parse("double", "abc");
        assert_eq!(err.to_string(), "cannot parse double from 'abc'");

        let err = MeasError::required("uom");
        assert_eq!(err.to_string(), "required element missing: uom");
    }

    #[test]
    fn test_context_wrapping() {
        let err = MeasError::parse("long", "x").in_context("field 'count'");
        assert_eq!(
            err.to_string(),
            "field 'count': cannot parse long from 'x'"
        );
        assert!(matches!(
            err.root_cause(),
            MeasError::Parse {
                type_name: "long",
                ..
            }
        ));
    }

    #[test]
    fn test_nested_context() {
        let err = MeasError::parse("double", "?")
            .in_context("row 3")
            .in_context("decode observation");
        assert_eq!(
            err.to_string(),
            "decode observation: row 3: cannot parse double from '?'"
        );
    }
}
