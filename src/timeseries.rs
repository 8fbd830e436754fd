//! Time series items: constant-interval and flexible-interval
//!
//! Both kinds hold parallel value and quality vectors and share the same
//! metadata scaffolding on the wire: one metadata-extension block carrying
//! the quality vector (and, for the constant kind, the base time and
//! spacing). They diverge in how the time domain is represented: implicit
//! for the constant kind, an explicit timestamp list for the flexible kind.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{MeasError, Result, ResultExt};
use crate::primitives;
use crate::quality::DataQuality;
use crate::xml::Element;

/// A value series sampled at a constant interval
///
/// The timestamp of item `i` is `base_time + i * spacing` and is never
/// stored explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesConstant {
    unit: String,
    description: Option<String>,
    base_time: OffsetDateTime,
    spacing: Duration,
    values: Vec<f64>,
    qualities: Vec<DataQuality>,
}

impl TimeSeriesConstant {
    /// Create an empty series
    ///
    /// The base time must be UTC and the spacing positive.
    pub fn new<S: Into<String>>(
        unit: S,
        base_time: OffsetDateTime,
        spacing: Duration,
    ) -> Result<Self> {
        let base_time = primitives::ensure_utc(base_time)?;
        if spacing <= Duration::ZERO {
            return Err(MeasError::InvalidDuration {
                message: format!("spacing must be positive, got {spacing}"),
            });
        }
        Ok(Self {
            unit: unit.into(),
            description: None,
            base_time,
            spacing,
            values: Vec::new(),
            qualities: Vec::new(),
        })
    }

    /// Builder-style description
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a value with good quality
    pub fn add(&mut self, value: f64) {
        self.add_with_quality(value, DataQuality::good());
    }

    /// Append a value with an explicit quality
    pub fn add_with_quality(&mut self, value: f64, quality: DataQuality) {
        self.values.push(value);
        self.qualities.push(quality);
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn base_time(&self) -> OffsetDateTime {
        self.base_time
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn quality(&self, index: usize) -> Option<&DataQuality> {
        self.qualities.get(index)
    }

    /// The implicit timestamp of item `index`
    pub fn timestamp(&self, index: usize) -> Option<OffsetDateTime> {
        (index < self.values.len()).then(|| self.base_time + self.spacing * index as i32)
    }

    /// Iterate items as `(timestamp, value, quality)`
    pub fn iter(&self) -> impl Iterator<Item = (OffsetDateTime, f64, &DataQuality)> {
        self.values
            .iter()
            .zip(&self.qualities)
            .enumerate()
            .map(|(i, (v, q))| (self.base_time + self.spacing * i as i32, *v, q))
    }

    pub(crate) fn to_element(&self, id_prefix: &str) -> Result<Element> {
        let mut metadata = metadata_extension(&self.qualities)?;
        metadata.push_child(
            Element::new("cocop:baseTime")
                .with_text(primitives::encode_timestamp(self.base_time)?),
        );
        metadata.push_child(
            Element::new("cocop:spacing")
                .with_text(primitives::encode_duration(self.spacing)?),
        );
        Ok(series_envelope(
            id_prefix,
            self.description.as_deref(),
            metadata,
            None,
            &self.unit,
            &self.values,
        ))
    }

    pub(crate) fn from_element(element: &Element) -> Result<Self> {
        let parts = SharedParts::decode(element)?;
        let metadata = parts.metadata.ok_or_else(|| MeasError::required("metadata"))?;
        let base_time = primitives::decode_timestamp(
            metadata.required_child("baseTime")?.text(),
        )?
        .require_utc()
        .context("baseTime")?;
        let spacing =
            primitives::decode_duration(metadata.required_child("spacing")?.text())?;
        let mut series = Self::new(parts.unit, base_time, spacing)?;
        series.description = parts.description;
        series.values = parts.values;
        series.qualities = parts.qualities;
        Ok(series)
    }
}

/// A value series with an explicit, non-decreasing timestamp per item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesFlexible {
    unit: String,
    description: Option<String>,
    timestamps: Vec<OffsetDateTime>,
    values: Vec<f64>,
    qualities: Vec<DataQuality>,
}

impl TimeSeriesFlexible {
    /// Create an empty series
    pub fn new<S: Into<String>>(unit: S) -> Self {
        Self {
            unit: unit.into(),
            description: None,
            timestamps: Vec::new(),
            values: Vec::new(),
            qualities: Vec::new(),
        }
    }

    /// Builder-style description
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append an item with good quality
    ///
    /// The timestamp must be UTC and not precede the last appended one.
    pub fn add(&mut self, timestamp: OffsetDateTime, value: f64) -> Result<()> {
        self.add_with_quality(timestamp, value, DataQuality::good())
    }

    /// Append an item with an explicit quality
    pub fn add_with_quality(
        &mut self,
        timestamp: OffsetDateTime,
        value: f64,
        quality: DataQuality,
    ) -> Result<()> {
        let timestamp = primitives::ensure_utc(timestamp)?;
        if let Some(last) = self.timestamps.last() {
            if timestamp < *last {
                return Err(MeasError::OutOfOrderTimestamp {
                    message: format!("{timestamp} precedes {last}"),
                });
            }
        }
        self.timestamps.push(timestamp);
        self.values.push(value);
        self.qualities.push(quality);
        Ok(())
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamp(&self, index: usize) -> Option<OffsetDateTime> {
        self.timestamps.get(index).copied()
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn quality(&self, index: usize) -> Option<&DataQuality> {
        self.qualities.get(index)
    }

    /// Iterate items as `(timestamp, value, quality)`
    pub fn iter(&self) -> impl Iterator<Item = (OffsetDateTime, f64, &DataQuality)> {
        self.timestamps
            .iter()
            .zip(&self.values)
            .zip(&self.qualities)
            .map(|((t, v), q)| (*t, *v, q))
    }

    pub(crate) fn to_element(&self, id_prefix: &str) -> Result<Element> {
        let metadata = metadata_extension(&self.qualities)?;
        let domain = Element::new("gml:domainSet").with_child(
            Element::new("gml:TimePositionList")
                .with_attr("gml:id", format!("{id_prefix}_domain"))
                .with_text(primitives::encode_timestamp_list(&self.timestamps)?),
        );
        Ok(series_envelope(
            id_prefix,
            self.description.as_deref(),
            metadata,
            Some(domain),
            &self.unit,
            &self.values,
        ))
    }

    pub(crate) fn from_element(element: &Element) -> Result<Self> {
        let parts = SharedParts::decode(element)?;
        let domain = element
            .required_child("domainSet")?
            .required_child("TimePositionList")?;
        let timestamps =
            primitives::decode_timestamp_list(domain.text()).context("domainSet")?;
        if timestamps.len() != parts.values.len() {
            return Err(MeasError::SizeMismatch {
                timestamps: timestamps.len(),
                values: parts.values.len(),
            });
        }
        let mut series = Self::new(parts.unit);
        series.description = parts.description;
        for ((timestamp, value), quality) in timestamps
            .into_iter()
            .zip(parts.values)
            .zip(parts.qualities)
        {
            series.add_with_quality(timestamp, value, quality)?;
        }
        Ok(series)
    }
}

/// Kind selector used when a series arrives without a type URI,
/// e.g. wrapped inside a data-record field
pub(crate) fn from_element_any(element: &Element) -> Result<crate::item::Item> {
    let has_base_time = element
        .child("metadata")
        .and_then(|m| m.child("TimeseriesMetadataExtension"))
        .is_some_and(|m| m.child("baseTime").is_some());
    if has_base_time {
        TimeSeriesConstant::from_element(element).map(crate::item::Item::TimeSeriesConstant)
    } else if element.child("domainSet").is_some() {
        TimeSeriesFlexible::from_element(element).map(crate::item::Item::TimeSeriesFlexible)
    } else {
        Err(MeasError::required("baseTime or domainSet"))
    }
}

fn metadata_extension(qualities: &[DataQuality]) -> Result<Element> {
    let quality_text =
        primitives::encode_string_list(qualities.iter().map(DataQuality::value))?;
    Ok(Element::new("tsml:TimeseriesMetadataExtension")
        .with_child(Element::new("cocop:qualityValues").with_text(quality_text)))
}

fn series_envelope(
    id_prefix: &str,
    description: Option<&str>,
    metadata: Element,
    domain: Option<Element>,
    unit: &str,
    values: &[f64],
) -> Element {
    let mut envelope = Element::new("tsml:TimeseriesDomainRange")
        .with_attr("gml:id", id_prefix.to_string());
    if let Some(description) = description {
        envelope.push_child(Element::new("gml:description").with_text(description));
    }
    envelope.push_child(Element::new("tsml:metadata").with_child(metadata));
    if let Some(domain) = domain {
        envelope.push_child(domain);
    }
    envelope.push_child(
        Element::new("gml:rangeSet").with_child(
            Element::new("gml:QuantityList")
                .with_attr("uom", unit)
                .with_text(primitives::encode_double_list(values)),
        ),
    );
    envelope
}

struct SharedParts {
    unit: String,
    description: Option<String>,
    values: Vec<f64>,
    qualities: Vec<DataQuality>,
    metadata: Option<Element>,
}

impl SharedParts {
    fn decode(element: &Element) -> Result<Self> {
        let range_list = element
            .required_child("rangeSet")?
            .required_child("QuantityList")?;
        let unit = range_list.attr("uom").unwrap_or_default().to_string();
        let values = primitives::decode_double_list(range_list.text()).context("rangeSet")?;

        let description = element
            .child("description")
            .map(|d| d.text().to_string())
            .filter(|d| !d.is_empty());

        let metadata = element
            .child("metadata")
            .and_then(|m| m.child("TimeseriesMetadataExtension"))
            .cloned();

        let qualities = match metadata
            .as_ref()
            .and_then(|m| m.child("qualityValues"))
        {
            Some(quality_el) => {
                let qualities: Vec<DataQuality> = primitives::decode_list(quality_el.text())
                    .into_iter()
                    .map(DataQuality::parse)
                    .collect::<Result<_>>()
                    .context("qualityValues")?;
                if qualities.len() != values.len() {
                    return Err(MeasError::QualitySizeMismatch {
                        values: values.len(),
                        qualities: qualities.len(),
                    });
                }
                qualities
            }
            // No quality vector on the wire: every item counts as good.
            None => vec![DataQuality::good(); values.len()],
        };

        Ok(Self {
            unit,
            description,
            values,
            qualities,
            metadata,
        })
    }
}
