//! Wire dispatch for item variants
//!
//! Every item has two distinct XML shapes: one as a top-level observation
//! result (selected by a type URI) and one as a data-record field (selected
//! by the element name itself). The two encodings are kept as separate
//! operations because several variants genuinely differ in shape between
//! the positions.

use crate::array::Array;
use crate::error::{MeasError, Result};
use crate::item::{
    CategoryRange, CountRange, Item, Measurement, MeasurementRange, TimeInstant, TimeRange,
    TypeTag,
};
use crate::primitives;
use crate::record::DataRecord;
use crate::timeseries::{self, TimeSeriesConstant, TimeSeriesFlexible};
use crate::xml::{names, Element};

impl Item {
    /// Encode into the top-level observation result slot (`om:result`)
    pub fn encode_as_result(&self, id_prefix: &str) -> Result<Element> {
        let mut result = Element::new("om:result");
        match self {
            Self::Boolean(v) => {
                result.set_attr("xsi:type", "xs:boolean");
                result.set_text(primitives::encode_bool(*v));
            }
            Self::Count(v) => {
                result.set_attr("xsi:type", "xs:integer");
                result.set_text(primitives::encode_long(*v));
            }
            Self::Text(v) => {
                result.set_attr("xsi:type", "xs:string");
                if let Some(text) = v {
                    result.set_text(text);
                }
            }
            Self::Measurement(m) => {
                result.set_attr("xsi:type", "gml:MeasureType");
                result.set_attr("uom", &m.unit);
                result.set_text(primitives::encode_double(m.value));
            }
            // A category is a reference at top level, unlike its plain
            // form in field position.
            Self::Category(v) => {
                result.set_attr("xsi:type", "gml:ReferenceType");
                if let Some(value) = v {
                    result.set_attr("xlink:title", value);
                }
            }
            Self::CategoryRange(r) => {
                result.push_child(range_component(
                    "swe:CategoryRange",
                    None,
                    &primitives::encode_string_list([r.lower.as_str(), r.upper.as_str()])?,
                ));
            }
            Self::CountRange(r) => {
                result.push_child(range_component(
                    "swe:CountRange",
                    None,
                    &format!(
                        "{} {}",
                        primitives::encode_long(r.lower),
                        primitives::encode_long(r.upper)
                    ),
                ));
            }
            Self::MeasurementRange(r) => {
                result.push_child(range_component(
                    "swe:QuantityRange",
                    Some(&r.unit),
                    &format!(
                        "{} {}",
                        primitives::encode_double(r.lower),
                        primitives::encode_double(r.upper)
                    ),
                ));
            }
            Self::TimeInstant(t) => {
                result.push_child(encode_time_instant(
                    &format!("{id_prefix}_time"),
                    t.time,
                )?);
            }
            Self::TimeRange(r) => {
                result.push_child(
                    Element::new("gml:TimePeriod")
                        .with_attr("gml:id", format!("{id_prefix}_period"))
                        .with_child(
                            Element::new("gml:beginPosition")
                                .with_text(primitives::encode_timestamp(r.start)?),
                        )
                        .with_child(
                            Element::new("gml:endPosition")
                                .with_text(primitives::encode_timestamp(r.end)?),
                        ),
                );
            }
            Self::DataRecord(record) => {
                result.push_child(record.to_element(id_prefix)?);
            }
            Self::Array(array) => {
                result.push_child(array.to_element(id_prefix)?);
            }
            Self::TimeSeriesConstant(series) => {
                result.push_child(series.to_element(id_prefix)?);
            }
            Self::TimeSeriesFlexible(series) => {
                result.push_child(series.to_element(id_prefix)?);
            }
        }
        Ok(result)
    }

    /// Decode the top-level result slot using the observation type tag
    ///
    /// `Complex` and `Temporal` cover two shapes each; the payload decides.
    pub(crate) fn decode_result(tag: TypeTag, result: &Element) -> Result<Item> {
        match tag {
            TypeTag::Truth => Ok(Self::Boolean(primitives::decode_bool(result.text())?)),
            TypeTag::Count => Ok(Self::Count(primitives::decode_long(result.text())?)),
            TypeTag::Text => Ok(Self::text(result.text())),
            TypeTag::Measurement => {
                let unit = result.required_attr("uom")?;
                Ok(Self::Measurement(Measurement::new(
                    unit,
                    primitives::decode_double(result.text())?,
                )))
            }
            TypeTag::Category => Item::category(result.attr("title").unwrap_or_default()),
            TypeTag::CategoryRange => {
                let (lower, upper) = decode_bounds(result, "CategoryRange")?;
                Ok(Self::CategoryRange(CategoryRange::new(lower, upper)?))
            }
            TypeTag::CountRange => {
                let (lower, upper) = decode_bounds(result, "CountRange")?;
                Ok(Self::CountRange(CountRange::new(
                    primitives::decode_long(&lower)?,
                    primitives::decode_long(&upper)?,
                )?))
            }
            TypeTag::MeasurementRange => {
                let component = result.required_child("QuantityRange")?;
                let unit = component
                    .child("uom")
                    .and_then(|u| u.attr("code"))
                    .unwrap_or_default();
                let (lower, upper) = decode_bounds(result, "QuantityRange")?;
                Ok(Self::MeasurementRange(MeasurementRange::new(
                    unit,
                    primitives::decode_double(&lower)?,
                    primitives::decode_double(&upper)?,
                )?))
            }
            TypeTag::Temporal => {
                if let Some(instant) = result.child("TimeInstant") {
                    let time = decode_time_instant(instant)?;
                    Ok(Self::TimeInstant(TimeInstant::new(time)?))
                } else if let Some(period) = result.child("TimePeriod") {
                    let start = primitives::decode_utc_timestamp(
                        period.required_child("beginPosition")?.text(),
                    )?;
                    let end = primitives::decode_utc_timestamp(
                        period.required_child("endPosition")?.text(),
                    )?;
                    Ok(Self::TimeRange(TimeRange::new(start, end)?))
                } else {
                    Err(MeasError::required("TimeInstant or TimePeriod"))
                }
            }
            TypeTag::Complex => {
                if let Some(record) = result.child("DataRecord") {
                    Ok(Self::DataRecord(DataRecord::from_element(record)?))
                } else if let Some(array) = result.child("DataArray") {
                    Ok(Self::Array(Array::from_element(array)?))
                } else {
                    Err(MeasError::required("DataRecord or DataArray"))
                }
            }
            TypeTag::TimeSeriesConstant => {
                let series = result.required_child("TimeseriesDomainRange")?;
                Ok(Self::TimeSeriesConstant(TimeSeriesConstant::from_element(
                    series,
                )?))
            }
            TypeTag::TimeSeriesFlexible => {
                let series = result.required_child("TimeseriesDomainRange")?;
                Ok(Self::TimeSeriesFlexible(TimeSeriesFlexible::from_element(
                    series,
                )?))
            }
        }
    }

    /// Encode into data-record field position
    pub fn encode_as_field(&self, id_prefix: &str) -> Result<Element> {
        match self {
            Self::Boolean(v) => Ok(value_component(
                "swe:Boolean",
                Some(&primitives::encode_bool(*v)),
            )),
            // Plain category element here; the reference form is only used
            // at top level.
            Self::Category(v) => Ok(value_component("swe:Category", v.as_deref())),
            Self::CategoryRange(r) => Ok(range_component(
                "swe:CategoryRange",
                None,
                &primitives::encode_string_list([r.lower.as_str(), r.upper.as_str()])?,
            )),
            Self::Count(v) => Ok(value_component(
                "swe:Count",
                Some(&primitives::encode_long(*v)),
            )),
            Self::CountRange(r) => Ok(range_component(
                "swe:CountRange",
                None,
                &format!(
                    "{} {}",
                    primitives::encode_long(r.lower),
                    primitives::encode_long(r.upper)
                ),
            )),
            Self::Measurement(m) => {
                let mut component = Element::new("swe:Quantity")
                    .with_child(Element::new("swe:uom").with_attr("code", &m.unit));
                component.push_child(
                    Element::new("swe:value").with_text(primitives::encode_double(m.value)),
                );
                Ok(component)
            }
            Self::MeasurementRange(r) => Ok(range_component(
                "swe:QuantityRange",
                Some(&r.unit),
                &format!(
                    "{} {}",
                    primitives::encode_double(r.lower),
                    primitives::encode_double(r.upper)
                ),
            )),
            Self::Text(v) => Ok(value_component("swe:Text", v.as_deref())),
            Self::TimeInstant(t) => {
                let mut component = Element::new("swe:Time").with_child(
                    Element::new("swe:uom").with_attr("xlink:href", names::UOM_ISO8601),
                );
                component.push_child(
                    Element::new("swe:value")
                        .with_text(primitives::encode_timestamp(t.time)?),
                );
                Ok(component)
            }
            Self::TimeRange(r) => {
                let mut component = Element::new("swe:TimeRange").with_child(
                    Element::new("swe:uom").with_attr("xlink:href", names::UOM_ISO8601),
                );
                component.push_child(Element::new("swe:value").with_text(format!(
                    "{} {}",
                    primitives::encode_timestamp(r.start)?,
                    primitives::encode_timestamp(r.end)?
                )));
                Ok(component)
            }
            Self::DataRecord(record) => record.to_element(id_prefix),
            Self::Array(array) => array.to_element(id_prefix),
            // Series are wrapped so field dispatch sees a single kind.
            Self::TimeSeriesConstant(series) => Ok(Element::new("cocop:TimeSeries")
                .with_child(series.to_element(id_prefix)?)),
            Self::TimeSeriesFlexible(series) => Ok(Element::new("cocop:TimeSeries")
                .with_child(series.to_element(id_prefix)?)),
        }
    }
}

/// Decode an item in data-record field position
///
/// Returns `Ok(None)` for unknown kinds so the caller can skip the field;
/// the top-level result slot has no such tolerance.
pub(crate) fn decode_field_item(element: &Element) -> Result<Option<Item>> {
    let item = match element.local_name() {
        "Boolean" => Item::Boolean(primitives::decode_bool(required_value_text(element)?)?),
        "Category" => Item::category(optional_value_text(element))?,
        "CategoryRange" => {
            let (lower, upper) = split_bounds(element.local_name(), required_value_text(element)?)?;
            Item::CategoryRange(CategoryRange::new(lower, upper)?)
        }
        "Count" => Item::Count(primitives::decode_long(required_value_text(element)?)?),
        "CountRange" => {
            let (lower, upper) = split_bounds(element.local_name(), required_value_text(element)?)?;
            Item::CountRange(CountRange::new(
                primitives::decode_long(&lower)?,
                primitives::decode_long(&upper)?,
            )?)
        }
        "Quantity" => {
            let unit = element
                .child("uom")
                .and_then(|u| u.attr("code"))
                .unwrap_or_default();
            Item::Measurement(Measurement::new(
                unit,
                primitives::decode_double(required_value_text(element)?)?,
            ))
        }
        "QuantityRange" => {
            let unit = element
                .child("uom")
                .and_then(|u| u.attr("code"))
                .unwrap_or_default()
                .to_string();
            let (lower, upper) = split_bounds(element.local_name(), required_value_text(element)?)?;
            Item::MeasurementRange(MeasurementRange::new(
                unit,
                primitives::decode_double(&lower)?,
                primitives::decode_double(&upper)?,
            )?)
        }
        "Text" => Item::text(optional_value_text(element)),
        "Time" => {
            let time = primitives::decode_timestamp(required_value_text(element)?)?
                .require_utc()?;
            Item::TimeInstant(TimeInstant::new(time)?)
        }
        "TimeRange" => {
            let (start, end) = split_bounds(element.local_name(), required_value_text(element)?)?;
            Item::TimeRange(TimeRange::new(
                primitives::decode_utc_timestamp(&start)?,
                primitives::decode_utc_timestamp(&end)?,
            )?)
        }
        "DataRecord" => Item::DataRecord(DataRecord::from_element(element)?),
        "DataArray" => Item::Array(Array::from_element(element)?),
        "TimeSeries" => {
            let series = element.required_child("TimeseriesDomainRange")?;
            timeseries::from_element_any(series)?
        }
        _ => return Ok(None),
    };
    Ok(Some(item))
}

fn value_component(name: &str, value: Option<&str>) -> Element {
    let mut component = Element::new(name);
    if let Some(value) = value {
        component.push_child(Element::new("swe:value").with_text(value));
    }
    component
}

fn range_component(name: &str, unit: Option<&str>, value_text: &str) -> Element {
    let mut component = Element::new(name);
    if let Some(unit) = unit {
        component.push_child(Element::new("swe:uom").with_attr("code", unit));
    }
    component.push_child(Element::new("swe:value").with_text(value_text));
    component
}

fn required_value_text(element: &Element) -> Result<&str> {
    Ok(element.required_child("value")?.text())
}

fn optional_value_text(element: &Element) -> &str {
    element.child("value").map(Element::text).unwrap_or_default()
}

/// Split a two-valued range text; any other count is a decode failure
fn split_bounds(context: &str, text: &str) -> Result<(String, String)> {
    let parts = primitives::decode_list(text);
    if parts.len() != 2 {
        return Err(MeasError::WrongValueCount {
            expected: 2,
            actual: parts.len(),
        }
        .in_context(context.to_string()));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

fn decode_bounds(result: &Element, component_name: &str) -> Result<(String, String)> {
    let component = result.required_child(component_name)?;
    split_bounds(component_name, component.required_child("value")?.text())
}

pub(crate) fn encode_time_instant(id: &str, time: time::OffsetDateTime) -> Result<Element> {
    Ok(Element::new("gml:TimeInstant")
        .with_attr("gml:id", id.to_string())
        .with_child(
            Element::new("gml:timePosition").with_text(primitives::encode_timestamp(time)?),
        ))
}

pub(crate) fn decode_time_instant(instant: &Element) -> Result<time::OffsetDateTime> {
    primitives::decode_utc_timestamp(instant.required_child("timePosition")?.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::DataQuality;
    use time::macros::datetime;
    use time::Duration;

    fn result_round_trip(item: Item) -> Item {
        let tag = item.type_tag();
        let element = item.encode_as_result("X").unwrap();
        Item::decode_result(tag, &element).unwrap()
    }

    fn field_round_trip(item: Item) -> Item {
        let element = item.encode_as_field("X").unwrap();
        decode_field_item(&element).unwrap().unwrap()
    }

    fn sample_items() -> Vec<Item> {
        let mut record = DataRecord::new();
        record
            .add("temperature", Item::from(Measurement::new("Cel", 21.5)))
            .unwrap();

        let mut array = Array::new(vec![
            crate::array::Column::new("t", crate::array::ColumnType::Time).unwrap(),
            crate::array::Column::new("v", crate::array::ColumnType::Double)
                .unwrap()
                .with_unit("kg")
                .unwrap(),
        ]);
        array
            .add_row(vec![
                Some(datetime!(2020-06-01 08:00 UTC).into()),
                Some(4.25.into()),
            ])
            .unwrap();

        let mut constant = TimeSeriesConstant::new(
            "Cel",
            datetime!(2020-06-01 00:00 UTC),
            Duration::hours(1),
        )
        .unwrap();
        constant.add(20.0);
        constant.add_with_quality(21.0, DataQuality::bad());

        let mut flexible = TimeSeriesFlexible::new("kg");
        flexible.add(datetime!(2020-06-01 00:00 UTC), 1.0).unwrap();
        flexible.add(datetime!(2020-06-01 00:20 UTC), 2.0).unwrap();

        vec![
            Item::Boolean(true),
            Item::category("process/running").unwrap(),
            Item::empty_category(),
            Item::from(CategoryRange::new("b", "a").unwrap()),
            Item::Count(-3),
            Item::from(CountRange::new(2, 5).unwrap()),
            Item::from(Measurement::new("Cel", 22.4)),
            Item::from(MeasurementRange::new("m", 1.5, 2.5).unwrap()),
            Item::text("free text, with punctuation"),
            Item::Text(None),
            Item::from(TimeInstant::new(datetime!(2020-06-01 12:00 UTC)).unwrap()),
            Item::from(
                TimeRange::new(
                    datetime!(2020-06-01 00:00 UTC),
                    datetime!(2020-06-02 00:00 UTC),
                )
                .unwrap(),
            ),
            Item::from(record),
            Item::from(array),
            Item::from(constant),
            Item::from(flexible),
        ]
    }

    #[test]
    fn test_result_round_trip_all_variants() {
        for item in sample_items() {
            assert_eq!(result_round_trip(item.clone()), item);
        }
    }

    #[test]
    fn test_field_round_trip_all_variants() {
        for item in sample_items() {
            assert_eq!(field_round_trip(item.clone()), item);
        }
    }

    #[test]
    fn test_measurement_round_trip_precision() {
        let decoded = result_round_trip(Item::from(Measurement::new("Cel", 22.4)));
        let Item::Measurement(m) = decoded else {
            panic!("expected a measurement");
        };
        assert_eq!(m.unit, "Cel");
        assert!((m.value - 22.4).abs() < 1e-4);
    }

    #[test]
    fn test_range_decode_requires_two_values() {
        let element = Element::new("om:result").with_child(
            Element::new("swe:CountRange")
                .with_child(Element::new("swe:value").with_text("1 2 3")),
        );
        let err = Item::decode_result(TypeTag::CountRange, &element).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            MeasError::WrongValueCount {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_unknown_field_kind_is_none() {
        let element = Element::new("swe:Matrix");
        assert!(decode_field_item(&element).unwrap().is_none());
    }

    #[test]
    fn test_field_time_requires_zone() {
        let element = Element::new("swe:Time")
            .with_child(Element::new("swe:value").with_text("2020-06-01T12:00:00"));
        assert!(matches!(
            decode_field_item(&element),
            Err(MeasError::DateTime { .. })
        ));
    }
}
