//! Ordered named-field composite items

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{MeasError, Result, ResultExt};
use crate::item::Item;
use crate::quality::DataQuality;
use crate::xml::{names, Element};

/// An ordered mapping from field names to items, each optionally
/// quality-tagged
///
/// Field names are unique within one record. A quality can only be attached
/// to a field whose item reports
/// [`supports_quality_in_record`](Item::supports_quality_in_record); nested
/// records, arrays and time series carry their quality per element instead.
///
/// The optional identifier is used when a record stands in for a structured
/// feature of interest or a tasking-parameter carrier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataRecord {
    identifier: Option<String>,
    fields: Vec<RecordField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RecordField {
    name: String,
    item: Item,
    quality: Option<DataQuality>,
}

impl DataRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// The record identifier, if any
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Set or clear the record identifier
    pub fn set_identifier<S: Into<String>>(&mut self, identifier: Option<S>) {
        self.identifier = identifier.map(Into::into);
    }

    /// Builder-style identifier
    pub fn with_identifier<S: Into<String>>(mut self, identifier: S) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Append a field; fails with `DuplicateField` if the name is taken
    pub fn add<S: Into<String>>(&mut self, name: S, item: Item) -> Result<()> {
        self.insert(name.into(), item, None)
    }

    /// Append a field with an explicit quality
    ///
    /// Fails with `UnsupportedQuality` if the item is a composite that
    /// cannot carry a quality in record position.
    pub fn add_with_quality<S: Into<String>>(
        &mut self,
        name: S,
        item: Item,
        quality: DataQuality,
    ) -> Result<()> {
        self.insert(name.into(), item, Some(quality))
    }

    fn insert(&mut self, name: String, item: Item, quality: Option<DataQuality>) -> Result<()> {
        if self.fields.iter().any(|f| f.name == name) {
            return Err(MeasError::DuplicateField { name });
        }
        if quality.is_some() && !item.supports_quality_in_record() {
            return Err(MeasError::UnsupportedQuality { name });
        }
        self.fields.push(RecordField {
            name,
            item,
            quality,
        });
        Ok(())
    }

    /// The item stored under a field name
    pub fn get(&self, name: &str) -> Result<&Item> {
        self.field(name).map(|f| &f.item)
    }

    /// The quality of a field; defaults to good when none was attached
    ///
    /// Fails with `UnsupportedQuality` if the stored item can never carry
    /// one in this position.
    pub fn get_quality(&self, name: &str) -> Result<DataQuality> {
        let field = self.field(name)?;
        if !field.item.supports_quality_in_record() {
            return Err(MeasError::UnsupportedQuality {
                name: name.to_string(),
            });
        }
        Ok(field.quality.clone().unwrap_or_default())
    }

    fn field(&self, name: &str) -> Result<&RecordField> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| MeasError::FieldNotFound {
                name: name.to_string(),
            })
    }

    /// Field names in insertion order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Iterate fields as `(name, item, quality)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Item, Option<&DataQuality>)> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), &f.item, f.quality.as_ref()))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode as a `swe:DataRecord` element
    ///
    /// An empty record is encoded with a single placeholder field because
    /// the external schema forbids truly empty records; the placeholder is
    /// stripped again on decode.
    pub(crate) fn to_element(&self, id_prefix: &str) -> Result<Element> {
        let mut record = Element::new("swe:DataRecord");
        if let Some(identifier) = &self.identifier {
            record.push_child(Element::new("swe:identifier").with_text(identifier));
        }
        if self.fields.is_empty() {
            let placeholder = Element::new("swe:field")
                .with_attr("name", names::EMPTY_RECORD_FIELD)
                .with_child(Item::Text(None).encode_as_field(id_prefix)?);
            record.push_child(placeholder);
            return Ok(record);
        }
        for field in &self.fields {
            let prefix = format!("{id_prefix}_{}", field.name);
            let mut item_el = field
                .item
                .encode_as_field(&prefix)
                .context(format!("field '{}'", field.name))?;
            if let Some(quality) = &field.quality {
                item_el.push_child(quality_element(quality));
            }
            record.push_child(
                Element::new("swe:field")
                    .with_attr("name", &field.name)
                    .with_child(item_el),
            );
        }
        Ok(record)
    }

    /// Decode from a `swe:DataRecord` element
    ///
    /// Fields of an unknown kind are skipped rather than failing the whole
    /// record; any other per-field failure is wrapped with the field name.
    pub(crate) fn from_element(element: &Element) -> Result<Self> {
        let mut record = DataRecord::new();
        if let Some(identifier) = element.child("identifier") {
            let text = identifier.text();
            if !text.is_empty() {
                record.identifier = Some(text.to_string());
            }
        }
        for field_el in element.children_named("field") {
            let name = field_el.required_attr("name")?;
            if name == names::EMPTY_RECORD_FIELD {
                continue;
            }
            record
                .decode_field(name, field_el)
                .context(format!("field '{name}'"))?;
        }
        Ok(record)
    }

    fn decode_field(&mut self, name: &str, field_el: &Element) -> Result<()> {
        let Some(item_el) = field_el.children().first() else {
            tracing::warn!(field = name, "skipping field with no item element");
            return Ok(());
        };
        let Some(item) = codec::decode_field_item(item_el)? else {
            tracing::warn!(
                field = name,
                kind = item_el.local_name(),
                "skipping field of unknown kind"
            );
            return Ok(());
        };
        match decode_quality(item_el)? {
            Some(quality) => self.add_with_quality(name, item, quality),
            None => self.add(name, item),
        }
    }
}

fn quality_element(quality: &DataQuality) -> Element {
    Element::new("swe:quality").with_child(
        Element::new("swe:Category")
            .with_child(Element::new("swe:value").with_text(quality.value())),
    )
}

fn decode_quality(item_el: &Element) -> Result<Option<DataQuality>> {
    let Some(quality_el) = item_el.child("quality") else {
        return Ok(None);
    };
    let value = quality_el
        .required_child("Category")?
        .required_child("value")?
        .text();
    DataQuality::parse(value).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{Array, Column, ColumnType};
    use crate::item::Measurement;

    fn sample_record() -> DataRecord {
        let mut record = DataRecord::new();
        record
            .add("temperature", Item::from(Measurement::new("Cel", 22.4)))
            .unwrap();
        record
            .add_with_quality(
                "pressure",
                Item::from(Measurement::new("bar", 1.2)),
                DataQuality::bad_with_reason("drift").unwrap(),
            )
            .unwrap();
        record
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut record = sample_record();
        assert!(matches!(
            record.add("temperature", Item::Count(1)),
            Err(MeasError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_quality_on_composite_rejected() {
        let mut record = DataRecord::new();
        assert!(matches!(
            record.add_with_quality(
                "nested",
                Item::from(DataRecord::new()),
                DataQuality::good()
            ),
            Err(MeasError::UnsupportedQuality { .. })
        ));

        let array = Array::new(vec![Column::new("a", ColumnType::Long).unwrap()]);
        assert!(record
            .add_with_quality("grid", Item::from(array), DataQuality::good())
            .is_err());
    }

    #[test]
    fn test_lookup() {
        let record = sample_record();
        assert!(record.get("temperature").is_ok());
        assert!(matches!(
            record.get("missing"),
            Err(MeasError::FieldNotFound { .. })
        ));
        assert!(record.get_quality("temperature").unwrap().is_good());
        assert_eq!(
            record.get_quality("pressure").unwrap().value(),
            "bad/drift"
        );
        assert_eq!(record.field_names(), vec!["temperature", "pressure"]);
    }

    #[test]
    fn test_get_quality_on_composite_field() {
        let mut record = DataRecord::new();
        record.add("nested", Item::from(DataRecord::new())).unwrap();
        assert!(matches!(
            record.get_quality("nested"),
            Err(MeasError::UnsupportedQuality { .. })
        ));
    }

    #[test]
    fn test_element_round_trip() {
        let record = sample_record().with_identifier("plant/sensor1");
        let element = record.to_element("R").unwrap();
        let decoded = DataRecord::from_element(&element).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_empty_record_round_trip() {
        let record = DataRecord::new();
        let element = record.to_element("R").unwrap();
        // The wire form carries the placeholder field.
        assert_eq!(element.children_named("field").count(), 1);
        let decoded = DataRecord::from_element(&element).unwrap();
        assert!(decoded.is_empty());
        assert!(decoded.field_names().is_empty());
    }

    #[test]
    fn test_unknown_field_kind_skipped() {
        let element = Element::new("swe:DataRecord")
            .with_child(
                Element::new("swe:field")
                    .with_attr("name", "strange")
                    .with_child(Element::new("swe:Matrix")),
            )
            .with_child(
                Element::new("swe:field")
                    .with_attr("name", "count")
                    .with_child(
                        Element::new("swe:Count")
                            .with_child(Element::new("swe:value").with_text("3")),
                    ),
            );
        let decoded = DataRecord::from_element(&element).unwrap();
        assert_eq!(decoded.field_names(), vec!["count"]);
    }

    #[test]
    fn test_field_error_is_locatable() {
        let element = Element::new("swe:DataRecord").with_child(
            Element::new("swe:field")
                .with_attr("name", "count")
                .with_child(
                    Element::new("swe:Count")
                        .with_child(Element::new("swe:value").with_text("abc")),
                ),
        );
        let err = DataRecord::from_element(&element).unwrap_err();
        assert!(err.to_string().contains("field 'count'"));
        assert!(matches!(err.root_cause(), MeasError::Parse { .. }));
    }
}
