//! The observation envelope binding a result item to its O&M metadata

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::cache::CodecCache;
use crate::codec;
use crate::error::{MeasError, Result, ResultExt};
use crate::item::{Item, TypeTag};
use crate::primitives;
use crate::quality::DataQuality;
use crate::record::DataRecord;
use crate::xml::{names, Element};

/// Deterministic id prefix of the document root
///
/// Wire elements that need document-unique ids derive them from this prefix
/// hierarchically; ids are never generated randomly so that encoding the
/// same observation twice yields identical bytes.
const ROOT_ID: &str = "Obs";

/// A timestamped, quality-annotated wrapper around one result item
///
/// All timestamps are UTC; the setters re-validate, so a constructed
/// observation can always be encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    name: Option<String>,
    description: Option<String>,
    phenomenon_time: OffsetDateTime,
    result_time: OffsetDateTime,
    procedure: String,
    observed_property: String,
    feature_of_interest: String,
    feature_of_interest_details: Option<DataRecord>,
    result_quality: DataQuality,
    result: Item,
}

impl Observation {
    /// Wrap a result item with default metadata
    ///
    /// Both times default to now, the quality to good and the reference
    /// strings to empty.
    pub fn new(result: Item) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            name: None,
            description: None,
            phenomenon_time: now,
            result_time: now,
            procedure: String::new(),
            observed_property: String::new(),
            feature_of_interest: String::new(),
            feature_of_interest_details: None,
            result_quality: DataQuality::good(),
            result,
        }
    }

    pub fn result(&self) -> &Item {
        &self.result
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name<S: Into<String>>(&mut self, name: Option<S>) {
        self.name = name.map(Into::into);
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description<S: Into<String>>(&mut self, description: Option<S>) {
        self.description = description.map(Into::into);
    }

    pub fn phenomenon_time(&self) -> OffsetDateTime {
        self.phenomenon_time
    }

    /// Fails with `DateTime` unless the timestamp is UTC
    pub fn set_phenomenon_time(&mut self, time: OffsetDateTime) -> Result<()> {
        self.phenomenon_time = primitives::ensure_utc(time)?;
        Ok(())
    }

    pub fn result_time(&self) -> OffsetDateTime {
        self.result_time
    }

    /// Fails with `DateTime` unless the timestamp is UTC
    pub fn set_result_time(&mut self, time: OffsetDateTime) -> Result<()> {
        self.result_time = primitives::ensure_utc(time)?;
        Ok(())
    }

    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn set_procedure<S: Into<String>>(&mut self, procedure: S) {
        self.procedure = procedure.into();
    }

    pub fn observed_property(&self) -> &str {
        &self.observed_property
    }

    pub fn set_observed_property<S: Into<String>>(&mut self, observed_property: S) {
        self.observed_property = observed_property.into();
    }

    pub fn feature_of_interest(&self) -> &str {
        &self.feature_of_interest
    }

    pub fn set_feature_of_interest<S: Into<String>>(&mut self, feature: S) {
        self.feature_of_interest = feature.into();
    }

    pub fn feature_of_interest_details(&self) -> Option<&DataRecord> {
        self.feature_of_interest_details.as_ref()
    }

    /// Attach a structured feature of interest
    ///
    /// If the record carries an identifier it becomes the feature name;
    /// otherwise the current feature name is carried as the record's
    /// identifier on encode.
    pub fn set_feature_of_interest_details(&mut self, details: Option<DataRecord>) {
        if let Some(identifier) = details.as_ref().and_then(DataRecord::identifier) {
            self.feature_of_interest = identifier.to_string();
        }
        self.feature_of_interest_details = details;
    }

    pub fn result_quality(&self) -> &DataQuality {
        &self.result_quality
    }

    pub fn set_result_quality(&mut self, quality: DataQuality) {
        self.result_quality = quality;
    }

    /// Encode as a standalone `om:OM_Observation` document
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        let mut root = self.to_element(ROOT_ID).context("encode observation")?;
        names::declare_namespaces(&mut root);
        root.to_document_bytes()
    }

    /// Decode a standalone `om:OM_Observation` document
    pub fn from_xml_bytes(bytes: &[u8]) -> Result<Self> {
        let root = Element::parse(bytes)?;
        if root.local_name() != "OM_Observation" {
            return Err(MeasError::UnsupportedRootElement {
                name: root.local_name().to_string(),
            });
        }
        Self::from_element(&root).context("decode observation")
    }

    pub(crate) fn to_element(&self, id_prefix: &str) -> Result<Element> {
        let mut root = Element::new("om:OM_Observation").with_attr("gml:id", id_prefix);
        if let Some(description) = &self.description {
            root.push_child(Element::new("gml:description").with_text(description));
        }
        if let Some(name) = &self.name {
            root.push_child(Element::new("gml:name").with_text(name));
        }
        let codec = CodecCache::shared().codec_for(self.result.type_tag());
        root.push_child(Element::new("om:type").with_attr("xlink:href", codec.uri()));
        root.push_child(
            Element::new("om:phenomenonTime").with_child(codec::encode_time_instant(
                &format!("{id_prefix}_phenoTime"),
                self.phenomenon_time,
            )?),
        );
        root.push_child(
            Element::new("om:resultTime").with_child(codec::encode_time_instant(
                &format!("{id_prefix}_resTime"),
                self.result_time,
            )?),
        );
        if !self.procedure.is_empty() {
            root.push_child(
                Element::new("om:procedure").with_attr("xlink:title", &self.procedure),
            );
        }
        if !self.observed_property.is_empty() {
            root.push_child(
                Element::new("om:observedProperty")
                    .with_attr("xlink:title", &self.observed_property),
            );
        }
        if let Some(feature) = self.feature_element(id_prefix)? {
            root.push_child(feature);
        }
        if self.result_quality.value() != "good" {
            root.push_child(
                Element::new("om:resultQuality")
                    .with_attr("xlink:title", self.result_quality.value()),
            );
        }
        root.push_child(codec.encode(&self.result, &format!("{id_prefix}_result"))?);
        Ok(root)
    }

    fn feature_element(&self, id_prefix: &str) -> Result<Option<Element>> {
        match &self.feature_of_interest_details {
            Some(details) if !details.is_empty() => {
                let mut details = details.clone();
                if !self.feature_of_interest.is_empty() {
                    details.set_identifier(Some(self.feature_of_interest.as_str()));
                }
                Ok(Some(
                    Element::new("om:featureOfInterest")
                        .with_child(details.to_element(&format!("{id_prefix}_foi"))?),
                ))
            }
            _ if !self.feature_of_interest.is_empty() => Ok(Some(
                Element::new("om:featureOfInterest")
                    .with_attr("xlink:title", &self.feature_of_interest),
            )),
            _ => Ok(None),
        }
    }

    pub(crate) fn from_element(root: &Element) -> Result<Self> {
        let uri = root.required_child("type")?.required_attr("href")?;
        let tag = TypeTag::from_uri(uri)?;

        let phenomenon_time = codec::decode_time_instant(
            root.required_child("phenomenonTime")?
                .required_child("TimeInstant")?,
        )
        .context("phenomenonTime")?;
        let result_time = codec::decode_time_instant(
            root.required_child("resultTime")?
                .required_child("TimeInstant")?,
        )
        .context("resultTime")?;

        let procedure = reference_title(root.child("procedure"));
        let observed_property = reference_title(root.child("observedProperty"));

        let (feature_of_interest, feature_of_interest_details) =
            decode_feature(root.child("featureOfInterest"))?;

        let result_quality = match root.child("resultQuality").and_then(|q| q.attr("title")) {
            Some(value) => DataQuality::parse(value).context("resultQuality")?,
            None => DataQuality::good(),
        };

        let codec = CodecCache::shared().codec_for(tag);
        let result = codec
            .decode(root.required_child("result")?)
            .context("result")?;

        Ok(Self {
            name: optional_text(root.child("name")),
            description: optional_text(root.child("description")),
            phenomenon_time,
            result_time,
            procedure,
            observed_property,
            feature_of_interest,
            feature_of_interest_details,
            result_quality,
            result,
        })
    }
}

// Convenience methods for JSON debugging and interop
#[cfg(feature = "json")]
impl Observation {
    /// Serialise to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialise to a pretty JSON string
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialise from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn optional_text(element: Option<&Element>) -> Option<String> {
    element
        .map(|e| e.text().to_string())
        .filter(|t| !t.is_empty())
}

fn reference_title(element: Option<&Element>) -> String {
    element
        .and_then(|e| e.attr("title"))
        .unwrap_or_default()
        .to_string()
}

fn decode_feature(element: Option<&Element>) -> Result<(String, Option<DataRecord>)> {
    let Some(element) = element else {
        return Ok((String::new(), None));
    };
    let title = element.attr("title");
    let structured = element.child("DataRecord");
    match (title, structured) {
        // A reference and a structured feature are mutually exclusive.
        (Some(_), Some(_)) => Err(MeasError::InconsistentFeatureOfInterest),
        (Some(title), None) => Ok((title.to_string(), None)),
        (None, Some(record_el)) => {
            let record = DataRecord::from_element(record_el).context("featureOfInterest")?;
            let name = record.identifier().unwrap_or_default().to_string();
            Ok((name, Some(record)))
        }
        (None, None) => Ok((String::new(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Measurement;
    use time::macros::datetime;

    fn round_trip(observation: &Observation) -> Observation {
        let bytes = observation.to_xml_bytes().unwrap();
        Observation::from_xml_bytes(&bytes).unwrap()
    }

    fn sample() -> Observation {
        let mut observation = Observation::new(Item::from(Measurement::new("kg", 5.6)));
        observation
            .set_phenomenon_time(datetime!(2020-02-01 10:00 UTC))
            .unwrap();
        observation
            .set_result_time(datetime!(2020-02-01 10:00:05 UTC))
            .unwrap();
        observation
    }

    #[test]
    fn test_defaults() {
        let observation = Observation::new(Item::Count(1));
        assert_eq!(observation.procedure(), "");
        assert_eq!(observation.observed_property(), "");
        assert_eq!(observation.feature_of_interest(), "");
        assert!(observation.result_quality().is_good());
        assert_eq!(observation.result_time(), observation.phenomenon_time());
    }

    #[test]
    fn test_setters_validate_utc() {
        let mut observation = sample();
        assert!(observation
            .set_phenomenon_time(datetime!(2020-02-01 10:00 +03:00))
            .is_err());
        assert!(observation
            .set_result_time(datetime!(2020-02-01 10:00 -05:00))
            .is_err());
    }

    #[test]
    fn test_round_trip_plain() {
        let observation = sample();
        assert_eq!(round_trip(&observation), observation);
    }

    #[test]
    fn test_round_trip_full_metadata() {
        let mut observation = sample();
        observation.set_name(Some("batch weight"));
        observation.set_description(Some("weight after drying"));
        observation.set_procedure("scale/3");
        observation.set_observed_property("mass");
        observation.set_feature_of_interest("plant/dryer1");
        observation.set_result_quality(DataQuality::bad_with_reason("overload").unwrap());
        assert_eq!(round_trip(&observation), observation);
    }

    #[test]
    fn test_round_trip_structured_feature() {
        let mut observation = sample();
        let mut details = DataRecord::new().with_identifier("plant/line2");
        details
            .add("position", Item::category("north_wing").unwrap())
            .unwrap();
        observation.set_feature_of_interest_details(Some(details));
        assert_eq!(observation.feature_of_interest(), "plant/line2");

        let decoded = round_trip(&observation);
        assert_eq!(decoded.feature_of_interest(), "plant/line2");
        assert_eq!(
            decoded.feature_of_interest_details(),
            observation.feature_of_interest_details()
        );
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let observation = sample();
        assert_eq!(
            observation.to_xml_bytes().unwrap(),
            observation.to_xml_bytes().unwrap()
        );
    }

    #[test]
    fn test_missing_times_fail() {
        let observation = sample();
        let bytes = observation.to_xml_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let without = text.replace(
            "<om:phenomenonTime><gml:TimeInstant gml:id=\"Obs_phenoTime\"><gml:timePosition>2020-02-01T10:00:00Z</gml:timePosition></gml:TimeInstant></om:phenomenonTime>",
            "",
        );
        assert_ne!(text, without);
        let err = Observation::from_xml_bytes(without.as_bytes()).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            MeasError::RequiredFieldMissing { .. }
        ));
    }

    #[test]
    fn test_inconsistent_feature_fails() {
        let element = Element::new("om:featureOfInterest")
            .with_attr("xlink:title", "plant/x")
            .with_child(Element::new("swe:DataRecord"));
        assert!(matches!(
            decode_feature(Some(&element)),
            Err(MeasError::InconsistentFeatureOfInterest)
        ));
    }

    #[test]
    fn test_unknown_type_uri_fails() {
        let observation = sample();
        let text = String::from_utf8(observation.to_xml_bytes().unwrap()).unwrap();
        let with_unknown = text.replace(
            TypeTag::Measurement.uri(),
            "http://example.org/notAType",
        );
        let err = Observation::from_xml_bytes(with_unknown.as_bytes()).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            MeasError::UnsupportedType { .. }
        ));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_round_trip() {
        let observation = sample();
        let json = observation.to_json().unwrap();
        let deserialized = Observation::from_json(&json).unwrap();
        assert_eq!(observation, deserialized);
    }

    #[test]
    fn test_wrong_root_fails() {
        assert!(matches!(
            Observation::from_xml_bytes(b"<other/>"),
            Err(MeasError::UnsupportedRootElement { .. })
        ));
    }
}
