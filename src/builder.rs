//! Builder pattern for creating observations

use time::OffsetDateTime;

use crate::error::Result;
use crate::item::Item;
use crate::observation::Observation;
use crate::quality::DataQuality;
use crate::record::DataRecord;

/// Builder for creating observations with a fluent API
///
/// Every value is validated when [`build`](ObservationBuilder::build) runs,
/// so an invalid timestamp surfaces as an error instead of a panic.
#[derive(Debug)]
pub struct ObservationBuilder {
    result: Item,
    name: Option<String>,
    description: Option<String>,
    phenomenon_time: Option<OffsetDateTime>,
    result_time: Option<OffsetDateTime>,
    procedure: Option<String>,
    observed_property: Option<String>,
    feature_of_interest: Option<String>,
    feature_of_interest_details: Option<DataRecord>,
    result_quality: Option<DataQuality>,
}

impl ObservationBuilder {
    /// Start a builder around the result item
    pub fn new(result: Item) -> Self {
        Self {
            result,
            name: None,
            description: None,
            phenomenon_time: None,
            result_time: None,
            procedure: None,
            observed_property: None,
            feature_of_interest: None,
            feature_of_interest_details: None,
            result_quality: None,
        }
    }

    /// Set the observation name
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the observation description
    pub fn description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the phenomenon time (must be UTC)
    pub fn phenomenon_time(mut self, time: OffsetDateTime) -> Self {
        self.phenomenon_time = Some(time);
        self
    }

    /// Set the result time (must be UTC)
    pub fn result_time(mut self, time: OffsetDateTime) -> Self {
        self.result_time = Some(time);
        self
    }

    /// Set the producing procedure reference
    pub fn procedure<S: Into<String>>(mut self, procedure: S) -> Self {
        self.procedure = Some(procedure.into());
        self
    }

    /// Set the observed property reference
    pub fn observed_property<S: Into<String>>(mut self, observed_property: S) -> Self {
        self.observed_property = Some(observed_property.into());
        self
    }

    /// Set the feature-of-interest name
    pub fn feature_of_interest<S: Into<String>>(mut self, feature: S) -> Self {
        self.feature_of_interest = Some(feature.into());
        self
    }

    /// Attach a structured feature of interest
    pub fn feature_of_interest_details(mut self, details: DataRecord) -> Self {
        self.feature_of_interest_details = Some(details);
        self
    }

    /// Set the result quality
    pub fn result_quality(mut self, quality: DataQuality) -> Self {
        self.result_quality = Some(quality);
        self
    }

    /// Build the observation, validating every pending value
    pub fn build(self) -> Result<Observation> {
        let mut observation = Observation::new(self.result);
        if let Some(time) = self.phenomenon_time {
            observation.set_phenomenon_time(time)?;
            // The result time tracks the phenomenon time unless set apart.
            if self.result_time.is_none() {
                observation.set_result_time(time)?;
            }
        }
        if let Some(time) = self.result_time {
            observation.set_result_time(time)?;
        }
        observation.set_name(self.name);
        observation.set_description(self.description);
        if let Some(procedure) = self.procedure {
            observation.set_procedure(procedure);
        }
        if let Some(observed_property) = self.observed_property {
            observation.set_observed_property(observed_property);
        }
        if let Some(feature) = self.feature_of_interest {
            observation.set_feature_of_interest(feature);
        }
        if self.feature_of_interest_details.is_some() {
            observation.set_feature_of_interest_details(self.feature_of_interest_details);
        }
        if let Some(quality) = self.result_quality {
            observation.set_result_quality(quality);
        }
        Ok(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Measurement;
    use time::macros::datetime;

    #[test]
    fn test_builder_sets_fields() {
        let observation = ObservationBuilder::new(Item::from(Measurement::new("Cel", 22.5)))
            .name("furnace temperature")
            .phenomenon_time(datetime!(2020-02-01 10:00 UTC))
            .procedure("thermometer/2")
            .observed_property("temperature")
            .feature_of_interest("plant/furnace1")
            .result_quality(DataQuality::bad())
            .build()
            .unwrap();
        assert_eq!(observation.name(), Some("furnace temperature"));
        assert_eq!(observation.procedure(), "thermometer/2");
        assert_eq!(
            observation.result_time(),
            datetime!(2020-02-01 10:00 UTC)
        );
        assert!(!observation.result_quality().is_good());
    }

    #[test]
    fn test_builder_rejects_non_utc() {
        let result = ObservationBuilder::new(Item::Count(1))
            .phenomenon_time(datetime!(2020-02-01 10:00 +02:00))
            .build();
        assert!(result.is_err());
    }
}
