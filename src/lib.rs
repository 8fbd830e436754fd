//! # COCOP Meas - Measurement Message Codec for Rust
//!
//! A typed object model for measurement and observation data (categories,
//! counts, measurements, ranges, data records, arrays, time series) that
//! serialises to and from the O&M / SWE Common family of XML schemas.
//!
//! ## Features
//!
//! - **Closed item model**: every result shape is one variant of [`Item`],
//!   so dispatch is exhaustive and checked by the compiler
//! - **Two wire positions**: items encode differently as a top-level
//!   observation result and as a data-record field, and both round-trip
//! - **Validated construction**: UTC timestamps, ordered ranges, unique
//!   field names and typed array cells are enforced when values are built,
//!   not when they are encoded
//! - **Locatable decode errors**: nested failures carry the field, row or
//!   element they occurred in
//! - **Deterministic output**: encoding the same message twice yields
//!   identical bytes; document ids are derived hierarchically, never random
//!
//! ## Quick Start
//!
//! ```rust
//! use cocop_meas::{Item, Measurement, Observation, Result};
//!
//! fn example() -> Result<()> {
//!     // Wrap a measurement into an observation and put it on the wire.
//!     let mut observation = Observation::new(Item::from(Measurement::new("Cel", 22.5)));
//!     observation.set_feature_of_interest("plant/furnace1");
//!
//!     let bytes = observation.to_xml_bytes()?;
//!     let decoded = Observation::from_xml_bytes(&bytes)?;
//!     assert_eq!(decoded.result(), observation.result());
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
//!
//! ## Data model
//!
//! An [`Observation`] binds one [`Item`] to its metadata (phenomenon and
//! result time, procedure, observed property, feature of interest and a
//! [`DataQuality`]). Items are either scalars (boolean, category, count,
//! measurement, text, time instant and the range forms), or composites:
//! [`DataRecord`] (named fields, recursive), [`Array`] (typed columns and
//! rows) and the two time-series kinds ([`TimeSeriesConstant`],
//! [`TimeSeriesFlexible`]).
//!
//! The thin request/response envelopes around the codec live in
//! [`envelope`]; [`envelope::Envelope::from_xml_bytes`] picks the right
//! decoder from the root element name.

pub mod array;
pub mod builder;
pub mod cache;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod item;
pub mod observation;
pub mod primitives;
pub mod quality;
pub mod record;
pub mod timeseries;
pub mod xml;

// Re-export main types
pub use array::{Array, CellValue, Column, ColumnType};
pub use builder::ObservationBuilder;
pub use cache::{CodecCache, ResultCodec};
pub use envelope::{
    Envelope, GetObservationRequest, GetObservationResponse, InsertObservationRequest,
    InsertObservationResponse, RequestResult, RequestStatus, TaskOperation, TaskRequest,
    TaskResponse, TaskStatusCode, TaskStatusReport, TemporalFilter,
};
pub use error::{MeasError, Result};
pub use item::{
    CategoryRange, CountRange, Item, Measurement, MeasurementRange, TimeInstant, TimeRange,
    TypeTag,
};
pub use observation::Observation;
pub use quality::DataQuality;
pub use record::DataRecord;
pub use timeseries::{TimeSeriesConstant, TimeSeriesFlexible};

/// Media types of the wire documents
pub mod media_type {
    /// Generic XML payloads
    pub const XML: &str = "application/xml";
    /// O&M observation documents
    pub const OM_XML: &str = "application/om+xml";
}
