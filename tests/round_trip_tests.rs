//! Round-trip coverage for every item variant
//!
//! Each variant is wrapped in an observation, encoded to bytes and decoded
//! again; the decoded result must match the original in every observable
//! field.

use cocop_meas::{
    Array, CategoryRange, CellValue, Column, ColumnType, CountRange, DataQuality, DataRecord,
    Item, Measurement, MeasurementRange, Observation, TimeInstant, TimeRange,
    TimeSeriesConstant, TimeSeriesFlexible,
};
use time::macros::datetime;
use time::Duration;

fn round_trip_result(item: Item) -> Item {
    let mut observation = Observation::new(item);
    observation
        .set_phenomenon_time(datetime!(2020-02-01 10:00 UTC))
        .unwrap();
    observation
        .set_result_time(datetime!(2020-02-01 10:00 UTC))
        .unwrap();
    let bytes = observation.to_xml_bytes().unwrap();
    Observation::from_xml_bytes(&bytes).unwrap().result().clone()
}

#[test]
fn boolean_round_trips() {
    for value in [true, false] {
        assert_eq!(round_trip_result(Item::Boolean(value)), Item::Boolean(value));
    }
}

#[test]
fn category_round_trips() {
    let item = Item::category("process/step4").unwrap();
    assert_eq!(round_trip_result(item.clone()), item);
    assert_eq!(
        round_trip_result(Item::empty_category()),
        Item::empty_category()
    );
}

#[test]
fn category_range_round_trips() {
    let item = Item::from(CategoryRange::new("startup", "shutdown").unwrap());
    assert_eq!(round_trip_result(item.clone()), item);
}

#[test]
fn count_round_trips() {
    let item = Item::Count(-7);
    assert_eq!(round_trip_result(item.clone()), item);
    let item = Item::from(CountRange::new(2, 5).unwrap());
    assert_eq!(round_trip_result(item.clone()), item);
}

#[test]
fn measurement_round_trips() {
    let decoded = round_trip_result(Item::from(Measurement::new("Cel", 22.4)));
    let Item::Measurement(m) = decoded else {
        panic!("expected a measurement, got {decoded:?}");
    };
    assert_eq!(m.unit, "Cel");
    assert!((m.value - 22.4).abs() < 1e-4);

    let item = Item::from(MeasurementRange::new("bar", 0.5, 1.5).unwrap());
    assert_eq!(round_trip_result(item.clone()), item);
}

#[test]
fn text_round_trips() {
    let item = Item::text("free text with spaces");
    assert_eq!(round_trip_result(item.clone()), item);
    assert_eq!(round_trip_result(Item::Text(None)), Item::Text(None));
}

#[test]
fn temporal_round_trips() {
    let instant = Item::from(TimeInstant::new(datetime!(2020-06-01 12:00:30 UTC)).unwrap());
    assert_eq!(round_trip_result(instant.clone()), instant);

    let range = Item::from(
        TimeRange::new(
            datetime!(2020-06-01 00:00 UTC),
            datetime!(2020-06-02 00:00 UTC),
        )
        .unwrap(),
    );
    assert_eq!(round_trip_result(range.clone()), range);
}

#[test]
fn data_record_round_trips() {
    let mut nested = DataRecord::new();
    nested
        .add("weight", Item::from(Measurement::new("kg", 12.0)))
        .unwrap();

    let mut record = DataRecord::new();
    record
        .add_with_quality(
            "temperature",
            Item::from(Measurement::new("Cel", 180.5)),
            DataQuality::bad_with_reason("sensor_warmup").unwrap(),
        )
        .unwrap();
    record.add("running", Item::Boolean(true)).unwrap();
    record.add("batch", Item::from(nested)).unwrap();

    let item = Item::from(record);
    assert_eq!(round_trip_result(item.clone()), item);
}

#[test]
fn empty_record_round_trips_invisible() {
    let decoded = round_trip_result(Item::from(DataRecord::new()));
    let Item::DataRecord(record) = decoded else {
        panic!("expected a data record, got {decoded:?}");
    };
    assert!(record.field_names().is_empty());
}

#[test]
fn array_round_trips() {
    let mut array = Array::new(vec![
        Column::new("sampled", ColumnType::Time).unwrap(),
        Column::new("thickness", ColumnType::Double)
            .unwrap()
            .with_unit("mm")
            .unwrap()
            .with_label("Sheet thickness"),
        Column::new("rejects", ColumnType::Long).unwrap(),
        Column::new("in_spec", ColumnType::Bool).unwrap(),
        Column::new("operator", ColumnType::Str).unwrap(),
    ]);
    array
        .add_row(vec![
            Some(CellValue::Time(datetime!(2020-05-01 06:00 UTC))),
            Some(CellValue::Double(1.204)),
            Some(CellValue::Long(0)),
            Some(CellValue::Bool(true)),
            Some(CellValue::from("night_shift")),
        ])
        .unwrap();
    array
        .add_row(vec![
            Some(CellValue::Time(datetime!(2020-05-01 07:00 UTC))),
            None,
            Some(CellValue::Long(3)),
            Some(CellValue::Bool(false)),
            None,
        ])
        .unwrap();

    let item = Item::from(array);
    assert_eq!(round_trip_result(item.clone()), item);
}

#[test]
fn time_series_constant_round_trips() {
    let mut series = TimeSeriesConstant::new(
        "t/h",
        datetime!(2020-03-01 00:00 UTC),
        Duration::minutes(15),
    )
    .unwrap()
    .with_description("feed rate");
    series.add(12.5);
    series.add_with_quality(0.0, DataQuality::bad_with_reason("belt_stop").unwrap());
    series.add(13.1);

    let item = Item::from(series);
    assert_eq!(round_trip_result(item.clone()), item);
}

#[test]
fn time_series_flexible_round_trips_exactly() {
    let mut series = TimeSeriesFlexible::new("kg");
    series.add(datetime!(2020-03-01 00:00 UTC), 1.0).unwrap();
    series
        .add_with_quality(
            datetime!(2020-03-01 00:20 UTC),
            2.0,
            DataQuality::bad(),
        )
        .unwrap();
    series.add(datetime!(2020-03-01 01:00 UTC), 3.0).unwrap();

    let decoded = round_trip_result(Item::from(series.clone()));
    let Item::TimeSeriesFlexible(decoded) = decoded else {
        panic!("expected a flexible time series");
    };
    assert_eq!(decoded.len(), 3);
    for index in 0..3 {
        assert_eq!(decoded.timestamp(index), series.timestamp(index));
        assert_eq!(decoded.value(index), series.value(index));
        assert_eq!(decoded.quality(index), series.quality(index));
    }
}
