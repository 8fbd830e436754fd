//! Envelope round-trips and root-element dispatch

use cocop_meas::{
    DataQuality, DataRecord, Envelope, GetObservationRequest, GetObservationResponse,
    InsertObservationRequest, InsertObservationResponse, Item, MeasError, Measurement,
    Observation, RequestResult, RequestStatus, TaskOperation, TaskRequest, TaskResponse,
    TaskStatusCode, TaskStatusReport, TemporalFilter,
};
use time::macros::datetime;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn sample_observation() -> Observation {
    let mut observation = Observation::new(Item::from(Measurement::new("kg", 5.6)));
    observation
        .set_phenomenon_time(datetime!(2020-02-01 10:00 UTC))
        .unwrap();
    observation
        .set_result_time(datetime!(2020-02-01 10:00 UTC))
        .unwrap();
    observation.set_feature_of_interest("plant/sensor1");
    observation.set_result_quality(DataQuality::bad_with_reason("sensor_fault").unwrap());
    observation
}

#[test]
fn every_known_root_dispatches() {
    init_logging();

    let request = GetObservationRequest {
        features_of_interest: vec!["plant/sensor1".into()],
        observed_properties: vec!["mass".into()],
        temporal_filters: vec![TemporalFilter::Before(datetime!(2021-01-01 00:00 UTC))],
    };
    let response = GetObservationResponse {
        result: RequestResult::Ok,
        observations: vec![sample_observation()],
    };
    let insert = InsertObservationRequest {
        observations: vec![sample_observation()],
    };
    let insert_response = InsertObservationResponse {
        result: RequestResult::Ok,
    };
    let task_request = TaskRequest::submit("furnace/tasking", DataRecord::new());
    let task_response = TaskResponse {
        operation: TaskOperation::Cancel,
        status_reports: vec![],
    };

    let cases: Vec<(Vec<u8>, fn(&Envelope) -> bool)> = vec![
        (sample_observation().to_xml_bytes().unwrap(), |e| {
            matches!(e, Envelope::Observation(_))
        }),
        (request.to_xml_bytes().unwrap(), |e| {
            matches!(e, Envelope::GetObservationRequest(_))
        }),
        (response.to_xml_bytes().unwrap(), |e| {
            matches!(e, Envelope::GetObservationResponse(_))
        }),
        (insert.to_xml_bytes().unwrap(), |e| {
            matches!(e, Envelope::InsertObservationRequest(_))
        }),
        (insert_response.to_xml_bytes().unwrap(), |e| {
            matches!(e, Envelope::InsertObservationResponse(_))
        }),
        (task_request.to_xml_bytes().unwrap(), |e| {
            matches!(e, Envelope::TaskRequest(_))
        }),
        (task_response.to_xml_bytes().unwrap(), |e| {
            matches!(e, Envelope::TaskResponse(_))
        }),
    ];
    for (bytes, check) in cases {
        let envelope = Envelope::from_xml_bytes(&bytes).unwrap();
        assert!(check(&envelope), "wrong envelope for {envelope:?}");
    }
}

#[test]
fn unknown_root_is_rejected() {
    let err = Envelope::from_xml_bytes(b"<cocop:DeleteEverything/>").unwrap_err();
    assert!(matches!(err, MeasError::UnsupportedRootElement { .. }));
}

#[test]
fn get_observation_response_carries_payload() {
    let response = GetObservationResponse {
        result: RequestResult::Ok,
        observations: vec![sample_observation(), sample_observation()],
    };
    let bytes = response.to_xml_bytes().unwrap();
    let decoded = GetObservationResponse::from_xml_bytes(&bytes).unwrap();
    assert_eq!(decoded.observations.len(), 2);
    assert_eq!(decoded.observations[0].feature_of_interest(), "plant/sensor1");
    assert!(!decoded.observations[0].result_quality().is_good());
}

#[test]
fn task_lifecycle_round_trip() {
    let mut parameters = DataRecord::new();
    parameters
        .add("setpoint", Item::from(Measurement::new("Cel", 300.0)))
        .unwrap();
    parameters
        .add("ramp", Item::from(Measurement::new("Cel/min", 5.0)))
        .unwrap();

    let submit = TaskRequest::submit("furnace/tasking", parameters.clone());
    let submit_bytes = submit.to_xml_bytes().unwrap();
    let decoded_submit = TaskRequest::from_xml_bytes(&submit_bytes).unwrap();
    assert_eq!(decoded_submit, submit);

    let mut report = TaskStatusReport::new("task-17", "furnace/tasking");
    report.request_status = RequestStatus::Accepted;
    report.task_status_code = Some(TaskStatusCode::Reserved);
    report.parameters = parameters;
    report.update_time = datetime!(2020-02-01 10:05 UTC);

    let response = TaskResponse {
        operation: TaskOperation::Submit,
        status_reports: vec![report.clone()],
    };
    let response_bytes = response.to_xml_bytes().unwrap();
    let decoded_response = TaskResponse::from_xml_bytes(&response_bytes).unwrap();
    assert_eq!(decoded_response.status_reports, vec![report]);

    let cancel = TaskRequest {
        operation: TaskOperation::Cancel,
        procedure_id: String::new(),
        task_id: Some("task-17".into()),
        parameters: DataRecord::new(),
    };
    let cancel_bytes = cancel.to_xml_bytes().unwrap();
    assert_eq!(TaskRequest::from_xml_bytes(&cancel_bytes).unwrap(), cancel);
}

#[test]
fn observation_decode_errors_are_wrapped() {
    let bytes = sample_observation().to_xml_bytes().unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let corrupted = text.replace("5.6", "five-point-six");
    let err = Observation::from_xml_bytes(corrupted.as_bytes()).unwrap_err();
    assert!(err.to_string().starts_with("decode observation:"));
}
