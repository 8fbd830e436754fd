//! Thin request/response envelopes around the observation codec
//!
//! These types are simple aggregates: their payloads are observations and
//! data records, encoded with the same element-level codecs as everything
//! else. [`Envelope::from_xml_bytes`] sniffs the root element name to pick
//! the decoder; unknown roots fail with `UnsupportedRootElement`.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::codec;
use crate::error::{MeasError, Result, ResultExt};
use crate::observation::Observation;
use crate::primitives;
use crate::record::DataRecord;
use crate::xml::{names, Element};

/// Outcome flag carried by response envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestResult {
    Ok,
    Error,
}

impl RequestResult {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }

    fn parse(text: &str) -> Result<Self> {
        match text {
            "ok" => Ok(Self::Ok),
            "error" => Ok(Self::Error),
            other => Err(MeasError::parse("request result", other)),
        }
    }
}

/// A condition on the phenomenon time of requested observations
///
/// Mirrors the three temporal operators of the filter vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemporalFilter {
    /// Phenomenon time strictly after the given instant
    After(OffsetDateTime),
    /// Phenomenon time strictly before the given instant
    Before(OffsetDateTime),
    /// Phenomenon time within the given interval
    During {
        start: OffsetDateTime,
        end: OffsetDateTime,
    },
}

impl TemporalFilter {
    fn to_element(&self, id_prefix: &str) -> Result<Element> {
        let (name, body) = match self {
            Self::After(time) => (
                "fes:After",
                codec::encode_time_instant(&format!("{id_prefix}_time"), *time)?,
            ),
            Self::Before(time) => (
                "fes:Before",
                codec::encode_time_instant(&format!("{id_prefix}_time"), *time)?,
            ),
            Self::During { start, end } => (
                "fes:During",
                Element::new("gml:TimePeriod")
                    .with_attr("gml:id", format!("{id_prefix}_period"))
                    .with_child(
                        Element::new("gml:beginPosition")
                            .with_text(primitives::encode_timestamp(*start)?),
                    )
                    .with_child(
                        Element::new("gml:endPosition")
                            .with_text(primitives::encode_timestamp(*end)?),
                    ),
            ),
        };
        Ok(Element::new(name)
            .with_child(Element::new("fes:ValueReference").with_text("phenomenonTime"))
            .with_child(body))
    }

    fn from_element(element: &Element) -> Result<Option<Self>> {
        let filter = match element.local_name() {
            "After" => Self::After(codec::decode_time_instant(
                element.required_child("TimeInstant")?,
            )?),
            "Before" => Self::Before(codec::decode_time_instant(
                element.required_child("TimeInstant")?,
            )?),
            "During" => {
                let period = element.required_child("TimePeriod")?;
                Self::During {
                    start: primitives::decode_utc_timestamp(
                        period.required_child("beginPosition")?.text(),
                    )?,
                    end: primitives::decode_utc_timestamp(
                        period.required_child("endPosition")?.text(),
                    )?,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(filter))
    }
}

/// Request for observations matching feature, property and time conditions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetObservationRequest {
    pub features_of_interest: Vec<String>,
    pub observed_properties: Vec<String>,
    pub temporal_filters: Vec<TemporalFilter>,
}

impl GetObservationRequest {
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        let mut root = Element::new("cocop:GetObservationRequest");
        names::declare_namespaces(&mut root);
        for feature in &self.features_of_interest {
            root.push_child(Element::new("cocop:featureOfInterest").with_text(feature));
        }
        for property in &self.observed_properties {
            root.push_child(Element::new("cocop:observedProperty").with_text(property));
        }
        for (index, filter) in self.temporal_filters.iter().enumerate() {
            root.push_child(
                filter
                    .to_element(&format!("Filter{index}"))
                    .context("encode GetObservationRequest")?,
            );
        }
        root.to_document_bytes()
    }

    fn from_element(root: &Element) -> Result<Self> {
        let mut request = Self::default();
        for child in root.children() {
            match child.local_name() {
                "featureOfInterest" => request
                    .features_of_interest
                    .push(child.text().to_string()),
                "observedProperty" => request
                    .observed_properties
                    .push(child.text().to_string()),
                _ => {
                    if let Some(filter) = TemporalFilter::from_element(child)? {
                        request.temporal_filters.push(filter);
                    }
                }
            }
        }
        Ok(request)
    }

    pub fn from_xml_bytes(bytes: &[u8]) -> Result<Self> {
        match Envelope::from_xml_bytes(bytes)? {
            Envelope::GetObservationRequest(request) => Ok(request),
            other => Err(unexpected_envelope(&other)),
        }
    }
}

/// Response carrying the observations selected by a get request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetObservationResponse {
    pub result: RequestResult,
    pub observations: Vec<Observation>,
}

impl GetObservationResponse {
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        let mut root = Element::new("cocop:GetObservationResponse");
        names::declare_namespaces(&mut root);
        root.push_child(
            Element::new("cocop:requestResult").with_text(self.result.as_str()),
        );
        encode_observation_list(&mut root, &self.observations)
            .context("encode GetObservationResponse")?;
        root.to_document_bytes()
    }

    fn from_element(root: &Element) -> Result<Self> {
        Ok(Self {
            result: decode_request_result(root)?,
            observations: decode_observation_list(root)
                .context("decode GetObservationResponse")?,
        })
    }

    pub fn from_xml_bytes(bytes: &[u8]) -> Result<Self> {
        match Envelope::from_xml_bytes(bytes)? {
            Envelope::GetObservationResponse(response) => Ok(response),
            other => Err(unexpected_envelope(&other)),
        }
    }
}

/// Request to store new observations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InsertObservationRequest {
    pub observations: Vec<Observation>,
}

impl InsertObservationRequest {
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        let mut root = Element::new("cocop:InsertObservationRequest");
        names::declare_namespaces(&mut root);
        encode_observation_list(&mut root, &self.observations)
            .context("encode InsertObservationRequest")?;
        root.to_document_bytes()
    }

    fn from_element(root: &Element) -> Result<Self> {
        Ok(Self {
            observations: decode_observation_list(root)
                .context("decode InsertObservationRequest")?,
        })
    }

    pub fn from_xml_bytes(bytes: &[u8]) -> Result<Self> {
        match Envelope::from_xml_bytes(bytes)? {
            Envelope::InsertObservationRequest(request) => Ok(request),
            other => Err(unexpected_envelope(&other)),
        }
    }
}

/// Acknowledgement of an insert request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertObservationResponse {
    pub result: RequestResult,
}

impl InsertObservationResponse {
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        let mut root = Element::new("cocop:InsertObservationResponse");
        names::declare_namespaces(&mut root);
        root.push_child(
            Element::new("cocop:requestResult").with_text(self.result.as_str()),
        );
        root.to_document_bytes()
    }

    fn from_element(root: &Element) -> Result<Self> {
        Ok(Self {
            result: decode_request_result(root)?,
        })
    }

    pub fn from_xml_bytes(bytes: &[u8]) -> Result<Self> {
        match Envelope::from_xml_bytes(bytes)? {
            Envelope::InsertObservationResponse(response) => Ok(response),
            other => Err(unexpected_envelope(&other)),
        }
    }
}

/// Tasking operation selector; doubles as the wire root element name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOperation {
    Submit,
    Update,
    GetStatus,
    Cancel,
}

impl TaskOperation {
    fn root_name(self) -> &'static str {
        match self {
            Self::Submit => "Submit",
            Self::Update => "Update",
            Self::GetStatus => "GetStatus",
            Self::Cancel => "Cancel",
        }
    }

    fn from_root_name(name: &str) -> Option<Self> {
        match name {
            "Submit" => Some(Self::Submit),
            "Update" => Some(Self::Update),
            "GetStatus" => Some(Self::GetStatus),
            "Cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// A tasking request against a procedure
///
/// Submit addresses a procedure; the other operations address an existing
/// task, so they require a task id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub operation: TaskOperation,
    pub procedure_id: String,
    pub task_id: Option<String>,
    pub parameters: DataRecord,
}

impl TaskRequest {
    /// A submit request for a procedure
    pub fn submit<S: Into<String>>(procedure_id: S, parameters: DataRecord) -> Self {
        Self {
            operation: TaskOperation::Submit,
            procedure_id: procedure_id.into(),
            task_id: None,
            parameters,
        }
    }

    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        let mut root = Element::new(format!("sps:{}", self.operation.root_name()));
        names::declare_namespaces(&mut root);
        root.set_attr("service", "SPS");
        root.set_attr("version", "2.0.0");
        if !self.procedure_id.is_empty() {
            root.push_child(Element::new("sps:procedure").with_text(&self.procedure_id));
        }
        if self.operation != TaskOperation::Submit {
            let task_id = self
                .task_id
                .as_deref()
                .ok_or_else(|| MeasError::required("task"))?;
            root.push_child(Element::new("sps:targetTask").with_text(task_id));
        }
        if !self.parameters.is_empty() {
            root.push_child(
                Element::new("sps:taskingParameters")
                    .with_child(self.parameters.to_element("TaskParams")?),
            );
        }
        root.to_document_bytes()
    }

    fn from_element(operation: TaskOperation, root: &Element) -> Result<Self> {
        let task_id = root
            .child("targetTask")
            .map(|t| t.text().to_string())
            .filter(|t| !t.is_empty());
        if operation != TaskOperation::Submit && task_id.is_none() {
            return Err(MeasError::required("targetTask"));
        }
        Ok(Self {
            operation,
            procedure_id: root
                .child("procedure")
                .map(|p| p.text().to_string())
                .unwrap_or_default(),
            task_id,
            parameters: decode_parameters(root)?,
        })
    }

    pub fn from_xml_bytes(bytes: &[u8]) -> Result<Self> {
        match Envelope::from_xml_bytes(bytes)? {
            Envelope::TaskRequest(request) => Ok(request),
            other => Err(unexpected_envelope(&other)),
        }
    }
}

/// Whether a tasking request was accepted by the receiving system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Accepted,
    Rejected,
}

impl RequestStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }

    fn parse(text: &str) -> Result<Self> {
        match text {
            "Accepted" => Ok(Self::Accepted),
            "Rejected" => Ok(Self::Rejected),
            other => Err(MeasError::parse("request status", other)),
        }
    }
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatusCode {
    Reserved,
    InExecution,
    Completed,
    Cancelled,
    Failed,
}

impl TaskStatusCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Reserved => "Reserved",
            Self::InExecution => "InExecution",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }

    fn parse(text: &str) -> Result<Self> {
        match text {
            "Reserved" => Ok(Self::Reserved),
            "InExecution" => Ok(Self::InExecution),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            "Failed" => Ok(Self::Failed),
            other => Err(MeasError::parse("task status code", other)),
        }
    }
}

/// Status of one task at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusReport {
    pub task_id: String,
    pub procedure_id: String,
    pub request_status: RequestStatus,
    pub task_status_code: Option<TaskStatusCode>,
    pub parameters: DataRecord,
    pub estimated_time_of_completion: Option<OffsetDateTime>,
    pub percent_completion: Option<f64>,
    pub status_messages: Vec<String>,
    pub update_time: OffsetDateTime,
}

impl TaskStatusReport {
    /// An accepted-report skeleton with the update time set to now
    pub fn new<S: Into<String>>(task_id: S, procedure_id: S) -> Self {
        Self {
            task_id: task_id.into(),
            procedure_id: procedure_id.into(),
            request_status: RequestStatus::Accepted,
            task_status_code: None,
            parameters: DataRecord::new(),
            estimated_time_of_completion: None,
            percent_completion: None,
            status_messages: Vec::new(),
            update_time: OffsetDateTime::now_utc(),
        }
    }

    fn to_element(&self, id_prefix: &str) -> Result<Element> {
        let mut report = Element::new("sps:StatusReport");
        report.push_child(Element::new("sps:task").with_text(&self.task_id));
        report.push_child(Element::new("sps:procedure").with_text(&self.procedure_id));
        report.push_child(
            Element::new("sps:requestStatus").with_text(self.request_status.as_str()),
        );
        if let Some(code) = self.task_status_code {
            report.push_child(Element::new("sps:taskStatus").with_text(code.as_str()));
        }
        if let Some(percent) = self.percent_completion {
            report.push_child(
                Element::new("sps:percentCompletion")
                    .with_text(primitives::encode_double(percent)),
            );
        }
        if let Some(estimate) = self.estimated_time_of_completion {
            report.push_child(
                Element::new("sps:estimatedToC")
                    .with_text(primitives::encode_timestamp(estimate)?),
            );
        }
        for message in &self.status_messages {
            report.push_child(Element::new("sps:statusMessage").with_text(message));
        }
        report.push_child(
            Element::new("sps:updateTime")
                .with_text(primitives::encode_timestamp(self.update_time)?),
        );
        if !self.parameters.is_empty() {
            report.push_child(
                Element::new("sps:taskingParameters")
                    .with_child(self.parameters.to_element(id_prefix)?),
            );
        }
        Ok(report)
    }

    fn from_element(element: &Element) -> Result<Self> {
        // Older producers wrote the estimate without a zone; read it
        // leniently instead of dropping the value.
        let estimated_time_of_completion = match element.child("estimatedToC") {
            Some(el) => Some(primitives::decode_timestamp(el.text())?.to_utc_lossy()),
            None => None,
        };
        let percent_completion = match element.child("percentCompletion") {
            Some(el) => Some(primitives::decode_double(el.text())?),
            None => None,
        };
        Ok(Self {
            task_id: element.required_child("task")?.text().to_string(),
            procedure_id: element
                .child("procedure")
                .map(|p| p.text().to_string())
                .unwrap_or_default(),
            request_status: RequestStatus::parse(
                element.required_child("requestStatus")?.text(),
            )?,
            task_status_code: element
                .child("taskStatus")
                .map(|el| TaskStatusCode::parse(el.text()))
                .transpose()?,
            parameters: decode_parameters(element)?,
            estimated_time_of_completion,
            percent_completion,
            status_messages: element
                .children_named("statusMessage")
                .map(|m| m.text().to_string())
                .collect(),
            update_time: primitives::decode_utc_timestamp(
                element.required_child("updateTime")?.text(),
            )
            .context("updateTime")?,
        })
    }
}

/// Response to a tasking request, carrying status reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub operation: TaskOperation,
    pub status_reports: Vec<TaskStatusReport>,
}

impl TaskResponse {
    pub fn to_xml_bytes(&self) -> Result<Vec<u8>> {
        let mut root = Element::new(format!("sps:{}Response", self.operation.root_name()));
        names::declare_namespaces(&mut root);
        for (index, report) in self.status_reports.iter().enumerate() {
            root.push_child(
                Element::new("sps:result").with_child(
                    report
                        .to_element(&format!("Report{index}_params"))
                        .context("encode TaskResponse")?,
                ),
            );
        }
        root.to_document_bytes()
    }

    fn from_element(operation: TaskOperation, root: &Element) -> Result<Self> {
        let mut status_reports = Vec::new();
        for result in root.children_named("result") {
            let report = result.required_child("StatusReport")?;
            status_reports
                .push(TaskStatusReport::from_element(report).context("StatusReport")?);
        }
        Ok(Self {
            operation,
            status_reports,
        })
    }

    pub fn from_xml_bytes(bytes: &[u8]) -> Result<Self> {
        match Envelope::from_xml_bytes(bytes)? {
            Envelope::TaskResponse(response) => Ok(response),
            other => Err(unexpected_envelope(&other)),
        }
    }
}

/// Any wire document this crate can decode, selected by root element name
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Observation(Box<Observation>),
    GetObservationRequest(GetObservationRequest),
    GetObservationResponse(GetObservationResponse),
    InsertObservationRequest(InsertObservationRequest),
    InsertObservationResponse(InsertObservationResponse),
    TaskRequest(TaskRequest),
    TaskResponse(TaskResponse),
}

impl Envelope {
    /// Decode any supported document by sniffing its root element name
    pub fn from_xml_bytes(bytes: &[u8]) -> Result<Self> {
        let root = Element::parse(bytes)?;
        let name = root.local_name();
        tracing::debug!(root = name, "decoding wire document");
        let envelope = match name {
            "OM_Observation" => Self::Observation(Box::new(
                Observation::from_element(&root).context("decode observation")?,
            )),
            "GetObservationRequest" => Self::GetObservationRequest(
                GetObservationRequest::from_element(&root)
                    .context("decode GetObservationRequest")?,
            ),
            "GetObservationResponse" => {
                Self::GetObservationResponse(GetObservationResponse::from_element(&root)?)
            }
            "InsertObservationRequest" => {
                Self::InsertObservationRequest(InsertObservationRequest::from_element(&root)?)
            }
            "InsertObservationResponse" => Self::InsertObservationResponse(
                InsertObservationResponse::from_element(&root)
                    .context("decode InsertObservationResponse")?,
            ),
            other => match TaskOperation::from_root_name(other) {
                Some(operation) => Self::TaskRequest(
                    TaskRequest::from_element(operation, &root)
                        .context(format!("decode {other}"))?,
                ),
                None => match other
                    .strip_suffix("Response")
                    .and_then(TaskOperation::from_root_name)
                {
                    Some(operation) => Self::TaskResponse(
                        TaskResponse::from_element(operation, &root)
                            .context(format!("decode {other}"))?,
                    ),
                    None => {
                        return Err(MeasError::UnsupportedRootElement {
                            name: other.to_string(),
                        })
                    }
                },
            },
        };
        Ok(envelope)
    }
}

fn unexpected_envelope(envelope: &Envelope) -> MeasError {
    let name = match envelope {
        Envelope::Observation(_) => "OM_Observation",
        Envelope::GetObservationRequest(_) => "GetObservationRequest",
        Envelope::GetObservationResponse(_) => "GetObservationResponse",
        Envelope::InsertObservationRequest(_) => "InsertObservationRequest",
        Envelope::InsertObservationResponse(_) => "InsertObservationResponse",
        Envelope::TaskRequest(_) => "task request",
        Envelope::TaskResponse(_) => "task response",
    };
    MeasError::UnsupportedRootElement {
        name: name.to_string(),
    }
}

fn encode_observation_list(root: &mut Element, observations: &[Observation]) -> Result<()> {
    for (index, observation) in observations.iter().enumerate() {
        root.push_child(
            Element::new("cocop:observationData")
                .with_child(observation.to_element(&format!("Obs{index}"))?),
        );
    }
    Ok(())
}

fn decode_observation_list(root: &Element) -> Result<Vec<Observation>> {
    let mut observations = Vec::new();
    for (index, wrapper) in root.children_named("observationData").enumerate() {
        let element = wrapper.required_child("OM_Observation")?;
        observations.push(
            Observation::from_element(element).context(format!("observation {index}"))?,
        );
    }
    Ok(observations)
}

fn decode_request_result(root: &Element) -> Result<RequestResult> {
    RequestResult::parse(root.required_child("requestResult")?.text())
}

fn decode_parameters(root: &Element) -> Result<DataRecord> {
    match root
        .child("taskingParameters")
        .and_then(|p| p.child("DataRecord"))
    {
        Some(record) => DataRecord::from_element(record).context("taskingParameters"),
        None => Ok(DataRecord::new()),
    }
}
