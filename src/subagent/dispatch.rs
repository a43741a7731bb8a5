//! Synchronous dispatch of a remote capability.
//!
//! Required inputs are checked locally before anything leaves the process.
//! The remote procedure is a black box: it either returns a success payload
//! or a failure signal, and timeouts surface as failures.
use super::{ServerBinding, StationBinding, SubagentSpec};
use crate::station::StationContext;
use crate::util::truncate_string;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

const RUNS_WAIT_PATH: &str = "runs/wait";
const REASON_PREVIEW_BYTES: usize = 500;

/// Wire body for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchRequest {
    pub capability_name: String,
    pub required_inputs: BTreeMap<String, String>,
    pub station: StationBinding,
    pub server: ServerBinding,
}

impl DispatchRequest {
    /// Build a request, failing when a required input is missing or blank.
    pub fn build(spec: &SubagentSpec, inputs: BTreeMap<String, String>) -> Result<Self> {
        let missing = spec
            .required_inputs
            .iter()
            .filter(|key| !matches!(inputs.get(*key), Some(value) if !value.trim().is_empty()))
            .cloned()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(anyhow!(
                "missing required input(s) for {}: {}",
                spec.name,
                missing.join(", ")
            ));
        }
        Ok(Self {
            capability_name: spec.name.clone(),
            required_inputs: inputs,
            station: spec.station.clone(),
            server: spec.server.clone(),
        })
    }
}

/// What came back from a dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Succeeded { payload: Value },
    /// Never left the process: the request failed local validation.
    Rejected { reason: String },
    Failed { reason: String },
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Succeeded { .. } => "succeeded",
            DispatchOutcome::Rejected { .. } => "rejected",
            DispatchOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Succeeded { .. })
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Succeeded { .. } => None,
            DispatchOutcome::Rejected { reason } | DispatchOutcome::Failed { reason } => {
                Some(reason)
            }
        }
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failure_reason() {
            Some(reason) => write!(f, "{}: {reason}", self.as_str()),
            None => f.write_str(self.as_str()),
        }
    }
}

/// Carries a dispatch request to the remote system and waits for the answer.
///
/// `Err` is the failure signal; `Ok` holds the raw response body.
pub trait SubagentTransport {
    fn invoke(&self, spec: &SubagentSpec, request: &DispatchRequest) -> Result<Value>;
}

/// Dispatch `spec` with `inputs` inside `station`.
///
/// Only a station mismatch is an `Err`: it means two dispatches of one run
/// would bind to different stations.
pub fn dispatch(
    transport: &dyn SubagentTransport,
    spec: &SubagentSpec,
    station: &StationContext,
    inputs: BTreeMap<String, String>,
) -> Result<DispatchOutcome> {
    if spec.station.station_id != station.station_id() {
        return Err(anyhow!(
            "capability {} is bound to station {:?} but the run uses {:?}",
            spec.name,
            spec.station.station_id,
            station.station_id()
        ));
    }
    let request = match DispatchRequest::build(spec, inputs) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(capability = %spec.name, error = %err, "dispatch rejected locally");
            return Ok(DispatchOutcome::Rejected {
                reason: err.to_string(),
            });
        }
    };

    let start = Instant::now();
    let outcome = match transport.invoke(spec, &request) {
        Ok(payload) => match payload_failure(&payload) {
            Some(reason) => DispatchOutcome::Failed { reason },
            None => DispatchOutcome::Succeeded { payload },
        },
        Err(err) => DispatchOutcome::Failed {
            reason: truncate_string(&format!("{err:#}"), REASON_PREVIEW_BYTES),
        },
    };
    tracing::info!(
        capability = %spec.name,
        station_id = %request.station.station_id,
        elapsed_ms = start.elapsed().as_millis() as u64,
        outcome = outcome.as_str(),
        "dispatch complete"
    );
    Ok(outcome)
}

/// A response body can still report failure in-band.
fn payload_failure(payload: &Value) -> Option<String> {
    let object = payload.as_object()?;
    let message = object
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);
    let error = match object.get("error") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    };
    let status_is_error = object.get("status").and_then(Value::as_str) == Some("error");
    if !status_is_error && error.is_none() {
        return None;
    }
    Some(
        error
            .or(message)
            .unwrap_or_else(|| "remote procedure reported an error".to_string()),
    )
}

/// Blocking HTTP transport against a LangGraph-style `runs/wait` endpoint.
pub struct HttpSubagentTransport {
    agent: ureq::Agent,
}

impl HttpSubagentTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }
}

impl SubagentTransport for HttpSubagentTransport {
    fn invoke(&self, spec: &SubagentSpec, request: &DispatchRequest) -> Result<Value> {
        let url = format!("{}/{RUNS_WAIT_PATH}", spec.remote_endpoint);
        let body = json!({
            "assistant_id": spec.remote_graph_id,
            "input": request,
        });
        let mut response = self
            .agent
            .post(&url)
            .send_json(&body)
            .with_context(|| format!("POST {url}"))?;
        response
            .body_mut()
            .read_json::<Value>()
            .with_context(|| format!("decode response from {url}"))
    }
}
