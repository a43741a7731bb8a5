use super::{Orchestrator, RemoteTableSource, TableSource, WorkflowState};
use crate::config::{default_config, Settings};
use crate::escalation::{EscalationReport, EscalationReporter, ReviewTransport};
use crate::readiness::NONE_READY_MESSAGE;
use crate::station::StationContext;
use crate::subagent::{Catalog, DispatchRequest, SubagentSpec, SubagentTransport};
use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::cell::RefCell;

const HEADER: &str = "Borrower Name,Loan Number,Document Date R,eDisclosure D,eDisclosure D";

struct StaticTable(Option<String>);

impl TableSource for StaticTable {
    fn describe(&self) -> String {
        "static table".to_string()
    }

    fn extract(&self, _station: &StationContext) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

struct BrokenTable;

impl TableSource for BrokenTable {
    fn describe(&self) -> String {
        "broken table".to_string()
    }

    fn extract(&self, _station: &StationContext) -> Result<Option<String>> {
        Err(anyhow!("screen capture timed out"))
    }
}

/// Fails every dispatch whose loan number is listed in `failing`.
struct ScriptedRemote {
    failing: Vec<&'static str>,
    extraction_payload: Value,
    requests: RefCell<Vec<(String, DispatchRequest)>>,
}

impl ScriptedRemote {
    fn new(failing: Vec<&'static str>) -> Self {
        Self {
            failing,
            extraction_payload: json!({}),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn loans(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|(_, request)| request.required_inputs.get("loan_number").cloned())
            .collect()
    }
}

impl SubagentTransport for ScriptedRemote {
    fn invoke(&self, spec: &SubagentSpec, request: &DispatchRequest) -> Result<Value> {
        self.requests
            .borrow_mut()
            .push((spec.name.clone(), request.clone()));
        if spec.required_inputs.is_empty() {
            return Ok(self.extraction_payload.clone());
        }
        let loan = request
            .required_inputs
            .get("loan_number")
            .map(String::as_str)
            .unwrap_or_default();
        if self.failing.iter().any(|failing| *failing == loan) {
            return Err(anyhow!("remote procedure timed out"));
        }
        Ok(json!({"status": "success", "loan_number": loan}))
    }
}

struct CountingReview {
    sent: RefCell<usize>,
}

impl ReviewTransport for CountingReview {
    fn send(&self, _endpoint: &str, _token: &str, _report: &EscalationReport) -> Result<u16> {
        *self.sent.borrow_mut() += 1;
        Ok(200)
    }
}

struct Harness {
    settings: Settings,
    station: StationContext,
    catalog: Catalog,
    review: CountingReview,
}

impl Harness {
    fn new(token: Option<&str>) -> Self {
        let mut config = default_config();
        config.review.endpoint = Some("https://review.invalid/hitl".to_string());
        let settings = Settings::from_parts(
            config,
            Some("thread-1".to_string()),
            token.map(str::to_string),
        );
        let station = StationContext::derive(
            settings.run_id.as_deref(),
            &settings.config.station.default_station_id,
            settings.config.station.shared_variables.clone(),
        );
        let catalog = Catalog::declare(&settings.config, &station).expect("declare catalog");
        Self {
            settings,
            station,
            catalog,
            review: CountingReview {
                sent: RefCell::new(0),
            },
        }
    }

    fn run(&self, remote: &ScriptedRemote, source: &dyn TableSource) -> super::RunSummary {
        let reporter = EscalationReporter::new(&self.settings, &self.station, &self.review);
        let orchestrator = Orchestrator::new(&self.station, &self.catalog, remote, &reporter);
        orchestrator.run(source).expect("workflow run")
    }
}

fn table(rows: &[&str]) -> StaticTable {
    let mut text = HEADER.to_string();
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    StaticTable(Some(text))
}

#[test]
fn one_failed_dispatch_does_not_stop_the_next_borrower() {
    let harness = Harness::new(Some("secret"));
    let remote = ScriptedRemote::new(vec!["111"]);
    let summary = harness.run(
        &remote,
        &table(&[
            "Roe,111,2024-01-01,2024-01-02,2024-01-03",
            "\"Doe, Jane\",222,2024-01-01,2024-01-02,2024-01-03",
        ]),
    );

    assert_eq!(summary.final_state(), Some(WorkflowState::Completed));
    assert_eq!(summary.dispatches.len(), 2);
    assert_eq!(summary.completed_dispatches(), 1);
    assert_eq!(summary.escalations.len(), 1);
    assert_eq!(summary.escalations[0].report.loan_number, "111");
    assert_eq!(summary.escalations[0].outcome.as_str(), "reported");
    assert_eq!(*harness.review.sent.borrow(), 1);
    assert_eq!(
        summary.states,
        vec![
            WorkflowState::AwaitingExtraction,
            WorkflowState::Extracted,
            WorkflowState::Filtered,
            WorkflowState::Dispatching,
            WorkflowState::Escalated,
            WorkflowState::Completed,
        ]
    );
}

#[test]
fn dispatches_follow_row_order_and_share_one_station() {
    let harness = Harness::new(None);
    let remote = ScriptedRemote::new(Vec::new());
    harness.run(
        &remote,
        &table(&[
            "C,3,2024-01-01,2024-01-02,2024-01-03",
            "A,1,2024-01-01,,2024-01-03",
            "B,2,2024-01-01,2024-01-02,2024-01-03",
        ]),
    );

    assert_eq!(remote.loans(), vec!["3", "2"]);
    for (capability, request) in remote.requests.borrow().iter() {
        assert_eq!(capability, "cute-finish-itp");
        assert_eq!(request.station.station_id, "thread-1");
    }
}

#[test]
fn none_ready_reports_the_gate_and_never_dispatches() {
    let harness = Harness::new(Some("secret"));
    let remote = ScriptedRemote::new(Vec::new());
    let summary = harness.run(&remote, &table(&["Roe,1,=,2024-01-02,2024-01-03"]));

    assert_eq!(summary.message, NONE_READY_MESSAGE);
    assert!(remote.requests.borrow().is_empty());
    assert!(summary.escalations.is_empty());
    assert_eq!(
        summary.states,
        vec![
            WorkflowState::AwaitingExtraction,
            WorkflowState::Extracted,
            WorkflowState::Filtered,
            WorkflowState::NoneReady,
            WorkflowState::Completed,
        ]
    );
}

#[test]
fn header_only_table_is_none_ready() {
    let harness = Harness::new(None);
    let remote = ScriptedRemote::new(Vec::new());
    let summary = harness.run(&remote, &table(&[]));
    assert_eq!(summary.message, NONE_READY_MESSAGE);
    assert!(summary.ready.is_empty());
}

#[test]
fn missing_table_escalates_then_completes() {
    let harness = Harness::new(None);
    let remote = ScriptedRemote::new(Vec::new());
    let summary = harness.run(&remote, &StaticTable(None));

    assert!(summary.message.contains("No borrower table data found"));
    assert!(summary.message.contains("cute-linear"));
    assert_eq!(summary.escalations.len(), 1);
    assert_eq!(summary.escalations[0].outcome.as_str(), "not_reported");
    assert!(remote.requests.borrow().is_empty());
    assert_eq!(
        summary.states,
        vec![
            WorkflowState::AwaitingExtraction,
            WorkflowState::Escalated,
            WorkflowState::Completed,
        ]
    );
}

#[test]
fn extraction_error_is_escalated_with_its_cause() {
    let harness = Harness::new(Some("secret"));
    let remote = ScriptedRemote::new(Vec::new());
    let summary = harness.run(&remote, &BrokenTable);
    assert_eq!(summary.final_state(), Some(WorkflowState::Completed));
    assert!(summary.escalations[0]
        .report
        .message
        .contains("screen capture timed out"));
}

#[test]
fn ready_borrower_without_loan_number_is_rejected_locally() {
    let harness = Harness::new(None);
    let remote = ScriptedRemote::new(Vec::new());
    let text = "Borrower Name,Document Date R,eDisclosure D,eDisclosure D\nRoe,2024-01-01,2024-01-02,2024-01-03";
    let summary = harness.run(&remote, &StaticTable(Some(text.to_string())));

    assert_eq!(summary.dispatches.len(), 1);
    assert_eq!(summary.dispatches[0].outcome.as_str(), "rejected");
    assert_eq!(summary.escalations.len(), 1);
    assert!(remote.requests.borrow().is_empty());
}

#[test]
fn remote_extraction_reads_file_state_payload() {
    let harness = Harness::new(None);
    let mut remote = ScriptedRemote::new(Vec::new());
    remote.extraction_payload = json!({
        "files": {
            "/borrower_table.csv": {
                "content": [HEADER, "Roe,7,2024-01-01,2024-01-02,2024-01-03"]
            }
        }
    });
    let source = RemoteTableSource::new(&harness.catalog.extraction, &remote);
    let summary = harness.run(&remote, &source);

    assert_eq!(summary.completed_dispatches(), 1);
    let capabilities = remote
        .requests
        .borrow()
        .iter()
        .map(|(name, _)| name.clone())
        .collect::<Vec<_>>();
    assert_eq!(capabilities, vec!["cute-linear", "cute-finish-itp"]);
}
