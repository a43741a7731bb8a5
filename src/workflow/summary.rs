use super::state::WorkflowState;
use crate::escalation::Escalation;
use crate::readiness::SkippedRow;
use crate::station::StationContext;
use crate::subagent::DispatchOutcome;
use crate::table::BorrowerRecord;
use serde::Serialize;

pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// One completion dispatch and how it ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchRecord {
    pub borrower_name: String,
    pub loan_number: String,
    pub capability: String,
    pub outcome: DispatchOutcome,
}

/// Machine-readable account of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub station_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub correlation_id: String,
    pub states: Vec<WorkflowState>,
    pub ready: Vec<BorrowerRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_rows: Vec<SkippedRow>,
    pub dispatches: Vec<DispatchRecord>,
    pub escalations: Vec<Escalation>,
    /// The user-facing explanation of the run.
    pub message: String,
}

impl RunSummary {
    pub(crate) fn new(station: &StationContext, correlation_id: &str) -> Self {
        Self {
            schema_version: SUMMARY_SCHEMA_VERSION,
            station_id: station.station_id().to_string(),
            run_id: station.run_identity().map(str::to_string),
            correlation_id: correlation_id.to_string(),
            states: Vec::new(),
            ready: Vec::new(),
            skipped_rows: Vec::new(),
            dispatches: Vec::new(),
            escalations: Vec::new(),
            message: String::new(),
        }
    }

    pub fn final_state(&self) -> Option<WorkflowState> {
        self.states.last().copied()
    }

    pub fn completed_dispatches(&self) -> usize {
        self.dispatches
            .iter()
            .filter(|record| record.outcome.is_success())
            .count()
    }

    pub fn render_text(&self) -> String {
        let mut out = self.message.clone();
        if !self.dispatches.is_empty() {
            out.push_str("\n\nDispatch results:\n");
            for record in &self.dispatches {
                out.push_str(&format!(
                    "  - {} (loan {}): {}\n",
                    record.borrower_name, record.loan_number, record.outcome
                ));
            }
        }
        if !self.escalations.is_empty() {
            out.push_str(if self.dispatches.is_empty() {
                "\n\nEscalations:\n"
            } else {
                "\nEscalations:\n"
            });
            for escalation in &self.escalations {
                let report = &escalation.report;
                let loan = if report.loan_number.is_empty() {
                    "n/a"
                } else {
                    report.loan_number.as_str()
                };
                out.push_str(&format!(
                    "  - loan {loan}: {} ({})\n",
                    report.message, escalation.outcome
                ));
            }
        }
        if !self.skipped_rows.is_empty() {
            out.push_str(&format!(
                "\nSkipped {} malformed row(s).\n",
                self.skipped_rows.len()
            ));
        }
        out
    }
}
