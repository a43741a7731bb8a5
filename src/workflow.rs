//! The ITP workflow: extract, filter, dispatch each ready borrower.
//!
//! Runs on one thread. Dispatches are sequential, in row order, so the
//! station's shared variables only ever have one writer at a time. Every
//! recoverable failure is escalated and the run carries on; only broken
//! internal invariants surface as `Err`.
use crate::escalation::{EscalationReporter, Failure};
use crate::readiness::{self, ReadinessResult};
use crate::station::StationContext;
use crate::subagent::{dispatch, Catalog, SubagentTransport};
use anyhow::Result;
use std::collections::BTreeMap;

mod context;
mod source;
mod state;
mod summary;

use context::RunContext;
pub use source::{FileTableSource, RemoteTableSource, TableSource};
pub use state::{StateMachine, WorkflowState};
pub use summary::{DispatchRecord, RunSummary};

pub struct Orchestrator<'a> {
    station: &'a StationContext,
    catalog: &'a Catalog,
    transport: &'a dyn SubagentTransport,
    reporter: &'a EscalationReporter<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        station: &'a StationContext,
        catalog: &'a Catalog,
        transport: &'a dyn SubagentTransport,
        reporter: &'a EscalationReporter<'a>,
    ) -> Self {
        Self {
            station,
            catalog,
            transport,
            reporter,
        }
    }

    /// Drive one run from `AwaitingExtraction` to `Completed`.
    pub fn run(&self, source: &dyn TableSource) -> Result<RunSummary> {
        let mut machine = StateMachine::default();
        let mut summary = RunSummary::new(self.station, self.reporter.correlation_id());
        tracing::info!(
            station_id = %self.station.station_id(),
            source = %source.describe(),
            "workflow started"
        );

        let context = match RunContext::extract(self.station, source) {
            Ok(context) => context,
            Err(err) => {
                let detail = format!("{err:#}");
                tracing::warn!(error = %detail, "no usable borrower table");
                machine.escalated()?;
                summary.escalations.push(self.reporter.report(&Failure::new(
                    "",
                    "",
                    format!("borrower table extraction failed: {detail}"),
                )));
                machine.advance(WorkflowState::Completed)?;
                summary.message = self.no_table_message();
                summary.states = machine.into_trail();
                return Ok(summary);
            }
        };
        machine.advance(WorkflowState::Extracted)?;

        let evaluation = readiness::evaluate(context.table());
        summary.skipped_rows = evaluation.skipped.clone();
        let ready = evaluation.into_ready();
        machine.advance(WorkflowState::Filtered)?;
        summary.message = readiness::render_ready_list(&ready);
        summary.ready = ready.iter().map(|r| r.record.clone()).collect();

        if ready.is_empty() {
            machine.advance(WorkflowState::NoneReady)?;
            machine.advance(WorkflowState::Completed)?;
            tracing::info!("no borrowers ready; nothing dispatched");
            summary.states = machine.into_trail();
            return Ok(summary);
        }

        machine.advance(WorkflowState::Dispatching)?;
        for result in &ready {
            self.dispatch_borrower(&context, result, &mut machine, &mut summary)?;
        }
        machine.advance(WorkflowState::Completed)?;
        tracing::info!(
            state = %machine.current(),
            ready = ready.len(),
            completed = summary.completed_dispatches(),
            escalated = summary.escalations.len(),
            "workflow completed"
        );
        summary.states = machine.into_trail();
        Ok(summary)
    }

    fn dispatch_borrower(
        &self,
        context: &RunContext,
        result: &ReadinessResult,
        machine: &mut StateMachine,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let record = &result.record;
        let spec = &self.catalog.completion;
        let inputs = BTreeMap::from([
            ("borrower_name".to_string(), record.name.clone()),
            ("loan_number".to_string(), record.loan_number.clone()),
        ]);
        let outcome = dispatch(self.transport, spec, context.station(), inputs)?;
        if let Some(reason) = outcome.failure_reason() {
            machine.escalated()?;
            summary.escalations.push(self.reporter.report(&Failure::new(
                record.name.clone(),
                record.loan_number.clone(),
                format!(
                    "{} {} for loan {}: {reason}",
                    spec.name,
                    outcome.as_str(),
                    display_loan(&record.loan_number)
                ),
            )));
        }
        summary.dispatches.push(DispatchRecord {
            borrower_name: record.name.clone(),
            loan_number: record.loan_number.clone(),
            capability: spec.name.clone(),
            outcome,
        });
        Ok(())
    }

    fn no_table_message(&self) -> String {
        format!(
            "Error: No borrower table data found. Please run the {} capability first to extract borrower data.",
            self.catalog.extraction.name
        )
    }
}

fn display_loan(loan_number: &str) -> &str {
    if loan_number.is_empty() {
        "<unknown>"
    } else {
        loan_number
    }
}

#[cfg(test)]
mod tests;
